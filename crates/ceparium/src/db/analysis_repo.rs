//! Analysis repository: durable results of the processing pipeline.
//!
//! Rows are immutable once created. Creation validates that the referenced
//! strain exists, so no analysis can be orphaned from the strain history it
//! belongs to.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;
use serde_json::Value;

use super::{Database, DatabaseError};

/// A persisted analysis record: either a parser payload or the error
/// descriptor of a failed job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRow {
    pub id: i64,
    pub analysis_type: String,
    pub results: Value,
    pub file_url: Option<String>,
    pub strain_id: i64,
    pub owner_id: i64,
    pub created_at: String,
}

impl AnalysisRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let raw: String = row.get("results")?;
        let results = serde_json::from_str(&raw).unwrap_or_else(|e| {
            log::warn!("Stored analysis results are not valid JSON: {}", e);
            Value::Null
        });
        Ok(Self {
            id: row.get("id")?,
            analysis_type: row.get("analysis_type")?,
            results,
            file_url: row.get("file_url")?,
            strain_id: row.get("strain_id")?,
            owner_id: row.get("owner_id")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a new analysis after validating the strain reference.
/// The id and creation timestamp are assigned here.
pub fn create(
    db: &Database,
    analysis_type: &str,
    results: &Value,
    strain_id: i64,
    owner_id: i64,
    file_url: Option<&str>,
) -> Result<AnalysisRow, DatabaseError> {
    db.with_conn(|conn| {
        let strain_ok: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM strains WHERE id = ?1)",
            params![strain_id],
            |r| r.get(0),
        )?;
        if !strain_ok {
            return Err(DatabaseError::StrainNotFound(strain_id));
        }

        let created_at = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO analyses (analysis_type, results, file_url, strain_id, owner_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                analysis_type,
                results.to_string(),
                file_url,
                strain_id,
                owner_id,
                created_at,
            ],
        )?;

        Ok(AnalysisRow {
            id: conn.last_insert_rowid(),
            analysis_type: analysis_type.to_string(),
            results: results.clone(),
            file_url: file_url.map(str::to_string),
            strain_id,
            owner_id,
            created_at,
        })
    })
}

pub fn find_by_id(db: &Database, id: i64) -> Result<Option<AnalysisRow>, DatabaseError> {
    db.with_conn(|conn| {
        conn.query_row(
            "SELECT * FROM analyses WHERE id = ?1",
            params![id],
            AnalysisRow::from_row,
        )
        .optional()
        .map_err(DatabaseError::Sqlite)
    })
}

/// All analyses for a strain, oldest first.
pub fn list_by_strain(db: &Database, strain_id: i64) -> Result<Vec<AnalysisRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM analyses WHERE strain_id = ?1 ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![strain_id], AnalysisRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// An owner's analyses, most recent first.
pub fn list_by_owner(
    db: &Database,
    owner_id: i64,
    limit: u64,
) -> Result<Vec<AnalysisRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM analyses WHERE owner_id = ?1
             ORDER BY created_at DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![owner_id, limit as i64], AnalysisRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::metadata_repo;
    use serde_json::json;

    fn seeded_db() -> (Database, i64, i64) {
        let db = Database::open_in_memory().unwrap();
        let organism =
            metadata_repo::create_organism(&db, "E. coli K-12", "Escherichia", "coli").unwrap();
        let strain = metadata_repo::create_strain(&db, "MG1655", None, organism.id).unwrap();
        let user = metadata_repo::create_user(&db, "lab@example.org", None).unwrap();
        (db, strain.id, user.id)
    }

    #[test]
    fn test_create_assigns_id_and_timestamp() {
        let (db, strain_id, owner_id) = seeded_db();
        let results = json!({"sequence_count": 3, "filename": "reads.fasta"});
        let row = create(&db, "fasta_count", &results, strain_id, owner_id, None).unwrap();

        assert!(row.id > 0);
        assert!(!row.created_at.is_empty());

        let found = find_by_id(&db, row.id).unwrap().unwrap();
        assert_eq!(found.results["sequence_count"], 3);
        assert_eq!(found.analysis_type, "fasta_count");
    }

    #[test]
    fn test_create_rejects_unknown_strain() {
        let (db, _, owner_id) = seeded_db();
        let err = create(&db, "fasta_count", &json!({}), 999, owner_id, None).unwrap_err();
        assert!(matches!(err, DatabaseError::StrainNotFound(999)));
    }

    #[test]
    fn test_list_by_strain_ordered_oldest_first() {
        let (db, strain_id, owner_id) = seeded_db();
        let first = create(&db, "fasta_count", &json!({"n": 1}), strain_id, owner_id, None).unwrap();
        let second =
            create(&db, "gff_stats", &json!({"n": 2}), strain_id, owner_id, None).unwrap();

        let rows = list_by_strain(&db, strain_id).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, first.id);
        assert_eq!(rows[1].id, second.id);
    }

    #[test]
    fn test_list_by_owner_most_recent_first_with_limit() {
        let (db, strain_id, owner_id) = seeded_db();
        for i in 0..3 {
            create(&db, "fasta_count", &json!({"n": i}), strain_id, owner_id, None).unwrap();
        }

        let rows = list_by_owner(&db, owner_id, 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].id > rows[1].id);
    }

    #[test]
    fn test_file_url_round_trips() {
        let (db, strain_id, owner_id) = seeded_db();
        let row = create(
            &db,
            "fasta_count",
            &json!({}),
            strain_id,
            owner_id,
            Some("http://localhost:9000/biodata/uploads/x-reads.fasta"),
        )
        .unwrap();
        let found = find_by_id(&db, row.id).unwrap().unwrap();
        assert_eq!(
            found.file_url.as_deref(),
            Some("http://localhost:9000/biodata/uploads/x-reads.fasta")
        );
    }
}
