//! Metadata repository: organisms, strains, users, and collection counts.
//!
//! The pipeline itself only needs `strain_exists`; the rest backs the
//! metadata CRUD surface of the service.

use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use super::{Database, DatabaseError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganismRow {
    pub id: i64,
    pub name: String,
    pub genus: String,
    pub species: String,
}

impl OrganismRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            genus: row.get("genus")?,
            species: row.get("species")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrainRow {
    pub id: i64,
    pub strain_name: String,
    pub source: Option<String>,
    pub organism_id: i64,
}

impl StrainRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            strain_name: row.get("strain_name")?,
            source: row.get("source")?,
            organism_id: row.get("organism_id")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub is_active: bool,
}

impl UserRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            email: row.get("email")?,
            name: row.get("name")?,
            is_active: row.get("is_active")?,
        })
    }
}

/// Aggregate collection counts for the stats surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionCounts {
    pub organisms: u64,
    pub strains: u64,
    pub analyses: u64,
}

// ─── Organisms ──────────────────────────────────────────────────────────────

pub fn create_organism(
    db: &Database,
    name: &str,
    genus: &str,
    species: &str,
) -> Result<OrganismRow, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO organisms (name, genus, species) VALUES (?1, ?2, ?3)",
            params![name, genus, species],
        )?;
        Ok(OrganismRow {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            genus: genus.to_string(),
            species: species.to_string(),
        })
    })
}

pub fn find_organism(db: &Database, id: i64) -> Result<Option<OrganismRow>, DatabaseError> {
    db.with_conn(|conn| {
        conn.query_row(
            "SELECT * FROM organisms WHERE id = ?1",
            params![id],
            OrganismRow::from_row,
        )
        .optional()
        .map_err(DatabaseError::Sqlite)
    })
}

pub fn list_organisms(db: &Database, limit: u64) -> Result<Vec<OrganismRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM organisms ORDER BY id LIMIT ?1")?;
        let rows = stmt
            .query_map(params![limit as i64], OrganismRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Deletes an organism. Returns `false` if no such organism existed.
/// Fails while strains still reference it (foreign key RESTRICT).
pub fn delete_organism(db: &Database, id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute("DELETE FROM organisms WHERE id = ?1", params![id])?;
        Ok(affected == 1)
    })
}

// ─── Strains ────────────────────────────────────────────────────────────────

pub fn create_strain(
    db: &Database,
    strain_name: &str,
    source: Option<&str>,
    organism_id: i64,
) -> Result<StrainRow, DatabaseError> {
    db.with_conn(|conn| {
        let organism_exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM organisms WHERE id = ?1)",
            params![organism_id],
            |r| r.get(0),
        )?;
        if !organism_exists {
            return Err(DatabaseError::OrganismNotFound(organism_id));
        }

        conn.execute(
            "INSERT INTO strains (strain_name, source, organism_id) VALUES (?1, ?2, ?3)",
            params![strain_name, source, organism_id],
        )?;
        Ok(StrainRow {
            id: conn.last_insert_rowid(),
            strain_name: strain_name.to_string(),
            source: source.map(str::to_string),
            organism_id,
        })
    })
}

pub fn find_strain(db: &Database, id: i64) -> Result<Option<StrainRow>, DatabaseError> {
    db.with_conn(|conn| {
        conn.query_row(
            "SELECT * FROM strains WHERE id = ?1",
            params![id],
            StrainRow::from_row,
        )
        .optional()
        .map_err(DatabaseError::Sqlite)
    })
}

pub fn strain_exists(db: &Database, id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM strains WHERE id = ?1)",
            params![id],
            |r| r.get(0),
        )?;
        Ok(exists)
    })
}

pub fn list_strains(db: &Database, limit: u64) -> Result<Vec<StrainRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM strains ORDER BY id LIMIT ?1")?;
        let rows = stmt
            .query_map(params![limit as i64], StrainRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn list_strains_by_organism(
    db: &Database,
    organism_id: i64,
) -> Result<Vec<StrainRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM strains WHERE organism_id = ?1 ORDER BY id")?;
        let rows = stmt
            .query_map(params![organism_id], StrainRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

// ─── Users ──────────────────────────────────────────────────────────────────

pub fn create_user(db: &Database, email: &str, name: Option<&str>) -> Result<UserRow, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO users (email, name) VALUES (?1, ?2)",
            params![email, name],
        )?;
        Ok(UserRow {
            id: conn.last_insert_rowid(),
            email: email.to_string(),
            name: name.map(str::to_string),
            is_active: true,
        })
    })
}

pub fn find_user(db: &Database, id: i64) -> Result<Option<UserRow>, DatabaseError> {
    db.with_conn(|conn| {
        conn.query_row(
            "SELECT * FROM users WHERE id = ?1",
            params![id],
            UserRow::from_row,
        )
        .optional()
        .map_err(DatabaseError::Sqlite)
    })
}

pub fn list_users(db: &Database, limit: u64) -> Result<Vec<UserRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM users ORDER BY id LIMIT ?1")?;
        let rows = stmt
            .query_map(params![limit as i64], UserRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn find_user_by_email(db: &Database, email: &str) -> Result<Option<UserRow>, DatabaseError> {
    db.with_conn(|conn| {
        conn.query_row(
            "SELECT * FROM users WHERE email = ?1",
            params![email],
            UserRow::from_row,
        )
        .optional()
        .map_err(DatabaseError::Sqlite)
    })
}

// ─── Stats ──────────────────────────────────────────────────────────────────

pub fn collection_counts(db: &Database) -> Result<CollectionCounts, DatabaseError> {
    db.with_conn(|conn| {
        let count = |sql: &str| -> Result<u64, rusqlite::Error> {
            conn.query_row(sql, [], |r| r.get::<_, i64>(0)).map(|n| n as u64)
        };
        Ok(CollectionCounts {
            organisms: count("SELECT COUNT(*) FROM organisms")?,
            strains: count("SELECT COUNT(*) FROM strains")?,
            analyses: count("SELECT COUNT(*) FROM analyses")?,
        })
    })
}
