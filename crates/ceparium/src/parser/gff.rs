//! GFF3 feature-type counting over the nested feature tree.
//!
//! Features are linked into a tree through their `ID`/`Parent` attributes
//! and counted by a recursive walk, so every nesting level contributes.
//! Untrusted input cannot recurse without bound: the walk refuses trees
//! deeper than [`MAX_FEATURE_DEPTH`].

use std::collections::{BTreeMap, HashMap};
use std::io::BufRead;

use crate::error::ParseError;
use crate::parser::GffStatsPayload;

/// Upper bound on feature nesting. Real annotations stay in single digits.
pub const MAX_FEATURE_DEPTH: usize = 64;

struct Feature {
    kind: String,
    children: Vec<usize>,
}

/// Extracts the `ID` and (first) `Parent` values from a GFF3 attribute
/// column.
fn parse_attributes(attributes: &str) -> (Option<String>, Option<String>) {
    let mut id = None;
    let mut parent = None;
    for pair in attributes.split(';') {
        if let Some((key, value)) = pair.trim().split_once('=') {
            match key {
                "ID" => id = Some(value.to_string()),
                "Parent" => {
                    parent = value.split(',').next().map(str::to_string);
                }
                _ => {}
            }
        }
    }
    (id, parent)
}

fn walk(
    features: &[Feature],
    index: usize,
    depth: usize,
    counts: &mut BTreeMap<String, u64>,
) -> Result<(), ParseError> {
    if depth > MAX_FEATURE_DEPTH {
        return Err(ParseError::FeatureDepthExceeded(MAX_FEATURE_DEPTH));
    }
    *counts.entry(features[index].kind.clone()).or_insert(0) += 1;
    for &child in &features[index].children {
        walk(features, child, depth + 1, counts)?;
    }
    Ok(())
}

pub fn stats(reader: impl BufRead, filename: &str) -> Result<GffStatsPayload, ParseError> {
    let mut features: Vec<Feature> = Vec::new();
    let mut parent_ids: Vec<Option<String>> = Vec::new();
    let mut index_by_id: HashMap<String, usize> = HashMap::new();
    let mut line_no = 0usize;

    for line in reader.lines() {
        let line = line?;
        line_no += 1;
        let trimmed = line.trim_end();
        if trimmed == "##FASTA" {
            // Embedded sequence section; no features follow.
            break;
        }
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let columns: Vec<&str> = trimmed.split('\t').collect();
        if columns.len() < 8 {
            return Err(ParseError::Malformed {
                format: "GFF",
                record: line_no,
                reason: format!(
                    "expected 9 tab-separated columns, found {}",
                    columns.len()
                ),
            });
        }

        let (id, parent) = parse_attributes(columns.get(8).copied().unwrap_or_default());
        let index = features.len();
        features.push(Feature {
            kind: columns[2].to_string(),
            children: Vec::new(),
        });
        parent_ids.push(parent);
        if let Some(id) = id {
            // First definition wins for duplicate IDs.
            index_by_id.entry(id).or_insert(index);
        }
    }

    let mut roots: Vec<usize> = Vec::new();
    for (index, parent) in parent_ids.iter().enumerate() {
        match parent.as_ref().and_then(|p| index_by_id.get(p)) {
            Some(&parent_index) if parent_index != index => {
                features[parent_index].children.push(index);
            }
            // No parent, a parent that never appears, or a self-reference:
            // treat as a root.
            _ => roots.push(index),
        }
    }

    let mut feature_counts = BTreeMap::new();
    for root in roots {
        walk(&features, root, 1, &mut feature_counts)?;
    }

    if feature_counts.is_empty() {
        return Err(ParseError::Empty("GFF features"));
    }

    Ok(GffStatsPayload {
        filename: filename.to_string(),
        feature_counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn line(kind: &str, attributes: &str) -> String {
        format!("chr1\ttest\t{kind}\t1\t1000\t.\t+\t.\t{attributes}\n")
    }

    #[test]
    fn test_nested_features_count_every_level() {
        let input = String::from("##gff-version 3\n")
            + &line("gene", "ID=gene1")
            + &line("mRNA", "ID=mrna1;Parent=gene1")
            + &line("exon", "ID=exon1;Parent=mrna1")
            + &line("exon", "ID=exon2;Parent=mrna1")
            + &line("exon", "ID=exon3;Parent=mrna1");
        let payload = stats(Cursor::new(input), "ann.gff3").unwrap();

        assert_eq!(payload.feature_counts.get("gene"), Some(&1));
        assert_eq!(payload.feature_counts.get("mRNA"), Some(&1));
        assert_eq!(payload.feature_counts.get("exon"), Some(&3));
    }

    #[test]
    fn test_orphan_parent_counts_as_root() {
        let input = line("mRNA", "ID=m1;Parent=missing");
        let payload = stats(Cursor::new(input), "a.gff").unwrap();
        assert_eq!(payload.feature_counts.get("mRNA"), Some(&1));
    }

    #[test]
    fn test_empty_file_is_error() {
        let err = stats(Cursor::new("##gff-version 3\n# only comments\n"), "a.gff").unwrap_err();
        assert!(matches!(err, ParseError::Empty(_)));
    }

    #[test]
    fn test_malformed_line_is_rejected() {
        let err = stats(Cursor::new("chr1 not-tab-separated\n"), "a.gff").unwrap_err();
        assert!(matches!(err, ParseError::Malformed { record: 1, .. }));
    }

    #[test]
    fn test_fasta_section_stops_parsing() {
        let input = line("gene", "ID=g1") + "##FASTA\n>chr1\nACGT\n";
        let payload = stats(Cursor::new(input), "a.gff").unwrap();
        assert_eq!(payload.feature_counts.len(), 1);
    }

    #[test]
    fn test_depth_guard_rejects_deep_chains() {
        let mut input = line("gene", "ID=f0");
        for i in 1..=MAX_FEATURE_DEPTH {
            input += &line("exon", &format!("ID=f{i};Parent=f{}", i - 1));
        }
        let err = stats(Cursor::new(input), "deep.gff").unwrap_err();
        assert!(matches!(err, ParseError::FeatureDepthExceeded(_)));
    }

    #[test]
    fn test_chain_at_depth_limit_is_accepted() {
        let mut input = line("gene", "ID=f0");
        for i in 1..MAX_FEATURE_DEPTH {
            input += &line("exon", &format!("ID=f{i};Parent=f{}", i - 1));
        }
        let payload = stats(Cursor::new(input), "deep.gff").unwrap();
        let total: u64 = payload.feature_counts.values().sum();
        assert_eq!(total, MAX_FEATURE_DEPTH as u64);
    }

    #[test]
    fn test_multiple_parents_attach_to_first() {
        let input = line("gene", "ID=g1")
            + &line("gene", "ID=g2")
            + &line("exon", "ID=e1;Parent=g1,g2");
        let payload = stats(Cursor::new(input), "a.gff").unwrap();
        // Counted once, not once per parent.
        assert_eq!(payload.feature_counts.get("exon"), Some(&1));
        assert_eq!(payload.feature_counts.get("gene"), Some(&2));
    }
}
