//! GenBank flat-file statistics.
//!
//! Parses every record in the file but summarizes only the first one;
//! the total record count is reported separately. This matches how the
//! analysis history presents multi-record GenBank uploads.

use std::io::BufRead;

use crate::error::ParseError;
use crate::parser::GenbankStatsPayload;

const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Default)]
struct Record {
    locus_name: String,
    declared_length: Option<u64>,
    counted_length: u64,
    molecule_type: Option<String>,
    topology: Option<String>,
    accession: Option<String>,
    version: Option<String>,
    description: String,
    feature_count: u64,
}

impl Record {
    fn sequence_length(&self) -> u64 {
        self.declared_length.unwrap_or(self.counted_length)
    }

    fn main_record_id(&self) -> String {
        self.version
            .clone()
            .or_else(|| self.accession.clone())
            .unwrap_or_else(|| self.locus_name.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    None,
    Definition,
    Features,
    Origin,
}

/// Parses the LOCUS line. The sequence length immediately precedes the
/// `bp`/`aa` unit token; molecule type and topology follow it when present.
fn parse_locus(rest: &str, record: &mut Record) {
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    record.locus_name = tokens.first().copied().unwrap_or_default().to_string();

    let unit_pos = match tokens.iter().position(|t| *t == "bp" || *t == "aa") {
        Some(pos) if pos > 0 => pos,
        _ => return,
    };
    record.declared_length = tokens[unit_pos - 1].parse().ok();

    for token in &tokens[unit_pos + 1..] {
        if token.eq_ignore_ascii_case("linear") || token.eq_ignore_ascii_case("circular") {
            record.topology = Some(token.to_lowercase());
        } else if record.molecule_type.is_none()
            && (token.contains("DNA") || token.contains("RNA"))
        {
            record.molecule_type = Some((*token).to_string());
        }
    }
}

/// Feature keys sit at column 5 of the feature table; qualifier lines are
/// indented further and start with `/`.
fn is_feature_key_line(line: &str) -> bool {
    let bytes = line.as_bytes();
    bytes.len() > 5 && bytes[..5] == *b"     " && bytes[5] != b' '
}

pub fn stats(reader: impl BufRead, filename: &str) -> Result<GenbankStatsPayload, ParseError> {
    let mut records: Vec<Record> = Vec::new();
    let mut current: Option<Record> = None;
    let mut section = Section::None;

    for line in reader.lines() {
        let line = line?;
        let trimmed_end = line.trim_end();

        if let Some(rest) = trimmed_end.strip_prefix("LOCUS") {
            let mut record = Record::default();
            parse_locus(rest, &mut record);
            current = Some(record);
            section = Section::None;
            continue;
        }

        let record = match current.as_mut() {
            Some(r) => r,
            // Text before the first LOCUS line carries no record data.
            None => continue,
        };

        if trimmed_end == "//" {
            if let Some(done) = current.take() {
                records.push(done);
            }
            section = Section::None;
            continue;
        }

        // A non-blank character in column 0 starts a new keyword section.
        if !line.starts_with(' ') && !trimmed_end.is_empty() {
            let keyword = trimmed_end.split_whitespace().next().unwrap_or_default();
            let rest = trimmed_end[keyword.len()..].trim();
            section = Section::None;
            match keyword {
                "DEFINITION" => {
                    record.description = rest.to_string();
                    section = Section::Definition;
                }
                "ACCESSION" => {
                    record.accession = rest.split_whitespace().next().map(str::to_string);
                }
                "VERSION" => {
                    record.version = rest.split_whitespace().next().map(str::to_string);
                }
                "FEATURES" => section = Section::Features,
                "ORIGIN" => section = Section::Origin,
                _ => {}
            }
            continue;
        }

        match section {
            Section::Definition => {
                if !trimmed_end.trim().is_empty() {
                    record.description.push(' ');
                    record.description.push_str(trimmed_end.trim());
                }
            }
            Section::Features => {
                if is_feature_key_line(&line) {
                    record.feature_count += 1;
                }
            }
            Section::Origin => {
                record.counted_length +=
                    trimmed_end.chars().filter(|c| c.is_ascii_alphabetic()).count() as u64;
            }
            _ => {}
        }
    }

    // Tolerate a final record without the `//` terminator.
    if let Some(open) = current.take() {
        records.push(open);
    }

    if records.is_empty() {
        return Err(ParseError::Empty("GenBank records"));
    }

    let first = &records[0];
    Ok(GenbankStatsPayload {
        filename: filename.to_string(),
        sequence_count: records.len() as u64,
        main_record_id: first.main_record_id(),
        description: first.description.clone(),
        sequence_length: first.sequence_length(),
        feature_count: first.feature_count,
        molecule_type: first
            .molecule_type
            .clone()
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        topology: first
            .topology
            .clone()
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    })
}
