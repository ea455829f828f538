//! FASTQ statistics: read lengths and Phred+33 quality means.

use std::io::BufRead;

use crate::error::ParseError;
use crate::parser::{round2, FastqStatsPayload};

const PHRED_OFFSET: u8 = 33;

fn malformed(record: usize, reason: impl Into<String>) -> ParseError {
    ParseError::Malformed {
        format: "FASTQ",
        record,
        reason: reason.into(),
    }
}

fn read_required_line(
    reader: &mut impl BufRead,
    record: usize,
    what: &str,
) -> Result<String, ParseError> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(malformed(record, format!("truncated record, missing {what} line")));
    }
    Ok(line.trim_end().to_string())
}

/// Collects length and quality statistics over all records. Each record is
/// the standard four lines: `@header`, sequence, `+` separator, quality
/// string of the same length as the sequence.
pub fn stats(mut reader: impl BufRead, filename: &str) -> Result<FastqStatsPayload, ParseError> {
    let mut lengths: Vec<u64> = Vec::new();
    let mut record_quality_means: Vec<f64> = Vec::new();
    let mut record = 0usize;

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let header = line.trim_end();
        if header.is_empty() {
            // Tolerate blank lines between records and at end of file.
            continue;
        }

        record += 1;
        if !header.starts_with('@') {
            return Err(malformed(record, "record header must start with '@'"));
        }

        let sequence = read_required_line(&mut reader, record, "sequence")?;
        let separator = read_required_line(&mut reader, record, "separator")?;
        if !separator.starts_with('+') {
            return Err(malformed(record, "separator line must start with '+'"));
        }
        let quality = read_required_line(&mut reader, record, "quality")?;
        if sequence.len() != quality.len() {
            return Err(malformed(
                record,
                format!(
                    "sequence length {} does not match quality length {}",
                    sequence.len(),
                    quality.len()
                ),
            ));
        }

        lengths.push(sequence.len() as u64);
        if !quality.is_empty() {
            let total: u64 = quality
                .bytes()
                .map(|b| b.saturating_sub(PHRED_OFFSET) as u64)
                .sum();
            record_quality_means.push(total as f64 / quality.len() as f64);
        }
    }

    if lengths.is_empty() {
        return Err(ParseError::Empty("FASTQ records"));
    }

    let avg_length = lengths.iter().sum::<u64>() as f64 / lengths.len() as f64;
    let overall_avg_quality = if record_quality_means.is_empty() {
        0.0
    } else {
        record_quality_means.iter().sum::<f64>() / record_quality_means.len() as f64
    };

    Ok(FastqStatsPayload {
        filename: filename.to_string(),
        sequence_count: lengths.len() as u64,
        avg_sequence_length: round2(avg_length),
        min_length: lengths.iter().copied().min().unwrap_or(0),
        max_length: lengths.iter().copied().max().unwrap_or(0),
        overall_avg_quality: round2(overall_avg_quality),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    // Quality 'I' = Phred 40, '!' = Phred 0.
    fn record(id: &str, seq: &str, qual: &str) -> String {
        format!("@{id}\n{seq}\n+\n{qual}\n")
    }

    #[test]
    fn test_lengths_5_10_15() {
        let input = record("r1", "ACGTA", "IIIII")
            + &record("r2", "ACGTACGTAC", "IIIIIIIIII")
            + &record("r3", "ACGTACGTACGTACG", "IIIIIIIIIIIIIII");
        let payload = stats(Cursor::new(input), "reads.fastq").unwrap();

        assert_eq!(payload.sequence_count, 3);
        assert_eq!(payload.min_length, 5);
        assert_eq!(payload.max_length, 15);
        assert_eq!(payload.avg_sequence_length, 10.0);
        assert_eq!(payload.overall_avg_quality, 40.0);
    }

    #[test]
    fn test_quality_is_mean_of_record_means() {
        // r1 mean = 40, r2 mean = 0; overall = 20.
        let input = record("r1", "AC", "II") + &record("r2", "AC", "!!");
        let payload = stats(Cursor::new(input), "reads.fastq").unwrap();
        assert_eq!(payload.overall_avg_quality, 20.0);
    }

    #[test]
    fn test_zero_records_is_error() {
        let err = stats(Cursor::new("\n\n"), "reads.fastq").unwrap_err();
        assert!(matches!(err, ParseError::Empty(_)));
    }

    #[test]
    fn test_bad_header_is_malformed() {
        let err = stats(Cursor::new("ACGT\nACGT\n+\nIIII\n"), "r.fq").unwrap_err();
        assert!(matches!(err, ParseError::Malformed { record: 1, .. }));
    }

    #[test]
    fn test_bad_separator_is_malformed() {
        let err = stats(Cursor::new("@r1\nACGT\n-\nIIII\n"), "r.fq").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("separator"), "got: {message}");
    }

    #[test]
    fn test_length_mismatch_is_malformed() {
        let err = stats(Cursor::new("@r1\nACGT\n+\nII\n"), "r.fq").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("does not match"), "got: {message}");
    }

    #[test]
    fn test_truncated_record_is_malformed() {
        let err = stats(Cursor::new("@r1\nACGT\n+\n"), "r.fq").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("truncated"), "got: {message}");
    }

    #[test]
    fn test_second_record_number_in_error() {
        let input = record("r1", "AC", "II") + "@r2\nACGT\n+\nII\n";
        let err = stats(Cursor::new(input), "r.fq").unwrap_err();
        assert!(matches!(err, ParseError::Malformed { record: 2, .. }));
    }
}
