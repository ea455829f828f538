//! FASTA parsers: record counting and per-record GC content.

use std::io::BufRead;

use crate::error::ParseError;
use crate::parser::{round2, FastaCountPayload, FastaGcPayload};

/// Streaming reader over FASTA records. Text before the first `>` header is
/// ignored, matching the tolerant behavior of common toolkits; a file with
/// no headers simply yields zero records.
pub(crate) struct RecordReader<R: BufRead> {
    reader: R,
    next_header: Option<String>,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(mut reader: R) -> Result<Self, ParseError> {
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Ok(Self {
                    reader,
                    next_header: None,
                });
            }
            if let Some(header) = line.trim_end().strip_prefix('>') {
                let next_header = Some(header.to_string());
                return Ok(Self {
                    reader,
                    next_header,
                });
            }
        }
    }

    /// Returns the next `(header, sequence)` pair, or `None` at end of input.
    pub fn next_record(&mut self) -> Result<Option<(String, String)>, ParseError> {
        let header = match self.next_header.take() {
            Some(h) => h,
            None => return Ok(None),
        };

        let mut sequence = String::new();
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                break;
            }
            let trimmed = line.trim_end();
            if let Some(next) = trimmed.strip_prefix('>') {
                self.next_header = Some(next.to_string());
                break;
            }
            sequence.push_str(trimmed.trim());
        }

        Ok(Some((header, sequence)))
    }
}

/// Counts FASTA records. Zero records is a valid outcome here; empty uploads
/// are rejected earlier, at intake.
pub fn count(reader: impl BufRead, filename: &str) -> Result<FastaCountPayload, ParseError> {
    let mut records = RecordReader::new(reader)?;
    let mut sequence_count = 0u64;
    while records.next_record()?.is_some() {
        sequence_count += 1;
    }

    Ok(FastaCountPayload {
        sequence_count,
        filename: filename.to_string(),
    })
}

/// Computes per-record GC percentages and their mean. Counting is
/// case-insensitive (sequences are uppercased first); a zero-length record
/// contributes 0.0 rather than dividing by zero.
pub fn gc_content(reader: impl BufRead, filename: &str) -> Result<FastaGcPayload, ParseError> {
    let mut records = RecordReader::new(reader)?;
    let mut gc_contents: Vec<f64> = Vec::new();

    while let Some((_, sequence)) = records.next_record()? {
        let sequence = sequence.to_uppercase();
        let total_bases = sequence.len();
        if total_bases == 0 {
            gc_contents.push(0.0);
            continue;
        }
        let gc = sequence.chars().filter(|&c| c == 'G' || c == 'C').count();
        gc_contents.push(gc as f64 / total_bases as f64 * 100.0);
    }

    if gc_contents.is_empty() {
        return Err(ParseError::Empty("FASTA sequences"));
    }

    let average = gc_contents.iter().sum::<f64>() / gc_contents.len() as f64;

    Ok(FastaGcPayload {
        filename: filename.to_string(),
        sequence_count: gc_contents.len() as u64,
        average_gc_content: round2(average),
        individual_gc_contents: gc_contents.into_iter().map(round2).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse_count(input: &str) -> FastaCountPayload {
        count(Cursor::new(input), "test.fasta").unwrap()
    }

    #[test]
    fn test_count_multi_record() {
        let input = ">seq1\nACGT\nACGT\n>seq2\nGGGG\n>seq3\nTTTT\n";
        assert_eq!(parse_count(input).sequence_count, 3);
    }

    #[test]
    fn test_count_zero_records_is_valid() {
        // No '>' header anywhere: zero records, not an error.
        let payload = parse_count("just some text\n");
        assert_eq!(payload.sequence_count, 0);
        assert_eq!(payload.filename, "test.fasta");
    }

    #[test]
    fn test_count_ignores_leading_text() {
        let input = "; comment line\n>seq1\nACGT\n";
        assert_eq!(parse_count(input).sequence_count, 1);
    }

    #[test]
    fn test_gc_all_gc_is_100() {
        let payload = gc_content(Cursor::new(">a\nGGCC\n>b\nCCGG\n"), "f.fa").unwrap();
        assert_eq!(payload.average_gc_content, 100.0);
        assert_eq!(payload.individual_gc_contents, vec![100.0, 100.0]);
    }

    #[test]
    fn test_gc_all_at_is_0() {
        let payload = gc_content(Cursor::new(">a\nATAT\nTTAA\n"), "f.fa").unwrap();
        assert_eq!(payload.average_gc_content, 0.0);
    }

    #[test]
    fn test_gc_is_case_insensitive() {
        let payload = gc_content(Cursor::new(">a\ngcgc\n"), "f.fa").unwrap();
        assert_eq!(payload.average_gc_content, 100.0);
    }

    #[test]
    fn test_gc_empty_sequence_contributes_zero() {
        let payload = gc_content(Cursor::new(">empty\n>full\nGGGG\n"), "f.fa").unwrap();
        assert_eq!(payload.sequence_count, 2);
        assert_eq!(payload.individual_gc_contents, vec![0.0, 100.0]);
        assert_eq!(payload.average_gc_content, 50.0);
    }

    #[test]
    fn test_gc_zero_records_is_error() {
        let err = gc_content(Cursor::new("no headers here\n"), "f.fa").unwrap_err();
        assert!(matches!(err, ParseError::Empty(_)));
    }

    #[test]
    fn test_gc_rounding() {
        // 1 G out of 3 bases = 33.333...%
        let payload = gc_content(Cursor::new(">a\nGAT\n"), "f.fa").unwrap();
        assert_eq!(payload.individual_gc_contents, vec![33.33]);
        assert_eq!(payload.average_gc_content, 33.33);
    }

    #[test]
    fn test_multiline_sequences_are_joined() {
        let payload = gc_content(Cursor::new(">a\nGG\nCC\nAA\nTT\n"), "f.fa").unwrap();
        assert_eq!(payload.individual_gc_contents, vec![50.0]);
    }
}
