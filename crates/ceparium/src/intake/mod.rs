//! Upload validation: filename, size, and extension checks applied before
//! anything touches the object store or the queue.

use crate::error::IntakeError;
use crate::parser::AnalysisFormat;

/// Default upload ceiling, 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

const FASTA_EXTENSIONS: &[&str] = &["fasta", "fa", "fna", "ffn", "faa", "frn"];
const FASTQ_EXTENSIONS: &[&str] = &["fastq", "fq"];
const GENBANK_EXTENSIONS: &[&str] = &["gb", "gbk", "genbank"];
const GFF_EXTENSIONS: &[&str] = &["gff", "gff3"];

/// Lowercased extension of `filename`, without the dot.
fn file_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn extensions_for(format: AnalysisFormat) -> &'static [&'static str] {
    match format {
        AnalysisFormat::FastaCount | AnalysisFormat::FastaGcContent => FASTA_EXTENSIONS,
        AnalysisFormat::FastqStats => FASTQ_EXTENSIONS,
        AnalysisFormat::GenbankStats => GENBANK_EXTENSIONS,
        AnalysisFormat::GffStats => GFF_EXTENSIONS,
    }
}

/// Checks an upload before it is stored: a usable filename, a non-empty
/// body under `max_bytes`, and an extension some analysis can handle.
pub fn validate_upload(filename: &str, size: u64, max_bytes: u64) -> Result<(), IntakeError> {
    if filename.trim().is_empty() {
        return Err(IntakeError::MissingFilename);
    }
    if size == 0 {
        return Err(IntakeError::EmptyFile);
    }
    if size > max_bytes {
        return Err(IntakeError::TooLarge {
            size,
            max: max_bytes,
        });
    }

    let ext = file_extension(filename).ok_or(IntakeError::MissingFilename)?;
    let allowed = AnalysisFormat::ALL
        .iter()
        .any(|format| extensions_for(*format).contains(&ext.as_str()));
    if !allowed {
        return Err(IntakeError::DisallowedExtension(ext));
    }
    Ok(())
}

/// Checks that `filename` matches the family the requested analysis reads.
/// Submitting a FASTQ file for a FASTA analysis is refused here instead of
/// failing later in the parser.
pub fn validate_extension_for(
    format: AnalysisFormat,
    filename: &str,
) -> Result<(), IntakeError> {
    let ext = file_extension(filename).ok_or(IntakeError::MissingFilename)?;
    if !extensions_for(format).contains(&ext.as_str()) {
        return Err(IntakeError::WrongExtension {
            extension: ext,
            format: format.as_str().to_string(),
        });
    }
    Ok(())
}
