//! Format parsers for uploaded bioinformatics files.
//!
//! Every parser is a pure function from a buffered text stream to a typed
//! payload: no database access, no side effects. That keeps them unit
//! testable in isolation and trivially parallelizable across jobs.

pub mod fasta;
pub mod fastq;
pub mod genbank;
pub mod gff;

use std::collections::BTreeMap;
use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ParseError;

/// The analysis formats the pipeline knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisFormat {
    FastaCount,
    FastaGcContent,
    FastqStats,
    GenbankStats,
    GffStats,
}

impl AnalysisFormat {
    pub const ALL: [AnalysisFormat; 5] = [
        AnalysisFormat::FastaCount,
        AnalysisFormat::FastaGcContent,
        AnalysisFormat::FastqStats,
        AnalysisFormat::GenbankStats,
        AnalysisFormat::GffStats,
    ];

    /// Canonical snake_case form, used in the database and status responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisFormat::FastaCount => "fasta_count",
            AnalysisFormat::FastaGcContent => "fasta_gc_content",
            AnalysisFormat::FastqStats => "fastq_stats",
            AnalysisFormat::GenbankStats => "genbank_stats",
            AnalysisFormat::GffStats => "gff_stats",
        }
    }
}

impl fmt::Display for AnalysisFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A format string that did not match any known analysis format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown analysis format: '{0}'")]
pub struct UnknownFormat(pub String);

impl FromStr for AnalysisFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fasta_count" => Ok(AnalysisFormat::FastaCount),
            "fasta_gc_content" => Ok(AnalysisFormat::FastaGcContent),
            "fastq_stats" => Ok(AnalysisFormat::FastqStats),
            "genbank_stats" => Ok(AnalysisFormat::GenbankStats),
            "gff_stats" => Ok(AnalysisFormat::GffStats),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

// ─── Payloads ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastaCountPayload {
    pub sequence_count: u64,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastaGcPayload {
    pub filename: String,
    pub sequence_count: u64,
    pub average_gc_content: f64,
    pub individual_gc_contents: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastqStatsPayload {
    pub filename: String,
    pub sequence_count: u64,
    pub avg_sequence_length: f64,
    pub min_length: u64,
    pub max_length: u64,
    pub overall_avg_quality: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenbankStatsPayload {
    pub filename: String,
    pub sequence_count: u64,
    pub main_record_id: String,
    pub description: String,
    pub sequence_length: u64,
    pub feature_count: u64,
    pub molecule_type: String,
    pub topology: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GffStatsPayload {
    pub filename: String,
    pub feature_counts: BTreeMap<String, u64>,
}

/// Failure descriptor persisted as the payload of a best-effort error
/// record, so failed jobs stay visible in a strain's analysis history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error_kind: String,
    pub error_message: String,
    pub analysis_type: String,
    pub bucket: String,
    pub key: String,
    pub strain_id: i64,
}

/// One variant per analysis type plus the failure descriptor. Serializes
/// untagged: the JSON shape is the inner struct alone, and the stored
/// `analysis_type` column carries the tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisPayload {
    FastaCount(FastaCountPayload),
    FastaGc(FastaGcPayload),
    FastqStats(FastqStatsPayload),
    GenbankStats(GenbankStatsPayload),
    GffStats(GffStatsPayload),
    Error(ErrorPayload),
}

/// Stored type string for failure records.
pub const ERROR_ANALYSIS_TYPE: &str = "analysis_error";

impl AnalysisPayload {
    /// The type string recorded alongside this payload.
    pub fn analysis_type(&self) -> &'static str {
        match self {
            AnalysisPayload::FastaCount(_) => AnalysisFormat::FastaCount.as_str(),
            AnalysisPayload::FastaGc(_) => AnalysisFormat::FastaGcContent.as_str(),
            AnalysisPayload::FastqStats(_) => AnalysisFormat::FastqStats.as_str(),
            AnalysisPayload::GenbankStats(_) => AnalysisFormat::GenbankStats.as_str(),
            AnalysisPayload::GffStats(_) => AnalysisFormat::GffStats.as_str(),
            AnalysisPayload::Error(_) => ERROR_ANALYSIS_TYPE,
        }
    }
}

/// Runs the parser matching `format` against the stream.
pub fn parse_stream(
    format: AnalysisFormat,
    reader: impl BufRead,
    filename: &str,
) -> Result<AnalysisPayload, ParseError> {
    match format {
        AnalysisFormat::FastaCount => fasta::count(reader, filename).map(AnalysisPayload::FastaCount),
        AnalysisFormat::FastaGcContent => {
            fasta::gc_content(reader, filename).map(AnalysisPayload::FastaGc)
        }
        AnalysisFormat::FastqStats => fastq::stats(reader, filename).map(AnalysisPayload::FastqStats),
        AnalysisFormat::GenbankStats => {
            genbank::stats(reader, filename).map(AnalysisPayload::GenbankStats)
        }
        AnalysisFormat::GffStats => gff::stats(reader, filename).map(AnalysisPayload::GffStats),
    }
}

/// Rounds to two decimal places, the precision all payload statistics use.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
