pub mod runner;

pub use runner::AnalysisPipeline;
