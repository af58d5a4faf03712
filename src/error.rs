//! Error types for the mover summary pipeline.
//!
//! Each collaborator call maps its failure into the variant for its stage so
//! the boundary in [`crate::pipeline`] can log exactly which step failed before
//! falling back to the generic error summary.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Condensation error: {0}")]
    Condensation(String),

    #[error("Summarization error: {0}")]
    Summarization(String),

    #[error("Aggregation error: {0}")]
    Aggregation(String),
}

impl PipelineError {
    /// Short stage label for structured logs.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Io(_) => "io",
            PipelineError::Json(_) => "json",
            PipelineError::InvalidSymbol(_) => "input",
            PipelineError::Extraction(_) => "extraction",
            PipelineError::Condensation(_) => "condensation",
            PipelineError::Summarization(_) => "summarization",
            PipelineError::Aggregation(_) => "aggregation",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_labels() {
        assert_eq!(PipelineError::Summarization("x".into()).stage(), "summarization");
        let io = PipelineError::from(std::io::Error::other("disk"));
        assert_eq!(io.stage(), "io");
        assert_eq!(io.to_string(), "IO error: disk");
    }
}
