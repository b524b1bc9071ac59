// Error kinds shared by both pipelines
use thiserror::Error;

/// Failure categories with distinct propagation rules.
///
/// `Configuration` is fatal and aborts the whole run before processing starts.
/// `Input` aborts a single document or chunk file; sibling work continues.
/// `Extraction` and `ScoringDegraded` are recorded and never abort anything.
#[derive(Debug, Error)]
pub enum DocsiftError {
    #[error("input error: {0}")]
    Input(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("extraction warning: {0}")]
    Extraction(String),

    #[error("scoring degraded: {0}")]
    ScoringDegraded(String),
}

impl DocsiftError {
    /// Fatal errors must abort the entire run with a non-zero exit.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DocsiftError::Configuration(_))
    }
}
