// docsift - PDF outline extraction and chunk relevance ranking
pub mod config;
pub mod error;
pub mod outline;
pub mod ranking;
pub mod types;

pub use error::DocsiftError;
pub use types::{DocumentChunk, Label, OutlineNode, Prediction, RankedResult, ScoreBreakdown, Span};
