//! Output shaping for tool responses.
//!
//! Every tool answers in one of two modes:
//! - **markdown** (default): human-readable sections
//! - **compact**: tab-separated tables with sanitized newlines, enforced
//!   against a per-tool byte budget
//!
//! Token estimation for bundling tools lives behind [`token_budget::TokenEstimator`]
//! so a real tokenizer can replace the chars/4 approximation.

pub mod compact;
pub mod markdown;
pub mod token_budget;

/// The response shape a tool was asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Markdown,
    Compact,
}

impl OutputFormat {
    pub fn from_str(s: Option<&str>) -> Self {
        match s {
            Some("compact") => OutputFormat::Compact,
            _ => OutputFormat::Markdown,
        }
    }
}
