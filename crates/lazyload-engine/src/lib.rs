//! Indexing and query engine for lazyload.
//!
//! - [`indexer`] — walk, parse, checksum-gate, persist; incremental sync
//! - [`synonyms`] — weighted query expansion and result reranking
//! - [`markov`] — relationship-chain builders and the random-walk suggester
//! - [`tools`] — the thirteen assistant-visible query operations
//! - [`governor`] — per-session budgets, novelty tracking, response caching

pub mod governor;
pub mod indexer;
pub mod markov;
pub mod synonyms;
pub mod synonyms_builtin;
pub mod tools;
