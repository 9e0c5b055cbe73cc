//! Relationship chains and the random-walk suggestion engine.
//!
//! Four chains are built from the indexed graph and persisted as normalized
//! transition tables:
//! - `call_flow` — function → function, weighted by call counts
//! - `cooccurrence` — symbols referenced in the same file (or function)
//! - `type_affinity` — type base names sharing a function signature
//! - `import_cluster` — files importing overlapping targets
//!
//! Queries run a bounded breadth-first walk with per-hop decay and per-chain
//! weights, aggregating scores across chains.

pub mod builders;
pub mod query;

pub use builders::build_all_chains;
pub use query::{suggest, SuggestOptions, SuggestResult, Suggestion};
