//! Core types, symbol storage, and configuration for lazyload.
//!
//! This crate provides the foundational data structures used across all
//! lazyload crates:
//! - [`types`] — Files, symbols, references, call edges, and error types
//! - [`store`] — The [`IndexStore`](store::IndexStore) trait for symbol persistence
//! - [`sqlite`] — SQLite-backed implementation of `IndexStore`
//! - [`config`] — Configuration loading from `.lazyload/config.json`
//! - [`hash`] — Deterministic content checksums (base62 of xxhash64)
//! - [`typeinfo`] — Cross-language type normalization and match predicates

pub mod config;
pub mod hash;
pub mod sqlite;
pub mod sqlite_helpers;
pub mod sqlite_markov;
pub mod sqlite_queries;
pub mod store;
pub mod typeinfo;
pub mod types;
