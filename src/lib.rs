// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # triplewalk
//!
//! Random-walk corpus generation over an in-memory triple store, for
//! training knowledge-graph embeddings.
//!
//! ## Architecture
//!
//! - **Triple store** (`graph`): subject/predicate/object indices over interned terms, plus RDF ingestion
//! - **Entity selection** (`select`): full, subset and resumable selectors
//! - **Walk sampling** (`walk`): random, duplicate-free, mid and weighted-mid walks
//! - **Worker pool** (`pool`): rayon workers feeding a single gzip walk writer
//! - **Engine** (`engine`): wires a [`config::WalkConfig`] to all of the above
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use triplewalk::config::WalkConfig;
//! use triplewalk::engine::WalkEngine;
//! use triplewalk::graph::index::TripleStore;
//!
//! let store = TripleStore::new();
//! store.add("http://ex.org/A", "http://ex.org/p", "http://ex.org/B");
//! store.add("http://ex.org/B", "http://ex.org/q", "http://ex.org/C");
//!
//! let engine = WalkEngine::new(WalkConfig::default(), Arc::new(store)).unwrap();
//! let summary = engine.run().unwrap();
//! println!("{summary}");
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod pool;
pub mod select;
pub mod walk;
