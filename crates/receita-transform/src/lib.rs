//! Receita Transform Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Join/enrichment engine for the national company registry exports. Turns the
//! bulk export files into one denormalised JSON document per establishment.
//!
//! # Pipeline
//!
//! - **Phase 1**: every auxiliary dataset (registrant base, partners, tax
//!   regimes, lookup tables) is loaded into an embedded ordered key-value
//!   store ([`store::JoinStore`]).
//! - **Phase 2**: the establishment files are streamed; each row is joined
//!   against the store ([`assembler::Assembler`]) and the documents are written
//!   in batches to a [`sink::StorageSink`].
//!
//! # Example
//!
//! ```no_run
//! use receita_transform::{Orchestrator, TransformConfig};
//! use receita_transform::sink::JsonLinesSink;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = TransformConfig::new("./data").with_workers(4);
//!     let sink = Arc::new(JsonLinesSink::new("./out/companies.jsonl"));
//!     let summary = Orchestrator::new(config).run(sink).await?;
//!     println!("{}", summary.summary());
//!     Ok(())
//! }
//! ```

pub mod assembler;
pub mod cast;
pub mod config;
pub mod decode;
pub mod error;
pub mod loader;
pub mod orchestrator;
pub mod privacy;
pub mod progress;
pub mod reader;
pub mod record;
pub mod registry;
pub mod sink;
pub mod store;
pub mod tasks;
pub mod writer;

pub use config::TransformConfig;
pub use error::{Result, TransformError};
pub use orchestrator::{cleanup_stale_stores, Orchestrator, RunSummary};
pub use record::Record;
