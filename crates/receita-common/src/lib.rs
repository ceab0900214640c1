//! Receita Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the registry export tooling.
//!
//! # Overview
//!
//! - **Error Handling**: Common error type and result alias
//! - **Logging**: Centralised `tracing` subscriber setup
//! - **Identifiers**: Helpers for the 8-digit base id and 14-digit full id
//!
//! # Example
//!
//! ```
//! use receita_common::ids;
//!
//! let base = ids::base_id("33.683.111/0002-80").unwrap();
//! assert_eq!(base, "33683111");
//! ```

pub mod error;
pub mod ids;
pub mod logging;

// Re-export commonly used types
pub use error::{ReceitaError, Result};
