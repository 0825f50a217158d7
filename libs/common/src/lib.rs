//! Shared basic library for ACN host tools
//!
//! Provides the ambient pieces every front-end needs:
//! - logging bootstrap (tracing subscriber with bracketed level format)
//! - layered configuration loading (figment)
//! - hex helpers for frame dumps

pub mod config_loader;
pub mod error;
pub mod hex;
pub mod logging;

pub use error::{Error, Result};
