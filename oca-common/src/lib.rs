//! # oca Common
//!
//! Shared utilities for the oca crates.
//!
//! ## Logging
//!
//! ```rust,no_run
//! use oca_common::{init_logging, LogFormat};
//!
//! init_logging("info", LogFormat::Pretty).unwrap();
//! ```

pub mod logging;

pub use logging::{init_logging, init_logging_json, init_logging_pretty, LogFormat};
