//! nairgen Core Library
//!
//! Page registry, configuration, and error handling shared by the nairgen
//! generator and CLI.

pub mod config;
pub mod error;
pub mod page;

pub use config::{BuildConfig, Config, FallbackMode, MARKER_FILE};
pub use error::{CoreError, Result};
pub use page::{PageSpec, default_pages};
