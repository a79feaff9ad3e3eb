//! # Contracts
//!
//! Frozen interface contracts, defining the data structures and traits shared
//! by the dispatcher, its sinks and the configuration loader.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Records carry local wall-clock time (`chrono::DateTime<Local>`)
//! - Rotation by day compares calendar dates in the same zone

mod config;
mod error;
mod level;
mod record;
mod sink;

pub use config::*;
pub use error::*;
pub use level::LogLevel;
pub use record::*;
pub use sink::*;
