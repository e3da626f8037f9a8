//! # WKMP Common Library
//!
//! Shared code for the WKMP quality-control services including:
//! - Event types (QcEvent enum) and the broadcast EventBus
//! - Configuration file discovery
//! - Clock abstraction and timestamp helpers
//! - Human-readable time formatting

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;
pub mod time;

pub use error::{Error, Result};
pub use time::{Clock, ManualClock, SystemClock};
