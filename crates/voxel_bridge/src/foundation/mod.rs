//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Rotation math
//! - Deadline timers for the dispatcher
//! - Logging setup

pub mod math;
pub mod time;
pub mod logging;
