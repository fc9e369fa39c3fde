//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and geometric helpers
//! - Time management (frame timer, fixed tick cadence, tweens)
//! - Logging utilities

pub mod math;
pub mod time;
pub mod logging;
