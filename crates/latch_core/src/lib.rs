//! Latch Engine Core
//!
//! Contains the fundamental runtime building blocks:
//! - Job scheduler (fixed worker pool)
//! - Frame timing
//! - Cross-thread value publication

pub mod jobs;
pub mod sync;
pub mod time;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
