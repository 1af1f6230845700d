//! Core domain models for workload execution
//!
//! This module defines steps, files, events, the execution aggregate and the
//! context threaded through executables.

pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod execution;
pub mod file;
pub mod step;

pub use context::*;
pub use error::*;
pub use event::*;
pub use execution::*;
pub use file::*;
pub use step::*;
