//! Core domain models
//!
//! This module defines the data structures that describe pipelines and the
//! artifacts one run of the engine produces.

pub mod run;
pub mod spec;

pub use run::*;
pub use spec::*;
