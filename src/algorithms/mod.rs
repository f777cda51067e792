//! Evolutionary algorithms
//!
//! This module provides the GA engine the pipeline runs twice over.

pub mod ga_engine;

pub mod prelude {
    pub use super::ga_engine::*;
}
