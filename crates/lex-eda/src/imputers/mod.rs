//! Imputation module for handling missing values.
//!
//! This module provides:
//! - Statistical fill primitives (zero, constant label, mean)
//! - The threshold-driven engine that picks one of them per column

mod engine;
mod statistical;

pub use engine::{ImputationEngine, MISSING_LABEL};
pub use statistical::StatisticalImputer;
