//! Report generation on top of the price baselines.
//!
//! Joins today's decoded sell listings with the historical statistics and the
//! item name table, flags discounted and profitable listings, and builds the
//! per-item analysis and presence tables written out by [`crate::output`].

pub mod aggregate;
pub mod analyzer;
pub mod detect;
pub mod types;
pub mod utility;
