//! Queue pricing — optimal state-dependent prices for a finite queue.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod analysis;
pub mod config;
pub mod model;
pub mod solver;
pub mod storage;
pub mod types;
