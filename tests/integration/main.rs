//! Integration tests for the queue pricing solver.

mod end_to_end;
mod properties;
