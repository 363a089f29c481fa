//! # vegtrend parallel
//!
//! Explicit dependency graphs and their evaluation.
//!
//! This crate provides:
//! - `TaskGraph`: a DAG builder whose nodes are pure tasks over the outputs
//!   of their dependencies
//! - Wave scheduling: nodes grouped into dependency levels
//! - `ProcessingMode`: sequential, rayon-parallel or fixed-pool execution
//!   of each wave

pub mod error;
pub mod graph;
pub mod strategy;

pub use error::GraphError;
pub use graph::{Evaluation, NodeId, TaskGraph};
pub use strategy::{ParallelStrategy, ProcessingMode};
