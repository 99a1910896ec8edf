//! Core types, collaborator traits, and errors for the disjoin constraint engine.
//!
//! This crate provides the foundational types used across the other disjoin crates:
//! - Linear expressions and constraints over solver variables
//! - The [`ArithmeticSolver`] trait consumed by the disjunction search
//! - Error types

pub mod backend;
pub mod errors;
pub mod types;

pub use backend::*;
pub use errors::*;
pub use types::*;
