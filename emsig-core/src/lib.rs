//! Shared primitives and traits for the emsig gene-set similarity workspace.
//!
//! `emsig-core` provides the foundation that the other emsig crates build on:
//!
//! - **Error types** — [`EmsigError`] and [`Result`] for structured error handling
//! - **Traits** — [`Scored`], [`Annotated`], [`Summarizable`]

pub mod error;
pub mod traits;

pub use error::{EmsigError, Result};
pub use traits::*;
