//! Core types and trait definitions for the permit registry.
//!
//! This crate has no HTTP or database dependencies.
//! All other crates depend on it; it holds the transition tables, the access
//! policy, pagination arithmetic, and the collaborator traits.

pub mod application;
pub mod collaborator;
pub mod error;
pub mod ids;
pub mod lifecycle;
pub mod pagination;
pub mod policy;
pub mod principal;
pub mod store;
pub mod timeline;
pub mod vehicle;
pub mod violation;

pub use error::{Error, Result};
