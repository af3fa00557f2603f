//! The permit registry service layer.
//!
//! [`Engine`] ties the pieces together: the [`Authenticator`] for sessions,
//! the [`IdAllocator`] for human-readable identifiers, the transition tables
//! and access policy from `permit-core`, and any [`PermitStore`] backend.
//!
//! [`PermitStore`]: permit_core::store::PermitStore

pub mod allocator;
pub mod auth;
mod engine;
pub mod notify;

pub use allocator::{IdAllocator, OsRngSuffix, SuffixSource};
pub use auth::{Authenticator, IssuedToken, hash_password};
pub use engine::{
  DashboardStats, Engine, EngineConfig, NewAccount, NewOfficer, PageParams, RegistryTotals,
  StatusCounts,
};
pub use notify::LogNotifier;

use permit_core::{Error, store::StoreError};

/// Wrap a backend failure.
pub(crate) fn store_err<E: StoreError>(e: E) -> Error { Error::Store(Box::new(e)) }

#[cfg(test)]
mod tests;
