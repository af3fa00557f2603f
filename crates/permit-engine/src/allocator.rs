//! Human-readable identifier allocation (`PRM-`, `VEH-`, `OFF-`).
//!
//! A candidate is a random zero-padded suffix checked against the store. The
//! existence check is only a fast path: the store's unique index is what
//! settles a race. The engine spends one attempt per candidate, whether the
//! check rejected it or the insert lost a race on it, and reports
//! [`ConflictError::AllocationExhausted`] once `max_attempts` are used up.
//!
//! [`ConflictError::AllocationExhausted`]: permit_core::error::ConflictError::AllocationExhausted

use std::sync::Arc;

use permit_core::{
  Result,
  ids::{IdKind, SUFFIX_WIDTH},
  store::{PermitStore, UniqueField},
};
use rand_core::{OsRng, RngCore as _};
use tracing::debug;

use crate::store_err;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 1000;

/// `10^SUFFIX_WIDTH`: the number of distinct suffixes per kind.
const SUFFIX_SPACE: u32 = 10u32.pow(SUFFIX_WIDTH as u32);

/// Source of random suffixes. Implementations must return values below
/// `10^SUFFIX_WIDTH`; larger values are reduced modulo that bound.
pub trait SuffixSource: Send + Sync {
  fn next_suffix(&self) -> u32;
}

/// Suffixes drawn from the operating system's CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRngSuffix;

impl SuffixSource for OsRngSuffix {
  fn next_suffix(&self) -> u32 {
    // Rejection sampling keeps the distribution uniform.
    let zone = u32::MAX - (u32::MAX % SUFFIX_SPACE);
    loop {
      let n = OsRng.next_u32();
      if n < zone {
        return n % SUFFIX_SPACE;
      }
    }
  }
}

#[derive(Clone)]
pub struct IdAllocator {
  source:       Arc<dyn SuffixSource>,
  max_attempts: u32,
}

impl Default for IdAllocator {
  fn default() -> Self { Self::new(DEFAULT_MAX_ATTEMPTS) }
}

impl IdAllocator {
  pub fn new(max_attempts: u32) -> Self { Self::with_source(Arc::new(OsRngSuffix), max_attempts) }

  pub fn with_source(source: Arc<dyn SuffixSource>, max_attempts: u32) -> Self {
    Self { source, max_attempts: max_attempts.max(1) }
  }

  pub fn max_attempts(&self) -> u32 { self.max_attempts }

  fn candidate(&self, kind: IdKind) -> String {
    kind.format(self.source.next_suffix() % SUFFIX_SPACE)
  }

  /// Draw one candidate and check it against the store. `None` means the
  /// candidate is already taken; the caller owns the attempt budget.
  pub async fn try_candidate<S: PermitStore>(&self, store: &S, kind: IdKind) -> Result<Option<String>> {
    let candidate = self.candidate(kind);
    let taken = store
      .unique_exists(UniqueField::for_id(kind), candidate.clone())
      .await
      .map_err(store_err)?;
    if taken {
      debug!(%kind, %candidate, "identifier already taken");
      return Ok(None);
    }
    Ok(Some(candidate))
  }
}
