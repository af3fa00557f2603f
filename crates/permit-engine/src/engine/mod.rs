//! The [`Engine`] service: every registry operation, gated by the access
//! policy and persisted through a [`PermitStore`].
//!
//! Operations are grouped by entity in the submodules. Each one authorises,
//! then validates, and only then writes. Role-gated operations check the role
//! before touching the store; owner-gated ones load the entity and answer a
//! non-administrator the same way whether it is missing or someone else's.

mod accounts;
mod applications;
mod stats;
mod vehicles;
mod violations;

use std::{future::Future, sync::Arc};

use chrono::Utc;
use permit_core::{
  Error, Result,
  collaborator::{Notification, Notifier},
  error::{AuthzError, ConflictError, ValidationError},
  ids::{EntityKind, IdKind},
  lifecycle::StatusMachine,
  pagination::{PageLimits, PageRequest},
  policy::{Capability, authorize},
  principal::{Principal, Role},
  store::{PermitStore, StoreError, UniqueField},
  timeline::{EntryKind, TimelineEntry},
};
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

pub use accounts::{NewAccount, NewOfficer};
pub use stats::{DashboardStats, RegistryTotals, StatusCounts};

use crate::{
  allocator::{DEFAULT_MAX_ATTEMPTS, IdAllocator},
  auth::Authenticator,
  notify::LogNotifier,
  store_err,
};

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
  pub page_limits:             PageLimits,
  pub allocation_max_attempts: u32,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      page_limits:             PageLimits::default(),
      allocation_max_attempts: DEFAULT_MAX_ATTEMPTS,
    }
  }
}

/// Raw `page` / `limit` parameters as a caller supplied them.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
  pub page:  Option<u32>,
  pub limit: Option<u32>,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct Engine<S, N = LogNotifier> {
  store:     Arc<S>,
  notifier:  N,
  auth:      Authenticator,
  allocator: IdAllocator,
  limits:    PageLimits,
}

impl<S: PermitStore> Engine<S> {
  pub fn new(store: Arc<S>, auth: Authenticator, config: EngineConfig) -> Self {
    Self {
      store,
      notifier: LogNotifier,
      auth,
      allocator: IdAllocator::new(config.allocation_max_attempts),
      limits: config.page_limits,
    }
  }
}

impl<S: PermitStore, N: Notifier> Engine<S, N> {
  pub fn with_notifier<M: Notifier>(self, notifier: M) -> Engine<S, M> {
    Engine {
      store: self.store,
      notifier,
      auth: self.auth,
      allocator: self.allocator,
      limits: self.limits,
    }
  }

  pub fn with_allocator(mut self, allocator: IdAllocator) -> Self {
    self.allocator = allocator;
    self
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn authenticator(&self) -> &Authenticator { &self.auth }

  pub fn page_limits(&self) -> PageLimits { self.limits }

  fn page_request(&self, params: PageParams) -> Result<PageRequest> {
    Ok(PageRequest::resolve(params.page, params.limit, self.limits)?)
  }

  /// Deliver `notification`, logging rather than surfacing a failure.
  async fn notify(&self, notification: Notification) {
    if let Err(e) = self.notifier.notify(notification.clone()).await {
      warn!(error = %e, ?notification, "notification delivery failed");
    }
  }

  /// Allocate an identifier of `kind`, build the entity around it, and
  /// insert it. A taken candidate and an insert that loses a race on the
  /// identifier column each spend one attempt from the allocator's budget.
  async fn insert_allocated<T, B, I, Fut>(&self, kind: IdKind, build: B, insert: I) -> Result<T>
  where
    T: Clone,
    B: Fn(String) -> T,
    I: Fn(T) -> Fut,
    Fut: Future<Output = Result<(), S::Error>>,
  {
    let field = UniqueField::for_id(kind);

    for attempt in 1..=self.allocator.max_attempts() {
      let Some(id) = self.allocator.try_candidate(&*self.store, kind).await? else {
        continue;
      };
      let entity = build(id.clone());
      match insert(entity.clone()).await {
        Ok(()) => return Ok(entity),
        Err(e) if e.unique_violation() == Some(field) => {
          debug!(%kind, %id, attempt, "identifier claimed concurrently; reallocating");
        }
        Err(e) => return Err(conflict(e)),
      }
    }

    warn!(%kind, attempts = self.allocator.max_attempts(), "identifier allocation exhausted");
    Err(ConflictError::AllocationExhausted(kind).into())
  }

  /// Move an entity from `current` towards `requested` per its transition
  /// table, or record an annotation if the table says so. Returns the status
  /// the entity holds afterwards.
  async fn apply_status<M: StatusMachine>(
    &self,
    actor: &Principal,
    id: &str,
    current: M,
    requested: M,
    comment: Option<String>,
  ) -> Result<M> {
    let next = current.check(requested)?;
    let now = Utc::now();
    let label = requested.as_ref();
    let kind = if M::is_annotation(requested) {
      EntryKind::Annotation
    } else {
      EntryKind::Transition
    };
    let entry = TimelineEntry::new(kind, label, describe(M::ENTITY, label), now)
      .with_comment(comment)
      .by(actor.principal_id);

    let applied = match kind {
      EntryKind::Annotation => {
        self
          .store
          .append_annotation(M::ENTITY, id.to_owned(), entry, now)
          .await
      }
      EntryKind::Transition => {
        self
          .store
          .apply_transition(
            M::ENTITY,
            id.to_owned(),
            current.as_ref().to_owned(),
            next.as_ref().to_owned(),
            entry,
            now,
          )
          .await
      }
    }
    .map_err(store_err)?;

    if !applied {
      return Err(ConflictError::ConcurrentUpdate { kind: M::ENTITY, id: id.to_owned() }.into());
    }
    Ok(next)
  }

  /// Append a free-text comment to an entity's timeline.
  async fn append_comment(
    &self,
    actor: &Principal,
    kind: EntityKind,
    id: &str,
    current_label: &str,
    text: &str,
  ) -> Result<()> {
    let text = required("comment", text)?;
    let now = Utc::now();
    let entry = TimelineEntry::new(EntryKind::Annotation, current_label, "Comment added", now)
      .with_comment(Some(text))
      .by(actor.principal_id);

    let applied = self
      .store
      .append_annotation(kind, id.to_owned(), entry, now)
      .await
      .map_err(store_err)?;
    if !applied {
      return Err(Error::not_found(kind, id));
    }
    Ok(())
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Map a store error, turning a unique violation into a duplicate conflict.
fn conflict<E: StoreError>(e: E) -> Error {
  match e.unique_violation() {
    Some(field) => ConflictError::Duplicate(field.to_string()).into(),
    None => store_err(e),
  }
}

/// Trimmed, non-empty text or a missing-field error.
fn required(field: &str, value: &str) -> Result<String, ValidationError> {
  let value = value.trim();
  if value.is_empty() {
    return Err(ValidationError::missing(field));
  }
  Ok(value.to_owned())
}

/// Gate an owner-scoped entity on [`Capability::OwnerOrAdmin`]. Only
/// administrators learn that an entity is missing.
fn resolve_owned<T>(
  actor: &Principal,
  found: Option<T>,
  owner: impl Fn(&T) -> Uuid,
  kind: EntityKind,
  id: &str,
) -> Result<T> {
  match found {
    Some(entity) => {
      authorize(actor, Capability::OwnerOrAdmin(owner(&entity)))?;
      Ok(entity)
    }
    None if actor.role == Role::Admin => Err(Error::not_found(kind, id)),
    None => Err(
      AuthzError::Denied { required: Capability::OwnerOrAdmin(Uuid::nil()).to_string() }.into(),
    ),
  }
}

/// The owner filter a listing runs with: forced to the caller for operators,
/// as requested for administrators.
fn scope_owner(actor: &Principal, requested: Option<Uuid>) -> Result<Option<Uuid>> {
  match actor.role {
    Role::Admin => Ok(requested),
    Role::Operator => Ok(Some(actor.principal_id)),
    Role::Officer => {
      authorize(actor, Capability::Admin)?;
      Ok(requested)
    }
  }
}

/// Timeline description, e.g. `Application under review`.
fn describe(kind: EntityKind, label: &str) -> String {
  let entity = kind.to_string();
  let mut chars = entity.chars();
  let entity = match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  };
  format!("{entity} {}", label.replace('_', " "))
}
