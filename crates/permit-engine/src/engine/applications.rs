//! Permit applications.

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::Utc;
use permit_core::{
  Error, Result,
  application::{Application, ApplicationFilter, ApplicationStatus, NewApplication},
  collaborator::{FileStore, Notification, Notifier},
  error::{ConflictError, ValidationError},
  ids::{EntityKind, IdKind},
  lifecycle::{StatusMachine, check_application_deletable},
  pagination::{Page, PageInfo},
  policy::{Capability, authorize},
  principal::Principal,
  store::PermitStore,
  timeline::{EntryKind, TimelineEntry},
};
use tracing::info;

use super::{Engine, PageParams, describe, required, resolve_owned, scope_owner};
use crate::store_err;

impl<S: PermitStore, N: Notifier> Engine<S, N> {
  async fn load_application(&self, id: &str) -> Result<Application> {
    self
      .store
      .get_application(id.to_owned())
      .await
      .map_err(store_err)?
      .ok_or_else(|| Error::not_found(EntityKind::Application, id))
  }

  async fn owned_application(&self, actor: &Principal, id: &str) -> Result<Application> {
    let found = self
      .store
      .get_application(id.to_owned())
      .await
      .map_err(store_err)?;
    resolve_owned(actor, found, |a| a.owner_id, EntityKind::Application, id)
  }

  /// Submit a new application owned by `actor`.
  #[tracing::instrument(skip_all, fields(actor = %actor.principal_id))]
  pub async fn submit_application(
    &self,
    actor: &Principal,
    input: NewApplication,
  ) -> Result<Application> {
    authorize(actor, Capability::Authenticated)?;
    let route_from = required("route_from", &input.route_from)?;
    let route_to = required("route_to", &input.route_to)?;

    let now = Utc::now();
    let status = ApplicationStatus::INITIAL;
    let seed = TimelineEntry::new(
      EntryKind::Transition,
      ApplicationStatus::SEED_LABEL,
      describe(EntityKind::Application, ApplicationStatus::SEED_LABEL),
      now,
    )
    .by(actor.principal_id);

    let application = self
      .insert_allocated(
        IdKind::Application,
        |application_id| Application {
          application_id,
          owner_id: actor.principal_id,
          status,
          route_from: route_from.clone(),
          route_to: route_to.clone(),
          fields: input.fields.clone(),
          uploaded_files: BTreeMap::new(),
          timeline: vec![seed.clone()],
          created_at: now,
          updated_at: now,
        },
        |application| self.store.insert_application(application),
      )
      .await?;

    info!(application_id = %application.application_id, "application submitted");
    self
      .notify(Notification::ApplicationSubmitted {
        application_id: application.application_id.clone(),
        owner_id:       application.owner_id,
      })
      .await;
    Ok(application)
  }

  pub async fn get_application(&self, actor: &Principal, id: &str) -> Result<Application> {
    self.owned_application(actor, id).await
  }

  /// Operators only ever see their own applications.
  pub async fn list_applications(
    &self,
    actor: &Principal,
    mut filter: ApplicationFilter,
    params: PageParams,
  ) -> Result<Page<Application>> {
    filter.owner_id = scope_owner(actor, filter.owner_id)?;
    let req = self.page_request(params)?;

    let total = self
      .store
      .count_applications(filter.clone())
      .await
      .map_err(store_err)?;
    let pagination = PageInfo::compute(req, total)?;
    let items = self
      .store
      .list_applications(filter, req.skip(), req.limit)
      .await
      .map_err(store_err)?;
    Ok(Page { items, pagination })
  }

  /// Move an application through its lifecycle. Requesting `edited` records
  /// an annotation and leaves the status as it was.
  #[tracing::instrument(skip_all, fields(actor = %actor.principal_id, %id, %requested))]
  pub async fn transition_application(
    &self,
    actor: &Principal,
    id: &str,
    requested: ApplicationStatus,
    comment: Option<String>,
  ) -> Result<Application> {
    authorize(actor, Capability::Admin)?;
    let application = self.load_application(id).await?;

    let from = application.status;
    let next = self.apply_status(actor, id, from, requested, comment).await?;

    if next != from {
      info!(%from, to = %next, "application status changed");
      self
        .notify(Notification::StatusChanged {
          kind:     EntityKind::Application,
          id:       id.to_owned(),
          owner_id: Some(application.owner_id),
          status:   next.to_string(),
        })
        .await;
    }
    self.load_application(id).await
  }

  pub async fn comment_application(
    &self,
    actor: &Principal,
    id: &str,
    text: &str,
  ) -> Result<Application> {
    authorize(actor, Capability::Admin)?;
    let application = self.load_application(id).await?;
    self
      .append_comment(actor, EntityKind::Application, id, application.status.as_ref(), text)
      .await?;
    self.load_application(id).await
  }

  /// Merge `patch` into the submitted fields and record an `edited`
  /// annotation, in one write.
  #[tracing::instrument(skip_all, fields(actor = %actor.principal_id, %id))]
  pub async fn edit_application(
    &self,
    actor: &Principal,
    id: &str,
    patch: serde_json::Map<String, serde_json::Value>,
    comment: Option<String>,
  ) -> Result<Application> {
    authorize(actor, Capability::Admin)?;
    let application = self.load_application(id).await?;
    if patch.is_empty() {
      return Err(ValidationError::missing("fields").into());
    }
    application.status.check(ApplicationStatus::Edited)?;

    let now = Utc::now();
    let label = ApplicationStatus::Edited.as_ref();
    let entry = TimelineEntry::new(
      EntryKind::Annotation,
      label,
      describe(EntityKind::Application, label),
      now,
    )
    .with_comment(comment)
    .by(actor.principal_id);

    let updated = self
      .store
      .merge_application_fields(id.to_owned(), patch, entry, now)
      .await
      .map_err(store_err)?;
    if !updated {
      return Err(Error::not_found(EntityKind::Application, id));
    }

    info!("application edited");
    self.load_application(id).await
  }

  /// Delete an application that has not been approved yet.
  #[tracing::instrument(skip_all, fields(actor = %actor.principal_id, %id))]
  pub async fn delete_application(&self, actor: &Principal, id: &str) -> Result<()> {
    let application = self.owned_application(actor, id).await?;
    check_application_deletable(application.status)?;

    let deleted = self
      .store
      .delete_application(id.to_owned(), application.status.as_ref().to_owned())
      .await
      .map_err(store_err)?;
    if !deleted {
      return Err(
        ConflictError::ConcurrentUpdate { kind: EntityKind::Application, id: id.to_owned() }.into(),
      );
    }

    info!("application deleted");
    Ok(())
  }

  /// Store a document with `files` and record its reference under `slot`.
  #[tracing::instrument(skip_all, fields(actor = %actor.principal_id, %id, %slot))]
  pub async fn attach_application_document<F: FileStore>(
    &self,
    actor: &Principal,
    files: &F,
    id: &str,
    slot: &str,
    bytes: Bytes,
  ) -> Result<Application> {
    let application = self.owned_application(actor, id).await?;
    let slot = required("slot", slot)?;
    if bytes.is_empty() {
      return Err(ValidationError::missing("file").into());
    }

    let reference = files
      .put(format!("applications/{id}/{slot}"), bytes)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;

    let attached = self
      .store
      .attach_file(EntityKind::Application, id.to_owned(), slot, reference, Utc::now())
      .await
      .map_err(store_err)?;
    if !attached {
      return Err(
        ConflictError::ConcurrentUpdate { kind: EntityKind::Application, id: id.to_owned() }.into(),
      );
    }
    self.load_application(id).await
  }
}
