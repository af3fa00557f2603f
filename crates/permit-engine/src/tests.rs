//! End-to-end tests for `Engine` over an in-memory `SqliteStore`.

use std::{
  collections::HashSet,
  convert::Infallible,
  sync::{Arc, Mutex},
};

use bytes::Bytes;
use permit_core::{
  Error,
  application::{ApplicationFilter, ApplicationStatus, NewApplication},
  collaborator::{FileStore, Notification, Notifier},
  error::{AuthError, AuthzError, ConflictError, TransitionError, ValidationError},
  ids::IdKind,
  principal::{Principal, PrincipalPool, PrincipalStatus, Profile, Role},
  timeline::{EntryKind, current_status},
  vehicle::{NewVehicle, VehicleDetails, VehicleDetailsPatch, VehicleFilter, VehicleStatus},
  violation::{NewViolation, ViolationFilter, ViolationStatus},
};
use permit_store_sqlite::SqliteStore;

use crate::{
  Authenticator, Engine, EngineConfig, IdAllocator, NewAccount, NewOfficer, PageParams,
  SuffixSource, hash_password,
};

const PASSWORD: &str = "Secret123";
const ADMIN_PASSWORD: &str = "Admin1234";

async fn engine() -> Engine<SqliteStore> {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  let auth = Authenticator::new(b"test-secret").expect("authenticator");
  Engine::new(Arc::new(store), auth, EngineConfig::default())
}

fn profile(first: &str) -> Profile {
  Profile {
    first_name: first.into(),
    last_name: "Moyo".into(),
    company_name: Some("Moyo Transport".into()),
    ..Default::default()
  }
}

fn account(email: &str, role: Role) -> NewAccount {
  NewAccount {
    email:    email.into(),
    password: PASSWORD.into(),
    role,
    profile:  profile("Alice"),
  }
}

async fn operator<N: Notifier>(e: &Engine<SqliteStore, N>, email: &str) -> Principal {
  e.register(account(email, Role::Operator)).await.unwrap()
}

async fn admin<N: Notifier>(e: &Engine<SqliteStore, N>) -> Principal {
  let hash = hash_password(ADMIN_PASSWORD).unwrap();
  e.bootstrap_admin("admin@example.com", hash)
    .await
    .unwrap()
    .expect("fresh admin")
}

fn harare_mutare() -> NewApplication {
  NewApplication {
    route_from: "Harare".into(),
    route_to:   "Mutare".into(),
    fields:     Default::default(),
  }
}

fn new_vehicle(registration: &str) -> NewVehicle {
  NewVehicle {
    registration_number: registration.into(),
    details:             VehicleDetails {
      make:                  "Toyota".into(),
      model:                 "Quantum".into(),
      year:                  2019,
      capacity:              14,
      operating_route:       Some("Harare - Mutare".into()),
      driver_name:           None,
      driver_license_number: None,
      driver_license_expiry: None,
      insurance_company:     None,
      insurance_expiry:      None,
      roadworthy_expiry:     None,
    },
  }
}

fn page(page: u32, limit: u32) -> PageParams {
  PageParams { page: Some(page), limit: Some(limit) }
}

fn is_denied(err: &Error) -> bool { matches!(err, Error::Authz(AuthzError::Denied { .. })) }

// ─── Test collaborators ──────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct Recording(Arc<Mutex<Vec<Notification>>>);

impl Notifier for Recording {
  type Error = Infallible;

  async fn notify(&self, notification: Notification) -> Result<(), Infallible> {
    self.0.lock().unwrap().push(notification);
    Ok(())
  }
}

struct Failing;

impl Notifier for Failing {
  type Error = std::io::Error;

  async fn notify(&self, _: Notification) -> Result<(), std::io::Error> {
    Err(std::io::Error::other("mail relay down"))
  }
}

struct MemFiles(Mutex<Vec<String>>);

impl FileStore for MemFiles {
  type Error = Infallible;

  async fn put(&self, key: String, _bytes: Bytes) -> Result<String, Infallible> {
    self.0.lock().unwrap().push(key.clone());
    Ok(format!("mem://{key}"))
  }
}

struct Fixed(u32);

impl SuffixSource for Fixed {
  fn next_suffix(&self) -> u32 { self.0 }
}

// ─── End to end ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn alice_submits_and_admin_approves() {
  let e = engine().await;
  e.register(account("alice@example.com", Role::Operator))
    .await
    .unwrap();

  let (alice, t1) = e
    .login(PrincipalPool::Accounts, "alice@example.com", PASSWORD)
    .await
    .unwrap();
  assert!(alice.last_login.is_some());
  let resolved = e
    .authenticate(PrincipalPool::Accounts, Some(&t1.token))
    .await
    .unwrap();
  assert_eq!(resolved.principal_id, alice.principal_id);

  let app = e.submit_application(&alice, harare_mutare()).await.unwrap();
  assert!(IdKind::Application.matches(&app.application_id));
  assert_eq!(app.status, ApplicationStatus::Pending);

  let second = e.submit_application(&alice, harare_mutare()).await.unwrap();
  assert_ne!(second.application_id, app.application_id);

  admin(&e).await;
  let (admin, _) = e
    .login(PrincipalPool::Accounts, "admin@example.com", ADMIN_PASSWORD)
    .await
    .unwrap();

  let approved = e
    .transition_application(&admin, &app.application_id, ApplicationStatus::Approved, None)
    .await
    .unwrap();
  assert_eq!(approved.status, ApplicationStatus::Approved);
  let labels: Vec<_> = approved.timeline.iter().map(|t| t.status.as_str()).collect();
  assert_eq!(labels, ["submitted", "approved"]);
  assert_eq!(approved.timeline[1].updated_by, Some(admin.principal_id));
}

#[tokio::test]
async fn concurrent_submissions_get_distinct_ids() {
  let e = Arc::new(engine().await);
  let alice = operator(&e, "alice@example.com").await;

  let mut set = tokio::task::JoinSet::new();
  for _ in 0..20 {
    let e = Arc::clone(&e);
    let alice = alice.clone();
    set.spawn(async move { e.submit_application(&alice, harare_mutare()).await });
  }

  let mut ids = HashSet::new();
  while let Some(joined) = set.join_next().await {
    ids.insert(joined.unwrap().unwrap().application_id);
  }
  assert_eq!(ids.len(), 20);
}

#[tokio::test]
async fn exhausted_allocation_is_reported_and_ids_are_never_reused() {
  let e = engine()
    .await
    .with_allocator(IdAllocator::with_source(Arc::new(Fixed(7)), 5));
  let alice = operator(&e, "alice@example.com").await;

  let first = e.submit_application(&alice, harare_mutare()).await.unwrap();
  assert_eq!(first.application_id, "PRM-000007");

  let err = e
    .submit_application(&alice, harare_mutare())
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Conflict(ConflictError::AllocationExhausted(IdKind::Application))
  ));
  assert_eq!(err.kind(), "conflict.allocation_exhausted");

  // The deleted application's id stays reserved.
  e.delete_application(&alice, &first.application_id)
    .await
    .unwrap();
  assert!(e.submit_application(&alice, harare_mutare()).await.is_err());
}

// ─── Authentication ──────────────────────────────────────────────────────────

#[tokio::test]
async fn token_round_trip_and_expiry() {
  let e = engine().await;
  let alice = operator(&e, "alice@example.com").await;
  let auth = e.authenticator();

  let issued = auth.issue_token(&alice).unwrap();
  let resolved = auth
    .validate(e.store(), PrincipalPool::Accounts, Some(&issued.token))
    .await
    .unwrap();
  assert_eq!(resolved.principal_id, alice.principal_id);

  let err = auth
    .validate_at(
      e.store(),
      PrincipalPool::Accounts,
      Some(&issued.token),
      issued.expires_at,
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Auth(AuthError::TokenExpired)));

  let err = auth
    .validate(e.store(), PrincipalPool::Accounts, None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Auth(AuthError::TokenMissing)));

  let err = auth
    .validate(e.store(), PrincipalPool::Accounts, Some("not.a.token"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Auth(AuthError::TokenInvalid)));
}

#[tokio::test]
async fn token_only_resolves_in_its_own_pool() {
  let e = engine().await;
  let alice = operator(&e, "alice@example.com").await;
  let token = e.authenticator().issue_token(&alice).unwrap();

  let err = e
    .authenticate(PrincipalPool::Officers, Some(&token.token))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Auth(AuthError::PrincipalNotFound)));
}

#[tokio::test]
async fn unknown_account_and_wrong_password_look_the_same() {
  let e = engine().await;
  operator(&e, "alice@example.com").await;

  let wrong = e
    .login(PrincipalPool::Accounts, "alice@example.com", "Wrong1234")
    .await
    .unwrap_err();
  let unknown = e
    .login(PrincipalPool::Accounts, "nobody@example.com", PASSWORD)
    .await
    .unwrap_err();
  assert_eq!(wrong.to_string(), unknown.to_string());
  assert!(matches!(wrong, Error::Auth(AuthError::InvalidCredentials)));
  assert!(matches!(unknown, Error::Auth(AuthError::InvalidCredentials)));
}

#[tokio::test]
async fn self_registered_admin_waits_for_activation() {
  let e = engine().await;
  let root = admin(&e).await;
  let pending = e
    .register(account("second@example.com", Role::Admin))
    .await
    .unwrap();
  assert_eq!(pending.status, PrincipalStatus::Pending);

  let err = e
    .login(PrincipalPool::Accounts, "second@example.com", PASSWORD)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Auth(AuthError::AccountInactive)));

  e.set_principal_status(&root, pending.principal_id, PrincipalStatus::Active)
    .await
    .unwrap();
  assert!(
    e.login(PrincipalPool::Accounts, "second@example.com", PASSWORD)
      .await
      .is_ok()
  );
}

#[tokio::test]
async fn registration_validates_input() {
  let e = engine().await;

  let mut weak = account("weak@example.com", Role::Operator);
  weak.password = "password".into();
  assert!(matches!(e.register(weak).await, Err(Error::Validation(_))));

  assert!(matches!(
    e.register(account("not-an-email", Role::Operator)).await,
    Err(Error::Validation(_))
  ));

  assert!(matches!(
    e.register(account("officer@example.com", Role::Officer)).await,
    Err(Error::Validation(_))
  ));

  operator(&e, "alice@example.com").await;
  let err = e
    .register(account("ALICE@example.com", Role::Operator))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Conflict(ConflictError::Duplicate(_))));
}

// ─── Ownership ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn operators_cannot_touch_each_others_applications() {
  let e = engine().await;
  let alice = operator(&e, "alice@example.com").await;
  let bob = operator(&e, "bob@example.com").await;
  let root = admin(&e).await;
  let app = e.submit_application(&alice, harare_mutare()).await.unwrap();

  let read = e.get_application(&bob, &app.application_id).await.unwrap_err();
  let delete = e
    .delete_application(&bob, &app.application_id)
    .await
    .unwrap_err();
  let missing = e.get_application(&bob, "PRM-999999").await.unwrap_err();
  assert!(is_denied(&read));
  assert!(is_denied(&delete));
  assert!(is_denied(&missing));
  assert_eq!(read.to_string(), missing.to_string());

  // Only administrators learn that an id does not exist.
  let err = e.get_application(&root, "PRM-999999").await.unwrap_err();
  assert!(matches!(err, Error::NotFound { .. }));

  // Bob's listing is forced to his own records.
  let listed = e
    .list_applications(
      &bob,
      ApplicationFilter { owner_id: Some(alice.principal_id), ..Default::default() },
      PageParams::default(),
    )
    .await
    .unwrap();
  assert_eq!(listed.pagination.total_items, 0);

  // Nothing changed.
  let still = e.get_application(&alice, &app.application_id).await.unwrap();
  assert_eq!(still.timeline.len(), 1);
}

#[tokio::test]
async fn operators_cannot_review() {
  let e = engine().await;
  let alice = operator(&e, "alice@example.com").await;
  let app = e.submit_application(&alice, harare_mutare()).await.unwrap();

  let err = e
    .transition_application(&alice, &app.application_id, ApplicationStatus::Approved, None)
    .await
    .unwrap_err();
  assert!(is_denied(&err));
  assert_eq!(err.to_string(), "admin access required");
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn invalid_transition_leaves_application_untouched() {
  let e = engine().await;
  let alice = operator(&e, "alice@example.com").await;
  let root = admin(&e).await;
  let app = e.submit_application(&alice, harare_mutare()).await.unwrap();
  let id = app.application_id.as_str();

  e.transition_application(&root, id, ApplicationStatus::Rejected, Some("incomplete".into()))
    .await
    .unwrap();
  let err = e
    .transition_application(&root, id, ApplicationStatus::Approved, None)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Transition(TransitionError::InvalidTransition { .. })
  ));

  let app = e.get_application(&root, id).await.unwrap();
  assert_eq!(app.status, ApplicationStatus::Rejected);
  assert_eq!(app.timeline.len(), 2);
  assert_eq!(app.timeline[1].comment.as_deref(), Some("incomplete"));
}

#[tokio::test]
async fn edits_and_comments_annotate_without_moving_status() {
  let e = engine().await;
  let alice = operator(&e, "alice@example.com").await;
  let root = admin(&e).await;
  let app = e.submit_application(&alice, harare_mutare()).await.unwrap();
  let id = app.application_id.as_str();

  e.transition_application(&root, id, ApplicationStatus::UnderReview, None)
    .await
    .unwrap();
  e.transition_application(&root, id, ApplicationStatus::Edited, None)
    .await
    .unwrap();

  let mut patch = serde_json::Map::new();
  patch.insert("fleet_size".into(), 12.into());
  e.edit_application(&root, id, patch, Some("fleet corrected".into()))
    .await
    .unwrap();
  let app = e.comment_application(&root, id, "awaiting tax clearance").await.unwrap();

  assert_eq!(app.status, ApplicationStatus::UnderReview);
  assert_eq!(app.fields["fleet_size"], 12);
  assert_eq!(current_status(&app.timeline), Some("under_review"));
  let kinds: Vec<_> = app.timeline.iter().map(|t| t.kind).collect();
  assert_eq!(kinds, [
    EntryKind::Transition,
    EntryKind::Transition,
    EntryKind::Annotation,
    EntryKind::Annotation,
    EntryKind::Annotation,
  ]);

  let err = e.comment_application(&root, id, "  ").await.unwrap_err();
  assert!(matches!(err, Error::Validation(ValidationError::MissingField(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_edits_keep_every_field() {
  let e = Arc::new(engine().await);
  let alice = operator(&e, "alice@example.com").await;
  let root = admin(&e).await;
  let app = e.submit_application(&alice, harare_mutare()).await.unwrap();

  let mut set = tokio::task::JoinSet::new();
  for i in 0..20 {
    let e = Arc::clone(&e);
    let root = root.clone();
    let id = app.application_id.clone();
    set.spawn(async move {
      let mut patch = serde_json::Map::new();
      patch.insert(format!("depot_{i}"), i.into());
      e.edit_application(&root, &id, patch, None).await
    });
  }
  while let Some(joined) = set.join_next().await {
    joined.unwrap().unwrap();
  }

  let app = e.get_application(&root, &app.application_id).await.unwrap();
  assert_eq!(app.fields.len(), 20);
  let edits = app.timeline.iter().filter(|t| t.status == "edited").count();
  assert_eq!(edits, 20);
  assert_eq!(app.status, ApplicationStatus::Pending);
}

#[tokio::test]
async fn approved_applications_cannot_be_deleted() {
  let e = engine().await;
  let alice = operator(&e, "alice@example.com").await;
  let root = admin(&e).await;
  let app = e.submit_application(&alice, harare_mutare()).await.unwrap();

  e.transition_application(&root, &app.application_id, ApplicationStatus::Approved, None)
    .await
    .unwrap();
  let err = e
    .delete_application(&alice, &app.application_id)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Transition(TransitionError::CannotDeleteApproved)
  ));
}

// ─── Vehicles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn active_vehicle_cannot_be_deleted_until_taken_off_the_road() {
  let e = engine().await;
  let alice = operator(&e, "alice@example.com").await;
  let root = admin(&e).await;
  let vehicle = e.register_vehicle(&alice, new_vehicle("abc 1234")).await.unwrap();
  let id = vehicle.vehicle_id.as_str();
  assert!(IdKind::Vehicle.matches(id));
  assert_eq!(vehicle.registration_number, "ABC 1234");

  e.transition_vehicle(&root, id, VehicleStatus::Approved, None)
    .await
    .unwrap();
  e.transition_vehicle(&root, id, VehicleStatus::Active, None)
    .await
    .unwrap();

  let err = e.delete_vehicle(&alice, id).await.unwrap_err();
  assert!(matches!(err, Error::Transition(TransitionError::CannotDeleteActive)));
  assert_eq!(err.kind(), "transition.cannot_delete_active");

  e.transition_vehicle(&root, id, VehicleStatus::Approved, None)
    .await
    .unwrap();
  e.delete_vehicle(&alice, id).await.unwrap();
  assert!(matches!(
    e.get_vehicle(&root, id).await,
    Err(Error::NotFound { .. })
  ));
}

#[tokio::test]
async fn registration_numbers_are_unique_after_normalisation() {
  let e = engine().await;
  let alice = operator(&e, "alice@example.com").await;
  e.register_vehicle(&alice, new_vehicle("ABC 1234")).await.unwrap();

  let err = e
    .register_vehicle(&alice, new_vehicle("  abc   1234 "))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Conflict(ConflictError::Duplicate(_))));
  assert_eq!(err.kind(), "conflict.duplicate");
}

#[tokio::test]
async fn vehicle_details_and_documents() {
  let e = engine().await;
  let alice = operator(&e, "alice@example.com").await;
  let vehicle = e.register_vehicle(&alice, new_vehicle("DEF 5678")).await.unwrap();
  let id = vehicle.vehicle_id.as_str();

  let updated = e
    .update_vehicle_details(&alice, id, VehicleDetailsPatch {
      operating_route: Some("Gweru - Masvingo".into()),
      driver_name: Some("Tendai".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(updated.details.driver_name.as_deref(), Some("Tendai"));

  let routed = e
    .list_vehicles(
      &alice,
      VehicleFilter { route: Some("masvingo".into()), ..Default::default() },
      PageParams::default(),
    )
    .await
    .unwrap();
  assert_eq!(routed.pagination.total_items, 1);

  let files = MemFiles(Mutex::new(Vec::new()));
  let attached = e
    .attach_vehicle_document(&alice, &files, id, "insurance", Bytes::from_static(b"%PDF"))
    .await
    .unwrap();
  assert_eq!(
    attached.uploaded_files["insurance"],
    format!("mem://vehicles/{id}/insurance")
  );

  let empty = e
    .update_vehicle_details(&alice, id, VehicleDetailsPatch::default())
    .await
    .unwrap_err();
  assert!(matches!(empty, Error::Validation(_)));
}

// ─── Violations ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn officer_issues_and_admin_settles_a_violation() {
  let e = engine().await;
  let alice = operator(&e, "alice@example.com").await;
  let root = admin(&e).await;
  let vehicle = e.register_vehicle(&alice, new_vehicle("GHI 9012")).await.unwrap();

  let officer = e
    .create_officer(&root, NewOfficer {
      email:    "officer@police.example".into(),
      password: PASSWORD.into(),
      profile:  profile("Tatenda"),
    })
    .await
    .unwrap();
  let badge = officer.badge_number.clone().unwrap();
  assert!(IdKind::Officer.matches(&badge));

  let (officer, _) = e
    .login(PrincipalPool::Officers, &badge.to_lowercase(), PASSWORD)
    .await
    .unwrap();

  let found = e
    .find_vehicle_by_registration(&officer, "ghi 9012")
    .await
    .unwrap();
  assert_eq!(found.vehicle_id, vehicle.vehicle_id);
  assert!(is_denied(
    &e.find_vehicle_by_registration(&alice, "GHI 9012")
      .await
      .unwrap_err()
  ));

  let violation = e
    .issue_violation(&officer, &vehicle.vehicle_id, NewViolation {
      description: "Overloading".into(),
      fine:        5000,
    })
    .await
    .unwrap();
  assert_eq!(violation.status, ViolationStatus::Unpaid);
  assert_eq!(violation.timeline[0].status, "issued");

  assert!(is_denied(
    &e.issue_violation(&alice, &vehicle.vehicle_id, NewViolation {
      description: "x".into(),
      fine:        1,
    })
    .await
    .unwrap_err()
  ));

  let mine = e
    .list_violations(&officer, ViolationFilter::default(), PageParams::default())
    .await
    .unwrap();
  assert_eq!(mine.pagination.total_items, 1);

  let owner_view = e
    .list_violations(
      &alice,
      ViolationFilter { vehicle_id: Some(vehicle.vehicle_id.clone()), ..Default::default() },
      PageParams::default(),
    )
    .await
    .unwrap();
  assert_eq!(owner_view.items[0].violation_id, violation.violation_id);

  let paid = e
    .pay_violation(&root, violation.violation_id, None)
    .await
    .unwrap();
  assert_eq!(paid.status, ViolationStatus::Paid);
  assert!(matches!(
    e.pay_violation(&root, violation.violation_id, None).await,
    Err(Error::Transition(TransitionError::InvalidTransition { .. }))
  ));
}

// ─── Listings ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pagination_is_deterministic_and_bounded() {
  let e = engine().await;
  let alice = operator(&e, "alice@example.com").await;
  for _ in 0..25 {
    e.submit_application(&alice, harare_mutare()).await.unwrap();
  }
  let list = |p: PageParams| e.list_applications(&alice, ApplicationFilter::default(), p);

  let first = list(page(2, 10)).await.unwrap();
  let again = list(page(2, 10)).await.unwrap();
  assert_eq!(first.items, again.items);
  assert_eq!(first.pagination, again.pagination);
  assert_eq!(first.pagination.total_pages, 3);
  assert_eq!(first.pagination.next_page, Some(3));
  assert_eq!(first.pagination.prev_page, Some(1));

  let mut all = HashSet::new();
  for n in 1..=3 {
    for app in list(page(n, 10)).await.unwrap().items {
      assert!(all.insert(app.application_id));
    }
  }
  assert_eq!(all.len(), 25);

  let err = list(page(4, 10)).await.unwrap_err();
  assert!(matches!(
    err,
    Error::PageOutOfRange { requested: 4, total_pages: 3 }
  ));
  assert!(matches!(
    list(page(0, 10)).await,
    Err(Error::Validation(_))
  ));

  let clamped = list(page(1, 500)).await.unwrap();
  assert_eq!(clamped.items.len(), 25);
  assert_eq!(clamped.pagination.total_pages, 1);
}

#[tokio::test]
async fn admin_listings_of_accounts_and_officers() {
  let e = engine().await;
  let root = admin(&e).await;
  let alice = operator(&e, "alice@example.com").await;
  for n in 0..3 {
    e.create_officer(&root, NewOfficer {
      email:    format!("officer{n}@police.example"),
      password: PASSWORD.into(),
      profile:  profile("Officer"),
    })
    .await
    .unwrap();
  }

  let officers = e
    .list_officers(&root, None, None, PageParams::default())
    .await
    .unwrap();
  let badges: Vec<_> = officers
    .items
    .iter()
    .filter_map(|o| o.badge_number.clone())
    .collect();
  let mut sorted = badges.clone();
  sorted.sort();
  assert_eq!(badges, sorted);
  assert_eq!(officers.pagination.total_items, 3);

  let accounts = e
    .list_accounts(&root, Some(Role::Operator), None, None, PageParams::default())
    .await
    .unwrap();
  assert_eq!(accounts.items.len(), 1);
  assert_eq!(accounts.items[0].principal_id, alice.principal_id);

  let bob = e
    .register(NewAccount {
      profile: Profile {
        first_name: "Bob".into(),
        last_name: "Dube".into(),
        company_name: Some("Dube Coaches".into()),
        ..Default::default()
      },
      ..account("bob@example.com", Role::Operator)
    })
    .await
    .unwrap();
  let search = |term: &str| Some(term.to_owned());

  let found = e
    .list_accounts(&root, None, None, search("bob dube"), PageParams::default())
    .await
    .unwrap();
  assert_eq!(found.pagination.total_items, 1);
  assert_eq!(found.items[0].principal_id, bob.principal_id);

  let found = e
    .list_accounts(&root, None, None, search("COACHES"), PageParams::default())
    .await
    .unwrap();
  assert_eq!(found.items[0].principal_id, bob.principal_id);

  // Wildcards in the search text are literal.
  let found = e
    .list_accounts(&root, None, None, search("%"), PageParams::default())
    .await
    .unwrap();
  assert_eq!(found.pagination.total_items, 0);

  let found = e
    .list_officers(&root, None, search(&badges[1].to_lowercase()), PageParams::default())
    .await
    .unwrap();
  assert_eq!(found.pagination.total_items, 1);
  assert_eq!(found.items[0].badge_number.as_deref(), Some(badges[1].as_str()));

  assert!(is_denied(
    &e.list_officers(&alice, None, None, PageParams::default())
      .await
      .unwrap_err()
  ));
}

#[tokio::test]
async fn dashboard_counts_are_scoped_to_the_caller() {
  let e = engine().await;
  let root = admin(&e).await;
  let alice = operator(&e, "alice@example.com").await;
  let bob = operator(&e, "bob@example.com").await;

  let first = e.submit_application(&alice, harare_mutare()).await.unwrap();
  e.submit_application(&alice, harare_mutare()).await.unwrap();
  e.submit_application(&bob, harare_mutare()).await.unwrap();
  e.register_vehicle(&alice, new_vehicle("ABC 1234")).await.unwrap();
  e.transition_application(&root, &first.application_id, ApplicationStatus::Approved, None)
    .await
    .unwrap();

  let mine = e.dashboard_stats(&alice).await.unwrap();
  assert_eq!(mine.applications.total, 2);
  assert_eq!(mine.applications.get("pending"), 1);
  assert_eq!(mine.applications.get("approved"), 1);
  assert!(!mine.applications.by_status.contains_key("edited"));
  assert_eq!(mine.vehicles.total, 1);
  assert_eq!(mine.vehicles.get("pending_approval"), 1);
  assert_eq!(mine.registry, None);

  let all = e.dashboard_stats(&root).await.unwrap();
  assert_eq!(all.applications.total, 3);
  assert_eq!(all.applications.get("pending"), 2);
  let registry = all.registry.expect("admin totals");
  assert_eq!(registry.operators, 2);
  assert_eq!(registry.officers, 0);
  assert_eq!(registry.unpaid_violations, 0);

  let officer = e
    .create_officer(&root, NewOfficer {
      email:    "officer@police.example".into(),
      password: PASSWORD.into(),
      profile:  profile("Officer"),
    })
    .await
    .unwrap();
  assert!(is_denied(&e.dashboard_stats(&officer).await.unwrap_err()));
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[tokio::test]
async fn notifications_follow_state_changes() {
  let recording = Recording::default();
  let e = engine().await.with_notifier(recording.clone());
  let alice = operator(&e, "alice@example.com").await;
  let root = admin(&e).await;
  let app = e.submit_application(&alice, harare_mutare()).await.unwrap();
  e.transition_application(&root, &app.application_id, ApplicationStatus::Approved, None)
    .await
    .unwrap();

  let events = recording.0.lock().unwrap().clone();
  assert!(matches!(events[0], Notification::AccountRegistered { .. }));
  assert!(matches!(events[1], Notification::ApplicationSubmitted { .. }));
  assert!(matches!(
    &events[2],
    Notification::StatusChanged { status, .. } if status == "approved"
  ));
}

#[tokio::test]
async fn failed_notification_does_not_fail_the_operation() {
  let e = engine().await.with_notifier(Failing);
  let alice = operator(&e, "alice@example.com").await;
  assert!(e.submit_application(&alice, harare_mutare()).await.is_ok());
}
