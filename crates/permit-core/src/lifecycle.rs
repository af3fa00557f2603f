//! Transition tables for every trackable entity.
//!
//! Each status enum implements [`StatusMachine`]. The engine never changes a
//! status without first asking [`StatusMachine::check`], and the table here is
//! the only place transitions are defined.

use std::{fmt, str::FromStr};

use strum::IntoEnumIterator;

use crate::{
  application::ApplicationStatus,
  error::TransitionError,
  ids::EntityKind,
  vehicle::VehicleStatus,
  violation::ViolationStatus,
};

// ─── Trait ───────────────────────────────────────────────────────────────────

pub trait StatusMachine:
  Copy + Eq + fmt::Debug + fmt::Display + AsRef<str> + FromStr + IntoEnumIterator + Send + Sync + 'static
{
  const ENTITY: EntityKind;
  /// Status assigned on creation.
  const INITIAL: Self;
  /// Label of the seed timeline entry written on creation.
  const SEED_LABEL: &'static str;

  /// The status reached by requesting `requested` while in `self`, or `None`
  /// if the table has no such transition.
  fn next(self, requested: Self) -> Option<Self>;

  /// `true` if requesting this status records an annotation instead of
  /// moving the entity.
  fn is_annotation(_requested: Self) -> bool { false }

  /// Map a timeline label back to the status it implies.
  fn from_label(label: &str) -> Option<Self> {
    if label == Self::SEED_LABEL {
      Some(Self::INITIAL)
    } else {
      label.parse().ok()
    }
  }

  /// Every status an entity can actually be stored in.
  fn stored_statuses() -> impl Iterator<Item = Self> {
    Self::iter().filter(|s| !Self::is_annotation(*s))
  }

  fn check(self, requested: Self) -> Result<Self, TransitionError> {
    self.next(requested).ok_or_else(|| TransitionError::InvalidTransition {
      kind: Self::ENTITY,
      from: self.to_string(),
      to:   requested.to_string(),
    })
  }
}

// ─── Application ─────────────────────────────────────────────────────────────

impl StatusMachine for ApplicationStatus {
  const ENTITY: EntityKind = EntityKind::Application;
  const INITIAL: Self = ApplicationStatus::Pending;
  const SEED_LABEL: &'static str = "submitted";

  fn next(self, requested: Self) -> Option<Self> {
    use ApplicationStatus::*;
    match (self, requested) {
      (Edited, _) => None,
      (from, Edited) => Some(from),
      (Pending, UnderReview) => Some(UnderReview),
      (Pending | UnderReview, Approved) => Some(Approved),
      (Pending | UnderReview, Rejected) => Some(Rejected),
      (Approved, Active) => Some(Active),
      _ => None,
    }
  }

  fn is_annotation(requested: Self) -> bool { requested == ApplicationStatus::Edited }
}

/// Applications past approval are part of the permit record and stay.
pub fn check_application_deletable(status: ApplicationStatus) -> Result<(), TransitionError> {
  match status {
    ApplicationStatus::Approved | ApplicationStatus::Active => {
      Err(TransitionError::CannotDeleteApproved)
    }
    _ => Ok(()),
  }
}

// ─── Vehicle ─────────────────────────────────────────────────────────────────

impl StatusMachine for VehicleStatus {
  const ENTITY: EntityKind = EntityKind::Vehicle;
  const INITIAL: Self = VehicleStatus::PendingApproval;
  const SEED_LABEL: &'static str = "registered";

  fn next(self, requested: Self) -> Option<Self> {
    use VehicleStatus::*;
    match (self, requested) {
      (PendingApproval, UnderReview) => Some(UnderReview),
      (PendingApproval | UnderReview, Approved) => Some(Approved),
      (PendingApproval | UnderReview, Rejected) => Some(Rejected),
      (Approved, Active) => Some(Active),
      // Taking a vehicle off the road so it can be withdrawn.
      (Active, Approved) => Some(Approved),
      _ => None,
    }
  }
}

pub fn check_vehicle_deletable(status: VehicleStatus) -> Result<(), TransitionError> {
  if status == VehicleStatus::Active {
    return Err(TransitionError::CannotDeleteActive);
  }
  Ok(())
}

// ─── Violation ───────────────────────────────────────────────────────────────

impl StatusMachine for ViolationStatus {
  const ENTITY: EntityKind = EntityKind::Violation;
  const INITIAL: Self = ViolationStatus::Unpaid;
  const SEED_LABEL: &'static str = "issued";

  fn next(self, requested: Self) -> Option<Self> {
    match (self, requested) {
      (ViolationStatus::Unpaid, ViolationStatus::Paid) => Some(ViolationStatus::Paid),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn annotations_are_never_stored() {
    let stored: Vec<_> = ApplicationStatus::stored_statuses().collect();
    assert!(!stored.contains(&ApplicationStatus::Edited));
    assert!(stored.contains(&ApplicationStatus::Pending));
    assert_eq!(VehicleStatus::stored_statuses().count(), VehicleStatus::iter().count());
  }

  fn assert_table<M: StatusMachine>(valid: &[(M, M, M)]) {
    for from in M::iter() {
      for requested in M::iter() {
        let expected = valid
          .iter()
          .find(|(f, r, _)| *f == from && *r == requested)
          .map(|(_, _, n)| *n);
        assert_eq!(
          from.next(requested),
          expected,
          "{:?}: {from} -> {requested}",
          M::ENTITY
        );
        match expected {
          Some(n) => assert_eq!(from.check(requested), Ok(n)),
          None => assert!(matches!(
            from.check(requested),
            Err(TransitionError::InvalidTransition { .. })
          )),
        }
      }
    }
  }

  #[test]
  fn application_table_is_exact() {
    use ApplicationStatus::*;
    assert_table(&[
      (Pending, UnderReview, UnderReview),
      (Pending, Approved, Approved),
      (Pending, Rejected, Rejected),
      (UnderReview, Approved, Approved),
      (UnderReview, Rejected, Rejected),
      (Approved, Active, Active),
      (Pending, Edited, Pending),
      (UnderReview, Edited, UnderReview),
      (Approved, Edited, Approved),
      (Rejected, Edited, Rejected),
      (Active, Edited, Active),
    ]);
  }

  #[test]
  fn vehicle_table_is_exact() {
    use VehicleStatus::*;
    assert_table(&[
      (PendingApproval, UnderReview, UnderReview),
      (PendingApproval, Approved, Approved),
      (PendingApproval, Rejected, Rejected),
      (UnderReview, Approved, Approved),
      (UnderReview, Rejected, Rejected),
      (Approved, Active, Active),
      (Active, Approved, Approved),
    ]);
  }

  #[test]
  fn violation_table_is_one_way() {
    use ViolationStatus::*;
    assert_table(&[(Unpaid, Paid, Paid)]);
    assert!(Paid.check(Unpaid).is_err());
  }

  #[test]
  fn edited_is_the_only_annotation() {
    for s in ApplicationStatus::iter() {
      assert_eq!(
        ApplicationStatus::is_annotation(s),
        s == ApplicationStatus::Edited
      );
    }
    assert!(VehicleStatus::iter().all(|s| !VehicleStatus::is_annotation(s)));
  }

  #[test]
  fn seed_label_maps_to_initial() {
    assert_eq!(
      ApplicationStatus::from_label("submitted"),
      Some(ApplicationStatus::Pending)
    );
    assert_eq!(
      VehicleStatus::from_label("registered"),
      Some(VehicleStatus::PendingApproval)
    );
    assert_eq!(
      ViolationStatus::from_label("issued"),
      Some(ViolationStatus::Unpaid)
    );
    assert_eq!(
      ApplicationStatus::from_label("approved"),
      Some(ApplicationStatus::Approved)
    );
  }

  #[test]
  fn deletion_guards() {
    assert_eq!(
      check_vehicle_deletable(VehicleStatus::Active),
      Err(TransitionError::CannotDeleteActive)
    );
    assert!(check_vehicle_deletable(VehicleStatus::Approved).is_ok());
    assert_eq!(
      check_application_deletable(ApplicationStatus::Approved),
      Err(TransitionError::CannotDeleteApproved)
    );
    assert!(check_application_deletable(ApplicationStatus::Rejected).is_ok());
  }
}
