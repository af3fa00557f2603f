//! Entity kinds and the human-readable identifier shape.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Number of digits in an allocated identifier suffix.
pub const SUFFIX_WIDTH: usize = 6;

/// Entity kinds that receive an allocated, human-readable identifier.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IdKind {
  Application,
  Vehicle,
  Officer,
}

impl IdKind {
  pub fn prefix(self) -> &'static str {
    match self {
      IdKind::Application => "PRM",
      IdKind::Vehicle => "VEH",
      IdKind::Officer => "OFF",
    }
  }

  /// Render `<PREFIX>-<zero-padded suffix>`.
  pub fn format(self, suffix: u32) -> String {
    format!("{}-{:0width$}", self.prefix(), suffix, width = SUFFIX_WIDTH)
  }

  /// `true` if `candidate` has this kind's prefix followed by exactly
  /// [`SUFFIX_WIDTH`] ASCII digits.
  pub fn matches(self, candidate: &str) -> bool {
    candidate
      .strip_prefix(self.prefix())
      .and_then(|rest| rest.strip_prefix('-'))
      .is_some_and(|digits| {
        digits.len() == SUFFIX_WIDTH && digits.bytes().all(|b| b.is_ascii_digit())
      })
  }
}

/// Every kind of record the registry reports on, including those without an
/// allocated identifier.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
  Principal,
  Officer,
  Application,
  Vehicle,
  Violation,
}
