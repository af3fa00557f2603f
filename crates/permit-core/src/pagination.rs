//! Page arithmetic for listing endpoints.
//!
//! Pages are 1-based. A request past the last page is an error rather than
//! an empty page, so clients can tell "no more data" from "bad cursor".

use serde::{Deserialize, Serialize};

use crate::error::{Error, ValidationError};

/// Default and maximum page sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLimits {
  pub default_limit: u32,
  pub max_limit:     u32,
}

impl Default for PageLimits {
  fn default() -> Self { Self { default_limit: 10, max_limit: 50 } }
}

/// A validated `(page, limit)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  pub page:  u32,
  pub limit: u32,
}

impl PageRequest {
  /// Resolve raw query parameters. `page` defaults to 1 and must be positive;
  /// `limit` defaults to `limits.default_limit` and is clamped to
  /// `1..=limits.max_limit`.
  pub fn resolve(
    page: Option<u32>,
    limit: Option<u32>,
    limits: PageLimits,
  ) -> Result<Self, ValidationError> {
    let page = page.unwrap_or(1);
    if page == 0 {
      return Err(ValidationError::out_of_range("page", "pages start at 1"));
    }
    let max = limits.max_limit.max(1);
    let limit = limit.unwrap_or(limits.default_limit).clamp(1, max);
    Ok(Self { page, limit })
  }

  /// Number of items preceding this page.
  pub fn skip(&self) -> u64 { u64::from(self.page - 1) * u64::from(self.limit) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
  pub current_page: u32,
  pub total_pages:  u32,
  pub total_items:  u64,
  pub has_next:     bool,
  pub has_prev:     bool,
  pub next_page:    Option<u32>,
  pub prev_page:    Option<u32>,
}

impl PageInfo {
  /// Compute page metadata for `total_items` matching rows.
  ///
  /// Fails with [`Error::PageOutOfRange`] when the requested page lies past
  /// the last page and there is at least one item. An empty listing answers
  /// any page with page 1 of 1.
  pub fn compute(req: PageRequest, total_items: u64) -> Result<Self, Error> {
    let limit = u64::from(req.limit.max(1));
    let total_pages = total_items.div_ceil(limit).max(1);
    let total_pages = u32::try_from(total_pages).unwrap_or(u32::MAX);

    if total_items > 0 && req.page > total_pages {
      return Err(Error::PageOutOfRange { requested: req.page, total_pages });
    }

    // Only an empty listing gets here with a page past the end; it reports
    // its single empty page.
    let current_page = req.page.min(total_pages);
    let has_next = current_page < total_pages;
    let has_prev = current_page > 1;
    Ok(Self {
      current_page,
      total_pages,
      total_items,
      has_next,
      has_prev,
      next_page: has_next.then(|| current_page + 1),
      prev_page: has_prev.then(|| current_page - 1),
    })
  }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
  pub items:      Vec<T>,
  pub pagination: PageInfo,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn req(page: u32, limit: u32) -> PageRequest { PageRequest { page, limit } }

  #[test]
  fn resolve_defaults_and_clamps() {
    let limits = PageLimits::default();
    assert_eq!(PageRequest::resolve(None, None, limits).unwrap(), req(1, 10));
    assert_eq!(PageRequest::resolve(Some(3), Some(500), limits).unwrap(), req(3, 50));
    assert_eq!(PageRequest::resolve(Some(2), Some(0), limits).unwrap(), req(2, 1));
    assert!(PageRequest::resolve(Some(0), None, limits).is_err());
  }

  #[test]
  fn skip_is_zero_based_offset() {
    assert_eq!(req(1, 10).skip(), 0);
    assert_eq!(req(3, 10).skip(), 20);
  }

  #[test]
  fn middle_page_has_both_neighbours() {
    let info = PageInfo::compute(req(2, 10), 25).unwrap();
    assert_eq!(info.total_pages, 3);
    assert!(info.has_next && info.has_prev);
    assert_eq!(info.next_page, Some(3));
    assert_eq!(info.prev_page, Some(1));
  }

  #[test]
  fn last_page_has_no_next() {
    let info = PageInfo::compute(req(3, 10), 25).unwrap();
    assert!(!info.has_next);
    assert_eq!(info.next_page, None);
    assert_eq!(info.prev_page, Some(2));
  }

  #[test]
  fn empty_listing_is_one_page() {
    let info = PageInfo::compute(req(1, 10), 0).unwrap();
    assert_eq!(info.total_pages, 1);
    assert_eq!(info.total_items, 0);
    assert!(!info.has_next && !info.has_prev);
  }

  #[test]
  fn empty_listing_clamps_navigation_to_page_one() {
    let info = PageInfo::compute(req(5, 10), 0).unwrap();
    assert_eq!(info.current_page, 1);
    assert_eq!(info.total_pages, 1);
    assert!(!info.has_prev && !info.has_next);
    assert_eq!(info.prev_page, None);
    assert_eq!(info.next_page, None);
  }

  #[test]
  fn past_last_page_is_rejected() {
    let err = PageInfo::compute(req(4, 10), 25).unwrap_err();
    assert!(matches!(
      err,
      Error::PageOutOfRange { requested: 4, total_pages: 3 }
    ));
  }

  #[test]
  fn exact_multiple_does_not_add_a_page() {
    let info = PageInfo::compute(req(2, 10), 20).unwrap();
    assert_eq!(info.total_pages, 2);
    assert!(PageInfo::compute(req(3, 10), 20).is_err());
  }
}
