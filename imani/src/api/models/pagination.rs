//! Offset pagination for list endpoints.

use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};
use utoipa::IntoParams;

/// Default number of items to return per page.
pub const DEFAULT_LIMIT: i64 = 10;

/// Maximum number of items that can be requested per page.
pub const MAX_LIMIT: i64 = 1000;

/// `skip` and `limit` query parameters.
///
/// Negative `skip` is treated as 0 and `limit` is clamped to `0..=MAX_LIMIT`.
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct Pagination {
    /// Number of items to skip (default: 0)
    #[param(default = 0, minimum = 0)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub skip: Option<i64>,

    /// Maximum number of items to return (default: 10, max: 1000)
    #[param(default = 10, minimum = 0, maximum = 1000)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub limit: Option<i64>,
}

impl Pagination {
    #[inline]
    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    #[inline]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(0, MAX_LIMIT)
    }

    /// Get both skip and limit as a tuple, useful for destructuring.
    #[inline]
    pub fn params(&self) -> (i64, i64) {
        (self.skip(), self.limit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        assert_eq!(Pagination::default().params(), (0, DEFAULT_LIMIT));
    }

    #[test]
    fn clamps_out_of_range_values() {
        let pagination = Pagination {
            skip: Some(-5),
            limit: Some(5000),
        };
        assert_eq!(pagination.params(), (0, MAX_LIMIT));

        let pagination = Pagination {
            skip: Some(3),
            limit: Some(-1),
        };
        assert_eq!(pagination.params(), (3, 0));
    }
}
