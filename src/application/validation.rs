//! # Request Validation
//!
//! Checks applied before a request reaches storage.

use crate::application::error::ValidationError;
use crate::domain::value_objects::Page;
use crate::infrastructure::persistence::query::non_blank;

/// Validates optional paging parameters.
///
/// Both absent means no paging. Both present must form a valid [`Page`].
///
/// # Errors
///
/// Returns [`ValidationError`] if only one is set, `take <= 0` or `skip < 0`.
pub fn validate_paging(skip: Option<i64>, take: Option<i64>) -> Result<Option<Page>, ValidationError> {
    match (skip, take) {
        (None, None) => Ok(None),
        (Some(skip), Some(take)) => Ok(Some(Page::new(skip, take)?)),
        (skip, take) => Err(ValidationError::IncompletePaging { skip, take }),
    }
}

/// Validates the account of an aggregated request and its paging.
///
/// # Errors
///
/// Returns [`ValidationError::MissingAccount`] for a blank account, or a
/// paging error.
pub fn validate_aggregated(
    account_id: &Option<String>,
    skip: Option<i64>,
    take: Option<i64>,
) -> Result<(String, Option<Page>), ValidationError> {
    let account = non_blank(account_id).ok_or(ValidationError::MissingAccount)?;
    Ok((account.to_string(), validate_paging(skip, take)?))
}

/// Validates a required identifier.
///
/// # Errors
///
/// Returns [`ValidationError::MissingId`] if `value` is blank.
pub fn require_id<'a>(name: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingId(name));
    }
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::value_objects::PageError;

    #[test]
    fn absent_paging() {
        assert_eq!(validate_paging(None, None).unwrap(), None);
    }

    #[test]
    fn complete_paging() {
        let page = validate_paging(Some(20), Some(10)).unwrap().unwrap();
        assert_eq!(page.skip(), 20);
        assert_eq!(page.take(), 10);
    }

    #[test]
    fn half_paging_is_rejected() {
        assert_eq!(
            validate_paging(Some(1), None).unwrap_err(),
            ValidationError::IncompletePaging { skip: Some(1), take: None }
        );
        assert!(validate_paging(None, Some(5)).is_err());
    }

    #[test]
    fn non_positive_take_is_rejected() {
        assert_eq!(
            validate_paging(Some(0), Some(0)).unwrap_err(),
            ValidationError::Page(PageError::NonPositiveTake(0))
        );
    }

    #[test]
    fn negative_skip_is_rejected() {
        assert_eq!(
            validate_paging(Some(-1), Some(5)).unwrap_err(),
            ValidationError::Page(PageError::NegativeSkip(-1))
        );
    }

    #[test]
    fn aggregated_requires_account() {
        assert_eq!(
            validate_aggregated(&Some("  ".into()), None, None).unwrap_err(),
            ValidationError::MissingAccount
        );
        let (account, page) = validate_aggregated(&Some("A1".into()), Some(0), Some(2)).unwrap();
        assert_eq!(account, "A1");
        assert!(page.is_some());
    }

    #[test]
    fn ids_must_not_be_blank() {
        assert!(require_id("deal id", " ").is_err());
        assert_eq!(require_id("deal id", "D1").unwrap(), "D1");
    }
}
