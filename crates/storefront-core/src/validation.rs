//! # Validation Module
//!
//! Input validation for catalog operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Frontend form (React)                                        │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Request handler → storefront-catalog                         │
//! │  └── THIS MODULE: product codes, review input, limits                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Document store                                               │
//! │  └── Unique (collection, _id)                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::rating::ReviewScore;
use crate::types::NewReview;
use crate::{MAX_RELATED_LIMIT, MAX_REVIEW_TEXT_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a product code and returns it trimmed.
///
/// ## Rules
/// - Must not be empty
/// - At most 64 characters
/// - Letters, digits, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use storefront_core::validation::validate_product_code;
///
/// assert_eq!(validate_product_code(" TSHIRT-001 ").unwrap(), "TSHIRT-001");
/// assert!(validate_product_code("").is_err());
/// assert!(validate_product_code("has space").is_err());
/// ```
pub fn validate_product_code(code: &str) -> ValidationResult<&str> {
    validate_code("productCode", code)
}

/// Validates a combo code and returns it trimmed.
pub fn validate_combo_code(code: &str) -> ValidationResult<&str> {
    validate_code("comboCode", code)
}

/// Accepts any non-blank product code and returns it untouched.
///
/// Codes already in the store were not necessarily created through
/// [`validate_product_code`], so reads, reviews and rating recomputes
/// address them exactly as stored. The format rules only gate new products.
///
/// ```rust
/// use storefront_core::validation::require_product_code;
///
/// assert_eq!(require_product_code("Summer Tee").unwrap(), "Summer Tee");
/// assert!(require_product_code("  ").is_err());
/// ```
pub fn require_product_code(code: &str) -> ValidationResult<&str> {
    require_code("productCode", code)
}

/// Combo counterpart of [`require_product_code`].
pub fn require_combo_code(code: &str) -> ValidationResult<&str> {
    require_code("comboCode", code)
}

fn require_code<'a>(field: &str, code: &'a str) -> ValidationResult<&'a str> {
    if code.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(code)
}

fn validate_code<'a>(field: &str, code: &'a str) -> ValidationResult<&'a str> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if code.len() > 64 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 64,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(code)
}

/// Validates a review before it is stored.
///
/// ## Rules
/// - Product code must not be blank (existence is checked against the store)
/// - Score between 1 and 5
/// - Reviewer name required
/// - Text at most [`MAX_REVIEW_TEXT_LEN`] characters
pub fn validate_new_review(review: &NewReview) -> ValidationResult<()> {
    require_product_code(&review.product_code)?;

    if ReviewScore::new(review.rating).is_none() {
        return Err(ValidationError::OutOfRange {
            field: "rating".to_string(),
            min: i64::from(ReviewScore::MIN),
            max: i64::from(ReviewScore::MAX),
        });
    }

    if review.name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if review.text.chars().count() > MAX_REVIEW_TEXT_LEN {
        return Err(ValidationError::TooLong {
            field: "text".to_string(),
            max: MAX_REVIEW_TEXT_LEN,
        });
    }

    Ok(())
}

/// Normalizes a related-products limit: capped at [`MAX_RELATED_LIMIT`].
pub fn clamp_related_limit(limit: usize) -> usize {
    limit.min(MAX_RELATED_LIMIT)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn review(rating: i64) -> NewReview {
        NewReview {
            product_code: "TSHIRT-001".to_string(),
            rating,
            text: "Fits well".to_string(),
            name: "Ada".to_string(),
            verified: true,
        }
    }

    #[test]
    fn test_validate_product_code() {
        assert!(validate_product_code("TSHIRT-001").is_ok());
        assert!(validate_product_code("combo_2").is_ok());

        assert!(validate_product_code("").is_err());
        assert!(validate_product_code("   ").is_err());
        assert!(validate_product_code("a/b").is_err());
        assert!(validate_product_code(&"A".repeat(65)).is_err());
    }

    #[test]
    fn test_require_product_code_keeps_stored_form() {
        assert_eq!(require_product_code("Summer Tee"), Ok("Summer Tee"));
        assert_eq!(require_product_code(" padded "), Ok(" padded "));
        let long = "A".repeat(80);
        assert_eq!(require_product_code(&long), Ok(long.as_str()));

        assert_eq!(
            require_product_code(" \t"),
            Err(ValidationError::Required {
                field: "productCode".to_string()
            })
        );
        assert!(require_combo_code("").is_err());
    }

    #[test]
    fn test_validate_new_review() {
        assert!(validate_new_review(&review(1)).is_ok());
        assert!(validate_new_review(&review(5)).is_ok());

        assert_eq!(
            validate_new_review(&review(0)),
            Err(ValidationError::OutOfRange {
                field: "rating".to_string(),
                min: 1,
                max: 5
            })
        );

        let mut loose_code = review(3);
        loose_code.product_code = "Summer Tee".to_string();
        assert!(validate_new_review(&loose_code).is_ok());

        let mut nameless = review(4);
        nameless.name = " ".to_string();
        assert!(validate_new_review(&nameless).is_err());

        let mut essay = review(4);
        essay.text = "x".repeat(MAX_REVIEW_TEXT_LEN + 1);
        assert!(validate_new_review(&essay).is_err());
    }

    #[test]
    fn test_clamp_related_limit() {
        assert_eq!(clamp_related_limit(4), 4);
        assert_eq!(clamp_related_limit(0), 0);
        assert_eq!(clamp_related_limit(1000), MAX_RELATED_LIMIT);
    }
}
