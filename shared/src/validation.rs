//! Input validation functions
//!
//! Field-level checks applied to user, token and routine records before
//! they are written. Each check names the field it rejects so the API can
//! point the caller at it.

use crate::errors::ValidationError;
use validator::ValidateEmail;

/// Reject empty or whitespace-only values for a required field
pub fn validate_required(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

/// Reject values longer than the column allows (counted in characters)
pub fn validate_max_len(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Required, bounded string column
pub fn validate_required_text(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    validate_required(field, value)?;
    validate_max_len(field, value, max)
}

/// Validate email format and length
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    validate_required_text("email", email, crate::models::EMAIL_MAX_LEN)?;
    if !email.validate_email() {
        return Err(ValidationError::invalid_format(
            "email",
            "Invalid email format",
        ));
    }
    Ok(())
}

/// Body measures (height, weight, target weight) must be finite and positive
pub fn validate_measure(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_nan() || value.is_infinite() {
        return Err(ValidationError::invalid_format(
            field,
            "must be a valid number",
        ));
    }
    if value <= 0.0 {
        return Err(ValidationError::invalid_format(field, "must be positive"));
    }
    Ok(())
}

/// Validate daily calorie goal
pub fn validate_calorie_goal(calories: i32) -> Result<(), ValidationError> {
    if calories <= 0 {
        return Err(ValidationError::invalid_format(
            "daily_calorie_goal",
            "must be positive",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("test@example.com", true)]
    #[case("user.name@domain.co.uk", true)]
    #[case("a@x.com", true)]
    #[case("", false)]
    #[case("   ", false)]
    #[case("invalid", false)]
    #[case("spaces in@email.com", false)]
    fn test_validate_email(#[case] email: &str, #[case] valid: bool) {
        assert_eq!(validate_email(email).is_ok(), valid, "email: {email:?}");
    }

    #[test]
    fn test_validate_email_too_long() {
        let email = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(
            validate_email(&email),
            Err(ValidationError::TooLong { max: 255, .. })
        ));
    }

    #[test]
    fn test_validate_required() {
        assert!(validate_required("username", "a").is_ok());
        assert_eq!(
            validate_required("username", " \t"),
            Err(ValidationError::required("username"))
        );
    }

    #[test]
    fn test_validate_max_len_counts_characters() {
        // 50 multi-byte characters still fit a 50 character column
        let name = "é".repeat(50);
        assert!(validate_max_len("username", &name, 50).is_ok());
        assert!(validate_max_len("username", &format!("{name}a"), 50).is_err());
    }

    #[test]
    fn test_validate_measure() {
        assert!(validate_measure("height_cm", 170.0).is_ok());
        assert!(validate_measure("weight_kg", 0.5).is_ok());
        assert!(validate_measure("weight_kg", 0.0).is_err());
        assert!(validate_measure("weight_kg", -3.0).is_err());
        assert!(validate_measure("height_cm", f64::NAN).is_err());
        assert!(validate_measure("height_cm", f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_calorie_goal() {
        assert!(validate_calorie_goal(2000).is_ok());
        assert!(validate_calorie_goal(0).is_err());
        assert!(validate_calorie_goal(-100).is_err());
    }

    proptest! {
        #[test]
        fn prop_positive_finite_measures_are_valid(value in 0.001f64..10_000.0) {
            prop_assert!(validate_measure("weight_kg", value).is_ok());
        }

        #[test]
        fn prop_error_names_the_field(field in "[a-z_]{1,20}") {
            let err = validate_required(&field, "").unwrap_err();
            prop_assert_eq!(err.field(), field.as_str());
        }
    }
}
