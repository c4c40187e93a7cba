//! Data models for the Fitlog application
//!
//! These types are storage-agnostic: the backend maps them to rows, the API
//! layer maps them to request/response bodies.

use crate::errors::ValidationError;
use crate::validation::{
    validate_calorie_goal, validate_email, validate_max_len, validate_measure,
    validate_required_text,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

pub const EMAIL_MAX_LEN: usize = 255;
pub const USERNAME_MAX_LEN: usize = 50;
pub const FULL_NAME_MAX_LEN: usize = 100;
pub const HASHED_PASSWORD_MAX_LEN: usize = 255;
pub const REFRESH_TOKEN_MAX_LEN: usize = 512;
pub const ROUTINE_NAME_MAX_LEN: usize = 100;

/// Value of `is_active` when a new user omits it
pub const DEFAULT_IS_ACTIVE: bool = true;
/// Value of `is_verified` when a new user omits it
pub const DEFAULT_IS_VERIFIED: bool = false;

// ============================================================================
// Enumerated fields
// ============================================================================

/// Gender as recorded on the profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

    /// Stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "MALE",
            Gender::Female => "FEMALE",
            Gender::Other => "OTHER",
        }
    }
}

impl FromStr for Gender {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| ValidationError::invalid_value("gender", s))
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Self-reported activity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityLevel {
    /// Little or no exercise
    Sedentary,
    /// Light exercise 1-3 days/week
    LightlyActive,
    /// Moderate exercise 3-5 days/week
    ModeratelyActive,
    /// Hard exercise 6-7 days/week
    VeryActive,
    /// Very hard exercise, physical job
    ExtraActive,
}

impl ActivityLevel {
    pub const ALL: [ActivityLevel; 5] = [
        ActivityLevel::Sedentary,
        ActivityLevel::LightlyActive,
        ActivityLevel::ModeratelyActive,
        ActivityLevel::VeryActive,
        ActivityLevel::ExtraActive,
    ];

    /// Stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "SEDENTARY",
            ActivityLevel::LightlyActive => "LIGHTLY_ACTIVE",
            ActivityLevel::ModeratelyActive => "MODERATELY_ACTIVE",
            ActivityLevel::VeryActive => "VERY_ACTIVE",
            ActivityLevel::ExtraActive => "EXTRA_ACTIVE",
        }
    }
}

impl FromStr for ActivityLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| ValidationError::invalid_value("activity_level", s))
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// User
// ============================================================================

/// User account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub is_active: bool,
    pub is_verified: bool,

    pub full_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub activity_level: Option<ActivityLevel>,

    pub target_weight_kg: Option<f64>,
    pub daily_calorie_goal: Option<i32>,

    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// Materialize a new record from validated input.
    ///
    /// Omitted flags take their defaults; `updated_at` starts out empty.
    pub fn from_new(id: i32, new: NewUser, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            email: new.email,
            username: new.username,
            hashed_password: new.hashed_password,
            is_active: new.is_active.unwrap_or(DEFAULT_IS_ACTIVE),
            is_verified: new.is_verified.unwrap_or(DEFAULT_IS_VERIFIED),
            full_name: new.full_name,
            date_of_birth: new.date_of_birth,
            gender: new.gender,
            height_cm: new.height_cm,
            weight_kg: new.weight_kg,
            activity_level: new.activity_level,
            target_weight_kg: new.target_weight_kg,
            daily_calorie_goal: new.daily_calorie_goal,
            bio: new.bio,
            created_at,
            updated_at: None,
        }
    }

    /// Apply a patch in place. Fields absent from `changes` are untouched.
    pub fn apply(&mut self, changes: UserChanges) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }

        set(&mut self.email, changes.email);
        set(&mut self.username, changes.username);
        set(&mut self.hashed_password, changes.hashed_password);
        set(&mut self.is_active, changes.is_active);
        set(&mut self.is_verified, changes.is_verified);
        set(&mut self.full_name, changes.full_name);
        set(&mut self.date_of_birth, changes.date_of_birth);
        set(&mut self.gender, changes.gender);
        set(&mut self.height_cm, changes.height_cm);
        set(&mut self.weight_kg, changes.weight_kg);
        set(&mut self.activity_level, changes.activity_level);
        set(&mut self.target_weight_kg, changes.target_weight_kg);
        set(&mut self.daily_calorie_goal, changes.daily_calorie_goal);
        set(&mut self.bio, changes.bio);
        if let Some(at) = changes.updated_at {
            self.updated_at = Some(at);
        }
    }
}

/// Input for creating a user
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub hashed_password: String,
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
    pub full_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub activity_level: Option<ActivityLevel>,
    pub target_weight_kg: Option<f64>,
    pub daily_calorie_goal: Option<i32>,
    pub bio: Option<String>,
}

impl NewUser {
    /// Minimal registration payload; every optional field left empty
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        hashed_password: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            hashed_password: hashed_password.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_email(&self.email)?;
        validate_required_text("username", &self.username, USERNAME_MAX_LEN)?;
        validate_required_text(
            "hashed_password",
            &self.hashed_password,
            HASHED_PASSWORD_MAX_LEN,
        )?;
        validate_profile(
            self.full_name.as_deref(),
            self.height_cm,
            self.weight_kg,
            self.target_weight_kg,
            self.daily_calorie_goal,
        )
    }
}

/// Partial update of a user.
///
/// Required columns use `Option<T>` (absent = unchanged). Nullable columns
/// use `Option<Option<T>>`: `None` leaves the column alone, `Some(None)`
/// clears it, `Some(Some(v))` sets it. `updated_at` is written only when
/// the caller provides it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub email: Option<String>,
    pub username: Option<String>,
    pub hashed_password: Option<String>,
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
    pub full_name: Option<Option<String>>,
    pub date_of_birth: Option<Option<NaiveDate>>,
    pub gender: Option<Option<Gender>>,
    pub height_cm: Option<Option<f64>>,
    pub weight_kg: Option<Option<f64>>,
    pub activity_level: Option<Option<ActivityLevel>>,
    pub target_weight_kg: Option<Option<f64>>,
    pub daily_calorie_goal: Option<Option<i32>>,
    pub bio: Option<Option<String>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserChanges {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(username) = &self.username {
            validate_required_text("username", username, USERNAME_MAX_LEN)?;
        }
        if let Some(hashed) = &self.hashed_password {
            validate_required_text("hashed_password", hashed, HASHED_PASSWORD_MAX_LEN)?;
        }
        validate_profile(
            self.full_name.as_ref().and_then(|v| v.as_deref()),
            self.height_cm.flatten(),
            self.weight_kg.flatten(),
            self.target_weight_kg.flatten(),
            self.daily_calorie_goal.flatten(),
        )
    }

    /// Stamp the update time. The store never does this on its own.
    pub fn touched_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = Some(at);
        self
    }
}

fn validate_profile(
    full_name: Option<&str>,
    height_cm: Option<f64>,
    weight_kg: Option<f64>,
    target_weight_kg: Option<f64>,
    daily_calorie_goal: Option<i32>,
) -> Result<(), ValidationError> {
    if let Some(name) = full_name {
        validate_max_len("full_name", name, FULL_NAME_MAX_LEN)?;
    }
    for (field, value) in [
        ("height_cm", height_cm),
        ("weight_kg", weight_kg),
        ("target_weight_kg", target_weight_kg),
    ] {
        if let Some(value) = value {
            validate_measure(field, value)?;
        }
    }
    if let Some(calories) = daily_calorie_goal {
        validate_calorie_goal(calories)?;
    }
    Ok(())
}

// ============================================================================
// Related records
// ============================================================================

/// Refresh token owned by a user. Never outlives its user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: i32,
    pub user_id: i32,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for storing a refresh token issued elsewhere
#[derive(Debug, Clone, PartialEq)]
pub struct NewRefreshToken {
    pub user_id: i32,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl NewRefreshToken {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_required_text("token", &self.token, REFRESH_TOKEN_MAX_LEN)
    }
}

/// Workout routine. Survives deletion of its user with `user_id` cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRoutine {
    pub id: i32,
    pub user_id: Option<i32>,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a workout routine
#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkoutRoutine {
    pub user_id: i32,
    pub name: String,
    pub description: Option<String>,
}

impl NewWorkoutRoutine {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_required_text("name", &self.name, ROUTINE_NAME_MAX_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("MALE", Gender::Male)]
    #[case("FEMALE", Gender::Female)]
    #[case("OTHER", Gender::Other)]
    fn test_gender_round_trips_through_stored_form(#[case] raw: &str, #[case] gender: Gender) {
        assert_eq!(raw.parse::<Gender>().unwrap(), gender);
        assert_eq!(gender.to_string(), raw);
    }

    #[rstest]
    #[case("male")]
    #[case("ROBOT")]
    #[case("")]
    fn test_gender_rejects_unknown_values(#[case] raw: &str) {
        let err = raw.parse::<Gender>().unwrap_err();
        assert_eq!(err, ValidationError::invalid_value("gender", raw));
    }

    #[test]
    fn test_activity_level_parses_every_variant() {
        for level in ActivityLevel::ALL {
            assert_eq!(level.as_str().parse::<ActivityLevel>().unwrap(), level);
        }
        let err = "HYPERACTIVE".parse::<ActivityLevel>().unwrap_err();
        assert_eq!(err.field(), "activity_level");
    }

    #[test]
    fn test_enum_serde_uses_stored_form() {
        let json = serde_json::to_string(&ActivityLevel::ModeratelyActive).unwrap();
        assert_eq!(json, "\"MODERATELY_ACTIVE\"");
        let gender: Gender = serde_json::from_str("\"OTHER\"").unwrap();
        assert_eq!(gender, Gender::Other);
    }

    #[test]
    fn test_from_new_applies_defaults() {
        let now = Utc::now();
        let user = User::from_new(1, NewUser::new("a@x.com", "a", "h"), now);

        assert!(user.is_active);
        assert!(!user.is_verified);
        assert_eq!(user.created_at, now);
        assert_eq!(user.updated_at, None);
        assert_eq!(user.full_name, None);
        assert_eq!(user.gender, None);
        assert_eq!(user.activity_level, None);
        assert_eq!(user.daily_calorie_goal, None);
    }

    #[test]
    fn test_from_new_keeps_explicit_flags() {
        let new = NewUser {
            is_active: Some(false),
            is_verified: Some(true),
            ..NewUser::new("a@x.com", "a", "h")
        };
        let user = User::from_new(1, new, Utc::now());
        assert!(!user.is_active);
        assert!(user.is_verified);
    }

    #[test]
    fn test_new_user_requires_core_fields() {
        assert!(NewUser::new("a@x.com", "a", "h").validate().is_ok());
        assert_eq!(
            NewUser::new("a@x.com", "", "h").validate(),
            Err(ValidationError::required("username"))
        );
        assert_eq!(
            NewUser::new("a@x.com", "a", " ").validate(),
            Err(ValidationError::required("hashed_password"))
        );
        assert_eq!(
            NewUser::new("", "a", "h").validate(),
            Err(ValidationError::required("email"))
        );
    }

    #[test]
    fn test_new_user_rejects_long_full_name() {
        let new = NewUser {
            full_name: Some("x".repeat(FULL_NAME_MAX_LEN + 1)),
            ..NewUser::new("a@x.com", "a", "h")
        };
        assert!(matches!(
            new.validate(),
            Err(ValidationError::TooLong { max: FULL_NAME_MAX_LEN, .. })
        ));
    }

    #[test]
    fn test_apply_sets_and_clears_nullable_fields() {
        let mut user = User::from_new(1, NewUser::new("a@x.com", "a", "h"), Utc::now());

        user.apply(UserChanges {
            gender: Some(Some(Gender::Female)),
            height_cm: Some(Some(168.5)),
            ..Default::default()
        });
        assert_eq!(user.gender, Some(Gender::Female));
        assert_eq!(user.height_cm, Some(168.5));

        user.apply(UserChanges {
            gender: Some(None),
            ..Default::default()
        });
        assert_eq!(user.gender, None);
        // Untouched by the second patch
        assert_eq!(user.height_cm, Some(168.5));
    }

    #[test]
    fn test_apply_does_not_stamp_updated_at() {
        let mut user = User::from_new(1, NewUser::new("a@x.com", "a", "h"), Utc::now());
        user.apply(UserChanges {
            bio: Some(Some("lifting".to_string())),
            ..Default::default()
        });
        assert_eq!(user.updated_at, None);

        let at = Utc::now();
        user.apply(UserChanges::default().touched_at(at));
        assert_eq!(user.updated_at, Some(at));
    }

    #[test]
    fn test_changes_validate_only_present_fields() {
        assert!(UserChanges::default().validate().is_ok());
        let clear = UserChanges {
            height_cm: Some(None),
            ..Default::default()
        };
        assert!(clear.validate().is_ok());
        let bad = UserChanges {
            email: Some("nope".to_string()),
            ..Default::default()
        };
        assert_eq!(bad.validate().unwrap_err().field(), "email");
    }

    #[test]
    fn test_hashed_password_is_never_serialized() {
        let user = User::from_new(7, NewUser::new("a@x.com", "a", "secret-hash"), Utc::now());
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("hashed_password").is_none());
        assert_eq!(json["email"], "a@x.com");
    }
}
