//! API request and response types

use crate::errors::ValidationError;
use crate::models::{
    ActivityLevel, Gender, NewUser, User, UserChanges, WorkoutRoutine,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Pagination parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    pub const MAX_PER_PAGE: u32 = 100;

    /// Rows to fetch, clamped to `1..=MAX_PER_PAGE`
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page.clamp(1, Self::MAX_PER_PAGE))
    }

    /// Rows to skip; pages are 1-based
    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * self.limit()
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[aliases(UserPage = PaginatedResponse<UserResponse>)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: u64, pagination: &Pagination) -> Self {
        let per_page = pagination.limit() as u32;
        Self {
            data,
            total,
            page: pagination.page.max(1),
            per_page,
            total_pages: total.div_ceil(u64::from(per_page)) as u32,
        }
    }
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

// ============================================================================
// User Types
// ============================================================================

/// Create user request
///
/// Required fields default to empty so that a missing field is reported as
/// a validation error naming that field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub hashed_password: String,
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
    pub full_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    /// One of MALE, FEMALE, OTHER
    pub gender: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    /// One of SEDENTARY, LIGHTLY_ACTIVE, MODERATELY_ACTIVE, VERY_ACTIVE, EXTRA_ACTIVE
    pub activity_level: Option<String>,
    pub target_weight_kg: Option<f64>,
    pub daily_calorie_goal: Option<i32>,
    pub bio: Option<String>,
}

impl TryFrom<CreateUserRequest> for NewUser {
    type Error = ValidationError;

    fn try_from(req: CreateUserRequest) -> Result<Self, Self::Error> {
        Ok(NewUser {
            gender: req.gender.as_deref().map(str::parse::<Gender>).transpose()?,
            activity_level: req
                .activity_level
                .as_deref()
                .map(str::parse::<ActivityLevel>)
                .transpose()?,
            email: req.email,
            username: req.username,
            hashed_password: req.hashed_password,
            is_active: req.is_active,
            is_verified: req.is_verified,
            full_name: req.full_name,
            date_of_birth: req.date_of_birth,
            height_cm: req.height_cm,
            weight_kg: req.weight_kg,
            target_weight_kg: req.target_weight_kg,
            daily_calorie_goal: req.daily_calorie_goal,
            bio: req.bio,
        })
    }
}

/// Partial user update request.
///
/// For nullable fields an explicit `null` clears the value, while leaving
/// the key out keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub hashed_password: Option<String>,
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub full_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub date_of_birth: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub gender: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub height_cm: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub weight_kg: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub activity_level: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub target_weight_kg: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub daily_calorie_goal: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub bio: Option<Option<String>>,
}

/// Distinguishes a present `null` from a missing key
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl TryFrom<UpdateUserRequest> for UserChanges {
    type Error = ValidationError;

    fn try_from(req: UpdateUserRequest) -> Result<Self, Self::Error> {
        let gender = match req.gender {
            Some(Some(raw)) => Some(Some(raw.parse::<Gender>()?)),
            Some(None) => Some(None),
            None => None,
        };
        let activity_level = match req.activity_level {
            Some(Some(raw)) => Some(Some(raw.parse::<ActivityLevel>()?)),
            Some(None) => Some(None),
            None => None,
        };

        Ok(UserChanges {
            email: req.email,
            username: req.username,
            hashed_password: req.hashed_password,
            is_active: req.is_active,
            is_verified: req.is_verified,
            full_name: req.full_name,
            date_of_birth: req.date_of_birth,
            gender,
            height_cm: req.height_cm,
            weight_kg: req.weight_kg,
            activity_level,
            target_weight_kg: req.target_weight_kg,
            daily_calorie_goal: req.daily_calorie_goal,
            bio: req.bio,
            updated_at: None,
        })
    }
}

/// User response (never carries the password hash)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub username: String,
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

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            is_active: user.is_active,
            is_verified: user.is_verified,
            full_name: user.full_name,
            date_of_birth: user.date_of_birth,
            gender: user.gender,
            height_cm: user.height_cm,
            weight_kg: user.weight_kg,
            activity_level: user.activity_level,
            target_weight_kg: user.target_weight_kg,
            daily_calorie_goal: user.daily_calorie_goal,
            bio: user.bio,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Result of an account deletion
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeletedUserResponse {
    pub id: i32,
    /// Refresh tokens deleted with the account
    pub refresh_tokens_removed: u64,
    /// Routines kept but no longer attached to any user
    pub routines_detached: u64,
}

/// Workout routine response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkoutRoutineResponse {
    pub id: i32,
    pub user_id: Option<i32>,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<WorkoutRoutine> for WorkoutRoutineResponse {
    fn from(routine: WorkoutRoutine) -> Self {
        Self {
            id: routine.id,
            user_id: routine.user_id,
            name: routine.name,
            description: routine.description,
            created_at: routine.created_at,
        }
    }
}
