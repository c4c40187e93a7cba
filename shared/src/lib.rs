//! Fitlog Shared Library
//!
//! Storage-agnostic models, validation rules and API types shared by the
//! backend and its tests.

pub mod errors;
pub mod models;
pub mod types;
pub mod validation;

// Re-export commonly used items
pub use errors::*;
pub use models::{
    ActivityLevel, Gender, NewRefreshToken, NewUser, NewWorkoutRoutine, RefreshToken, User,
    UserChanges, WorkoutRoutine,
};
pub use types::*;
