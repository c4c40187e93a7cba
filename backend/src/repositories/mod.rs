//! Database repositories
//!
//! The entity store is exposed as a set of async traits. [`PgStore`] backs
//! them with PostgreSQL; [`MemoryStore`] keeps the same invariants in
//! process memory.

mod error;
mod memory;
mod postgres;

use async_trait::async_trait;
use fitlog_shared::{
    NewRefreshToken, NewUser, NewWorkoutRoutine, RefreshToken, User, UserChanges, WorkoutRoutine,
};

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Outcome of an account deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletedUser {
    pub id: i32,
    /// Tokens deleted together with the user
    pub refresh_tokens_removed: u64,
    /// Routines kept, with their user reference cleared
    pub routines_detached: u64,
}

/// CRUD over user records
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user. Fails with `Conflict` when the email is taken.
    async fn create_user(&self, new: NewUser) -> StoreResult<User>;

    async fn get_user(&self, id: i32) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Page of users ordered by id, plus the total row count
    async fn list_users(&self, limit: i64, offset: i64) -> StoreResult<(Vec<User>, u64)>;

    /// Apply a partial update. `updated_at` changes only if `changes` sets it.
    async fn update_user(&self, id: i32, changes: UserChanges) -> StoreResult<User>;

    /// Delete a user and its refresh tokens; detach its workout routines.
    async fn delete_user(&self, id: i32) -> StoreResult<DeletedUser>;
}

/// Persistence contract for the token issuer
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn insert_refresh_token(&self, new: NewRefreshToken) -> StoreResult<RefreshToken>;

    async fn refresh_tokens_for_user(&self, user_id: i32) -> StoreResult<Vec<RefreshToken>>;
}

/// Persistence contract for the exercise collaborators
#[async_trait]
pub trait WorkoutRoutineRepository: Send + Sync {
    async fn insert_routine(&self, new: NewWorkoutRoutine) -> StoreResult<WorkoutRoutine>;

    async fn get_routine(&self, id: i32) -> StoreResult<Option<WorkoutRoutine>>;

    async fn routines_for_user(&self, user_id: i32) -> StoreResult<Vec<WorkoutRoutine>>;
}

/// Everything the application state needs from storage
#[async_trait]
pub trait Store: UserRepository + RefreshTokenRepository + WorkoutRoutineRepository {
    /// Short name for logs and health output
    fn backend_name(&self) -> &'static str;

    /// Cheap round trip used by the readiness probe
    async fn ping(&self) -> StoreResult<()>;

    /// Release connections. Called once at shutdown.
    async fn close(&self);
}
