//! PostgreSQL store

use super::{
    DeletedUser, RefreshTokenRepository, Store, StoreError, StoreResult, UserRepository,
    WorkoutRoutineRepository,
};
use crate::db;
use crate::schema::{REFRESH_TOKENS, USERS, WORKOUT_ROUTINES};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use fitlog_shared::models::{DEFAULT_IS_ACTIVE, DEFAULT_IS_VERIFIED};
use fitlog_shared::{
    ActivityLevel, Gender, NewRefreshToken, NewUser, NewWorkoutRoutine, RefreshToken, User,
    UserChanges, ValidationError, WorkoutRoutine,
};
use sqlx::PgPool;
use tracing::{debug, info};

/// User row as read from the database. Enumerated columns come back as
/// text and are parsed into their Rust types.
#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    username: String,
    full_name: Option<String>,
    hashed_password: String,
    is_active: bool,
    is_verified: bool,
    date_of_birth: Option<NaiveDate>,
    gender: Option<String>,
    height_cm: Option<f64>,
    weight_kg: Option<f64>,
    activity_level: Option<String>,
    target_weight_kg: Option<f64>,
    daily_calorie_goal: Option<i32>,
    bio: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = ValidationError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            gender: row.gender.as_deref().map(str::parse::<Gender>).transpose()?,
            activity_level: row
                .activity_level
                .as_deref()
                .map(str::parse::<ActivityLevel>)
                .transpose()?,
            id: row.id,
            email: row.email,
            username: row.username,
            full_name: row.full_name,
            hashed_password: row.hashed_password,
            is_active: row.is_active,
            is_verified: row.is_verified,
            date_of_birth: row.date_of_birth,
            height_cm: row.height_cm,
            weight_kg: row.weight_kg,
            target_weight_kg: row.target_weight_kg,
            daily_calorie_goal: row.daily_calorie_goal,
            bio: row.bio,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct RefreshTokenRow {
    id: i32,
    user_id: i32,
    token: String,
    expires_at: DateTime<Utc>,
    revoked: bool,
    created_at: DateTime<Utc>,
}

impl From<RefreshTokenRow> for RefreshToken {
    fn from(row: RefreshTokenRow) -> Self {
        RefreshToken {
            id: row.id,
            user_id: row.user_id,
            token: row.token,
            expires_at: row.expires_at,
            revoked: row.revoked,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct WorkoutRoutineRow {
    id: i32,
    user_id: Option<i32>,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<WorkoutRoutineRow> for WorkoutRoutine {
    fn from(row: WorkoutRoutineRow) -> Self {
        WorkoutRoutine {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

fn into_user(row: UserRow) -> StoreResult<User> {
    User::try_from(row).map_err(StoreError::from)
}

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        new.validate()?;

        let sql = format!(
            r#"
            INSERT INTO users (
                email, username, hashed_password, is_active, is_verified,
                full_name, date_of_birth, gender, height_cm, weight_kg,
                activity_level, target_weight_kg, daily_calorie_goal, bio
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {}
            "#,
            USERS.column_list()
        );

        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&new.email)
            .bind(&new.username)
            .bind(&new.hashed_password)
            .bind(new.is_active.unwrap_or(DEFAULT_IS_ACTIVE))
            .bind(new.is_verified.unwrap_or(DEFAULT_IS_VERIFIED))
            .bind(&new.full_name)
            .bind(new.date_of_birth)
            .bind(new.gender.map(|g| g.as_str()))
            .bind(new.height_cm)
            .bind(new.weight_kg)
            .bind(new.activity_level.map(|a| a.as_str()))
            .bind(new.target_weight_kg)
            .bind(new.daily_calorie_goal)
            .bind(&new.bio)
            .fetch_one(&self.pool)
            .await?;

        debug!(user_id = row.id, "User created");
        into_user(row)
    }

    async fn get_user(&self, id: i32) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USERS.column_list());
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(into_user)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USERS.column_list());
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(into_user)
            .transpose()
    }

    async fn list_users(&self, limit: i64, offset: i64) -> StoreResult<(Vec<User>, u64)> {
        let sql = format!(
            "SELECT {} FROM users ORDER BY id LIMIT $1 OFFSET $2",
            USERS.column_list()
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let users = rows.into_iter().map(into_user).collect::<StoreResult<Vec<_>>>()?;
        Ok((users, total as u64))
    }

    async fn update_user(&self, id: i32, changes: UserChanges) -> StoreResult<User> {
        changes.validate()?;

        let mut tx = self.pool.begin().await?;

        // Read, patch and write back under a row lock
        let select = format!(
            "SELECT {} FROM users WHERE id = $1 FOR UPDATE",
            USERS.column_list()
        );
        let current = sqlx::query_as::<_, UserRow>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound { entity: "user", id })?;

        let mut user = into_user(current)?;
        user.apply(changes);

        let update = format!(
            r#"
            UPDATE users SET
                email = $2,
                username = $3,
                hashed_password = $4,
                is_active = $5,
                is_verified = $6,
                full_name = $7,
                date_of_birth = $8,
                gender = $9,
                height_cm = $10,
                weight_kg = $11,
                activity_level = $12,
                target_weight_kg = $13,
                daily_calorie_goal = $14,
                bio = $15,
                updated_at = $16
            WHERE id = $1
            RETURNING {}
            "#,
            USERS.column_list()
        );
        let row = sqlx::query_as::<_, UserRow>(&update)
            .bind(id)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.hashed_password)
            .bind(user.is_active)
            .bind(user.is_verified)
            .bind(&user.full_name)
            .bind(user.date_of_birth)
            .bind(user.gender.map(|g| g.as_str()))
            .bind(user.height_cm)
            .bind(user.weight_kg)
            .bind(user.activity_level.map(|a| a.as_str()))
            .bind(user.target_weight_kg)
            .bind(user.daily_calorie_goal)
            .bind(&user.bio)
            .bind(user.updated_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        into_user(row)
    }

    async fn delete_user(&self, id: i32) -> StoreResult<DeletedUser> {
        let mut tx = self.pool.begin().await?;

        let refresh_tokens_removed = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let routines_detached =
            sqlx::query("UPDATE workout_routines SET user_id = NULL WHERE user_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            // Dropping the transaction rolls back the two statements above
            return Err(StoreError::NotFound { entity: "user", id });
        }

        tx.commit().await?;
        info!(
            user_id = id,
            refresh_tokens_removed, routines_detached, "User deleted"
        );
        Ok(DeletedUser {
            id,
            refresh_tokens_removed,
            routines_detached,
        })
    }
}

#[async_trait]
impl RefreshTokenRepository for PgStore {
    async fn insert_refresh_token(&self, new: NewRefreshToken) -> StoreResult<RefreshToken> {
        new.validate()?;

        let sql = format!(
            r#"
            INSERT INTO refresh_tokens (user_id, token, expires_at)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            REFRESH_TOKENS.column_list()
        );
        let row = sqlx::query_as::<_, RefreshTokenRow>(&sql)
            .bind(new.user_id)
            .bind(&new.token)
            .bind(new.expires_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn refresh_tokens_for_user(&self, user_id: i32) -> StoreResult<Vec<RefreshToken>> {
        let sql = format!(
            "SELECT {} FROM refresh_tokens WHERE user_id = $1 ORDER BY id",
            REFRESH_TOKENS.column_list()
        );
        let rows = sqlx::query_as::<_, RefreshTokenRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl WorkoutRoutineRepository for PgStore {
    async fn insert_routine(&self, new: NewWorkoutRoutine) -> StoreResult<WorkoutRoutine> {
        new.validate()?;

        let sql = format!(
            r#"
            INSERT INTO workout_routines (user_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            WORKOUT_ROUTINES.column_list()
        );
        let row = sqlx::query_as::<_, WorkoutRoutineRow>(&sql)
            .bind(new.user_id)
            .bind(&new.name)
            .bind(&new.description)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn get_routine(&self, id: i32) -> StoreResult<Option<WorkoutRoutine>> {
        let sql = format!(
            "SELECT {} FROM workout_routines WHERE id = $1",
            WORKOUT_ROUTINES.column_list()
        );
        let row = sqlx::query_as::<_, WorkoutRoutineRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn routines_for_user(&self, user_id: i32) -> StoreResult<Vec<WorkoutRoutine>> {
        let sql = format!(
            "SELECT {} FROM workout_routines WHERE user_id = $1 ORDER BY id",
            WORKOUT_ROUTINES.column_list()
        );
        let rows = sqlx::query_as::<_, WorkoutRoutineRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> StoreResult<()> {
        db::health_check(&self.pool).await.map_err(StoreError::from)
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}
