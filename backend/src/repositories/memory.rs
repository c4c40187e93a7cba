//! In-process store
//!
//! Enforces the same constraints as the Postgres schema. All writes go
//! through one `RwLock`, which serializes concurrent inserts of the same
//! email the way the unique index does in the database.

use super::{
    DeletedUser, RefreshTokenRepository, Store, StoreError, StoreResult, UserRepository,
    WorkoutRoutineRepository,
};
use async_trait::async_trait;
use chrono::Utc;
use fitlog_shared::{
    NewRefreshToken, NewUser, NewWorkoutRoutine, RefreshToken, User, UserChanges, WorkoutRoutine,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    refresh_tokens: BTreeMap<i32, RefreshToken>,
    workout_routines: BTreeMap<i32, WorkoutRoutine>,
    user_seq: i32,
    token_seq: i32,
    routine_seq: i32,
}

fn next_id(seq: &mut i32) -> i32 {
    *seq += 1;
    *seq
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<i32>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

/// Store kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        self.ensure_open()?;
        new.validate()?;

        let mut tables = self.tables.write().await;
        if tables.email_taken(&new.email, None) {
            return Err(StoreError::conflict("email"));
        }

        let id = next_id(&mut tables.user_seq);
        let user = User::from_new(id, new, Utc::now());
        tables.users.insert(id, user.clone());
        debug!(user_id = id, "User created");
        Ok(user)
    }

    async fn get_user(&self, id: i32) -> StoreResult<Option<User>> {
        self.ensure_open()?;
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.ensure_open()?;
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self, limit: i64, offset: i64) -> StoreResult<(Vec<User>, u64)> {
        self.ensure_open()?;
        let tables = self.tables.read().await;
        let page = tables
            .users
            .values()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((page, tables.users.len() as u64))
    }

    async fn update_user(&self, id: i32, changes: UserChanges) -> StoreResult<User> {
        self.ensure_open()?;
        changes.validate()?;

        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&id) {
            return Err(StoreError::NotFound { entity: "user", id });
        }
        if let Some(email) = &changes.email {
            if tables.email_taken(email, Some(id)) {
                return Err(StoreError::conflict("email"));
            }
        }

        let user = tables
            .users
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "user", id })?;
        user.apply(changes);
        Ok(user.clone())
    }

    async fn delete_user(&self, id: i32) -> StoreResult<DeletedUser> {
        self.ensure_open()?;
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Err(StoreError::NotFound { entity: "user", id });
        }

        let before = tables.refresh_tokens.len();
        tables.refresh_tokens.retain(|_, t| t.user_id != id);
        let refresh_tokens_removed = (before - tables.refresh_tokens.len()) as u64;

        let mut routines_detached = 0;
        for routine in tables.workout_routines.values_mut() {
            if routine.user_id == Some(id) {
                routine.user_id = None;
                routines_detached += 1;
            }
        }

        debug!(user_id = id, refresh_tokens_removed, routines_detached, "User deleted");
        Ok(DeletedUser {
            id,
            refresh_tokens_removed,
            routines_detached,
        })
    }
}

#[async_trait]
impl RefreshTokenRepository for MemoryStore {
    async fn insert_refresh_token(&self, new: NewRefreshToken) -> StoreResult<RefreshToken> {
        self.ensure_open()?;
        new.validate()?;

        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&new.user_id) {
            return Err(StoreError::missing_parent("user_id"));
        }
        if tables.refresh_tokens.values().any(|t| t.token == new.token) {
            return Err(StoreError::conflict("token"));
        }

        let id = next_id(&mut tables.token_seq);
        let token = RefreshToken {
            id,
            user_id: new.user_id,
            token: new.token,
            expires_at: new.expires_at,
            revoked: false,
            created_at: Utc::now(),
        };
        tables.refresh_tokens.insert(id, token.clone());
        Ok(token)
    }

    async fn refresh_tokens_for_user(&self, user_id: i32) -> StoreResult<Vec<RefreshToken>> {
        self.ensure_open()?;
        let tables = self.tables.read().await;
        Ok(tables
            .refresh_tokens
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl WorkoutRoutineRepository for MemoryStore {
    async fn insert_routine(&self, new: NewWorkoutRoutine) -> StoreResult<WorkoutRoutine> {
        self.ensure_open()?;
        new.validate()?;

        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&new.user_id) {
            return Err(StoreError::missing_parent("user_id"));
        }

        let id = next_id(&mut tables.routine_seq);
        let routine = WorkoutRoutine {
            id,
            user_id: Some(new.user_id),
            name: new.name,
            description: new.description,
            created_at: Utc::now(),
        };
        tables.workout_routines.insert(id, routine.clone());
        Ok(routine)
    }

    async fn get_routine(&self, id: i32) -> StoreResult<Option<WorkoutRoutine>> {
        self.ensure_open()?;
        Ok(self.tables.read().await.workout_routines.get(&id).cloned())
    }

    async fn routines_for_user(&self, user_id: i32) -> StoreResult<Vec<WorkoutRoutine>> {
        self.ensure_open()?;
        let tables = self.tables.read().await;
        Ok(tables
            .workout_routines
            .values()
            .filter(|r| r.user_id == Some(user_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        self.ensure_open()
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use fake::faker::internet::en::{SafeEmail, Username};
    use fake::Fake;
    use fitlog_shared::{ActivityLevel, Gender, ValidationError};
    use proptest::prelude::*;
    use std::sync::Arc;

    fn token_for(user_id: i32, token: &str) -> NewRefreshToken {
        NewRefreshToken {
            user_id,
            token: token.to_string(),
            expires_at: Utc::now() + Duration::days(7),
        }
    }

    fn routine_for(user_id: i32, name: &str) -> NewWorkoutRoutine {
        NewWorkoutRoutine {
            user_id,
            name: name.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser::new("a@x.com", "a", "h"))
            .await
            .unwrap();

        assert_eq!(user.id, 1);
        assert!(user.is_active);
        assert!(!user.is_verified);
        assert!(user.updated_at.is_none());
        assert!(user.full_name.is_none());
        assert!(user.date_of_birth.is_none());
        assert!(user.gender.is_none());
        assert!(user.height_cm.is_none());
        assert!(user.weight_kg.is_none());
        assert!(user.activity_level.is_none());
        assert!(user.target_weight_kg.is_none());
        assert!(user.daily_calorie_goal.is_none());
        assert!(user.bio.is_none());
        assert!(user.created_at <= Utc::now());

        let stored = store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(stored, user);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store
            .create_user(NewUser::new("a@x.com", "a", "h"))
            .await
            .unwrap();

        let err = store
            .create_user(NewUser::new("a@x.com", "b", "h2"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { ref field } if field == "email"));
    }

    #[tokio::test]
    async fn test_duplicate_username_is_allowed() {
        let store = MemoryStore::new();
        let first = store
            .create_user(NewUser::new("a@x.com", "same", "h"))
            .await
            .unwrap();
        let second = store
            .create_user(NewUser::new("b@x.com", "same", "h"))
            .await
            .unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(first.username, second.username);
    }

    #[tokio::test]
    async fn test_create_rejects_missing_required_fields() {
        let store = MemoryStore::new();
        let err = store
            .create_user(NewUser::new("a@x.com", "a", ""))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::Required { ref field }) if field == "hashed_password"
        ));
        // Nothing was written
        assert_eq!(store.list_users(10, 0).await.unwrap().1, 0);
    }

    #[tokio::test]
    async fn test_update_leaves_updated_at_alone_unless_set() {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser::new("a@x.com", "a", "h"))
            .await
            .unwrap();

        let updated = store
            .update_user(
                user.id,
                UserChanges {
                    weight_kg: Some(Some(72.5)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.weight_kg, Some(72.5));
        assert!(updated.updated_at.is_none());
        assert_eq!(updated.created_at, user.created_at);

        let at = Utc::now();
        let touched = store
            .update_user(user.id, UserChanges::default().touched_at(at))
            .await
            .unwrap();
        assert_eq!(touched.updated_at, Some(at));
    }

    #[tokio::test]
    async fn test_enum_fields_can_be_set_and_cleared() {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                gender: Some(Gender::Other),
                activity_level: Some(ActivityLevel::Sedentary),
                ..NewUser::new("a@x.com", "a", "h")
            })
            .await
            .unwrap();
        assert_eq!(user.gender, Some(Gender::Other));

        let cleared = store
            .update_user(
                user.id,
                UserChanges {
                    gender: Some(None),
                    activity_level: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.gender, None);
        assert_eq!(cleared.activity_level, None);
    }

    #[tokio::test]
    async fn test_update_email_to_taken_value_conflicts() {
        let store = MemoryStore::new();
        store
            .create_user(NewUser::new("a@x.com", "a", "h"))
            .await
            .unwrap();
        let b = store
            .create_user(NewUser::new("b@x.com", "b", "h"))
            .await
            .unwrap();

        let err = store
            .update_user(
                b.id,
                UserChanges {
                    email: Some("a@x.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));

        // Re-saving one's own email is not a conflict
        let same = store
            .update_user(
                b.id,
                UserChanges {
                    email: Some("b@x.com".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(same.is_ok());
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_user() {
        let store = MemoryStore::new();
        let err = store
            .update_user(42, UserChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 42, .. }));

        let err = store.delete_user(42).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "user", id: 42 }));
    }

    #[tokio::test]
    async fn test_delete_cascades_tokens_and_detaches_routines() {
        let store = MemoryStore::new();
        let a = store
            .create_user(NewUser::new("a@x.com", "a", "h"))
            .await
            .unwrap();
        let b = store
            .create_user(NewUser::new("b@x.com", "b", "h"))
            .await
            .unwrap();

        store.insert_refresh_token(token_for(a.id, "t1")).await.unwrap();
        store.insert_refresh_token(token_for(a.id, "t2")).await.unwrap();
        store.insert_refresh_token(token_for(b.id, "t3")).await.unwrap();
        let routine = store.insert_routine(routine_for(a.id, "Push day")).await.unwrap();

        let deleted = store.delete_user(a.id).await.unwrap();
        assert_eq!(
            deleted,
            DeletedUser {
                id: a.id,
                refresh_tokens_removed: 2,
                routines_detached: 1,
            }
        );

        assert!(store.get_user(a.id).await.unwrap().is_none());
        assert!(store.refresh_tokens_for_user(a.id).await.unwrap().is_empty());
        // Other users keep their tokens
        assert_eq!(store.refresh_tokens_for_user(b.id).await.unwrap().len(), 1);

        let kept = store.get_routine(routine.id).await.unwrap().unwrap();
        assert_eq!(kept.user_id, None);
        assert_eq!(kept.name, "Push day");
    }

    #[tokio::test]
    async fn test_related_records_require_existing_user() {
        let store = MemoryStore::new();
        let err = store
            .insert_refresh_token(token_for(9, "t"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(ref v) if v.field() == "user_id"));

        let err = store
            .insert_routine(routine_for(9, "Legs"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_duplicate_refresh_token_conflicts() {
        let store = MemoryStore::new();
        let a = store
            .create_user(NewUser::new("a@x.com", "a", "h"))
            .await
            .unwrap();
        store.insert_refresh_token(token_for(a.id, "t")).await.unwrap();
        let err = store
            .insert_refresh_token(token_for(a.id, "t"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { ref field } if field == "token"));
    }

    #[tokio::test]
    async fn test_list_users_pages_in_id_order() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .create_user(NewUser::new(format!("u{i}@x.com"), format!("u{i}"), "h"))
                .await
                .unwrap();
        }

        let (page, total) = store.list_users(2, 2).await.unwrap();
        assert_eq!(total, 5);
        let ids: Vec<i32> = page.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![3, 4]);

        let found = store.find_user_by_email("u4@x.com").await.unwrap().unwrap();
        assert_eq!(found.username, "u4");
    }

    #[tokio::test]
    async fn test_concurrent_inserts_of_same_email_admit_one() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .create_user(NewUser::new("race@x.com", format!("racer{i}"), "h"))
                    .await
            }));
        }

        let mut created = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(StoreError::Conflict { .. }) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(conflicts, 15);
    }

    #[tokio::test]
    async fn test_update_missing_user_to_taken_email_is_not_found() {
        let store = MemoryStore::new();
        store
            .create_user(NewUser::new("a@x.com", "a", "h"))
            .await
            .unwrap();

        let err = store
            .update_user(
                999,
                UserChanges {
                    email: Some("a@x.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "user", id: 999 }));
    }

    #[tokio::test]
    async fn test_close_fails_ping() {
        let store = MemoryStore::new();
        assert!(store.ping().await.is_ok());
        store.close().await;
        assert!(store.is_closed());
        assert!(matches!(store.ping().await, Err(StoreError::Closed)));
    }

    #[tokio::test]
    async fn test_closed_store_rejects_reads_and_writes() {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser::new("a@x.com", "a", "h"))
            .await
            .unwrap();
        store.close().await;

        assert!(matches!(
            store.create_user(NewUser::new("b@x.com", "b", "h")).await,
            Err(StoreError::Closed)
        ));
        assert!(matches!(store.get_user(user.id).await, Err(StoreError::Closed)));
        assert!(matches!(store.list_users(10, 0).await, Err(StoreError::Closed)));
        assert!(matches!(
            store.update_user(user.id, UserChanges::default()).await,
            Err(StoreError::Closed)
        ));
        assert!(matches!(store.delete_user(user.id).await, Err(StoreError::Closed)));
        assert!(matches!(
            store.insert_refresh_token(token_for(user.id, "t")).await,
            Err(StoreError::Closed)
        ));
        assert!(matches!(
            store.routines_for_user(user.id).await,
            Err(StoreError::Closed)
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Any valid payload can be stored once; a second payload with the
        /// same email conflicts regardless of the other fields.
        #[test]
        fn prop_email_is_unique(seed in 0u64..10_000) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let store = MemoryStore::new();
                let email: String = SafeEmail().fake();
                let first: String = Username().fake();
                let second: String = Username().fake();

                let created = store
                    .create_user(NewUser::new(email.clone(), first, format!("hash-{seed}")))
                    .await;
                prop_assert!(created.is_ok());

                let duplicate = store
                    .create_user(NewUser::new(email, second, "other-hash"))
                    .await;
                let is_conflict = matches!(duplicate, Err(StoreError::Conflict { .. }));
                prop_assert!(is_conflict);
                Ok(())
            })?;
        }
    }
}
