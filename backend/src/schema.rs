//! Relational schema definition
//!
//! The tables the store reads and writes are declared here as plain data:
//! column lists, nullability and named constraints. Repositories build their
//! SELECT lists from these definitions, and [`Schema::initialize`] checks a
//! live database against them once at startup.

use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, info};

/// A single column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub nullable: bool,
}

const fn required(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        nullable: false,
    }
}

const fn nullable(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        nullable: true,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    Check,
    ForeignKey,
}

/// Named constraint guarding one column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstraintDef {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: ConstraintKind,
}

/// A table with its columns and named constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
    pub constraints: &'static [ConstraintDef],
}

impl TableDef {
    /// Comma separated column names, in declaration order
    pub fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }
}

pub const USERS: TableDef = TableDef {
    name: "users",
    columns: &[
        required("id"),
        required("email"),
        required("username"),
        nullable("full_name"),
        required("hashed_password"),
        required("is_active"),
        required("is_verified"),
        nullable("date_of_birth"),
        nullable("gender"),
        nullable("height_cm"),
        nullable("weight_kg"),
        nullable("activity_level"),
        nullable("target_weight_kg"),
        nullable("daily_calorie_goal"),
        nullable("bio"),
        required("created_at"),
        nullable("updated_at"),
    ],
    constraints: &[
        ConstraintDef {
            name: "ix_users_email",
            column: "email",
            kind: ConstraintKind::Unique,
        },
        ConstraintDef {
            name: "users_gender_check",
            column: "gender",
            kind: ConstraintKind::Check,
        },
        ConstraintDef {
            name: "users_activity_level_check",
            column: "activity_level",
            kind: ConstraintKind::Check,
        },
    ],
};

pub const REFRESH_TOKENS: TableDef = TableDef {
    name: "refresh_tokens",
    columns: &[
        required("id"),
        required("user_id"),
        required("token"),
        required("expires_at"),
        required("revoked"),
        required("created_at"),
    ],
    constraints: &[
        ConstraintDef {
            name: "ix_refresh_tokens_token",
            column: "token",
            kind: ConstraintKind::Unique,
        },
        ConstraintDef {
            name: "refresh_tokens_user_id_fkey",
            column: "user_id",
            kind: ConstraintKind::ForeignKey,
        },
    ],
};

pub const WORKOUT_ROUTINES: TableDef = TableDef {
    name: "workout_routines",
    columns: &[
        required("id"),
        nullable("user_id"),
        required("name"),
        nullable("description"),
        required("created_at"),
    ],
    constraints: &[ConstraintDef {
        name: "workout_routines_user_id_fkey",
        column: "user_id",
        kind: ConstraintKind::ForeignKey,
    }],
};

pub const TABLES: [TableDef; 3] = [USERS, REFRESH_TOKENS, WORKOUT_ROUTINES];

/// Column guarded by a named constraint, across all declared tables
pub fn column_for_constraint(constraint: &str) -> Option<&'static str> {
    TABLES
        .iter()
        .flat_map(|t| t.constraints.iter())
        .find(|c| c.name == constraint)
        .map(|c| c.column)
}

/// Immutable handle on the schema the process runs against.
///
/// Built exactly once before the server accepts connections and shared
/// read-only through the application state.
#[derive(Debug, Clone)]
pub struct Schema {
    tables: Vec<TableDef>,
    verified: bool,
}

impl Schema {
    /// Declared schema, not checked against any database
    pub fn declared() -> Self {
        Self {
            tables: TABLES.to_vec(),
            verified: false,
        }
    }

    /// Apply pending migrations, then confirm every declared table and
    /// column exists with the declared nullability.
    pub async fn initialize(pool: &PgPool) -> Result<Arc<Self>> {
        crate::db::run_migrations(pool).await?;

        for table in TABLES {
            let live: Vec<(String, String)> = sqlx::query_as(
                r#"
                SELECT column_name::text, is_nullable::text
                FROM information_schema.columns
                WHERE table_schema = current_schema() AND table_name = $1
                "#,
            )
            .bind(table.name)
            .fetch_all(pool)
            .await?;

            verify_table(&table, &live)?;
            debug!(table = table.name, columns = live.len(), "Table verified");
        }

        info!(tables = TABLES.len(), "Schema initialized");
        Ok(Arc::new(Self {
            tables: TABLES.to_vec(),
            verified: true,
        }))
    }

    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Whether the schema was checked against a live database
    pub fn is_verified(&self) -> bool {
        self.verified
    }
}

/// Compare a declared table with `(column_name, is_nullable)` rows read from
/// `information_schema.columns`
fn verify_table(table: &TableDef, live: &[(String, String)]) -> Result<()> {
    if live.is_empty() {
        anyhow::bail!("table `{}` does not exist", table.name);
    }

    for column in table.columns {
        let Some((_, is_nullable)) = live.iter().find(|(name, _)| name == column.name) else {
            anyhow::bail!("column `{}.{}` is missing", table.name, column.name);
        };
        let live_nullable = is_nullable.eq_ignore_ascii_case("YES");
        if live_nullable != column.nullable {
            anyhow::bail!(
                "column `{}.{}` nullability mismatch: declared {}, found {}",
                table.name,
                column.name,
                if column.nullable { "NULL" } else { "NOT NULL" },
                if live_nullable { "NULL" } else { "NOT NULL" },
            );
        }
    }

    Ok(())
}
