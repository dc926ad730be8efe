use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::db::{format_db_time, parse_db_time, DbPool};

/// Default daily goal in millilitres.
pub const DEFAULT_DAILY_GOAL_ML: f64 = 2000.0;
pub const MIN_DAILY_GOAL_ML: f64 = 500.0;
pub const MAX_DAILY_GOAL_ML: f64 = 5000.0;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub avatar: String,
    pub daily_goal_ml: f64,
    pub timezone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The `{id, email}` shape returned by the auth endpoints.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PublicUser {
    pub id: i64,
    pub email: String,
}

impl User {
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            email: self.email.clone(),
        }
    }

    /// The configured IANA timezone, falling back to UTC if it no longer parses.
    pub fn tz(&self) -> chrono_tz::Tz {
        self.timezone.parse().unwrap_or(chrono_tz::UTC)
    }

    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let created: String = row.get(7)?;
        let updated: String = row.get(8)?;
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            name: row.get(3)?,
            avatar: row.get(4)?,
            daily_goal_ml: row.get(5)?,
            timezone: row.get(6)?,
            created_at: parse_db_time(&created).unwrap_or_default(),
            updated_at: parse_db_time(&updated).unwrap_or_default(),
        })
    }

    const SELECT_COLS: &'static str =
        "id, email, password_hash, name, avatar, daily_goal_ml, timezone, created_at, updated_at";

    // ── Lookups ──

    pub fn get_by_id(pool: &DbPool, id: i64) -> Option<User> {
        let conn = pool.get().ok()?;
        conn.query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", Self::SELECT_COLS),
            params![id],
            Self::from_row,
        )
        .ok()
    }

    pub fn get_by_email(pool: &DbPool, email: &str) -> Option<User> {
        let conn = pool.get().ok()?;
        conn.query_row(
            &format!("SELECT {} FROM users WHERE email = ?1", Self::SELECT_COLS),
            params![email],
            Self::from_row,
        )
        .ok()
    }

    pub fn count(pool: &DbPool) -> i64 {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return 0,
        };
        conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap_or(0)
    }

    // ── Create ──

    pub fn create(pool: &DbPool, email: &str, password_hash: &str) -> Result<i64, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let now = format_db_time(&Utc::now());
        conn.execute(
            "INSERT INTO users (email, password_hash, daily_goal_ml, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![email, password_hash, DEFAULT_DAILY_GOAL_ML, now],
        )
        .map_err(|e| e.to_string())?;
        Ok(conn.last_insert_rowid())
    }

    // ── Update ──

    pub fn update_profile(
        pool: &DbPool,
        id: i64,
        name: &str,
        daily_goal_ml: f64,
    ) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "UPDATE users SET name = ?1, daily_goal_ml = ?2, updated_at = ?3 WHERE id = ?4",
            params![name, daily_goal_ml, format_db_time(&Utc::now()), id],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    // ── Delete ──

    /// Remove a user together with their entries and settings.
    pub fn delete(pool: &DbPool, id: i64) -> Result<(), String> {
        let mut conn = pool.get().map_err(|e| e.to_string())?;
        let tx = conn.transaction().map_err(|e| e.to_string())?;
        tx.execute("DELETE FROM water_entries WHERE user_id = ?1", params![id])
            .map_err(|e| e.to_string())?;
        tx.execute("DELETE FROM user_settings WHERE user_id = ?1", params![id])
            .map_err(|e| e.to_string())?;
        tx.execute("DELETE FROM users WHERE id = ?1", params![id])
            .map_err(|e| e.to_string())?;
        tx.commit().map_err(|e| e.to_string())
    }
}

pub fn is_valid_daily_goal(ml: f64) -> bool {
    ml.is_finite() && (MIN_DAILY_GOAL_ML..=MAX_DAILY_GOAL_ML).contains(&ml)
}
