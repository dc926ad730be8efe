use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::db::{format_db_time, DbPool};
use crate::models::entry::WaterEntry;
use crate::models::settings::UserSettings;
use crate::models::user::User;
use crate::units::Unit;

use super::Store;

/// SQLite-backed implementation of the Store trait.
/// Wraps the r2d2 connection pool and delegates to model methods.
pub struct SqliteStore {
    pub pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn new_at(path: &str) -> Result<Self, String> {
        let pool = crate::db::init_pool_at(path)?;
        Ok(Self { pool })
    }
}

impl Store for SqliteStore {
    // ── Lifecycle ───────────────────────────────────────────────────

    fn run_migrations(&self) -> Result<(), String> {
        crate::db::run_migrations(&self.pool).map_err(|e| e.to_string())
    }

    fn db_backend(&self) -> &str {
        "sqlite"
    }

    // ── Users ───────────────────────────────────────────────────────

    fn user_get_by_id(&self, id: i64) -> Option<User> {
        User::get_by_id(&self.pool, id)
    }

    fn user_get_by_email(&self, email: &str) -> Option<User> {
        User::get_by_email(&self.pool, email)
    }

    fn user_count(&self) -> i64 {
        User::count(&self.pool)
    }

    fn user_create(&self, email: &str, password_hash: &str) -> Result<i64, String> {
        User::create(&self.pool, email, password_hash)
    }

    fn user_update_profile(&self, id: i64, name: &str, daily_goal_ml: f64) -> Result<(), String> {
        User::update_profile(&self.pool, id, name, daily_goal_ml)
    }

    fn user_delete(&self, id: i64) -> Result<(), String> {
        User::delete(&self.pool, id)
    }

    // ── Water entries ───────────────────────────────────────────────

    fn entry_create(
        &self,
        user_id: i64,
        amount: f64,
        unit: Unit,
        timestamp: DateTime<Utc>,
    ) -> Result<WaterEntry, String> {
        WaterEntry::create(&self.pool, user_id, amount, unit, timestamp)
    }

    fn entry_get(&self, user_id: i64, id: i64) -> Option<WaterEntry> {
        WaterEntry::get(&self.pool, user_id, id)
    }

    fn entry_list_between(
        &self,
        user_id: i64,
        from: &DateTime<Utc>,
        to: &DateTime<Utc>,
    ) -> Vec<WaterEntry> {
        WaterEntry::list_between(&self.pool, user_id, from, to)
    }

    fn entry_list_all(&self, user_id: i64) -> Vec<WaterEntry> {
        WaterEntry::list_all(&self.pool, user_id)
    }

    fn entry_count(&self, user_id: i64) -> i64 {
        WaterEntry::count(&self.pool, user_id)
    }

    fn entry_delete(&self, user_id: i64, id: i64) -> Result<bool, String> {
        WaterEntry::delete(&self.pool, user_id, id)
    }

    // ── Settings ────────────────────────────────────────────────────

    fn settings_get(&self, user_id: i64) -> Option<UserSettings> {
        let conn = self.pool.get().ok()?;
        let raw: String = conn
            .query_row(
                "SELECT settings_json FROM user_settings WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()
            .ok()??;
        match serde_json::from_str(&raw) {
            Ok(s) => Some(s),
            Err(e) => {
                log::warn!("Unreadable settings for user {}: {}", user_id, e);
                None
            }
        }
    }

    fn settings_put(&self, user_id: i64, settings: &UserSettings) -> Result<(), String> {
        let json = serde_json::to_string(settings).map_err(|e| e.to_string())?;
        let conn = self.pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            UPSERT_SETTINGS,
            params![user_id, json, format_db_time(&Utc::now())],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn settings_apply(
        &self,
        user_id: i64,
        daily_goal_ml: f64,
        settings: &UserSettings,
    ) -> Result<(), String> {
        let json = serde_json::to_string(settings).map_err(|e| e.to_string())?;
        let now = format_db_time(&Utc::now());
        let mut conn = self.pool.get().map_err(|e| e.to_string())?;
        let tx = conn.transaction().map_err(|e| e.to_string())?;

        let updated = tx
            .execute(
                "UPDATE users SET daily_goal_ml = ?1, timezone = ?2, updated_at = ?3 WHERE id = ?4",
                params![daily_goal_ml, settings.timezone, now, user_id],
            )
            .map_err(|e| e.to_string())?;
        if updated == 0 {
            return Err(format!("No user with id {}", user_id));
        }
        tx.execute(UPSERT_SETTINGS, params![user_id, json, now])
            .map_err(|e| e.to_string())?;
        tx.commit().map_err(|e| e.to_string())
    }
}

const UPSERT_SETTINGS: &str =
    "INSERT INTO user_settings (user_id, settings_json, updated_at) VALUES (?1, ?2, ?3)
     ON CONFLICT(user_id) DO UPDATE SET settings_json = ?2, updated_at = ?3";
