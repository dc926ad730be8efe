use chrono::{DateTime, Utc};
use mongodb::bson::{self, doc, Document};
use mongodb::sync::Client;
use mongodb::sync::Database;

use crate::db::{format_db_time, parse_db_time};
use crate::models::entry::WaterEntry;
use crate::models::settings::UserSettings;
use crate::models::user::{User, DEFAULT_DAILY_GOAL_ML};
use crate::units::Unit;

use super::Store;

/// MongoDB-backed implementation of the Store trait.
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Create a new MongoStore by connecting to the given URI and database name.
    pub fn new(uri: &str, db_name: &str) -> Result<Self, String> {
        let client = Client::with_uri_str(uri).map_err(|e| e.to_string())?;
        let db = client.database(db_name);
        Ok(Self { db })
    }

    /// Test connectivity by pinging the server.
    pub fn test_connection(&self) -> Result<(), String> {
        self.db
            .run_command(doc! { "ping": 1 }, None)
            .map_err(|e| format!("MongoDB connection test failed: {}", e))?;
        Ok(())
    }

    // ── Helper: get next auto-increment ID for a collection ──
    fn next_id(&self, collection_name: &str) -> Result<i64, String> {
        let counters = self.db.collection::<Document>("_counters");
        let filter = doc! { "_id": collection_name };
        let update = doc! { "$inc": { "seq": 1_i64 } };
        let opts = mongodb::options::FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(mongodb::options::ReturnDocument::After)
            .build();
        let result = counters
            .find_one_and_update(filter, update, opts)
            .map_err(|e| e.to_string())?;
        match result {
            Some(d) => d
                .get_i64("seq")
                .map_err(|e| format!("Failed to get seq: {}", e)),
            None => Err("Failed to generate ID".to_string()),
        }
    }

    fn find_entries(&self, filter: Document, sort: Document) -> Vec<WaterEntry> {
        let coll = self.db.collection::<Document>("water_entries");
        let opts = mongodb::options::FindOptions::builder().sort(sort).build();
        let cursor = match coll.find(filter, opts) {
            Ok(c) => c,
            Err(e) => {
                log::error!("MongoDB entry query failed: {}", e);
                return vec![];
            }
        };
        cursor
            .filter_map(|r| r.ok())
            .filter_map(|d| doc_to_entry(&d))
            .collect()
    }

    fn unique_index(&self, collection: &str, keys: Document) -> Result<(), String> {
        use mongodb::IndexModel;

        self.db
            .collection::<Document>(collection)
            .create_index(
                IndexModel::builder()
                    .keys(keys)
                    .options(
                        mongodb::options::IndexOptions::builder()
                            .unique(true)
                            .build(),
                    )
                    .build(),
                None,
            )
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

impl Store for MongoStore {
    // ── Lifecycle ───────────────────────────────────────────────────

    fn run_migrations(&self) -> Result<(), String> {
        use mongodb::IndexModel;

        self.unique_index("users", doc! { "email": 1 })?;
        self.unique_index("users", doc! { "id": 1 })?;
        self.unique_index("water_entries", doc! { "id": 1 })?;
        self.unique_index("user_settings", doc! { "user_id": 1 })?;

        self.db
            .collection::<Document>("water_entries")
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "user_id": 1, "timestamp": -1 })
                    .build(),
                None,
            )
            .map_err(|e| e.to_string())?;

        Ok(())
    }

    fn db_backend(&self) -> &str {
        "mongodb"
    }

    // ── Users ───────────────────────────────────────────────────────

    fn user_get_by_id(&self, id: i64) -> Option<User> {
        let coll = self.db.collection::<Document>("users");
        let doc = coll.find_one(doc! { "id": id }, None).ok()??;
        doc_to_user(&doc)
    }

    fn user_get_by_email(&self, email: &str) -> Option<User> {
        let coll = self.db.collection::<Document>("users");
        let doc = coll.find_one(doc! { "email": email }, None).ok()??;
        doc_to_user(&doc)
    }

    fn user_count(&self) -> i64 {
        self.db
            .collection::<Document>("users")
            .count_documents(doc! {}, None)
            .map(|n| n as i64)
            .unwrap_or(0)
    }

    fn user_create(&self, email: &str, password_hash: &str) -> Result<i64, String> {
        let id = self.next_id("users")?;
        let now = format_db_time(&Utc::now());
        let coll = self.db.collection::<Document>("users");
        coll.insert_one(
            doc! {
                "id": id,
                "email": email,
                "password_hash": password_hash,
                "name": "",
                "avatar": "",
                "daily_goal_ml": DEFAULT_DAILY_GOAL_ML,
                "timezone": "UTC",
                "created_at": &now,
                "updated_at": &now,
            },
            None,
        )
        .map_err(|e| e.to_string())?;
        Ok(id)
    }

    fn user_update_profile(&self, id: i64, name: &str, daily_goal_ml: f64) -> Result<(), String> {
        let coll = self.db.collection::<Document>("users");
        coll.update_one(
            doc! { "id": id },
            doc! { "$set": {
                "name": name,
                "daily_goal_ml": daily_goal_ml,
                "updated_at": format_db_time(&Utc::now()),
            }},
            None,
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn user_delete(&self, id: i64) -> Result<(), String> {
        self.db
            .collection::<Document>("water_entries")
            .delete_many(doc! { "user_id": id }, None)
            .map_err(|e| e.to_string())?;
        self.db
            .collection::<Document>("user_settings")
            .delete_one(doc! { "user_id": id }, None)
            .map_err(|e| e.to_string())?;
        self.db
            .collection::<Document>("users")
            .delete_one(doc! { "id": id }, None)
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    // ── Water entries ───────────────────────────────────────────────

    fn entry_create(
        &self,
        user_id: i64,
        amount: f64,
        unit: Unit,
        timestamp: DateTime<Utc>,
    ) -> Result<WaterEntry, String> {
        let id = self.next_id("water_entries")?;
        let now = Utc::now();
        let coll = self.db.collection::<Document>("water_entries");
        let d = doc! {
            "id": id,
            "user_id": user_id,
            "amount": amount,
            "unit": unit.as_str(),
            "timestamp": format_db_time(&timestamp),
            "created_at": format_db_time(&now),
        };
        coll.insert_one(&d, None).map_err(|e| e.to_string())?;
        doc_to_entry(&d).ok_or_else(|| "Failed to read back entry".to_string())
    }

    fn entry_get(&self, user_id: i64, id: i64) -> Option<WaterEntry> {
        let coll = self.db.collection::<Document>("water_entries");
        let doc = coll
            .find_one(doc! { "id": id, "user_id": user_id }, None)
            .ok()??;
        doc_to_entry(&doc)
    }

    fn entry_list_between(
        &self,
        user_id: i64,
        from: &DateTime<Utc>,
        to: &DateTime<Utc>,
    ) -> Vec<WaterEntry> {
        self.find_entries(
            doc! {
                "user_id": user_id,
                "timestamp": { "$gte": format_db_time(from), "$lt": format_db_time(to) },
            },
            doc! { "timestamp": -1, "id": -1 },
        )
    }

    fn entry_list_all(&self, user_id: i64) -> Vec<WaterEntry> {
        self.find_entries(doc! { "user_id": user_id }, doc! { "timestamp": 1, "id": 1 })
    }

    fn entry_count(&self, user_id: i64) -> i64 {
        self.db
            .collection::<Document>("water_entries")
            .count_documents(doc! { "user_id": user_id }, None)
            .map(|n| n as i64)
            .unwrap_or(0)
    }

    fn entry_delete(&self, user_id: i64, id: i64) -> Result<bool, String> {
        let result = self
            .db
            .collection::<Document>("water_entries")
            .delete_one(doc! { "id": id, "user_id": user_id }, None)
            .map_err(|e| e.to_string())?;
        Ok(result.deleted_count > 0)
    }

    // ── Settings ────────────────────────────────────────────────────

    fn settings_get(&self, user_id: i64) -> Option<UserSettings> {
        let coll = self.db.collection::<Document>("user_settings");
        let d = coll.find_one(doc! { "user_id": user_id }, None).ok()??;
        let settings = d.get_document("settings").ok()?.clone();
        match bson::from_document(settings) {
            Ok(s) => Some(s),
            Err(e) => {
                log::warn!("Unreadable settings for user {}: {}", user_id, e);
                None
            }
        }
    }

    fn settings_put(&self, user_id: i64, settings: &UserSettings) -> Result<(), String> {
        let body = bson::to_document(settings).map_err(|e| e.to_string())?;
        let coll = self.db.collection::<Document>("user_settings");
        let opts = mongodb::options::UpdateOptions::builder()
            .upsert(true)
            .build();
        coll.update_one(
            doc! { "user_id": user_id },
            doc! { "$set": {
                "settings": body,
                "updated_at": format_db_time(&Utc::now()),
            }},
            opts,
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
        // No multi-document transactions on a standalone server; the user
        // row goes first so a failure never leaves settings ahead of it.
        let users = self.db.collection::<Document>("users");
        let res = users
            .update_one(
                doc! { "id": user_id },
                doc! { "$set": {
                    "daily_goal_ml": daily_goal_ml,
                    "timezone": settings.timezone.as_str(),
                    "updated_at": format_db_time(&Utc::now()),
                }},
                None,
            )
            .map_err(|e| e.to_string())?;
        if res.matched_count == 0 {
            return Err(format!("No user with id {}", user_id));
        }
        self.settings_put(user_id, settings)
    }
}

// ── Document → model conversions ────────────────────────────────────

fn doc_to_user(doc: &Document) -> Option<User> {
    Some(User {
        id: doc.get_i64("id").ok()?,
        email: doc.get_str("email").ok()?.to_string(),
        password_hash: doc.get_str("password_hash").ok()?.to_string(),
        name: doc.get_str("name").ok().unwrap_or("").to_string(),
        avatar: doc.get_str("avatar").ok().unwrap_or("").to_string(),
        daily_goal_ml: doc.get_f64("daily_goal_ml").unwrap_or(DEFAULT_DAILY_GOAL_ML),
        timezone: doc.get_str("timezone").ok().unwrap_or("UTC").to_string(),
        created_at: doc
            .get_str("created_at")
            .ok()
            .and_then(parse_db_time)
            .unwrap_or_default(),
        updated_at: doc
            .get_str("updated_at")
            .ok()
            .and_then(parse_db_time)
            .unwrap_or_default(),
    })
}

fn doc_to_entry(doc: &Document) -> Option<WaterEntry> {
    Some(WaterEntry {
        id: doc.get_i64("id").ok()?,
        user_id: doc.get_i64("user_id").ok()?,
        amount: doc.get_f64("amount").ok()?,
        unit: Unit::parse(doc.get_str("unit").ok()?)?,
        timestamp: parse_db_time(doc.get_str("timestamp").ok()?)?,
        created_at: doc
            .get_str("created_at")
            .ok()
            .and_then(parse_db_time)
            .unwrap_or_default(),
    })
}
