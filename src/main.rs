#[macro_use]
extern crate rocket;

mod boot;
mod config;
mod cors;
mod db;
mod models;
mod rate_limit;
mod reminders;
mod routes;
mod security;
mod stats;
mod store;
mod units;


use rocket::{Build, Rocket};
use std::sync::Arc;

use config::AppConfig;
use rate_limit::RateLimiter;
use security::token::TokenKeys;
use store::mongo::MongoStore;
use store::sqlite::SqliteStore;
use store::Store;

/// Assemble the server around an already-migrated store.
pub fn build_rocket(store: Arc<dyn Store>, config: AppConfig, keys: TokenKeys) -> Rocket<Build> {
    let figment = rocket::Config::figment().merge(("port", config.server.port));
    let cors = cors::Cors {
        allowed_origin: config.server.allowed_origin.clone(),
    };

    rocket::custom(figment)
        .manage(store)
        .manage(keys)
        .manage(RateLimiter::new())
        .manage(config)
        .attach(cors)
        .mount("/api/auth", routes::auth::routes())
        .mount("/api", routes::water::routes())
        .mount("/api", routes::stats::routes())
        .mount("/api", routes::account::routes())
        .mount("/api", routes::reminders::routes())
        .mount("/api", routes::health::routes())
        .register("/", routes::catchers())
}

fn open_store(config: &AppConfig) -> Result<Arc<dyn Store>, String> {
    let store: Arc<dyn Store> = if config.uses_mongodb() {
        let mongo = MongoStore::new(&config.database.uri, &config.database.name)?;
        mongo.test_connection()?;
        Arc::new(mongo)
    } else {
        Arc::new(SqliteStore::new_at(&config.database.path)?)
    };
    store.run_migrations()?;
    Ok(store)
}

#[launch]
fn rocket() -> _ {
    env_logger::init();

    let mut config = AppConfig::load().expect("Failed to load configuration");
    if config.auth.token_secret.is_empty() {
        log::warn!("No token secret configured; generated one for this run, sessions will not survive a restart");
        config.auth.token_secret = TokenKeys::random_secret();
    }

    // Boot check: create the data directory, report problems
    if boot::run(&config) > 0 {
        log::error!("Boot check failed, see errors above");
        std::process::exit(1);
    }

    let store = open_store(&config).expect("Failed to initialize database");
    log::info!(
        "Using {} backend with {} registered user(s)",
        store.db_backend(),
        store.user_count()
    );

    let keys = TokenKeys::new(&config.auth.token_secret, config.auth.token_ttl_days);
    build_rocket(store, config, keys)
}
