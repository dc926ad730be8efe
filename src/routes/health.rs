use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde::Serialize;
use std::sync::Arc;

use crate::store::Store;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub backend: String,
    pub users: i64,
}

#[get("/health")]
pub fn health(store: &State<Arc<dyn Store>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        backend: store.db_backend().to_string(),
        users: store.user_count(),
    })
}

/// CORS preflight. The headers themselves come from the `Cors` fairing.
#[options("/<_..>")]
pub fn preflight() -> Status {
    Status::NoContent
}

pub fn routes() -> Vec<rocket::Route> {
    routes![health, preflight]
}
