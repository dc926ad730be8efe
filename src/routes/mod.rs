use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, status, Responder};
use rocket::serde::json::Json;
use serde_json::{json, Value};

pub mod account;
pub mod auth;
pub mod health;
pub mod reminders;
pub mod stats;
pub mod water;

/// An error answered as `{"message": ...}` with the given status.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: Status,
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        ApiError {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(Status::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Status::NotFound, message)
    }

    pub fn too_many_attempts() -> Self {
        Self::new(Status::TooManyRequests, "Too many attempts, try again later")
    }

    /// Logs the underlying cause; the client only sees "Server error".
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        log::error!("Request failed: {}", cause);
        Self::new(Status::InternalServerError, "Server error")
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        status::Custom(self.status, Json(json!({ "message": self.message }))).respond_to(req)
    }
}

/// `{"message": ...}` with 200, for endpoints that only confirm an action.
pub fn message(text: &str) -> Json<Value> {
    Json(json!({ "message": text }))
}

// ── Catchers ────────────────────────────────────────────

#[catch(400)]
fn bad_request() -> Json<Value> {
    message("Bad request")
}

#[catch(401)]
fn unauthorized() -> Json<Value> {
    message("Access token required")
}

#[catch(403)]
fn forbidden() -> Json<Value> {
    message("Invalid token")
}

#[catch(404)]
fn not_found() -> Json<Value> {
    message("Not found")
}

#[catch(422)]
fn unprocessable() -> Json<Value> {
    message("Invalid request body")
}

#[catch(429)]
fn too_many() -> Json<Value> {
    message("Too many attempts, try again later")
}

#[catch(500)]
fn server_error() -> Json<Value> {
    message("Server error")
}

pub fn catchers() -> Vec<rocket::Catcher> {
    catchers![
        bad_request,
        unauthorized,
        forbidden,
        not_found,
        unprocessable,
        too_many,
        server_error
    ]
}
