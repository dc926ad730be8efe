use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::models::user::PublicUser;
use crate::rate_limit::{RateLimiter, AUTH_WINDOW, CLEANUP_THRESHOLD};
use crate::security::auth::{self, AuthUser, ClientIp};
use crate::security::token::TokenKeys;
use crate::store::Store;

use super::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

fn rate_key(bucket: &str, client_ip: &ClientIp) -> String {
    format!("{}:{}", bucket, auth::hash_ip(&client_ip.0))
}

fn check_rate_limit(
    limiter: &RateLimiter,
    config: &AppConfig,
    bucket: &str,
    client_ip: &ClientIp,
) -> ApiResult<()> {
    if limiter.tracked_keys() > CLEANUP_THRESHOLD {
        limiter.cleanup(AUTH_WINDOW);
    }
    let key = rate_key(bucket, client_ip);
    let max_attempts = config.auth.login_rate_limit.max(1);
    if limiter.check_and_record(&key, max_attempts, AUTH_WINDOW) {
        Ok(())
    } else {
        log::warn!("Rate limited {} attempt", bucket);
        Err(ApiError::too_many_attempts())
    }
}

#[post("/signup", format = "json", data = "<body>")]
pub fn signup(
    body: Json<Credentials>,
    store: &State<Arc<dyn Store>>,
    keys: &State<TokenKeys>,
    config: &State<AppConfig>,
    limiter: &State<RateLimiter>,
    client_ip: ClientIp,
) -> ApiResult<status::Custom<Json<AuthResponse>>> {
    check_rate_limit(limiter, config, "signup", &client_ip)?;

    let email = auth::normalize_email(&body.email);
    if !auth::is_plausible_email(&email) {
        return Err(ApiError::bad_request("A valid email is required"));
    }
    if body.password.chars().count() < auth::MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters",
            auth::MIN_PASSWORD_LEN
        )));
    }
    if store.user_get_by_email(&email).is_some() {
        return Err(ApiError::bad_request("User already exists"));
    }

    let hash = auth::hash_password(&body.password, config.auth.bcrypt_cost)
        .map_err(ApiError::internal)?;
    // A concurrent signup can still win the race to the unique index
    let id = store
        .user_create(&email, &hash)
        .map_err(|_| ApiError::bad_request("User already exists"))?;

    log::info!("New user {} signed up", id);
    let token = keys.issue(id, &email);
    Ok(status::Custom(
        Status::Created,
        Json(AuthResponse {
            token,
            user: PublicUser { id, email },
        }),
    ))
}

#[post("/login", format = "json", data = "<body>")]
pub fn login(
    body: Json<Credentials>,
    store: &State<Arc<dyn Store>>,
    keys: &State<TokenKeys>,
    config: &State<AppConfig>,
    limiter: &State<RateLimiter>,
    client_ip: ClientIp,
) -> ApiResult<Json<AuthResponse>> {
    check_rate_limit(limiter, config, "login", &client_ip)?;

    let email = auth::normalize_email(&body.email);
    let user = match store.user_get_by_email(&email) {
        Some(u) if auth::verify_password(&body.password, &u.password_hash) => u,
        _ => {
            log::info!("Failed login attempt");
            return Err(ApiError::bad_request("Invalid credentials"));
        }
    };

    limiter.reset(&rate_key("login", &client_ip));
    Ok(Json(AuthResponse {
        token: keys.issue(user.id, &user.email),
        user: user.public(),
    }))
}

#[get("/me")]
pub fn me(auth: AuthUser) -> Json<PublicUser> {
    Json(auth.user.public())
}

pub fn routes() -> Vec<rocket::Route> {
    routes![signup, login, me]
}
