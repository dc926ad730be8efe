use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILE: &str = "hydrotrack.toml";

/// Application config, read from `hydrotrack.toml` and overridden by env vars.
/// Every field has a default so a missing file or table is fine.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub allowed_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 5000,
            allowed_origin: "*".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// "sqlite" or "mongodb"
    pub backend: String,
    pub path: String,
    pub uri: String,
    pub name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            backend: "sqlite".to_string(),
            path: "data/db/hydrotrack.db".to_string(),
            uri: "mongodb://localhost:27017".to_string(),
            name: "hydrotrack".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub token_secret: String,
    pub token_ttl_days: i64,
    pub bcrypt_cost: u32,
    /// Signup/login attempts allowed per client IP in a 15 minute window.
    pub login_rate_limit: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            token_secret: String::new(),
            token_ttl_days: 7,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            login_rate_limit: 10,
        }
    }
}

impl AppConfig {
    /// Load `hydrotrack.toml` from the working directory and apply env overrides.
    pub fn load() -> Result<AppConfig, String> {
        let mut config = Self::from_file(Path::new(CONFIG_FILE))?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<AppConfig, String> {
        if !path.exists() {
            log::info!("No {} found, using defaults", path.display());
            return Ok(AppConfig::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<AppConfig, String> {
        toml::from_str(raw).map_err(|e| format!("Invalid config: {}", e))
    }

    /// `HYDROTRACK_TOKEN_SECRET` (or `JWT_SECRET`), `MONGODB_URI` and `PORT`
    /// take precedence over the file.
    pub fn apply_env<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = get("HYDROTRACK_TOKEN_SECRET").or_else(|| get("JWT_SECRET")) {
            if !secret.is_empty() {
                self.auth.token_secret = secret;
            }
        }
        if let Some(uri) = get("MONGODB_URI") {
            if !uri.is_empty() {
                self.database.uri = uri;
            }
        }
        if let Some(port) = get("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }

    pub fn uses_mongodb(&self) -> bool {
        self.database.backend == "mongodb"
    }
}
