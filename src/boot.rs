use log::{error, info, warn};
use std::fs;
use std::path::Path;

use crate::config::{AppConfig, CONFIG_FILE};

/// Run all boot checks. Call this before Rocket launches.
/// Creates the database directory for the SQLite backend and reports
/// anything that will stop the server from working. Returns the number
/// of errors found.
pub fn run(config: &AppConfig) -> u32 {
    info!("Hydrotrack boot check starting...");

    let mut warnings = 0u32;
    let mut errors = 0u32;

    // ── 1. Config file ─────────────────────────────────
    if !Path::new(CONFIG_FILE).exists() {
        warn!("  No {} found, running on defaults", CONFIG_FILE);
        warnings += 1;
    }

    // ── 2. Database directory ──────────────────────────
    if !config.uses_mongodb() {
        match Path::new(&config.database.path).parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                if !dir.exists() {
                    match fs::create_dir_all(dir) {
                        Ok(_) => info!("  Created directory: {}", dir.display()),
                        Err(e) => {
                            error!("  FAILED to create directory {}: {}", dir.display(), e);
                            errors += 1;
                        }
                    }
                }
                if dir.exists() && !is_writable(dir) {
                    error!("  Database directory not writable: {}", dir.display());
                    errors += 1;
                }
            }
            _ => {}
        }
    }

    // ── 3. Auth ────────────────────────────────────────
    if config.auth.bcrypt_cost < bcrypt::DEFAULT_COST {
        warn!(
            "  bcrypt cost {} is below the default of {}",
            config.auth.bcrypt_cost,
            bcrypt::DEFAULT_COST
        );
        warnings += 1;
    }
    if config.server.allowed_origin == "*" {
        info!("  CORS allows any origin");
    }

    if errors > 0 {
        error!(
            "Boot check finished with {} error(s), {} warning(s)",
            errors, warnings
        );
    } else {
        info!("Boot check passed ({} warning(s))", warnings);
    }
    errors
}

fn is_writable(dir: &Path) -> bool {
    let test_file = dir.join(".write_test");
    match fs::write(&test_file, "test") {
        Ok(_) => {
            let _ = fs::remove_file(&test_file);
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_sqlite_directory() {
        let root = std::env::temp_dir().join(format!("hydrotrack-boot-{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        let mut config = AppConfig::default();
        config.database.path = root.join("db/app.db").to_string_lossy().into_owned();

        assert_eq!(run(&config), 0);
        assert!(root.join("db").is_dir());
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn mongodb_backend_skips_directory() {
        let root = std::env::temp_dir().join(format!("hydrotrack-boot-mongo-{}", std::process::id()));
        let mut config = AppConfig::default();
        config.database.backend = "mongodb".to_string();
        config.database.path = root.join("db/app.db").to_string_lossy().into_owned();

        run(&config);
        assert!(!root.exists());
    }
}
