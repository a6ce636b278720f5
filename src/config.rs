use diesel::connection::SimpleConnection;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection};
use diesel::sqlite::SqliteConnection;
use std::env;
use std::path::PathBuf;
use log::warn;
use rand::{thread_rng, Rng};
use rand::distributions::Alphanumeric;

// Type aliases
pub type DbPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

// SQLite keeps foreign keys off unless every connection opts in, and the
// busy timeout keeps concurrent writers from failing fast with SQLITE_BUSY.
#[derive(Debug)]
struct ConnectionPragmas;

impl CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionPragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        conn.batch_execute("PRAGMA busy_timeout = 5000; PRAGMA foreign_keys = ON;")
            .map_err(r2d2::Error::QueryError)
    }
}

pub fn create_pool(database_url: &str) -> Result<DbPool, r2d2::PoolError> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    r2d2::Pool::builder()
        .connection_customizer(Box::new(ConnectionPragmas))
        .build(manager)
}

/// Runs the idempotent bootstrap script against a fresh connection. Called
/// explicitly at startup, never as a side effect of opening the pool.
pub fn initialize_schema(conn: &mut SqliteConnection) -> diesel::QueryResult<()> {
    conn.batch_execute(DB_INIT_SQL)
}

// Database initialization SQL
pub const DB_INIT_SQL: &str = r#"
-- Create tables if they don't exist
CREATE TABLE IF NOT EXISTS roles (
    role_id INTEGER PRIMARY KEY AUTOINCREMENT,
    role_name TEXT UNIQUE NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    user_id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    role_id INTEGER NOT NULL REFERENCES roles (role_id)
);

CREATE TABLE IF NOT EXISTS countries (
    country_id INTEGER PRIMARY KEY AUTOINCREMENT,
    country_name TEXT UNIQUE NOT NULL
);

CREATE TABLE IF NOT EXISTS vacations (
    vacation_id INTEGER PRIMARY KEY AUTOINCREMENT,
    country_id INTEGER NOT NULL REFERENCES countries (country_id),
    destination TEXT NOT NULL,
    description TEXT NOT NULL,
    start_date DATE NOT NULL,
    end_date DATE NOT NULL,
    price DOUBLE NOT NULL,
    image_filename TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS likes (
    user_id INTEGER NOT NULL REFERENCES users (user_id) ON DELETE CASCADE,
    vacation_id INTEGER NOT NULL REFERENCES vacations (vacation_id) ON DELETE CASCADE,
    PRIMARY KEY (user_id, vacation_id)
);

-- Insert the fixed roles if not present; the ids are load-bearing
INSERT INTO roles (role_id, role_name)
VALUES
    (1, 'Admin'),
    (2, 'User')
ON CONFLICT DO NOTHING;
"#;

// Config
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub jwt_expiry: i64, // In hours
    pub port: u16,
    pub images_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(val) => val,
            Err(e) => {
                warn!("Failed to load JWT_SECRET: {}", e);
                warn!("Generated a one-off secret; issued tokens will not survive a restart");
                Self::generate_secure_secret()
            }
        };

        let jwt_expiry = env::var("JWT_EXPIRY_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(24);

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(5003);

        let images_dir = env::var("IMAGES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("images"));

        Self { jwt_secret, jwt_expiry, port, images_dir }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.jwt_secret.is_empty() {
            return Err("JWT_SECRET must not be empty".to_string());
        }

        if self.jwt_expiry <= 0 {
            return Err("JWT_EXPIRY_HOURS must be positive".to_string());
        }

        if self.images_dir.as_os_str().is_empty() {
            return Err("IMAGES_DIR must not be empty".to_string());
        }

        Ok(())
    }

    pub fn generate_secure_secret() -> String {
        thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> AppConfig {
        AppConfig {
            jwt_secret: "secret".to_string(),
            jwt_expiry: 24,
            port: 5003,
            images_dir: PathBuf::from("images"),
        }
    }

    #[test]
    fn generated_secret_is_long_enough() {
        let secret = AppConfig::generate_secure_secret();
        assert_eq!(secret.len(), 32);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn generated_secrets_differ() {
        assert_ne!(
            AppConfig::generate_secure_secret(),
            AppConfig::generate_secure_secret()
        );
    }

    #[test]
    fn from_env_falls_back_to_defaults() {
        // No other test touches these variables, so clearing them is safe
        // even with tests running in parallel
        for key in ["JWT_SECRET", "JWT_EXPIRY_HOURS", "PORT", "IMAGES_DIR"] {
            env::remove_var(key);
        }

        let config = AppConfig::from_env();
        assert_eq!(config.port, 5003);
        assert_eq!(config.jwt_expiry, 24);
        assert_eq!(config.images_dir, PathBuf::from("images"));
        assert!(!config.jwt_secret.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_accepts_sane_config() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_secret() {
        let mut config = sample_config();
        config.jwt_secret = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_positive_expiry() {
        let mut config = sample_config();
        config.jwt_expiry = 0;
        assert!(config.validate().is_err());
    }
}
