use std::env;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use tracing::Level;

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    /// Unset means records are kept in memory only.
    pub database_url: Option<String>,
    pub api_prefix: String,

    // Capture forms
    pub form_ttl_secs: u64,
    pub max_photo_bytes: usize,

    // Outbound capabilities
    pub face_detector_url: String,
    pub geocoder_url: String,
    pub http_timeout_secs: u64,

    // Rate limiting
    pub rate_capture_per_min: u32,
    pub rate_records_per_min: u32,

    // Logging
    pub log_dir: String,
    pub log_level: Level,
}

/// Reads `key`, falling back to `default` when unset or unparseable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    parse_or(key, env::var(key).ok().as_deref(), default)
}

fn parse_or<T: FromStr>(key: &str, raw: Option<&str>, default: T) -> T {
    match raw {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            eprintln!("{key}={raw:?} is not valid, using the default");
            default
        }),
        None => default,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:8080".to_string(),
            database_url: None,
            api_prefix: "/api".to_string(),
            form_ttl_secs: 900, // 15 min
            max_photo_bytes: 8 * 1024 * 1024,
            face_detector_url: "http://127.0.0.1:8090/detect".to_string(),
            geocoder_url: "https://nominatim.openstreetmap.org".to_string(),
            http_timeout_secs: 10,
            rate_capture_per_min: 60,
            rate_records_per_min: 600,
            log_dir: "logs".to_string(),
            log_level: Level::DEBUG,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();
        let d = Self::default();

        Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or(d.server_addr),
            database_url: env::var("DATABASE_URL").ok().filter(|u| !u.trim().is_empty()),
            api_prefix: env::var("API_PREFIX").unwrap_or(d.api_prefix),

            form_ttl_secs: env_or("FORM_TTL_SECS", d.form_ttl_secs),
            max_photo_bytes: env_or("MAX_PHOTO_BYTES", d.max_photo_bytes),

            face_detector_url: env::var("FACE_DETECTOR_URL").unwrap_or(d.face_detector_url),
            geocoder_url: env::var("GEOCODER_URL").unwrap_or(d.geocoder_url),
            http_timeout_secs: env_or("HTTP_TIMEOUT_SECS", d.http_timeout_secs),

            rate_capture_per_min: env_or("RATE_CAPTURE_PER_MIN", d.rate_capture_per_min),
            rate_records_per_min: env_or("RATE_RECORDS_PER_MIN", d.rate_records_per_min),

            log_dir: env::var("LOG_DIR").unwrap_or(d.log_dir),
            log_level: env_or("LOG_LEVEL", d.log_level),
        }
    }

    pub fn form_ttl(&self) -> Duration {
        Duration::from_secs(self.form_ttl_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
