// src/config.rs

use std::{env, path::PathBuf, str::FromStr};

use dotenvy::dotenv;

/// Minimum lab score (percent) that counts as a pass.
pub const LAB_PASSING_SCORE: i64 = 75;

/// Leaderboard points awarded for every completed lab.
pub const LAB_COMPLETION_POINTS: i64 = 10;

/// How a new lab result is merged into the stored progress row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressPolicy {
    /// Every submission overwrites the row, even if it scores lower.
    #[default]
    Latest,
    /// Only submissions scoring at least the stored score overwrite it.
    Best,
}

impl FromStr for ProgressPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latest" => Ok(Self::Latest),
            "best" => Ok(Self::Best),
            other => Err(format!("unknown progress policy '{}'", other)),
        }
    }
}

/// How a criterion's `expected_pattern` is matched against submitted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatternMatching {
    /// Literal substring containment.
    #[default]
    Substring,
    /// Patterns are compiled as regular expressions; invalid ones fall back to substring.
    Regex,
}

impl FromStr for PatternMatching {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "substring" => Ok(Self::Substring),
            "regex" => Ok(Self::Regex),
            other => Err(format!("unknown pattern matching mode '{}'", other)),
        }
    }
}

/// Grading knobs handed to the lab engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct GradingSettings {
    pub progress_policy: ProgressPolicy,
    pub pattern_matching: PatternMatching,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Requests allowed per IP per window. `0` disables rate limiting.
    pub rate_limit_requests: u32,
    pub rate_limit_window_secs: u64,
    pub cors_origins: Vec<String>,
    pub grading: GradingSettings,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let progress_policy = env_or("PROGRESS_POLICY", ProgressPolicy::default());
        let pattern_matching = env_or("PATTERN_MATCHING", PatternMatching::default());

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| parse_list(&raw))
            .unwrap_or_else(|_| {
                vec![
                    "http://localhost:5173".to_string(),
                    "http://127.0.0.1:5173".to_string(),
                ]
            });

        Self {
            database_url,
            jwt_secret,
            jwt_expiration: env_or("JWT_EXPIRATION", 86_400),
            rust_log,
            port: env_or("PORT", 3000),
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", 20 * 1024 * 1024),
            rate_limit_requests: env_or("RATE_LIMIT_REQUESTS", 100),
            rate_limit_window_secs: env_or("RATE_LIMIT_WINDOW_SECS", 15 * 60),
            cors_origins,
            grading: GradingSettings {
                progress_policy,
                pattern_matching,
            },
        }
    }
}

/// Reads and parses an optional variable, logging and falling back on bad input.
fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            tracing::warn!("Ignoring invalid {}={:?}: {}", key, raw, e);
            default
        }),
        Err(_) => default,
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_progress_policy() {
        assert_eq!("latest".parse::<ProgressPolicy>(), Ok(ProgressPolicy::Latest));
        assert_eq!(" BEST ".parse::<ProgressPolicy>(), Ok(ProgressPolicy::Best));
        assert!("highest".parse::<ProgressPolicy>().is_err());
    }

    #[test]
    fn parses_pattern_matching() {
        assert_eq!("Regex".parse::<PatternMatching>(), Ok(PatternMatching::Regex));
        assert_eq!("substring".parse::<PatternMatching>(), Ok(PatternMatching::Substring));
        assert!("glob".parse::<PatternMatching>().is_err());
    }

    #[test]
    fn defaults_keep_latest_and_substring() {
        let settings = GradingSettings::default();
        assert_eq!(settings.progress_policy, ProgressPolicy::Latest);
        assert_eq!(settings.pattern_matching, PatternMatching::Substring);
    }

    #[test]
    fn parse_list_skips_blanks() {
        assert_eq!(
            parse_list("http://a.test, ,http://b.test,"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }
}
