use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Directory where uploaded resume files are written before extraction.
    pub upload_dir: String,
    /// Optional Anthropic key. Without it the service runs with the
    /// heuristic explanation provider only.
    pub anthropic_api_key: Option<String>,
    /// Master switch for the LLM explanation step.
    pub enable_ai_explanations: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            upload_dir: std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            enable_ai_explanations: std::env::var("ENABLE_AI_EXPLANATIONS")
                .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
                .unwrap_or(false),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// True only when the flag is on and a key is actually present.
    pub fn ai_explanations_active(&self) -> bool {
        self.enable_ai_explanations && self.anthropic_api_key.is_some()
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            database_url: "postgres://localhost/talentsift".to_string(),
            upload_dir: "uploads".to_string(),
            anthropic_api_key: None,
            enable_ai_explanations: false,
            port: 8080,
            rust_log: "info".to_string(),
        }
    }

    #[test]
    fn test_ai_inactive_without_key() {
        let config = Config {
            enable_ai_explanations: true,
            ..base_config()
        };
        assert!(!config.ai_explanations_active());
    }

    #[test]
    fn test_ai_inactive_without_flag() {
        let config = Config {
            anthropic_api_key: Some("sk-test".to_string()),
            ..base_config()
        };
        assert!(!config.ai_explanations_active());
    }

    #[test]
    fn test_ai_active_with_flag_and_key() {
        let config = Config {
            enable_ai_explanations: true,
            anthropic_api_key: Some("sk-test".to_string()),
            ..base_config()
        };
        assert!(config.ai_explanations_active());
    }
}
