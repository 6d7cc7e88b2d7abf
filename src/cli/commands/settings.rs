use std::path::PathBuf;

use crate::config::ClientBoardConfig;
use crate::errors::AppError;

/// Keep the first and last four characters of a secret
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

pub struct SettingsCommand {
    config: ClientBoardConfig,
    save_path: Option<PathBuf>,
}

impl SettingsCommand {
    pub fn new(config: ClientBoardConfig) -> Self {
        Self {
            config,
            save_path: None,
        }
    }

    pub fn with_save_path(mut self, path: Option<PathBuf>) -> Self {
        self.save_path = path;
        self
    }

    pub fn execute(&self) -> Result<(), AppError> {
        let config = &self.config;
        println!("⚙️  CLIENT BOARD SETTINGS");
        println!("========================");
        println!();
        println!("🌐 REMOTE:");
        if config.remote.url.trim().is_empty() {
            println!("   URL:      (not set)");
        } else {
            println!("   URL:      {}", config.remote.url);
        }
        match config.remote.api_key.as_deref() {
            Some(key) if !key.is_empty() => println!("   API key:  {}", mask(key)),
            _ => println!("   API key:  (not set)"),
        }
        println!("   Timeout:  {}s", config.remote.timeout_seconds);
        println!();
        println!("🔍 CNPJ LOOKUP:");
        println!("   URL:      {}", config.lookup.base_url);
        println!("   Cache:    {} entries, {}s TTL", config.lookup.cache_capacity, config.lookup.cache_ttl_seconds);
        println!();
        println!("🔁 RETRY / RATE LIMIT:");
        println!(
            "   Attempts: {} ({}ms → {}ms backoff)",
            config.retry.max_attempts, config.retry.base_delay_ms, config.retry.max_delay_ms
        );
        println!(
            "   Rate:     {}/s, burst {}",
            config.rate_limit.requests_per_second, config.rate_limit.burst_capacity
        );
        println!();
        println!("📁 Session:  {}", config.session.path.display());
        println!("📜 Logs:     {} (json: {})", config.observability.log_level, config.observability.json_logs);

        if !config.remote.is_configured() {
            println!();
            println!("⚠️  Remote service not configured");
            println!("   → export CLIENT_BOARD_REMOTE__URL=https://your-project.supabase.co");
            println!("   → export CLIENT_BOARD_REMOTE__API_KEY=your_anon_key");
        }

        if let Some(path) = &self.save_path {
            config
                .save_to_file(path)
                .map_err(|e| AppError::Config(format!("could not write {}: {e}", path.display())))?;
            println!();
            println!("💾 Saved to {}", path.display());
        }
        Ok(())
    }
}
