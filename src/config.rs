//! Layered configuration: compiled defaults, then `portal.toml`, then
//! `PORTAL_`-prefixed environment variables (`PORTAL_SUPABASE__ANON_KEY`).

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "portal.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub basic: BasicConfig,
    pub supabase: SupabaseConfig,
    pub storage: StorageConfig,
    pub display: DisplayConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub loglevel: String,
    /// Key material for the private session cookie; at least 64 bytes.
    /// A random key is generated at startup when empty.
    pub cookie_secret: String,
    pub insecure_cookie: bool,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            cookie_secret: String::new(),
            insecure_cookie: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupabaseConfig {
    pub url: Url,
    pub anon_key: String,
    /// Used for table and storage writes when set; falls back to `anon_key`.
    pub service_role_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("http://localhost:54321").expect("static url"),
            anon_key: String::new(),
            service_role_key: None,
            timeout_secs: 15,
        }
    }
}

impl SupabaseConfig {
    pub fn api_key(&self) -> &str {
        self.service_role_key.as_deref().unwrap_or(&self.anon_key)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Which adapter answers relational queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableBackend {
    Supabase,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub tables: TableBackend,
    pub database_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            tables: TableBackend::Supabase,
            database_url: "sqlite:data/portal.sqlite".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Viewports narrower than this many logical pixels are "mobile".
    pub mobile_breakpoint: u32,
    pub rotation_interval_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            mobile_breakpoint: 768,
            rotation_interval_ms: 5_000,
        }
    }
}

impl DisplayConfig {
    pub fn rotation_interval(&self) -> Duration {
        Duration::from_millis(self.rotation_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_body_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Load from the default file location (or `PORTAL_CONFIG`) and the environment.
    pub fn load() -> Result<Self, figment::Error> {
        let path =
            std::env::var("PORTAL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::figment(&path).extract()
    }

    pub fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("PORTAL_").split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_display_rules() {
        let cfg = Config::default();
        assert_eq!(cfg.display.mobile_breakpoint, 768);
        assert_eq!(cfg.display.rotation_interval(), Duration::from_secs(5));
        assert_eq!(cfg.storage.tables, TableBackend::Supabase);
    }

    #[test]
    fn toml_overrides_defaults_per_section() {
        let cfg: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::string(
                r#"
                [supabase]
                url = "https://example.supabase.co"
                anon_key = "anon"

                [storage]
                tables = "sqlite"
                "#,
            ))
            .extract()
            .unwrap();
        assert_eq!(cfg.supabase.url.as_str(), "https://example.supabase.co/");
        assert_eq!(cfg.supabase.api_key(), "anon");
        assert_eq!(cfg.storage.tables, TableBackend::Sqlite);
        assert_eq!(cfg.basic.listen_addr, "0.0.0.0:8000");
    }

    #[test]
    fn service_role_key_wins_over_anon_key() {
        let mut cfg = SupabaseConfig::default();
        cfg.anon_key = "anon".into();
        cfg.service_role_key = Some("service".into());
        assert_eq!(cfg.api_key(), "service");
    }
}
