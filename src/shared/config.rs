use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub sync: SyncConfig,
    pub branding: BrandingConfig,
    pub features: FeatureFlags,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub image_base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_sync: bool,
    pub interval_secs: u64,
    pub push_concurrency: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrandingConfig {
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub show_finance: bool,
    pub show_deals: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: default_database_url(),
                max_connections: 5,
                connection_timeout: 30,
            },
            api: ApiConfig {
                base_url: "http://localhost:8000/api".to_string(),
                image_base_url: "http://localhost:8000/images".to_string(),
                request_timeout_secs: 15,
            },
            sync: SyncConfig {
                auto_sync: true,
                interval_secs: 10,
                push_concurrency: 4,
            },
            branding: BrandingConfig::default(),
            features: FeatureFlags {
                show_finance: true,
                show_deals: true,
            },
        }
    }
}

fn default_database_url() -> String {
    let dir = dirs::data_local_dir()
        .map(|dir| dir.join("pos-sync"))
        .unwrap_or_else(|| std::path::PathBuf::from("./data"));
    format!("sqlite://{}/pos_sync.db?mode=rwc", dir.display())
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup("POS_DATABASE_URL") {
            let v = v.trim();
            if !v.is_empty() {
                cfg.database.url = v.to_string();
            }
        }
        if let Some(value) = lookup("POS_DATABASE_MAX_CONNECTIONS").and_then(|v| parse_u64(&v)) {
            cfg.database.max_connections = value.min(u64::from(u32::MAX)) as u32;
        }

        if let Some(v) = lookup("POS_API_BASE_URL") {
            cfg.api.base_url = normalize_base_url(&v);
        }
        if let Some(v) = lookup("POS_IMAGE_BASE_URL") {
            cfg.api.image_base_url = normalize_base_url(&v);
        }
        if let Some(value) = lookup("POS_REQUEST_TIMEOUT_SECS").and_then(|v| parse_u64(&v)) {
            cfg.api.request_timeout_secs = value.max(1);
        }

        if let Some(v) = lookup("POS_AUTO_SYNC") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Some(value) = lookup("POS_SYNC_INTERVAL_SECS").and_then(|v| parse_u64(&v)) {
            cfg.sync.interval_secs = value.max(1);
        }
        if let Some(value) = lookup("POS_SYNC_PUSH_CONCURRENCY").and_then(|v| parse_u64(&v)) {
            cfg.sync.push_concurrency = (value as usize).max(1);
        }

        cfg.branding.logo_url = lookup("POS_LOGO_URL").filter(|v| !v.trim().is_empty());
        cfg.branding.company_name = lookup("POS_COMPANY_NAME").filter(|v| !v.trim().is_empty());

        if let Some(v) = lookup("POS_SHOW_FINANCE") {
            cfg.features.show_finance = parse_bool(&v, cfg.features.show_finance);
        }
        if let Some(v) = lookup("POS_SHOW_DEALS") {
            cfg.features.show_deals = parse_bool(&v, cfg.features.show_deals);
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.api.base_url.is_empty() {
            return Err("API base_url must not be empty".to_string());
        }
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(format!(
                "API base_url must be an http(s) URL: {}",
                self.api.base_url
            ));
        }
        if self.sync.interval_secs == 0 {
            return Err("Sync interval_secs must be greater than 0".to_string());
        }
        if self.sync.push_concurrency == 0 {
            return Err("Sync push_concurrency must be greater than 0".to_string());
        }
        Ok(())
    }
}

fn normalize_base_url(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}
