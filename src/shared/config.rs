use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// リストや件数キャッシュのフレッシュ期間（秒）
    pub fresh_secs: u64,
    /// フラグ系（hasLiked / isFollowing）のフレッシュ期間（秒）
    pub flag_fresh_secs: u64,
    /// 未使用エントリの保持期間（秒）
    pub retention_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// keyring に登録するサービス名
    pub service_name: String,
    /// keyring が使えない環境でのファイルフォールバックを許可するか
    pub allow_file_fallback: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8000/api".to_string(),
                request_timeout: 30,
            },
            cache: CacheConfig {
                fresh_secs: 300, // 5 minutes
                flag_fresh_secs: 60,
                retention_secs: 600,
            },
            session: SessionConfig {
                service_name: "saezuri".to_string(),
                allow_file_fallback: true,
            },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        // 既定値
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("SAEZURI_API_BASE_URL") {
            let trimmed = v.trim();
            if !trimmed.is_empty() {
                cfg.api.base_url = trimmed.to_string();
            }
        }
        if let Ok(v) = std::env::var("SAEZURI_REQUEST_TIMEOUT") {
            if let Some(value) = parse_u64(&v) {
                cfg.api.request_timeout = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("SAEZURI_CACHE_FRESH_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.cache.fresh_secs = value;
            }
        }
        if let Ok(v) = std::env::var("SAEZURI_CACHE_FLAG_FRESH_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.cache.flag_fresh_secs = value;
            }
        }
        if let Ok(v) = std::env::var("SAEZURI_CACHE_RETENTION_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.cache.retention_secs = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("SAEZURI_ALLOW_FILE_FALLBACK") {
            cfg.session.allow_file_fallback = parse_bool(&v, cfg.session.allow_file_fallback);
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.api.base_url.trim().is_empty() {
            return Err("API base_url must not be empty".to_string());
        }
        if self.api.request_timeout == 0 {
            return Err("API request_timeout must be greater than 0".to_string());
        }
        if self.cache.retention_secs == 0 {
            return Err("Cache retention_secs must be greater than 0".to_string());
        }
        if self.session.service_name.trim().is_empty() {
            return Err("Session service_name must not be empty".to_string());
        }
        Ok(())
    }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_base_url() {
        let mut cfg = AppConfig::default();
        cfg.api.base_url = "  ".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_parse_bool_falls_back_to_default() {
        assert!(parse_bool("yes", false));
        assert!(!parse_bool("off", true));
        assert!(parse_bool("garbage", true));
    }
}
