use super::file_store::FileCredentialStore;
use crate::application::ports::CredentialStore;
use crate::domain::value_objects::AuthTokens;
use crate::shared::error::{AppError, Result};
use keyring::Entry;
use tracing::debug;

/// 永続化に使う固定キー名
const ACCESS_TOKEN_KEY: &str = "accessToken";
const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// OS のキーリングに資格情報を保存するストア。
/// キーリングが使えない環境（WSL 等）ではファイルフォールバックに切り替える。
pub struct KeyringCredentialStore {
    service_name: String,
    fallback: Option<FileCredentialStore>,
}

impl KeyringCredentialStore {
    pub fn new(service_name: impl Into<String>, allow_file_fallback: bool) -> Self {
        let service_name = service_name.into();
        let fallback = if allow_file_fallback {
            Some(FileCredentialStore::in_data_dir(&service_name))
        } else {
            None
        };
        Self {
            service_name,
            fallback,
        }
    }

    /// WSL環境かどうかを検出
    fn is_wsl() -> bool {
        if cfg!(target_os = "linux") {
            if let Ok(osrelease) = std::fs::read_to_string("/proc/sys/kernel/osrelease") {
                return osrelease.to_lowercase().contains("microsoft");
            }
        }
        false
    }

    fn use_fallback(&self) -> Option<&FileCredentialStore> {
        if Self::is_wsl() {
            self.fallback.as_ref()
        } else {
            None
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service_name, key).map_err(AppError::from)
    }

    fn read_entry(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn delete_entry(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) => Ok(()),
            // 既に削除されている場合もOK
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn load(&self) -> Result<Option<AuthTokens>> {
        if let Some(fallback) = self.use_fallback() {
            return fallback.load();
        }

        let access = self.read_entry(ACCESS_TOKEN_KEY)?;
        let refresh = self.read_entry(REFRESH_TOKEN_KEY)?;
        match (access, refresh) {
            (Some(access), Some(refresh)) => Ok(Some(AuthTokens::new(access, refresh))),
            _ => Ok(None),
        }
    }

    fn save(&self, tokens: &AuthTokens) -> Result<()> {
        if let Some(fallback) = self.use_fallback() {
            debug!("Keyring unavailable, using file fallback for credentials");
            return fallback.save(tokens);
        }

        self.entry(ACCESS_TOKEN_KEY)?
            .set_password(&tokens.access)
            .map_err(AppError::from)?;
        self.entry(REFRESH_TOKEN_KEY)?
            .set_password(&tokens.refresh)
            .map_err(AppError::from)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if let Some(fallback) = self.use_fallback() {
            return fallback.clear();
        }

        self.delete_entry(ACCESS_TOKEN_KEY)?;
        self.delete_entry(REFRESH_TOKEN_KEY)?;
        Ok(())
    }
}
