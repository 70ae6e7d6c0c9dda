use crate::application::ports::CredentialStore;
use crate::domain::value_objects::AuthTokens;
use crate::shared::error::Result;
use serde_json::json;
use std::fs;
use std::path::PathBuf;

const CREDENTIALS_FILE: &str = "credentials.json";

/// キーリングが使えない環境向けのファイル保存。
/// 平文保存のため開発用途に限る。
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn in_data_dir(service_name: &str) -> Self {
        let mut dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        dir.push(service_name);
        dir.push("secure_storage");
        Self { dir }
    }

    fn file_path(&self) -> PathBuf {
        self.dir.join(CREDENTIALS_FILE)
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<AuthTokens>> {
        let path = self.file_path();
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&path)?;
        let value: serde_json::Value = serde_json::from_str(&data)?;
        let access = value.get("accessToken").and_then(|v| v.as_str());
        let refresh = value.get("refreshToken").and_then(|v| v.as_str());
        match (access, refresh) {
            (Some(access), Some(refresh)) => Ok(Some(AuthTokens::new(
                access.to_string(),
                refresh.to_string(),
            ))),
            _ => Ok(None),
        }
    }

    fn save(&self, tokens: &AuthTokens) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let payload = json!({
            "accessToken": tokens.access,
            "refreshToken": tokens.refresh,
        });
        fs::write(self.file_path(), serde_json::to_string(&payload)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let path = self.file_path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// テスト・組み込み用のインメモリストア
pub struct MemoryCredentialStore {
    tokens: std::sync::Mutex<Option<AuthTokens>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self {
            tokens: std::sync::Mutex::new(None),
        }
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<AuthTokens>> {
        Ok(self
            .tokens
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn save(&self, tokens: &AuthTokens) -> Result<()> {
        *self
            .tokens
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self
            .tokens
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().to_path_buf());

        assert!(store.load().unwrap().is_none());

        let tokens = AuthTokens::new("a1".to_string(), "r1".to_string());
        store.save(&tokens).unwrap();
        assert_eq!(store.load().unwrap(), Some(tokens));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_clear_on_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().to_path_buf());
        assert!(store.clear().is_ok());
    }
}
