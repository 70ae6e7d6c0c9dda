use serde::{Deserialize, Serialize};

/// アクセストークンとリフレッシュトークンの組
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access: String,
    pub refresh: String,
}

impl AuthTokens {
    pub fn new(access: String, refresh: String) -> Self {
        Self { access, refresh }
    }
}
