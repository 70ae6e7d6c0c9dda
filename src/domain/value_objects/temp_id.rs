use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 一時 ID の予約プレフィックス。この接頭辞を持つ ID はサーバーへ送らない。
const TEMP_PREFIX: &str = "temp-";

/// サーバー未確定エンティティのプレースホルダー ID。
/// `temp-<ミリ秒時刻>-<乱数>` 形式で、ミューテーションごとに一意。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TempId(String);

impl TempId {
    pub fn generate() -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let suffix: u32 = rand::thread_rng().gen();
        Self(format!("{TEMP_PREFIX}{millis}-{suffix:08x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ID が一時 ID かどうか
pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_PREFIX)
}
