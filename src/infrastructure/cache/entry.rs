use super::value::CacheValue;
use std::time::Instant;

/// キャッシュエントリの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Idle,
    Loading,
    Error,
}

/// 1 キー分のキャッシュエントリ。フェッチ失敗時も最後の正常値は
/// 保持したまま status だけ Error にする（stale-while-error）。
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Option<CacheValue>,
    pub fetched_at: Option<Instant>,
    pub status: CacheStatus,
    pub stale: bool,
    /// キャンセルのための世代番号。cancel でインクリメントされ、
    /// 古い世代のフェッチ完了は書き込まれない。
    pub(crate) generation: u64,
    pub(crate) last_accessed: Instant,
}

impl CacheEntry {
    pub(crate) fn empty() -> Self {
        Self {
            value: None,
            fetched_at: None,
            status: CacheStatus::Idle,
            stale: false,
            generation: 0,
            last_accessed: Instant::now(),
        }
    }
}
