use super::entry::{CacheEntry, CacheStatus};
use super::value::CacheValue;
use crate::domain::value_objects::CacheKey;
use crate::shared::error::Result;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::debug;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEventKind {
    Updated,
    Invalidated,
    Removed,
}

/// 購読者へ同期的に配信されるキャッシュ変更イベント
#[derive(Debug, Clone)]
pub struct CacheEvent {
    pub key: CacheKey,
    pub kind: CacheEventKind,
}

/// プロセス内で共有されるエンティティキャッシュ。
///
/// キャッシュ書き込み（write / invalidate / restore）はロック内で同期的に
/// 完了し、完了と同時に購読者へ通知される。ネットワーク呼び出しだけが
/// 中断点なので、書き込み同士が途中で割り込まれることはない。
pub struct EntityCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    events: broadcast::Sender<CacheEvent>,
    retain_for: Duration,
}

/// ロールバック用のスナップショット。ミューテーション開始時点の
/// 「最後の正常値」だけを持つ（ログやジャーナルは持たない）。
#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    items: Vec<(CacheKey, Option<CacheValue>)>,
}

impl CacheSnapshot {
    pub fn get(&self, key: &CacheKey) -> Option<&Option<CacheValue>> {
        self.items
            .iter()
            .find(|(snapshot_key, _)| snapshot_key == key)
            .map(|(_, value)| value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.items.iter().map(|(key, _)| key)
    }
}

impl EntityCache {
    pub fn new(retain_for: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            entries: Mutex::new(HashMap::new()),
            events,
            retain_for,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(&self, key: &CacheKey, kind: CacheEventKind) {
        let _ = self.events.send(CacheEvent {
            key: key.clone(),
            kind,
        });
    }

    /// 値があればフェッチせずに返す（鮮度は見ない）
    pub fn peek(&self, key: &CacheKey) -> Option<CacheValue> {
        let mut entries = self.lock_entries();
        let entry = entries.get_mut(key)?;
        entry.last_accessed = Instant::now();
        entry.value.clone()
    }

    pub fn status(&self, key: &CacheKey) -> Option<CacheStatus> {
        self.lock_entries().get(key).map(|entry| entry.status)
    }

    pub fn is_stale(&self, key: &CacheKey) -> bool {
        self.lock_entries()
            .get(key)
            .map(|entry| entry.stale)
            .unwrap_or(false)
    }

    /// 楽観的パッチ用の同期書き込み。書き込んだ値は鮮度リセットされ、
    /// 購読者へ即時通知される。
    pub fn write<F>(&self, key: &CacheKey, updater: F) -> CacheValue
    where
        F: FnOnce(Option<CacheValue>) -> CacheValue,
    {
        let value = {
            let mut entries = self.lock_entries();
            let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::empty);
            let value = updater(entry.value.take());
            entry.value = Some(value.clone());
            entry.fetched_at = Some(Instant::now());
            entry.stale = false;
            entry.status = CacheStatus::Idle;
            entry.last_accessed = Instant::now();
            value
        };
        self.notify(key, CacheEventKind::Updated);
        value
    }

    pub fn set(&self, key: &CacheKey, value: CacheValue) {
        self.write(key, |_| value);
    }

    /// 値が既にあるときだけ書き換える（無ければ何もしない）
    pub fn update<F>(&self, key: &CacheKey, mutator: F) -> bool
    where
        F: FnOnce(&mut CacheValue),
    {
        let updated = {
            let mut entries = self.lock_entries();
            match entries.get_mut(key).and_then(|entry| {
                entry.value.as_mut().map(|value| {
                    mutator(value);
                    entry.fetched_at = Some(Instant::now());
                    entry.stale = false;
                    entry.last_accessed = Instant::now();
                })
            }) {
                Some(()) => true,
                None => false,
            }
        };
        if updated {
            self.notify(key, CacheEventKind::Updated);
        }
        updated
    }

    pub fn remove(&self, key: &CacheKey) {
        let removed = self.lock_entries().remove(key).is_some();
        if removed {
            self.notify(key, CacheEventKind::Removed);
        }
    }

    /// プレフィックスに一致するエントリをすべてステイルにする。
    /// 次の読み出しで再フェッチされる。
    pub fn invalidate(&self, prefix: &CacheKey) {
        let touched: Vec<CacheKey> = {
            let mut entries = self.lock_entries();
            entries
                .iter_mut()
                .filter(|(key, _)| prefix.is_prefix_of(key))
                .map(|(key, entry)| {
                    entry.stale = true;
                    key.clone()
                })
                .collect()
        };
        for key in &touched {
            self.notify(key, CacheEventKind::Invalidated);
        }
        debug!(prefix = %prefix, count = touched.len(), "cache invalidated");
    }

    /// プレフィックスに一致するキーの実行中フェッチを破棄する。
    /// 楽観値を適用する前に必ず呼び、古いレスポンスによる上書きを防ぐ。
    pub fn cancel(&self, prefix: &CacheKey) {
        let mut entries = self.lock_entries();
        for (key, entry) in entries.iter_mut() {
            if prefix.is_prefix_of(key) {
                entry.generation += 1;
                if entry.status == CacheStatus::Loading {
                    entry.status = CacheStatus::Idle;
                }
            }
        }
    }

    /// ミューテーションが触るキーの現在値を丸ごと控える
    pub fn snapshot(&self, keys: &[CacheKey]) -> CacheSnapshot {
        let entries = self.lock_entries();
        CacheSnapshot {
            items: keys
                .iter()
                .map(|key| (key.clone(), entries.get(key).and_then(|e| e.value.clone())))
                .collect(),
        }
    }

    /// スナップショット時点の値へ戻す。当時存在しなかったキーは削除する。
    pub fn restore(&self, snapshot: &CacheSnapshot) {
        for (key, value) in &snapshot.items {
            match value {
                Some(value) => {
                    self.set(key, value.clone());
                }
                None => {
                    self.remove(key);
                }
            }
        }
    }

    /// 保持期間を超えてアクセスされていないエントリを破棄する
    pub fn cleanup_expired(&self) -> usize {
        let mut entries = self.lock_entries();
        let before = entries.len();
        let retain_for = self.retain_for;
        entries.retain(|_, entry| entry.last_accessed.elapsed() < retain_for);
        before - entries.len()
    }

    /// ログアウト時の一括破棄
    pub fn clear(&self) {
        self.lock_entries().clear();
        debug!("cache cleared");
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    /// 読み出し。フレッシュな値はそのまま返し、それ以外は fetcher を
    /// 実行して結果を格納する。取得中にキャンセルされた場合は結果を
    /// 捨て、キャッシュ上の現在値（楽観値）を返す。
    pub async fn read_through<F, Fut>(
        &self,
        key: &CacheKey,
        fresh_for: Duration,
        fetch: F,
    ) -> Result<CacheValue>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CacheValue>>,
    {
        let generation = {
            let mut entries = self.lock_entries();
            let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::empty);
            entry.last_accessed = Instant::now();

            if let Some(value) = &entry.value {
                let fresh = !entry.stale
                    && entry
                        .fetched_at
                        .map(|at| at.elapsed() < fresh_for)
                        .unwrap_or(false);
                if fresh {
                    return Ok(value.clone());
                }
            }
            entry.status = CacheStatus::Loading;
            entry.generation
        };

        match fetch().await {
            Ok(value) => {
                let (stored, current) = {
                    let mut entries = self.lock_entries();
                    let entry =
                        entries.entry(key.clone()).or_insert_with(CacheEntry::empty);
                    if entry.generation != generation {
                        // キャンセル済み。結果は捨て、キャッシュ上の現在値を返す
                        (false, entry.value.clone())
                    } else {
                        entry.value = Some(value.clone());
                        entry.fetched_at = Some(Instant::now());
                        entry.stale = false;
                        entry.status = CacheStatus::Idle;
                        entry.last_accessed = Instant::now();
                        (true, None)
                    }
                };
                if stored {
                    self.notify(key, CacheEventKind::Updated);
                    return Ok(value);
                }
                Ok(current.unwrap_or(value))
            }
            Err(err) => {
                let mut entries = self.lock_entries();
                if let Some(entry) = entries.get_mut(key) {
                    if entry.generation == generation {
                        entry.status = CacheStatus::Error;
                    }
                    if let Some(value) = &entry.value {
                        // stale-while-error: 直前の正常値を返し続ける
                        return Ok(value.clone());
                    }
                }
                Err(err)
            }
        }
    }
}
