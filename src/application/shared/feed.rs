use crate::domain::entities::{
    Comment, Identified, Notification, Page, PaginatedCollection, Post, User,
};
use crate::domain::value_objects::CacheKey;
use crate::infrastructure::cache::{CacheValue, EntityCache};
use crate::shared::error::Result;
use std::future::Future;

/// フィードとしてキャッシュに載る型と CacheValue の相互変換
pub(crate) trait FeedValue: Identified + Clone {
    fn unwrap_feed(value: CacheValue) -> Option<PaginatedCollection<Self>>;
    fn wrap_feed(feed: PaginatedCollection<Self>) -> CacheValue;
}

impl FeedValue for Post {
    fn unwrap_feed(value: CacheValue) -> Option<PaginatedCollection<Self>> {
        match value {
            CacheValue::PostFeed(feed) => Some(feed),
            _ => None,
        }
    }

    fn wrap_feed(feed: PaginatedCollection<Self>) -> CacheValue {
        CacheValue::PostFeed(feed)
    }
}

impl FeedValue for Comment {
    fn unwrap_feed(value: CacheValue) -> Option<PaginatedCollection<Self>> {
        match value {
            CacheValue::CommentFeed(feed) => Some(feed),
            _ => None,
        }
    }

    fn wrap_feed(feed: PaginatedCollection<Self>) -> CacheValue {
        CacheValue::CommentFeed(feed)
    }
}

impl FeedValue for User {
    fn unwrap_feed(value: CacheValue) -> Option<PaginatedCollection<Self>> {
        match value {
            CacheValue::UserFeed(feed) => Some(feed),
            _ => None,
        }
    }

    fn wrap_feed(feed: PaginatedCollection<Self>) -> CacheValue {
        CacheValue::UserFeed(feed)
    }
}

impl FeedValue for Notification {
    fn unwrap_feed(value: CacheValue) -> Option<PaginatedCollection<Self>> {
        match value {
            CacheValue::NotificationFeed(feed) => Some(feed),
            _ => None,
        }
    }

    fn wrap_feed(feed: PaginatedCollection<Self>) -> CacheValue {
        CacheValue::NotificationFeed(feed)
    }
}

/// 保存済みカーソルで次ページを取得してコレクションへ追記する。
///
/// - カーソルが尽きていれば何もしない（Ok(false)）
/// - 取得失敗時はコレクションを変更せずカーソルも消費しない
///   （同じカーソルでの再試行が安全）
/// - 取得完了時、保存中のカーソルが発行時と変わっていたらページを
///   捨てる。同一カーソルでの二重呼び出しでも追記は一度きりになる
pub(crate) async fn fetch_next_page<T, F, Fut>(
    cache: &EntityCache,
    key: &CacheKey,
    fetch: F,
) -> Result<bool>
where
    T: FeedValue,
    F: FnOnce(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let current = cache.peek(key).and_then(T::unwrap_feed);
    let cursor = match &current {
        Some(collection) => match collection.next_cursor() {
            Some(cursor) => Some(cursor.to_string()),
            None if !collection.is_empty() => return Ok(false),
            None => None,
        },
        None => None,
    };

    let page = fetch(cursor.clone()).await?;

    let mut appended = false;
    cache.write(key, |old| {
        let mut collection = old.and_then(T::unwrap_feed).unwrap_or_default();
        let stored_cursor = collection.next_cursor().map(str::to_string);
        let is_first_page = collection.is_empty() && cursor.is_none();
        if is_first_page || (!collection.is_empty() && stored_cursor == cursor) {
            collection.push_page(page);
            appended = true;
        }
        T::wrap_feed(collection)
    });
    Ok(appended)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Page;
    use chrono::Utc;
    use std::time::Duration;

    fn post(id: &str) -> Post {
        Post::new_with_id(
            id.to_string(),
            User::sample("u1", "alice"),
            format!("content {id}"),
            Utc::now(),
        )
    }

    fn cache() -> EntityCache {
        EntityCache::new(Duration::from_secs(600))
    }

    #[tokio::test]
    async fn test_first_fetch_uses_no_cursor() {
        let cache = cache();
        let key = CacheKey::post_list();

        let appended = fetch_next_page(&cache, &key, |cursor| async move {
            assert!(cursor.is_none());
            Ok(Page::new(vec![post("a")], Some("c2".to_string()), None))
        })
        .await
        .unwrap();

        assert!(appended);
        let feed = Post::unwrap_feed(cache.peek(&key).unwrap()).unwrap();
        assert_eq!(feed.next_cursor(), Some("c2"));
    }

    #[tokio::test]
    async fn test_exhausted_cursor_is_a_noop() {
        let cache = cache();
        let key = CacheKey::post_list();
        cache.set(
            &key,
            CacheValue::PostFeed(PaginatedCollection::from_page(Page::new(
                vec![post("a")],
                None,
                None,
            ))),
        );

        let appended = fetch_next_page::<Post, _, _>(&cache, &key, |_| async move {
            panic!("fetch must not be called without a cursor");
        })
        .await
        .unwrap();

        assert!(!appended);
    }

    #[tokio::test]
    async fn test_double_invoke_with_same_cursor_appends_once() {
        let cache = cache();
        let key = CacheKey::post_list();
        cache.set(
            &key,
            CacheValue::PostFeed(PaginatedCollection::from_page(Page::new(
                vec![post("a")],
                Some("c2".to_string()),
                None,
            ))),
        );

        // どちらも解決前に同じカーソル c2 を読むふたつの fetch_next
        let cache = std::sync::Arc::new(cache);
        let (tx1, rx1) = tokio::sync::oneshot::channel::<()>();
        let (tx2, rx2) = tokio::sync::oneshot::channel::<()>();

        let first = {
            let cache = cache.clone();
            let key = key.clone();
            tokio::spawn(async move {
                fetch_next_page(&cache, &key, |cursor| async move {
                    assert_eq!(cursor.as_deref(), Some("c2"));
                    let _ = rx1.await;
                    Ok(Page::new(vec![post("b")], Some("c3".to_string()), None))
                })
                .await
            })
        };
        let second = {
            let cache = cache.clone();
            let key = key.clone();
            tokio::spawn(async move {
                fetch_next_page(&cache, &key, |cursor| async move {
                    assert_eq!(cursor.as_deref(), Some("c2"));
                    let _ = rx2.await;
                    Ok(Page::new(vec![post("b")], Some("c3".to_string()), None))
                })
                .await
            })
        };

        // 両タスクがカーソルを読んで fetch 待ちに入るまで進める
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        tx1.send(()).unwrap();
        let first_appended = first.await.unwrap().unwrap();
        tx2.send(()).unwrap();
        let second_appended = second.await.unwrap().unwrap();

        assert!(first_appended);
        assert!(!second_appended);
        let feed = Post::unwrap_feed(cache.peek(&key).unwrap()).unwrap();
        let ids: Vec<String> = feed.flatten().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_collection_unchanged() {
        let cache = cache();
        let key = CacheKey::post_list();
        cache.set(
            &key,
            CacheValue::PostFeed(PaginatedCollection::from_page(Page::new(
                vec![post("a")],
                Some("c2".to_string()),
                None,
            ))),
        );

        let result = fetch_next_page::<Post, _, _>(&cache, &key, |_| async move {
            Err(crate::shared::error::AppError::Network("down".to_string()))
        })
        .await;

        assert!(result.is_err());
        let feed = Post::unwrap_feed(cache.peek(&key).unwrap()).unwrap();
        // ページもカーソルも消費されない
        assert_eq!(feed.flatten().len(), 1);
        assert_eq!(feed.next_cursor(), Some("c2"));
    }
}
