use super::{Mutation, MutationReply, MutationStatus};
use crate::application::ports::FeedGateway;
use crate::domain::entities::{Comment, PaginatedCollection, Post, User};
use crate::domain::value_objects::{is_temp_id, CacheKey};
use crate::infrastructure::cache::{CacheValue, EntityCache};
use crate::infrastructure::session::SessionHandle;
use crate::shared::error::{AppError, Result};
use std::sync::Arc;
use tracing::{debug, warn};

/// ミューテーションが触るキーと、確定後にステイルにするキーの集合
struct MutationPlan {
    touched: Vec<CacheKey>,
    fanout: Vec<CacheKey>,
}

/// コメント操作のファンアウトに使う親子コンテキスト
/// （キャッシュ上の detail から引く。無ければ分かる範囲だけ）
#[derive(Default)]
struct CommentContext {
    post_id: Option<String>,
    parent_comment_id: Option<String>,
}

/// 楽観的ミューテーションの実行機。すべての書き込み操作を
/// 同じプロトコルで処理する:
///
/// 1. 触るキーの実行中フェッチをキャンセル
/// 2. 触るキーの現在値をスナップショット
/// 3. 予測後状態を同期的にキャッシュへ書き込む（ネットワークは待たない）
/// 4. FeedGateway へ実リクエストを発行
/// 5. 成功: 一時エンティティを相関 ID でサーバー確定値に置換し、
///    依存領域をステイルにする
/// 6. 失敗: スナップショットへ復元し、同じ依存領域をステイルにして
///    サーバー真値との再同期に倒す
///
/// 同一ターゲットへの並行ミューテーションは直列化しない。投機値は
/// 後勝ちで、スナップショット/ロールバックの対は各ミューテーション
/// 自身のものに閉じる。両方失敗した場合の一時的なカウントずれは
/// 手順 6 の無効化で回収される（UI 側は操作中のコントロール無効化で
/// 重複発行を防ぐ想定）。
pub struct MutationEngine {
    cache: Arc<EntityCache>,
    gateway: Arc<dyn FeedGateway>,
    session: Arc<SessionHandle>,
}

impl MutationEngine {
    pub fn new(
        cache: Arc<EntityCache>,
        gateway: Arc<dyn FeedGateway>,
        session: Arc<SessionHandle>,
    ) -> Self {
        Self {
            cache,
            gateway,
            session,
        }
    }

    pub async fn execute(&self, mutation: Mutation) -> Result<MutationReply> {
        let viewer = self.session.viewer().ok_or_else(|| {
            AppError::Auth("A signed-in user is required for this operation".to_string())
        })?;

        let plan = self.plan(&mutation, &viewer);
        debug!(
            mutation = mutation.name(),
            status = ?MutationStatus::Pending,
            keys = plan.touched.len(),
            "mutation dispatched"
        );

        for key in &plan.touched {
            self.cache.cancel(key);
        }
        let snapshot = self.cache.snapshot(&plan.touched);

        self.apply_speculative(&mutation, &viewer);

        match self.dispatch(&mutation).await {
            Ok(reply) => {
                self.reconcile(&mutation, &reply);
                if !matches!(reply, MutationReply::Simulated) {
                    for key in &plan.fanout {
                        self.cache.invalidate(key);
                    }
                }
                debug!(
                    mutation = mutation.name(),
                    status = ?MutationStatus::Success,
                    "mutation settled"
                );
                Ok(reply)
            }
            Err(err) => {
                self.cache.restore(&snapshot);
                // 投機書き込みがスナップショット外の派生ビューを
                // 汚している可能性があるため、失敗時も無効化する
                for key in &plan.fanout {
                    self.cache.invalidate(key);
                }
                warn!(
                    mutation = mutation.name(),
                    status = ?MutationStatus::Error,
                    "mutation rolled back: {err}"
                );
                Err(err)
            }
        }
    }

    fn comment_context(&self, comment_id: &str) -> CommentContext {
        match self
            .cache
            .peek(&CacheKey::comment_detail(comment_id))
            .as_ref()
            .and_then(CacheValue::as_comment)
        {
            Some(comment) => CommentContext {
                post_id: Some(comment.post_id.clone()),
                parent_comment_id: comment.parent_id().map(str::to_string),
            },
            None => CommentContext::default(),
        }
    }

    fn plan(&self, mutation: &Mutation, viewer: &User) -> MutationPlan {
        match mutation {
            Mutation::LikePost { post_id } | Mutation::UnlikePost { post_id } => {
                let count = CacheKey::post_likes_count(post_id);
                let flag = CacheKey::post_has_liked(post_id);
                MutationPlan {
                    touched: vec![count.clone(), flag.clone()],
                    fanout: vec![
                        count,
                        flag,
                        CacheKey::post_list(),
                        CacheKey::post_following(),
                        CacheKey::user_posts(&viewer.id),
                        CacheKey::post_detail(post_id),
                    ],
                }
            }
            Mutation::LikeComment { comment_id } | Mutation::UnlikeComment { comment_id } => {
                let count = CacheKey::comment_likes_count(comment_id);
                let flag = CacheKey::comment_has_liked(comment_id);
                let context = self.comment_context(comment_id);
                let mut fanout = vec![count.clone(), flag.clone()];
                if let Some(post_id) = &context.post_id {
                    fanout.push(CacheKey::comment_root_list(post_id));
                }
                if let Some(parent_id) = &context.parent_comment_id {
                    fanout.push(CacheKey::comment_replies_list(parent_id));
                    fanout.push(CacheKey::comment_detail(parent_id));
                }
                fanout.push(CacheKey::comment_detail(comment_id));
                MutationPlan {
                    touched: vec![count, flag],
                    fanout,
                }
            }
            Mutation::FollowUser { target_user_id } | Mutation::UnfollowUser { target_user_id } => {
                MutationPlan {
                    touched: vec![
                        CacheKey::followers_count(target_user_id),
                        CacheKey::following_count(&viewer.id),
                        CacheKey::is_following(&viewer.id, target_user_id),
                        CacheKey::suggested_users(),
                    ],
                    fanout: vec![
                        CacheKey::followers_count(target_user_id),
                        CacheKey::following_count(&viewer.id),
                        CacheKey::is_following(&viewer.id, target_user_id),
                        CacheKey::followers_list(target_user_id),
                        CacheKey::following_list(&viewer.id),
                        CacheKey::post_following(),
                        CacheKey::suggested_users(),
                    ],
                }
            }
            Mutation::CreatePost { .. } => {
                let keys = vec![
                    CacheKey::post_list(),
                    CacheKey::post_following(),
                    CacheKey::user_posts(&viewer.id),
                    CacheKey::post_count(&viewer.id),
                ];
                MutationPlan {
                    touched: keys.clone(),
                    fanout: keys,
                }
            }
            Mutation::DeletePost { post_id } => {
                let fanout = vec![
                    CacheKey::post_list(),
                    CacheKey::post_following(),
                    CacheKey::user_posts(&viewer.id),
                    CacheKey::post_count(&viewer.id),
                ];
                let mut touched = fanout.clone();
                touched.push(CacheKey::post_detail(post_id));
                MutationPlan { touched, fanout }
            }
            Mutation::CreateComment { draft } => match &draft.parent_comment_id {
                None => {
                    let root = CacheKey::comment_root_list(&draft.post_id);
                    MutationPlan {
                        touched: vec![root.clone()],
                        fanout: vec![root, CacheKey::post_detail(&draft.post_id)],
                    }
                }
                Some(parent_id) => {
                    let replies = CacheKey::comment_replies_list(parent_id);
                    let parent_detail = CacheKey::comment_detail(parent_id);
                    MutationPlan {
                        touched: vec![
                            CacheKey::comment_root_list(&draft.post_id),
                            replies.clone(),
                            parent_detail.clone(),
                        ],
                        fanout: vec![replies, parent_detail],
                    }
                }
            },
            Mutation::DeleteComment { comment_id } => {
                let context = self.comment_context(comment_id);
                let mut touched = vec![CacheKey::comment_detail(comment_id)];
                let mut fanout = Vec::new();
                if let Some(post_id) = &context.post_id {
                    touched.push(CacheKey::comment_root_list(post_id));
                    fanout.push(CacheKey::comment_root_list(post_id));
                    fanout.push(CacheKey::post_detail(post_id));
                }
                if let Some(parent_id) = &context.parent_comment_id {
                    touched.push(CacheKey::comment_replies_list(parent_id));
                    touched.push(CacheKey::comment_detail(parent_id));
                    fanout.push(CacheKey::comment_replies_list(parent_id));
                    fanout.push(CacheKey::comment_detail(parent_id));
                }
                MutationPlan { touched, fanout }
            }
            Mutation::UpdateProfile { .. } => MutationPlan {
                touched: vec![CacheKey::current_user()],
                fanout: vec![CacheKey::current_user()],
            },
            Mutation::MarkNotificationRead { .. } | Mutation::MarkAllNotificationsRead => {
                MutationPlan {
                    touched: vec![CacheKey::notification_list()],
                    fanout: vec![CacheKey::notification_list()],
                }
            }
        }
    }

    /// 手順 3: 予測後状態の同期書き込み。現在のキャッシュ状態と
    /// ミューテーション入力だけの純関数で、ネットワークを待たない。
    fn apply_speculative(&self, mutation: &Mutation, viewer: &User) {
        match mutation {
            Mutation::LikePost { post_id } => {
                self.bump_count(&CacheKey::post_likes_count(post_id), 1);
                self.cache
                    .set(&CacheKey::post_has_liked(post_id), CacheValue::Flag(true));
            }
            Mutation::UnlikePost { post_id } => {
                self.bump_count(&CacheKey::post_likes_count(post_id), -1);
                self.cache
                    .set(&CacheKey::post_has_liked(post_id), CacheValue::Flag(false));
            }
            Mutation::LikeComment { comment_id } => {
                self.bump_count(&CacheKey::comment_likes_count(comment_id), 1);
                self.cache.set(
                    &CacheKey::comment_has_liked(comment_id),
                    CacheValue::Flag(true),
                );
            }
            Mutation::UnlikeComment { comment_id } => {
                self.bump_count(&CacheKey::comment_likes_count(comment_id), -1);
                self.cache.set(
                    &CacheKey::comment_has_liked(comment_id),
                    CacheValue::Flag(false),
                );
            }
            Mutation::FollowUser { target_user_id } => {
                self.bump_count(&CacheKey::followers_count(target_user_id), 1);
                self.bump_count(&CacheKey::following_count(&viewer.id), 1);
                self.cache.set(
                    &CacheKey::is_following(&viewer.id, target_user_id),
                    CacheValue::Flag(true),
                );
                // おすすめ一覧からは先行して外す
                self.cache.update(&CacheKey::suggested_users(), |value| {
                    if let CacheValue::Users(users) = value {
                        users.retain(|user| user.id != *target_user_id);
                    }
                });
            }
            Mutation::UnfollowUser { target_user_id } => {
                self.bump_count(&CacheKey::followers_count(target_user_id), -1);
                self.bump_count(&CacheKey::following_count(&viewer.id), -1);
                self.cache.set(
                    &CacheKey::is_following(&viewer.id, target_user_id),
                    CacheValue::Flag(false),
                );
            }
            Mutation::CreatePost { draft } => {
                let placeholder = draft.to_placeholder(viewer.clone());
                self.prepend_post(&CacheKey::post_list(), &placeholder);
                self.prepend_post(&CacheKey::post_following(), &placeholder);
                self.prepend_post(&CacheKey::user_posts(&viewer.id), &placeholder);
                self.bump_count(&CacheKey::post_count(&viewer.id), 1);
            }
            Mutation::DeletePost { post_id } => {
                self.remove_post_everywhere(post_id, viewer);
                self.cache.remove(&CacheKey::post_detail(post_id));
                self.bump_count(&CacheKey::post_count(&viewer.id), -1);
            }
            Mutation::CreateComment { draft } => {
                let parent = draft.parent_comment_id.as_deref().and_then(|parent_id| {
                    self.cache
                        .peek(&CacheKey::comment_detail(parent_id))
                        .as_ref()
                        .and_then(CacheValue::as_comment)
                        .cloned()
                });
                let placeholder = draft.to_placeholder(viewer.clone(), parent);
                match &draft.parent_comment_id {
                    None => {
                        self.prepend_comment(
                            &CacheKey::comment_root_list(&draft.post_id),
                            &placeholder,
                        );
                    }
                    Some(parent_id) => {
                        self.prepend_comment(
                            &CacheKey::comment_replies_list(parent_id),
                            &placeholder,
                        );
                        self.cache
                            .update(&CacheKey::comment_detail(parent_id), |value| {
                                if let CacheValue::Comment(parent) = value {
                                    parent.increment_reply_count();
                                }
                            });
                    }
                }
            }
            Mutation::DeleteComment { comment_id } => {
                let context = self.comment_context(comment_id);
                if let Some(post_id) = &context.post_id {
                    self.remove_comment_from(&CacheKey::comment_root_list(post_id), comment_id);
                }
                if let Some(parent_id) = &context.parent_comment_id {
                    self.remove_comment_from(
                        &CacheKey::comment_replies_list(parent_id),
                        comment_id,
                    );
                    self.cache
                        .update(&CacheKey::comment_detail(parent_id), |value| {
                            if let CacheValue::Comment(parent) = value {
                                parent.decrement_reply_count();
                            }
                        });
                }
                self.cache.remove(&CacheKey::comment_detail(comment_id));
            }
            Mutation::UpdateProfile { patch } => {
                self.cache.update(&CacheKey::current_user(), |value| {
                    if let CacheValue::User(user) = value {
                        patch.apply_to(user);
                    }
                });
            }
            Mutation::MarkNotificationRead { notification_id } => {
                self.cache.update(&CacheKey::notification_list(), |value| {
                    if let CacheValue::NotificationFeed(feed) = value {
                        for page in &mut feed.pages {
                            for notification in &mut page.items {
                                if notification.id == *notification_id {
                                    notification.mark_read();
                                }
                            }
                        }
                    }
                });
            }
            Mutation::MarkAllNotificationsRead => {
                self.cache.update(&CacheKey::notification_list(), |value| {
                    if let CacheValue::NotificationFeed(feed) = value {
                        for page in &mut feed.pages {
                            for notification in &mut page.items {
                                notification.mark_read();
                            }
                        }
                    }
                });
            }
        }
    }

    /// 手順 4: 実リクエスト。一時 ID が対象の操作はサーバーへ出さず、
    /// 成功をシミュレートする（404 を避ける）。
    async fn dispatch(&self, mutation: &Mutation) -> Result<MutationReply> {
        match mutation {
            Mutation::LikePost { post_id } => {
                if is_temp_id(post_id) {
                    debug!("Simulating like success for temporary post {post_id}");
                    return Ok(MutationReply::Simulated);
                }
                Ok(MutationReply::Liked(self.gateway.like_post(post_id).await?))
            }
            Mutation::UnlikePost { post_id } => {
                if is_temp_id(post_id) {
                    debug!("Simulating unlike success for temporary post {post_id}");
                    return Ok(MutationReply::Simulated);
                }
                Ok(MutationReply::Liked(
                    self.gateway.unlike_post(post_id).await?,
                ))
            }
            Mutation::LikeComment { comment_id } => {
                if is_temp_id(comment_id) {
                    debug!("Simulating like success for temporary comment {comment_id}");
                    return Ok(MutationReply::Simulated);
                }
                Ok(MutationReply::Liked(
                    self.gateway.like_comment(comment_id).await?,
                ))
            }
            Mutation::UnlikeComment { comment_id } => {
                if is_temp_id(comment_id) {
                    debug!("Simulating unlike success for temporary comment {comment_id}");
                    return Ok(MutationReply::Simulated);
                }
                Ok(MutationReply::Liked(
                    self.gateway.unlike_comment(comment_id).await?,
                ))
            }
            Mutation::FollowUser { target_user_id } => Ok(MutationReply::Followed(
                self.gateway.follow_user(target_user_id).await?,
            )),
            Mutation::UnfollowUser { target_user_id } => Ok(MutationReply::Followed(
                self.gateway.unfollow_user(target_user_id).await?,
            )),
            Mutation::CreatePost { draft } => {
                // 未確定の投稿をリツイート先にしたペイロードは送れない
                if draft
                    .retweet
                    .as_ref()
                    .is_some_and(|target| is_temp_id(&target.id))
                {
                    return Err(AppError::ValidationError(
                        "Retweet target is not confirmed by the server yet".to_string(),
                    ));
                }
                Ok(MutationReply::CreatedPost(
                    self.gateway.create_post(draft).await?,
                ))
            }
            Mutation::DeletePost { post_id } => {
                if is_temp_id(post_id) {
                    debug!("Simulating delete success for temporary post {post_id}");
                    return Ok(MutationReply::Simulated);
                }
                self.gateway.delete_post(post_id).await?;
                Ok(MutationReply::Deleted)
            }
            Mutation::CreateComment { draft } => {
                // 一時 ID の親の下にはまだコメントを作れない
                if is_temp_id(&draft.post_id)
                    || draft
                        .parent_comment_id
                        .as_deref()
                        .is_some_and(is_temp_id)
                {
                    return Err(AppError::ValidationError(
                        "Parent entity is not confirmed by the server yet".to_string(),
                    ));
                }
                Ok(MutationReply::CreatedComment(
                    self.gateway.create_comment(draft).await?,
                ))
            }
            Mutation::DeleteComment { comment_id } => {
                if is_temp_id(comment_id) {
                    debug!("Simulating delete success for temporary comment {comment_id}");
                    return Ok(MutationReply::Simulated);
                }
                self.gateway.delete_comment(comment_id).await?;
                Ok(MutationReply::Deleted)
            }
            Mutation::UpdateProfile { patch } => Ok(MutationReply::UpdatedUser(
                self.gateway.update_profile(patch).await?,
            )),
            Mutation::MarkNotificationRead { notification_id } => {
                self.gateway.mark_notification_read(notification_id).await?;
                Ok(MutationReply::Acked)
            }
            Mutation::MarkAllNotificationsRead => {
                self.gateway.mark_all_notifications_read().await?;
                Ok(MutationReply::Acked)
            }
        }
    }

    /// 手順 5: 一時エンティティをサーバー確定値へ置換する。
    /// 突き合わせはミューテーション開始時に採番した相関 ID のみで行う。
    fn reconcile(&self, mutation: &Mutation, reply: &MutationReply) {
        match (mutation, reply) {
            (Mutation::CreatePost { draft }, MutationReply::CreatedPost(post)) => {
                let viewer_id = self.session.viewer_id().unwrap_or_default();
                let temp_id = draft.temp_id.as_str();
                self.swap_temp_post(&CacheKey::post_list(), temp_id, post);
                self.swap_temp_post(&CacheKey::post_following(), temp_id, post);
                self.swap_temp_post(&CacheKey::user_posts(&viewer_id), temp_id, post);
                self.cache.set(
                    &CacheKey::post_detail(&post.id),
                    CacheValue::Post(Box::new(post.clone())),
                );
            }
            (Mutation::CreateComment { draft }, MutationReply::CreatedComment(comment)) => {
                let temp_id = draft.temp_id.as_str();
                let key = match &draft.parent_comment_id {
                    None => CacheKey::comment_root_list(&draft.post_id),
                    Some(parent_id) => CacheKey::comment_replies_list(parent_id),
                };
                self.swap_temp_comment(&key, temp_id, comment);
                self.cache.set(
                    &CacheKey::comment_detail(&comment.id),
                    CacheValue::Comment(Box::new(comment.clone())),
                );
            }
            (Mutation::UpdateProfile { .. }, MutationReply::UpdatedUser(user)) => {
                self.cache.set(
                    &CacheKey::current_user(),
                    CacheValue::User(Box::new(user.clone())),
                );
                self.session.set_viewer(Some(user.clone()));
            }
            // カウントは投機値を保持する。ステータス応答しか返らないので、
            // 正確な値はファンアウト無効化後の再フェッチで揃う
            _ => {}
        }
    }

    // --- キャッシュ操作ヘルパー ---

    fn bump_count(&self, key: &CacheKey, delta: i64) {
        self.cache.write(key, |old| {
            let current = old.as_ref().and_then(CacheValue::as_count).unwrap_or(0);
            let next = if delta >= 0 {
                current.saturating_add(delta as u64)
            } else {
                current.saturating_sub(delta.unsigned_abs())
            };
            CacheValue::Count(next)
        });
    }

    fn prepend_post(&self, key: &CacheKey, post: &Post) {
        self.cache.write(key, |old| {
            let mut feed = match old {
                Some(CacheValue::PostFeed(feed)) => feed,
                _ => PaginatedCollection::new(),
            };
            // 残留している一時投稿は防御的に取り除く
            feed.retain(|existing| existing.id != post.id && !is_temp_id(&existing.id));
            feed.prepend(post.clone());
            CacheValue::PostFeed(feed)
        });
    }

    fn prepend_comment(&self, key: &CacheKey, comment: &Comment) {
        self.cache.write(key, |old| {
            let mut feed = match old {
                Some(CacheValue::CommentFeed(feed)) => feed,
                _ => PaginatedCollection::new(),
            };
            feed.retain(|existing| existing.id != comment.id && !is_temp_id(&existing.id));
            feed.prepend(comment.clone());
            CacheValue::CommentFeed(feed)
        });
    }

    fn remove_post_everywhere(&self, post_id: &str, viewer: &User) {
        for key in [
            CacheKey::post_list(),
            CacheKey::post_following(),
            CacheKey::user_posts(&viewer.id),
        ] {
            self.cache.update(&key, |value| {
                if let CacheValue::PostFeed(feed) = value {
                    feed.retain(|post| post.id != post_id);
                }
            });
        }
    }

    fn remove_comment_from(&self, key: &CacheKey, comment_id: &str) {
        self.cache.update(key, |value| {
            if let CacheValue::CommentFeed(feed) = value {
                feed.retain(|comment| comment.id != comment_id);
            }
        });
    }

    fn swap_temp_post(&self, key: &CacheKey, temp_id: &str, real: &Post) {
        self.cache.update(key, |value| {
            if let CacheValue::PostFeed(feed) = value {
                if !feed.replace_by_id(temp_id, real) && !feed.contains_id(&real.id) {
                    feed.prepend(real.clone());
                }
                feed.retain(|post| !is_temp_id(&post.id));
            }
        });
    }

    fn swap_temp_comment(&self, key: &CacheKey, temp_id: &str, real: &Comment) {
        self.cache.update(key, |value| {
            if let CacheValue::CommentFeed(feed) = value {
                if !feed.replace_by_id(temp_id, real) && !feed.contains_id(&real.id) {
                    feed.prepend(real.clone());
                }
                feed.retain(|comment| !is_temp_id(&comment.id));
            }
        });
    }
}
