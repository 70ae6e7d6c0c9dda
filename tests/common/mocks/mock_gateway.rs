use async_trait::async_trait;
use saezuri::application::ports::{
    AuthSession, FeedGateway, FollowStatus, LikeStatus, SignupPayload,
};
use saezuri::domain::entities::{
    Comment, CommentDraft, Notification, Page, Post, PostDraft, ProfilePatch, User,
};
use saezuri::domain::value_objects::{is_temp_id, AuthTokens};
use saezuri::shared::error::{AppError, Result};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// スクリプト可能な FeedGateway モック。
///
/// - メソッド呼び出しを引数付きで記録する
/// - `fail_next` で指定したメソッドはエラーを返す
/// - `gate()` 設定後のミューテーションは許可（add_permits）まで
///   完了しない。楽観値がネットワーク解決前に見えることの検証に使う
/// - 一時 ID がサーバーへ到達したら即 panic する
pub struct MockFeedGateway {
    calls: Mutex<Vec<String>>,
    fail_on: Mutex<HashSet<String>>,
    gate: Mutex<Option<Arc<Semaphore>>>,

    pub post_pages: Mutex<HashMap<String, VecDeque<Page<Post>>>>,
    pub comment_pages: Mutex<HashMap<String, VecDeque<Page<Comment>>>>,
    pub user_pages: Mutex<HashMap<String, VecDeque<Page<User>>>>,
    pub notification_pages: Mutex<VecDeque<Page<Notification>>>,

    pub like_counts: Mutex<HashMap<String, u64>>,
    pub has_liked: Mutex<HashMap<String, bool>>,
    pub follower_counts: Mutex<HashMap<String, u64>>,
    pub following_counts: Mutex<HashMap<String, u64>>,
    pub is_followed: Mutex<HashMap<String, bool>>,
    pub suggested: Mutex<Vec<User>>,
    pub users_by_name: Mutex<HashMap<String, User>>,

    pub current_user: Mutex<Option<User>>,
    pub created_post: Mutex<Option<Post>>,
    pub created_comment: Mutex<Option<Comment>>,
    pub login_session: Mutex<Option<AuthSession>>,
}

impl MockFeedGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail_on: Mutex::new(HashSet::new()),
            gate: Mutex::new(None),
            post_pages: Mutex::new(HashMap::new()),
            comment_pages: Mutex::new(HashMap::new()),
            user_pages: Mutex::new(HashMap::new()),
            notification_pages: Mutex::new(VecDeque::new()),
            like_counts: Mutex::new(HashMap::new()),
            has_liked: Mutex::new(HashMap::new()),
            follower_counts: Mutex::new(HashMap::new()),
            following_counts: Mutex::new(HashMap::new()),
            is_followed: Mutex::new(HashMap::new()),
            suggested: Mutex::new(Vec::new()),
            users_by_name: Mutex::new(HashMap::new()),
            current_user: Mutex::new(None),
            created_post: Mutex::new(None),
            created_comment: Mutex::new(None),
            login_session: Mutex::new(None),
        })
    }

    // --- スクリプト設定 ---

    pub fn fail_next(&self, method: &str) {
        self.fail_on.lock().unwrap().insert(method.to_string());
    }

    /// 以後のミューテーションを停止させるゲートを仕掛ける。
    /// 戻り値の Semaphore に add_permits(1) すると 1 呼び出し進む。
    pub fn gate(&self) -> Arc<Semaphore> {
        let semaphore = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(semaphore.clone());
        semaphore
    }

    pub fn queue_post_page(&self, feed: &str, page: Page<Post>) {
        self.post_pages
            .lock()
            .unwrap()
            .entry(feed.to_string())
            .or_default()
            .push_back(page);
    }

    pub fn queue_comment_page(&self, list: &str, page: Page<Comment>) {
        self.comment_pages
            .lock()
            .unwrap()
            .entry(list.to_string())
            .or_default()
            .push_back(page);
    }

    pub fn set_login(&self, user: User, access: &str, refresh: &str) {
        *self.login_session.lock().unwrap() = Some(AuthSession {
            user: user.clone(),
            tokens: AuthTokens::new(access.to_string(), refresh.to_string()),
        });
        *self.current_user.lock().unwrap() = Some(user);
    }

    // --- 検査 ---

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    // --- 内部ヘルパー ---

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn check_failure(&self, method: &str) -> Result<()> {
        if self.fail_on.lock().unwrap().remove(method) {
            return Err(AppError::Api {
                status: 500,
                message: format!("scripted failure for {method}"),
            });
        }
        Ok(())
    }

    async fn wait_if_gated(&self) {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(semaphore) = gate {
            semaphore
                .acquire()
                .await
                .expect("gate semaphore closed")
                .forget();
        }
    }

    fn reject_temp_id(&self, id: &str) {
        assert!(
            !is_temp_id(id),
            "temporary identifier leaked to the server: {id}"
        );
    }

    fn next_page<T: Clone>(
        pages: &Mutex<HashMap<String, VecDeque<Page<T>>>>,
        key: &str,
    ) -> Page<T> {
        pages
            .lock()
            .unwrap()
            .get_mut(key)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Page::new(Vec::new(), None, None))
    }
}

#[async_trait]
impl FeedGateway for MockFeedGateway {
    async fn fetch_posts(&self, cursor: Option<&str>) -> Result<Page<Post>> {
        self.record(format!("fetch_posts({cursor:?})"));
        self.check_failure("fetch_posts")?;
        Ok(Self::next_page(&self.post_pages, "feed"))
    }

    async fn fetch_user_posts(&self, user_id: &str, cursor: Option<&str>) -> Result<Page<Post>> {
        self.record(format!("fetch_user_posts({user_id}, {cursor:?})"));
        self.check_failure("fetch_user_posts")?;
        Ok(Self::next_page(&self.post_pages, &format!("user:{user_id}")))
    }

    async fn fetch_following_posts(&self, cursor: Option<&str>) -> Result<Page<Post>> {
        self.record(format!("fetch_following_posts({cursor:?})"));
        self.check_failure("fetch_following_posts")?;
        Ok(Self::next_page(&self.post_pages, "following"))
    }

    async fn fetch_post(&self, post_id: &str) -> Result<Post> {
        self.reject_temp_id(post_id);
        self.record(format!("fetch_post({post_id})"));
        self.check_failure("fetch_post")?;
        Err(AppError::Api {
            status: 404,
            message: format!("no scripted post {post_id}"),
        })
    }

    async fn fetch_post_count(&self, user_id: &str) -> Result<u64> {
        self.record(format!("fetch_post_count({user_id})"));
        self.check_failure("fetch_post_count")?;
        Ok(0)
    }

    async fn create_post(&self, draft: &PostDraft) -> Result<Post> {
        self.record(format!("create_post({})", draft.content));
        self.wait_if_gated().await;
        self.check_failure("create_post")?;
        self.created_post
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::Internal("no scripted created_post".to_string()))
    }

    async fn delete_post(&self, post_id: &str) -> Result<()> {
        self.reject_temp_id(post_id);
        self.record(format!("delete_post({post_id})"));
        self.wait_if_gated().await;
        self.check_failure("delete_post")
    }

    async fn fetch_root_comments(
        &self,
        post_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<Comment>> {
        self.reject_temp_id(post_id);
        self.record(format!("fetch_root_comments({post_id}, {cursor:?})"));
        self.check_failure("fetch_root_comments")?;
        Ok(Self::next_page(
            &self.comment_pages,
            &format!("root:{post_id}"),
        ))
    }

    async fn fetch_replies(
        &self,
        parent_comment_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<Comment>> {
        self.reject_temp_id(parent_comment_id);
        self.record(format!("fetch_replies({parent_comment_id}, {cursor:?})"));
        self.check_failure("fetch_replies")?;
        Ok(Self::next_page(
            &self.comment_pages,
            &format!("replies:{parent_comment_id}"),
        ))
    }

    async fn fetch_comment(&self, comment_id: &str) -> Result<Comment> {
        self.reject_temp_id(comment_id);
        self.record(format!("fetch_comment({comment_id})"));
        self.check_failure("fetch_comment")?;
        Err(AppError::Api {
            status: 404,
            message: format!("no scripted comment {comment_id}"),
        })
    }

    async fn create_comment(&self, draft: &CommentDraft) -> Result<Comment> {
        self.reject_temp_id(&draft.post_id);
        if let Some(parent_id) = &draft.parent_comment_id {
            self.reject_temp_id(parent_id);
        }
        self.record(format!("create_comment({})", draft.content));
        self.wait_if_gated().await;
        self.check_failure("create_comment")?;
        self.created_comment
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::Internal("no scripted created_comment".to_string()))
    }

    async fn delete_comment(&self, comment_id: &str) -> Result<()> {
        self.reject_temp_id(comment_id);
        self.record(format!("delete_comment({comment_id})"));
        self.wait_if_gated().await;
        self.check_failure("delete_comment")
    }

    async fn like_post(&self, post_id: &str) -> Result<LikeStatus> {
        self.reject_temp_id(post_id);
        self.record(format!("like_post({post_id})"));
        self.wait_if_gated().await;
        self.check_failure("like_post")?;
        Ok(LikeStatus {
            liked: true,
            message: "liked".to_string(),
        })
    }

    async fn unlike_post(&self, post_id: &str) -> Result<LikeStatus> {
        self.reject_temp_id(post_id);
        self.record(format!("unlike_post({post_id})"));
        self.wait_if_gated().await;
        self.check_failure("unlike_post")?;
        Ok(LikeStatus {
            liked: false,
            message: "unliked".to_string(),
        })
    }

    async fn like_comment(&self, comment_id: &str) -> Result<LikeStatus> {
        self.reject_temp_id(comment_id);
        self.record(format!("like_comment({comment_id})"));
        self.wait_if_gated().await;
        self.check_failure("like_comment")?;
        Ok(LikeStatus {
            liked: true,
            message: "liked".to_string(),
        })
    }

    async fn unlike_comment(&self, comment_id: &str) -> Result<LikeStatus> {
        self.reject_temp_id(comment_id);
        self.record(format!("unlike_comment({comment_id})"));
        self.wait_if_gated().await;
        self.check_failure("unlike_comment")?;
        Ok(LikeStatus {
            liked: false,
            message: "unliked".to_string(),
        })
    }

    async fn fetch_post_likes_count(&self, post_id: &str) -> Result<u64> {
        self.reject_temp_id(post_id);
        self.record(format!("fetch_post_likes_count({post_id})"));
        self.check_failure("fetch_post_likes_count")?;
        Ok(*self.like_counts.lock().unwrap().get(post_id).unwrap_or(&0))
    }

    async fn fetch_comment_likes_count(&self, comment_id: &str) -> Result<u64> {
        self.reject_temp_id(comment_id);
        self.record(format!("fetch_comment_likes_count({comment_id})"));
        self.check_failure("fetch_comment_likes_count")?;
        Ok(*self
            .like_counts
            .lock()
            .unwrap()
            .get(comment_id)
            .unwrap_or(&0))
    }

    async fn fetch_has_liked_post(&self, post_id: &str) -> Result<bool> {
        self.reject_temp_id(post_id);
        self.record(format!("fetch_has_liked_post({post_id})"));
        self.check_failure("fetch_has_liked_post")?;
        Ok(*self.has_liked.lock().unwrap().get(post_id).unwrap_or(&false))
    }

    async fn fetch_has_liked_comment(&self, comment_id: &str) -> Result<bool> {
        self.reject_temp_id(comment_id);
        self.record(format!("fetch_has_liked_comment({comment_id})"));
        self.check_failure("fetch_has_liked_comment")?;
        Ok(*self
            .has_liked
            .lock()
            .unwrap()
            .get(comment_id)
            .unwrap_or(&false))
    }

    async fn follow_user(&self, target_user_id: &str) -> Result<FollowStatus> {
        self.record(format!("follow_user({target_user_id})"));
        self.wait_if_gated().await;
        self.check_failure("follow_user")?;
        Ok(FollowStatus {
            followed: true,
            message: "followed".to_string(),
        })
    }

    async fn unfollow_user(&self, target_user_id: &str) -> Result<FollowStatus> {
        self.record(format!("unfollow_user({target_user_id})"));
        self.wait_if_gated().await;
        self.check_failure("unfollow_user")?;
        Ok(FollowStatus {
            followed: false,
            message: "unfollowed".to_string(),
        })
    }

    async fn fetch_followers_count(&self, user_id: &str) -> Result<u64> {
        self.record(format!("fetch_followers_count({user_id})"));
        self.check_failure("fetch_followers_count")?;
        Ok(*self
            .follower_counts
            .lock()
            .unwrap()
            .get(user_id)
            .unwrap_or(&0))
    }

    async fn fetch_following_count(&self, user_id: &str) -> Result<u64> {
        self.record(format!("fetch_following_count({user_id})"));
        self.check_failure("fetch_following_count")?;
        Ok(*self
            .following_counts
            .lock()
            .unwrap()
            .get(user_id)
            .unwrap_or(&0))
    }

    async fn fetch_is_followed_by_me(&self, target_user_id: &str) -> Result<bool> {
        self.record(format!("fetch_is_followed_by_me({target_user_id})"));
        self.check_failure("fetch_is_followed_by_me")?;
        Ok(*self
            .is_followed
            .lock()
            .unwrap()
            .get(target_user_id)
            .unwrap_or(&false))
    }

    async fn fetch_followers(&self, user_id: &str, cursor: Option<&str>) -> Result<Page<User>> {
        self.record(format!("fetch_followers({user_id}, {cursor:?})"));
        self.check_failure("fetch_followers")?;
        Ok(Self::next_page(
            &self.user_pages,
            &format!("followers:{user_id}"),
        ))
    }

    async fn fetch_following(&self, user_id: &str, cursor: Option<&str>) -> Result<Page<User>> {
        self.record(format!("fetch_following({user_id}, {cursor:?})"));
        self.check_failure("fetch_following")?;
        Ok(Self::next_page(
            &self.user_pages,
            &format!("following:{user_id}"),
        ))
    }

    async fn fetch_current_user(&self) -> Result<User> {
        self.record("fetch_current_user()");
        self.check_failure("fetch_current_user")?;
        self.current_user
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::Unauthorized("no current user scripted".to_string()))
    }

    async fn fetch_user_by_username(&self, username: &str) -> Result<User> {
        self.record(format!("fetch_user_by_username({username})"));
        self.check_failure("fetch_user_by_username")?;
        self.users_by_name
            .lock()
            .unwrap()
            .get(username)
            .cloned()
            .ok_or_else(|| AppError::Api {
                status: 404,
                message: format!("no scripted user {username}"),
            })
    }

    async fn fetch_suggested_users(&self) -> Result<Vec<User>> {
        self.record("fetch_suggested_users()");
        self.check_failure("fetch_suggested_users")?;
        Ok(self.suggested.lock().unwrap().clone())
    }

    async fn search_users(&self, query: &str) -> Result<Vec<User>> {
        self.record(format!("search_users({query})"));
        self.check_failure("search_users")?;
        Ok(Vec::new())
    }

    async fn update_profile(&self, patch: &ProfilePatch) -> Result<User> {
        self.record("update_profile()");
        self.wait_if_gated().await;
        self.check_failure("update_profile")?;
        let mut user = self
            .current_user
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::Unauthorized("no current user scripted".to_string()))?;
        patch.apply_to(&mut user);
        Ok(user)
    }

    async fn fetch_notifications(&self, cursor: Option<&str>) -> Result<Page<Notification>> {
        self.record(format!("fetch_notifications({cursor:?})"));
        self.check_failure("fetch_notifications")?;
        Ok(self
            .notification_pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Page::new(Vec::new(), None, None)))
    }

    async fn mark_notification_read(&self, notification_id: &str) -> Result<()> {
        self.record(format!("mark_notification_read({notification_id})"));
        self.wait_if_gated().await;
        self.check_failure("mark_notification_read")
    }

    async fn mark_all_notifications_read(&self) -> Result<()> {
        self.record("mark_all_notifications_read()");
        self.wait_if_gated().await;
        self.check_failure("mark_all_notifications_read")
    }

    async fn login(&self, identifier: &str, _password: &str) -> Result<AuthSession> {
        self.record(format!("login({identifier})"));
        self.check_failure("login")?;
        self.login_session
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::Auth("no scripted login session".to_string()))
    }

    async fn signup(&self, payload: &SignupPayload) -> Result<User> {
        self.record(format!("signup({})", payload.username));
        self.check_failure("signup")?;
        Ok(User::new("new-user".to_string(), payload.username.clone()))
    }
}
