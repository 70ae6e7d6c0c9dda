use crate::application::ports::{CredentialStore, FeedGateway, TokenRefresher};
use crate::application::services::{
    AuthService, CommentService, FollowService, MutationEngine, NotificationService,
    ReactionService, TimelineService, UserService,
};
use crate::infrastructure::api::{ApiClient, ApiTransport, HttpExecute, ReqwestExecutor};
use crate::infrastructure::cache::EntityCache;
use crate::infrastructure::session::SessionHandle;
use crate::infrastructure::storage::KeyringCredentialStore;
use crate::shared::error::AppError;
use crate::shared::{AppConfig, Result};
use std::sync::Arc;
use std::time::Duration;

/// アプリケーション全体の状態を束ねる合成ルート。
/// キャッシュはプロセス開始時にここで一度だけ構築し、各サービスへ
/// 明示的に注入する（モジュールレベルの暗黙共有はしない）。
/// 破棄は logout() が資格情報とキャッシュをまとめて行う。
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub cache: Arc<EntityCache>,
    pub session: Arc<SessionHandle>,
    pub auth: Arc<AuthService>,
    pub timeline: Arc<TimelineService>,
    pub comments: Arc<CommentService>,
    pub reactions: Arc<ReactionService>,
    pub follows: Arc<FollowService>,
    pub users: Arc<UserService>,
    pub notifications: Arc<NotificationService>,
}

impl AppState {
    /// 既定の構成で組み立てる（keyring 資格情報ストア + reqwest）
    pub fn new(config: AppConfig) -> Result<Self> {
        let credential_store: Arc<dyn CredentialStore> = Arc::new(KeyringCredentialStore::new(
            config.session.service_name.clone(),
            config.session.allow_file_fallback,
        ));
        let executor: Arc<dyn HttpExecute> = Arc::new(ReqwestExecutor::new(&config.api)?);
        Self::with_parts(config, credential_store, executor)
    }

    /// HTTP 実行器を差し替えて組み立てる
    pub fn with_parts(
        config: AppConfig,
        credential_store: Arc<dyn CredentialStore>,
        executor: Arc<dyn HttpExecute>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(AppError::ConfigurationError)?;

        let cache = Arc::new(EntityCache::new(Duration::from_secs(
            config.cache.retention_secs,
        )));
        let session = Arc::new(SessionHandle::new(credential_store));
        let transport = Arc::new(ApiTransport::new(executor, session.clone(), cache.clone()));
        let gateway: Arc<dyn FeedGateway> = Arc::new(ApiClient::new(transport.clone()));
        let refresher: Arc<dyn TokenRefresher> = transport;
        Ok(Self::assemble(config, cache, session, gateway, refresher))
    }

    /// ゲートウェイごと差し替えて組み立てる（テスト用の入り口）
    pub fn with_gateway(
        config: AppConfig,
        credential_store: Arc<dyn CredentialStore>,
        gateway: Arc<dyn FeedGateway>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(AppError::ConfigurationError)?;
        let cache = Arc::new(EntityCache::new(Duration::from_secs(
            config.cache.retention_secs,
        )));
        let session = Arc::new(SessionHandle::new(credential_store));
        Ok(Self::assemble(config, cache, session, gateway, refresher))
    }

    fn assemble(
        config: AppConfig,
        cache: Arc<EntityCache>,
        session: Arc<SessionHandle>,
        gateway: Arc<dyn FeedGateway>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        let engine = Arc::new(MutationEngine::new(
            cache.clone(),
            gateway.clone(),
            session.clone(),
        ));

        let auth = Arc::new(AuthService::new(
            gateway.clone(),
            session.clone(),
            cache.clone(),
            refresher,
        ));
        let timeline = Arc::new(TimelineService::new(
            cache.clone(),
            gateway.clone(),
            engine.clone(),
            config.cache.clone(),
        ));
        let comments = Arc::new(CommentService::new(
            cache.clone(),
            gateway.clone(),
            engine.clone(),
            config.cache.clone(),
        ));
        let reactions = Arc::new(ReactionService::new(
            cache.clone(),
            gateway.clone(),
            engine.clone(),
            session.clone(),
            config.cache.clone(),
        ));
        let follows = Arc::new(FollowService::new(
            cache.clone(),
            gateway.clone(),
            engine.clone(),
            session.clone(),
            config.cache.clone(),
        ));
        let users = Arc::new(UserService::new(
            cache.clone(),
            gateway.clone(),
            engine.clone(),
            session.clone(),
            config.cache.clone(),
        ));
        let notifications = Arc::new(NotificationService::new(
            cache.clone(),
            gateway,
            engine,
            config.cache.clone(),
        ));

        Self {
            config,
            cache,
            session,
            auth,
            timeline,
            comments,
            reactions,
            follows,
            users,
            notifications,
        }
    }

    /// 明示的なティアダウン。資格情報とキャッシュをまとめて破棄する。
    pub fn logout(&self) {
        self.auth.logout();
    }

    /// 保持期間を過ぎた未使用キャッシュエントリを回収する
    pub fn cleanup_expired_cache(&self) -> usize {
        self.cache.cleanup_expired()
    }
}
