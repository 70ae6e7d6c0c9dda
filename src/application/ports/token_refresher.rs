use crate::shared::error::Result;
use async_trait::async_trait;

/// アクセストークンのサイレント更新ポート。起動時のセッション検証に使う。
/// 実装はトランスポートの single-flight リフレッシュと同じ経路に乗る。
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> Result<String>;
}
