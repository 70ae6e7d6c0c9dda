pub mod credential_store;
pub mod feed_gateway;
pub mod token_refresher;

pub use credential_store::CredentialStore;
pub use feed_gateway::{AuthSession, FeedGateway, FollowStatus, LikeStatus, SignupPayload};
pub use token_refresher::TokenRefresher;
