pub mod auth_tokens;
pub mod cache_key;
pub mod temp_id;

pub use auth_tokens::AuthTokens;
pub use cache_key::CacheKey;
pub use temp_id::{is_temp_id, TempId};
