pub mod auth_service;
pub mod comment_service;
pub mod follow_service;
pub mod mutations;
pub mod notification_service;
pub mod reaction_service;
pub mod timeline_service;
pub mod user_service;

pub use auth_service::AuthService;
pub use comment_service::CommentService;
pub use follow_service::FollowService;
pub use mutations::{Mutation, MutationEngine, MutationReply, MutationStatus};
pub use notification_service::NotificationService;
pub use reaction_service::ReactionService;
pub use timeline_service::TimelineService;
pub use user_service::UserService;
