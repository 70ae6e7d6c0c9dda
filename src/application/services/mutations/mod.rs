mod engine;

pub use engine::MutationEngine;

use crate::application::ports::{FollowStatus, LikeStatus};
use crate::domain::entities::{Comment, CommentDraft, Post, PostDraft, ProfilePatch, User};

/// 書き込み操作のタグ付きユニオン。種別ごとに必要なコンテキストを
/// 型付きで持ち、単一のハンドラ（MutationEngine::execute）で処理する。
#[derive(Debug, Clone)]
pub enum Mutation {
    LikePost { post_id: String },
    UnlikePost { post_id: String },
    LikeComment { comment_id: String },
    UnlikeComment { comment_id: String },
    FollowUser { target_user_id: String },
    UnfollowUser { target_user_id: String },
    CreatePost { draft: PostDraft },
    DeletePost { post_id: String },
    CreateComment { draft: CommentDraft },
    DeleteComment { comment_id: String },
    UpdateProfile { patch: ProfilePatch },
    MarkNotificationRead { notification_id: String },
    MarkAllNotificationsRead,
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::LikePost { .. } => "like_post",
            Mutation::UnlikePost { .. } => "unlike_post",
            Mutation::LikeComment { .. } => "like_comment",
            Mutation::UnlikeComment { .. } => "unlike_comment",
            Mutation::FollowUser { .. } => "follow_user",
            Mutation::UnfollowUser { .. } => "unfollow_user",
            Mutation::CreatePost { .. } => "create_post",
            Mutation::DeletePost { .. } => "delete_post",
            Mutation::CreateComment { .. } => "create_comment",
            Mutation::DeleteComment { .. } => "delete_comment",
            Mutation::UpdateProfile { .. } => "update_profile",
            Mutation::MarkNotificationRead { .. } => "mark_notification_read",
            Mutation::MarkAllNotificationsRead => "mark_all_notifications_read",
        }
    }
}

/// ミューテーションの進行状態。pending からどちらかの終端に必ず落ちる。
/// 自動リトライは行わず、再実行は呼び出し側が同じ入力で明示的に行う。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    Idle,
    Pending,
    Success,
    Error,
}

/// サーバー確定後の応答。Simulated は一時 ID が対象だったため
/// ネットワークに出なかったことを表す。
#[derive(Debug, Clone)]
pub enum MutationReply {
    Liked(LikeStatus),
    Followed(FollowStatus),
    CreatedPost(Post),
    CreatedComment(Comment),
    UpdatedUser(User),
    Deleted,
    Acked,
    Simulated,
}
