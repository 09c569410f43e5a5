//! Operation policy: which role each API operation requires.
//!
//! Handlers name their operation and check it against the caller's role.
//! The table below is the single place where access rules live.

use crate::error::ServerError;

/// Caller roles, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Anonymous,
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    // accounts
    Register,
    Login,
    Logout,
    ViewProfile,
    UpdateProfile,
    ChangePassword,
    ForgotPassword,
    ResetPassword,
    VerifyEmail,
    ResendVerification,
    ListUsers,
    ManageUser,
    ListActivities,
    // portfolio
    ViewShowcase,
    ManageShowcase,
    SubmitContact,
    ManageContacts,
    // chat
    ListConversations,
    CreateConversation,
    ViewConversation,
    SendMessage,
    MarkMessageRead,
    DownloadFile,
    ListAvailableUsers,
    ViewNotifications,
    MarkNotificationRead,
    ChatbotTalk,
}

impl Operation {
    pub const fn required_role(self) -> Role {
        use Operation::*;
        match self {
            Register | Login | ForgotPassword | ResetPassword | VerifyEmail
            | ResendVerification | ViewShowcase | SubmitContact | ChatbotTalk => Role::Anonymous,

            Logout | ViewProfile | UpdateProfile | ChangePassword | ListConversations
            | CreateConversation | ViewConversation | SendMessage | MarkMessageRead
            | DownloadFile | ListAvailableUsers | ViewNotifications
            | MarkNotificationRead => Role::User,

            ListUsers | ManageUser | ListActivities | ManageShowcase | ManageContacts => {
                Role::Admin
            }
        }
    }

    /// 401 for anonymous callers of a protected operation, 403 when the
    /// caller's role is too weak.
    pub fn authorize(self, role: Role) -> Result<(), ServerError> {
        let required = self.required_role();
        if role >= required {
            return Ok(());
        }
        tracing::debug!(operation = %self, %role, %required, "access denied");
        if role == Role::Anonymous {
            Err(ServerError::Unauthorized(
                "Authentication credentials were not provided.".into(),
            ))
        } else {
            Err(ServerError::PermissionDenied(
                "You do not have permission to perform this action.".into(),
            ))
        }
    }
}
