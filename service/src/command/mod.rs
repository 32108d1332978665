//! [`Command`] definition.

pub mod authorize_user_session;
pub mod confirm_user_email;
pub mod create_user;
pub mod create_user_session;
pub mod request_password_reset;
pub mod reset_user_password;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    authorize_user_session::AuthorizeUserSession,
    confirm_user_email::ConfirmUserEmail, create_user::CreateUser,
    create_user_session::CreateUserSession,
    request_password_reset::RequestPasswordReset,
    reset_user_password::ResetUserPassword,
};
