//! `User`-related request and response bodies.

use common::DateTime;
use serde::{Deserialize, Serialize};
use service::{command, domain};

/// Request body of a `User` registration.
#[derive(Clone, Debug, Deserialize)]
pub struct SignUpRequest {
    /// Email address of the `User` to register.
    pub email: String,

    /// Password of the `User` to register.
    pub password: String,

    /// Confirmation of the `password` field.
    pub confirm_password: String,

    /// Indicator whether the terms of service were accepted.
    #[serde(default)]
    pub terms: bool,
}

/// Request body of a `Session` creation.
#[derive(Clone, Debug, Deserialize)]
pub struct SignInRequest {
    /// Email address to authenticate with.
    pub email: String,

    /// Password to authenticate with.
    pub password: String,
}

/// Request body of a password reset request.
#[derive(Clone, Debug, Deserialize)]
pub struct ForgetPasswordRequest {
    /// Email address to send the reset link to.
    pub email: String,
}

/// Request body of a password reset.
#[derive(Clone, Debug, Deserialize)]
pub struct ResetPasswordRequest {
    /// New password to set.
    pub new_password: String,
}

/// Representation of a `User` in responses.
#[derive(Clone, Debug, Serialize)]
pub struct UserResponse {
    /// Unique identifier of the `User`.
    pub id: domain::user::Id,

    /// Email address of the `User`.
    pub email: domain::user::Email,

    /// Indicator whether the `User` confirmed its email address.
    pub is_verified: bool,

    /// [`DateTime`] when the `User` was created.
    #[serde(with = "common::datetime::serde::unix_timestamp")]
    pub created_at: DateTime,
}

impl From<domain::User> for UserResponse {
    fn from(user: domain::User) -> Self {
        let domain::User {
            id,
            email,
            password_hash: _,
            is_verified,
            created_at,
        } = user;
        Self {
            id,
            email,
            is_verified,
            created_at: created_at.coerce(),
        }
    }
}

/// Representation of a created `Session` in responses.
#[derive(Clone, Debug, Serialize)]
pub struct SessionResponse {
    /// Access token of the created `Session`.
    pub token: String,

    /// [`DateTime`] when the created `Session` expires.
    #[serde(with = "common::datetime::serde::unix_timestamp")]
    pub expires_at: DateTime,

    /// `User` associated with the created `Session`.
    pub user: UserResponse,
}

impl From<command::create_user_session::Output> for SessionResponse {
    fn from(output: command::create_user_session::Output) -> Self {
        let command::create_user_session::Output {
            token,
            user,
            expires_at,
        } = output;
        Self {
            token: token.to_string(),
            expires_at: expires_at.coerce(),
            user: user.into(),
        }
    }
}
