//! HTTP API definitions.

pub mod user;

use axum::{
    extract::Path,
    routing::{get, post},
    Json, Router,
};
use http::StatusCode;
use service::{
    command,
    domain::{self, user::token},
    query, Command as _, Query as _,
};

use crate::{define_error, AsError, Context, Error};

/// Returns the [`Router`] of the HTTP API.
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/signup", post(sign_up))
        .route("/confirm/:token", get(confirm_email))
        .route("/signin", post(sign_in))
        .route("/logout", post(sign_out))
        .route("/me", get(current_user))
        .route("/forget-password", post(request_password_reset))
        .route("/reset/:token", post(reset_password))
}

/// Registers a new `User` with the provided credentials and sends an email
/// confirmation link to its address.
///
/// The `User` is created unverified and cannot sign in until the link is
/// followed.
#[tracing::instrument(skip_all, fields(email = %req.email))]
async fn sign_up(
    ctx: Context,
    Json(req): Json<user::SignUpRequest>,
) -> Result<(StatusCode, Json<user::UserResponse>), Error> {
    let user::SignUpRequest {
        email,
        password,
        confirm_password,
        terms,
    } = req;

    if email.is_empty() || password.is_empty() || confirm_password.is_empty() {
        return Err(SignUpError::FieldsRequired.into());
    }
    if password != confirm_password {
        return Err(SignUpError::PasswordsMismatch.into());
    }
    let email = email
        .parse::<domain::user::Email>()
        .map_err(|_| SignUpError::InvalidEmail)?;
    let password = password
        .parse::<domain::user::Password>()
        .map_err(|_| SignUpError::WeakPassword)?;
    if !terms {
        return Err(SignUpError::TermsNotAccepted.into());
    }

    ctx.service()
        .execute(command::CreateUser {
            email,
            password: secrecy::SecretBox::init_with(move || password),
        })
        .await
        .map_err(AsError::into_error)
        .map(|u| (StatusCode::CREATED, Json(u.into())))
}

/// Confirms a `User`'s email address by the token from the emailed link.
#[tracing::instrument(skip_all)]
async fn confirm_email(
    ctx: Context,
    Path(token): Path<String>,
) -> Result<Json<user::UserResponse>, Error> {
    #[expect(unsafe_code, reason = "opaque token from the path")]
    let token = unsafe { token::Token::new_unchecked(token) };

    ctx.service()
        .execute(command::ConfirmUserEmail { token })
        .await
        .map_err(AsError::into_error)
        .map(|u| Json(u.into()))
}

/// Creates a new `Session` for the provided credentials.
#[tracing::instrument(skip_all, fields(email = %req.email))]
async fn sign_in(
    ctx: Context,
    Json(req): Json<user::SignInRequest>,
) -> Result<Json<user::SessionResponse>, Error> {
    let user::SignInRequest { email, password } = req;

    // Malformed credentials cannot match any `User`.
    let email = email
        .parse::<domain::user::Email>()
        .map_err(|_| SignInError::WrongCredentials)?;
    let password = password
        .parse::<domain::user::Password>()
        .map_err(|_| SignInError::WrongCredentials)?;

    ctx.service()
        .execute(command::CreateUserSession {
            email,
            password: secrecy::SecretBox::init_with(move || password),
        })
        .await
        .map_err(AsError::into_error)
        .map(|out| Json(out.into()))
}

/// Terminates the current `Session`.
///
/// `Session` tokens are stateless, so nothing is revoked server-side: the
/// client is expected to discard its token.
#[tracing::instrument(skip_all)]
async fn sign_out(ctx: Context) -> Result<StatusCode, Error> {
    let _ = ctx.current_session().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the `User` of the current `Session`.
#[tracing::instrument(skip_all)]
async fn current_user(ctx: Context) -> Result<Json<user::UserResponse>, Error> {
    let session = ctx.current_session().await?;

    ctx.service()
        .execute(query::user::ById::by(session.user_id))
        .await
        .map_err(AsError::into_error)?
        .map(|u| Json(u.into()))
        .ok_or_else(|| Error::internal(&"authenticated `User` not found"))
}

/// Sends a password reset link to the provided email address.
#[tracing::instrument(skip_all, fields(email = %req.email))]
async fn request_password_reset(
    ctx: Context,
    Json(req): Json<user::ForgetPasswordRequest>,
) -> Result<StatusCode, Error> {
    let user::ForgetPasswordRequest { email } = req;

    let email = email
        .parse::<domain::user::Email>()
        .map_err(|_| ResetError::EmailNotFound)?;

    ctx.service()
        .execute(command::RequestPasswordReset { email })
        .await
        .map_err(AsError::into_error)
        .map(|()| StatusCode::ACCEPTED)
}

/// Replaces a `User`'s password by the token from the emailed reset link.
#[tracing::instrument(skip_all)]
async fn reset_password(
    ctx: Context,
    Path(token): Path<String>,
    Json(req): Json<user::ResetPasswordRequest>,
) -> Result<Json<user::UserResponse>, Error> {
    let user::ResetPasswordRequest { new_password } = req;

    let new_password = new_password
        .parse::<domain::user::Password>()
        .map_err(|_| ResetError::WeakPassword)?;
    #[expect(unsafe_code, reason = "opaque token from the path")]
    let token = unsafe { token::Token::new_unchecked(token) };

    ctx.service()
        .execute(command::ResetUserPassword {
            token,
            new_password: secrecy::SecretBox::init_with(move || new_password),
        })
        .await
        .map_err(AsError::into_error)
        .map(|u| Json(u.into()))
}

impl AsError for command::create_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::EmailOccupied(_) => Some(SignUpError::EmailOccupied.into()),
            Self::JsonWebTokenEncodeError(_) | Self::PasswordHashError(_) => {
                None
            }
        }
    }
}

impl AsError for command::confirm_user_email::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::InvalidToken(_)
            | Self::TokenExpired
            | Self::UserNotExists(_)
            | Self::WrongPurpose(_) => Some(TokenError::Invalid.into()),
        }
    }
}

impl AsError for command::create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::EmailNotConfirmed => {
                Some(SignInError::EmailNotConfirmed.into())
            }
            Self::JsonWebTokenEncodeError(_) => None,
            Self::WrongCredentials => Some(SignInError::WrongCredentials.into()),
        }
    }
}

impl AsError for command::request_password_reset::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::JsonWebTokenEncodeError(_) => None,
            Self::UserNotExists(_) => Some(ResetError::EmailNotFound.into()),
        }
    }
}

impl AsError for command::reset_user_password::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::PasswordHashError(_) => None,
            Self::InvalidToken(_)
            | Self::TokenExpired
            | Self::UserNotExists(_)
            | Self::WrongPurpose(_) => Some(TokenError::Invalid.into()),
        }
    }
}

define_error! {
    enum SignUpError {
        #[code = "FIELDS_REQUIRED"]
        #[status = BAD_REQUEST]
        #[message = "All fields are required"]
        FieldsRequired,

        #[code = "PASSWORDS_MISMATCH"]
        #[status = BAD_REQUEST]
        #[message = "Passwords do not match"]
        PasswordsMismatch,

        #[code = "INVALID_EMAIL"]
        #[status = BAD_REQUEST]
        #[message = "Invalid email address"]
        InvalidEmail,

        #[code = "WEAK_PASSWORD"]
        #[status = BAD_REQUEST]
        #[message = "Password must be at least 8 characters long"]
        WeakPassword,

        #[code = "TERMS_NOT_ACCEPTED"]
        #[status = BAD_REQUEST]
        #[message = "Terms of service must be accepted"]
        TermsNotAccepted,

        #[code = "EMAIL_OCCUPIED"]
        #[status = CONFLICT]
        #[message = "Email is already registered"]
        EmailOccupied,
    }
}

define_error! {
    enum SignInError {
        #[code = "WRONG_CREDENTIALS"]
        #[status = FORBIDDEN]
        #[message = "Invalid email or password"]
        WrongCredentials,

        #[code = "EMAIL_NOT_CONFIRMED"]
        #[status = FORBIDDEN]
        #[message = "Please verify your email before logging in"]
        EmailNotConfirmed,
    }
}

define_error! {
    enum TokenError {
        #[code = "INVALID_TOKEN"]
        #[status = BAD_REQUEST]
        #[message = "The link is invalid or has expired"]
        Invalid,
    }
}

define_error! {
    enum ResetError {
        #[code = "EMAIL_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "Email not found"]
        EmailNotFound,

        #[code = "WEAK_PASSWORD"]
        #[status = BAD_REQUEST]
        #[message = "Password must be at least 8 characters long"]
        WeakPassword,
    }
}
