//! Action [`Token`] definitions.

use std::time::Duration;

#[cfg(doc)]
use common::DateTime;
use common::{unit::Expiration, DateTimeOf};
use derive_more::{AsRef, Display, FromStr};
use jsonwebtoken::Validation;
use serde::{Deserialize, Serialize};

#[cfg(doc)]
use crate::domain::User;
use crate::domain::user;

/// Action token sent to a [`User`]'s email address.
///
/// Action tokens are stateless: nothing is persisted when one is issued,
/// and a token remains usable any number of times until it expires.
#[derive(AsRef, Clone, Debug, Display, FromStr)]
pub struct Token(String);

impl Token {
    /// Creates a new [`Token`] without checking its contents.
    ///
    /// # Safety
    ///
    /// The provided `token` must be a valid [`Token`] representation.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub const unsafe fn new_unchecked(token: String) -> Self {
        Self(token)
    }
}

/// Purpose an action [`Token`] is scoped to.
///
/// A [`Token`] issued for one [`Purpose`] is rejected when presented for
/// another one.
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Purpose {
    /// Confirmation of a [`User`]'s email address.
    #[display("email-confirm")]
    EmailConfirm,

    /// Reset of a [`User`]'s password.
    #[display("password-reset")]
    PasswordReset,
}

/// Claims of an action [`Token`].
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Claims {
    /// [`user::Email`] the [`Token`] was issued for.
    pub email: user::Email,

    /// [`Purpose`] the [`Token`] is scoped to.
    pub purpose: Purpose,

    /// [`DateTime`] when the [`Token`] expires.
    #[serde(rename = "exp", with = "common::datetime::serde::unix_timestamp")]
    pub expires_at: ExpirationDateTime,
}

impl Claims {
    /// Creates new [`Claims`] for the provided `email`, scoped to the
    /// provided `purpose` and expiring in `ttl` from now.
    #[must_use]
    pub fn new(email: user::Email, purpose: Purpose, ttl: Duration) -> Self {
        Self {
            email,
            purpose,
            expires_at: ExpirationDateTime::now() + ttl,
        }
    }
}

/// Returns a [`Validation`] for decoding action [`Token`]s.
///
/// A [`Token`] expires exactly at its `exp` claim, without any grace period.
#[must_use]
pub fn validation() -> Validation {
    let mut validation = Validation::default();
    validation.leeway = 0;
    validation
}

/// [`DateTime`] of a [`Token`] expiration.
pub type ExpirationDateTime = DateTimeOf<(Token, Expiration)>;
