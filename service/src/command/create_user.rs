//! [`Command`] for registering a new [`User`].

use common::{
    operations::{By, Deliver, Insert, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Email, Password};
use crate::{
    domain::{
        user::{self, token},
        User,
    },
    infra::{database, mail, Database, Mailer},
    Service,
};

use super::Command;

/// Name of the unique constraint guarding [`Email`] uniqueness in the
/// `users` table.
const USERS_EMAIL_KEY: &str = "users_email_key";

/// [`Command`] for registering a new [`User`].
#[derive(Debug, From)]
pub struct CreateUser {
    /// [`Email`] of a new [`User`].
    pub email: user::Email,

    /// [`Password`] of a new [`User`].
    pub password: SecretBox<user::Password>,
}

impl<Db, M> Command<CreateUser> for Service<Db, M>
where
    Db: for<'e> Database<
            Select<By<Option<User>, &'e user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<User>, Ok = (), Err = Traced<database::Error>>,
    M: Mailer<Deliver<mail::Message>, Ok = (), Err = Traced<mail::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUser { email, password } = cmd;

        let existing = self
            .database()
            .execute(Select(By::new(&email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if existing.is_some() {
            return Err(tracerr::new!(E::EmailOccupied(email)));
        }

        let password_hash = user::PasswordHash::derive(password.expose_secret())
            .map_err(tracerr::from_and_wrap!(=> E))?;
        let user = User {
            id: user::Id::new(),
            email,
            password_hash,
            is_verified: false,
            created_at: DateTime::now().coerce(),
        };

        // The `Select` above doesn't lock anything, so a concurrent
        // registration may still slip in between. The unique constraint is
        // authoritative.
        self.database()
            .execute(Insert(user.clone()))
            .await
            .map_err(|e| {
                if e.as_ref().is_unique_violation(Some(USERS_EMAIL_KEY)) {
                    tracerr::new!(E::EmailOccupied(user.email.clone()))
                } else {
                    tracerr::map_from(e)
                }
            })?;

        let claims = token::Claims::new(
            user.email.clone(),
            token::Purpose::EmailConfirm,
            self.config.action_token_ttl,
        );
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &self.config.jwt_encoding_key,
        )
        .map_err(tracerr::from_and_wrap!(=> E))?;

        // The `User` row is in place already, so a mail transport failure
        // shouldn't fail the whole registration.
        let link = format!("{}/confirm/{token}", self.config.public_url);
        if let Err(e) = self
            .mailer()
            .execute(Deliver(mail::Message {
                to: user.email.clone(),
                subject: "Email Verification".into(),
                body: format!(
                    "Please click the link to verify your email: {link}",
                ),
            }))
            .await
        {
            tracing::warn!("failed to send verification email: {e}");
        }

        Ok(user)
    }
}

/// Error of [`CreateUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Email`] is already registered.
    #[display("`{_0}` email is already registered")]
    #[from(ignore)]
    EmailOccupied(#[error(not(source))] user::Email),

    /// [`jsonwebtoken`] encoding error.
    #[display("Failed to encode a JSON Web Token: {_0}")]
    JsonWebTokenEncodeError(jsonwebtoken::errors::Error),

    /// Failure of hashing a [`Password`].
    #[display("Failed to hash a `Password`: {_0}")]
    PasswordHashError(argon2::password_hash::Error),
}
