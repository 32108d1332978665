//! [`Command`] for requesting a [`User`]'s password reset.

use common::operations::{By, Deliver, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::Email;
use crate::{
    domain::{
        user::{self, token},
        User,
    },
    infra::{database, mail, Database, Mailer},
    Service,
};

use super::Command;

/// [`Command`] for requesting a [`User`]'s password reset.
#[derive(Clone, Debug, From)]
pub struct RequestPasswordReset {
    /// [`Email`] of the [`User`] to reset the password of.
    pub email: user::Email,
}

impl<Db, M> Command<RequestPasswordReset> for Service<Db, M>
where
    Db: for<'e> Database<
        Select<By<Option<User>, &'e user::Email>>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
    M: Mailer<Deliver<mail::Message>, Ok = (), Err = Traced<mail::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: RequestPasswordReset,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RequestPasswordReset { email } = cmd;

        let user = self
            .database()
            .execute(Select(By::new(&email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or_else(|| E::UserNotExists(email))
            .map_err(tracerr::wrap!())?;

        let claims = token::Claims::new(
            user.email.clone(),
            token::Purpose::PasswordReset,
            self.config.action_token_ttl,
        );
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &self.config.jwt_encoding_key,
        )
        .map_err(tracerr::from_and_wrap!(=> E))?;

        // The reset link is recoverable by requesting it again, so a mail
        // transport failure shouldn't be fatal here.
        let link = format!("{}/reset/{token}", self.config.public_url);
        if let Err(e) = self
            .mailer()
            .execute(Deliver(mail::Message {
                to: user.email,
                subject: "Password Reset Request".into(),
                body: format!(
                    "Please click the link to reset your password: {link}",
                ),
            }))
            .await
        {
            tracing::warn!("failed to send password reset email: {e}");
        }

        Ok(())
    }
}

/// Error of [`RequestPasswordReset`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`jsonwebtoken`] encoding error.
    #[display("Failed to encode a JSON Web Token: {_0}")]
    JsonWebTokenEncodeError(jsonwebtoken::errors::Error),

    /// [`User`] with the provided [`Email`] does not exist.
    #[display("`User(email: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Email),
}
