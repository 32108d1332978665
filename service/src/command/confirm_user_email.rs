//! [`Command`] for confirming a [`User`]'s email address.

use common::operations::{By, Select, Update};
use derive_more::{Display, Error, From};
use jsonwebtoken::errors::ErrorKind;
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::Email;
use crate::{
    domain::{
        user::{self, token},
        User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for confirming a [`User`]'s email address.
#[derive(Clone, Debug, From)]
pub struct ConfirmUserEmail {
    /// Action [`token::Token`] from the verification link.
    pub token: token::Token,
}

impl<Db, M> Command<ConfirmUserEmail> for Service<Db, M>
where
    Db: for<'e> Database<
            Select<By<Option<User>, &'e user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Update<User>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ConfirmUserEmail,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ConfirmUserEmail { token } = cmd;

        let claims = jsonwebtoken::decode::<token::Claims>(
            token.as_ref(),
            &self.config.jwt_decoding_key,
            &token::validation(),
        )
        .map_err(|e| {
            if matches!(e.kind(), ErrorKind::ExpiredSignature) {
                tracerr::new!(E::TokenExpired)
            } else {
                tracerr::new!(E::InvalidToken(e))
            }
        })?
        .claims;

        if claims.purpose != token::Purpose::EmailConfirm {
            return Err(tracerr::new!(E::WrongPurpose(claims.purpose)));
        }

        let user = self
            .database()
            .execute(Select(By::new(&claims.email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or_else(|| E::UserNotExists(claims.email.clone()))
            .map_err(tracerr::wrap!())?;

        // Tokens are not single-use, so the `User` may be confirmed already.
        if user.is_verified {
            return Ok(user);
        }

        let user = User {
            is_verified: true,
            ..user
        };
        self.database()
            .execute(Update(user.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(user)
    }
}

/// Error of [`ConfirmUserEmail`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Malformed or tampered action [`token::Token`].
    #[display("Failed to decode a JSON Web Token: {_0}")]
    InvalidToken(jsonwebtoken::errors::Error),

    /// Action [`token::Token`] has expired.
    #[display("Action token has expired")]
    TokenExpired,

    /// [`User`] with the [`Email`] from the [`token::Token`] does not exist.
    #[display("`User(email: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Email),

    /// Action [`token::Token`] is issued for another [`token::Purpose`].
    #[display("Token is issued for `{_0}` purpose")]
    #[from(ignore)]
    WrongPurpose(#[error(not(source))] token::Purpose),
}
