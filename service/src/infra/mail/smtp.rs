//! SMTP [`Mailer`] implementation.

use common::operations::Deliver;
use derive_more::{Display, Error as StdError, From};
use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport as _, Tokio1Executor,
};
use tracerr::Traced;

use crate::infra::{mail, Mailer};

use super::Message;

/// SMTP [`Mailer`] client.
#[derive(Clone, Debug)]
pub struct Smtp {
    /// Underlying SMTP transport.
    transport: AsyncSmtpTransport<Tokio1Executor>,

    /// [`Mailbox`] outgoing [`Message`]s are sent from.
    from: Mailbox,
}

/// [`Smtp`] client configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Host of the SMTP server to relay [`Message`]s through.
    pub host: String,

    /// Port of the SMTP server.
    pub port: u16,

    /// Username to authenticate on the SMTP server with.
    pub username: String,

    /// Password to authenticate on the SMTP server with.
    pub password: String,

    /// Address outgoing [`Message`]s are sent from.
    pub from: String,
}

impl Smtp {
    /// Creates a new [`Smtp`] client with the provided [`Config`].
    ///
    /// # Errors
    ///
    /// If the provided [`Config`] is invalid.
    pub fn new(conf: &Config) -> Result<Self, Traced<mail::Error>> {
        let transport =
            AsyncSmtpTransport::<Tokio1Executor>::relay(&conf.host)
                .map_err(tracerr::from_and_wrap!(=> Error))
                .map_err(tracerr::map_from)?
                .port(conf.port)
                .credentials(Credentials::new(
                    conf.username.clone(),
                    conf.password.clone(),
                ))
                .build();
        let from = conf
            .from
            .parse::<Mailbox>()
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)?;
        Ok(Self { transport, from })
    }
}

impl Mailer<Deliver<Message>> for Smtp {
    type Ok = ();
    type Err = Traced<mail::Error>;

    async fn execute(
        &self,
        Deliver(msg): Deliver<Message>,
    ) -> Result<Self::Ok, Self::Err> {
        let Message { to, subject, body } = msg;

        let to = AsRef::<str>::as_ref(&to)
            .parse::<Mailbox>()
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)?;
        let email = lettre::Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .body(body)
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)?;

        self.transport
            .send(email)
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)
            .map(drop)
    }
}

/// SMTP [`Mailer`] [`Error`].
#[derive(Debug, Display, StdError, From)]
pub enum Error {
    /// Malformed email address.
    #[display("Malformed email address: {_0}")]
    Address(lettre::address::AddressError),

    /// Failure of building an outgoing [`Message`].
    #[display("Failed to build a `Message`: {_0}")]
    Build(lettre::error::Error),

    /// SMTP transport error.
    #[display("SMTP transport error: {_0}")]
    Transport(lettre::transport::smtp::Error),
}
