//! [`Mailer`]-related implementations.

pub mod smtp;

use derive_more::{Display, Error as StdError, From};

use crate::domain::user;

pub use self::smtp::Smtp;

/// Mail delivery operation.
pub use common::Handler as Mailer;

/// Email message to be delivered to a [`user::Email`] address.
#[derive(Clone, Debug)]
pub struct Message {
    /// [`user::Email`] address this [`Message`] is addressed to.
    pub to: user::Email,

    /// Subject of this [`Message`].
    pub subject: String,

    /// Plain text body of this [`Message`].
    pub body: String,
}

/// [`Mailer`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// [`Smtp`] error.
    Smtp(smtp::Error),
}
