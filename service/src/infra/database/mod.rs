//! [`Database`]-related implementations.

#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};

#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;

/// Database operation.
pub use common::Handler as Database;

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),

    /// Unique constraint violation, with the violated constraint name when
    /// it's known.
    #[display("unique constraint {_0:?} violated")]
    #[from(ignore)]
    UniqueViolation(#[error(not(source))] Option<String>),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::UniqueViolation(violated) => constraint
                .map_or(true, |c| violated.as_deref() == Some(c)),
            #[cfg(feature = "postgres")]
            Self::Postgres(..) => false,
        }
    }
}
