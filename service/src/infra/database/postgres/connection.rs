//! [`Connection`] definitions.

pub use deadpool_postgres::{
    Client as Connection, CreatePoolError as PoolCreationError, Pool,
    PoolError,
};
pub use tokio_postgres::Error;
