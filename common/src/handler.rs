//! [`Handler`] abstractions.

use std::future::Future;

/// Handler of a single abstract operation.
///
/// Infrastructure seams (database, mail transport) and business logic
/// (commands, queries) are all expressed as [`Handler`] implementations, so
/// they can be swapped out in tests without any further machinery.
pub trait Handler<Args = ()> {
    /// Type of successful [`Handler`] result.
    type Ok;

    /// Type of this [`Handler`] error.
    type Err;

    /// Executes this [`Handler`] with the provided arguments.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
