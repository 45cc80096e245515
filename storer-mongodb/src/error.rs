//! Translation of driver errors into the storer taxonomy.

use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use storer_core::error::StorerError;

/// Server codes for payloads rejected as malformed: BadValue, FailedToParse,
/// TypeMismatch.
const MALFORMED_PAYLOAD_CODES: [i32; 3] = [2, 9, 14];

/// Maps a `mongodb` error into a [`StorerError`].
///
/// Argument errors raised by the driver while building a command, and server
/// rejections of a malformed query or change (unknown operators, unparsable
/// updates, type mismatches), become [`StorerError::InvalidArgument`].
/// Everything else is a driver failure.
pub(crate) fn driver_error(err: MongoError) -> StorerError {
    let malformed = match err.kind.as_ref() {
        ErrorKind::InvalidArgument { .. } => true,
        ErrorKind::Command(command) => MALFORMED_PAYLOAD_CODES.contains(&command.code),
        ErrorKind::Write(WriteFailure::WriteError(write)) => MALFORMED_PAYLOAD_CODES.contains(&write.code),
        _ => false,
    };

    if malformed {
        StorerError::InvalidArgument(err.to_string())
    } else {
        StorerError::Driver(err.to_string())
    }
}
