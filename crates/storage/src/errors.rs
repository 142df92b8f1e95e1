use mongodb::bson;
use mongodb::error::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(#[source] mongodb::error::Error),

    #[error("Write error: {0}")]
    Write(#[source] mongodb::error::Error),

    #[error("Query error: {0}")]
    Query(#[source] mongodb::error::Error),

    #[error("MongoDB error: {0}")]
    Driver(#[from] mongodb::error::Error),

    #[error("Not connected to the document store")]
    NotConnected,

    #[error("No collection selected")]
    NoCollectionSelected,

    #[error("BSON serialization error: {0}")]
    BsonSerialization(#[from] bson::ser::Error),

    #[error("BSON deserialization error: {0}")]
    BsonDeserialization(#[from] bson::de::Error),

    #[error("Other error: {0}")]
    Other(String),
}

/// The kind of call a driver error came out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Connect,
    Read,
    Write,
}

impl StoreError {
    /// Sorts a driver error into the store taxonomy without altering it.
    ///
    /// Losing the connection in the middle of an insert, update or delete is a write failure.
    pub(crate) fn from_driver(err: mongodb::error::Error, operation: Operation) -> Self {
        if operation == Operation::Connect {
            return StoreError::Connection(err);
        }
        if is_connection_failure(&err) {
            return match operation {
                Operation::Write => StoreError::Write(err),
                _ => StoreError::Connection(err),
            };
        }

        match (err.kind.as_ref(), operation) {
            (ErrorKind::Write(_) | ErrorKind::BulkWrite(_), _) => StoreError::Write(err),
            (ErrorKind::Command(_), Operation::Write) => StoreError::Write(err),
            (ErrorKind::Command(_) | ErrorKind::InvalidArgument { .. }, Operation::Read) => {
                StoreError::Query(err)
            }
            _ => StoreError::Driver(err),
        }
    }

    /// The driver error behind this failure, if any.
    pub fn driver_error(&self) -> Option<&mongodb::error::Error> {
        match self {
            StoreError::Connection(e)
            | StoreError::Write(e)
            | StoreError::Query(e)
            | StoreError::Driver(e) => Some(e),
            _ => None,
        }
    }
}

fn is_connection_failure(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Io(_)
            | ErrorKind::DnsResolve { .. }
            | ErrorKind::ServerSelection { .. }
            | ErrorKind::Authentication { .. }
            | ErrorKind::ConnectionPoolCleared { .. }
            | ErrorKind::InvalidTlsConfig { .. }
    )
}

#[cfg(test)]
mod tests {
    use std::io;

    use crate::errors::{Operation, StoreError};

    fn connection_reset() -> mongodb::error::Error {
        io::Error::new(io::ErrorKind::ConnectionReset, "connection reset by peer").into()
    }

    #[test]
    fn test_disconnect_during_write_is_write_error() {
        let err = StoreError::from_driver(connection_reset(), Operation::Write);
        assert!(matches!(err, StoreError::Write(_)));
        assert!(err.driver_error().is_some());
    }

    #[test]
    fn test_disconnect_during_read_is_connection_error() {
        let err = StoreError::from_driver(connection_reset(), Operation::Read);
        assert!(matches!(err, StoreError::Connection(_)));
    }

    #[test]
    fn test_any_failure_while_connecting_is_connection_error() {
        let err = StoreError::from_driver(connection_reset(), Operation::Connect);
        assert!(matches!(err, StoreError::Connection(_)));
    }

    #[test]
    fn test_non_driver_errors_have_no_source() {
        assert!(StoreError::NotConnected.driver_error().is_none());
        assert!(StoreError::NoCollectionSelected.driver_error().is_none());
    }
}
