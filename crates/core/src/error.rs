use thiserror::Error;

/// The only failures that cross the service boundary. Everything else is
/// absorbed by worker retries or surfaces to an operator.
#[derive(Error, Debug)]
pub enum RemraError {
    #[error("Internal server error")]
    InternalError,
    #[error("Invalid data provided: Error message: `{0}`")]
    BadClientData(String),
    #[error("There was a conflict with the request. Error message: `{0}`")]
    Conflict(String),
    #[error("404 Not found. Error message: `{0}`")]
    NotFound(String),
}
