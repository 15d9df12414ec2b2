//! Defines the app level error type and its conversion to JSON responses.
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The client sent a transaction that breaks one or more field rules.
    ///
    /// Holds every rule that was broken, in the order they were checked, not
    /// just the first one.
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),

    /// The requested resource was not found.
    ///
    /// Transactions that belong to another user are also reported as not
    /// found so that clients cannot discover IDs they do not own.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The request did not say which user it was made on behalf of.
    #[error("the request is missing a user ID")]
    MissingUserId,

    /// The transaction collection could not be read from or written to its
    /// durable storage.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("storage failure: {0}")]
    Storage(String),

    /// Could not acquire the lock on the transaction collection.
    #[error("could not acquire the transaction store lock")]
    StoreLockError,
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        tracing::error!("an unhandled I/O error occurred: {}", value);
        Error::Storage(value.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Error::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": errors.join("; "),
                    "details": errors,
                }),
            ),
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                json!({ "error": "Transaction not found" }),
            ),
            Error::MissingUserId => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Missing user ID" }),
            ),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use super::Error;

    #[test]
    fn validation_error_joins_all_messages() {
        let error = Error::Validation(vec!["first".to_owned(), "second".to_owned()]);

        assert_eq!(error.to_string(), "first; second");
    }

    #[test]
    fn maps_errors_to_status_codes() {
        let cases = [
            (Error::Validation(vec!["bad".to_owned()]), StatusCode::BAD_REQUEST),
            (Error::NotFound, StatusCode::NOT_FOUND),
            (Error::MissingUserId, StatusCode::UNAUTHORIZED),
            (
                Error::Storage("disk full".to_owned()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (Error::StoreLockError, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, want) in cases {
            let got = error.into_response().status();
            assert_eq!(got, want);
        }
    }
}
