//! Failures of the CouchDB-backed game store.

use reqwest::StatusCode;
use thiserror::Error;

/// Result alias used throughout the CouchDB store.
pub type CouchResult<T> = Result<T, CouchDaoError>;

/// What can go wrong while talking to CouchDB.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    /// Required environment variable is missing.
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// Environment variable holds an unusable value.
    #[error("invalid value in CouchDB environment variable `{var}`")]
    InvalidEnvVar { var: &'static str },
    /// The HTTP client could not be built.
    #[error("failed to build CouchDB client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// The server did not answer while the database was checked or created.
    #[error("CouchDB database `{database}` is unreachable")]
    DatabaseUnreachable {
        database: String,
        #[source]
        source: reqwest::Error,
    },
    /// The database could not be checked or created.
    #[error("CouchDB answered {status} while preparing database `{database}`")]
    DatabaseStatus {
        database: String,
        status: StatusCode,
    },
    /// A document request could not be sent or its body not read.
    #[error("CouchDB request for `{doc_id}` failed")]
    Request {
        doc_id: String,
        #[source]
        source: reqwest::Error,
    },
    /// A document request was rejected.
    #[error("CouchDB answered {status} for `{doc_id}`")]
    Status { doc_id: String, status: StatusCode },
    /// The document revision moved between read and write.
    #[error("document `{doc_id}` was updated concurrently")]
    Conflict { doc_id: String },
    /// A document body does not match the expected model.
    #[error("failed to decode CouchDB document `{doc_id}`")]
    Decode {
        doc_id: String,
        #[source]
        source: serde_json::Error,
    },
}
