// Error types for every step of a transfer run. Each component returns its
// own error type; `RunError` wraps them with the step that failed so the
// binary can print a single message naming the step and the cause.

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Loading or persisting the credentials file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine the user configuration directory")]
    NoConfigDir,

    #[error("reading config {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("decoding config {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("encoding config")]
    Encode(#[source] serde_yaml::Error),

    #[error("writing config {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Exchanging username/password for a bearer token.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("requesting token")]
    Transport(#[source] reqwest::Error),

    #[error("token request rejected with status {status}: {body}")]
    Rejected { status: StatusCode, body: String },

    #[error("decoding token response")]
    Decode(#[source] reqwest::Error),

    #[error("token can not be used as an Authorization header")]
    InvalidToken,

    #[error("building HTTP client")]
    Client(#[source] reqwest::Error),
}

/// A vendor API call that failed or answered with an unexpected status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{action}")]
    Transport {
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{action}, got status {status}: {body}")]
    Status {
        action: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("decoding response of {action}")]
    Decode {
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Uploading one file: slot negotiation plus the object-store transfer.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("negotiating upload slot")]
    Slot(#[from] ApiError),

    #[error("reading file content")]
    Read(#[source] std::io::Error),

    #[error("sending file to object store")]
    Transfer(#[source] reqwest::Error),

    #[error("sending file to object store, got status {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}

/// Failures of the interactive setup provider.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("aborted by user")]
    AbortedByUser,

    #[error("no {0} available to choose from")]
    NothingToChoose(&'static str),

    #[error("prompting for input")]
    Prompt(#[from] std::io::Error),
}

/// The step of a run that failed, wrapping the underlying cause.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("loading config")]
    Config(#[from] ConfigError),

    #[error("asking for config values")]
    Setup(#[from] SetupError),

    #[error("authenticating")]
    Auth(#[from] AuthError),

    #[error("getting {what}")]
    Lookup {
        what: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("getting files of {}", path.display())]
    ListDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Refused on purpose: publishing nothing would clear the figurine.
    #[error("no regular files in {}", path.display())]
    EmptyDirectory { path: PathBuf },

    #[error("opening file {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("uploading {name}")]
    Upload {
        name: String,
        #[source]
        source: UploadError,
    },

    #[error("updating chapters")]
    Publish(#[source] ApiError),
}

/// Read a response body for an error message. An unreadable body is turned
/// into a diagnostic string instead of failing the error itself.
pub(crate) fn read_body(response: reqwest::blocking::Response) -> String {
    match response.text() {
        Ok(body) => body,
        Err(err) => format!("can not read body: {err}"),
    }
}
