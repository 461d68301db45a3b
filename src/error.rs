use std::{fmt, io};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VoidkeyError>;

/// Remediation text shown when no OIDC token could be resolved.
pub const MISSING_TOKEN_HELP: &str = "OIDC token is required. Provide via:\n  \
    --token flag: voidkey mint --token \"your.jwt.token\"\n  \
    OIDC_TOKEN env var: export OIDC_TOKEN=\"your.jwt.token\"\n  \
    GITHUB_TOKEN env var (for GitHub Actions IdP)\n\n\
    To obtain an OIDC token:\n  \
    - Auth0: Use the Auth0 CLI or obtain from your application\n  \
    - GitHub Actions: Available as ${{ github.token }}\n  \
    - Other IdPs: Consult your identity provider's documentation\n  \
    - Hello World: Use --idp hello-world for testing (no token required)";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VoidkeyError {
    /// No token from the flag, the environment or the hello-world fallback
    #[error("{}", MISSING_TOKEN_HELP)]
    MissingToken,
    /// Broker could not be reached
    #[error("failed to connect to broker server at {server}: {reason}")]
    Connection { server: String, reason: String },
    /// Broker answered with something other than 200
    #[error("server returned error {status}: {body}")]
    Server { status: u16, body: String },
    /// Broker answered 200 but the body did not match the expected shape
    #[error("failed to parse {what} response: {reason}")]
    Parse { what: &'static str, reason: String },
    /// A listing query failed
    #[error("failed to list {what}: {source}")]
    Listing {
        what: &'static str,
        source: Box<VoidkeyError>,
    },
    #[error("invalid server URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    /// Invalid command line input
    #[error("{0}")]
    Usage(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(String),
}

impl VoidkeyError {
    pub(crate) fn listing(what: &'static str) -> impl FnOnce(VoidkeyError) -> Self {
        move |err| VoidkeyError::Listing {
            what,
            source: Box::new(err),
        }
    }

    pub(crate) fn parse(what: &'static str, err: impl fmt::Display) -> Self {
        VoidkeyError::Parse {
            what,
            reason: err.to_string(),
        }
    }
}

impl From<io::Error> for VoidkeyError {
    fn from(err: io::Error) -> Self {
        VoidkeyError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for VoidkeyError {
    fn from(err: serde_json::Error) -> Self {
        VoidkeyError::Io(format!("failed to encode JSON: {}", err))
    }
}
