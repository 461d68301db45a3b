//! Request and response records exchanged with the broker.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How credentials are requested from the broker.
#[derive(Debug, Clone, PartialEq)]
pub enum MintMode {
    /// Single AWS style credential, optionally scoped to a named keyset
    LegacyKeyset(Option<String>),
    /// Named keys, or every key the identity has access to
    NamedKeys {
        keys: Vec<String>,
        duration: Option<u64>,
        all: bool,
    },
}

impl MintMode {
    /// Picks the mode from the `mint` flags. `--keyset` can not be mixed with `--keys`/`--all`.
    pub fn from_flags(
        keyset: Option<String>,
        keys: Vec<String>,
        duration: Option<u64>,
        all: bool,
    ) -> Option<Self> {
        let keys: Vec<String> = keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        let duration = duration.filter(|d| *d > 0);

        if keys.is_empty() && !all {
            return Some(MintMode::LegacyKeyset(keyset));
        }
        if keyset.is_some() {
            return None;
        }
        Some(MintMode::NamedKeys {
            keys,
            duration,
            all,
        })
    }
}

/// Body of the mint POST requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    pub oidc_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idp_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyset: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub all: bool,
}

impl MintRequest {
    pub fn new(oidc_token: &str, idp_name: Option<&str>, mode: &MintMode) -> Self {
        let mut request = MintRequest {
            oidc_token: oidc_token.to_string(),
            idp_name: idp_name.filter(|s| !s.is_empty()).map(String::from),
            ..Default::default()
        };
        match mode {
            MintMode::LegacyKeyset(keyset) => {
                request.keyset = keyset.clone().filter(|s| !s.is_empty());
            }
            MintMode::NamedKeys {
                keys,
                duration,
                all,
            } => {
                request.keys = keys.clone();
                request.duration = *duration;
                request.all = *all;
            }
        }
        request
    }
}

/// Credentials returned by the legacy single credential endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudCredentials {
    pub access_key: String,
    pub secret_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub session_token: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyCredentialResponse {
    pub credentials: BTreeMap<String, String>,
    pub expires_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Result of a mint-keys call, keyed by key name (e.g. `AWS_CREDENTIALS`).
pub type MintedKeys = BTreeMap<String, KeyCredentialResponse>;

/// Keyset name to its environment variable mappings.
pub type Keysets = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdpProvider {
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

/// Who a keyset query is made for.
#[derive(Debug, Clone, PartialEq)]
pub enum Identity {
    Token(String),
    Subject(String),
}

impl Identity {
    /// Token wins over subject when both are given.
    pub fn from_flags(token: Option<String>, subject: Option<String>) -> Option<Self> {
        match (
            token.filter(|t| !t.is_empty()),
            subject.filter(|s| !s.is_empty()),
        ) {
            (Some(token), _) => Some(Identity::Token(token)),
            (None, Some(subject)) => Some(Identity::Subject(subject)),
            (None, None) => None,
        }
    }

    pub(crate) fn query_param(&self) -> (&'static str, &str) {
        match self {
            Identity::Token(token) => ("token", token),
            Identity::Subject(subject) => ("subject", subject),
        }
    }
}
