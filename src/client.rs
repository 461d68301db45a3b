//! HTTP plumbing towards the Voidkey broker.

use reqwest::{header::CONTENT_TYPE, Url};
use serde::de::DeserializeOwned;

use crate::{
    error::{Result, VoidkeyError},
    types::{
        CloudCredentials, Identity, IdpProvider, Keysets, MintMode, MintRequest, MintedKeys,
    },
};
use std::collections::BTreeMap;

pub const DEFAULT_MINT_KEYS_PATH: &str = "/credentials/mint-keys";

const JSON_CONTENT_TYPE: &str = "application/json";

/// Status code and fully read body of a broker response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

pub type TransportResult =
    std::result::Result<HttpResponse, Box<dyn std::error::Error + Send + Sync>>;

/// Minimal HTTP capability used by [`VoidkeyClient`].
///
/// Implementations must read the whole body before returning so that no
/// response resource outlives the call.
pub trait HttpClient {
    fn post(&self, url: &str, content_type: &str, body: Vec<u8>) -> TransportResult;
    fn get(&self, url: &str) -> TransportResult;
}

/// [`HttpClient`] backed by a blocking reqwest client.
#[derive(Debug, Clone, Default)]
pub struct ReqwestClient {
    inner: reqwest::blocking::Client,
}

impl ReqwestClient {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HttpClient for ReqwestClient {
    fn post(&self, url: &str, content_type: &str, body: Vec<u8>) -> TransportResult {
        let response = self
            .inner
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()?;
        let status = response.status().as_u16();
        Ok(HttpResponse {
            status,
            body: response.text()?,
        })
    }

    fn get(&self, url: &str) -> TransportResult {
        let response = self.inner.get(url).send()?;
        let status = response.status().as_u16();
        Ok(HttpResponse {
            status,
            body: response.text()?,
        })
    }
}

/// Typed client for the broker's credential endpoints.
pub struct VoidkeyClient<C: HttpClient> {
    client: C,
    server_url: String,
    mint_keys_path: String,
}

impl<C: HttpClient> VoidkeyClient<C> {
    pub fn new(client: C, server_url: &str) -> Self {
        Self {
            client,
            server_url: server_url.trim_end_matches('/').to_string(),
            mint_keys_path: DEFAULT_MINT_KEYS_PATH.to_string(),
        }
    }

    /// Overrides the endpoint used by [`VoidkeyClient::mint_keys`]; broker
    /// versions differ on whether this is `/credentials/mint-keys` or `/credentials/mint`.
    pub fn with_mint_keys_path(mut self, path: &str) -> Self {
        self.mint_keys_path = format!("/{}", path.trim_start_matches('/'));
        self
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn http_client(&self) -> &C {
        &self.client
    }

    /// Mints a single AWS style credential (legacy endpoint).
    pub fn mint_credentials(
        &self,
        oidc_token: &str,
        idp_name: Option<&str>,
        keyset: Option<&str>,
    ) -> Result<CloudCredentials> {
        require_token(oidc_token)?;
        let mode = MintMode::LegacyKeyset(keyset.map(String::from));
        let request = MintRequest::new(oidc_token, idp_name, &mode);
        self.post_json("/credentials/mint", &request, "credentials")
    }

    /// Mints the named keys, or every available key when `all` is set.
    pub fn mint_keys(
        &self,
        oidc_token: &str,
        idp_name: Option<&str>,
        keys: &[String],
        duration: Option<u64>,
        all: bool,
    ) -> Result<MintedKeys> {
        require_token(oidc_token)?;
        let mode = MintMode::NamedKeys {
            keys: keys.to_vec(),
            duration: duration.filter(|d| *d > 0),
            all,
        };
        let request = MintRequest::new(oidc_token, idp_name, &mode);
        self.post_json(&self.mint_keys_path, &request, "keys")
    }

    pub fn list_idp_providers(&self) -> Result<Vec<IdpProvider>> {
        let providers: Option<Vec<IdpProvider>> =
            self.get_json("/credentials/idp-providers", &[], "providers")?;
        Ok(providers.unwrap_or_default())
    }

    pub fn get_available_keys(&self, oidc_token: &str) -> Result<Vec<String>> {
        let keys: Option<Vec<String>> =
            self.get_json("/credentials/keys", &[("token", oidc_token)], "keys")?;
        Ok(keys.unwrap_or_default())
    }

    /// Returns `None` when the broker knows no such keyset for the identity.
    pub fn get_keyset_keys(
        &self,
        identity: &Identity,
        keyset: &str,
    ) -> Result<Option<BTreeMap<String, String>>> {
        let (name, value) = identity.query_param();
        self.get_json(
            "/credentials/keysets/keys",
            &[(name, value), ("keyset", keyset)],
            "keyset keys",
        )
    }

    /// Returns `None` when the broker has no keysets for the identity.
    pub fn get_available_keysets(&self, identity: &Identity) -> Result<Option<Keysets>> {
        let (name, value) = identity.query_param();
        self.get_json("/credentials/keysets", &[(name, value)], "keysets")
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<String> {
        let raw = format!("{}{}", self.server_url, path);
        let url = Url::parse_with_params(&raw, params).map_err(|e| VoidkeyError::InvalidUrl {
            url: self.server_url.clone(),
            reason: e.to_string(),
        })?;
        let mut url = url.to_string();
        // parse_with_params leaves a dangling '?' without parameters
        if params.is_empty() && url.ends_with('?') {
            url.pop();
        }
        Ok(url)
    }

    fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        request: &MintRequest,
        what: &'static str,
    ) -> Result<T> {
        let url = self.url(path, &[])?;
        let body = serde_json::to_vec(request)?;
        log::debug!("POST {}", url);
        let response = self
            .client
            .post(&url, JSON_CONTENT_TYPE, body)
            .map_err(|e| self.connection_error(e))?;
        decode(response, what)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        what: &'static str,
    ) -> Result<T> {
        let url = self.url(path, params)?;
        log::debug!("GET {}{}", self.server_url, path);
        let response = self
            .client
            .get(&url)
            .map_err(|e| self.connection_error(e))?;
        decode(response, what)
    }

    fn connection_error(&self, err: impl std::fmt::Display) -> VoidkeyError {
        VoidkeyError::Connection {
            server: self.server_url.clone(),
            reason: err.to_string(),
        }
    }
}

fn require_token(oidc_token: &str) -> Result<()> {
    if oidc_token.trim().is_empty() {
        return Err(VoidkeyError::MissingToken);
    }
    Ok(())
}

fn decode<T: DeserializeOwned>(response: HttpResponse, what: &'static str) -> Result<T> {
    log::debug!("broker responded with status {}", response.status);
    if response.status != 200 {
        return Err(VoidkeyError::Server {
            status: response.status,
            body: response.body,
        });
    }
    serde_json::from_str(&response.body).map_err(|e| VoidkeyError::parse(what, e))
}
