//! `voidkey` is a client for the Voidkey credential broker: it exchanges an
//! OIDC identity token for short-lived cloud credentials.
//!
//! ```no_run
//! use voidkey::{ReqwestClient, VoidkeyClient};
//!
//! let client = VoidkeyClient::new(ReqwestClient::new(), "http://localhost:3000");
//! match client.mint_credentials("my.jwt.token", Some("github-actions"), None) {
//!     Ok(creds) => println!("{}", creds.access_key),
//!     Err(e) => eprintln!("{}", e),
//! }
//! ```
//!
//! # Token lookup
//!
//! Commands that need a token take it from, in order:
//! * the `--token` flag
//! * the environment variable named by `token_env` in the config (`OIDC_TOKEN` by default),
//!   then `OIDC_TOKEN` and `GITHUB_TOKEN`
//! * a fixed placeholder when the `hello-world` IdP is used
//!
//! # Configuration
//!
//! Defaults live in `~/.voidkey/config.yaml`:
//!
//! ```yaml
//! server: https://broker.example.com
//! idp_name: github-actions
//! token_env: GITHUB_TOKEN
//! ```

pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod token;
pub mod types;

pub use client::{HttpClient, HttpResponse, ReqwestClient, VoidkeyClient};
pub use config::Config;
pub use error::{Result, VoidkeyError};
pub use types::{CloudCredentials, IdpProvider, KeyCredentialResponse, MintMode};

#[cfg(test)]
#[macro_use]
extern crate lazy_static;

#[cfg(test)]
pub(crate) mod test_util {
    use std::{
        cell::RefCell,
        collections::{HashMap, VecDeque},
        env,
        sync::{Mutex, MutexGuard},
    };

    use crate::client::{HttpClient, HttpResponse, TransportResult};

    // Mutex for all tests that modify environment variables
    lazy_static! {
        static ref ENV_MUTEX: Mutex<()> = Mutex::new(());
    }

    struct SavedEnv<'a> {
        old_env: HashMap<&'a str, Option<String>>,
        _guard: MutexGuard<'a, ()>,
    }

    impl<'a> SavedEnv<'a> {
        fn new<T>(test_env: T) -> Self
        where
            T: IntoIterator<Item = (&'a str, Option<&'a str>)>,
        {
            // Tests can panic: assume our lock is still fine
            let guard = match ENV_MUTEX.lock() {
                Ok(guard) => guard,
                Err(poison) => poison.into_inner(),
            };

            let mut old_env = HashMap::new();
            for (key, val) in test_env {
                old_env.insert(key, env::var(key).ok());
                match val {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }

            Self {
                old_env,
                _guard: guard,
            }
        }
    }

    impl Drop for SavedEnv<'_> {
        fn drop(&mut self) {
            for (key, val) in self.old_env.drain() {
                match val {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }

    /// Runs `f` with the given variables set (or removed), restoring them afterwards.
    pub fn run_with_env<'a, T, F>(test_env: T, f: F)
    where
        F: Fn(),
        T: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        let saved_env = SavedEnv::new(test_env);
        f();
        drop(saved_env);
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedRequest {
        pub method: &'static str,
        pub url: String,
        pub content_type: Option<String>,
        pub body: String,
    }

    /// Replays queued responses in order and records every request.
    #[derive(Default)]
    pub struct MockHttpClient {
        responses: RefCell<VecDeque<Result<HttpResponse, String>>>,
        requests: RefCell<Vec<RecordedRequest>>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(self, status: u16, body: &str) -> Self {
            self.responses.borrow_mut().push_back(Ok(HttpResponse {
                status,
                body: body.to_string(),
            }));
            self
        }

        pub fn fail(self, reason: &str) -> Self {
            self.responses
                .borrow_mut()
                .push_back(Err(reason.to_string()));
            self
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.borrow().clone()
        }

        fn next(&self, request: RecordedRequest) -> TransportResult {
            self.requests.borrow_mut().push(request);
            match self.responses.borrow_mut().pop_front() {
                Some(Ok(response)) => Ok(response),
                Some(Err(reason)) => Err(reason.into()),
                None => Err("no response queued".into()),
            }
        }
    }

    impl HttpClient for MockHttpClient {
        fn post(&self, url: &str, content_type: &str, body: Vec<u8>) -> TransportResult {
            self.next(RecordedRequest {
                method: "POST",
                url: url.to_string(),
                content_type: Some(content_type.to_string()),
                body: String::from_utf8_lossy(&body).into_owned(),
            })
        }

        fn get(&self, url: &str) -> TransportResult {
            self.next(RecordedRequest {
                method: "GET",
                url: url.to_string(),
                content_type: None,
                body: String::new(),
            })
        }
    }
}
