use std::{env, fmt};

use crate::{
    config::{Config, DEFAULT_TOKEN_ENV},
    error::{Result, VoidkeyError},
};

pub const HELLO_WORLD_IDP: &str = "hello-world";
pub const HELLO_WORLD_TOKEN: &str = "cli-hello-world-token";
const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Where a resolved token came from.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenSource {
    Flag,
    Env(String),
    HelloWorld,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenSource::Flag => write!(f, "--token flag"),
            TokenSource::Env(name) => write!(f, "{} environment variable", name),
            TokenSource::HelloWorld => write!(f, "hello-world default token"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedToken {
    pub token: String,
    pub source: TokenSource,
}

impl ResolvedToken {
    /// Diagnostic line for stderr, `None` when the token was given explicitly.
    pub fn diagnostic(&self) -> Option<String> {
        match &self.source {
            TokenSource::Flag => None,
            TokenSource::Env(name) => Some(format!("🔍 Using {} environment variable", name)),
            TokenSource::HelloWorld => {
                Some("🎭 Using hello-world IdP with default token".to_string())
            }
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Looks up a token in the environment only: the configured variable first,
/// then `OIDC_TOKEN` and `GITHUB_TOKEN`.
pub fn token_from_env(config: &Config) -> Option<ResolvedToken> {
    let mut candidates = vec![];
    if !config.token_env.is_empty() {
        candidates.push(config.token_env.as_str());
    }
    for name in [DEFAULT_TOKEN_ENV, GITHUB_TOKEN_ENV] {
        if !candidates.contains(&name) {
            candidates.push(name);
        }
    }

    candidates.into_iter().find_map(|name| {
        non_empty_env(name).map(|token| ResolvedToken {
            token,
            source: TokenSource::Env(name.to_string()),
        })
    })
}

/// Resolves the OIDC token for a command.
///
/// Precedence: explicit flag, environment (see [`token_from_env`]), then the
/// fixed placeholder when the IdP is `hello-world`.
pub fn resolve_token(
    flag: Option<&str>,
    config: &Config,
    idp_name: Option<&str>,
) -> Result<ResolvedToken> {
    if let Some(token) = flag.filter(|t| !t.is_empty()) {
        log::debug!("Token found in --token flag");
        return Ok(ResolvedToken {
            token: token.to_string(),
            source: TokenSource::Flag,
        });
    }

    if let Some(resolved) = token_from_env(config) {
        log::debug!("Token found in {}", resolved.source);
        return Ok(resolved);
    }

    if idp_name == Some(HELLO_WORLD_IDP) {
        log::debug!("No token found, using hello-world placeholder");
        return Ok(ResolvedToken {
            token: HELLO_WORLD_TOKEN.to_string(),
            source: TokenSource::HelloWorld,
        });
    }

    Err(VoidkeyError::MissingToken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::run_with_env;

    const CLEAR: [(&str, Option<&str>); 3] = [
        ("OIDC_TOKEN", None),
        ("GITHUB_TOKEN", None),
        ("MY_TOKEN", None),
    ];

    #[test]
    fn flag_wins() {
        run_with_env(
            [
                ("OIDC_TOKEN", Some("B")),
                ("GITHUB_TOKEN", Some("C")),
            ],
            || {
                let resolved = resolve_token(Some("A"), &Config::default(), None).unwrap();
                assert_eq!(resolved.token, "A");
                assert_eq!(resolved.source, TokenSource::Flag);
                assert_eq!(resolved.diagnostic(), None);
            },
        );
    }

    #[test]
    fn oidc_token_before_github_token() {
        run_with_env(
            [
                ("OIDC_TOKEN", Some("B")),
                ("GITHUB_TOKEN", Some("C")),
            ],
            || {
                let resolved = resolve_token(None, &Config::default(), None).unwrap();
                assert_eq!(resolved.token, "B");
                assert_eq!(
                    resolved.diagnostic().unwrap(),
                    "🔍 Using OIDC_TOKEN environment variable"
                );

                // empty flag is ignored
                let resolved = resolve_token(Some(""), &Config::default(), None).unwrap();
                assert_eq!(resolved.token, "B");
            },
        );
    }

    #[test]
    fn github_token_fallback() {
        run_with_env(
            [("OIDC_TOKEN", Some("")), ("GITHUB_TOKEN", Some("C"))],
            || {
                let resolved = resolve_token(None, &Config::default(), None).unwrap();
                assert_eq!(resolved.token, "C");
                assert_eq!(resolved.source, TokenSource::Env("GITHUB_TOKEN".into()));
            },
        );
    }

    #[test]
    fn configured_variable_first() {
        run_with_env(
            [
                ("MY_TOKEN", Some("D")),
                ("OIDC_TOKEN", Some("B")),
                ("GITHUB_TOKEN", None),
            ],
            || {
                let config = Config {
                    token_env: "MY_TOKEN".into(),
                    ..Config::default()
                };
                let resolved = resolve_token(None, &config, None).unwrap();
                assert_eq!(resolved.token, "D");
                assert_eq!(
                    resolved.diagnostic().unwrap(),
                    "🔍 Using MY_TOKEN environment variable"
                );
            },
        );

        run_with_env(
            [
                ("MY_TOKEN", None),
                ("OIDC_TOKEN", Some("B")),
                ("GITHUB_TOKEN", None),
            ],
            || {
                let config = Config {
                    token_env: "MY_TOKEN".into(),
                    ..Config::default()
                };
                assert_eq!(resolve_token(None, &config, None).unwrap().token, "B");
            },
        );
    }

    #[test]
    fn hello_world_placeholder() {
        run_with_env(CLEAR, || {
            let resolved =
                resolve_token(None, &Config::default(), Some("hello-world")).unwrap();
            assert_eq!(resolved.token, "cli-hello-world-token");
            assert_eq!(
                resolved.diagnostic().unwrap(),
                "🎭 Using hello-world IdP with default token"
            );
        });
    }

    #[test]
    fn env_beats_hello_world() {
        run_with_env([("OIDC_TOKEN", Some("B")), ("GITHUB_TOKEN", None)], || {
            let resolved =
                resolve_token(None, &Config::default(), Some("hello-world")).unwrap();
            assert_eq!(resolved.token, "B");
        });
    }

    #[test]
    fn missing_token() {
        run_with_env(CLEAR, || {
            assert_eq!(
                resolve_token(None, &Config::default(), Some("auth0")),
                Err(VoidkeyError::MissingToken)
            );
            assert_eq!(
                resolve_token(None, &Config::default(), None),
                Err(VoidkeyError::MissingToken)
            );
            assert_eq!(token_from_env(&Config::default()), None);
        });
    }
}
