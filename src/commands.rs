//! Subcommand implementations.
//!
//! Every command gets its configuration and broker client passed in and writes
//! to the given `out`/`err` streams, so the binary only has to parse arguments.

use std::{io::Write, path::Path};

use crate::{
    client::{HttpClient, VoidkeyClient},
    config::{Config, ConfigKey},
    error::{Result, VoidkeyError},
    output::{self, KeysetFormat, OutputFormat},
    token::{self, resolve_token},
    types::{Identity, MintMode},
};

/// Flags of the `mint` command.
#[derive(Debug, Clone, Default)]
pub struct MintOptions {
    pub token: Option<String>,
    pub idp: Option<String>,
    pub output: OutputFormat,
    pub keys: Vec<String>,
    pub all: bool,
    pub duration: Option<u64>,
    /// Legacy keyset name, only valid without `keys`/`all`
    pub keyset: Option<String>,
}

pub fn mint<C: HttpClient>(
    client: &VoidkeyClient<C>,
    config: &Config,
    opts: MintOptions,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<()> {
    let idp_name = opts
        .idp
        .filter(|idp| !idp.is_empty())
        .or_else(|| config.idp_name.clone());

    let resolved = resolve_token(opts.token.as_deref(), config, idp_name.as_deref())?;
    if let Some(line) = resolved.diagnostic() {
        writeln!(err, "{}", line)?;
    }

    match &idp_name {
        Some(idp) => writeln!(err, "🔍 Using IdP provider: {}", idp)?,
        None => writeln!(err, "🔍 Using server default IdP provider")?,
    }

    let Some(mode) = MintMode::from_flags(opts.keyset, opts.keys, opts.duration, opts.all) else {
        return Err(VoidkeyError::Usage(
            "--keyset can not be combined with --keys or --all".into(),
        ));
    };

    match mode {
        MintMode::LegacyKeyset(keyset) => {
            if let Some(keyset) = &keyset {
                writeln!(err, "📦 Using keyset: {}", keyset)?;
            }
            let creds =
                client.mint_credentials(&resolved.token, idp_name.as_deref(), keyset.as_deref())?;
            match opts.output {
                OutputFormat::Json => output::write_json(out, &creds)?,
                OutputFormat::Env => {
                    output::write_credentials_env(out, &creds)?;
                    writeln!(
                        err,
                        "✅ Credentials minted successfully (expires: {})",
                        creds.expires_at
                    )?;
                }
            }
        }
        MintMode::NamedKeys {
            keys,
            duration,
            all,
        } => {
            if all {
                writeln!(err, "🔑 Minting all available keys")?;
            } else {
                writeln!(err, "🔑 Minting keys: {}", keys.join(", "))?;
            }
            if let Some(duration) = duration {
                writeln!(err, "⏱️ Duration override: {} seconds", duration)?;
            }

            let minted =
                client.mint_keys(&resolved.token, idp_name.as_deref(), &keys, duration, all)?;
            match opts.output {
                OutputFormat::Json => output::write_json(out, &minted)?,
                OutputFormat::Env => {
                    output::write_keys_env(out, err, &minted)?;
                }
            }
        }
    }
    Ok(())
}

pub fn list_idps<C: HttpClient>(client: &VoidkeyClient<C>, out: &mut dyn Write) -> Result<()> {
    let providers = client
        .list_idp_providers()
        .map_err(VoidkeyError::listing("IdP providers"))?;
    output::write_providers(out, &providers)
}

/// Lists the key names the resolved token may mint.
pub fn list_keys<C: HttpClient>(
    client: &VoidkeyClient<C>,
    config: &Config,
    token: Option<&str>,
    idp: Option<&str>,
    format: OutputFormat,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<()> {
    let idp_name = idp
        .filter(|i| !i.is_empty())
        .or(config.idp_name.as_deref());
    let resolved = resolve_token(token, config, idp_name)?;
    if let Some(line) = resolved.diagnostic() {
        writeln!(err, "{}", line)?;
    }

    let keys = client
        .get_available_keys(&resolved.token)
        .map_err(VoidkeyError::listing("available keys"))?;
    match format {
        OutputFormat::Json => output::write_json(out, &keys),
        OutputFormat::Env if keys.is_empty() => {
            writeln!(out, "No keys available")?;
            Ok(())
        }
        OutputFormat::Env => {
            for key in keys {
                writeln!(out, "{}", key)?;
            }
            Ok(())
        }
    }
}

fn require_identity(token: Option<String>, subject: Option<String>) -> Result<Identity> {
    Identity::from_flags(token, subject).ok_or_else(|| {
        VoidkeyError::Usage(
            "either subject or token is required. Use --subject or --token flag".into(),
        )
    })
}

pub fn keysets_list<C: HttpClient>(
    client: &VoidkeyClient<C>,
    token: Option<String>,
    subject: Option<String>,
    format: KeysetFormat,
    out: &mut dyn Write,
) -> Result<()> {
    let identity = require_identity(token, subject)?;
    let Some(keysets) = client.get_available_keysets(&identity)? else {
        match &identity {
            Identity::Token(_) => writeln!(out, "No keysets found for the provided token")?,
            Identity::Subject(s) => writeln!(out, "No keysets found for subject: {}", s)?,
        }
        return Ok(());
    };

    if format == KeysetFormat::Table {
        match &identity {
            Identity::Token(_) => writeln!(out, "Available keysets for the provided token:\n")?,
            Identity::Subject(s) => writeln!(out, "Available keysets for subject '{}':\n", s)?,
        }
    }
    output::write_keysets(out, &keysets, format)
}

pub fn keysets_show<C: HttpClient>(
    client: &VoidkeyClient<C>,
    token: Option<String>,
    subject: Option<String>,
    keyset: &str,
    format: KeysetFormat,
    out: &mut dyn Write,
) -> Result<()> {
    if keyset.is_empty() {
        return Err(VoidkeyError::Usage(
            "keyset is required. Use --keyset flag to specify the keyset name".into(),
        ));
    }
    let identity = require_identity(token, subject)?;
    let Some(keys) = client.get_keyset_keys(&identity, keyset)? else {
        match &identity {
            Identity::Token(_) => {
                writeln!(out, "Keyset '{}' not found for the provided token", keyset)?
            }
            Identity::Subject(s) => {
                writeln!(out, "Keyset '{}' not found for subject: {}", keyset, s)?
            }
        }
        return Ok(());
    };

    if format == KeysetFormat::Table {
        match &identity {
            Identity::Token(_) => writeln!(
                out,
                "Keys in keyset '{}' for the provided token:\n",
                keyset
            )?,
            Identity::Subject(s) => {
                writeln!(out, "Keys in keyset '{}' for subject '{}':\n", keyset, s)?
            }
        }
    }
    output::write_keyset_keys(out, &keys, format)
}

/// Answers collected by the interactive `config init` prompts; empty answers keep defaults.
#[derive(Debug, Clone, Default)]
pub struct InitAnswers {
    pub server: String,
    pub idp: String,
    pub token_env: String,
}

pub fn config_init(path: &Path, answers: InitAnswers, out: &mut dyn Write) -> Result<()> {
    let mut config = Config::default();
    for (key, value) in [
        (ConfigKey::Server, &answers.server),
        (ConfigKey::Idp, &answers.idp),
        (ConfigKey::TokenEnv, &answers.token_env),
    ] {
        if !value.trim().is_empty() {
            config.set(key, value)?;
        }
    }
    config.save_to(path)?;
    writeln!(out, "✅ Configuration saved to {}", path.display())?;
    Ok(())
}

pub fn config_set(path: &Path, key: &str, value: &str, out: &mut dyn Write) -> Result<()> {
    let key: ConfigKey = key.parse()?;
    let mut config = Config::load_from(path)?;
    config.set(key, value)?;
    config.save_to(path)?;
    writeln!(out, "✅ Set {} = {}", key, value.trim())?;
    Ok(())
}

pub fn config_get(path: &Path, key: &str, out: &mut dyn Write) -> Result<()> {
    let key: ConfigKey = key.parse()?;
    let config = Config::load_from(path)?;
    writeln!(out, "{}", config.get(key))?;
    Ok(())
}

pub fn config_list(path: &Path, out: &mut dyn Write) -> Result<()> {
    let config = Config::load_from(path)?;
    writeln!(out, "Configuration file: {}\n", path.display())?;
    for key in ConfigKey::ALL {
        let label = format!("{}:", key);
        writeln!(out, "{:<11}{}", label, config.get(key))?;
    }

    match token::token_from_env(&config) {
        Some(resolved) => writeln!(out, "\n🔑 Current token: Found ({})", resolved.source)?,
        None => writeln!(out, "\n❌ Current token: Not found")?,
    }
    Ok(())
}

/// Build information printed by `version`.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionInfo {
    pub version: &'static str,
    pub commit: &'static str,
    pub date: &'static str,
}

impl VersionInfo {
    /// Version of this crate; commit and date come from `VOIDKEY_COMMIT` and
    /// `VOIDKEY_BUILD_DATE` at build time.
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            commit: option_env!("VOIDKEY_COMMIT").unwrap_or("none"),
            date: option_env!("VOIDKEY_BUILD_DATE").unwrap_or("unknown"),
        }
    }
}

pub fn version(info: &VersionInfo, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "voidkey version {}", info.version)?;
    writeln!(out, "commit: {}", info.commit)?;
    writeln!(out, "built: {}", info.date)?;
    Ok(())
}
