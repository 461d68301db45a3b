//! Rendering of broker responses as shell exports, tables or JSON.
//!
//! Data goes to `out` so that `eval "$(voidkey mint ...)"` works; status and
//! diagnostics go to `err`.

use serde::Serialize;
use std::{collections::BTreeMap, io::Write, str::FromStr};

use crate::{
    error::Result,
    types::{CloudCredentials, IdpProvider, Keysets, MintedKeys},
};

/// Output of `mint` and `list-keys`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Env,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s {
            "env" => Ok(OutputFormat::Env),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("unknown output format '{}' (expected env or json)", s)),
        }
    }
}

/// Output of the `keysets` commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeysetFormat {
    #[default]
    Table,
    Json,
    Env,
}

impl FromStr for KeysetFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s {
            "table" => Ok(KeysetFormat::Table),
            "json" => Ok(KeysetFormat::Json),
            "env" => Ok(KeysetFormat::Env),
            _ => Err(format!(
                "unknown output format '{}' (expected table, json or env)",
                s
            )),
        }
    }
}

/// Pretty prints `value` with 2 space indentation.
pub fn write_json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    writeln!(out, "{}", json)?;
    Ok(())
}

fn write_export(out: &mut dyn Write, name: &str, value: &str) -> Result<()> {
    writeln!(out, "export {}={}", name, value)?;
    Ok(())
}

/// Writes the AWS environment variables for legacy credentials.
/// `AWS_SESSION_TOKEN` is skipped when the broker did not return one.
pub fn write_credentials_env(out: &mut dyn Write, creds: &CloudCredentials) -> Result<()> {
    write_export(out, "AWS_ACCESS_KEY_ID", &creds.access_key)?;
    write_export(out, "AWS_SECRET_ACCESS_KEY", &creds.secret_key)?;
    if !creds.session_token.is_empty() {
        write_export(out, "AWS_SESSION_TOKEN", &creds.session_token)?;
    }
    write_export(out, "AWS_CREDENTIAL_EXPIRATION", &creds.expires_at)
}

/// Counts reported after rendering minted keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeysSummary {
    pub keys: usize,
    pub variables: usize,
}

pub fn write_keys_env(
    out: &mut dyn Write,
    err: &mut dyn Write,
    keys: &MintedKeys,
) -> Result<KeysSummary> {
    let mut variables = 0;
    for (name, response) in keys {
        writeln!(err, "🔑 Key: {} (expires: {})", name, response.expires_at)?;
        for (env_var, value) in &response.credentials {
            write_export(out, env_var, value)?;
            variables += 1;
        }
    }

    writeln!(
        err,
        "✅ Successfully minted {} keys with {} environment variables",
        keys.len(),
        variables
    )?;
    writeln!(
        err,
        "💡 To use: eval \"$(voidkey mint --all)\" or eval \"$(voidkey mint --keys KEY_NAME)\""
    )?;
    Ok(KeysSummary {
        keys: keys.len(),
        variables,
    })
}

/// Writes the provider table, or a notice when there are no providers.
pub fn write_providers(out: &mut dyn Write, providers: &[IdpProvider]) -> Result<()> {
    if providers.is_empty() {
        writeln!(out, "No Identity Providers configured")?;
        return Ok(());
    }

    let mut rows = vec![("NAME", "DEFAULT"), ("----", "-------")];
    rows.extend(
        providers
            .iter()
            .map(|p| (p.name.as_str(), if p.is_default { "✓" } else { "" })),
    );

    let width = rows
        .iter()
        .map(|(name, _)| name.chars().count())
        .max()
        .unwrap_or(0)
        + 2;
    for (name, marker) in rows {
        let pad = width - name.chars().count();
        let line = format!("{}{}{}", name, " ".repeat(pad), marker);
        writeln!(out, "{}", line.trim_end())?;
    }
    Ok(())
}

pub fn write_keysets(out: &mut dyn Write, keysets: &Keysets, format: KeysetFormat) -> Result<()> {
    match format {
        KeysetFormat::Json => write_json(out, keysets),
        KeysetFormat::Env => {
            for (name, keys) in keysets {
                writeln!(out, "# {}", name)?;
                write_keyset_keys(out, keys, KeysetFormat::Env)?;
            }
            Ok(())
        }
        KeysetFormat::Table => {
            for (name, keys) in keysets {
                writeln!(out, "📦 {}:", name)?;
                for (env_var, value) in keys {
                    writeln!(out, "  {}={}", env_var, value)?;
                }
                writeln!(out)?;
            }
            Ok(())
        }
    }
}

pub fn write_keyset_keys(
    out: &mut dyn Write,
    keys: &BTreeMap<String, String>,
    format: KeysetFormat,
) -> Result<()> {
    match format {
        KeysetFormat::Json => write_json(out, keys),
        KeysetFormat::Env => {
            for (env_var, value) in keys {
                write_export(out, env_var, value)?;
            }
            Ok(())
        }
        KeysetFormat::Table => {
            for (env_var, value) in keys {
                writeln!(out, "{}={}", env_var, value)?;
            }
            Ok(())
        }
    }
}
