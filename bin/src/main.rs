use std::{
    io::{self, Write},
    process::exit,
};

use clap::{Args, Parser, Subcommand};
use dialoguer::Input;
use voidkey::{
    commands::{self, InitAnswers, MintOptions, VersionInfo},
    config::{self, DEFAULT_SERVER, DEFAULT_TOKEN_ENV},
    output::{KeysetFormat, OutputFormat},
    Config, ReqwestClient, VoidkeyClient, VoidkeyError,
};

/// Voidkey zero-trust credential broker CLI
///
/// Mints short-lived, scoped cloud credentials using OIDC-based authentication.
#[derive(Debug, Parser)]
#[command(name = "voidkey", version)]
struct Cli {
    /// Voidkey broker server URL (overrides config)
    #[arg(long, global = true, env = "VOIDKEY_SERVER")]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Mint short-lived cloud credentials
    ///
    /// Credentials are printed as environment variables that can be sourced:
    /// eval "$(voidkey mint --keys AWS_CREDENTIALS)"
    Mint(MintArgs),
    /// List available Identity Providers
    ListIdps,
    /// List the keys available to a token
    ListKeys(ListKeysArgs),
    /// Manage keysets for identities
    #[command(subcommand)]
    Keysets(KeysetsCommand),
    /// Manage CLI configuration (~/.voidkey/config.yaml)
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Show version information
    Version,
}

#[derive(Debug, Args)]
struct MintArgs {
    /// OIDC token for authentication
    #[arg(long)]
    token: Option<String>,
    /// IdP provider name to use (uses server default if not specified)
    #[arg(long)]
    idp: Option<String>,
    /// Output format (env|json)
    #[arg(short, long, default_value = "env")]
    output: OutputFormat,
    /// Comma-separated list of key names to mint (e.g. MINIO_CREDENTIALS,AWS_CREDENTIALS)
    #[arg(long, value_delimiter = ',')]
    keys: Vec<String>,
    /// Mint all available keys for the identity
    #[arg(long)]
    all: bool,
    /// Duration in seconds to override default credential lifetime
    #[arg(long)]
    duration: Option<u64>,
    /// Keyset to mint legacy credentials for
    #[arg(long, conflicts_with_all = ["keys", "all"])]
    keyset: Option<String>,
}

#[derive(Debug, Args)]
struct ListKeysArgs {
    /// OIDC token for authentication
    #[arg(long)]
    token: Option<String>,
    /// IdP provider name to use
    #[arg(long)]
    idp: Option<String>,
    /// Output format (env|json)
    #[arg(short, long, default_value = "env")]
    output: OutputFormat,
}

#[derive(Debug, Subcommand)]
enum KeysetsCommand {
    /// List available keysets for a subject
    List {
        /// Subject (identity) to query keysets for
        #[arg(long)]
        subject: Option<String>,
        /// OIDC token to extract subject from and query keysets
        #[arg(long)]
        token: Option<String>,
        /// Output format (table|json|env)
        #[arg(short, long, default_value = "table")]
        output: KeysetFormat,
    },
    /// Show keys for a specific keyset
    Show {
        /// Subject (identity) to query
        #[arg(long)]
        subject: Option<String>,
        /// OIDC token to extract subject from and query
        #[arg(long)]
        token: Option<String>,
        /// Keyset name to show
        #[arg(long)]
        keyset: String,
        /// Output format (table|json|env)
        #[arg(short, long, default_value = "table")]
        output: KeysetFormat,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Initialize configuration with interactive setup
    Init,
    /// Set a configuration value (keys: server, idp, token-env)
    Set { key: String, value: String },
    /// Get a configuration value (keys: server, idp, token-env)
    Get { key: String },
    /// List all configuration values
    List,
}

fn prompt(text: &str, default: &str) -> voidkey::Result<String> {
    let mut input = Input::<String>::new().with_prompt(text).allow_empty(true);
    if !default.is_empty() {
        input = input.default(default.to_string()).show_default(true);
    }
    input
        .interact_text()
        .map_err(|e| VoidkeyError::Io(e.to_string()))
}

fn prompt_init() -> voidkey::Result<InitAnswers> {
    Ok(InitAnswers {
        server: prompt("Voidkey broker server URL", DEFAULT_SERVER)?,
        idp: prompt("Default IdP provider name (optional)", "")?,
        token_env: prompt("Token environment variable name", DEFAULT_TOKEN_ENV)?,
    })
}

fn load_config() -> Config {
    match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::warn!("{}, using defaults", e);
            Config::default()
        }
    }
}

fn broker_client(config: &Config) -> VoidkeyClient<ReqwestClient> {
    let client = VoidkeyClient::new(ReqwestClient::new(), &config.server);
    match &config.mint_keys_path {
        Some(path) => client.with_mint_keys_path(path),
        None => client,
    }
}

fn run(cli: Cli, out: &mut dyn Write, err: &mut dyn Write) -> voidkey::Result<()> {
    let config = load_config().with_server_override(cli.server.as_deref());
    let client = broker_client(&config);
    match cli.command {
        Command::Mint(args) => {
            let opts = MintOptions {
                token: args.token,
                idp: args.idp,
                output: args.output,
                keys: args.keys,
                all: args.all,
                duration: args.duration,
                keyset: args.keyset,
            };
            commands::mint(&client, &config, opts, out, err)
        }
        Command::ListIdps => commands::list_idps(&client, out),
        Command::ListKeys(args) => commands::list_keys(
            &client,
            &config,
            args.token.as_deref(),
            args.idp.as_deref(),
            args.output,
            out,
            err,
        ),
        Command::Keysets(KeysetsCommand::List {
            subject,
            token,
            output,
        }) => commands::keysets_list(&client, token, subject, output, out),
        Command::Keysets(KeysetsCommand::Show {
            subject,
            token,
            keyset,
            output,
        }) => commands::keysets_show(&client, token, subject, &keyset, output, out),
        Command::Config(ConfigCommand::Init) => {
            commands::config_init(&config::config_path()?, prompt_init()?, out)
        }
        Command::Config(ConfigCommand::Set { key, value }) => {
            commands::config_set(&config::config_path()?, &key, &value, out)
        }
        Command::Config(ConfigCommand::Get { key }) => {
            commands::config_get(&config::config_path()?, &key, out)
        }
        Command::Config(ConfigCommand::List) => commands::config_list(&config::config_path()?, out),
        Command::Version => commands::version(&VersionInfo::current(), out),
    }
}

/// Prints a failed command's error and returns the process exit code.
fn exit_code(result: voidkey::Result<()>, err: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            let _ = writeln!(err, "Error: {}", e);
            1
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = run(cli, &mut io::stdout().lock(), &mut io::stderr().lock());
    let code = exit_code(result, &mut io::stderr().lock());
    if code != 0 {
        exit(code);
    }
}
