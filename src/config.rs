use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use secrecy::SecretString;

use crate::client::DEFAULT_BASE_URL;

/// ENBUILD command line client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// ENBUILD base URL (the API prefix is appended when missing)
    #[arg(short = 'b', long, env = "ENBUILD_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Username for password authentication
    #[arg(short = 'u', long, env = "ENBUILD_USERNAME")]
    pub username: Option<String>,

    /// Password for password authentication
    #[arg(short = 'p', long, env = "ENBUILD_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Pre-issued API token (takes precedence over username/password)
    #[arg(short = 't', long, env = "ENBUILD_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Log request headers and response bodies
    #[arg(long, env = "ENBUILD_DEBUG")]
    pub debug: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "30")]
    pub http_timeout: u64,

    /// Timeout for discovery and token requests in seconds
    #[arg(long, env = "AUTH_TIMEOUT", default_value = "10")]
    pub auth_timeout: u64,

    /// HTTP max retries on 429/5xx/network errors
    #[arg(long, env = "HTTP_MAX_RETRIES", default_value = "0")]
    pub http_retries: u32,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Authenticate and print the mechanism and a masked token
    Token,

    /// Catalog manifests
    Manifests {
        #[command(subcommand)]
        action: ManifestCommand,
    },

    /// Catalogs with client-side filtering
    Catalogs {
        #[command(subcommand)]
        action: CatalogCommand,
    },

    /// Users
    Users {
        #[command(subcommand)]
        action: UserCommand,
    },

    /// Roles
    Roles {
        #[command(subcommand)]
        action: RoleCommand,
    },

    /// Operations
    Operations {
        #[command(subcommand)]
        action: OperationCommand,
    },

    /// Repositories
    Repositories {
        #[command(subcommand)]
        action: RepositoryCommand,
    },

    /// ML datasets
    Datasets {
        #[command(subcommand)]
        action: DatasetCommand,
    },

    /// Show admin settings
    AdminSettings,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ManifestCommand {
    List {
        /// Version control system (github, gitlab)
        #[arg(long)]
        vcs: Option<String>,
    },
    Get {
        id: String,
        #[arg(long)]
        vcs: Option<String>,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CatalogCommand {
    List {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        vcs: Option<String>,
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        slug: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        version: Option<String>,
    },
    Get {
        id: String,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    List {
        #[arg(long)]
        created_by: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        sort: Option<String>,
    },
    Get {
        id: String,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum RoleCommand {
    List,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum OperationCommand {
    List {
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        sort: Option<String>,
    },
    Get {
        id: String,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryCommand {
    List,
    Get { id: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum DatasetCommand {
    List,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub base_url: String,

    // Authentication
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub api_token: Option<SecretString>,

    // HTTP client
    pub http_request_timeout: u64,
    pub auth_timeout: u64,
    pub http_max_retries: u32,

    // Debug
    pub debug: bool,
    pub log_level: String,
}

impl Config {
    /// Load configuration with priority: CLI > ENV (.env included) > defaults
    pub fn load() -> Result<(Self, Command)> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        Ok(Self::from_args(args))
    }

    /// Split parsed arguments into configuration and the command to run
    pub fn from_args(args: CliArgs) -> (Self, Command) {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let config = Config {
            base_url: args.base_url,
            username: non_empty(args.username),
            password: non_empty(args.password).map(|p| SecretString::new(p.into())),
            api_token: non_empty(args.api_token).map(|t| SecretString::new(t.into())),
            http_request_timeout: args.http_timeout,
            auth_timeout: args.auth_timeout,
            http_max_retries: args.http_retries,
            debug: args.debug,
            log_level: args.log_level,
        };

        (config, args.command)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        reqwest::Url::parse(&self.base_url)
            .with_context(|| format!("ENBUILD_BASE_URL is not a valid URL: {}", self.base_url))?;

        if self.api_token.is_none() {
            match (&self.username, &self.password) {
                (Some(_), Some(_)) => {}
                (Some(_), None) => anyhow::bail!(
                    "ENBUILD_PASSWORD is required when ENBUILD_USERNAME is set (use -p)"
                ),
                _ => anyhow::bail!(
                    "Credentials are required: set ENBUILD_API_TOKEN (-t) or ENBUILD_USERNAME/ENBUILD_PASSWORD (-u/-p)"
                ),
            }
        }

        if self.http_request_timeout == 0 {
            anyhow::bail!("HTTP_REQUEST_TIMEOUT must be greater than 0");
        }
        if self.auth_timeout == 0 {
            anyhow::bail!("AUTH_TIMEOUT must be greater than 0");
        }

        parse_log_level(&self.log_level)?;

        Ok(())
    }

    /// Filter directive for the subscriber; `--debug` raises it to `debug`
    pub fn log_filter(&self) -> String {
        if self.debug {
            "debug".to_string()
        } else {
            self.log_level.trim().to_lowercase()
        }
    }
}

/// Validate a log level name
pub fn parse_log_level(s: &str) -> Result<tracing::Level> {
    s.trim()
        .parse::<tracing::Level>()
        .map_err(|_| anyhow::anyhow!("Invalid LOG_LEVEL '{}' (trace, debug, info, warn, error)", s))
}
