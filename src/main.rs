use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use serde::Serialize;
use std::time::Duration;

use enbuild::auth::Mechanism;
use enbuild::client::{ClientBuilder, EnbuildClient};
use enbuild::config::{
    CatalogCommand, Command, Config, DatasetCommand, ManifestCommand, OperationCommand,
    RepositoryCommand, RoleCommand, UserCommand,
};
use enbuild::models::{
    CatalogListOptions, ManifestListOptions, OperationListOptions, PageOptions, UserListOptions,
    VcsType,
};
use enbuild::utils::mask_token;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let (config, command) = Config::load()?;
    config.validate()?;

    // Initialize logging; RUST_LOG wins over --debug and LOG_LEVEL
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::debug!(base_url = %config.base_url, debug = config.debug, "Configuration loaded");

    let client = ClientBuilder::from_config(&config)
        .build()
        .await
        .context("Failed to initialize ENBUILD client")?;

    run(&client, &config, command).await
}

async fn run(client: &EnbuildClient, config: &Config, command: Command) -> Result<()> {
    match command {
        Command::Token => {
            let summary = token_summary(client, config).await?;
            print_json(&summary)
        }

        Command::Manifests { action } => match action {
            ManifestCommand::List { vcs } => {
                let opts = ManifestListOptions {
                    vcs: parse_vcs(vcs.as_deref())?,
                };
                print_json(&client.manifests().list(&opts).await?)
            }
            ManifestCommand::Get { id, vcs } => {
                let opts = ManifestListOptions {
                    vcs: parse_vcs(vcs.as_deref())?,
                };
                print_json(&client.manifests().get(&id, &opts).await?)
            }
        },

        Command::Catalogs { action } => match action {
            CatalogCommand::List {
                id,
                vcs,
                kind,
                slug,
                name,
                description,
                version,
            } => {
                let opts = CatalogListOptions {
                    id,
                    vcs: parse_vcs(vcs.as_deref())?,
                    kind,
                    slug,
                    name,
                    description,
                    version,
                };
                print_json(&client.catalogs().list(&opts).await?)
            }
            CatalogCommand::Get { id } => print_json(&client.catalogs().get(&id).await?),
        },

        Command::Users { action } => match action {
            UserCommand::List {
                created_by,
                limit,
                page,
                sort,
            } => {
                let opts = UserListOptions {
                    created_by,
                    page: PageOptions { limit, page, sort },
                };
                print_json(&client.users().list(&opts).await?)
            }
            UserCommand::Get { id } => print_json(&client.users().get(&id).await?),
        },

        Command::Roles { action } => match action {
            RoleCommand::List => print_json(&client.roles().list().await?),
        },

        Command::Operations { action } => match action {
            OperationCommand::List { limit, page, sort } => {
                let opts = OperationListOptions {
                    page: PageOptions { limit, page, sort },
                };
                print_json(&client.operations().list(&opts).await?)
            }
            OperationCommand::Get { id } => print_json(&client.operations().get(&id).await?),
        },

        Command::Repositories { action } => match action {
            RepositoryCommand::List => print_json(&client.repository().list().await?),
            RepositoryCommand::Get { id } => print_json(&client.repository().get(&id).await?),
        },

        Command::Datasets { action } => match action {
            DatasetCommand::List => print_json(&client.ml_dataset().list().await?),
        },

        Command::AdminSettings => print_json(&client.admin_settings().get().await?),
    }
}

#[derive(Serialize)]
struct TokenSummary {
    mechanism: String,
    token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<String>,
}

/// Acquire a token and describe it without revealing it
async fn token_summary(client: &EnbuildClient, config: &Config) -> Result<TokenSummary> {
    let Some(manager) = client.auth_manager() else {
        let token = config
            .api_token
            .as_ref()
            .map(|t| mask_token(t.expose_secret()))
            .unwrap_or_default();
        return Ok(TokenSummary {
            mechanism: "api-token".to_string(),
            token,
            expires_at: None,
        });
    };

    let token = manager
        .get_token_within(Duration::from_secs(config.auth_timeout))
        .await
        .context("Failed to acquire token")?;

    let mechanism = manager
        .mechanism()
        .map(Mechanism::name)
        .unwrap_or("unknown")
        .to_string();

    Ok(TokenSummary {
        mechanism,
        token: mask_token(&token),
        expires_at: manager.token_expires_at().await.map(|t| t.to_rfc3339()),
    })
}

fn parse_vcs(vcs: Option<&str>) -> Result<Option<VcsType>> {
    vcs.map(|v| v.parse::<VcsType>().map_err(anyhow::Error::msg))
        .transpose()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", out);
    Ok(())
}
