use crate::auth::hash_password;
use crate::config::{Config, ConfigError};
use crate::db::schema::DEFAULT_ROLE;
use crate::db::{self, NewUser, migrate::run_migrations};
use crate::diagram::{self, DiagramError};
use crate::error::ApiError;
use crate::scaffold::{self, ScaffoldError};
use crate::server::{AppState, app_router};
use clap::{Parser, Subcommand};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use thiserror::Error as ThisError;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};

/// REST API server and developer tooling.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file (default: ./config.toml when present).
    #[arg(long, global = true, env = "APP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Runserver {
        #[arg(long)]
        host: Option<IpAddr>,

        #[arg(long)]
        port: Option<u16>,
    },

    /// Generate an axum handler stub
    CreateEndpoint {
        name: String,

        #[arg(long, default_value = "src/api/v1/endpoints")]
        dir: PathBuf,
    },

    /// Generate a model struct and the migration creating its table
    CreateModel {
        name: String,

        #[arg(long, default_value = "src/models")]
        dir: PathBuf,

        #[arg(long, default_value = "migrations")]
        migrations: PathBuf,
    },

    /// Create an empty migration, then apply pending migrations
    Makemigrations {
        #[arg(short, long, default_value = "new migration")]
        message: String,

        #[arg(long, default_value = "migrations")]
        dir: PathBuf,
    },

    /// Apply pending migrations
    Migrate {
        #[arg(long, default_value = "migrations")]
        dir: PathBuf,
    },

    /// Write a Mermaid ER diagram of the database schema
    GenerateErd {
        /// `.mmd` writes Mermaid source; `.png`, `.svg` or `.pdf` also renders it with mmdc
        #[arg(short, long, default_value = "schema_erd.mmd")]
        output: PathBuf,
    },

    /// Write a PlantUML class diagram of the database schema
    GenerateClassDiagram {
        #[arg(short, long, default_value = "class_diagram.puml")]
        output: PathBuf,

        /// Render with `java -jar plantuml.jar`, downloading the jar when missing
        #[arg(long)]
        render: bool,

        #[arg(long, default_value = "plantuml.jar")]
        jar: PathBuf,
    },

    /// Render an existing Mermaid file with mmdc
    GenerateMermaidDiagram {
        #[arg(short, long, default_value = "diagram.mmd")]
        input: PathBuf,

        #[arg(short, long, default_value = "diagram.png")]
        output: PathBuf,
    },

    /// Create an account
    CreateUser {
        email: String,

        password: String,

        /// Extra roles besides `user` (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,
    },
}

#[derive(Debug, ThisError)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Scaffold(#[from] ScaffoldError),

    #[error(transparent)]
    Diagram(#[from] DiagramError),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Commands {
    pub async fn run(self, mut cfg: Config) -> Result<(), CliError> {
        match self {
            Commands::Runserver { host, port } => {
                if let Some(host) = host {
                    cfg.basic.listen_addr = host;
                }
                if let Some(port) = port {
                    cfg.basic.listen_port = port;
                }
                runserver(cfg).await
            }
            Commands::CreateEndpoint { name, dir } => {
                let path = scaffold::create_endpoint(&name, &dir)?;
                println!("Endpoint {name} created at {}.", path.display());
                Ok(())
            }
            Commands::CreateModel {
                name,
                dir,
                migrations,
            } => {
                let (model, migration) = scaffold::create_model(&name, &dir, &migrations)?;
                println!(
                    "Model {name} created at {} with migration {}.",
                    model.display(),
                    migration.display()
                );
                Ok(())
            }
            Commands::Makemigrations { message, dir } => {
                let path = scaffold::create_migration(&message, &dir)?;
                println!("Created {}.", path.display());
                migrate(&cfg, &dir).await
            }
            Commands::Migrate { dir } => migrate(&cfg, &dir).await,
            Commands::GenerateErd { output } => generate_erd(&cfg, &output).await,
            Commands::GenerateClassDiagram {
                output,
                render,
                jar,
            } => {
                let pool = db::connect(&cfg.basic.database_url).await?;
                db::apply_schema(&pool).await?;
                let tables = diagram::introspect(&pool).await?;
                tokio::fs::write(&output, diagram::plantuml_classes(&tables)).await?;
                println!("Class diagram source written to {}.", output.display());

                if render {
                    diagram::render_plantuml(&reqwest::Client::new(), &output, &jar).await?;
                    println!("Class diagram rendered next to {}.", output.display());
                }
                Ok(())
            }
            Commands::GenerateMermaidDiagram { input, output } => {
                diagram::render_mermaid(&input, &output).await?;
                println!("Diagram generated as {}.", output.display());
                Ok(())
            }
            Commands::CreateUser {
                email,
                password,
                roles,
            } => create_user(&cfg, &email, &password, roles).await,
        }
    }
}

async fn runserver(cfg: Config) -> Result<(), CliError> {
    let rate_limit = if cfg.rate_limit.enabled {
        cfg.rate_limit.limit.as_str()
    } else {
        "off"
    };
    info!(
        app = %cfg.basic.app_name,
        environment = cfg.basic.environment.as_str(),
        database_url = %cfg.basic.database_url,
        loglevel = %cfg.basic.loglevel,
        rate_limit = %rate_limit
    );
    if cfg.basic.cookie_secret.is_none() {
        warn!("basic.cookie_secret not set; sessions will not survive a restart");
    }

    let addr = SocketAddr::from((cfg.basic.listen_addr, cfg.basic.listen_port));
    let state = AppState::from_config(cfg).await?;
    let app = app_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    info!("Server has shut down gracefully.");
    Ok(())
}

async fn migrate(cfg: &Config, dir: &Path) -> Result<(), CliError> {
    let pool = db::connect(&cfg.basic.database_url).await?;
    db::apply_schema(&pool).await?;
    let count = run_migrations(&pool, dir).await?;
    println!("Migrations applied ({count} known).");
    Ok(())
}

async fn generate_erd(cfg: &Config, output: &Path) -> Result<(), CliError> {
    let pool = db::connect(&cfg.basic.database_url).await?;
    db::apply_schema(&pool).await?;
    let tables = diagram::introspect(&pool).await?;
    let source = diagram::mermaid_erd(&tables);

    if !diagram::is_image_output(output) {
        tokio::fs::write(output, source).await?;
        println!("ERD written to {}.", output.display());
        return Ok(());
    }

    let source_path = output.with_extension("mmd");
    tokio::fs::write(&source_path, source).await?;
    match diagram::render_mermaid(&source_path, output).await {
        Ok(()) => println!("ERD generated as {}.", output.display()),
        Err(DiagramError::ToolMissing(tool)) => {
            warn!("{tool} not found; install @mermaid-js/mermaid-cli to render images");
            println!("ERD source written to {}.", source_path.display());
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn create_user(
    cfg: &Config,
    email: &str,
    password: &str,
    extra_roles: Vec<String>,
) -> Result<(), CliError> {
    let email = email.trim().to_ascii_lowercase();
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::BadRequest("email and password are required".to_string()).into());
    }

    let mut roles = vec![DEFAULT_ROLE.to_string()];
    for role in extra_roles {
        if !roles.contains(&role) {
            roles.push(role);
        }
    }

    let handle = db::spawn(&cfg.basic.database_url).await?;
    let record = handle
        .create_user(NewUser {
            email,
            hashed_password: Some(hash_password(password)?),
            roles,
        })
        .await?;
    println!(
        "User {} created with id {} and roles [{}].",
        record.user.email,
        record.user.id,
        record.roles.join(", ")
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_subcommands_with_defaults() {
        let cli = Cli::parse_from(["keystone", "runserver", "--port", "9000"]);
        assert!(matches!(
            cli.command,
            Commands::Runserver {
                host: None,
                port: Some(9000)
            }
        ));

        let cli = Cli::parse_from(["keystone", "create-endpoint", "orders"]);
        match cli.command {
            Commands::CreateEndpoint { name, dir } => {
                assert_eq!(name, "orders");
                assert_eq!(dir, PathBuf::from("src/api/v1/endpoints"));
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::parse_from([
            "keystone",
            "create-user",
            "a@example.com",
            "pw",
            "--role",
            "admin",
            "--config",
            "alt.toml",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
        match cli.command {
            Commands::CreateUser { roles, .. } => assert_eq!(roles, vec!["admin".to_string()]),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
