use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use log::{error, info};
use messaging_auth::{attachment::ThumbnailSize, Error};
use secrecy::SecretString;
use service::{config::Config, logging::Logger, AppState};

/// Operator tool for the messaging and storage integrations.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Acquire the messaging service token and report its expiry.
    Token,
    /// Produce a signed direct-upload request.
    SignUpload {
        /// Object path inside the bucket, e.g. albums/42/avatar.png
        resource_path: String,
        #[arg(long, default_value = "application/octet-stream")]
        content_type: String,
        /// Payload size in bytes
        #[arg(long)]
        length: u64,
    },
    /// Rewrite a chat attachment URL onto the public attachment host.
    RewriteUrl {
        url: String,
        /// Render a thumbnail: small, medium or large
        #[arg(long)]
        thumbnail: Option<ThumbnailSize>,
    },
    /// Register a messaging account.
    RegisterUser {
        username: String,
        #[arg(long, env = "MESSAGING_USER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Delete a messaging account.
    DeleteUser { username: String },
}

#[tokio::main]
async fn main() {
    // Load .env file first so env-backed flags see it
    dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = Logger::init_logger(&cli.config) {
        eprintln!("Failed to start logger: {e}");
        std::process::exit(1);
    }

    info!("Starting rendezvous_platform [{}]", cli.config.runtime_env());

    if let Err(missing) = cli.config.validate() {
        error!("Missing required configuration: {}", missing.join(", "));
        std::process::exit(1);
    }

    let state = match AppState::new(cli.config) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize integrations: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&state, cli.command).await {
        error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(state: &AppState, command: Command) -> Result<(), Error> {
    match command {
        Command::Token => {
            state.credentials.acquire_token().await?;
            if let Some(credential) = state.credentials.current() {
                println!("token valid until {}", credential.expires_at);
            } else {
                println!("token acquired but already inside its expiry margin");
            }
        }
        Command::SignUpload {
            resource_path,
            content_type,
            length,
        } => {
            let request = state
                .upload_signer
                .sign_upload(&resource_path, &content_type, length)?;
            println!("{} {}", request.method, request.url);
            for (name, value) in request.headers() {
                println!("{name}: {value}");
            }
        }
        Command::RewriteUrl { url, thumbnail } => {
            let rewritten = match thumbnail {
                Some(size) => state.attachments.rewrite_thumbnail(&url, size),
                None => state.attachments.rewrite(&url),
            };
            println!("{rewritten}");
        }
        Command::RegisterUser { username, password } => {
            let entities = state
                .users
                .register_user(&username, &SecretString::new(password))
                .await?;
            for entity in entities {
                println!("{} {}", entity.uuid, entity.username);
            }
        }
        Command::DeleteUser { username } => {
            state.users.delete_user(&username).await?;
            println!("deleted {username}");
        }
    }

    Ok(())
}
