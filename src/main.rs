//! IAP request
use clap::{Parser, Subcommand};
use iap_request::config::{self, Overrides, DEFAULT_CONFIG_FILE};
use iap_request::{flow, Error};
use log::{debug, error, info};

/// Call an Identity-Aware Proxy protected application as a service account.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long)]
    config: Option<String>,

    /// Service account JSON key file.
    #[arg(long)]
    key_file: Option<String>,

    /// Host name of the IAP-protected application.
    #[arg(long)]
    hostname: Option<String>,

    /// OAuth client ID of the IAP resource.
    #[arg(long)]
    client_id: Option<String>,

    /// Full URL to request, instead of https://<hostname>/.
    #[arg(long)]
    url: Option<String>,

    /// OAuth token endpoint.
    #[arg(long)]
    token_uri: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch an identity token, request the protected URL, and print the response body.
    Call,
    /// Fetch an identity token and print it to standard output.
    Token,
    /// Fetch an identity token and print its claims, without verifying the signature.
    Claims,
}

/// Read configuration file from disk and merge it with the
/// `default.toml` built-in config.
///
/// If a configuration file name is not set explicitly, this function will
/// detect whether a config file with the default file name exists in the
/// working directory. If it does, it is used implicitly.
fn read_config(args: &Cli) -> Result<config::File, Error> {
    let config_file = match &args.config {
        None => {
            if std::fs::metadata(DEFAULT_CONFIG_FILE)
                .map(|metadata| metadata.is_file())
                .unwrap_or(false)
            {
                Some(DEFAULT_CONFIG_FILE.to_string())
            } else {
                None
            }
        }
        Some(c) => Some(c.clone()),
    };

    Ok(if let Some(config_file) = config_file {
        debug!("Reading configuration from {config_file}");
        config::File::default_with_user_config_file(&config_file)?
    } else {
        config::File::default()
    })
}

#[tokio::main]
async fn main() {
    match run().await {
        Ok(_) => std::process::exit(0),
        Err(err) => {
            error!("fatal: {}", err);
            std::process::exit(1)
        }
    }
}

async fn run() -> Result<(), Error> {
    env_logger::init();

    let args = Cli::parse();
    let cfg_file = read_config(&args)?;

    let cfg = config::Config::new(
        &cfg_file,
        Overrides {
            key_file: args.key_file,
            hostname: args.hostname,
            client_id: args.client_id,
            url: args.url,
            token_uri: args.token_uri,
        },
    )?;

    info!("Target {} with audience {}", cfg.url, cfg.client_id);

    match args.command {
        Commands::Call => {
            let body = flow::make_iap_request(&cfg).await?;
            println!("{body}");
        }
        Commands::Token => {
            let id_token = flow::fetch_token(&cfg, &reqwest::Client::new()).await?;
            println!("{}", id_token.as_str());
        }
        Commands::Claims => {
            let id_token = flow::fetch_token(&cfg, &reqwest::Client::new()).await?;
            println!("{}", id_token.claims_json()?);
        }
    }
    Ok(())
}
