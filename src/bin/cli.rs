use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use windef::config::Config;
use windef::error::{Result, WindefError};
use windef::output::{self, ConsoleFormat, SinkOptions, StoreOptions, WebhookOptions};
use windef::result::{PLUGIN_CATEGORY, PLUGIN_NAME};

#[derive(Parser)]
#[command(
    name = "windef",
    about = "Malice Windows Defender AntiVirus Plugin",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// File to scan
    file: Option<PathBuf>,

    /// Verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Output as Markdown table
    #[arg(long, short = 't')]
    table: bool,

    /// POST results to Malice webhook
    #[arg(long, short = 'c')]
    callback: bool,

    /// Malice webhook endpoint
    #[arg(long, env = "MALICE_ENDPOINT")]
    endpoint: Option<String>,

    /// Route the webhook through a proxy
    #[arg(long, short = 'x')]
    proxy: bool,

    /// Proxy URL for the webhook
    #[arg(long, env = "MALICE_PROXY")]
    proxy_url: Option<String>,

    /// Elasticsearch address for Malice to store results
    #[arg(long, env = "MALICE_ELASTICSEARCH")]
    elasticsearch: Option<String>,

    /// Plugin timeout (in seconds)
    #[arg(long, env = "MALICE_TIMEOUT", default_value_t = 60)]
    timeout: u64,

    /// Scan ID (defaults to the file's SHA-256)
    #[arg(long, env = "MALICE_SCANID")]
    scan_id: Option<String>,

    /// Config file path
    #[arg(long, env = "WINDEF_CONFIG", default_value = "windef.toml", global = true)]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a Windows Defender scan web service
    Web,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Some(Commands::Web) => cmd_web(&cli).await,
        None => cmd_scan(&cli).await,
    };

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            tracing::error!(
                plugin = PLUGIN_NAME,
                category = PLUGIN_CATEGORY,
                path = %cli.file.as_deref().map(|p| p.display().to_string()).unwrap_or_default(),
                error = %e,
                "fatal"
            );
            process::exit(e.exit_code());
        }
    }
}

/// Logs go to stderr so stdout only carries results.
fn init_tracing(verbose: bool) {
    let default = if verbose { "windef=debug" } else { "windef=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn cmd_scan(cli: &Cli) -> Result<i32> {
    let file = cli.file.as_deref().ok_or_else(|| {
        WindefError::Config("Please supply a file to scan with malice/windef".into())
    })?;
    if cli.timeout == 0 {
        return Err(WindefError::Config("timeout must be greater than zero".into()));
    }

    let config = Config::load(&cli.config)?;
    let options = sink_options(cli, &config)?;
    let target = windef::resolve_target(file)?;

    let result = windef::scan_file(&target, &config, Duration::from_secs(cli.timeout)).await?;

    let failures = output::publish(&mut std::io::stdout(), &result, &target, &options).await;
    Ok(if failures.is_empty() { 0 } else { 1 })
}

fn sink_options(cli: &Cli, config: &Config) -> Result<SinkOptions> {
    let webhook = if cli.callback {
        let endpoint = non_empty(&cli.endpoint).ok_or_else(|| {
            WindefError::Config("--callback requires --endpoint or MALICE_ENDPOINT".into())
        })?;
        let proxy = if cli.proxy {
            Some(non_empty(&cli.proxy_url).ok_or_else(|| {
                WindefError::Config("--proxy requires --proxy-url or MALICE_PROXY".into())
            })?)
        } else {
            None
        };
        Some(WebhookOptions {
            endpoint,
            proxy,
            timeout: config.webhook.timeout(),
        })
    } else {
        None
    };

    Ok(SinkOptions {
        console: if cli.table {
            ConsoleFormat::Table
        } else {
            ConsoleFormat::Json
        },
        store: non_empty(&cli.elasticsearch).map(|address| StoreOptions {
            address,
            index: config.store.index.clone(),
        }),
        webhook,
        scan_id: cli.scan_id.clone(),
    })
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

async fn cmd_web(cli: &Cli) -> Result<i32> {
    let config = Config::load(&cli.config)?;
    windef::web::serve(&config).await?;
    Ok(0)
}
