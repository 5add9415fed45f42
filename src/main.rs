//! Letterflow CLI
//!
//! Guided offer-letter generation over a resume-token workflow.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use letterflow::{Config, Error, HttpTransport, Result, ResumeClient, Shell, WorkflowSession};

#[derive(Parser)]
#[command(name = "letterflow")]
#[command(author, version, about = "Guided offer-letter generation")]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the wizard
    Run {
        /// Recording to preselect for the upload step
        #[arg(long, short)]
        file: Option<std::path::PathBuf>,

        /// Override the configured start endpoint
        #[arg(long)]
        start_url: Option<String>,
    },

    /// Initialize the .letterflow directory
    Init,

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load config
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { file, start_url } => {
            if let Some(url) = start_url {
                config.workflow.start_url = url;
            }

            let transport = HttpTransport::new()?;
            let client =
                ResumeClient::new(Box::new(transport), config.workflow.start_url.clone());
            let session = WorkflowSession::new(client);
            let mut shell = Shell::new(session, &config);

            let quit = shell.quit_flag();
            ctrlc::set_handler(move || {
                quit.store(true, std::sync::atomic::Ordering::SeqCst);
            })
            .map_err(|e| Error::Config(format!("Failed to set signal handler: {}", e)))?;

            shell.run(file).await?;
        }

        Commands::Init => {
            let path = letterflow::config::init()?;
            println!("Initialized {}", path.display());
        }

        Commands::Config => {
            println!("{:#?}", config);
        }
    }

    Ok(())
}
