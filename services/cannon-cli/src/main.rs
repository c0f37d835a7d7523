use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use cannon_core::{CannonConfig, CannonResult, LoggingConfig};

mod output;
mod run;
mod summarize;

use run::RunArgs;

#[derive(Parser, Debug)]
#[command(name = "credhub-cannon")]
#[command(about = "Ramped load tester for credential-management HTTP APIs", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "CANNON_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sweep concurrency levels and record the generator's CSV reports
    Run(RunArgs),

    /// Summarize a concatenated report per concurrency level
    Summarize {
        /// Report file written by `run`
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = dispatch(cli).await {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}

async fn dispatch(cli: Cli) -> CannonResult<()> {
    let mut config = CannonConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run(args) => {
            args.apply(&mut config);
            config.validate()?;
            init_logging(&config.logging);

            let outcome = run::execute(&config).await?;

            println!("✅ Ramp complete!");
            println!("  Levels run: {}", outcome.levels.len());
            println!("  Report size: {} bytes", outcome.output.len());
            match &outcome.written_to {
                Some(path) => println!("  csv stored locally in file {}", path.display()),
                None => println!("  Report not persisted"),
            }
            Ok(())
        }

        Commands::Summarize { file } => {
            config.validate()?;
            init_logging(&config.logging);

            println!("🔍 Summarizing {}...", file.display());
            let summaries = summarize::summarize_file(&file).await?;
            print!("{}", summarize::render_table(&summaries));
            Ok(())
        }
    }
}

/// Initialize logging on stderr, keeping stdout for status lines.
fn init_logging(config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
