use clap::{Parser, Subcommand};
use std::path::PathBuf;

use teifactory::factory::transform;
use teifactory::settings::FactorySettings;

#[derive(Parser)]
#[command(name = "teifactory")]
#[command(about = "Fragment factory for TEI digital editions", long_about = None)]
struct Cli {
    /// Path to a settings file (defaults to ./factory.yaml if present)
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform a work into its passage artefacts
    Transform {
        /// The work id (e.g. W0004); the edition is read from
        /// <data_root>/<wid>.xml
        wid: String,
    },

    /// Serve the transformation pipeline as an async task API
    #[cfg(feature = "serve")]
    Serve {
        /// Port to serve on
        #[arg(long)]
        port: Option<u16>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => FactorySettings::load(path)?,
        None => FactorySettings::discover()?,
    };

    match cli.command {
        Commands::Transform { wid } => {
            let outcome = transform(&wid, &settings)?;
            println!(
                "Indexed {} passages (cite depth {})",
                outcome.passages, outcome.cite_depth
            );
            for file in &outcome.files {
                println!("  wrote {}", file.display());
            }
        }

        #[cfg(feature = "serve")]
        Commands::Serve { port } => {
            let mut settings = settings;
            if let Some(port) = port {
                settings.port = port;
            }
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(async { teifactory::serve::serve(settings).await })?;
        }
    }

    Ok(())
}
