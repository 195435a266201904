use anyhow::Result;
use clap::Parser;

use wirecache::{cli::Cli, logging, run, settings::Settings};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::try_parse().unwrap_or_else(|err| {
        // Argument errors print usage and exit with status 1.
        let _ = err.print();
        std::process::exit(1);
    });
    let settings = Settings::load(&cli)?;
    logging::init_logger(settings.log)?;
    run(settings).await
}
