use clap::Parser;

use tenant_fabric::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match cli::load_and_merge_config(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            eprintln!("{}", Cli::get_validation_help());
            std::process::exit(1);
        }
    };

    let _log_handle = cli::init_logger_from_settings(&settings)?;
    tracing::info!(
        version = tenant_fabric::pkg_version(),
        app = %settings.application.name,
        "tenant-fabric starting"
    );

    cli::execute_command(&cli, settings).await?;
    Ok(())
}
