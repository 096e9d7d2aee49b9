use anyhow::Context;
use chrono::Local;
use clap::Parser;
use layered_config::{
    cli::Cli,
    config::{to_yaml, ConfigLoader},
    infrastructure::RunDir,
    shared::logging::{LoggingOptions, LoggingUtils},
    LoadAndValidateUseCase,
};
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    if cli.cfg {
        if let Err(e) = print_config(&cli) {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
        return;
    }

    // Create the run directory before logging so the log file can live in it
    let run_dir = match cli.run_dir_path(Local::now()).map(RunDir::create).transpose() {
        Ok(run_dir) => run_dir,
        Err(e) => {
            eprintln!("Failed to create run directory: {}", e);
            std::process::exit(1);
        }
    };

    let logging = LoggingOptions {
        level: cli.log_level().to_string(),
        log_file: run_dir.as_ref().map(|dir| dir.log_file(&cli.config_name)),
    };
    if let Err(e) = LoggingUtils::initialize(&logging) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Some(dir) = &run_dir {
        info!("Run directory: {}", dir.path().display());
    }

    let use_case = LoadAndValidateUseCase::new(ConfigLoader::new(cli.loader_options()), run_dir);
    if let Err(e) = use_case.execute() {
        error!("{}", e);
        std::process::exit(e.exit_code());
    }
}

fn print_config(cli: &Cli) -> anyhow::Result<()> {
    let options = cli.loader_options();
    let loaded = ConfigLoader::new(options)
        .load()
        .with_context(|| format!("Failed to load config '{}' from {}", cli.config_name, cli.config_dir.display()))?;
    print!("{}", to_yaml(&loaded.tree).context("Failed to render config")?);
    Ok(())
}
