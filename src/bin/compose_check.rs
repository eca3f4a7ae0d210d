use anyhow::Result;
use ebd::application::init_logging;
use ebd::deploy::ComposeFile;
use ebd_server::bin_common::{load_config_from_env, parse_args, ConfigType};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

fn main() -> Result<ExitCode> {
    init_logging();

    // Compose itself reads .env from the project directory
    dotenv::dotenv().ok();

    let path: PathBuf = match parse_args().first() {
        Some(path) => path.into(),
        None => load_config_from_env(ConfigType::Compose),
    };

    info!("Checking {}", path.display());
    let compose = ComposeFile::load(&path)?;

    let issues = compose.validate();
    for issue in &issues {
        error!("{}", issue);
    }

    if let Ok(order) = compose.start_order() {
        info!("Start order: {}", order.join(" -> "));
    }

    let required = compose.required_variables();
    if !required.is_empty() {
        let names: Vec<&str> = required.iter().map(String::as_str).collect();
        info!("Variables from the shell: {}", names.join(", "));
    }

    let missing = compose.missing_variables(|name| std::env::var(name).ok());
    for name in &missing {
        warn!("Variable {} is not set", name);
    }

    if issues.is_empty() && missing.is_empty() {
        info!("{} services OK", compose.services.len());
        Ok(ExitCode::SUCCESS)
    } else {
        error!(
            "{} issue(s), {} missing variable(s)",
            issues.len(),
            missing.len()
        );
        Ok(ExitCode::FAILURE)
    }
}
