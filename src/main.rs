//! Command-line entry point for the NebulaX catalog.

use nebulax::{app_dirs, cli, config, logging};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = cli::parse_args(std::env::args().skip(1).collect())?;
    if let Some(home) = &options.home {
        app_dirs::set_config_base_override(home.clone());
    }
    if let Err(err) = logging::init(options.verbose) {
        eprintln!("Logging disabled: {err}");
    }

    let settings = match &options.config {
        Some(path) => config::load_settings_from(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())?;

    let output = cli::execute(&options.command, &settings)?;
    let text = serde_json::to_string_pretty(&output).map_err(|err| err.to_string())?;
    println!("{text}");
    Ok(())
}
