//! Command handlers -- one module per subcommand

pub mod detect;
pub mod projects;
pub mod run;

use snykstep_core::config::ExtensionConfig;

use crate::cli::{Cli, Commands};
use crate::error::CliError;

/// Builds the effective configuration: defaults, then environment, then
/// command line flags, then validation.
pub fn load_config(cli: &Cli) -> Result<ExtensionConfig, CliError> {
    let mut config = ExtensionConfig::default();
    config.apply_env_overrides();

    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    match &cli.command {
        Commands::Run(args) => run::apply_overrides(&mut config, args),
        Commands::Projects(args) => {
            if let Some(path) = &args.credentials_path {
                config.snyk_api_token_path = path.clone();
            }
        }
        Commands::Detect(_) => {}
    }

    config.validate()?;
    Ok(config)
}
