use crate::ConfigCommands;
use crate::config::CvasConfig;
use anyhow::{Result, bail};
use std::path::Path;
use tracing::info;

pub fn handle_config_command(config: &CvasConfig, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => show_config(config),
        ConfigCommands::Init { path, force } => {
            let path = path.unwrap_or_else(CvasConfig::default_config_path);
            init_config(config, &path, force)?;
            println!("Configuration written to {}", path.display());
            Ok(())
        }
    }
}

fn init_config(config: &CvasConfig, path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists, pass --force to overwrite it", path.display());
    }
    config.save_to_file(path)?;
    info!(path = %path.display(), "Configuration written");
    Ok(())
}

fn show_config(config: &CvasConfig) -> Result<()> {
    println!("CVAS Configuration:");
    println!("  Data Directory: {}", config.data_dir.display());
    println!("  Session Directory: {}", config.session_dir().display());
    println!();

    println!("Authority:");
    println!("  Base URL: {}", config.api.base_url);
    println!("  Request Timeout: {}s", config.api.request_timeout_secs);
    println!();

    println!("Session:");
    println!("  Lifetime: {} days", config.session.ttl_days);
    println!("  Secure Context: {}", config.session.secure_context);

    if let Err(e) = config.session_config().validate() {
        println!();
        println!("Warning: {}", e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = CvasConfig::default();
        config.data_dir = dir.path().join("data");
        config.session.ttl_days = 14;

        init_config(&config, &path, false).unwrap();
        assert_eq!(CvasConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "# hand edited\n").unwrap();
        let config = CvasConfig::default();

        assert!(init_config(&config, &path, false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# hand edited\n");

        init_config(&config, &path, true).unwrap();
        assert_eq!(CvasConfig::load_from_file(&path).unwrap(), config);
    }
}
