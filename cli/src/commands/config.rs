use color_eyre::eyre::Result;

use crate::config::{config_path, UserConfig};

pub fn run(path: bool, reset: bool, edit: bool) -> Result<()> {
    let config_file = config_path();

    if path {
        println!("{}", config_file.display());
        return Ok(());
    }

    if reset {
        UserConfig::default().save()?;
        println!("Config reset to defaults at: {}", config_file.display());
        return Ok(());
    }

    if edit {
        if !config_file.exists() {
            UserConfig::default().save()?;
        }

        let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
        std::process::Command::new(editor)
            .arg(&config_file)
            .status()?;

        let content = std::fs::read_to_string(&config_file)?;
        if let Err(e) = toml::from_str::<UserConfig>(&content) {
            eprintln!("Warning: config is invalid and will be ignored:\n{}", e);
        }
        println!("Restart the monitor to apply changes.");
        return Ok(());
    }

    let config = UserConfig::load();
    println!("Config file: {}", config_file.display());
    println!();
    println!("{}", toml::to_string_pretty(&config)?);

    Ok(())
}
