//! `config` command: inspect and edit `config.ini`.

use blockpress::config::{config_file_path, ConfigFile, ConfigKey};
use clap::Subcommand;

use crate::error::CliError;

/// `blockpress config <action>`.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the value of one setting
    Get {
        /// Setting name, with or without the section (e.g. job_size, compression.threads)
        key: String,
    },

    /// Validate and store one setting
    Set {
        /// Setting name, with or without the section
        key: String,

        /// New value ("auto" is accepted for threads)
        value: String,
    },

    /// Print every setting, marking values that differ from the defaults
    List,

    /// Print where config.ini is read from
    Path,

    /// Create config.ini populated with the defaults
    Init {
        /// Replace a config file that already exists
        #[arg(long)]
        force: bool,
    },
}

/// Dispatch a config action.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => {
            let key = parse_key(&key)?;
            println!("{}", key.get(&ConfigFile::load()?));
            Ok(())
        }
        ConfigCommands::Set { key, value } => set_value(&key, &value),
        ConfigCommands::List => list_values(),
        ConfigCommands::Path => {
            println!("{}", config_file_path()?.display());
            Ok(())
        }
        ConfigCommands::Init { force } => write_defaults(force),
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        let known: Vec<String> = ConfigKey::all().iter().map(|k| k.name()).collect();
        CliError::Config(format!(
            "No setting named '{}' (known: {}). See 'blockpress config list'.",
            key,
            known.join(", ")
        ))
    })
}

fn set_value(key: &str, value: &str) -> Result<(), CliError> {
    let key = parse_key(key)?;
    let mut config = ConfigFile::load()?;
    key.set(&mut config, value)?;
    let path = config.save()?;

    println!("{} = {} ({})", key.name(), key.get(&config), path.display());
    Ok(())
}

fn list_values() -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    let defaults = ConfigFile::default();
    let width = ConfigKey::all()
        .iter()
        .map(|k| k.key_name().len())
        .max()
        .unwrap_or(0);

    let mut section = None;
    for key in ConfigKey::all() {
        if section != Some(key.section()) {
            section = Some(key.section());
            println!("[{}]", key.section());
        }
        let value = key.get(&config);
        let marker = if value == key.get(&defaults) { "" } else { "  *" };
        println!("{:<width$} = {}{}", key.key_name(), value, marker, width = width);
    }
    Ok(())
}

fn write_defaults(force: bool) -> Result<(), CliError> {
    let path = config_file_path()?;
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} exists; pass --force to replace it",
            path.display()
        )));
    }

    ConfigFile::default().save_to(&path)?;
    println!("Wrote defaults to {}", path.display());
    Ok(())
}
