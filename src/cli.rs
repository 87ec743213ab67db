use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Deserialize;
use thiserror::Error;

#[derive(Parser)]
#[command(name = "mtar")]
#[command(about = "Whole file dedup archive container")]
#[command(author, version, long_about = None)]
pub struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an archive from the input path
    Create {
        archive: PathBuf,
        input: PathBuf,
    },

    /// Extract an archive to the output path
    Extract {
        archive: PathBuf,
        output: PathBuf,
    },

    /// List contents of the archive
    List {
        archive: PathBuf,
    },
}

// Configuration
#[derive(Deserialize, Debug)]
pub struct Config {
    pub symlink: bool,
    pub same_fs: bool,

    pub compress: Compress,
}

#[derive(Deserialize, Debug)]
pub struct Compress {
    pub enable: bool,
    pub level: i32,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("unable to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        match path {
            None => Ok(toml::from_str(
                r#"
                symlink = true
                same_fs = true

                [compress]
                    enable = true
                    level = 21
            "#,
            )?),
            Some(path) => Ok(toml::from_str(&std::fs::read_to_string(path)?)?),
        }
    }
}

#[cfg(test)]
mod test_config {
    use super::*;

    #[test]
    fn default_config_parses() {
        let config = Config::load(None).unwrap();

        assert!(config.symlink);
        assert!(config.same_fs);
        assert!(config.compress.enable);
        assert_eq!(config.compress.level, 21);
    }

    #[test]
    fn custom_config_overrides() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            symlink = false
            same_fs = false

            [compress]
                enable = false
                level = 3
        "#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();

        assert!(!config.symlink);
        assert!(!config.compress.enable);
        assert_eq!(config.compress.level, 3);
    }
}
