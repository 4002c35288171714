// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Section-based loading of `sweep-rs.toml`.
//!
//! One file can carry settings for several programs. Each program reads
//! only its own `[<section>]` table, so serde defaults fill in anything the
//! file leaves out.

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "sweep-rs.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Read(PathBuf, String),

    #[error("failed to parse config file {0}: {1}")]
    Parse(PathBuf, String),

    #[error("config file {0} has no [{1}] section")]
    MissingSection(PathBuf, String),
}

/// Candidate locations, most specific first: the working directory, the
/// user config directory, then `/etc/sweep-rs`.
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("sweep-rs").join(CONFIG_FILE_NAME));
    }
    paths.push(Path::new("/etc/sweep-rs").join(CONFIG_FILE_NAME));
    paths
}

fn parse_section<T: DeserializeOwned>(
    path: &Path,
    content: &str,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    let parse_err = |e: &dyn std::fmt::Display| ConfigError::Parse(path.to_path_buf(), e.to_string());

    let mut table: toml::Table = toml::from_str(content).map_err(|e| parse_err(&e))?;
    let Some(section) = table.remove(key) else {
        return Ok(None);
    };
    section.try_into::<T>().map(Some).map_err(|e| parse_err(&e))
}

fn read_section<T: DeserializeOwned>(path: &Path, key: &str) -> Result<Option<T>, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Read(path.to_path_buf(), e.to_string()))?;
    parse_section(path, &content, key)
}

/// A configuration struct stored as one section of `sweep-rs.toml`.
pub trait ConfigFile: Sized + Default + DeserializeOwned {
    /// Table name, e.g. `"sweep-cli"`.
    fn section_key() -> &'static str;

    /// Load the section from `path`. A file without the section is an error.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        read_section::<Self>(path, Self::section_key())?.ok_or_else(|| {
            ConfigError::MissingSection(path.to_path_buf(), Self::section_key().to_string())
        })
    }

    /// Load the first file on [`config_search_paths`] that carries the
    /// section. Falls back to `Default` with no path when none does.
    fn load_from_default_paths() -> Result<(Self, Option<PathBuf>), ConfigError> {
        Self::load_from_paths(&config_search_paths())
    }

    fn load_from_paths(paths: &[PathBuf]) -> Result<(Self, Option<PathBuf>), ConfigError> {
        for path in paths.iter().filter(|p| p.exists()) {
            if let Some(cfg) = read_section::<Self>(path, Self::section_key())? {
                return Ok((cfg, Some(path.clone())));
            }
        }
        Ok((Self::default(), None))
    }
}
