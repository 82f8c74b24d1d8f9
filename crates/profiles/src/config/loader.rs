use crate::config::components::profile::is_known_attribute;
use crate::config::components::source::ProfileSource;
use crate::config::registry::{LoadOptions, Registry};
use crate::error::ConfigError;
use log::{debug, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Encodings a server list can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
    Toml,
}

impl Format {
    /// Picks the format from a file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yml" | "yaml" => Some(Format::Yaml),
            "json" => Some(Format::Json),
            "toml" => Some(Format::Toml),
            _ => None,
        }
    }
}

/// Parses a server list from text.
pub fn parse_source(text: &str, format: Format) -> Result<ProfileSource, ConfigError> {
    let source = match format {
        Format::Yaml => serde_yaml::from_str(text)?,
        Format::Json => serde_json::from_str(text)?,
        Format::Toml => toml::from_str(text)?,
    };
    Ok(source)
}

/// Reads one file and builds the registry from it.
///
/// Relative TLS paths are resolved against the directory holding the file.
pub fn load_file(path: impl AsRef<Path>) -> Result<Registry, ConfigError> {
    let path = path.as_ref();
    let source = read_source(path)?;
    let options = LoadOptions {
        base_dir: Some(config_root(path)),
        ..LoadOptions::default()
    };
    Registry::load_with(source, &options)
}

/// Merges every supported file directly inside `dir` into one registry.
///
/// Files are read in name order. An id declared in two files fails with
/// `DuplicateId` naming both files; relative TLS paths resolve against `dir`.
pub fn load_dir(dir: impl AsRef<Path>) -> Result<Registry, ConfigError> {
    let dir = dir.as_ref();
    let mut merged = ProfileSource::new();
    let mut declared_in: HashMap<u32, PathBuf> = HashMap::new();
    for path in config_files(dir)? {
        for (key, attributes) in read_source(&path)? {
            // malformed keys and in-file repeats are left to the registry
            if let Ok(id) = key.to_id() {
                match declared_in.get(&id) {
                    Some(first) if first != &path => {
                        return Err(ConfigError::duplicate_id_in_files(id, first, &path));
                    }
                    Some(_) => {}
                    None => {
                        declared_in.insert(id, path.clone());
                    }
                }
            }
            merged.push(key, attributes);
        }
    }
    let options = LoadOptions::default().with_base_dir(dir);
    Registry::load_with(merged, &options)
}

fn read_source(path: &Path) -> Result<ProfileSource, ConfigError> {
    let format = Format::from_path(path).ok_or_else(|| ConfigError::unsupported_format(path))?;
    debug!("loading server profiles from {}", path.display());

    let text = fs::read_to_string(path).map_err(|err| ConfigError::from(err).in_file(path))?;
    let source = parse_source(&text, format).map_err(|err| err.in_file(path))?;

    for (key, attributes) in source.entries() {
        for (name, _) in attributes.iter() {
            if !is_known_attribute(name) {
                warn!(
                    "ignoring attribute `{}` of profile {} in {}",
                    name,
                    key,
                    path.display()
                );
            }
        }
    }
    Ok(source)
}

fn config_files(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden || !entry.file_type().is_file() {
            continue;
        }
        if Format::from_path(entry.path()).is_some() {
            files.push(entry.into_path());
        } else {
            debug!("skipping {}", entry.path().display());
        }
    }
    Ok(files)
}

fn config_root(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
