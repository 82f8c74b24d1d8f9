pub mod diagnostics;

pub use diagnostics::{DiagnosticMessage, Scope};

use std::{error::Error as StdError, path::Path};
use thiserror::Error;

/// Everything that can stop a registry from being built.
///
/// The first seven variants are the validation taxonomy of the registry
/// itself; `InvalidId`, `InvalidValue` and `DuplicateAttribute` come from
/// reading the raw attribute maps, and the remaining ones from the file loader.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing field `{field}`: {context}")]
    MissingField {
        id: u32,
        field: &'static str,
        context: DiagnosticMessage,
    },
    #[error("invalid auth type: {context}")]
    InvalidAuthType {
        id: u32,
        value: String,
        context: DiagnosticMessage,
    },
    #[error("port out of range: {context}")]
    PortOutOfRange {
        id: u32,
        port: i64,
        context: DiagnosticMessage,
    },
    #[error("conflicting transport: {context}")]
    ConflictingTransport { id: u32, context: DiagnosticMessage },
    #[error("incomplete tls material: {context}")]
    IncompleteTlsMaterial { id: u32, context: DiagnosticMessage },
    #[error("duplicate profile id: {context}")]
    DuplicateId { id: u32, context: DiagnosticMessage },
    #[error("empty registry: {context}")]
    EmptyRegistry { context: DiagnosticMessage },
    #[error("invalid profile id: {context}")]
    InvalidId { key: String, context: DiagnosticMessage },
    #[error("invalid value for `{field}`: {context}")]
    InvalidValue {
        id: u32,
        field: &'static str,
        context: DiagnosticMessage,
    },
    #[error("duplicate attribute `{field}`: {context}")]
    DuplicateAttribute {
        id: u32,
        field: &'static str,
        context: DiagnosticMessage,
    },
    #[error("parse error: {context}")]
    ParseError {
        context: DiagnosticMessage,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
    #[error("filesystem error: {context}")]
    PathError {
        context: DiagnosticMessage,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
    #[error("unsupported format: {context}")]
    UnsupportedFormat { context: DiagnosticMessage },
}

impl ConfigError {
    #[track_caller]
    pub fn missing_field(id: u32, field: &'static str) -> Self {
        Self::MissingField {
            id,
            field,
            context: DiagnosticMessage::in_profile(id, format!("`{field}` must be set")),
        }
    }

    #[track_caller]
    pub fn missing_transport(id: u32) -> Self {
        Self::MissingField {
            id,
            field: "host",
            context: DiagnosticMessage::in_profile(
                id,
                "one of `host` or `socket` must be set to a non-empty value",
            ),
        }
    }

    #[track_caller]
    pub fn invalid_auth_type(id: u32, value: impl Into<String>) -> Self {
        let value = value.into();
        let message = format!("'{value}' is not one of cookie, config, signon, http");
        Self::InvalidAuthType {
            id,
            value,
            context: DiagnosticMessage::in_profile(id, message),
        }
    }

    #[track_caller]
    pub fn port_out_of_range(id: u32, port: i64) -> Self {
        Self::PortOutOfRange {
            id,
            port,
            context: DiagnosticMessage::in_profile(id, format!("port {port} is outside 1..=65535")),
        }
    }

    #[track_caller]
    pub fn conflicting_transport(id: u32, host: &str, socket: &str) -> Self {
        let message =
            format!("both host '{host}' and socket '{socket}' are set; keep only one of them");
        Self::ConflictingTransport {
            id,
            context: DiagnosticMessage::in_profile(id, message),
        }
    }

    #[track_caller]
    pub fn incomplete_tls(id: u32, message: impl Into<String>) -> Self {
        Self::IncompleteTlsMaterial {
            id,
            context: DiagnosticMessage::in_profile(id, message.into()),
        }
    }

    #[track_caller]
    pub fn duplicate_id(id: u32) -> Self {
        Self::DuplicateId {
            id,
            context: DiagnosticMessage::in_profile(id, "declared more than once"),
        }
    }

    /// Same id declared in two files of a configuration directory.
    #[track_caller]
    pub fn duplicate_id_in_files(id: u32, first: &Path, second: &Path) -> Self {
        let message = format!("profile {id} is already declared in '{}'", first.display());
        Self::DuplicateId {
            id,
            context: DiagnosticMessage::in_file(second, message),
        }
    }

    #[track_caller]
    pub fn empty_registry() -> Self {
        Self::EmptyRegistry {
            context: crate::diag!("at least one server profile must be declared"),
        }
    }

    #[track_caller]
    pub fn invalid_id(key: impl Into<String>) -> Self {
        let key = key.into();
        let message = format!("'{key}' is not a positive integer id");
        Self::InvalidId {
            context: DiagnosticMessage::in_profile(&key, message),
            key,
        }
    }

    #[track_caller]
    pub fn invalid_value(id: u32, field: &'static str, expected: &str, found: &str) -> Self {
        Self::InvalidValue {
            id,
            field,
            context: DiagnosticMessage::in_profile(
                id,
                format!("expected {expected}, found {found}"),
            ),
        }
    }

    #[track_caller]
    pub fn duplicate_attribute(id: u32, field: &'static str, first: &str, second: &str) -> Self {
        Self::DuplicateAttribute {
            id,
            field,
            context: DiagnosticMessage::in_profile(
                id,
                format!("`{first}` and `{second}` name the same attribute"),
            ),
        }
    }

    #[track_caller]
    pub fn unsupported_format(path: impl AsRef<Path>) -> Self {
        Self::UnsupportedFormat {
            context: DiagnosticMessage::in_file(
                path,
                "expected a .yml, .yaml, .json or .toml extension",
            ),
        }
    }

    /// Attach the file a parse or I/O error came from.
    #[track_caller]
    pub fn in_file(self, path: impl AsRef<Path>) -> Self {
        match self {
            Self::ParseError { context, source } => Self::ParseError {
                context: DiagnosticMessage::in_file(path, context.message().to_string()),
                source,
            },
            Self::PathError { context, source } => Self::PathError {
                context: DiagnosticMessage::in_file(path, context.message().to_string()),
                source,
            },
            other => other,
        }
    }

    /// Profile id the error refers to, when there is one.
    pub fn profile_id(&self) -> Option<u32> {
        match self {
            Self::MissingField { id, .. }
            | Self::InvalidAuthType { id, .. }
            | Self::PortOutOfRange { id, .. }
            | Self::ConflictingTransport { id, .. }
            | Self::IncompleteTlsMaterial { id, .. }
            | Self::DuplicateId { id, .. }
            | Self::InvalidValue { id, .. }
            | Self::DuplicateAttribute { id, .. } => Some(*id),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        let message = err.to_string();
        ConfigError::PathError {
            context: DiagnosticMessage::new(message),
            source: Some(Box::new(err)),
        }
    }
}

impl From<walkdir::Error> for ConfigError {
    #[track_caller]
    fn from(err: walkdir::Error) -> Self {
        let message = err.to_string();
        ConfigError::PathError {
            context: DiagnosticMessage::new(message),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_yaml::Error> for ConfigError {
    #[track_caller]
    fn from(err: serde_yaml::Error) -> Self {
        let message = err.to_string();
        ConfigError::ParseError {
            context: DiagnosticMessage::new(message),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        let message = err.to_string();
        ConfigError::ParseError {
            context: DiagnosticMessage::new(message),
            source: Some(Box::new(err)),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    #[track_caller]
    fn from(err: toml::de::Error) -> Self {
        let message = err.to_string();
        ConfigError::ParseError {
            context: DiagnosticMessage::new(message),
            source: Some(Box::new(err)),
        }
    }
}
