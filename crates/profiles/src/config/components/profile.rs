use crate::config::components::source::{AttrValue, Attributes};
use crate::config::registry::LoadOptions;
use crate::error::ConfigError;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ---------------- Server profile ----------------

/// How the administration host obtains credentials for a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    Cookie,
    Config,
    Signon,
    Http,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::Cookie => "cookie",
            AuthType::Config => "config",
            AuthType::Signon => "signon",
            AuthType::Http => "http",
        }
    }
}

impl FromStr for AuthType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cookie" => Ok(AuthType::Cookie),
            "config" => Ok(AuthType::Config),
            "signon" => Ok(AuthType::Signon),
            "http" => Ok(AuthType::Http),
            _ => Err(value.to_string()),
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network host and port, or a local Unix-domain socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Transport {
    Tcp { host: String, port: Option<u16> },
    Socket { path: PathBuf },
}

/// TLS settings of a profile; only present when `ssl` is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TlsSettings {
    pub verify: bool,
    pub key: Option<PathBuf>,
    pub cert: Option<PathBuf>,
    pub ca: Option<PathBuf>,
}

impl TlsSettings {
    /// True when a client certificate and its key are configured.
    pub fn has_client_certificate(&self) -> bool {
        self.key.is_some() && self.cert.is_some()
    }
}

/// One validated server entry of a [`Registry`](crate::config::registry::Registry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionProfile {
    id: u32,
    auth_type: AuthType,
    transport: Transport,
    tls: Option<TlsSettings>,
    label: Option<String>,
    #[serde(skip)]
    default_port: u16,
}

impl ConnectionProfile {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn auth_type(&self) -> AuthType {
        self.auth_type
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn host(&self) -> Option<&str> {
        match &self.transport {
            Transport::Tcp { host, .. } => Some(host),
            Transport::Socket { .. } => None,
        }
    }

    pub fn socket(&self) -> Option<&Path> {
        match &self.transport {
            Transport::Socket { path } => Some(path),
            Transport::Tcp { .. } => None,
        }
    }

    /// Port to dial: the configured one, or the engine default. `None` for sockets.
    pub fn effective_port(&self) -> Option<u16> {
        match &self.transport {
            Transport::Tcp { port, .. } => Some(port.unwrap_or(self.default_port)),
            Transport::Socket { .. } => None,
        }
    }

    pub fn tls(&self) -> Option<&TlsSettings> {
        self.tls.as_ref()
    }

    pub fn uses_tls(&self) -> bool {
        self.tls.is_some()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Label if there is one, the transport endpoint otherwise.
    pub fn display_name(&self) -> String {
        match (&self.label, &self.transport) {
            (Some(label), _) => label.clone(),
            (None, Transport::Tcp { host, .. }) => host.clone(),
            (None, Transport::Socket { path }) => path.display().to_string(),
        }
    }

    /// Reads and validates one attribute map.
    pub(crate) fn from_attributes(
        id: u32,
        attributes: &Attributes,
        options: &LoadOptions,
    ) -> Result<Self, ConfigError> {
        let reader = AttributeReader { id, attributes };

        // required fields
        let auth_type = reader
            .string(AUTH_TYPE)?
            .ok_or_else(|| ConfigError::missing_field(id, AUTH_TYPE.name))?;
        let host = reader.string(HOST)?;
        let socket = reader.string(SOCKET)?;
        if host.is_none() && socket.is_none() {
            return Err(ConfigError::missing_transport(id));
        }

        let auth_type = auth_type
            .parse::<AuthType>()
            .map_err(|value| ConfigError::invalid_auth_type(id, value))?;

        let port = reader.port()?;

        let transport = match (host, socket) {
            (Some(host), Some(socket)) => {
                return Err(ConfigError::conflicting_transport(id, &host, &socket))
            }
            (Some(host), None) => Transport::Tcp { host, port },
            (None, Some(socket)) => Transport::Socket {
                path: PathBuf::from(socket),
            },
            (None, None) => return Err(ConfigError::missing_transport(id)),
        };

        let tls = reader.tls(options.base_dir.as_deref())?;
        let label = reader.string(LABEL)?;

        Ok(Self {
            id,
            auth_type,
            transport,
            tls,
            label,
            default_port: options.default_port,
        })
    }
}

// ---------------- Attribute names ----------------

/// Canonical attribute name plus the spellings accepted for it.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
}

impl Field {
    fn matches(&self, key: &str) -> bool {
        self.name == key || self.aliases.contains(&key)
    }
}

pub const AUTH_TYPE: Field = Field {
    name: "auth_type",
    aliases: &["authType"],
};
pub const HOST: Field = Field {
    name: "host",
    aliases: &[],
};
pub const SOCKET: Field = Field {
    name: "socket",
    aliases: &[],
};
pub const PORT: Field = Field {
    name: "port",
    aliases: &[],
};
pub const SSL: Field = Field {
    name: "ssl",
    aliases: &[],
};
pub const SSL_VERIFY: Field = Field {
    name: "ssl_verify",
    aliases: &["sslVerify"],
};
pub const SSL_KEY: Field = Field {
    name: "ssl_key",
    aliases: &["sslKeyPath", "ssl_key_path"],
};
pub const SSL_CERT: Field = Field {
    name: "ssl_cert",
    aliases: &["sslCertPath", "ssl_cert_path"],
};
pub const SSL_CA: Field = Field {
    name: "ssl_ca",
    aliases: &["sslCaPath", "ssl_ca_path"],
};
pub const LABEL: Field = Field {
    name: "label",
    aliases: &["verbose"],
};

pub const FIELDS: &[Field] = &[
    AUTH_TYPE, HOST, SOCKET, PORT, SSL, SSL_VERIFY, SSL_KEY, SSL_CERT, SSL_CA, LABEL,
];

/// Whether `key` is read by the registry (under its canonical name or an alias).
pub fn is_known_attribute(key: &str) -> bool {
    FIELDS.iter().any(|field| field.matches(key))
}

struct AttributeReader<'a> {
    id: u32,
    attributes: &'a Attributes,
}

impl<'a> AttributeReader<'a> {
    fn lookup(&self, field: Field) -> Result<Option<&'a AttrValue>, ConfigError> {
        let mut found: Option<(&'a str, &'a AttrValue)> = None;
        for (key, value) in self.attributes.iter() {
            if !field.matches(key) {
                continue;
            }
            if let Some((first, _)) = found {
                return Err(ConfigError::duplicate_attribute(self.id, field.name, first, key));
            }
            found = Some((key, value));
        }
        Ok(found.map(|(_, value)| value))
    }

    /// Non-blank string value; blank strings read as unset.
    fn string(&self, field: Field) -> Result<Option<String>, ConfigError> {
        match self.lookup(field)? {
            None => Ok(None),
            Some(AttrValue::Str(value)) if value.trim().is_empty() => Ok(None),
            Some(AttrValue::Str(value)) => Ok(Some(value.clone())),
            Some(other) => Err(ConfigError::invalid_value(
                self.id,
                field.name,
                "a string",
                other.kind(),
            )),
        }
    }

    fn flag(&self, field: Field) -> Result<Option<bool>, ConfigError> {
        match self.lookup(field)? {
            None => Ok(None),
            Some(AttrValue::Bool(value)) => Ok(Some(*value)),
            Some(other) => Err(ConfigError::invalid_value(
                self.id,
                field.name,
                "a boolean",
                other.kind(),
            )),
        }
    }

    fn path(&self, field: Field, base_dir: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
        Ok(self.string(field)?.map(|raw| {
            let path = PathBuf::from(raw);
            match base_dir {
                Some(root) if path.is_relative() => root.join(path),
                _ => path,
            }
        }))
    }

    /// Integer or decimal-string port in `1..=65535`.
    fn port(&self) -> Result<Option<u16>, ConfigError> {
        let raw = match self.lookup(PORT)? {
            None => return Ok(None),
            Some(AttrValue::Int(value)) => *value,
            Some(AttrValue::Str(value)) if value.trim().is_empty() => return Ok(None),
            Some(AttrValue::Str(value)) => value.trim().parse::<i64>().map_err(|_| {
                ConfigError::invalid_value(
                    self.id,
                    PORT.name,
                    "an integer port",
                    "a non-numeric string",
                )
            })?,
            Some(other) => {
                return Err(ConfigError::invalid_value(
                    self.id,
                    PORT.name,
                    "an integer port",
                    other.kind(),
                ))
            }
        };
        match u16::try_from(raw) {
            Ok(port) if port > 0 => Ok(Some(port)),
            _ => Err(ConfigError::port_out_of_range(self.id, raw)),
        }
    }

    fn tls(&self, base_dir: Option<&Path>) -> Result<Option<TlsSettings>, ConfigError> {
        let enabled = self.flag(SSL)?.unwrap_or(false);
        let verify = self.flag(SSL_VERIFY)?.unwrap_or(true);
        let key = self.path(SSL_KEY, base_dir)?;
        let cert = self.path(SSL_CERT, base_dir)?;
        let ca = self.path(SSL_CA, base_dir)?;

        let material: Vec<&str> = [(SSL_KEY, &key), (SSL_CERT, &cert), (SSL_CA, &ca)]
            .iter()
            .filter(|(_, value)| value.is_some())
            .map(|(field, _)| field.name)
            .collect();

        if !enabled {
            if !material.is_empty() {
                return Err(ConfigError::incomplete_tls(
                    self.id,
                    format!("{} set but `ssl` is not enabled", material.join(", ")),
                ));
            }
            return Ok(None);
        }

        if key.is_some() != cert.is_some() {
            let missing = if key.is_none() { SSL_KEY.name } else { SSL_CERT.name };
            let message = format!(
                "client certificate needs both ssl_key and ssl_cert; `{missing}` is missing"
            );
            return Err(ConfigError::incomplete_tls(self.id, message));
        }

        Ok(Some(TlsSettings { verify, key, cert, ca }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(attributes: Attributes) -> Result<ConnectionProfile, ConfigError> {
        ConnectionProfile::from_attributes(1, &attributes, &LoadOptions::default())
    }

    #[test]
    fn auth_type_parses_known_values_only() {
        assert_eq!("cookie".parse::<AuthType>(), Ok(AuthType::Cookie));
        assert_eq!("Signon".parse::<AuthType>(), Ok(AuthType::Signon));
        assert_eq!("http".parse::<AuthType>().unwrap().to_string(), "http");
        assert_eq!("ldap".parse::<AuthType>(), Err("ldap".to_string()));
    }

    #[test]
    fn tcp_profile_defaults_port() {
        let profile = read(
            Attributes::new()
                .with("auth_type", "cookie")
                .with("host", "worldcup.zematix.hu")
                .with("verbose", "Remote production"),
        )
        .expect("valid profile");

        assert_eq!(profile.host(), Some("worldcup.zematix.hu"));
        assert_eq!(profile.effective_port(), Some(3306));
        assert_eq!(profile.label(), Some("Remote production"));
        assert!(!profile.uses_tls());
    }

    #[test]
    fn socket_profile_has_no_port() {
        let profile = read(
            Attributes::new()
                .with("authType", "config")
                .with("host", "")
                .with("socket", "/var/run/mysqld/mysqld.sock"),
        )
        .expect("valid profile");

        assert_eq!(profile.socket(), Some(Path::new("/var/run/mysqld/mysqld.sock")));
        assert_eq!(profile.effective_port(), None);
        assert_eq!(profile.display_name(), "/var/run/mysqld/mysqld.sock");
    }

    #[test]
    fn port_accepts_numeric_strings() {
        let profile = read(
            Attributes::new()
                .with("auth_type", "cookie")
                .with("host", "db")
                .with("port", "3307"),
        )
        .unwrap();
        assert_eq!(profile.effective_port(), Some(3307));

        let err = read(
            Attributes::new()
                .with("auth_type", "cookie")
                .with("host", "db")
                .with("port", "mysql"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "port", .. }));
    }

    #[test]
    fn port_zero_is_out_of_range() {
        let err = read(
            Attributes::new()
                .with("auth_type", "cookie")
                .with("host", "db")
                .with("port", 0_i64),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::PortOutOfRange { port: 0, .. }));
    }

    #[test]
    fn alias_and_canonical_name_clash() {
        let err = read(
            Attributes::new()
                .with("auth_type", "cookie")
                .with("authType", "http")
                .with("host", "db"),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::DuplicateAttribute { field: "auth_type", .. }
        ));
    }

    #[test]
    fn ssl_flag_must_be_boolean() {
        let err = read(
            Attributes::new()
                .with("auth_type", "cookie")
                .with("host", "db")
                .with("ssl", "yes"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "ssl", .. }));
    }

    #[test]
    fn tls_paths_resolve_against_base_dir() {
        let options = LoadOptions::default().with_base_dir("/etc/dbadmin");
        let attributes = Attributes::new()
            .with("auth_type", "cookie")
            .with("host", "worldcup.zematix.hu")
            .with("ssl", true)
            .with("ssl_verify", false)
            .with("ssl_key", "../client-key.pem")
            .with("ssl_cert", "../client-cert.pem")
            .with("ssl_ca", "/srv/tls/server-ca.pem");

        let profile = ConnectionProfile::from_attributes(2, &attributes, &options).unwrap();
        let tls = profile.tls().expect("tls enabled");

        assert!(!tls.verify);
        assert!(tls.has_client_certificate());
        assert_eq!(tls.key.as_deref(), Some(Path::new("/etc/dbadmin/../client-key.pem")));
        assert_eq!(tls.ca.as_deref(), Some(Path::new("/srv/tls/server-ca.pem")));
    }

    #[test]
    fn ca_alone_is_enough_for_tls() {
        let profile = read(
            Attributes::new()
                .with("auth_type", "cookie")
                .with("host", "db")
                .with("ssl", true)
                .with("sslCaPath", "server-ca.pem"),
        )
        .unwrap();
        let tls = profile.tls().unwrap();
        assert!(tls.verify);
        assert!(!tls.has_client_certificate());
    }

    #[test]
    fn key_without_cert_is_incomplete() {
        let err = read(
            Attributes::new()
                .with("auth_type", "cookie")
                .with("host", "db")
                .with("ssl", true)
                .with("ssl_key", "client-key.pem"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::IncompleteTlsMaterial { id: 1, .. }));
    }

    #[test]
    fn unknown_attributes_are_ignored() {
        assert!(is_known_attribute("verbose"));
        assert!(!is_known_attribute("compress"));

        let profile = read(
            Attributes::new()
                .with("auth_type", "http")
                .with("host", "db")
                .with("compress", true),
        );
        assert!(profile.is_ok());
    }

    #[test]
    fn serializes_for_display() {
        let profile = read(
            Attributes::new()
                .with("auth_type", "cookie")
                .with("host", "localhost")
                .with("port", 3306_i64),
        )
        .unwrap();
        let json = serde_json::to_value(&profile).unwrap();

        assert_eq!(json["auth_type"], "cookie");
        assert_eq!(json["transport"]["kind"], "tcp");
        assert_eq!(json["transport"]["port"], 3306);
        assert!(json.get("default_port").is_none());
    }
}
