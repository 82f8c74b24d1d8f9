use crate::config::components::profile::ConnectionProfile;
use crate::config::components::source::ProfileSource;
use crate::error::ConfigError;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Standard MySQL/MariaDB port, used when a TCP profile has no `port`.
pub const DEFAULT_PORT: u16 = 3306;

/// Knobs applied while a registry is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Port reported by [`ConnectionProfile::effective_port`] when none is configured.
    pub default_port: u16,
    /// Directory that relative `ssl_key`/`ssl_cert`/`ssl_ca` paths are joined onto.
    pub base_dir: Option<PathBuf>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            default_port: DEFAULT_PORT,
            base_dir: None,
        }
    }
}

impl LoadOptions {
    pub fn with_default_port(mut self, port: u16) -> Self {
        self.default_port = port;
        self
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }
}

/// Immutable, validated set of server profiles ordered by id.
///
/// Built once with [`Registry::load`] and then only read, so a `&Registry`
/// (or an `Arc<Registry>`) can be handed to any number of threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    profiles: Vec<ConnectionProfile>,
}

impl Registry {
    pub fn load(source: ProfileSource) -> Result<Self, ConfigError> {
        Self::load_with(source, &LoadOptions::default())
    }

    /// Validates every entry and fails on the first problem found.
    ///
    /// Entries are checked in source order: id syntax and uniqueness first,
    /// then the attributes of the profile.
    pub fn load_with(source: ProfileSource, options: &LoadOptions) -> Result<Self, ConfigError> {
        if source.is_empty() {
            return Err(ConfigError::empty_registry());
        }

        let mut profiles: BTreeMap<u32, ConnectionProfile> = BTreeMap::new();
        for (key, attributes) in source.entries() {
            let id = key.to_id()?;
            if profiles.contains_key(&id) {
                return Err(ConfigError::duplicate_id(id));
            }
            let profile = ConnectionProfile::from_attributes(id, attributes, options)?;
            profiles.insert(id, profile);
        }

        Ok(Self {
            profiles: profiles.into_values().collect(),
        })
    }

    pub fn get(&self, id: u32) -> Option<&ConnectionProfile> {
        self.profiles
            .binary_search_by_key(&id, ConnectionProfile::id)
            .ok()
            .map(|index| &self.profiles[index])
    }

    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    /// Profiles in ascending id order.
    pub fn list(&self) -> &[ConnectionProfile] {
        &self.profiles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConnectionProfile> {
        self.profiles.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.profiles.iter().map(ConnectionProfile::id)
    }

    /// The profile with the lowest id, which the host selects when none is requested.
    pub fn default_profile(&self) -> &ConnectionProfile {
        // a loaded registry is never empty
        &self.profiles[0]
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a ConnectionProfile;
    type IntoIter = std::slice::Iter<'a, ConnectionProfile>;

    fn into_iter(self) -> Self::IntoIter {
        self.profiles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::components::profile::{AuthType, Transport};
    use crate::config::components::source::Attributes;
    use std::sync::Arc;
    use std::thread;

    fn tcp(host: &str) -> Attributes {
        Attributes::new().with("auth_type", "cookie").with("host", host)
    }

    #[test]
    fn two_servers_load_in_id_order() {
        let source = ProfileSource::new()
            .with(2, tcp("worldcup.zematix.hu"))
            .with(1, tcp("localhost"));

        let registry = Registry::load(source).expect("valid registry");

        assert_eq!(registry.ids().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(registry.list()[0].host(), Some("localhost"));
        assert_eq!(registry.default_profile().id(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn ids_stay_strictly_ascending() {
        let source: ProfileSource = [9_i64, 3, 40, 1, 17]
            .into_iter()
            .map(|id| (id, tcp("db")))
            .collect();

        let registry = Registry::load(source).unwrap();
        let ids: Vec<u32> = registry.iter().map(|p| p.id()).collect();

        assert_eq!(ids, vec![1, 3, 9, 17, 40]);
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn get_returns_none_for_absent_ids() {
        let registry = Registry::load(ProfileSource::new().with(1, tcp("localhost"))).unwrap();

        assert_eq!(registry.get(1).map(|p| p.auth_type()), Some(AuthType::Cookie));
        for absent in [0, 2, 3306, u32::MAX] {
            assert!(registry.get(absent).is_none());
            assert!(!registry.contains(absent));
        }
    }

    #[test]
    fn empty_source_is_rejected() {
        let err = Registry::load(ProfileSource::new()).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyRegistry { .. }));
    }

    #[test]
    fn host_and_socket_conflict() {
        let source = ProfileSource::new().with(
            1,
            tcp("localhost").with("socket", "/var/run/mysqld/mysqld.sock"),
        );

        let err = Registry::load(source).unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingTransport { id: 1, .. }));
    }

    #[test]
    fn tls_material_requires_ssl() {
        for ssl in [None, Some(false)] {
            let mut attributes = tcp("db").with("ssl_key", "../client-key.pem");
            if let Some(flag) = ssl {
                attributes.insert("ssl", flag);
            }
            let err = Registry::load(ProfileSource::new().with(1, attributes)).unwrap_err();
            assert!(matches!(err, ConfigError::IncompleteTlsMaterial { id: 1, .. }));
        }
    }

    #[test]
    fn port_bounds() {
        let out_of_range = ProfileSource::new().with(1, tcp("db").with("port", 70000_i64));
        let err = Registry::load(out_of_range).unwrap_err();
        assert!(matches!(err, ConfigError::PortOutOfRange { id: 1, port: 70000, .. }));

        let standard = ProfileSource::new().with(1, tcp("db").with("port", 3306_i64));
        let registry = Registry::load(standard).unwrap();
        assert_eq!(
            registry.get(1).unwrap().transport(),
            &Transport::Tcp {
                host: "db".to_string(),
                port: Some(3306)
            }
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let source = ProfileSource::new()
            .with(1, tcp("a"))
            .with("1", tcp("b"));

        let err = Registry::load(source).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateId { id: 1, .. }));
    }

    #[test]
    fn non_positive_ids_are_rejected() {
        let err = Registry::load(ProfileSource::new().with(0, tcp("db"))).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidId { ref key, .. } if key == "0"));
    }

    #[test]
    fn missing_fields_are_checked_before_values() {
        let no_auth = ProfileSource::new()
            .with(1, Attributes::new().with("host", "db").with("port", 0_i64));
        let err = Registry::load(no_auth).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field: "auth_type", .. }));

        let no_transport =
            ProfileSource::new().with(4, Attributes::new().with("auth_type", "sso"));
        let err = Registry::load(no_transport).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { id: 4, field: "host", .. }));
    }

    #[test]
    fn auth_type_checked_before_port() {
        let source = ProfileSource::new().with(
            1,
            Attributes::new()
                .with("auth_type", "kerberos")
                .with("host", "db")
                .with("port", 70000_i64),
        );
        let err = Registry::load(source).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidAuthType { ref value, .. } if value == "kerberos"
        ));
    }

    #[test]
    fn first_failing_profile_wins() {
        let source = ProfileSource::new()
            .with(1, tcp("db"))
            .with(2, tcp("db").with("port", -1_i64))
            .with(3, Attributes::new());

        let err = Registry::load(source).unwrap_err();
        assert_eq!(err.profile_id(), Some(2));
    }

    #[test]
    fn custom_default_port() {
        let options = LoadOptions::default().with_default_port(5432);
        let registry =
            Registry::load_with(ProfileSource::new().with(1, tcp("pg")), &options).unwrap();
        assert_eq!(registry.get(1).unwrap().effective_port(), Some(5432));
    }

    #[test]
    fn shared_across_threads_without_locks() {
        let registry = Arc::new(
            Registry::load(
                ProfileSource::new()
                    .with(1, tcp("localhost"))
                    .with(2, tcp("worldcup.zematix.hu")),
            )
            .unwrap(),
        );

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.iter().map(|p| p.id()).sum::<u32>())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 3);
        }
    }
}
