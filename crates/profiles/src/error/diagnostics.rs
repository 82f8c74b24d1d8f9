use std::{borrow::Cow, fmt, panic::Location, path::Path};

/// Where in the configuration a diagnostic points at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scope {
    /// The registry as a whole.
    Registry,
    /// A single server profile, by its raw key.
    Profile(String),
    /// A configuration file or directory on disk.
    File(String),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Registry => f.write_str("registry"),
            Scope::Profile(key) => write!(f, "profile {key}"),
            Scope::File(path) => write!(f, "file '{path}'"),
        }
    }
}

/// Human-friendly error message that records its scope and the call-site.
///
/// Build one with [`DiagnosticMessage::new`], [`DiagnosticMessage::in_profile`],
/// [`DiagnosticMessage::in_file`] or the [`diag!`] macro. The location is taken
/// from the caller, so constructors that wrap these should be `#[track_caller]`
/// as well.
#[derive(Clone, Debug)]
pub struct DiagnosticMessage {
    scope: Scope,
    message: Cow<'static, str>,
    location: &'static Location<'static>,
}

impl DiagnosticMessage {
    #[track_caller]
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self::scoped(Scope::Registry, message)
    }

    #[track_caller]
    pub fn in_profile(key: impl fmt::Display, message: impl Into<Cow<'static, str>>) -> Self {
        Self::scoped(Scope::Profile(key.to_string()), message)
    }

    #[track_caller]
    pub fn in_file(path: impl AsRef<Path>, message: impl Into<Cow<'static, str>>) -> Self {
        Self::scoped(
            Scope::File(path.as_ref().display().to_string()),
            message,
        )
    }

    #[track_caller]
    fn scoped(scope: Scope, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            scope,
            message: message.into(),
            location: Location::caller(),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn message(&self) -> &str {
        self.message.as_ref()
    }

    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

impl fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (at {}:{})",
            self.scope,
            self.message,
            self.location.file(),
            self.location.line()
        )
    }
}

/// `format!`-style shorthand for a registry-scoped [`DiagnosticMessage`].
#[macro_export]
macro_rules! diag {
    ($msg:literal $(,)?) => {
        $crate::error::diagnostics::DiagnosticMessage::new($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::diagnostics::DiagnosticMessage::new(format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_scope_and_call_site() {
        let diag = DiagnosticMessage::in_profile(2, "port 0 is not allowed");
        let rendered = diag.to_string();

        assert!(rendered.starts_with("profile 2: port 0 is not allowed (at "));
        assert!(rendered.contains("diagnostics.rs"));
        assert_eq!(diag.scope(), &Scope::Profile("2".to_string()));
    }

    #[test]
    fn macro_formats_registry_messages() {
        let diag = crate::diag!("{} profiles declared", 0);
        assert_eq!(diag.message(), "0 profiles declared");
        assert_eq!(diag.scope(), &Scope::Registry);
    }
}
