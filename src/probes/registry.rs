// Protocol name -> probe factory lookup
use std::collections::HashMap;
use tracing::warn;

use crate::probes::error::ProbeError;
use crate::probes::protocols::register_builtin_probes;
use crate::probes::ProtocolProbe;

/// Produces a fresh, unconfigured probe instance.
pub type ProbeFactory = fn() -> Box<dyn ProtocolProbe>;

#[derive(Default)]
pub struct Registry {
    factories: HashMap<String, ProbeFactory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in probe.
    pub fn with_builtin_probes() -> Self {
        let mut registry = Self::new();
        register_builtin_probes(&mut registry);
        registry
    }

    /// Register `factory` under `name`. A second registration of the same
    /// name replaces the first.
    pub fn register(&mut self, name: &str, factory: ProbeFactory) {
        if self.factories.insert(name.to_string(), factory).is_some() {
            warn!("protocol '{}' registered twice, keeping the latest", name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn ProtocolProbe>, ProbeError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| ProbeError::UnknownProtocol(name.to_string()))
    }

    /// Registered protocol names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

lazy_static::lazy_static! {
    static ref GLOBAL_REGISTRY: Registry = Registry::with_builtin_probes();
}

/// The process-wide registry, populated with the built-in probes on first use
/// and read-only afterwards.
pub fn global_registry() -> &'static Registry {
    &GLOBAL_REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::error::ErrorKind;
    use crate::probes::protocols::mail_probes::SmtpProbe;
    use crate::probes::protocols::system_probes::SshProbe;

    fn smtp() -> Box<dyn ProtocolProbe> {
        Box::new(SmtpProbe::default())
    }

    fn ssh() -> Box<dyn ProtocolProbe> {
        Box::new(SshProbe::default())
    }

    #[test]
    fn test_register_and_create() {
        let mut registry = Registry::new();
        registry.register("smtp", smtp);

        assert!(registry.contains("smtp"));
        let probe = registry.create("smtp").unwrap();
        assert_eq!(probe.name(), "smtp");
    }

    #[test]
    fn test_unknown_protocol() {
        let registry = Registry::new();
        assert!(!registry.contains("gopher"));
        match registry.create("gopher") {
            Err(err) => {
                assert_eq!(err.kind(), ErrorKind::UnknownProtocol);
                assert_eq!(err.to_string(), "unknown protocol: gopher");
            }
            Ok(_) => panic!("lookup of an unregistered name must fail"),
        }
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let mut registry = Registry::new();
        registry.register("smtp", smtp);
        assert!(!registry.contains("SMTP"));
        assert!(registry.create("SMTP").is_err());
    }

    #[test]
    fn test_duplicate_registration_last_wins() {
        let mut registry = Registry::new();
        registry.register("banner", smtp);
        registry.register("banner", ssh);

        assert_eq!(registry.names(), vec!["banner"]);
        assert_eq!(registry.create("banner").unwrap().name(), "ssh");
    }

    #[test]
    fn test_global_registry_has_builtins() {
        let names = global_registry().names();
        for expected in ["ftp", "imap", "imaps", "pop3", "pop3s", "smtp", "ssh", "tcp"] {
            assert!(names.contains(&expected), "missing {}", expected);
        }
    }
}
