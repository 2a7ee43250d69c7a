pub mod arguments;
pub mod connection;
pub mod error;
pub mod protocols;
pub mod registry;
pub mod results;
pub mod validation;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::network::TlsMode;
pub use arguments::parse_arguments;
pub use error::{ErrorKind, ProbeError, Stage};
pub use registry::{global_registry, ProbeFactory, Registry};
pub use results::ProbeReport;

/// Caller-wide settings applied to every probe, independent of protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOptions {
    pub timeout: Duration,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

/// The contract every protocol check implements.
///
/// An instance is created by its factory, configured once with `set_line` and
/// `set_options`, run once, then dropped. Instances are never shared between
/// concurrent runs.
#[async_trait]
pub trait ProtocolProbe: Send + Sync {
    fn name(&self) -> &str;

    /// Store the raw instruction line; options are read from it at run time.
    fn set_line(&mut self, line: &str);

    fn set_options(&mut self, options: TestOptions);

    async fn run(&self, target: &str) -> Result<(), ProbeError>;

    /// Options this probe understands, with the pattern a value must match.
    fn arguments(&self) -> HashMap<&'static str, &'static Regex>;

    /// Usage text for self-documentation.
    fn example(&self) -> &'static str;
}

/// Per-instance state shared by the built-in probes.
#[derive(Debug, Clone, Default)]
pub struct ProbeConfig {
    pub line: String,
    pub options: TestOptions,
}

/// Resolve `protocol` in `registry`, configure a fresh instance and run it.
pub async fn check(
    registry: &Registry,
    protocol: &str,
    line: &str,
    options: &TestOptions,
    target: &str,
) -> Result<(), ProbeError> {
    let mut probe = registry.create(protocol)?;
    probe.set_line(line);
    probe.set_options(options.clone());
    probe.run(target).await
}

/// Parse `line` and check every option the probe understands against its
/// pattern. Options the probe does not list are dropped.
pub fn validated_arguments(
    probe: &dyn ProtocolProbe,
    line: &str,
) -> Result<HashMap<String, String>, ProbeError> {
    let known = probe.arguments();
    let mut parsed = parse_arguments(line);
    parsed.retain(|name, _| known.contains_key(name.as_str()));

    for (name, value) in &parsed {
        let pattern = known[name.as_str()];
        if !pattern.is_match(value) {
            let reason = format!("must match {}", pattern.as_str());
            return Err(ProbeError::config(name, value, reason));
        }
    }

    Ok(parsed)
}

/// The `port` option if given, otherwise the protocol default.
pub fn resolve_port(
    args: &HashMap<String, String>,
    default: Option<u16>,
) -> Result<u16, ProbeError> {
    match args.get("port") {
        Some(value) => value
            .parse::<u16>()
            .map_err(|e| ProbeError::config("port", value, e.to_string())),
        None => default.ok_or_else(|| ProbeError::MissingOption("port".to_string())),
    }
}

pub fn resolve_tls(args: &HashMap<String, String>) -> Result<TlsMode, ProbeError> {
    match args.get("tls") {
        Some(value) => TlsMode::from_option(value),
        None => Ok(TlsMode::default()),
    }
}
