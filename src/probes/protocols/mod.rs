// Built-in protocol probes
//
// Each probe owns its default port, its option set and its success predicate;
// connection handling is shared through `probes::connection`.

pub mod mail_probes;
pub mod system_probes;

use regex::Regex;
use std::collections::HashMap;

use crate::probes::registry::Registry;
use mail_probes::{ImapProbe, ImapsProbe, Pop3Probe, Pop3sProbe, SmtpProbe};
use system_probes::{FtpProbe, SshProbe, TcpProbe};

lazy_static::lazy_static! {
    pub static ref PORT_PATTERN: Regex = Regex::new("^[0-9]+$").expect("valid port pattern");
    pub static ref TLS_PATTERN: Regex =
        Regex::new("(?i)^(strict|insecure)$").expect("valid tls pattern");
}

/// Register every built-in probe, in a fixed order.
pub fn register_builtin_probes(registry: &mut Registry) {
    registry.register("ftp", || Box::new(FtpProbe::default()));
    registry.register("imap", || Box::new(ImapProbe::default()));
    registry.register("imaps", || Box::new(ImapsProbe::default()));
    registry.register("pop3", || Box::new(Pop3Probe::default()));
    registry.register("pop3s", || Box::new(Pop3sProbe::default()));
    registry.register("smtp", || Box::new(SmtpProbe::default()));
    registry.register("ssh", || Box::new(SshProbe::default()));
    registry.register("tcp", || Box::new(TcpProbe::default()));
}

pub(crate) fn plain_arguments() -> HashMap<&'static str, &'static Regex> {
    HashMap::from([("port", &*PORT_PATTERN)])
}

pub(crate) fn tls_arguments() -> HashMap<&'static str, &'static Regex> {
    HashMap::from([("port", &*PORT_PATTERN), ("tls", &*TLS_PATTERN)])
}
