// Mail protocol probes (SMTP, IMAP, IMAPS, POP3, POP3S)

use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;

use super::{plain_arguments, tls_arguments};
use crate::network::TlsMode;
use crate::probes::connection::{execute, CheckPlan};
use crate::probes::validation::{BannerContains, ImapGreeting};
use crate::probes::{
    resolve_port, resolve_tls, validated_arguments, ProbeConfig, ProbeError, ProtocolProbe,
    TestOptions,
};

/// Looks for an SMTP banner.
///
/// ```text
/// mail.example.com must run smtp [with port 25]
/// ```
#[derive(Debug, Default)]
pub struct SmtpProbe {
    config: ProbeConfig,
}

impl SmtpProbe {
    pub const DEFAULT_PORT: u16 = 25;

    pub fn effective_port(&self) -> Result<u16, ProbeError> {
        let args = validated_arguments(self, &self.config.line)?;
        resolve_port(&args, Some(Self::DEFAULT_PORT))
    }
}

#[async_trait]
impl ProtocolProbe for SmtpProbe {
    fn name(&self) -> &str {
        "smtp"
    }

    fn set_line(&mut self, line: &str) {
        self.config.line = line.to_string();
    }

    fn set_options(&mut self, options: TestOptions) {
        self.config.options = options;
    }

    async fn run(&self, target: &str) -> Result<(), ProbeError> {
        let validator = BannerContains::new("SMTP", "an SMTP server");
        let plan = CheckPlan {
            port: self.effective_port()?,
            tls: None,
            validator: &validator,
        };
        execute(target, plan, &self.config.options).await
    }

    fn arguments(&self) -> HashMap<&'static str, &'static Regex> {
        plain_arguments()
    }

    fn example(&self) -> &'static str {
        "SMTP Tester
-----------
 Connects to the target and expects the first line it sends to
 contain 'SMTP'.

    mail.example.com must run smtp
    mail.example.com must run smtp with port 587
"
    }
}

/// Plaintext IMAP: the greeting must be `* OK` or `* PREAUTH`.
#[derive(Debug, Default)]
pub struct ImapProbe {
    config: ProbeConfig,
}

impl ImapProbe {
    pub const DEFAULT_PORT: u16 = 143;

    pub fn effective_port(&self) -> Result<u16, ProbeError> {
        let args = validated_arguments(self, &self.config.line)?;
        resolve_port(&args, Some(Self::DEFAULT_PORT))
    }
}

#[async_trait]
impl ProtocolProbe for ImapProbe {
    fn name(&self) -> &str {
        "imap"
    }

    fn set_line(&mut self, line: &str) {
        self.config.line = line.to_string();
    }

    fn set_options(&mut self, options: TestOptions) {
        self.config.options = options;
    }

    async fn run(&self, target: &str) -> Result<(), ProbeError> {
        let plan = CheckPlan {
            port: self.effective_port()?,
            tls: None,
            validator: &ImapGreeting,
        };
        execute(target, plan, &self.config.options).await
    }

    fn arguments(&self) -> HashMap<&'static str, &'static Regex> {
        plain_arguments()
    }

    fn example(&self) -> &'static str {
        "IMAP Tester
-----------
 Connects to the target and expects an IMAP greeting.

    mail.example.com must run imap [with port 143]
"
    }
}

/// IMAP over TLS. Success is a completed handshake followed by an IMAP
/// greeting; `tls insecure` skips certificate verification.
#[derive(Debug, Default)]
pub struct ImapsProbe {
    config: ProbeConfig,
}

impl ImapsProbe {
    pub const DEFAULT_PORT: u16 = 993;

    pub fn effective_settings(&self) -> Result<(u16, TlsMode), ProbeError> {
        let args = validated_arguments(self, &self.config.line)?;
        Ok((resolve_port(&args, Some(Self::DEFAULT_PORT))?, resolve_tls(&args)?))
    }
}

#[async_trait]
impl ProtocolProbe for ImapsProbe {
    fn name(&self) -> &str {
        "imaps"
    }

    fn set_line(&mut self, line: &str) {
        self.config.line = line.to_string();
    }

    fn set_options(&mut self, options: TestOptions) {
        self.config.options = options;
    }

    async fn run(&self, target: &str) -> Result<(), ProbeError> {
        let (port, mode) = self.effective_settings()?;
        let plan = CheckPlan {
            port,
            tls: Some(mode),
            validator: &ImapGreeting,
        };
        execute(target, plan, &self.config.options).await
    }

    fn arguments(&self) -> HashMap<&'static str, &'static Regex> {
        tls_arguments()
    }

    fn example(&self) -> &'static str {
        "IMAPS Tester
------------
 Performs a TLS handshake with the target and waits for the IMAP
 greeting. Certificates are verified unless 'tls insecure' is given.

    mail.example.com must run imaps
    mail.example.com must run imaps with port 1993 and tls insecure
"
    }
}

/// Plaintext POP3: the banner must contain `+OK`.
#[derive(Debug, Default)]
pub struct Pop3Probe {
    config: ProbeConfig,
}

impl Pop3Probe {
    pub const DEFAULT_PORT: u16 = 110;

    pub fn effective_port(&self) -> Result<u16, ProbeError> {
        let args = validated_arguments(self, &self.config.line)?;
        resolve_port(&args, Some(Self::DEFAULT_PORT))
    }
}

#[async_trait]
impl ProtocolProbe for Pop3Probe {
    fn name(&self) -> &str {
        "pop3"
    }

    fn set_line(&mut self, line: &str) {
        self.config.line = line.to_string();
    }

    fn set_options(&mut self, options: TestOptions) {
        self.config.options = options;
    }

    async fn run(&self, target: &str) -> Result<(), ProbeError> {
        let validator = BannerContains::new("+OK", "a POP3 server");
        let plan = CheckPlan {
            port: self.effective_port()?,
            tls: None,
            validator: &validator,
        };
        execute(target, plan, &self.config.options).await
    }

    fn arguments(&self) -> HashMap<&'static str, &'static Regex> {
        plain_arguments()
    }

    fn example(&self) -> &'static str {
        "POP3 Tester
-----------
 Connects to the target and expects a '+OK' banner.

    mail.example.com must run pop3 [with port 110]
"
    }
}

#[derive(Debug, Default)]
pub struct Pop3sProbe {
    config: ProbeConfig,
}

impl Pop3sProbe {
    pub const DEFAULT_PORT: u16 = 995;

    pub fn effective_settings(&self) -> Result<(u16, TlsMode), ProbeError> {
        let args = validated_arguments(self, &self.config.line)?;
        Ok((resolve_port(&args, Some(Self::DEFAULT_PORT))?, resolve_tls(&args)?))
    }
}

#[async_trait]
impl ProtocolProbe for Pop3sProbe {
    fn name(&self) -> &str {
        "pop3s"
    }

    fn set_line(&mut self, line: &str) {
        self.config.line = line.to_string();
    }

    fn set_options(&mut self, options: TestOptions) {
        self.config.options = options;
    }

    async fn run(&self, target: &str) -> Result<(), ProbeError> {
        let (port, mode) = self.effective_settings()?;
        let validator = BannerContains::new("+OK", "a POP3 server");
        let plan = CheckPlan {
            port,
            tls: Some(mode),
            validator: &validator,
        };
        execute(target, plan, &self.config.options).await
    }

    fn arguments(&self) -> HashMap<&'static str, &'static Regex> {
        tls_arguments()
    }

    fn example(&self) -> &'static str {
        "POP3S Tester
------------
 Performs a TLS handshake with the target and expects a '+OK' banner.

    mail.example.com must run pop3s [with port 995] [and tls insecure]
"
    }
}
