// System service probes (SSH, FTP, plain TCP)

use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;

use super::plain_arguments;
use crate::probes::connection::{execute, CheckPlan};
use crate::probes::validation::{BannerContains, Connected};
use crate::probes::{
    resolve_port, validated_arguments, ProbeConfig, ProbeError, ProtocolProbe, TestOptions,
};

/// Expects an OpenSSH identification string.
#[derive(Debug, Default)]
pub struct SshProbe {
    config: ProbeConfig,
}

impl SshProbe {
    pub const DEFAULT_PORT: u16 = 22;

    pub fn effective_port(&self) -> Result<u16, ProbeError> {
        let args = validated_arguments(self, &self.config.line)?;
        resolve_port(&args, Some(Self::DEFAULT_PORT))
    }
}

#[async_trait]
impl ProtocolProbe for SshProbe {
    fn name(&self) -> &str {
        "ssh"
    }

    fn set_line(&mut self, line: &str) {
        self.config.line = line.to_string();
    }

    fn set_options(&mut self, options: TestOptions) {
        self.config.options = options;
    }

    async fn run(&self, target: &str) -> Result<(), ProbeError> {
        let validator = BannerContains::new("OpenSSH", "OpenSSH");
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
        "SSH Tester
----------
 Connects to the target and expects the identification line to
 mention OpenSSH.

    host.example.com must run ssh [with port 22]
"
    }
}

#[derive(Debug, Default)]
pub struct FtpProbe {
    config: ProbeConfig,
}

impl FtpProbe {
    pub const DEFAULT_PORT: u16 = 21;

    pub fn effective_port(&self) -> Result<u16, ProbeError> {
        let args = validated_arguments(self, &self.config.line)?;
        resolve_port(&args, Some(Self::DEFAULT_PORT))
    }
}

#[async_trait]
impl ProtocolProbe for FtpProbe {
    fn name(&self) -> &str {
        "ftp"
    }

    fn set_line(&mut self, line: &str) {
        self.config.line = line.to_string();
    }

    fn set_options(&mut self, options: TestOptions) {
        self.config.options = options;
    }

    async fn run(&self, target: &str) -> Result<(), ProbeError> {
        let validator = BannerContains::new("220", "an FTP server");
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
        "FTP Tester
----------
 Connects to the target and expects a '220' greeting.

    ftp.example.com must run ftp [with port 21]
"
    }
}

/// Bare TCP connect. There is no sensible default port, so one is required.
#[derive(Debug, Default)]
pub struct TcpProbe {
    config: ProbeConfig,
}

impl TcpProbe {
    pub fn effective_port(&self) -> Result<u16, ProbeError> {
        let args = validated_arguments(self, &self.config.line)?;
        resolve_port(&args, None)
    }
}

#[async_trait]
impl ProtocolProbe for TcpProbe {
    fn name(&self) -> &str {
        "tcp"
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
            validator: &Connected,
        };
        execute(target, plan, &self.config.options).await
    }

    fn arguments(&self) -> HashMap<&'static str, &'static Regex> {
        plain_arguments()
    }

    fn example(&self) -> &'static str {
        "TCP Tester
----------
 Succeeds when a TCP connection to the given port can be opened.

    db.example.com must run tcp with port 5432
"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::error::ErrorKind;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    async fn banner_server(banner: &'static [u8]) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let _ = stream.write_all(banner).await;
            }
        });
        port
    }

    fn configured<P: ProtocolProbe + Default>(line: &str) -> P {
        let mut probe = P::default();
        probe.set_line(line);
        probe.set_options(TestOptions {
            timeout: Duration::from_secs(2),
        });
        probe
    }

    #[test]
    fn test_default_ports() {
        assert_eq!(SshProbe::default().effective_port().unwrap(), 22);
        assert_eq!(FtpProbe::default().effective_port().unwrap(), 21);
    }

    #[test]
    fn test_tcp_requires_port() {
        let err = TcpProbe::default().effective_port().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let probe: TcpProbe = configured("with port 5432");
        assert_eq!(probe.effective_port().unwrap(), 5432);
    }

    #[tokio::test]
    async fn test_ssh_openssh_banner() {
        let port = banner_server(b"SSH-2.0-OpenSSH_8.9\r\n").await;
        let probe: SshProbe = configured(&format!("with port {}", port));
        let result = probe.run("127.0.0.1").await;
        assert!(result.is_ok(), "ssh probe should pass: {:?}", result);
    }

    #[tokio::test]
    async fn test_ssh_other_implementation() {
        let port = banner_server(b"SSH-2.0-libssh\r\n").await;
        let probe: SshProbe = configured(&format!("with port {}", port));
        let err = probe.run("127.0.0.1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("SSH-2.0-libssh"));
    }

    #[tokio::test]
    async fn test_ftp_banner() {
        let port = banner_server(b"220 (vsFTPd 3.0.5)\r\n").await;
        let probe: FtpProbe = configured(&format!("with port {}", port));
        assert!(probe.run("127.0.0.1").await.is_ok());
    }

    #[tokio::test]
    async fn test_tcp_connect_and_refusal() {
        let port = banner_server(b"").await;
        let probe: TcpProbe = configured(&format!("with port {}", port));
        assert!(probe.run("127.0.0.1").await.is_ok());

        let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let closed_port = closed.local_addr().unwrap().port();
        drop(closed);
        let probe: TcpProbe = configured(&format!("with port {}", closed_port));
        assert_eq!(probe.run("127.0.0.1").await.unwrap_err().kind(), ErrorKind::Connection);
    }
}
