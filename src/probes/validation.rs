// Success predicates applied to an established connection

use async_trait::async_trait;

use crate::probes::connection::Connection;
use crate::probes::error::ProbeError;

#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, connection: &mut Connection) -> Result<(), ProbeError>;
}

/// Getting this far (connect, plus any TLS handshake) is success.
pub struct Connected;

#[async_trait]
impl Validator for Connected {
    async fn validate(&self, _connection: &mut Connection) -> Result<(), ProbeError> {
        Ok(())
    }
}

/// The first line the service sends must contain `needle`.
pub struct BannerContains {
    needle: &'static str,
    service: &'static str,
}

impl BannerContains {
    /// `service` completes the failure message, e.g. "an SMTP server".
    pub fn new(needle: &'static str, service: &'static str) -> Self {
        Self { needle, service }
    }
}

#[async_trait]
impl Validator for BannerContains {
    async fn validate(&self, connection: &mut Connection) -> Result<(), ProbeError> {
        let banner = connection.read_line().await?;
        if banner.contains(self.needle) {
            Ok(())
        } else {
            Err(ProbeError::Validation(format!(
                "banner {:?} from {} doesn't look like {}",
                banner,
                connection.address(),
                self.service
            )))
        }
    }
}

/// The IMAP greeting must be an untagged OK or PREAUTH.
pub struct ImapGreeting;

#[async_trait]
impl Validator for ImapGreeting {
    async fn validate(&self, connection: &mut Connection) -> Result<(), ProbeError> {
        let greeting = connection.read_line().await?;
        let status = greeting
            .strip_prefix("* ")
            .and_then(|rest| rest.split_whitespace().next())
            .map(str::to_uppercase);

        match status.as_deref() {
            Some("OK") | Some("PREAUTH") => Ok(()),
            Some("BYE") => Err(ProbeError::Validation(format!(
                "{} refused the IMAP session: {:?}",
                connection.address(),
                greeting
            ))),
            _ => Err(ProbeError::Validation(format!(
                "greeting {:?} from {} is not an IMAP greeting",
                greeting,
                connection.address()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::error::ErrorKind;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio::time::Instant;

    // Validate against an in-memory peer that has already sent `payload`.
    async fn check(validator: &dyn Validator, payload: &[u8]) -> Result<(), ProbeError> {
        let (client, mut server) = tokio::io::duplex(1024);
        server.write_all(payload).await.unwrap();
        drop(server);

        let timeout = Duration::from_secs(1);
        let mut connection = Connection::new(
            Box::new(client),
            "test.example:143".to_string(),
            Instant::now() + timeout,
            timeout,
        );
        validator.validate(&mut connection).await
    }

    #[tokio::test]
    async fn test_banner_contains() {
        let smtp = BannerContains::new("SMTP", "an SMTP server");
        assert!(check(&smtp, b"220 test.example ESMTP Postfix\r\n").await.is_ok());

        let err = check(&smtp, b"220 test.example ready\r\n").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("doesn't look like an SMTP server"));
    }

    #[tokio::test]
    async fn test_banner_only_first_line_counts() {
        let ssh = BannerContains::new("OpenSSH", "an OpenSSH server");
        let err = check(&ssh, b"SSH-2.0-dropbear\r\nOpenSSH\r\n").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_connected_reads_nothing() {
        assert!(check(&Connected, b"").await.is_ok());
    }

    #[tokio::test]
    async fn test_imap_greeting() {
        assert!(check(&ImapGreeting, b"* OK [CAPABILITY IMAP4rev1] Dovecot ready.\r\n")
            .await
            .is_ok());
        assert!(check(&ImapGreeting, b"* PREAUTH logged in\r\n").await.is_ok());

        let bye = check(&ImapGreeting, b"* BYE too many connections\r\n").await.unwrap_err();
        assert!(bye.to_string().contains("refused the IMAP session"));

        let other = check(&ImapGreeting, b"+OK POP3 ready\r\n").await.unwrap_err();
        assert_eq!(other.kind(), ErrorKind::Validation);
    }
}
