use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, BufReader};
use tokio::time::{timeout_at, Instant};
use tracing::debug;

use crate::network::{self, TlsMode};
use crate::probes::error::{ProbeError, Stage};
use crate::probes::validation::Validator;
use crate::probes::TestOptions;

/// Longest banner line we are willing to buffer.
pub const MAX_BANNER_LENGTH: u64 = 4096;

pub trait ProbeStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> ProbeStream for T {}

/// An established (possibly TLS-wrapped) connection handed to a validator.
///
/// Every read shares the deadline set when the run started. The socket is
/// closed when the connection is dropped.
pub struct Connection {
    reader: BufReader<Box<dyn ProbeStream>>,
    address: String,
    deadline: Instant,
    timeout: Duration,
}

impl Connection {
    pub fn new(
        stream: Box<dyn ProbeStream>,
        address: String,
        deadline: Instant,
        timeout: Duration,
    ) -> Self {
        Self {
            reader: BufReader::new(stream),
            address,
            deadline,
            timeout,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Read a single line, without its line terminator.
    ///
    /// A line cut short by EOF is returned as-is; a connection closed before
    /// any byte arrived is a validation failure.
    pub async fn read_line(&mut self) -> Result<String, ProbeError> {
        let mut buffer = Vec::new();
        let mut limited = (&mut self.reader).take(MAX_BANNER_LENGTH);
        let result = timeout_at(self.deadline, limited.read_until(b'\n', &mut buffer)).await;

        match result {
            Ok(Ok(0)) => Err(ProbeError::Validation(format!(
                "{} closed the connection without sending a banner",
                self.address
            ))),
            Ok(Ok(_)) => {
                let line = String::from_utf8_lossy(&buffer).trim_end().to_string();
                debug!("read from {}: {:?}", self.address, line);
                Ok(line)
            }
            Ok(Err(source)) => Err(ProbeError::Read {
                address: self.address.clone(),
                source,
            }),
            Err(_) => Err(ProbeError::Timeout {
                stage: Stage::Read,
                address: self.address.clone(),
                after: self.timeout,
            }),
        }
    }
}

/// What a single run does: where to connect, whether to wrap in TLS, and how
/// to judge the result.
pub struct CheckPlan<'a> {
    pub port: u16,
    pub tls: Option<TlsMode>,
    pub validator: &'a dyn Validator,
}

/// Connect to `target` according to `plan` and apply its validator.
///
/// connect -> optional tls -> validate -> close, all bounded by one deadline
/// derived from `options.timeout`.
pub async fn execute(
    target: &str,
    plan: CheckPlan<'_>,
    options: &TestOptions,
) -> Result<(), ProbeError> {
    let address = network::dial_address(target, plan.port);
    let deadline = Instant::now() + options.timeout;

    let tcp = network::connect(&address, deadline, options.timeout).await?;
    let stream: Box<dyn ProbeStream> = match plan.tls {
        Some(mode) => Box::new(
            network::negotiate_tls(tcp, target, &address, mode, deadline, options.timeout).await?,
        ),
        None => Box::new(tcp),
    };

    let mut connection = Connection::new(stream, address, deadline, options.timeout);
    let outcome = plan.validator.validate(&mut connection).await;
    debug!("{} validated: {:?}", connection.address(), outcome.as_ref().map(|_| "ok"));
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::error::ErrorKind;
    use crate::probes::validation::{BannerContains, Connected};
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    async fn serve_once(payload: &'static [u8]) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let _ = stream.write_all(payload).await;
            }
        });
        port
    }

    fn options(millis: u64) -> TestOptions {
        TestOptions {
            timeout: Duration::from_millis(millis),
        }
    }

    #[tokio::test]
    async fn test_execute_connected() {
        let port = serve_once(b"").await;
        let plan = CheckPlan {
            port,
            tls: None,
            validator: &Connected,
        };
        assert!(execute("127.0.0.1", plan, &options(1000)).await.is_ok());
    }

    #[tokio::test]
    async fn test_banner_without_newline_is_still_checked() {
        let port = serve_once(b"220 ftp ready").await;
        let validator = BannerContains::new("220", "an FTP server");
        let plan = CheckPlan {
            port,
            tls: None,
            validator: &validator,
        };
        assert!(execute("127.0.0.1", plan, &options(1000)).await.is_ok());
    }

    #[tokio::test]
    async fn test_closed_without_banner() {
        let port = serve_once(b"").await;
        let validator = BannerContains::new("SMTP", "an SMTP server");
        let plan = CheckPlan {
            port,
            tls: None,
            validator: &validator,
        };
        let err = execute("127.0.0.1", plan, &options(1000)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_oversized_banner_is_truncated() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let junk = vec![b'x'; 10_000];
                let _ = stream.write_all(&junk).await;
                let _ = stream.write_all(b" SMTP\r\n").await;
            }
        });

        let validator = BannerContains::new("SMTP", "an SMTP server");
        let plan = CheckPlan {
            port,
            tls: None,
            validator: &validator,
        };
        let err = execute("127.0.0.1", plan, &options(1000)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
