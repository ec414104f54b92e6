//! Line-oriented I/O over a plaintext or TLS socket, with a per-operation timeout.

use crate::core::error::ProbeError;
use crate::probe::tls::server_name;
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::timeout;
use tokio_rustls::TlsConnector;

/// Longest response line accepted from a server.
const MAX_LINE_LEN: u64 = 8192;

/// Most lines accepted in one multi-line response.
const MAX_REPLY_LINES: usize = 256;

/// Most bytes accepted in one multi-line response.
const MAX_REPLY_BYTES: usize = 64 * 1024;

/// Lines of one multi-line response, bounded in count and total size.
#[derive(Debug, Default)]
pub struct ReplyLines {
    lines: Vec<String>,
    bytes: usize,
}

impl ReplyLines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: String) -> Result<(), ProbeError> {
        self.bytes += line.len();
        if self.lines.len() >= MAX_REPLY_LINES || self.bytes > MAX_REPLY_BYTES {
            return Err(ProbeError::Rejected("response too long".to_string()));
        }
        self.lines.push(line);
        Ok(())
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// Anything a mail dialog can run over.
pub trait MailStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> MailStream for T {}

pub struct LineStream {
    /// `None` once a failed TLS upgrade consumed the socket.
    reader: Option<BufReader<Box<dyn MailStream>>>,
    timeout: Duration,
    encrypted: bool,
}

impl LineStream {
    pub fn new(stream: Box<dyn MailStream>, timeout: Duration, encrypted: bool) -> Self {
        Self {
            reader: Some(BufReader::new(stream)),
            timeout,
            encrypted,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    fn reader(&mut self) -> Result<&mut BufReader<Box<dyn MailStream>>, ProbeError> {
        self.reader.as_mut().ok_or_else(|| {
            ProbeError::Connection(io::Error::new(
                io::ErrorKind::NotConnected,
                "connection lost during TLS upgrade",
            ))
        })
    }

    async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T, ProbeError>
    where
        F: Future<Output = io::Result<T>>,
    {
        match timeout(limit, fut).await {
            Ok(result) => result.map_err(ProbeError::from),
            Err(_) => Err(ProbeError::Timeout(limit)),
        }
    }

    /// Reads one line, without its line terminator.
    pub async fn read_line(&mut self) -> Result<String, ProbeError> {
        let limit = self.timeout;
        let reader = self.reader()?;
        let mut buf = Vec::new();
        let read = Self::bounded(limit, async {
            let mut limited = reader.take(MAX_LINE_LEN);
            limited.read_until(b'\n', &mut buf).await
        })
        .await?;

        if read == 0 {
            return Err(ProbeError::Connection(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "server closed the connection",
            )));
        }
        if buf.last() != Some(&b'\n') && read as u64 >= MAX_LINE_LEN {
            return Err(ProbeError::Rejected("response line too long".to_string()));
        }

        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\r', '\n']).to_string();
        tracing::trace!(target: "probe", "S: {}", line);
        Ok(line)
    }

    /// Writes one command line followed by CRLF.
    pub async fn send_line(&mut self, line: &str) -> Result<(), ProbeError> {
        tracing::trace!(target: "probe", "C: {}", line);
        let limit = self.timeout;
        let writer = self.reader()?.get_mut();
        let payload = format!("{}\r\n", line);
        Self::bounded(limit, async {
            writer.write_all(payload.as_bytes()).await?;
            writer.flush().await
        })
        .await
    }

    /// Wraps the socket in TLS. Fails if the stream is already encrypted.
    pub async fn start_tls(
        &mut self,
        connector: &TlsConnector,
        hostname: &str,
    ) -> Result<(), ProbeError> {
        if self.encrypted {
            return Err(ProbeError::AlreadyEncrypted);
        }
        let name = server_name(hostname)
            .ok_or_else(|| ProbeError::Tls(format!("invalid server name '{}'", hostname)))?;

        let reader = self.reader.take().ok_or_else(|| {
            ProbeError::Connection(io::Error::new(
                io::ErrorKind::NotConnected,
                "connection already lost",
            ))
        })?;
        if !reader.buffer().is_empty() {
            // Plaintext pipelined behind the upgrade reply must not leak into the TLS session.
            return Err(ProbeError::Rejected(
                "server sent data after the TLS upgrade reply".to_string(),
            ));
        }

        let socket = reader.into_inner();
        let tls = match timeout(self.timeout, connector.connect(name, socket)).await {
            Ok(Ok(tls)) => tls,
            Ok(Err(e)) => return Err(ProbeError::Tls(e.to_string())),
            Err(_) => return Err(ProbeError::Timeout(self.timeout)),
        };

        let socket: Box<dyn MailStream> = Box::new(tls);
        self.reader = Some(BufReader::new(socket));
        self.encrypted = true;
        Ok(())
    }

    /// Best-effort shutdown; errors are ignored since the data is already read.
    pub async fn shutdown(&mut self) {
        let limit = self.timeout;
        if let Some(reader) = self.reader.as_mut() {
            let _ = timeout(limit, reader.get_mut().shutdown()).await;
        }
    }
}
