//! The POP3 subset needed to read capabilities: greeting, `CAPA` (RFC 2449),
//! `STLS` (RFC 2595), `QUIT`.

use crate::core::error::ProbeError;
use crate::probe::stream::{LineStream, ReplyLines};

fn is_ok(line: &str) -> bool {
    line.get(..3).is_some_and(|s| s.eq_ignore_ascii_case("+OK"))
}

pub async fn greeting(stream: &mut LineStream) -> Result<(), ProbeError> {
    let line = stream.read_line().await?;
    if is_ok(&line) {
        Ok(())
    } else {
        Err(ProbeError::Rejected(format!("unexpected POP3 greeting '{}'", line)))
    }
}

/// Issues `CAPA`. A server without CAPA support yields an empty listing.
pub async fn capa(stream: &mut LineStream) -> Result<String, ProbeError> {
    stream.send_line("CAPA").await?;
    let status = stream.read_line().await?;
    if !is_ok(&status) {
        tracing::debug!(target: "probe", "CAPA not supported: {}", status);
        return Ok(String::new());
    }
    let mut lines = ReplyLines::new();
    loop {
        let line = stream.read_line().await?;
        if line == "." {
            break;
        }
        // Undo byte-stuffing of lines starting with a dot.
        let line = line.strip_prefix('.').unwrap_or(&line);
        lines.push(line.to_string())?;
    }
    Ok(lines.into_lines().join("\n"))
}

/// Whether a CAPA listing offers the STLS upgrade.
pub fn advertises_stls(listing: &str) -> bool {
    listing
        .lines()
        .any(|line| line.trim().eq_ignore_ascii_case("STLS"))
}

pub async fn stls(stream: &mut LineStream) -> Result<(), ProbeError> {
    stream.send_line("STLS").await?;
    let line = stream.read_line().await?;
    if is_ok(&line) {
        Ok(())
    } else {
        Err(ProbeError::Rejected("Couldn't establish TLS session".to_string()))
    }
}

pub async fn quit(stream: &mut LineStream) {
    if stream.send_line("QUIT").await.is_ok() {
        let _ = stream.read_line().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{duplex, AsyncWriteExt, DuplexStream};

    async fn stream_with(script: &[u8]) -> (LineStream, DuplexStream) {
        let (client, mut server) = duplex(4096);
        server.write_all(script).await.unwrap();
        (
            LineStream::new(Box::new(client), Duration::from_secs(1), false),
            server,
        )
    }

    #[tokio::test]
    async fn capa_reads_multiline_listing() {
        let (mut stream, _server) = stream_with(
            b"+OK Capability list follows\r\nTOP\r\nUSER\r\nSASL PLAIN LOGIN\r\nSTLS\r\n..hidden\r\n.\r\n",
        )
        .await;
        let listing = capa(&mut stream).await.unwrap();
        assert_eq!(listing, "TOP\nUSER\nSASL PLAIN LOGIN\nSTLS\n.hidden");
        assert!(advertises_stls(&listing));
    }

    #[tokio::test]
    async fn capa_error_yields_empty_listing() {
        let (mut stream, _server) = stream_with(b"-ERR unknown command\r\n").await;
        assert_eq!(capa(&mut stream).await.unwrap(), "");
    }

    #[tokio::test]
    async fn refused_stls_is_rejected() {
        let (mut stream, _server) = stream_with(b"-ERR TLS not available\r\n").await;
        assert!(matches!(
            stls(&mut stream).await,
            Err(ProbeError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn greeting_must_be_positive() {
        let (mut stream, _server) = stream_with(b"+OK POP3 ready\r\n").await;
        assert!(greeting(&mut stream).await.is_ok());
        let (mut stream, _server) = stream_with(b"-ERR busy\r\n").await;
        assert!(greeting(&mut stream).await.is_err());
    }
}
