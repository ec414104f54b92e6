//! The IMAP4rev1 subset needed to read capabilities: greeting, `CAPABILITY`,
//! `STARTTLS`, `LOGOUT`.

use crate::core::error::ProbeError;
use crate::probe::stream::{LineStream, ReplyLines};

/// Reads the untagged server greeting.
pub async fn greeting(stream: &mut LineStream) -> Result<(), ProbeError> {
    let line = stream.read_line().await?;
    let upper = line.to_ascii_uppercase();
    if upper.starts_with("* OK") || upper.starts_with("* PREAUTH") {
        Ok(())
    } else {
        Err(ProbeError::Rejected(format!("unexpected IMAP greeting '{}'", line)))
    }
}

/// Reads responses until the tagged completion for `tag`; returns the untagged lines.
async fn complete(stream: &mut LineStream, tag: &str) -> Result<Vec<String>, ProbeError> {
    let mut untagged = ReplyLines::new();
    let prefix = format!("{} ", tag);
    loop {
        let line = stream.read_line().await?;
        if let Some(status) = line.strip_prefix(&prefix) {
            if status.get(..2).is_some_and(|s| s.eq_ignore_ascii_case("OK")) {
                return Ok(untagged.into_lines());
            }
            return Err(ProbeError::Rejected(format!("{} {}", tag, status)));
        }
        if line.starts_with("* BYE") {
            return Err(ProbeError::Rejected(line));
        }
        untagged.push(line)?;
    }
}

/// Issues `CAPABILITY` and returns the advertised atoms, space separated.
pub async fn capability(stream: &mut LineStream, tag: &str) -> Result<String, ProbeError> {
    stream.send_line(&format!("{} CAPABILITY", tag)).await?;
    let untagged = complete(stream, tag).await?;
    let atoms: Vec<&str> = untagged
        .iter()
        .filter_map(|line| {
            line.get(..13)
                .filter(|head| head.eq_ignore_ascii_case("* CAPABILITY "))
                .map(|_| &line[13..])
        })
        .collect();
    if atoms.is_empty() {
        return Err(ProbeError::Rejected(
            "no CAPABILITY response from server".to_string(),
        ));
    }
    Ok(atoms.join(" ").to_ascii_uppercase())
}

/// Whether a capability listing offers the STARTTLS upgrade.
pub fn advertises_starttls(listing: &str) -> bool {
    listing
        .split_whitespace()
        .any(|atom| atom.eq_ignore_ascii_case("STARTTLS"))
}

pub async fn starttls(stream: &mut LineStream, tag: &str) -> Result<(), ProbeError> {
    stream.send_line(&format!("{} STARTTLS", tag)).await?;
    complete(stream, tag)
        .await
        .map(|_| ())
        .map_err(|_| ProbeError::Rejected("Couldn't establish TLS session".to_string()))
}

pub async fn logout(stream: &mut LineStream, tag: &str) {
    if stream.send_line(&format!("{} LOGOUT", tag)).await.is_ok() {
        let _ = complete(stream, tag).await;
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
    async fn greeting_accepts_ok_and_preauth() {
        let (mut stream, _server) = stream_with(b"* OK [CAPABILITY IMAP4rev1] ready\r\n").await;
        assert!(greeting(&mut stream).await.is_ok());
        let (mut stream, _server) = stream_with(b"* PREAUTH welcome\r\n").await;
        assert!(greeting(&mut stream).await.is_ok());
        let (mut stream, _server) = stream_with(b"* BYE go away\r\n").await;
        assert!(greeting(&mut stream).await.is_err());
    }

    #[tokio::test]
    async fn capability_collects_atoms() {
        let (mut stream, _server) = stream_with(
            b"* CAPABILITY IMAP4rev1 STARTTLS AUTH=PLAIN\r\n* CAPABILITY AUTH=LOGIN\r\na1 OK done\r\n",
        )
        .await;
        let listing = capability(&mut stream, "a1").await.unwrap();
        assert_eq!(listing, "IMAP4REV1 STARTTLS AUTH=PLAIN AUTH=LOGIN");
        assert!(advertises_starttls(&listing));
    }

    #[tokio::test]
    async fn capability_without_untagged_response_fails() {
        let (mut stream, _server) = stream_with(b"a1 OK done\r\n").await;
        assert!(matches!(
            capability(&mut stream, "a1").await,
            Err(ProbeError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn refused_starttls_is_rejected() {
        let (mut stream, _server) = stream_with(b"a2 BAD unknown command\r\n").await;
        assert!(matches!(
            starttls(&mut stream, "a2").await,
            Err(ProbeError::Rejected(_))
        ));
    }
}
