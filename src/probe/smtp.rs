//! The SMTP subset needed to read capabilities: greeting, `EHLO`, `STARTTLS`, `QUIT`.

use crate::core::error::ProbeError;
use crate::probe::stream::{LineStream, ReplyLines};

/// A complete, possibly multi-line, SMTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl SmtpReply {
    /// Whether an EHLO reply lists `keyword` as a service extension.
    pub fn has_extension(&self, keyword: &str) -> bool {
        self.lines.iter().skip(1).any(|line| {
            line.split_whitespace()
                .next()
                .is_some_and(|k| k.eq_ignore_ascii_case(keyword))
        })
    }

    /// Extension lines of an EHLO reply, without the leading server name line.
    pub fn extensions(&self) -> String {
        self.lines.iter().skip(1).cloned().collect::<Vec<_>>().join("\n")
    }
}

pub async fn read_reply(stream: &mut LineStream) -> Result<SmtpReply, ProbeError> {
    let mut code = None;
    let mut lines = ReplyLines::new();
    loop {
        let line = stream.read_line().await?;
        let (status, rest) = match (line.get(..3), line.get(3..)) {
            (Some(status), Some(rest)) => (status, rest),
            _ => return Err(ProbeError::Rejected(format!("malformed SMTP reply '{}'", line))),
        };
        let status: u16 = status
            .parse()
            .map_err(|_| ProbeError::Rejected(format!("malformed SMTP reply '{}'", line)))?;
        if *code.get_or_insert(status) != status {
            return Err(ProbeError::Rejected(
                "inconsistent status codes in multi-line reply".to_string(),
            ));
        }
        let more = rest.starts_with('-');
        lines.push(rest.get(1..).unwrap_or_default().to_string())?;
        if !more {
            break;
        }
    }
    Ok(SmtpReply {
        code: code.unwrap_or_default(),
        lines: lines.into_lines(),
    })
}

async fn expect(stream: &mut LineStream, code: u16, what: &str) -> Result<SmtpReply, ProbeError> {
    let reply = read_reply(stream).await?;
    if reply.code != code {
        return Err(ProbeError::Rejected(format!(
            "{} answered {} {}",
            what,
            reply.code,
            reply.lines.first().map(String::as_str).unwrap_or_default()
        )));
    }
    Ok(reply)
}

pub async fn greeting(stream: &mut LineStream) -> Result<(), ProbeError> {
    expect(stream, 220, "greeting").await.map(|_| ())
}

/// Sends `EHLO`. `None` when the server refuses it, as HELO-only servers do.
pub async fn ehlo(
    stream: &mut LineStream,
    client_name: &str,
) -> Result<Option<SmtpReply>, ProbeError> {
    stream.send_line(&format!("EHLO {}", client_name)).await?;
    let reply = read_reply(stream).await?;
    if reply.code == 250 {
        return Ok(Some(reply));
    }
    tracing::debug!(target: "probe", "EHLO refused with {}", reply.code);
    Ok(None)
}

pub async fn starttls(stream: &mut LineStream) -> Result<(), ProbeError> {
    stream.send_line("STARTTLS").await?;
    expect(stream, 220, "STARTTLS").await.map(|_| ())
}

pub async fn quit(stream: &mut LineStream) {
    if stream.send_line("QUIT").await.is_ok() {
        let _ = read_reply(stream).await;
    }
}
