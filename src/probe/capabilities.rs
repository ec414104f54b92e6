//! Parsing of advertised authentication mechanisms.
//!
//! Each protocol lists mechanisms differently: SMTP in the `AUTH` keyword of
//! the EHLO reply, IMAP as `AUTH=<mech>` capability atoms, POP3 on the `SASL`
//! line of the CAPA listing. Only tokens from those places are matched, in a
//! single pass against one alternation whose named groups tag the category.
//! The first token seen for a category is kept.

use crate::core::models::{AuthCapabilities, AuthCategory, Protocol};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

const MECHANISMS: &str = concat!(
    r"(?P<password_cleartext>PLAIN|LOGIN)|(?P<password_encrypted>CRAM-MD5)",
    r"|(?P<ntlm>NTLM|MSN)|(?P<gssapi>GSSAPI)",
);

/// SMTP and POP3 list bare mechanism names; legacy SMTP servers also send `AUTH=LOGIN`.
static BARE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)^(?:AUTH=)?(?:{})$", MECHANISMS))
        .expect("Bare mechanism regex failed to compile. This is a bug.")
});

static IMAP_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)^AUTH=(?:{})$", MECHANISMS))
        .expect("IMAP mechanism regex failed to compile. This is a bug.")
});

const GROUPS: [(&str, AuthCategory); 4] = [
    ("password_cleartext", AuthCategory::PasswordCleartext),
    ("password_encrypted", AuthCategory::PasswordEncrypted),
    ("ntlm", AuthCategory::Ntlm),
    ("gssapi", AuthCategory::Gssapi),
];

fn tagged(caps: &Captures<'_>) -> Option<(AuthCategory, String)> {
    GROUPS.iter().find_map(|(name, category)| {
        caps.name(name).map(|m| (*category, m.as_str().to_string()))
    })
}

/// Tokens of the lines introduced by `keyword`, without the keyword itself.
/// A line starting with `<keyword>=` is taken whole.
fn keyword_tokens<'a>(listing: &'a str, keyword: &str) -> Vec<&'a str> {
    let mut tokens = Vec::new();
    for line in listing.lines() {
        let mut words = line.split_whitespace();
        let Some(first) = words.next() else {
            continue;
        };
        if first.eq_ignore_ascii_case(keyword) {
            tokens.extend(words);
        } else if first
            .get(..keyword.len() + 1)
            .and_then(|head| head.strip_suffix('='))
            .is_some_and(|head| head.eq_ignore_ascii_case(keyword))
        {
            tokens.push(first);
            tokens.extend(words);
        }
    }
    tokens
}

fn parse_with<'a, I>(pattern: &Regex, tokens: I) -> AuthCapabilities
where
    I: IntoIterator<Item = &'a str>,
{
    let mut capabilities = AuthCapabilities::default();
    for token in tokens {
        if let Some((category, mechanism)) = pattern.captures(token).as_ref().and_then(tagged) {
            capabilities.fill(category, &mechanism);
        }
    }
    capabilities
}

/// Parses an SMTP EHLO reply body.
pub fn parse_smtp(listing: &str) -> AuthCapabilities {
    parse_with(&BARE_TOKEN, keyword_tokens(listing, "AUTH"))
}

/// Parses IMAP capability atoms.
pub fn parse_imap(listing: &str) -> AuthCapabilities {
    parse_with(&IMAP_TOKEN, listing.split_whitespace())
}

/// Parses a POP3 CAPA listing.
pub fn parse_pop3(listing: &str) -> AuthCapabilities {
    parse_with(&BARE_TOKEN, keyword_tokens(listing, "SASL"))
}

pub fn parse(protocol: Protocol, listing: &str) -> AuthCapabilities {
    match protocol {
        Protocol::Smtp => parse_smtp(listing),
        Protocol::Imap => parse_imap(listing),
        Protocol::Pop3 => parse_pop3(listing),
    }
}
