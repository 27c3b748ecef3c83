//! # SIP URI handling
//!
//! A compact SIP URI model for routing decisions. It keeps the components a
//! proxy needs to rewrite — user, password, host, port — plus the parameter
//! and header tails as raw substrings, so recomposition reproduces the
//! original byte-for-byte apart from the component being substituted.
//!
//! ```rust
//! use std::str::FromStr;
//! use siprelay_core::uri::Uri;
//!
//! let uri = Uri::from_str("sip:alice@example.com:5060;transport=udp").unwrap();
//! assert_eq!(uri.user.as_deref(), Some("alice"));
//! assert_eq!(uri.host, "example.com");
//! assert_eq!(uri.port, Some(5060));
//! ```

use std::fmt;
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while, take_while1},
    character::complete::{char, digit1},
    combinator::{all_consuming, map_res, opt, recognize, rest},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Upper bound for a recomposed Request-URI.
///
/// Rewrites that would exceed this bound fail without touching the message.
pub const MAX_URI_SIZE: usize = 1024;

/// Which URI component a rewrite substitutes.
///
/// `HostPort` and `UserPass` substitute the combined chunk verbatim; the
/// separately tracked half is dropped so the operand fully controls it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriPart {
    Host,
    HostPort,
    User,
    UserPass,
    Port,
}

/// SIP URI components.
///
/// `params` and `headers` hold the raw tails without their leading `;` / `?`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uri {
    /// User part (optional)
    pub user: Option<String>,
    /// Password (optional, deprecated)
    pub password: Option<String>,
    /// Host (required); IPv6 addresses keep their brackets
    pub host: String,
    /// Port (optional)
    pub port: Option<u16>,
    /// URI parameters after the first `;`
    pub params: Option<String>,
    /// URI headers after `?`
    pub headers: Option<String>,
}

fn scheme(input: &str) -> IResult<&str, &str> {
    terminated(alt((tag_no_case("sips"), tag_no_case("sip"))), char(':'))(input)
}

fn userinfo(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    terminated(
        pair(
            take_while1(|c: char| c != ':' && c != '@' && c != ';' && c != '?' && !c.is_whitespace()),
            opt(preceded(
                char(':'),
                take_while(|c: char| c != '@' && c != ';' && c != '?' && !c.is_whitespace()),
            )),
        ),
        char('@'),
    )(input)
}

fn host(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(delimited(char('['), take_while1(|c| c != ']'), char(']'))),
        take_while1(|c: char| c != ':' && c != ';' && c != '?' && !c.is_whitespace()),
    ))(input)
}

fn port(input: &str) -> IResult<&str, u16> {
    map_res(digit1, str::parse)(input)
}

impl Uri {
    /// Parse a `sip:` or `sips:` URI.
    ///
    /// The whole input must be consumed; trailing garbage is an error.
    pub fn parse(s: &str) -> Result<Self> {
        let parsed = all_consuming(tuple((
            scheme,
            opt(userinfo),
            host,
            opt(preceded(char(':'), port)),
            opt(preceded(char(';'), take_while(|c: char| c != '?'))),
            opt(preceded(char('?'), rest)),
        )))(s);

        let (_, (_, user, host, port, params, headers)) =
            parsed.map_err(|e| Error::invalid_uri(format!("{s}: {e}")))?;

        let (user, password) = match user {
            Some((u, p)) => (Some(u.to_string()), p.map(str::to_string)),
            None => (None, None),
        };

        Ok(Uri {
            user,
            password,
            host: host.to_string(),
            port,
            params: params.map(str::to_string),
            headers: headers.map(str::to_string),
        })
    }

    /// Host and effective port of this URI; `default_port` fills the gap.
    pub fn host_port(&self, default_port: u16) -> (&str, u16) {
        (&self.host, self.port.unwrap_or(default_port))
    }
}

impl FromStr for Uri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uri::parse(s)
    }
}

impl fmt::Display for Uri {
    /// Recomposition always uses the `sip:` scheme.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sip:")?;
        if let Some(user) = &self.user {
            write!(f, "{user}")?;
            if let Some(password) = &self.password {
                write!(f, ":{password}")?;
            }
            write!(f, "@")?;
        }
        write!(f, "{}", self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        if let Some(params) = &self.params {
            write!(f, ";{params}")?;
        }
        if let Some(headers) = &self.headers {
            write!(f, "?{headers}")?;
        }
        Ok(())
    }
}

/// Substitute one component of `current` and recompose the URI.
///
/// Everything not named by `part` is reproduced untouched. The result is
/// bounds-checked against [`MAX_URI_SIZE`]; on any error nothing is mutated
/// and the caller's message keeps its previous Request-URI.
pub fn rewrite_part(current: &str, part: UriPart, value: &str) -> Result<String> {
    let mut uri = Uri::parse(current)?;
    match part {
        UriPart::Host => uri.host = value.to_string(),
        UriPart::HostPort => {
            // operand carries host[:port] as one chunk
            uri.host = value.to_string();
            uri.port = None;
        }
        UriPart::User => {
            if value.is_empty() {
                uri.user = None;
                uri.password = None;
            } else {
                uri.user = Some(value.to_string());
            }
        }
        UriPart::UserPass => {
            // operand carries user[:password] as one chunk
            uri.user = if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            };
            uri.password = None;
        }
        UriPart::Port => {
            uri.port = if value.is_empty() {
                None
            } else {
                Some(
                    value
                        .parse()
                        .map_err(|_| Error::invalid_uri(format!("bad port: {value}")))?,
                )
            };
        }
    }

    let out = uri.to_string();
    if out.len() > MAX_URI_SIZE {
        return Err(Error::capacity(format!(
            "rewritten URI of {} bytes exceeds {}",
            out.len(),
            MAX_URI_SIZE
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_uri() {
        let uri = Uri::parse("sip:alice:secret@example.com:5070;transport=udp?subject=call").unwrap();
        assert_eq!(uri.user.as_deref(), Some("alice"));
        assert_eq!(uri.password.as_deref(), Some("secret"));
        assert_eq!(uri.host, "example.com");
        assert_eq!(uri.port, Some(5070));
        assert_eq!(uri.params.as_deref(), Some("transport=udp"));
        assert_eq!(uri.headers.as_deref(), Some("subject=call"));
    }

    #[test]
    fn parses_bare_host() {
        let uri = Uri::parse("sip:10.0.0.5").unwrap();
        assert_eq!(uri.user, None);
        assert_eq!(uri.host, "10.0.0.5");
        assert_eq!(uri.port, None);
    }

    #[test]
    fn parses_host_port_without_user() {
        // the userinfo parser must backtrack: there is no '@'
        let uri = Uri::parse("sip:proxy.example.com:5060").unwrap();
        assert_eq!(uri.user, None);
        assert_eq!(uri.host, "proxy.example.com");
        assert_eq!(uri.port, Some(5060));
    }

    #[test]
    fn parses_sips_and_recomposes_as_sip() {
        let uri = Uri::parse("sips:bob@example.com").unwrap();
        assert_eq!(uri.to_string(), "sip:bob@example.com");
    }

    #[test]
    fn parses_ipv6_host() {
        let uri = Uri::parse("sip:[2001:db8::1]:5060").unwrap();
        assert_eq!(uri.host, "[2001:db8::1]");
        assert_eq!(uri.port, Some(5060));
    }

    #[test]
    fn rejects_invalid_uris() {
        assert!(Uri::parse("").is_err(), "empty URI should be rejected");
        assert!(Uri::parse("example.com").is_err(), "missing scheme should be rejected");
        assert!(Uri::parse("http:example.com").is_err(), "non-SIP scheme should be rejected");
        assert!(Uri::parse("sip:").is_err(), "empty host should be rejected");
        assert!(Uri::parse("sip:host stray").is_err(), "trailing garbage should be rejected");
    }

    #[test]
    fn display_round_trips() {
        let s = "sip:alice@example.com:5060;transport=udp;lr?x=1";
        assert_eq!(Uri::parse(s).unwrap().to_string(), s);
    }

    #[test]
    fn rewrite_host_keeps_everything_else() {
        let out = rewrite_part("sip:alice@a.example.com:5070;lr", UriPart::Host, "b.example.com").unwrap();
        assert_eq!(out, "sip:alice@b.example.com:5070;lr");
    }

    #[test]
    fn rewrite_hostport_drops_old_port() {
        let out = rewrite_part("sip:alice@a.example.com:5070", UriPart::HostPort, "b.example.com:6000").unwrap();
        assert_eq!(out, "sip:alice@b.example.com:6000");
    }

    #[test]
    fn rewrite_user_keeps_password() {
        let out = rewrite_part("sip:alice:secret@example.com", UriPart::User, "bob").unwrap();
        assert_eq!(out, "sip:bob:secret@example.com");
    }

    #[test]
    fn rewrite_empty_user_removes_userinfo() {
        let out = rewrite_part("sip:alice:secret@example.com", UriPart::User, "").unwrap();
        assert_eq!(out, "sip:example.com");
    }

    #[test]
    fn rewrite_userpass_replaces_chunk() {
        let out = rewrite_part("sip:alice:old@example.com", UriPart::UserPass, "bob:new").unwrap();
        assert_eq!(out, "sip:bob:new@example.com");
    }

    #[test]
    fn rewrite_empty_port_removes_port() {
        let out = rewrite_part("sip:example.com:5070", UriPart::Port, "").unwrap();
        assert_eq!(out, "sip:example.com");
    }

    #[test]
    fn rewrite_rejects_bad_port() {
        assert!(rewrite_part("sip:example.com", UriPart::Port, "x").is_err());
    }

    #[test]
    fn rewrite_is_idempotent() {
        let once = rewrite_part("sip:alice@example.com:5070;lr", UriPart::Host, "h").unwrap();
        assert_eq!(Uri::parse(&once).unwrap().host, "h");
        let twice = rewrite_part(&once, UriPart::Host, "h").unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn rewrite_enforces_size_bound() {
        let huge = "h".repeat(MAX_URI_SIZE);
        let err = rewrite_part("sip:example.com", UriPart::Host, &huge).unwrap_err();
        assert_eq!(err.code(), -3);
    }
}
