//! IMAPS mailbox source.
//!
//! Every call opens its own TLS session, selects the folder, runs one
//! `SEARCH` and fetches the matching messages as `RFC822` in a single round
//! trip. The session is logged out before the batch is returned.

use std::net::TcpStream;

use native_tls::{TlsConnector, TlsStream};
use tracing::{debug, warn};

use crate::config::SourceConfig;
use crate::error::{Result, SiteError};
use crate::model::message::Message;
use crate::parser::mime;

use super::MailSource;

pub const DEFAULT_PORT: u16 = 993;
pub const DEFAULT_FOLDER: &str = "INBOX";
/// Environment variable consulted when no password is configured.
pub const PASSWORD_ENV: &str = "MAILSITE_PASSWORD";

type Session = imap::Session<TlsStream<TcpStream>>;

/// Host and port of an IMAPS server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImapServer {
    pub host: String,
    pub port: u16,
}

impl ImapServer {
    /// Parse `imaps://host[:port]` or a bare `host[:port]`.
    pub fn parse(url: &str) -> Result<Self> {
        let rest = match url.split_once("://") {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("imaps") => rest,
            Some((scheme, _)) => {
                return Err(SiteError::Config(format!(
                    "mailbox url '{url}': unsupported scheme '{scheme}', expected imaps"
                )))
            }
            None => url,
        };
        let authority = rest.trim_end_matches('/');
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|e| {
                    SiteError::Config(format!("mailbox url '{url}': bad port '{port}': {e}"))
                })?;
                (host, port)
            }
            None => (authority, DEFAULT_PORT),
        };
        if host.is_empty() || host.contains(['/', '@', ' ']) {
            return Err(SiteError::Config(format!(
                "mailbox url '{url}' has no usable host"
            )));
        }
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

/// One folder of a remote mailbox.
pub struct ImapSource {
    server: ImapServer,
    username: String,
    password: String,
    folder: String,
}

impl ImapSource {
    pub fn new(
        server: ImapServer,
        username: impl Into<String>,
        password: impl Into<String>,
        folder: impl Into<String>,
    ) -> Self {
        Self {
            server,
            username: username.into(),
            password: password.into(),
            folder: folder.into(),
        }
    }

    /// Build from `[source]`. The password falls back to `$MAILSITE_PASSWORD`.
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| SiteError::Config("source.url is required".into()))?;
        let username = config
            .username
            .clone()
            .ok_or_else(|| SiteError::Config("source.username is required".into()))?;
        let password = match &config.password {
            Some(password) => password.clone(),
            None => std::env::var(PASSWORD_ENV).map_err(|_| {
                SiteError::Config(format!(
                    "no mailbox password: set source.password or ${PASSWORD_ENV}"
                ))
            })?,
        };
        let folder = config
            .folder
            .clone()
            .unwrap_or_else(|| DEFAULT_FOLDER.to_string());
        Ok(Self::new(ImapServer::parse(url)?, username, password, folder))
    }

    fn connect(&self) -> Result<Session> {
        let tls = TlsConnector::builder().build()?;
        let host = self.server.host.as_str();
        let client = imap::connect((host, self.server.port), host, &tls)?;
        let mut session = client
            .login(&self.username, &self.password)
            .map_err(|(e, _)| e)?;
        let mailbox = session.select(&self.folder)?;
        debug!(
            host,
            folder = %self.folder,
            exists = mailbox.exists,
            "Selected mailbox folder"
        );
        Ok(session)
    }

    fn collect(&self, query: &str) -> Result<Vec<Message>> {
        let mut session = self.connect()?;
        let fetched = fetch_matching(&mut session, query);
        if let Err(e) = session.logout() {
            warn!(host = %self.server.host, error = %e, "IMAP logout failed");
        }
        fetched
    }
}

impl MailSource for ImapSource {
    fn describe(&self) -> String {
        format!(
            "imaps {}@{}:{}/{}",
            self.username, self.server.host, self.server.port, self.folder
        )
    }

    fn messages(&mut self) -> Result<Vec<Message>> {
        self.collect("ALL")
    }

    /// Searched on the server with `SUBJECT`.
    fn search_subject(&mut self, subject: &str) -> Result<Vec<Message>> {
        self.collect(&subject_query(subject))
    }
}

fn fetch_matching(session: &mut Session, query: &str) -> Result<Vec<Message>> {
    let mut ids: Vec<u32> = session.search(query)?.into_iter().collect();
    debug!(query, count = ids.len(), "IMAP search");
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    ids.sort_unstable();

    let fetches = session.fetch(sequence_set(&ids), "RFC822")?;
    let mut bodies: Vec<(u32, &[u8])> = fetches
        .iter()
        .filter_map(|fetch| match fetch.body() {
            Some(body) => Some((fetch.message, body)),
            None => {
                warn!(seq = fetch.message, "Fetched message has no body");
                None
            }
        })
        .collect();
    bodies.sort_by_key(|(seq, _)| *seq);

    Ok(bodies
        .into_iter()
        .filter_map(|(seq, raw)| {
            let message = mime::parse_message(raw);
            if message.is_none() {
                warn!(seq, "Skipping unparseable message");
            }
            message
        })
        .collect())
}

/// Compress sorted sequence numbers into an IMAP set: `1,2,3,7` → `1:3,7`.
pub fn sequence_set(ids: &[u32]) -> String {
    let mut ranges: Vec<(u32, u32)> = Vec::new();
    for &id in ids {
        match ranges.last_mut() {
            Some((_, end)) if id == *end + 1 => *end = id,
            Some((_, end)) if id == *end => {}
            _ => ranges.push((id, id)),
        }
    }
    ranges
        .iter()
        .map(|&(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{start}:{end}")
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// `SEARCH` criteria matching `subject` as a quoted string.
pub fn subject_query(subject: &str) -> String {
    let quoted = subject.replace('\\', "\\\\").replace('"', "\\\"");
    if subject.is_ascii() {
        format!("SUBJECT \"{quoted}\"")
    } else {
        format!("CHARSET UTF-8 SUBJECT \"{quoted}\"")
    }
}
