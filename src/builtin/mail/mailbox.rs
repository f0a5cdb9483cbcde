//! Mailbox access over IMAP
//!
//! `ImapMailbox` logs in with credentials read from the environment, runs a
//! date-range search, and parses each RFC 822 message into an `Email`. The
//! `imap` client is blocking, so every fetch runs on the blocking pool.

use async_trait::async_trait;
use chrono::NaiveDate;
use log::debug;
use mailparse::{DispositionType, MailHeaderMap, ParsedMail};
use serde::{Deserialize, Serialize};

use crate::config::MailConfig;
use crate::error::{Result, ThursdayError};

/// Bodies longer than this many characters are cut
const BODY_LIMIT: usize = 1000;

const NO_BODY: &str = "[No readable body]";

/// A message as handed to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Email {
    pub sender: String,
    pub subject: String,
    pub date_sent: String,
    pub body: String,
}

/// The mailbox operations the mail tool needs
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Messages received on or after `since` and strictly before `before`
    async fn fetch_emails(&self, since: NaiveDate, before: NaiveDate) -> Result<Vec<Email>>;
}

/// IMAP-over-TLS mailbox
#[derive(Clone)]
pub struct ImapMailbox {
    host: String,
    port: u16,
    mailbox: String,
    username: String,
    password: String,
}

impl ImapMailbox {
    /// Create a mailbox, reading credentials from the configured variables
    pub fn from_config(config: &MailConfig) -> Result<Self> {
        let host = config
            .host
            .clone()
            .ok_or_else(|| ThursdayError::Config("mail.host not set".to_string()))?;
        let username = env_var(&config.username_env)?;
        let password = env_var(&config.password_env)?;

        Ok(Self::new(host, config.port, config.mailbox.clone(), username, password))
    }

    pub fn new(
        host: impl Into<String>,
        port: u16,
        mailbox: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            mailbox: mailbox.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    fn fetch_blocking(&self, criteria: &str) -> Result<Vec<Email>> {
        let tls = native_tls::TlsConnector::builder().build().map_err(mail_err)?;
        let client = imap::connect((self.host.as_str(), self.port), &self.host, &tls).map_err(mail_err)?;
        let mut session = client
            .login(&self.username, &self.password)
            .map_err(|(e, _)| mail_err(e))?;

        session.select(&self.mailbox).map_err(mail_err)?;

        let mut ids: Vec<u32> = session.search(criteria).map_err(mail_err)?.into_iter().collect();
        ids.sort_unstable();
        debug!("IMAP search '{}' matched {} message(s)", criteria, ids.len());

        let mut emails = Vec::with_capacity(ids.len());
        if !ids.is_empty() {
            let messages = session.fetch(sequence_set(&ids), "RFC822").map_err(mail_err)?;
            for message in messages.iter() {
                if let Some(raw) = message.body() {
                    emails.push(parse_email(raw)?);
                }
            }
        }

        if let Err(e) = session.logout() {
            debug!("IMAP logout failed: {}", e);
        }
        Ok(emails)
    }
}

#[async_trait]
impl Mailbox for ImapMailbox {
    async fn fetch_emails(&self, since: NaiveDate, before: NaiveDate) -> Result<Vec<Email>> {
        let criteria = search_criteria(since, before);
        let mailbox = self.clone();

        tokio::task::spawn_blocking(move || mailbox.fetch_blocking(&criteria))
            .await
            .map_err(|e| ThursdayError::Mail(format!("mail task failed: {}", e)))?
    }
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| ThursdayError::Config(format!("environment variable {} not set", name)))
}

fn mail_err(e: impl std::fmt::Display) -> ThursdayError {
    ThursdayError::Mail(e.to_string())
}

/// IMAP SEARCH criteria for a date window
fn search_criteria(since: NaiveDate, before: NaiveDate) -> String {
    format!("SINCE {} BEFORE {}", since.format("%d-%b-%Y"), before.format("%d-%b-%Y"))
}

fn sequence_set(ids: &[u32]) -> String {
    ids.iter().map(u32::to_string).collect::<Vec<_>>().join(",")
}

/// Parse a raw RFC 822 message
pub(crate) fn parse_email(raw: &[u8]) -> Result<Email> {
    let parsed = mailparse::parse_mail(raw).map_err(mail_err)?;
    let header = |name: &str| parsed.headers.get_first_value(name).unwrap_or_default();

    let body = plain_text_body(&parsed).unwrap_or_else(|| NO_BODY.to_string());

    Ok(Email {
        sender: header("From"),
        subject: header("Subject"),
        date_sent: header("Date"),
        body: truncate_body(body.trim()),
    })
}

fn plain_text_body(mail: &ParsedMail) -> Option<String> {
    if mail.subparts.is_empty() {
        return mail.get_body().ok();
    }
    find_plain_text(mail)
}

/// Depth-first search for the first inline text/plain part
fn find_plain_text(mail: &ParsedMail) -> Option<String> {
    for part in &mail.subparts {
        if matches!(part.get_content_disposition().disposition, DispositionType::Attachment) {
            continue;
        }
        if part.subparts.is_empty() {
            if part.ctype.mimetype == "text/plain" {
                if let Ok(body) = part.get_body() {
                    return Some(body);
                }
            }
        } else if let Some(body) = find_plain_text(part) {
            return Some(body);
        }
    }
    None
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() <= BODY_LIMIT {
        return body.to_string();
    }
    let cut: String = body.chars().take(BODY_LIMIT).collect();
    format!("{}... [truncated]", cut)
}
