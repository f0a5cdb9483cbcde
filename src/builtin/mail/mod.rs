//! Email summary tool
//!
//! Fetches the user's messages for a window of days and asks the model to
//! summarize them, or to answer a question about them.

mod mailbox;

pub use mailbox::{Email, ImapMailbox, Mailbox};

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Days, Local, NaiveDate};
use log::debug;
use serde_json::{Value, json};

use crate::error::{Result, ThursdayError};
use crate::llm::LlmClient;
use crate::tools::{Arguments, ParamType, ParameterSpec, Tool, ToolDescriptor, ToolEnv, str_arg};

use super::setting_u64;

const SYSTEM_PROMPT: &str = "You are an AI assistant that helps users manage their emails by summarizing them \
or answering specific questions about them. You are given a list of the user's emails from a specified time \
horizon, and you either summarize them or answer the user's question about them. Always be concise and clear.";
const SUMMARY_TASK: &str = "Summarize the following list of emails for the user. Concentrate on important mails \
and actionable information for the user, and ignore unimportant emails.";
const QUESTION_TASK: &str = "Answer the following question about the user's emails, using the attached list of \
emails as context: ";
const DEFAULT_TIMEOUT_MS: u64 = 120_000;

/// Summarizes or answers questions about recent emails
pub struct MailSummarizerTool {
    llm: Arc<dyn LlmClient>,
    mailbox: Arc<dyn Mailbox>,
    model: String,
    timeout_ms: u64,
}

impl MailSummarizerTool {
    pub fn new(llm: Arc<dyn LlmClient>, mailbox: Arc<dyn Mailbox>, model: impl Into<String>) -> Self {
        Self {
            llm,
            mailbox,
            model: model.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Build from manifest settings (`model`, `timeout_ms`)
    pub fn from_settings(env: &ToolEnv, settings: &toml::Table) -> Result<Self> {
        let mut tool = Self::new(env.llm()?, env.mail()?, env.model(settings));
        if let Some(timeout_ms) = setting_u64(settings, "timeout_ms")? {
            tool.timeout_ms = timeout_ms;
        }
        Ok(tool)
    }
}

/// `[from, to]` as days ago, oldest first
fn day_range(args: &Arguments) -> Result<(u64, u64)> {
    let invalid = || {
        ThursdayError::Validation("days_from_to must be two non-negative integers [from, to]".to_string())
    };
    let days = args.get("days_from_to").and_then(Value::as_array).ok_or_else(invalid)?;
    let (from, to) = match days.as_slice() {
        [from, to] => (from.as_u64().ok_or_else(invalid)?, to.as_u64().ok_or_else(invalid)?),
        _ => return Err(invalid()),
    };
    if from < to {
        return Err(ThursdayError::Validation(format!(
            "days_from_to start ({}) must not be more recent than its end ({})",
            from, to
        )));
    }
    Ok((from, to))
}

/// Dates bounding the window: `since` inclusive, `before` exclusive
fn date_window(today: NaiveDate, from: u64, to: u64) -> Result<(NaiveDate, NaiveDate)> {
    let out_of_range = || ThursdayError::Validation(format!("days_from_to [{}, {}] is out of range", from, to));
    let since = today.checked_sub_days(Days::new(from)).ok_or_else(out_of_range)?;
    let before = today
        .checked_sub_days(Days::new(to))
        .and_then(|day| day.checked_add_days(Days::new(1)))
        .ok_or_else(out_of_range)?;
    Ok((since, before))
}

fn task(question: Option<&str>) -> String {
    match question.map(str::trim).filter(|q| !q.is_empty()) {
        Some(question) => format!("{}{}", QUESTION_TASK, question),
        None => SUMMARY_TASK.to_string(),
    }
}

#[async_trait]
impl Tool for MailSummarizerTool {
    fn describe(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "summarize_emails",
            "Summarizes the user's emails or answers questions about them. The input is the time horizon in days. \
             If the user has a specific question about their emails, answer that instead of summarizing them.",
        )
        .with_group("email")
        .with_param(ParameterSpec::required(
            "days_from_to",
            ParamType::Array,
            "Two integers [from, to]: how many days ago the window starts and ends. \
             For example [7, 0] covers the last week. Use [30, 0] for the last month.",
        ))
        .with_param(ParameterSpec::optional(
            "question",
            ParamType::String,
            "A specific question about the user's emails, for example 'What emails do I have from my boss?'. \
             Leave empty for a summary.",
        ))
        .with_timeout(self.timeout_ms)
    }

    async fn execute(&self, args: Arguments) -> Result<Value> {
        let (from, to) = day_range(&args)?;
        let (since, before) = date_window(Local::now().date_naive(), from, to)?;
        debug!("Fetching emails since {} before {}", since, before);

        let emails = self.mailbox.fetch_emails(since, before).await?;
        debug!("Fetched {} email(s)", emails.len());

        let request = json!({
            "task": task(str_arg(&args, "question")),
            "list_of_emails": emails,
        });
        let answer = self
            .llm
            .complete(&self.model, SYSTEM_PROMPT, &request.to_string())
            .await?;

        Ok(json!({
            "answer": answer.trim(),
            "emails": emails,
        }))
    }
}
