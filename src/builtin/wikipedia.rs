//! Wikipedia fact-checking tool
//!
//! Asks the model to search Wikipedia for a question and report whether the
//! article it found actually answers it.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::Result;
use crate::llm::{LlmClient, parse_model_json};
use crate::tools::{Arguments, ParamType, ParameterSpec, Tool, ToolDescriptor, ToolEnv, required_str};

use super::setting_u64;

const DESCRIPTION: &str = "Only call this function when the user explicitly requests verification or a citation \
from Wikipedia, or asks what Wikipedia says about a claim or topic. Do NOT call it for ordinary factual questions \
you can answer directly (simple math, definitions, translations, general explanations). Triggers: 'What does \
Wikipedia say about...', 'fact-check', 'verify with Wikipedia', 'is it true that...'.";

/// Web searches are slow; allow more than the dispatcher default
const DEFAULT_TIMEOUT_MS: u64 = 120_000;

/// Whether the article found answers the question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Verdict {
    Yes,
    Inconclusive,
    NoArticleFound,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::Inconclusive => "inconclusive",
            Self::NoArticleFound => "no_article_found",
        }
    }
}

/// Shape the model is asked to return
#[derive(Debug, Deserialize)]
struct FactCheck {
    answer: Option<String>,
    wikipedia_link: Option<String>,
    article_answers_question: Verdict,
}

impl FactCheck {
    fn summary(&self) -> String {
        let answer = self.answer.as_deref().unwrap_or("");
        let link = self.wikipedia_link.as_deref().unwrap_or("");
        match self.article_answers_question {
            Verdict::NoArticleFound => "No relevant Wikipedia article found to answer the question.".to_string(),
            Verdict::Inconclusive => format!(
                "Found a Wikipedia article but it does not conclusively answer the question.\nClosest answer: {}\nLink: {}",
                answer, link
            ),
            Verdict::Yes => format!("{}\nSource: {}", answer, link),
        }
    }
}

/// Checks a question or claim against Wikipedia
pub struct WikipediaFactCheckTool {
    llm: Arc<dyn LlmClient>,
    model: String,
    timeout_ms: u64,
}

impl WikipediaFactCheckTool {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Build from manifest settings (`model`, `timeout_ms`)
    pub fn from_settings(env: &ToolEnv, settings: &toml::Table) -> Result<Self> {
        let mut tool = Self::new(env.llm()?, env.model(settings));
        if let Some(timeout_ms) = setting_u64(settings, "timeout_ms")? {
            tool.timeout_ms = timeout_ms;
        }
        Ok(tool)
    }

    fn prompt(question: &str) -> String {
        format!(
            "Search Wikipedia to find information about: '{}'. \
             Find the most relevant Wikipedia article for this question or claim. \
             If you find one, read it and answer the question based on the article content in a full sentence. \
             Return ONLY valid JSON with this exact format:\n\n\
             {{\n  \"answer\": string or null,\n  \"wikipedia_link\": string or null,\n  \
             \"article_answers_question\": \"Yes\" | \"Inconclusive\" | \"NoArticleFound\"\n}}\n\n\
             Use \"Yes\" when the article conclusively answers the question, \"Inconclusive\" when a related \
             article exists but does not clearly answer it, and \"NoArticleFound\" when there is no relevant article. \
             Do not include commentary. Do not include markdown.",
            question
        )
    }
}

#[async_trait]
impl Tool for WikipediaFactCheckTool {
    fn describe(&self) -> ToolDescriptor {
        ToolDescriptor::new("check_fact_wikipedia", DESCRIPTION)
            .with_param(ParameterSpec::required(
                "question",
                ParamType::String,
                "The fact or question to check against Wikipedia. Example: 'What is the capital of France?'",
            ))
            .with_timeout(self.timeout_ms)
    }

    async fn execute(&self, args: Arguments) -> Result<Value> {
        let question = required_str(&args, "question")?;
        debug!("Fact-checking against Wikipedia: {}", question);

        let raw = self.llm.web_search(&self.model, &Self::prompt(question)).await?;
        let check: FactCheck = parse_model_json(&raw)?;

        Ok(json!({
            "answer": check.answer,
            "verdict": check.article_answers_question.as_str(),
            "wikipedia_link": check.wikipedia_link,
            "summary": check.summary(),
        }))
    }
}
