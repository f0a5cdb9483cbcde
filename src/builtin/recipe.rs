//! Recipe suggestion tool using web search

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::Result;
use crate::llm::{LlmClient, parse_model_json};
use crate::tools::{Arguments, ParamType, ParameterSpec, Tool, ToolDescriptor, ToolEnv, required_str};

use super::{setting_str, setting_u64};

const DEFAULT_SITE: &str = "www.chefkoch.de";
const DEFAULT_COUNT: u64 = 3;
const DEFAULT_TIMEOUT_MS: u64 = 180_000;

/// A recipe extracted from the web
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    /// One paragraph describing the meal and why it fits the request
    #[serde(default)]
    pub description: String,
}

/// Models sometimes wrap the array in an object
#[derive(Deserialize)]
#[serde(untagged)]
enum RecipeList {
    Bare(Vec<Recipe>),
    Wrapped { recipes: Vec<Recipe> },
}

impl From<RecipeList> for Vec<Recipe> {
    fn from(list: RecipeList) -> Self {
        match list {
            RecipeList::Bare(recipes) | RecipeList::Wrapped { recipes } => recipes,
        }
    }
}

/// Finds and suggests recipes from a recipe site
pub struct RecipeSearchTool {
    llm: Arc<dyn LlmClient>,
    model: String,
    site: String,
    count: u64,
    timeout_ms: u64,
}

impl RecipeSearchTool {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
            site: DEFAULT_SITE.to_string(),
            count: DEFAULT_COUNT,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Build from manifest settings (`model`, `site`, `count`, `timeout_ms`)
    pub fn from_settings(env: &ToolEnv, settings: &toml::Table) -> Result<Self> {
        let mut tool = Self::new(env.llm()?, env.model(settings));
        if let Some(site) = setting_str(settings, "site")? {
            tool.site = site.to_string();
        }
        if let Some(count) = setting_u64(settings, "count")? {
            tool.count = count;
        }
        if let Some(timeout_ms) = setting_u64(settings, "timeout_ms")? {
            tool.timeout_ms = timeout_ms;
        }
        Ok(tool)
    }

    fn prompt(&self, description: &str) -> String {
        format!(
            "Use a web search to find exactly {count} different recipes on {site} that match this description: '{description}'. \
             Make sure they are {count} different meals, not the same meal by different users or with similar names. \
             For each result, open the recipe page and extract its data. \
             Return ONLY valid JSON: an array of recipe objects, each in this format:\n\n\
             {{\n  \"title\": string,\n  \"link\": string,\n  \"ingredients\": [string, ...],\n  \
             \"instructions\": [string, ...],\n  \"description\": string\n}}\n\n\
             The description is one concise paragraph describing the meal, explaining why it matches the request \
             and selling it to the user. Do not include commentary. Do not include markdown.",
            count = self.count,
            site = self.site,
            description = description
        )
    }
}

/// Human-readable summary of the recipes
fn summarize(recipes: &[Recipe]) -> String {
    if recipes.is_empty() {
        return "No recipes found.".to_string();
    }
    recipes
        .iter()
        .enumerate()
        .map(|(i, r)| format!("Recipe {}: {}\n\n{}", i + 1, r.title, r.description))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Tool for RecipeSearchTool {
    fn describe(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "find_recipe_online",
            format!(
                "Finds and suggests {} food recipes online for the user. Can also be used to recommend food.",
                self.count
            ),
        )
        .with_param(ParameterSpec::required(
            "description_recipe",
            ParamType::String,
            "A description of the recipes the user wants. Example: 'A savory meal using potatoes and mushrooms, \
             inspired by Indian cuisine.' or 'Something very spicy. It must be lactose free.'",
        ))
        .with_timeout(self.timeout_ms)
    }

    async fn execute(&self, args: Arguments) -> Result<Value> {
        let description = required_str(&args, "description_recipe")?;
        debug!("Searching {} for recipes: {}", self.site, description);

        let raw = self.llm.web_search(&self.model, &self.prompt(description)).await?;
        let recipes: Vec<Recipe> = parse_model_json::<RecipeList>(&raw)?.into();

        Ok(json!({
            "answer": summarize(&recipes),
            "recipes": recipes,
        }))
    }
}
