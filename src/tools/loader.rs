//! Tool loading from a plugin directory
//!
//! Each `*.toml` file directly inside the plugin directory is a manifest that
//! names a tool `kind`. The kind is looked up in a factory table built at
//! compile time, so only explicitly registered constructors can produce tools.
//!
//! ```toml
//! kind = "wikipedia_fact_check"
//! name = "check_fact_wikipedia"   # optional
//! group = "general"               # optional
//! enabled = true                  # optional
//!
//! [settings]
//! model = "gpt-4o-mini"
//! ```
//!
//! A manifest that cannot be read, parsed, or instantiated is logged and
//! skipped. Two tools with the same name abort the whole load.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use serde::Deserialize;

use crate::builtin::{self, ImapMailbox, Mailbox, SpotifyApi, SpotifyClient};
use crate::config::Config;
use crate::error::{Result, ThursdayError};
use crate::llm::{LlmClient, OpenAiClient};

use super::Tool;
use super::registry::{RegisteredTool, Registry};

/// Model used by tools whose settings don't name one
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Constructor for one kind of tool
pub type ToolFactory = Box<dyn Fn(&ToolEnv, &toml::Table) -> Result<Arc<dyn Tool>> + Send + Sync>;

/// Shared services available to tool constructors
#[derive(Clone)]
pub struct ToolEnv {
    pub llm: Option<Arc<dyn LlmClient>>,
    pub spotify: Option<Arc<dyn SpotifyApi>>,
    pub mail: Option<Arc<dyn Mailbox>>,
    pub default_model: String,
}

impl ToolEnv {
    /// Environment with no services
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            llm: None,
            spotify: None,
            mail: None,
            default_model: default_model.into(),
        }
    }

    /// Build services from configuration, leaving out any that lack credentials
    pub fn from_config(config: &Config) -> Self {
        let mut env = Self::new(config.llm.model.clone());

        match OpenAiClient::from_config(&config.llm) {
            Ok(client) => env.llm = Some(Arc::new(client)),
            Err(e) => warn!("LLM client unavailable: {}", e),
        }

        match SpotifyClient::from_config(&config.spotify) {
            Ok(client) => env.spotify = Some(Arc::new(client)),
            Err(e) => warn!("Spotify client unavailable: {}", e),
        }

        if config.mail.host.is_none() {
            debug!("No mail host configured");
        } else {
            match ImapMailbox::from_config(&config.mail) {
                Ok(mailbox) => env.mail = Some(Arc::new(mailbox)),
                Err(e) => warn!("Mailbox unavailable: {}", e),
            }
        }

        env
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_spotify(mut self, spotify: Arc<dyn SpotifyApi>) -> Self {
        self.spotify = Some(spotify);
        self
    }

    pub fn with_mail(mut self, mail: Arc<dyn Mailbox>) -> Self {
        self.mail = Some(mail);
        self
    }

    /// LLM client, or an error naming what is missing
    pub fn llm(&self) -> Result<Arc<dyn LlmClient>> {
        self.llm
            .clone()
            .ok_or_else(|| ThursdayError::Config("no LLM client configured".to_string()))
    }

    /// Spotify client, or an error naming what is missing
    pub fn spotify(&self) -> Result<Arc<dyn SpotifyApi>> {
        self.spotify
            .clone()
            .ok_or_else(|| ThursdayError::Config("no Spotify client configured".to_string()))
    }

    pub fn mail(&self) -> Result<Arc<dyn Mailbox>> {
        self.mail
            .clone()
            .ok_or_else(|| ThursdayError::Config("no mailbox configured".to_string()))
    }

    /// Model from `settings.model`, else the environment default
    pub fn model(&self, settings: &toml::Table) -> String {
        settings
            .get("model")
            .and_then(toml::Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| self.default_model.clone())
    }
}

impl Default for ToolEnv {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

/// Table of tool constructors keyed by kind
#[derive(Default)]
pub struct ToolFactories {
    factories: BTreeMap<String, ToolFactory>,
}

impl ToolFactories {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with every tool shipped in this crate
    pub fn builtin() -> Self {
        let mut factories = Self::new();
        builtin::register_all(&mut factories);
        factories
    }

    /// Register a constructor, replacing any previous one for the kind
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&ToolEnv, &toml::Table) -> Result<Arc<dyn Tool>> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    /// Builder form of `register`
    pub fn with_factory<F>(mut self, kind: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&ToolEnv, &toml::Table) -> Result<Arc<dyn Tool>> + Send + Sync + 'static,
    {
        self.register(kind, factory);
        self
    }

    pub fn get(&self, kind: &str) -> Option<&ToolFactory> {
        self.factories.get(kind)
    }

    /// Registered kinds in sorted order
    pub fn kinds(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }
}

/// On-disk manifest
#[derive(Debug, Deserialize)]
struct ToolManifest {
    kind: String,
    name: Option<String>,
    group: Option<String>,
    #[serde(default = "enabled_by_default")]
    enabled: bool,
    #[serde(default)]
    settings: toml::Table,
}

fn enabled_by_default() -> bool {
    true
}

/// A manifest or builtin that was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    /// Manifest path or `<builtin:kind>`
    pub origin: String,
    pub reason: String,
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.origin, self.reason)
    }
}

/// Registry plus the entries that were skipped while building it
#[derive(Debug)]
pub struct LoadReport {
    pub registry: Registry,
    pub skipped: Vec<LoadFailure>,
}

/// Builds registries from manifests or from the factory table
pub struct ToolLoader {
    factories: ToolFactories,
    env: ToolEnv,
}

impl ToolLoader {
    /// Loader using the builtin factory table
    pub fn new(env: ToolEnv) -> Self {
        Self::with_factories(ToolFactories::builtin(), env)
    }

    /// Loader using a custom factory table
    pub fn with_factories(factories: ToolFactories, env: ToolEnv) -> Self {
        Self { factories, env }
    }

    pub fn factories(&self) -> &ToolFactories {
        &self.factories
    }

    /// Load every manifest in `dir` into a registry
    pub fn load(&self, dir: impl AsRef<Path>) -> Result<Registry> {
        Ok(self.load_report(dir)?.registry)
    }

    /// Load every manifest in `dir`, also returning what was skipped
    pub fn load_report(&self, dir: impl AsRef<Path>) -> Result<LoadReport> {
        let dir = dir.as_ref();
        let (paths, mut skipped) = manifest_paths(dir)?;
        info!("Loading {} tool manifest(s) from {}", paths.len(), dir.display());

        let mut registry = Registry::new();

        for path in paths {
            match self.load_manifest(&path) {
                Ok(Some(entry)) => {
                    debug!("Registered tool '{}' from {}", entry.name(), path.display());
                    registry.insert(entry)?;
                }
                Ok(None) => debug!("Skipping disabled manifest {}", path.display()),
                Err(e) => {
                    let err = ThursdayError::Load {
                        path: path.clone(),
                        reason: e.to_string(),
                    };
                    warn!("{}", err);
                    skipped.push(LoadFailure {
                        origin: path.display().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!("Loaded {} tool(s), skipped {}", registry.len(), skipped.len());
        Ok(LoadReport { registry, skipped })
    }

    /// Instantiate every registered kind with empty settings
    pub fn load_builtins(&self) -> Result<LoadReport> {
        let empty = toml::Table::new();
        let mut registry = Registry::new();
        let mut skipped = Vec::new();

        for kind in self.factories.kinds() {
            match self.instantiate(kind, &empty, None) {
                Ok(entry) => registry.insert(entry)?,
                Err(e) => {
                    warn!("Skipping builtin tool '{}': {}", kind, e);
                    skipped.push(LoadFailure {
                        origin: format!("<builtin:{}>", kind),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!("Loaded {} builtin tool(s), skipped {}", registry.len(), skipped.len());
        Ok(LoadReport { registry, skipped })
    }

    /// Parse and instantiate one manifest; `None` when disabled
    fn load_manifest(&self, path: &Path) -> Result<Option<RegisteredTool>> {
        let content = std::fs::read_to_string(path)?;
        let manifest: ToolManifest = toml::from_str(&content)?;

        if !manifest.enabled {
            return Ok(None);
        }

        let mut entry = self.instantiate(&manifest.kind, &manifest.settings, Some(path.to_path_buf()))?;
        if let Some(name) = manifest.name {
            entry.descriptor.name = name;
        }
        if let Some(group) = manifest.group {
            entry.descriptor.group = group;
        }
        entry.descriptor.check()?;

        Ok(Some(entry))
    }

    fn instantiate(&self, kind: &str, settings: &toml::Table, source: Option<PathBuf>) -> Result<RegisteredTool> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| ThursdayError::Config(format!("unknown tool kind '{}'", kind)))?;

        let tool = factory(&self.env, settings)?;
        let descriptor = tool.describe();
        descriptor.check()?;

        Ok(RegisteredTool::new(descriptor, tool, source))
    }
}

/// Manifest files directly inside `dir`, sorted by file name
fn manifest_paths(dir: &Path) -> Result<(Vec<PathBuf>, Vec<LoadFailure>)> {
    let entries = std::fs::read_dir(dir).map_err(|e| ThursdayError::ToolsDirectory {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    Ok(collect_manifests(dir, entries.map(|entry| entry.map(|e| e.path()))))
}

/// Keep `*.toml` regular files; unreadable entries become failures
fn collect_manifests(
    dir: &Path,
    entries: impl IntoIterator<Item = std::io::Result<PathBuf>>,
) -> (Vec<PathBuf>, Vec<LoadFailure>) {
    let mut paths = Vec::new();
    let mut failures = Vec::new();

    for entry in entries {
        match entry {
            Ok(path) => {
                if path.is_file() && path.extension().is_some_and(|ext| ext == "toml") {
                    paths.push(path);
                }
            }
            Err(e) => {
                warn!("Unreadable entry in {}: {}", dir.display(), e);
                failures.push(LoadFailure {
                    origin: dir.display().to_string(),
                    reason: format!("unreadable directory entry: {}", e),
                });
            }
        }
    }

    paths.sort();
    (paths, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{Arguments, ToolDescriptor};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use tempfile::tempdir;

    struct StubTool {
        name: String,
    }

    #[async_trait]
    impl Tool for StubTool {
        fn describe(&self) -> ToolDescriptor {
            ToolDescriptor::new(self.name.clone(), "Stub")
        }

        async fn execute(&self, _args: Arguments) -> Result<Value> {
            Ok(json!(self.name))
        }
    }

    fn stub_factories() -> ToolFactories {
        ToolFactories::new()
            .with_factory("stub", |_env: &ToolEnv, settings: &toml::Table| {
                let name = settings
                    .get("name")
                    .and_then(toml::Value::as_str)
                    .unwrap_or("stub")
                    .to_string();
                Ok(Arc::new(StubTool { name }) as Arc<dyn Tool>)
            })
            .with_factory("needs_llm", |env: &ToolEnv, _settings: &toml::Table| {
                env.llm()?;
                Ok(Arc::new(StubTool { name: "llm".into() }) as Arc<dyn Tool>)
            })
    }

    fn loader() -> ToolLoader {
        ToolLoader::with_factories(stub_factories(), ToolEnv::default())
    }

    fn write(dir: &Path, file: &str, content: &str) {
        std::fs::write(dir.join(file), content).unwrap();
    }

    #[test]
    fn test_load_manifests() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.toml", "kind = \"stub\"\n[settings]\nname = \"alpha\"\n");
        write(dir.path(), "b.toml", "kind = \"stub\"\n[settings]\nname = \"beta\"\n");

        let registry = loader().load(dir.path()).unwrap();
        assert_eq!(registry.names(), vec!["alpha", "beta"]);
        assert_eq!(
            registry.get("alpha").unwrap().source.as_deref(),
            Some(dir.path().join("a.toml").as_path())
        );
    }

    #[test]
    fn test_load_ignores_other_files_and_subdirectories() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.toml", "kind = \"stub\"\n");
        write(dir.path(), "notes.md", "kind = \"stub\"\n");
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        write(&dir.path().join("nested"), "b.toml", "kind = \"stub\"\nname = \"nested\"\n");

        let registry = loader().load(dir.path()).unwrap();
        assert_eq!(registry.names(), vec!["stub"]);
    }

    #[test]
    fn test_load_skips_broken_manifests() {
        let dir = tempdir().unwrap();
        write(dir.path(), "good.toml", "kind = \"stub\"\n");
        write(dir.path(), "invalid.toml", "kind = ");
        write(dir.path(), "no_kind.toml", "name = \"orphan\"\n");
        write(dir.path(), "unknown.toml", "kind = \"teleport\"\n");
        write(dir.path(), "no_llm.toml", "kind = \"needs_llm\"\n");

        let report = loader().load_report(dir.path()).unwrap();
        assert_eq!(report.registry.names(), vec!["stub"]);
        assert_eq!(report.skipped.len(), 4);
        assert!(report.skipped.iter().any(|f| f.reason.contains("unknown tool kind 'teleport'")));
        assert!(report.skipped.iter().any(|f| f.reason.contains("no LLM client configured")));
    }

    #[test]
    fn test_load_disabled_manifest() {
        let dir = tempdir().unwrap();
        write(dir.path(), "off.toml", "kind = \"stub\"\nenabled = false\n");

        let report = loader().load_report(dir.path()).unwrap();
        assert!(report.registry.is_empty());
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_manifest_overrides() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.toml", "kind = \"stub\"\nname = \"renamed\"\ngroup = \"mail\"\n");

        let registry = loader().load(dir.path()).unwrap();
        let entry = registry.get("renamed").unwrap();
        assert_eq!(entry.descriptor.group, "mail");
    }

    #[test]
    fn test_manifest_blank_name_is_skipped() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.toml", "kind = \"stub\"\nname = \"\"\n");

        let report = loader().load_report(dir.path()).unwrap();
        assert!(report.registry.is_empty());
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn test_load_duplicate_is_fatal() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.toml", "kind = \"stub\"\nname = \"dup\"\n");
        write(dir.path(), "b.toml", "kind = \"stub\"\nname = \"dup\"\n");

        let err = loader().load(dir.path()).unwrap_err();
        match err {
            ThursdayError::DuplicateTool { name, first, second } => {
                assert_eq!(name, "dup");
                assert!(first.ends_with("a.toml"));
                assert!(second.ends_with("b.toml"));
            }
            other => panic!("expected DuplicateTool, got {:?}", other),
        }
    }

    #[test]
    fn test_collect_manifests_records_unreadable_entries() {
        let dir = tempdir().unwrap();
        write(dir.path(), "b.toml", "kind = \"stub\"\n");
        write(dir.path(), "a.toml", "kind = \"stub\"\n");
        write(dir.path(), "readme.md", "");

        let entries = vec![
            Ok(dir.path().join("b.toml")),
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied")),
            Ok(dir.path().join("readme.md")),
            Ok(dir.path().join("a.toml")),
        ];
        let (paths, failures) = collect_manifests(dir.path(), entries);

        assert_eq!(paths, vec![dir.path().join("a.toml"), dir.path().join("b.toml")]);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].reason.contains("denied"));
        assert_eq!(failures[0].origin, dir.path().display().to_string());
    }

    #[test]
    fn test_load_missing_directory() {
        let dir = tempdir().unwrap();
        let err = loader().load(dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, ThursdayError::ToolsDirectory { .. }));
    }

    #[test]
    fn test_load_builtins_skips_unavailable() {
        let report = loader().load_builtins().unwrap();
        assert_eq!(report.registry.names(), vec!["stub"]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].origin, "<builtin:needs_llm>");
    }

    #[test]
    fn test_env_model_setting() {
        let env = ToolEnv::default();
        let mut settings = toml::Table::new();
        assert_eq!(env.model(&settings), DEFAULT_MODEL);
        settings.insert("model".into(), toml::Value::String("gpt-4o".into()));
        assert_eq!(env.model(&settings), "gpt-4o");
    }

    #[test]
    fn test_builtin_factory_kinds() {
        let factories = ToolFactories::builtin();
        assert_eq!(
            factories.kinds(),
            vec!["mail_summary", "recipe_search", "spotify_playlist", "wikipedia_fact_check"]
        );
    }
}
