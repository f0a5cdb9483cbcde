//! Spotify playlist creation tool
//!
//! The model drafts a playlist as JSON; the tool then creates it in the
//! user's account, resolving each song through Spotify search.

mod api;

pub use api::{SpotifyApi, SpotifyClient};

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::error::{Result, ThursdayError};
use crate::llm::{LlmClient, parse_model_json};
use crate::tools::{Arguments, ParamType, ParameterSpec, Tool, ToolDescriptor, ToolEnv, required_str, str_arg};

use super::setting_u64;

const SYSTEM_PROMPT: &str = "You are an AI assistant helping with creating engaging Spotify playlists.";
const PLAYLIST_DESCRIPTION: &str = "Created by Thursday";
const DEFAULT_LIKED_USAGE: &str = "Build a balanced playlist with some songs the user already likes \
and some new ones they probably don't know yet.";
const DEFAULT_TIMEOUT_MS: u64 = 120_000;

/// A song as drafted by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub name: String,
    #[serde(default)]
    pub artist: String,
}

impl Song {
    /// Query used to find the song on Spotify
    pub fn search_query(&self) -> String {
        if self.artist.is_empty() {
            self.name.clone()
        } else {
            format!("{} - {}", self.name, self.artist)
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlaylistDraft {
    name: String,
    songs: Vec<Song>,
}

/// Creates a Spotify playlist from a description
pub struct SpotifyPlaylistTool {
    llm: Arc<dyn LlmClient>,
    spotify: Arc<dyn SpotifyApi>,
    model: String,
    timeout_ms: u64,
    /// Liked songs, fetched on first use
    liked_songs: Mutex<Option<Arc<Vec<String>>>>,
}

impl SpotifyPlaylistTool {
    pub fn new(llm: Arc<dyn LlmClient>, spotify: Arc<dyn SpotifyApi>, model: impl Into<String>) -> Self {
        Self {
            llm,
            spotify,
            model: model.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            liked_songs: Mutex::new(None),
        }
    }

    /// Build from manifest settings (`model`, `timeout_ms`)
    pub fn from_settings(env: &ToolEnv, settings: &toml::Table) -> Result<Self> {
        let mut tool = Self::new(env.llm()?, env.spotify()?, env.model(settings));
        if let Some(timeout_ms) = setting_u64(settings, "timeout_ms")? {
            tool.timeout_ms = timeout_ms;
        }
        Ok(tool)
    }

    async fn liked_songs(&self) -> Result<Arc<Vec<String>>> {
        let mut cached = self.liked_songs.lock().await;
        if let Some(songs) = cached.as_ref() {
            return Ok(songs.clone());
        }
        let songs = Arc::new(self.spotify.liked_songs().await?);
        *cached = Some(songs.clone());
        Ok(songs)
    }

    async fn prompt(&self, description: &str, use_liked: bool, liked_usage: &str) -> Result<String> {
        let mut prompt = format!(
            "Create a playlist for the user following this description: {}\n\n\
             Answer in JSON with a title for the playlist and a list of songs with song name and artist(s), \
             for example: {{\"name\": \"Example Playlist\", \"songs\": [{{\"name\": \"example song\", \
             \"artist\": \"example artist\"}}]}}. Make the playlist 10 to 20 songs long.",
            description
        );

        if use_liked {
            let liked = self.liked_songs().await?;
            let usage = if liked_usage.trim().is_empty() { DEFAULT_LIKED_USAGE } else { liked_usage };
            prompt.push_str(&format!(
                "\n\nUse the user's liked songs as reference as follows: {}\nLiked songs: {}",
                usage,
                liked.join(", ")
            ));
        }

        Ok(prompt)
    }
}

#[async_trait]
impl Tool for SpotifyPlaylistTool {
    fn describe(&self) -> ToolDescriptor {
        ToolDescriptor::new("create_spotify_playlist", "Creates a Spotify playlist based on a description.")
            .with_param(ParameterSpec::required(
                "description_playlist",
                ParamType::String,
                "A description of the desired playlist with an overall theme. It can name songs or artists as \
                 inspiration. Example: songs that fit 'a nice autumn day', inspired by 'California Dreamin''.",
            ))
            .with_param(ParameterSpec::optional(
                "use_liked_songs",
                ParamType::Boolean,
                "Whether to use the user's liked songs as a reference when building the playlist.",
            ))
            .with_param(ParameterSpec::optional(
                "liked_songs_description",
                ParamType::String,
                "How the liked songs should be used, e.g. only new songs, only liked songs, or a mix. \
                 Leave empty when use_liked_songs is false.",
            ))
            .with_timeout(self.timeout_ms)
    }

    async fn execute(&self, args: Arguments) -> Result<Value> {
        let description = required_str(&args, "description_playlist")?;
        let use_liked = args.get("use_liked_songs").and_then(Value::as_bool).unwrap_or(false);
        let liked_usage = str_arg(&args, "liked_songs_description").unwrap_or("");

        let prompt = self.prompt(description, use_liked, liked_usage).await?;
        let raw = self.llm.complete_json(&self.model, SYSTEM_PROMPT, &prompt).await?;
        let draft: PlaylistDraft = parse_model_json(&raw)?;
        if draft.songs.is_empty() {
            return Err(ThursdayError::Execution("model returned a playlist without songs".to_string()));
        }

        let user_id = self.spotify.current_user_id().await?;
        let playlist_id = self
            .spotify
            .create_playlist(&user_id, &draft.name, PLAYLIST_DESCRIPTION)
            .await?;

        let mut track_ids = Vec::new();
        let mut unresolved = Vec::new();
        for song in &draft.songs {
            let query = song.search_query();
            match self.spotify.search_track(&query).await? {
                Some(id) => track_ids.push(id),
                None => {
                    debug!("No Spotify match for '{}'", query);
                    unresolved.push(query);
                }
            }
        }
        self.spotify.add_tracks(&playlist_id, &track_ids).await?;
        info!(
            "Created playlist '{}' with {} track(s), {} unresolved",
            draft.name,
            track_ids.len(),
            unresolved.len()
        );

        let mut answer = format!("Created playlist '{}' with the following songs:", draft.name);
        for song in &draft.songs {
            answer.push_str(&format!("\n{} - {}", song.name, song.artist));
        }
        if !unresolved.is_empty() {
            answer.push_str(&format!("\n\nCould not find on Spotify: {}", unresolved.join("; ")));
        }

        Ok(json!({
            "answer": answer,
            "playlist_id": playlist_id,
            "name": draft.name,
            "songs": draft.songs,
            "unresolved": unresolved,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records playlist operations in memory
    #[derive(Default)]
    struct FakeSpotify {
        liked_calls: AtomicUsize,
        created: StdMutex<Vec<(String, String)>>,
        added: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl SpotifyApi for FakeSpotify {
        async fn current_user_id(&self) -> Result<String> {
            Ok("user-1".to_string())
        }

        async fn create_playlist(&self, user_id: &str, name: &str, _description: &str) -> Result<String> {
            self.created.lock().unwrap().push((user_id.to_string(), name.to_string()));
            Ok("playlist-1".to_string())
        }

        async fn search_track(&self, query: &str) -> Result<Option<String>> {
            if query.contains("Unknown") {
                Ok(None)
            } else {
                Ok(Some(format!("id:{}", query)))
            }
        }

        async fn add_tracks(&self, _playlist_id: &str, track_ids: &[String]) -> Result<()> {
            self.added.lock().unwrap().extend_from_slice(track_ids);
            Ok(())
        }

        async fn liked_songs(&self) -> Result<Vec<String>> {
            self.liked_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["Song A — Artist A".to_string(), "Song B — Artist B".to_string()])
        }
    }

    fn draft() -> String {
        json!({
            "name": "Autumn Day",
            "songs": [
                {"name": "California Dreamin'", "artist": "The Mamas & The Papas"},
                {"name": "Unknown Song", "artist": "Nobody"},
                {"name": "Basket Case", "artist": "Green Day"}
            ]
        })
        .to_string()
    }

    fn args(value: Value) -> Arguments {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_creates_playlist() {
        let llm = Arc::new(MockLlmClient::new().with_response(draft()));
        let spotify = Arc::new(FakeSpotify::default());
        let tool = SpotifyPlaylistTool::new(llm.clone(), spotify.clone(), "gpt-4o-mini");

        let result = tool
            .execute(args(json!({"description_playlist": "a nice autumn day"})))
            .await
            .unwrap();

        assert_eq!(result["playlist_id"], "playlist-1");
        assert_eq!(result["name"], "Autumn Day");
        assert_eq!(result["songs"].as_array().unwrap().len(), 3);
        assert_eq!(result["unresolved"], json!(["Unknown Song - Nobody"]));
        let answer = result["answer"].as_str().unwrap();
        assert!(answer.starts_with("Created playlist 'Autumn Day' with the following songs:"));
        assert!(answer.contains("Basket Case - Green Day"));
        assert!(answer.contains("Could not find on Spotify"));

        assert_eq!(
            spotify.created.lock().unwrap().as_slice(),
            &[("user-1".to_string(), "Autumn Day".to_string())]
        );
        assert_eq!(spotify.added.lock().unwrap().len(), 2);
        assert_eq!(spotify.liked_calls.load(Ordering::SeqCst), 0);

        let calls = llm.calls();
        assert_eq!(calls[0].system.as_deref(), Some(SYSTEM_PROMPT));
        assert!(calls[0].prompt.contains("a nice autumn day"));
        assert!(!calls[0].prompt.contains("Liked songs"));
    }

    #[tokio::test]
    async fn test_liked_songs_are_fetched_once() {
        let llm = Arc::new(MockLlmClient::new().with_response(draft()).with_response(draft()));
        let spotify = Arc::new(FakeSpotify::default());
        let tool = SpotifyPlaylistTool::new(llm.clone(), spotify.clone(), "m");

        let call = json!({
            "description_playlist": "road trip",
            "use_liked_songs": true,
            "liked_songs_description": "Only new songs"
        });
        tool.execute(args(call.clone())).await.unwrap();
        tool.execute(args(call)).await.unwrap();

        assert_eq!(spotify.liked_calls.load(Ordering::SeqCst), 1);
        let prompt = &llm.calls()[0].prompt;
        assert!(prompt.contains("Only new songs"));
        assert!(prompt.contains("Song A — Artist A, Song B — Artist B"));
    }

    #[tokio::test]
    async fn test_default_liked_usage() {
        let llm = Arc::new(MockLlmClient::new().with_response(draft()));
        let tool = SpotifyPlaylistTool::new(llm.clone(), Arc::new(FakeSpotify::default()), "m");

        tool.execute(args(json!({"description_playlist": "x", "use_liked_songs": true})))
            .await
            .unwrap();
        assert!(llm.calls()[0].prompt.contains(DEFAULT_LIKED_USAGE));
    }

    #[tokio::test]
    async fn test_empty_playlist_is_error() {
        let llm = Arc::new(MockLlmClient::new().with_response(r#"{"name": "Empty", "songs": []}"#));
        let spotify = Arc::new(FakeSpotify::default());
        let tool = SpotifyPlaylistTool::new(llm, spotify.clone(), "m");

        let err = tool
            .execute(args(json!({"description_playlist": "silence"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ThursdayError::Execution(_)));
        assert!(spotify.created.lock().unwrap().is_empty());
    }

    #[test]
    fn test_song_search_query() {
        let song = Song {
            name: "Basket Case".into(),
            artist: "Green Day".into(),
        };
        assert_eq!(song.search_query(), "Basket Case - Green Day");
        let song = Song {
            name: "Instrumental".into(),
            artist: String::new(),
        };
        assert_eq!(song.search_query(), "Instrumental");
    }

    #[test]
    fn test_describe() {
        let tool = SpotifyPlaylistTool::new(
            Arc::new(MockLlmClient::new()),
            Arc::new(FakeSpotify::default()),
            "m",
        );
        let desc = tool.describe();
        assert_eq!(desc.name, "create_spotify_playlist");
        assert_eq!(desc.parameters.len(), 3);
        assert!(desc.param("description_playlist").unwrap().required);
        assert!(!desc.param("use_liked_songs").unwrap().required);
    }

    #[test]
    fn test_from_settings_requires_spotify() {
        let env = ToolEnv::default().with_llm(Arc::new(MockLlmClient::new()));
        let err = SpotifyPlaylistTool::from_settings(&env, &toml::Table::new()).err().unwrap();
        assert!(err.to_string().contains("no Spotify client configured"));
    }
}
