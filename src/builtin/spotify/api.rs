//! Spotify Web API access
//!
//! `SpotifyClient` authenticates with a user access token read from the
//! environment. Obtaining that token (the OAuth authorization flow) happens
//! outside this crate.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::{Value, json};

use crate::config::SpotifyConfig;
use crate::error::{Result, ThursdayError};

/// Spotify limits playlist additions per request
const ADD_TRACKS_CHUNK: usize = 100;

/// Page size for the saved-tracks listing
const SAVED_TRACKS_PAGE: usize = 50;

/// The Spotify operations the playlist tool needs
#[async_trait]
pub trait SpotifyApi: Send + Sync {
    /// Id of the authenticated user
    async fn current_user_id(&self) -> Result<String>;

    /// Create a private playlist, returning its id
    async fn create_playlist(&self, user_id: &str, name: &str, description: &str) -> Result<String>;

    /// Id of the first track matching a query
    async fn search_track(&self, query: &str) -> Result<Option<String>>;

    /// Append tracks to a playlist
    async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<()>;

    /// The user's saved songs as "name — artist, artist"
    async fn liked_songs(&self) -> Result<Vec<String>>;
}

/// Spotify Web API client
pub struct SpotifyClient {
    client: Client,
    token: String,
    base_url: String,
}

impl SpotifyClient {
    /// Create a client, reading the access token from the configured variable
    pub fn from_config(config: &SpotifyConfig) -> Result<Self> {
        let token = std::env::var(&config.token_env).map_err(|_| {
            ThursdayError::Config(format!("environment variable {} not set", config.token_env))
        })?;

        Self::with_token(token, config.base_url.clone(), Duration::from_millis(config.timeout_ms))
    }

    /// Create a client with an explicit access token
    pub fn with_token(token: String, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ThursdayError::Spotify(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            token,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await
            .map_err(|e| ThursdayError::Spotify(format!("Request failed: {}", e)))?;
        Self::read_json(response).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ThursdayError::Spotify(format!("Request failed: {}", e)))?;
        Self::read_json(response).await
    }

    async fn read_json(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ThursdayError::Spotify(format!("API error {}: {}", status, error_body)));
        }

        response
            .json()
            .await
            .map_err(|e| ThursdayError::Spotify(format!("Failed to parse response: {}", e)))
    }
}

fn required_id(value: &Value, what: &str) -> Result<String> {
    value["id"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| ThursdayError::Spotify(format!("{} response has no id", what)))
}

fn first_track_id(search: &Value) -> Option<String> {
    search["tracks"]["items"][0]["id"].as_str().map(String::from)
}

fn track_uri(id: &str) -> String {
    format!("spotify:track:{}", id)
}

/// Format a saved-track item as "name — artist, artist"
fn format_saved_track(item: &Value) -> Option<String> {
    let track = &item["track"];
    let name = track["name"].as_str()?;
    let artists: Vec<&str> = track["artists"]
        .as_array()
        .map(|a| a.iter().filter_map(|artist| artist["name"].as_str()).collect())
        .unwrap_or_default();
    Some(format!("{} — {}", name, artists.join(", ")))
}

#[async_trait]
impl SpotifyApi for SpotifyClient {
    async fn current_user_id(&self) -> Result<String> {
        let me = self.get("/me", &[]).await?;
        required_id(&me, "user")
    }

    async fn create_playlist(&self, user_id: &str, name: &str, description: &str) -> Result<String> {
        let body = json!({
            "name": name,
            "public": false,
            "description": description,
        });
        let playlist = self.post(&format!("/users/{}/playlists", user_id), body).await?;
        required_id(&playlist, "playlist")
    }

    async fn search_track(&self, query: &str) -> Result<Option<String>> {
        let result = self
            .get(
                "/search",
                &[("q", query.to_string()), ("type", "track".to_string()), ("limit", "1".to_string())],
            )
            .await?;
        Ok(first_track_id(&result))
    }

    async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<()> {
        for chunk in track_ids.chunks(ADD_TRACKS_CHUNK) {
            let uris: Vec<String> = chunk.iter().map(|id| track_uri(id)).collect();
            self.post(&format!("/playlists/{}/tracks", playlist_id), json!({ "uris": uris }))
                .await?;
        }
        Ok(())
    }

    async fn liked_songs(&self) -> Result<Vec<String>> {
        let mut songs = Vec::new();
        let mut offset = 0;

        loop {
            let page = self
                .get(
                    "/me/tracks",
                    &[("limit", SAVED_TRACKS_PAGE.to_string()), ("offset", offset.to_string())],
                )
                .await?;

            let Some(items) = page["items"].as_array() else {
                break;
            };
            if items.is_empty() {
                break;
            }
            songs.extend(items.iter().filter_map(format_saved_track));

            if page["next"].is_null() {
                break;
            }
            offset += SAVED_TRACKS_PAGE;
        }

        debug!("Fetched {} liked songs", songs.len());
        Ok(songs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_track_id() {
        let search = json!({"tracks": {"items": [{"id": "abc"}, {"id": "def"}]}});
        assert_eq!(first_track_id(&search).as_deref(), Some("abc"));
        assert!(first_track_id(&json!({"tracks": {"items": []}})).is_none());
        assert!(first_track_id(&json!({})).is_none());
    }

    #[test]
    fn test_track_uri() {
        assert_eq!(track_uri("4uLU6hMCjMI75M1A2tKUQC"), "spotify:track:4uLU6hMCjMI75M1A2tKUQC");
    }

    #[test]
    fn test_format_saved_track() {
        let item = json!({
            "track": {
                "name": "California Dreamin'",
                "artists": [{"name": "The Mamas & The Papas"}, {"name": "Guest"}]
            }
        });
        assert_eq!(
            format_saved_track(&item).as_deref(),
            Some("California Dreamin' — The Mamas & The Papas, Guest")
        );
        assert!(format_saved_track(&json!({"track": {}})).is_none());
    }

    #[test]
    fn test_required_id() {
        assert_eq!(required_id(&json!({"id": "u1"}), "user").unwrap(), "u1");
        let err = required_id(&json!({}), "playlist").unwrap_err();
        assert!(err.to_string().contains("playlist response has no id"));
    }

    #[test]
    fn test_from_config_missing_token() {
        let config = SpotifyConfig {
            token_env: "THURSDAY_TEST_UNSET_SPOTIFY_TOKEN".to_string(),
            ..SpotifyConfig::default()
        };
        let err = SpotifyClient::from_config(&config).err().unwrap();
        assert!(err.to_string().contains("THURSDAY_TEST_UNSET_SPOTIFY_TOKEN"));
    }

    #[test]
    fn test_with_token_trims_base_url() {
        let client = SpotifyClient::with_token("t".into(), "https://api.spotify.com/v1/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url, "https://api.spotify.com/v1");
    }
}
