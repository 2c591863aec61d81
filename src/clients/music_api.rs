use std::path::PathBuf;

use log::{debug, info, warn};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

use crate::clients::{
    entities::Track,
    errors::{Error, Result},
    local_storage::{LocalStorage, ProgressFn},
};
use crate::settings::ApiSettings;

// One entry of the search endpoint's `data` array
#[derive(Deserialize, Debug)]
struct SearchEntry {
    id: RawId,
    song: String,
    singer: String,
}

// The API has been seen returning ids both as strings and as numbers
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for String {
    fn from(id: RawId) -> String {
        match id {
            RawId::Text(text) => text,
            RawId::Number(n) => n.to_string(),
        }
    }
}

impl From<SearchEntry> for Track {
    fn from(entry: SearchEntry) -> Track {
        Track::new(entry.id, entry.song, entry.singer)
    }
}

#[derive(Deserialize, Debug)]
struct ResolveResponse {
    #[serde(default)]
    data: Option<ResolveData>,
}

#[derive(Deserialize, Debug)]
struct ResolveData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    song: Option<String>,
    #[serde(default)]
    singer: Option<String>,
}

/// Answer of the resolve endpoint for one track id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSong {
    /// Direct link to the audio file
    pub url: String,
    /// Title as reported by the resolve endpoint, if any
    pub song: Option<String>,
    /// Artist as reported by the resolve endpoint, if any
    pub singer: Option<String>,
}

/// Turn a search response body into at most `limit` tracks, keeping response order.
/// A missing or non-array `data` field means no results. Entries lacking `id`,
/// `song` or `singer` are skipped.
pub fn parse_search_results(body: &Value, limit: usize) -> Vec<Track> {
    let Some(entries) = body.get("data").and_then(Value::as_array) else {
        warn!("Search response has no `data` array, treating it as empty");
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match SearchEntry::deserialize(entry) {
            Ok(entry) => Some(Track::from(entry)),
            Err(e) => {
                warn!("Skipping malformed search entry {entry}: {e}");
                None
            }
        })
        .take(limit)
        .collect()
}

fn parse_resolved(body: Value) -> std::result::Result<ResolvedSong, String> {
    let response: ResolveResponse =
        serde_json::from_value(body).map_err(|e| format!("unexpected response shape: {e}"))?;
    let data = response
        .data
        .ok_or_else(|| "response has no `data` field".to_string())?;
    match data.url {
        Some(url) if !url.trim().is_empty() => Ok(ResolvedSong {
            url,
            song: data.song,
            singer: data.singer,
        }),
        _ => Err("response has no `data.url`".to_string()),
    }
}

pub struct MusicApiClient {
    http: reqwest::Client,
    base_url: Url,
    settings: ApiSettings,
}

impl MusicApiClient {
    pub fn new(settings: ApiSettings) -> Result<Self> {
        let base_url = Url::parse(&settings.url).map_err(|e| {
            Error::ConfigurationError(format!("invalid api url {:?}: {e}", settings.url))
        })?;
        let http = reqwest::Client::builder()
            .connect_timeout(settings.timeout())
            .build()
            .map_err(|e| Error::ConfigurationError(format!("cannot build http client: {e}")))?;

        Ok(MusicApiClient {
            http,
            base_url,
            settings,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // GET `{base_url}?{key}={value}` and decode the body as JSON
    async fn get_json(&self, key: &str, value: &str) -> std::result::Result<Value, String> {
        let response = self
            .http
            .get(self.base_url.clone())
            .query(&[(key, value)])
            .timeout(self.settings.timeout())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| format!("request failed: {e}"))?;

        response
            .json::<Value>()
            .await
            .map_err(|e| format!("response is not valid JSON: {e}"))
    }

    /// Search by keyword and return up to `limit` tracks in the order the API gave them.
    pub async fn search_all(&self, keyword: &str, limit: usize) -> Result<Vec<Track>> {
        if limit == 0 {
            debug!("Search limit is 0, skipping request for {keyword:?}");
            return Ok(Vec::new());
        }
        info!("Searching for {keyword:?} (limit {limit}) ...");
        let body = self
            .get_json("word", keyword)
            .await
            .map_err(Error::SearchError)?;
        let tracks = parse_search_results(&body, limit);
        info!("Found {} tracks for {keyword:?}", tracks.len());
        Ok(tracks)
    }

    pub async fn lookup(&self, id: &str) -> Result<ResolvedSong> {
        let to_error = |reason: String| Error::ResolutionError {
            id: id.to_string(),
            reason,
        };
        let body = self.get_json("id", id).await.map_err(to_error)?;
        parse_resolved(body).map_err(to_error)
    }

    // Fill in `track.url`. A track that already has a url is left alone.
    pub async fn resolve(&self, track: &mut Track) -> Result<()> {
        if track.is_resolved() {
            debug!("Track {} already has a download url", track.id);
            return Ok(());
        }
        let resolved = self.lookup(&track.id).await?;
        debug!("Resolved track {} to {}", track.id, resolved.url);
        track.url = Some(resolved.url);
        Ok(())
    }

    /// Stream the track's audio into `storage` and return the written file's path.
    pub async fn download(
        &self,
        track: &Track,
        storage: &LocalStorage,
        progress: Option<&ProgressFn>,
    ) -> Result<PathBuf> {
        let url = track.url.as_deref().ok_or_else(|| {
            Error::DownloadError(format!("track {} has no resolved download url", track.id))
        })?;

        debug!("Downloading {track} from {url}");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::DownloadError(format!("request failed: {e}")))?;

        let path = storage.save_track(track, response, progress).await?;
        info!("Downloaded {track} to {path:?}");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn search_results_keep_order_and_respect_limit() {
        let body = json!({"data": [
            {"id": "1", "song": "Lemon Tree", "singer": "Fool's Garden"},
            {"id": "2", "song": "Lemon", "singer": "Kenshi Yonezu"},
            {"id": "3", "song": "Lemonade", "singer": "Someone"},
        ]});

        let tracks = parse_search_results(&body, 2);
        assert_eq!(
            tracks,
            vec![
                Track::new("1", "Lemon Tree", "Fool's Garden"),
                Track::new("2", "Lemon", "Kenshi Yonezu"),
            ]
        );
        assert_eq!(parse_search_results(&body, 10).len(), 3);
        assert!(parse_search_results(&body, 0).is_empty());
    }

    #[test]
    fn missing_or_malformed_data_is_empty() {
        assert!(parse_search_results(&json!({}), 10).is_empty());
        assert!(parse_search_results(&json!({"data": null}), 10).is_empty());
        assert!(parse_search_results(&json!({"data": {"id": "1"}}), 10).is_empty());
        assert!(parse_search_results(&json!({"code": 404, "msg": "nothing"}), 10).is_empty());
    }

    #[test]
    fn malformed_entries_are_skipped_and_numeric_ids_accepted() {
        let body = json!({"data": [
            {"id": 42, "song": "半岛铁盒", "singer": "周杰伦"},
            {"id": "7", "song": "no singer"},
            {"id": "8", "song": "晴天", "singer": "周杰伦"},
        ]});

        let tracks = parse_search_results(&body, 10);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].id, "42");
        assert_eq!(tracks[1].title, "晴天");
        assert!(tracks.iter().all(|t| t.url.is_none()));
    }

    #[test]
    fn resolved_url_is_required() {
        let ok = parse_resolved(json!({"data": {"url": "http://cdn/x.flac", "song": "x"}})).unwrap();
        assert_eq!(ok.url, "http://cdn/x.flac");
        assert_eq!(ok.song.as_deref(), Some("x"));
        assert_eq!(ok.singer, None);

        assert!(parse_resolved(json!({})).is_err());
        assert!(parse_resolved(json!({"data": {"song": "x"}})).is_err());
        assert!(parse_resolved(json!({"data": {"url": ""}})).is_err());
        assert!(parse_resolved(json!({"data": []})).is_err());
    }

    #[test]
    fn invalid_base_url_is_configuration_error() {
        let err = MusicApiClient::new(ApiSettings::new("not a url")).err().unwrap();
        assert!(matches!(err, Error::ConfigurationError(_)));
    }

    #[tokio::test]
    async fn download_requires_resolved_url() {
        let client = MusicApiClient::new(ApiSettings::new("http://127.0.0.1:9/song")).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        let err = client
            .download(&Track::new("1", "a", "b"), &storage, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DownloadError(_)));
    }

    #[tokio::test]
    async fn resolve_skips_request_for_resolved_track() {
        // Nothing listens on port 9, so any request would fail
        let client = MusicApiClient::new(ApiSettings::new("http://127.0.0.1:9/song")).unwrap();
        let mut track = Track::new("1", "a", "b");
        track.url = Some("http://cdn/already.flac".into());

        client.resolve(&mut track).await.unwrap();
        assert_eq!(track.url.as_deref(), Some("http://cdn/already.flac"));
    }
}
