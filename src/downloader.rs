use log::{debug, info, warn};
use std::path::PathBuf;

use crate::clients::{
    entities::Track,
    errors::{Error, Result},
    local_storage::{LocalStorage, ProgressFn},
    music_api::MusicApiClient,
};
use crate::settings::ApiSettings;

// Configuration for the Downloader struct
pub struct Config {
    pub api: MusicApiClient,
    pub storage: LocalStorage,
}

pub struct ConfigBuilder {
    settings: Option<ApiSettings>,
    storage: Option<LocalStorage>,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            settings: None,
            storage: None,
        }
    }

    #[must_use]
    pub fn settings(mut self, settings: ApiSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    #[must_use]
    pub fn storage(mut self, storage: LocalStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn build(self) -> Result<Config> {
        let settings = match self.settings {
            Some(s) => s,
            None => ApiSettings::load(&ApiSettings::default_path())?,
        };
        Ok(Config {
            api: MusicApiClient::new(settings)?,
            storage: self.storage.unwrap_or_else(LocalStorage::default_location),
        })
    }
}

/// What happened to one track of a batch.
#[derive(Debug)]
pub struct TrackOutcome {
    pub track: Track,
    pub result: Result<PathBuf>,
}

/// Per-track results of [`Downloader::download_all`], in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<TrackOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn errors(&self) -> impl Iterator<Item = (&Track, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.track, e)))
    }
}

// Resolves and downloads tracks one after another
pub struct Downloader {
    config: Config,
}

impl Downloader {
    pub fn new(config: Config) -> Self {
        Downloader { config }
    }

    pub fn api(&self) -> &MusicApiClient {
        &self.config.api
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.config.storage
    }

    pub async fn download_one(
        &self,
        track: &mut Track,
        progress: Option<&ProgressFn>,
    ) -> Result<PathBuf> {
        self.config.api.resolve(track).await?;
        self.config
            .api
            .download(track, &self.config.storage, progress)
            .await
    }

    /// Resolve and download each track in turn. A failing track is recorded in the
    /// report and the batch moves on to the next one.
    pub async fn download_all(
        &self,
        tracks: Vec<Track>,
        progress: Option<&ProgressFn>,
    ) -> BatchReport {
        info!(
            "Starting download of {} tracks into {:?} ...",
            tracks.len(),
            self.config.storage.root()
        );

        let mut report = BatchReport::default();
        for (n, mut track) in tracks.into_iter().enumerate() {
            debug!("[{}] Processing {track}", n + 1);
            let result = self.download_one(&mut track, progress).await;
            if let Err(e) = &result {
                warn!("Error downloading {track}: {e}");
            }
            report.outcomes.push(TrackOutcome { track, result });
        }

        info!(
            "Download completed. Downloaded tracks: {} of {}",
            report.succeeded(),
            report.outcomes.len()
        );
        report
    }
}
