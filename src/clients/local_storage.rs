use log::{debug, warn};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::clients::{
    entities::Track,
    errors::{Error, Result},
};

const FILE_EXTENSION: &str = ".flac";
const MAX_FILE_NAME_CHARS: usize = 100;
const CHUNK_SIZE: usize = 8192;
const ILLEGAL_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Progress callback: `(bytes downloaded so far, total bytes or 0 if unknown)`
pub type ProgressFn = dyn Fn(u64, u64) + Send + Sync;

/// Strip characters that are illegal in file names and trim surrounding whitespace.
/// Applying it twice gives the same result as applying it once.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c) && !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// `"{title} - {artist}.flac"`, capped at 100 characters including the extension
pub fn file_name_for(track: &Track) -> String {
    let title = non_empty_or(sanitize_filename(&track.title), "Unknown Title");
    let artist = non_empty_or(sanitize_filename(&track.artist), "Unknown Artist");

    let stem = format!("{title} - {artist}");
    let max_stem = MAX_FILE_NAME_CHARS - FILE_EXTENSION.chars().count();
    if stem.chars().count() <= max_stem {
        return format!("{stem}{FILE_EXTENSION}");
    }

    let cut: String = stem.chars().take(max_stem).collect();
    let cut = cut.trim_end();
    // a cut inside the separator leaves a dangling " -"
    let cut = cut.strip_suffix(" -").unwrap_or(cut);
    format!("{cut}{FILE_EXTENSION}")
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

// Directory that downloaded tracks are written to
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalStorage { root: root.into() }
    }

    pub fn default_location() -> Self {
        let root = dirs::download_dir()
            .map(|dir| dir.join("tunefetch"))
            .unwrap_or_else(|| PathBuf::from("downloads")); // Fallback to ./downloads if no download dir is known
        LocalStorage { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // Create the download directory if it is missing. Safe to call repeatedly.
    pub async fn init_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            Error::DownloadError(format!(
                "cannot create directory {}: {e}",
                self.root.display()
            ))
        })?;
        debug!("Download directory ready at {:?}", self.root);
        Ok(())
    }

    pub fn path_for(&self, track: &Track) -> PathBuf {
        self.root.join(file_name_for(track))
    }

    /// Stream `response` into this directory under the track's file name and return
    /// the path. Bytes go to a `.part` file next to the target, which is renamed into
    /// place only once the body is complete. On failure only the `.part` file is
    /// removed, so an earlier download with the same name is left untouched.
    pub async fn save_track(
        &self,
        track: &Track,
        response: reqwest::Response,
        progress: Option<&ProgressFn>,
    ) -> Result<PathBuf> {
        self.init_dir().await?;
        let path = self.path_for(track);
        let part_path = partial_path(&path);

        let file = File::create(&part_path).await.map_err(|e| {
            Error::DownloadError(format!("cannot create {}: {e}", part_path.display()))
        })?;
        let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);

        let written = match stream_body(response, &mut writer, progress).await {
            Ok(written) => written,
            Err(err) => {
                drop(writer);
                remove_partial(&part_path).await;
                return Err(err);
            }
        };
        drop(writer);

        if let Err(e) = tokio::fs::rename(&part_path, &path).await {
            remove_partial(&part_path).await;
            return Err(Error::DownloadError(format!(
                "cannot move download into {}: {e}",
                path.display()
            )));
        }
        debug!("Wrote {written} bytes to {path:?}");
        Ok(path)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

async fn remove_partial(part_path: &Path) {
    if let Err(e) = tokio::fs::remove_file(part_path).await {
        warn!("Failed to remove partial file {part_path:?}: {e}");
    } else {
        debug!("Removed partial file {part_path:?}");
    }
}

async fn stream_body(
    mut response: reqwest::Response,
    writer: &mut BufWriter<File>,
    progress: Option<&ProgressFn>,
) -> Result<u64> {
    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| Error::DownloadError(format!("stream interrupted: {e}")))?
    {
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| Error::DownloadError(format!("write failed: {e}")))?;
        downloaded += chunk.len() as u64;
        if let Some(report) = progress {
            report(downloaded, total);
        }
    }

    writer
        .flush()
        .await
        .map_err(|e| Error::DownloadError(format!("write failed: {e}")))?;

    if total > 0 && downloaded != total {
        return Err(Error::DownloadError(format!(
            "incomplete body: received {downloaded} of {total} bytes"
        )));
    }
    Ok(downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_removes_illegal_characters_and_trims() {
        assert_eq!(sanitize_filename(r#"  a\b/c:d*e?f"g<h>i|j  "#), "abcdefghij");
        assert_eq!(sanitize_filename("AC/DC"), "ACDC");
        assert_eq!(sanitize_filename("Lemon Tree"), "Lemon Tree");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let inputs = [
            " * leading",
            "trailing ? ",
            "mid | dle",
            "\t<tabbed>\n",
            "半岛铁盒",
            "???",
            "",
        ];
        for input in inputs {
            let once = sanitize_filename(input);
            assert_eq!(sanitize_filename(&once), once, "input: {input:?}");
            assert!(!once.contains(ILLEGAL_CHARS), "input: {input:?}");
        }
    }

    #[test]
    fn file_name_joins_title_and_artist() {
        let track = Track::new("123", "半岛铁盒", "周杰伦");
        assert_eq!(file_name_for(&track), "半岛铁盒 - 周杰伦.flac");
    }

    #[test]
    fn file_name_falls_back_when_fields_are_empty() {
        let track = Track::new("1", "???", " ");
        assert_eq!(file_name_for(&track), "Unknown Title - Unknown Artist.flac");
    }

    #[test]
    fn file_name_is_capped_at_100_characters() {
        let track = Track::new("1", "长".repeat(150), "artist");
        let name = file_name_for(&track);
        assert_eq!(name.chars().count(), 100);
        assert!(name.ends_with(".flac"));
    }

    #[test]
    fn truncated_name_drops_dangling_separator() {
        for title_len in [92, 93, 94] {
            let track = Track::new("1", "a".repeat(title_len), "artist");
            let name = file_name_for(&track);
            assert_eq!(name, format!("{}.flac", "a".repeat(title_len)), "title length {title_len}");
        }
        // cut after the separator keeps it together with the partial artist
        let track = Track::new("1", "a".repeat(90), "artist");
        assert_eq!(file_name_for(&track), format!("{} - ar.flac", "a".repeat(90)));
    }

    #[test]
    fn partial_file_sits_next_to_target() {
        let path = Path::new("/music/半岛铁盒 - 周杰伦.flac");
        assert_eq!(
            partial_path(path),
            Path::new("/music/半岛铁盒 - 周杰伦.flac.part")
        );
    }

    #[tokio::test]
    async fn init_dir_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("nested").join("downloads"));
        storage.init_dir().await.unwrap();
        storage.init_dir().await.unwrap();
        assert!(storage.root().is_dir());
    }
}
