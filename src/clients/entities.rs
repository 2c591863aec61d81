use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    // set once by `MusicApiClient::resolve`, right before download
    pub url: Option<String>,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Track {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            url: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.url.is_some()
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.title, self.artist)
    }
}
