//! Tunefetch - search a music API and download tracks
//!
//! This library searches a keyword against a configured music API, lets the caller
//! pick from the results, resolves each pick's download url and streams the audio
//! to a sanitized `"{title} - {artist}.flac"` file.

/// Client modules for the music API and the local download directory
pub mod clients;
/// Sequential resolve-and-download of a batch of tracks
pub mod downloader;
/// Choosing tracks from search results
pub mod selection;
/// Loading the API settings file
pub mod settings;
