/// Track entity shared by search, selection and download
pub mod entities;
/// Error types and result aliases
pub mod errors;
/// Download directory handling and file name sanitizing
pub mod local_storage;
/// Client for the music search/resolve API
pub mod music_api;

pub use entities::Track;
pub use local_storage::LocalStorage;
pub use music_api::MusicApiClient;
