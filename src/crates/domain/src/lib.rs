pub mod provider;
pub mod song;

pub use provider::{MusicProvider, ProviderError};
pub use song::{Song, Source, SourceError};
