pub mod get_song_url;
pub mod search_songs;

pub use get_song_url::GetSongUrl;
pub use search_songs::{SearchOutcome, SearchSongs};
