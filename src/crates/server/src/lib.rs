pub mod api;
pub mod consts;
pub mod middleware;
pub mod resources;

use application::query::{GetSongUrl, SearchSongs};
use application::registry::ProviderRegistry;
use infra::config::AppConfigImpl;
use std::sync::Arc;

pub struct AppState {
    pub search_songs: SearchSongs,
    pub get_song_url: GetSongUrl,
}

impl AppState {
    pub fn new(app_cfg: &AppConfigImpl, registry: ProviderRegistry) -> Self {
        let registry = Arc::new(registry);
        let search_songs = SearchSongs::new(registry.clone())
            .with_default_sources(app_cfg.search().default_sources);
        let get_song_url = GetSongUrl::new(registry);
        Self {
            search_songs,
            get_song_url,
        }
    }
}
