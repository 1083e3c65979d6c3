use crate::error::AppError;
use crate::registry::ProviderRegistry;
use domain::{ProviderError, Source};
use log::info;
use std::sync::Arc;

/// 按音乐源和歌曲 id 解析播放地址
#[derive(Clone)]
pub struct GetSongUrl {
    registry: Arc<ProviderRegistry>,
}

impl GetSongUrl {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    pub async fn handle(&self, id: &str, source: &str) -> Result<String, AppError> {
        let id = id.trim();
        if id.is_empty() || source.trim().is_empty() {
            return Err(AppError::InvalidInput("id and source are required".to_string()));
        }

        let source: Source = source.parse()?;
        let provider = self
            .registry
            .get(source)
            .ok_or_else(|| AppError::UnsupportedSource(source.to_string()))?;

        info!("Resolving {} song url: {}", source, id);
        let url = provider.song_url(id).await?;
        if url.is_empty() {
            return Err(ProviderError::MissingUrl.into());
        }
        Ok(url)
    }
}
