mod fallback;
mod json;
pub mod kuwo;
pub mod netease;
pub mod qq;

pub use fallback::Fallback;
pub use kuwo::KuwoProvider;
pub use netease::NeteaseProvider;
pub use qq::QqProvider;

use crate::config::AppConfigImpl;
use crate::http::HttpClient;
use application::registry::ProviderRegistry;
use domain::ProviderError;
use log::info;
use std::sync::Arc;

/// 按配置创建全部音乐源并注册，每个音乐源使用独立的 HTTP 客户端
pub fn build_registry(config: &AppConfigImpl) -> Result<ProviderRegistry, ProviderError> {
    let http = config.http();
    let limit = config.search().limit;

    let mut registry = ProviderRegistry::new();
    registry
        .register(Arc::new(QqProvider::new(
            HttpClient::new(&http)?,
            config.qq(),
            limit,
        )))
        .register(Arc::new(NeteaseProvider::new(
            HttpClient::new(&http)?,
            config.netease(),
            limit,
        )))
        .register(Arc::new(KuwoProvider::new(
            HttpClient::new(&http)?,
            config.kuwo(),
            limit,
        )));

    info!("Registered music sources: {:?}", registry.sources());
    Ok(registry)
}
