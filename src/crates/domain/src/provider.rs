use crate::song::{Song, Source};
use async_trait::async_trait;
use thiserror::Error;

// 音乐源调用错误
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("请求失败: {0}")]
    Http(String),
    #[error("解析响应失败: {0}")]
    Decode(String),
    #[error("接口返回错误码: {0}")]
    Status(i64),
    #[error("响应格式错误: {0}")]
    UnexpectedPayload(String),
    #[error("未获取到播放地址")]
    MissingUrl,
    #[error("加密失败: {0}")]
    Crypto(String),
    #[error("所有备用接口均已失败")]
    Exhausted,
}

/// 第三方音乐源端口
///
/// 每个实现负责：请求第三方接口、把异构 JSON 归一化成 [`Song`]、
/// 以及按 id 解析可播放地址。失败时实现内部按顺序尝试备用接口。
#[async_trait]
pub trait MusicProvider: Send + Sync {
    fn source(&self) -> Source;

    async fn search(&self, keyword: &str) -> Result<Vec<Song>, ProviderError>;

    async fn song_url(&self, id: &str) -> Result<String, ProviderError>;
}
