use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("不支持的音乐源: {0}")]
    Unknown(String),
}

/// 音乐源标签，序列化为小写字符串
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Qq,
    Netease,
    Kuwo,
}

impl Source {
    /// 默认搜索顺序
    pub const ALL: [Source; 3] = [Source::Qq, Source::Netease, Source::Kuwo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Qq => "qq",
            Source::Netease => "netease",
            Source::Kuwo => "kuwo",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qq" => Ok(Source::Qq),
            "netease" => Ok(Source::Netease),
            "kuwo" => Ok(Source::Kuwo),
            _ => Err(SourceError::Unknown(s.to_string())),
        }
    }
}

/// 归一化后的歌曲记录
///
/// `(id, source)` 构成自然键；album / cover / url 为空时不输出到 JSON。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub album: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cover: String,
    pub source: Source,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
}

impl Song {
    pub fn new(id: impl Into<String>, title: impl Into<String>, source: Source) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: String::new(),
            album: String::new(),
            cover: String::new(),
            source,
            url: String::new(),
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = album.into();
        self
    }

    pub fn with_cover(mut self, cover: impl Into<String>) -> Self {
        self.cover = cover.into();
        self
    }

    pub fn key(&self) -> (&str, Source) {
        (self.id.as_str(), self.source)
    }

    /// 多个歌手名以 ", " 连接
    pub fn join_artists<I, S>(names: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter(|n| !n.as_ref().is_empty())
            .map(|n| n.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
