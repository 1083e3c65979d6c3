use crate::consts;
use domain::Song;
use serde::Serialize;

/// `/api/search` 响应体
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub songs: Vec<Song>,
    pub total: usize,
}

/// `/api/song` 响应体，失败时仍以 200 返回，`code` 为 500
#[derive(Debug, Serialize)]
pub struct SongUrlResponse {
    pub url: String,
    pub code: u16,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub msg: String,
}

impl SongUrlResponse {
    pub fn ok(url: String) -> Self {
        Self {
            url,
            code: 200,
            msg: String::new(),
        }
    }

    pub fn failed() -> Self {
        Self {
            url: String::new(),
            code: 500,
            msg: consts::MSG_SONG_URL_FAILED.to_string(),
        }
    }
}
