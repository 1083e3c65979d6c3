use super::fallback::Fallback;
use super::json::{catalog_songs, expect_code, first_data_url, value_as_string};
use crate::config::KuwoConfig;
use crate::http::{http_err, read_json, read_text, HttpClient};
use async_trait::async_trait;
use domain::{MusicProvider, ProviderError, Song, Source};
use log::{info, warn};
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const TOKEN_COOKIE: &str = "kw_token";

struct CachedToken {
    value: String,
    fetched_at: Instant,
}

/// 酷我音乐
///
/// 官网接口需要 `kw_token`，它来自 `/search/key` 下发的 cookie，按 TTL 缓存。
pub struct KuwoProvider {
    http: HttpClient,
    config: KuwoConfig,
    limit: u32,
    token: RwLock<Option<CachedToken>>,
}

impl KuwoProvider {
    pub fn new(http: HttpClient, config: KuwoConfig, limit: u32) -> Self {
        Self {
            http,
            config,
            limit,
            token: RwLock::new(None),
        }
    }

    fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.config.token_ttl_secs)
    }

    /// 当前可用的 token；过期或缺失时刷新，刷新失败使用固定 token
    async fn token(&self) -> String {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.fetched_at.elapsed() < self.token_ttl() {
                    return token.value.clone();
                }
            }
        }

        let mut cached = self.token.write().await;
        // 等锁期间可能已被其他请求刷新
        if let Some(token) = cached.as_ref() {
            if token.fetched_at.elapsed() < self.token_ttl() {
                return token.value.clone();
            }
        }

        let value = match self.fetch_token().await {
            Ok(token) => {
                info!("Refreshed kuwo token");
                token
            }
            Err(e) => {
                warn!("Failed to refresh kuwo token, using fallback: {}", e);
                self.config.fallback_token.clone()
            }
        };
        *cached = Some(CachedToken {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        value
    }

    async fn fetch_token(&self) -> Result<String, ProviderError> {
        let url = format!("{}/search/key", self.config.www_base);
        let response = self
            .http
            .client()
            .get(&url)
            .header("User-Agent", self.http.desktop_user_agent())
            .header("Referer", format!("{}/", self.config.www_base))
            .header("Accept", "*/*")
            .send()
            .await
            .map_err(http_err)?;
        read_text(response).await?;
        self.http
            .cookie(&url, TOKEN_COOKIE)
            .ok_or_else(|| ProviderError::UnexpectedPayload("响应中没有 kw_token".to_string()))
    }

    fn song_from_item(item: &Value) -> Option<Song> {
        let id = value_as_string(item.get("rid")).or_else(|| {
            value_as_string(item.get("musicrid"))
                .map(|rid| rid.trim_start_matches("MUSIC_").to_string())
                .filter(|rid| !rid.is_empty())
        })?;
        let title = value_as_string(item.get("name"))?;
        let text = |key: &str| value_as_string(item.get(key)).unwrap_or_default();
        Some(
            Song::new(id, title, Source::Kuwo)
                .with_artist(text("artist"))
                .with_album(text("album"))
                .with_cover(text("pic")),
        )
    }

    async fn search_www(&self, keyword: &str) -> Result<Vec<Song>, ProviderError> {
        let token = self.token().await;
        let response = self
            .http
            .client()
            .get(format!(
                "{}/api/www/search/searchMusicBykeyWord",
                self.config.www_base
            ))
            .query(&[
                ("key", keyword.to_string()),
                ("pn", "1".to_string()),
                ("rn", self.limit.to_string()),
            ])
            .header("User-Agent", self.http.desktop_user_agent())
            .header(
                "Referer",
                format!(
                    "{}/search/list?key={}",
                    self.config.www_base,
                    url::form_urlencoded::byte_serialize(keyword.as_bytes()).collect::<String>()
                ),
            )
            .header("Cookie", format!("{}={}", TOKEN_COOKIE, token))
            .header("csrf", token.as_str())
            .header("Accept", "application/json, text/plain, */*")
            .send()
            .await
            .map_err(http_err)?;
        let body = read_json(response).await?;
        expect_code(&body, 200)?;

        Ok(body
            .pointer("/data/list")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(Self::song_from_item).collect())
            .unwrap_or_default())
    }

    async fn search_backup(&self, keyword: &str) -> Result<Vec<Song>, ProviderError> {
        let response = self
            .http
            .client()
            .get(format!("{}/search", self.config.backup_base))
            .query(&[
                ("keywords", keyword.to_string()),
                ("type", "1002".to_string()),
                ("limit", self.limit.to_string()),
            ])
            .header("User-Agent", self.http.mobile_user_agent())
            .send()
            .await
            .map_err(http_err)?;
        let body = read_json(response).await?;
        Ok(catalog_songs(&body, "/result/songs", Source::Kuwo))
    }

    async fn url_www(&self, id: &str) -> Result<String, ProviderError> {
        let token = self.token().await;
        let response = self
            .http
            .client()
            .get(format!("{}/api/v1/www/music/playUrl", self.config.www_base))
            .query(&[("mid", id), ("type", "convert_url3"), ("br", "320kmp3")])
            .header("User-Agent", self.http.desktop_user_agent())
            .header("Referer", format!("{}/", self.config.www_base))
            .header("Cookie", format!("{}={}", TOKEN_COOKIE, token))
            .header("csrf", token.as_str())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(http_err)?;
        let body = read_json(response).await?;
        expect_code(&body, 200)?;
        value_as_string(body.pointer("/data/url")).ok_or(ProviderError::MissingUrl)
    }

    async fn url_backup(&self, id: &str) -> Result<String, ProviderError> {
        let response = self
            .http
            .client()
            .get(format!("{}/song/url", self.config.backup_base))
            .query(&[("id", id), ("source", "kuwo")])
            .header("User-Agent", self.http.mobile_user_agent())
            .send()
            .await
            .map_err(http_err)?;
        let body = read_json(response).await?;
        expect_code(&body, 200)?;
        first_data_url(&body).ok_or(ProviderError::MissingUrl)
    }
}

#[async_trait]
impl MusicProvider for KuwoProvider {
    fn source(&self) -> Source {
        Source::Kuwo
    }

    async fn search(&self, keyword: &str) -> Result<Vec<Song>, ProviderError> {
        info!("Searching kuwo: {}", keyword);
        Fallback::new("kuwo search")
            .attempt("www", move || self.search_www(keyword))
            .attempt("backup", move || self.search_backup(keyword))
            .run(|songs: &Vec<Song>| !songs.is_empty())
            .await
    }

    async fn song_url(&self, id: &str) -> Result<String, ProviderError> {
        info!("Resolving kuwo url: {}", id);
        Fallback::new("kuwo url")
            .attempt("www", move || self.url_www(id))
            .attempt("backup", move || self.url_backup(id))
            .run(|url: &String| !url.is_empty())
            .await
    }
}
