use super::fallback::Fallback;
use super::json::{catalog_songs, expect_code, first_data_url};
use crate::config::NeteaseConfig;
use crate::crypto::WeapiEncryptor;
use crate::http::{http_err, read_json, HttpClient};
use async_trait::async_trait;
use domain::{MusicProvider, ProviderError, Song, Source};
use log::{info, warn};
use serde_json::{json, Value};
use tokio::sync::OnceCell;

const REFERER: &str = "https://music.163.com/";

/// 网易云音乐
///
/// 搜索与取链都按 明文 api → weapi → 备用镜像 的顺序回退。
pub struct NeteaseProvider {
    http: HttpClient,
    config: NeteaseConfig,
    limit: u32,
    encryptor: WeapiEncryptor,
    session: OnceCell<()>,
}

impl NeteaseProvider {
    pub fn new(http: HttpClient, config: NeteaseConfig, limit: u32) -> Self {
        Self {
            http,
            config,
            limit,
            encryptor: WeapiEncryptor::new(),
            session: OnceCell::new(),
        }
    }

    /// 首次调用 weapi 前访问一次首页拿 cookie，返回 `__csrf`（可能为空）
    async fn csrf_token(&self) -> String {
        let home = format!("{}/", self.config.api_base);
        self.session
            .get_or_init(|| async {
                let result = self
                    .http
                    .client()
                    .get(&home)
                    .header("User-Agent", self.http.desktop_user_agent())
                    .send()
                    .await;
                if let Err(e) = result {
                    warn!("Failed to warm up netease session: {}", e);
                }
            })
            .await;
        self.http.cookie(&home, "__csrf").unwrap_or_default()
    }

    async fn weapi(&self, path: &str, mut payload: Value, csrf: &str) -> Result<Value, ProviderError> {
        payload["csrf_token"] = Value::String(csrf.to_string());
        let form = self.encryptor.encrypt(&payload)?;
        let response = self
            .http
            .client()
            .post(format!("{}/weapi{}", self.config.api_base, path))
            .query(&[("csrf_token", csrf)])
            .header("User-Agent", self.http.desktop_user_agent())
            .header("Referer", REFERER)
            .form(&form.as_form())
            .send()
            .await
            .map_err(http_err)?;
        read_json(response).await
    }

    async fn search_api(&self, keyword: &str) -> Result<Vec<Song>, ProviderError> {
        let response = self
            .http
            .client()
            .get(format!("{}/api/search/get", self.config.api_base))
            .query(&[
                ("s", keyword.to_string()),
                ("type", "1".to_string()),
                ("limit", self.limit.to_string()),
                ("offset", "0".to_string()),
            ])
            .header("User-Agent", self.http.desktop_user_agent())
            .header("Referer", REFERER)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(http_err)?;
        let body = read_json(response).await?;
        expect_code(&body, 200)?;
        Ok(catalog_songs(&body, "/result/songs", Source::Netease))
    }

    async fn search_weapi(&self, keyword: &str) -> Result<Vec<Song>, ProviderError> {
        let csrf = self.csrf_token().await;
        let payload = json!({
            "s": keyword,
            "type": "1",
            "limit": self.limit,
            "offset": "0",
        });
        let body = self.weapi("/cloudsearch/get/web", payload, &csrf).await?;
        expect_code(&body, 200)?;
        Ok(catalog_songs(&body, "/result/songs", Source::Netease))
    }

    async fn search_backup(&self, keyword: &str) -> Result<Vec<Song>, ProviderError> {
        let response = self
            .http
            .client()
            .get(format!("{}/search", self.config.backup_base))
            .query(&[("keywords", keyword.to_string()), ("limit", self.limit.to_string())])
            .header("User-Agent", self.http.mobile_user_agent())
            .send()
            .await
            .map_err(http_err)?;
        let body = read_json(response).await?;
        expect_code(&body, 200)?;
        Ok(catalog_songs(&body, "/result/songs", Source::Netease))
    }

    async fn url_api(&self, id: &str) -> Result<String, ProviderError> {
        let response = self
            .http
            .client()
            .get(format!("{}/api/song/enhance/player/url", self.config.api_base))
            .query(&[("ids", format!("[{}]", id)), ("br", "320000".to_string())])
            .header("User-Agent", self.http.desktop_user_agent())
            .header("Referer", REFERER)
            .send()
            .await
            .map_err(http_err)?;
        let body = read_json(response).await?;
        expect_code(&body, 200)?;
        first_data_url(&body).ok_or(ProviderError::MissingUrl)
    }

    async fn url_weapi(&self, id: &str) -> Result<String, ProviderError> {
        let csrf = self.csrf_token().await;
        let payload = json!({
            "ids": format!("[{}]", id),
            "level": "standard",
            "encodeType": "aac",
        });
        let body = self.weapi("/song/enhance/player/url/v1", payload, &csrf).await?;
        expect_code(&body, 200)?;
        first_data_url(&body).ok_or(ProviderError::MissingUrl)
    }

    async fn url_backup(&self, id: &str) -> Result<String, ProviderError> {
        let response = self
            .http
            .client()
            .get(format!("{}/song/url", self.config.backup_base))
            .query(&[("id", id)])
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
impl MusicProvider for NeteaseProvider {
    fn source(&self) -> Source {
        Source::Netease
    }

    async fn search(&self, keyword: &str) -> Result<Vec<Song>, ProviderError> {
        info!("Searching netease: {}", keyword);
        Fallback::new("netease search")
            .attempt("api", move || self.search_api(keyword))
            .attempt("weapi", move || self.search_weapi(keyword))
            .attempt("backup", move || self.search_backup(keyword))
            .run(|songs: &Vec<Song>| !songs.is_empty())
            .await
    }

    async fn song_url(&self, id: &str) -> Result<String, ProviderError> {
        info!("Resolving netease url: {}", id);
        Fallback::new("netease url")
            .attempt("api", move || self.url_api(id))
            .attempt("weapi", move || self.url_weapi(id))
            .attempt("backup", move || self.url_backup(id))
            .run(|url: &String| !url.is_empty())
            .await
    }
}
