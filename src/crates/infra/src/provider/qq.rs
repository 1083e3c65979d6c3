use super::fallback::Fallback;
use super::json::{value_as_i64, value_as_string};
use crate::config::QqConfig;
use crate::http::{http_err, parse_json, read_bytes, read_json, read_text, HttpClient};
use async_trait::async_trait;
use domain::{MusicProvider, ProviderError, Song, Source};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use serde_json::{json, Value};
use std::time::Duration;

const REFERER: &str = "https://y.qq.com/";
const ORIGIN: &str = "https://y.qq.com";
const ANDROID_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 11; Pixel 4) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Mobile Safari/537.36";

static ANSI_ESCAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*[a-zA-Z]").unwrap());

/// QQ 音乐
///
/// 搜索只有一个接口，传输失败时线性退避重试；取链按 vkey → musics.fcg → 第三方 JSONP 回退。
pub struct QqProvider {
    http: HttpClient,
    config: QqConfig,
    limit: u32,
}

impl QqProvider {
    pub fn new(http: HttpClient, config: QqConfig, limit: u32) -> Self {
        Self {
            http,
            config,
            limit,
        }
    }

    fn musicu_url(&self) -> String {
        format!("{}/cgi-bin/musicu.fcg", self.config.musicu_base)
    }

    fn cover_url(&self, album_mid: &str) -> String {
        format!(
            "{}/music/photo_new/T002R300x300M000{}.jpg",
            self.config.cover_base, album_mid
        )
    }

    fn song_from_item(&self, item: &Value) -> Option<Song> {
        let mid = value_as_string(item.get("mid"))?;
        let title = value_as_string(item.get("title"))?;
        let artist = item
            .get("singer")
            .and_then(Value::as_array)
            .map(|singers| {
                Song::join_artists(
                    singers
                        .iter()
                        .filter_map(|singer| value_as_string(singer.get("name"))),
                )
            })
            .unwrap_or_default();
        let album = item.get("album");
        let album_name = album
            .and_then(|a| value_as_string(a.get("name")))
            .unwrap_or_default();
        let cover = album
            .and_then(|a| value_as_string(a.get("mid")))
            .map(|album_mid| self.cover_url(&album_mid))
            .unwrap_or_default();

        Some(
            Song::new(mid, title, Source::Qq)
                .with_artist(artist)
                .with_album(album_name)
                .with_cover(cover),
        )
    }

    async fn search_once(&self, keyword: &str) -> Result<Vec<Song>, ProviderError> {
        let request = json!({
            "req_0": {
                "module": "music.search.SearchCgiService",
                "method": "DoSearchForQQMusicDesktop",
                "param": {
                    "query": keyword,
                    "num_per_page": self.limit,
                    "page_num": 1,
                    "search_type": 0,
                }
            }
        });
        let response = self
            .http
            .client()
            .post(self.musicu_url())
            .json(&request)
            .header("User-Agent", self.http.desktop_user_agent())
            .header("Referer", REFERER)
            .header("Origin", ORIGIN)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(http_err)?;
        let body = read_json(response).await?;

        let code = value_as_i64(body.pointer("/req_0/code")).unwrap_or(-1);
        if code != 0 {
            // 接口层面的拒绝不重试，按无结果处理
            warn!("QQ search returned code {}", code);
            return Ok(Vec::new());
        }

        Ok(body
            .pointer("/req_0/data/body/song/list")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(|item| self.song_from_item(item)).collect())
            .unwrap_or_default())
    }

    async fn url_vkey(&self, id: &str) -> Result<String, ProviderError> {
        let response = self
            .http
            .client()
            .post(self.musicu_url())
            .json(&vkey_request(id))
            .header("User-Agent", ANDROID_USER_AGENT)
            .header("Referer", REFERER)
            .header("Origin", ORIGIN)
            .header("Accept", "application/json")
            .header("Accept-Language", "zh-CN,zh;q=0.9")
            .send()
            .await
            .map_err(http_err)?;
        let body = read_bytes(response).await?;
        let body = ANSI_ESCAPE.replace_all(&body, &b""[..]);
        let body = parse_json(&String::from_utf8_lossy(&body))?;
        vkey_url(&body)
    }

    async fn url_musics(&self, id: &str) -> Result<String, ProviderError> {
        let data = vkey_request(id).to_string();
        let response = self
            .http
            .client()
            .get(format!("{}/cgi-bin/musics.fcg", self.config.musicu_base))
            .query(&[("format", "json"), ("data", data.as_str())])
            .header("User-Agent", self.http.mobile_user_agent())
            .header("Accept", "*/*")
            .header("Accept-Language", "zh-CN,zh;q=0.9,en;q=0.8")
            .send()
            .await
            .map_err(http_err)?;
        let body = clean_body(&read_bytes(response).await?);
        if body.is_empty() {
            return Err(ProviderError::UnexpectedPayload("响应为空".to_string()));
        }
        let body = parse_json(&String::from_utf8_lossy(&body))?;
        let url = vkey_url(&body)?;
        if !url.starts_with("http") {
            return Err(ProviderError::UnexpectedPayload(format!("无效的播放地址: {}", url)));
        }
        Ok(url)
    }

    async fn url_third_party(&self, id: &str) -> Result<String, ProviderError> {
        let response = self
            .http
            .client()
            .get(format!("{}/api.php", self.config.third_party_base))
            .query(&[("callback", "jQuery"), ("types", "url"), ("id", id)])
            .header("User-Agent", self.http.mobile_user_agent())
            .header("Referer", REFERER)
            .header("Accept", "*/*")
            .send()
            .await
            .map_err(http_err)?;
        let body = read_text(response).await?;
        let body = parse_json(strip_jsonp(&body))?;
        value_as_string(body.get("url")).ok_or(ProviderError::MissingUrl)
    }
}

fn vkey_request(mid: &str) -> Value {
    json!({
        "req_0": {
            "module": "vkey.GetVkeyServer",
            "method": "CgiGetVkey",
            "param": {
                "guid": "10000",
                "songmid": [mid],
                "songtype": [0],
                "uin": "0",
                "loginflag": 1,
                "platform": "20",
                "h5platform": "Android",
                "h5uin": "0",
                "h5guid": "10000",
                "h5channel": "mqq",
                "h5version": "1.0",
                "h5from": "mqq",
                "h5tag": "mqq",
            }
        }
    })
}

/// `req_0.data.sip[0] + req_0.data.midurlinfo[0].purl`
fn vkey_url(body: &Value) -> Result<String, ProviderError> {
    let req = body
        .get("req_0")
        .ok_or_else(|| ProviderError::UnexpectedPayload("缺少 req_0".to_string()))?;
    let code = value_as_i64(req.get("code")).unwrap_or(-1);
    if code != 0 {
        return Err(ProviderError::Status(code));
    }
    let sip = value_as_string(req.pointer("/data/sip/0"))
        .ok_or_else(|| ProviderError::UnexpectedPayload("缺少 sip".to_string()))?;
    let purl = value_as_string(req.pointer("/data/midurlinfo/0/purl")).ok_or(ProviderError::MissingUrl)?;
    Ok(format!("{}{}", sip, purl))
}

/// 去掉 ANSI 转义序列和首尾的控制字节
fn clean_body(body: &[u8]) -> Vec<u8> {
    let body = ANSI_ESCAPE.replace_all(body, &b""[..]);
    let is_noise = |b: &u8| matches!(b, 0x00 | 0x1b | 0x1f);
    let start = body.iter().position(|b| !is_noise(b)).unwrap_or(body.len());
    let end = body.iter().rposition(|b| !is_noise(b)).map_or(start, |i| i + 1);
    body[start..end].to_vec()
}

fn strip_jsonp(body: &str) -> &str {
    let body = body.trim();
    let body = body.strip_prefix("jQuery(").unwrap_or(body);
    body.strip_suffix(')').unwrap_or(body)
}

#[async_trait]
impl MusicProvider for QqProvider {
    fn source(&self) -> Source {
        Source::Qq
    }

    async fn search(&self, keyword: &str) -> Result<Vec<Song>, ProviderError> {
        info!("Searching qq: {}", keyword);
        let retries = self.config.retries.max(1);
        let mut last_err = ProviderError::Exhausted;

        for attempt in 1..=retries {
            match self.search_once(keyword).await {
                Ok(songs) => return Ok(songs),
                Err(e) => {
                    warn!("QQ search failed ({}/{}): {}", attempt, retries, e);
                    last_err = e;
                    if attempt < retries {
                        let backoff = self.config.retry_backoff_ms * attempt as u64;
                        tokio::time::sleep(Duration::from_millis(backoff)).await;
                    }
                }
            }
        }
        Err(last_err)
    }

    async fn song_url(&self, id: &str) -> Result<String, ProviderError> {
        info!("Resolving qq url: {}", id);
        Fallback::new("qq url")
            .attempt("vkey", move || self.url_vkey(id))
            .attempt("musics", move || self.url_musics(id))
            .attempt("third-party", move || self.url_third_party(id))
            .run(|url: &String| !url.is_empty())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfigImpl;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> QqProvider {
        let cfg = AppConfigImpl::default()
            .with_endpoint_base(&server.uri())
            .with_qq_retry(3, 0);
        QqProvider::new(HttpClient::new(&cfg.http()).unwrap(), cfg.qq(), 20)
    }

    #[test]
    fn test_clean_body_strips_noise() {
        let raw = b"\x00\x1f\x1b[0m{\"a\":1}\x1b[31m\x00";
        assert_eq!(clean_body(raw), b"{\"a\":1}".to_vec());
        assert_eq!(clean_body(b"\x00\x00"), Vec::<u8>::new());
    }

    #[test]
    fn test_strip_jsonp() {
        assert_eq!(strip_jsonp("jQuery({\"url\":\"x\"})"), "{\"url\":\"x\"}");
        assert_eq!(strip_jsonp("{\"url\":\"x\"}"), "{\"url\":\"x\"}");
    }

    #[test]
    fn test_vkey_url_extraction() {
        let body = json!({"req_0": {"code": 0, "data": {
            "sip": ["http://ws.stream.qqmusic.qq.com/"],
            "midurlinfo": [{"purl": "C400abc.m4a?vkey=1"}]
        }}});
        assert_eq!(
            vkey_url(&body).unwrap(),
            "http://ws.stream.qqmusic.qq.com/C400abc.m4a?vkey=1"
        );

        let no_purl = json!({"req_0": {"code": 0, "data": {"sip": ["http://a/"], "midurlinfo": [{"purl": ""}]}}});
        assert!(matches!(vkey_url(&no_purl), Err(ProviderError::MissingUrl)));

        let bad_code = json!({"req_0": {"code": 1000}});
        assert!(matches!(vkey_url(&bad_code), Err(ProviderError::Status(1000))));
    }

    #[tokio::test]
    async fn test_search_parses_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cgi-bin/musicu.fcg"))
            .and(body_partial_json(json!({"req_0": {"param": {"query": "晴天", "num_per_page": 20}}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0,
                "req_0": {"code": 0, "data": {"body": {"song": {"list": [
                    {
                        "mid": "0039MnYb0qxYhV",
                        "title": "晴天",
                        "singer": [{"name": "周杰伦"}],
                        "album": {"name": "叶惠美", "mid": "000MkMni19ClKG"}
                    },
                    {"mid": "", "title": "skip me"}
                ]}}}}
            })))
            .mount(&server)
            .await;

        let songs = provider(&server).search("晴天").await.unwrap();
        assert_eq!(
            songs,
            vec![Song::new("0039MnYb0qxYhV", "晴天", Source::Qq)
                .with_artist("周杰伦")
                .with_album("叶惠美")
                .with_cover(format!(
                    "{}/music/photo_new/T002R300x300M000000MkMni19ClKG.jpg",
                    server.uri()
                ))]
        );
    }

    #[tokio::test]
    async fn test_search_nonzero_code_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cgi-bin/musicu.fcg"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"req_0": {"code": 2001}})))
            .expect(1)
            .mount(&server)
            .await;

        let songs = provider(&server).search("x").await.unwrap();
        assert!(songs.is_empty());
    }

    #[tokio::test]
    async fn test_search_retries_then_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cgi-bin/musicu.fcg"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let result = provider(&server).search("x").await;
        assert!(matches!(result, Err(ProviderError::Http(_))));
    }

    #[tokio::test]
    async fn test_song_url_vkey_with_ansi_noise() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cgi-bin/musicu.fcg"))
            .and(body_partial_json(json!({"req_0": {"module": "vkey.GetVkeyServer"}})))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(
                "\x1b[0m{\"req_0\":{\"code\":0,\"data\":{\"sip\":[\"http://ws.stream/\"],\"midurlinfo\":[{\"purl\":\"C400.m4a\"}]}}}"
                    .as_bytes()
                    .to_vec(),
            ))
            .mount(&server)
            .await;

        let url = provider(&server).song_url("0039MnYb0qxYhV").await.unwrap();
        assert_eq!(url, "http://ws.stream/C400.m4a");
    }

    #[tokio::test]
    async fn test_song_url_falls_back_to_jsonp() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cgi-bin/musicu.fcg"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "req_0": {"code": 0, "data": {"sip": ["http://ws/"], "midurlinfo": [{"purl": ""}]}}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cgi-bin/musics.fcg"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x00\x00".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api.php"))
            .and(query_param("types", "url"))
            .and(query_param("id", "abc"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("jQuery({\"url\":\"http://third/abc.mp3\"})"),
            )
            .mount(&server)
            .await;

        let url = provider(&server).song_url("abc").await.unwrap();
        assert_eq!(url, "http://third/abc.mp3");
    }

    async fn mount_vkey_without_purl(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/cgi-bin/musicu.fcg"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "req_0": {"code": 0, "data": {"sip": ["http://ws/"], "midurlinfo": [{"purl": ""}]}}
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_song_url_musics_after_noise_stripped() {
        let server = MockServer::start().await;
        mount_vkey_without_purl(&server).await;
        Mock::given(method("GET"))
            .and(path("/cgi-bin/musics.fcg"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(
                "\x00\x1f\x1b[0m{\"req_0\":{\"code\":0,\"data\":{\"sip\":[\"http://isure.stream/\"],\"midurlinfo\":[{\"purl\":\"M500x.mp3\"}]}}}\x1b[0m\x00"
                    .as_bytes()
                    .to_vec(),
            ))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string("jQuery({\"url\":\"http://third/x\"})"))
            .expect(0)
            .mount(&server)
            .await;

        let url = provider(&server).song_url("x").await.unwrap();
        assert_eq!(url, "http://isure.stream/M500x.mp3");
    }

    #[tokio::test]
    async fn test_song_url_musics_rejects_non_http_url() {
        let server = MockServer::start().await;
        mount_vkey_without_purl(&server).await;
        Mock::given(method("GET"))
            .and(path("/cgi-bin/musics.fcg"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "req_0": {"code": 0, "data": {"sip": ["ftp://ws/"], "midurlinfo": [{"purl": "C400y.m4a"}]}}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api.php"))
            .and(query_param("id", "y"))
            .respond_with(ResponseTemplate::new(200).set_body_string("jQuery({\"url\":\"http://third/y.mp3\"})"))
            .expect(1)
            .mount(&server)
            .await;

        let url = provider(&server).song_url("y").await.unwrap();
        assert_eq!(url, "http://third/y.mp3");
    }
}
