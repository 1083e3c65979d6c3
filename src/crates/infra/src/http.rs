use crate::config::HttpConfig;
use domain::ProviderError;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Response};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// 每个音乐源独享的 HTTP 客户端，带 cookie 罐
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    jar: Arc<Jar>,
    desktop_user_agent: String,
    mobile_user_agent: String,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self, ProviderError> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(jar.clone())
            .gzip(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(http_err)?;
        Ok(Self {
            client,
            jar,
            desktop_user_agent: config.desktop_user_agent.clone(),
            mobile_user_agent: config.mobile_user_agent.clone(),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn desktop_user_agent(&self) -> &str {
        &self.desktop_user_agent
    }

    pub fn mobile_user_agent(&self) -> &str {
        &self.mobile_user_agent
    }

    /// 读取 cookie 罐中某个地址下的指定 cookie
    pub fn cookie(&self, url: &str, name: &str) -> Option<String> {
        let url = Url::parse(url).ok()?;
        let header = self.jar.cookies(&url)?;
        let header = header.to_str().ok()?;
        header.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name && !value.is_empty()).then(|| value.to_string())
        })
    }
}

pub(crate) fn http_err(e: reqwest::Error) -> ProviderError {
    ProviderError::Http(e.to_string())
}

/// 校验 HTTP 状态码并读取响应体
pub(crate) async fn read_text(response: Response) -> Result<String, ProviderError> {
    let response = response.error_for_status().map_err(http_err)?;
    response.text().await.map_err(http_err)
}

pub(crate) async fn read_bytes(response: Response) -> Result<Vec<u8>, ProviderError> {
    let response = response.error_for_status().map_err(http_err)?;
    let bytes = response.bytes().await.map_err(http_err)?;
    Ok(bytes.to_vec())
}

pub(crate) fn parse_json(body: &str) -> Result<Value, ProviderError> {
    serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))
}

pub(crate) async fn read_json(response: Response) -> Result<Value, ProviderError> {
    let body = read_text(response).await?;
    parse_json(&body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfigImpl;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_cookie_jar_keeps_session_cookies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .append_header("Set-Cookie", "__csrf=abc123; Path=/")
                    .append_header("Set-Cookie", "NMTID=xyz; Path=/"),
            )
            .mount(&server)
            .await;

        let http = HttpClient::new(&AppConfigImpl::default().http()).unwrap();
        let response = http.client().get(server.uri()).send().await.unwrap();
        read_text(response).await.unwrap();

        assert_eq!(http.cookie(&server.uri(), "__csrf"), Some("abc123".to_string()));
        assert_eq!(http.cookie(&server.uri(), "NMTID"), Some("xyz".to_string()));
        assert_eq!(http.cookie(&server.uri(), "missing"), None);
    }

    #[tokio::test]
    async fn test_error_status_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let http = HttpClient::new(&AppConfigImpl::default().http()).unwrap();
        let response = http.client().get(server.uri()).send().await.unwrap();
        let result = read_json(response).await;
        assert!(matches!(result, Err(ProviderError::Http(_))));
    }

    #[test]
    fn test_parse_json_decode_error() {
        assert!(matches!(parse_json("not json"), Err(ProviderError::Decode(_))));
    }
}
