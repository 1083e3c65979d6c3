use config::{Config, Environment, File};
use domain::Source;
use dotenvy::dotenv;
use log::warn;
use serde::Deserialize;
use std::error::Error;

/// 桌面端浏览器 UA
const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
/// 移动端浏览器 UA
const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 13_2_3 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/13.0.3 Mobile/15E148 Safari/604.1";

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawConfig {
    /// 服务器配置
    server: RawServerConfig,
    /// HTTP 客户端配置
    http: RawHttpConfig,
    /// 搜索配置
    search: RawSearchConfig,
    qq: RawQqConfig,
    netease: RawNeteaseConfig,
    kuwo: RawKuwoConfig,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            server: RawServerConfig::default(),
            http: RawHttpConfig::default(),
            search: RawSearchConfig::default(),
            qq: RawQqConfig::default(),
            netease: RawNeteaseConfig::default(),
            kuwo: RawKuwoConfig::default(),
        }
    }
}

/// 服务器配置（原始配置）
#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawServerConfig {
    /// 监听地址
    host: String,
    /// 监听端口
    port: u16,
    /// 静态文件目录，映射到 /static
    static_dir: String,
    /// 首页模板目录
    templates_dir: String,
}

impl Default for RawServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8082,
            static_dir: "static".to_string(),
            templates_dir: "templates".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawHttpConfig {
    /// 单次请求超时（秒）
    timeout_secs: u64,
    desktop_user_agent: String,
    mobile_user_agent: String,
}

impl Default for RawHttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            desktop_user_agent: DESKTOP_USER_AGENT.to_string(),
            mobile_user_agent: MOBILE_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawSearchConfig {
    /// 每个音乐源返回的最大条数
    limit: u32,
    /// 未指定 sources 时的默认音乐源顺序
    default_sources: Vec<String>,
}

impl Default for RawSearchConfig {
    fn default() -> Self {
        Self {
            limit: 20,
            default_sources: Source::ALL.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawQqConfig {
    /// 搜索失败重试次数（含首次）
    retries: u32,
    /// 重试退避基数（毫秒），第 n 次失败后等待 n * retry_backoff_ms
    retry_backoff_ms: u64,
    musicu_base: String,
    cover_base: String,
    third_party_base: String,
}

impl Default for RawQqConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_backoff_ms: 2000,
            musicu_base: "https://u.y.qq.com".to_string(),
            cover_base: "https://y.gtimg.cn".to_string(),
            third_party_base: "https://api.zhuolin.wang".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawNeteaseConfig {
    api_base: String,
    backup_base: String,
}

impl Default for RawNeteaseConfig {
    fn default() -> Self {
        Self {
            api_base: "https://music.163.com".to_string(),
            backup_base: "https://musicapi.leanapp.cn".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawKuwoConfig {
    www_base: String,
    backup_base: String,
    /// kw_token 有效期（秒）
    token_ttl_secs: u64,
    /// 无法获取 kw_token 时使用的固定值
    fallback_token: String,
}

impl Default for RawKuwoConfig {
    fn default() -> Self {
        Self {
            www_base: "http://www.kuwo.cn".to_string(),
            backup_base: "https://musicapi.leanapp.cn".to_string(),
            token_ttl_secs: 30 * 60,
            fallback_token: "JQOEP7QK8RS".to_string(),
        }
    }
}

/// 服务器配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    pub static_dir: String,
    pub templates_dir: String,
}

impl ServerConfig {
    /// 首页文件路径
    pub fn index_path(&self) -> std::path::PathBuf {
        std::path::PathBuf::from(&self.templates_dir).join("index.html")
    }
}

/// HTTP 客户端配置
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub desktop_user_agent: String,
    pub mobile_user_agent: String,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub limit: u32,
    pub default_sources: Vec<Source>,
}

#[derive(Debug, Clone)]
pub struct QqConfig {
    pub retries: u32,
    pub retry_backoff_ms: u64,
    pub musicu_base: String,
    pub cover_base: String,
    pub third_party_base: String,
}

#[derive(Debug, Clone)]
pub struct NeteaseConfig {
    pub api_base: String,
    pub backup_base: String,
}

#[derive(Debug, Clone)]
pub struct KuwoConfig {
    pub www_base: String,
    pub backup_base: String,
    pub token_ttl_secs: u64,
    pub fallback_token: String,
}

#[derive(Debug, Clone)]
pub struct AppConfigImpl {
    server: ServerConfig,
    http: HttpConfig,
    search: SearchConfig,
    qq: QqConfig,
    netease: NeteaseConfig,
    kuwo: KuwoConfig,
}

impl Default for AppConfigImpl {
    fn default() -> Self {
        Self::new(RawConfig::default())
    }
}

fn trim_base(base: String) -> String {
    base.trim_end_matches('/').to_string()
}

impl AppConfigImpl {
    fn new(data: RawConfig) -> Self {
        let default_sources = data
            .search
            .default_sources
            .iter()
            .filter_map(|tag| match tag.parse::<Source>() {
                Ok(source) => Some(source),
                Err(e) => {
                    warn!("Ignore default source: {}", e);
                    None
                }
            })
            .collect();
        AppConfigImpl {
            server: ServerConfig {
                host: data.server.host,
                port: data.server.port,
                static_dir: data.server.static_dir,
                templates_dir: data.server.templates_dir,
            },
            http: HttpConfig {
                timeout_secs: data.http.timeout_secs,
                desktop_user_agent: data.http.desktop_user_agent,
                mobile_user_agent: data.http.mobile_user_agent,
            },
            search: SearchConfig {
                limit: data.search.limit,
                default_sources,
            },
            qq: QqConfig {
                retries: data.qq.retries.max(1),
                retry_backoff_ms: data.qq.retry_backoff_ms,
                musicu_base: trim_base(data.qq.musicu_base),
                cover_base: trim_base(data.qq.cover_base),
                third_party_base: trim_base(data.qq.third_party_base),
            },
            netease: NeteaseConfig {
                api_base: trim_base(data.netease.api_base),
                backup_base: trim_base(data.netease.backup_base),
            },
            kuwo: KuwoConfig {
                www_base: trim_base(data.kuwo.www_base),
                backup_base: trim_base(data.kuwo.backup_base),
                token_ttl_secs: data.kuwo.token_ttl_secs,
                fallback_token: data.kuwo.fallback_token,
            },
        }
    }

    pub fn load() -> Result<AppConfigImpl, Box<dyn Error>> {
        dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        let raw: RawConfig = config.try_deserialize()?; // serde 自动填充默认值
        let mut app_config = AppConfigImpl::new(raw);

        // 兼容直接设置 PORT 的部署方式
        if let Ok(port) = std::env::var("PORT") {
            match port.parse::<u16>() {
                Ok(port) => app_config.server.port = port,
                Err(e) => warn!("Invalid PORT {:?}: {}", port, e),
            }
        }
        Ok(app_config)
    }

    pub fn server(&self) -> ServerConfig {
        self.server.clone()
    }

    pub fn http(&self) -> HttpConfig {
        self.http.clone()
    }

    pub fn search(&self) -> SearchConfig {
        self.search.clone()
    }

    pub fn qq(&self) -> QqConfig {
        self.qq.clone()
    }

    pub fn netease(&self) -> NeteaseConfig {
        self.netease.clone()
    }

    pub fn kuwo(&self) -> KuwoConfig {
        self.kuwo.clone()
    }

    /// 把所有音乐源的接口地址指向同一个 base，用于集成测试
    #[cfg(test)]
    pub(crate) fn with_endpoint_base(mut self, base: &str) -> Self {
        let base = trim_base(base.to_string());
        self.qq.musicu_base = base.clone();
        self.qq.cover_base = base.clone();
        self.qq.third_party_base = base.clone();
        self.netease.api_base = base.clone();
        self.netease.backup_base = base.clone();
        self.kuwo.www_base = base.clone();
        self.kuwo.backup_base = base;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_qq_retry(mut self, retries: u32, retry_backoff_ms: u64) -> Self {
        self.qq.retries = retries.max(1);
        self.qq.retry_backoff_ms = retry_backoff_ms;
        self
    }
}
