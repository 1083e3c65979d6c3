/// JSON 接口前缀
pub const URL_PATH_API: &str = "/api";
/// 静态文件挂载路径
pub const URL_PATH_STATIC: &str = "/static";
/// 取链失败时返回给前端的提示
pub const MSG_SONG_URL_FAILED: &str = "failed to resolve song url";
