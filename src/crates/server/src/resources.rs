use crate::api::error::ApiError;
use crate::consts;
use actix_files::{Files, NamedFile};
use actix_web::web;
use infra::config::ServerConfig;
use log::warn;
use std::path::{Path, PathBuf};

/// 静态文件挂载到 /static，首页 `/` 返回模板目录下的 index.html
pub fn configure_service(cfg: &mut web::ServiceConfig, server_config: &ServerConfig) {
    let static_dir = server_config.static_dir.clone();
    if Path::new(&static_dir).is_dir() {
        cfg.service(Files::new(consts::URL_PATH_STATIC, &static_dir));
    } else {
        warn!("Static directory '{}' not found, /static disabled", static_dir);
    }

    let index_file = server_config.index_path();
    cfg.route(
        "/",
        web::get().to(move || {
            let path = index_file.clone();
            async move { index(path).await }
        }),
    );
}

async fn index(path: PathBuf) -> Result<NamedFile, ApiError> {
    NamedFile::open_async(&path).await.map_err(|e| {
        warn!("Failed to open index file {}: {}", path.display(), e);
        ApiError::Internal("failed to load index page".to_string())
    })
}
