use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};

use infra::config::AppConfigImpl;
use log::{error, info};
use log4rs::{
    append::{console::ConsoleAppender, file::FileAppender},
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};
use std::io;

use server::middleware::other;

const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {m}{n}";

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    // 配置日志同时输出到控制台和文件
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build("app.log")?;

    let config = Config::builder()
        .appender(Appender::builder().build("file", Box::new(file_appender)))
        .appender(Appender::builder().build(
            "stdout",
            Box::new(
                ConsoleAppender::builder()
                    .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
                    .build(),
            ),
        ))
        .build(
            Root::builder()
                .appender("file")
                .appender("stdout")
                .build(log_level.parse().unwrap_or(log::LevelFilter::Info)),
        )?;

    log4rs::init_config(config)?;
    Ok(())
}

fn to_io_error(e: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e.to_string())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    init_logging().map_err(to_io_error)?;

    let cfg = AppConfigImpl::load().map_err(|e| {
        error!("Failed to load config: {}", e);
        to_io_error(e)
    })?;
    let server_cfg = cfg.server();

    let registry = infra::build_registry(&cfg).map_err(|e| {
        error!("Failed to create music providers: {}", e);
        to_io_error(e)
    })?;
    let app_state = web::Data::new(server::AppState::new(&cfg, registry));

    info!("Listening on {}:{}", server_cfg.host, server_cfg.port);
    let resources_cfg = server_cfg.clone();
    HttpServer::new(move || {
        let resources_cfg = resources_cfg.clone();
        App::new()
            .app_data(app_state.clone())
            .wrap(Logger::default())
            .configure(server::api::configure_service)
            .configure(move |svc| server::resources::configure_service(svc, &resources_cfg))
            .wrap(other::cors())
    })
    .bind((server_cfg.host.as_str(), server_cfg.port))?
    .run()
    .await
}
