pub mod error;
pub mod response;
pub mod search;
pub mod song;

use crate::consts;
use actix_web::http::Method;
use actix_web::{web, HttpResponse};

pub fn configure_service(svc: &mut web::ServiceConfig) {
    svc.service(
        web::scope(consts::URL_PATH_API)
            .configure(|cfg| register_get("search", search::search, cfg))
            .configure(|cfg| register_get("song", song::song_url, cfg)),
    );
}

/// 注册 GET 路由；OPTIONS 直接返回 200，其余方法返回 405
fn register_get<F, Args>(name: &str, handler: F, cfg: &mut web::ServiceConfig)
where
    F: actix_web::Handler<Args>,
    Args: actix_web::FromRequest + 'static,
    F::Output: actix_web::Responder + 'static,
{
    cfg.service(
        web::resource(format!("/{}", name))
            .route(web::get().to(handler))
            .route(web::method(Method::OPTIONS).to(|| async { HttpResponse::Ok().finish() }))
            .default_service(web::to(|| async { HttpResponse::MethodNotAllowed().finish() })),
    );
}
