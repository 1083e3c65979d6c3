use actix_cors::Cors;
use actix_web::http::header;

/// 允许任意来源以 GET 访问接口，预检请求由中间件直接应答
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "OPTIONS"])
        .allowed_header(header::CONTENT_TYPE)
        .max_age(3600)
}
