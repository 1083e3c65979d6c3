use super::error::ApiError;
use super::response::SongUrlResponse;
use crate::AppState;
use actix_web::web;
use application::error::AppError;
use log::warn;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct SongQuery {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// GET /api/song?id=&source=
///
/// 参数缺失返回 400；取链失败仍返回 200，由 body 中的 code 区分。
pub async fn song_url(
    state: web::Data<AppState>,
    query: web::Query<SongQuery>,
) -> Result<web::Json<SongUrlResponse>, ApiError> {
    let id = query.id.as_deref().unwrap_or_default();
    let source = query.source.as_deref().unwrap_or_default();
    if id.trim().is_empty() || source.trim().is_empty() {
        return Err(ApiError::BadRequest("id and source are required".to_string()));
    }

    match state.get_song_url.handle(id, source).await {
        Ok(url) => Ok(web::Json(SongUrlResponse::ok(url))),
        Err(AppError::InvalidInput(message)) => Err(ApiError::BadRequest(message)),
        Err(e) => {
            warn!("Failed to resolve {} song {}: {}", source, id, e);
            Ok(web::Json(SongUrlResponse::failed()))
        }
    }
}
