use super::error::ApiError;
use super::response::SearchResponse;
use crate::AppState;
use actix_web::web;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct SearchQuery {
    /// 搜索关键词，必填
    #[serde(default)]
    pub keyword: Option<String>,
    /// 逗号分隔的音乐源，缺省时查询全部默认源
    #[serde(default)]
    pub sources: Option<String>,
}

/// GET /api/search?keyword=&sources=
pub async fn search(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> Result<web::Json<SearchResponse>, ApiError> {
    let keyword = query.keyword.as_deref().unwrap_or_default();
    if keyword.trim().is_empty() {
        return Err(ApiError::BadRequest("keyword is required".to_string()));
    }

    let outcome = state
        .search_songs
        .handle(keyword, query.sources.as_deref())
        .await?;

    Ok(web::Json(SearchResponse {
        songs: outcome.songs,
        total: outcome.total,
    }))
}
