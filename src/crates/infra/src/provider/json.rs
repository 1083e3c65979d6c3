//! 第三方接口 JSON 的宽松读取
//!
//! 各家接口对同一字段时而返回数字、时而返回字符串，这里统一转换。

use domain::{ProviderError, Song, Source};
use serde_json::Value;

pub(crate) fn value_as_string(value: Option<&Value>) -> Option<String> {
    let item = value?;
    if let Some(raw) = item.as_str() {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        return Some(trimmed.to_string());
    }
    if let Some(number) = item.as_i64() {
        return Some(number.to_string());
    }
    if let Some(number) = item.as_u64() {
        return Some(number.to_string());
    }
    if let Some(number) = item.as_f64() {
        // 部分接口把 id 写成 1.0e7 之类的浮点数
        if number.fract() == 0.0 && number.is_finite() {
            return Some(format!("{:.0}", number));
        }
    }
    None
}

pub(crate) fn value_as_i64(value: Option<&Value>) -> Option<i64> {
    let item = value?;
    if let Some(number) = item.as_i64() {
        return Some(number);
    }
    if let Some(raw) = item.as_str() {
        return raw.trim().parse::<i64>().ok();
    }
    None
}

/// 网易云风格的歌曲条目，兼容 `artists`/`ar` 与 `album`/`al` 两套字段名
pub(crate) fn song_from_catalog_item(item: &Value, source: Source) -> Option<Song> {
    let id = value_as_string(item.get("id"))?;
    let title = value_as_string(item.get("name"))?;

    let artists = item
        .get("artists")
        .or_else(|| item.get("ar"))
        .and_then(Value::as_array)
        .map(|list| {
            Song::join_artists(
                list.iter()
                    .filter_map(|artist| value_as_string(artist.get("name"))),
            )
        })
        .unwrap_or_default();

    let album = item.get("album").or_else(|| item.get("al"));
    let album_name = album
        .and_then(|a| value_as_string(a.get("name")))
        .unwrap_or_default();
    let cover = album
        .and_then(|a| value_as_string(a.get("picUrl")))
        .unwrap_or_default();

    Some(
        Song::new(id, title, source)
            .with_artist(artists)
            .with_album(album_name)
            .with_cover(cover),
    )
}

/// 校验响应体中的业务码，缺失时按 -1 处理
pub(crate) fn expect_code(body: &Value, expected: i64) -> Result<(), ProviderError> {
    let code = value_as_i64(body.get("code")).unwrap_or(-1);
    if code == expected {
        Ok(())
    } else {
        Err(ProviderError::Status(code))
    }
}

pub(crate) fn catalog_songs(body: &Value, pointer: &str, source: Source) -> Vec<Song> {
    body.pointer(pointer)
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|item| song_from_catalog_item(item, source))
                .collect()
        })
        .unwrap_or_default()
}

/// 读取 `data[0].url`
pub(crate) fn first_data_url(body: &Value) -> Option<String> {
    value_as_string(body.pointer("/data/0/url"))
}
