use crate::error::AppError;
use crate::registry::ProviderRegistry;
use domain::{Song, Source};
use log::{info, warn};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub songs: Vec<Song>,
    pub total: usize,
}

/// 按关键词依次查询各音乐源并合并结果
///
/// 音乐源按请求顺序逐个查询，某个源失败只记录日志并跳过，不影响其他源。
#[derive(Clone)]
pub struct SearchSongs {
    registry: Arc<ProviderRegistry>,
    default_sources: Vec<Source>,
}

impl SearchSongs {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            default_sources: Source::ALL.to_vec(),
        }
    }

    /// 覆盖未指定 sources 时的默认查询顺序，空列表保持原默认值
    pub fn with_default_sources(mut self, sources: Vec<Source>) -> Self {
        if !sources.is_empty() {
            self.default_sources = sources;
        }
        self
    }

    /// `sources` 为逗号分隔的音乐源列表，为空时使用全部默认源
    pub async fn handle(
        &self,
        keyword: &str,
        sources: Option<&str>,
    ) -> Result<SearchOutcome, AppError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(AppError::InvalidInput("keyword is required".to_string()));
        }

        let mut songs: Vec<Song> = Vec::new();
        let mut seen: HashSet<(String, Source)> = HashSet::new();

        for tag in requested_sources(sources, &self.default_sources) {
            let source = match tag.parse::<Source>() {
                Ok(source) => source,
                Err(e) => {
                    warn!("Skip search source: {}", e);
                    continue;
                }
            };
            let Some(provider) = self.registry.get(source) else {
                warn!("No provider registered for source {}", source);
                continue;
            };

            match provider.search(keyword).await {
                Ok(found) => {
                    info!("Source {} returned {} songs for {:?}", source, found.len(), keyword);
                    for song in found {
                        if seen.insert((song.id.clone(), song.source)) {
                            songs.push(song);
                        }
                    }
                }
                Err(e) => warn!("Search from {} failed: {}", source, e),
            }
        }

        let total = songs.len();
        Ok(SearchOutcome { songs, total })
    }
}

/// 解析 sources 参数；缺省或全为空白时返回默认顺序
fn requested_sources(raw: Option<&str>, defaults: &[Source]) -> Vec<String> {
    let parsed: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if parsed.is_empty() {
        defaults.iter().map(|s| s.to_string()).collect()
    } else {
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::testing::FakeProvider;
    use pretty_assertions::assert_eq;

    fn registry(providers: Vec<Arc<FakeProvider>>) -> Arc<ProviderRegistry> {
        let mut registry = ProviderRegistry::new();
        for p in providers {
            registry.register(p);
        }
        Arc::new(registry)
    }

    fn ids(outcome: &SearchOutcome) -> Vec<(String, Source)> {
        outcome
            .songs
            .iter()
            .map(|s| (s.id.clone(), s.source))
            .collect()
    }

    #[test]
    fn test_requested_sources_default() {
        let defaults = Source::ALL;
        assert_eq!(requested_sources(None, &defaults), vec!["qq", "netease", "kuwo"]);
        assert_eq!(requested_sources(Some(" , "), &defaults), vec!["qq", "netease", "kuwo"]);
        assert_eq!(requested_sources(Some("kuwo, qq"), &defaults), vec!["kuwo", "qq"]);
        assert_eq!(requested_sources(Some(""), &[Source::Kuwo]), vec!["kuwo"]);
    }

    #[tokio::test]
    async fn test_configured_default_sources() {
        let qq = Arc::new(FakeProvider::with_songs(Source::Qq, &["q1"]));
        let kuwo = Arc::new(FakeProvider::with_songs(Source::Kuwo, &["k1"]));
        let search = SearchSongs::new(registry(vec![qq.clone(), kuwo]))
            .with_default_sources(vec![Source::Kuwo]);

        let outcome = search.handle("jay", None).await.unwrap();

        assert_eq!(ids(&outcome), vec![("k1".to_string(), Source::Kuwo)]);
        assert_eq!(qq.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_keyword_rejected() {
        let search = SearchSongs::new(registry(vec![]));
        let result = search.handle("   ", None).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_results_follow_source_order() {
        let qq = Arc::new(FakeProvider::with_songs(Source::Qq, &["q1"]));
        let netease = Arc::new(FakeProvider::with_songs(Source::Netease, &["n1", "n2"]));
        let kuwo = Arc::new(FakeProvider::with_songs(Source::Kuwo, &["k1"]));
        let search = SearchSongs::new(registry(vec![qq, netease, kuwo]));

        let outcome = search.handle("jay", Some("kuwo,netease")).await.unwrap();

        assert_eq!(
            ids(&outcome),
            vec![
                ("k1".to_string(), Source::Kuwo),
                ("n1".to_string(), Source::Netease),
                ("n2".to_string(), Source::Netease),
            ]
        );
        assert_eq!(outcome.total, 3);
    }

    #[tokio::test]
    async fn test_failing_and_unknown_sources_are_skipped() {
        let qq = Arc::new(FakeProvider::failing(Source::Qq));
        let kuwo = Arc::new(FakeProvider::with_songs(Source::Kuwo, &["k1"]));
        let search = SearchSongs::new(registry(vec![qq.clone(), kuwo.clone()]));

        let outcome = search.handle("jay", Some("qq,spotify,netease,kuwo")).await.unwrap();

        assert_eq!(ids(&outcome), vec![("k1".to_string(), Source::Kuwo)]);
        assert_eq!(qq.call_count(), 1);
        assert_eq!(kuwo.call_count(), 1);
    }

    #[tokio::test]
    async fn test_all_sources_failing_yields_empty_result() {
        let qq = Arc::new(FakeProvider::failing(Source::Qq));
        let search = SearchSongs::new(registry(vec![qq]));

        let outcome = search.handle("jay", None).await.unwrap();

        assert!(outcome.songs.is_empty());
        assert_eq!(outcome.total, 0);
    }

    #[tokio::test]
    async fn test_duplicate_natural_keys_are_dropped() {
        let qq = Arc::new(FakeProvider::with_songs(Source::Qq, &["1", "2", "1"]));
        let netease = Arc::new(FakeProvider::with_songs(Source::Netease, &["1"]));
        let search = SearchSongs::new(registry(vec![qq, netease]));

        let outcome = search.handle("jay", Some("qq,netease,qq")).await.unwrap();

        assert_eq!(
            ids(&outcome),
            vec![
                ("1".to_string(), Source::Qq),
                ("2".to_string(), Source::Qq),
                ("1".to_string(), Source::Netease),
            ]
        );
    }
}
