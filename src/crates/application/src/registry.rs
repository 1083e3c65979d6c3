use domain::{MusicProvider, Source};
use std::collections::HashMap;
use std::sync::Arc;

/// 按音乐源索引的 provider 集合
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<Source, Arc<dyn MusicProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册 provider，同一音乐源后注册的覆盖先注册的
    pub fn register(&mut self, provider: Arc<dyn MusicProvider>) -> &mut Self {
        self.providers.insert(provider.source(), provider);
        self
    }

    pub fn get(&self, source: Source) -> Option<Arc<dyn MusicProvider>> {
        self.providers.get(&source).cloned()
    }

    pub fn sources(&self) -> Vec<Source> {
        Source::ALL
            .into_iter()
            .filter(|s| self.providers.contains_key(s))
            .collect()
    }
}
