use domain::ProviderError;
use futures::future::BoxFuture;
use futures::FutureExt;
use log::{info, warn};
use std::future::Future;

type Attempt<'a, T> = Box<dyn FnOnce() -> BoxFuture<'a, Result<T, ProviderError>> + Send + 'a>;

/// 按顺序尝试的备用接口链
///
/// 每个尝试在轮到它时才会被调用。第一个满足 `usable` 的 `Ok` 直接返回；
/// 全部尝试完后返回最后一个 `Ok`，没有则返回最后一个错误。
pub struct Fallback<'a, T> {
    label: &'a str,
    attempts: Vec<(&'static str, Attempt<'a, T>)>,
}

impl<'a, T: Send + 'a> Fallback<'a, T> {
    pub fn new(label: &'a str) -> Self {
        Self {
            label,
            attempts: Vec::new(),
        }
    }

    pub fn attempt<F, Fut>(mut self, name: &'static str, f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<T, ProviderError>> + Send + 'a,
    {
        self.attempts.push((name, Box::new(move || f().boxed())));
        self
    }

    pub async fn run<U>(self, usable: U) -> Result<T, ProviderError>
    where
        U: Fn(&T) -> bool + Send,
    {
        let mut last_ok = None;
        let mut last_err = None;

        for (name, attempt) in self.attempts {
            info!("{}: trying {}", self.label, name);
            match attempt().await {
                Ok(value) if usable(&value) => return Ok(value),
                Ok(value) => {
                    warn!("{}: {} returned an unusable result", self.label, name);
                    last_ok = Some(value);
                }
                Err(e) => {
                    warn!("{}: {} failed: {}", self.label, name, e);
                    last_err = Some(e);
                }
            }
        }

        match (last_ok, last_err) {
            (Some(value), _) => Ok(value),
            (None, Some(e)) => Err(e),
            (None, None) => Err(ProviderError::Exhausted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn non_empty(v: &Vec<u32>) -> bool {
        !v.is_empty()
    }

    #[tokio::test]
    async fn test_first_usable_wins_and_rest_is_lazy() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let result = Fallback::new("test")
            .attempt("a", || async { Err(ProviderError::MissingUrl) })
            .attempt("b", || async { Ok(vec![1, 2]) })
            .attempt("c", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(vec![3])
            })
            .run(non_empty)
            .await;

        assert_eq!(result.unwrap(), vec![1, 2]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unusable_ok_is_kept_over_later_error() {
        let result = Fallback::new("test")
            .attempt("a", || async { Ok(Vec::<u32>::new()) })
            .attempt("b", || async { Err(ProviderError::Status(-1)) })
            .run(non_empty)
            .await;

        assert_eq!(result.unwrap(), Vec::<u32>::new());
    }

    #[tokio::test]
    async fn test_all_failures_return_last_error() {
        let result: Result<Vec<u32>, _> = Fallback::new("test")
            .attempt("a", || async { Err(ProviderError::Http("down".into())) })
            .attempt("b", || async { Err(ProviderError::Status(404)) })
            .run(non_empty)
            .await;

        assert!(matches!(result, Err(ProviderError::Status(404))));
    }

    #[tokio::test]
    async fn test_empty_chain_is_exhausted() {
        let result: Result<Vec<u32>, _> = Fallback::new("test").run(non_empty).await;
        assert!(matches!(result, Err(ProviderError::Exhausted)));
    }
}
