//! On-device generation backed by a lazily initialized engine.
//!
//! The concrete runtime (an in-process LLM engine) is a deployment choice
//! injected via [`EngineLoader`]; this module owns the initialization state
//! machine: the first caller constructs the engine behind a single-flight
//! guard, success is cached for all later calls, and a failed initialization
//! leaves the cache empty so a later call may retry.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::generation::{GenerationProvider, PromptTemplate};

const PROVIDER: &str = "Local";

/// An in-process text generation engine.
#[async_trait]
pub trait LocalEngine: Send + Sync {
    /// Generate a completion for the fully rendered prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Constructs a [`LocalEngine`], typically by loading model weights.
///
/// Called at most once per successful initialization; expensive work
/// belongs here, not in the engine's `generate`.
#[async_trait]
pub trait EngineLoader: Send + Sync {
    /// Build the engine.
    async fn load(&self) -> Result<Arc<dyn LocalEngine>>;
}

/// A [`GenerationProvider`] that runs an on-device engine.
///
/// The engine is constructed on the first `complete` call and reused for
/// the lifetime of the provider. No fallback text is produced when
/// initialization fails; the error is logged and propagated.
pub struct LocalGenerationProvider {
    loader: Box<dyn EngineLoader>,
    engine: OnceCell<Arc<dyn LocalEngine>>,
    template: PromptTemplate,
}

impl LocalGenerationProvider {
    /// Create a provider that initializes its engine via `loader`.
    pub fn new(loader: Box<dyn EngineLoader>) -> Self {
        Self { loader, engine: OnceCell::new(), template: PromptTemplate::default() }
    }

    /// Replace the prompt template.
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    async fn engine(&self) -> Result<&Arc<dyn LocalEngine>> {
        self.engine
            .get_or_try_init(|| async {
                info!(provider = PROVIDER, "initializing local engine");
                match self.loader.load().await {
                    Ok(engine) => {
                        info!(provider = PROVIDER, "local engine ready");
                        Ok(engine)
                    }
                    Err(e) => {
                        error!(provider = PROVIDER, error = %e, "local engine initialization failed");
                        Err(e)
                    }
                }
            })
            .await
    }
}

#[async_trait]
impl GenerationProvider for LocalGenerationProvider {
    async fn complete(&self, query: &str, context: &str, response_format: &str) -> Result<String> {
        let engine = self.engine().await?;
        let prompt = self.template.render(query, context, response_format);
        debug!(provider = PROVIDER, "generating completion");
        engine.generate(&prompt).await
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct EchoEngine;

    #[async_trait]
    impl LocalEngine for EchoEngine {
        async fn generate(&self, prompt: &str) -> Result<String> {
            Ok(format!("echo: {}", prompt.len()))
        }
    }

    /// Fails the first `failures` load attempts, then succeeds.
    struct FlakyLoader {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl EngineLoader for FlakyLoader {
        async fn load(&self) -> Result<Arc<dyn LocalEngine>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(RagError::Generation {
                    provider: "Local".to_string(),
                    message: "weights missing".to_string(),
                })
            } else {
                Ok(Arc::new(EchoEngine))
            }
        }
    }

    #[tokio::test]
    async fn engine_is_initialized_once_and_cached() {
        let loader = FlakyLoader { failures: 0, calls: AtomicU32::new(0) };
        let provider = LocalGenerationProvider::new(Box::new(loader));

        provider.complete("q", "c", "plain").await.unwrap();
        provider.complete("q2", "c2", "plain").await.unwrap();

        // A second loader observation is impossible through the public API;
        // cached engine means repeated calls succeed without re-init.
        assert!(provider.engine.get().is_some());
    }

    #[tokio::test]
    async fn failed_initialization_propagates_and_allows_retry() {
        let loader = FlakyLoader { failures: 1, calls: AtomicU32::new(0) };
        let provider = LocalGenerationProvider::new(Box::new(loader));

        let err = provider.complete("q", "c", "plain").await.unwrap_err();
        assert!(matches!(err, RagError::Generation { .. }));
        assert!(provider.engine.get().is_none());

        // The cache was left empty, so the next call retries and succeeds.
        let answer = provider.complete("q", "c", "plain").await.unwrap();
        assert!(answer.starts_with("echo:"));
    }
}
