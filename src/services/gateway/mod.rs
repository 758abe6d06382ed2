//! Request gateway in front of the generative text service.
//!
//! Every generative call in the engine goes through [`RequestGateway::invoke`],
//! which layers response caching, a process-wide minimum-interval rate
//! limiter, per-attempt timeouts, exponential-backoff retry and an optional
//! one-step tier fallback over a [`TextGenerator`].

pub mod cache;
pub mod rate_limiter;
pub mod retry;
pub mod usage;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::domain::errors::{DomainResult, GatewayError, GenerationError};
use crate::domain::models::{Config, ModelTier, UsageSnapshot};
use crate::domain::ports::{CacheStore, GenerationRequest, TextGenerator};
use crate::services::model_router::TierRouter;
use usage::record_all;

pub use cache::{cache_key, ResponseCache};
pub use rate_limiter::MinIntervalRateLimiter;
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use usage::{RunUsage, UsageTracker};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_MAX_TOKENS: u32 = 4096;

enum DispatchFailure {
    Malformed(String),
    Failed { attempts: u32, error: GenerationError },
}

/// Shared entry point for all generative calls.
///
/// Construct once and share behind an `Arc`; concurrent runs share the
/// cache, the limiter and the usage counters.
pub struct RequestGateway {
    generator: Arc<dyn TextGenerator>,
    router: TierRouter,
    cache: Option<ResponseCache>,
    limiter: MinIntervalRateLimiter,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    timeout: Duration,
    tier_fallback: bool,
    max_tokens: u32,
    usage: UsageTracker,
}

impl RequestGateway {
    /// A gateway with an in-memory cache, no rate limiting and default retry.
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            router: TierRouter::default(),
            cache: Some(ResponseCache::in_memory()),
            limiter: MinIntervalRateLimiter::from_millis(0),
            retry: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
            timeout: DEFAULT_TIMEOUT,
            tier_fallback: false,
            max_tokens: DEFAULT_MAX_TOKENS,
            usage: UsageTracker::new(),
        }
    }

    /// Build from configuration. `cache_store` is used only when caching and
    /// persistence are both enabled.
    pub fn from_config(
        config: &Config,
        generator: Arc<dyn TextGenerator>,
        cache_store: Option<Arc<dyn CacheStore>>,
    ) -> Self {
        let gateway = &config.gateway;
        let cache = match (gateway.cache_enabled, gateway.cache_persist, cache_store) {
            (false, _, _) => None,
            (true, true, Some(store)) => Some(ResponseCache::with_store(store)),
            (true, _, _) => Some(ResponseCache::in_memory()),
        };

        Self {
            router: TierRouter::new(config.models.clone()),
            cache,
            limiter: MinIntervalRateLimiter::from_millis(gateway.min_interval_ms),
            retry: RetryPolicy::from_config(&config.retry),
            timeout: Duration::from_secs(gateway.request_timeout_secs),
            tier_fallback: gateway.tier_fallback,
            max_tokens: config.provider.max_tokens,
            ..Self::new(generator)
        }
    }

    pub fn with_router(mut self, router: TierRouter) -> Self {
        self.router = router;
        self
    }

    pub fn with_cache(mut self, cache: Option<ResponseCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_rate_limiter(mut self, limiter: MinIntervalRateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_tier_fallback(mut self, enabled: bool) -> Self {
        self.tier_fallback = enabled;
        self
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    /// Load persisted cache entries. Returns the number loaded.
    pub async fn warm_cache(&self) -> DomainResult<usize> {
        match &self.cache {
            Some(cache) => cache.warm().await,
            None => Ok(0),
        }
    }

    /// Read-only usage counters.
    pub fn usage(&self) -> UsageSnapshot {
        self.usage.snapshot()
    }

    /// Produce text for `prompt` on `tier`.
    #[instrument(skip(self, prompt), fields(prompt_chars = prompt.len()))]
    pub async fn invoke(&self, prompt: &str, tier: ModelTier) -> Result<String, GatewayError> {
        record_all(&self.usage, UsageTracker::record_invocation);

        if let Some(cache) = &self.cache {
            if let Some(entry) = cache.get(&cache_key(tier, prompt)).await {
                record_all(&self.usage, UsageTracker::record_cache_hit);
                debug!(%tier, "cache hit");
                return Ok(entry.response);
            }
        }

        let mut served_tier = tier;
        let mut fell_back = false;
        loop {
            match self.dispatch_with_retry(prompt, served_tier).await {
                Ok(text) => {
                    if let Some(cache) = &self.cache {
                        cache
                            .put(cache_key(served_tier, prompt), served_tier, text.clone())
                            .await;
                        // a repeat request on the original tier must not dispatch again
                        if served_tier != tier {
                            cache
                                .put(cache_key(tier, prompt), served_tier, text.clone())
                                .await;
                        }
                    }
                    return Ok(text);
                }
                Err(DispatchFailure::Malformed(detail)) => {
                    record_all(&self.usage, UsageTracker::record_failure);
                    warn!(tier = %served_tier, %detail, "malformed response");
                    return Err(GatewayError::Malformed(detail));
                }
                Err(DispatchFailure::Failed { attempts, error }) => {
                    let exhausted = error.is_transient();
                    if self.tier_fallback && exhausted && !fell_back {
                        if let Some(next) = served_tier.fallback() {
                            warn!(
                                from = %served_tier,
                                to = %next,
                                attempts,
                                error = %error,
                                "retries exhausted, falling back to cheaper tier"
                            );
                            served_tier = next;
                            fell_back = true;
                            continue;
                        }
                    }

                    record_all(&self.usage, UsageTracker::record_failure);
                    warn!(tier = %served_tier, attempts, error = %error, "generation unavailable");
                    return Err(GatewayError::Unavailable {
                        tier: served_tier,
                        attempts,
                        reason: error.to_string(),
                    });
                }
            }
        }
    }

    async fn dispatch_with_retry(
        &self,
        prompt: &str,
        tier: ModelTier,
    ) -> Result<String, DispatchFailure> {
        let request = GenerationRequest {
            prompt: prompt.to_string(),
            tier,
            model: self.router.model_for(tier).to_string(),
            max_tokens: self.max_tokens,
        };

        let mut attempts = 0u32;
        loop {
            self.limiter.acquire().await;
            attempts += 1;
            record_all(&self.usage, |usage| usage.record_dispatch(tier));

            let result = match tokio::time::timeout(self.timeout, self.generator.generate(&request)).await {
                Ok(result) => result,
                Err(_) => Err(GenerationError::Timeout),
            };

            match result {
                Ok(text) if text.trim().is_empty() => {
                    return Err(DispatchFailure::Malformed("empty response".to_string()));
                }
                Ok(text) => {
                    if attempts > 1 {
                        debug!(%tier, attempts, "succeeded after retry");
                    }
                    record_all(&self.usage, |usage| {
                        usage.record_success(tier, &request.model, prompt, &text)
                    });
                    return Ok(text);
                }
                Err(GenerationError::EmptyResponse) => {
                    return Err(DispatchFailure::Malformed("empty response".to_string()));
                }
                Err(error) if error.is_transient() && self.retry.allows_retry(attempts) => {
                    let backoff = self.retry.calculate_backoff(attempts - 1);
                    warn!(
                        %tier,
                        attempt = attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %error,
                        "transient failure, retrying"
                    );
                    self.sleeper.sleep(backoff).await;
                }
                Err(error) => return Err(DispatchFailure::Failed { attempts, error }),
            }
        }
    }
}
