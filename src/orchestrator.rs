//! Transcript fallback orchestrator for Epochly.
//!
//! Tries each transcript strategy in priority order and returns the first
//! success, collecting the reason every attempted strategy failed.

use crate::config::Settings;
use crate::error::{EpochlyError, Result};
use crate::transcript::{
    FetchError, InnertubeSource, ScrapeSource, StrategyFailure, TimedTextSource, TranscriptCache,
    TranscriptResult, TranscriptSource, YtDlpSource,
};
use crate::youtube::VideoId;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

struct Strategy {
    source: Arc<dyn TranscriptSource>,
    timeout: Duration,
}

/// Ordered list of transcript strategies.
pub struct FallbackChain {
    strategies: Vec<Strategy>,
}

impl Default for FallbackChain {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackChain {
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Append a strategy after the ones already registered.
    pub fn with_strategy(mut self, source: Arc<dyn TranscriptSource>, timeout: Duration) -> Self {
        self.strategies.push(Strategy { source, timeout });
        self
    }

    /// Build the standard chain: cache, innertube, timedtext, ytdlp, scrape.
    ///
    /// Strategies listed in `transcript.disabled` are left out.
    pub fn from_settings(settings: &Settings, cache: Arc<TranscriptCache>) -> Result<Self> {
        let transcript = &settings.transcript;

        if transcript.accept_invalid_certs {
            warn!("TLS certificate verification is disabled for the alternate transcript fetchers");
        }

        let candidates: Vec<Arc<dyn TranscriptSource>> = vec![
            cache,
            Arc::new(InnertubeSource::new(transcript)?),
            Arc::new(TimedTextSource::new(transcript)?),
            Arc::new(YtDlpSource::new(transcript)),
            Arc::new(ScrapeSource::new(transcript)?),
        ];

        let chain = candidates
            .into_iter()
            .filter(|s| {
                let disabled = transcript.is_disabled(s.name());
                if disabled {
                    debug!("Transcript strategy {} is disabled", s.name());
                }
                !disabled
            })
            .fold(Self::new(), |chain, s| {
                let timeout = transcript.timeout_for(s.name());
                chain.with_strategy(s, timeout)
            });

        info!("Transcript strategies: {}", chain.strategy_names().join(" -> "));
        Ok(chain)
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.source.name()).collect()
    }

    /// Fetch a transcript, trying each strategy once in order.
    #[instrument(skip(self), fields(video_id = %video_id))]
    pub async fn fetch(&self, video_id: &VideoId) -> Result<TranscriptResult> {
        let mut failures = Vec::new();

        for strategy in &self.strategies {
            let name = strategy.source.name();
            debug!("Trying transcript strategy {}", name);

            let outcome = match tokio::time::timeout(strategy.timeout, strategy.source.fetch(video_id)).await {
                Ok(Ok(result)) if result.text.trim().is_empty() => Err(FetchError::NoCaptions),
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(strategy.timeout)),
            };

            match outcome {
                Ok(result) => {
                    info!(
                        "Transcript for {} from {} ({} chars)",
                        video_id,
                        name,
                        result.text.len()
                    );
                    return Ok(result);
                }
                Err(e) => {
                    warn!("Transcript strategy {} failed: {}", name, e);
                    failures.push(StrategyFailure::new(name, e));
                }
            }
        }

        Err(EpochlyError::TranscriptUnavailable(failures))
    }

    /// Extract the video id from a URL and fetch its transcript.
    pub async fn fetch_url(&self, url: &str) -> Result<TranscriptResult> {
        let video_id = VideoId::from_url(url)?;
        self.fetch(&video_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::FetchResult;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::{assert_err, assert_ok};

    struct FakeSource {
        name: &'static str,
        outcome: FetchResult<&'static str>,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(name: &'static str, outcome: FetchResult<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                name,
                outcome,
                delay: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn slow(name: &'static str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                name,
                outcome: Ok("too late"),
                delay: Some(delay),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TranscriptSource for FakeSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self, video_id: &VideoId) -> FetchResult<TranscriptResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.outcome
                .clone()
                .map(|text| TranscriptResult::from_text(video_id, self.name, None, text))
        }
    }

    const SECOND: Duration = Duration::from_secs(1);

    fn id() -> VideoId {
        VideoId::new("abc123").unwrap()
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let first = FakeSource::new("first", Err(FetchError::NoCaptions));
        let second = FakeSource::new("second", Ok("from second"));
        let third = FakeSource::new("third", Ok("from third"));

        let chain = FallbackChain::new()
            .with_strategy(first.clone(), SECOND)
            .with_strategy(second.clone(), SECOND)
            .with_strategy(third.clone(), SECOND);

        let result = assert_ok!(chain.fetch(&id()).await);
        assert_eq!(result.text, "from second");
        assert_eq!(result.source, "second");
        assert_eq!((first.calls(), second.calls(), third.calls()), (1, 1, 0));
    }

    #[tokio::test]
    async fn test_exhaustion_lists_attempts_in_order() {
        let chain = FallbackChain::new()
            .with_strategy(FakeSource::new("a", Err(FetchError::NotCached)), SECOND)
            .with_strategy(FakeSource::new("b", Err(FetchError::RateLimited)), SECOND)
            .with_strategy(FakeSource::new("c", Err(FetchError::Tls("bad cert".into()))), SECOND);

        match chain.fetch(&id()).await {
            Err(EpochlyError::TranscriptUnavailable(failures)) => {
                let names: Vec<&str> = failures.iter().map(|f| f.strategy.as_str()).collect();
                assert_eq!(names, vec!["a", "b", "c"]);
                assert_eq!(failures[1].error, FetchError::RateLimited);
            }
            other => panic!("expected TranscriptUnavailable, got {:?}", other.map(|r| r.text)),
        }
    }

    #[tokio::test]
    async fn test_empty_transcript_counts_as_no_captions() {
        let empty = FakeSource::new("empty", Ok("   "));
        let next = FakeSource::new("next", Ok("real text"));
        let chain = FallbackChain::new()
            .with_strategy(empty, SECOND)
            .with_strategy(next, SECOND);

        assert_eq!(chain.fetch(&id()).await.unwrap().source, "next");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_strategy_times_out_and_chain_continues() {
        let slow = FakeSource::slow("slow", Duration::from_secs(30));
        let fast = FakeSource::new("fast", Ok("fast text"));
        let chain = FallbackChain::new()
            .with_strategy(slow.clone(), Duration::from_secs(2))
            .with_strategy(fast, SECOND);

        let result = assert_ok!(chain.fetch(&id()).await);
        assert_eq!(result.source, "fast");
        assert_eq!(slow.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_recorded() {
        let chain = FallbackChain::new()
            .with_strategy(FakeSource::slow("slow", Duration::from_secs(30)), Duration::from_secs(2));

        match chain.fetch(&id()).await {
            Err(EpochlyError::TranscriptUnavailable(failures)) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].error, FetchError::Timeout(Duration::from_secs(2)));
            }
            other => panic!("expected TranscriptUnavailable, got {:?}", other.map(|r| r.text)),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_fetch_stops_the_chain() {
        let slow = FakeSource::slow("slow", Duration::from_secs(30));
        let next = FakeSource::new("next", Ok("next text"));
        let chain = Arc::new(
            FallbackChain::new()
                .with_strategy(slow.clone(), Duration::from_secs(2))
                .with_strategy(next.clone(), SECOND),
        );

        let task = tokio::spawn({
            let chain = chain.clone();
            async move { chain.fetch(&id()).await }
        });

        // Let the slow strategy start before the caller goes away.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(slow.calls(), 1);
        task.abort();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(assert_err!(task.await).is_cancelled());
        assert_eq!(next.calls(), 0);
    }

    #[tokio::test]
    async fn test_cached_id_skips_network_strategies() {
        let cache = Arc::new(TranscriptCache::from_entries(HashMap::from([(
            "abc123".to_string(),
            "Hello world transcript".to_string(),
        )])));
        let network = FakeSource::new("network", Ok("network text"));
        let chain = FallbackChain::new()
            .with_strategy(cache, SECOND)
            .with_strategy(network.clone(), SECOND);

        let result = chain
            .fetch_url("https://www.youtube.com/watch?v=abc123")
            .await
            .unwrap();
        assert_eq!(result.text, "Hello world transcript");
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_chain_fails_with_no_attempts() {
        let err = assert_err!(FallbackChain::new().fetch(&id()).await);
        assert!(matches!(err, EpochlyError::TranscriptUnavailable(ref f) if f.is_empty()));
    }

    #[test]
    fn test_from_settings_order_and_disabled() {
        let mut settings = Settings::default();
        settings.transcript.disabled = vec!["ytdlp".to_string(), "Scrape".to_string()];

        let chain = FallbackChain::from_settings(&settings, Arc::new(TranscriptCache::default())).unwrap();
        assert_eq!(chain.strategy_names(), vec!["cache", "innertube", "timedtext"]);

        let chain =
            FallbackChain::from_settings(&Settings::default(), Arc::new(TranscriptCache::default())).unwrap();
        assert_eq!(
            chain.strategy_names(),
            vec!["cache", "innertube", "timedtext", "ytdlp", "scrape"]
        );
    }
}
