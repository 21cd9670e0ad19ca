//! Rate limiting middleware using token bucket algorithm.

use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::KeyExtractor,
};

/// Token bucket parameters for the public redirect endpoint.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitSettings {
    pub enabled: bool,
    /// Sustained requests per second per client.
    pub per_second: u64,
    pub burst: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            per_second: 1000,
            burst: 200,
        }
    }
}

/// Creates a per-client rate limiter keyed by `key_extractor`.
///
/// Pass `PeerIpKeyExtractor` to key on the socket peer address, or
/// `SmartIpKeyExtractor` to honor `X-Forwarded-For` / `X-Real-IP` behind a
/// trusted proxy. Requests exceeding the limit receive `429 Too Many Requests`.
///
/// Returns `None` if the settings describe an empty quota.
///
/// # Example
///
/// ```rust,ignore
/// let visit = Router::new()
///     .route("/visit/{id}", get(redirect_handler))
///     .layer(rate_limit::layer(PeerIpKeyExtractor, &settings).unwrap());
/// ```
pub fn layer<K>(
    key_extractor: K,
    settings: &RateLimitSettings,
) -> Option<GovernorLayer<K, NoOpMiddleware<QuantaInstant>, axum::body::Body>>
where
    K: KeyExtractor,
{
    if settings.per_second == 0 {
        return None;
    }

    let replenish_every_ns = (1_000_000_000 / settings.per_second).max(1);

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(key_extractor)
            .per_nanosecond(replenish_every_ns)
            .burst_size(settings.burst)
            .finish()?,
    );

    Some(GovernorLayer::new(governor_conf))
}
