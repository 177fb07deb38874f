//! Navigate primitive: issues a CDP navigate, then applies built-in waiting.

use chrono::Utc;
use tracing::{debug, info, warn};
use wayfarer_cdp::Cdp;

use crate::primitives::DefaultElementInteractor;
use crate::{
    errors::InteractError,
    types::{ActionReport, ExecCtx, PostSignals, WaitTier},
};

pub async fn execute_navigate<C>(
    interactor: &DefaultElementInteractor<C>,
    ctx: &ExecCtx,
    url: &str,
    wait_tier: WaitTier,
) -> Result<ActionReport, InteractError>
where
    C: Cdp + Send + Sync,
{
    let started_at = Utc::now();
    let start_instant = std::time::Instant::now();

    info!(
        action_id = %ctx.action_id,
        url = %url,
        wait_tier = ?wait_tier,
        "executing navigate primitive"
    );

    if !validate_url(url) {
        return Err(InteractError::internal(format!("invalid URL: {url}")));
    }

    if ctx.is_cancelled() {
        return Err(InteractError::Interrupted("context cancelled".to_string()));
    }
    if ctx.is_timeout() {
        return Err(InteractError::Timeout("context deadline exceeded".to_string()));
    }

    debug!("issuing CDP Page.navigate command");
    interactor
        .cdp()
        .navigate(ctx.page, url, ctx.remaining_time())
        .await?;

    if wait_tier != WaitTier::None {
        debug!(wait_tier = ?wait_tier, "applying built-in wait tier");
        interactor.wait_strategy().wait(ctx.page, wait_tier).await?;
    }

    let post_signals = capture_post_signals(interactor, ctx).await;
    let latency_ms = start_instant.elapsed().as_millis() as u64;

    info!(
        action_id = %ctx.action_id,
        latency_ms,
        url_after = ?post_signals.url_after,
        "navigate completed successfully"
    );

    Ok(ActionReport::success(started_at, latency_ms).with_signals(post_signals))
}

fn validate_url(url: &str) -> bool {
    !url.is_empty() && (url.starts_with("http://") || url.starts_with("https://") || url.starts_with("file://"))
}

async fn capture_post_signals<C>(interactor: &DefaultElementInteractor<C>, ctx: &ExecCtx) -> PostSignals
where
    C: Cdp + Send + Sync,
{
    match interactor.capture_page_signals(ctx.page).await {
        Ok(signals) => signals,
        Err(err) => {
            warn!(%err, "failed to capture navigation signals");
            PostSignals::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_validation_accepts_http_https_file() {
        assert!(validate_url("https://example.com"));
        assert!(validate_url("http://localhost:8080"));
        assert!(validate_url("file:///path/to/file.html"));
    }

    #[test]
    fn url_validation_rejects_empty_and_unsupported_schemes() {
        assert!(!validate_url(""));
        assert!(!validate_url("example.com"));
        assert!(!validate_url("ftp://example.com"));
    }
}
