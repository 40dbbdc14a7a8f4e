//! Observability module for correlation, tracing and metrics

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Metric names emitted through the `metrics` facade
///
/// The library never installs a recorder; without one these are no-ops.
pub mod metric_names {
    /// Counter, labels `policy`, `outcome`
    pub const SUBMISSIONS_TOTAL: &str = "pump_bundler_submissions_total";
    /// Counter, label `outcome` (`accepted`, `rejected`, `failed`)
    pub const RELAY_BUNDLES_TOTAL: &str = "pump_bundler_relay_bundles_total";
    /// Counter, label `category`
    pub const ERRORS_TOTAL: &str = "pump_bundler_errors_total";
    /// Histogram of submit-to-confirmation latency in milliseconds
    pub const CONFIRM_LATENCY_MS: &str = "pump_bundler_confirm_latency_ms";
    /// Counter, label `kind`
    pub const EVENTS_TOTAL: &str = "pump_bundler_events_total";
}

/// Correlation ID for tracking requests across components
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Trace identifiers threaded through one logical request
///
/// A create-and-buy request gets one root context; signing, submission and
/// confirmation run in child spans that share its trace and correlation ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceContext {
    pub trace_id: String,
    pub span_id: String,
    pub correlation_id: CorrelationId,
    pub parent_span_id: Option<String>,
    pub operation: String,
    /// Creation timestamp (Unix epoch seconds)
    pub timestamp: u64,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl TraceContext {
    pub fn new(operation: &str) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            span_id: Uuid::new_v4().to_string(),
            correlation_id: CorrelationId::new(),
            parent_span_id: None,
            operation: operation.to_string(),
            timestamp: unix_now(),
        }
    }

    pub fn child_span(&self, operation: &str) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            span_id: Uuid::new_v4().to_string(),
            correlation_id: self.correlation_id.clone(),
            parent_span_id: Some(self.span_id.clone()),
            operation: operation.to_string(),
            timestamp: unix_now(),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn span_id(&self) -> &str {
        &self.span_id
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }
}

impl Default for TraceContext {
    fn default() -> Self {
        Self::new("default")
    }
}

/// Install a global `tracing` subscriber
///
/// `RUST_LOG` wins over the default filter. Returns an error if a subscriber
/// is already installed.
pub fn init_tracing(verbose: bool, json: bool) -> anyhow::Result<()> {
    let default_filter = if verbose {
        "pump_bundler=debug,info"
    } else {
        "pump_bundler=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_context_creation() {
        let ctx = TraceContext::new("create_and_buy");
        assert!(!ctx.trace_id().is_empty());
        assert!(!ctx.correlation_id().as_str().is_empty());
        assert_eq!(ctx.operation, "create_and_buy");
        assert!(ctx.parent_span_id.is_none());
    }

    #[test]
    fn test_trace_context_child_span() {
        let parent = TraceContext::new("create_and_buy");
        let child = parent.child_span("confirm");

        assert_eq!(child.trace_id(), parent.trace_id());
        assert_eq!(child.correlation_id(), parent.correlation_id());
        assert_ne!(child.span_id(), parent.span_id());
        assert_eq!(child.parent_span_id.as_deref(), Some(parent.span_id()));
    }
}
