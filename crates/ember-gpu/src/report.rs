//! Leveled, tagged diagnostics routed through `tracing`.

use std::fmt;

/// Tag for messages originating from the Vulkan driver or loader.
pub const VK_TAG: &str = "Vulkan";

/// Tag for orchestration messages.
pub const APP_TAG: &str = "App";

/// Severity of a reported message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Verbose,
    Info,
    Warning,
    Error,
    /// Unrecoverable; only used right before the process exits.
    Critical,
}

impl Severity {
    /// Short lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Verbose => "verbose",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emit a tagged message at the given severity.
pub fn report(severity: Severity, tag: &str, message: impl fmt::Display) {
    match severity {
        Severity::Verbose => tracing::debug!(tag, "{message}"),
        Severity::Info => tracing::info!(tag, "{message}"),
        Severity::Warning => tracing::warn!(tag, "{message}"),
        Severity::Error => tracing::error!(tag, "{message}"),
        Severity::Critical => tracing::error!(tag, critical = true, "{message}"),
    }
}

/// Run `f` under a scoped subscriber and count events flagged critical.
#[cfg(test)]
pub(crate) fn count_critical(f: impl FnOnce()) -> usize {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    struct CriticalCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for CriticalCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if event.metadata().fields().field("critical").is_some() {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    let count = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(CriticalCounter(Arc::clone(&count)));
    tracing::subscriber::with_default(subscriber, f);
    count.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_critical_is_flagged() {
        assert_eq!(count_critical(|| report(Severity::Critical, APP_TAG, "boom")), 1);
        assert_eq!(count_critical(|| report(Severity::Error, VK_TAG, "oops")), 0);
    }

    #[test]
    fn severities_are_ordered() {
        assert!(Severity::Verbose < Severity::Info);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn display_names() {
        assert_eq!(Severity::Warning.to_string(), "warning");
        assert_eq!(Severity::Critical.as_str(), "critical");
    }

    #[test]
    fn report_without_subscriber_is_a_no_op() {
        report(Severity::Info, APP_TAG, "nothing listens");
        report(Severity::Critical, VK_TAG, format_args!("code {}", 7));
    }
}
