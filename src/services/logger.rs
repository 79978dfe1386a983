use serde_json::Value;
use tracing_subscriber::EnvFilter;

/// Context-scoped logger. Events go through `tracing`; the subscriber
/// installed by [`init_tracing`] writes them to stderr.
#[derive(Debug, Clone)]
pub struct Logger {
    context: String,
}

impl Logger {
    pub fn new(context: &str) -> Self {
        Self {
            context: context.to_string(),
        }
    }

    pub fn child(&self, suffix: &str) -> Self {
        let context = if suffix.is_empty() {
            self.context.clone()
        } else {
            format!("{}:{}", self.context, suffix)
        };
        Self { context }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    fn render_meta(meta: Option<&Value>) -> String {
        meta.filter(|m| !m.is_null())
            .map(|m| m.to_string())
            .unwrap_or_default()
    }

    pub fn error(&self, message: &str, meta: Option<&Value>) {
        tracing::error!(context = %self.context, meta = %Self::render_meta(meta), "{}", message);
    }

    pub fn warn(&self, message: &str, meta: Option<&Value>) {
        tracing::warn!(context = %self.context, meta = %Self::render_meta(meta), "{}", message);
    }

    pub fn info(&self, message: &str, meta: Option<&Value>) {
        tracing::info!(context = %self.context, meta = %Self::render_meta(meta), "{}", message);
    }

    pub fn debug(&self, message: &str, meta: Option<&Value>) {
        tracing::debug!(context = %self.context, meta = %Self::render_meta(meta), "{}", message);
    }
}

fn resolve_filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .trim()
        .to_lowercase();
    match level.as_str() {
        "error" | "warn" | "info" | "debug" | "trace" => EnvFilter::new(level),
        _ => EnvFilter::new("info"),
    }
}

/// Installs the global subscriber. Stdout carries the JSON-RPC stream, so
/// logs must stay on stderr.
pub fn init_tracing(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(resolve_filter(verbose))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .try_init();
}
