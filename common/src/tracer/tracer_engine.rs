use thiserror::Error;
use tracing::{debug, level_filters::LevelFilter, subscriber::SetGlobalDefaultError};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt};

#[derive(Debug, Error)]
pub enum TracerError {
    #[error("Cannot install global tracing subscriber: {0}")]
    SetGlobalDefault(#[from] SetGlobalDefaultError),
}

pub struct TracerOptions {
    pub level: LevelFilter,
    pub ansi: bool,
}

impl TracerOptions {
    pub fn new(level: LevelFilter) -> Self {
        Self { level, ansi: true }
    }
}

/// This object initialises the stderr tracer, given a TracerOptions struct.
/// Logs go to stderr so that event output written to stdout stays clean.
pub struct TracerEngine {
    level: LevelFilter,
}

impl TracerEngine {
    /// Initialises the global tracing subscriber for the component.
    /// #Arguments
    /// * `options` - The caller-specified instance of TracerOptions.
    /// * `service_name` - The name of the binary being traced.
    /// * `module_name` - The name of the current module.
    /// #Returns
    /// An instance of TracerEngine, or an error if a global subscriber is already installed.
    pub fn new(
        options: TracerOptions,
        service_name: &str,
        module_name: &str,
    ) -> Result<Self, TracerError> {
        let stderr_tracer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(options.ansi);

        // RUST_LOG takes precedence over the level supplied by the caller
        let log_filter = EnvFilter::builder()
            .with_default_directive(options.level.into())
            .from_env_lossy();

        let subscriber =
            tracing_subscriber::Registry::default().with(stderr_tracer.with_filter(log_filter));

        tracing::subscriber::set_global_default(subscriber)?;

        debug!("Tracer initialised for {service_name} in {module_name}");
        Ok(Self {
            level: options.level,
        })
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }
}
