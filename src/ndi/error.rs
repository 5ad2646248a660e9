use thiserror::Error;

/// NDI error type.
#[derive(Debug, Error)]
pub enum NdiError {
    /// No NDI runtime could be loaded from any of the searched locations.
    #[error("NDI runtime not found (tried: {})", .tried.join(", "))]
    LibraryNotFound { tried: Vec<String> },

    /// The runtime was loaded but lacks an entry point we need.
    #[error("NDI runtime is missing symbol `{symbol}`: {source}")]
    MissingSymbol {
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },

    /// `NDIlib_initialize` returned false.
    #[error("NDI library failed to initialize")]
    NotInitialized,

    /// The CPU lacks the instruction set the runtime requires.
    #[error("CPU is not supported by the NDI runtime")]
    UnsupportedCpu,

    /// Names must not contain interior NUL bytes.
    #[error("invalid NDI name: {0:?}")]
    InvalidName(String),

    /// A native create call returned null.
    #[error("failed to create NDI {0}")]
    Creation(&'static str),
}
