use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info};

/// Symbol that only exists in the modern transport library
pub const MODERN_MARKER: &str = "io.netty.channel.Channel";

/// Environment variable read by [`EnvSymbols`]
pub const SYMBOLS_ENV_VAR: &str = "PACKET_INTERCEPT_TRANSPORT_SYMBOLS";

/// Which transport library generation is in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Legacy,
    Modern,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Legacy => f.write_str("legacy"),
            TransportMode::Modern => f.write_str("modern"),
        }
    }
}

/// Answers whether a symbol is available in the running process
pub trait SymbolResolver: Send + Sync {
    fn resolve(&self, symbol: &str) -> bool;
}

impl<F> SymbolResolver for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn resolve(&self, symbol: &str) -> bool {
        self(symbol)
    }
}

/// A fixed set of known symbols
#[derive(Debug, Clone, Default)]
pub struct StaticSymbols {
    symbols: HashSet<String>,
}

impl StaticSymbols {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }

    /// No symbols at all; always probes as legacy
    pub fn empty() -> Self {
        Self::default()
    }
}

impl SymbolResolver for StaticSymbols {
    fn resolve(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }
}

/// Symbols listed, comma separated, in [`SYMBOLS_ENV_VAR`].
///
/// The variable is read when the resolver is built, not on every lookup.
#[derive(Debug, Clone)]
pub struct EnvSymbols {
    inner: StaticSymbols,
}

impl EnvSymbols {
    pub fn from_env() -> Self {
        Self::from_var(SYMBOLS_ENV_VAR)
    }

    pub fn from_var(name: &str) -> Self {
        let raw = std::env::var(name).unwrap_or_default();
        Self {
            inner: StaticSymbols::new(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            ),
        }
    }
}

impl SymbolResolver for EnvSymbols {
    fn resolve(&self, symbol: &str) -> bool {
        self.inner.resolve(symbol)
    }
}

/// One-time startup probe for the transport library generation.
///
/// The resolver is consulted on the first call to [`ModeProbe::mode`] only;
/// every later call returns the same answer. An unresolved marker is the
/// normal way to detect the legacy library and is not an error.
pub struct ModeProbe<R> {
    resolver: R,
    marker: String,
    mode: OnceCell<TransportMode>,
}

impl<R: SymbolResolver> ModeProbe<R> {
    pub fn new(resolver: R) -> Self {
        Self::with_marker(resolver, MODERN_MARKER)
    }

    pub fn with_marker(resolver: R, marker: impl Into<String>) -> Self {
        Self {
            resolver,
            marker: marker.into(),
            mode: OnceCell::new(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn mode(&self) -> TransportMode {
        *self.mode.get_or_init(|| {
            let mode = if self.resolver.resolve(&self.marker) {
                TransportMode::Modern
            } else {
                debug!(marker = %self.marker, "Modern transport marker not found");
                TransportMode::Legacy
            };
            info!(%mode, "Transport mode selected");
            mode
        })
    }
}
