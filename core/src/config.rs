//! Configuration store read by every request.
//!
//! # Design
//! `ConfigStore` holds the current `GlobalConfig` behind an `ArcSwap`.
//! `configure` clones the current value, overlays the partial, and swaps the
//! result in. Readers load the current value at each point they need a
//! field, so a call that is already in flight sees later changes to fields it
//! has not read yet. No per-call snapshot is taken.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Deserialize;

use crate::headers::Headers;
use crate::http::TransportOptions;
use crate::interceptor::Interceptors;

#[derive(Debug, Clone, Default)]
pub struct GlobalConfig {
    /// Prepended to every request path.
    pub base_url: Option<String>,
    pub default_headers: Headers,
    pub interceptors: Option<Interceptors>,
    pub transport_defaults: TransportOptions,
}

/// A partial update for `GlobalConfig`.
///
/// Every field that is `Some` replaces the stored field as a whole; headers
/// and interceptors are not merged entry by entry. Transport fields are
/// replaced one at a time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigPartial {
    pub base_url: Option<String>,
    #[serde(alias = "headers")]
    pub default_headers: Option<Headers>,
    #[serde(skip)]
    pub interceptors: Option<Interceptors>,
    #[serde(flatten)]
    pub transport: TransportOptions,
}

impl GlobalConfig {
    pub fn apply(&mut self, partial: ConfigPartial) {
        if let Some(base_url) = partial.base_url {
            self.base_url = Some(base_url);
        }
        if let Some(headers) = partial.default_headers {
            self.default_headers = headers;
        }
        if let Some(interceptors) = partial.interceptors {
            self.interceptors = Some(interceptors);
        }
        self.transport_defaults.merge(partial.transport);
    }
}

#[derive(Debug, Default)]
pub struct ConfigStore {
    current: ArcSwap<GlobalConfig>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GlobalConfig) -> Self {
        Self {
            current: ArcSwap::from_pointee(config),
        }
    }

    /// Shallow-merge `partial` into the stored configuration.
    pub fn configure(&self, partial: ConfigPartial) {
        self.current.rcu(|current| {
            let mut next = GlobalConfig::clone(current);
            next.apply(partial.clone());
            next
        });
        let config = self.current();
        tracing::debug!(
            base_url = ?config.base_url,
            header_names = ?config.default_headers.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            interceptors = ?config.interceptors,
            "configuration updated"
        );
    }

    pub fn current(&self) -> Arc<GlobalConfig> {
        self.current.load_full()
    }

    pub fn base_url(&self) -> Option<String> {
        self.current.load().base_url.clone()
    }

    pub fn default_headers(&self) -> Headers {
        self.current.load().default_headers.clone()
    }

    pub fn interceptors(&self) -> Option<Interceptors> {
        self.current.load().interceptors.clone()
    }

    pub fn transport_defaults(&self) -> TransportOptions {
        self.current.load().transport_defaults.clone()
    }
}
