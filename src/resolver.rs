//! API base discovery: probe candidate bases in priority order and keep the first healthy one.

use log::{debug, info, warn};
use std::time::Duration;

use crate::api::ApiClient;
use crate::config::Config;
use crate::store::{API_BASE_KEY, LocalStore};

/// Liveness check for a candidate base URL
pub trait HealthProbe {
    fn is_healthy(&self, base: &str) -> bool;
}

/// Probe `GET {base}/api/health` with a bounded timeout
#[derive(Debug, Clone)]
pub struct HttpProbe {
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl HealthProbe for HttpProbe {
    fn is_healthy(&self, base: &str) -> bool {
        match ApiClient::new(base, self.timeout).health() {
            Ok(healthy) => healthy,
            Err(e) => {
                debug!("health probe to {base} failed: {e}");
                false
            }
        }
    }
}

/// Strip surrounding whitespace and trailing slashes
pub fn normalize_base(base: &str) -> String {
    base.trim().trim_end_matches('/').to_string()
}

pub struct Resolver<P> {
    declared: Option<String>,
    origin: Option<String>,
    fallback: String,
    probe: P,
    resolved: Option<String>,
}

impl Resolver<HttpProbe> {
    pub fn from_config(config: &Config, declared: Option<String>) -> Self {
        Self::new(
            declared,
            config.origin.clone(),
            &config.fallback_api_base,
            HttpProbe::new(config.probe_timeout()),
        )
    }
}

impl<P: HealthProbe> Resolver<P> {
    pub fn new(declared: Option<String>, origin: Option<String>, fallback: &str, probe: P) -> Self {
        Self {
            declared,
            origin,
            fallback: fallback.to_string(),
            probe,
            resolved: None,
        }
    }

    /// Base chosen by the last `resolve`, if any
    pub fn resolved(&self) -> Option<&str> {
        self.resolved.as_deref()
    }

    /// Forget the cached choice so the next `resolve` probes again
    pub fn invalidate(&mut self) {
        self.resolved = None;
    }

    /// Candidate order: saved override, declared default, origin, fallback.
    /// Normalized, blank entries dropped, duplicates kept only once.
    pub fn candidates(&self, saved: Option<&str>) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let raw = [
            saved,
            self.declared.as_deref(),
            self.origin.as_deref(),
            Some(self.fallback.as_str()),
        ];
        for candidate in raw.into_iter().flatten() {
            let base = normalize_base(candidate);
            if !base.is_empty() && !out.contains(&base) {
                out.push(base);
            }
        }
        out
    }

    /// Return the working base, probing candidates on first use
    pub fn resolve(&mut self, store: &mut dyn LocalStore) -> String {
        if let Some(base) = &self.resolved {
            return base.clone();
        }
        let base = self.discover(store);
        self.resolved = Some(base.clone());
        base
    }

    fn discover(&self, store: &mut dyn LocalStore) -> String {
        let saved = store.get(API_BASE_KEY);

        for base in self.candidates(saved.as_deref()) {
            debug!("probing {base}");
            if !self.probe.is_healthy(&base) {
                continue;
            }
            if saved.as_deref() != Some(base.as_str()) {
                if let Err(e) = store.set(API_BASE_KEY, &base) {
                    warn!("could not persist API base {base}: {e:#}");
                }
            }
            info!("using API base {base}");
            return base;
        }

        // Nothing answered; keep the saved value (even if wrong) so it can be fixed by hand
        let fallback = saved.unwrap_or_else(|| normalize_base(&self.fallback));
        warn!("no healthy API base found; falling back to {fallback}");
        fallback
    }
}
