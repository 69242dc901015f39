use anyhow::Context;
use tokio::time::Duration;

use crate::es::DEFAULT_TIMEOUT;

/// Operator settings, read from the environment at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Only watch EsIndex objects in this namespace; all namespaces if unset
    pub watch_namespace: Option<String>,
    /// Per-request timeout for Elasticsearch calls
    pub http_timeout: Duration,
    /// Requeue interval after an index reached Online
    pub resync_interval: Duration,
    /// Requeue interval after a retryable failure
    pub error_requeue: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch_namespace: None,
            http_timeout: DEFAULT_TIMEOUT,
            resync_interval: Duration::from_secs(600),
            error_requeue: Duration::from_secs(60),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| -> anyhow::Result<Duration> {
            match lookup(key) {
                Some(v) => {
                    let n: u64 = v
                        .trim()
                        .parse()
                        .with_context(|| format!("{key} must be a number of seconds, got {v:?}"))?;
                    Ok(Duration::from_secs(n))
                }
                None => Ok(default),
            }
        };
        Ok(Self {
            watch_namespace: lookup("WATCH_NAMESPACE")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            http_timeout: secs("ESINDEX_HTTP_TIMEOUT_SECS", defaults.http_timeout)?,
            resync_interval: secs("ESINDEX_RESYNC_SECS", defaults.resync_interval)?,
            error_requeue: secs("ESINDEX_ERROR_REQUEUE_SECS", defaults.error_requeue)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.http_timeout, Duration::from_secs(300));
    }

    #[test]
    fn reads_overrides() {
        let cfg = Config::from_lookup(lookup(&[
            ("WATCH_NAMESPACE", "team-a"),
            ("ESINDEX_HTTP_TIMEOUT_SECS", "30"),
            ("ESINDEX_RESYNC_SECS", " 120 "),
        ]))
        .unwrap();
        assert_eq!(cfg.watch_namespace.as_deref(), Some("team-a"));
        assert_eq!(cfg.http_timeout, Duration::from_secs(30));
        assert_eq!(cfg.resync_interval, Duration::from_secs(120));
        assert_eq!(cfg.error_requeue, Duration::from_secs(60));
    }

    #[test]
    fn blank_namespace_means_all() {
        let cfg = Config::from_lookup(lookup(&[("WATCH_NAMESPACE", " ")])).unwrap();
        assert_eq!(cfg.watch_namespace, None);
    }

    #[test]
    fn rejects_garbage() {
        let err = Config::from_lookup(lookup(&[("ESINDEX_RESYNC_SECS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("ESINDEX_RESYNC_SECS"));
    }
}
