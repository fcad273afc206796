//! # Proxies Module
//!
//! Loads proxy credentials from a line-oriented file and hands them to the
//! scraping layer in rotating or random order.

use std::fs;
use std::path::Path;
use std::sync::atomic::{ AtomicUsize, Ordering };

use rand::seq::SliceRandom;
use serde::Deserialize;
use tracing::{ info, warn };

/// Literal used when no proxy is configured; scrapers treat it as a direct connection.
pub const LOCALHOST: &str = "localhost";

/// A canonical `user:pass@host:port` endpoint, or the `localhost` fallback.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyEndpoint(String);

impl ProxyEndpoint {
    pub fn localhost() -> Self {
        ProxyEndpoint(LOCALHOST.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_localhost(&self) -> bool {
        self.0 == LOCALHOST
    }

    /// Parses one line of a proxy file.
    ///
    /// Returns `Ok(None)` for blank lines and an error for lines that match
    /// neither `user:pass@host:port` nor `host:port:user:pass`.
    pub fn parse_line(line: &str) -> Result<Option<Self>, InvalidProxyLine> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        if line.contains('@') {
            return Ok(Some(ProxyEndpoint(line.to_string())));
        }

        let parts: Vec<&str> = line.split(':').collect();
        match parts.as_slice() {
            [host, port, user, pass] => {
                Ok(Some(ProxyEndpoint(format!("{}:{}@{}:{}", user, pass, host, port))))
            }
            _ => Err(InvalidProxyLine { fields: parts.len() }),
        }
    }
}

impl std::fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A proxy-file line in neither supported shape.
///
/// Carries only the number of `:`-separated fields so the line itself,
/// which may hold credentials, never reaches the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidProxyLine {
    pub fields: usize,
}

/// Order in which the pool hands endpoints to each scrape call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyRotation {
    /// Same list every call, start offset advanced by one.
    #[default]
    RoundRobin,
    /// Freshly shuffled list every call.
    Random,
}

/// A never-empty, immutable list of proxy endpoints.
#[derive(Debug)]
pub struct ProxyPool {
    endpoints: Vec<ProxyEndpoint>,
    cursor: AtomicUsize,
}

impl ProxyPool {
    /// Loads proxies from `path`, falling back to `["localhost"]`.
    ///
    /// Never fails: missing files, unreadable files and malformed lines are logged.
    pub fn load(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) => {
                info!(path = %path.display(), error = %err, "proxy file not loaded, using localhost");
                return Self::fallback();
            }
        };

        let pool = Self::from_lines(&contents);
        if pool.is_fallback() {
            info!(path = %path.display(), "no valid proxies found, using localhost");
        } else {
            info!(path = %path.display(), count = pool.len(), "loaded proxies");
        }
        pool
    }

    /// Builds a pool from proxy-file text.
    pub fn from_lines(contents: &str) -> Self {
        let mut endpoints = Vec::new();
        let mut invalid = 0usize;

        for (index, line) in contents.lines().enumerate() {
            match ProxyEndpoint::parse_line(line) {
                Ok(Some(endpoint)) => endpoints.push(endpoint),
                Ok(None) => {}
                Err(InvalidProxyLine { fields }) => {
                    invalid += 1;
                    warn!(
                        line = index + 1,
                        fields,
                        "invalid proxy format, expected user:pass@host:port or host:port:user:pass"
                    );
                }
            }
        }

        if invalid > 0 {
            warn!(invalid, "dropped malformed proxy lines");
        }

        if endpoints.is_empty() {
            return Self::fallback();
        }

        ProxyPool {
            endpoints,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn fallback() -> Self {
        ProxyPool {
            endpoints: vec![ProxyEndpoint::localhost()],
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.endpoints.len() == 1 && self.endpoints[0].is_localhost()
    }

    pub fn endpoints(&self) -> &[ProxyEndpoint] {
        &self.endpoints
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Endpoint list for the next scrape call, ordered per `rotation`.
    pub fn ordered(&self, rotation: ProxyRotation) -> Vec<ProxyEndpoint> {
        let mut endpoints = self.endpoints.clone();
        match rotation {
            ProxyRotation::RoundRobin => {
                let start = self.cursor.fetch_add(1, Ordering::Relaxed) % endpoints.len();
                endpoints.rotate_left(start);
            }
            ProxyRotation::Random => {
                endpoints.shuffle(&mut rand::thread_rng());
            }
        }
        endpoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn strings(endpoints: &[ProxyEndpoint]) -> Vec<&str> {
        endpoints
            .iter()
            .map(|e| e.as_str())
            .collect()
    }

    #[test]
    fn legacy_format_is_rewritten() {
        let endpoint = ProxyEndpoint::parse_line("1.2.3.4:8080:bob:secret").unwrap().unwrap();
        assert_eq!(endpoint.as_str(), "bob:secret@1.2.3.4:8080");
    }

    #[test]
    fn canonical_format_passes_through() {
        let endpoint = ProxyEndpoint::parse_line("  bob:secret@proxy.example:3128\n")
            .unwrap()
            .unwrap();
        assert_eq!(endpoint.as_str(), "bob:secret@proxy.example:3128");
    }

    #[test]
    fn malformed_line_reports_field_count_only() {
        let err = ProxyEndpoint::parse_line("proxy.example:3128:bob").unwrap_err();
        assert_eq!(err, InvalidProxyLine { fields: 3 });
        assert!(!format!("{:?}", err).contains("bob"));
    }

    #[test]
    fn blank_and_malformed_lines() {
        assert_eq!(ProxyEndpoint::parse_line("   "), Ok(None));
        assert_eq!(ProxyEndpoint::parse_line("host:8080"), Err(InvalidProxyLine { fields: 2 }));
        assert_eq!(ProxyEndpoint::parse_line("a:b:c:d:e"), Err(InvalidProxyLine { fields: 5 }));
    }

    #[test]
    fn missing_file_falls_back_to_localhost() {
        let dir = tempfile::tempdir().unwrap();
        let pool = ProxyPool::load(&dir.path().join("does-not-exist.txt"));
        assert_eq!(strings(pool.endpoints()), vec!["localhost"]);
    }

    #[test]
    fn file_with_only_garbage_falls_back_to_localhost() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not a proxy").unwrap();
        writeln!(file).unwrap();
        let pool = ProxyPool::load(file.path());
        assert!(pool.is_fallback());
    }

    #[test]
    fn mixed_file_keeps_valid_lines_in_order() {
        let pool = ProxyPool::from_lines(
            "10.0.0.1:8000:u1:p1\n\ngarbage\nu2:p2@10.0.0.2:8000\n"
        );
        assert_eq!(strings(pool.endpoints()), vec!["u1:p1@10.0.0.1:8000", "u2:p2@10.0.0.2:8000"]);
    }

    #[test]
    fn round_robin_advances_start() {
        let pool = ProxyPool::from_lines("a:1@h:1\nb:2@h:2\nc:3@h:3\n");
        let first = pool.ordered(ProxyRotation::RoundRobin);
        let second = pool.ordered(ProxyRotation::RoundRobin);
        assert_eq!(strings(&first), vec!["a:1@h:1", "b:2@h:2", "c:3@h:3"]);
        assert_eq!(strings(&second), vec!["b:2@h:2", "c:3@h:3", "a:1@h:1"]);
    }

    #[test]
    fn random_rotation_is_a_permutation() {
        let pool = ProxyPool::from_lines("a:1@h:1\nb:2@h:2\nc:3@h:3\n");
        let mut shuffled = strings(&pool.ordered(ProxyRotation::Random))
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        shuffled.sort();
        assert_eq!(shuffled, vec!["a:1@h:1", "b:2@h:2", "c:3@h:3"]);
    }
}
