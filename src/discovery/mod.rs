//! Backend discovery
//!
//! Resolves the backend's mDNS service name to a socket address with a
//! bounded retry schedule, falling back to a statically configured address
//! on exhaustion. Resolution runs once at startup and the result is cached
//! for the process lifetime; later connection failures never re-resolve.

use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use mdns_sd::{ServiceDaemon, ServiceEvent};

use crate::{Error, Result};

/// Default mDNS service type advertised by the backend
pub const SERVICE_TYPE: &str = "_talkwire-backend._tcp.local.";

/// Discovery retry schedule plus the static fallback
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// mDNS service type to browse for
    pub service_type: String,
    /// Maximum discovery attempts before falling back
    pub attempts: u32,
    /// Per-attempt browse timeout
    pub attempt_timeout: Duration,
    /// Delay between attempts
    pub backoff: Duration,
    /// Address used when every attempt fails
    pub fallback: SocketAddr,
}

/// Resolves the backend address once at startup
pub struct AddressResolver {
    config: ResolverConfig,
}

impl AddressResolver {
    /// Create a resolver with the given schedule
    #[must_use]
    pub const fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Run the bounded discovery schedule, returning the first resolved
    /// address or the static fallback on exhaustion
    #[must_use]
    pub fn resolve(&self) -> SocketAddr {
        self.resolve_with(|attempt| self.browse_once(attempt))
    }

    /// Retry skeleton, separated from mDNS so the schedule is testable
    fn resolve_with<F>(&self, mut probe: F) -> SocketAddr
    where
        F: FnMut(u32) -> Result<SocketAddr>,
    {
        for attempt in 1..=self.config.attempts {
            match probe(attempt) {
                Ok(addr) => {
                    tracing::info!(%addr, attempt, "backend resolved");
                    return addr;
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "discovery attempt failed");
                }
            }
            if attempt < self.config.attempts {
                thread::sleep(self.config.backoff);
            }
        }

        tracing::warn!(
            fallback = %self.config.fallback,
            "discovery exhausted, using static fallback"
        );
        self.config.fallback
    }

    /// One bounded browse for the backend service
    fn browse_once(&self, attempt: u32) -> Result<SocketAddr> {
        tracing::debug!(attempt, service = %self.config.service_type, "browsing");

        let daemon = ServiceDaemon::new()
            .map_err(|e| Error::Resolve(format!("failed to create mDNS daemon: {e}")))?;
        let receiver = daemon
            .browse(&self.config.service_type)
            .map_err(|e| Error::Resolve(format!("browse failed: {e}")))?;

        let deadline = Instant::now() + self.config.attempt_timeout;
        let found = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break Err(Error::Resolve("browse timed out".to_string()));
            }
            match receiver.recv_timeout(remaining) {
                Ok(ServiceEvent::ServiceResolved(info)) => {
                    let port = info.get_port();
                    if let Some(ip) = info.get_addresses_v4().into_iter().next() {
                        break Ok(SocketAddr::from((*ip, port)));
                    }
                }
                Ok(_) => {}
                Err(_) => break Err(Error::Resolve("browse timed out".to_string())),
            }
        };

        let _ = daemon.stop_browse(&self.config.service_type);
        let _ = daemon.shutdown();
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(attempts: u32) -> ResolverConfig {
        ResolverConfig {
            service_type: SERVICE_TYPE.to_string(),
            attempts,
            attempt_timeout: Duration::from_millis(1),
            backoff: Duration::ZERO,
            fallback: "10.0.0.1:12345".parse().unwrap(),
        }
    }

    #[test]
    fn service_type_format() {
        assert!(SERVICE_TYPE.starts_with('_'));
        assert!(SERVICE_TYPE.contains("._tcp."));
        assert!(SERVICE_TYPE.ends_with(".local."));
    }

    #[test]
    fn first_success_wins() {
        let resolver = AddressResolver::new(config(5));
        let addr = resolver.resolve_with(|_| Ok("192.168.1.7:12345".parse().unwrap()));
        assert_eq!(addr, "192.168.1.7:12345".parse().unwrap());
    }

    #[test]
    fn late_success_is_used_not_fallback() {
        let resolver = AddressResolver::new(config(5));
        let mut calls = 0;
        let addr = resolver.resolve_with(|attempt| {
            calls += 1;
            if attempt < 5 {
                Err(Error::Resolve("no answer".to_string()))
            } else {
                Ok("192.168.1.9:12345".parse().unwrap())
            }
        });
        assert_eq!(calls, 5);
        assert_eq!(addr, "192.168.1.9:12345".parse().unwrap());
    }

    #[test]
    fn exhaustion_returns_fallback() {
        let resolver = AddressResolver::new(config(3));
        let mut calls = 0;
        let addr = resolver.resolve_with(|_| {
            calls += 1;
            Err(Error::Resolve("no answer".to_string()))
        });
        assert_eq!(calls, 3);
        assert_eq!(addr, "10.0.0.1:12345".parse().unwrap());
    }
}
