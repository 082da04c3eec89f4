//! MX validation for outbound sends.
//!
//! Every send is preceded by a check that the recipient's domain publishes
//! at least one mail exchanger. Results are cached per domain in a bounded
//! LRU with a fixed TTL. A confirmed absence of records is cached and
//! treated as undeliverable; a lookup *error* is not cached and does not
//! block sending, so transient DNS trouble never stalls a campaign.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use hickory_resolver::{
    config::ResolverOpts, name_server::TokioConnectionProvider, TokioResolver,
};
use lru::LruCache;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::DnsSettings;

/// Errors that can occur while constructing the validator.
#[derive(Debug, Error)]
pub enum MxError {
    /// The system resolver configuration could not be loaded.
    #[error("failed to initialize DNS resolver: {0}")]
    ResolverInit(#[from] hickory_resolver::ResolveError),
}

/// Outcome of an MX check for a recipient address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MxOutcome {
    /// The domain publishes at least one MX record.
    Deliverable,
    /// The domain definitively has no MX records.
    NoRecords,
    /// The lookup failed; deliverability is unknown.
    Unknown,
}

impl MxOutcome {
    /// Returns whether a send should proceed.
    ///
    /// Unknown is allowed through: only a confirmed absence blocks.
    pub fn allows_send(&self) -> bool {
        !matches!(self, Self::NoRecords)
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedMx {
    deliverable: bool,
    cached_at: Instant,
}

/// Validates recipient domains against DNS MX records.
///
/// Owned by the step executor; the cache is an explicit, injectable,
/// bounded object rather than process-global state.
pub struct MxValidator {
    resolver: TokioResolver,
    cache: Mutex<LruCache<String, CachedMx>>,
    ttl: Duration,
}

impl MxValidator {
    /// Creates a validator using the system resolver configuration.
    pub fn new(settings: &DnsSettings) -> Result<Self, MxError> {
        let mut opts = ResolverOpts::default();
        opts.timeout = Duration::from_secs(settings.timeout_secs);

        let resolver = TokioResolver::builder(TokioConnectionProvider::default())?
            .with_options(opts)
            .build();

        let capacity = NonZeroUsize::new(settings.cache_capacity.max(1))
            .expect("cache capacity is at least 1");

        Ok(Self {
            resolver,
            cache: Mutex::new(LruCache::new(capacity)),
            ttl: Duration::from_secs(settings.cache_ttl_secs),
        })
    }

    /// Checks whether mail can be routed to `email`'s domain.
    ///
    /// An address without a domain part is treated as having no records.
    pub async fn check(&self, email: &str) -> MxOutcome {
        let Some((_, domain)) = email.rsplit_once('@') else {
            return MxOutcome::NoRecords;
        };
        let domain = domain.to_ascii_lowercase();

        if let Some(cached) = self.cache_get(&domain) {
            debug!(domain, "MX cache hit");
            return if cached.deliverable {
                MxOutcome::Deliverable
            } else {
                MxOutcome::NoRecords
            };
        }

        match self.resolver.mx_lookup(&domain).await {
            Ok(lookup) => {
                let found = lookup.iter().next().is_some();
                self.cache_put(&domain, found);
                if found {
                    debug!(domain, "MX records found");
                    MxOutcome::Deliverable
                } else {
                    debug!(domain, "MX lookup returned no records");
                    MxOutcome::NoRecords
                }
            }
            Err(err) if err.is_no_records_found() || err.is_nx_domain() => {
                debug!(domain, "no MX records");
                self.cache_put(&domain, false);
                MxOutcome::NoRecords
            }
            Err(err) => {
                // Transient failure: not cached, sending proceeds.
                warn!(domain, error = %err, "MX lookup failed");
                MxOutcome::Unknown
            }
        }
    }

    fn cache_get(&self, domain: &str) -> Option<CachedMx> {
        let mut cache = self.cache.lock().expect("MX cache lock poisoned");
        match cache.get(domain) {
            Some(entry) if entry.cached_at.elapsed() < self.ttl => Some(*entry),
            Some(_) => {
                cache.pop(domain);
                None
            }
            None => None,
        }
    }

    fn cache_put(&self, domain: &str, deliverable: bool) {
        let mut cache = self.cache.lock().expect("MX cache lock poisoned");
        cache.put(
            domain.to_string(),
            CachedMx {
                deliverable,
                cached_at: Instant::now(),
            },
        );
    }

    /// Pre-populates the cache with a known result for a domain.
    ///
    /// Used to import known-good domains at startup and to make tests
    /// independent of live DNS.
    pub fn warm(&self, domain: &str, deliverable: bool) {
        self.cache_put(&domain.to_ascii_lowercase(), deliverable);
    }
}

impl std::fmt::Debug for MxValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MxValidator")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
