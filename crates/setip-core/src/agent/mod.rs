//! Delivery loop
//!
//! The DeliveryLoop is responsible for:
//! - Building a fresh report from the local address snapshot
//! - Refilling the candidate store whenever it runs dry
//! - Dialing candidates in order until one delivers the report
//! - Evicting candidates that fail
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   snapshot   ┌──────────────┐
//! │ AddressSource │─────────────▶│ DeliveryLoop │──── AgentEvent ───▶ observers
//! └───────────────┘              └──────────────┘
//!                                   │        │
//!                  count()==0       │        │  list(family)
//!              ┌────────────────────┘        └──────────────────┐
//!              ▼                                                ▼
//!      ┌──────────────┐    add()    ┌────────────────┐   ┌──────────────┐
//!      │ RefillPolicy │────────────▶│ CandidateStore │◀──│   Delivery   │
//!      └──────────────┘             └────────────────┘   └──────────────┘
//!              │                          remove() on failure
//!              ▼
//!      ┌──────────────┐
//!      │ NameResolver │
//!      └──────────────┘
//! ```
//!
//! ## Iteration
//!
//! 1. Build the payload (on failure: back off, retry)
//! 2. Refill if the store holds no candidates at all
//! 3. Try the active family's candidates in order; first success wins
//! 4. Toggle family, sleep for the push interval

use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::AgentConfig;
use crate::error::Result;
use crate::refill::RefillPolicy;
use crate::report::Report;
use crate::store::CandidateStore;
use crate::traits::{AddressSource, Delivery, IpVersion, NameResolver};

/// HTTP method used for reports
const REPORT_METHOD: &str = "POST";

/// Events emitted by the DeliveryLoop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// Loop started
    Started {
        servers: usize,
    },

    /// A refill pass completed
    Refilled {
        answered: usize,
        failed: usize,
        candidates: usize,
    },

    /// An iteration began for a family
    PushStarted {
        family: IpVersion,
    },

    /// The report could not be built
    PayloadFailed {
        error: String,
    },

    /// A candidate failed and was removed from the store
    CandidateEvicted {
        family: IpVersion,
        ip: IpAddr,
        error: String,
    },

    /// The report reached the collector
    Pushed {
        family: IpVersion,
        ip: IpAddr,
        status: u16,
    },

    /// No candidate of the family delivered the report
    PushExhausted {
        family: IpVersion,
    },

    /// Loop stopped
    Stopped {
        reason: String,
    },
}

/// What the loop does after an iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Next {
    /// Move to the other family after the push interval
    Toggle,
    /// Repeat the same family after the retry delay
    Retry,
}

/// Core delivery loop
///
/// Owns the candidate store for its whole lifetime and runs one iteration
/// at a time until a shutdown signal arrives.
///
/// ## Lifecycle
///
/// 1. Create with [`DeliveryLoop::new()`]
/// 2. Start with [`DeliveryLoop::run()`] or [`DeliveryLoop::run_with_shutdown()`]
/// 3. The first thing `run` does is an eager refill
/// 4. Runs until shutdown; delivery failures never end it
pub struct DeliveryLoop {
    /// Candidate collector IPs
    store: Arc<CandidateStore>,

    /// Refill policy over the configured DNS servers
    refill: RefillPolicy,

    /// Direct-to-IP transport
    delivery: Box<dyn Delivery>,

    /// Local address snapshot source
    source: Box<dyn AddressSource>,

    client_id: String,

    api_url: String,

    /// Pause between iterations
    push_interval: Duration,

    /// Pause after a failed payload build
    retry_delay: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<AgentEvent>,
}

impl DeliveryLoop {
    /// Create a new delivery loop
    ///
    /// # Parameters
    ///
    /// - `resolver`: Resolver used by the refill policy
    /// - `delivery`: Direct-to-IP transport
    /// - `source`: Local address source
    /// - `config`: Agent configuration
    ///
    /// # Returns
    ///
    /// A tuple of (loop, event_receiver) where event_receiver yields agent events
    pub fn new(
        resolver: Box<dyn NameResolver>,
        delivery: Box<dyn Delivery>,
        source: Box<dyn AddressSource>,
        config: AgentConfig,
    ) -> Result<(Self, mpsc::Receiver<AgentEvent>)> {
        config.validate()?;

        let refill = RefillPolicy::new(resolver, config.servers()?, config.collector_host()?);
        let (tx, rx) = mpsc::channel(config.loop_config.event_channel_capacity);

        let agent = Self {
            store: Arc::new(CandidateStore::new()),
            refill,
            delivery,
            source,
            client_id: config.client_id,
            api_url: config.api_url,
            push_interval: config.loop_config.push_interval(),
            retry_delay: config.loop_config.retry_delay(),
            event_tx: tx,
        };

        Ok((agent, rx))
    }

    /// Handle to the candidate store
    pub fn store(&self) -> Arc<CandidateStore> {
        Arc::clone(&self.store)
    }

    /// Run the loop until Ctrl-C
    pub async fn run(&self) -> Result<()> {
        self.run_with_shutdown(None).await
    }

    /// Run the loop until `shutdown_rx` fires (or Ctrl-C when `None`)
    ///
    /// A dropped sender counts as a shutdown signal.
    pub async fn run_with_shutdown(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        match shutdown_rx {
            Some(rx) => {
                self.run_internal(async move {
                    let _ = rx.await;
                })
                .await
            }
            None => {
                self.run_internal(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for Ctrl-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                })
                .await
            }
        }
    }

    async fn run_internal(&self, shutdown: impl Future<Output = ()>) -> Result<()> {
        tokio::pin!(shutdown);

        self.emit_event(AgentEvent::Started {
            servers: self.refill.servers().len(),
        });
        info!(host = %self.refill.hostname(), "Resolving collector candidates");

        let stopped = tokio::select! {
            biased;
            _ = &mut shutdown => true,
            _ = self.refill_store() => false,
        };

        if !stopped {
            let mut family = IpVersion::V4;
            loop {
                let next = tokio::select! {
                    biased;
                    _ = &mut shutdown => break,
                    next = self.iterate(family) => next,
                };

                let pause = match next {
                    Next::Toggle => {
                        family = family.toggled();
                        self.push_interval
                    }
                    Next::Retry => self.retry_delay,
                };

                tokio::select! {
                    biased;
                    _ = &mut shutdown => break,
                    _ = tokio::time::sleep(pause) => {}
                }
            }
        }

        info!("Shutdown signal received");
        self.emit_event(AgentEvent::Stopped {
            reason: "Shutdown signal".to_string(),
        });

        Ok(())
    }

    /// One pass of the loop for `family`
    async fn iterate(&self, family: IpVersion) -> Next {
        info!(family = %family, "The new information push starts");
        self.emit_event(AgentEvent::PushStarted { family });

        let payload = match self.build_payload().await {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to build report: {}", e);
                self.emit_event(AgentEvent::PayloadFailed {
                    error: e.to_string(),
                });
                return Next::Retry;
            }
        };

        if self.store.count() == 0 {
            warn!("No IPs found in the store, attempting to query DNS");
            self.refill_store().await;
        }

        let candidates = match self.store.list(family) {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(family = %family, "Failed to read candidates: {}", e);
                Vec::new()
            }
        };

        if !self.push(family, &candidates, &payload).await {
            warn!(family = %family, tried = candidates.len(), "No candidate accepted the report");
            self.emit_event(AgentEvent::PushExhausted { family });
        }

        Next::Toggle
    }

    /// Try candidates in order; returns true once one delivers
    async fn push(&self, family: IpVersion, candidates: &[IpAddr], payload: &[u8]) -> bool {
        for ip in candidates {
            match self
                .delivery
                .deliver(&self.api_url, *ip, REPORT_METHOD, Some(payload))
                .await
            {
                Ok(response) => {
                    if !response.is_success() {
                        warn!(ip = %ip, status = response.status, "Collector answered with non-success status");
                    }
                    info!(family = %family, ip = %ip, "Information has been pushed");
                    self.emit_event(AgentEvent::Pushed {
                        family,
                        ip: *ip,
                        status: response.status,
                    });
                    return true;
                }
                Err(e) => {
                    warn!(ip = %ip, error = %e, "API request failed, attempting to retry");
                    self.store.remove(family, ip);
                    self.emit_event(AgentEvent::CandidateEvicted {
                        family,
                        ip: *ip,
                        error: e.to_string(),
                    });
                }
            }
        }

        false
    }

    async fn build_payload(&self) -> Result<Vec<u8>> {
        let nics = self.source.snapshot().await?;
        debug!(nics = nics.len(), "Local address snapshot taken");
        Report::new(nics, self.client_id.clone()).to_json()
    }

    async fn refill_store(&self) {
        let summary = self.refill.refill(&self.store).await;
        self.emit_event(AgentEvent::Refilled {
            answered: summary.answered,
            failed: summary.failed,
            candidates: summary.candidates,
        });
    }

    /// Emit an agent event
    fn emit_event(&self, event: AgentEvent) {
        // A full channel means nobody is keeping up; drop rather than block the loop
        if self.event_tx.try_send(event).is_err() {
            debug!("Event channel full or closed, dropping event");
        }
    }
}
