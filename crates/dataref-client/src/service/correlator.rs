//! Request Correlator - routes each response to the read that asked for it.
//!
//! Maps request ids to waiting callers. Every pending request resolves at
//! most once: completed by its response, failed, expired or cancelled.
//! Whichever happens first removes the entry; anything arriving later finds
//! nothing and is discarded.
//!
//! Flow:
//! 1. Caller calls `submit()` and gets an id plus a oneshot receiver
//! 2. Caller sends the encoded request carrying that id
//! 3. Whoever owns the receive side decodes responses and calls `complete()`
//! 4. Caller awaits the receiver, calling `expire()` if its deadline passes

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, watch};
use tracing::{debug, warn};

use crate::domain::{
    ClientError, DataRefName, DataRefStore, DataRefType, DataRefValue, RequestId, TransportError,
};
use crate::ports::RequestIdSource;

/// Outcome delivered to a waiting caller.
pub type ReadResult = Result<DataRefValue, ClientError>;

/// Redraws allowed when the id source returns an id already in flight.
const MAX_ID_ATTEMPTS: usize = 8;

/// A read waiting for its response
struct PendingRequest {
    name: DataRefName,
    data_type: DataRefType,
    submitted_at: Instant,
    timeout: Duration,
    sender: oneshot::Sender<ReadResult>,
}

/// Correlator counters
#[derive(Debug, Default)]
pub struct CorrelatorStats {
    /// Requests registered by `submit`
    pub total_registered: AtomicU64,
    /// Requests resolved with a value
    pub total_completed: AtomicU64,
    /// Requests resolved with an error other than a timeout
    pub total_failed: AtomicU64,
    /// Requests that hit their deadline
    pub total_timeouts: AtomicU64,
    /// Requests dropped without an outcome, or whose caller had already left
    pub total_cancelled: AtomicU64,
    /// Responses that matched no pending request, or matched one with the wrong type
    pub total_discarded: AtomicU64,
}

/// A freshly registered request.
#[derive(Debug)]
pub struct Submission {
    pub id: RequestId,
    pub receiver: oneshot::Receiver<ReadResult>,
}

pub struct Correlator {
    pending: DashMap<RequestId, PendingRequest>,
    ids: Arc<dyn RequestIdSource>,
    default_timeout: Duration,
    max_in_flight: usize,
    store: Option<Arc<DataRefStore>>,
    stats: Arc<CorrelatorStats>,
}

impl Correlator {
    pub fn new(ids: Arc<dyn RequestIdSource>, default_timeout: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            ids,
            default_timeout,
            max_in_flight: 1024,
            store: None,
            stats: Arc::new(CorrelatorStats::default()),
        }
    }

    /// Upper bound on concurrently pending requests.
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// Record every resolution in `store`.
    pub fn with_store(mut self, store: Arc<DataRefStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Register a read and get the receiver its outcome will arrive on.
    ///
    /// # Errors
    ///
    /// - `Saturated` if `max_in_flight` requests are already pending
    /// - `IdCollision` if the id source keeps returning ids already in use
    pub fn submit(
        &self,
        name: &DataRefName,
        data_type: DataRefType,
        timeout: Option<Duration>,
    ) -> Result<Submission, ClientError> {
        // Soft bound: concurrent submits may overshoot by a few.
        if self.pending.len() >= self.max_in_flight {
            warn!(
                dataref = %name,
                max_in_flight = self.max_in_flight,
                "Rejecting read, too many requests in flight"
            );
            return Err(ClientError::Saturated {
                max: self.max_in_flight,
            });
        }

        let timeout = timeout.unwrap_or(self.default_timeout);
        let mut last = None;

        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.ids.next_id();
            match self.pending.entry(id.clone()) {
                Entry::Occupied(_) => {
                    warn!(request_id = %id, "Request id already in flight, drawing another");
                    last = Some(id);
                }
                Entry::Vacant(slot) => {
                    let (tx, rx) = oneshot::channel();
                    slot.insert(PendingRequest {
                        name: name.clone(),
                        data_type,
                        submitted_at: Instant::now(),
                        timeout,
                        sender: tx,
                    });
                    self.stats.total_registered.fetch_add(1, Ordering::Relaxed);

                    debug!(
                        request_id = %id,
                        dataref = %name,
                        data_type = %data_type,
                        "Registered pending request"
                    );

                    return Ok(Submission { id, receiver: rx });
                }
            }
        }

        Err(ClientError::IdCollision(
            last.map(|id| id.to_string()).unwrap_or_default(),
        ))
    }

    /// Resolve a pending request with a decoded value.
    ///
    /// The entry is consumed only if the response's type tag matches the
    /// declared type. A mismatched response leaves the request pending, since
    /// the correct response may still arrive.
    ///
    /// Returns true if the request was resolved and removed, even when its
    /// caller had already stopped waiting.
    pub fn complete(&self, id: &RequestId, data_type: DataRefType, value: DataRefValue) -> bool {
        let value_matches = value.data_type() == Some(data_type);
        let removed = self.pending.remove_if(id, |_, pending| {
            value_matches && pending.data_type == data_type
        });

        let Some((id, pending)) = removed else {
            self.stats.total_discarded.fetch_add(1, Ordering::Relaxed);
            match self.pending.get(id).map(|pending| pending.data_type) {
                Some(expected) => warn!(
                    request_id = %id,
                    expected = %expected,
                    actual = %data_type,
                    "Discarding response with mismatched type"
                ),
                None => debug!(
                    request_id = %id,
                    "Response for unknown or expired request id"
                ),
            }
            return false;
        };

        let elapsed_ms = pending.submitted_at.elapsed().as_millis();
        let name = pending.name.clone();
        if self.deliver(pending, Ok(value)) {
            self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
            debug!(
                request_id = %id,
                dataref = %name,
                elapsed_ms = elapsed_ms,
                "Completed pending request"
            );
        } else {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            debug!(
                request_id = %id,
                dataref = %name,
                "Pending request receiver dropped"
            );
        }
        true
    }

    /// Resolve a pending request with an error.
    pub fn fail(&self, id: &RequestId, error: ClientError) -> bool {
        let Some((id, pending)) = self.pending.remove(id) else {
            return false;
        };

        self.stats.total_failed.fetch_add(1, Ordering::Relaxed);
        warn!(
            request_id = %id,
            dataref = %pending.name,
            error = %error,
            "Failing pending request"
        );
        self.deliver(pending, Err(error));
        true
    }

    /// Resolve a pending request with a timeout.
    pub fn expire(&self, id: &RequestId) -> bool {
        let Some((id, pending)) = self.pending.remove(id) else {
            return false;
        };

        self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
        debug!(
            request_id = %id,
            dataref = %pending.name,
            elapsed_ms = pending.submitted_at.elapsed().as_millis(),
            timeout_ms = pending.timeout.as_millis(),
            "Pending request timed out"
        );
        let error = TransportError::Timeout(pending.timeout).into();
        self.deliver(pending, Err(error));
        true
    }

    /// Drop a pending request without an outcome. The caller's receiver sees
    /// a closed channel.
    pub fn cancel(&self, id: &RequestId) -> bool {
        if self.pending.remove(id).is_some() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Fail every pending request with `error`. Returns how many were failed.
    pub fn fail_all(&self, error: ClientError) -> usize {
        let ids: Vec<RequestId> = self.pending.iter().map(|e| e.key().clone()).collect();
        ids.iter()
            .filter(|id| self.fail(id, error.clone()))
            .count()
    }

    /// Expire requests past their deadline.
    ///
    /// Returns the number of requests removed.
    pub fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<RequestId> = self
            .pending
            .iter()
            .filter(|e| now.duration_since(e.submitted_at) > e.timeout)
            .map(|e| e.key().clone())
            .collect();

        expired.iter().filter(|id| self.expire(id)).count()
    }

    pub fn is_pending(&self, id: &RequestId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    pub fn stats(&self) -> &CorrelatorStats {
        &self.stats
    }

    pub fn store(&self) -> Option<&Arc<DataRefStore>> {
        self.store.as_ref()
    }

    /// Record the outcome and hand it to the caller. False if the caller left.
    fn deliver(&self, pending: PendingRequest, result: ReadResult) -> bool {
        if let Some(store) = &self.store {
            let value = match &result {
                Ok(value) => value.clone(),
                Err(_) => DataRefValue::Invalid,
            };
            store.record(&pending.name, pending.data_type, value);
        }
        pending.sender.send(result).is_ok()
    }
}

/// Background task expiring abandoned requests until `shutdown` flips to true.
pub async fn sweep_task(
    correlator: Arc<Correlator>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut sweep_interval = tokio::time::interval(interval);
    sweep_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = sweep_interval.tick() => {
                let removed = correlator.remove_expired();
                if removed > 0 {
                    debug!(removed = removed, "Swept expired pending requests");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}
