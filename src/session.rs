// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::analytics::{self, AnalyticsEngine, AnalyticsSummary, Trend};
use crate::buffer::OptimisticDeleteBuffer;
use crate::error::{RemoteError, SyncError};
use crate::filter::FilterEngine;
use crate::merge::MergedView;
use crate::models::{Category, Collection, FilterCriteria, Record, RecordId};
use crate::remote::{Completion, OpId, Outcome, RemoteStore};
use crate::store::{Channel, RecordStore, SubscriptionId};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, warn};

/// Wall-clock source. The session never reads the system clock directly so
/// tests and replay scripts can drive time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock; keep an `Rc` handle and advance it between calls.
pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Rc<Self> {
        Rc::new(ManualClock {
            now: Cell::new(start),
        })
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How long a delete stays undoable.
    pub grace: Duration,
    /// Length of the sparkline series in days.
    pub sparkline_days: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            grace: Duration::seconds(5),
            sparkline_days: 30,
        }
    }
}

/// Handle returned by `request_delete`, usable for `undo` until the grace
/// window closes.
#[derive(Debug, Clone)]
pub struct DeleteTicket {
    pub record_id: RecordId,
    pub deadline: DateTime<Utc>,
}

pub type ObserverId = u64;
type FilteredObserver = Box<dyn FnMut(&[Record])>;
type AnalyticsObserver = Box<dyn FnMut(&AnalyticsSummary)>;

enum PendingOp {
    Delete { record_id: RecordId },
    /// Create issued for an undo; `rollback_of` is the original id, kept for
    /// error context. Empty for fresh creates.
    Create { rollback_of: RecordId },
    Update { record_id: RecordId },
}

/// One view's worth of live state: canonical store, optimistic delete
/// buffer, merged view, filter cache, and analytics caches, wired to a
/// remote store handle and a clock. Everything runs on one logical thread;
/// correctness rests on ordering, not locks. Remote writes are
/// fire-and-forget and their outcomes, like undo deadlines, are later
/// events processed by `pump`.
pub struct SyncSession {
    store: RecordStore,
    buffer: OptimisticDeleteBuffer,
    merged: MergedView,
    filter_engine: FilterEngine,
    analytics: AnalyticsEngine,
    remote: Box<dyn RemoteStore>,
    clock: Rc<dyn Clock>,
    collection: Collection,
    criteria: FilterCriteria,
    config: SyncConfig,
    pending_ops: HashMap<OpId, PendingOp>,
    errors: Vec<SyncError>,
    filtered_observers: Vec<(ObserverId, FilteredObserver)>,
    analytics_observers: Vec<(ObserverId, AnalyticsObserver)>,
    next_observer: ObserverId,
    closed: bool,
}

impl SyncSession {
    pub fn new(
        remote: Box<dyn RemoteStore>,
        clock: Rc<dyn Clock>,
        collection: Collection,
        config: SyncConfig,
    ) -> Self {
        SyncSession {
            store: RecordStore::new(),
            buffer: OptimisticDeleteBuffer::new(config.grace),
            merged: MergedView::new(),
            filter_engine: FilterEngine::new(),
            analytics: AnalyticsEngine::new(),
            remote,
            clock,
            collection,
            criteria: FilterCriteria::default(),
            config,
            pending_ops: HashMap::new(),
            errors: Vec::new(),
            filtered_observers: Vec::new(),
            analytics_observers: Vec::new(),
            next_observer: 0,
            closed: false,
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    // ---- stream sink -------------------------------------------------

    /// Feed a full snapshot from the remote stream into the canonical store.
    pub fn apply_records(&mut self, collection: Collection, snapshot: Vec<Record>) {
        self.store.apply_records(collection, snapshot);
        self.refresh();
    }

    pub fn apply_categories(&mut self, snapshot: Vec<Category>) {
        self.store.apply_categories(snapshot);
        self.refresh();
    }

    /// Forward a stream error to store subscribers. Canonical state and
    /// caches are untouched; the last-known-good snapshot keeps serving.
    pub fn apply_stream_error(&mut self, channel: Channel, message: &str) {
        self.store.report_stream_error(channel, message);
    }

    /// Direct store subscription pass-through for collaborators that want
    /// raw snapshots rather than the filtered view.
    pub fn subscribe_store(
        &mut self,
        channel: Channel,
        callback: Box<dyn FnMut(crate::store::StoreEvent<'_>)>,
    ) -> SubscriptionId {
        self.store.subscribe(channel, callback)
    }

    pub fn unsubscribe_store(&mut self, id: SubscriptionId) {
        self.store.unsubscribe(id);
    }

    pub fn canonical(&self) -> &[Record] {
        self.store.records(self.collection)
    }

    pub fn categories(&self) -> &[Category] {
        self.store.categories()
    }

    // ---- filter ------------------------------------------------------

    pub fn set_filter(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.refresh();
    }

    pub fn filter(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// The current merged-then-filtered list, served from cache when the
    /// inputs are unchanged.
    pub fn filtered(&mut self) -> &[Record] {
        self.filtered_rows().0
    }

    /// Cache-miss count of the filter engine, exposed for tests.
    pub fn filter_recomputations(&self) -> u64 {
        self.filter_engine.recomputations()
    }

    // ---- optimistic mutations ---------------------------------------

    /// Start a delete-with-undo: snapshot the record, arm the grace
    /// deadline, and issue the remote delete without blocking. The record
    /// stays visible until the deadline passes or the write fails.
    pub fn request_delete(&mut self, record: &Record) -> Result<DeleteTicket, SyncError> {
        if record.id.is_empty() {
            return Err(SyncError::Unaddressable);
        }
        let now = self.clock.now();
        let deadline = self.buffer.begin(record, now);
        let op = self.remote.delete(self.collection, &record.id);
        self.pending_ops.insert(
            op,
            PendingOp::Delete {
                record_id: record.id.clone(),
            },
        );
        self.refresh();
        Ok(DeleteTicket {
            record_id: record.id.clone(),
            deadline,
        })
    }

    /// One delete request per record; a failure for one record neither
    /// rolls back nor blocks the others.
    pub fn request_delete_all(
        &mut self,
        records: &[Record],
    ) -> Vec<(RecordId, Result<DeleteTicket, SyncError>)> {
        records
            .iter()
            .map(|r| (r.id.clone(), self.request_delete(r)))
            .collect()
    }

    /// Undo a pending delete. The snapshot is recreated remotely under a
    /// fresh id; the old id is not reusable. Once the grace window has
    /// closed this is a soft failure.
    pub fn undo(&mut self, ticket: &DeleteTicket) -> Result<(), SyncError> {
        match self.buffer.cancel(&ticket.record_id) {
            Some(entry) => {
                let mut fields = entry.snapshot;
                fields.id = RecordId::new();
                let op = self.remote.create(self.collection, fields);
                self.pending_ops.insert(
                    op,
                    PendingOp::Create {
                        rollback_of: ticket.record_id.clone(),
                    },
                );
                self.refresh();
                Ok(())
            }
            None => Err(SyncError::UndoWindowClosed(ticket.record_id.clone())),
        }
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.buffer.is_pending(id)
    }

    /// Optimistic edit: issue the remote upsert and let the stream deliver
    /// the canonical result.
    pub fn request_update(&mut self, record: &Record) -> Result<(), SyncError> {
        if record.id.is_empty() {
            return Err(SyncError::Unaddressable);
        }
        let op = self
            .remote
            .update(self.collection, &record.id, record.clone());
        self.pending_ops.insert(
            op,
            PendingOp::Update {
                record_id: record.id.clone(),
            },
        );
        Ok(())
    }

    pub fn request_create(&mut self, fields: Record) {
        let op = self.remote.create(self.collection, fields);
        self.pending_ops.insert(
            op,
            PendingOp::Create {
                rollback_of: RecordId::new(),
            },
        );
    }

    // ---- event pump --------------------------------------------------

    /// Process everything that became due since the last call: remote write
    /// outcomes and expired undo deadlines. Observers see either the state
    /// before or after the whole batch, never a half-applied step.
    pub fn pump(&mut self) {
        if self.closed {
            return;
        }
        let now = self.clock.now();
        let mut changed = false;
        for completion in self.remote.take_completions() {
            changed |= self.handle_completion(completion);
        }
        changed |= !self.buffer.expire_due(now).is_empty();
        if changed {
            self.refresh();
        }
    }

    fn handle_completion(&mut self, completion: Completion) -> bool {
        let Some(op) = self.pending_ops.remove(&completion.op) else {
            return false;
        };
        match (op, completion.outcome) {
            (PendingOp::Delete { record_id }, Outcome::Failed(RemoteError::Transient(msg))) => {
                // Roll back: the canonical store still holds the record, so
                // dropping the buffer entry makes it plain-visible again.
                let rolled_back = self.buffer.cancel(&record_id).is_some();
                warn!(id = %record_id, %msg, rolled_back, "remote delete failed");
                self.errors.push(SyncError::Remote {
                    record_id,
                    source: RemoteError::Transient(msg),
                });
                rolled_back
            }
            // Not-found means the record was already gone remotely: the
            // delete is idempotently successful.
            (PendingOp::Delete { .. }, _) => false,
            (PendingOp::Create { rollback_of }, Outcome::Failed(err)) => {
                warn!(id = %rollback_of, %err, "remote create failed");
                self.errors.push(SyncError::Remote {
                    record_id: rollback_of,
                    source: err,
                });
                false
            }
            (PendingOp::Create { rollback_of }, Outcome::Created(new_id)) => {
                if !rollback_of.is_empty() {
                    debug!(old = %rollback_of, new = %new_id, "undo recreated record");
                }
                false
            }
            (PendingOp::Create { .. }, _) => false,
            (PendingOp::Update { record_id }, Outcome::Failed(RemoteError::Transient(msg))) => {
                self.errors.push(SyncError::Remote {
                    record_id,
                    source: RemoteError::Transient(msg),
                });
                false
            }
            // Not-found on update is an upsert on the remote side.
            (PendingOp::Update { .. }, _) => false,
        }
    }

    /// Deferred failures from remote writes, drained by the caller.
    pub fn take_errors(&mut self) -> Vec<SyncError> {
        std::mem::take(&mut self.errors)
    }

    // ---- observers ---------------------------------------------------

    /// Register a filtered-list observer; fires once immediately, then after
    /// every state change.
    pub fn observe_filtered(&mut self, mut callback: FilteredObserver) -> ObserverId {
        let rows = self.filtered_rows().0.to_vec();
        callback(&rows);
        let id = self.next_observer;
        self.next_observer += 1;
        self.filtered_observers.push((id, callback));
        id
    }

    /// Register an aggregate observer; same delivery contract as
    /// `observe_filtered`.
    pub fn observe_analytics(&mut self, mut callback: AnalyticsObserver) -> ObserverId {
        let summary = self.analytics_summary();
        callback(&summary);
        let id = self.next_observer;
        self.next_observer += 1;
        self.analytics_observers.push((id, callback));
        id
    }

    pub fn unobserve(&mut self, id: ObserverId) {
        self.filtered_observers.retain(|(obs_id, _)| *obs_id != id);
        self.analytics_observers.retain(|(obs_id, _)| *obs_id != id);
    }

    /// Tear down the view: drop observers and outstanding undo deadlines so
    /// nothing acts on this session afterwards.
    pub fn close(&mut self) {
        self.closed = true;
        self.filtered_observers.clear();
        self.analytics_observers.clear();
        self.pending_ops.clear();
        self.buffer.clear();
    }

    // ---- derived analytics ------------------------------------------

    pub fn analytics_summary(&mut self) -> AnalyticsSummary {
        let SyncSession {
            store,
            buffer,
            merged,
            filter_engine,
            collection,
            criteria,
            ..
        } = self;
        let rows = merged.current(store.records(*collection), store.generation(), buffer);
        let (filtered, _) = filter_engine.filter(
            rows,
            store.categories(),
            store.generation(),
            buffer.generation(),
            criteria,
        );
        analytics::summarize(filtered, store.categories())
    }

    /// Month-over-month trend for one category, cached per category until
    /// the filtered set changes.
    pub fn category_trend(&mut self, category_id: &str) -> Trend {
        let SyncSession {
            store,
            buffer,
            merged,
            filter_engine,
            analytics,
            collection,
            criteria,
            ..
        } = self;
        let rows = merged.current(store.records(*collection), store.generation(), buffer);
        let (filtered, result_generation) = filter_engine.filter(
            rows,
            store.categories(),
            store.generation(),
            buffer.generation(),
            criteria,
        );
        analytics.category_trend(filtered, store.categories(), category_id, result_generation)
    }

    /// Record count for one category, cached like `category_trend`.
    pub fn category_count(&mut self, category_id: &str) -> usize {
        let SyncSession {
            store,
            buffer,
            merged,
            filter_engine,
            analytics,
            collection,
            criteria,
            ..
        } = self;
        let rows = merged.current(store.records(*collection), store.generation(), buffer);
        let (filtered, result_generation) = filter_engine.filter(
            rows,
            store.categories(),
            store.generation(),
            buffer.generation(),
            criteria,
        );
        analytics.category_count(filtered, store.categories(), category_id, result_generation)
    }

    /// Per-day totals for the trailing sparkline window, ending today.
    pub fn sparkline(&mut self, category_id: Option<&str>) -> Vec<Decimal> {
        let today = self.clock.now().date_naive();
        let days = self.config.sparkline_days;
        let SyncSession {
            store,
            buffer,
            merged,
            filter_engine,
            collection,
            criteria,
            ..
        } = self;
        let rows = merged.current(store.records(*collection), store.generation(), buffer);
        let (filtered, _) = filter_engine.filter(
            rows,
            store.categories(),
            store.generation(),
            buffer.generation(),
            criteria,
        );
        analytics::sparkline(filtered, store.categories(), category_id, days, today)
    }

    // ---- internals ---------------------------------------------------

    fn filtered_rows(&mut self) -> (&[Record], u64) {
        let SyncSession {
            store,
            buffer,
            merged,
            filter_engine,
            collection,
            criteria,
            ..
        } = self;
        let rows = merged.current(store.records(*collection), store.generation(), buffer);
        filter_engine.filter(
            rows,
            store.categories(),
            store.generation(),
            buffer.generation(),
            criteria,
        )
    }

    /// Recompute the pipeline and fan the result out to observers. Called
    /// after every state transition so no observer sees a torn view.
    fn refresh(&mut self) {
        if self.closed {
            return;
        }
        let SyncSession {
            store,
            buffer,
            merged,
            filter_engine,
            collection,
            criteria,
            filtered_observers,
            analytics_observers,
            ..
        } = self;
        let rows = merged.current(store.records(*collection), store.generation(), buffer);
        let (filtered, _) = filter_engine.filter(
            rows,
            store.categories(),
            store.generation(),
            buffer.generation(),
            criteria,
        );
        for (_, callback) in filtered_observers.iter_mut() {
            callback(filtered);
        }
        if !analytics_observers.is_empty() {
            let summary = analytics::summarize(filtered, store.categories());
            for (_, callback) in analytics_observers.iter_mut() {
                callback(&summary);
            }
        }
    }
}
