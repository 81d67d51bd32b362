//! Reporting of match counts.
//!
//! The oracle never prints. It hands counts to an injected [`QueryObserver`],
//! so callers decide whether they become log records, test assertions or nothing.

use std::sync::Mutex;

use crate::data::model::ParameterKind;

/// Row counts produced while filtering one parameter table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchCounts {
    /// Rows whose object passed the object filter.
    pub object_matches: usize,
    /// Rows whose value and reference passed.
    pub value_matches: usize,
    /// Rows passing both.
    pub combined_matches: usize,
}

/// Receives informational events from oracle queries.
pub trait QueryObserver: Send + Sync {
    fn parameter_matches(&self, kind: ParameterKind, counts: MatchCounts);
    fn common_objects(&self, objects: &[String]);
    /// Both merged-only and orders-only were requested; merged-only was applied.
    fn order_conflict(&self);
    fn observations_selected(&self, count: usize);
}

/// Forwards events to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl QueryObserver for LogObserver {
    fn parameter_matches(&self, kind: ParameterKind, counts: MatchCounts) {
        log::info!(
            "{kind}: {} object matches, {} parameter matches, {} combined matches",
            counts.object_matches,
            counts.value_matches,
            counts.combined_matches
        );
    }

    fn common_objects(&self, objects: &[String]) {
        if objects.is_empty() {
            log::info!("No objects satisfy every parameter constraint");
        } else {
            log::info!("{} common objects: {}", objects.len(), objects.join(", "));
        }
    }

    fn order_conflict(&self) {
        log::warn!("Both merged-only and orders-only requested; only returning merged spectra");
    }

    fn observations_selected(&self, count: usize) {
        log::debug!("{count} observations selected");
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl QueryObserver for NoopObserver {
    fn parameter_matches(&self, _kind: ParameterKind, _counts: MatchCounts) {}
    fn common_objects(&self, _objects: &[String]) {}
    fn order_conflict(&self) {}
    fn observations_selected(&self, _count: usize) {}
}

/// An event captured by [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryEvent {
    ParameterMatches(ParameterKind, MatchCounts),
    CommonObjects(Vec<String>),
    OrderConflict,
    ObservationsSelected(usize),
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<QueryEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far.
    pub fn events(&self) -> Vec<QueryEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn clear(&self) {
        match self.events.lock() {
            Ok(mut events) => events.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    fn push(&self, event: QueryEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

impl QueryObserver for RecordingObserver {
    fn parameter_matches(&self, kind: ParameterKind, counts: MatchCounts) {
        self.push(QueryEvent::ParameterMatches(kind, counts));
    }

    fn common_objects(&self, objects: &[String]) {
        self.push(QueryEvent::CommonObjects(objects.to_vec()));
    }

    fn order_conflict(&self) {
        self.push(QueryEvent::OrderConflict);
    }

    fn observations_selected(&self, count: usize) {
        self.push(QueryEvent::ObservationsSelected(count));
    }
}
