//! Two-way synchronization between the local cache and the remote store.
//!
//! The synchronizer is stateless apart from the cache it owns. Each operation
//! is a one-shot exchange with the store: nothing is queued or retried, and
//! every failure ends up in the returned report instead of propagating.

mod change_set;
mod report;

pub use change_set::ChangeSet;
pub use report::{CommitReport, LoadReport, Operation, SyncFailure};

use chrono::{Duration, Utc};
use std::collections::BTreeMap;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::cache::EventCache;
use crate::constants::{
    DEFAULT_HORIZON_DAYS, DEFAULT_LOCALE, DEFAULT_LOOKBACK_DAYS, DEFAULT_MAX_OCCURRENCES,
    DEFAULT_TITLE,
};
use crate::error::SyncError;
use crate::event::{EventOccurrence, EventPatch, EventTemplate, OccurrenceKey};
use crate::horizon::Horizon;
use crate::recurrence;
use crate::store::EventStore;

/// Tunables for loading and expanding events.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// How far past "now" unbounded recurring events are expanded.
    pub horizon: Duration,
    /// How far before "now" unbounded recurring events are expanded.
    pub lookback: Duration,
    pub max_occurrences: u16,
    pub default_title: String,
    /// Locale tag handed to the presentation layer.
    pub locale: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            horizon: Duration::days(DEFAULT_HORIZON_DAYS),
            lookback: Duration::days(DEFAULT_LOOKBACK_DAYS),
            max_occurrences: DEFAULT_MAX_OCCURRENCES,
            default_title: DEFAULT_TITLE.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

impl SyncOptions {
    pub fn horizon(&self) -> Horizon {
        Horizon::around_now(self.lookback, self.horizon, self.max_occurrences)
    }
}

pub struct Synchronizer<S> {
    store: S,
    cache: EventCache,
    options: SyncOptions,
}

impl<S: EventStore> Synchronizer<S> {
    pub fn new(store: S, options: SyncOptions) -> Self {
        Synchronizer {
            store,
            cache: EventCache::new(),
            options,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &EventCache {
        &self.cache
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn locale(&self) -> &str {
        &self.options.locale
    }

    /// The occurrences currently displayed.
    pub fn snapshot(&self) -> Vec<EventOccurrence> {
        self.cache.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<EventOccurrence>> {
        self.cache.subscribe()
    }

    /// Fetch every document, expand it and replace the cache contents.
    ///
    /// A store failure leaves the cache untouched and yields an empty list.
    /// A bad recurrence rule only affects its own template, which is shown
    /// as a single occurrence.
    #[instrument(skip(self))]
    pub async fn load_all(&self) -> LoadReport {
        let mut report = LoadReport::default();

        let documents = match self.store.list_all().await {
            Ok(documents) => documents,
            Err(error) => {
                error!(%error, "failed to fetch events");
                report
                    .failures
                    .push(SyncFailure::new(Operation::Load, None, error));
                return report;
            }
        };

        let now = Utc::now();
        let horizon = self.options.horizon();

        for stored in &documents {
            let template = EventTemplate::from_document(
                &stored.id,
                &stored.document,
                now,
                &self.options.default_title,
            );
            let occurrences =
                self.expand_or_single(&template, &horizon, Operation::Load, &mut report.failures);
            report.occurrences.extend(occurrences);
        }

        info!(
            documents = documents.len(),
            occurrences = report.occurrences.len(),
            "loaded events"
        );
        self.cache.replace_all(report.occurrences.clone());
        report
    }

    /// Apply one batched edit. The add, the changes and the delete are
    /// independent: a failure in one does not block the others.
    #[instrument(skip(self, changes))]
    pub async fn commit(&self, changes: ChangeSet) -> CommitReport {
        let mut report = CommitReport::default();
        let horizon = self.options.horizon();

        if let Some(added) = &changes.added {
            self.commit_add(added, &horizon, &mut report).await;
        }

        if !changes.changed.is_empty() {
            self.commit_changes(&changes.changed, &horizon, &mut report)
                .await;
        }

        if let Some(id) = &changes.deleted {
            self.commit_delete(id, &mut report).await;
        }

        report
    }

    /// Remove a single occurrence from its series by adding its start to the
    /// template's exclusion dates. A non-recurring event is deleted outright.
    #[instrument(skip(self, key), fields(key = %key))]
    pub async fn delete_occurrence(&self, key: &OccurrenceKey) -> CommitReport {
        let mut report = CommitReport::default();

        let Some(occurrence) = self.cache.get(key) else {
            debug!(error = %SyncError::NotFound(key.to_string()), "skipping occurrence delete");
            report.skipped.push(key.template_id.clone());
            return report;
        };

        let series = occurrence.series;
        if !series.is_recurring() {
            self.commit_delete(&series.id, &mut report).await;
            return report;
        }

        let updated = series.with_exclusion(key.start);
        if let Err(error) = self.store.update(&series.id, &updated.to_document()).await {
            error!(id = %series.id, %error, "failed to exclude occurrence");
            report
                .failures
                .push(SyncFailure::new(Operation::Delete, Some(series.id.as_str()), error));
            return report;
        }

        let horizon = self.options.horizon();
        let occurrences =
            self.expand_or_single(&updated, &horizon, Operation::Delete, &mut report.failures);
        self.cache.replace_series(&series.id, occurrences);
        info!(id = %series.id, "excluded occurrence");
        report.excluded = Some(key.clone());
        report
    }

    async fn commit_add(&self, patch: &EventPatch, horizon: &Horizon, report: &mut CommitReport) {
        let template = EventTemplate::from_patch(patch, Utc::now(), &self.options.default_title);

        match self.store.create(&template.to_document()).await {
            Ok(id) => {
                let template = EventTemplate {
                    id: id.clone(),
                    ..template
                };
                let occurrences =
                    self.expand_or_single(&template, horizon, Operation::Create, &mut report.failures);
                self.cache.append(occurrences);
                info!(%id, title = %template.title, "created event");
                report.created = Some(id);
            }
            Err(error) => {
                error!(%error, title = %template.title, "failed to create event");
                report
                    .failures
                    .push(SyncFailure::new(Operation::Create, None, error));
            }
        }
    }

    /// Changes run one after another; the first failed write stops the rest.
    async fn commit_changes(
        &self,
        changed: &BTreeMap<String, EventPatch>,
        horizon: &Horizon,
        report: &mut CommitReport,
    ) {
        let mut pending = changed.iter();

        while let Some((id, patch)) = pending.next() {
            let Some(series) = self.cache.series(id) else {
                debug!(error = %SyncError::NotFound(id.clone()), "skipping change");
                report.skipped.push(id.clone());
                continue;
            };

            let merged = series.merged(patch);
            if let Err(error) = self.store.update(id, &merged.to_document()).await {
                error!(%id, %error, "failed to update event");
                report
                    .failures
                    .push(SyncFailure::new(Operation::Update, Some(id.as_str()), error));
                report
                    .unattempted
                    .extend(pending.by_ref().map(|(id, _)| id.clone()));
                break;
            }

            let occurrences =
                self.expand_or_single(&merged, horizon, Operation::Update, &mut report.failures);
            self.cache.replace_series(id, occurrences);
            info!(%id, "updated event");
            report.updated.push(id.clone());
        }
    }

    async fn commit_delete(&self, id: &str, report: &mut CommitReport) {
        match self.store.delete(id).await {
            Ok(()) => {
                let removed = self.cache.remove_series(id);
                info!(%id, removed, "deleted event");
                report.deleted = Some(id.to_string());
            }
            Err(error) => {
                error!(%id, %error, "failed to delete event");
                report
                    .failures
                    .push(SyncFailure::new(Operation::Delete, Some(id), error));
            }
        }
    }

    /// Expand `template`, falling back to its single occurrence when the rule
    /// cannot be parsed.
    fn expand_or_single(
        &self,
        template: &EventTemplate,
        horizon: &Horizon,
        operation: Operation,
        failures: &mut Vec<SyncFailure>,
    ) -> Vec<EventOccurrence> {
        match recurrence::expand(template, horizon) {
            Ok(occurrences) => occurrences,
            Err(error) => {
                warn!(id = %template.id, %error, "showing single occurrence");
                failures.push(SyncFailure::new(operation, Some(template.id.as_str()), error));
                vec![template.single_occurrence()]
            }
        }
    }
}
