//! The in-memory list of currently displayed occurrences.
//!
//! Only the synchronizer mutates it. Readers take snapshots or subscribe to
//! change notifications.

use tokio::sync::watch;

use crate::event::{EventOccurrence, EventTemplate, OccurrenceKey};

pub struct EventCache {
    occurrences: watch::Sender<Vec<EventOccurrence>>,
}

impl Default for EventCache {
    fn default() -> Self {
        EventCache::new()
    }
}

impl EventCache {
    pub fn new() -> Self {
        let (occurrences, _) = watch::channel(Vec::new());
        EventCache { occurrences }
    }

    /// A copy of the current contents, in display order.
    pub fn snapshot(&self) -> Vec<EventOccurrence> {
        self.occurrences.borrow().clone()
    }

    /// Receive a notification after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<Vec<EventOccurrence>> {
        self.occurrences.subscribe()
    }

    pub fn len(&self) -> usize {
        self.occurrences.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.borrow().is_empty()
    }

    pub fn get(&self, key: &OccurrenceKey) -> Option<EventOccurrence> {
        self.occurrences
            .borrow()
            .iter()
            .find(|o| o.id == key.template_id && o.start == key.start)
            .cloned()
    }

    /// The cached series template for `id`, as held by its first occurrence.
    pub fn series(&self, id: &str) -> Option<EventTemplate> {
        self.occurrences
            .borrow()
            .iter()
            .find(|o| o.id == id)
            .map(|o| o.series.clone())
    }

    pub(crate) fn replace_all(&self, occurrences: Vec<EventOccurrence>) {
        self.occurrences.send_replace(occurrences);
    }

    pub(crate) fn append(&self, occurrences: Vec<EventOccurrence>) {
        self.occurrences
            .send_modify(|cached| cached.extend(occurrences));
    }

    /// Swap every occurrence of series `id` for `occurrences`, at the
    /// position of the first old one.
    pub(crate) fn replace_series(&self, id: &str, occurrences: Vec<EventOccurrence>) {
        self.occurrences.send_modify(|cached| {
            let position = cached.iter().position(|o| o.id == id).unwrap_or(cached.len());
            cached.retain(|o| o.id != id);
            let position = position.min(cached.len());
            cached.splice(position..position, occurrences);
        });
    }

    /// Remove every occurrence of series `id`. Returns how many were removed.
    pub(crate) fn remove_series(&self, id: &str) -> usize {
        let mut removed = 0;
        self.occurrences.send_if_modified(|cached| {
            let before = cached.len();
            cached.retain(|o| o.id != id);
            removed = before - cached.len();
            removed > 0
        });
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn series(id: &str, count: i64) -> Vec<EventOccurrence> {
        let template = EventTemplate {
            id: id.to_string(),
            start: Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap(),
            title: format!("Event {}", id),
            rrule: None,
            exdate: None,
        };
        (0..count)
            .map(|n| template.occurrence_at(template.start + Duration::days(n)))
            .collect()
    }

    fn ids(cache: &EventCache) -> Vec<String> {
        cache.snapshot().into_iter().map(|o| o.id).collect()
    }

    #[test]
    fn test_replace_all_discards_previous_contents() {
        let cache = EventCache::new();
        cache.append(series("a", 2));
        cache.replace_all(series("b", 1));

        assert_eq!(ids(&cache), vec!["b"]);
    }

    #[test]
    fn test_remove_series_removes_every_occurrence() {
        let cache = EventCache::new();
        cache.replace_all([series("a", 3), series("b", 1)].concat());

        assert_eq!(cache.remove_series("a"), 3);
        assert_eq!(ids(&cache), vec!["b"]);
        assert_eq!(cache.remove_series("missing"), 0);
    }

    #[test]
    fn test_replace_series_keeps_position() {
        let cache = EventCache::new();
        cache.replace_all([series("a", 1), series("b", 3), series("c", 1)].concat());

        cache.replace_series("b", series("b", 2));

        assert_eq!(ids(&cache), vec!["a", "b", "b", "c"]);
    }

    #[test]
    fn test_replace_series_appends_unknown_id() {
        let cache = EventCache::new();
        cache.replace_all(series("a", 1));

        cache.replace_series("z", series("z", 1));

        assert_eq!(ids(&cache), vec!["a", "z"]);
    }

    #[test]
    fn test_get_by_occurrence_key() {
        let cache = EventCache::new();
        cache.replace_all(series("a", 3));
        let second = cache.snapshot()[1].key();

        let found = cache.get(&second).expect("Should find second occurrence");
        assert_eq!(found.start, second.start);
        assert!(cache.series("a").is_some());
        assert!(cache.series("nope").is_none());
    }

    #[test]
    fn test_subscribers_are_notified() {
        let cache = EventCache::new();
        let mut rx = cache.subscribe();
        assert!(!rx.has_changed().unwrap());

        cache.append(series("a", 1));

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);
    }
}
