//! Reference-counted, request-coalescing texture cache.
//!
//! Each url owns at most one entry. Concurrent acquires of the same url share
//! the entry (and so one underlying load and one final texture). Loads are
//! started from a FIFO queue with a bounded number in flight and advanced by
//! [`TextureCache::pump`], which the frame loop calls once per frame.

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// Handle returned by [`TextureCache::acquire`]; matched against completions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureTicket(u64);

/// Sampling options forwarded to the source when a load starts.
///
/// Options of the first acquire win for the lifetime of the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureOptions {
    pub srgb: bool,
    pub repeat: bool,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            srgb: true,
            repeat: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextureLoadError {
    #[error("failed to load texture {url}: {reason}")]
    Failed { url: String, reason: String },
}

/// Result of polling an in-flight load.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadPoll<T> {
    Pending,
    Ready(T),
    Failed(String),
}

/// Underlying image-loading primitive the cache coordinates.
pub trait TextureSource {
    type Texture: Clone;
    type Pending;

    fn begin(&mut self, url: &str, options: &TextureOptions) -> Self::Pending;
    fn poll(&mut self, pending: &Self::Pending) -> LoadPoll<Self::Texture>;
    fn dispose(&mut self, texture: Self::Texture);
}

/// Snapshot reported to loading indicators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingStats {
    pub pending: usize,
    pub in_flight: usize,
    pub queued: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Other consumers still hold the texture.
    Retained { refcount: u32 },
    /// Refcount crossed zero and the texture was freed.
    Disposed,
    /// Refcount crossed zero before the load finished; the result stays cached.
    Idle,
    /// Nothing to release for this url.
    NotHeld,
}

#[derive(Debug, Clone)]
pub struct TextureCompletion<T> {
    pub ticket: TextureTicket,
    pub url: String,
    pub result: Result<T, TextureLoadError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type StatsSubscriber = Box<dyn FnMut(LoadingStats) + Send + Sync>;

enum EntryState<T, P> {
    Queued,
    Loading(P),
    Ready(T),
}

struct Entry<T, P> {
    state: EntryState<T, P>,
    refcount: u32,
    options: TextureOptions,
    waiters: Vec<TextureTicket>,
}

pub struct TextureCache<T, P> {
    entries: HashMap<String, Entry<T, P>>,
    queue: VecDeque<String>,
    /// Live tickets and the url each one holds a reference to.
    holders: HashMap<TextureTicket, String>,
    max_in_flight: usize,
    next_ticket: u64,
    immediate: Vec<TextureCompletion<T>>,
    subscribers: Vec<(SubscriptionId, StatsSubscriber)>,
    next_subscription: u64,
    last_stats: LoadingStats,
}

impl<T: Clone, P> TextureCache<T, P> {
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            entries: HashMap::new(),
            queue: VecDeque::new(),
            holders: HashMap::new(),
            max_in_flight: max_in_flight.max(1),
            next_ticket: 0,
            immediate: Vec::new(),
            subscribers: Vec::new(),
            next_subscription: 0,
            last_stats: LoadingStats::default(),
        }
    }

    /// Register interest in `url`. The ticket resolves on a later [`pump`](Self::pump).
    pub fn acquire(&mut self, url: &str, options: TextureOptions) -> TextureTicket {
        let ticket = TextureTicket(self.next_ticket);
        self.next_ticket += 1;
        self.holders.insert(ticket, url.to_string());

        match self.entries.get_mut(url) {
            Some(entry) => {
                entry.refcount += 1;
                match &entry.state {
                    EntryState::Ready(texture) => self.immediate.push(TextureCompletion {
                        ticket,
                        url: url.to_string(),
                        result: Ok(texture.clone()),
                    }),
                    EntryState::Queued | EntryState::Loading(_) => entry.waiters.push(ticket),
                }
            }
            None => {
                self.entries.insert(
                    url.to_string(),
                    Entry {
                        state: EntryState::Queued,
                        refcount: 1,
                        options,
                        waiters: vec![ticket],
                    },
                );
                self.queue.push_back(url.to_string());
            }
        }

        self.notify_if_changed();
        ticket
    }

    /// Drop one reference to `url`, freeing the texture when the count reaches zero.
    pub fn release<S>(&mut self, url: &str, source: &mut S) -> ReleaseOutcome
    where
        S: TextureSource<Texture = T, Pending = P>,
    {
        let Some(ticket) = self
            .holders
            .iter()
            .find(|(_, held)| held.as_str() == url)
            .map(|(ticket, _)| *ticket)
        else {
            return ReleaseOutcome::NotHeld;
        };
        self.release_ticket(ticket, source)
    }

    /// Drop the reference taken by `ticket`.
    ///
    /// A ticket whose load failed holds nothing, so releasing it never touches a
    /// later entry for the same url.
    pub fn release_ticket<S>(&mut self, ticket: TextureTicket, source: &mut S) -> ReleaseOutcome
    where
        S: TextureSource<Texture = T, Pending = P>,
    {
        let Some(url) = self.holders.remove(&ticket) else {
            return ReleaseOutcome::NotHeld;
        };
        self.release_entry(&url, source)
    }

    fn release_entry<S>(&mut self, url: &str, source: &mut S) -> ReleaseOutcome
    where
        S: TextureSource<Texture = T, Pending = P>,
    {
        let Some(entry) = self.entries.get_mut(url) else {
            return ReleaseOutcome::NotHeld;
        };
        if entry.refcount == 0 {
            return ReleaseOutcome::NotHeld;
        }

        entry.refcount -= 1;
        if entry.refcount > 0 {
            return ReleaseOutcome::Retained {
                refcount: entry.refcount,
            };
        }

        if !matches!(entry.state, EntryState::Ready(_)) {
            return ReleaseOutcome::Idle;
        }

        match self.entries.remove(url).map(|entry| entry.state) {
            Some(EntryState::Ready(texture)) => {
                source.dispose(texture);
                self.notify_if_changed();
                ReleaseOutcome::Disposed
            }
            _ => ReleaseOutcome::NotHeld,
        }
    }

    /// Start queued loads, poll in-flight ones and collect resolved tickets.
    pub fn pump<S>(&mut self, source: &mut S) -> Vec<TextureCompletion<T>>
    where
        S: TextureSource<Texture = T, Pending = P>,
    {
        let mut completions = std::mem::take(&mut self.immediate);

        self.start_queued(source);

        let loading: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| matches!(entry.state, EntryState::Loading(_)))
            .map(|(url, _)| url.clone())
            .collect();

        for url in loading {
            let poll = match self.entries.get(&url).map(|entry| &entry.state) {
                Some(EntryState::Loading(pending)) => source.poll(pending),
                _ => continue,
            };

            match poll {
                LoadPoll::Pending => {}
                LoadPoll::Ready(texture) => {
                    if let Some(entry) = self.entries.get_mut(&url) {
                        for ticket in entry.waiters.drain(..) {
                            completions.push(TextureCompletion {
                                ticket,
                                url: url.clone(),
                                result: Ok(texture.clone()),
                            });
                        }
                        entry.state = EntryState::Ready(texture);
                    }
                }
                LoadPoll::Failed(reason) => {
                    if let Some(entry) = self.entries.remove(&url) {
                        self.holders.retain(|_, held| *held != url);
                        let error = TextureLoadError::Failed {
                            url: url.clone(),
                            reason,
                        };
                        for ticket in entry.waiters {
                            completions.push(TextureCompletion {
                                ticket,
                                url: url.clone(),
                                result: Err(error.clone()),
                            });
                        }
                    }
                }
            }
        }

        // Slots freed above can be refilled without waiting a frame.
        self.start_queued(source);
        self.notify_if_changed();
        completions
    }

    fn start_queued<S>(&mut self, source: &mut S)
    where
        S: TextureSource<Texture = T, Pending = P>,
    {
        while self.count_loading() < self.max_in_flight {
            let Some(url) = self.queue.pop_front() else {
                break;
            };
            let Some(entry) = self.entries.get_mut(&url) else {
                continue;
            };
            if !matches!(entry.state, EntryState::Queued) {
                continue;
            }
            entry.state = EntryState::Loading(source.begin(&url, &entry.options));
        }
    }

    fn count_loading(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| matches!(entry.state, EntryState::Loading(_)))
            .count()
    }

    pub fn get(&self, url: &str) -> Option<&T> {
        match self.entries.get(url).map(|entry| &entry.state) {
            Some(EntryState::Ready(texture)) => Some(texture),
            _ => None,
        }
    }

    pub fn refcount(&self, url: &str) -> u32 {
        self.entries.get(url).map_or(0, |entry| entry.refcount)
    }

    pub fn stats(&self) -> LoadingStats {
        let in_flight = self.count_loading();
        let queued = self
            .entries
            .values()
            .filter(|entry| matches!(entry.state, EntryState::Queued))
            .count();
        LoadingStats {
            pending: in_flight + queued,
            in_flight,
            queued,
        }
    }

    /// Call `callback` with fresh stats whenever they change.
    pub fn subscribe(
        &mut self,
        callback: impl FnMut(LoadingStats) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        before != self.subscribers.len()
    }

    fn notify_if_changed(&mut self) {
        let stats = self.stats();
        if stats == self.last_stats {
            return;
        }
        self.last_stats = stats;
        for (_, subscriber) in &mut self.subscribers {
            subscriber(stats);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeSource {
        begun: Vec<String>,
        ready: HashSet<String>,
        failing: HashSet<String>,
        textures: HashMap<String, Arc<String>>,
        disposed: Vec<Arc<String>>,
    }

    impl FakeSource {
        fn finish(&mut self, url: &str) {
            self.ready.insert(url.to_string());
        }
    }

    impl TextureSource for FakeSource {
        type Texture = Arc<String>;
        type Pending = String;

        fn begin(&mut self, url: &str, _options: &TextureOptions) -> String {
            self.begun.push(url.to_string());
            url.to_string()
        }

        fn poll(&mut self, pending: &String) -> LoadPoll<Arc<String>> {
            if self.failing.contains(pending) {
                return LoadPoll::Failed("404".into());
            }
            if !self.ready.contains(pending) {
                return LoadPoll::Pending;
            }
            let texture = self
                .textures
                .entry(pending.clone())
                .or_insert_with(|| Arc::new(pending.clone()))
                .clone();
            LoadPoll::Ready(texture)
        }

        fn dispose(&mut self, texture: Arc<String>) {
            self.disposed.push(texture);
        }
    }

    fn cache() -> TextureCache<Arc<String>, String> {
        TextureCache::new(2)
    }

    #[test]
    fn concurrent_acquires_share_one_load_and_one_texture() {
        let mut cache = cache();
        let mut source = FakeSource::default();

        let first = cache.acquire("textures/desk.jpg", TextureOptions::default());
        let second = cache.acquire("textures/desk.jpg", TextureOptions::default());
        assert!(cache.pump(&mut source).is_empty());

        source.finish("textures/desk.jpg");
        let done = cache.pump(&mut source);

        assert_eq!(source.begun, vec!["textures/desk.jpg".to_string()]);
        assert_eq!(done.len(), 2);
        let a = done.iter().find(|c| c.ticket == first).unwrap();
        let b = done.iter().find(|c| c.ticket == second).unwrap();
        assert!(Arc::ptr_eq(
            a.result.as_ref().unwrap(),
            b.result.as_ref().unwrap()
        ));
    }

    #[test]
    fn acquiring_a_ready_texture_resolves_on_next_pump() {
        let mut cache = cache();
        let mut source = FakeSource::default();
        source.finish("a.jpg");
        cache.acquire("a.jpg", TextureOptions::default());
        cache.pump(&mut source);

        let late = cache.acquire("a.jpg", TextureOptions::default());
        let done = cache.pump(&mut source);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].ticket, late);
        assert_eq!(source.begun.len(), 1);
    }

    #[test]
    fn balanced_acquire_release_disposes_exactly_once() {
        let mut cache = cache();
        let mut source = FakeSource::default();
        source.finish("a.jpg");

        for _ in 0..3 {
            cache.acquire("a.jpg", TextureOptions::default());
        }
        cache.pump(&mut source);

        assert_eq!(
            cache.release("a.jpg", &mut source),
            ReleaseOutcome::Retained { refcount: 2 }
        );
        assert_eq!(
            cache.release("a.jpg", &mut source),
            ReleaseOutcome::Retained { refcount: 1 }
        );
        assert_eq!(cache.release("a.jpg", &mut source), ReleaseOutcome::Disposed);
        assert_eq!(cache.release("a.jpg", &mut source), ReleaseOutcome::NotHeld);
        assert_eq!(cache.release("a.jpg", &mut source), ReleaseOutcome::NotHeld);

        assert_eq!(source.disposed.len(), 1);
        assert_eq!(cache.refcount("a.jpg"), 0);
        assert!(cache.get("a.jpg").is_none());
    }

    #[test]
    fn released_in_flight_load_still_populates_cache() {
        let mut cache = cache();
        let mut source = FakeSource::default();

        cache.acquire("a.jpg", TextureOptions::default());
        cache.pump(&mut source);
        assert_eq!(cache.release("a.jpg", &mut source), ReleaseOutcome::Idle);

        source.finish("a.jpg");
        cache.pump(&mut source);
        assert!(cache.get("a.jpg").is_some());
        assert!(source.disposed.is_empty());

        cache.acquire("a.jpg", TextureOptions::default());
        assert_eq!(cache.release("a.jpg", &mut source), ReleaseOutcome::Disposed);
        assert_eq!(source.disposed.len(), 1);
        assert_eq!(source.begun.len(), 1);
    }

    #[test]
    fn failure_rejects_every_waiter_and_forgets_the_entry() {
        let mut cache = cache();
        let mut source = FakeSource::default();
        source.failing.insert("missing.jpg".into());

        cache.acquire("missing.jpg", TextureOptions::default());
        cache.acquire("missing.jpg", TextureOptions::default());
        let done = cache.pump(&mut source);

        assert_eq!(done.len(), 2);
        assert!(done.iter().all(|c| matches!(
            &c.result,
            Err(TextureLoadError::Failed { url, .. }) if url == "missing.jpg"
        )));
        assert_eq!(cache.refcount("missing.jpg"), 0);
        assert_eq!(
            cache.release("missing.jpg", &mut source),
            ReleaseOutcome::NotHeld
        );

        // No retry from the cache itself; a fresh acquire starts a new load.
        source.failing.clear();
        cache.acquire("missing.jpg", TextureOptions::default());
        cache.pump(&mut source);
        assert_eq!(source.begun.len(), 2);
    }

    #[test]
    fn failed_ticket_cannot_release_a_later_load() {
        let mut cache = cache();
        let mut source = FakeSource::default();
        source.failing.insert("a.jpg".into());

        let failed = cache.acquire("a.jpg", TextureOptions::default());
        cache.pump(&mut source);

        source.failing.clear();
        source.finish("a.jpg");
        let live = cache.acquire("a.jpg", TextureOptions::default());
        let done = cache.pump(&mut source);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].ticket, live);

        assert_eq!(
            cache.release_ticket(failed, &mut source),
            ReleaseOutcome::NotHeld
        );
        assert!(source.disposed.is_empty());
        assert_eq!(cache.refcount("a.jpg"), 1);
        assert!(cache.get("a.jpg").is_some());

        assert_eq!(cache.release_ticket(live, &mut source), ReleaseOutcome::Disposed);
        assert_eq!(cache.release_ticket(live, &mut source), ReleaseOutcome::NotHeld);
        assert_eq!(source.disposed.len(), 1);
    }

    #[test]
    fn at_most_two_loads_in_flight() {
        let mut cache = cache();
        let mut source = FakeSource::default();

        for url in ["a.jpg", "b.jpg", "c.jpg", "d.jpg"] {
            cache.acquire(url, TextureOptions::default());
        }
        cache.pump(&mut source);
        assert_eq!(source.begun, vec!["a.jpg".to_string(), "b.jpg".to_string()]);
        assert_eq!(
            cache.stats(),
            LoadingStats {
                pending: 4,
                in_flight: 2,
                queued: 2
            }
        );

        source.finish("a.jpg");
        cache.pump(&mut source);
        assert_eq!(source.begun.len(), 3);
        assert_eq!(cache.stats().in_flight, 2);
        assert_eq!(cache.stats().queued, 1);
    }

    #[test]
    fn subscribers_see_stat_changes() {
        let mut cache = cache();
        let mut source = FakeSource::default();
        let seen: Arc<Mutex<Vec<LoadingStats>>> = Arc::default();
        let sink = seen.clone();
        let id = cache.subscribe(move |stats| {
            if let Ok(mut seen) = sink.lock() {
                seen.push(stats);
            }
        });

        cache.acquire("a.jpg", TextureOptions::default());
        cache.pump(&mut source);
        source.finish("a.jpg");
        cache.pump(&mut source);

        let observed = seen.lock().unwrap().clone();
        assert_eq!(observed.first().map(|s| s.queued), Some(1));
        assert_eq!(observed.last(), Some(&LoadingStats::default()));

        assert!(cache.unsubscribe(id));
        assert!(!cache.unsubscribe(id));
    }
}
