//! Aggregated live state of the monitored managers.
//!
//! [`Data`] holds one keyed [`Collection`] per [`Domain`] plus the loop
//! [`Generation`]. It is only reachable through a
//! [`DataOwner`](crate::DataOwner) scope; collections of domains without a
//! live manager simply stay empty.
mod collection;
mod generation;
mod records;
pub use collection::*;
pub use generation::*;
pub use records::*;


#[derive(Debug)]
pub struct Data {
    pub(crate) generation: Generation,

    pub devices: Collection<Device>,
    pub workers: Collection<Worker>,
    pub subjects: Collection<Subject>,
    pub tracks: Collection<Track>,
    pub packages: Collection<Package>,
    pub traces: Collection<Trace>,
    pub reports: Collection<Report>,
    pub replays: Collection<Replay>,
}

impl Data {
    pub(crate) fn new(generation: Generation) -> Self {
        Self {
            generation,
            devices: Collection::new(),
            workers: Collection::new(),
            subjects: Collection::new(),
            tracks: Collection::new(),
            packages: Collection::new(),
            traces: Collection::new(),
            reports: Collection::new(),
            replays: Collection::new(),
        }
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    /// Typed access to a record's home collection.
    pub fn collection<R: Record>(&self) -> &Collection<R> {
        R::collection(self)
    }

    pub fn get<R: Record>(
        &self,
        key: &R::Key,
    ) -> Option<&R> {
        R::collection(self).get(key)
    }

    /// Inserts or replaces `record` by key. Returns `true` on insert.
    pub(crate) fn upsert<R: Record>(
        &mut self,
        record: R,
    ) -> bool {
        R::collection_mut(self).upsert(record)
    }

    pub fn len_of(
        &self,
        domain: Domain,
    ) -> usize {
        match domain {
            Domain::Device => self.devices.len(),
            Domain::Worker => self.workers.len(),
            Domain::Subject => self.subjects.len(),
            Domain::Track => self.tracks.len(),
            Domain::Package => self.packages.len(),
            Domain::Trace => self.traces.len(),
            Domain::Report => self.reports.len(),
            Domain::Replay => self.replays.len(),
        }
    }

    /// Entry count of every domain, in [`Domain::ALL`] order.
    pub fn counts(&self) -> Vec<(Domain, usize)> {
        Domain::ALL
            .iter()
            .map(|domain| (*domain, self.len_of(*domain)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        Domain::ALL.iter().all(|domain| self.len_of(*domain) == 0)
    }
}
