//! Router data store
//!
//! A fixed number of [`RouterRecord`] slots, one per source that may be
//! tracked at the same time, plus the last audio source that was routed.
//! Slots are reused in place and never compacted; scan order is slot order.

use std::slice;

use audio_sources::AudioSource;
use serde::{Deserialize, Serialize};

use crate::state::RouterRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterData {
    records: Vec<RouterRecord>,
    /// Audio source most recently connected to the chain
    pub last_routed_audio_source: AudioSource,
}

impl RouterData {
    /// Create a store with `capacity` free slots
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: vec![RouterRecord::default(); capacity],
            last_routed_audio_source: AudioSource::NONE,
        }
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    /// Slots in scan order
    pub fn iter(&self) -> slice::Iter<'_, RouterRecord> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> slice::IterMut<'_, RouterRecord> {
        self.records.iter_mut()
    }

    pub fn records(&self) -> &[RouterRecord] {
        &self.records
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut RouterRecord> {
        self.records.get_mut(index)
    }

    /// Free every slot and forget the last routed source
    pub fn reset(&mut self) {
        self.records.iter_mut().for_each(RouterRecord::clear);
        self.last_routed_audio_source = AudioSource::NONE;
    }
}

impl<'a> IntoIterator for &'a RouterData {
    type Item = &'a RouterRecord;
    type IntoIter = slice::Iter<'a, RouterRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
