//! Single-entity view of the router data store
//!
//! All lookups are linear scans in slot order. A record only counts as
//! tracking its source while it is present or active; a record that was
//! removed and has settled is a free slot even though it still names the
//! source.

use audio_sources::GenericSource;
use tracing::{debug, trace, warn};

use crate::data::RouterData;
use crate::state::{RouterRecord, RouterState};

impl RouterData {
    fn position(&self, source: GenericSource) -> Option<usize> {
        self.iter()
            .position(|record| record.is_in_use() && record.source == source)
    }

    fn find_source(&self, source: GenericSource) -> Option<&RouterRecord> {
        let record = self.position(source).map(|i| &self.records()[i]);
        if let Some(record) = record {
            trace!(
                "find_source {} present {} active {}",
                source,
                record.present,
                record.state.is_active()
            );
        }
        record
    }

    fn find_first(&self, matches: impl Fn(&RouterRecord) -> bool) -> Option<GenericSource> {
        self.iter().find(|&r| matches(r)).map(|r| r.source)
    }

    /// Start tracking a source.
    ///
    /// Adding a source that is already tracked succeeds without touching its
    /// record. Returns `false` only when every slot is in use.
    pub fn add_source(&mut self, source: GenericSource) -> bool {
        if self.find_source(source).is_some() {
            debug!("add_source {} already tracked", source);
            return true;
        }
        match self.iter_mut().find(|r| !r.is_in_use()) {
            Some(slot) => {
                *slot = RouterRecord::new(source);
                true
            }
            None => {
                warn!("add_source {} no free slot", source);
                false
            }
        }
    }

    /// Mark a source as no longer wanted.
    ///
    /// Refused for sources that are not present, and for interrupted sources,
    /// which stay tracked until the policy resumes or disconnects them.
    pub fn remove_source(&mut self, source: GenericSource) -> bool {
        let removable = self.position(source).filter(|&i| {
            let record = &self.records()[i];
            record.present
                && !matches!(
                    record.state,
                    RouterState::Interrupted | RouterState::ToBeInterrupted
                )
        });

        match removable {
            Some(i) => {
                if let Some(record) = self.get_mut(i) {
                    record.present = false;
                }
                debug!("remove_source {} removed", source);
                true
            }
            None => {
                debug!("remove_source {} ignored", source);
                false
            }
        }
    }

    pub fn is_source_present(&self, source: GenericSource) -> bool {
        self.find_source(source).is_some_and(|r| r.present)
    }

    /// Set the state of a tracked source. Returns the previous state, or
    /// `None` if the source is not tracked.
    pub fn set_source_state(
        &mut self,
        source: GenericSource,
        state: RouterState,
    ) -> Option<RouterState> {
        let i = self.position(source)?;
        let record = self.get_mut(i)?;
        let previous = record.state;
        record.state = state;
        Some(previous)
    }

    /// State of a tracked source, `Invalid` if it is not tracked
    pub fn source_state(&self, source: GenericSource) -> RouterState {
        self.find_source(source)
            .map(|r| r.state)
            .unwrap_or(RouterState::Invalid)
    }

    pub fn is_source_active(&self, source: GenericSource) -> bool {
        self.find_source(source).is_some_and(|r| r.state.is_active())
    }

    /// The first source holding the chain
    pub fn active_source(&self) -> Option<GenericSource> {
        self.find_first(|r| r.state.is_active())
    }

    /// The first source part-way through a transition
    pub fn transient_source(&self) -> Option<GenericSource> {
        self.find_first(|r| r.state.is_transient())
    }

    /// The last present source parked in `Interrupted`
    pub fn interrupted_source(&self) -> Option<GenericSource> {
        self.iter()
            .rev()
            .find(|r| r.present && r.state == RouterState::Interrupted)
            .map(|r| r.source)
    }

    /// The focused source, if it is tracked and present
    pub fn source_to_route(&self, focused: Option<GenericSource>) -> Option<GenericSource> {
        focused.filter(|&source| self.is_source_present(source))
    }

    /// The first source added but never chosen or settled
    pub fn new_source(&self) -> Option<GenericSource> {
        self.find_first(RouterRecord::is_new)
    }

    /// Number of slots tracking `source`
    pub fn count_tracked(&self, source: GenericSource) -> usize {
        self.iter()
            .filter(|r| r.is_in_use() && r.source == source)
            .count()
    }
}
