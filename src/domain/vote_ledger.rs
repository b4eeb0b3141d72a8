//! Per-poll vote ledger: dedupe set plus option counts.
//!
//! The ledger remembers *who* voted (to reject second votes) and *how many*
//! votes each option received, but never which participant chose which
//! option. A [`Tally`] snapshot is the only data it exposes.

use std::collections::HashSet;

use serde::Serialize;
use serde::ser::SerializeMap;

use super::ParticipantId;
use crate::error::EngineError;

/// Ordered option → count snapshot of a poll's votes.
///
/// Serializes as a JSON object whose keys keep the poll's option order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tally(Vec<(String, u64)>);

impl Tally {
    /// Returns the count for `option`, or `None` if it is not an option.
    #[must_use]
    pub fn get(&self, option: &str) -> Option<u64> {
        self.0
            .iter()
            .find(|(name, _)| name == option)
            .map(|(_, count)| *count)
    }

    /// Sum of all counts.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.iter().map(|(_, count)| count).sum()
    }

    /// Iterates `(option, count)` pairs in option order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(name, count)| (name.as_str(), *count))
    }
}

impl Serialize for Tally {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (option, count) in &self.0 {
            map.serialize_entry(option, count)?;
        }
        map.end()
    }
}

/// Vote ledger for a single poll.
///
/// `record` performs the dedupe check and the increment in one `&mut self`
/// call; the owning room lock linearizes concurrent callers.
#[derive(Debug)]
pub struct VoteLedger {
    options: Vec<String>,
    counts: Vec<u64>,
    voters: HashSet<ParticipantId>,
    sealed: bool,
}

impl VoteLedger {
    /// Creates an empty ledger for the given (already validated) options.
    #[must_use]
    pub fn new(options: &[String]) -> Self {
        Self {
            options: options.to_vec(),
            counts: vec![0; options.len()],
            voters: HashSet::new(),
            sealed: false,
        }
    }

    /// Records one vote for `option` by `participant_id`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::AlreadyVoted`] if the participant already has an entry.
    /// - [`EngineError::InvalidOption`] if `option` is not one of the options.
    /// - [`EngineError::Internal`] if the ledger has been sealed; callers
    ///   check the poll state first so this indicates a logic error.
    pub fn record(&mut self, participant_id: ParticipantId, option: &str) -> Result<Tally, EngineError> {
        if self.sealed {
            return Err(EngineError::Internal("vote ledger is sealed".to_string()));
        }
        let Some(slot) = self.options.iter().position(|o| o == option) else {
            return Err(EngineError::InvalidOption(option.to_string()));
        };
        if self.voters.contains(&participant_id) {
            return Err(EngineError::AlreadyVoted);
        }
        let Some(count) = self.counts.get_mut(slot) else {
            return Err(EngineError::Internal("tally slot out of range".to_string()));
        };
        *count = count.saturating_add(1);
        self.voters.insert(participant_id);
        Ok(self.tally())
    }

    /// Returns `true` if `participant_id` has voted on this poll.
    #[must_use]
    #[cfg(test)]
    pub fn has_voted(&self, participant_id: ParticipantId) -> bool {
        self.voters.contains(&participant_id)
    }

    /// Freezes the ledger; later `record` calls fail.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Returns `true` once the ledger has been sealed.
    #[must_use]
    #[cfg(test)]
    pub const fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Number of distinct participants that voted.
    #[must_use]
    pub fn voter_count(&self) -> usize {
        self.voters.len()
    }

    /// Snapshot of the current counts in option order.
    #[must_use]
    pub fn tally(&self) -> Tally {
        Tally(
            self.options
                .iter()
                .cloned()
                .zip(self.counts.iter().copied())
                .collect(),
        )
    }
}
