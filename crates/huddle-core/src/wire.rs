//! Layer 5: raw participant update records.
//!
//! This is the already-decoded, untrusted shape delivered by the update
//! substrate; byte-level decoding is an external collaborator. Sanitization
//! into a [`Participant`](crate::participant::Participant) lives in the
//! `participant` module.

use serde::{Deserialize, Serialize};

/// One raw update for a single participant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireParticipantUpdate {
    pub user_id: i64,
    pub audio_source: i32,
    /// Muted for all call members.
    pub is_muted: bool,
    /// The participant may lift the mute themselves.
    pub can_self_unmute: bool,
    /// Muted only for the receiving viewer.
    pub is_muted_by_you: bool,
    /// Absent when the record carries no volume information.
    pub volume_level: Option<i32>,
    /// The volume was last set by an admin, not by the participant.
    pub is_volume_by_admin: bool,
    /// Unix time the participant joined. Meaningless when `has_left`.
    pub joined_at: i64,
    /// Unix time of last activity, when the record carries one.
    pub active_at: Option<i64>,
    pub is_just_joined: bool,
    pub has_left: bool,
    /// Explicitly tagged as carrying a call state version.
    pub is_versioned: bool,
    /// Minimal placeholder record: only identity and the coarse
    /// mute-for-all signal are guaranteed accurate.
    pub is_min: bool,
}

impl WireParticipantUpdate {
    /// An ordering-sensitive update must be applied only when known to be
    /// newer than the currently held state (by the sequence number carried
    /// at the collaborator boundary). Anything else — speaking indicators,
    /// volume-only records — may be applied unconditionally and
    /// idempotently.
    pub fn is_ordering_sensitive(&self) -> bool {
        self.is_just_joined || self.has_left || self.is_versioned
    }
}
