//! Layer 7: the roster owner.
//!
//! Holds the authoritative participant map and implements the caller side
//! of the per-participant contract: ordering-sensitive updates are gated on
//! a server version, optimistic requests are tagged with fencing
//! generations, and stale acknowledgments are discarded without reverting a
//! newer pending overlay.
//!
//! Runs synchronously inside its single logical owner; no locking, no
//! blocking, every operation is an immediate in-memory transformation.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::domain::{is_valid_volume_level, RoleContext, MAX_VOLUME_LEVEL, MIN_VOLUME_LEVEL};
use crate::error::CoreError;
use crate::identity::UserId;
use crate::participant::{Participant, ParticipantSnapshot};
use crate::pending::Generation;
use crate::wire::WireParticipantUpdate;

/// Server-assigned call state version carried alongside ordering-sensitive
/// updates at the collaborator boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerVersion(pub i32);

/// Role inputs for permission recomputation, supplied by the external
/// permission authority.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallAuthority {
    pub self_user_id: UserId,
    /// The viewer has moderation rights over this call.
    pub can_manage: bool,
    /// Participants with elevated standing in the call.
    pub admins: BTreeSet<UserId>,
}

impl CallAuthority {
    pub fn role_for(&self, user_id: UserId) -> RoleContext {
        RoleContext {
            can_manage: self.can_manage,
            is_self: user_id == self.self_user_id,
            is_admin: self.admins.contains(&user_id),
        }
    }
}

#[derive(Debug, Error)]
pub enum RosterError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("unknown participant {0}")]
    UnknownParticipant(UserId),
    #[error("ordering-sensitive update is missing a server version")]
    MissingVersion,
    #[error("volume level {level} out of range {min}..={max}")]
    VolumeOutOfRange { level: i32, min: i32, max: i32 },
}

/// What applying one update did to the roster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Ordering-sensitive update older than what is already applied;
    /// nothing was mutated.
    Stale,
    /// A left record for a participant that was never tracked.
    Noop,
    /// The participant left and was evicted.
    Left { user_id: UserId },
    /// Entity inserted or merged. `changed` is the observer signal, derived
    /// from effective-state equality.
    Updated { user_id: UserId, changed: bool },
}

/// Outcome of an optimistic local request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Request recorded; the outgoing server request must carry this token
    /// so its eventual acknowledgment can be matched.
    Issued(Generation),
    /// Ordinary denial: the action is not currently permitted.
    NotPermitted,
}

/// The locally displayed participant roster of one group call.
#[derive(Clone, Debug, Default)]
pub struct CallRoster {
    participants: BTreeMap<UserId, Participant>,
    applied_version: Option<ServerVersion>,
}

impl CallRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: UserId) -> Option<&Participant> {
        self.participants.get(&user_id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    pub fn applied_version(&self) -> Option<ServerVersion> {
        self.applied_version
    }

    /// Presentation objects for every valid participant, in key order.
    pub fn snapshots(&self) -> Vec<ParticipantSnapshot> {
        self.participants
            .values()
            .filter_map(Participant::to_snapshot)
            .collect()
    }

    /// Fold one raw update into the roster.
    ///
    /// Ordering-sensitive records require `version` and are dropped as
    /// [`ApplyOutcome::Stale`] when older than the last applied version;
    /// records at the same version belong to the same batch and are
    /// applied. Everything else applies unconditionally.
    pub fn apply_update(
        &mut self,
        raw: &WireParticipantUpdate,
        version: Option<ServerVersion>,
        authority: &CallAuthority,
    ) -> Result<ApplyOutcome, RosterError> {
        let user_id = UserId::new(raw.user_id).validate()?;

        if raw.is_ordering_sensitive() {
            let version = version.ok_or(RosterError::MissingVersion)?;
            if self.applied_version.is_some_and(|applied| version < applied) {
                tracing::debug!(
                    user_id = %user_id,
                    version = version.0,
                    "dropping stale ordering-sensitive update"
                );
                return Ok(ApplyOutcome::Stale);
            }
            self.applied_version = Some(version);
        }

        if raw.has_left {
            return Ok(match self.participants.remove(&user_id) {
                Some(_) => ApplyOutcome::Left { user_id },
                None => ApplyOutcome::Noop,
            });
        }

        let mut incoming = Participant::from_wire(raw);
        let role = authority.role_for(user_id);
        let changed = match self.participants.get(&user_id) {
            Some(old) if !old.is_min() => {
                incoming.update_from(old);
                incoming.update_permissions(role);
                incoming != *old
            }
            Some(placeholder) => {
                // A still-minimal stored entry carries nothing trustworthy
                // to merge from; replace it wholesale.
                incoming.update_permissions(role);
                incoming != *placeholder
            }
            None => {
                incoming.update_permissions(role);
                true
            }
        };
        self.participants.insert(user_id, incoming);
        Ok(ApplyOutcome::Updated { user_id, changed })
    }

    /// Issue an optimistic mute/unmute request for a tracked participant.
    ///
    /// Increments the mute-aspect generation and records the pending
    /// overlay when the permission machine allows the direction.
    pub fn request_mute(
        &mut self,
        user_id: UserId,
        muted: bool,
        authority: &CallAuthority,
    ) -> Result<RequestOutcome, RosterError> {
        let role = authority.role_for(user_id);
        let participant = self
            .participants
            .get_mut(&user_id)
            .ok_or(RosterError::UnknownParticipant(user_id))?;
        let generation = participant.next_mute_generation();
        if participant.set_pending_mute(muted, role, generation) {
            Ok(RequestOutcome::Issued(generation))
        } else {
            Ok(RequestOutcome::NotPermitted)
        }
    }

    /// Issue an optimistic volume change for a tracked participant.
    pub fn request_volume(
        &mut self,
        user_id: UserId,
        level: i32,
    ) -> Result<RequestOutcome, RosterError> {
        if !is_valid_volume_level(level) {
            return Err(RosterError::VolumeOutOfRange {
                level,
                min: MIN_VOLUME_LEVEL,
                max: MAX_VOLUME_LEVEL,
            });
        }
        let participant = self
            .participants
            .get_mut(&user_id)
            .ok_or(RosterError::UnknownParticipant(user_id))?;
        let generation = participant.next_volume_generation();
        participant.set_pending_volume(level, generation);
        Ok(RequestOutcome::Issued(generation))
    }

    /// Clear the pending mute overlay when `generation` matches the latest
    /// issued request. A stale acknowledgment (a superseded request) is
    /// discarded so the newer overlay survives. Returns whether the overlay
    /// was cleared.
    pub fn acknowledge_mute(
        &mut self,
        user_id: UserId,
        generation: Generation,
        authority: &CallAuthority,
    ) -> bool {
        let role = authority.role_for(user_id);
        let Some(participant) = self.participants.get_mut(&user_id) else {
            return false;
        };
        match participant.pending_mute_generation() {
            Some(pending) if pending == generation => {
                participant.clear_pending_mute();
                participant.update_permissions(role);
                true
            }
            Some(pending) => {
                tracing::debug!(
                    user_id = %user_id,
                    acknowledged = %generation,
                    pending = %pending,
                    "discarding stale mute acknowledgment"
                );
                false
            }
            None => false,
        }
    }

    /// Volume counterpart of [`CallRoster::acknowledge_mute`]. Volume does
    /// not feed the permission machine, so no role context is needed.
    pub fn acknowledge_volume(&mut self, user_id: UserId, generation: Generation) -> bool {
        let Some(participant) = self.participants.get_mut(&user_id) else {
            return false;
        };
        match participant.pending_volume_generation() {
            Some(pending) if pending == generation => {
                participant.clear_pending_volume();
                true
            }
            Some(pending) => {
                tracing::debug!(
                    user_id = %user_id,
                    acknowledged = %generation,
                    pending = %pending,
                    "discarding stale volume acknowledgment"
                );
                false
            }
            None => false,
        }
    }

    /// Local-only speaking indicator. `at` is the local activity time used
    /// to keep `local_active_at` monotone. Returns whether the externally
    /// visible speaking flag changed.
    pub fn set_speaking(&mut self, user_id: UserId, is_speaking: bool, at: i64) -> bool {
        let Some(participant) = self.participants.get_mut(&user_id) else {
            return false;
        };
        let changed = participant.is_speaking != is_speaking;
        participant.is_speaking = is_speaking;
        if is_speaking && at > participant.local_active_at {
            participant.local_active_at = at;
        }
        changed
    }

    /// Display order, owned by the local client. Returns whether it changed.
    pub fn set_order(&mut self, user_id: UserId, order: i64) -> bool {
        let Some(participant) = self.participants.get_mut(&user_id) else {
            return false;
        };
        let changed = participant.order != order;
        participant.order = order;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(user_id: i64) -> WireParticipantUpdate {
        WireParticipantUpdate {
            user_id,
            audio_source: user_id as i32,
            joined_at: 1_000,
            ..WireParticipantUpdate::default()
        }
    }

    fn manager() -> CallAuthority {
        CallAuthority {
            self_user_id: UserId::new(99),
            can_manage: true,
            admins: BTreeSet::new(),
        }
    }

    #[test]
    fn inserts_and_merges_participants() {
        let mut roster = CallRoster::new();
        let authority = manager();

        let outcome = roster.apply_update(&wire(1), None, &authority).unwrap();
        assert_eq!(
            outcome,
            ApplyOutcome::Updated {
                user_id: UserId::new(1),
                changed: true
            }
        );
        assert_eq!(roster.len(), 1);

        // Re-applying the identical record is reported unchanged.
        let outcome = roster.apply_update(&wire(1), None, &authority).unwrap();
        assert_eq!(
            outcome,
            ApplyOutcome::Updated {
                user_id: UserId::new(1),
                changed: false
            }
        );
    }

    #[test]
    fn rejects_unusable_identity() {
        let mut roster = CallRoster::new();
        let err = roster
            .apply_update(&wire(0), None, &manager())
            .unwrap_err();
        assert!(matches!(err, RosterError::Core(_)));
    }

    #[test]
    fn left_record_evicts() {
        let mut roster = CallRoster::new();
        let authority = manager();
        roster.apply_update(&wire(1), None, &authority).unwrap();

        let left = WireParticipantUpdate {
            has_left: true,
            ..wire(1)
        };
        let outcome = roster
            .apply_update(&left, Some(ServerVersion(2)), &authority)
            .unwrap();
        assert_eq!(
            outcome,
            ApplyOutcome::Left {
                user_id: UserId::new(1)
            }
        );
        assert!(roster.is_empty());

        // A left record for an unknown participant is a no-op.
        let outcome = roster
            .apply_update(&left, Some(ServerVersion(3)), &authority)
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::Noop);
    }

    #[test]
    fn ordering_sensitive_updates_require_a_version() {
        let mut roster = CallRoster::new();
        let joined = WireParticipantUpdate {
            is_just_joined: true,
            ..wire(1)
        };
        let err = roster.apply_update(&joined, None, &manager()).unwrap_err();
        assert!(matches!(err, RosterError::MissingVersion));
    }

    #[test]
    fn stale_versioned_update_mutates_nothing() {
        let mut roster = CallRoster::new();
        let authority = manager();

        let joined = WireParticipantUpdate {
            is_just_joined: true,
            ..wire(1)
        };
        roster
            .apply_update(&joined, Some(ServerVersion(5)), &authority)
            .unwrap();

        let stale_left = WireParticipantUpdate {
            has_left: true,
            ..wire(1)
        };
        let outcome = roster
            .apply_update(&stale_left, Some(ServerVersion(4)), &authority)
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::Stale);
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.applied_version(), Some(ServerVersion(5)));
    }

    #[test]
    fn same_version_batch_is_applied() {
        let mut roster = CallRoster::new();
        let authority = manager();
        let joined = |user_id| WireParticipantUpdate {
            is_just_joined: true,
            ..wire(user_id)
        };
        roster
            .apply_update(&joined(1), Some(ServerVersion(5)), &authority)
            .unwrap();
        roster
            .apply_update(&joined(2), Some(ServerVersion(5)), &authority)
            .unwrap();
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn minimal_placeholder_is_replaced_not_merged() {
        let mut roster = CallRoster::new();
        let authority = manager();

        let minimal = WireParticipantUpdate {
            is_min: true,
            ..wire(1)
        };
        roster.apply_update(&minimal, None, &authority).unwrap();
        assert!(roster.get(UserId::new(1)).unwrap().is_min());

        // The full record replaces the placeholder without a merge.
        roster.apply_update(&wire(1), None, &authority).unwrap();
        assert!(!roster.get(UserId::new(1)).unwrap().is_min());
    }

    #[test]
    fn server_update_carries_pending_overlay_forward() {
        let mut roster = CallRoster::new();
        let authority = manager();
        roster.apply_update(&wire(1), None, &authority).unwrap();

        let issued = roster
            .request_mute(UserId::new(1), true, &authority)
            .unwrap();
        assert!(matches!(issued, RequestOutcome::Issued(_)));

        // An unrelated server update must not discard the in-flight mute.
        let with_volume = WireParticipantUpdate {
            volume_level: Some(6_000),
            ..wire(1)
        };
        roster.apply_update(&with_volume, None, &authority).unwrap();
        let participant = roster.get(UserId::new(1)).unwrap();
        assert!(participant.is_muted_for_all_users());
        assert!(participant.pending_mute_generation().is_some());
    }

    #[test]
    fn request_mute_outcomes() {
        let mut roster = CallRoster::new();
        let authority = manager();
        roster.apply_update(&wire(1), None, &authority).unwrap();

        assert!(matches!(
            roster.request_mute(UserId::new(1), true, &authority),
            Ok(RequestOutcome::Issued(_))
        ));
        // An untracked participant is an error, unlike a permission denial.
        assert!(matches!(
            roster.request_mute(UserId::new(2), true, &authority),
            Err(RosterError::UnknownParticipant(_))
        ));

        // The viewer themselves, admin-muted: muting again is denied, and
        // the denial is an ordinary outcome.
        let self_muted_by_admin = WireParticipantUpdate {
            is_muted: true,
            can_self_unmute: false,
            ..wire(99)
        };
        roster
            .apply_update(&self_muted_by_admin, None, &authority)
            .unwrap();
        assert!(matches!(
            roster.request_mute(UserId::new(99), true, &authority),
            Ok(RequestOutcome::NotPermitted)
        ));
    }

    #[test]
    fn stale_acknowledgment_is_discarded() {
        let mut roster = CallRoster::new();
        let authority = manager();
        roster.apply_update(&wire(1), None, &authority).unwrap();
        let user = UserId::new(1);

        let RequestOutcome::Issued(first) =
            roster.request_mute(user, true, &authority).unwrap()
        else {
            panic!("mute must be permitted");
        };
        let RequestOutcome::Issued(second) =
            roster.request_mute(user, false, &authority).unwrap()
        else {
            panic!("unmute must be permitted");
        };
        assert!(second > first);

        // The acknowledgment of the superseded request changes nothing:
        // the newer overlay (admin mute revoked, control handed back to the
        // participant) stays in place.
        assert!(!roster.acknowledge_mute(user, first, &authority));
        let participant = roster.get(user).unwrap();
        assert!(!participant.is_muted_by_admin());
        assert!(participant.is_muted_by_themselves());
        assert_eq!(participant.pending_mute_generation(), Some(second));

        // Only the latest generation clears the overlay.
        assert!(roster.acknowledge_mute(user, second, &authority));
        assert!(roster
            .get(user)
            .unwrap()
            .pending_mute_generation()
            .is_none());
    }

    #[test]
    fn volume_request_and_acknowledgment() {
        let mut roster = CallRoster::new();
        let authority = manager();
        roster.apply_update(&wire(1), None, &authority).unwrap();
        let user = UserId::new(1);

        assert!(matches!(
            roster.request_volume(user, 0),
            Err(RosterError::VolumeOutOfRange { .. })
        ));

        let RequestOutcome::Issued(generation) = roster.request_volume(user, 5_000).unwrap()
        else {
            panic!("volume request must be issued");
        };
        assert_eq!(roster.get(user).unwrap().effective_volume_level(), 5_000);

        assert!(!roster.acknowledge_volume(user, Generation::ZERO));
        assert!(roster.acknowledge_volume(user, generation));
    }

    #[test]
    fn speaking_updates_are_local_only() {
        let mut roster = CallRoster::new();
        let authority = manager();
        roster.apply_update(&wire(1), None, &authority).unwrap();
        let user = UserId::new(1);

        assert!(roster.set_speaking(user, true, 123));
        assert!(!roster.set_speaking(user, true, 100));
        let participant = roster.get(user).unwrap();
        assert!(participant.is_speaking);
        assert_eq!(participant.local_active_at, 123);

        // Carried across a server update.
        roster.apply_update(&wire(1), None, &authority).unwrap();
        assert!(roster.get(user).unwrap().is_speaking);
    }

    #[test]
    fn snapshots_skip_invalid_participants() {
        let mut roster = CallRoster::new();
        let authority = manager();
        roster.apply_update(&wire(1), None, &authority).unwrap();
        let no_source = WireParticipantUpdate {
            audio_source: 0,
            ..wire(2)
        };
        roster.apply_update(&no_source, None, &authority).unwrap();

        let snapshots = roster.snapshots();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].user_id, UserId::new(1));
    }
}
