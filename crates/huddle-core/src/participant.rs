//! Layer 6: the Participant entity.
//!
//! Server-authoritative fields sanitized from the wire, local-only fields
//! owned by this client, the optimistic overlay, and the derived permitted
//! action. Equality and the snapshot projection are defined over effective
//! (pending-over-server) state so observers can suppress redundant change
//! notifications.

use serde::{Deserialize, Serialize};

use crate::domain::{
    is_valid_volume_level, MuteAction, MuteState, RoleContext, VOLUME_LEVEL_SENTINEL,
};
use crate::identity::{AudioSourceId, UserId};
use crate::pending::{Generation, Pending};
use crate::permission::allowed_mute_action;
use crate::wire::WireParticipantUpdate;

/// One participant of a group call, as tracked by the local client.
#[derive(Clone, Debug)]
pub struct Participant {
    pub user_id: UserId,
    pub audio_source: AudioSourceId,

    // Server-authoritative: last known server truth.
    server_mute: MuteState,
    volume_level: i32,
    is_volume_level_local: bool,
    joined_at: i64,
    active_at: i64,
    pub is_just_joined: bool,
    is_min: bool,

    // Local-only: never supplied by the wire.
    pub is_speaking: bool,
    pub local_active_at: i64,
    pub order: i64,

    // Optimistic overlay. The issue counters persist across overlay clears
    // so generations never repeat within an aspect.
    pending_mute: Option<Pending<MuteState>>,
    pending_volume: Option<Pending<i32>>,
    mute_generation: Generation,
    volume_generation: Generation,

    // Derived; recomputed via `update_permissions`, never set directly.
    allowed_action: Option<MuteAction>,
}

impl Participant {
    /// Build a sanitized participant from a raw update record.
    ///
    /// Out-of-range and inconsistent fields are clamped with a diagnostic
    /// instead of failing; the pending overlay is always left empty here.
    pub fn from_wire(raw: &WireParticipantUpdate) -> Self {
        let server_mute = MuteState::new(
            raw.can_self_unmute,
            raw.is_muted && !raw.can_self_unmute,
            raw.is_muted_by_you,
        );

        let mut volume_level = 0;
        let mut is_volume_level_local = false;
        if let Some(level) = raw.volume_level {
            if is_valid_volume_level(level) {
                volume_level = level;
                is_volume_level_local = !raw.is_volume_by_admin;
            } else {
                tracing::warn!(
                    user_id = raw.user_id,
                    volume = level,
                    "volume level out of range, degrading to sentinel"
                );
                volume_level = VOLUME_LEVEL_SENTINEL;
            }
        }

        let mut joined_at = 0;
        let mut active_at = 0;
        if !raw.has_left {
            // Left participants carry no timing semantics.
            joined_at = raw.joined_at;
            active_at = raw.active_at.unwrap_or(0);
            if joined_at < 0 || active_at < 0 {
                // A negative value in either field marks the whole record's
                // timing as untrusted.
                tracing::warn!(
                    user_id = raw.user_id,
                    joined_at,
                    active_at,
                    "negative participant timestamps, resetting both"
                );
                joined_at = 0;
                active_at = 0;
            }
        }

        Self {
            user_id: UserId::new(raw.user_id),
            audio_source: AudioSourceId::new(raw.audio_source),
            server_mute,
            volume_level,
            is_volume_level_local,
            joined_at,
            active_at,
            is_just_joined: raw.is_just_joined,
            is_min: raw.is_min,
            is_speaking: false,
            local_active_at: 0,
            order: 0,
            pending_mute: None,
            pending_volume: None,
            mute_generation: Generation::ZERO,
            volume_generation: Generation::ZERO,
            allowed_action: None,
        }
    }

    /// A participant with unusable identity is tracked but never projected.
    pub fn is_valid(&self) -> bool {
        self.user_id.is_valid() && self.audio_source.is_valid()
    }

    /// Still a minimal placeholder: only identity and the coarse
    /// mute-for-all signal are guaranteed accurate.
    pub fn is_min(&self) -> bool {
        self.is_min
    }

    pub fn joined_at(&self) -> i64 {
        self.joined_at
    }

    pub fn active_at(&self) -> i64 {
        self.active_at
    }

    /// The effective mute flags: the pending overlay when present, else the
    /// server-authoritative state.
    pub fn effective_mute(&self) -> MuteState {
        self.pending_mute.map_or(self.server_mute, |p| p.value)
    }

    pub fn is_muted_by_themselves(&self) -> bool {
        self.effective_mute().by_themselves
    }

    pub fn is_muted_by_admin(&self) -> bool {
        self.effective_mute().by_admin
    }

    pub fn is_muted_locally(&self) -> bool {
        self.effective_mute().locally
    }

    pub fn is_muted_for_all_users(&self) -> bool {
        self.effective_mute().for_all_users()
    }

    /// The effective volume: the pending overlay when present, else the
    /// server reading (sentinel when the server reading was untrusted).
    pub fn effective_volume_level(&self) -> i32 {
        self.pending_volume.map_or(self.volume_level, |p| p.value)
    }

    pub fn allowed_action(&self) -> Option<MuteAction> {
        self.allowed_action
    }

    pub fn pending_mute_generation(&self) -> Option<Generation> {
        self.pending_mute.map(|p| p.generation)
    }

    pub fn pending_volume_generation(&self) -> Option<Generation> {
        self.pending_volume.map(|p| p.generation)
    }

    /// Fold the previously known entity into this freshly sanitized one.
    ///
    /// Local-only fields and the whole optimistic overlay carry over from
    /// `old` unconditionally; a server update never silently discards an
    /// in-flight local mutation. Reconciling the overlay against fresh
    /// server truth is the holder's job, via generation comparison.
    ///
    /// Panics when `old` is still a minimal placeholder; such an entity may
    /// only ever be the target of a merge, never the base.
    pub fn update_from(&mut self, old: &Participant) {
        assert!(
            !old.is_min,
            "cannot merge from a minimal-only participant base"
        );
        if self.joined_at < old.joined_at {
            tracing::warn!(
                user_id = %self.user_id,
                old = old.joined_at,
                new = self.joined_at,
                "join time regressed, keeping the newer value"
            );
            self.joined_at = old.joined_at;
        }
        if self.active_at < old.active_at {
            self.active_at = old.active_at;
        }
        self.local_active_at = old.local_active_at;
        self.is_speaking = old.is_speaking;
        self.order = old.order;
        if self.is_min {
            // The placeholder carries no per-viewer mute signal and no
            // trustworthy volume; keep what the full entity already knew.
            self.server_mute.locally = old.server_mute.locally;
            if old.is_volume_level_local && !self.is_volume_level_local {
                self.is_volume_level_local = true;
                self.volume_level = old.volume_level;
            }
        }
        self.is_min = false;

        self.pending_mute = old.pending_mute;
        self.pending_volume = old.pending_volume;
        self.mute_generation = old.mute_generation;
        self.volume_generation = old.volume_generation;
    }

    /// Recompute the derived permitted action against the current effective
    /// state. Returns whether it changed, so the holder can decide whether
    /// observers need notifying.
    pub fn update_permissions(&mut self, role: RoleContext) -> bool {
        let action = allowed_mute_action(self.effective_mute(), role);
        if action != self.allowed_action {
            self.allowed_action = action;
            true
        } else {
            false
        }
    }

    /// Record an optimistic mute/unmute request tagged with `generation`.
    ///
    /// Returns `false` without mutating anything when the requested
    /// direction is not currently permitted — an ordinary outcome, not an
    /// error. On success the permitted action is recomputed so externally
    /// visible flags reflect the new optimistic state immediately.
    pub fn set_pending_mute(
        &mut self,
        muted: bool,
        role: RoleContext,
        generation: Generation,
    ) -> bool {
        self.update_permissions(role);
        let Some(action) = self.allowed_action else {
            return false;
        };
        if action.mutes() != muted {
            return false;
        }

        let state = if role.is_self {
            MuteState::new(muted, false, false)
        } else {
            let mut state = self.effective_mute();
            match action {
                MuteAction::MuteOnlyForSelf => state.locally = true,
                MuteAction::UnmuteOnlyForSelf => state.locally = false,
                MuteAction::MuteForAllUsers => {
                    if role.is_admin {
                        // Muting an admin is recorded as a self-mute so the
                        // action cannot be instantly reversed by another
                        // party.
                        assert!(!state.by_themselves);
                        state.by_admin = false;
                        state.by_themselves = true;
                    } else {
                        assert!(!state.by_admin);
                        state.by_admin = true;
                        state.by_themselves = false;
                    }
                }
                MuteAction::UnmuteForAllUsers => {
                    // Revoking an admin mute hands control back to the
                    // participant rather than instantly restoring audio.
                    assert!(!role.is_admin);
                    state.by_admin = false;
                    state.by_themselves = true;
                }
            }
            state
        };

        self.pending_mute = Some(Pending::new(state, generation));
        self.update_permissions(role);
        true
    }

    /// Record an optimistic volume change. The caller validates the range;
    /// an out-of-range value here is a contract violation.
    pub fn set_pending_volume(&mut self, level: i32, generation: Generation) {
        assert!(
            is_valid_volume_level(level),
            "pending volume must be pre-validated"
        );
        self.pending_volume = Some(Pending::new(level, generation));
    }

    pub fn clear_pending_mute(&mut self) {
        self.pending_mute = None;
    }

    pub fn clear_pending_volume(&mut self) {
        self.pending_volume = None;
    }

    /// Issue the next mute-aspect fencing token.
    pub(crate) fn next_mute_generation(&mut self) -> Generation {
        self.mute_generation = self.mute_generation.next();
        self.mute_generation
    }

    /// Issue the next volume-aspect fencing token.
    pub(crate) fn next_volume_generation(&mut self) -> Generation {
        self.volume_generation = self.volume_generation.next();
        self.volume_generation
    }

    /// Project the externally visible snapshot. Invalid participants
    /// project to `None` rather than a partially populated object.
    pub fn to_snapshot(&self) -> Option<ParticipantSnapshot> {
        if !self.is_valid() {
            return None;
        }
        Some(ParticipantSnapshot {
            user_id: self.user_id,
            audio_source: self.audio_source,
            is_speaking: self.is_speaking,
            can_be_muted_for_all_users: self.allowed_action == Some(MuteAction::MuteForAllUsers),
            can_be_unmuted_for_all_users: self.allowed_action
                == Some(MuteAction::UnmuteForAllUsers),
            can_be_muted_only_for_self: self.allowed_action == Some(MuteAction::MuteOnlyForSelf),
            can_be_unmuted_only_for_self: self.allowed_action
                == Some(MuteAction::UnmuteOnlyForSelf),
            is_muted_for_all_users: self.is_muted_for_all_users(),
            is_muted_locally: self.is_muted_locally(),
            is_muted_by_themselves: self.is_muted_by_themselves(),
            volume_level: self.effective_volume_level(),
            order: self.order,
        })
    }
}

/// Equality over every externally observable property — identity, order,
/// speaking flag, permitted action, and effective mute/volume state —
/// regardless of whether a value comes from the server or the overlay.
impl PartialEq for Participant {
    fn eq(&self, other: &Self) -> bool {
        self.user_id == other.user_id
            && self.audio_source == other.audio_source
            && self.allowed_action == other.allowed_action
            && self.is_muted_for_all_users() == other.is_muted_for_all_users()
            && self.is_muted_locally() == other.is_muted_locally()
            && self.is_muted_by_themselves() == other.is_muted_by_themselves()
            && self.is_speaking == other.is_speaking
            && self.effective_volume_level() == other.effective_volume_level()
            && self.order == other.order
    }
}

impl Eq for Participant {}

/// Immutable presentation object for one valid participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSnapshot {
    pub user_id: UserId,
    pub audio_source: AudioSourceId,
    pub is_speaking: bool,
    pub can_be_muted_for_all_users: bool,
    pub can_be_unmuted_for_all_users: bool,
    pub can_be_muted_only_for_self: bool,
    pub can_be_unmuted_only_for_self: bool,
    pub is_muted_for_all_users: bool,
    pub is_muted_locally: bool,
    pub is_muted_by_themselves: bool,
    pub volume_level: i32,
    pub order: i64,
}
