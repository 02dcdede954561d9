//! Layer 3: domain values.
//!
//! MuteState: the three mute flags with their exclusivity invariant.
//! RoleContext: the viewer/target role inputs supplied by the external
//! permission authority.
//! MuteAction: the closed set of mutually exclusive mute-related actions.

use serde::{Deserialize, Serialize};

pub const MIN_VOLUME_LEVEL: i32 = 1;
pub const MAX_VOLUME_LEVEL: i32 = 20_000;

/// Replaces an out-of-range wire volume. Outside the valid range and equal
/// to the unset default: a degraded reading is "no trusted reading".
pub const VOLUME_LEVEL_SENTINEL: i32 = 0;

pub fn is_valid_volume_level(level: i32) -> bool {
    (MIN_VOLUME_LEVEL..=MAX_VOLUME_LEVEL).contains(&level)
}

/// Mute flags for one participant.
///
/// `by_themselves` and `by_admin` are mutually exclusive. `locally` is a
/// per-viewer flag independent of both.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuteState {
    pub by_themselves: bool,
    pub by_admin: bool,
    pub locally: bool,
}

impl MuteState {
    /// Panics when `by_themselves` and `by_admin` are both set; that state
    /// indicates a bug in the producer, not recoverable input.
    pub fn new(by_themselves: bool, by_admin: bool, locally: bool) -> Self {
        assert!(
            !(by_themselves && by_admin),
            "muted-by-themselves and muted-by-admin are mutually exclusive"
        );
        Self {
            by_themselves,
            by_admin,
            locally,
        }
    }

    /// Muted for every call member, by whichever party.
    pub fn for_all_users(self) -> bool {
        self.by_admin || self.by_themselves
    }
}

/// The viewer's relationship to the target participant.
///
/// Supplied by the external permission/roster authority; never computed
/// here. `is_admin` describes the target's standing, `can_manage` the
/// viewer's rights.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoleContext {
    pub can_manage: bool,
    pub is_self: bool,
    pub is_admin: bool,
}

/// The single currently permitted mute-related action.
///
/// At most one action is permitted at any time; the permission machine
/// returns `Option<MuteAction>` so mutual exclusion is structural.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuteAction {
    MuteForAllUsers,
    UnmuteForAllUsers,
    MuteOnlyForSelf,
    UnmuteOnlyForSelf,
}

impl MuteAction {
    pub fn as_str(self) -> &'static str {
        match self {
            MuteAction::MuteForAllUsers => "mute_for_all_users",
            MuteAction::UnmuteForAllUsers => "unmute_for_all_users",
            MuteAction::MuteOnlyForSelf => "mute_only_for_self",
            MuteAction::UnmuteOnlyForSelf => "unmute_only_for_self",
        }
    }

    /// Whether the action mutes (as opposed to unmutes).
    pub fn mutes(self) -> bool {
        matches!(
            self,
            MuteAction::MuteForAllUsers | MuteAction::MuteOnlyForSelf
        )
    }

    /// Whether the action affects every call member rather than only the
    /// acting viewer.
    pub fn for_all_users(self) -> bool {
        matches!(
            self,
            MuteAction::MuteForAllUsers | MuteAction::UnmuteForAllUsers
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_range() {
        assert!(is_valid_volume_level(MIN_VOLUME_LEVEL));
        assert!(is_valid_volume_level(MAX_VOLUME_LEVEL));
        assert!(!is_valid_volume_level(0));
        assert!(!is_valid_volume_level(MAX_VOLUME_LEVEL + 1));
        assert!(!is_valid_volume_level(VOLUME_LEVEL_SENTINEL));
    }

    #[test]
    #[should_panic(expected = "mutually exclusive")]
    fn mute_state_rejects_double_mute() {
        let _ = MuteState::new(true, true, false);
    }

    #[test]
    fn mute_state_for_all_users() {
        assert!(MuteState::new(true, false, false).for_all_users());
        assert!(MuteState::new(false, true, true).for_all_users());
        assert!(!MuteState::new(false, false, true).for_all_users());
    }

    #[test]
    fn mute_action_direction() {
        assert!(MuteAction::MuteForAllUsers.mutes());
        assert!(MuteAction::MuteOnlyForSelf.mutes());
        assert!(!MuteAction::UnmuteForAllUsers.mutes());
        assert!(!MuteAction::UnmuteOnlyForSelf.mutes());
        assert!(MuteAction::UnmuteForAllUsers.for_all_users());
        assert!(!MuteAction::UnmuteOnlyForSelf.for_all_users());
    }
}
