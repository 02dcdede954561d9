//! Layer 4: the role-based mute-permission state machine.

use crate::domain::{MuteAction, MuteState, RoleContext};

/// Compute the single permitted mute-related action for a participant,
/// given the viewer's role context and the participant's effective
/// (pending-over-server) mute state.
///
/// Target classification is mutually exclusive, `is_self` before `is_admin`:
///
/// - self: may mute only when fully unmuted; may unmute only when
///   self-muted. An admin mute cannot be lifted from here, and per-viewer
///   local actions never apply to oneself.
/// - admin target: a manager may mute (recorded as a self-mute, so the
///   action cannot be instantly reversed by another party) but nobody may
///   unmute an admin for all users. Without management rights only the
///   local toggle is available.
/// - regular target: a manager may mute when not admin-muted and unmute
///   when admin-muted; unmuting hands control back to the participant
///   (self-muted) rather than instantly restoring audio. Without management
///   rights only the local toggle is available.
///
/// Panics when the effective state itself is inconsistent (both mute
/// parties set); that is a producer bug, not input to tolerate.
pub fn allowed_mute_action(effective: MuteState, role: RoleContext) -> Option<MuteAction> {
    assert!(
        !(effective.by_admin && effective.by_themselves),
        "effective mute state cannot be both admin- and self-muted"
    );

    if role.is_self {
        if !effective.by_themselves && !effective.by_admin {
            Some(MuteAction::MuteForAllUsers)
        } else if effective.by_themselves {
            Some(MuteAction::UnmuteForAllUsers)
        } else {
            None
        }
    } else if role.is_admin {
        if role.can_manage {
            if !effective.by_themselves {
                Some(MuteAction::MuteForAllUsers)
            } else {
                None
            }
        } else {
            Some(local_toggle(effective))
        }
    } else if role.can_manage {
        if !effective.by_admin {
            Some(MuteAction::MuteForAllUsers)
        } else {
            Some(MuteAction::UnmuteForAllUsers)
        }
    } else {
        Some(local_toggle(effective))
    }
}

fn local_toggle(effective: MuteState) -> MuteAction {
    if effective.locally {
        MuteAction::UnmuteOnlyForSelf
    } else {
        MuteAction::MuteOnlyForSelf
    }
}
