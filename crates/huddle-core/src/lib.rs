//! Per-participant state reconciliation and mute-permission core for a
//! real-time group-call client.
//!
//! The crate keeps a locally displayed participant roster consistent with
//! authoritative, possibly out-of-order server updates and with optimistic
//! local mutations issued before server acknowledgment. It performs no I/O:
//! byte-level wire codecs, update delivery, and the permission authority are
//! external collaborators.
//!
//! Module hierarchy follows type dependency order:
//! - error: boundary validation errors (Layer 0)
//! - identity: UserId, AudioSourceId (Layer 1)
//! - pending: Generation fencing tokens, Pending<T> overlay cells (Layer 2)
//! - domain: MuteState, RoleContext, MuteAction, volume range (Layer 3)
//! - permission: the role-based mute-permission state machine (Layer 4)
//! - wire: raw update records and ordering classification (Layer 5)
//! - participant: the Participant entity: sanitize, merge, project (Layer 6)
//! - roster: the roster owner: version gating, generation fencing (Layer 7)

#![forbid(unsafe_code)]

pub mod domain;
pub mod error;
pub mod identity;
pub mod participant;
pub mod pending;
pub mod permission;
pub mod roster;
pub mod wire;

pub use domain::{
    is_valid_volume_level, MuteAction, MuteState, RoleContext, MAX_VOLUME_LEVEL, MIN_VOLUME_LEVEL,
    VOLUME_LEVEL_SENTINEL,
};
pub use error::{CoreError, InvalidId};
pub use identity::{AudioSourceId, UserId};
pub use participant::{Participant, ParticipantSnapshot};
pub use pending::{Generation, Pending};
pub use permission::allowed_mute_action;
pub use roster::{
    ApplyOutcome, CallAuthority, CallRoster, RequestOutcome, RosterError, ServerVersion,
};
pub use wire::WireParticipantUpdate;
