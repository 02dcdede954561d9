//! Layer 1: identity atoms.
//!
//! UserId: the server-side account identifier.
//! AudioSourceId: the synchronization source of the participant's audio.
//!
//! One participant exists per distinct (user, audio source) pair. Identity
//! values arrive raw from the wire and are kept even when invalid; validity
//! gates snapshot projection, not tracking.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, InvalidId};

/// User identifier. Valid values are strictly positive.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> i64 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 > 0
    }

    pub fn validate(self) -> Result<Self, CoreError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(InvalidId::User {
                raw: self.0,
                reason: "must be positive",
            }
            .into())
        }
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Audio synchronization source. Valid values are non-zero.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioSourceId(i32);

impl AudioSourceId {
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> i32 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    pub fn validate(self) -> Result<Self, CoreError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(InvalidId::AudioSource {
                raw: self.0,
                reason: "must be non-zero",
            }
            .into())
        }
    }
}

impl fmt::Debug for AudioSourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AudioSourceId({})", self.0)
    }
}

impl fmt::Display for AudioSourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
