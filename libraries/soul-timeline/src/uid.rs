//! Stable opaque identities for windows and periods
//!
//! A [`Uid`] never encodes a position in a list. Timelines contributed by a
//! single source use local UIDs; once a playlist concatenates them, every local
//! UID is qualified by the UUID of the holder that owns it. Inserting, removing
//! or moving other holders therefore leaves the UID of an entry untouched.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identity of a window or period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Uid {
    holder: Option<Uuid>,
    local: u64,
}

impl Uid {
    /// Reserved identity used while the timeline is empty.
    pub const DUMMY: Uid = Uid {
        holder: None,
        local: u64::MAX,
    };

    /// A UID local to a single source timeline
    pub const fn local(local: u64) -> Self {
        Self {
            holder: None,
            local,
        }
    }

    /// Qualify a child UID with the holder that contributed it
    pub fn qualified(holder: Uuid, child: Uid) -> Self {
        Self {
            holder: Some(holder),
            local: child.local,
        }
    }

    /// Holder that contributed this UID, if it was produced by concatenation
    pub fn holder(&self) -> Option<Uuid> {
        self.holder
    }

    /// The UID as seen by the child timeline that contributed it
    pub fn child_uid(&self) -> Uid {
        Uid::local(self.local)
    }

    pub fn is_dummy(&self) -> bool {
        *self == Self::DUMMY
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.holder {
            Some(holder) => write!(f, "{}:{}", holder, self.local),
            None if self.is_dummy() => write!(f, "dummy"),
            None => write!(f, "{}", self.local),
        }
    }
}
