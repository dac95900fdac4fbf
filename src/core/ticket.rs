// ============================================================================
// Version Tickets
// ============================================================================
//
// Both subsystems order themselves with time-derived tickets: an entity
// version is a ticket, and a lock proposal's priority is a ticket. A ticket
// is a UUIDv7-shaped value whose byte order equals its chronological order,
// so tickets can be compared as Rust values and used directly as column keys
// in the wide-column store.
//
// Layout (most significant first):
//   48 bits  unix milliseconds
//    4 bits  version (7)
//   12 bits  sequence, high half
//    2 bits  variant (0b10)
//    4 bits  sequence, low half
//   58 bits  entropy
//
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A time-ordered version identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticket(Uuid);

impl Ticket {
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Milliseconds component of the ticket
    pub fn timestamp_millis(&self) -> i64 {
        (self.0.as_u128() >> 80) as i64
    }
}

impl std::fmt::Display for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Issues strictly increasing tickets
///
/// A single atomic packs `millis << 16 | sequence`. When the wall clock has
/// not advanced since the last ticket, the sequence is bumped instead; if the
/// sequence would overflow it borrows into the milliseconds field, so the
/// stream stays strictly increasing even under burst load.
pub struct VersionClock {
    last: AtomicU64,
}

impl VersionClock {
    pub fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Draw the next ticket
    pub fn next(&self) -> Ticket {
        let stamp = self.advance();
        Self::assemble(stamp >> 16, (stamp & 0xFFFF) as u16)
    }

    fn advance(&self) -> u64 {
        loop {
            let now = (Utc::now().timestamp_millis() as u64) << 16;
            let prev = self.last.load(Ordering::Acquire);
            let next = if now > prev { now } else { prev + 1 };
            if self
                .last
                .compare_exchange(prev, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return next;
            }
        }
    }

    fn assemble(millis: u64, seq: u16) -> Ticket {
        let entropy = Uuid::new_v4().as_u128() & ((1u128 << 58) - 1);
        let value = ((millis as u128) & 0xFFFF_FFFF_FFFF) << 80
            | 0x7u128 << 76
            | ((seq as u128) >> 4) << 64
            | 0b10u128 << 62
            | ((seq as u128) & 0xF) << 58
            | entropy;
        Ticket(Uuid::from_u128(value))
    }
}

impl Default for VersionClock {
    fn default() -> Self {
        Self::new()
    }
}
