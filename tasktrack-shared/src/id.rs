/// Document identifiers
///
/// Users and tasks are keyed by a 12-byte identifier rendered as 24 lowercase
/// hex characters, the same shape document stores hand out:
///
/// ```text
/// | 4 bytes: unix seconds (BE) | 5 bytes: process random | 3 bytes: counter (BE) |
/// ```
///
/// Because the timestamp leads, ids sort in creation order, which the task
/// store uses as its tie-breaker.
///
/// # Example
///
/// ```
/// use tasktrack_shared::id::ObjectId;
///
/// let id = ObjectId::new();
/// assert_eq!(id.as_str().len(), 24);
///
/// let parsed = ObjectId::parse(id.as_str()).unwrap();
/// assert_eq!(parsed, id);
///
/// assert!(ObjectId::parse("not-an-id").is_err());
/// ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

/// Length of the hex rendering
pub const OBJECT_ID_HEX_LEN: usize = 24;

/// Returned when a string is not a well-formed identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("identifier must be {OBJECT_ID_HEX_LEN} hexadecimal characters")]
pub struct InvalidObjectId;

/// 12-byte document identifier, stored and serialized as lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(try_from = "String", into = "String")]
#[sqlx(transparent)]
pub struct ObjectId(String);

fn process_unique() -> &'static [u8; 5] {
    static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
    PROCESS_UNIQUE.get_or_init(rand::random)
}

fn next_counter() -> u32 {
    static COUNTER: OnceLock<AtomicU32> = OnceLock::new();
    COUNTER
        .get_or_init(|| AtomicU32::new(rand::random::<u32>() & 0x00ff_ffff))
        .fetch_add(1, Ordering::Relaxed)
        & 0x00ff_ffff
}

impl ObjectId {
    /// Generates a fresh identifier
    pub fn new() -> Self {
        let seconds = chrono::Utc::now().timestamp() as u32;
        let counter = next_counter();

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(process_unique());
        bytes[9..].copy_from_slice(&counter.to_be_bytes()[1..]);

        Self(hex::encode(bytes))
    }

    /// Parses a client-supplied identifier
    ///
    /// Accepts exactly 24 hex digits in either case; the result is lowercase.
    pub fn parse(value: &str) -> Result<Self, InvalidObjectId> {
        if value.len() != OBJECT_ID_HEX_LEN || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidObjectId);
        }

        Ok(Self(value.to_ascii_lowercase()))
    }

    /// Hex rendering
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ObjectId {
    type Error = InvalidObjectId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl std::str::FromStr for ObjectId {
    type Err = InvalidObjectId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
