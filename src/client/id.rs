//! Client identifiers

use std::fmt;

use uuid::Uuid;

/// Identifies the owner of backed-up files on the server
///
/// Generated once per client process and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u32);

impl ClientId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Generate a random id from the low 32 bits of a v4 UUID
    pub fn random() -> Self {
        Self(Uuid::new_v4().as_u128() as u32)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for ClientId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
