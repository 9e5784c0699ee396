//! Domain value objects - Identifiers and fixed keys

use crate::domain::errors::SaveError;
use serde::{Deserialize, Serialize};

/// Storage key for the live game state document
pub const GAME_STATE_KEY: &str = "gameState";

/// Number of save slots available to the player
pub const MAX_SLOTS: u8 = 5;

/// Macro to implement common traits for string wrapper types
macro_rules! impl_string_wrapper {
    ($type:ident) => {
        impl From<String> for $type {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $type {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

/// Identifier of a narrative page
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(String);

impl PageId {
    pub fn new(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Id of the page's root element in the host
    pub fn element_id(&self) -> String {
        format!("page-{}", self.0)
    }
}

impl_string_wrapper!(PageId);

/// A validated save slot number in `1..=MAX_SLOTS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u8")]
pub struct SlotNumber(u8);

impl SlotNumber {
    pub fn new(slot: u32) -> Result<Self, SaveError> {
        if (1..=MAX_SLOTS as u32).contains(&slot) {
            Ok(Self(slot as u8))
        } else {
            Err(SaveError::InvalidSlot {
                slot,
                max: MAX_SLOTS,
            })
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Storage key holding this slot's snapshot
    pub fn storage_key(self) -> String {
        format!("save_{}", self.0)
    }

    /// All slots in ascending order
    pub fn all() -> impl Iterator<Item = SlotNumber> {
        (1..=MAX_SLOTS).map(SlotNumber)
    }
}

impl TryFrom<u32> for SlotNumber {
    type Error = SaveError;

    fn try_from(slot: u32) -> Result<Self, Self::Error> {
        Self::new(slot)
    }
}

impl From<SlotNumber> for u8 {
    fn from(slot: SlotNumber) -> Self {
        slot.0
    }
}

impl std::fmt::Display for SlotNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_bounds_are_inclusive() {
        assert!(SlotNumber::new(0).is_err());
        assert!(SlotNumber::new(1).is_ok());
        assert!(SlotNumber::new(5).is_ok());
        assert!(SlotNumber::new(6).is_err());
    }

    #[test]
    fn slot_storage_key() {
        assert_eq!(SlotNumber::new(3).unwrap().storage_key(), "save_3");
        let keys: Vec<_> = SlotNumber::all().map(|s| s.get()).collect();
        assert_eq!(keys, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn page_element_id_is_prefixed() {
        assert_eq!(PageId::from("forest").element_id(), "page-forest");
    }
}
