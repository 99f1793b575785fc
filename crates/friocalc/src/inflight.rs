//! Guards against sending the same mutation twice while the first one is
//! still waiting on the server.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::error::{AppError, AppResult};
use crate::types::EntryId;

/// Operation slots that may only have one request outstanding
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    Save,
    Edit(EntryId),
    Delete(EntryId),
    Logout,
}

impl Slot {
    pub fn name(&self) -> String {
        match self {
            Slot::Save => "save".to_string(),
            Slot::Edit(id) => format!("edit:{}", id),
            Slot::Delete(id) => format!("delete:{}", id),
            Slot::Logout => "logout".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InFlight {
    busy: Arc<Mutex<HashSet<Slot>>>,
}

impl InFlight {
    /// Claim a slot. The returned guard frees it when dropped.
    pub fn claim(&self, slot: Slot) -> AppResult<Claim> {
        let mut busy = self.busy.lock().unwrap_or_else(|e| e.into_inner());
        if !busy.insert(slot.clone()) {
            return Err(AppError::Busy(slot.name()));
        }
        Ok(Claim {
            busy: Arc::clone(&self.busy),
            slot,
        })
    }

    #[cfg(test)]
    pub fn is_busy(&self, slot: &Slot) -> bool {
        self.busy
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(slot)
    }
}

/// A claimed slot, released on drop whether the request succeeded or not
#[derive(Debug)]
pub struct Claim {
    busy: Arc<Mutex<HashSet<Slot>>>,
    slot: Slot,
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.busy
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_claim_is_busy() {
        let inflight = InFlight::default();
        let _claim = inflight.claim(Slot::Save).unwrap();
        let err = inflight.claim(Slot::Save).unwrap_err();
        assert!(matches!(err, AppError::Busy(ref s) if s == "save"));
    }

    #[test]
    fn test_drop_releases_slot() {
        let inflight = InFlight::default();
        let claim = inflight.claim(Slot::Logout).unwrap();
        assert!(inflight.is_busy(&Slot::Logout));
        drop(claim);
        assert!(!inflight.is_busy(&Slot::Logout));
        assert!(inflight.claim(Slot::Logout).is_ok());
    }

    #[test]
    fn test_slots_are_independent() {
        let inflight = InFlight::default();
        let _a = inflight.claim(Slot::Edit(EntryId::Number(1))).unwrap();
        assert!(inflight.claim(Slot::Edit(EntryId::Number(2))).is_ok());
        assert!(inflight.claim(Slot::Delete(EntryId::Number(1))).is_ok());
        assert!(inflight.claim(Slot::Save).is_ok());
    }

    #[test]
    fn test_slot_names() {
        assert_eq!(Slot::Edit(EntryId::Number(3)).name(), "edit:3");
        assert_eq!(Slot::Delete(EntryId::from("ab")).name(), "delete:ab");
    }
}
