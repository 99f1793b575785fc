//! Inline edit mode for a single history entry.

use crate::error::{AppError, AppResult};
use crate::types::{EntryId, HistoryEntry};

/// Text being edited for one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub id: EntryId,
    pub action: String,
    pub obs: String,
}

impl EditDraft {
    pub fn from_entry(entry: &HistoryEntry) -> Self {
        Self {
            id: entry.id.clone(),
            action: entry.action.clone(),
            obs: entry.obs.clone().unwrap_or_default(),
        }
    }

    /// Check the draft is submittable and return the trimmed fields
    pub fn validated(&self) -> AppResult<(String, Option<String>)> {
        let action = self.action.trim();
        if action.is_empty() {
            return Err(AppError::validation("The action cannot be empty."));
        }
        let obs = self.obs.trim();
        Ok((action.to_string(), (!obs.is_empty()).then(|| obs.to_string())))
    }
}

/// At most one entry is edited at a time
#[derive(Debug, Clone, Default)]
pub struct Editor {
    draft: Option<EditDraft>,
}

impl Editor {
    /// Start editing, replacing any draft in progress
    pub fn begin(&mut self, entry: &HistoryEntry) -> &EditDraft {
        self.draft.insert(EditDraft::from_entry(entry))
    }

    pub fn draft(&self) -> Option<&EditDraft> {
        self.draft.as_ref()
    }

    pub fn set_action(&mut self, action: impl Into<String>) -> AppResult<()> {
        let draft = self.draft.as_mut().ok_or(AppError::NoDraft)?;
        draft.action = action.into();
        Ok(())
    }

    pub fn set_obs(&mut self, obs: impl Into<String>) -> AppResult<()> {
        let draft = self.draft.as_mut().ok_or(AppError::NoDraft)?;
        draft.obs = obs.into();
        Ok(())
    }

    pub fn cancel(&mut self) -> Option<EditDraft> {
        self.draft.take()
    }

    /// Clear the draft only if it still belongs to `id`
    pub fn finish(&mut self, id: &EntryId) {
        if self.draft.as_ref().is_some_and(|d| &d.id == id) {
            self.draft = None;
        }
    }
}
