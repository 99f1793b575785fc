//! Application state and the user actions that change it.
//!
//! Every operation takes `&self`. State sits behind a mutex that is never
//! held across an `.await`, and each remote mutation claims an in-flight
//! slot so a repeated action cannot send a duplicate request.

use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::backend::{Backend, CreateKind};
use crate::calculator::{CalculatorForm, Field};
use crate::config::{Config, Lifecycle};
use crate::editor::{EditDraft, Editor};
use crate::error::{AppError, AppResult};
use crate::history::HistoryStore;
use crate::inflight::{InFlight, Slot};
use crate::session::{AuthView, Session};
use crate::types::{EntryId, EntryPayload, HistoryEntry, User};

#[derive(Debug, Default)]
struct State {
    session: Session,
    form: CalculatorForm,
    history: HistoryStore,
    editor: Editor,
    /// Bumped on logout so late responses from the old session are dropped
    epoch: u64,
}

impl State {
    fn user(&self) -> AppResult<&User> {
        self.session.user().ok_or(AppError::NotAuthenticated)
    }

    fn visible_entry(&self, id: &EntryId) -> AppResult<HistoryEntry> {
        self.history
            .get_visible(id)
            .cloned()
            .ok_or_else(|| AppError::UnknownEntry(id.clone()))
    }
}

pub struct App {
    backend: Backend,
    lifecycle: Lifecycle,
    state: Mutex<State>,
    inflight: InFlight,
}

impl App {
    pub fn new(backend: Backend, lifecycle: Lifecycle) -> Self {
        Self {
            backend,
            lifecycle,
            state: Mutex::new(State::default()),
            inflight: InFlight::default(),
        }
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        let backend = Backend::new(config.base_url.clone())?;
        Ok(Self::new(backend, config.lifecycle))
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ========== session ==========

    /// Initial load, made once before the first user action
    pub async fn mount(&self) -> usize {
        self.refresh_history().await
    }

    /// The login and register forms only exist while anonymous
    fn ensure_anonymous(&self) -> AppResult<()> {
        match self.state().session.user() {
            Some(user) => Err(AppError::validation(format!(
                "Already logged in as {}. Log out first.",
                user.username
            ))),
            None => Ok(()),
        }
    }

    /// Log in through the backend and enter the authenticated state
    pub async fn login(&self, username: &str, password: &str) -> AppResult<User> {
        self.ensure_anonymous()?;
        let user = self
            .backend
            .login(username, password)
            .await
            .inspect_err(|e| log_failure(e, "login"))?;
        self.complete_login(user.clone()).await;
        Ok(user)
    }

    /// Accept a user from a successful login. A fresh login reloads the
    /// history from the server.
    pub async fn complete_login(&self, user: User) {
        let username = user.username.clone();
        let fresh = self.state().session.login(user);
        info!(user = %username, "Logged in");
        if fresh {
            self.refresh_history().await;
        }
    }

    pub async fn register(&self, username: &str, password: &str) -> AppResult<()> {
        self.ensure_anonymous()?;
        self.backend
            .register(username, password)
            .await
            .inspect_err(|e| log_failure(e, "register"))?;
        self.state().session.registered();
        info!(user = %username, "Registered");
        Ok(())
    }

    pub fn toggle_auth_view(&self) -> Option<AuthView> {
        self.state().session.toggle_view()
    }

    /// Tell the server, then drop the user, the computed result and the
    /// whole history whether or not the server call worked.
    pub async fn logout(&self) -> AppResult<()> {
        self.state().user()?;
        let _claim = self.inflight.claim(Slot::Logout)?;

        let result = self.backend.logout().await;

        let mut state = self.state();
        let user = state.session.logout();
        state.form.clear_result();
        state.history.clear();
        state.editor.cancel();
        state.epoch += 1;
        drop(state);

        match &result {
            Ok(()) => info!(user = ?user.map(|u| u.username), "Logged out"),
            Err(e) => log_failure(e, "logout"),
        }
        result
    }

    // ========== history sync ==========

    /// Replace the local list with the server's. Any failure leaves the
    /// list empty; it is logged, not reported.
    pub async fn refresh_history(&self) -> usize {
        let epoch = self.state().epoch;
        let fetched = self.backend.fetch_history().await;

        let mut state = self.state();
        if state.epoch != epoch {
            debug!("Session changed during fetch, discarding result");
            return state.history.len();
        }
        match fetched {
            Ok(entries) => {
                state.history.replace_all(entries);
                debug!(count = state.history.len(), "History loaded");
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch history");
                state.history.clear();
            }
        }
        state.history.len()
    }

    // ========== calculator ==========

    pub fn set_field(&self, field: Field, value: &str) -> AppResult<()> {
        let mut state = self.state();
        state.user()?;
        state.form.set(field, value);
        Ok(())
    }

    pub fn set_observation(&self, obs: &str) -> AppResult<()> {
        let mut state = self.state();
        state.user()?;
        state.form.obs = obs.to_string();
        Ok(())
    }

    pub fn calculate(&self) -> AppResult<f64> {
        let mut state = self.state();
        state.user()?;
        let btu = state.form.calculate()?;
        debug!(btu, "BTU calculated");
        Ok(btu)
    }

    /// Persist the computed result. The entry only appears locally once
    /// the server has assigned its id.
    pub async fn save(&self) -> AppResult<HistoryEntry> {
        let (action, obs, epoch) = {
            let state = self.state();
            let user = state.user()?;
            let action = state
                .form
                .summary(&user.username)
                .ok_or_else(|| AppError::validation("Please calculate a BTU before saving."))?;
            let obs = state.form.observation().map(str::to_string);
            (action, obs, state.epoch)
        };
        let _claim = self.inflight.claim(Slot::Save)?;

        let payload = EntryPayload::new(&action, obs.as_deref());
        let id = self
            .backend
            .create_entry(&payload, CreateKind::Save)
            .await
            .inspect_err(|e| log_failure(e, "save"))?;

        let entry = HistoryEntry::new(id, action, obs);
        let mut state = self.state();
        if state.epoch == epoch {
            state.history.prepend(entry.clone());
            state.form.reset();
        }
        info!(id = %entry.id, "Calculation saved");
        Ok(entry)
    }

    // ========== editor ==========

    pub fn begin_edit(&self, id: &EntryId) -> AppResult<EditDraft> {
        let mut state = self.state();
        state.user()?;
        let entry = state.visible_entry(id)?;
        Ok(state.editor.begin(&entry).clone())
    }

    pub fn set_edit_action(&self, action: &str) -> AppResult<()> {
        self.state().editor.set_action(action)
    }

    pub fn set_edit_obs(&self, obs: &str) -> AppResult<()> {
        self.state().editor.set_obs(obs)
    }

    pub fn cancel_edit(&self) -> Option<EditDraft> {
        self.state().editor.cancel()
    }

    pub fn draft(&self) -> Option<EditDraft> {
        self.state().editor.draft().cloned()
    }

    /// Submit the draft. Returns the id of the entry now showing the
    /// edited text: the same id for REST, the new copy's id for soft.
    pub async fn submit_edit(&self) -> AppResult<EntryId> {
        let (id, action, obs, epoch) = {
            let state = self.state();
            state.user()?;
            let draft = state.editor.draft().ok_or(AppError::NoDraft)?;
            let (action, obs) = draft.validated()?;
            state.visible_entry(&draft.id)?;
            (draft.id.clone(), action, obs, state.epoch)
        };
        let _claim = self.inflight.claim(Slot::Edit(id.clone()))?;
        let payload = EntryPayload::new(&action, obs.as_deref());

        match self.lifecycle {
            Lifecycle::Rest => {
                self.backend
                    .update_entry(&id, &payload)
                    .await
                    .inspect_err(|e| log_failure(e, "update"))?;

                let mut state = self.state();
                if state.epoch == epoch {
                    state.history.update(&id, &action, obs.as_deref());
                    state.editor.finish(&id);
                }
                info!(id = %id, "Entry updated");
                Ok(id)
            }
            Lifecycle::Soft => {
                let new_id = self
                    .backend
                    .create_entry(&payload, CreateKind::Duplicate)
                    .await
                    .inspect_err(|e| log_failure(e, "update"))?;

                let mut state = self.state();
                if state.epoch == epoch {
                    let copy = HistoryEntry::new(new_id.clone(), action, obs);
                    state.history.replace_with(&id, copy);
                    state.editor.finish(&id);
                }
                info!(original = %id, id = %new_id, "Entry replaced");
                Ok(new_id)
            }
        }
    }

    /// Remove a visible entry after `confirm` agrees.
    ///
    /// Returns `Ok(false)` when the user declines. REST removal deletes on
    /// the server first; soft removal only hides the entry locally.
    pub async fn remove(
        &self,
        id: &EntryId,
        confirm: impl FnOnce(&HistoryEntry) -> bool,
    ) -> AppResult<bool> {
        let (entry, epoch) = {
            let state = self.state();
            state.user()?;
            (state.visible_entry(id)?, state.epoch)
        };
        if !confirm(&entry) {
            debug!(id = %id, "Removal declined");
            return Ok(false);
        }

        match self.lifecycle {
            Lifecycle::Soft => {
                let mut state = self.state();
                state.history.hide(id);
                state.editor.finish(id);
                info!(id = %id, "Entry hidden");
            }
            Lifecycle::Rest => {
                let _claim = self.inflight.claim(Slot::Delete(id.clone()))?;
                self.backend
                    .delete_entry(id)
                    .await
                    .inspect_err(|e| log_failure(e, "delete"))?;

                let mut state = self.state();
                if state.epoch == epoch {
                    state.history.remove(id);
                    state.editor.finish(id);
                }
                info!(id = %id, "Entry deleted");
            }
        }
        Ok(true)
    }

    // ========== view ==========

    pub fn user(&self) -> Option<User> {
        self.state().session.user().cloned()
    }

    pub fn auth_view(&self) -> Option<AuthView> {
        self.state().session.auth_view()
    }

    pub fn calculated_btu(&self) -> Option<f64> {
        self.state().form.calculated_btu()
    }

    pub fn form(&self) -> CalculatorForm {
        self.state().form.clone()
    }

    pub fn visible_history(&self) -> Vec<HistoryEntry> {
        self.state().history.visible().cloned().collect()
    }

    pub fn raw_history(&self) -> Vec<HistoryEntry> {
        self.state().history.raw().to_vec()
    }

    pub fn visible_count(&self) -> usize {
        self.state().history.visible_count()
    }

    /// Resolve an id as typed by the user
    pub fn find_entry_id(&self, label: &str) -> AppResult<EntryId> {
        self.state()
            .history
            .find_visible_id(label)
            .ok_or_else(|| AppError::UnknownEntry(EntryId::Text(label.to_string())))
    }
}

fn log_failure(err: &AppError, action: &str) {
    match err {
        AppError::Connection(source) => error!(action, error = %source, "Connection error"),
        other => warn!(action, error = %other, "Request failed"),
    }
}
