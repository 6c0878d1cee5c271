//! Session controller: which script is selected and where it is in the
//! execute/result cycle.
//!
//! ```text
//! Overview -> Selected -> Executing -> ResultShown | ErrorShown -> Selected
//! ```
//!
//! `Overview` is reachable from every state. Execution runs on a worker
//! thread; the event loop calls [`SessionController::poll_execution`] to
//! apply its outcome. While a request is in flight the state is `Executing`,
//! which is the only latch guarding against a second submission.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use tracing::{debug, info, warn};

use crate::backend::ScriptBackend;
use crate::catalog::Catalog;
use crate::error::{ExecutionError, LoadError, SessionError};
use crate::form::{self, RenderableField};
use crate::form_state::FormState;
use crate::models::{ExecutionResult, HealthStatus, Script, ScriptMetadata};
use crate::persistent_list::{ListPolicy, PersistentList};
use crate::presenter::{self, RenderedResult};
use crate::storage::SharedStore;

type ExecutionOutcome = Result<ExecutionResult, ExecutionError>;

/// The script a session is working with.
#[derive(Debug, Clone)]
pub struct ActiveScript {
    pub name: String,
    pub metadata: ScriptMetadata,
    pub fields: Vec<RenderableField>,
    pub form: FormState,
}

#[derive(Debug, Clone)]
pub enum SessionState {
    Overview,
    Selected(ActiveScript),
    Executing(ActiveScript),
    ResultShown(ActiveScript, RenderedResult),
    ErrorShown(ActiveScript, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Overview,
    Selected,
    Executing,
    ResultShown,
    ErrorShown,
}

impl SessionState {
    pub fn phase(&self) -> Phase {
        match self {
            SessionState::Overview => Phase::Overview,
            SessionState::Selected(_) => Phase::Selected,
            SessionState::Executing(_) => Phase::Executing,
            SessionState::ResultShown(..) => Phase::ResultShown,
            SessionState::ErrorShown(..) => Phase::ErrorShown,
        }
    }

    pub fn active(&self) -> Option<&ActiveScript> {
        match self {
            SessionState::Overview => None,
            SessionState::Selected(a)
            | SessionState::Executing(a)
            | SessionState::ResultShown(a, _)
            | SessionState::ErrorShown(a, _) => Some(a),
        }
    }

    fn active_mut(&mut self) -> Option<&mut ActiveScript> {
        match self {
            SessionState::Overview => None,
            SessionState::Selected(a)
            | SessionState::Executing(a)
            | SessionState::ResultShown(a, _)
            | SessionState::ErrorShown(a, _) => Some(a),
        }
    }

    fn into_active(self) -> Option<ActiveScript> {
        match self {
            SessionState::Overview => None,
            SessionState::Selected(a)
            | SessionState::Executing(a)
            | SessionState::ResultShown(a, _)
            | SessionState::ErrorShown(a, _) => Some(a),
        }
    }
}

pub struct SessionController {
    backend: Arc<dyn ScriptBackend>,
    catalog: Catalog,
    recent: PersistentList<Script>,
    favorites: PersistentList<Script>,
    state: SessionState,
    alert: Option<String>,
    pending: Option<Receiver<ExecutionOutcome>>,
    health: Option<HealthStatus>,
}

impl SessionController {
    pub fn new(backend: Arc<dyn ScriptBackend>, store: SharedStore, recent_limit: usize) -> Self {
        let recent = PersistentList::open(ListPolicy::recent(recent_limit), store.clone());
        let favorites = PersistentList::open(ListPolicy::favorites(), store);
        Self::with_lists(backend, recent, favorites)
    }

    pub fn with_lists(
        backend: Arc<dyn ScriptBackend>,
        recent: PersistentList<Script>,
        favorites: PersistentList<Script>,
    ) -> Self {
        Self {
            backend,
            catalog: Catalog::new(),
            recent,
            favorites,
            state: SessionState::Overview,
            alert: None,
            pending: None,
            health: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn active(&self) -> Option<&ActiveScript> {
        self.state.active()
    }

    /// Mutable access to the rendered form, for key input.
    pub fn form_mut(&mut self) -> Option<&mut FormState> {
        self.state.active_mut().map(|a| &mut a.form)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn recent(&self) -> &PersistentList<Script> {
        &self.recent
    }

    pub fn recent_mut(&mut self) -> &mut PersistentList<Script> {
        &mut self.recent
    }

    pub fn favorites(&self) -> &PersistentList<Script> {
        &self.favorites
    }

    pub fn favorites_mut(&mut self) -> &mut PersistentList<Script> {
        &mut self.favorites
    }

    /// Load or config failure waiting to be shown, if any.
    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    pub fn health(&self) -> Option<&HealthStatus> {
        self.health.as_ref()
    }

    pub fn is_executing(&self) -> bool {
        self.phase() == Phase::Executing
    }

    /// Whether the submit control is enabled.
    pub fn can_execute(&self) -> bool {
        matches!(
            self.phase(),
            Phase::Selected | Phase::ResultShown | Phase::ErrorShown
        )
    }

    pub fn is_favorite(&self, name: &str) -> bool {
        self.favorites.contains(name)
    }

    pub fn load_catalog(&mut self) -> Result<usize, LoadError> {
        match self.catalog.load(self.backend.as_ref()) {
            Ok(count) => {
                self.alert = None;
                Ok(count)
            }
            Err(err) => {
                self.alert = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub fn filter(&mut self, term: &str) {
        self.catalog.filter(term);
    }

    pub fn refresh_health(&mut self) -> Option<&HealthStatus> {
        match self.backend.health() {
            Ok(status) => {
                debug!(status = %status.status, "Health check");
                self.health = Some(status);
            }
            Err(err) => {
                debug!(error = %err, "Health check failed");
                self.health = Some(HealthStatus {
                    status: "unreachable".into(),
                    scripts_available: None,
                    error: Some(err.to_string()),
                });
            }
        }
        self.health.as_ref()
    }

    /// Fetches the script's configuration and makes it the current script.
    ///
    /// On failure the state is left untouched and the error is kept as the
    /// current alert.
    pub fn select_script(&mut self, name: &str) -> Result<(), SessionError> {
        if self.is_executing() {
            warn!(script = name, "Selection ignored while an execution is in flight");
            return Err(SessionError::Busy);
        }

        let config = match self.backend.script_config(name) {
            Ok(config) => config,
            Err(err) => {
                warn!(script = name, error = %err, "Failed to load script configuration");
                self.alert = Some(err.to_string());
                return Err(err.into());
            }
        };

        if let Some(snapshot) = self.catalog.find(name).cloned() {
            self.recent.add(snapshot);
        }

        let fields = form::render(&config.form);
        let form = FormState::new(fields.clone());
        info!(script = name, fields = fields.len(), "Script selected");
        self.alert = None;
        self.pending = None;
        self.state = SessionState::Selected(ActiveScript {
            name: name.to_string(),
            metadata: config.metadata,
            fields,
            form,
        });
        Ok(())
    }

    /// Submits the current form values on a worker thread.
    ///
    /// Required fields are not checked; whatever the form holds is sent.
    pub fn execute_script(&mut self) -> Result<(), SessionError> {
        match self.phase() {
            Phase::Overview => return Err(SessionError::NoScript),
            Phase::Executing => return Err(SessionError::Busy),
            _ => {}
        }
        let Some(active) = std::mem::replace(&mut self.state, SessionState::Overview).into_active()
        else {
            return Err(SessionError::NoScript);
        };

        let values = active.form.values();
        let name = active.name.clone();
        let backend = Arc::clone(&self.backend);
        let (tx, rx) = mpsc::channel();

        info!(script = %name, fields = values.len(), "Executing script");
        self.alert = None;
        self.state = SessionState::Executing(active);
        self.pending = Some(rx);

        thread::spawn(move || {
            let outcome = backend.execute(&name, &values);
            // the receiver is gone if the user navigated away
            let _ = tx.send(outcome);
        });
        Ok(())
    }

    /// Applies a finished execution, if any. Returns the new phase when the
    /// controller left `Executing`.
    pub fn poll_execution(&mut self) -> Option<Phase> {
        let received = self.pending.as_ref()?.try_recv();
        match received {
            Ok(outcome) => Some(self.finish_execution(outcome)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                Some(self.finish_execution(Err(ExecutionError::WorkerLost)))
            }
        }
    }

    /// Blocks until the in-flight execution finishes.
    pub fn wait_for_execution(&mut self) -> Option<Phase> {
        let received = self.pending.as_ref()?.recv();
        let outcome = received.unwrap_or(Err(ExecutionError::WorkerLost));
        Some(self.finish_execution(outcome))
    }

    fn finish_execution(&mut self, outcome: ExecutionOutcome) -> Phase {
        self.pending = None;
        let state = std::mem::replace(&mut self.state, SessionState::Overview);
        self.state = match state {
            SessionState::Executing(active) => match outcome {
                Ok(result) => {
                    info!(script = %active.name, "Execution succeeded");
                    SessionState::ResultShown(active, presenter::present(&result))
                }
                Err(err) => {
                    warn!(script = %active.name, error = %err, "Execution failed");
                    SessionState::ErrorShown(active, err.message())
                }
            },
            other => other,
        };
        self.phase()
    }

    /// Empties every field and hides the result or error panel.
    pub fn clear_form(&mut self) {
        let state = std::mem::replace(&mut self.state, SessionState::Overview);
        self.state = match state {
            SessionState::Executing(mut active) => {
                active.form.clear();
                SessionState::Executing(active)
            }
            SessionState::Overview => SessionState::Overview,
            other => match other.into_active() {
                Some(mut active) => {
                    active.form.clear();
                    SessionState::Selected(active)
                }
                None => SessionState::Overview,
            },
        };
        self.alert = None;
    }

    /// Toggles the current script's favorite membership.
    pub fn toggle_favorite(&mut self) -> Result<bool, SessionError> {
        let name = self
            .active()
            .map(|a| a.name.clone())
            .ok_or(SessionError::NoScript)?;
        Ok(self.toggle_favorite_by_name(&name))
    }

    /// Removes `name` from favorites if present, otherwise adds the catalog's
    /// copy. Returns the resulting membership.
    pub fn toggle_favorite_by_name(&mut self, name: &str) -> bool {
        if self.favorites.contains(name) {
            self.favorites.remove(name);
            info!(script = name, "Removed from favorites");
            return false;
        }
        match self.catalog.find(name).cloned() {
            Some(script) => {
                self.favorites.add(script);
                info!(script = name, "Added to favorites");
                true
            }
            None => {
                debug!(script = name, "Cannot favorite a script missing from the catalog");
                false
            }
        }
    }

    pub fn clear_recent(&mut self) {
        self.recent.clear();
    }

    pub fn clear_favorites(&mut self) {
        self.favorites.clear();
    }

    pub fn return_to_overview(&mut self) {
        if self.pending.take().is_some() {
            debug!("Leaving the script view with an execution in flight; its result is dropped");
        }
        self.state = SessionState::Overview;
    }
}
