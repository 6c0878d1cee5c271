#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use serde_json::json;
use tymbr_tui::models::{
    ExecutionResult, FieldDescriptor, FormValues, HealthStatus, Script, ScriptConfig,
    ScriptMetadata,
};
use tymbr_tui::backend::ConfigResponse;
use tymbr_tui::storage::MemoryStore;
use tymbr_tui::{ConfigError, ExecutionError, LoadError, ScriptBackend, SessionController};

type Handler = Box<dyn Fn(&str, &FormValues) -> Result<ExecutionResult, ExecutionError> + Send + Sync>;

/// In-process backend with canned catalog and configs.
pub struct FakeBackend {
    pub scripts: Mutex<Result<Vec<Script>, LoadError>>,
    pub configs: HashMap<String, Result<ScriptConfig, ConfigError>>,
    pub submissions: Mutex<Vec<(String, FormValues)>>,
    handler: Handler,
    gate: Mutex<Option<Receiver<()>>>,
}

impl FakeBackend {
    pub fn new(scripts: Vec<Script>) -> Self {
        let configs = scripts
            .iter()
            .map(|s| {
                let config = ScriptConfig {
                    metadata: ScriptMetadata {
                        name: s.title.clone(),
                        description: s.description.clone(),
                        version: s.version.clone(),
                        author: s.author.clone(),
                    },
                    form: Vec::new(),
                };
                (s.name.clone(), Ok(config))
            })
            .collect();
        Self {
            scripts: Mutex::new(Ok(scripts)),
            configs,
            submissions: Mutex::new(Vec::new()),
            handler: Box::new(|_, _| {
                Ok(ExecutionResult {
                    result: json!("ok"),
                    metadata: None,
                })
            }),
            gate: Mutex::new(None),
        }
    }

    pub fn with_form(mut self, name: &str, form: Vec<FieldDescriptor>) -> Self {
        if let Some(Ok(config)) = self.configs.get_mut(name) {
            config.form = form;
        }
        self
    }

    pub fn with_config_error(mut self, name: &str, message: &str) -> Self {
        self.configs.insert(
            name.to_string(),
            Err(ConfigError::Server {
                script: name.to_string(),
                message: message.to_string(),
            }),
        );
        self
    }

    /// Installs a config decoded from a raw server payload.
    pub fn with_config_json(mut self, name: &str, payload: serde_json::Value) -> Self {
        let response: ConfigResponse = serde_json::from_value(payload).unwrap();
        self.configs
            .insert(name.to_string(), response.into_result(name));
        self
    }

    pub fn on_execute(
        mut self,
        handler: impl Fn(&str, &FormValues) -> Result<ExecutionResult, ExecutionError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.handler = Box::new(handler);
        self
    }

    /// Makes every execution block until the returned sender fires.
    pub fn gated(self) -> (Self, Sender<()>) {
        let (tx, rx) = mpsc::channel();
        *self.gate.lock().unwrap() = Some(rx);
        (self, tx)
    }
}

impl ScriptBackend for FakeBackend {
    fn list_scripts(&self) -> Result<Vec<Script>, LoadError> {
        self.scripts.lock().unwrap().clone()
    }

    fn script_config(&self, name: &str) -> Result<ScriptConfig, ConfigError> {
        self.configs
            .get(name)
            .cloned()
            .unwrap_or_else(|| {
                Err(ConfigError::Server {
                    script: name.to_string(),
                    message: format!("Script '{name}' not found"),
                })
            })
    }

    fn execute(&self, name: &str, values: &FormValues) -> Result<ExecutionResult, ExecutionError> {
        if let Some(gate) = self.gate.lock().unwrap().as_ref() {
            let _ = gate.recv();
        }
        self.submissions
            .lock()
            .unwrap()
            .push((name.to_string(), values.clone()));
        (self.handler)(name, values)
    }

    fn health(&self) -> Result<HealthStatus, LoadError> {
        Ok(HealthStatus {
            status: "healthy".into(),
            scripts_available: self.scripts.lock().unwrap().as_ref().ok().map(Vec::len),
            error: None,
        })
    }
}

pub fn script(name: &str, title: &str) -> Script {
    Script {
        name: name.to_string(),
        title: title.to_string(),
        description: format!("{title} description"),
        version: None,
        author: None,
    }
}

pub fn field(name: &str, field_type: &str) -> FieldDescriptor {
    FieldDescriptor {
        name: name.to_string(),
        label: name.to_uppercase(),
        field_type: field_type.to_string(),
        required: false,
        default: None,
        placeholder: None,
        min: None,
        max: None,
        options: Vec::new(),
    }
}

pub fn controller(backend: FakeBackend) -> (SessionController, Arc<FakeBackend>, Arc<MemoryStore>) {
    let backend = Arc::new(backend);
    let store = Arc::new(MemoryStore::new());
    let mut controller = SessionController::new(backend.clone(), store.clone(), 5);
    controller.load_catalog().unwrap();
    (controller, backend, store)
}
