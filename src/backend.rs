//! Remote script backend: catalog, per-script configuration, execution and
//! health endpoints.
//!
//! Every response may carry an `error` field. A non-empty `error` is treated
//! exactly like a transport failure.

use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

use crate::error::{ConfigError, ExecutionError, LoadError};
use crate::models::{
    ExecutionResult, FieldDescriptor, FormValues, HealthStatus, Script, ScriptConfig,
    ScriptMetadata,
};

pub trait ScriptBackend: Send + Sync {
    fn list_scripts(&self) -> Result<Vec<Script>, LoadError>;

    fn script_config(&self, name: &str) -> Result<ScriptConfig, ConfigError>;

    fn execute(&self, name: &str, values: &FormValues) -> Result<ExecutionResult, ExecutionError>;

    fn health(&self) -> Result<HealthStatus, LoadError> {
        Err(LoadError::Transport("health check not supported".into()))
    }
}

#[derive(Debug, Deserialize)]
pub struct CatalogResponse {
    #[serde(default)]
    pub scripts: Vec<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConfigResponse {
    #[serde(default)]
    pub metadata: Option<ScriptMetadata>,
    #[serde(default)]
    pub form: Vec<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExecutionResponse {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A non-empty server `error` field, if any.
fn reported(error: Option<String>) -> Option<String> {
    error.filter(|e| !e.is_empty())
}

impl CatalogResponse {
    pub fn into_result(self) -> Result<Vec<Script>, LoadError> {
        match reported(self.error) {
            Some(message) => Err(LoadError::Server(message)),
            None => Ok(self
                .scripts
                .into_iter()
                .filter_map(|entry| match serde_json::from_value::<Script>(entry) {
                    Ok(script) => Some(script),
                    Err(err) => {
                        warn!(error = %err, "Skipping unreadable catalog entry");
                        None
                    }
                })
                .collect()),
        }
    }
}

impl ConfigResponse {
    pub fn into_result(self, script: &str) -> Result<ScriptConfig, ConfigError> {
        if let Some(message) = reported(self.error) {
            return Err(ConfigError::Server {
                script: script.to_string(),
                message,
            });
        }
        let metadata = self.metadata.ok_or_else(|| ConfigError::Decode {
            script: script.to_string(),
            message: "missing metadata section".into(),
        })?;
        let form = self
            .form
            .into_iter()
            .enumerate()
            .map(|(position, entry)| FieldDescriptor::from_entry(position, entry))
            .collect();
        Ok(ScriptConfig { metadata, form })
    }
}

impl ExecutionResponse {
    pub fn into_result(self) -> Result<ExecutionResult, ExecutionError> {
        match reported(self.error) {
            Some(message) => Err(ExecutionError::Server(message)),
            None => Ok(ExecutionResult {
                result: self.result,
                metadata: self.metadata,
            }),
        }
    }
}

enum RequestFailure {
    Transport(String),
    Decode(String),
}

/// Blocking HTTP implementation of [`ScriptBackend`].
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    /// `timeout` of `None` means requests never time out.
    pub fn new(base: Url, timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        info!(server = %base, ?timeout, "HTTP backend configured");
        Ok(Self { client, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn decode<R: DeserializeOwned>(response: Response) -> Result<R, RequestFailure> {
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| RequestFailure::Transport(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                RequestFailure::Decode(e.to_string())
            } else {
                RequestFailure::Transport(format!("server responded with {status}"))
            }
        })
    }

    fn get_json<R: DeserializeOwned>(&self, url: Url) -> Result<R, RequestFailure> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| RequestFailure::Transport(e.to_string()))?;
        Self::decode(response)
    }
}

impl ScriptBackend for HttpBackend {
    #[instrument(skip(self))]
    fn list_scripts(&self) -> Result<Vec<Script>, LoadError> {
        let url = self.endpoint(&["api", "scripts"]);
        let response: CatalogResponse = self.get_json(url).map_err(|e| match e {
            RequestFailure::Transport(m) => LoadError::Transport(m),
            RequestFailure::Decode(m) => LoadError::Decode(m),
        })?;
        let scripts = response.into_result()?;
        info!(count = scripts.len(), "Fetched catalog");
        Ok(scripts)
    }

    #[instrument(skip(self))]
    fn script_config(&self, name: &str) -> Result<ScriptConfig, ConfigError> {
        let url = self.endpoint(&["api", "scripts", name, "config"]);
        let response: ConfigResponse = self.get_json(url).map_err(|e| match e {
            RequestFailure::Transport(message) => ConfigError::Transport {
                script: name.to_string(),
                message,
            },
            RequestFailure::Decode(message) => ConfigError::Decode {
                script: name.to_string(),
                message,
            },
        })?;
        let config = response.into_result(name)?;
        debug!(fields = config.form.len(), "Fetched script configuration");
        Ok(config)
    }

    #[instrument(skip(self, values), fields(fields = values.len()))]
    fn execute(&self, name: &str, values: &FormValues) -> Result<ExecutionResult, ExecutionError> {
        let url = self.endpoint(&["api", "scripts", name, "execute"]);
        debug!(%url, "POST");
        let response = self
            .client
            .post(url)
            .json(values)
            .send()
            .map_err(|e| ExecutionError::Transport(e.to_string()))?;
        let response: ExecutionResponse = Self::decode(response).map_err(|e| match e {
            RequestFailure::Transport(m) => ExecutionError::Transport(m),
            RequestFailure::Decode(m) => ExecutionError::Decode(m),
        })?;
        response.into_result().inspect_err(|err| {
            warn!(script = name, error = %err, "Execution reported an error");
        })
    }

    fn health(&self) -> Result<HealthStatus, LoadError> {
        let url = self.endpoint(&["api", "health"]);
        self.get_json(url).map_err(|e| match e {
            RequestFailure::Transport(m) => LoadError::Transport(m),
            RequestFailure::Decode(m) => LoadError::Decode(m),
        })
    }
}
