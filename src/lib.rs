//! Terminal client for a remote script catalog: browse and search scripts,
//! fill in server-defined forms, run scripts remotely and keep persisted
//! lists of recent and favorite scripts.

pub mod app;
pub mod backend;
pub mod catalog;
pub mod error;
pub mod form;
pub mod form_state;
pub mod logging;
pub mod models;
pub mod persistent_list;
pub mod presenter;
pub mod session;
pub mod settings;
pub mod storage;
pub mod ui;

pub use backend::{HttpBackend, ScriptBackend};
pub use catalog::Catalog;
pub use error::{ConfigError, ExecutionError, LoadError, SessionError, StorageError};
pub use persistent_list::{ListEntry, ListPolicy, PersistentList};
pub use session::{Phase, SessionController, SessionState};
