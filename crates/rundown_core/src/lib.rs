//! Core domain logic for Rundown.
//! This crate is the single source of truth for ordering invariants of the
//! project → item → element hierarchy.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod reorder;
pub mod service;
pub mod store;

pub use config::{ConfigError, CoreConfig, LimitsConfig, LoggingConfig, StorageConfig};
pub use logging::{default_log_level, init_logging, init_logging_from, logging_status, LogInitError};
pub use model::element::{Element, ElementDraft, ElementId, ElementKind};
pub use model::item::{Item, ItemDraft, ItemId, DEFAULT_ITEM_NAME};
pub use model::project::{
    GeneralSettings, Project, ProjectId, ProjectSettings, ProjectSummary, MAX_PROJECTS,
};
pub use model::{Sibling, SiblingLevel};
pub use reorder::{Ranked, Relocation, ReorderError, ReorderOp};
pub use service::{
    ChangeKind, ChangeNotifier, ConsistencyCoordinator, LogNotifier, NullNotifier,
    OrderedCollectionService, ProjectChange, RundownService, ServiceError, ServiceResult,
    SiblingChange,
};
pub use store::{
    Backend, EmbeddedStore, OrderedCollectionStore, ProjectStore, ReferentialStore,
    StorageLayout, StoreError, StoreResult, WriteAck,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
