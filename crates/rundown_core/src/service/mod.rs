//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into project, item and element use cases.
//! - Keep callers decoupled from the active storage layout.

pub mod collection;
pub mod coordinator;
pub mod error;
pub mod notifier;
pub mod rundown;

pub use collection::OrderedCollectionService;
pub use coordinator::{ConsistencyCoordinator, SiblingChange};
pub use error::{ServiceError, ServiceResult};
pub use notifier::{ChangeKind, ChangeNotifier, LogNotifier, NullNotifier, ProjectChange};
pub use rundown::RundownService;
