//! Agentflow SDK - execution trees and tenant data transfer for agent flow platforms
//!
//! Provides:
//! - Execution tree reconstruction from flat run logs, with loop passes
//!   grouped under synthesized iteration nodes
//! - Export of a tenant's entities into a portable bundle
//! - Transactional import of a bundle with id collision remapping
//! - Storage backends (in-memory, PostgreSQL) behind one async interface

pub mod database;
pub mod error;
pub mod execution;
pub mod export;
pub mod import;
pub mod json;
pub mod models;
pub mod validation;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export commonly used types
pub use database::{
    AgentflowConfig, DatabaseBackend, DatabaseError, DatabaseResult, FindCriteria,
    InMemoryBackend, UnitOfWork,
};
#[cfg(feature = "postgres-backend")]
pub use database::PostgresBackend;
pub use error::{ServiceError, ServiceResult};
pub use execution::{
    ExecutionEvent, ExecutionTreeBuilder, TreeNode, build_execution_tree, find_node, run_status,
};
pub use export::{ExportBundle, ExportEngine, ExportSelection};
pub use import::{IdMapping, ImportEngine, ImportResult};
pub use validation::{ValidationError, ValidationResult};

// Re-export models
pub use models::enums::*;
pub use models::{
    Assistant, Chat, ChatFlow, ChatMessage, ChatMessageFeedback, CustomTemplate, DocumentStore,
    DocumentStoreFileChunk, Entity, Execution, Requester, StoreTable, Tool, Variable,
};
