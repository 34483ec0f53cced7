//! Entity models for the agent flow platform
//!
//! Rows keep the camelCase column names used by the platform's database and
//! carry any column this crate does not interpret in a flattened `extra` map,
//! so an export/import round trip never loses data.

pub mod assistant;
pub mod chat;
pub mod document_store;
pub mod entity;
pub mod enums;
pub mod execution;
pub mod flow;
pub mod library;
pub mod requester;

pub use assistant::Assistant;
pub use chat::{Chat, ChatMessage, ChatMessageFeedback};
pub use document_store::{DocumentStore, DocumentStoreFileChunk};
pub use entity::{Entity, StoreTable};
pub use enums::*;
pub use execution::Execution;
pub use flow::ChatFlow;
pub use library::{CustomTemplate, Tool, Variable};
pub use requester::{Requester, Tenant};
