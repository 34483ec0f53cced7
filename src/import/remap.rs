//! Collision remapping and reference rewriting
//!
//! When an imported id already exists in the target store it is replaced by
//! a fresh id. The replacement then has to reach every place the old id is
//! referenced from:
//!
//! - the primary id of the remapped rows
//! - the declared foreign-key fields in [`FOREIGN_KEYS`]
//! - exact string values inside the JSON blobs carried by flows, assistants,
//!   templates and executions
//!
//! Substrings are never touched, so an id that happens to appear inside
//! unrelated text is left alone.

use crate::export::ExportBundle;
use crate::json::replace_strings_in_text;
use crate::models::StoreTable;
use std::collections::HashMap;
use uuid::Uuid;

/// Old id to new id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdMapping {
    map: HashMap<String, String>,
}

impl IdMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh id for `old` and record it
    pub fn regenerate(&mut self, old: impl Into<String>) -> String {
        let new_id = Uuid::new_v4().to_string();
        self.map.insert(old.into(), new_id.clone());
        new_id
    }

    pub fn insert(&mut self, old: impl Into<String>, new: impl Into<String>) {
        self.map.insert(old.into(), new.into());
    }

    pub fn get(&self, old: &str) -> Option<&str> {
        self.map.get(old).map(String::as_str)
    }

    /// Mapped id, or the input when it was not remapped
    pub fn resolve<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).unwrap_or(id)
    }

    pub fn extend(&mut self, other: &IdMapping) {
        self.map
            .extend(other.map.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.map
    }
}

/// A string field that holds the id of a row in another table
#[derive(Debug, Clone, Copy)]
pub struct ForeignKey {
    /// Table holding the field
    pub table: StoreTable,
    /// Wire name of the field
    pub field: &'static str,
    /// Table the field points into
    pub references: StoreTable,
    rewrite: fn(&mut ExportBundle, &IdMapping) -> usize,
}

fn remap_required(field: &mut String, mapping: &IdMapping) -> usize {
    match mapping.get(field) {
        Some(new_id) => {
            *field = new_id.to_string();
            1
        }
        None => 0,
    }
}

fn remap_optional(field: &mut Option<String>, mapping: &IdMapping) -> usize {
    field.as_mut().map_or(0, |value| remap_required(value, mapping))
}

/// Every foreign key carried by bundle rows
pub const FOREIGN_KEYS: &[ForeignKey] = &[
    ForeignKey {
        table: StoreTable::Chat,
        field: "chatflowId",
        references: StoreTable::ChatFlow,
        rewrite: |bundle, mapping| {
            bundle
                .chat
                .iter_mut()
                .map(|chat| remap_optional(&mut chat.chatflow_id, mapping))
                .sum()
        },
    },
    ForeignKey {
        table: StoreTable::ChatMessage,
        field: "chatflowId",
        references: StoreTable::ChatFlow,
        rewrite: |bundle, mapping| {
            bundle
                .chat_message
                .iter_mut()
                .map(|message| remap_required(&mut message.chatflow_id, mapping))
                .sum()
        },
    },
    ForeignKey {
        table: StoreTable::ChatMessage,
        field: "chatId",
        references: StoreTable::Chat,
        rewrite: |bundle, mapping| {
            bundle
                .chat_message
                .iter_mut()
                .map(|message| remap_optional(&mut message.chat_id, mapping))
                .sum()
        },
    },
    ForeignKey {
        table: StoreTable::ChatMessage,
        field: "executionId",
        references: StoreTable::Execution,
        rewrite: |bundle, mapping| {
            bundle
                .chat_message
                .iter_mut()
                .map(|message| remap_optional(&mut message.execution_id, mapping))
                .sum()
        },
    },
    ForeignKey {
        table: StoreTable::ChatMessageFeedback,
        field: "chatflowId",
        references: StoreTable::ChatFlow,
        rewrite: |bundle, mapping| {
            bundle
                .chat_message_feedback
                .iter_mut()
                .map(|feedback| remap_required(&mut feedback.chatflow_id, mapping))
                .sum()
        },
    },
    ForeignKey {
        table: StoreTable::ChatMessageFeedback,
        field: "chatId",
        references: StoreTable::Chat,
        rewrite: |bundle, mapping| {
            bundle
                .chat_message_feedback
                .iter_mut()
                .map(|feedback| remap_optional(&mut feedback.chat_id, mapping))
                .sum()
        },
    },
    ForeignKey {
        table: StoreTable::ChatMessageFeedback,
        field: "messageId",
        references: StoreTable::ChatMessage,
        rewrite: |bundle, mapping| {
            bundle
                .chat_message_feedback
                .iter_mut()
                .map(|feedback| remap_required(&mut feedback.message_id, mapping))
                .sum()
        },
    },
    ForeignKey {
        table: StoreTable::DocumentStoreFileChunk,
        field: "storeId",
        references: StoreTable::DocumentStore,
        rewrite: |bundle, mapping| {
            bundle
                .document_store_file_chunk
                .iter_mut()
                .map(|chunk| remap_required(&mut chunk.store_id, mapping))
                .sum()
        },
    },
    ForeignKey {
        table: StoreTable::Execution,
        field: "agentflowId",
        references: StoreTable::ChatFlow,
        rewrite: |bundle, mapping| {
            bundle
                .execution
                .iter_mut()
                .map(|execution| remap_optional(&mut execution.agentflow_id, mapping))
                .sum()
        },
    },
];

/// Foreign keys pointing into `table`
pub fn foreign_keys_into(table: StoreTable) -> impl Iterator<Item = &'static ForeignKey> {
    FOREIGN_KEYS.iter().filter(move |fk| fk.references == table)
}

fn remap_primary_ids(bundle: &mut ExportBundle, table: StoreTable, mapping: &IdMapping) -> usize {
    fn ids<'a>(ids: impl Iterator<Item = &'a mut String>, mapping: &IdMapping) -> usize {
        ids.map(|id| remap_required(id, mapping)).sum()
    }

    match table {
        StoreTable::ChatFlow => ids(bundle.flows_mut().map(|f| &mut f.id), mapping),
        StoreTable::Chat => ids(bundle.chat.iter_mut().map(|c| &mut c.id), mapping),
        StoreTable::ChatMessage => ids(bundle.chat_message.iter_mut().map(|m| &mut m.id), mapping),
        StoreTable::ChatMessageFeedback => ids(
            bundle.chat_message_feedback.iter_mut().map(|f| &mut f.id),
            mapping,
        ),
        StoreTable::Assistant => ids(bundle.assistants_mut().map(|a| &mut a.id), mapping),
        StoreTable::CustomTemplate => ids(
            bundle.custom_template.iter_mut().map(|t| &mut t.id),
            mapping,
        ),
        StoreTable::DocumentStore => ids(
            bundle.document_store.iter_mut().map(|s| &mut s.id),
            mapping,
        ),
        StoreTable::DocumentStoreFileChunk => ids(
            bundle.document_store_file_chunk.iter_mut().map(|c| &mut c.id),
            mapping,
        ),
        StoreTable::Tool => ids(bundle.tool.iter_mut().map(|t| &mut t.id), mapping),
        StoreTable::Variable => ids(bundle.variable.iter_mut().map(|v| &mut v.id), mapping),
        StoreTable::Execution => ids(bundle.execution.iter_mut().map(|e| &mut e.id), mapping),
    }
}

/// Replace exact id values inside every embedded JSON blob
fn remap_blobs(bundle: &mut ExportBundle, mapping: &IdMapping) -> usize {
    let map = mapping.as_map();
    let mut replaced = 0;
    for flow in bundle.flows_mut() {
        replaced += replace_strings_in_text(&mut flow.flow_data, map);
    }
    for assistant in bundle.assistants_mut() {
        replaced += replace_strings_in_text(&mut assistant.details, map);
    }
    for template in &mut bundle.custom_template {
        if let Some(flow_data) = template.flow_data.as_mut() {
            replaced += replace_strings_in_text(flow_data, map);
        }
    }
    for execution in &mut bundle.execution {
        replaced += replace_strings_in_text(&mut execution.execution_data, map);
    }
    replaced
}

impl ExportBundle {
    /// Apply a remap of `table`'s ids to the whole bundle. Returns the number
    /// of values rewritten.
    pub fn apply_mapping(&mut self, table: StoreTable, mapping: &IdMapping) -> usize {
        if mapping.is_empty() {
            return 0;
        }
        let mut rewritten = remap_primary_ids(self, table, mapping);
        for fk in foreign_keys_into(table) {
            rewritten += (fk.rewrite)(self, mapping);
        }
        rewritten + remap_blobs(self, mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ChatFlow, ChatMessage, ChatMessageFeedback, DocumentStore, DocumentStoreFileChunk,
        FlowType,
    };

    #[test]
    fn test_flow_remap_follows_declared_fields() {
        let mut bundle = ExportBundle::new();
        bundle.chat_flow.push(ChatFlow::new("X", "Flow", FlowType::Chatflow));
        bundle
            .chat_message
            .push(ChatMessage::new("m1", "X", "userMessage", "hello X"));
        bundle
            .chat_message_feedback
            .push(ChatMessageFeedback::new("fb1", "X", "m1"));

        let mut mapping = IdMapping::new();
        mapping.insert("X", "Y");
        let rewritten = bundle.apply_mapping(StoreTable::ChatFlow, &mapping);

        assert_eq!(rewritten, 3);
        assert_eq!(bundle.chat_flow[0].id, "Y");
        assert_eq!(bundle.chat_message[0].chatflow_id, "Y");
        assert_eq!(bundle.chat_message_feedback[0].chatflow_id, "Y");
        // Free text is not a reference
        assert_eq!(bundle.chat_message[0].content, "hello X");
    }

    #[test]
    fn test_blob_rewrite_is_exact_match() {
        let mut bundle = ExportBundle::new();
        let mut flow = ChatFlow::new("f1", "Flow", FlowType::Agentflow);
        flow.flow_data = r#"{"nodes":[{"data":{"chatflowId":"X","label":"X-ray"}}]}"#.to_string();
        bundle.agent_flow_v2.push(flow);

        let mut mapping = IdMapping::new();
        mapping.insert("X", "Y");
        bundle.apply_mapping(StoreTable::ChatFlow, &mapping);

        assert_eq!(
            bundle.agent_flow_v2[0].flow_data,
            r#"{"nodes":[{"data":{"chatflowId":"Y","label":"X-ray"}}]}"#
        );
    }

    #[test]
    fn test_document_store_remap_moves_chunks() {
        let mut bundle = ExportBundle::new();
        bundle.document_store.push(DocumentStore::new("s1", "Docs"));
        bundle
            .document_store_file_chunk
            .push(DocumentStoreFileChunk::new("c1", "s1", 0, "text"));

        let mut mapping = IdMapping::new();
        let new_id = mapping.regenerate("s1");
        bundle.apply_mapping(StoreTable::DocumentStore, &mapping);

        assert_eq!(bundle.document_store[0].id, new_id);
        assert_eq!(bundle.document_store_file_chunk[0].store_id, new_id);
    }

    #[test]
    fn test_every_foreign_key_references_a_different_table() {
        for fk in FOREIGN_KEYS {
            assert_ne!(fk.table, fk.references, "{}", fk.field);
        }
        assert_eq!(foreign_keys_into(StoreTable::ChatFlow).count(), 4);
    }
}
