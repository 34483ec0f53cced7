//! Export and import engine tests against the in-memory backend

use agentflow_sdk::database::{DatabaseBackend, FindCriteria, InMemoryBackend, StoreTable};
use agentflow_sdk::export::{ExportBundle, ExportEngine, ExportSelection};
use agentflow_sdk::import::ImportEngine;
use agentflow_sdk::models::{
    Assistant, AssistantType, Chat, ChatFlow, ChatMessage, ChatMessageFeedback, CustomTemplate,
    DocumentStore, DocumentStoreFileChunk, Execution, FlowType, Requester, Tool, Variable,
};
use agentflow_sdk::{ExecutionState, ServiceError};
use serde_json::{Value, json};

fn requester() -> Requester {
    Requester::new("user-1", "org-1")
}

async fn stored(backend: &InMemoryBackend, table: StoreTable) -> Vec<Value> {
    backend
        .find(table, &FindCriteria::organization("org-1"))
        .await
        .unwrap()
}

/// One row in every category, all references resolvable
fn full_bundle() -> ExportBundle {
    let mut bundle = ExportBundle::new();
    bundle
        .agent_flow
        .push(ChatFlow::new("flow-multi", "Team", FlowType::Multiagent));
    bundle
        .agent_flow_v2
        .push(ChatFlow::new("flow-agent", "Agent", FlowType::Agentflow));
    bundle
        .assistant_flow
        .push(ChatFlow::new("flow-assistant", "Helper", FlowType::Assistant));
    bundle
        .chat_flow
        .push(ChatFlow::new("flow-chat", "Support", FlowType::Chatflow));

    let mut chat = Chat::new("chat-1");
    chat.chatflow_id = Some("flow-chat".to_string());
    bundle.chat.push(chat);

    let mut message = ChatMessage::new("msg-1", "flow-chat", "userMessage", "hello");
    message.chat_id = Some("chat-1".to_string());
    message.execution_id = Some("exec-1".to_string());
    bundle.chat_message.push(message);
    bundle
        .chat_message_feedback
        .push(ChatMessageFeedback::new("fb-1", "flow-chat", "msg-1"));

    bundle
        .assistant_custom
        .push(Assistant::new("asst-custom", AssistantType::Custom));
    bundle
        .assistant_openai
        .push(Assistant::new("asst-openai", AssistantType::Openai));
    bundle
        .assistant_azure
        .push(Assistant::new("asst-azure", AssistantType::Azure));

    let mut template = CustomTemplate::new("tpl-1", "Starter");
    template.usecases = Some(Value::String(r#"["support","sales"]"#.to_string()));
    bundle.custom_template.push(template);

    bundle.document_store.push(DocumentStore::new("store-1", "Docs"));
    bundle
        .document_store_file_chunk
        .push(DocumentStoreFileChunk::new("chunk-1", "store-1", 0, "text"));

    let mut execution = Execution::new("exec-1");
    execution.agentflow_id = Some("flow-agent".to_string());
    execution.state = Some(ExecutionState::Finished);
    bundle.execution.push(execution);

    bundle.tool.push(Tool::new("tool-1", "search"));
    bundle.variable.push(Variable::new("var-1", "region", "eu"));
    bundle
}

mod remap_tests {
    use super::*;

    #[tokio::test]
    async fn test_colliding_flow_id_is_regenerated() {
        let backend = InMemoryBackend::new();
        backend
            .seed(
                StoreTable::ChatFlow,
                vec![json!({"id": "X", "organizationId": "org-2", "type": "CHATFLOW"})],
            )
            .await
            .unwrap();

        let mut bundle = ExportBundle::new();
        bundle.chat_flow.push(ChatFlow::new("X", "Flow", FlowType::Chatflow));
        bundle
            .chat_message
            .push(ChatMessage::new("m1", "X", "userMessage", "hi"));

        let engine = ImportEngine::new(backend.clone());
        let result = engine.import_data(&requester(), bundle).await.unwrap();
        assert_eq!(result.remapped_ids, 1);

        let flows = stored(&backend, StoreTable::ChatFlow).await;
        assert_eq!(flows.len(), 1);
        let new_id = flows[0]["id"].as_str().unwrap();
        assert_ne!(new_id, "X");

        let messages = stored(&backend, StoreTable::ChatMessage).await;
        assert_eq!(messages[0]["chatflowId"], json!(new_id));

        // The other organization's row is untouched
        assert_eq!(backend.row_count(StoreTable::ChatFlow).await, 2);
    }

    #[tokio::test]
    async fn test_flow_ids_inside_flow_data_follow_the_remap() {
        let backend = InMemoryBackend::new();
        backend
            .seed(StoreTable::ChatFlow, vec![json!({"id": "X"})])
            .await
            .unwrap();

        let mut bundle = ExportBundle::new();
        bundle.chat_flow.push(ChatFlow::new("X", "Tool flow", FlowType::Chatflow));
        let mut caller = ChatFlow::new("caller", "Caller", FlowType::Agentflow);
        caller.flow_data = r#"{"nodes": [{"data": {"selectedFlow": "X", "label": "X"}}]}"#.to_string();
        bundle.agent_flow_v2.push(caller);

        ImportEngine::new(backend.clone())
            .import_data(&requester(), bundle)
            .await
            .unwrap();

        let flows = stored(&backend, StoreTable::ChatFlow).await;
        let remapped = flows
            .iter()
            .find(|f| f["name"] == "Tool flow")
            .unwrap()["id"]
            .as_str()
            .unwrap()
            .to_string();
        let caller = flows.iter().find(|f| f["id"] == "caller").unwrap();
        let flow_data: Value = serde_json::from_str(caller["flowData"].as_str().unwrap()).unwrap();
        assert_eq!(flow_data["nodes"][0]["data"]["selectedFlow"], json!(remapped));
        assert_eq!(flow_data["nodes"][0]["data"]["label"], json!(remapped));
    }

    #[tokio::test]
    async fn test_chunks_follow_document_store_remap() {
        let backend = InMemoryBackend::new();
        backend
            .seed(StoreTable::DocumentStore, vec![json!({"id": "store-1"})])
            .await
            .unwrap();

        let mut bundle = ExportBundle::new();
        bundle.document_store.push(DocumentStore::new("store-1", "Docs"));
        bundle
            .document_store_file_chunk
            .push(DocumentStoreFileChunk::new("chunk-1", "store-1", 0, "text"));

        ImportEngine::new(backend.clone())
            .import_data(&requester(), bundle)
            .await
            .unwrap();

        let stores = stored(&backend, StoreTable::DocumentStore).await;
        let chunks = stored(&backend, StoreTable::DocumentStoreFileChunk).await;
        assert_ne!(stores[0]["id"], json!("store-1"));
        assert_eq!(chunks[0]["storeId"], stores[0]["id"]);
    }

    #[tokio::test]
    async fn test_messages_follow_chat_remap() {
        let backend = InMemoryBackend::new();
        backend
            .seed(StoreTable::Chat, vec![json!({"id": "chat-1"})])
            .await
            .unwrap();

        let mut bundle = ExportBundle::new();
        bundle.chat_flow.push(ChatFlow::new("f1", "Flow", FlowType::Chatflow));
        bundle.chat.push(Chat::new("chat-1"));
        let mut message = ChatMessage::new("m1", "f1", "userMessage", "hi");
        message.chat_id = Some("chat-1".to_string());
        bundle.chat_message.push(message);

        let result = ImportEngine::new(backend.clone())
            .import_data(&requester(), bundle)
            .await
            .unwrap();
        assert_eq!(result.remapped_ids, 1);

        let chats = stored(&backend, StoreTable::Chat).await;
        assert_eq!(chats.len(), 1);
        assert_ne!(chats[0]["id"], json!("chat-1"));

        let messages = stored(&backend, StoreTable::ChatMessage).await;
        assert_eq!(messages[0]["chatId"], chats[0]["id"]);
    }

    #[tokio::test]
    async fn test_feedback_follows_message_remap() {
        let backend = InMemoryBackend::new();
        backend
            .seed(StoreTable::ChatMessage, vec![json!({"id": "m1"})])
            .await
            .unwrap();

        let mut bundle = ExportBundle::new();
        bundle.chat_flow.push(ChatFlow::new("f1", "Flow", FlowType::Chatflow));
        bundle
            .chat_message
            .push(ChatMessage::new("m1", "f1", "apiMessage", "answer"));
        bundle
            .chat_message_feedback
            .push(ChatMessageFeedback::new("fb1", "f1", "m1"));

        let result = ImportEngine::new(backend.clone())
            .import_data(&requester(), bundle)
            .await
            .unwrap();
        assert_eq!(result.dropped_feedback, 0);

        let messages = stored(&backend, StoreTable::ChatMessage).await;
        assert_eq!(messages.len(), 1);
        let new_id = messages[0]["id"].clone();
        assert_ne!(new_id, json!("m1"));

        let feedback = stored(&backend, StoreTable::ChatMessageFeedback).await;
        assert_eq!(feedback.len(), 1);
        assert_eq!(feedback[0]["messageId"], new_id);
    }

    #[tokio::test]
    async fn test_concurrent_imports_never_share_an_id() {
        let backend = InMemoryBackend::new();
        let engine = ImportEngine::new(backend.clone());

        let bundle = || {
            let mut bundle = ExportBundle::new();
            bundle
                .chat_flow
                .push(ChatFlow::new("shared", "Flow", FlowType::Chatflow));
            bundle
        };
        let requester = requester();
        let (first, second) = tokio::join!(
            engine.import_data(&requester, bundle()),
            engine.import_data(&requester, bundle())
        );
        let first = first.unwrap();
        let second = second.unwrap();
        assert_eq!(first.remapped_ids + second.remapped_ids, 1);

        let flows = stored(&backend, StoreTable::ChatFlow).await;
        assert_eq!(flows.len(), 2);
        assert_ne!(flows[0]["id"], flows[1]["id"]);
        assert_eq!(backend.open_units(), 0);
    }
}

mod referential_tests {
    use super::*;

    #[tokio::test]
    async fn test_message_with_unknown_flow_is_dropped() {
        let backend = InMemoryBackend::new();
        let mut bundle = ExportBundle::new();
        bundle.chat_flow.push(ChatFlow::new("f1", "Flow", FlowType::Chatflow));
        bundle
            .chat_message
            .push(ChatMessage::new("m1", "f1", "userMessage", "kept"));
        bundle
            .chat_message
            .push(ChatMessage::new("m2", "missing", "userMessage", "dropped"));
        bundle
            .chat_message_feedback
            .push(ChatMessageFeedback::new("fb1", "missing", "m2"));

        let result = ImportEngine::new(backend.clone())
            .import_data(&requester(), bundle)
            .await
            .unwrap();
        assert_eq!(result.dropped_messages, 1);
        assert_eq!(result.dropped_feedback, 1);
        assert_eq!(result.saved_for("ChatMessage"), 1);

        let messages = stored(&backend, StoreTable::ChatMessage).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["id"], "m1");
        assert!(stored(&backend, StoreTable::ChatMessageFeedback).await.is_empty());
    }

    #[tokio::test]
    async fn test_feedback_with_unknown_message_is_dropped() {
        let backend = InMemoryBackend::new();
        let mut bundle = ExportBundle::new();
        bundle.chat_flow.push(ChatFlow::new("f1", "Flow", FlowType::Chatflow));
        bundle
            .chat_message
            .push(ChatMessage::new("m1", "f1", "userMessage", "kept"));
        bundle
            .chat_message_feedback
            .push(ChatMessageFeedback::new("fb1", "f1", "m1"));
        bundle
            .chat_message_feedback
            .push(ChatMessageFeedback::new("fb2", "f1", "ghost"));

        let result = ImportEngine::new(backend.clone())
            .import_data(&requester(), bundle)
            .await
            .unwrap();
        assert_eq!(result.dropped_messages, 0);
        assert_eq!(result.dropped_feedback, 1);

        let feedback = stored(&backend, StoreTable::ChatMessageFeedback).await;
        assert_eq!(feedback.len(), 1);
        assert_eq!(feedback[0]["id"], "fb1");
    }

    #[tokio::test]
    async fn test_message_may_reference_a_stored_flow() {
        let backend = InMemoryBackend::new();
        backend
            .seed(
                StoreTable::ChatFlow,
                vec![json!({"id": "existing", "organizationId": "org-1"})],
            )
            .await
            .unwrap();

        let mut bundle = ExportBundle::new();
        bundle
            .chat_message
            .push(ChatMessage::new("m1", "existing", "apiMessage", "hi"));

        let result = ImportEngine::new(backend.clone())
            .import_data(&requester(), bundle)
            .await
            .unwrap();
        assert_eq!(result.dropped_messages, 0);
        assert_eq!(stored(&backend, StoreTable::ChatMessage).await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_execution_reference_is_cleared() {
        let backend = InMemoryBackend::new();
        let mut bundle = ExportBundle::new();
        bundle.chat_flow.push(ChatFlow::new("f1", "Flow", FlowType::Chatflow));
        let mut message = ChatMessage::new("m1", "f1", "apiMessage", "hi");
        message.execution_id = Some("gone".to_string());
        bundle.chat_message.push(message);

        let result = ImportEngine::new(backend.clone())
            .import_data(&requester(), bundle)
            .await
            .unwrap();
        assert_eq!(result.cleared_execution_refs, 1);

        let messages = stored(&backend, StoreTable::ChatMessage).await;
        assert!(messages[0].get("executionId").is_none_or(Value::is_null));
    }
}

mod transaction_tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_save_rolls_back_every_category() {
        let backend = InMemoryBackend::new();
        backend.fail_saves_for(StoreTable::Variable).await;

        let err = ImportEngine::new(backend.clone())
            .import_data(&requester(), full_bundle())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Internal(_)));
        assert!(err.message().starts_with("import_data - "));

        for table in StoreTable::ALL {
            assert_eq!(backend.row_count(table).await, 0, "{}", table);
        }
        assert_eq!(backend.open_units(), 0);
    }

    #[tokio::test]
    async fn test_missing_requester_is_unauthorized() {
        let backend = InMemoryBackend::new();
        let err = ImportEngine::new(backend.clone())
            .import_data(&Requester::default(), full_bundle())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 401);

        let err = ExportEngine::new(backend.clone())
            .export_data(&ExportSelection::all(), &Requester::new("user-1", " "))
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::Unauthorized("Organization not found".to_string()));
        assert_eq!(backend.open_units(), 0);
    }

    #[tokio::test]
    async fn test_control_characters_in_ids_are_rejected() {
        let backend = InMemoryBackend::new();
        let mut bundle = ExportBundle::new();
        bundle.tool.push(Tool::new("tool\n1", "search"));

        let err = ImportEngine::new(backend.clone())
            .import_data(&requester(), bundle)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 412);
        assert_eq!(backend.open_units(), 0);
    }
}

mod round_trip_tests {
    use super::*;

    #[tokio::test]
    async fn test_export_after_import_matches_saved_counts() {
        let backend = InMemoryBackend::new();
        let mut bundle = full_bundle();
        bundle
            .chat_message
            .push(ChatMessage::new("orphan", "missing", "userMessage", "x"));

        let result = ImportEngine::new(backend.clone())
            .import_data(&requester(), bundle)
            .await
            .unwrap();
        assert_eq!(result.dropped_messages, 1);

        let exported = ExportEngine::new(backend.clone())
            .export_data(&ExportSelection::all(), &requester())
            .await
            .unwrap();
        assert_eq!(exported.counts(), result.saved);
        assert_eq!(exported.total_rows(), 16);
    }

    #[tokio::test]
    async fn test_template_usecases_round_trip() {
        let backend = InMemoryBackend::new();
        ImportEngine::new(backend.clone())
            .import_data(&requester(), full_bundle())
            .await
            .unwrap();

        let templates = stored(&backend, StoreTable::CustomTemplate).await;
        assert_eq!(templates[0]["usecases"], json!(["support", "sales"]));

        let exported = ExportEngine::new(backend.clone())
            .export_data(&ExportSelection::all(), &requester())
            .await
            .unwrap();
        assert_eq!(
            exported.custom_template[0].usecases,
            Some(Value::String(r#"["support","sales"]"#.to_string()))
        );
    }

    #[tokio::test]
    async fn test_export_selection_limits_categories() {
        let backend = InMemoryBackend::new();
        ImportEngine::new(backend.clone())
            .import_data(&requester(), full_bundle())
            .await
            .unwrap();

        let exported = ExportEngine::new(backend.clone())
            .export_value(&json!({"chatflow": true, "tool": true}), &requester())
            .await
            .unwrap();
        assert_eq!(exported.chat_flow.len(), 1);
        assert_eq!(exported.tool.len(), 1);
        assert!(exported.agent_flow.is_empty());
        assert!(exported.variable.is_empty());
        assert_eq!(exported.total_rows(), 2);
    }

    #[tokio::test]
    async fn test_executions_are_scoped_to_the_requesting_user() {
        let backend = InMemoryBackend::new();
        ImportEngine::new(backend.clone())
            .import_data(&requester(), full_bundle())
            .await
            .unwrap();

        let colleague = Requester::new("user-2", "org-1");
        let exported = ExportEngine::new(backend.clone())
            .export_data(&ExportSelection::all(), &colleague)
            .await
            .unwrap();
        assert!(exported.execution.is_empty());
        assert_eq!(exported.tool.len(), 1);
    }
}
