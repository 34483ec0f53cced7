//! Import engine

use super::ImportResult;
use super::remap::IdMapping;
use crate::database::{DatabaseBackend, StoreTable, UnitOfWork};
use crate::error::{ServiceError, ServiceResult};
use crate::export::ExportBundle;
use crate::models::{ChatType, Entity, Requester, Tenant};
use crate::validation::{ValidationResult, validate_entity_id};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

const OPERATION: &str = "import_data";

/// Writes export bundles into a tenant's organization.
pub struct ImportEngine<B: DatabaseBackend> {
    backend: B,
}

impl<B: DatabaseBackend> ImportEngine<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Import a bundle on behalf of `requester`.
    ///
    /// Runs in a single transaction: either every surviving row is committed
    /// or nothing is. The unit of work is released on every exit path.
    pub async fn import_data(
        &self,
        requester: &Requester,
        bundle: ExportBundle,
    ) -> ServiceResult<ImportResult> {
        let tenant = requester.tenant()?;
        validate_bundle(&bundle)?;

        let start = Instant::now();
        let mut unit = self
            .backend
            .connect()
            .await
            .map_err(|e| ServiceError::internal(OPERATION, e))?;

        let outcome = match import_in_unit(&mut unit, &tenant, bundle).await {
            Ok(result) => Ok(result),
            Err(err) => {
                if let Err(rollback_err) = unit.rollback().await {
                    warn!("Failed to roll back import: {}", rollback_err);
                }
                Err(err)
            }
        };
        unit.release().await;

        let mut result = outcome.map_err(|e| ServiceError::internal(OPERATION, e))?;
        result.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            organization_id = %tenant.organization_id,
            saved = result.total_saved(),
            remapped = result.remapped_ids,
            dropped_messages = result.dropped_messages,
            dropped_feedback = result.dropped_feedback,
            "import complete"
        );
        Ok(result)
    }
}

/// Every row in the bundle must carry a usable id
fn validate_bundle(bundle: &ExportBundle) -> ValidationResult<()> {
    fn check<'a>(category: &str, ids: impl Iterator<Item = &'a str>) -> ValidationResult<()> {
        let field = format!("{}.id", category);
        ids.map(|id| validate_entity_id(&field, id)).collect()
    }

    check("AgentFlow", bundle.agent_flow.iter().map(|r| r.id()))?;
    check("AgentFlowV2", bundle.agent_flow_v2.iter().map(|r| r.id()))?;
    check("AssistantFlow", bundle.assistant_flow.iter().map(|r| r.id()))?;
    check("ChatFlow", bundle.chat_flow.iter().map(|r| r.id()))?;
    check("AssistantCustom", bundle.assistant_custom.iter().map(|r| r.id()))?;
    check("AssistantOpenAI", bundle.assistant_openai.iter().map(|r| r.id()))?;
    check("AssistantAzure", bundle.assistant_azure.iter().map(|r| r.id()))?;
    check("Chat", bundle.chat.iter().map(|r| r.id()))?;
    check("ChatMessage", bundle.chat_message.iter().map(|r| r.id()))?;
    check(
        "ChatMessageFeedback",
        bundle.chat_message_feedback.iter().map(|r| r.id()),
    )?;
    check("CustomTemplate", bundle.custom_template.iter().map(|r| r.id()))?;
    check("DocumentStore", bundle.document_store.iter().map(|r| r.id()))?;
    check(
        "DocumentStoreFileChunk",
        bundle.document_store_file_chunk.iter().map(|r| r.id()),
    )?;
    check("Execution", bundle.execution.iter().map(|r| r.id()))?;
    check("Tool", bundle.tool.iter().map(|r| r.id()))?;
    check("Variable", bundle.variable.iter().map(|r| r.id()))
}

/// Regenerate every id in `ids` that already exists in `table` and rewrite
/// the bundle accordingly. Returns the mapping applied.
async fn remap_collisions<U: UnitOfWork>(
    unit: &mut U,
    bundle: &mut ExportBundle,
    table: StoreTable,
    ids: Vec<String>,
) -> ServiceResult<IdMapping> {
    let mut mapping = IdMapping::new();
    if ids.is_empty() {
        return Ok(mapping);
    }

    let existing = unit.existing_ids(table, &ids).await?;
    for id in ids.into_iter().filter(|id| existing.contains(id)) {
        if mapping.get(&id).is_some() {
            continue;
        }
        let new_id = mapping.regenerate(id.clone());
        debug!(table = %table, old_id = %id, new_id = %new_id, "remapped colliding id");
    }

    bundle.apply_mapping(table, &mapping);
    Ok(mapping)
}

/// Ids referenced from the bundle that must be looked up in the store
async fn stored_subset<U: UnitOfWork>(
    unit: &mut U,
    table: StoreTable,
    referenced: impl IntoIterator<Item = String>,
    in_bundle: &HashSet<String>,
) -> ServiceResult<HashSet<String>> {
    let lookup: HashSet<String> = referenced
        .into_iter()
        .filter(|id| !in_bundle.contains(id))
        .collect();
    let lookup: Vec<String> = lookup.into_iter().collect();
    Ok(unit.existing_ids(table, &lookup).await?)
}

async fn save_rows<U: UnitOfWork, E: Entity>(unit: &mut U, rows: &[E]) -> ServiceResult<usize> {
    if rows.is_empty() {
        return Ok(0);
    }
    let values = rows
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(unit.save(E::TABLE, &values).await?)
}

fn stamp<'a, E: Entity + 'a>(rows: impl Iterator<Item = &'a mut E>, tenant: &Tenant) {
    for row in rows {
        row.stamp_tenant(&tenant.user_id, &tenant.organization_id);
    }
}

async fn import_in_unit<U: UnitOfWork>(
    unit: &mut U,
    tenant: &Tenant,
    mut bundle: ExportBundle,
) -> ServiceResult<ImportResult> {
    unit.start_transaction().await?;
    unit.lock_organization(&tenant.organization_id).await?;

    let mut result = ImportResult::default();
    let mut remapped = 0;

    // Flows: all four flow categories share one table and one mapping
    for flow in bundle.flows_mut() {
        if !flow.flow_data.trim().is_empty() {
            flow.normalize_flow_data()?;
        }
    }
    let flow_ids = bundle.flows().map(|f| f.id.clone()).collect();
    remapped += remap_collisions(unit, &mut bundle, StoreTable::ChatFlow, flow_ids)
        .await?
        .len();

    let chat_ids = bundle.chat.iter().map(|c| c.id.clone()).collect();
    remapped += remap_collisions(unit, &mut bundle, StoreTable::Chat, chat_ids)
        .await?
        .len();

    // Messages must point at a flow in the bundle or the store
    let bundle_flows: HashSet<String> = bundle.flows().map(|f| f.id.clone()).collect();
    let referenced_flows = bundle
        .chat_message
        .iter()
        .map(|m| m.chatflow_id.clone())
        .chain(bundle.chat_message_feedback.iter().map(|f| f.chatflow_id.clone()));
    let stored_flows =
        stored_subset(unit, StoreTable::ChatFlow, referenced_flows, &bundle_flows).await?;
    let known_flow = |id: &str| bundle_flows.contains(id) || stored_flows.contains(id);

    bundle.chat_message.retain(|message| {
        let keep = known_flow(&message.chatflow_id);
        if !keep {
            warn!(
                message_id = %message.id,
                chatflow_id = %message.chatflow_id,
                "dropping chat message with unknown flow"
            );
            result.dropped_messages += 1;
        }
        keep
    });

    let message_ids = bundle.chat_message.iter().map(|m| m.id.clone()).collect();
    remapped += remap_collisions(unit, &mut bundle, StoreTable::ChatMessage, message_ids)
        .await?
        .len();

    // Unknown executions are cleared, the message itself is kept
    let bundle_executions: HashSet<String> =
        bundle.execution.iter().map(|e| e.id.clone()).collect();
    let referenced_executions = bundle
        .chat_message
        .iter()
        .filter_map(|m| m.execution_id.clone());
    let stored_executions = stored_subset(
        unit,
        StoreTable::Execution,
        referenced_executions,
        &bundle_executions,
    )
    .await?;
    for message in &mut bundle.chat_message {
        if let Some(execution_id) = &message.execution_id
            && !bundle_executions.contains(execution_id)
            && !stored_executions.contains(execution_id)
        {
            debug!(message_id = %message.id, execution_id = %execution_id, "clearing unknown execution reference");
            message.execution_id = None;
            result.cleared_execution_refs += 1;
        }
    }

    // Feedback needs both its flow and its message
    let bundle_messages: HashSet<String> =
        bundle.chat_message.iter().map(|m| m.id.clone()).collect();
    let referenced_messages = bundle
        .chat_message_feedback
        .iter()
        .map(|f| f.message_id.clone());
    let stored_messages = stored_subset(
        unit,
        StoreTable::ChatMessage,
        referenced_messages,
        &bundle_messages,
    )
    .await?;
    bundle.chat_message_feedback.retain(|feedback| {
        let keep = known_flow(&feedback.chatflow_id)
            && (bundle_messages.contains(&feedback.message_id)
                || stored_messages.contains(&feedback.message_id));
        if !keep {
            warn!(
                feedback_id = %feedback.id,
                message_id = %feedback.message_id,
                "dropping feedback with unresolvable reference"
            );
            result.dropped_feedback += 1;
        }
        keep
    });

    let feedback_ids = bundle
        .chat_message_feedback
        .iter()
        .map(|f| f.id.clone())
        .collect();
    remapped += remap_collisions(unit, &mut bundle, StoreTable::ChatMessageFeedback, feedback_ids)
        .await?
        .len();

    // Independent categories
    let assistant_ids = bundle.assistants().map(|a| a.id.clone()).collect();
    remapped += remap_collisions(unit, &mut bundle, StoreTable::Assistant, assistant_ids)
        .await?
        .len();

    for template in &mut bundle.custom_template {
        template.usecases_from_wire();
    }
    let template_ids = bundle.custom_template.iter().map(|t| t.id.clone()).collect();
    remapped += remap_collisions(unit, &mut bundle, StoreTable::CustomTemplate, template_ids)
        .await?
        .len();

    let store_ids = bundle.document_store.iter().map(|s| s.id.clone()).collect();
    remapped += remap_collisions(unit, &mut bundle, StoreTable::DocumentStore, store_ids)
        .await?
        .len();

    let chunk_ids = bundle
        .document_store_file_chunk
        .iter()
        .map(|c| c.id.clone())
        .collect();
    remapped += remap_collisions(
        unit,
        &mut bundle,
        StoreTable::DocumentStoreFileChunk,
        chunk_ids,
    )
    .await?
    .len();

    let tool_ids = bundle.tool.iter().map(|t| t.id.clone()).collect();
    remapped += remap_collisions(unit, &mut bundle, StoreTable::Tool, tool_ids)
        .await?
        .len();

    let execution_ids = bundle.execution.iter().map(|e| e.id.clone()).collect();
    remapped += remap_collisions(unit, &mut bundle, StoreTable::Execution, execution_ids)
        .await?
        .len();

    let variable_ids = bundle.variable.iter().map(|v| v.id.clone()).collect();
    remapped += remap_collisions(unit, &mut bundle, StoreTable::Variable, variable_ids)
        .await?
        .len();

    // Every row now belongs to the importing tenant
    stamp(bundle.flows_mut(), tenant);
    stamp(bundle.assistants_mut(), tenant);
    stamp(bundle.chat.iter_mut(), tenant);
    for chat in &mut bundle.chat {
        chat.owner_id = Some(tenant.user_id.clone());
    }
    stamp(bundle.chat_message.iter_mut(), tenant);
    for message in &mut bundle.chat_message {
        message.chat_type = Some(ChatType::Internal);
    }
    stamp(bundle.chat_message_feedback.iter_mut(), tenant);
    stamp(bundle.custom_template.iter_mut(), tenant);
    stamp(bundle.document_store.iter_mut(), tenant);
    stamp(bundle.document_store_file_chunk.iter_mut(), tenant);
    stamp(bundle.tool.iter_mut(), tenant);
    stamp(bundle.execution.iter_mut(), tenant);
    stamp(bundle.variable.iter_mut(), tenant);

    let saved = [
        ("AgentFlow", save_rows(unit, &bundle.agent_flow).await?),
        ("AgentFlowV2", save_rows(unit, &bundle.agent_flow_v2).await?),
        ("AssistantFlow", save_rows(unit, &bundle.assistant_flow).await?),
        ("ChatFlow", save_rows(unit, &bundle.chat_flow).await?),
        ("Chat", save_rows(unit, &bundle.chat).await?),
        ("ChatMessage", save_rows(unit, &bundle.chat_message).await?),
        (
            "ChatMessageFeedback",
            save_rows(unit, &bundle.chat_message_feedback).await?,
        ),
        ("AssistantCustom", save_rows(unit, &bundle.assistant_custom).await?),
        ("AssistantOpenAI", save_rows(unit, &bundle.assistant_openai).await?),
        ("AssistantAzure", save_rows(unit, &bundle.assistant_azure).await?),
        ("CustomTemplate", save_rows(unit, &bundle.custom_template).await?),
        ("DocumentStore", save_rows(unit, &bundle.document_store).await?),
        (
            "DocumentStoreFileChunk",
            save_rows(unit, &bundle.document_store_file_chunk).await?,
        ),
        ("Tool", save_rows(unit, &bundle.tool).await?),
        ("Execution", save_rows(unit, &bundle.execution).await?),
        ("Variable", save_rows(unit, &bundle.variable).await?),
    ];
    result.saved = saved
        .into_iter()
        .map(|(category, count)| (category.to_string(), count))
        .collect();

    unit.commit().await?;

    result.remapped_ids = remapped;
    Ok(result)
}
