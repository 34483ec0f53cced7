//! Export engine

use super::bundle::ExportBundle;
use super::selection::ExportSelection;
use crate::database::config::DEFAULT_EXPORT_FILE_NAME;
use crate::database::{DatabaseBackend, FindCriteria, StoreTable};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{AssistantType, Entity, FlowType, Requester, Tenant};
use serde::de::DeserializeOwned;
use tracing::info;

const OPERATION: &str = "export_data";

/// Reads a tenant's entities into an [`ExportBundle`].
pub struct ExportEngine<B: DatabaseBackend> {
    backend: B,
    file_name: String,
}

impl<B: DatabaseBackend> ExportEngine<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            file_name: DEFAULT_EXPORT_FILE_NAME.to_string(),
        }
    }

    /// Override the default file name attached to every bundle
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Export the selected categories owned by the requester's organization.
    ///
    /// Executions are additionally restricted to the requester's own rows.
    /// Unselected categories come back empty. Any storage failure fails the
    /// whole export.
    pub async fn export_data(
        &self,
        selection: &ExportSelection,
        requester: &Requester,
    ) -> ServiceResult<ExportBundle> {
        let tenant = requester.tenant()?;
        info!(
            organization_id = %tenant.organization_id,
            categories = ?selection.selected(),
            "exporting data"
        );

        let bundle = self
            .collect(selection, &tenant)
            .await
            .map_err(|e| ServiceError::internal(OPERATION, e))?;

        info!(rows = bundle.total_rows(), "export complete");
        Ok(bundle)
    }

    /// [`export_data`](Self::export_data) with an unvalidated flag map
    pub async fn export_value(
        &self,
        selection: &serde_json::Value,
        requester: &Requester,
    ) -> ServiceResult<ExportBundle> {
        let selection = ExportSelection::from_value(selection)?;
        self.export_data(&selection, requester).await
    }

    async fn collect(
        &self,
        selection: &ExportSelection,
        tenant: &Tenant,
    ) -> ServiceResult<ExportBundle> {
        let org = || FindCriteria::organization(tenant.organization_id.clone());
        let flows = |kind: FlowType| org().with_kind(kind.as_str());
        let assistants = |kind: AssistantType| org().with_kind(kind.as_str());

        let mut bundle = ExportBundle::with_file_name(self.file_name.clone());

        if selection.agentflow {
            bundle.agent_flow = self.load(&flows(FlowType::Multiagent)).await?;
        }
        if selection.agentflowv2 {
            bundle.agent_flow_v2 = self.load(&flows(FlowType::Agentflow)).await?;
        }
        if selection.assistant_custom {
            bundle.assistant_custom = self.load(&assistants(AssistantType::Custom)).await?;
        }
        if selection.assistant_openai {
            bundle.assistant_openai = self.load(&assistants(AssistantType::Openai)).await?;
        }
        if selection.assistant_azure {
            bundle.assistant_azure = self.load(&assistants(AssistantType::Azure)).await?;
        }
        if selection.assistant_flow {
            bundle.assistant_flow = self.load(&flows(FlowType::Assistant)).await?;
        }
        if selection.chatflow {
            bundle.chat_flow = self.load(&flows(FlowType::Chatflow)).await?;
        }
        if selection.chat {
            bundle.chat = self.load(&org()).await?;
        }
        if selection.chat_message {
            bundle.chat_message = self.load(&org()).await?;
        }
        if selection.chat_feedback {
            bundle.chat_message_feedback = self.load(&org()).await?;
        }
        if selection.custom_template {
            bundle.custom_template = self.load(&org()).await?;
            for template in &mut bundle.custom_template {
                template.usecases_to_wire();
            }
        }
        if selection.document_store {
            bundle.document_store = self.load(&org()).await?;
        }
        if selection.document_store_file_chunk {
            bundle.document_store_file_chunk = self.load(&org()).await?;
        }
        if selection.execution {
            let owned = FindCriteria::tenant(tenant.user_id.clone(), tenant.organization_id.clone());
            bundle.execution = self.load(&owned).await?;
        }
        if selection.tool {
            bundle.tool = self.load(&org()).await?;
        }
        if selection.variable {
            bundle.variable = self.load(&org()).await?;
        }

        Ok(bundle)
    }

    async fn load<E: Entity + DeserializeOwned>(
        &self,
        criteria: &FindCriteria,
    ) -> ServiceResult<Vec<E>> {
        let table: StoreTable = E::TABLE;
        let rows = self.backend.find(table, criteria).await?;
        let entities = rows
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<E>, _>>()?;
        info!(table = %table, rows = entities.len(), "loaded rows");
        Ok(entities)
    }
}
