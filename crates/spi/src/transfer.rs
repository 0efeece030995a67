//! Transfer processes: the consumer-side record of moving an asset's data.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    DataAddress, Mutation, QuerySpec, ServiceResult, ServiceType, StoreResult, Timestamp,
};

/// State of a transfer process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferState {
    /// Created, nothing sent yet.
    Initial,
    /// The request was handed to the provider.
    Requested,
    /// Data is flowing.
    Started,
    /// Data was delivered.
    Completed,
    /// The transfer was aborted.
    Terminated,
}

impl TransferState {
    /// Final states accept no further transitions.
    pub fn is_final(self) -> bool {
        matches!(self, Self::Completed | Self::Terminated)
    }
}

impl std::fmt::Display for TransferState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Initial => "INITIAL",
            Self::Requested => "REQUESTED",
            Self::Started => "STARTED",
            Self::Completed => "COMPLETED",
            Self::Terminated => "TERMINATED",
        };
        f.write_str(name)
    }
}

/// Request to start a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// Address of the providing connector.
    pub connector_address: String,
    /// Agreement under which the data is transferred.
    pub contract_id: String,
    /// The asset to transfer.
    pub asset_id: String,
    /// Where the data should be delivered.
    pub data_destination: DataAddress,
    /// Protocol used to talk to the provider.
    #[serde(default = "crate::contract::default_protocol")]
    pub protocol: String,
}

/// Consumer-side record of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferProcess {
    /// Unique id.
    pub id: String,
    /// The original request.
    pub request: TransferRequest,
    /// Current state.
    pub state: TransferState,
    /// Why the transfer was terminated, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    /// When the process was created.
    pub created_at: Timestamp,
    /// When the state last changed.
    pub updated_at: Timestamp,
}

impl TransferProcess {
    /// The asset being transferred.
    pub fn asset_id(&self) -> &str {
        &self.request.asset_id
    }
}

/// Persistence of transfer processes.
#[async_trait]
pub trait TransferProcessStore: Send + Sync {
    /// Looks up a process.
    async fn find_by_id(&self, id: &str) -> Option<TransferProcess>;

    /// Returns processes matching `spec`.
    async fn query(&self, spec: &QuerySpec) -> Vec<TransferProcess>;

    /// Inserts or replaces a process.
    async fn save(&self, process: TransferProcess);

    /// Applies `mutation` to the stored process and returns the result. No
    /// other write to the same store interleaves with the check and change.
    async fn update_with(
        &self,
        id: &str,
        mutation: Mutation<'_, TransferProcess>,
    ) -> StoreResult<TransferProcess>;
}

impl ServiceType for dyn TransferProcessStore {
    const NAME: &'static str = "transfer-process-store";
}

/// Transfer operations available to the management layer.
#[async_trait]
pub trait TransferProcessService: Send + Sync {
    /// Starts a transfer.
    async fn initiate(&self, request: TransferRequest) -> ServiceResult<TransferProcess>;

    /// Looks up a process.
    async fn find_by_id(&self, id: &str) -> ServiceResult<TransferProcess>;

    /// Lists processes.
    async fn query(&self, spec: &QuerySpec) -> ServiceResult<Vec<TransferProcess>>;

    /// Marks a requested or started process as completed.
    async fn complete(&self, id: &str) -> ServiceResult<TransferProcess>;

    /// Terminates a non-final process.
    async fn terminate(&self, id: &str, reason: &str) -> ServiceResult<TransferProcess>;
}

impl ServiceType for dyn TransferProcessService {
    const NAME: &'static str = "transfer-process-service";
}
