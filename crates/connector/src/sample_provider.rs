//! Sample extension seeding a provider with one offer: a file asset, a `USE`
//! policy and a contract definition tying the two together.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use spi::{
    Action, Asset, AssetEntry, AssetService, ContractDefinition, ContractDefinitionService,
    Criterion, DataAddress, ExtensionDescriptor, ExtensionError, Policy, PolicyDefinition,
    PolicyDefinitionService, ServiceError, ServiceExtension, ServiceExtensionContext,
    ServiceResult, Timestamp,
};
use tracing::{debug, info};

/// Setting naming the file the sample asset points at.
pub const ASSET_PATH_SETTING: &str = "edc.samples.04.asset.path";
pub const DEFAULT_ASSET_PATH: &str = "/tmp/provider/test-document.txt";

pub const SAMPLE_ASSET_ID: &str = "test-document";
pub const USE_POLICY_ID: &str = "use-eu";
pub const SAMPLE_CONTRACT_DEFINITION_ID: &str = "1";

struct Seed {
    asset_path: PathBuf,
    assets: Arc<dyn AssetService>,
    policies: Arc<dyn PolicyDefinitionService>,
    contract_definitions: Arc<dyn ContractDefinitionService>,
}

/// Seeds the offer once the control-plane services have started. Records that
/// already exist are left as they are.
#[derive(Default)]
pub struct SampleProviderExtension {
    seed: Option<Seed>,
}

impl SampleProviderExtension {
    pub const NAME: &'static str = "sample-provider";
}

#[async_trait]
impl ServiceExtension for SampleProviderExtension {
    fn descriptor(&self) -> ExtensionDescriptor {
        ExtensionDescriptor::named(Self::NAME)
            .requires::<dyn AssetService>()
            .requires::<dyn PolicyDefinitionService>()
            .requires::<dyn ContractDefinitionService>()
    }

    fn initialize(
        &mut self,
        context: &mut ServiceExtensionContext<'_>,
    ) -> Result<(), ExtensionError> {
        let asset_path = context.config().string_or(ASSET_PATH_SETTING, DEFAULT_ASSET_PATH);
        self.seed = Some(Seed {
            asset_path: PathBuf::from(asset_path),
            assets: context.service::<dyn AssetService>()?,
            policies: context.service::<dyn PolicyDefinitionService>()?,
            contract_definitions: context.service::<dyn ContractDefinitionService>()?,
        });
        Ok(())
    }

    async fn start(&mut self) -> Result<(), ExtensionError> {
        let Some(seed) = &self.seed else {
            return Ok(());
        };

        let policy = PolicyDefinition::new(USE_POLICY_ID, Policy::permit(Action::new("USE")));
        seeded("Policy definition", USE_POLICY_ID, seed.policies.create(policy).await)?;

        let entry = AssetEntry {
            asset: Asset::new(SAMPLE_ASSET_ID),
            data_address: file_address(&seed.asset_path),
        };
        seeded("Asset", SAMPLE_ASSET_ID, seed.assets.create(entry).await)?;

        let definition = ContractDefinition {
            id: SAMPLE_CONTRACT_DEFINITION_ID.to_owned(),
            access_policy_id: USE_POLICY_ID.to_owned(),
            contract_policy_id: USE_POLICY_ID.to_owned(),
            asset_selector: vec![Criterion::equals("id", SAMPLE_ASSET_ID)],
            created_at: Timestamp::now(),
        };
        seeded(
            "Contract definition",
            SAMPLE_CONTRACT_DEFINITION_ID,
            seed.contract_definitions.create(definition).await,
        )?;

        info!(
            asset_id = SAMPLE_ASSET_ID,
            path = %seed.asset_path.display(),
            "Sample offer available"
        );
        Ok(())
    }
}

/// A `File` address split into directory and file name.
fn file_address(path: &Path) -> DataAddress {
    let directory = path
        .parent()
        .map(|parent| parent.display().to_string())
        .unwrap_or_default();
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    DataAddress::of_type("File")
        .with("path", directory)
        .with("filename", filename.clone())
        .with("keyName", filename)
}

fn seeded<T>(kind: &str, id: &str, result: ServiceResult<T>) -> Result<(), ExtensionError> {
    match result {
        Ok(_) => {
            debug!(kind, id, "Seeded");
            Ok(())
        }
        Err(ServiceError::Conflict(_)) => {
            debug!(kind, id, "Already present, left unchanged");
            Ok(())
        }
        Err(err) => Err(ExtensionError::recoverable(format!("Could not seed {kind} {id}"))
            .with_source(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boot::Bootstrapper;
    use control_plane_core::{ControlPlaneDefaultServicesExtension, ControlPlaneServicesExtension};
    use iam_mock::MockIamExtension;
    use spi::{AssetIndex, QuerySpec};

    #[tokio::test]
    async fn seeds_asset_policy_and_contract_definition() {
        Bootstrapper::new()
            .without_environment()
            .setting(ASSET_PATH_SETTING, "/srv/offers/report.csv")
            .extension(SampleProviderExtension::default())
            .extension(ControlPlaneDefaultServicesExtension)
            .extension(ControlPlaneServicesExtension)
            .extension(MockIamExtension::default())
            .run(|handle| async move {
                let services = handle.services();
                let address = services
                    .get::<dyn AssetIndex>()
                    .unwrap()
                    .resolve_data_address(SAMPLE_ASSET_ID)
                    .await
                    .unwrap();
                assert_eq!(address.kind(), Some("File"));
                assert_eq!(address.property("path"), Some("/srv/offers"));
                assert_eq!(address.property("filename"), Some("report.csv"));

                let policy = services
                    .get::<dyn PolicyDefinitionService>()
                    .unwrap()
                    .find_by_id(USE_POLICY_ID)
                    .await
                    .unwrap();
                assert_eq!(policy.policy.permissions[0].action.kind, "USE");

                let definitions = services
                    .get::<dyn ContractDefinitionService>()
                    .unwrap()
                    .query(&QuerySpec::all())
                    .await
                    .unwrap();
                assert_eq!(definitions.len(), 1);
                assert_eq!(definitions[0].id, SAMPLE_CONTRACT_DEFINITION_ID);
                assert!(definitions[0].references_policy(USE_POLICY_ID));
            })
            .await
            .unwrap();
    }

    #[test]
    fn existing_records_count_as_seeded() {
        let conflict: ServiceResult<()> = Err(ServiceError::Conflict("exists".into()));
        assert!(seeded("Asset", SAMPLE_ASSET_ID, conflict).is_ok());

        let broken: ServiceResult<()> = Err(ServiceError::Unexpected("disk full".into()));
        let err = seeded("Asset", SAMPLE_ASSET_ID, broken).unwrap_err();
        assert!(!err.is_fatal());
    }

    #[test]
    fn default_path_splits_into_directory_and_file() {
        let address = file_address(Path::new(DEFAULT_ASSET_PATH));
        assert_eq!(address.property("path"), Some("/tmp/provider"));
        assert_eq!(address.property("filename"), Some("test-document.txt"));
    }
}
