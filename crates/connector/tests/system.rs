//! End-to-end: the bundled catalog booted on ephemeral ports, driven over HTTP.

use boot::{Bootstrapper, RuntimeManifest};
use connector::{catalog, manifest};
use spi::BootError;
use serde_json::{json, Value};
use web_server::{WebServer, DEFAULT_CONTEXT};

const API_KEY: &str = "system-test-key";

/// The management context comes from the configuration file; everything else
/// from overrides.
fn bootstrapper(config_dir: &tempfile::TempDir) -> Bootstrapper {
    let file = config_dir.path().join("connector-configuration.toml");
    std::fs::write(
        &file,
        r#"
[web.http.management]
port = 0
path = "/api/v1/management"
"#,
    )
    .unwrap();

    Bootstrapper::new()
        .without_environment()
        .setting("edc.connector.name", "system-test")
        .setting("edc.api.auth.key", API_KEY)
        .setting("edc.fs.config", file.display().to_string())
        .setting("web.http.host", "127.0.0.1")
        .setting("web.http.port", "0")
}

#[tokio::test]
async fn full_catalog_serves_the_management_api() {
    let catalog = catalog();
    let manifest = manifest(&catalog, None).unwrap();
    let dir = tempfile::tempdir().unwrap();

    let runtime = catalog
        .bootstrapper_from(bootstrapper(&dir), &manifest)
        .unwrap()
        .boot()
        .await
        .unwrap();
    assert_eq!(runtime.connector_name(), "system-test");

    runtime
        .run(|handle| async move {
            let web = handle.services().get::<dyn WebServer>().unwrap();
            let default = web.local_addr(DEFAULT_CONTEXT).unwrap();
            let management = web.local_addr("management").unwrap();
            let base = format!("http://{management}/api/v1/management");
            let client = reqwest::Client::new();

            let health = client
                .get(format!("http://{default}/api/check/health"))
                .send()
                .await
                .unwrap();
            assert!(health.status().is_success());

            let unauthenticated = client.get(format!("{base}/assets")).send().await.unwrap();
            assert_eq!(unauthenticated.status(), reqwest::StatusCode::UNAUTHORIZED);

            let created = client
                .post(format!("{base}/assets"))
                .header("x-api-key", API_KEY)
                .json(&json!({
                    "asset": { "id": "report", "properties": { "type": "file" } },
                    "dataAddress": { "properties": { "type": "File", "path": "/tmp/report.txt" } }
                }))
                .send()
                .await
                .unwrap();
            assert!(created.status().is_success());

            let seeded = client
                .get(format!("{base}/contractdefinitions/1"))
                .header("x-api-key", API_KEY)
                .send()
                .await
                .unwrap();
            assert!(seeded.status().is_success());

            let process: Value = client
                .post(format!("{base}/transferprocess"))
                .header("x-api-key", API_KEY)
                .json(&json!({
                    "connectorAddress": "http://provider:8282/api/v1/ids/data",
                    "contractId": "contract-1",
                    "assetId": "report",
                    "dataDestination": { "properties": { "type": "File", "path": "/tmp/out.txt" } }
                }))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            let id = process["id"].as_str().unwrap().to_owned();

            let in_use = client
                .delete(format!("{base}/assets/report"))
                .header("x-api-key", API_KEY)
                .send()
                .await
                .unwrap();
            assert_eq!(in_use.status(), reqwest::StatusCode::CONFLICT);

            let completed: Value = client
                .post(format!("{base}/transferprocess/{id}/complete"))
                .header("x-api-key", API_KEY)
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            assert_eq!(completed["state"], "COMPLETED");
        })
        .await;
}

#[tokio::test]
async fn manifest_selects_a_subset_of_the_catalog() {
    let catalog = catalog();
    let manifest = RuntimeManifest::from_toml_str(
        r#"
name = "identity-only"
extensions = ["iam-mock", "auth-tokenbased"]
"#,
    )
    .unwrap();
    let dir = tempfile::tempdir().unwrap();

    let mut runtime = catalog
        .bootstrapper_from(bootstrapper(&dir), &manifest)
        .unwrap()
        .boot()
        .await
        .unwrap();
    let started: Vec<&str> = runtime.started_extensions().iter().map(|n| n.as_str()).collect();
    assert_eq!(started, vec!["iam-mock", "auth-tokenbased"]);
    runtime.shutdown().await;
}

#[tokio::test]
async fn management_api_without_control_plane_does_not_boot() {
    let catalog = catalog();
    let manifest = RuntimeManifest {
        extensions: vec!["web-server".into(), "auth-tokenbased".into(), "management-api".into()],
        ..RuntimeManifest::default()
    };
    let dir = tempfile::tempdir().unwrap();

    let err = catalog
        .bootstrapper_from(bootstrapper(&dir), &manifest)
        .unwrap()
        .boot()
        .await
        .unwrap_err();
    assert!(matches!(err, BootError::UnresolvedDependency { .. }), "got {err}");
}

#[test]
fn manifest_file_is_read_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("runtime.toml");
    std::fs::write(&path, "extensions = [\"web-server\"]\n").unwrap();

    let loaded = manifest(&catalog(), Some(&path)).unwrap();
    assert_eq!(loaded.extensions, vec!["web-server"]);
    assert!(manifest(&catalog(), Some(&dir.path().join("missing.toml"))).is_err());
}
