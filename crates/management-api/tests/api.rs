//! Management routes driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use auth_tokenbased::TokenBasedAuthenticationService;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use boot::{Bootstrapper, Runtime};
use control_plane_core::{ControlPlaneDefaultServicesExtension, ControlPlaneServicesExtension};
use iam_mock::MockIamExtension;
use management_api::{router, ManagementServices};
use serde_json::{json, Value};
use tower::ServiceExt;

const API_KEY: &str = "test-key";

async fn boot() -> (Runtime, Router) {
    let runtime = Bootstrapper::new()
        .without_environment()
        .extension(ControlPlaneDefaultServicesExtension)
        .extension(ControlPlaneServicesExtension)
        .extension(MockIamExtension)
        .boot()
        .await
        .unwrap();

    let handle = runtime.handle();
    let registry = handle.services();
    let services = ManagementServices {
        assets: registry.get().unwrap(),
        policies: registry.get().unwrap(),
        contract_definitions: registry.get().unwrap(),
        negotiations: registry.get().unwrap(),
        transfers: registry.get().unwrap(),
    };
    let app = router(services, Arc::new(TokenBasedAuthenticationService::new(API_KEY)));
    (runtime, app)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", API_KEY);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    send(app, request).await
}

fn asset_body(id: &str, kind: &str) -> Value {
    json!({
        "asset": { "id": id, "properties": { "type": kind, "name": format!("{id} data") } },
        "dataAddress": { "properties": { "type": "File", "path": format!("/tmp/{id}") } }
    })
}

#[tokio::test]
async fn requests_without_the_api_key_are_rejected() {
    let (mut runtime, app) = boot().await;

    let request = Request::builder().uri("/assets").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body[0]["type"], "NotAuthorized");

    let request = Request::builder()
        .uri("/assets")
        .header("X-Api-Key", "wrong")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.0, StatusCode::UNAUTHORIZED);
    runtime.shutdown().await;
}

#[tokio::test]
async fn asset_lifecycle() {
    let (mut runtime, app) = boot().await;

    let (status, created) = call(&app, "POST", "/assets", Some(asset_body("a1", "file"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["id"], "a1");
    call(&app, "POST", "/assets", Some(asset_body("a2", "s3"))).await;

    let (status, body) = call(&app, "POST", "/assets", Some(asset_body("a1", "file"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body[0]["type"], "ObjectConflict");
    assert!(body[0]["message"].as_str().unwrap().contains("a1"));

    let (status, listed) = call(&app, "GET", "/assets?filter=type%20%3D%20s3", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], "a2");

    let (_, page) = call(&app, "GET", "/assets?sort=DESC&sortField=id&limit=1", None).await;
    assert_eq!(page[0]["id"], "a2");

    let (status, body) = call(&app, "GET", "/assets?filter=broken", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body[0]["type"], "InvalidRequest");

    assert_eq!(call(&app, "DELETE", "/assets/a1", None).await.0, StatusCode::NO_CONTENT);
    let (status, body) = call(&app, "GET", "/assets/a1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body[0]["type"], "ObjectNotFound");
    runtime.shutdown().await;
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let (mut runtime, app) = boot().await;

    let request = Request::builder()
        .method("POST")
        .uri("/policydefinitions")
        .header("x-api-key", API_KEY)
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body[0]["type"], "InvalidRequest");
    runtime.shutdown().await;
}

#[tokio::test]
async fn policies_and_contract_definitions_keep_references_intact() {
    let (mut runtime, app) = boot().await;

    let contract = json!({
        "id": "c1",
        "accessPolicyId": "p1",
        "contractPolicyId": "p1",
        "criteria": [{ "operandLeft": "id", "operator": "=", "operandRight": "a1" }]
    });
    assert_eq!(
        call(&app, "POST", "/contractdefinitions", Some(contract.clone())).await.0,
        StatusCode::BAD_REQUEST
    );

    let policy = json!({
        "id": "p1",
        "policy": { "permissions": [{ "action": { "type": "USE" } }] }
    });
    let (status, created) = call(&app, "POST", "/policydefinitions", Some(policy)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["policy"]["permissions"][0]["action"]["type"], "USE");

    let (status, created) = call(&app, "POST", "/contractdefinitions", Some(contract)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["assetSelector"][0]["operandRight"], "a1");

    assert_eq!(
        call(&app, "DELETE", "/policydefinitions/p1", None).await.0,
        StatusCode::CONFLICT
    );
    assert_eq!(
        call(&app, "DELETE", "/contractdefinitions/c1", None).await.0,
        StatusCode::NO_CONTENT
    );
    assert_eq!(
        call(&app, "DELETE", "/policydefinitions/p1", None).await.0,
        StatusCode::NO_CONTENT
    );
    runtime.shutdown().await;
}

#[tokio::test]
async fn negotiation_endpoints() {
    let (mut runtime, app) = boot().await;

    let request = json!({
        "connectorAddress": "http://provider:8282/api/v1/ids/data",
        "offer": { "id": "offer-1", "assetId": "a1", "policy": {} }
    });
    let (status, negotiation) = call(&app, "POST", "/contractnegotiations", Some(request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(negotiation["protocol"], "ids-multipart");
    let id = negotiation["id"].as_str().unwrap().to_owned();

    let (_, state) = call(&app, "GET", &format!("/contractnegotiations/{id}/state"), None).await;
    assert_eq!(state, json!({ "state": "REQUESTED" }));

    let (status, declined) =
        call(&app, "POST", &format!("/contractnegotiations/{id}/decline"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(declined["state"], "DECLINED");

    let (status, _) = call(&app, "POST", &format!("/contractnegotiations/{id}/cancel"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(&app, "GET", "/contractnegotiations/unknown/state", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    runtime.shutdown().await;
}

#[tokio::test]
async fn transfer_endpoints() {
    let (mut runtime, app) = boot().await;

    let request = json!({
        "connectorAddress": "http://provider:8282/api/v1/ids/data",
        "contractId": "contract-1",
        "assetId": "a1",
        "dataDestination": { "properties": { "type": "File", "path": "/tmp/out" } }
    });
    let (status, process) = call(&app, "POST", "/transferprocess", Some(request.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(process["state"], "REQUESTED");
    let first = process["id"].as_str().unwrap().to_owned();

    let (status, completed) =
        call(&app, "POST", &format!("/transferprocess/{first}/complete"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["state"], "COMPLETED");

    let (status, _) = call(
        &app,
        "POST",
        &format!("/transferprocess/{first}/terminate"),
        Some(json!({ "reason": "too late" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, process) = call(&app, "POST", "/transferprocess", Some(request)).await;
    let second = process["id"].as_str().unwrap().to_owned();
    let (status, terminated) =
        call(&app, "POST", &format!("/transferprocess/{second}/terminate"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(terminated["state"], "TERMINATED");
    assert_eq!(terminated["errorDetail"], "Terminated through the management API");

    let filter = "/transferprocess?filter=state%20%3D%20TERMINATED";
    let (_, listed) = call(&app, "GET", filter, None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    runtime.shutdown().await;
}
