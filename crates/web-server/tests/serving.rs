//! Booted web server answering real HTTP requests.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use boot::Bootstrapper;
use spi::{
    BootError, ExtensionDescriptor, ExtensionError, ServiceExtension, ServiceExtensionContext,
};
use web_server::{WebServer, WebServerExtension, DEFAULT_CONTEXT};

struct Greeting;

impl ServiceExtension for Greeting {
    fn descriptor(&self) -> ExtensionDescriptor {
        ExtensionDescriptor::named("greeting").requires::<dyn WebServer>()
    }

    fn initialize(
        &mut self,
        context: &mut ServiceExtensionContext<'_>,
    ) -> Result<(), ExtensionError> {
        let web = context.service::<dyn WebServer>()?;
        let target = if web.has_context("public") { "public" } else { DEFAULT_CONTEXT };
        web.register(target, Router::new().route("/hello", get(|| async { "hello" })))?;
        Ok(())
    }
}

fn bootstrapper() -> Bootstrapper {
    Bootstrapper::new()
        .without_environment()
        .setting("web.http.host", "127.0.0.1")
        .setting("web.http.port", "0")
        .extension(Greeting)
        .extension(WebServerExtension::default())
}

#[tokio::test]
async fn serves_health_and_contributed_routes() {
    let mut runtime = bootstrapper().boot().await.unwrap();
    let handle = runtime.handle();
    let web = handle.services().get::<dyn WebServer>().unwrap();
    let addr = web.local_addr(DEFAULT_CONTEXT).unwrap();

    let health = reqwest::get(format!("http://{addr}/api/check/health"))
        .await
        .unwrap();
    assert!(health.status().is_success());
    let body: serde_json::Value = health.json().await.unwrap();
    assert_eq!(body["isSystemHealthy"], true);

    let hello = reqwest::get(format!("http://{addr}/api/hello"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(hello, "hello");

    runtime.shutdown().await;
    assert!(reqwest::get(format!("http://{addr}/api/check/health")).await.is_err());
}

#[tokio::test]
async fn routes_land_on_their_own_context() {
    let mut runtime = bootstrapper()
        .setting("web.http.public.port", "0")
        .setting("web.http.public.path", "/public")
        .boot()
        .await
        .unwrap();
    let handle = runtime.handle();
    let web = handle.services().get::<dyn WebServer>().unwrap();
    let default = web.local_addr(DEFAULT_CONTEXT).unwrap();
    let public = web.local_addr("public").unwrap();
    assert_ne!(default.port(), public.port());

    let on_public = reqwest::get(format!("http://{public}/public/hello")).await.unwrap();
    assert!(on_public.status().is_success());
    let on_default = reqwest::get(format!("http://{default}/api/hello")).await.unwrap();
    assert_eq!(on_default.status(), reqwest::StatusCode::NOT_FOUND);

    runtime.shutdown().await;
}

#[tokio::test]
async fn port_conflict_fails_initialization() {
    let err = Bootstrapper::new()
        .without_environment()
        .setting("web.http.port", "9191")
        .setting("web.http.public.port", "9191")
        .extension(WebServerExtension::default())
        .boot()
        .await
        .unwrap_err();

    match err {
        BootError::ExtensionInitializationFailure { extension, source } => {
            assert_eq!(extension.as_str(), "web-server");
            assert!(source.to_string().contains("9191"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn web_server_is_shared_by_reference() {
    let runtime = bootstrapper().boot().await.unwrap();
    let first = runtime.handle().services().get::<dyn WebServer>().unwrap();
    let second = runtime.handle().services().get::<dyn WebServer>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    let mut runtime = runtime;
    runtime.shutdown().await;
}
