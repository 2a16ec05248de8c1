#![cfg(feature = "http")]

use std::sync::Arc;

use axum::{Json, Router, extract::Path, http::StatusCode, routing::get};
use hostdb_ui::host::RecordingPage;
use hostdb_ui::{CatalogError, CatalogSource, FieldDirectory, HttpCatalog, SearchFormController};
use serde_json::{Value, json};
use tokio::net::TcpListener;

async fn catalog(Path(key): Path<String>) -> (StatusCode, Json<Value>) {
    match key.as_str() {
        "env" => (
            StatusCode::OK,
            Json(json!({"count": 3, "query_time": "1.1ms", "catalog": ["stage", "dev", "prod"]})),
        ),
        "rack name" => (StatusCode::OK, Json(json!({"catalog": ["r 1"]}))),
        "broken" => (StatusCode::OK, Json(json!({"unexpected": true}))),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "catalog not found"})),
        ),
    }
}

async fn spawn_server() -> String {
    let router = Router::new().route("/v0/catalog/:key", get(catalog));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn fetch_returns_values_in_server_order() {
    let catalog = HttpCatalog::new(spawn_server().await).unwrap();
    let values = catalog.fetch("env").await.unwrap();
    assert_eq!(values, vec!["stage", "dev", "prod"]);
}

#[tokio::test]
async fn fetch_encodes_the_key() {
    let catalog = HttpCatalog::new(spawn_server().await).unwrap();
    assert_eq!(catalog.fetch("rack name").await.unwrap(), vec!["r 1"]);
}

#[tokio::test]
async fn error_status_carries_server_message() {
    let catalog = HttpCatalog::new(spawn_server().await).unwrap();
    match catalog.fetch("nothing").await {
        Err(CatalogError::Status {
            status, message, ..
        }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "catalog not found");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn unexpected_body_is_a_decode_error() {
    let catalog = HttpCatalog::new(spawn_server().await).unwrap();
    assert!(matches!(
        catalog.fetch("broken").await,
        Err(CatalogError::Decode { .. })
    ));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let catalog = HttpCatalog::new(format!("http://{addr}")).unwrap();
    assert!(matches!(
        catalog.fetch("env").await,
        Err(CatalogError::Transport { .. })
    ));
}

#[tokio::test]
async fn controller_builds_menu_from_live_catalog() {
    let catalog = HttpCatalog::new(spawn_server().await).unwrap();
    let page = Arc::new(RecordingPage::new());
    let controller = SearchFormController::new(
        FieldDirectory::builtin().with_fields([("env", "Environment")]),
        catalog,
        page.clone(),
    );
    controller.init_from_location("env=dev&_limit=10");
    let id = controller.snapshot()[0].id;

    controller.select_key(id, "env").unwrap().await.unwrap();
    let view = &controller.snapshot()[0];
    assert_eq!(view.label, "Environment");
    assert_eq!(
        view.catalog.as_ref().unwrap().values,
        vec!["dev", "prod", "stage"]
    );

    let added = controller.add_clause();
    controller.select_key(added, "nothing").unwrap().await.unwrap();
    let views = controller.snapshot();
    assert_eq!(views.len(), 2);
    assert!(views[1].catalog.is_none());
    assert!(page.notices().is_empty());
}

#[tokio::test]
async fn feeling_lucky_navigates_with_live_catalog() {
    let catalog = HttpCatalog::new(spawn_server().await).unwrap();
    let page = Arc::new(RecordingPage::new());
    let controller = SearchFormController::new(
        FieldDirectory::default().with_fields([("rack name", "Rack")]),
        catalog,
        page.clone(),
    );
    let location = controller.feeling_lucky().await.unwrap();
    assert_eq!(location, "/?_imfeelinglucky=true&rack%20name=r%201");
    assert_eq!(page.navigations(), vec![location]);
}

#[tokio::test]
async fn feeling_lucky_failure_notifies_without_navigating() {
    let catalog = HttpCatalog::new(spawn_server().await).unwrap();
    let page = Arc::new(RecordingPage::new());
    let controller = SearchFormController::new(
        FieldDirectory::default().with_fields([("missing", "Missing")]),
        catalog,
        page.clone(),
    );
    assert!(controller.feeling_lucky().await.is_err());
    assert!(page.navigations().is_empty());
    assert_eq!(page.notices().len(), 1);
}
