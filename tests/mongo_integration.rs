//! Integration tests for the Mongo-backed config store.
//!
//! These tests require Docker (via testcontainers) and are skipped in
//! environments without Docker by simply failing at container startup.
//!
//! Run with: `cargo test --test mongo_integration`

use log_distributor::config::store::ConfigStore;

use mongodb::bson::doc;
use mongodb::Client;
use testcontainers::core::IntoContainerPort;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

async fn start_mongo() -> (ConfigStore, String, ContainerAsync<GenericImage>) {
    let container = GenericImage::new("mongo", "7")
        .with_exposed_port(27017_u16.tcp())
        .start()
        .await
        .expect("failed to start mongo container");

    let host = container.get_host().await.expect("get host");
    let port = container.get_host_port_ipv4(27017).await.expect("get port");
    let uri = format!("mongodb://{}:{}/control", host, port);

    let store = ConfigStore::connect(&uri).await.expect("connect to mongo");
    (store, uri, container)
}

#[tokio::test]
async fn fetch_weights_returns_none_when_document_absent() {
    let (store, _uri, _container) = start_mongo().await;
    assert!(store.fetch_weights().await.unwrap().is_none());
}

#[tokio::test]
async fn fetch_weights_reads_seeded_document() {
    let (store, uri, _container) = start_mongo().await;

    let client = Client::with_uri_str(&uri).await.expect("client");
    let db = client.default_database().unwrap();
    db.collection::<mongodb::bson::Document>("weights")
        .insert_one(doc! {
            "_id": "weights",
            "values": { "analyzer1": 1.0, "analyzer2": 3.0 },
        })
        .await
        .expect("seed weights");

    let weights = store.fetch_weights().await.unwrap().expect("some weights");
    assert_eq!(weights.get("analyzer1"), Some(&1.0));
    assert_eq!(weights.get("analyzer2"), Some(&3.0));
}

#[tokio::test]
async fn fetch_active_defaults_true_when_absent() {
    let (store, _uri, _container) = start_mongo().await;
    assert!(store.fetch_active("analyzer1").await.unwrap());
}

#[tokio::test]
async fn fetch_active_reads_seeded_flag() {
    let (store, uri, _container) = start_mongo().await;

    let client = Client::with_uri_str(&uri).await.expect("client");
    let db = client.default_database().unwrap();
    db.collection::<mongodb::bson::Document>("analyzers")
        .insert_one(doc! { "name": "analyzer1", "active": false })
        .await
        .expect("seed analyzer doc");

    assert!(!store.fetch_active("analyzer1").await.unwrap());
    // A name with no document still defaults to active.
    assert!(store.fetch_active("analyzer2").await.unwrap());
}
