use anyhow::{Context, Result};
use mongodb::bson::doc;
use mongodb::{Client, Collection};
use serde::Deserialize;
use std::collections::HashMap;

const WEIGHTS_DOC_ID: &str = "weights";

#[derive(Debug, Deserialize)]
struct WeightsDoc {
    values: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct AnalyzerDoc {
    name: String,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

/// Thin client over the control-plane Mongo database shared by the
/// distributor's weight watcher and the analyzer's admission gate.
#[derive(Clone)]
pub struct ConfigStore {
    weights: Collection<WeightsDoc>,
    analyzers: Collection<AnalyzerDoc>,
}

impl ConfigStore {
    pub async fn connect(uri: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .with_context(|| format!("connecting to mongo at {uri}"))?;
        let db = client.default_database().unwrap_or_else(|| client.database("control"));
        Ok(Self {
            weights: db.collection("weights"),
            analyzers: db.collection("analyzers"),
        })
    }

    /// Reads `control.weights` (`{_id: "weights", values: {name: float}}`).
    /// Returns `None` when the document is absent — callers keep their
    /// previous snapshot in that case rather than treating it as an error.
    pub async fn fetch_weights(&self) -> Result<Option<HashMap<String, f64>>> {
        let doc = self
            .weights
            .find_one(doc! {"_id": WEIGHTS_DOC_ID})
            .await
            .context("fetching control.weights")?;
        Ok(doc.map(|d| d.values))
    }

    /// Reads the `active` flag for one analyzer from `control.analyzers`.
    /// Defaults to `true` when the document or its `active` field is missing.
    pub async fn fetch_active(&self, name: &str) -> Result<bool> {
        let doc = self
            .analyzers
            .find_one(doc! {"name": name})
            .await
            .context("fetching control.analyzers")?;
        Ok(doc.map(|d| d.active).unwrap_or(true))
    }
}
