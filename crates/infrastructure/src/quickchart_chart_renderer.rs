//! HTTP chart renderer client.
//!
//! Talks to a QuickChart-compatible service: POST a Chart.js configuration,
//! receive PNG bytes. The report service treats any failure here as
//! non-fatal, so errors stay plain and descriptive.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use conforma_application::{ChartRenderer, ChartSpec};
use conforma_core::{AppError, AppResult};

const CHART_WIDTH: u32 = 520;
const CHART_HEIGHT: u32 = 320;

/// Chart renderer backed by an external QuickChart-compatible service.
#[derive(Clone)]
pub struct QuickChartRenderer {
    client: Client,
    base_url: String,
}

impl QuickChartRenderer {
    /// Creates a renderer for the given service base URL.
    #[must_use]
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    fn chart_config(spec: &ChartSpec) -> serde_json::Value {
        json!({
            "type": spec.chart_type,
            "data": {
                "labels": spec.labels,
                "datasets": [{
                    "label": spec.title,
                    "data": spec.values,
                }],
            },
            "options": {
                "plugins": {
                    "title": { "display": true, "text": spec.title },
                    "legend": { "display": spec.chart_type == "pie" },
                },
            },
        })
    }
}

#[async_trait]
impl ChartRenderer for QuickChartRenderer {
    async fn render(&self, spec: &ChartSpec) -> AppResult<Vec<u8>> {
        let url = format!("{}/chart", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "chart": Self::chart_config(spec),
                "width": CHART_WIDTH,
                "height": CHART_HEIGHT,
                "format": "png",
            }))
            .send()
            .await
            .map_err(|error| {
                AppError::Internal(format!("chart service request failed: {error}"))
            })?;

        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "chart service returned status {}",
                response.status()
            )));
        }

        let bytes = response.bytes().await.map_err(|error| {
            AppError::Internal(format!("failed to read chart service response: {error}"))
        })?;

        Ok(bytes.to_vec())
    }
}
