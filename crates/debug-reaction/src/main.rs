//! Logs every change and control event its queries publish.
//!
//! Set `QueryContainerId` to also log how many results each query
//! currently holds before event delivery begins.

use std::sync::Arc;

use anyhow::Context;
use serde_json::{json, Value};
use tracing::{info, warn};

use drasi_reaction::{
    config_value, init_logging, ChangeEvent, ControlEvent, Reaction, ResultViewClient, ViewElement,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let mut reaction = Reaction::builder()
        .on_change_event(on_change)
        .on_control_event(on_control)
        .build()
        .context("Failed to build the reaction")?;

    reaction
        .subscribe()
        .context("Failed to subscribe to queries")?;

    if let Some(container_id) = config_value("QueryContainerId") {
        log_current_views(&reaction, &container_id).await;
    }

    reaction.start().await.context("Reaction server failed")?;
    Ok(())
}

async fn on_change(event: ChangeEvent, _config: Option<Arc<Value>>) -> anyhow::Result<()> {
    info!(
        "Query {} changed at sequence {}: {} added, {} updated, {} deleted",
        event.query_id,
        event.sequence,
        event.added_results.len(),
        event.updated_results.len(),
        event.deleted_results.len()
    );

    for added in &event.added_results {
        info!("Added result: {}", serde_json::to_string_pretty(added)?);
    }
    for updated in &event.updated_results {
        let pair = json!({"before": &updated.before, "after": &updated.after});
        info!("Updated result: {}", serde_json::to_string_pretty(&pair)?);
    }
    for deleted in &event.deleted_results {
        info!("Deleted result: {}", serde_json::to_string_pretty(deleted)?);
    }
    Ok(())
}

async fn on_control(event: ControlEvent, _config: Option<Arc<Value>>) -> anyhow::Result<()> {
    info!("Query {} signaled {}", event.query_id, event.control_signal);
    Ok(())
}

async fn log_current_views(reaction: &Reaction, container_id: &str) {
    let client = ResultViewClient::for_query_container(container_id);
    for query_id in reaction.query_configs().keys() {
        match client.current_result(query_id).await {
            Ok(elements) => {
                let rows = elements
                    .iter()
                    .filter(|element| matches!(element, ViewElement::Data(_)))
                    .count();
                info!("Query {} currently holds {} results", query_id, rows);
            }
            Err(err) => warn!("Failed to fetch the current view of {}: {}", query_id, err),
        }
    }
}
