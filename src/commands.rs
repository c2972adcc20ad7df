//! CLI command implementations

use anyhow::{anyhow, Context};
use waypoint_core::{EdgeChange, GraphStore};
use waypoint_server::WaypointServer;
use waypoint_traversal::{RunOutcome, TraversalEngine};

use crate::config::WaypointConfig;

pub async fn serve(config: WaypointConfig) -> anyhow::Result<()> {
    tracing::info!(
        "Starting Waypoint server on {}:{}",
        config.server.host,
        config.server.port
    );

    let store = GraphStore::new();
    tracing::info!(
        "Default graph: {} nodes, {} edges",
        store.node_count().await,
        store.edge_count().await
    );

    let server = WaypointServer::new(store, config.traversal, config.server);
    server.start().await
}

/// Split an `A-B` edge argument into its endpoints.
pub fn parse_edge(edge: &str) -> anyhow::Result<(String, String)> {
    let (a, b) = edge
        .split_once('-')
        .ok_or_else(|| anyhow!("edge {:?} is not of the form A-B", edge))?;
    if a.trim().is_empty() || b.trim().is_empty() {
        return Err(anyhow!("edge {:?} is missing an endpoint", edge));
    }
    Ok((a.trim().to_string(), b.trim().to_string()))
}

/// Apply the requested edits to a fresh default graph, then stream one run
/// to stdout. Ctrl-C cancels the run.
pub async fn run(
    config: WaypointConfig,
    start: &str,
    end: &str,
    remove: &[String],
    edges: &[String],
) -> anyhow::Result<()> {
    let store = GraphStore::new();

    for node in remove {
        store
            .remove_node(node)
            .await
            .with_context(|| format!("cannot remove {}", node))?;
    }
    for edge in edges {
        let (a, b) = parse_edge(edge)?;
        let change = store
            .add_edge(&a, &b)
            .await
            .with_context(|| format!("cannot add edge {}", edge))?;
        if change != EdgeChange::Added {
            tracing::warn!("Edge {} not added: {:?}", edge, change);
        }
    }

    let engine = TraversalEngine::new(store, config.traversal);
    let mut handle = engine
        .run(start, end)
        .await
        .with_context(|| format!("cannot search from {} to {}", start, end))?;
    tracing::info!("Started {}", handle.id());

    loop {
        tokio::select! {
            event = handle.events().recv() => match event {
                Some(event) => println!("{}", event),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("Interrupted, cancelling {}", handle.id());
                handle.cancel();
            }
        }
    }

    let (_, outcome) = handle.finish().await;
    match outcome {
        RunOutcome::Found { path_len } => println!("shortest path: {} edge(s)", path_len),
        RunOutcome::NotFound => println!("{} is unreachable from {}", end, start),
        RunOutcome::Cancelled | RunOutcome::Invalidated => println!("run stopped: {:?}", outcome),
    }
    Ok(())
}

/// Print the default graph's adjacency.
pub async fn show() -> anyhow::Result<()> {
    let store = GraphStore::new();
    for node in store.nodes().await {
        let neighbors = store.neighbors(&node).await?;
        println!("{} -> {}", node, neighbors.join(", "));
    }
    Ok(())
}
