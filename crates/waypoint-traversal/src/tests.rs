//! Unit tests for traversal runs against a live store

use crate::*;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use waypoint_core::{Graph, GraphError, GraphStore};

fn unpaced(store: &GraphStore) -> TraversalEngine {
    TraversalEngine::new(store.clone(), TraversalConfig::unpaced())
}

fn paced(store: &GraphStore, pacing_ms: u64) -> TraversalEngine {
    TraversalEngine::new(
        store.clone(),
        TraversalConfig {
            pacing_ms,
            ..Default::default()
        },
    )
}

fn visited(node: &str) -> TraversalEvent {
    TraversalEvent::NodeVisited { node: node.into() }
}

fn discovered(node: &str, parent: &str) -> TraversalEvent {
    TraversalEvent::NodeDiscovered {
        node: node.into(),
        parent: parent.into(),
    }
}

fn path(from: &str, to: &str) -> TraversalEvent {
    TraversalEvent::PathEdge {
        from: from.into(),
        to: to.into(),
    }
}

fn finished(found: bool) -> TraversalEvent {
    TraversalEvent::TraversalFinished { found }
}

fn path_edges(events: &[TraversalEvent]) -> Vec<(String, String)> {
    events
        .iter()
        .filter_map(|event| match event {
            TraversalEvent::PathEdge { from, to } => Some((from.clone(), to.clone())),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_default_graph_a_to_d() {
    let store = GraphStore::new();
    let engine = unpaced(&store);

    let (events, outcome) = engine.run("A", "D").await.unwrap().finish().await;

    assert_eq!(
        events,
        vec![
            visited("A"),
            discovered("B", "A"),
            discovered("C", "A"),
            discovered("D", "B"),
            discovered("E", "C"),
            path("B", "D"),
            path("A", "B"),
            finished(true),
        ]
    );
    assert_eq!(outcome, RunOutcome::Found { path_len: 2 });
}

#[tokio::test]
async fn test_removing_hub_forces_long_route() {
    let store = GraphStore::new();
    store.remove_node("B").await.unwrap();
    let engine = unpaced(&store);

    let (events, outcome) = engine.run("A", "D").await.unwrap().finish().await;

    assert_eq!(
        path_edges(&events),
        vec![
            ("F".to_string(), "D".to_string()),
            ("E".to_string(), "F".to_string()),
            ("C".to_string(), "E".to_string()),
            ("A".to_string(), "C".to_string()),
        ]
    );
    assert_eq!(events.last(), Some(&finished(true)));
    assert_eq!(outcome, RunOutcome::Found { path_len: 4 });
}

#[tokio::test]
async fn test_start_equals_end() {
    let store = GraphStore::new();
    let engine = unpaced(&store);

    let (events, outcome) = engine.run("A", "A").await.unwrap().finish().await;

    assert_eq!(events, vec![visited("A"), finished(true)]);
    assert_eq!(outcome, RunOutcome::Found { path_len: 0 });
}

#[tokio::test]
async fn test_unreachable_end_finishes_without_path() {
    let store = GraphStore::new();
    store.add_node("Z").await.unwrap();
    let engine = unpaced(&store);

    let (events, outcome) = engine.run("A", "Z").await.unwrap().finish().await;

    assert!(path_edges(&events).is_empty());
    assert_eq!(events.last(), Some(&finished(false)));
    // Everything reachable from A was discovered exactly once.
    let discovered_count = events
        .iter()
        .filter(|e| matches!(e, TraversalEvent::NodeDiscovered { .. }))
        .count();
    assert_eq!(discovered_count, 5);
    assert_eq!(outcome, RunOutcome::NotFound);
}

#[tokio::test]
async fn test_unknown_endpoint_fails_before_any_event() {
    let store = GraphStore::new();
    let engine = unpaced(&store);

    let err = assert_err!(engine.run("A", "Q").await);
    assert_eq!(err, GraphError::UnknownNode("Q".into()));
    let err = assert_err!(engine.run("", "A").await);
    assert_eq!(err, GraphError::UnknownNode(String::new()));
    assert_eq!(engine.active_run().await, None);
}

#[tokio::test]
async fn test_labels_are_normalized() {
    let store = GraphStore::new();
    let engine = unpaced(&store);

    let (events, _) = engine.run(" a", "d ").await.unwrap().finish().await;
    assert_eq!(events.first(), Some(&visited("A")));
    assert_eq!(path_edges(&events).len(), 2);
}

#[tokio::test]
async fn test_runs_are_deterministic() {
    let store = GraphStore::new();
    store.add_node("G").await.unwrap();
    store.add_edge("G", "E").await.unwrap();
    store.add_edge("G", "B").await.unwrap();
    let engine = unpaced(&store);

    let (first, _) = engine.run("A", "F").await.unwrap().finish().await;
    let (second, _) = engine.run("A", "F").await.unwrap().finish().await;
    assert_eq!(first, second);
}

/// Tiny deterministic generator so graph shapes are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }
}

/// All-pairs hop distances by Floyd–Warshall, independent of the engine.
fn hop_distances(graph: &Graph) -> (Vec<String>, Vec<Vec<Option<usize>>>) {
    let nodes = graph.nodes();
    let n = nodes.len();
    let mut dist = vec![vec![None; n]; n];
    for i in 0..n {
        dist[i][i] = Some(0);
        for j in 0..n {
            if graph.has_edge(&nodes[i], &nodes[j]) {
                dist[i][j] = Some(1);
            }
        }
    }
    for k in 0..n {
        for i in 0..n {
            for j in 0..n {
                if let (Some(a), Some(b)) = (dist[i][k], dist[k][j]) {
                    if dist[i][j].map_or(true, |d| a + b < d) {
                        dist[i][j] = Some(a + b);
                    }
                }
            }
        }
    }
    (nodes, dist)
}

#[tokio::test]
async fn test_paths_are_shortest_on_generated_graphs() {
    let mut rng = Lcg(42);

    for round in 0..12 {
        let node_count = 3 + rng.next(8) as usize;
        let mut graph = Graph::new();
        for i in 0..node_count {
            graph.add_node(&format!("N{i}")).unwrap();
        }
        for _ in 0..rng.next(2 * node_count as u64 + 1) {
            let a = format!("N{}", rng.next(node_count as u64));
            let b = format!("N{}", rng.next(node_count as u64));
            graph.add_edge(&a, &b).unwrap();
        }

        let (nodes, dist) = hop_distances(&graph);
        let store = GraphStore::from_graph(graph.clone());
        let engine = unpaced(&store);

        for (i, start) in nodes.iter().enumerate() {
            for (j, end) in nodes.iter().enumerate() {
                let (events, outcome) = engine.run(start, end).await.unwrap().finish().await;
                let edges = path_edges(&events);

                match dist[i][j] {
                    Some(expected) => {
                        assert_eq!(edges.len(), expected, "round {round}: {start}->{end}");
                        assert_eq!(outcome, RunOutcome::Found { path_len: expected });
                        assert_eq!(events.last(), Some(&finished(true)));

                        // Emitted end-first; walk it start-first and check it connects.
                        let mut at = start.clone();
                        for (from, to) in edges.iter().rev() {
                            assert_eq!(from, &at);
                            assert!(graph.has_edge(from, to));
                            at = to.clone();
                        }
                        assert_eq!(&at, end);
                    }
                    None => {
                        assert!(edges.is_empty());
                        assert_eq!(events.last(), Some(&finished(false)));
                        assert_eq!(outcome, RunOutcome::NotFound);
                    }
                }
            }
        }
    }
}

#[tokio::test]
async fn test_new_run_cancels_previous() {
    let store = GraphStore::new();
    let engine = paced(&store, 10_000);

    let mut first = engine.run("A", "D").await.unwrap();
    assert_eq!(first.events().recv().await, Some(visited("A")));
    assert_eq!(first.events().recv().await, Some(discovered("B", "A")));
    let first_id = first.id();

    // First run is now parked in its pacing delay.
    let second = engine.run("C", "C").await.unwrap();
    assert!(second.id() > first_id);
    assert_eq!(engine.active_run().await, Some(second.id()));

    let (rest, outcome) = tokio::time::timeout(Duration::from_secs(5), first.finish())
        .await
        .expect("cancelled run should stop promptly");
    assert!(rest.iter().all(|e| !e.is_terminal()));
    assert_eq!(outcome, RunOutcome::Cancelled);

    let (events, outcome) = second.finish().await;
    assert_eq!(events, vec![visited("C"), finished(true)]);
    assert!(outcome.completed());
}

#[tokio::test]
async fn test_handle_cancel_stops_run() {
    let store = GraphStore::new();
    let engine = paced(&store, 10_000);

    let mut run = engine.run("A", "F").await.unwrap();
    assert_eq!(run.events().recv().await, Some(visited("A")));
    run.cancel();

    let (_, outcome) = tokio::time::timeout(Duration::from_secs(5), run.finish())
        .await
        .unwrap();
    assert_eq!(outcome, RunOutcome::Cancelled);
}

#[tokio::test]
async fn test_cancel_active_without_runs() {
    let store = GraphStore::new();
    let engine = unpaced(&store);
    assert_eq!(engine.cancel_active().await, None);
}

#[tokio::test]
async fn test_finished_run_is_no_longer_active() {
    let store = GraphStore::new();
    let engine = unpaced(&store);

    let run = assert_ok!(engine.run("A", "D").await);
    let (_, outcome) = run.finish().await;
    assert_eq!(outcome, RunOutcome::Found { path_len: 2 });

    assert_eq!(engine.active_run().await, None);
    assert_eq!(engine.cancel_active().await, None);

    // A superseded run finishing must not clear its successor.
    let engine = paced(&store, 10_000);
    let first = assert_ok!(engine.run("A", "D").await);
    let second = assert_ok!(engine.run("A", "F").await);
    let (_, outcome) = first.finish().await;
    assert_eq!(outcome, RunOutcome::Cancelled);
    assert_eq!(engine.active_run().await, Some(second.id()));
    assert_eq!(engine.cancel_active().await, Some(second.id()));
    let (_, outcome) = second.finish().await;
    assert_eq!(outcome, RunOutcome::Cancelled);
}

#[tokio::test]
async fn test_reset_invalidates_run() {
    let store = GraphStore::new();
    let engine = paced(&store, 50);

    let mut run = engine.run("A", "F").await.unwrap();
    assert_eq!(run.events().recv().await, Some(visited("A")));
    assert_eq!(run.events().recv().await, Some(discovered("B", "A")));
    store.reset().await;

    let (rest, outcome) = run.finish().await;
    assert!(rest.iter().all(|e| !e.is_terminal()));
    assert_eq!(outcome, RunOutcome::Invalidated);
}

#[tokio::test]
async fn test_node_removed_mid_run_is_treated_as_leaf() {
    let store = GraphStore::new();
    let engine = paced(&store, 50);

    let mut run = engine.run("A", "D").await.unwrap();
    assert_eq!(run.events().recv().await, Some(visited("A")));
    assert_eq!(run.events().recv().await, Some(discovered("B", "A")));
    // B is queued but not yet expanded.
    store.remove_node("B").await.unwrap();

    let (rest, outcome) = run.finish().await;
    assert_eq!(
        path_edges(&rest),
        vec![
            ("F".to_string(), "D".to_string()),
            ("E".to_string(), "F".to_string()),
            ("C".to_string(), "E".to_string()),
            ("A".to_string(), "C".to_string()),
        ]
    );
    assert_eq!(outcome, RunOutcome::Found { path_len: 4 });
}

#[tokio::test]
async fn test_dropped_consumer_cancels_run() {
    let store = GraphStore::new();
    let engine = TraversalEngine::new(
        store.clone(),
        TraversalConfig {
            pacing_ms: 0,
            channel_capacity: 1,
        },
    );

    let (events, completion) = engine.run("A", "D").await.unwrap().into_parts();
    drop(events);
    assert_eq!(completion.wait().await, RunOutcome::Cancelled);
}

#[test]
fn test_event_wire_format() {
    let events = vec![
        RunEvent { run: RunId(3), event: visited("A") },
        RunEvent { run: RunId(3), event: discovered("B", "A") },
        RunEvent { run: RunId(3), event: path("A", "B") },
        RunEvent { run: RunId(3), event: finished(true) },
    ];
    insta::assert_json_snapshot!(events, @r###"
    [
      {
        "run": 3,
        "event": {
          "kind": "node_visited",
          "node": "A"
        }
      },
      {
        "run": 3,
        "event": {
          "kind": "node_discovered",
          "node": "B",
          "parent": "A"
        }
      },
      {
        "run": 3,
        "event": {
          "kind": "path_edge",
          "from": "A",
          "to": "B"
        }
      },
      {
        "run": 3,
        "event": {
          "kind": "traversal_finished",
          "found": true
        }
      }
    ]
    "###);
}

#[test]
fn test_outcome_wire_format() {
    let json = serde_json::to_string(&RunOutcome::Found { path_len: 2 }).unwrap();
    assert_eq!(json, r#"{"status":"found","path_len":2}"#);
    let json = serde_json::to_string(&RunOutcome::Invalidated).unwrap();
    assert_eq!(json, r#"{"status":"invalidated"}"#);
}
