use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::schema::{DatabaseSchema, table_key};

/// Summary of FK graph structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FkGraphSummary {
    pub nodes: usize,
    pub edges: usize,
}

/// Report for FK dependency ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FkGraphReport {
    pub summary: FkGraphSummary,
    pub topo_order: Option<Vec<String>>,
    pub cycle: Option<Vec<String>>,
}

/// Build a deterministic FK dependency report over the seedable tables of a schema.
pub fn build_fk_graph_report(schema: &DatabaseSchema) -> FkGraphReport {
    let graph = build_adjacency(schema);
    let nodes = graph.len();
    let edges = graph.values().map(|targets| targets.len()).sum();
    let summary = FkGraphSummary { nodes, edges };

    match toposort(&graph) {
        Ok(order) => FkGraphReport {
            summary,
            topo_order: Some(order),
            cycle: None,
        },
        Err(cycle) => FkGraphReport {
            summary,
            topo_order: None,
            cycle: Some(cycle),
        },
    }
}

/// Edges run from a referenced table to every table that references it.
fn build_adjacency(schema: &DatabaseSchema) -> BTreeMap<String, BTreeSet<String>> {
    let mut graph: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for (schema_name, table) in schema.tables() {
        if !table.is_seedable() {
            continue;
        }
        let key = table_key(schema_name, &table.name);
        graph.entry(key.clone()).or_default();

        for fk in table.foreign_keys() {
            graph.entry(fk.referenced_key()).or_default().insert(key.clone());
        }
    }

    graph
}

/// Kahn's algorithm over `node -> dependents` edges.
///
/// Ready nodes are taken in lexicographic order, so the output is stable for
/// identical input. On failure returns the nodes that sit on a cycle.
pub fn toposort(graph: &BTreeMap<String, BTreeSet<String>>) -> Result<Vec<String>, Vec<String>> {
    let mut indegree: BTreeMap<&str, usize> = graph.keys().map(|node| (node.as_str(), 0)).collect();
    for targets in graph.values() {
        for target in targets {
            *indegree.entry(target.as_str()).or_insert(0) += 1;
        }
    }

    let mut ready: BTreeSet<&str> = indegree
        .iter()
        .filter_map(|(node, count)| (*count == 0).then_some(*node))
        .collect();

    let mut order = Vec::with_capacity(indegree.len());
    while let Some(node) = ready.pop_first() {
        order.push(node.to_string());

        if let Some(targets) = graph.get(node) {
            for target in targets {
                if let Some(count) = indegree.get_mut(target.as_str()) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(target.as_str());
                    }
                }
            }
        }
    }

    if order.len() == indegree.len() {
        return Ok(order);
    }

    let mut remaining: BTreeSet<&str> = indegree
        .into_iter()
        .filter_map(|(node, count)| (count > 0).then_some(node))
        .collect();

    // Nodes that merely hang off a cycle have no dependents left inside the
    // blocked set; peel them until only cycle members remain.
    loop {
        let dangling: Vec<&str> = remaining
            .iter()
            .copied()
            .filter(|node| {
                graph.get(*node).is_none_or(|targets| {
                    !targets.iter().any(|target| remaining.contains(target.as_str()))
                })
            })
            .collect();
        if dangling.is_empty() {
            break;
        }
        for node in dangling {
            remaining.remove(node);
        }
    }

    Err(remaining.into_iter().map(str::to_string).collect())
}
