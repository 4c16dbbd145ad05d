use std::collections::HashMap;

use super::node::{Node, NodeKind};
use crate::app::gpu::PICK_ID_CAPACITY;
use crate::snapshot::Snapshot;

pub(in crate::app) struct Hierarchy {
    pub nodes: Vec<Node>,
    pub small_graph: bool,
    pub counts: KindCounts,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(in crate::app) struct KindCounts {
    pub single: usize,
    pub super_: usize,
    pub sub: usize,
    pub hidden: usize,
}

/// Peers sharing a bucket key, in first-seen order.
fn collect_buckets(snapshot: &Snapshot) -> Vec<(&str, Vec<usize>)> {
    let mut buckets: Vec<(&str, Vec<usize>)> = Vec::new();
    let mut index_by_key: HashMap<&str, usize> = HashMap::new();
    for peer in snapshot.peers.iter().filter(|peer| !peer.is_malformed()) {
        let slot = *index_by_key.entry(peer.geostr.as_str()).or_insert_with(|| {
            buckets.push((peer.geostr.as_str(), Vec::new()));
            buckets.len() - 1
        });
        buckets[slot].1.push(peer.index);
    }
    buckets
}

/// Builds one node per peer plus one Super per multi-peer bucket when clustering.
pub(in crate::app) fn build_hierarchy(
    snapshot: &Snapshot,
    small_graph_threshold: usize,
) -> Hierarchy {
    let peer_count = snapshot.peer_count();
    let small_graph = peer_count < small_graph_threshold;

    let mut supers = Vec::new();
    let mut super_by_key: HashMap<&str, usize> = HashMap::new();
    if !small_graph {
        for (key, members) in collect_buckets(snapshot) {
            if members.len() < 2 {
                continue;
            }
            let id = peer_count + supers.len();
            let geo = &snapshot.peers[members[0]].geo;
            super_by_key.insert(key, id);
            supers.push(Node::super_node(id, geo.lat, geo.long, members));
        }
    }

    let mut counts = KindCounts {
        super_: supers.len(),
        ..KindCounts::default()
    };
    let mut nodes = Vec::with_capacity(peer_count + supers.len());
    for peer in &snapshot.peers {
        let kind = if peer.is_malformed() {
            log::warn!("peer #{} has no address, hiding it", peer.index);
            NodeKind::Hidden
        } else if small_graph || peer.sub_count < 2 {
            NodeKind::Single
        } else {
            match super_by_key.get(peer.geostr.as_str()) {
                Some(&parent) => NodeKind::Sub { parent },
                None => {
                    log::warn!(
                        "peer #{} ({}) belongs to bucket {} without a cluster node, hiding it",
                        peer.index,
                        peer.address,
                        peer.geostr
                    );
                    NodeKind::Hidden
                }
            }
        };
        match kind {
            NodeKind::Single => counts.single += 1,
            NodeKind::Sub { .. } => counts.sub += 1,
            NodeKind::Hidden => counts.hidden += 1,
            NodeKind::Super { .. } => {}
        }
        nodes.push(Node::from_peer(peer.index, kind, peer));
    }
    nodes.extend(supers);

    for node in &mut nodes {
        node.initialize_position(small_graph);
    }

    if nodes.len() > PICK_ID_CAPACITY {
        log::warn!(
            "{} nodes exceed the picker capacity of {PICK_ID_CAPACITY}; the excess cannot be clicked",
            nodes.len()
        );
    }
    log::info!(
        "built scene: {} single, {} cluster, {} clustered, {} hidden ({})",
        counts.single,
        counts.super_,
        counts.sub,
        counts.hidden,
        if small_graph { "small graph" } else { "clustered" }
    );

    Hierarchy {
        nodes,
        small_graph,
        counts,
    }
}
