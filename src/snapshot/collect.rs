use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};

use super::graph::{GeoLocation, Histogram, NetworkClass, PeerRecord, Snapshot};
use super::parse::{RawPeer, parse_snapshot};

pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    snapshot_from_json(&raw, &path.display().to_string())
        .with_context(|| format!("failed to load snapshot {}", path.display()))
}

pub fn snapshot_from_json(raw: &str, source: &str) -> Result<Snapshot> {
    let parsed = parse_snapshot(raw)?;
    let peer_count = parsed.nodes.len();

    let mut peers = parsed
        .nodes
        .into_iter()
        .enumerate()
        .map(|(index, raw_peer)| build_peer(index, raw_peer, peer_count))
        .collect::<Vec<_>>();

    assign_sub_slots(&mut peers);

    let mut edges = HashSet::new();
    for peer in &peers {
        for &other in &peer.connections {
            edges.insert((peer.index.min(other), peer.index.max(other)));
        }
    }
    for &(a, b) in &edges {
        peers[a].degree += 1;
        peers[b].degree += 1;
    }

    let histograms = parsed
        .histograms
        .into_iter()
        .map(|raw| Histogram {
            metric: raw.metric,
            min: raw.min,
            max: raw.max,
            buckets: raw.buckets,
        })
        .collect();

    let missing_geo = peers.iter().filter(|peer| !peer.geo.known).count();
    if missing_geo > 0 {
        log::warn!("{missing_geo} peers have no usable geolocation; placed at the unknown location");
    }
    log::info!(
        "loaded snapshot {source}: {} peers, {} edges",
        peers.len(),
        edges.len()
    );

    Ok(Snapshot {
        source: source.to_owned(),
        peers,
        histograms,
        edge_count: edges.len(),
    })
}

fn build_peer(index: usize, raw: RawPeer, peer_count: usize) -> PeerRecord {
    let geo = match raw.geolocation.as_ref() {
        Some(location) => match location.coordinates() {
            Some((lat, long)) => GeoLocation {
                lat,
                long,
                city: location.city.clone().unwrap_or_default(),
                country: location.country.clone().unwrap_or_default(),
                known: true,
            },
            None => GeoLocation::unknown(),
        },
        None => GeoLocation::unknown(),
    };

    let mut connections = Vec::with_capacity(raw.connections.len());
    for target in raw.connections {
        match usize::try_from(target) {
            Ok(target) if target < peer_count && target != index => connections.push(target),
            _ => log::warn!("peer {index}: dropping invalid connection index {target}"),
        }
    }
    connections.sort_unstable();
    connections.dedup();

    let network = NetworkClass::from_declared(raw.network.as_deref(), &raw.address);
    let geostr = geo.bucket_key();

    PeerRecord {
        index,
        address: raw.address,
        betweenness: sanitize(raw.betweenness),
        closeness: sanitize(raw.closeness),
        connections,
        degree: 0,
        geo,
        network,
        geostr,
        sub_index: 0,
        sub_count: 0,
    }
}

fn sanitize(value: Option<f64>) -> f64 {
    value.filter(|value| value.is_finite()).unwrap_or(0.0)
}

/// Numbers well-formed peers inside their bucket in snapshot order.
fn assign_sub_slots(peers: &mut [PeerRecord]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for peer in peers.iter_mut() {
        if peer.is_malformed() {
            continue;
        }
        let slot = counts.entry(peer.geostr.clone()).or_default();
        peer.sub_index = *slot;
        *slot += 1;
    }

    for peer in peers.iter_mut() {
        if peer.is_malformed() {
            continue;
        }
        peer.sub_count = counts.get(&peer.geostr).copied().unwrap_or(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "nodes": [
            {"address": "/ip4/1.1.1.1/tcp/1", "betweenness": 0.5, "closeness": 0.2,
             "connections": [1, 2, 2, 7, -1, 0],
             "geolocation": {"lat": 52.5, "long": 13.4, "city": "Berlin", "country": "DE"}},
            {"address": "/ip4/1.1.1.2/tcp/1", "connections": [0],
             "geolocation": {"lat": 52.6, "long": 13.3, "city": "Berlin", "country": "DE"}},
            {"address": "/ip4/9.9.9.9/tcp/1", "geolocation": null},
            {"address": "", "geolocation": {"lat": 52.5, "long": 13.4}}
        ],
        "histograms": [{"metric": "Betweenness", "min": 0.0, "max": 0.5, "buckets": [3, 1]}]
    }"#;

    #[test]
    fn drops_invalid_and_duplicate_connections() {
        let snapshot = snapshot_from_json(SAMPLE, "sample").expect("sample loads");
        assert_eq!(snapshot.peers[0].connections, vec![1, 2]);
        assert_eq!(snapshot.edge_count, 2);
    }

    #[test]
    fn backfills_missing_geolocation_with_sentinel() {
        let snapshot = snapshot_from_json(SAMPLE, "sample").expect("sample loads");
        let peer = &snapshot.peers[2];
        assert!(!peer.geo.known);
        assert_eq!(peer.geostr, GeoLocation::UNKNOWN_BUCKET);
    }

    #[test]
    fn numbers_peers_within_their_bucket() {
        let snapshot = snapshot_from_json(SAMPLE, "sample").expect("sample loads");
        assert_eq!(snapshot.peers[0].geostr, snapshot.peers[1].geostr);
        assert_eq!((snapshot.peers[0].sub_index, snapshot.peers[0].sub_count), (0, 2));
        assert_eq!((snapshot.peers[1].sub_index, snapshot.peers[1].sub_count), (1, 2));
        assert_eq!((snapshot.peers[2].sub_index, snapshot.peers[2].sub_count), (0, 1));
        // the malformed peer shares the bucket but is not counted
        assert!(snapshot.peers[3].is_malformed());
        assert_eq!(snapshot.peers[3].sub_count, 0);
    }

    #[test]
    fn histogram_lookup_ignores_case() {
        let snapshot = snapshot_from_json(SAMPLE, "sample").expect("sample loads");
        let histogram = snapshot
            .histogram(super::super::Metric::Betweenness)
            .expect("histogram present");
        assert_eq!(histogram.buckets, vec![3, 1]);
    }

    #[test]
    fn null_metrics_load_as_zero() {
        let raw = r#"{"nodes":[
            {"address":"/ip4/8.8.8.8/tcp/1","betweenness":null,"closeness":null,"connections":[1]},
            {"address":"/ip4/8.8.4.4/tcp/1","betweenness":0.75}
        ]}"#;
        let snapshot = snapshot_from_json(raw, "nulls").expect("null metrics are tolerated");
        assert_eq!(snapshot.peers[0].betweenness, 0.0);
        assert_eq!(snapshot.peers[0].closeness, 0.0);
        assert_eq!(snapshot.peers[1].betweenness, 0.75);
        assert_eq!(snapshot.peers[1].closeness, 0.0);
    }

    #[test]
    fn degree_counts_links_declared_by_either_side() {
        let snapshot = snapshot_from_json(SAMPLE, "sample").expect("sample loads");
        let adjacency = snapshot.adjacency();
        for peer in &snapshot.peers {
            assert_eq!(peer.degree, adjacency[peer.index].len());
            assert_eq!(peer.metric(super::super::Metric::Degree), adjacency[peer.index].len() as f64);
        }
        // peer 2 lists nobody but is listed by peer 0
        assert_eq!(snapshot.peers[2].degree, 1);
    }

    #[test]
    fn adjacency_is_symmetric() {
        let snapshot = snapshot_from_json(SAMPLE, "sample").expect("sample loads");
        let adjacency = snapshot.adjacency();
        assert_eq!(adjacency[0], vec![1, 2]);
        assert_eq!(adjacency[2], vec![0]);
    }
}
