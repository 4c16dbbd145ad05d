use glam::{Mat4, Quat, Vec3, Vec4};

use super::layout::{cluster_offset, project_geolocation};
use crate::app::camera::{Camera, DEFAULT_ZOOM_LOG};
use crate::app::color::{NEUTRAL_COLOR, SUPER_COLOR, normalize, ramp_color};
use crate::app::gpu::pick_color_rgba;
use crate::snapshot::{Metric, NetworkClass, PeerRecord};

/// Radians per second per connection.
const SPIN_RATE: f32 = 0.02;
const NODE_BASE_SCALE: f32 = 0.8;
const SCALE_EXPONENT: f32 = 0.4;
const LOCALHOST_SCALE: f32 = 4.0;
const SUB_SCALE: f32 = 0.7;
const SELECTED_SCALE: f32 = 1.5;
/// Pushes a node past the far plane from every reachable camera distance.
pub(in crate::app) const HIDDEN_DEPTH: f32 = 50_000.0;

fn reference_distance() -> f32 {
    DEFAULT_ZOOM_LOG.exp()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(in crate::app) enum NodeKind {
    Single,
    Super { children: Vec<usize> },
    Sub { parent: usize },
    Hidden,
}

/// Global min/max of one metric over the visible peers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct MetricRange {
    pub min: f64,
    pub max: f64,
}

impl MetricRange {
    pub(in crate::app) const EMPTY: MetricRange = MetricRange {
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
    };

    pub(in crate::app) fn include(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub(in crate::app) fn is_empty(&self) -> bool {
        self.min > self.max
    }
}

#[derive(Clone, Debug)]
pub(in crate::app) struct Node {
    pub id: usize,
    pub kind: NodeKind,
    /// Snapshot index; synthetic Super nodes have none.
    pub peer: Option<usize>,
    lat: f64,
    long: f64,
    sub_index: usize,
    sub_count: usize,
    connections: usize,
    values: [f64; 3],
    localhost: bool,
    unknown_network: bool,
    position: Vec3,
    rotation_y: f32,
    colors: [Vec4; 3],
    metadata: [f32; 4],
    pick_color: [f32; 4],
    model: Mat4,
    mvp: Mat4,
}

impl Node {
    pub(in crate::app) fn from_peer(id: usize, kind: NodeKind, peer: &PeerRecord) -> Self {
        let degree = peer.degree;
        let values = Metric::ALL.map(|metric| peer.metric(metric));
        Self {
            id,
            kind,
            peer: Some(peer.index),
            lat: peer.geo.lat,
            long: peer.geo.long,
            sub_index: peer.sub_index,
            sub_count: peer.sub_count,
            connections: degree,
            values,
            localhost: peer.is_localhost(),
            unknown_network: peer.network == NetworkClass::Unknown,
            position: Vec3::ZERO,
            rotation_y: 0.0,
            colors: [NEUTRAL_COLOR; 3],
            metadata: [
                degree as f32,
                peer.betweenness as f32,
                peer.closeness as f32,
                id as f32,
            ],
            pick_color: pick_color_rgba(id),
            model: Mat4::IDENTITY,
            mvp: Mat4::IDENTITY,
        }
    }

    /// Placeholder for a bucket, sitting on the bucket center.
    pub(in crate::app) fn super_node(id: usize, lat: f64, long: f64, children: Vec<usize>) -> Self {
        let count = children.len();
        Self {
            id,
            kind: NodeKind::Super { children },
            peer: None,
            lat,
            long,
            sub_index: 0,
            sub_count: 1,
            connections: 0,
            values: [0.0; 3],
            localhost: false,
            unknown_network: false,
            position: Vec3::ZERO,
            rotation_y: 0.0,
            colors: [SUPER_COLOR; 3],
            metadata: [count as f32, 0.0, 0.0, id as f32],
            pick_color: pick_color_rgba(id),
            model: Mat4::IDENTITY,
            mvp: Mat4::IDENTITY,
        }
    }

    pub(in crate::app) fn initialize_position(&mut self, small_graph: bool) {
        let anchor = project_geolocation(self.lat, self.long);
        self.position = anchor.extend(0.0) + cluster_offset(small_graph, self.sub_index, self.sub_count);
    }

    pub(in crate::app) fn compute_colors(&mut self, ranges: &[MetricRange; 3]) {
        if matches!(self.kind, NodeKind::Super { .. }) {
            return;
        }
        for metric in Metric::ALL {
            let range = ranges[metric.index()];
            let value = self.values[metric.index()];
            self.colors[metric.index()] = ramp_color(normalize(value, range.min, range.max));
        }
    }

    pub(in crate::app) fn current_color(&self, mode: Metric) -> Vec4 {
        if matches!(self.kind, NodeKind::Super { .. }) {
            SUPER_COLOR
        } else if self.unknown_network {
            NEUTRAL_COLOR
        } else {
            self.colors[mode.index()]
        }
    }

    pub(in crate::app) fn scale(&self, camera: &Camera, selected: bool) -> f32 {
        let mut scale = NODE_BASE_SCALE * (camera.distance() / reference_distance()).powf(SCALE_EXPONENT);
        if self.localhost {
            scale *= LOCALHOST_SCALE;
        }
        if matches!(self.kind, NodeKind::Sub { .. }) {
            scale *= SUB_SCALE;
        }
        if selected {
            scale *= SELECTED_SCALE;
        }
        scale
    }

    /// Advances the spin and caches model and model-view-projection; returns the model.
    pub(in crate::app) fn update_matrix(&mut self, camera: &Camera, dt: f32, selected: bool, displaced: bool) -> Mat4 {
        self.rotation_y = (self.rotation_y + SPIN_RATE * self.connections as f32 * dt) % std::f32::consts::TAU;
        let mut translation = self.position;
        if displaced {
            translation.z -= HIDDEN_DEPTH;
        }
        self.model = Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale(camera, selected)),
            Quat::from_rotation_y(self.rotation_y),
            translation,
        );
        self.mvp = camera.view_projection() * self.model;
        self.model
    }

    pub(in crate::app) fn position(&self) -> Vec3 {
        self.position
    }

    #[cfg(test)]
    pub(in crate::app) fn rotation_y(&self) -> f32 {
        self.rotation_y
    }

    pub(in crate::app) fn metric_values(&self) -> [f64; 3] {
        self.values
    }

    pub(in crate::app) fn metadata(&self) -> [f32; 4] {
        self.metadata
    }

    pub(in crate::app) fn pick_color(&self) -> [f32; 4] {
        self.pick_color
    }

    /// Clip-space center of the node from the cached transform.
    pub(in crate::app) fn clip_center(&self) -> Vec4 {
        self.mvp * Vec4::W
    }

    pub(in crate::app) fn is_visible_kind(&self) -> bool {
        !matches!(self.kind, NodeKind::Hidden)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::snapshot::GeoLocation;

    fn peer(index: usize, sub_index: usize, sub_count: usize) -> PeerRecord {
        PeerRecord {
            index,
            address: format!("/ip4/8.8.4.{index}/tcp/4001"),
            betweenness: 0.25,
            closeness: 0.5,
            connections: vec![1, 2, 3],
            degree: 3,
            geo: GeoLocation {
                lat: 48.85,
                long: 2.35,
                city: "Paris".to_owned(),
                country: "FR".to_owned(),
                known: true,
            },
            network: NetworkClass::Public,
            geostr: "49:2".to_owned(),
            sub_index,
            sub_count,
        }
    }

    #[test]
    fn position_is_deterministic_per_geolocation_and_slot() {
        let mut a = Node::from_peer(0, NodeKind::Sub { parent: 9 }, &peer(0, 2, 5));
        let mut b = Node::from_peer(1, NodeKind::Sub { parent: 9 }, &peer(1, 2, 5));
        a.initialize_position(true);
        b.initialize_position(true);
        assert_eq!(a.position(), b.position());

        let mut c = Node::from_peer(2, NodeKind::Sub { parent: 9 }, &peer(2, 3, 5));
        c.initialize_position(true);
        assert_ne!(a.position(), c.position());
    }

    #[test]
    fn scale_follows_kind_and_selection() {
        let camera = Camera::new(Vec2::new(800.0, 600.0));
        let single = Node::from_peer(0, NodeKind::Single, &peer(0, 0, 1));
        let sub = Node::from_peer(1, NodeKind::Sub { parent: 9 }, &peer(1, 0, 2));
        let base = single.scale(&camera, false);
        assert!((base - NODE_BASE_SCALE).abs() < 1.0e-4);
        assert!((sub.scale(&camera, false) - base * SUB_SCALE).abs() < 1.0e-5);
        assert!((single.scale(&camera, true) - base * SELECTED_SCALE).abs() < 1.0e-5);

        let mut local = peer(2, 0, 1);
        local.address = "/ip4/127.0.0.1/tcp/4001".to_owned();
        let local = Node::from_peer(2, NodeKind::Single, &local);
        assert!((local.scale(&camera, false) - base * LOCALHOST_SCALE).abs() < 1.0e-4);
    }

    #[test]
    fn spin_scales_with_connections() {
        let camera = Camera::new(Vec2::new(800.0, 600.0));
        let mut busy = peer(0, 0, 1);
        busy.degree = 10;
        let mut idle = peer(1, 0, 1);
        idle.degree = 0;
        let mut busy = Node::from_peer(0, NodeKind::Single, &busy);
        let mut idle = Node::from_peer(1, NodeKind::Single, &idle);
        busy.update_matrix(&camera, 0.5, false, false);
        idle.update_matrix(&camera, 0.5, false, false);
        assert!((busy.rotation_y() - SPIN_RATE * 10.0 * 0.5).abs() < 1.0e-6);
        assert_eq!(idle.rotation_y(), 0.0);
    }

    #[test]
    fn displaced_nodes_fall_behind_the_far_plane() {
        let camera = Camera::new(Vec2::new(800.0, 600.0));
        let mut node = Node::from_peer(0, NodeKind::Single, &peer(0, 0, 1));
        node.initialize_position(false);
        node.update_matrix(&camera, 0.0, false, true);
        let clip = node.clip_center();
        assert!(clip.z > clip.w, "displaced node still inside the frustum");
        node.update_matrix(&camera, 0.0, false, false);
        let clip = node.clip_center();
        assert!(clip.z.abs() < clip.w);
    }

    #[test]
    fn colors_respect_kind_and_network() {
        let ranges = [
            MetricRange { min: 0.0, max: 0.5 },
            MetricRange { min: 0.0, max: 1.0 },
            MetricRange { min: 0.0, max: 6.0 },
        ];
        let mut node = Node::from_peer(0, NodeKind::Single, &peer(0, 0, 1));
        node.compute_colors(&ranges);
        assert_eq!(node.current_color(Metric::Betweenness), ramp_color(0.5));
        assert_eq!(node.current_color(Metric::Degree), ramp_color(0.5));

        let mut unknown = peer(1, 0, 1);
        unknown.network = NetworkClass::Unknown;
        let mut unknown = Node::from_peer(1, NodeKind::Single, &unknown);
        unknown.compute_colors(&ranges);
        assert_eq!(unknown.current_color(Metric::Closeness), NEUTRAL_COLOR);

        let placeholder = Node::super_node(5, 48.85, 2.35, vec![0, 1]);
        assert_eq!(placeholder.current_color(Metric::Closeness), SUPER_COLOR);
    }
}
