use glam::{Vec3, Vec4};

use super::camera::Camera;
use super::gpu::{ClassFrame, PickResult};
use crate::snapshot::{Metric, PeerRecord, Snapshot};

mod build;
mod instances;
mod layout;
mod node;

pub(in crate::app) use build::KindCounts;
pub(in crate::app) use instances::{
    InstanceAttribute, LINE_INSTANCE_ATTRIBUTES, LINE_INSTANCE_STRIDE, LineInstance,
    NODE_INSTANCE_ATTRIBUTES, NODE_INSTANCE_STRIDE, NodeClass, NodeInstance,
};
pub(in crate::app) use layout::{WORLD_HEIGHT, WORLD_WIDTH};
pub(in crate::app) use node::MetricRange;

use build::build_hierarchy;
use instances::InstanceBuffer;
use node::{Node, NodeKind};

const SELECTED_LINE_COLOR: Vec4 = Vec4::new(1.0, 1.0, 1.0, 0.85);
const ALL_LINE_COLOR: Vec4 = Vec4::new(0.62, 0.68, 0.8, 0.3);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum ConnectionMode {
    None,
    Selected,
    All,
}

impl ConnectionMode {
    pub(in crate::app) fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Selected => "selected",
            Self::All => "all",
        }
    }

    /// `All` is only offered for small graphs.
    pub(in crate::app) fn next(self, small_graph: bool) -> Self {
        match self {
            Self::None => Self::Selected,
            Self::Selected if small_graph => Self::All,
            Self::Selected | Self::All => Self::None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum Selection {
    Nothing,
    Node(usize),
}

/// Scene manager: node hierarchy, instance buffers and selection/expansion state.
pub(in crate::app) struct World {
    snapshot: Snapshot,
    adjacency: Vec<Vec<usize>>,
    nodes: Vec<Node>,
    small_graph: bool,
    counts: KindCounts,
    ranges: [MetricRange; 3],
    buffers: [InstanceBuffer; 3],
    slots: Vec<Option<(NodeClass, usize)>>,
    revision: u64,
    selection: Selection,
    expanded: Option<usize>,
    color_mode: Metric,
    connection_mode: ConnectionMode,
    lines: Vec<LineInstance>,
    lines_dirty: bool,
}

impl World {
    pub(in crate::app) fn new(snapshot: Snapshot, small_graph_threshold: usize) -> Self {
        let adjacency = snapshot.adjacency();
        let hierarchy = build_hierarchy(&snapshot, small_graph_threshold);

        let mut ranges = [MetricRange::EMPTY; 3];
        for node in hierarchy.nodes.iter().filter(|node| node.peer.is_some()) {
            if !node.is_visible_kind() {
                continue;
            }
            for (range, value) in ranges.iter_mut().zip(node.metric_values()) {
                range.include(value);
            }
        }
        for range in &mut ranges {
            if range.is_empty() {
                *range = MetricRange { min: 0.0, max: 0.0 };
            }
        }

        let mut nodes = hierarchy.nodes;
        for node in &mut nodes {
            node.compute_colors(&ranges);
        }

        let mut world = Self {
            snapshot,
            adjacency,
            slots: vec![None; nodes.len()],
            nodes,
            small_graph: hierarchy.small_graph,
            counts: hierarchy.counts,
            ranges,
            buffers: Default::default(),
            revision: 0,
            selection: Selection::Nothing,
            expanded: None,
            color_mode: Metric::Betweenness,
            connection_mode: ConnectionMode::None,
            lines: Vec::new(),
            lines_dirty: true,
        };
        world.rebuild_buffers();
        world
    }

    fn class_of(node: &Node) -> Option<NodeClass> {
        match node.kind {
            NodeKind::Single => Some(NodeClass::Single),
            NodeKind::Super { .. } => Some(NodeClass::Super),
            NodeKind::Sub { .. } => Some(NodeClass::Sub),
            NodeKind::Hidden => None,
        }
    }

    fn rebuild_buffers(&mut self) {
        let mut records: [Vec<(usize, NodeInstance)>; 3] = Default::default();
        for node in &self.nodes {
            let Some(class) = Self::class_of(node) else {
                continue;
            };
            let batch = &mut records[class.index()];
            self.slots[node.id] = Some((class, batch.len()));
            batch.push((
                node.id,
                NodeInstance {
                    color: node.current_color(self.color_mode).to_array(),
                    metadata: node.metadata(),
                    pick_color: node.pick_color(),
                    transform: glam::Mat4::IDENTITY.to_cols_array_2d(),
                },
            ));
        }

        self.revision += 1;
        for (buffer, records) in self.buffers.iter_mut().zip(records) {
            buffer.rebuild(records, self.revision);
        }
        log::debug!(
            "instance buffers rebuilt (revision {}): {:?}",
            self.revision,
            self.buffers.each_ref().map(InstanceBuffer::len)
        );
    }

    fn is_displaced(&self, node: &Node) -> bool {
        match node.kind {
            NodeKind::Sub { parent } => self.expanded != Some(parent),
            NodeKind::Super { .. } => self.expanded == Some(node.id),
            NodeKind::Single | NodeKind::Hidden => false,
        }
    }

    /// Per-frame transform and color rewrite, in place.
    pub(in crate::app) fn update(&mut self, camera: &Camera, dt: f32) {
        for index in 0..self.nodes.len() {
            let Some((class, slot)) = self.slots[index] else {
                continue;
            };
            let selected = self.selection == Selection::Node(index);
            let displaced = self.is_displaced(&self.nodes[index]);
            let node = &mut self.nodes[index];
            let model = node.update_matrix(camera, dt, selected, displaced);
            let buffer = &mut self.buffers[class.index()];
            buffer.write_transform(slot, model);
            buffer.write_color(slot, node.current_color(self.color_mode));
        }

        if self.lines_dirty {
            self.lines = self.compute_lines();
            self.lines_dirty = false;
        }
    }

    /// Where a connection to `id` is drawn: folded Sub nodes snap to their Super.
    fn endpoint(&self, id: usize) -> Vec3 {
        let node = &self.nodes[id];
        match node.kind {
            NodeKind::Sub { parent } if self.expanded != Some(parent) => self.nodes[parent].position(),
            _ => node.position(),
        }
    }

    fn compute_lines(&self) -> Vec<LineInstance> {
        let visible = |id: usize| self.nodes[id].is_visible_kind();
        match self.connection_mode {
            ConnectionMode::None => Vec::new(),
            ConnectionMode::Selected => {
                let Selection::Node(id) = self.selection else {
                    return Vec::new();
                };
                let Some(peer) = self.nodes[id].peer else {
                    return Vec::new();
                };
                self.adjacency[peer]
                    .iter()
                    .filter(|&&other| visible(other))
                    .map(|&other| LineInstance::new(self.endpoint(id), self.endpoint(other), SELECTED_LINE_COLOR))
                    .collect()
            }
            ConnectionMode::All => {
                let mut lines = Vec::with_capacity(self.snapshot.edge_count);
                for (from, neighbors) in self.adjacency.iter().enumerate() {
                    if !visible(from) {
                        continue;
                    }
                    for &to in neighbors.iter().filter(|&&to| from < to && visible(to)) {
                        lines.push(LineInstance::new(self.endpoint(from), self.endpoint(to), ALL_LINE_COLOR));
                    }
                }
                lines
            }
        }
    }

    /// Applies a decoded pick; background leaves every state untouched.
    pub(in crate::app) fn apply_pick(&mut self, result: PickResult) {
        match result {
            PickResult::Miss => {}
            PickResult::Hit(id) if id < self.nodes.len() && self.nodes[id].is_visible_kind() => {
                self.click_node(id);
            }
            PickResult::Hit(id) => log::debug!("pick resolved to unknown node {id}"),
        }
    }

    pub(in crate::app) fn click_node(&mut self, id: usize) {
        if matches!(self.nodes[id].kind, NodeKind::Super { .. }) {
            self.toggle_expansion(id);
            return;
        }
        self.selection = match self.selection {
            Selection::Node(current) if current == id => Selection::Nothing,
            _ => Selection::Node(id),
        };
        self.lines_dirty = true;
    }

    /// Expanding one cluster collapses any other.
    pub(in crate::app) fn toggle_expansion(&mut self, super_id: usize) {
        self.expanded = if self.expanded == Some(super_id) {
            None
        } else {
            Some(super_id)
        };
        self.lines_dirty = true;
    }

    /// Selects a peer, unfolding its cluster if needed; returns where to focus the camera.
    pub(in crate::app) fn reveal(&mut self, peer: usize) -> Option<Vec3> {
        let node = self.nodes.get(peer)?;
        if !node.is_visible_kind() {
            return None;
        }
        if let NodeKind::Sub { parent } = node.kind {
            self.expanded = Some(parent);
        }
        self.selection = Selection::Node(peer);
        self.lines_dirty = true;
        Some(self.nodes[peer].position())
    }

    pub(in crate::app) fn clear(&mut self) {
        self.selection = Selection::Nothing;
        self.expanded = None;
        self.lines_dirty = true;
    }

    pub(in crate::app) fn cycle_color_mode(&mut self) -> Metric {
        self.color_mode = self.color_mode.next();
        self.color_mode
    }

    pub(in crate::app) fn set_color_mode(&mut self, mode: Metric) {
        self.color_mode = mode;
    }

    pub(in crate::app) fn cycle_connection_mode(&mut self) -> ConnectionMode {
        self.set_connection_mode(self.connection_mode.next(self.small_graph));
        self.connection_mode
    }

    pub(in crate::app) fn set_connection_mode(&mut self, mode: ConnectionMode) {
        let mode = if mode == ConnectionMode::All && !self.small_graph {
            log::debug!("drawing every connection is limited to small graphs");
            ConnectionMode::Selected
        } else {
            mode
        };
        if mode != self.connection_mode {
            self.connection_mode = mode;
            self.lines_dirty = true;
        }
    }

    pub(in crate::app) fn class_frames(&self) -> [ClassFrame; 3] {
        self.buffers.each_ref().map(|buffer| ClassFrame {
            records: buffer.records().to_vec(),
            revision: buffer.revision(),
        })
    }

    pub(in crate::app) fn lines(&self) -> &[LineInstance] {
        &self.lines
    }

    #[cfg(test)]
    pub(in crate::app) fn selection(&self) -> Selection {
        self.selection
    }

    pub(in crate::app) fn selected_peer(&self) -> Option<&PeerRecord> {
        match self.selection {
            Selection::Node(id) => self.nodes[id].peer.map(|peer| &self.snapshot.peers[peer]),
            Selection::Nothing => None,
        }
    }

    /// Clip-space center of the selected node, from the last update.
    pub(in crate::app) fn selected_clip_center(&self) -> Option<Vec4> {
        match self.selection {
            Selection::Node(id) => Some(self.nodes[id].clip_center()),
            Selection::Nothing => None,
        }
    }

    /// Size of the cluster holding `peer`, when it is folded into one.
    pub(in crate::app) fn cluster_size(&self, peer: usize) -> Option<usize> {
        match self.nodes.get(peer)?.kind {
            NodeKind::Sub { parent } => match &self.nodes[parent].kind {
                NodeKind::Super { children } => Some(children.len()),
                _ => None,
            },
            _ => None,
        }
    }

    pub(in crate::app) fn neighbors(&self, peer: usize) -> &[usize] {
        self.adjacency.get(peer).map_or(&[][..], Vec::as_slice)
    }

    #[cfg(test)]
    pub(in crate::app) fn expanded(&self) -> Option<usize> {
        self.expanded
    }

    pub(in crate::app) fn color_mode(&self) -> Metric {
        self.color_mode
    }

    pub(in crate::app) fn connection_mode(&self) -> ConnectionMode {
        self.connection_mode
    }

    pub(in crate::app) fn range(&self, metric: Metric) -> MetricRange {
        self.ranges[metric.index()]
    }

    pub(in crate::app) fn counts(&self) -> KindCounts {
        self.counts
    }

    pub(in crate::app) fn small_graph(&self) -> bool {
        self.small_graph
    }

    pub(in crate::app) fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::snapshot::snapshot_from_json;

    // Peers 0 and 2 share Berlin; 1, 3 and 4 stand alone. Super id is 5.
    const SAMPLE: &str = r#"{"nodes": [
        {"address": "/ip4/1.1.1.1/tcp/1", "betweenness": 0.4, "closeness": 0.1, "connections": [1, 2],
         "geolocation": {"lat": 52.5, "long": 13.4}},
        {"address": "/ip4/1.1.1.2/tcp/1", "betweenness": 0.1, "closeness": 0.3, "connections": [3],
         "geolocation": {"lat": 10.0, "long": 10.0}},
        {"address": "/ip4/1.1.1.3/tcp/1", "betweenness": 0.0, "closeness": 0.2, "connections": [],
         "geolocation": {"lat": 52.5, "long": 13.4}},
        {"address": "/ip4/1.1.1.4/tcp/1", "betweenness": 0.2, "closeness": 0.6, "connections": [4],
         "geolocation": {"lat": -33.0, "long": 151.0}},
        {"address": "/ip4/1.1.1.5/tcp/1", "betweenness": 0.3, "closeness": 0.5, "connections": [0],
         "geolocation": {"lat": 40.7, "long": -74.0}}
    ]}"#;

    fn clustered() -> World {
        World::new(snapshot_from_json(SAMPLE, "test").expect("valid sample"), 0)
    }

    fn unclustered() -> World {
        World::new(snapshot_from_json(SAMPLE, "test").expect("valid sample"), 150)
    }

    #[test]
    fn buffers_hold_each_visible_node_once() {
        let world = clustered();
        let frames = world.class_frames();
        assert_eq!(frames[NodeClass::Single.index()].records.len(), 3);
        assert_eq!(frames[NodeClass::Super.index()].records.len(), 1);
        assert_eq!(frames[NodeClass::Sub.index()].records.len(), 2);
        assert_eq!(world.buffers[NodeClass::Sub.index()].node_ids(), &[0, 2]);
    }

    #[test]
    fn metric_ranges_cover_visible_peers() {
        let world = clustered();
        assert_eq!(world.range(Metric::Betweenness), MetricRange { min: 0.0, max: 0.4 });
        assert_eq!(world.range(Metric::Closeness), MetricRange { min: 0.1, max: 0.6 });
        assert_eq!(world.range(Metric::Degree), MetricRange { min: 1.0, max: 3.0 });
    }

    #[test]
    fn clicking_selects_and_reclicking_clears() {
        let mut world = clustered();
        world.apply_pick(PickResult::Hit(1));
        assert_eq!(world.selection(), Selection::Node(1));
        world.apply_pick(PickResult::Hit(3));
        assert_eq!(world.selection(), Selection::Node(3));
        world.apply_pick(PickResult::Hit(3));
        assert_eq!(world.selection(), Selection::Nothing);
    }

    #[test]
    fn background_pick_leaves_selection_unchanged() {
        let mut world = clustered();
        world.apply_pick(PickResult::Hit(4));
        world.toggle_expansion(5);
        world.apply_pick(PickResult::Miss);
        assert_eq!(world.selection(), Selection::Node(4));
        assert_eq!(world.expanded(), Some(5));
    }

    #[test]
    fn out_of_range_pick_is_ignored() {
        let mut world = clustered();
        world.apply_pick(PickResult::Hit(4000));
        assert_eq!(world.selection(), Selection::Nothing);
    }

    #[test]
    fn expanding_one_cluster_collapses_the_other() {
        let raw = r#"{"nodes": [
            {"address": "a", "geolocation": {"lat": 1.0, "long": 1.0}},
            {"address": "b", "geolocation": {"lat": 1.0, "long": 1.0}},
            {"address": "c", "geolocation": {"lat": 30.0, "long": 30.0}},
            {"address": "d", "geolocation": {"lat": 30.0, "long": 30.0}}
        ]}"#;
        let mut world = World::new(snapshot_from_json(raw, "test").expect("valid"), 0);
        let (a, b) = (4, 5);
        world.click_node(a);
        assert_eq!(world.expanded(), Some(a));
        world.click_node(b);
        assert_eq!(world.expanded(), Some(b));
        world.click_node(b);
        assert_eq!(world.expanded(), None);
    }

    #[test]
    fn folded_subs_are_displaced_until_expanded() {
        let mut world = clustered();
        let camera = Camera::new(Vec2::new(800.0, 600.0));
        let sub_z = |world: &World| {
            world.buffers[NodeClass::Sub.index()].records()[0].transform[3][2]
        };
        let super_z = |world: &World| {
            world.buffers[NodeClass::Super.index()].records()[0].transform[3][2]
        };

        world.update(&camera, 0.016);
        assert!(sub_z(&world) < -1000.0);
        assert!(super_z(&world) > -1.0);

        world.toggle_expansion(5);
        world.update(&camera, 0.016);
        assert!(sub_z(&world) > -1.0);
        assert!(super_z(&world) < -1000.0);
    }

    #[test]
    fn all_connections_are_drawn_once() {
        let mut world = unclustered();
        world.set_connection_mode(ConnectionMode::All);
        world.update(&Camera::new(Vec2::new(800.0, 600.0)), 0.0);
        assert_eq!(world.lines().len(), world.snapshot().edge_count);
        assert_eq!(world.lines().len(), 5);
    }

    #[test]
    fn all_connections_are_limited_to_small_graphs() {
        let mut world = clustered();
        assert_eq!(world.cycle_connection_mode(), ConnectionMode::Selected);
        assert_eq!(world.cycle_connection_mode(), ConnectionMode::None);

        let mut small = unclustered();
        small.cycle_connection_mode();
        assert_eq!(small.cycle_connection_mode(), ConnectionMode::All);
    }

    #[test]
    fn selected_connections_snap_to_folded_cluster() {
        let mut world = clustered();
        world.set_connection_mode(ConnectionMode::Selected);
        world.click_node(1);
        world.update(&Camera::new(Vec2::new(800.0, 600.0)), 0.0);

        assert_eq!(world.lines().len(), 2);
        let super_position = world.nodes[5].position().extend(1.0).to_array();
        assert!(world.lines().iter().any(|line| line.end == super_position));
    }

    #[test]
    fn reveal_unfolds_the_cluster() {
        let mut world = clustered();
        let focus = world.reveal(2).expect("visible peer");
        assert_eq!(world.expanded(), Some(5));
        assert_eq!(world.selection(), Selection::Node(2));
        assert_eq!(focus, world.nodes[2].position());
        assert_eq!(world.cluster_size(2), Some(2));
        assert_eq!(world.cluster_size(1), None);
    }

    #[test]
    fn color_mode_cycles_through_every_metric() {
        let mut world = clustered();
        assert_eq!(world.cycle_color_mode(), Metric::Closeness);
        assert_eq!(world.cycle_color_mode(), Metric::Degree);
        assert_eq!(world.cycle_color_mode(), Metric::Betweenness);
    }
}
