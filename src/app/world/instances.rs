use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

/// Per-node record consumed by the instanced node programs.
///
/// | field        | offset | shader location |
/// |--------------|--------|-----------------|
/// | `color`      | 0      | 2               |
/// | `metadata`   | 16     | 3               |
/// | `pick_color` | 32     | 4               |
/// | `transform`  | 48..112| 5..=8 (columns) |
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub(in crate::app) struct NodeInstance {
    pub color: [f32; 4],
    /// Connection count, betweenness, closeness, id.
    pub metadata: [f32; 4],
    pub pick_color: [f32; 4],
    pub transform: [[f32; 4]; 4],
}

/// Connection line endpoints and color; `w` of the endpoints is unused.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub(in crate::app) struct LineInstance {
    pub start: [f32; 4],
    pub end: [f32; 4],
    pub color: [f32; 4],
}

impl LineInstance {
    pub(in crate::app) fn new(start: Vec3, end: Vec3, color: Vec4) -> Self {
        Self {
            start: start.extend(1.0).to_array(),
            end: end.extend(1.0).to_array(),
            color: color.to_array(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) struct InstanceAttribute {
    pub location: u32,
    pub components: i32,
    pub offset: usize,
}

const fn attribute(location: u32, offset: usize) -> InstanceAttribute {
    InstanceAttribute {
        location,
        components: 4,
        offset,
    }
}

pub(in crate::app) const NODE_INSTANCE_STRIDE: usize = size_of::<NodeInstance>();

pub(in crate::app) const NODE_INSTANCE_ATTRIBUTES: [InstanceAttribute; 7] = [
    attribute(2, offset_of!(NodeInstance, color)),
    attribute(3, offset_of!(NodeInstance, metadata)),
    attribute(4, offset_of!(NodeInstance, pick_color)),
    attribute(5, offset_of!(NodeInstance, transform)),
    attribute(6, offset_of!(NodeInstance, transform) + 16),
    attribute(7, offset_of!(NodeInstance, transform) + 32),
    attribute(8, offset_of!(NodeInstance, transform) + 48),
];

pub(in crate::app) const LINE_INSTANCE_STRIDE: usize = size_of::<LineInstance>();

pub(in crate::app) const LINE_INSTANCE_ATTRIBUTES: [InstanceAttribute; 3] = [
    attribute(2, offset_of!(LineInstance, start)),
    attribute(3, offset_of!(LineInstance, end)),
    attribute(4, offset_of!(LineInstance, color)),
];

/// Node classes drawn with one instanced call each.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(in crate::app) enum NodeClass {
    Single,
    Super,
    Sub,
}

impl NodeClass {
    pub(in crate::app) fn index(self) -> usize {
        match self {
            Self::Single => 0,
            Self::Super => 1,
            Self::Sub => 2,
        }
    }
}

/// CPU copy of one class's instance data, in class-array order.
#[derive(Clone, Debug, Default)]
pub(in crate::app) struct InstanceBuffer {
    records: Vec<NodeInstance>,
    node_ids: Vec<usize>,
    revision: u64,
}

impl InstanceBuffer {
    /// Replaces the whole buffer; only done on structural change.
    pub(in crate::app) fn rebuild(&mut self, records: Vec<(usize, NodeInstance)>, revision: u64) {
        self.node_ids = records.iter().map(|(id, _)| *id).collect();
        self.records = records.into_iter().map(|(_, record)| record).collect();
        self.revision = revision;
    }

    pub(in crate::app) fn write_transform(&mut self, slot: usize, transform: Mat4) {
        if let Some(record) = self.records.get_mut(slot) {
            record.transform = transform.to_cols_array_2d();
        }
    }

    pub(in crate::app) fn write_color(&mut self, slot: usize, color: Vec4) {
        if let Some(record) = self.records.get_mut(slot) {
            record.color = color.to_array();
        }
    }

    pub(in crate::app) fn records(&self) -> &[NodeInstance] {
        &self.records
    }

    #[cfg(test)]
    pub(in crate::app) fn node_ids(&self) -> &[usize] {
        &self.node_ids
    }

    pub(in crate::app) fn revision(&self) -> u64 {
        self.revision
    }

    pub(in crate::app) fn len(&self) -> usize {
        self.records.len()
    }
}
