use glam::{Vec2, Vec3};

pub(in crate::app) const WORLD_WIDTH: f32 = 360.0;
pub(in crate::app) const WORLD_HEIGHT: f32 = 180.0;

/// Center-to-center distance between neighbouring peers of one bucket.
const CLUSTER_SPACING: f32 = 0.45;
/// Rings of 1, 6, 12 and 18 slots.
const HEX_RINGS: i32 = 3;
pub(in crate::app) const HEX_SLOTS: usize = 37;

// Axial neighbour directions, walked in order around a ring.
const AXIAL_DIRECTIONS: [(i32, i32); 6] = [(1, 0), (1, -1), (0, -1), (-1, 0), (-1, 1), (0, 1)];

/// Equal-area pseudo-cylindrical projection of a geolocation onto the map plane.
pub(in crate::app) fn project_geolocation(lat: f64, long: f64) -> Vec2 {
    let u = ((long + 180.0) / 360.0).clamp(0.0, 1.0) as f32;
    let v = ((lat + 90.0) / 180.0).clamp(0.0, 1.0) as f32;
    let dv = v - 0.5;
    let squeezed = 0.5 + (u - 0.5) * (1.0 - 3.0 * dv * dv).sqrt();
    Vec2::new((squeezed - 0.5) * WORLD_WIDTH, dv * WORLD_HEIGHT)
}

fn hex_ring_axial(slot: usize) -> (i32, i32) {
    if slot == 0 {
        return (0, 0);
    }
    let mut remaining = slot - 1;
    for ring in 1..=HEX_RINGS {
        let ring_len = 6 * ring as usize;
        if remaining < ring_len {
            let (mut q, mut r) = (-ring, ring);
            for (dq, dr) in AXIAL_DIRECTIONS {
                for _ in 0..ring {
                    if remaining == 0 {
                        return (q, r);
                    }
                    remaining -= 1;
                    q += dq;
                    r += dr;
                }
            }
        }
        remaining -= ring_len;
    }
    (0, 0)
}

/// Concentric hexagonal slots; every 37 members start a new layer above the previous one.
pub(in crate::app) fn hex_ring_offset(index: usize) -> Vec3 {
    let layer = index / HEX_SLOTS;
    let (q, r) = hex_ring_axial(index % HEX_SLOTS);
    Vec3::new(
        CLUSTER_SPACING * (q as f32 + r as f32 * 0.5),
        CLUSTER_SPACING * (3.0_f32.sqrt() * 0.5) * r as f32,
        CLUSTER_SPACING * layer as f32,
    )
}

/// Smallest cube edge holding `count` members.
pub(in crate::app) fn grid_edge(count: usize) -> usize {
    let mut edge = 1;
    while edge * edge * edge < count {
        edge += 1;
    }
    edge
}

/// Cubic grid slot, centered on the bucket in x and y.
pub(in crate::app) fn grid_offset(index: usize, count: usize) -> Vec3 {
    let edge = grid_edge(count);
    let center = (edge as f32 - 1.0) * 0.5;
    let column = (index % edge) as f32;
    let row = ((index / edge) % edge) as f32;
    let layer = (index / (edge * edge)) as f32;
    Vec3::new(
        (column - center) * CLUSTER_SPACING,
        (row - center) * CLUSTER_SPACING,
        layer * CLUSTER_SPACING,
    )
}

pub(in crate::app) fn cluster_offset(small_graph: bool, index: usize, count: usize) -> Vec3 {
    if count <= 1 {
        Vec3::ZERO
    } else if small_graph {
        hex_ring_offset(index)
    } else {
        grid_offset(index, count)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn projection_maps_extremes_to_world_edges() {
        assert_eq!(project_geolocation(0.0, 0.0), Vec2::ZERO);
        let east = project_geolocation(0.0, 180.0);
        assert!((east.x - WORLD_WIDTH * 0.5).abs() < 1.0e-3);
        let north = project_geolocation(90.0, 0.0);
        assert!((north.y - WORLD_HEIGHT * 0.5).abs() < 1.0e-3);
    }

    #[test]
    fn projection_squeezes_high_latitudes() {
        let equator = project_geolocation(0.0, 120.0);
        let arctic = project_geolocation(80.0, 120.0);
        assert!(arctic.x < equator.x);
        assert!(arctic.x > 0.0);
    }

    #[test]
    fn hex_slots_are_distinct_and_sized_by_ring() {
        let slots: Vec<_> = (0..HEX_SLOTS).map(hex_ring_axial).collect();
        let unique: HashSet<_> = slots.iter().copied().collect();
        assert_eq!(unique.len(), HEX_SLOTS);

        let ring_of = |(q, r): (i32, i32)| (q.abs() + r.abs() + (q + r).abs()) / 2;
        let mut per_ring = [0; 4];
        for slot in slots {
            per_ring[ring_of(slot) as usize] += 1;
        }
        assert_eq!(per_ring, [1, 6, 12, 18]);
    }

    #[test]
    fn hex_overflow_stacks_layers() {
        let first = hex_ring_offset(3);
        let stacked = hex_ring_offset(3 + HEX_SLOTS);
        assert_eq!(first.truncate(), stacked.truncate());
        assert!(stacked.z > first.z);
    }

    #[test]
    fn grid_edge_is_ceiling_cube_root() {
        assert_eq!(grid_edge(1), 1);
        assert_eq!(grid_edge(8), 2);
        assert_eq!(grid_edge(9), 3);
        assert_eq!(grid_edge(27), 3);
        assert_eq!(grid_edge(28), 4);
    }

    #[test]
    fn grid_slots_are_distinct_and_centered() {
        let offsets: Vec<_> = (0..27).map(|index| grid_offset(index, 27)).collect();
        let unique: HashSet<_> = offsets
            .iter()
            .map(|offset| offset.to_array().map(f32::to_bits))
            .collect();
        assert_eq!(unique.len(), 27);
        let first_layer = offsets.iter().take(9).fold(Vec2::ZERO, |sum, offset| sum + offset.truncate());
        assert!(first_layer.length() < 1.0e-4);
    }

    #[test]
    fn offsets_are_deterministic() {
        for index in 0..80 {
            assert_eq!(cluster_offset(true, index, 80), cluster_offset(true, index, 80));
            assert_eq!(cluster_offset(false, index, 80), cluster_offset(false, index, 80));
        }
        assert_eq!(cluster_offset(true, 0, 1), Vec3::ZERO);
    }
}
