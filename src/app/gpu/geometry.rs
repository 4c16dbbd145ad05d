use bytemuck::{Pod, Zeroable};
use glam::Vec3;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(in crate::app) struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(in crate::app) struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

fn push_face(vertices: &mut Vec<MeshVertex>, a: Vec3, b: Vec3, c: Vec3) {
    let normal = (b - a).cross(c - a).normalize_or_zero();
    for corner in [a, b, c] {
        vertices.push(MeshVertex {
            position: corner.to_array(),
            normal: normal.to_array(),
        });
    }
}

/// Unit-radius icosahedron with flat per-face normals, 20 triangles.
pub(in crate::app) fn icosahedron() -> Vec<MeshVertex> {
    let phi = (1.0 + 5.0_f32.sqrt()) * 0.5;
    let corners = [
        Vec3::new(-1.0, phi, 0.0),
        Vec3::new(1.0, phi, 0.0),
        Vec3::new(-1.0, -phi, 0.0),
        Vec3::new(1.0, -phi, 0.0),
        Vec3::new(0.0, -1.0, phi),
        Vec3::new(0.0, 1.0, phi),
        Vec3::new(0.0, -1.0, -phi),
        Vec3::new(0.0, 1.0, -phi),
        Vec3::new(phi, 0.0, -1.0),
        Vec3::new(phi, 0.0, 1.0),
        Vec3::new(-phi, 0.0, -1.0),
        Vec3::new(-phi, 0.0, 1.0),
    ]
    .map(Vec3::normalize);

    const FACES: [[usize; 3]; 20] = [
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    let mut vertices = Vec::with_capacity(FACES.len() * 3);
    for [a, b, c] in FACES {
        push_face(&mut vertices, corners[a], corners[b], corners[c]);
    }
    vertices
}

/// Axis-aligned cube spanning `[-0.5, 0.5]`, 12 triangles.
pub(in crate::app) fn cube() -> Vec<MeshVertex> {
    let mut vertices = Vec::with_capacity(36);
    for axis in 0..3 {
        for sign in [-1.0_f32, 1.0] {
            let mut normal = Vec3::ZERO;
            normal[axis] = sign;
            let u = Vec3::from_array({
                let mut u = [0.0; 3];
                u[(axis + 1) % 3] = 1.0;
                u
            });
            let v = normal.cross(u);
            let center = normal * 0.5;
            let corner = |su: f32, sv: f32| center + (u * su + v * sv) * 0.5;

            let (a, b, c, d) = (
                corner(-1.0, -1.0),
                corner(1.0, -1.0),
                corner(1.0, 1.0),
                corner(-1.0, 1.0),
            );
            push_face(&mut vertices, a, b, c);
            push_face(&mut vertices, a, c, d);
        }
    }
    vertices
}

/// Two vertices whose `x` is the interpolation parameter between the endpoints.
pub(in crate::app) fn line_segment() -> Vec<MeshVertex> {
    vec![
        MeshVertex {
            position: [0.0, 0.0, 0.0],
            normal: [0.0, 0.0, 1.0],
        },
        MeshVertex {
            position: [1.0, 0.0, 0.0],
            normal: [0.0, 0.0, 1.0],
        },
    ]
}

/// Two triangles covering the unit square, used for screen-space overlays.
pub(in crate::app) fn screen_quad() -> Vec<QuadVertex> {
    let corners = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
    corners
        .into_iter()
        .map(|corner| QuadVertex {
            position: corner,
            uv: corner,
        })
        .collect()
}

/// World-space quad centered on the origin covering the projected map.
pub(in crate::app) fn map_quad(width: f32, height: f32) -> Vec<QuadVertex> {
    screen_quad()
        .into_iter()
        .map(|vertex| QuadVertex {
            position: [
                (vertex.position[0] - 0.5) * width,
                (vertex.position[1] - 0.5) * height,
            ],
            uv: vertex.uv,
        })
        .collect()
}
