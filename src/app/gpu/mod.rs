use anyhow::{Context as _, Result, anyhow};
use eframe::glow::{self, HasContext as _};
use glam::{Mat4, Vec2};

use super::world::{
    InstanceAttribute, LINE_INSTANCE_ATTRIBUTES, LINE_INSTANCE_STRIDE, LineInstance,
    NODE_INSTANCE_ATTRIBUTES, NODE_INSTANCE_STRIDE, NodeClass, NodeInstance,
};

mod geometry;
mod picker;
mod programs;

use geometry::{MeshVertex, QuadVertex};
pub(in crate::app) use picker::{PICK_ID_CAPACITY, PickResult, pick_color_rgba};
use picker::Picker;
use programs::{ProgramKind, ProgramRegistry};

/// Bottom-left corner of the picker inset and its side, in NDC.
const INSET_ORIGIN: [f32; 2] = [0.52, -0.96];
const INSET_SIDE: f32 = 0.44;
const MAP_TINT: [f32; 4] = [0.78, 0.8, 0.84, 1.0];

/// Decoded RGBA8 map image, rows top to bottom.
pub(in crate::app) struct MapImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// One class's instance records for this frame.
#[derive(Clone, Debug, Default)]
pub(in crate::app) struct ClassFrame {
    pub records: Vec<NodeInstance>,
    pub revision: u64,
}

/// Everything the paint callback needs, captured by value.
#[derive(Clone, Debug, Default)]
pub(in crate::app) struct FrameData {
    pub clear_color: [f32; 3],
    pub view_projection: Mat4,
    pub classes: [ClassFrame; 3],
    pub lines: Vec<LineInstance>,
    pub show_map: bool,
    /// Normalized canvas coordinates of a pending click.
    pub pick_request: Option<Vec2>,
    pub picker_inset: bool,
}

/// Canvas placement in framebuffer pixels, GL bottom-left origin.
#[derive(Clone, Copy, Debug)]
pub(in crate::app) struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

struct Mesh {
    buffer: glow::Buffer,
    vertex_count: i32,
}

struct InstanceBatch {
    vertex_array: glow::VertexArray,
    buffer: glow::Buffer,
    capacity: usize,
    revision: Option<u64>,
    count: i32,
}

impl InstanceBatch {
    fn new(
        gl: &glow::Context,
        mesh: &Mesh,
        stride: usize,
        attributes: &[InstanceAttribute],
    ) -> Result<Self> {
        unsafe {
            let vertex_array = gl
                .create_vertex_array()
                .map_err(|error| anyhow!(error))
                .context("failed to create instance vertex array")?;
            let buffer = gl
                .create_buffer()
                .map_err(|error| anyhow!(error))
                .context("failed to create instance buffer")?;

            gl.bind_vertex_array(Some(vertex_array));
            bind_mesh_attributes(gl, mesh);

            gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            for attribute in attributes {
                gl.enable_vertex_attrib_array(attribute.location);
                gl.vertex_attrib_pointer_f32(
                    attribute.location,
                    attribute.components,
                    glow::FLOAT,
                    false,
                    stride as i32,
                    attribute.offset as i32,
                );
                gl.vertex_attrib_divisor(attribute.location, 1);
            }
            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);

            Ok(Self {
                vertex_array,
                buffer,
                capacity: 0,
                revision: None,
                count: 0,
            })
        }
    }

    /// Full upload when the structure changed or the data outgrew the buffer, in-place otherwise.
    fn upload(&mut self, gl: &glow::Context, bytes: &[u8], count: usize, revision: Option<u64>) {
        self.count = count as i32;
        if bytes.is_empty() {
            return;
        }
        unsafe {
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.buffer));
            let stale = revision.is_some() && revision != self.revision;
            if stale || bytes.len() > self.capacity {
                gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytes, glow::DYNAMIC_DRAW);
                self.capacity = bytes.len();
                self.revision = revision;
            } else {
                gl.buffer_sub_data_u8_slice(glow::ARRAY_BUFFER, 0, bytes);
            }
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    fn draw(&self, gl: &glow::Context, mode: u32, mesh: &Mesh) {
        if self.count == 0 {
            return;
        }
        unsafe {
            gl.bind_vertex_array(Some(self.vertex_array));
            gl.draw_arrays_instanced(mode, 0, mesh.vertex_count, self.count);
        }
    }

    fn destroy(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_vertex_array(self.vertex_array);
            gl.delete_buffer(self.buffer);
        }
    }
}

struct QuadBatch {
    vertex_array: glow::VertexArray,
    buffer: glow::Buffer,
    vertex_count: i32,
}

impl QuadBatch {
    fn new(gl: &glow::Context, vertices: &[QuadVertex]) -> Result<Self> {
        unsafe {
            let buffer = upload_static(gl, bytemuck::cast_slice(vertices))?;
            let vertex_array = gl
                .create_vertex_array()
                .map_err(|error| anyhow!(error))
                .context("failed to create quad vertex array")?;
            gl.bind_vertex_array(Some(vertex_array));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            let stride = size_of::<QuadVertex>() as i32;
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, stride, 0);
            gl.enable_vertex_attrib_array(1);
            gl.vertex_attrib_pointer_f32(1, 2, glow::FLOAT, false, stride, 8);
            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            Ok(Self {
                vertex_array,
                buffer,
                vertex_count: vertices.len() as i32,
            })
        }
    }

    fn draw(&self, gl: &glow::Context) {
        unsafe {
            gl.bind_vertex_array(Some(self.vertex_array));
            gl.draw_arrays(glow::TRIANGLES, 0, self.vertex_count);
        }
    }

    fn destroy(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_vertex_array(self.vertex_array);
            gl.delete_buffer(self.buffer);
        }
    }
}

unsafe fn upload_static(gl: &glow::Context, bytes: &[u8]) -> Result<glow::Buffer> {
    unsafe {
        let buffer = gl
            .create_buffer()
            .map_err(|error| anyhow!(error))
            .context("failed to create vertex buffer")?;
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
        gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytes, glow::STATIC_DRAW);
        gl.bind_buffer(glow::ARRAY_BUFFER, None);
        Ok(buffer)
    }
}

unsafe fn bind_mesh_attributes(gl: &glow::Context, mesh: &Mesh) {
    unsafe {
        let stride = size_of::<MeshVertex>() as i32;
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(mesh.buffer));
        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, stride, 0);
        gl.enable_vertex_attrib_array(1);
        gl.vertex_attrib_pointer_f32(1, 3, glow::FLOAT, false, stride, 12);
    }
}

fn create_mesh(gl: &glow::Context, vertices: &[MeshVertex]) -> Result<Mesh> {
    let buffer = unsafe { upload_static(gl, bytemuck::cast_slice(vertices))? };
    Ok(Mesh {
        buffer,
        vertex_count: vertices.len() as i32,
    })
}

/// Tracks whether the GL names held by a renderer may still be used.
#[derive(Debug, Default)]
struct Liveness {
    released: bool,
}

impl Liveness {
    fn is_live(&self) -> bool {
        !self.released
    }

    /// Marks the names released; true only on the first call.
    fn release(&mut self) -> bool {
        !std::mem::replace(&mut self.released, true)
    }
}

/// GPU session: every buffer, vertex array, texture and program lives here.
pub(in crate::app) struct SceneRenderer {
    programs: ProgramRegistry,
    picker: Picker,
    sphere: Mesh,
    cube: Mesh,
    segment: Mesh,
    main: [InstanceBatch; 3],
    pick: [InstanceBatch; 3],
    lines: InstanceBatch,
    map_quad: QuadBatch,
    inset_quad: QuadBatch,
    map_texture: Option<glow::Texture>,
    pick_result: Option<PickResult>,
    liveness: Liveness,
}

impl SceneRenderer {
    pub(in crate::app) fn new(gl: &glow::Context, world_width: f32, world_height: f32) -> Result<Self> {
        let programs = ProgramRegistry::new(gl)?;
        let picker = Picker::new(gl)?;
        let sphere = create_mesh(gl, &geometry::icosahedron())?;
        let cube = create_mesh(gl, &geometry::cube())?;
        let segment = create_mesh(gl, &geometry::line_segment())?;

        let node_batch = |class: NodeClass| {
            let mesh = if class == NodeClass::Super { &cube } else { &sphere };
            InstanceBatch::new(gl, mesh, NODE_INSTANCE_STRIDE, &NODE_INSTANCE_ATTRIBUTES)
        };
        let main = [
            node_batch(NodeClass::Single)?,
            node_batch(NodeClass::Super)?,
            node_batch(NodeClass::Sub)?,
        ];
        let pick = [
            node_batch(NodeClass::Single)?,
            node_batch(NodeClass::Super)?,
            node_batch(NodeClass::Sub)?,
        ];
        let lines = InstanceBatch::new(gl, &segment, LINE_INSTANCE_STRIDE, &LINE_INSTANCE_ATTRIBUTES)?;
        let map_quad = QuadBatch::new(gl, &geometry::map_quad(world_width, world_height))?;
        let inset_quad = QuadBatch::new(gl, &geometry::screen_quad())?;

        Ok(Self {
            programs,
            picker,
            sphere,
            cube,
            segment,
            main,
            pick,
            lines,
            map_quad,
            inset_quad,
            map_texture: None,
            pick_result: None,
            liveness: Liveness::default(),
        })
    }

    pub(in crate::app) fn set_map_texture(&mut self, gl: &glow::Context, image: &MapImage) -> Result<()> {
        unsafe {
            let texture = gl
                .create_texture()
                .map_err(|error| anyhow!(error))
                .context("failed to create map texture")?;
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                image.width as i32,
                image.height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(&image.rgba)),
            );
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
            gl.bind_texture(glow::TEXTURE_2D, None);

            if let Some(previous) = self.map_texture.replace(texture) {
                gl.delete_texture(previous);
            }
        }
        log::info!("map texture uploaded ({}x{})", image.width, image.height);
        Ok(())
    }

    pub(in crate::app) fn take_pick_result(&mut self) -> Option<PickResult> {
        self.pick_result.take()
    }

    fn class_mesh(&self, index: usize) -> &Mesh {
        if index == NodeClass::Super.index() {
            &self.cube
        } else {
            &self.sphere
        }
    }

    pub(in crate::app) fn paint(
        &mut self,
        gl: &glow::Context,
        frame: &FrameData,
        viewport: Viewport,
        target: Option<glow::Framebuffer>,
    ) {
        if !self.liveness.is_live() {
            log::debug!("skipping paint on a released scene renderer");
            return;
        }
        // The inset shows the id target, so it is refreshed every frame while visible.
        if frame.pick_request.is_some() || frame.picker_inset {
            for (batch, class) in self.pick.iter_mut().zip(&frame.classes) {
                batch.upload(
                    gl,
                    bytemuck::cast_slice(&class.records),
                    class.records.len(),
                    Some(class.revision),
                );
            }

            self.picker.pre_render(gl, frame.pick_request);
            unsafe {
                gl.disable(glow::BLEND);
                gl.enable(glow::DEPTH_TEST);
                gl.depth_func(glow::LESS);
                self.use_program(gl, ProgramKind::IdPicker, frame.view_projection);
            }
            for (index, batch) in self.pick.iter().enumerate() {
                batch.draw(gl, glow::TRIANGLES, self.class_mesh(index));
            }
            if let Some(result) = self.picker.post_render(gl) {
                self.pick_result = Some(result);
            }
            unsafe {
                gl.bind_framebuffer(glow::FRAMEBUFFER, target);
                gl.enable(glow::SCISSOR_TEST);
                gl.enable(glow::BLEND);
            }
        }

        for (batch, class) in self.main.iter_mut().zip(&frame.classes) {
            batch.upload(
                gl,
                bytemuck::cast_slice(&class.records),
                class.records.len(),
                Some(class.revision),
            );
        }
        self.lines
            .upload(gl, bytemuck::cast_slice(&frame.lines), frame.lines.len(), None);

        unsafe {
            gl.viewport(viewport.x, viewport.y, viewport.width, viewport.height);
            let [r, g, b] = frame.clear_color;
            gl.clear_color(r, g, b, 1.0);
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
            gl.enable(glow::DEPTH_TEST);
            gl.depth_func(glow::LESS);

            if frame.show_map
                && let Some(texture) = self.map_texture
            {
                let program = self.use_program(gl, ProgramKind::TexturedMap, frame.view_projection);
                gl.active_texture(glow::TEXTURE0);
                gl.bind_texture(glow::TEXTURE_2D, Some(texture));
                gl.uniform_1_i32(gl.get_uniform_location(program, "u_map").as_ref(), 0);
                gl.uniform_4_f32_slice(gl.get_uniform_location(program, "u_tint").as_ref(), &MAP_TINT);
                gl.depth_mask(false);
                self.map_quad.draw(gl);
                gl.depth_mask(true);
            }

            gl.enable(glow::BLEND);
            gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
            self.use_program(gl, ProgramKind::ConnectionLine, frame.view_projection);
            self.lines.draw(gl, glow::LINES, &self.segment);

            self.use_program(gl, ProgramKind::LitNode, frame.view_projection);
        }
        for (index, batch) in self.main.iter().enumerate() {
            batch.draw(gl, glow::TRIANGLES, self.class_mesh(index));
        }

        unsafe {
            if frame.picker_inset {
                gl.disable(glow::DEPTH_TEST);
                let program = self.programs.get(ProgramKind::TextureOverlay);
                gl.use_program(Some(program));
                let [x, y] = INSET_ORIGIN;
                gl.uniform_4_f32(
                    gl.get_uniform_location(program, "u_rect").as_ref(),
                    x,
                    y,
                    x + INSET_SIDE,
                    y + INSET_SIDE,
                );
                gl.active_texture(glow::TEXTURE0);
                gl.bind_texture(glow::TEXTURE_2D, Some(self.picker.texture()));
                gl.uniform_1_i32(gl.get_uniform_location(program, "u_texture").as_ref(), 0);
                self.inset_quad.draw(gl);
            }

            gl.bind_texture(glow::TEXTURE_2D, None);
            gl.bind_vertex_array(None);
            gl.use_program(None);
            gl.disable(glow::DEPTH_TEST);
        }
    }

    unsafe fn use_program(&self, gl: &glow::Context, kind: ProgramKind, view_projection: Mat4) -> glow::Program {
        let program = self.programs.get(kind);
        unsafe {
            gl.use_program(Some(program));
            gl.uniform_matrix_4_f32_slice(
                gl.get_uniform_location(program, "u_view_projection").as_ref(),
                false,
                &view_projection.to_cols_array(),
            );
        }
        program
    }

    pub(in crate::app) fn has_map(&self) -> bool {
        self.map_texture.is_some()
    }

    /// Deletes every GL object; later calls to `paint` and `destroy` do nothing.
    pub(in crate::app) fn destroy(&mut self, gl: &glow::Context) {
        if !self.liveness.release() {
            return;
        }
        self.programs.destroy(gl);
        self.picker.destroy(gl);
        for batch in self.main.iter().chain(&self.pick).chain([&self.lines]) {
            batch.destroy(gl);
        }
        self.map_quad.destroy(gl);
        self.inset_quad.destroy(gl);
        unsafe {
            for mesh in [&self.sphere, &self.cube, &self.segment] {
                gl.delete_buffer(mesh.buffer);
            }
            if let Some(texture) = self.map_texture {
                gl.delete_texture(texture);
            }
        }
        log::info!("scene renderer resources released");
    }
}
