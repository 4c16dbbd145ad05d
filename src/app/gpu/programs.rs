use anyhow::{Context as _, Result, anyhow, bail};
use eframe::glow::{self, HasContext as _};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum ProgramKind {
    LitNode,
    IdPicker,
    TexturedMap,
    ConnectionLine,
    TextureOverlay,
}

impl ProgramKind {
    const ALL: [ProgramKind; 5] = [
        ProgramKind::LitNode,
        ProgramKind::IdPicker,
        ProgramKind::TexturedMap,
        ProgramKind::ConnectionLine,
        ProgramKind::TextureOverlay,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::LitNode => "lit node",
            Self::IdPicker => "id picker",
            Self::TexturedMap => "textured map",
            Self::ConnectionLine => "connection line",
            Self::TextureOverlay => "texture overlay",
        }
    }

    fn sources(self) -> (&'static str, &'static str) {
        match self {
            Self::LitNode => (NODE_VERTEX, LIT_FRAGMENT),
            Self::IdPicker => (NODE_VERTEX, PICK_FRAGMENT),
            Self::TexturedMap => (MAP_VERTEX, MAP_FRAGMENT),
            Self::ConnectionLine => (LINE_VERTEX, LINE_FRAGMENT),
            Self::TextureOverlay => (OVERLAY_VERTEX, OVERLAY_FRAGMENT),
        }
    }
}

// Attribute locations shared with the instance tables:
// 0 position, 1 normal/uv, 2 color/start, 3 metadata/end, 4 pick/color, 5..=8 transform.
const NODE_VERTEX: &str = r#"
    layout(location = 0) in vec3 a_position;
    layout(location = 1) in vec3 a_normal;
    layout(location = 2) in vec4 i_color;
    layout(location = 3) in vec4 i_metadata;
    layout(location = 4) in vec4 i_pick;
    layout(location = 5) in mat4 i_transform;

    uniform mat4 u_view_projection;

    out vec3 v_normal;
    out vec4 v_color;
    out vec4 v_pick;
    out float v_glow;

    void main() {
        gl_Position = u_view_projection * i_transform * vec4(a_position, 1.0);
        v_normal = normalize(mat3(i_transform) * a_normal);
        v_color = i_color;
        v_pick = i_pick;
        v_glow = clamp(log(1.0 + i_metadata.x) / 6.0, 0.0, 1.0);
    }
"#;

const LIT_FRAGMENT: &str = r#"
    precision mediump float;
    in vec3 v_normal;
    in vec4 v_color;
    in vec4 v_pick;
    in float v_glow;
    out vec4 out_color;

    const vec3 LIGHT = normalize(vec3(0.35, 0.55, 0.75));

    void main() {
        float diffuse = max(dot(normalize(v_normal), LIGHT), 0.0);
        vec3 lit = v_color.rgb * (0.35 + 0.65 * diffuse) + v_color.rgb * 0.25 * v_glow;
        out_color = vec4(min(lit, vec3(1.0)), v_color.a);
    }
"#;

const PICK_FRAGMENT: &str = r#"
    precision mediump float;
    in vec3 v_normal;
    in vec4 v_color;
    in vec4 v_pick;
    in float v_glow;
    out vec4 out_color;

    void main() {
        out_color = v_pick;
    }
"#;

const MAP_VERTEX: &str = r#"
    layout(location = 0) in vec2 a_position;
    layout(location = 1) in vec2 a_uv;

    uniform mat4 u_view_projection;

    out vec2 v_uv;

    void main() {
        gl_Position = u_view_projection * vec4(a_position, -0.5, 1.0);
        v_uv = a_uv;
    }
"#;

// The quad spans the projected extent; undo the pseudo-cylindrical squeeze
// to sample an equirectangular image.
const MAP_FRAGMENT: &str = r#"
    precision mediump float;
    in vec2 v_uv;
    out vec4 out_color;

    uniform sampler2D u_map;
    uniform vec4 u_tint;

    void main() {
        float dv = v_uv.y - 0.5;
        float squeeze = sqrt(1.0 - 3.0 * dv * dv);
        float u = 0.5 + (v_uv.x - 0.5) / squeeze;
        if (u < 0.0 || u > 1.0) {
            discard;
        }
        vec4 texel = texture(u_map, vec2(u, 1.0 - v_uv.y));
        out_color = vec4(texel.rgb * u_tint.rgb, u_tint.a);
    }
"#;

const LINE_VERTEX: &str = r#"
    layout(location = 0) in vec3 a_position;
    layout(location = 2) in vec4 i_start;
    layout(location = 3) in vec4 i_end;
    layout(location = 4) in vec4 i_color;

    uniform mat4 u_view_projection;

    out vec4 v_color;

    void main() {
        vec3 point = mix(i_start.xyz, i_end.xyz, a_position.x);
        gl_Position = u_view_projection * vec4(point, 1.0);
        v_color = i_color;
    }
"#;

const LINE_FRAGMENT: &str = r#"
    precision mediump float;
    in vec4 v_color;
    out vec4 out_color;

    void main() {
        out_color = v_color;
    }
"#;

const OVERLAY_VERTEX: &str = r#"
    layout(location = 0) in vec2 a_position;
    layout(location = 1) in vec2 a_uv;

    uniform vec4 u_rect;

    out vec2 v_uv;

    void main() {
        gl_Position = vec4(mix(u_rect.xy, u_rect.zw, a_position), 0.0, 1.0);
        v_uv = a_uv;
    }
"#;

const OVERLAY_FRAGMENT: &str = r#"
    precision mediump float;
    in vec2 v_uv;
    out vec4 out_color;

    uniform sampler2D u_texture;

    void main() {
        vec4 texel = texture(u_texture, v_uv);
        out_color = vec4(texel.rgb, 1.0);
    }
"#;

/// Linked programs for the whole render session, indexed by [`ProgramKind`].
pub(in crate::app) struct ProgramRegistry {
    programs: [glow::Program; 5],
}

impl ProgramRegistry {
    pub(in crate::app) fn new(gl: &glow::Context) -> Result<Self> {
        let shader_version = if cfg!(target_arch = "wasm32") {
            "#version 300 es"
        } else {
            "#version 330"
        };

        let mut linked = Vec::with_capacity(ProgramKind::ALL.len());
        for kind in ProgramKind::ALL {
            match compile_program(gl, shader_version, kind) {
                Ok(program) => linked.push(program),
                Err(error) => {
                    for program in linked {
                        unsafe { gl.delete_program(program) };
                    }
                    return Err(error);
                }
            }
        }

        let programs: [glow::Program; 5] = linked
            .try_into()
            .map_err(|_| anyhow!("program registry size mismatch"))?;
        log::info!("compiled {} GL programs ({shader_version})", programs.len());
        Ok(Self { programs })
    }

    pub(in crate::app) fn get(&self, kind: ProgramKind) -> glow::Program {
        self.programs[kind as usize]
    }

    pub(in crate::app) fn destroy(&self, gl: &glow::Context) {
        for program in self.programs {
            unsafe { gl.delete_program(program) };
        }
    }
}

fn compile_program(gl: &glow::Context, version: &str, kind: ProgramKind) -> Result<glow::Program> {
    let (vertex_source, fragment_source) = kind.sources();
    unsafe {
        let program = gl
            .create_program()
            .map_err(|error| anyhow!(error))
            .with_context(|| format!("failed to create {} program", kind.label()))?;

        let mut shaders = Vec::with_capacity(2);
        let mut failure = None;
        for (stage, source) in [
            (glow::VERTEX_SHADER, vertex_source),
            (glow::FRAGMENT_SHADER, fragment_source),
        ] {
            let shader = match gl.create_shader(stage) {
                Ok(shader) => shader,
                Err(error) => {
                    failure = Some(anyhow!(error));
                    break;
                }
            };
            gl.shader_source(shader, &format!("{version}\n{source}"));
            gl.compile_shader(shader);
            gl.attach_shader(program, shader);
            shaders.push(shader);
            if !gl.get_shader_compile_status(shader) {
                failure = Some(anyhow!(gl.get_shader_info_log(shader)));
                break;
            }
        }

        if failure.is_none() {
            gl.link_program(program);
            if !gl.get_program_link_status(program) {
                failure = Some(anyhow!(gl.get_program_info_log(program)));
            }
        }

        for shader in shaders {
            gl.detach_shader(program, shader);
            gl.delete_shader(shader);
        }

        if let Some(error) = failure {
            gl.delete_program(program);
            bail!("failed to build {} program: {error}", kind.label());
        }

        log::debug!("linked {} program", kind.label());
        Ok(program)
    }
}
