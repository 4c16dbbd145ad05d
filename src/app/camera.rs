use glam::{Mat4, Vec2, Vec3};

pub(in crate::app) const MIN_ZOOM_LOG: f32 = 1.0;
pub(in crate::app) const MAX_ZOOM_LOG: f32 = 6.2;
pub(in crate::app) const DEFAULT_ZOOM_LOG: f32 = 5.45;

const FIELD_OF_VIEW_DEG: f32 = 45.0;
const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 20_000.0;

/// Perspective camera looking straight down onto the map plane (z = 0).
///
/// Width and height of the visible world are always re-derived from the
/// logarithmic zoom in [`Camera::update`].
#[derive(Clone, Debug)]
pub(in crate::app) struct Camera {
    x: f32,
    y: f32,
    zoom_log: f32,
    viewport: Vec2,
    world_width: f32,
    world_height: f32,
    view_projection: Mat4,
}

impl Camera {
    pub(in crate::app) fn new(viewport: Vec2) -> Self {
        let mut camera = Self {
            x: 0.0,
            y: 0.0,
            zoom_log: DEFAULT_ZOOM_LOG,
            viewport: viewport.max(Vec2::ONE),
            world_width: 0.0,
            world_height: 0.0,
            view_projection: Mat4::IDENTITY,
        };
        camera.update();
        camera
    }

    pub(in crate::app) fn update(&mut self) {
        let distance = self.distance();
        let aspect = self.viewport.x / self.viewport.y;
        let fov = FIELD_OF_VIEW_DEG.to_radians();

        self.world_height = 2.0 * distance * (fov * 0.5).tan();
        self.world_width = self.world_height * aspect;
        let projection = Mat4::perspective_rh_gl(fov, aspect, NEAR_PLANE, FAR_PLANE);
        let view = Mat4::look_at_rh(
            Vec3::new(self.x, self.y, distance),
            Vec3::new(self.x, self.y, 0.0),
            Vec3::Y,
        );
        self.view_projection = projection * view;
    }

    /// Moves the camera by a screen-space delta in canvas pixels.
    pub(in crate::app) fn drag(&mut self, dx: f32, dy: f32) {
        self.x -= dx * self.world_width / self.viewport.x;
        self.y += dy * self.world_height / self.viewport.y;
        self.update();
    }

    /// Adds `delta` to the zoom logarithm and reports whether the range clamp engaged.
    ///
    /// With an anchor (canvas pixels) the world point under it stays put.
    pub(in crate::app) fn inc_zoom_logarithm(&mut self, delta: f32, anchor: Option<Vec2>) -> bool {
        let target = self.zoom_log + delta;
        let next = target.clamp(MIN_ZOOM_LOG, MAX_ZOOM_LOG);
        let clamped = next != target;

        let pinned = anchor.map(|anchor| (self.screen_to_ndc(anchor), self.screen_to_world(anchor)));

        self.zoom_log = next;
        self.update();

        if let Some((ndc, world)) = pinned {
            self.x = world.x - ndc.x * self.world_width * 0.5;
            self.y = world.y - ndc.y * self.world_height * 0.5;
            self.update();
        }

        clamped
    }

    pub(in crate::app) fn set_viewport(&mut self, size: Vec2) {
        let size = size.max(Vec2::ONE);
        if size == self.viewport {
            return;
        }
        self.viewport = size;
        self.update();
    }

    pub(in crate::app) fn focus(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
        self.update();
    }

    pub(in crate::app) fn reset(&mut self) {
        self.x = 0.0;
        self.y = 0.0;
        self.zoom_log = DEFAULT_ZOOM_LOG;
        self.update();
    }

    pub(in crate::app) fn screen_to_ndc(&self, screen: Vec2) -> Vec2 {
        Vec2::new(
            (2.0 * screen.x / self.viewport.x) - 1.0,
            1.0 - (2.0 * screen.y / self.viewport.y),
        )
    }

    /// Point on the map plane under a canvas position.
    pub(in crate::app) fn screen_to_world(&self, screen: Vec2) -> Vec3 {
        let ndc = self.screen_to_ndc(screen);
        Vec3::new(
            self.x + ndc.x * self.world_width * 0.5,
            self.y + ndc.y * self.world_height * 0.5,
            0.0,
        )
    }

    #[cfg(test)]
    pub(in crate::app) fn world_to_screen(&self, world: Vec3) -> Option<Vec2> {
        let clip = self.view_projection * world.extend(1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(Vec2::new(
            (ndc.x + 1.0) * 0.5 * self.viewport.x,
            (1.0 - ndc.y) * 0.5 * self.viewport.y,
        ))
    }

    pub(in crate::app) fn distance(&self) -> f32 {
        self.zoom_log.exp()
    }

    #[cfg(test)]
    pub(in crate::app) fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[cfg(test)]
    pub(in crate::app) fn zoom_log(&self) -> f32 {
        self.zoom_log
    }

    pub(in crate::app) fn viewport(&self) -> Vec2 {
        self.viewport
    }

    #[cfg(test)]
    pub(in crate::app) fn world_size(&self) -> Vec2 {
        Vec2::new(self.world_width, self.world_height)
    }

    pub(in crate::app) fn view_projection(&self) -> Mat4 {
        self.view_projection
    }
}
