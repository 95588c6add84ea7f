//! Sheet canvas camera: zoom and pan.
//!
//! Screen coordinates are `world * zoom + pan`.

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 4.0;
pub const ZOOM_STEP: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    zoom: f64,
    pan: Point,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Point::default(),
        }
    }
}

impl Camera {
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn pan(&self) -> Point {
        self.pan
    }

    /// Clamped to `[MIN_ZOOM, MAX_ZOOM]`; non-finite values are ignored.
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom * ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom / ZOOM_STEP);
    }

    /// Scale by `factor` keeping the world point under `focal` (screen
    /// coordinates) in place.
    pub fn zoom_at(&mut self, factor: f64, focal: Point) {
        let anchor = self.screen_to_world(focal);
        self.set_zoom(self.zoom * factor);
        self.pan = Point::new(
            focal.x - anchor.x * self.zoom,
            focal.y - anchor.y * self.zoom,
        );
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan = Point::new(self.pan.x + dx, self.pan.y + dy);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.pan.x) / self.zoom,
            (screen.y - self.pan.y) / self.zoom,
        )
    }

    pub fn world_to_screen(&self, world: Point) -> Point {
        Point::new(world.x * self.zoom + self.pan.x, world.y * self.zoom + self.pan.y)
    }
}
