use crate::Mat4;

/// Radians of rotation per pixel of drag.
pub const DEFAULT_SENSITIVITY: f32 = 0.01;

/// Mouse-drag rotation: horizontal motion spins around Y, vertical around X.
#[derive(Clone, Copy, Debug)]
pub struct OrbitController {
    pub yaw: f32,
    pub pitch: f32,
    pub sensitivity: f32,
    dragging: bool,
    last_cursor: Option<(f64, f64)>,
}

impl OrbitController {
    pub fn new(sensitivity: f32) -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            sensitivity,
            dragging: false,
            last_cursor: None,
        }
    }

    #[inline]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Start a drag from the last known cursor position.
    pub fn press(&mut self) {
        self.dragging = true;
    }

    pub fn release(&mut self) {
        self.dragging = false;
    }

    /// Feed a cursor position; rotates only while dragging.
    pub fn cursor_moved(&mut self, x: f64, y: f64) {
        if let Some((lx, ly)) = self.last_cursor {
            if self.dragging {
                self.yaw += (x - lx) as f32 * self.sensitivity;
                self.pitch += (y - ly) as f32 * self.sensitivity;
            }
        }
        self.last_cursor = Some((x, y));
    }

    /// Cursor left the window; the next position starts fresh.
    pub fn cursor_left(&mut self) {
        self.last_cursor = None;
    }

    /// `Ry(yaw) * Rx(pitch)`.
    #[inline]
    pub fn rotation(&self) -> Mat4 {
        Mat4::from_rotation_y(self.yaw) * Mat4::from_rotation_x(self.pitch)
    }
}

impl Default for OrbitController {
    fn default() -> Self {
        Self::new(DEFAULT_SENSITIVITY)
    }
}
