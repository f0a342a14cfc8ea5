use std::cell::Cell;

/// Host surface particles are drawn onto
#[derive(Debug)]
pub struct Canvas {
    scale_factor: Cell<f32>,
    enabled: Cell<bool>,
}

impl Canvas {
    pub fn new(scale_factor: f32) -> Self {
        Self {
            scale_factor: Cell::new(scale_factor),
            enabled: Cell::new(true),
        }
    }

    pub fn scale_factor(&self) -> f32 {
        self.scale_factor.get()
    }

    pub fn set_scale_factor(&self, scale_factor: f32) {
        self.scale_factor.set(scale_factor);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Per-frame timing shared by every entity in a scene
#[derive(Debug, Default)]
pub struct FrameTime {
    frame: Cell<u64>,
    delta: Cell<f32>,
    elapsed: Cell<f64>,
}

impl FrameTime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new frame lasting `delta` seconds
    pub fn advance(&self, delta: f32) {
        self.frame.set(self.frame.get() + 1);
        self.delta.set(delta);
        self.elapsed.set(self.elapsed.get() + f64::from(delta));
    }

    /// Frames started so far
    pub fn frame(&self) -> u64 {
        self.frame.get()
    }

    pub fn delta(&self) -> f32 {
        self.delta.get()
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_time_accumulates() {
        let time = FrameTime::new();
        time.advance(0.5);
        time.advance(0.25);
        assert_eq!(time.frame(), 2);
        assert_eq!(time.delta(), 0.25);
        assert!((time.elapsed() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn canvas_toggles() {
        let canvas = Canvas::new(2.0);
        assert!(canvas.is_enabled());
        canvas.set_enabled(false);
        assert!(!canvas.is_enabled());
        canvas.set_scale_factor(0.5);
        assert_eq!(canvas.scale_factor(), 0.5);
    }
}
