use glam::Vec2;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

/// Quad mesh baked from a particle pool
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a camera-facing quad centred on `center`
    pub fn push_quad(&mut self, center: Vec2, half_size: f32, color: [f32; 4]) {
        let base = self.vertices.len() as u32;
        let corners = [
            (Vec2::new(-1.0, -1.0), [0.0, 0.0]),
            (Vec2::new(1.0, -1.0), [1.0, 0.0]),
            (Vec2::new(1.0, 1.0), [1.0, 1.0]),
            (Vec2::new(-1.0, 1.0), [0.0, 1.0]),
        ];
        for (corner, uv) in corners {
            let position = center + corner * half_size;
            self.vertices.push(Vertex {
                position: position.to_array(),
                uv,
                color,
            });
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// One renderer slot of a particle entity
#[derive(Debug, Default)]
pub struct ParticleRenderer {
    mesh: RefCell<Rc<Mesh>>,
    bakes: Cell<u64>,
}

impl ParticleRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the displayed mesh
    pub fn set_mesh(&self, mesh: Rc<Mesh>) {
        *self.mesh.borrow_mut() = mesh;
        self.bakes.set(self.bakes.get() + 1);
    }

    pub fn mesh(&self) -> Rc<Mesh> {
        self.mesh.borrow().clone()
    }

    /// Number of times a mesh has been assigned
    pub fn bakes(&self) -> u64 {
        self.bakes.get()
    }
}
