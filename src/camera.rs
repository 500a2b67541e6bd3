use nalgebra::{Isometry3, Perspective3, Point3, Vector3};

use crate::scene::Aabb;

/// A vertex after projection: viewport pixel coordinates plus a linear
/// depth value in `[0, 1]` between the near and far planes.
#[derive(Debug, Clone, Copy)]
pub struct ProjectedVertex {
    pub x: i32,
    pub y: i32,
    pub depth: f32,
}

/// Perspective camera. Defaults match the demo scene the pipeline was
/// built around: 45 degree vertical field of view, looking at a model
/// sitting near the origin.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub eye: Point3<f32>,
    pub target: Point3<f32>,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Point3::new(-1.8, 0.6, 2.7),
            target: Point3::new(0.0, 0.0, -0.2),
            fov_y: 45.0_f32.to_radians(),
            near: 0.25,
            far: 20.0,
        }
    }
}

impl Camera {
    /// Moves the camera back along its current direction until the scene's
    /// bounding sphere fits the vertical field of view. A degenerate
    /// bounding box leaves the camera untouched.
    pub fn fit(&mut self, bounds: Aabb) {
        let radius = bounds.radius();
        if radius <= f32::EPSILON {
            return;
        }
        let direction = (self.eye - self.target).normalize();
        let distance = radius / (self.fov_y / 2.0).sin();
        self.target = bounds.center();
        self.eye = self.target + direction * distance;
        self.far = self.far.max(distance + radius * 2.0);
    }

    fn view(&self) -> Isometry3<f32> {
        Isometry3::look_at_rh(&self.eye, &self.target, &Vector3::y())
    }

    /// Projects a world-space point into viewport pixels. Returns `None`
    /// for points at or in front of the near plane.
    pub fn project_vertex(
        &self,
        point: &Point3<f32>,
        width: u32,
        height: u32,
    ) -> Option<ProjectedVertex> {
        let v = self.view().transform_point(point);
        // View space looks down -z; anything nearer than the near plane
        // is dropped rather than clipped.
        if v.z >= -self.near {
            return None;
        }
        let aspect = width as f32 / height as f32;
        let projection = Perspective3::new(aspect, self.fov_y, self.near, self.far);
        let ndc = projection.project_point(&v);

        let x = ((ndc.x + 1.0) * 0.5 * width as f32) as i32;
        let y = ((1.0 - (ndc.y + 1.0) * 0.5) * height as f32) as i32;
        let depth = ((-v.z - self.near) / (self.far - self.near)).clamp(0.0, 1.0);
        Some(ProjectedVertex { x, y, depth })
    }
}
