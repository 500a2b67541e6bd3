use std::fmt;

use image::{Rgb, RgbImage};

use crate::camera::{Camera, ProjectedVertex};
use crate::scene::Scene;
use crate::utils::{Colour, DefinedColours};

/// Which rendering mode a paint produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintMode {
    /// Flat-shaded geometry, one random colour per face
    Color,
    /// Grayscale intensity from per-pixel depth, near is white
    Depth,
}

impl fmt::Display for PaintMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaintMode::Color => write!(f, "color"),
            PaintMode::Depth => write!(f, "depth"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    /// A snapshot was requested before any paint completed in the
    /// matching mode
    #[error("surface not ready: no completed {0} paint")]
    NotReady(PaintMode),

    /// Image encoding failure
    #[error("encoding: {0}")]
    Encode(#[from] image::ImageError),

    /// Catch-all for surfaces backed by something other than the
    /// software rasterizer
    #[error("paint: {0}")]
    Paint(String),
}

/// The drawable target snapshots are taken from. The capture session
/// implements this over the software rasterizer; tests substitute fakes.
pub trait Surface {
    /// Paints one frame in the given mode.
    fn paint(&mut self, mode: PaintMode) -> Result<(), SurfaceError>;

    /// Encodes the current pixel contents as a JPEG byte buffer.
    fn snapshot_jpeg(&self) -> Result<Vec<u8>, SurfaceError>;

    /// How many paints have completed in the given mode.
    fn paints(&self, mode: PaintMode) -> u64;
}

/// CPU rasterizer holding an RGB framebuffer and a z-buffer. Depth values
/// are linear in `[0, 1]` between the camera's near and far planes.
pub struct SoftwareSurface {
    width: u32,
    height: u32,
    frame: RgbImage,
    zbuf: Vec<f32>,
    color_paints: u64,
    depth_paints: u64,
}

#[derive(Clone, Copy)]
enum FaceShade {
    Flat(Rgb<u8>),
    DepthGrey,
}

impl SoftwareSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame: RgbImage::new(width, height),
            zbuf: vec![1.0; (width * height) as usize],
            color_paints: 0,
            depth_paints: 0,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The current framebuffer, for callers that want the raw pixels
    /// rather than an encoded snapshot
    pub fn frame(&self) -> &RgbImage {
        &self.frame
    }

    /// Paints one frame of the scene as seen by the camera.
    pub fn paint_scene(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        mode: PaintMode,
    ) -> Result<(), SurfaceError> {
        self.clear();

        for mesh in scene.meshes() {
            let projected: Vec<Option<ProjectedVertex>> = mesh
                .vertices
                .iter()
                .map(|v| camera.project_vertex(v, self.width, self.height))
                .collect();
            for face in &mesh.faces {
                // Faces with any vertex nearer than the near plane are
                // dropped whole rather than clipped.
                let (Some(a), Some(b), Some(c)) =
                    (projected[face[0]], projected[face[1]], projected[face[2]])
                else {
                    continue;
                };
                let shade = match mode {
                    PaintMode::Color => {
                        FaceShade::Flat(Rgb(Colour::random().to_array()))
                    }
                    PaintMode::Depth => FaceShade::DepthGrey,
                };
                self.triangle(a, b, c, shade);
            }
        }

        match mode {
            PaintMode::Color => self.color_paints += 1,
            PaintMode::Depth => self.depth_paints += 1,
        }
        Ok(())
    }

    pub fn paints(&self, mode: PaintMode) -> u64 {
        match mode {
            PaintMode::Color => self.color_paints,
            PaintMode::Depth => self.depth_paints,
        }
    }

    /// Encodes the framebuffer as a maximum-quality JPEG.
    pub fn encode_jpeg(&self) -> Result<Vec<u8>, SurfaceError> {
        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, 100);
        self.frame.write_with_encoder(encoder)?;
        Ok(buf)
    }

    /// Generates a solid black backdrop and resets the z-buffer
    fn clear(&mut self) {
        let bkg = DefinedColours::Black.colour();
        for (_, _, pixel) in self.frame.enumerate_pixels_mut() {
            *pixel = Rgb(bkg.to_array());
        }
        self.zbuf.fill(1.0);
    }

    /// Draws a triangle using barycentric coordinates, depth-testing each
    /// pixel against the z-buffer
    fn triangle(
        &mut self,
        a: ProjectedVertex,
        b: ProjectedVertex,
        c: ProjectedVertex,
        shade: FaceShade,
    ) {
        let (x0, y0) = (a.x, a.y);
        let (x1, y1) = (b.x, b.y);
        let (x2, y2) = (c.x, c.y);

        let min_x = (x0.min(x1).min(x2)).max(0);
        let max_x = (x0.max(x1).max(x2)).min(self.width as i32 - 1);
        let min_y = (y0.min(y1).min(y2)).max(0);
        let max_y = (y0.max(y1).max(y2)).min(self.height as i32 - 1);

        let area = ((x1 - x0) * (y2 - y0) - (x2 - x0) * (y1 - y0)) as f32;

        if area.abs() < 0.5 {
            return;
        }

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let w0 = ((x1 - x) * (y2 - y) - (x2 - x) * (y1 - y)) as f32 / area;
                let w1 = ((x2 - x) * (y0 - y) - (x0 - x) * (y2 - y)) as f32 / area;
                let w2 = ((x0 - x) * (y1 - y) - (x1 - x) * (y0 - y)) as f32 / area;

                // Check if point is inside triangle
                if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                    let depth = w0 * a.depth + w1 * b.depth + w2 * c.depth;
                    let idx = (y as u32 * self.width + x as u32) as usize;
                    if depth < self.zbuf[idx] {
                        self.zbuf[idx] = depth;
                        let colour = match shade {
                            FaceShade::Flat(rgb) => rgb,
                            FaceShade::DepthGrey => {
                                let level = ((1.0 - depth) * 255.999) as u8;
                                Rgb(Colour::grey(level).to_array())
                            }
                        };
                        self.frame.put_pixel(x as u32, y as u32, colour);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Mesh;
    use nalgebra::Point3;

    fn facing_triangle() -> Scene {
        Scene::from_meshes(vec![Mesh {
            vertices: vec![
                Point3::new(-0.5, -0.5, 0.0),
                Point3::new(0.5, -0.5, 0.0),
                Point3::new(0.0, 0.5, 0.0),
            ],
            faces: vec![[0, 1, 2]],
        }])
    }

    fn lit_pixels(surface: &SoftwareSurface) -> usize {
        surface
            .frame()
            .pixels()
            .filter(|p| p.0 != [0, 0, 0])
            .count()
    }

    #[test]
    fn empty_scene_paints_black_backdrop() {
        let mut surface = SoftwareSurface::new(2, 2);
        let scene = Scene::from_meshes(vec![]);
        surface
            .paint_scene(&scene, &Camera::default(), PaintMode::Color)
            .unwrap();
        assert_eq!(lit_pixels(&surface), 0);
    }

    #[test]
    fn color_paint_covers_some_pixels() {
        let mut surface = SoftwareSurface::new(64, 64);
        surface
            .paint_scene(&facing_triangle(), &Camera::default(), PaintMode::Color)
            .unwrap();
        assert!(lit_pixels(&surface) > 0);
    }

    #[test]
    fn depth_paint_is_grayscale_and_nonempty() {
        let mut surface = SoftwareSurface::new(64, 64);
        surface
            .paint_scene(&facing_triangle(), &Camera::default(), PaintMode::Depth)
            .unwrap();
        assert!(lit_pixels(&surface) > 0);
        for p in surface.frame().pixels() {
            let [r, g, b] = p.0;
            assert_eq!(r, g);
            assert_eq!(g, b);
        }
    }

    #[test]
    fn jpeg_of_tiny_black_frame_is_nonempty() {
        let surface = SoftwareSurface::new(2, 2);
        let bytes = surface.encode_jpeg().unwrap();
        assert!(!bytes.is_empty());
        // JPEG start-of-image marker
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn nearer_face_occludes_farther_face() {
        // Two stacked triangles; the one closer to the camera must win
        // the depth test where they overlap.
        let camera = Camera::default();
        let toward = (camera.eye - camera.target).normalize();
        let near_z = Point3::origin() + toward * 0.5;
        let scene = Scene::from_meshes(vec![
            Mesh {
                vertices: vec![
                    Point3::new(-0.5, -0.5, 0.0),
                    Point3::new(0.5, -0.5, 0.0),
                    Point3::new(0.0, 0.5, 0.0),
                ],
                faces: vec![[0, 1, 2]],
            },
            Mesh {
                vertices: vec![
                    Point3::new(-0.5, -0.5, 0.0) + (near_z - Point3::origin()),
                    Point3::new(0.5, -0.5, 0.0) + (near_z - Point3::origin()),
                    Point3::new(0.0, 0.5, 0.0) + (near_z - Point3::origin()),
                ],
                faces: vec![[0, 1, 2]],
            },
        ]);
        let mut far_only = SoftwareSurface::new(64, 64);
        let far_scene = Scene::from_meshes(vec![Mesh {
            vertices: vec![
                Point3::new(-0.5, -0.5, 0.0),
                Point3::new(0.5, -0.5, 0.0),
                Point3::new(0.0, 0.5, 0.0),
            ],
            faces: vec![[0, 1, 2]],
        }]);
        far_only
            .paint_scene(&far_scene, &camera, PaintMode::Depth)
            .unwrap();
        let mut both = SoftwareSurface::new(64, 64);
        both.paint_scene(&scene, &camera, PaintMode::Depth).unwrap();

        // The nearer duplicate must brighten at least one pixel.
        let brightened = far_only
            .frame()
            .pixels()
            .zip(both.frame().pixels())
            .any(|(far, near)| near.0[0] > far.0[0]);
        assert!(brightened);
    }

    #[test]
    fn paint_counters_track_modes() {
        let mut surface = SoftwareSurface::new(8, 8);
        let scene = Scene::from_meshes(vec![]);
        let camera = Camera::default();
        surface.paint_scene(&scene, &camera, PaintMode::Color).unwrap();
        surface.paint_scene(&scene, &camera, PaintMode::Color).unwrap();
        surface.paint_scene(&scene, &camera, PaintMode::Depth).unwrap();
        assert_eq!(surface.color_paints, 2);
        assert_eq!(surface.depth_paints, 1);
    }
}
