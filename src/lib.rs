//! Renders a 3D model to colour and depth snapshots and uploads both to a
//! collection server. See [`sequence::run`] for the workflow.

pub mod camera;
pub mod render_loop;
pub mod scene;
pub mod sequence;
pub mod surface;
pub mod upload;
pub(crate) mod utils;

use std::path::{Path, PathBuf};

use camera::Camera;
use scene::Scene;
use surface::{PaintMode, SoftwareSurface, Surface, SurfaceError};

pub use render_loop::RenderLoop;
pub use sequence::{SequenceReport, capture_and_send, run};
pub use upload::{Label, Snapshot, UploadOutcome, UploadTask, Uploader};

#[derive(Clone)]
pub struct CaptureSessionBuilder {
    pub model_path: PathBuf,
    pub size: (u32, u32),
    pub camera: Option<Camera>,
}

impl CaptureSessionBuilder {
    pub fn new(model_path: PathBuf) -> Self {
        Self {
            model_path,
            size: (800, 600),
            camera: None,
        }
    }

    /// Provides a viewport size in the case you wish to provide a custom one.
    ///
    /// Default: (800, 600) if function not used
    pub fn with_size(mut self, size: (u32, u32)) -> Self {
        self.size = (size.0.max(10), size.1.max(10));
        self
    }

    /// Overrides the auto-framing camera.
    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn build(self) -> anyhow::Result<CaptureSession> {
        if !self.model_path.exists() {
            return Err(anyhow::anyhow!(format!(
                "The model path [{}] does not exist on disk. Please ensure it exists or the path provided is correct.",
                self.model_path.display()
            )));
        }
        let scene = Scene::load(&self.model_path)?;
        log::info!(
            "loaded {} ({} triangles)",
            self.model_path.display(),
            scene.triangle_count()
        );
        let camera = match self.camera {
            Some(camera) => camera,
            None => {
                let mut camera = Camera::default();
                camera.fit(scene.bounds());
                camera
            }
        };
        Ok(CaptureSession::new(scene, camera, self.size))
    }
}

/// Everything one capture run needs: the loaded scene, the camera framing
/// it, and the surface frames are painted onto. Owning all three here
/// keeps the pipeline free of shared module state.
pub struct CaptureSession {
    scene: Scene,
    camera: Camera,
    surface: SoftwareSurface,
}

impl CaptureSession {
    pub fn new(scene: Scene, camera: Camera, size: (u32, u32)) -> Self {
        Self {
            scene,
            camera,
            surface: SoftwareSurface::new(size.0, size.1),
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Writes the current frame to a location as a file. By default, it is
    /// saved as `output.png` if no path is provided.
    pub fn write_to(&self, location: Option<&Path>) -> anyhow::Result<()> {
        match location {
            Some(path) => self.surface.frame().save(path)?,
            None => self.surface.frame().save("output.png")?,
        }
        Ok(())
    }
}

impl Surface for CaptureSession {
    fn paint(&mut self, mode: PaintMode) -> Result<(), SurfaceError> {
        self.surface.paint_scene(&self.scene, &self.camera, mode)
    }

    fn snapshot_jpeg(&self) -> Result<Vec<u8>, SurfaceError> {
        self.surface.encode_jpeg()
    }

    fn paints(&self, mode: PaintMode) -> u64 {
        self.surface.paints(mode)
    }
}
