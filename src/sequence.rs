use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::render_loop::RenderLoop;
use crate::surface::{PaintMode, Surface, SurfaceError};
use crate::upload::{Label, Snapshot, UploadOutcome, UploadTask, Uploader};

/// The two upload tasks dispatched by a run. A `None` slot means the
/// capture for that label failed and no request was issued.
pub struct SequenceReport {
    pub image: Option<UploadTask>,
    pub depth: Option<UploadTask>,
}

impl SequenceReport {
    /// Awaits both in-flight uploads. Outcomes are already logged by the
    /// tasks themselves; this exists so callers can finish deterministically.
    pub async fn wait(self) -> (Option<UploadOutcome>, Option<UploadOutcome>) {
        let image = match self.image {
            Some(task) => Some(task.wait().await),
            None => None,
        };
        let depth = match self.depth {
            Some(task) => Some(task.wait().await),
            None => None,
        };
        (image, depth)
    }
}

/// Snapshots the surface and dispatches the upload for one label.
///
/// Capture or encoding failures are logged here and swallowed; no request
/// is issued for that label and the caller's flow is unaffected. Network
/// failures are the dispatched task's business, not ours.
pub fn capture_and_send<S: Surface>(
    surface: &S,
    uploader: &Uploader,
    label: Label,
) -> Option<UploadTask> {
    dispatch(surface, uploader, label, None)
}

fn dispatch<S: Surface>(
    surface: &S,
    uploader: &Uploader,
    label: Label,
    keep: Option<&Path>,
) -> Option<UploadTask> {
    let snapshot = match capture(surface, label) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            log::error!("{label} capture failed: {e}");
            return None;
        }
    };
    log::info!("captured {label} snapshot ({} bytes)", snapshot.bytes().len());
    if let Some(dir) = keep {
        if let Err(e) = snapshot.write_to(dir) {
            log::warn!("could not keep {label} snapshot in {}: {e}", dir.display());
        }
    }
    Some(uploader.send(snapshot))
}

fn capture<S: Surface>(surface: &S, label: Label) -> Result<Snapshot, SurfaceError> {
    // A snapshot is only meaningful once a frame in the matching mode
    // has actually been painted.
    if surface.paints(label.mode()) == 0 {
        return Err(SurfaceError::NotReady(label.mode()));
    }
    let bytes = surface.snapshot_jpeg()?;
    Ok(Snapshot::new(label, bytes))
}

/// Runs the whole two-shot workflow once: paint a colour frame, upload it
/// as `image`, start the depth repaint loop, wait for a depth frame,
/// upload that as `depth`, stop the loop.
///
/// The `image` dispatch always strictly precedes the `depth` dispatch.
/// Nothing here blocks on the network; the returned report holds both
/// in-flight tasks. Must be called from within a Tokio runtime context
/// (a `spawn_blocking` closure is fine).
pub fn run<S>(mut session: S, uploader: &Uploader, keep: Option<&Path>) -> SequenceReport
where
    S: Surface + Send + 'static,
{
    if let Err(e) = session.paint(PaintMode::Color) {
        // Not fatal: the image capture below will notice the missing
        // paint, log, and skip its upload.
        log::error!("color paint failed: {e}");
    }
    let image = dispatch(&session, uploader, Label::Image, keep);

    let shared = Arc::new(Mutex::new(session));
    let depth_loop = RenderLoop::spawn(Arc::clone(&shared), PaintMode::Depth);
    let depth = if depth_loop.wait_for_paint() {
        match shared.lock() {
            Ok(session) => dispatch(&*session, uploader, Label::Depth, keep),
            Err(_) => {
                log::error!("render surface poisoned; skipping depth capture");
                None
            }
        }
    } else {
        log::error!("no depth frame was painted; skipping depth capture");
        None
    };
    depth_loop.stop();

    SequenceReport { image, depth }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct FakeSurface {
        color_paints: u64,
        depth_paints: u64,
        snapshots: AtomicU64,
        fail_snapshot: bool,
    }

    impl FakeSurface {
        fn new() -> Self {
            Self {
                color_paints: 0,
                depth_paints: 0,
                snapshots: AtomicU64::new(0),
                fail_snapshot: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail_snapshot: true,
                ..Self::new()
            }
        }
    }

    impl Surface for FakeSurface {
        fn paint(&mut self, mode: PaintMode) -> Result<(), SurfaceError> {
            match mode {
                PaintMode::Color => self.color_paints += 1,
                PaintMode::Depth => self.depth_paints += 1,
            }
            Ok(())
        }

        fn snapshot_jpeg(&self) -> Result<Vec<u8>, SurfaceError> {
            if self.fail_snapshot {
                return Err(SurfaceError::Paint("snapshot unavailable".into()));
            }
            self.snapshots.fetch_add(1, Ordering::Relaxed);
            Ok(vec![0xFF, 0xD8, 0x00, 0xFF, 0xD9])
        }

        fn paints(&self, mode: PaintMode) -> u64 {
            match mode {
                PaintMode::Color => self.color_paints,
                PaintMode::Depth => self.depth_paints,
            }
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn capture_before_any_paint_sends_nothing() {
        let surface = FakeSurface::new();
        let uploader = Uploader::new("http://127.0.0.1:1").unwrap();
        assert!(capture_and_send(&surface, &uploader, Label::Image).is_none());
        assert_eq!(surface.snapshots.load(Ordering::Relaxed), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn snapshot_failure_sends_nothing() {
        let mut surface = FakeSurface::failing();
        surface.paint(PaintMode::Color).unwrap();
        let uploader = Uploader::new("http://127.0.0.1:1").unwrap();
        assert!(capture_and_send(&surface, &uploader, Label::Image).is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_dispatches_both_labels_even_when_network_is_down() {
        // Port 1 refuses connections; both uploads must still be
        // dispatched exactly once and fail without retries.
        let uploader = Uploader::new("http://127.0.0.1:1").unwrap();
        let report = tokio::task::spawn_blocking({
            let uploader = uploader.clone();
            move || run(FakeSurface::new(), &uploader, None)
        })
        .await
        .unwrap();
        assert_eq!(report.image.as_ref().map(|t| t.label()), Some(Label::Image));
        assert_eq!(report.depth.as_ref().map(|t| t.label()), Some(Label::Depth));
        let (image, depth) = report.wait().await;
        assert!(!image.unwrap().is_delivered());
        assert!(!depth.unwrap().is_delivered());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn depth_wait_precedes_depth_capture() {
        let uploader = Uploader::new("http://127.0.0.1:1").unwrap();
        let report = tokio::task::spawn_blocking({
            let uploader = uploader.clone();
            move || {
                let mut surface = FakeSurface::new();
                surface.fail_snapshot = false;
                run(surface, &uploader, None)
            }
        })
        .await
        .unwrap();
        // Both slots populated means both preconditions held in order.
        assert!(report.image.is_some());
        assert!(report.depth.is_some());
    }
}
