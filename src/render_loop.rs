use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::surface::{PaintMode, Surface};

/// Repaint interval, roughly one display refresh
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Default)]
struct LoopState {
    frames: u64,
    finished: bool,
}

struct Shared {
    state: Mutex<LoopState>,
    cond: Condvar,
}

/// Handle to a background repaint loop. The loop paints the surface in a
/// fixed mode once per frame interval until stopped; dropping the handle
/// also stops it. Callers can block until a frame has actually been
/// painted, which is what makes a depth snapshot safe to take.
pub struct RenderLoop {
    shared: Arc<Shared>,
    stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
    mode: PaintMode,
}

impl RenderLoop {
    pub fn spawn<S>(surface: Arc<Mutex<S>>, mode: PaintMode) -> RenderLoop
    where
        S: Surface + Send + 'static,
    {
        let shared = Arc::new(Shared {
            state: Mutex::new(LoopState::default()),
            cond: Condvar::new(),
        });
        let stop = Arc::new(AtomicBool::new(false));

        let thread = thread::spawn({
            let shared = Arc::clone(&shared);
            let stop = Arc::clone(&stop);
            move || {
                log::debug!("{mode} repaint loop started");
                while !stop.load(Ordering::Relaxed) {
                    let painted = match surface.lock() {
                        Ok(mut s) => s.paint(mode),
                        Err(_) => {
                            log::error!("render surface poisoned; stopping {mode} loop");
                            break;
                        }
                    };
                    match painted {
                        Ok(()) => {
                            let mut state = shared.state.lock().unwrap();
                            state.frames += 1;
                            shared.cond.notify_all();
                        }
                        Err(e) => {
                            log::error!("{mode} paint failed: {e}");
                            break;
                        }
                    }
                    thread::sleep(FRAME_INTERVAL);
                }
                let mut state = shared.state.lock().unwrap();
                state.finished = true;
                shared.cond.notify_all();
                log::debug!("{mode} repaint loop stopped after {} frames", state.frames);
            }
        });

        RenderLoop {
            shared,
            stop,
            thread: Some(thread),
            mode,
        }
    }

    /// Blocks until at least one frame has been painted. Returns `false`
    /// if the loop exited (paint failure) or five seconds pass first.
    pub fn wait_for_paint(&self) -> bool {
        self.wait_for_frames(1, Duration::from_secs(5))
    }

    pub fn wait_for_frames(&self, frames: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock().unwrap();
        loop {
            if state.frames >= frames {
                return true;
            }
            if state.finished {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                log::warn!("timed out waiting for a {} frame", self.mode);
                return false;
            }
            let (guard, _) = self
                .shared
                .cond
                .wait_timeout(state, deadline - now)
                .unwrap();
            state = guard;
        }
    }

    /// Frames painted so far.
    pub fn frames(&self) -> u64 {
        self.shared.state.lock().unwrap().frames
    }

    /// Stops the loop and joins its thread.
    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.halt();
    }
}
