//! Live camera scanning.
//!
//! Frames flow from the camera into a [`LiveScanner`], which analyses them on
//! its own single-thread runtime and reports back through [`ScanEvent`]s. At
//! most one detection runs at a time. While it runs, only the newest frame is
//! kept, and after a hit the scanner pauses until [`LiveScanner::resume`].

pub mod controls;
pub mod detector;
pub mod frame;
pub mod gate;
pub mod permission;

pub use controls::{CameraControl, CameraControls, NoopControl};
pub use detector::{BarcodeDetector, BarcodeFormat, DetectedCode, LumaDetector};
pub use frame::{Frame, LumaFrame, Rotation};
pub use gate::{FrameGate, ScanState, Transition};
pub use permission::PermissionState;

use std::io;
use std::sync::Arc;
use std::thread;

use tokio::runtime::{self, Handle};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::common::error::{QRError, QRResult};

const ANALYSIS_THREAD: &str = "qr-analysis";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    Found(String),
    NotFound,
    Failed(QRError),
}

#[derive(Debug)]
enum Command {
    Frame(Frame),
    Resume,
}

type Detection = JoinHandle<QRResult<Vec<DetectedCode>>>;

// Live scanner
//------------------------------------------------------------------------------

/// Handle to the frame analysis actor. Dropping it stops the actor once the
/// in-flight detection, if any, has finished.
pub struct LiveScanner {
    tx: Option<UnboundedSender<Command>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl LiveScanner {
    /// Runs the actor on an existing runtime.
    pub fn spawn(
        detector: Arc<dyn BarcodeDetector>,
        handle: &Handle,
    ) -> (Self, UnboundedReceiver<ScanEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (events, events_rx) = mpsc::unbounded_channel();
        handle.spawn(Analyzer::new(detector, events).run(rx));
        (Self { tx: Some(tx), worker: None }, events_rx)
    }

    /// Runs the actor on a dedicated single-thread runtime in its own thread,
    /// so frame pacing does not depend on the consumer's executor.
    pub fn spawn_dedicated(
        detector: Arc<dyn BarcodeDetector>,
    ) -> io::Result<(Self, UnboundedReceiver<ScanEvent>)> {
        let rt = runtime::Builder::new_current_thread().enable_all().build()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let (events, events_rx) = mpsc::unbounded_channel();
        let analyzer = Analyzer::new(detector, events);

        let worker = thread::Builder::new()
            .name(ANALYSIS_THREAD.to_string())
            .spawn(move || rt.block_on(analyzer.run(rx)))?;
        Ok((Self { tx: Some(tx), worker: Some(worker) }, events_rx))
    }

    /// Hands a frame over without waiting. A frame the actor cannot take is
    /// released on the spot.
    pub fn submit(&self, frame: Frame) {
        if let Some(tx) = &self.tx {
            if tx.send(Command::Frame(frame)).is_err() {
                warn!("Scanner stopped, frame released unanalysed");
            }
        }
    }

    /// Leaves the paused state after a hit.
    pub fn resume(&self) {
        if let Some(tx) = &self.tx {
            if tx.send(Command::Resume).is_err() {
                warn!("Scanner stopped, resume ignored");
            }
        }
    }
}

impl Drop for LiveScanner {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Analysis thread panicked");
            }
        }
    }
}

// Analyzer
//------------------------------------------------------------------------------

struct Analyzer {
    detector: Arc<dyn BarcodeDetector>,
    gate: FrameGate,
    events: UnboundedSender<ScanEvent>,
}

impl Analyzer {
    fn new(detector: Arc<dyn BarcodeDetector>, events: UnboundedSender<ScanEvent>) -> Self {
        Self { detector, gate: FrameGate::new(), events }
    }

    async fn run(mut self, mut rx: UnboundedReceiver<Command>) {
        debug!("Frame analysis started");
        let mut inflight: Option<Detection> = None;

        loop {
            tokio::select! {
                cmd = rx.recv() => match cmd {
                    Some(Command::Frame(frame)) => {
                        if let Some(frame) = self.gate.offer(frame) {
                            inflight = Some(self.launch(frame));
                        }
                    }
                    Some(Command::Resume) => {
                        self.gate.resume();
                    }
                    None => break,
                },
                res = wait(&mut inflight), if inflight.is_some() => {
                    inflight = self.finish(res);
                }
            }
        }

        self.gate.clear_pending();
        if let Some(detection) = inflight {
            let _ = detection.await;
        }
        debug!("Frame analysis stopped");
    }

    fn launch(&self, mut frame: Frame) -> Detection {
        let detector = self.detector.clone();
        tokio::spawn(async move {
            let rotation = frame.rotation();
            let res = match frame.take_image() {
                Some(image) => detector.process(&image, rotation).await,
                None => Ok(Vec::new()),
            };
            // Hand the buffer back to the camera only once analysis is over
            drop(frame);
            res
        })
    }

    fn finish(&mut self, res: Result<QRResult<Vec<DetectedCode>>, JoinError>) -> Option<Detection> {
        let outcome = match res {
            Ok(Ok(codes)) => {
                let hit = codes.into_iter().find_map(|c| c.raw_value.filter(|v| !v.is_empty()));
                if hit.is_none() {
                    self.emit(ScanEvent::NotFound);
                }
                hit
            }
            Ok(Err(e)) => {
                error!("Barcode detector failed: {e}");
                self.emit(ScanEvent::Failed(e));
                None
            }
            Err(e) => {
                error!("Detection task failed: {e}");
                self.emit(ScanEvent::Failed(QRError::Detector(e.to_string())));
                None
            }
        };

        match self.gate.complete(outcome) {
            Transition::Found(text) => {
                info!("QR code detected in live frame");
                self.emit(ScanEvent::Found(text));
                None
            }
            Transition::Submit(frame) => Some(self.launch(frame)),
            Transition::Idle => None,
        }
    }

    fn emit(&self, event: ScanEvent) {
        if self.events.send(event).is_err() {
            debug!("Scan event dropped, no consumer");
        }
    }
}

async fn wait(inflight: &mut Option<Detection>) -> Result<QRResult<Vec<DetectedCode>>, JoinError> {
    match inflight {
        Some(detection) => detection.await,
        None => std::future::pending().await,
    }
}

// Scan session
//------------------------------------------------------------------------------

/// Consumer side of a live scan. Owns the current result and the camera
/// controls; the analysis thread only ever sends events here.
pub struct ScanSession<C: CameraControl> {
    scanner: LiveScanner,
    events: UnboundedReceiver<ScanEvent>,
    controls: CameraControls<C>,
    result: Option<String>,
}

impl<C: CameraControl> ScanSession<C> {
    pub fn new(
        scanner: LiveScanner,
        events: UnboundedReceiver<ScanEvent>,
        controls: CameraControls<C>,
    ) -> Self {
        Self { scanner, events, controls, result: None }
    }

    pub fn submit(&self, frame: Frame) {
        self.scanner.submit(frame);
    }

    /// Waits for the next event and applies it. `None` once the scanner has
    /// stopped.
    pub async fn next_event(&mut self) -> Option<ScanEvent> {
        let event = self.events.recv().await?;
        if let ScanEvent::Found(text) = &event {
            self.result = Some(text.clone());
            self.controls.bump_after_hit();
        }
        Some(event)
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// Clears the shown result and starts scanning again.
    pub fn rescan(&mut self) {
        self.result = None;
        self.scanner.resume();
    }

    pub fn controls(&self) -> &CameraControls<C> {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut CameraControls<C> {
        &mut self.controls
    }
}
