#[cfg(test)]
mod live_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::runtime::Handle;
    use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
    use tokio::time::timeout;

    use qrnova::common::LiveConfig;
    use qrnova::scanner::{
        BarcodeDetector, BarcodeFormat, CameraControls, DetectedCode, Frame, LiveScanner,
        LumaDetector, LumaFrame, NoopControl, Rotation, ScanEvent, ScanSession,
    };
    use qrnova::{QRBuilder, QRError, QRResult};

    const WAIT: Duration = Duration::from_secs(5);

    /// Detector that reports each frame it starts on, then blocks until the
    /// test scripts its outcome.
    struct ScriptedDetector {
        started: UnboundedSender<(u8, Option<String>)>,
        outcomes: tokio::sync::Mutex<UnboundedReceiver<QRResult<Option<String>>>>,
    }

    #[async_trait]
    impl BarcodeDetector for ScriptedDetector {
        async fn process(&self, frame: &LumaFrame, _rot: Rotation) -> QRResult<Vec<DetectedCode>> {
            let thread = std::thread::current().name().map(str::to_string);
            let _ = self.started.send((frame.row(0)[0], thread));

            let outcome = self.outcomes.lock().await.recv().await.unwrap_or(Ok(None))?;
            Ok(outcome
                .into_iter()
                .map(|text| DetectedCode {
                    format: BarcodeFormat::QrCode,
                    raw_value: Some(text),
                    corners: Vec::new(),
                })
                .collect())
        }
    }

    struct Harness {
        started: UnboundedReceiver<(u8, Option<String>)>,
        outcomes: UnboundedSender<QRResult<Option<String>>>,
        released: Vec<Arc<AtomicUsize>>,
    }

    impl Harness {
        fn new(frames: usize) -> (Self, Arc<ScriptedDetector>) {
            let (started_tx, started) = mpsc::unbounded_channel();
            let (outcomes, outcomes_rx) = mpsc::unbounded_channel();
            let detector = Arc::new(ScriptedDetector {
                started: started_tx,
                outcomes: tokio::sync::Mutex::new(outcomes_rx),
            });
            let released = (0..=frames).map(|_| Arc::new(AtomicUsize::new(0))).collect();
            (Self { started, outcomes, released }, detector)
        }

        /// Frame whose single pixel holds its id
        fn frame(&self, id: u8) -> Frame {
            let luma = LumaFrame::new(1, 1, 1, vec![id]).unwrap();
            let released = self.released[id as usize].clone();
            Frame::new(luma, Rotation::Deg0).on_release(move || {
                released.fetch_add(1, Ordering::SeqCst);
            })
        }

        fn released(&self, id: u8) -> usize {
            self.released[id as usize].load(Ordering::SeqCst)
        }

        async fn next_started(&mut self) -> u8 {
            timeout(WAIT, self.started.recv()).await.unwrap().unwrap().0
        }

        async fn wait_released(&self, id: u8) {
            timeout(WAIT, async {
                while self.released(id) == 0 {
                    tokio::task::yield_now().await;
                }
            })
            .await
            .unwrap();
        }

        fn finish(&self, outcome: QRResult<Option<String>>) {
            self.outcomes.send(outcome).unwrap();
        }
    }

    async fn next_event(events: &mut UnboundedReceiver<ScanEvent>) -> ScanEvent {
        timeout(WAIT, events.recv()).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_burst_submits_only_latest() {
        let (mut h, detector) = Harness::new(3);
        let (scanner, mut events) = LiveScanner::spawn(detector, &Handle::current());

        scanner.submit(h.frame(1));
        assert_eq!(h.next_started().await, 1);
        scanner.submit(h.frame(2));
        scanner.submit(h.frame(3));

        // F3 pushes F2 out of the pending slot
        h.wait_released(2).await;
        assert_eq!(h.released(1), 0);
        assert_eq!(h.released(3), 0);

        h.finish(Ok(None));
        assert_eq!(next_event(&mut events).await, ScanEvent::NotFound);
        assert_eq!(h.next_started().await, 3);
        assert_eq!(h.released(1), 1);

        h.finish(Ok(None));
        assert_eq!(next_event(&mut events).await, ScanEvent::NotFound);
        assert!(h.started.try_recv().is_err());

        for id in 1..=3 {
            assert_eq!(h.released(id), 1, "frame {id}");
        }
    }

    #[tokio::test]
    async fn test_pause_on_found_until_resume() {
        let (mut h, detector) = Harness::new(4);
        let (scanner, mut events) = LiveScanner::spawn(detector, &Handle::current());

        scanner.submit(h.frame(1));
        assert_eq!(h.next_started().await, 1);
        h.finish(Ok(Some("https://example.com".into())));
        assert_eq!(next_event(&mut events).await, ScanEvent::Found("https://example.com".into()));

        // Paused: frames are released without reaching the detector
        scanner.submit(h.frame(2));
        scanner.submit(h.frame(3));
        h.wait_released(2).await;
        h.wait_released(3).await;
        assert!(h.started.try_recv().is_err());

        scanner.resume();
        scanner.submit(h.frame(4));
        assert_eq!(h.next_started().await, 4);
        h.finish(Ok(None));
        assert_eq!(next_event(&mut events).await, ScanEvent::NotFound);

        for id in 1..=4 {
            assert_eq!(h.released(id), 1, "frame {id}");
        }
    }

    #[tokio::test]
    async fn test_detector_failure_returns_to_idle() {
        let (mut h, detector) = Harness::new(2);
        let (scanner, mut events) = LiveScanner::spawn(detector, &Handle::current());

        scanner.submit(h.frame(1));
        assert_eq!(h.next_started().await, 1);
        h.finish(Err(QRError::Detector("model unavailable".into())));
        assert_eq!(
            next_event(&mut events).await,
            ScanEvent::Failed(QRError::Detector("model unavailable".into()))
        );
        assert_eq!(h.released(1), 1);

        // No retry of the failed frame, the next one is analysed
        scanner.submit(h.frame(2));
        assert_eq!(h.next_started().await, 2);
        h.finish(Ok(None));
        assert_eq!(next_event(&mut events).await, ScanEvent::NotFound);
    }

    #[tokio::test]
    async fn test_empty_frame_is_released() {
        let (h, detector) = Harness::new(1);
        let (scanner, mut events) = LiveScanner::spawn(detector, &Handle::current());

        let released = h.released[1].clone();
        scanner.submit(Frame::empty(Rotation::Deg0).on_release(move || {
            released.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(next_event(&mut events).await, ScanEvent::NotFound);
        assert_eq!(h.released(1), 1);
    }

    #[tokio::test]
    async fn test_dedicated_thread_and_shutdown() {
        let (mut h, detector) = Harness::new(2);
        let (scanner, _events) = LiveScanner::spawn_dedicated(detector).unwrap();

        scanner.submit(h.frame(1));
        let (id, thread) = timeout(WAIT, h.started.recv()).await.unwrap().unwrap();
        assert_eq!(id, 1);
        assert_eq!(thread.as_deref(), Some("qr-analysis"));
        scanner.submit(h.frame(2));

        // Closing the outcome channel lets the in-flight detection end
        drop(h.outcomes);
        drop(scanner);
        assert_eq!(h.released[1].load(Ordering::SeqCst), 1);
        assert_eq!(h.released[2].load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stopped_scanner_ignores_input() {
        let (h, detector) = Harness::new(1);
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let (scanner, _events) = LiveScanner::spawn(detector, rt.handle());

        // Shutting the runtime down drops the actor and its command channel
        drop(rt);

        scanner.resume();
        scanner.submit(h.frame(1));
        assert_eq!(h.released(1), 1);
    }

    #[tokio::test]
    async fn test_session_with_real_detector() {
        let img = QRBuilder::new("live hit").size(256).build().unwrap().into_image();
        let (scanner, events) = LiveScanner::spawn_dedicated(Arc::new(LumaDetector::default())).unwrap();
        let controls = CameraControls::new(NoopControl, &LiveConfig::default());
        let mut session = ScanSession::new(scanner, events, controls);

        let released = Arc::new(Mutex::new(0));
        let r = released.clone();
        let frame = Frame::new(LumaFrame::from_gray(&img).unwrap(), Rotation::Deg0).on_release(move || {
            *r.lock().unwrap() += 1;
        });
        session.submit(frame);

        let event = timeout(WAIT, session.next_event()).await.unwrap();
        assert_eq!(event, Some(ScanEvent::Found("live hit".into())));
        assert_eq!(session.result(), Some("live hit"));
        assert!((session.controls().zoom() - 1.3).abs() < 1e-5);

        session.rescan();
        assert_eq!(session.result(), None);
        drop(session);
        assert_eq!(*released.lock().unwrap(), 1);
    }
}
