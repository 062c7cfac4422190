use crate::{error::Error, landmark::LandmarkSet, monitor::PostureMonitor};
use crossbeam::channel::{bounded, select, tick, Receiver, Sender, TryRecvError};
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};
use tracing::{debug, trace};

pub(crate) mod replay;

pub(crate) const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Something that produces frames for the pose model, e.g. a camera.
pub(crate) trait FrameSource {
    type Frame;

    /// Whether a complete frame is available right now.
    fn is_ready(&self) -> bool;

    /// Take the current frame. `None` means the source is exhausted.
    fn grab(&mut self) -> Result<Option<Self::Frame>, Error>;

    /// Release the underlying device. No frames are grabbed afterwards.
    fn release(&mut self);
}

pub(crate) type ResultCallback = Box<dyn FnMut(Option<&LandmarkSet>) + Send>;

/// The pose-estimation model.
pub(crate) trait PoseEstimator {
    type Frame;

    /// Register the function receiving results, in submission order.
    fn set_on_results(&mut self, callback: ResultCallback);

    /// Submit a frame for estimation.
    fn send(&mut self, frame: Self::Frame) -> Result<(), Error>;
}

/// Hands frames that already carry landmarks straight to the result callback.
#[derive(Default)]
pub(crate) struct Passthrough {
    on_results: Option<ResultCallback>,
}

impl PoseEstimator for Passthrough {
    type Frame = Option<LandmarkSet>;

    fn set_on_results(&mut self, callback: ResultCallback) {
        self.on_results = Some(callback);
    }

    fn send(&mut self, frame: Self::Frame) -> Result<(), Error> {
        let on_results = self
            .on_results
            .as_mut()
            .ok_or(Error::MissingResultCallback)?;
        on_results(frame.as_ref());
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub(crate) struct CaptureStats {
    /// Frames handed to the pose estimator.
    pub(crate) submitted: usize,
    /// Ticks skipped because the source had no frame ready.
    pub(crate) dropped: usize,
}

/// A running capture loop feeding a [`PostureMonitor`].
///
/// Stopping a session never resets the monitor, so a new session over the
/// same monitor continues the same debounce window.
pub(crate) struct Session {
    stop_tx: Sender<()>,
    done_rx: Receiver<()>,
    worker: Option<JoinHandle<Result<CaptureStats, Error>>>,
}

impl Session {
    pub(crate) fn start<S, E>(
        mut source: S,
        mut estimator: E,
        monitor: Arc<PostureMonitor>,
        interval: Duration,
    ) -> Result<Self, Error>
    where
        S: FrameSource + Send + 'static,
        E: PoseEstimator<Frame = S::Frame> + Send + 'static,
    {
        estimator.set_on_results(Box::new(move |landmarks: Option<&LandmarkSet>| {
            monitor.on_result(landmarks);
        }));

        let (stop_tx, stop_rx) = bounded(1);
        let (done_tx, done_rx) = bounded::<()>(0);

        let worker = thread::Builder::new()
            .name("capture".to_owned())
            .spawn(move || {
                // disconnects `done_rx` when the loop exits
                let _done_tx = done_tx;
                let result = capture_frames(&mut source, &mut estimator, &stop_rx, interval);
                source.release();
                result
            })
            .map_err(Error::SpawnCapture)?;

        Ok(Self {
            stop_tx,
            done_rx,
            worker: Some(worker),
        })
    }

    /// Becomes disconnected once the capture loop has exited on its own.
    pub(crate) fn finished(&self) -> &Receiver<()> {
        &self.done_rx
    }

    /// Stop submitting frames, release the source and wait for the worker.
    pub(crate) fn stop(mut self) -> Result<CaptureStats, Error> {
        // fails only if the worker already exited
        let _ = self.stop_tx.try_send(());
        let worker = self.worker.take().ok_or(Error::CapturePanicked)?;
        worker.join().map_err(|_| Error::CapturePanicked)?
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.stop_tx.try_send(());
            let _ = worker.join();
        }
    }
}

fn capture_frames<S, E>(
    source: &mut S,
    estimator: &mut E,
    stop_rx: &Receiver<()>,
    interval: Duration,
) -> Result<CaptureStats, Error>
where
    S: FrameSource,
    E: PoseEstimator<Frame = S::Frame>,
{
    let ticker = tick(interval);
    let mut stats = CaptureStats::default();

    loop {
        select! {
            recv(stop_rx) -> _ => break,
            recv(ticker) -> _ => {
                if stop_rx.try_recv() != Err(TryRecvError::Empty) {
                    break;
                }
                if !source.is_ready() {
                    stats.dropped += 1;
                    trace!(message = "frame not ready, dropping tick", dropped = stats.dropped);
                } else if let Some(frame) = source.grab()? {
                    estimator.send(frame)?;
                    stats.submitted += 1;
                } else {
                    debug!(message = "frame source exhausted", submitted = stats.submitted);
                    break;
                }
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classify::Classifier, feedback::OverallState, history::PostureHistory,
        landmark::testing::seated,
    };
    use crossbeam::channel::RecvTimeoutError;
    use std::{
        cell::Cell,
        collections::VecDeque,
        sync::atomic::{AtomicBool, Ordering},
    };

    const TICK: Duration = Duration::from_millis(1);
    const TIMEOUT: Duration = Duration::from_secs(5);

    struct Scripted {
        frames: VecDeque<Option<LandmarkSet>>,
        /// Ticks to report "not ready" before the first frame.
        warmup: Cell<usize>,
        /// Serve the script in a loop instead of running out.
        repeat: bool,
        released: Arc<AtomicBool>,
    }

    impl Scripted {
        fn new(frames: Vec<Option<LandmarkSet>>) -> (Self, Arc<AtomicBool>) {
            let released = Arc::new(AtomicBool::new(false));
            let source = Self {
                frames: frames.into(),
                warmup: Cell::new(0),
                repeat: false,
                released: released.clone(),
            };
            (source, released)
        }
    }

    impl FrameSource for Scripted {
        type Frame = Option<LandmarkSet>;

        fn is_ready(&self) -> bool {
            let warmup = self.warmup.get();
            if warmup > 0 {
                self.warmup.set(warmup - 1);
                false
            } else {
                true
            }
        }

        fn grab(&mut self) -> Result<Option<Self::Frame>, Error> {
            assert!(!self.released.load(Ordering::SeqCst), "grab after release");
            let next = self.frames.pop_front();
            if self.repeat {
                if let Some(frame) = next.clone() {
                    self.frames.push_back(frame);
                }
            }
            Ok(next)
        }

        fn release(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    fn monitor() -> Arc<PostureMonitor> {
        Arc::new(PostureMonitor::new(
            Classifier::default(),
            PostureHistory::default(),
        ))
    }

    fn bad() -> Option<LandmarkSet> {
        Some(seated(0.25, (0.35, 0.30), (0.65, 0.45), 0.40, 0.60))
    }

    fn good() -> Option<LandmarkSet> {
        Some(seated(0.25, (0.35, 0.30), (0.65, 0.30), 0.40, 0.60))
    }

    fn run_to_end(source: Scripted, monitor: &Arc<PostureMonitor>) -> CaptureStats {
        let session =
            Session::start(source, Passthrough::default(), monitor.clone(), TICK).unwrap();
        assert_eq!(
            session.finished().recv_timeout(TIMEOUT),
            Err(RecvTimeoutError::Disconnected)
        );
        session.stop().unwrap()
    }

    #[test]
    fn not_ready_ticks_are_dropped_not_queued() {
        let monitor = monitor();
        let (source, released) = Scripted::new(vec![bad(), None, good()]);
        source.warmup.set(3);

        let stats = run_to_end(source, &monitor);
        assert_eq!(
            stats,
            CaptureStats {
                submitted: 3,
                dropped: 3
            }
        );
        assert!(released.load(Ordering::SeqCst));
        assert_eq!(monitor.stats().evaluated, 2);
        assert_eq!(monitor.stats().skipped, 1);
        assert_eq!(monitor.history_len(), 2);
        assert_eq!(monitor.state().latest(), OverallState::Good);
    }

    #[test]
    fn restarting_continues_the_same_window() {
        let monitor = monitor();

        let (first, released) = Scripted::new(vec![bad(); 6]);
        run_to_end(first, &monitor);
        assert!(released.load(Ordering::SeqCst));
        assert_eq!(monitor.state().latest(), OverallState::Bad);

        let (second, _) = Scripted::new(vec![good(); 4]);
        run_to_end(second, &monitor);
        assert_eq!(monitor.state().latest(), OverallState::Bad);
        assert_eq!(monitor.history_len(), 10);

        let (third, _) = Scripted::new(vec![good()]);
        run_to_end(third, &monitor);
        assert_eq!(monitor.state().latest(), OverallState::Good);
    }

    #[test]
    fn stop_halts_submission_and_releases_the_source() {
        let monitor = monitor();
        let (mut source, released) = Scripted::new(vec![None]);
        source.repeat = true;

        let session =
            Session::start(source, Passthrough::default(), monitor.clone(), TICK).unwrap();
        while monitor.stats().skipped < 3 {
            thread::sleep(TICK);
        }
        let stats = session.stop().unwrap();
        assert!(released.load(Ordering::SeqCst));
        assert!(stats.submitted >= 3);

        let skipped = monitor.stats().skipped;
        thread::sleep(TICK * 20);
        assert_eq!(monitor.stats().skipped, skipped);
        assert_eq!(monitor.history_len(), 0);
    }

    #[test]
    fn passthrough_requires_a_callback() {
        let mut estimator = Passthrough::default();
        assert!(matches!(
            estimator.send(None),
            Err(Error::MissingResultCallback)
        ));
    }
}
