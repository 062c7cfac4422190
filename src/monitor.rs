use crate::{
    classify::{Classifier, Diagnostics, Evaluation},
    feedback::{FeedbackCode, OverallState},
    history::PostureHistory,
    landmark::LandmarkSet,
    subject::Subject,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex, PoisonError,
};
use tracing::trace;

/// Turns pose-model results into feedback, debounced state and diagnostics.
pub(crate) struct PostureMonitor {
    classifier: Classifier,
    history: Mutex<PostureHistory>,
    feedback: Subject<Option<FeedbackCode>>,
    state: Subject<OverallState>,
    diagnostics: Subject<Option<Diagnostics>>,
    evaluated: AtomicUsize,
    skipped: AtomicUsize,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub(crate) struct MonitorStats {
    pub(crate) evaluated: usize,
    pub(crate) skipped: usize,
}

impl PostureMonitor {
    pub(crate) fn new(classifier: Classifier, history: PostureHistory) -> Self {
        let state = history.state();
        Self {
            classifier,
            history: Mutex::new(history),
            feedback: Subject::new(None),
            state: Subject::new(state),
            diagnostics: Subject::new(None),
            evaluated: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
        }
    }

    /// Handle one pose-model result.
    ///
    /// Returns the new overall state, or `None` when the frame carried no
    /// usable landmarks, in which case nothing is published and the history
    /// is left alone.
    pub(crate) fn on_result(&self, landmarks: Option<&LandmarkSet>) -> Option<OverallState> {
        let evaluation = landmarks.and_then(|landmarks| self.classifier.evaluate(landmarks));
        let Evaluation { code, diagnostics } = match evaluation {
            Some(evaluation) => evaluation,
            None => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
                trace!(
                    message = "no verdict for frame",
                    detected = landmarks.is_some(),
                    landmarks = landmarks.map_or(0, |set| set.iter().count())
                );
                return None;
            }
        };
        self.evaluated.fetch_add(1, Ordering::Relaxed);

        self.feedback.next(Some(code));
        self.diagnostics.next(Some(diagnostics));

        let state = self
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(code.verdict());
        self.state.next(state);

        trace!(message = "evaluated frame", %code, %state);
        Some(state)
    }

    pub(crate) fn feedback(&self) -> &Subject<Option<FeedbackCode>> {
        &self.feedback
    }

    pub(crate) fn state(&self) -> &Subject<OverallState> {
        &self.state
    }

    pub(crate) fn diagnostics(&self) -> &Subject<Option<Diagnostics>> {
        &self.diagnostics
    }

    pub(crate) fn stats(&self) -> MonitorStats {
        MonitorStats {
            evaluated: self.evaluated.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn history_len(&self) -> usize {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
