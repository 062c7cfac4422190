use crate::{
    feedback::FeedbackCode,
    landmark::{Landmark, LandmarkKind, LandmarkSet},
};
use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct Thresholds {
    /// Maximum vertical distance between the shoulders.
    pub(crate) shoulder_alignment: f32,
    /// Shoulders closer than this to the torso center on both sides count as hunched.
    pub(crate) shoulder_hunch: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            shoulder_alignment: 0.05,
            shoulder_hunch: 0.1,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Check {
    ShoulderAlignment,
    ForwardHead,
    ShoulderHunching,
}

/// Checks in priority order. The first one that fires decides the feedback.
const CHECK_ORDER: [Check; 3] = [
    Check::ShoulderAlignment,
    Check::ForwardHead,
    Check::ShoulderHunching,
];

impl Check {
    fn feedback(self, measured: &Diagnostics, thresholds: &Thresholds) -> Option<FeedbackCode> {
        let fired = match self {
            Self::ShoulderAlignment => measured.shoulder_alignment > thresholds.shoulder_alignment,
            // image y grows downward: this fires when the nose sits below both shoulders
            Self::ForwardHead => {
                measured.nose.y > measured.left_shoulder.y
                    && measured.nose.y > measured.right_shoulder.y
            }
            Self::ShoulderHunching => {
                measured.left_shoulder_offset < thresholds.shoulder_hunch
                    && measured.right_shoulder_offset < thresholds.shoulder_hunch
            }
        };

        if fired {
            Some(match self {
                Self::ShoulderAlignment => FeedbackCode::AlignShoulders,
                Self::ForwardHead => FeedbackCode::PullHeadBack,
                Self::ShoulderHunching => FeedbackCode::ShouldersHunched,
            })
        } else {
            None
        }
    }
}

/// Every input and intermediate value behind one classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Diagnostics {
    pub(crate) nose: Landmark,
    pub(crate) left_shoulder: Landmark,
    pub(crate) right_shoulder: Landmark,
    pub(crate) left_hip: Landmark,
    pub(crate) right_hip: Landmark,
    pub(crate) shoulder_alignment: f32,
    pub(crate) torso_center_x: f32,
    pub(crate) left_shoulder_offset: f32,
    pub(crate) right_shoulder_offset: f32,
}

impl Diagnostics {
    fn measure(landmarks: &LandmarkSet) -> Option<Self> {
        let nose = *landmarks.get(LandmarkKind::Nose)?;
        let left_shoulder = *landmarks.get(LandmarkKind::LeftShoulder)?;
        let right_shoulder = *landmarks.get(LandmarkKind::RightShoulder)?;
        let left_hip = *landmarks.get(LandmarkKind::LeftHip)?;
        let right_hip = *landmarks.get(LandmarkKind::RightHip)?;

        let torso_center_x = (left_hip.x + right_hip.x) / 2.0;

        Some(Self {
            nose,
            left_shoulder,
            right_shoulder,
            left_hip,
            right_hip,
            shoulder_alignment: (left_shoulder.y - right_shoulder.y).abs(),
            torso_center_x,
            left_shoulder_offset: left_shoulder.x - torso_center_x,
            right_shoulder_offset: right_shoulder.x - torso_center_x,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Evaluation {
    pub(crate) code: FeedbackCode,
    pub(crate) diagnostics: Diagnostics,
}

/// Stateless posture classifier over a single frame of landmarks.
#[derive(Debug, Copy, Clone, Default)]
pub(crate) struct Classifier {
    thresholds: Thresholds,
}

impl Classifier {
    pub(crate) fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Classify a frame, returning `None` when any required landmark is absent.
    pub(crate) fn classify(&self, landmarks: &LandmarkSet) -> Option<FeedbackCode> {
        let measured = Diagnostics::measure(landmarks)?;
        Some(
            CHECK_ORDER
                .iter()
                .find_map(|check| check.feedback(&measured, &self.thresholds))
                .unwrap_or(FeedbackCode::GoodPosture),
        )
    }

    /// [`Classifier::classify`] together with the values the decision was made from.
    pub(crate) fn evaluate(&self, landmarks: &LandmarkSet) -> Option<Evaluation> {
        Some(Evaluation {
            code: self.classify(landmarks)?,
            diagnostics: Diagnostics::measure(landmarks)?,
        })
    }
}
