use serde::Serialize;
use std::fmt;

/// Symbolic posture feedback. Localization happens downstream.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum FeedbackCode {
    AlignShoulders,
    PullHeadBack,
    ShouldersHunched,
    GoodPosture,
}

impl FeedbackCode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::AlignShoulders => "ALIGN_SHOULDERS",
            Self::PullHeadBack => "PULL_HEAD_BACK",
            Self::ShouldersHunched => "SHOULDERS_HUNCHED",
            Self::GoodPosture => "GOOD_POSTURE",
        }
    }

    /// Key into the translation tables of the presentation layer.
    pub(crate) fn message_key(self) -> &'static str {
        match self {
            Self::AlignShoulders => "FEEDBACK_ALIGN_SHOULDERS",
            Self::PullHeadBack => "FEEDBACK_PULL_HEAD_BACK",
            Self::ShouldersHunched => "FEEDBACK_SHOULDERS_HUNCHED",
            Self::GoodPosture => "FEEDBACK_GOOD_POSTURE",
        }
    }

    pub(crate) fn verdict(self) -> FrameVerdict {
        match self {
            Self::GoodPosture => FrameVerdict::Good,
            Self::AlignShoulders | Self::PullHeadBack | Self::ShouldersHunched => {
                FrameVerdict::Bad
            }
        }
    }
}

impl fmt::Display for FeedbackCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum FrameVerdict {
    Good,
    Bad,
}

/// Debounced posture signal driving persistent visual state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum OverallState {
    Good,
    Bad,
}

impl OverallState {
    pub(crate) fn css_class(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Bad => "bad",
        }
    }
}

impl Default for OverallState {
    fn default() -> Self {
        Self::Good
    }
}

impl fmt::Display for OverallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.css_class())
    }
}
