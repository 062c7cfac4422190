use crate::error::Error;
use num_traits::{FromPrimitive, ToPrimitive};
use ordered_float::NotNan;
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, iter::FromIterator};

/// Body points produced by the pose model, in model output order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, num_derive::FromPrimitive, num_derive::ToPrimitive)]
pub(crate) enum LandmarkKind {
    Nose,
    LeftEyeInner,
    LeftEye,
    LeftEyeOuter,
    RightEyeInner,
    RightEye,
    RightEyeOuter,
    LeftEar,
    RightEar,
    MouthLeft,
    MouthRight,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

#[cfg(test)]
pub(crate) const NUM_LANDMARKS: usize = 33;

impl LandmarkKind {
    pub(crate) fn idx(self) -> Result<usize, Error> {
        self.to_usize().ok_or(Error::LandmarkVariantToUSize(self))
    }

    pub(crate) fn from_index(index: usize) -> Result<Self, Error> {
        Self::from_usize(index).ok_or(Error::ConvertUSizeToLandmarkKind(index))
    }
}

/// A single point in normalized image coordinates. `y` grows downward.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub(crate) struct Landmark {
    pub(crate) x: f32,
    pub(crate) y: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) z: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) visibility: Option<f32>,
}

impl Landmark {
    pub(crate) fn new(x: f32, y: f32) -> Result<Self, Error> {
        Ok(Self {
            x: coordinate(x)?,
            y: coordinate(y)?,
            z: None,
            visibility: None,
        })
    }

    pub(crate) fn with_depth(mut self, z: f32) -> Self {
        self.z = NotNan::new(z).ok().map(NotNan::into_inner);
        self
    }

    pub(crate) fn with_visibility(mut self, visibility: f32) -> Self {
        self.visibility = NotNan::new(visibility).ok().map(NotNan::into_inner);
        self
    }
}

fn coordinate(value: f32) -> Result<f32, Error> {
    let value = NotNan::new(value)
        .map_err(|e| Error::ConstructNotNan(e, value))?
        .into_inner();
    if value.is_infinite() {
        return Err(Error::InfiniteCoordinate(value));
    }
    Ok(value)
}

/// A landmark as it arrives on the wire, before validation.
#[derive(Debug, Copy, Clone, Deserialize)]
pub(crate) struct RawLandmark {
    pub(crate) x: f32,
    pub(crate) y: f32,
    #[serde(default)]
    pub(crate) z: Option<f32>,
    #[serde(default)]
    pub(crate) visibility: Option<f32>,
}

impl TryFrom<RawLandmark> for Landmark {
    type Error = Error;

    fn try_from(raw: RawLandmark) -> Result<Self, Self::Error> {
        let mut landmark = Self::new(raw.x, raw.y)?;
        if let Some(z) = raw.z {
            landmark = landmark.with_depth(z);
        }
        if let Some(visibility) = raw.visibility {
            landmark = landmark.with_visibility(visibility);
        }
        Ok(landmark)
    }
}

/// All landmarks detected in one frame. Slots may be empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct LandmarkSet {
    landmarks: Vec<Option<Landmark>>,
}

impl LandmarkSet {
    /// Build a set from unvalidated points. Malformed points become empty slots.
    pub(crate) fn from_raw<I>(raw: I) -> Self
    where
        I: IntoIterator<Item = Option<RawLandmark>>,
    {
        raw.into_iter()
            .enumerate()
            .map(|(index, point)| {
                point.and_then(|point| match Landmark::try_from(point) {
                    Ok(landmark) => Some(landmark),
                    Err(error) => {
                        tracing::trace!(message = "dropping malformed landmark", index, %error);
                        None
                    }
                })
            })
            .collect()
    }

    pub(crate) fn get(&self, kind: LandmarkKind) -> Option<&Landmark> {
        let index = kind.idx().ok()?;
        self.landmarks.get(index)?.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn insert(&mut self, kind: LandmarkKind, landmark: Landmark) -> Result<(), Error> {
        let index = kind.idx()?;
        if self.landmarks.len() <= index {
            self.landmarks.resize(index + 1, None);
        }
        self.landmarks[index] = Some(landmark);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.landmarks.len()
    }

    /// Iterate over the populated slots together with their kind.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (LandmarkKind, &Landmark)> + '_ {
        self.landmarks
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let landmark = slot.as_ref()?;
                LandmarkKind::from_index(index)
                    .ok()
                    .map(|kind| (kind, landmark))
            })
    }
}

impl FromIterator<Option<Landmark>> for LandmarkSet {
    fn from_iter<T: IntoIterator<Item = Option<Landmark>>>(iter: T) -> Self {
        Self {
            landmarks: iter.into_iter().collect(),
        }
    }
}
