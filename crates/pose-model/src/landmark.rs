//! Landmark and control-coordinate types.

use serde::{Deserialize, Serialize};

/// Index of the reference point used for aiming and proximity sensing.
pub const PRIMARY_INDEX: usize = 0;

/// A tracked body point in normalized sensor coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    /// Horizontal image fraction, nominally [0.0, 1.0].
    pub x: f64,
    /// Vertical image fraction, nominally [0.0, 1.0].
    pub y: f64,
    /// Relative depth. More negative = closer to the camera.
    pub z: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Blend `self` (the new sample) with `previous` using weight `alpha`.
    pub fn blend(&self, previous: &Landmark, alpha: f64) -> Landmark {
        Landmark {
            x: self.x * alpha + previous.x * (1.0 - alpha),
            y: self.y * alpha + previous.y * (1.0 - alpha),
            z: self.z * alpha + previous.z * (1.0 - alpha),
        }
    }
}

/// One frame's worth of landmarks, index-addressable.
///
/// Index 0 is the primary landmark. Sets are replaced wholesale each frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet(Vec<Landmark>);

impl LandmarkSet {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self(landmarks)
    }

    /// The primary reference landmark, if the set is non-empty.
    pub fn primary(&self) -> Option<&Landmark> {
        self.0.get(PRIMARY_INDEX)
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Landmark> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Landmark] {
        &self.0
    }
}

impl From<Vec<Landmark>> for LandmarkSet {
    fn from(landmarks: Vec<Landmark>) -> Self {
        Self(landmarks)
    }
}

impl FromIterator<Landmark> for LandmarkSet {
    fn from_iter<I: IntoIterator<Item = Landmark>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a LandmarkSet {
    type Item = &'a Landmark;
    type IntoIter = std::slice::Iter<'a, Landmark>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Where the animation engine should aim, in percent space.
///
/// Nominally `[0, 100] x [0, 100]` but deliberately unclamped: an
/// out-of-range value means calibration needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlCoordinate {
    pub x: f64,
    pub y: f64,
}

impl ControlCoordinate {
    /// The neutral aim point (image center).
    pub const CENTER: ControlCoordinate = ControlCoordinate { x: 50.0, y: 50.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Whether both axes fall inside `[0, 100]`.
    pub fn is_within_nominal_range(&self) -> bool {
        (0.0..=100.0).contains(&self.x) && (0.0..=100.0).contains(&self.y)
    }

    /// Clamp to `[0, 100]` for consumers that require bounded input.
    pub fn clamped(&self) -> ControlCoordinate {
        ControlCoordinate {
            x: self.x.clamp(0.0, 100.0),
            y: self.y.clamp(0.0, 100.0),
        }
    }
}

impl Default for ControlCoordinate {
    fn default() -> Self {
        Self::CENTER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_is_index_zero() {
        let set = LandmarkSet::new(vec![
            Landmark::new(0.1, 0.2, -0.3),
            Landmark::new(0.4, 0.5, -0.6),
        ]);
        assert_eq!(set.primary(), Some(&Landmark::new(0.1, 0.2, -0.3)));
        assert_eq!(set.len(), 2);
        assert!(LandmarkSet::default().primary().is_none());
    }

    #[test]
    fn test_blend_weights_new_sample() {
        let prev = Landmark::new(0.0, 0.0, 0.0);
        let next = Landmark::new(1.0, 1.0, -1.0);
        let blended = next.blend(&prev, 0.3);
        assert!((blended.x - 0.3).abs() < 1e-12);
        assert!((blended.z + 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_landmark_set_serializes_as_array() {
        let set = LandmarkSet::new(vec![Landmark::new(0.5, 0.5, -0.1)]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"[{"x":0.5,"y":0.5,"z":-0.1}]"#);
    }

    #[test]
    fn test_control_coordinate_clamping() {
        let c = ControlCoordinate::new(130.0, -20.0);
        assert!(!c.is_within_nominal_range());
        assert_eq!(c.clamped(), ControlCoordinate::new(100.0, 0.0));
        assert!(ControlCoordinate::CENTER.is_within_nominal_range());
    }
}
