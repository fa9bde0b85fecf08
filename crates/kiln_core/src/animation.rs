//! Keyframed transform animation.
//!
//! A clip is a flat list of scalar curves. Each curve animates one
//! component of one transform property (`localPosition.x`,
//! `localRotation.w`, ...) on the node found at a `/`-separated name path
//! below the scene root.

use crate::error::{LoadError, LoadResult};

/// Sampler interpolation, recorded per curve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Step,
    CubicSpline,
}

impl Interpolation {
    pub fn parse(name: &str) -> LoadResult<Self> {
        match name {
            "LINEAR" => Ok(Interpolation::Linear),
            "STEP" => Ok(Interpolation::Step),
            "CUBICSPLINE" => Ok(Interpolation::CubicSpline),
            other => Err(LoadError::invalid_enum("sampler.interpolation", other)),
        }
    }
}

/// Transform property driven by a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransformProperty {
    Position,
    Rotation,
    Scale,
}

impl TransformProperty {
    pub fn name(self) -> &'static str {
        match self {
            TransformProperty::Position => "localPosition",
            TransformProperty::Rotation => "localRotation",
            TransformProperty::Scale => "localScale",
        }
    }

    /// Components keyed for this property, in curve order.
    pub fn components(self) -> &'static [&'static str] {
        match self {
            TransformProperty::Position | TransformProperty::Scale => &["x", "y", "z"],
            TransformProperty::Rotation => &["x", "y", "z", "w"],
        }
    }
}

/// Clip playback past its last key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClipWrapMode {
    Once,
    #[default]
    Loop,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
    /// Only meaningful for cubic-spline curves.
    pub in_tangent: f32,
    pub out_tangent: f32,
}

impl Keyframe {
    pub fn new(time: f32, value: f32) -> Self {
        Self {
            time,
            value,
            in_tangent: 0.0,
            out_tangent: 0.0,
        }
    }
}

/// One animated scalar.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationCurve {
    /// Target node path relative to the scene root
    pub path: String,
    pub property: TransformProperty,
    /// Component name: "x", "y", "z" or "w"
    pub component: &'static str,
    pub interpolation: Interpolation,
    pub keys: Vec<Keyframe>,
}

impl AnimationCurve {
    /// Full property name, e.g. `localRotation.w`.
    pub fn property_name(&self) -> String {
        format!("{}.{}", self.property.name(), self.component)
    }

    pub fn duration(&self) -> f32 {
        self.keys.last().map_or(0.0, |key| key.time)
    }

    /// Sample the curve, clamping outside the key range.
    pub fn evaluate(&self, time: f32) -> f32 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0.0,
        };
        if time <= first.time {
            return first.value;
        }
        if time >= last.time {
            return last.value;
        }

        let next = self.keys.partition_point(|key| key.time <= time);
        let a = &self.keys[next - 1];
        let b = &self.keys[next];
        let dt = b.time - a.time;
        if dt <= 0.0 {
            return b.value;
        }
        let t = (time - a.time) / dt;

        match self.interpolation {
            Interpolation::Step => a.value,
            Interpolation::Linear => a.value + (b.value - a.value) * t,
            Interpolation::CubicSpline => {
                let t2 = t * t;
                let t3 = t2 * t;
                (2.0 * t3 - 3.0 * t2 + 1.0) * a.value
                    + (t3 - 2.0 * t2 + t) * dt * a.out_tangent
                    + (-2.0 * t3 + 3.0 * t2) * b.value
                    + (t3 - t2) * dt * b.in_tangent
            }
        }
    }
}

/// A named set of curves.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub wrap_mode: ClipWrapMode,
    pub curves: Vec<AnimationCurve>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            wrap_mode: ClipWrapMode::Loop,
            curves: Vec::new(),
        }
    }

    /// Length of the clip in seconds.
    pub fn duration(&self) -> f32 {
        self.curves.iter().map(AnimationCurve::duration).fold(0.0, f32::max)
    }

    /// Curves driving the node at `path`.
    pub fn curves_for<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a AnimationCurve> + 'a {
        self.curves.iter().filter(move |curve| curve.path == path)
    }

    /// Look up a single curve by path and full property name.
    pub fn curve(&self, path: &str, property_name: &str) -> Option<&AnimationCurve> {
        self.curves
            .iter()
            .find(|curve| curve.path == path && curve.property_name() == property_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(interpolation: Interpolation, keys: Vec<Keyframe>) -> AnimationCurve {
        AnimationCurve {
            path: "Root/Arm".into(),
            property: TransformProperty::Rotation,
            component: "w",
            interpolation,
            keys,
        }
    }

    #[test]
    fn test_property_names() {
        let c = curve(Interpolation::Linear, vec![]);
        assert_eq!(c.property_name(), "localRotation.w");
        assert_eq!(TransformProperty::Scale.components(), &["x", "y", "z"]);
        assert_eq!(TransformProperty::Rotation.components().len(), 4);
    }

    #[test]
    fn test_interpolation_parse() {
        assert_eq!(Interpolation::parse("STEP").unwrap(), Interpolation::Step);
        assert!(Interpolation::parse("SMOOTH").is_err());
    }

    #[test]
    fn test_evaluate_linear_and_step() {
        let keys = vec![Keyframe::new(0.0, 0.0), Keyframe::new(1.0, 10.0)];
        let linear = curve(Interpolation::Linear, keys.clone());
        assert!((linear.evaluate(0.25) - 2.5).abs() < 1e-5);
        assert_eq!(linear.evaluate(-1.0), 0.0);
        assert_eq!(linear.evaluate(5.0), 10.0);

        let step = curve(Interpolation::Step, keys);
        assert_eq!(step.evaluate(0.99), 0.0);
    }

    #[test]
    fn test_evaluate_cubic_hits_keys() {
        let mut a = Keyframe::new(0.0, 1.0);
        a.out_tangent = 2.0;
        let b = Keyframe::new(2.0, 3.0);
        let cubic = curve(Interpolation::CubicSpline, vec![a, b]);
        assert_eq!(cubic.evaluate(0.0), 1.0);
        assert_eq!(cubic.evaluate(2.0), 3.0);
        assert!(cubic.evaluate(1.0).is_finite());
    }

    #[test]
    fn test_clip_lookup() {
        let mut clip = AnimationClip::new("Walk");
        clip.curves.push(curve(
            Interpolation::Linear,
            vec![Keyframe::new(0.0, 1.0), Keyframe::new(1.5, 1.0)],
        ));
        assert_eq!(clip.wrap_mode, ClipWrapMode::Loop);
        assert_eq!(clip.duration(), 1.5);
        assert!(clip.curve("Root/Arm", "localRotation.w").is_some());
        assert!(clip.curve("Root/Arm", "localRotation.x").is_none());
        assert_eq!(clip.curves_for("Root").count(), 0);
    }

    #[test]
    fn test_curve_outlives_lookup_path() {
        let mut clip = AnimationClip::new("Walk");
        clip.curves.push(curve(Interpolation::Step, vec![Keyframe::new(0.0, 2.0)]));

        let found = {
            let path = format!("{}/{}", "Root", "Arm");
            clip.curve(&path, "localRotation.w")
        };
        assert_eq!(found.map(|c| c.keys.len()), Some(1));
    }
}
