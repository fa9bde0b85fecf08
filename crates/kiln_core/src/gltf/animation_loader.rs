//! Animation assembly: sampler accessors -> keyframe curves.

use std::sync::Arc;

use kiln_math::handedness::{flip_rotation, Handedness};
use kiln_math::Vec4;

use crate::animation::{AnimationClip, AnimationCurve, Interpolation, Keyframe, TransformProperty};
use crate::error::{LoadError, LoadResult};
use crate::gltf::session::DecodeSession;
use crate::gltf::types::GltfChannel;
use crate::scene::{NodeId, SceneGraph};

impl DecodeSession<'_> {
    /// Clip for animation `index`, with curve paths relative to `root`.
    pub fn assemble_clip(&mut self, index: usize, graph: &SceneGraph, root: NodeId) -> LoadResult<Arc<AnimationClip>> {
        if let Some(Some(clip)) = self.clips.get(index) {
            return Ok(Arc::clone(clip));
        }

        let document = self.document;
        let animation = document.animation(index)?;
        let name = animation
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("Animation{}", index));

        let mut clip = AnimationClip::new(name);
        for (channel_index, channel) in animation.channels.iter().enumerate() {
            self.load_channel(index, channel_index, channel, graph, root, &mut clip)?;
        }

        log::debug!(
            "Loaded animation {} '{}': {} curves, {:.2}s",
            index,
            clip.name,
            clip.curves.len(),
            clip.duration()
        );

        let clip = Arc::new(clip);
        self.clips[index] = Some(Arc::clone(&clip));
        Ok(clip)
    }

    fn load_channel(
        &self,
        animation_index: usize,
        channel_index: usize,
        channel: &GltfChannel,
        graph: &SceneGraph,
        root: NodeId,
        clip: &mut AnimationClip,
    ) -> LoadResult<()> {
        let property = match channel.target.path.as_str() {
            "translation" => TransformProperty::Position,
            "rotation" => TransformProperty::Rotation,
            "scale" => TransformProperty::Scale,
            "weights" => {
                log::info!(
                    "Animation {} channel {}: morph target weights are not supported",
                    animation_index,
                    channel_index
                );
                return Ok(());
            }
            other => {
                log::warn!(
                    "Animation {} channel {}: unknown target path '{}'",
                    animation_index,
                    channel_index,
                    other
                );
                return Ok(());
            }
        };

        let Some(node) = channel.target.node.and_then(|node| self.node_id(node)) else {
            log::warn!(
                "Animation {} channel {}: target node {:?} is not in the scene",
                animation_index,
                channel_index,
                channel.target.node
            );
            return Ok(());
        };
        let path = graph.relative_path(node, root);

        let animation = self.document.animation(animation_index)?;
        let sampler = animation.samplers.get(channel.sampler).ok_or_else(|| {
            LoadError::InvalidDocument(format!(
                "animation {} channel {} references sampler {} ({} defined)",
                animation_index,
                channel_index,
                channel.sampler,
                animation.samplers.len()
            ))
        })?;
        let interpolation = Interpolation::parse(&sampler.interpolation)?;

        let times = self.buffers.accessor(sampler.input)?.into_scalars(sampler.input)?;
        let output = self.buffers.accessor(sampler.output)?;
        let mut values: Vec<Vec4> = match property {
            TransformProperty::Rotation => output.into_vec4(sampler.output)?,
            TransformProperty::Position | TransformProperty::Scale => output
                .into_vec3(sampler.output)?
                .into_iter()
                .map(|v| v.extend(0.0))
                .collect(),
        };

        // Conversion is linear, so cubic tangents convert like values
        match property {
            TransformProperty::Position => {
                for value in &mut values {
                    *value = value.truncate().flip_handedness().extend(0.0);
                }
            }
            TransformProperty::Rotation => {
                for value in &mut values {
                    *value = flip_rotation(*value);
                }
            }
            TransformProperty::Scale => {}
        }

        let frames = build_frames(&times, &values, interpolation);
        if frames.len() != times.len() {
            log::warn!(
                "Animation {} channel {}: {} times but {} values, keying {}",
                animation_index,
                channel_index,
                times.len(),
                values.len(),
                frames.len()
            );
        }

        for (component_index, &component) in property.components().iter().enumerate() {
            let keys = frames
                .iter()
                .map(|frame| Keyframe {
                    time: frame.time,
                    value: frame.value[component_index],
                    in_tangent: frame.in_tangent[component_index],
                    out_tangent: frame.out_tangent[component_index],
                })
                .collect();

            clip.curves.push(AnimationCurve {
                path: path.clone(),
                property,
                component,
                interpolation,
                keys,
            });
        }

        Ok(())
    }
}

/// One time sample of a vector channel.
struct Frame {
    time: f32,
    value: Vec4,
    in_tangent: Vec4,
    out_tangent: Vec4,
}

/// Pair times with values. Cubic-spline outputs are stored as
/// (in-tangent, value, out-tangent) triples per time.
fn build_frames(times: &[f32], values: &[Vec4], interpolation: Interpolation) -> Vec<Frame> {
    match interpolation {
        Interpolation::CubicSpline => times
            .iter()
            .zip(values.chunks_exact(3))
            .map(|(&time, triple)| Frame {
                time,
                in_tangent: triple[0],
                value: triple[1],
                out_tangent: triple[2],
            })
            .collect(),
        Interpolation::Linear | Interpolation::Step => times
            .iter()
            .zip(values)
            .map(|(&time, &value)| Frame {
                time,
                value,
                in_tangent: Vec4::ZERO,
                out_tangent: Vec4::ZERO,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cubic_frames_take_middle_value() {
        let times = [0.0, 1.0];
        let values = [
            Vec4::splat(-1.0),
            Vec4::splat(5.0),
            Vec4::splat(1.0),
            Vec4::splat(-2.0),
            Vec4::splat(6.0),
            Vec4::splat(2.0),
        ];
        let frames = build_frames(&times, &values, Interpolation::CubicSpline);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].value, Vec4::splat(6.0));
        assert_eq!(frames[1].in_tangent, Vec4::splat(-2.0));
        assert_eq!(frames[0].out_tangent, Vec4::splat(1.0));
    }

    #[test]
    fn test_mismatched_counts_key_shorter() {
        let frames = build_frames(&[0.0, 1.0, 2.0], &[Vec4::ONE, Vec4::ZERO], Interpolation::Linear);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].value, Vec4::ZERO);
    }
}
