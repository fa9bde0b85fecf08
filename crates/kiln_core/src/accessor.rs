//! Typed accessor decoding.
//!
//! An accessor describes a strided array of scalar, vector or matrix
//! elements inside a buffer view. Decoding is a pure function over bytes
//! that have already been resolved; buffer residency is the job of
//! [`BufferStore`](crate::buffer::BufferStore).
//!
//! Integer component types are widened to `f32` as raw magnitudes. The
//! accessor `normalized` flag is not applied, so a `u8` of 255 decodes to
//! 255.0 rather than 1.0.

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::error::{LoadError, LoadResult};
use crate::gltf::types::{GltfAccessor, GltfBufferView};

/// Numeric type of each component.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
}

impl ComponentType {
    /// Map a GL component type code. `None` for codes this loader does not read.
    pub fn from_gl(code: u32) -> Option<Self> {
        match code {
            5120 => Some(ComponentType::I8),
            5121 => Some(ComponentType::U8),
            5122 => Some(ComponentType::I16),
            5123 => Some(ComponentType::U16),
            5125 => Some(ComponentType::U32),
            5126 => Some(ComponentType::F32),
            _ => None,
        }
    }

    pub fn byte_size(self) -> usize {
        match self {
            ComponentType::I8 | ComponentType::U8 => 1,
            ComponentType::I16 | ComponentType::U16 => 2,
            ComponentType::U32 | ComponentType::F32 => 4,
        }
    }

    /// Read one component at `offset`, widened to `f32`.
    fn read_f32(self, bytes: &[u8], offset: usize) -> f32 {
        match self {
            ComponentType::I8 => bytes[offset] as i8 as f32,
            ComponentType::U8 => bytes[offset] as f32,
            ComponentType::I16 => i16::from_le_bytes([bytes[offset], bytes[offset + 1]]) as f32,
            ComponentType::U16 => u16::from_le_bytes([bytes[offset], bytes[offset + 1]]) as f32,
            ComponentType::U32 => read_u32_le(bytes, offset) as f32,
            ComponentType::F32 => f32::from_bits(read_u32_le(bytes, offset)),
        }
    }

    /// Read one component at `offset` as an index. Keeps full `u32` precision.
    fn read_index(self, bytes: &[u8], offset: usize) -> u32 {
        match self {
            ComponentType::U8 => bytes[offset] as u32,
            ComponentType::U16 => u16::from_le_bytes([bytes[offset], bytes[offset + 1]]) as u32,
            ComponentType::U32 => read_u32_le(bytes, offset),
            ComponentType::I8 | ComponentType::I16 | ComponentType::F32 => {
                self.read_f32(bytes, offset).max(0.0) as u32
            }
        }
    }
}

/// Shape of each element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementShape {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl ElementShape {
    /// Parse the accessor `type` string. `None` for MAT2, MAT3 and anything else.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "SCALAR" => Some(ElementShape::Scalar),
            "VEC2" => Some(ElementShape::Vec2),
            "VEC3" => Some(ElementShape::Vec3),
            "VEC4" => Some(ElementShape::Vec4),
            "MAT4" => Some(ElementShape::Mat4),
            _ => None,
        }
    }

    /// Components per element.
    pub fn arity(self) -> usize {
        match self {
            ElementShape::Scalar => 1,
            ElementShape::Vec2 => 2,
            ElementShape::Vec3 => 3,
            ElementShape::Vec4 => 4,
            ElementShape::Mat4 => 16,
        }
    }
}

/// A decoded accessor, one variant per element shape.
#[derive(Clone, Debug, PartialEq)]
pub enum AccessorData {
    Scalar(Vec<f32>),
    Vec2(Vec<Vec2>),
    Vec3(Vec<Vec3>),
    Vec4(Vec<Vec4>),
    Mat4(Vec<Mat4>),
}

impl AccessorData {
    pub fn shape(&self) -> ElementShape {
        match self {
            AccessorData::Scalar(_) => ElementShape::Scalar,
            AccessorData::Vec2(_) => ElementShape::Vec2,
            AccessorData::Vec3(_) => ElementShape::Vec3,
            AccessorData::Vec4(_) => ElementShape::Vec4,
            AccessorData::Mat4(_) => ElementShape::Mat4,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            AccessorData::Scalar(v) => v.len(),
            AccessorData::Vec2(v) => v.len(),
            AccessorData::Vec3(v) => v.len(),
            AccessorData::Vec4(v) => v.len(),
            AccessorData::Mat4(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_scalars(self, accessor: usize) -> LoadResult<Vec<f32>> {
        match self {
            AccessorData::Scalar(v) => Ok(v),
            other => Err(other.shape_mismatch(accessor, ElementShape::Scalar)),
        }
    }

    pub fn into_vec2(self, accessor: usize) -> LoadResult<Vec<Vec2>> {
        match self {
            AccessorData::Vec2(v) => Ok(v),
            other => Err(other.shape_mismatch(accessor, ElementShape::Vec2)),
        }
    }

    pub fn into_vec3(self, accessor: usize) -> LoadResult<Vec<Vec3>> {
        match self {
            AccessorData::Vec3(v) => Ok(v),
            other => Err(other.shape_mismatch(accessor, ElementShape::Vec3)),
        }
    }

    pub fn into_vec4(self, accessor: usize) -> LoadResult<Vec<Vec4>> {
        match self {
            AccessorData::Vec4(v) => Ok(v),
            other => Err(other.shape_mismatch(accessor, ElementShape::Vec4)),
        }
    }

    /// Like [`into_vec4`](Self::into_vec4) but also accepts VEC3 data,
    /// filling the missing component with `w` (RGB colours).
    pub fn into_vec4_or(self, accessor: usize, w: f32) -> LoadResult<Vec<Vec4>> {
        match self {
            AccessorData::Vec3(v) => Ok(v.into_iter().map(|v| v.extend(w)).collect()),
            other => other.into_vec4(accessor),
        }
    }

    pub fn into_mat4(self, accessor: usize) -> LoadResult<Vec<Mat4>> {
        match self {
            AccessorData::Mat4(v) => Ok(v),
            other => Err(other.shape_mismatch(accessor, ElementShape::Mat4)),
        }
    }

    fn shape_mismatch(&self, accessor: usize, expected: ElementShape) -> LoadError {
        LoadError::malformed_accessor(
            accessor,
            format!("expected {:?} elements, found {:?}", expected, self.shape()),
        )
    }
}

/// Largest accessor decoded without a buffer view. Zero-filled data has
/// no backing bytes to bound its `count`.
const MAX_ZERO_FILL_BYTES: usize = 1 << 30;

/// Validated addressing for one accessor.
#[derive(Clone, Copy, Debug)]
struct Layout {
    component: ComponentType,
    shape: ElementShape,
    count: usize,
    /// Absolute byte offset of element 0, or `None` for zero-filled data.
    base: Option<usize>,
    stride: usize,
}

impl Layout {
    fn new(
        index: usize,
        accessor: &GltfAccessor,
        view: Option<&GltfBufferView>,
        buffer_len: usize,
    ) -> LoadResult<Self> {
        let component = ComponentType::from_gl(accessor.component_type).ok_or_else(|| {
            LoadError::malformed_accessor(
                index,
                format!("unsupported component type {}", accessor.component_type),
            )
        })?;
        let shape = ElementShape::parse(&accessor.element_type).ok_or_else(|| {
            LoadError::malformed_accessor(
                index,
                format!("unsupported element type {}", accessor.element_type),
            )
        })?;

        match (component, shape) {
            (ComponentType::F32, ElementShape::Mat4) => {}
            (_, ElementShape::Mat4) => {
                return Err(LoadError::malformed_accessor(
                    index,
                    format!("{:?} matrices are not supported", component),
                ))
            }
            (_, ElementShape::Scalar | ElementShape::Vec2 | ElementShape::Vec3 | ElementShape::Vec4) => {}
        }

        if accessor.sparse.is_some() {
            log::warn!("Accessor {} is sparse; sparse substitution is not applied", index);
        }

        let element_size = component.byte_size() * shape.arity();
        let decoded_size = accessor
            .count
            .checked_mul(shape.arity() * std::mem::size_of::<f32>())
            .filter(|size| *size <= isize::MAX as usize)
            .ok_or_else(|| {
                LoadError::malformed_accessor(index, format!("count {} is too large", accessor.count))
            })?;

        let Some(view) = view else {
            if decoded_size > MAX_ZERO_FILL_BYTES {
                return Err(LoadError::malformed_accessor(
                    index,
                    format!(
                        "{} elements without a buffer view exceed the {} byte zero-fill limit",
                        accessor.count, MAX_ZERO_FILL_BYTES
                    ),
                ));
            }
            return Ok(Self {
                component,
                shape,
                count: accessor.count,
                base: None,
                stride: element_size,
            });
        };

        let stride = view.byte_stride.unwrap_or(element_size);
        if stride < element_size {
            return Err(LoadError::malformed_accessor(
                index,
                format!("stride {} is smaller than element size {}", stride, element_size),
            ));
        }

        view.byte_offset
            .checked_add(view.byte_length)
            .filter(|end| *end <= buffer_len)
            .ok_or_else(|| {
                LoadError::malformed_accessor(
                    index,
                    format!(
                        "buffer view range {}+{} exceeds buffer length {}",
                        view.byte_offset, view.byte_length, buffer_len
                    ),
                )
            })?;

        if accessor.count > 0 {
            let last_end = (accessor.count - 1)
                .checked_mul(stride)
                .and_then(|v| v.checked_add(accessor.byte_offset))
                .and_then(|v| v.checked_add(element_size));
            match last_end {
                Some(end) if end <= view.byte_length => {}
                _ => {
                    return Err(LoadError::malformed_accessor(
                        index,
                        format!(
                            "{} elements of {} bytes at stride {} from offset {} overrun buffer view of {} bytes",
                            accessor.count, element_size, stride, accessor.byte_offset, view.byte_length
                        ),
                    ))
                }
            }
        }
        Ok(Self {
            component,
            shape,
            count: accessor.count,
            base: Some(view.byte_offset + accessor.byte_offset),
            stride,
        })
    }

    /// Read `N` consecutive components per element.
    fn components<const N: usize>(&self, bytes: &[u8]) -> Vec<[f32; N]> {
        let Some(base) = self.base else {
            return vec![[0.0; N]; self.count];
        };
        let size = self.component.byte_size();

        (0..self.count)
            .map(|i| {
                let start = base + i * self.stride;
                let mut element = [0.0; N];
                for (j, value) in element.iter_mut().enumerate() {
                    *value = self.component.read_f32(bytes, start + j * size);
                }
                element
            })
            .collect()
    }
}

/// Decode an accessor from the bytes of the buffer its view points into.
///
/// `view` is `None` for accessors without a buffer view, which decode as
/// zeros. Fails with [`LoadError::MalformedAccessor`] for unsupported
/// component/shape combinations and for any read outside the view.
pub fn decode(
    index: usize,
    accessor: &GltfAccessor,
    view: Option<&GltfBufferView>,
    bytes: &[u8],
) -> LoadResult<AccessorData> {
    let layout = Layout::new(index, accessor, view, bytes.len())?;

    let data = match layout.shape {
        ElementShape::Scalar => {
            AccessorData::Scalar(layout.components::<1>(bytes).into_iter().map(|[v]| v).collect())
        }
        ElementShape::Vec2 => AccessorData::Vec2(
            layout.components::<2>(bytes).into_iter().map(Vec2::from_array).collect(),
        ),
        ElementShape::Vec3 => AccessorData::Vec3(
            layout.components::<3>(bytes).into_iter().map(Vec3::from_array).collect(),
        ),
        ElementShape::Vec4 => AccessorData::Vec4(
            layout.components::<4>(bytes).into_iter().map(Vec4::from_array).collect(),
        ),
        // Column-major, like every glTF matrix
        ElementShape::Mat4 => AccessorData::Mat4(
            layout
                .components::<16>(bytes)
                .iter()
                .map(Mat4::from_cols_array)
                .collect(),
        ),
    };

    Ok(data)
}

/// Decode a SCALAR accessor as vertex indices without going through `f32`.
pub fn decode_indices(
    index: usize,
    accessor: &GltfAccessor,
    view: Option<&GltfBufferView>,
    bytes: &[u8],
) -> LoadResult<Vec<u32>> {
    let layout = Layout::new(index, accessor, view, bytes.len())?;
    if layout.shape != ElementShape::Scalar {
        return Err(LoadError::malformed_accessor(
            index,
            format!("index accessor must be SCALAR, found {:?}", layout.shape),
        ));
    }

    let Some(base) = layout.base else {
        return Ok(vec![0; layout.count]);
    };

    Ok((0..layout.count)
        .map(|i| layout.component.read_index(bytes, base + i * layout.stride))
        .collect())
}

fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accessor(component_type: u32, element_type: &str, count: usize, byte_offset: usize) -> GltfAccessor {
        GltfAccessor {
            buffer_view: Some(0),
            byte_offset,
            component_type,
            count,
            element_type: element_type.to_string(),
            normalized: false,
            sparse: None,
        }
    }

    fn view(byte_offset: usize, byte_length: usize, byte_stride: Option<usize>) -> GltfBufferView {
        GltfBufferView {
            buffer: 0,
            byte_offset,
            byte_length,
            byte_stride,
        }
    }

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_tightly_packed_vec3() {
        let values: Vec<f32> = (0..9).map(|i| i as f32).collect();
        let bytes = f32_bytes(&values);
        let data = decode(0, &accessor(5126, "VEC3", 3, 0), Some(&view(0, 36, None)), &bytes).unwrap();

        assert_eq!(
            data.into_vec3(0).unwrap(),
            vec![
                Vec3::new(0.0, 1.0, 2.0),
                Vec3::new(3.0, 4.0, 5.0),
                Vec3::new(6.0, 7.0, 8.0)
            ]
        );
    }

    #[test]
    fn test_interleaved_stride_skips_padding() {
        // Each 20-byte element: position (3 floats) followed by uv (2 floats)
        let mut values = Vec::new();
        for i in 0..3 {
            let i = i as f32;
            values.extend_from_slice(&[i, i + 0.5, i + 0.25, 100.0 + i, 200.0 + i]);
        }
        let bytes = f32_bytes(&values);
        let bv = view(0, bytes.len(), Some(20));

        let positions = decode(0, &accessor(5126, "VEC3", 3, 0), Some(&bv), &bytes)
            .unwrap()
            .into_vec3(0)
            .unwrap();
        assert_eq!(positions[2], Vec3::new(2.0, 2.5, 2.25));

        let uvs = decode(1, &accessor(5126, "VEC2", 3, 12), Some(&bv), &bytes)
            .unwrap()
            .into_vec2(1)
            .unwrap();
        assert_eq!(uvs, vec![Vec2::new(100.0, 200.0), Vec2::new(101.0, 201.0), Vec2::new(102.0, 202.0)]);
    }

    #[test]
    fn test_view_and_accessor_offsets_add() {
        let bytes = f32_bytes(&[9.0, 9.0, 1.0, 2.0, 3.0]);
        let data = decode(0, &accessor(5126, "SCALAR", 2, 4), Some(&view(8, 12, None)), &bytes).unwrap();
        assert_eq!(data, AccessorData::Scalar(vec![2.0, 3.0]));
    }

    #[test]
    fn test_integers_are_not_normalized() {
        let bytes = vec![255u8, 0, 128, 1];
        let data = decode(0, &accessor(5121, "VEC4", 1, 0), Some(&view(0, 4, None)), &bytes).unwrap();
        assert_eq!(data, AccessorData::Vec4(vec![Vec4::new(255.0, 0.0, 128.0, 1.0)]));

        let signed = decode(0, &accessor(5120, "SCALAR", 1, 0), Some(&view(0, 1, None)), &[0xFF]).unwrap();
        assert_eq!(signed, AccessorData::Scalar(vec![-1.0]));

        let shorts: Vec<u8> = [-300i16, 300].iter().flat_map(|v| v.to_le_bytes()).collect();
        let data = decode(0, &accessor(5122, "VEC2", 1, 0), Some(&view(0, 4, None)), &shorts).unwrap();
        assert_eq!(data, AccessorData::Vec2(vec![Vec2::new(-300.0, 300.0)]));
    }

    #[test]
    fn test_mat4_is_column_major() {
        let mut cols = Mat4::IDENTITY.to_cols_array();
        cols[12] = 5.0;
        let bytes = f32_bytes(&cols);
        let mats = decode(0, &accessor(5126, "MAT4", 1, 0), Some(&view(0, 64, None)), &bytes)
            .unwrap()
            .into_mat4(0)
            .unwrap();
        assert_eq!(mats[0], Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)));
    }

    #[test]
    fn test_read_past_view_fails() {
        let bytes = f32_bytes(&[0.0; 8]);
        let err = decode(4, &accessor(5126, "VEC3", 3, 0), Some(&view(0, 32, None)), &bytes).unwrap_err();
        assert!(matches!(err, LoadError::MalformedAccessor { accessor: 4, .. }));
    }

    #[test]
    fn test_view_past_buffer_fails() {
        let bytes = f32_bytes(&[0.0; 2]);
        let err = decode(0, &accessor(5126, "SCALAR", 1, 0), Some(&view(4, 8, None)), &bytes).unwrap_err();
        assert!(matches!(err, LoadError::MalformedAccessor { .. }));
    }

    #[test]
    fn test_unsupported_combinations() {
        let bytes = vec![0u8; 64];
        let bv = view(0, 64, None);

        assert!(decode(0, &accessor(5124, "SCALAR", 1, 0), Some(&bv), &bytes).is_err());
        assert!(decode(0, &accessor(5126, "MAT3", 1, 0), Some(&bv), &bytes).is_err());
        assert!(decode(0, &accessor(5121, "MAT4", 1, 0), Some(&bv), &bytes).is_err());
    }

    #[test]
    fn test_stride_smaller_than_element_fails() {
        let bytes = vec![0u8; 64];
        let err = decode(0, &accessor(5126, "VEC3", 2, 0), Some(&view(0, 64, Some(8))), &bytes).unwrap_err();
        assert!(err.to_string().contains("stride"));
    }

    #[test]
    fn test_missing_view_is_zero_filled() {
        let data = decode(0, &accessor(5126, "VEC2", 2, 0), None, &[]).unwrap();
        assert_eq!(data, AccessorData::Vec2(vec![Vec2::ZERO; 2]));
    }

    #[test]
    fn test_huge_count_without_view_is_malformed() {
        let err = decode(3, &accessor(5126, "VEC3", 1 << 62, 0), None, &[]).unwrap_err();
        assert!(matches!(err, LoadError::MalformedAccessor { accessor: 3, .. }));

        // Representable, but far beyond any sane zero-filled stream
        let err = decode(3, &accessor(5126, "VEC3", 1 << 28, 0), None, &[]).unwrap_err();
        assert!(matches!(err, LoadError::MalformedAccessor { accessor: 3, .. }));

        let err = decode_indices(4, &accessor(5125, "SCALAR", usize::MAX, 0), None, &[]).unwrap_err();
        assert!(matches!(err, LoadError::MalformedAccessor { accessor: 4, .. }));
    }

    #[test]
    fn test_empty_accessor() {
        let data = decode(0, &accessor(5126, "VEC3", 0, 0), Some(&view(0, 0, None)), &[]).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_indices_keep_integer_precision() {
        let big = 16_777_217u32; // not representable as f32
        let bytes: Vec<u8> = [0u32, big].iter().flat_map(|v| v.to_le_bytes()).collect();
        let indices = decode_indices(0, &accessor(5125, "SCALAR", 2, 0), Some(&view(0, 8, None)), &bytes).unwrap();
        assert_eq!(indices, vec![0, big]);

        let shorts: Vec<u8> = [1u16, 2, 3].iter().flat_map(|v| v.to_le_bytes()).collect();
        let indices = decode_indices(0, &accessor(5123, "SCALAR", 3, 0), Some(&view(0, 6, None)), &shorts).unwrap();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_shape_mismatch_is_malformed() {
        let data = AccessorData::Vec2(vec![Vec2::ONE]);
        assert!(data.clone().into_vec3(2).is_err());
        let colors = AccessorData::Vec3(vec![Vec3::ONE]).into_vec4_or(0, 1.0).unwrap();
        assert_eq!(colors, vec![Vec4::ONE]);
    }
}
