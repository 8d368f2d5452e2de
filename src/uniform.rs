//! Packing of scalar and vector captures into the implicit uniform buffer.
//!
//! HLSL constant buffers are laid out in 16-byte registers. A value never
//! straddles a register boundary; matrices are declared `row_major`, start
//! on a register, and put each row in a register of its own.

use serde::Serialize;
use thiserror::Error;

use crate::capture::CapturedField;
use crate::types::Ty;

const REGISTER: u32 = 16;

/// Placement of one capture inside the uniform buffer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UniformEntry {
    pub name: String,
    /// Byte offset from the start of the buffer.
    pub offset: u32,
    /// Rows of a matrix, 1 otherwise.
    pub rows: u32,
    /// Bytes of one row on the host (the whole value unless a matrix).
    pub row_size: u32,
    /// Distance between rows inside the buffer.
    pub row_stride: u32,
}

impl UniformEntry {
    /// Bytes the host supplies for this value.
    pub fn host_size(&self) -> u32 {
        self.rows * self.row_size
    }

    /// `c3.y`: register and starting component, for `packoffset`.
    pub fn pack_offset(&self) -> String {
        let component = ['x', 'y', 'z', 'w'][((self.offset % REGISTER) / 4) as usize];
        format!("c{}.{}", self.offset / REGISTER, component)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UniformLayout {
    pub entries: Vec<UniformEntry>,
    /// Buffer size, a whole number of registers.
    pub size: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum UniformError {
    #[error("capture `{field}` supplied {found} bytes, expected {expected}")]
    SizeMismatch {
        field: String,
        expected: u32,
        found: usize,
    },
    #[error("capture `{field}` is a resource, not a value")]
    NotAValue { field: String },
    #[error("descriptor of kernel `{expected}` cannot pack uniforms for `{found}`")]
    KernelMismatch { expected: String, found: String },
}

fn align(offset: u32, to: u32) -> u32 {
    offset.div_ceil(to) * to
}

/// Shape of a value: (rows, bytes per row, bytes per component).
fn shape(ty: &Ty) -> (u32, u32, u32) {
    let comp = ty.elem().map_or(4, |k| k.hlsl_size());
    match ty {
        Ty::Vector(_, n) => (1, u32::from(*n) * comp, comp),
        Ty::Matrix(_, r, c) => (u32::from(*r), u32::from(*c) * comp, comp),
        _ => (1, comp, comp),
    }
}

/// Lay out `scalars` in order.
pub fn layout(scalars: &[CapturedField]) -> UniformLayout {
    let mut offset = 0;
    let mut entries = Vec::with_capacity(scalars.len());

    for field in scalars {
        let ty = Ty::from_host(&field.host_type);
        let is_matrix = matches!(ty, Some(Ty::Matrix(..)));
        let (rows, row_size, comp) = ty.as_ref().map_or((1, 4, 4), shape);
        let row_stride = align(row_size, REGISTER);

        offset = align(offset, comp);
        let crosses = offset % REGISTER + row_size > REGISTER;
        if is_matrix || crosses {
            offset = align(offset, REGISTER);
        }
        entries.push(UniformEntry {
            name: field.shader_name.clone(),
            offset,
            rows,
            row_size,
            row_stride,
        });
        offset += (rows - 1) * row_stride + row_size;
    }

    UniformLayout {
        entries,
        size: align(offset, REGISTER),
    }
}

impl UniformLayout {
    /// Copy host values into a buffer image. `values[i]` belongs to
    /// `entries[i]`.
    pub fn pack<'v>(&self, values: impl IntoIterator<Item = Option<&'v [u8]>>) -> Result<Vec<u8>, UniformError> {
        let mut buffer = vec![0u8; self.size as usize];
        let mut values = values.into_iter();
        for entry in &self.entries {
            let bytes = values.next().flatten().ok_or_else(|| UniformError::NotAValue {
                field: entry.name.clone(),
            })?;
            if bytes.len() != entry.host_size() as usize {
                return Err(UniformError::SizeMismatch {
                    field: entry.name.clone(),
                    expected: entry.host_size(),
                    found: bytes.len(),
                });
            }
            for (row, chunk) in bytes.chunks(entry.row_size as usize).enumerate() {
                let start = (entry.offset + row as u32 * entry.row_stride) as usize;
                buffer[start..start + chunk.len()].copy_from_slice(chunk);
            }
        }
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureSource;
    use crate::types::Category;

    fn scalar(name: &str, ty: &str) -> CapturedField {
        CapturedField {
            name: name.to_string(),
            shader_name: name.to_string(),
            host_type: ty.parse().unwrap(),
            hlsl_type: String::new(),
            category: Category::ScalarOrVector,
            slot: None,
            source: CaptureSource::Instance(0),
        }
    }

    fn offsets(layout: &UniformLayout) -> Vec<u32> {
        layout.entries.iter().map(|e| e.offset).collect()
    }

    #[test]
    fn test_scalars_pack_tightly() {
        let l = layout(&[scalar("a", "i32"), scalar("b", "f32"), scalar("c", "u32")]);
        assert_eq!(offsets(&l), vec![0, 4, 8]);
        assert_eq!(l.size, 16);
        assert_eq!(l.entries[1].pack_offset(), "c0.y");
    }

    #[test]
    fn test_values_do_not_straddle_registers() {
        let l = layout(&[scalar("a", "f32"), scalar("v", "Float4"), scalar("b", "f32"), scalar("w", "Float2")]);
        assert_eq!(offsets(&l), vec![0, 16, 32, 36]);
        assert_eq!(l.size, 48);
        let l = layout(&[scalar("a", "Float3"), scalar("b", "Float2")]);
        assert_eq!(offsets(&l), vec![0, 16]);
    }

    #[test]
    fn test_matrix_rows_take_a_register_each() {
        let l = layout(&[scalar("s", "f32"), scalar("m", "Float3x3"), scalar("t", "f32")]);
        assert_eq!(offsets(&l), vec![0, 16, 60]);
        assert_eq!(l.entries[1].rows, 3);
        assert_eq!(l.entries[1].row_stride, 16);
        assert_eq!(l.size, 64);
    }

    #[test]
    fn test_doubles_are_eight_bytes() {
        let l = layout(&[scalar("a", "f32"), scalar("d", "f64"), scalar("v", "Double2")]);
        assert_eq!(offsets(&l), vec![0, 8, 16]);
        assert_eq!(l.entries[1].pack_offset(), "c0.z");
    }

    #[test]
    fn test_empty_layout() {
        let l = layout(&[]);
        assert!(l.entries.is_empty());
        assert_eq!(l.size, 0);
        assert_eq!(l.pack(std::iter::empty()).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_pack_places_rows() {
        let l = layout(&[scalar("s", "f32"), scalar("m", "Float2x2")]);
        let s = 1.0f32.to_ne_bytes();
        let m: Vec<u8> = [2.0f32, 3.0, 4.0, 5.0]
            .iter()
            .flat_map(|v| v.to_ne_bytes())
            .collect();
        let buffer = l.pack([Some(&s[..]), Some(&m[..])]).unwrap();
        assert_eq!(buffer.len(), 48);
        assert_eq!(&buffer[0..4], &s);
        assert_eq!(&buffer[16..24], &m[0..8]);
        assert_eq!(&buffer[32..40], &m[8..16]);
        assert!(buffer[24..32].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_pack_rejects_wrong_sizes_and_resources() {
        let l = layout(&[scalar("a", "Float2")]);
        let err = l.pack([Some(&[0u8; 4][..])]).unwrap_err();
        assert_eq!(
            err,
            UniformError::SizeMismatch {
                field: "a".to_string(),
                expected: 8,
                found: 4
            }
        );
        assert!(matches!(l.pack([None]), Err(UniformError::NotAValue { .. })));
    }
}
