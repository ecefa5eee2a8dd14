use byteorder::{ByteOrder, LE};

use super::internal::{BYTE, FLOAT, SHORT, UNSIGNED_BYTE, UNSIGNED_INT, UNSIGNED_SHORT};
use crate::conversion::{ComponentFormat, MeshIndexType, VertexFormat};

/// Returns the glTF component type of a vertex component, if glTF can
/// represent it.
pub fn component_type(component: ComponentFormat) -> Option<u32> {
    match component {
        ComponentFormat::I8 => Some(BYTE),
        ComponentFormat::U8 => Some(UNSIGNED_BYTE),
        ComponentFormat::I16 => Some(SHORT),
        ComponentFormat::U16 => Some(UNSIGNED_SHORT),
        ComponentFormat::U32 => Some(UNSIGNED_INT),
        ComponentFormat::F32 => Some(FLOAT),
        ComponentFormat::I32 | ComponentFormat::F16 | ComponentFormat::F64 => None,
    }
}

pub fn index_component_type(index_type: MeshIndexType) -> u32 {
    match index_type {
        MeshIndexType::U8 => UNSIGNED_BYTE,
        MeshIndexType::U16 => UNSIGNED_SHORT,
        MeshIndexType::U32 => UNSIGNED_INT,
    }
}

/// Returns the glTF accessor type of a vertex format. Only vectors and square
/// matrices are representable.
pub fn accessor_type(format: &VertexFormat) -> Option<&'static str> {
    match (format.vector_count(), format.component_count()) {
        (1, 1) => Some("SCALAR"),
        (1, 2) => Some("VEC2"),
        (1, 3) => Some("VEC3"),
        (1, 4) => Some("VEC4"),
        (2, 2) => Some("MAT2"),
        (3, 3) => Some("MAT3"),
        (4, 4) => Some("MAT4"),
        _ => None,
    }
}

/// Computes per-component minimum and maximum of a three-component position
/// attribute, in the numeric domain the accessor is interpreted in. Normalized
/// formats are decoded to their floating-point range first.
///
/// Returns `None` for formats that aren't valid position formats or if there
/// are no vertices.
pub fn position_bounds(
    format: &VertexFormat,
    data: &[u8],
    offset: usize,
    stride: usize,
    count: usize,
) -> Option<(Vec<f32>, Vec<f32>)> {
    use ComponentFormat::*;

    let decode: fn(&[u8]) -> f32 = match *format {
        VertexFormat::Vector {
            component: F32,
            count: 3,
            normalized: false,
        } => |bytes| LE::read_f32(bytes),
        VertexFormat::Vector {
            component: I8,
            count: 3,
            normalized: false,
        } => |bytes| f32::from(bytes[0] as i8),
        VertexFormat::Vector {
            component: I8,
            count: 3,
            normalized: true,
        } => |bytes| (f32::from(bytes[0] as i8) / 127.0).max(-1.0),
        VertexFormat::Vector {
            component: U8,
            count: 3,
            normalized: false,
        } => |bytes| f32::from(bytes[0]),
        VertexFormat::Vector {
            component: U8,
            count: 3,
            normalized: true,
        } => |bytes| f32::from(bytes[0]) / 255.0,
        VertexFormat::Vector {
            component: I16,
            count: 3,
            normalized: false,
        } => |bytes| f32::from(LE::read_i16(bytes)),
        VertexFormat::Vector {
            component: I16,
            count: 3,
            normalized: true,
        } => |bytes| (f32::from(LE::read_i16(bytes)) / 32767.0).max(-1.0),
        VertexFormat::Vector {
            component: U16,
            count: 3,
            normalized: false,
        } => |bytes| f32::from(LE::read_u16(bytes)),
        VertexFormat::Vector {
            component: U16,
            count: 3,
            normalized: true,
        } => |bytes| f32::from(LE::read_u16(bytes)) / 65535.0,
        _ => return None,
    };
    if count == 0 {
        return None;
    }

    let component_size = format.component()?.size();
    let mut min = vec![f32::INFINITY; 3];
    let mut max = vec![f32::NEG_INFINITY; 3];
    for vertex in 0..count {
        let start = offset + vertex * stride;
        for component in 0..3 {
            let at = start + component * component_size;
            let value = decode(data.get(at..at + component_size)?);
            min[component] = min[component].min(value);
            max[component] = max[component].max(value);
        }
    }

    Some((min, max))
}
