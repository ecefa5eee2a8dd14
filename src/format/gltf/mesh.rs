//! Encodes a mesh into buffer views and accessors.

use std::collections::HashMap;

use byteorder::{ByteOrder, LE};

use super::{
    accessor::{accessor_type, component_type, index_component_type, position_bounds},
    config::GltfConfig,
    diagnostics::Diagnostics,
    document::{Document, MeshRecord},
    error::{ConvertError, Result},
    extensions::KHR_MESH_QUANTIZATION,
    internal::{GltfAccessor, GltfBufferView, GltfPrimitive, ARRAY_BUFFER, ELEMENT_ARRAY_BUFFER},
    layout::{self, AttributeSpan, IndexSpan},
};
use crate::conversion::{AttributeName, ComponentFormat, Mesh, MeshAttribute, MeshPrimitive, VertexFormat};

const TRIANGLES: u32 = 4;

/// How the Y coordinate of texture coordinates is flipped in the copied data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flip {
    Float,
    UnsignedByte,
    UnsignedShort,
}

/// A single glTF accessor derived from a mesh attribute. Array attributes
/// produce several of these.
#[derive(Debug)]
struct Resolved {
    name: String,
    format: VertexFormat,
    accessor_type: &'static str,
    component_type: u32,
    span: AttributeSpan,
    flip: Option<Flip>,
    bounds: bool,
}

/// Checks everything about the mesh that can fail, then appends its data to
/// the buffer and records the resulting primitive.
pub fn add_mesh(
    document: &mut Document,
    diagnostics: &mut Diagnostics,
    config: &GltfConfig,
    attribute_names: &HashMap<u16, String>,
    id: u32,
    mesh: &Mesh,
) -> Result<()> {
    let mode = primitive_mode(mesh.primitive)?;

    let index_span = match mesh.indices {
        Some(indices) => {
            let size = indices.index_type.size();
            if indices.stride != size as isize {
                return Err(ConvertError::NonContiguousIndices);
            }
            let end = size
                .checked_mul(indices.count)
                .and_then(|length| length.checked_add(indices.offset));
            if end.map_or(true, |end| end > mesh.index_data.len()) {
                return Err(ConvertError::Mesh(format!(
                    "index data of {} bytes can't hold {} indices at offset {}",
                    mesh.index_data.len(),
                    indices.count,
                    indices.offset
                )));
            }
            Some(IndexSpan {
                size,
                count: indices.count,
            })
        }
        None => None,
    };

    if mesh.attributes.is_empty() {
        if mesh.vertex_count != 0 {
            return Err(ConvertError::Mesh(String::from(
                "attribute-less mesh with a non-zero vertex count is unrepresentable in glTF",
            )));
        }
        config.strict_check(
            diagnostics,
            "attribute-less meshes are not valid glTF",
            "strict mode disabled, allowing an attribute-less mesh",
        )?;
    } else if mesh.vertex_count == 0 {
        config.strict_check(
            diagnostics,
            "meshes with zero vertices are not valid glTF",
            "strict mode disabled, allowing a mesh with zero vertices",
        )?;
    }

    let mut quantized = false;
    let mut numbered: HashMap<&'static str, usize> = HashMap::new();
    let mut resolved = Vec::new();
    for (index, attribute) in mesh.attributes.iter().enumerate() {
        let elements = split(attribute)?;
        let (base, is_quantized) = attribute_name(config, diagnostics, attribute_names, attribute)?;
        quantized |= is_quantized;

        let flip = if attribute.name == AttributeName::TextureCoordinates {
            texture_coordinate_flip(config, diagnostics, &attribute.format)?
        } else {
            None
        };

        for (format, offset) in elements {
            let name = match base {
                Base::Numbered(stem) => {
                    let counter = numbered.entry(stem).or_default();
                    *counter += 1;
                    format!("{}_{}", stem, *counter - 1)
                }
                Base::Named(ref name) => match mesh.attribute_id(index) {
                    0 => name.clone(),
                    id if name.starts_with('_') => format!("{}_{}", name, id),
                    id => format!("_{}_{}", name, id),
                },
            };
            resolved.push(resolve(config, diagnostics, mesh, attribute, name, format, offset, flip)?);
        }
    }

    let spans: Vec<AttributeSpan> = resolved.iter().map(|attribute| attribute.span).collect();
    for attribute in &resolved {
        if attribute.span.checked_end().is_none() {
            return Err(ConvertError::Mesh(format!(
                "mesh attribute {} spans more bytes than can be addressed",
                attribute.name
            )));
        }
        if attribute.span.count != 0 && attribute.span.footprint_end() > mesh.vertex_data.len() {
            return Err(ConvertError::Mesh(format!(
                "mesh attribute {} reaches {} bytes past the end of the vertex data",
                attribute.name,
                attribute.span.footprint_end() - mesh.vertex_data.len()
            )));
        }
    }

    // Nothing can fail from here on.
    let layout = layout::plan(document.buffer.len(), index_span, &spans);
    let base = document.buffer.len();
    let region = document.buffer.grow_to(layout.end);

    if let (Some(placement), Some(indices)) = (layout.index, mesh.indices) {
        let length = indices.index_type.size() * indices.count;
        region[placement.offset - base..][..length]
            .copy_from_slice(&mesh.index_data[indices.offset..][..length]);
    }

    let mut padded = 0;
    for group in &layout.groups {
        let source = mesh.vertex_data.get(group.start..).unwrap_or_default();
        let available = source.len().min(group.length);
        region[group.placement.offset - base..][..available]
            .copy_from_slice(&source[..available]);
        padded += group.length - available;
    }
    if padded != 0 {
        diagnostics.verbose(format!("vertex buffer was padded by {} bytes", padded));
    }
    if layout.total_padding() != 0 {
        diagnostics.verbose(format!(
            "inserted {} bytes of alignment padding",
            layout.total_padding()
        ));
    }

    // Where each accessor ends up, as (group, offset relative to the view).
    let mut placements = vec![(0, 0); resolved.len()];
    for (group_index, group) in layout.groups.iter().enumerate() {
        for &member in &group.members {
            placements[member] = (group_index, resolved[member].span.offset - group.start);
        }
    }

    // Accessors aliasing the same data are flipped only once.
    let mut flipped = Vec::new();
    for (attribute, &(group, relative)) in resolved.iter().zip(&placements) {
        if let Some(flip) = attribute.flip {
            let group = &layout.groups[group];
            let start = group.placement.offset + relative;
            if flipped.contains(&start) {
                continue;
            }
            flipped.push(start);
            let component_size = attribute.format.component().map_or(0, ComponentFormat::size);
            for vertex in 0..attribute.span.count {
                let at = start - base + vertex * attribute.span.stride + component_size;
                let bytes = &mut region[at..at + component_size];
                match flip {
                    Flip::Float => {
                        let value = LE::read_f32(bytes);
                        LE::write_f32(bytes, 1.0 - value);
                    }
                    Flip::UnsignedByte => bytes[0] = u8::MAX - bytes[0],
                    Flip::UnsignedShort => {
                        let value = LE::read_u16(bytes);
                        LE::write_u16(bytes, u16::MAX - value);
                    }
                }
            }
        }
    }

    let prefix = if mesh.name.is_empty() {
        format!("mesh {}", id)
    } else {
        format!("mesh {} ({})", id, mesh.name)
    };
    let label = |suffix: &str| {
        if config.accessor_names {
            Some(format!("{} {}", prefix, suffix))
        } else {
            None
        }
    };

    let mut primitive = GltfPrimitive {
        mode: (mode != TRIANGLES || config.keep_defaults).then(|| mode),
        ..Default::default()
    };

    if let (Some(placement), Some(indices)) = (layout.index, mesh.indices) {
        let view = document.buffer_views.len() as u32;
        document.buffer_views.push(GltfBufferView {
            buffer: 0,
            byte_offset: placement.offset,
            byte_length: indices.index_type.size() * indices.count,
            byte_stride: None,
            target: Some(ELEMENT_ARRAY_BUFFER),
            name: label("indices"),
        });
        primitive.indices = Some(document.accessors.len() as u32);
        document.accessors.push(GltfAccessor {
            buffer_view: view,
            byte_offset: 0,
            component_type: index_component_type(indices.index_type),
            normalized: false,
            count: indices.count,
            type_: "SCALAR",
            min: None,
            max: None,
            name: label("indices"),
        });
    }

    let first_view = document.buffer_views.len() as u32;
    for group in &layout.groups {
        let names: Vec<&str> = group
            .members
            .iter()
            .map(|&member| resolved[member].name.as_str())
            .collect();
        document.buffer_views.push(GltfBufferView {
            buffer: 0,
            byte_offset: group.placement.offset,
            byte_length: group.length,
            byte_stride: group.byte_stride,
            target: Some(ARRAY_BUFFER),
            name: label(&names.join(", ")),
        });
    }

    let written = document.buffer.as_slice();
    for (attribute, &(group, relative)) in resolved.iter().zip(&placements) {
        let (min, max) = if attribute.bounds {
            position_bounds(
                &attribute.format,
                written,
                layout.groups[group].placement.offset + relative,
                attribute.span.stride,
                attribute.span.count,
            )
            .map_or((None, None), |(min, max)| (Some(min), Some(max)))
        } else {
            (None, None)
        };

        primitive
            .attributes
            .insert(attribute.name.clone(), document.accessors.len() as u32);
        document.accessors.push(GltfAccessor {
            buffer_view: first_view + group as u32,
            byte_offset: relative,
            component_type: attribute.component_type,
            normalized: attribute.format.is_normalized(),
            count: attribute.span.count,
            type_: attribute.accessor_type,
            min,
            max,
            name: label(&attribute.name),
        });
    }

    if quantized {
        document.extensions.mark_required(KHR_MESH_QUANTIZATION);
    }

    document.meshes.push(MeshRecord {
        name: mesh.name.clone(),
        primitive,
    });
    Ok(())
}

fn primitive_mode(primitive: MeshPrimitive) -> Result<u32> {
    Ok(match primitive {
        MeshPrimitive::Points => 0,
        MeshPrimitive::Lines => 1,
        MeshPrimitive::LineLoop => 2,
        MeshPrimitive::LineStrip => 3,
        MeshPrimitive::Triangles => TRIANGLES,
        MeshPrimitive::TriangleStrip => 5,
        MeshPrimitive::TriangleFan => 6,
        MeshPrimitive::Instances | MeshPrimitive::Faces | MeshPrimitive::Edges => {
            return Err(ConvertError::UnsupportedPrimitive(primitive))
        }
    })
}

enum Base {
    /// A glTF attribute that always carries a set index, such as `TEXCOORD_0`.
    Numbered(&'static str),
    Named(String),
}

/// Picks the glTF name of an attribute and checks that glTF allows its format
/// for that semantic. Also returns whether the format needs
/// `KHR_mesh_quantization`.
fn attribute_name(
    config: &GltfConfig,
    diagnostics: &mut Diagnostics,
    attribute_names: &HashMap<u16, String>,
    attribute: &MeshAttribute,
) -> Result<(Base, bool)> {
    use ComponentFormat::*;

    let format = attribute.format;
    if let VertexFormat::ImplementationSpecific(value) = format {
        return Err(ConvertError::ImplementationSpecificFormat(value));
    }

    let unsupported = |what: &str| {
        Err(ConvertError::Mesh(format!(
            "unsupported mesh {} attribute format {}",
            what, format
        )))
    };

    let (component, count, normalized) = match format {
        VertexFormat::Vector {
            component,
            count,
            normalized,
        } => (component, count, normalized),
        _ => (F64, 0, false),
    };

    Ok(match attribute.name {
        AttributeName::Position => match (component, count, normalized) {
            (F32, 3, false) => (Base::Named("POSITION".into()), false),
            (I8 | U8 | I16 | U16, 3, _) => (Base::Named("POSITION".into()), true),
            _ => return unsupported("position"),
        },
        AttributeName::Normal => match (component, count, normalized) {
            (F32, 3, false) => (Base::Named("NORMAL".into()), false),
            (I8 | I16, 3, true) => (Base::Named("NORMAL".into()), true),
            _ => return unsupported("normal"),
        },
        AttributeName::Tangent if count == 4 => match (component, normalized) {
            (F32, false) => (Base::Named("TANGENT".into()), false),
            (I8 | I16, true) => (Base::Named("TANGENT".into()), true),
            _ => return unsupported("tangent"),
        },
        AttributeName::Tangent => {
            diagnostics
                .warning("exporting three-component mesh tangents as a custom _TANGENT3 attribute");
            (Base::Named("_TANGENT3".into()), false)
        }
        AttributeName::Bitangent => {
            diagnostics
                .warning("exporting separate mesh bitangents as a custom _BITANGENT attribute");
            (Base::Named("_BITANGENT".into()), false)
        }
        AttributeName::TextureCoordinates => match (component, count, normalized) {
            (F32, 2, false) | (U8 | U16, 2, true) => (Base::Numbered("TEXCOORD"), false),
            (I8 | I16, 2, _) | (U8 | U16, 2, false) => (Base::Numbered("TEXCOORD"), true),
            _ => return unsupported("texture coordinate"),
        },
        AttributeName::Color => match (component, count, normalized) {
            (F32, 3 | 4, false) | (U8 | U16, 3 | 4, true) => (Base::Numbered("COLOR"), false),
            _ => return unsupported("color"),
        },
        AttributeName::JointIds => match (component, joint_count(attribute), normalized) {
            (U8 | U16, 4, false) => (Base::Numbered("JOINTS"), false),
            (U32, 4, false) => {
                config.strict_check(
                    diagnostics,
                    &format!("mesh attributes with {} are not valid glTF", format),
                    "strict mode disabled, allowing 32-bit integer joint IDs",
                )?;
                (Base::Numbered("JOINTS"), false)
            }
            _ => return unsupported("joint ID"),
        },
        AttributeName::Weights => match (component, joint_count(attribute), normalized) {
            (F32, 4, false) | (U8 | U16, 4, true) => (Base::Numbered("WEIGHTS"), false),
            _ => return unsupported("weight"),
        },
        AttributeName::ObjectId => (Base::Named(config.object_id_attribute.clone()), false),
        AttributeName::Custom(id) => match attribute_names.get(&id) {
            Some(name) => (Base::Named(name.clone()), false),
            None => {
                let name = format!("_{}", id);
                diagnostics.warning(format!(
                    "no name set for custom mesh attribute {}, exporting as {}",
                    id, name
                ));
                (Base::Named(name), false)
            }
        },
    })
}

/// The number of components per glTF element of a joint or weight
/// attribute. Arrays are exported in groups of four.
fn joint_count(attribute: &MeshAttribute) -> u8 {
    match attribute.format {
        VertexFormat::Vector { count: 1, .. }
            if attribute.array_size != 0 && attribute.array_size % 4 == 0 =>
        {
            4
        }
        VertexFormat::Vector { count, .. } if attribute.array_size == 0 => count,
        _ => 0,
    }
}

fn texture_coordinate_flip(
    config: &GltfConfig,
    diagnostics: &mut Diagnostics,
    format: &VertexFormat,
) -> Result<Option<Flip>> {
    if config.texture_coordinate_y_flip_in_material {
        return Ok(None);
    }

    match *format {
        VertexFormat::Vector {
            component: ComponentFormat::F32,
            ..
        } => Ok(Some(Flip::Float)),
        VertexFormat::Vector {
            component: ComponentFormat::U8,
            normalized: true,
            ..
        } => Ok(Some(Flip::UnsignedByte)),
        VertexFormat::Vector {
            component: ComponentFormat::U16,
            normalized: true,
            ..
        } => Ok(Some(Flip::UnsignedShort)),
        _ => {
            config.strict_check(
                diagnostics,
                &format!(
                    "texture coordinates with {} can't be flipped in the vertex data \
                     without textureCoordinateYFlipInMaterial",
                    format
                ),
                &format!(
                    "strict mode disabled, exporting texture coordinates with {} without a Y flip",
                    format
                ),
            )?;
            Ok(None)
        }
    }
}

/// Splits an attribute into the elements of its glTF accessors, as pairs of
/// the element format and the source offset of the first element.
fn split(attribute: &MeshAttribute) -> Result<Vec<(VertexFormat, usize)>> {
    if attribute.array_size == 0 {
        return Ok(vec![(attribute.format, attribute.offset)]);
    }

    match (attribute.name, attribute.format) {
        (
            AttributeName::JointIds | AttributeName::Weights,
            VertexFormat::Vector {
                component,
                count: 1,
                normalized,
            },
        ) if attribute.array_size % 4 == 0 => {
            let element = VertexFormat::Vector {
                component,
                count: 4,
                normalized,
            };
            (0..usize::from(attribute.array_size / 4))
                .map(|set| {
                    let offset = attribute.offset.checked_add(set * element.size())?;
                    Some((element, offset))
                })
                .collect::<Option<_>>()
                .ok_or_else(|| {
                    ConvertError::Mesh(format!(
                        "mesh attribute {:?} spans more bytes than can be addressed",
                        attribute.name
                    ))
                })
        }
        _ => Err(ConvertError::UnsupportedArraySize(attribute.array_size)),
    }
}

#[allow(clippy::too_many_arguments)]
fn resolve(
    config: &GltfConfig,
    diagnostics: &mut Diagnostics,
    mesh: &Mesh,
    attribute: &MeshAttribute,
    name: String,
    format: VertexFormat,
    offset: usize,
    flip: Option<Flip>,
) -> Result<Resolved> {
    let accessor_type = accessor_type(&format).ok_or_else(|| {
        ConvertError::Mesh(format!("unrepresentable mesh vertex format {}", format))
    })?;

    if format.vector_count() != 1 && format.vector_stride() % 4 != 0 {
        return Err(ConvertError::UnalignedMatrix(format));
    }

    let component = format.component().unwrap_or(ComponentFormat::F64);
    let component_type = component_type(component).ok_or_else(|| {
        ConvertError::Mesh(format!("unrepresentable mesh vertex format {}", format))
    })?;
    // Joint IDs were checked already, with a more specific message.
    if component == ComponentFormat::U32 && attribute.name != AttributeName::JointIds {
        config.strict_check(
            diagnostics,
            &format!("mesh attributes with {} are not valid glTF", format),
            &format!(
                "strict mode disabled, allowing a 32-bit integer attribute {}",
                name
            ),
        )?;
    }

    if attribute.stride <= 0 {
        return Err(ConvertError::InvalidStride(attribute.stride));
    }

    Ok(Resolved {
        bounds: attribute.name == AttributeName::Position,
        span: AttributeSpan {
            offset,
            stride: attribute.stride as usize,
            size: format.size(),
            component_size: component.size(),
            count: mesh.vertex_count,
        },
        name,
        format,
        accessor_type,
        component_type,
        flip,
    })
}
