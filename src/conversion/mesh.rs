use std::fmt;

/// Represents the geometry of a mesh. All attributes live in a single vertex
/// blob and are described by an offset and a stride into it, which allows both
/// interleaved and separate (planar) layouts.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    /// The name of the mesh.
    pub name: String,
    pub primitive: MeshPrimitive,
    /// The vertex blob referenced by [`MeshAttribute`] offsets.
    pub vertex_data: Vec<u8>,
    /// The number of vertices, shared by all attributes.
    pub vertex_count: usize,
    pub attributes: Vec<MeshAttribute>,
    /// The index blob referenced by [`MeshIndices`].
    pub index_data: Vec<u8>,
    pub indices: Option<MeshIndices>,
}

impl Mesh {
    pub fn new(primitive: MeshPrimitive) -> Self {
        Self {
            name: String::new(),
            primitive,
            vertex_data: Vec::new(),
            vertex_count: 0,
            attributes: Vec::new(),
            index_data: Vec::new(),
            indices: None,
        }
    }

    /// Returns the index of the attribute among the attributes with the same name.
    pub fn attribute_id(&self, index: usize) -> usize {
        let name = self.attributes[index].name;
        self.attributes[..index]
            .iter()
            .filter(|attribute| attribute.name == name)
            .count()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshPrimitive {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
    Instances,
    Faces,
    Edges,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshIndexType {
    U8,
    U16,
    U32,
}

impl MeshIndexType {
    pub fn size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

/// Describes the index buffer of a [`Mesh`] inside its index blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshIndices {
    pub index_type: MeshIndexType,
    pub offset: usize,
    pub count: usize,
    /// The distance between two consecutive indices. Only tightly packed
    /// indices can be exported.
    pub stride: isize,
}

impl MeshIndices {
    pub fn contiguous(index_type: MeshIndexType, offset: usize, count: usize) -> Self {
        Self {
            index_type,
            offset,
            count,
            stride: index_type.size() as isize,
        }
    }
}

/// The semantic of a mesh attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeName {
    Position,
    Normal,
    Tangent,
    Bitangent,
    TextureCoordinates,
    Color,
    JointIds,
    Weights,
    ObjectId,
    /// An application-specific attribute. Its exported name is set on the
    /// converter, otherwise it's derived from the ID.
    Custom(u16),
}

/// Represents a single attribute stream of a [`Mesh`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshAttribute {
    pub name: AttributeName,
    pub format: VertexFormat,
    /// The offset of the first element in the vertex blob.
    pub offset: usize,
    /// The distance between two consecutive elements.
    pub stride: isize,
    /// Non-zero for array attributes, such as joint IDs and weights, where each
    /// vertex stores `array_size` elements of `format`.
    pub array_size: u16,
}

impl MeshAttribute {
    pub fn new(name: AttributeName, format: VertexFormat, offset: usize, stride: isize) -> Self {
        Self {
            name,
            format,
            offset,
            stride,
            array_size: 0,
        }
    }

    pub fn with_array_size(mut self, array_size: u16) -> Self {
        self.array_size = array_size;
        self
    }

    /// The size of one element, including all array items.
    pub fn size(&self) -> usize {
        self.format.size() * usize::from(self.array_size.max(1))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentFormat {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F16,
    F32,
    F64,
}

impl ComponentFormat {
    pub fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 | Self::F16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }
}

/// The numeric format of a vertex attribute element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexFormat {
    Vector {
        component: ComponentFormat,
        count: u8,
        normalized: bool,
    },
    /// Column-major matrix. When `aligned` is set, each column is padded to
    /// four bytes.
    Matrix {
        component: ComponentFormat,
        columns: u8,
        rows: u8,
        normalized: bool,
        aligned: bool,
    },
    /// An opaque format only meaningful to a particular GPU API.
    ImplementationSpecific(u32),
}

impl VertexFormat {
    pub const fn vector(component: ComponentFormat, count: u8) -> Self {
        Self::Vector {
            component,
            count,
            normalized: false,
        }
    }

    pub const fn normalized(component: ComponentFormat, count: u8) -> Self {
        Self::Vector {
            component,
            count,
            normalized: true,
        }
    }

    pub const fn matrix(component: ComponentFormat, columns: u8, rows: u8, aligned: bool) -> Self {
        Self::Matrix {
            component,
            columns,
            rows,
            normalized: component.is_integral(),
            aligned,
        }
    }

    pub fn component(&self) -> Option<ComponentFormat> {
        match *self {
            Self::Vector { component, .. } | Self::Matrix { component, .. } => Some(component),
            Self::ImplementationSpecific(_) => None,
        }
    }

    /// The number of components in one vector (or one matrix column).
    pub fn component_count(&self) -> usize {
        match *self {
            Self::Vector { count, .. } => count.into(),
            Self::Matrix { rows, .. } => rows.into(),
            Self::ImplementationSpecific(_) => 0,
        }
    }

    /// The number of vectors, which is the column count for matrices.
    pub fn vector_count(&self) -> usize {
        match *self {
            Self::Vector { .. } => 1,
            Self::Matrix { columns, .. } => columns.into(),
            Self::ImplementationSpecific(_) => 0,
        }
    }

    pub fn is_normalized(&self) -> bool {
        match *self {
            Self::Vector { normalized, .. } | Self::Matrix { normalized, .. } => normalized,
            Self::ImplementationSpecific(_) => false,
        }
    }

    /// The size of one vector (matrix column), including alignment padding.
    pub fn vector_stride(&self) -> usize {
        match *self {
            Self::Vector { component, count, .. } => component.size() * usize::from(count),
            Self::Matrix {
                component,
                rows,
                aligned,
                ..
            } => {
                let size = component.size() * usize::from(rows);
                if aligned {
                    (size + 3) / 4 * 4
                } else {
                    size
                }
            }
            Self::ImplementationSpecific(_) => 0,
        }
    }

    pub fn size(&self) -> usize {
        self.vector_stride() * self.vector_count()
    }
}

impl ComponentFormat {
    const fn is_integral(self) -> bool {
        !matches!(self, Self::F16 | Self::F32 | Self::F64)
    }
}

impl fmt::Display for VertexFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Vector {
                component,
                count,
                normalized,
            } => {
                write!(f, "Vector{}<{:?}>", count, component)?;
                if normalized {
                    write!(f, " normalized")?;
                }
                Ok(())
            }
            Self::Matrix {
                component,
                columns,
                rows,
                normalized,
                aligned,
            } => {
                write!(f, "Matrix{}x{}<{:?}>", columns, rows, component)?;
                if normalized {
                    write!(f, " normalized")?;
                }
                if aligned {
                    write!(f, " aligned")?;
                }
                Ok(())
            }
            Self::ImplementationSpecific(value) => write!(f, "ImplementationSpecific({:#x})", value),
        }
    }
}
