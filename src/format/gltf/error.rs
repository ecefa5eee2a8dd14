use thiserror::Error;

use crate::conversion::{MeshPrimitive, VertexFormat};

pub type Result<T, E = ConvertError> = std::result::Result<T, E>;

/// A hard failure of a converter operation. The operation that returned it
/// left the document exactly as it was before the call.
#[derive(Debug, Error, PartialEq)]
pub enum ConvertError {
    #[error("no conversion in progress")]
    NotStarted,

    #[error("unsupported mesh primitive {0:?}")]
    UnsupportedPrimitive(MeshPrimitive),

    #[error("non-contiguous mesh index arrays are not supported")]
    NonContiguousIndices,

    #[error("unsupported mesh attribute with stride {0}")]
    InvalidStride(isize),

    #[error("unsupported mesh attribute with array size {0}")]
    UnsupportedArraySize(u16),

    #[error("mesh matrix attributes are required to be four-byte-aligned but got {0}")]
    UnalignedMatrix(VertexFormat),

    #[error("implementation-specific vertex format {0:#x} can't be exported")]
    ImplementationSpecificFormat(u32),

    /// The input is valid but not strictly valid glTF.
    #[error("{0}, set strict=false to allow them")]
    Strict(String),

    #[error("{0}")]
    Mesh(String),

    #[error("{0}")]
    Image(String),

    #[error("{0}")]
    Texture(String),

    #[error("{0}")]
    Material(String),

    #[error("{0}")]
    Scene(String),

    #[error("{0}")]
    Document(String),
}
