pub use self::{
    gltf::{GltfExporter, GltfSceneConverter},
    png::PngImageConverter,
};

pub mod gltf;
pub mod png;
