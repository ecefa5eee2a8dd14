use anyhow::Result;

pub use self::{
    asset::Asset,
    image::{
        CompressedPixelFormat, EncodedImage, Image, ImageConverter, ImageConverterFeatures,
        PixelFormat, SamplerFilter, SamplerMipmap, SamplerWrapping, Texture, TextureKind,
    },
    material::{
        Material, MaterialAttribute, MaterialLayer, MaterialValue, MaterialValueType,
        TextureSwizzle, CLEAR_COAT_LAYER,
    },
    mesh::{
        AttributeName, ComponentFormat, Mesh, MeshAttribute, MeshIndexType, MeshIndices,
        MeshPrimitive, VertexFormat,
    },
    scene::{Scene, SceneField, SceneFieldData, SceneFieldName, SceneGraph},
};

mod asset;
mod image;
mod material;
mod mesh;
mod scene;

/// Defines a type that can export a scene into asset files.
pub trait Exporter {
    /// Exports a scene into one or more asset files.
    fn export(&self, scene: &Scene) -> Result<Vec<Asset>>;
}
