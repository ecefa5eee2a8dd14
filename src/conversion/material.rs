use std::fmt;

use glam::{Mat3, Vec2, Vec3, Vec4};

/// Name of the layer holding clear coat attributes.
pub const CLEAR_COAT_LAYER: &str = "ClearCoat";

/// Represents a layered material. The first layer holds the base attributes,
/// every following layer describes an optional feature (such as a clear coat)
/// on top of it.
///
/// Attributes are an open set of named, dynamically typed values. Exporters
/// pick the ones they understand and report the rest as unused.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    /// The material is unlit, only its base color is meaningful.
    pub flat: bool,
    /// There is always at least the base layer.
    pub layers: Vec<MaterialLayer>,
}

impl Material {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            flat: false,
            layers: vec![MaterialLayer::default()],
        }
    }

    /// Adds an attribute to the base layer.
    pub fn with(mut self, name: &str, value: MaterialValue) -> Self {
        if self.layers.is_empty() {
            self.layers.push(MaterialLayer::default());
        }
        self.layers[0].attributes.push(MaterialAttribute::new(name, value));
        self
    }

    pub fn with_layer(mut self, layer: MaterialLayer) -> Self {
        if self.layers.is_empty() {
            self.layers.push(MaterialLayer::default());
        }
        self.layers.push(layer);
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialLayer {
    /// The name identifying the feature the layer describes. The base layer
    /// has no name.
    pub name: Option<String>,
    pub attributes: Vec<MaterialAttribute>,
}

impl MaterialLayer {
    pub fn new(name: &str) -> Self {
        Self {
            name: Some(name.into()),
            attributes: Vec::new(),
        }
    }

    pub fn with(mut self, name: &str, value: MaterialValue) -> Self {
        self.attributes.push(MaterialAttribute::new(name, value));
        self
    }

    /// Returns the index of the first attribute with given name.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.attributes
            .iter()
            .position(|attribute| attribute.name == name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MaterialAttribute {
    pub name: String,
    pub value: MaterialValue,
}

impl MaterialAttribute {
    pub fn new(name: &str, value: MaterialValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A dynamically typed material attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum MaterialValue {
    Bool(bool),
    Float(f32),
    Int(i32),
    UnsignedInt(u32),
    Vector2(Vec2),
    Vector3(Vec3),
    Vector4(Vec4),
    Matrix3x3(Mat3),
    String(String),
    /// An index into the textures added to the exporter.
    Texture(u32),
    TextureSwizzle(TextureSwizzle),
}

impl MaterialValue {
    pub fn value_type(&self) -> MaterialValueType {
        match self {
            Self::Bool(_) => MaterialValueType::Bool,
            Self::Float(_) => MaterialValueType::Float,
            Self::Int(_) => MaterialValueType::Int,
            Self::UnsignedInt(_) => MaterialValueType::UnsignedInt,
            Self::Vector2(_) => MaterialValueType::Vector2,
            Self::Vector3(_) => MaterialValueType::Vector3,
            Self::Vector4(_) => MaterialValueType::Vector4,
            Self::Matrix3x3(_) => MaterialValueType::Matrix3x3,
            Self::String(_) => MaterialValueType::String,
            Self::Texture(_) => MaterialValueType::Texture,
            Self::TextureSwizzle(_) => MaterialValueType::TextureSwizzle,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaterialValueType {
    Bool,
    Float,
    Int,
    UnsignedInt,
    Vector2,
    Vector3,
    Vector4,
    Matrix3x3,
    String,
    Texture,
    TextureSwizzle,
}

impl fmt::Display for MaterialValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Describes which channels of a texture a material property reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureSwizzle {
    R,
    G,
    B,
    A,
    RG,
    GB,
    GA,
    BA,
    RGB,
    GBA,
    RGBA,
}

impl fmt::Display for TextureSwizzle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
