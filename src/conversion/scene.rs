use std::collections::{BTreeMap, HashMap};

use glam::{Mat4, Quat, Vec3};

use super::{Image, Material, Mesh, Texture};

/// Represents a complete set of assets to be exported. It's the intermediary
/// format between the application and the exporters.
///
/// Textures reference images, materials reference textures and scene graphs
/// reference meshes and materials, always by index into the lists below.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub meshes: Vec<Mesh>,
    pub images: Vec<Image>,
    pub textures: Vec<Texture>,
    pub materials: Vec<Material>,
    pub graphs: Vec<SceneGraph>,
    /// Names of [`AttributeName::Custom`](super::AttributeName::Custom) mesh attributes.
    pub mesh_attribute_names: HashMap<u16, String>,
    /// Names of [`SceneFieldName::Custom`] fields.
    pub field_names: HashMap<u32, String>,
}

/// Represents a node hierarchy over a sparse object ID space.
///
/// Every piece of per-object data is a separate [`SceneField`] mapping object
/// IDs to values. The hierarchy itself is the [`SceneFieldName::Parent`] field,
/// where a parent of `-1` denotes a root.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneGraph {
    pub name: String,
    /// The upper bound of object IDs referenced by the fields.
    pub object_count: u64,
    pub fields: Vec<SceneField>,
    /// Optional object names, exported as node names.
    pub object_names: BTreeMap<u64, String>,
}

impl SceneGraph {
    pub fn new(object_count: u64) -> Self {
        Self {
            object_count,
            ..Default::default()
        }
    }

    pub fn with_field(mut self, field: SceneField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_object_name(mut self, object: u64, name: &str) -> Self {
        self.object_names.insert(object, name.into());
        self
    }

    pub fn field(&self, name: SceneFieldName) -> Option<&SceneField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SceneFieldName {
    /// Parent object ID, `-1` for roots. Expects [`SceneFieldData::Int`].
    Parent,
    /// Expects [`SceneFieldData::Matrix4`].
    Transformation,
    /// Expects [`SceneFieldData::Vector3`].
    Translation,
    /// Expects [`SceneFieldData::Quaternion`].
    Rotation,
    /// Expects [`SceneFieldData::Vector3`].
    Scaling,
    /// Mesh index. Expects [`SceneFieldData::UnsignedInt`].
    Mesh,
    /// Material index paired with the [`SceneFieldName::Mesh`] entry at the
    /// same position, `-1` for none. Expects [`SceneFieldData::Int`].
    MeshMaterial,
    Camera,
    Light,
    Skin,
    ImporterState,
    Custom(u32),
}

/// A single stream of per-object data. Entry `i` of `data` belongs to object
/// `mapping[i]`.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneField {
    pub name: SceneFieldName,
    pub mapping: Vec<u64>,
    pub data: SceneFieldData,
    /// An object may have more than one entry in this field.
    pub multi_entry: bool,
}

impl SceneField {
    pub fn new(name: SceneFieldName, mapping: Vec<u64>, data: SceneFieldData) -> Self {
        Self {
            name,
            mapping,
            data,
            multi_entry: matches!(name, SceneFieldName::Mesh | SceneFieldName::MeshMaterial),
        }
    }

    pub fn multi_entry(mut self) -> Self {
        self.multi_entry = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SceneFieldData {
    Int(Vec<i64>),
    UnsignedInt(Vec<u32>),
    Float(Vec<f32>),
    Bool(Vec<bool>),
    String(Vec<String>),
    Vector3(Vec<Vec3>),
    Quaternion(Vec<Quat>),
    Matrix4(Vec<Mat4>),
    IntArray(Vec<Vec<i64>>),
    UnsignedIntArray(Vec<Vec<u32>>),
    FloatArray(Vec<Vec<f32>>),
}

impl SceneFieldData {
    pub fn len(&self) -> usize {
        match self {
            Self::Int(data) => data.len(),
            Self::UnsignedInt(data) => data.len(),
            Self::Float(data) => data.len(),
            Self::Bool(data) => data.len(),
            Self::String(data) => data.len(),
            Self::Vector3(data) => data.len(),
            Self::Quaternion(data) => data.len(),
            Self::Matrix4(data) => data.len(),
            Self::IntArray(data) => data.len(),
            Self::UnsignedIntArray(data) => data.len(),
            Self::FloatArray(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "Int",
            Self::UnsignedInt(_) => "UnsignedInt",
            Self::Float(_) => "Float",
            Self::Bool(_) => "Bool",
            Self::String(_) => "String",
            Self::Vector3(_) => "Vector3",
            Self::Quaternion(_) => "Quaternion",
            Self::Matrix4(_) => "Matrix4",
            Self::IntArray(_) => "IntArray",
            Self::UnsignedIntArray(_) => "UnsignedIntArray",
            Self::FloatArray(_) => "FloatArray",
        }
    }
}
