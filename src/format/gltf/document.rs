use super::{
    buffer::BufferAllocator,
    extensions::ExtensionSet,
    internal::{
        GltfAccessor, GltfBufferView, GltfImage, GltfMaterial, GltfMesh, GltfNode,
        GltfPrimitive, GltfSampler, GltfScene, GltfTexture,
    },
    scene::MeshSlots,
};

/// A mesh as added, before it's bound to materials by a scene.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshRecord {
    pub name: String,
    pub primitive: GltfPrimitive,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImageRecord {
    pub gltf: GltfImage,
    /// The texture extension the image has to be referenced through, if any.
    pub extension: Option<&'static str>,
    pub layer_count: u32,
    pub array: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextureRecord {
    pub gltf: GltfTexture,
    pub layer_count: u32,
}

/// Everything written so far. All collections only grow, so a failed
/// operation is undone by truncating them back to a [`Checkpoint`].
#[derive(Debug, Default)]
pub struct Document {
    pub buffer: BufferAllocator,
    pub extensions: ExtensionSet,
    pub buffer_views: Vec<GltfBufferView>,
    pub accessors: Vec<GltfAccessor>,
    pub meshes: Vec<MeshRecord>,
    pub images: Vec<ImageRecord>,
    pub samplers: Vec<GltfSampler>,
    pub textures: Vec<TextureRecord>,
    pub materials: Vec<GltfMaterial>,
    pub nodes: Vec<GltfNode>,
    pub scenes: Vec<GltfScene>,
    pub slots: MeshSlots,
    pub default_scene: Option<u32>,
}

/// Lengths of every collection of a [`Document`] at some point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    buffer: usize,
    extensions: (usize, usize),
    buffer_views: usize,
    accessors: usize,
    meshes: usize,
    images: usize,
    samplers: usize,
    textures: usize,
    materials: usize,
    nodes: usize,
    scenes: usize,
    slots: usize,
}

impl Document {
    pub fn new(extensions: ExtensionSet) -> Self {
        Self {
            extensions,
            ..Default::default()
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            buffer: self.buffer.len(),
            extensions: self.extensions.lengths(),
            buffer_views: self.buffer_views.len(),
            accessors: self.accessors.len(),
            meshes: self.meshes.len(),
            images: self.images.len(),
            samplers: self.samplers.len(),
            textures: self.textures.len(),
            materials: self.materials.len(),
            nodes: self.nodes.len(),
            scenes: self.scenes.len(),
            slots: self.slots.len(),
        }
    }

    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.buffer.truncate(checkpoint.buffer);
        self.extensions.truncate(checkpoint.extensions);
        self.buffer_views.truncate(checkpoint.buffer_views);
        self.accessors.truncate(checkpoint.accessors);
        self.meshes.truncate(checkpoint.meshes);
        self.images.truncate(checkpoint.images);
        self.samplers.truncate(checkpoint.samplers);
        self.textures.truncate(checkpoint.textures);
        self.materials.truncate(checkpoint.materials);
        self.nodes.truncate(checkpoint.nodes);
        self.scenes.truncate(checkpoint.scenes);
        self.slots.truncate(checkpoint.slots);
    }

    /// Builds the glTF meshes, one per slot, with one primitive per
    /// (mesh, material) pair of the slot.
    pub fn gltf_meshes(&self) -> Vec<GltfMesh> {
        self.slots
            .iter()
            .map(|(key, name)| GltfMesh {
                primitives: key
                    .iter()
                    .map(|&(mesh, material)| {
                        let mut primitive = self.meshes[mesh as usize].primitive.clone();
                        primitive.material = material;
                        primitive
                    })
                    .collect(),
                name: name.map(String::from),
            })
            .collect()
    }
}
