use anyhow::{Context, Result};

use super::{config::GltfConfig, converter::GltfSceneConverter};
use crate::conversion::{Asset, Exporter, Scene};

/// Exports a whole scene at once into a single glTF file, or a text glTF and
/// its buffer.
#[derive(Default)]
pub struct GltfExporter {
    pub config: GltfConfig,
}

impl GltfExporter {
    pub fn new(config: GltfConfig) -> Self {
        Self { config }
    }
}

// https://www.khronos.org/registry/glTF/specs/2.0/glTF-2.0.html
impl Exporter for GltfExporter {
    fn export(&self, scene: &Scene) -> Result<Vec<Asset>> {
        let mut converter = GltfSceneConverter::new(self.config.clone());
        for (&id, name) in &scene.mesh_attribute_names {
            converter.set_mesh_attribute_name(id, name);
        }
        for (&id, name) in &scene.field_names {
            converter.set_scene_field_name(id, name);
        }

        let name = scene
            .meshes
            .first()
            .map(|mesh| mesh.name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or("model");
        let extension = if self.config.binary.unwrap_or(true) {
            "glb"
        } else {
            "gltf"
        };
        converter.begin_file(format!("{}.{}", name, extension));

        for (i, mesh) in scene.meshes.iter().enumerate() {
            converter
                .add_mesh(mesh)
                .with_context(|| format!("failed to export mesh {}", i))?;
        }
        for (i, image) in scene.images.iter().enumerate() {
            converter
                .add_image(image)
                .with_context(|| format!("failed to export image {}", i))?;
        }
        for (i, texture) in scene.textures.iter().enumerate() {
            converter
                .add_texture(texture)
                .with_context(|| format!("failed to export texture {}", i))?;
        }
        for (i, material) in scene.materials.iter().enumerate() {
            converter
                .add_material(material)
                .with_context(|| format!("failed to export material {}", i))?;
        }
        for (i, graph) in scene.graphs.iter().enumerate() {
            converter
                .add_scene(graph)
                .with_context(|| format!("failed to export scene {}", i))?;
        }

        Ok(converter.end_file()?)
    }
}
