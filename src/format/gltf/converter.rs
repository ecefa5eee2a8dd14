use std::{
    borrow::Cow,
    collections::HashMap,
    path::{Path, PathBuf},
};

use gltf::Glb;

use super::{
    config::GltfConfig,
    diagnostics::Diagnostics,
    document::{Checkpoint, Document},
    error::{ConvertError, Result},
    extensions::ExtensionSet,
    internal::{GltfAsset, GltfBuffer, GltfJson},
    material, mesh, scene, texture,
};
use crate::{
    conversion::{Asset, Image, ImageConverter, Material, Mesh, SceneGraph, Texture},
    format::png::PngImageConverter,
};

/// Where the document goes once it's finished.
#[derive(Debug)]
enum Output {
    File { path: PathBuf, binary: bool },
    Data { binary: bool },
}

#[derive(Debug)]
struct Conversion {
    document: Document,
    output: Output,
}

/// Assembles a glTF document incrementally.
///
/// A conversion is started with [`begin_file`](Self::begin_file) or
/// [`begin_data`](Self::begin_data), filled with `add_*` calls and finished
/// with [`end_file`](Self::end_file) or [`end_data`](Self::end_data). Assets
/// can only reference assets added before them. Every `add_*` call either
/// succeeds and returns the index of the new asset or fails and leaves the
/// document exactly as it was.
pub struct GltfSceneConverter {
    config: GltfConfig,
    image_converters: Vec<Box<dyn ImageConverter>>,
    mesh_attribute_names: HashMap<u16, String>,
    scene_field_names: HashMap<u32, String>,
    diagnostics: Diagnostics,
    conversion: Option<Conversion>,
}

impl GltfSceneConverter {
    pub fn new(config: GltfConfig) -> Self {
        let diagnostics = Diagnostics::new(config.quiet, config.verbose);
        Self {
            config,
            image_converters: vec![Box::new(PngImageConverter)],
            mesh_attribute_names: HashMap::new(),
            scene_field_names: HashMap::new(),
            diagnostics,
            conversion: None,
        }
    }

    /// Makes an image converter available. It takes precedence over an
    /// already available converter of the same name.
    pub fn with_image_converter(mut self, converter: impl ImageConverter + 'static) -> Self {
        self.image_converters.insert(0, Box::new(converter));
        self
    }

    pub fn config(&self) -> &GltfConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn is_converting(&self) -> bool {
        self.conversion.is_some()
    }

    /// Names a custom mesh attribute. Has to be called before the meshes
    /// using it are added.
    pub fn set_mesh_attribute_name(&mut self, id: u16, name: &str) {
        self.mesh_attribute_names.insert(id, name.into());
    }

    /// Names a custom scene field. Has to be called before the scenes using
    /// it are added.
    pub fn set_scene_field_name(&mut self, id: u32, name: &str) {
        self.scene_field_names.insert(id, name.into());
    }

    /// Starts a conversion into a file. Unless configured otherwise, a
    /// `.gltf` extension produces a text glTF with an external buffer and
    /// anything else a binary glTF.
    pub fn begin_file(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let binary = self.config.binary.unwrap_or_else(|| {
            !path
                .extension()
                .map_or(false, |extension| extension.eq_ignore_ascii_case("gltf"))
        });
        self.begin(Output::File {
            path: path.into(),
            binary,
        });
    }

    /// Starts a conversion into memory, binary unless configured otherwise.
    pub fn begin_data(&mut self) {
        let binary = self.config.binary.unwrap_or(true);
        self.begin(Output::Data { binary });
    }

    fn begin(&mut self, output: Output) {
        if self.conversion.is_some() {
            log::debug!("discarding an unfinished conversion");
        }
        self.diagnostics.clear();
        let extensions = ExtensionSet::new(
            &self.config.extension_used,
            &self.config.extension_required,
        );
        self.conversion = Some(Conversion {
            document: Document::new(extensions),
            output,
        });
    }

    /// Discards the conversion in progress.
    pub fn abort(&mut self) {
        self.conversion = None;
    }

    pub fn add_mesh(&mut self, mesh: &Mesh) -> Result<u32> {
        let conversion = self.conversion.as_mut().ok_or(ConvertError::NotStarted)?;
        let document = &mut conversion.document;
        let id = document.meshes.len() as u32;
        let checkpoint = document.checkpoint();
        let result = mesh::add_mesh(
            document,
            &mut self.diagnostics,
            &self.config,
            &self.mesh_attribute_names,
            id,
            mesh,
        );
        commit(document, checkpoint, result).map(|()| id)
    }

    pub fn add_image(&mut self, image: &Image) -> Result<u32> {
        let conversion = self.conversion.as_mut().ok_or(ConvertError::NotStarted)?;
        let document = &mut conversion.document;
        let id = document.images.len() as u32;
        let checkpoint = document.checkpoint();
        let result = texture::add_image(
            document,
            &mut self.diagnostics,
            &self.config,
            &self.image_converters,
            image,
        );
        commit(document, checkpoint, result).map(|()| id)
    }

    pub fn add_texture(&mut self, texture: &Texture) -> Result<u32> {
        let conversion = self.conversion.as_mut().ok_or(ConvertError::NotStarted)?;
        let document = &mut conversion.document;
        let id = document.textures.len() as u32;
        let checkpoint = document.checkpoint();
        let result = texture::add_texture(document, &self.config, texture);
        commit(document, checkpoint, result).map(|()| id)
    }

    pub fn add_material(&mut self, material: &Material) -> Result<u32> {
        let conversion = self.conversion.as_mut().ok_or(ConvertError::NotStarted)?;
        let document = &mut conversion.document;
        let id = document.materials.len() as u32;
        let checkpoint = document.checkpoint();
        let result = material::add_material(document, &mut self.diagnostics, &self.config, material);
        commit(document, checkpoint, result).map(|()| id)
    }

    pub fn add_scene(&mut self, graph: &SceneGraph) -> Result<u32> {
        let conversion = self.conversion.as_mut().ok_or(ConvertError::NotStarted)?;
        let document = &mut conversion.document;
        let id = document.scenes.len() as u32;
        let checkpoint = document.checkpoint();
        let result = scene::add_scene(
            document,
            &mut self.diagnostics,
            &self.config,
            &self.scene_field_names,
            graph,
        );
        commit(document, checkpoint, result).map(|()| id)
    }

    /// Selects the scene a viewer shows first. Without it, the first added
    /// scene is the default.
    pub fn set_default_scene(&mut self, id: u32) -> Result<()> {
        let conversion = self.conversion.as_mut().ok_or(ConvertError::NotStarted)?;
        let document = &mut conversion.document;
        if id as usize >= document.scenes.len() {
            return Err(ConvertError::Document(format!(
                "scene {} out of range for {} scenes",
                id,
                document.scenes.len()
            )));
        }
        document.default_scene = Some(id);
        Ok(())
    }

    /// Finishes a conversion started with [`begin_file`](Self::begin_file).
    /// Text glTF files come with a `.bin` asset holding the buffer, if there
    /// is any data.
    pub fn end_file(&mut self) -> Result<Vec<Asset>> {
        let (path, binary) = match &self.conversion {
            Some(Conversion {
                output: Output::File { path, binary },
                ..
            }) => (path.clone(), *binary),
            Some(_) => {
                return Err(ConvertError::Document(String::from(
                    "the conversion was started with begin_data, use end_data",
                )))
            }
            None => return Err(ConvertError::NotStarted),
        };
        let document = self.take_document()?;

        if binary {
            let (json, buffer) = assemble(document, &self.config, None)?;
            return Ok(vec![Asset::new(glb(json, buffer)?, path)]);
        }

        let buffer_path = path.with_extension("bin");
        let uri = buffer_path
            .file_name()
            .and_then(|name| name.to_str())
            .map(String::from)
            .ok_or_else(|| {
                ConvertError::Document(format!("can't derive a buffer file name from {:?}", path))
            })?;
        let (json, buffer) = assemble(document, &self.config, Some(uri))?;

        let mut assets = vec![Asset::new(json.into_bytes(), path)];
        if !buffer.is_empty() {
            assets.push(Asset::new(buffer, buffer_path));
        }
        Ok(assets)
    }

    /// Finishes a conversion started with [`begin_data`](Self::begin_data).
    /// A text glTF can't reference an external buffer here, so it either has
    /// no data or the buffer is embedded if `embedBuffers` is enabled.
    pub fn end_data(&mut self) -> Result<Vec<u8>> {
        let binary = match &self.conversion {
            Some(Conversion {
                output: Output::Data { binary },
                ..
            }) => *binary,
            Some(_) => {
                return Err(ConvertError::Document(String::from(
                    "the conversion was started with begin_file, use end_file",
                )))
            }
            None => return Err(ConvertError::NotStarted),
        };
        let document = self.take_document()?;

        if binary {
            let (json, buffer) = assemble(document, &self.config, None)?;
            return glb(json, buffer);
        }

        if !document.buffer.is_empty() && !self.config.embed_buffers {
            return Err(ConvertError::Document(String::from(
                "a text glTF written to data can't reference an external buffer, \
                 enable embedBuffers or write to a file",
            )));
        }
        let uri = format!(
            "data:application/octet-stream;base64,{}",
            base64::encode(document.buffer.as_slice())
        );
        let (json, _) = assemble(document, &self.config, Some(uri))?;
        Ok(json.into_bytes())
    }

    fn take_document(&mut self) -> Result<Document> {
        self.conversion
            .take()
            .map(|conversion| conversion.document)
            .ok_or(ConvertError::NotStarted)
    }
}

fn commit(document: &mut Document, checkpoint: Checkpoint, result: Result<()>) -> Result<()> {
    if result.is_err() {
        document.rollback(checkpoint);
    }
    result
}

/// Serializes the document. `uri` is where the buffer lives for text glTF
/// files, binary files keep it in their binary chunk.
fn assemble(
    mut document: Document,
    config: &GltfConfig,
    uri: Option<String>,
) -> Result<(String, Vec<u8>)> {
    document.slots.add_unreferenced(&document.meshes);
    let gltf_meshes = document.gltf_meshes();

    document.buffer.align(4);
    let buffer = document.buffer.into_inner();
    let buffers = if buffer.is_empty() {
        Vec::new()
    } else {
        vec![GltfBuffer {
            uri,
            byte_length: buffer.len(),
        }]
    };

    let scene = match (document.default_scene, document.scenes.is_empty()) {
        (Some(scene), _) => Some(scene),
        (None, false) => Some(0),
        (None, true) => None,
    };

    let json = GltfJson {
        asset: GltfAsset {
            copyright: config.copyright.clone(),
            generator: config.generator.clone(),
            ..Default::default()
        },
        extensions_used: document.extensions.used().to_vec(),
        extensions_required: document.extensions.required().to_vec(),
        scene,
        scenes: document.scenes,
        nodes: document.nodes,
        meshes: gltf_meshes,
        materials: document.materials,
        textures: document.textures.into_iter().map(|record| record.gltf).collect(),
        samplers: document.samplers,
        images: document.images.into_iter().map(|record| record.gltf).collect(),
        accessors: document.accessors,
        buffer_views: document.buffer_views,
        buffers,
    };

    let json = serde_json::to_string(&json)
        .map_err(|error| ConvertError::Document(format!("can't serialize the document: {}", error)))?;
    Ok((json, buffer))
}

fn glb(json: String, buffer: Vec<u8>) -> Result<Vec<u8>> {
    const HEADER_SIZE: usize = 12;
    const CHUNK_HEADER_SIZE: usize = 8;

    let mut length = HEADER_SIZE + CHUNK_HEADER_SIZE + aligned(json.len());
    if !buffer.is_empty() {
        length += CHUNK_HEADER_SIZE + aligned(buffer.len());
    }

    Glb {
        header: gltf::binary::Header {
            magic: *b"glTF",
            version: 2,
            length: length as u32,
        },
        json: Cow::Owned(json.into_bytes()),
        bin: (!buffer.is_empty()).then(|| Cow::Owned(buffer)),
    }
    .to_vec()
    .map_err(|error| ConvertError::Document(format!("can't write the binary glTF: {}", error)))
}

fn aligned(length: usize) -> usize {
    (length + 3) & !3
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use super::*;
    use crate::conversion::{
        AttributeName, ComponentFormat, MaterialValue, MeshAttribute, MeshPrimitive, SceneField,
        SceneFieldData, SceneFieldName, VertexFormat,
    };

    fn triangle() -> Mesh {
        let mut mesh = Mesh::new(MeshPrimitive::Triangles);
        mesh.name = String::from("triangle");
        for value in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            mesh.vertex_data.extend_from_slice(&value.to_le_bytes());
        }
        mesh.vertex_count = 3;
        mesh.attributes.push(MeshAttribute::new(
            AttributeName::Position,
            VertexFormat::vector(ComponentFormat::F32, 3),
            0,
            12,
        ));
        mesh
    }

    fn parse(glb: &[u8]) -> (Value, Vec<u8>) {
        let glb = Glb::from_slice(glb).unwrap();
        let json = serde_json::from_slice(&glb.json).unwrap();
        (json, glb.bin.map(|bin| bin.into_owned()).unwrap_or_default())
    }

    #[test]
    fn not_started() {
        let mut converter = GltfSceneConverter::new(GltfConfig::default());
        assert_eq!(Err(ConvertError::NotStarted), converter.add_mesh(&triangle()));
        assert_eq!(Err(ConvertError::NotStarted), converter.end_data());
    }

    #[test]
    fn failed_adds_roll_back() {
        let mut converter = GltfSceneConverter::new(GltfConfig::default());
        converter.begin_data();
        assert_eq!(Ok(0), converter.add_mesh(&triangle()));

        let mut broken = triangle();
        broken.attributes.push(MeshAttribute::new(
            AttributeName::Normal,
            VertexFormat::vector(ComponentFormat::F32, 3),
            4,
            12,
        ));
        assert!(converter.add_mesh(&broken).is_err());

        let material = Material::new("").with("BaseColorTexture", MaterialValue::Texture(0));
        assert!(converter.add_material(&material).is_err());
        assert_eq!(Ok(0), converter.add_material(&Material::new("plain")));

        let (json, bin) = parse(&converter.end_data().unwrap());
        assert_eq!(36, bin.len());
        assert_eq!(json!([{ "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 }]), json["bufferViews"]);
        assert_eq!(json!([{ "name": "plain" }]), json["materials"]);
        assert_eq!(None, json.get("extensionsUsed"));
    }

    #[test]
    fn scenes_and_unreferenced_meshes() {
        let mut converter = GltfSceneConverter::new(GltfConfig::default());
        converter.begin_data();
        converter.add_mesh(&triangle()).unwrap();
        converter.add_mesh(&triangle()).unwrap();
        converter.add_material(&Material::new("red")).unwrap();

        let graph = SceneGraph::new(2)
            .with_field(SceneField::new(
                SceneFieldName::Parent,
                vec![0, 1],
                SceneFieldData::Int(vec![-1, 0]),
            ))
            .with_field(SceneField::new(
                SceneFieldName::Mesh,
                vec![0, 1],
                SceneFieldData::UnsignedInt(vec![1, 1]),
            ))
            .with_field(SceneField::new(
                SceneFieldName::MeshMaterial,
                vec![0, 1],
                SceneFieldData::Int(vec![0, 0]),
            ));
        assert_eq!(Ok(0), converter.add_scene(&graph));
        assert_eq!(Ok(1), converter.add_scene(&SceneGraph::new(0)));
        assert_eq!(
            Err(ConvertError::Document(String::from(
                "scene 2 out of range for 2 scenes"
            ))),
            converter.set_default_scene(2)
        );
        converter.set_default_scene(1).unwrap();

        let (json, _) = parse(&converter.end_data().unwrap());
        assert_eq!(json!(1), json["scene"]);
        assert_eq!(
            json!([{ "children": [1], "mesh": 0 }, { "mesh": 0 }]),
            json["nodes"]
        );
        assert_eq!(
            json!([
                {
                    "primitives": [{ "attributes": { "POSITION": 1 }, "material": 0 }],
                    "name": "triangle"
                },
                {
                    "primitives": [{ "attributes": { "POSITION": 0 } }],
                    "name": "triangle"
                }
            ]),
            json["meshes"]
        );
    }

    #[test]
    fn text_output() {
        let config = GltfConfig {
            generator: None,
            copyright: Some(String::from("nobody")),
            ..Default::default()
        };
        let mut converter = GltfSceneConverter::new(config.clone());
        converter.begin_file("out/triangle.gltf");
        converter.add_mesh(&triangle()).unwrap();
        let assets = converter.end_file().unwrap();
        assert_eq!(2, assets.len());
        assert_eq!(Path::new("out/triangle.bin"), assets[1].path());
        assert_eq!(36, assets[1].bytes.len());

        let json: Value = serde_json::from_slice(&assets[0].bytes).unwrap();
        assert_eq!(
            json!({ "version": "2.0", "copyright": "nobody" }),
            json["asset"]
        );
        assert_eq!(
            json!([{ "uri": "triangle.bin", "byteLength": 36 }]),
            json["buffers"]
        );

        let mut converter = GltfSceneConverter::new(GltfConfig {
            binary: Some(false),
            ..config.clone()
        });
        converter.begin_data();
        converter.add_mesh(&triangle()).unwrap();
        assert_eq!(
            Err(ConvertError::Document(String::from(
                "a text glTF written to data can't reference an external buffer, enable \
                 embedBuffers or write to a file"
            ))),
            converter.end_data()
        );
        assert!(!converter.is_converting());

        let mut converter = GltfSceneConverter::new(GltfConfig {
            binary: Some(false),
            embed_buffers: true,
            ..config
        });
        converter.begin_data();
        converter.add_mesh(&triangle()).unwrap();
        let json: Value = serde_json::from_slice(&converter.end_data().unwrap()).unwrap();
        let uri = json["buffers"][0]["uri"].as_str().unwrap();
        assert!(uri.starts_with("data:application/octet-stream;base64,"));
    }

    #[test]
    fn binary_length_is_aligned() {
        let mut converter = GltfSceneConverter::new(GltfConfig::default());
        converter.begin_file("triangle.glb");
        converter.add_mesh(&triangle()).unwrap();
        let assets = converter.end_file().unwrap();
        let bytes = &assets[0].bytes;
        assert_eq!(0, bytes.len() % 4);
        assert_eq!(
            bytes.len() as u32,
            u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]])
        );
        assert_eq!(
            Err(ConvertError::NotStarted),
            converter.end_file()
        );
    }
}
