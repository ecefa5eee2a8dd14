use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use glam::{Mat4, Quat, Vec3};
use serde_json::{Map, Value};

use super::{
    config::GltfConfig,
    diagnostics::Diagnostics,
    document::{Document, MeshRecord},
    error::{ConvertError, Result},
    internal::{GltfNode, GltfScene},
};
use crate::conversion::{SceneField, SceneFieldData, SceneFieldName, SceneGraph};

const EPSILON: f32 = 1.0e-6;

/// A (mesh, material) pair, the unit a glTF primitive is made of.
pub type MeshAssignment = (u32, Option<u32>);

/// glTF meshes made of the distinct combinations of (mesh, material) pairs
/// objects reference, in first-seen order.
#[derive(Debug, Default)]
pub struct MeshSlots {
    keys: Vec<Vec<MeshAssignment>>,
    names: Vec<Option<String>>,
}

impl MeshSlots {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the slot of the given combination, adding it if it wasn't seen
    /// yet. A slot keeps its name only as long as every occurrence agrees on
    /// it.
    pub fn assign(&mut self, key: Vec<MeshAssignment>, name: Option<String>) -> u32 {
        match self.keys.iter().position(|other| *other == key) {
            Some(slot) => {
                if self.names[slot] != name {
                    self.names[slot] = None;
                }
                slot as u32
            }
            None => {
                self.keys.push(key);
                self.names.push(name);
                (self.keys.len() - 1) as u32
            }
        }
    }

    /// Adds a material-less slot for every mesh no scene referenced, so every
    /// added mesh ends up in the file.
    pub fn add_unreferenced(&mut self, meshes: &[MeshRecord]) {
        let referenced: HashSet<u32> = self
            .keys
            .iter()
            .flatten()
            .map(|&(mesh, _)| mesh)
            .collect();
        for (index, mesh) in meshes.iter().enumerate() {
            let index = index as u32;
            if !referenced.contains(&index) {
                self.keys.push(vec![(index, None)]);
                self.names.push(mesh_name(mesh));
            }
        }
    }

    pub fn truncate(&mut self, length: usize) {
        self.keys.truncate(length);
        self.names.truncate(length);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[MeshAssignment], Option<&str>)> {
        self.keys
            .iter()
            .zip(&self.names)
            .map(|(key, name)| (key.as_slice(), name.as_deref()))
    }
}

fn mesh_name(mesh: &MeshRecord) -> Option<String> {
    (!mesh.name.is_empty()).then(|| mesh.name.clone())
}

/// Everything collected for a single object before it becomes a node.
#[derive(Debug, Default)]
struct ObjectData {
    matrix: Option<Mat4>,
    translation: Option<Vec3>,
    rotation: Option<Quat>,
    scaling: Option<Vec3>,
    meshes: Vec<MeshAssignment>,
    extras: Map<String, Value>,
}

/// The `Parent` field as a tree. Objects keep the order of their entries.
#[derive(Debug, Default)]
struct Hierarchy {
    parents: HashMap<u64, Option<u64>>,
    order: Vec<u64>,
}

/// Linearizes a scene graph into nodes appended to the document, breadth
/// first from the roots, and adds a scene referencing the roots.
pub fn add_scene(
    document: &mut Document,
    diagnostics: &mut Diagnostics,
    config: &GltfConfig,
    field_names: &HashMap<u32, String>,
    graph: &SceneGraph,
) -> Result<()> {
    for field in &graph.fields {
        check_field(graph, field)?;
    }

    let hierarchy = hierarchy(graph)?;
    check_cycles(&hierarchy)?;

    let mut roots = Vec::new();
    let mut children: HashMap<u64, Vec<u64>> = HashMap::new();
    for &object in &hierarchy.order {
        match hierarchy.parents[&object] {
            None => roots.push(object),
            Some(parent) => children.entry(parent).or_default().push(object),
        }
    }

    let mut linear = Vec::new();
    let mut queue: VecDeque<u64> = roots.iter().copied().collect();
    while let Some(object) = queue.pop_front() {
        linear.push(object);
        if let Some(children) = children.get(&object) {
            queue.extend(children);
        }
    }

    let base = document.nodes.len() as u32;
    let dense: HashMap<u64, u32> = linear
        .iter()
        .enumerate()
        .map(|(index, &object)| (object, base + index as u32))
        .collect();
    for &object in &hierarchy.order {
        if !dense.contains_key(&object) {
            diagnostics.warning(format!(
                "object {} is not reachable from a root and was not used",
                object
            ));
        }
    }

    let parentless: BTreeSet<u64> = graph
        .fields
        .iter()
        .filter(|field| {
            !matches!(
                field.name,
                SceneFieldName::Parent | SceneFieldName::ImporterState
            )
        })
        .flat_map(|field| &field.mapping)
        .copied()
        .filter(|object| !hierarchy.parents.contains_key(object))
        .collect();
    for object in parentless {
        diagnostics.warning(format!("parentless object {} was not used", object));
    }

    let mut objects: HashMap<u64, ObjectData> = linear
        .iter()
        .map(|&object| (object, ObjectData::default()))
        .collect();
    collect_meshes(document, graph, &mut objects)?;
    for field in &graph.fields {
        collect_field(diagnostics, field_names, field, &mut objects)?;
    }

    // Nothing below can fail, so slot names don't need to be rolled back.
    for &object in &linear {
        let data = objects.remove(&object).unwrap_or_default();
        let mut node = transformed_node(diagnostics, config, object, &data);
        node.name = graph.object_names.get(&object).cloned();
        node.children = children
            .get(&object)
            .map(|children| children.iter().map(|child| dense[child]).collect())
            .unwrap_or_default();
        if !data.meshes.is_empty() {
            let name = slot_name(&document.meshes, &data.meshes);
            node.mesh = Some(document.slots.assign(data.meshes, name));
        }
        node.extras = (!data.extras.is_empty()).then(|| data.extras);
        document.nodes.push(node);
    }

    document.scenes.push(GltfScene {
        name: (!graph.name.is_empty()).then(|| graph.name.clone()),
        nodes: roots.iter().map(|root| dense[root]).collect(),
    });
    Ok(())
}

/// Creates a node with the transformation of an object. TRS components take
/// precedence over a matrix.
fn transformed_node(
    diagnostics: &mut Diagnostics,
    config: &GltfConfig,
    object: u64,
    transform: &ObjectData,
) -> GltfNode {
    let keep = config.keep_defaults;
    let mut node = GltfNode::default();

    let has_trs =
        transform.translation.is_some() || transform.rotation.is_some() || transform.scaling.is_some();
    if has_trs {
        if transform.matrix.is_some() {
            diagnostics.warning(format!(
                "object {} has both a transformation matrix and TRS components, using TRS",
                object
            ));
        }
        node.translation = transform
            .translation
            .filter(|translation| keep || !translation.abs_diff_eq(Vec3::ZERO, EPSILON))
            .map(|translation| translation.to_array());
        node.rotation = transform
            .rotation
            .filter(|rotation| keep || !rotation.abs_diff_eq(Quat::IDENTITY, EPSILON))
            .map(|rotation| rotation.to_array());
        node.scale = transform
            .scaling
            .filter(|scaling| keep || !scaling.abs_diff_eq(Vec3::ONE, EPSILON))
            .map(|scaling| scaling.to_array());
    } else {
        node.matrix = transform
            .matrix
            .filter(|matrix| keep || !matrix.abs_diff_eq(Mat4::IDENTITY, EPSILON))
            .map(|matrix| matrix.to_cols_array());
    }

    node
}

/// Names a slot after its meshes if they all share one name.
fn slot_name(meshes: &[MeshRecord], key: &[MeshAssignment]) -> Option<String> {
    let mut names = key.iter().map(|&(mesh, _)| mesh_name(&meshes[mesh as usize]));
    let first = names.next()?;
    names.all(|name| name == first).then(|| first).flatten()
}

fn check_field(graph: &SceneGraph, field: &SceneField) -> Result<()> {
    if field.mapping.len() != field.data.len() {
        return Err(ConvertError::Scene(format!(
            "scene field {} has {} mapping entries but {} data entries",
            field_label(field),
            field.mapping.len(),
            field.data.len()
        )));
    }
    if let Some(&object) = field
        .mapping
        .iter()
        .find(|&&object| object >= graph.object_count)
    {
        return Err(ConvertError::Scene(format!(
            "scene field {} references object {} out of range for {} objects",
            field_label(field),
            object,
            graph.object_count
        )));
    }
    Ok(())
}

fn field_label(field: &SceneField) -> String {
    format!("{:?}", field.name)
}

fn type_mismatch(field: &SceneField, expected: &str) -> ConvertError {
    ConvertError::Scene(format!(
        "scene field {} is expected to be {} but got {}",
        field_label(field),
        expected,
        field.data.type_name()
    ))
}

fn hierarchy(graph: &SceneGraph) -> Result<Hierarchy> {
    let mut hierarchy = Hierarchy::default();
    let field = match graph.field(SceneFieldName::Parent) {
        Some(field) => field,
        None => return Ok(hierarchy),
    };
    let data = match &field.data {
        SceneFieldData::Int(data) => data,
        _ => return Err(type_mismatch(field, "Int")),
    };

    for (&object, &parent) in field.mapping.iter().zip(data) {
        let parent = match parent {
            -1 => None,
            parent if parent >= 0 && (parent as u64) < graph.object_count => Some(parent as u64),
            parent => {
                return Err(ConvertError::Scene(format!(
                    "parent {} of object {} out of range for {} objects",
                    parent, object, graph.object_count
                )))
            }
        };
        if hierarchy.parents.insert(object, parent).is_some() {
            return Err(ConvertError::Scene(format!(
                "object {} has more than one parent",
                object
            )));
        }
        hierarchy.order.push(object);
    }

    Ok(hierarchy)
}

/// Walks the parent chain of every object, remembering chains already known
/// to end in a root so each object is visited once.
fn check_cycles(hierarchy: &Hierarchy) -> Result<()> {
    let mut done = HashSet::new();
    for &start in &hierarchy.order {
        let mut chain = HashSet::new();
        let mut current = Some(start);
        while let Some(object) = current {
            if done.contains(&object) {
                break;
            }
            if !chain.insert(object) {
                return Err(ConvertError::Scene(format!(
                    "object {} is its own ancestor",
                    object
                )));
            }
            current = hierarchy.parents.get(&object).copied().flatten();
        }
        done.extend(chain);
    }
    Ok(())
}

fn collect_meshes(
    document: &Document,
    graph: &SceneGraph,
    objects: &mut HashMap<u64, ObjectData>,
) -> Result<()> {
    let field = match graph.field(SceneFieldName::Mesh) {
        Some(field) => field,
        None => {
            return match graph.field(SceneFieldName::MeshMaterial) {
                Some(_) => Err(ConvertError::Scene(String::from(
                    "scene field MeshMaterial has no corresponding Mesh field",
                ))),
                None => Ok(()),
            }
        }
    };
    let meshes = match &field.data {
        SceneFieldData::UnsignedInt(data) => data,
        _ => return Err(type_mismatch(field, "UnsignedInt")),
    };
    let materials = match graph.field(SceneFieldName::MeshMaterial) {
        None => None,
        Some(materials) if materials.mapping != field.mapping => {
            return Err(ConvertError::Scene(String::from(
                "scene field MeshMaterial isn't mapped to the same objects as the Mesh field",
            )))
        }
        Some(materials) => match &materials.data {
            SceneFieldData::Int(data) => Some(data),
            _ => return Err(type_mismatch(materials, "Int")),
        },
    };

    for (index, (&object, &mesh)) in field.mapping.iter().zip(meshes).enumerate() {
        if mesh as usize >= document.meshes.len() {
            return Err(ConvertError::Scene(format!(
                "mesh {} referenced by object {} out of range for {} meshes",
                mesh,
                object,
                document.meshes.len()
            )));
        }
        let material = match materials.map(|materials| materials[index]) {
            None | Some(-1) => None,
            Some(material) if material >= 0 && (material as usize) < document.materials.len() => {
                Some(material as u32)
            }
            Some(material) => {
                return Err(ConvertError::Scene(format!(
                    "material {} referenced by object {} out of range for {} materials",
                    material,
                    object,
                    document.materials.len()
                )))
            }
        };
        if let Some(data) = objects.get_mut(&object) {
            data.meshes.push((mesh, material));
        }
    }
    Ok(())
}

fn collect_field(
    diagnostics: &mut Diagnostics,
    field_names: &HashMap<u32, String>,
    field: &SceneField,
    objects: &mut HashMap<u64, ObjectData>,
) -> Result<()> {
    use SceneFieldData as Data;
    use SceneFieldName as Name;

    match (field.name, &field.data) {
        (Name::Parent | Name::Mesh | Name::MeshMaterial | Name::ImporterState, _) => {}
        (Name::Transformation, Data::Matrix4(data)) => {
            assign(diagnostics, field, data, objects, |object| &mut object.matrix)
        }
        (Name::Translation, Data::Vector3(data)) => {
            assign(diagnostics, field, data, objects, |object| &mut object.translation)
        }
        (Name::Rotation, Data::Quaternion(data)) => {
            assign(diagnostics, field, data, objects, |object| &mut object.rotation)
        }
        (Name::Scaling, Data::Vector3(data)) => {
            assign(diagnostics, field, data, objects, |object| &mut object.scaling)
        }
        (Name::Transformation, _) => return Err(type_mismatch(field, "Matrix4")),
        (Name::Translation | Name::Scaling, _) => return Err(type_mismatch(field, "Vector3")),
        (Name::Rotation, _) => return Err(type_mismatch(field, "Quaternion")),
        (Name::Camera | Name::Light | Name::Skin, _) => diagnostics.warning(format!(
            "scene field {} is not supported, skipping",
            field_label(field)
        )),
        (Name::Custom(id), data) => {
            let name = match field_names.get(&id) {
                Some(name) => name,
                None => {
                    diagnostics.warning(format!(
                        "no name set for custom scene field {}, skipping",
                        id
                    ));
                    return Ok(());
                }
            };
            let values = match custom_values(data) {
                Some(values) => values,
                None => {
                    diagnostics.warning(format!(
                        "custom scene field {} of type {} is not supported, skipping",
                        name,
                        data.type_name()
                    ));
                    return Ok(());
                }
            };
            for (&object, value) in field.mapping.iter().zip(values) {
                let extras = match objects.get_mut(&object) {
                    Some(data) => &mut data.extras,
                    None => continue,
                };
                if field.multi_entry {
                    let entries = extras
                        .entry(name.clone())
                        .or_insert_with(|| Value::Array(Vec::new()));
                    if let Value::Array(entries) = entries {
                        entries.push(value);
                    }
                } else if extras.contains_key(name) {
                    diagnostics.warning(format!(
                        "scene field {} has more than one entry for object {}, using the first",
                        name, object
                    ));
                } else {
                    extras.insert(name.clone(), value);
                }
            }
        }
    }
    Ok(())
}

/// Stores a single-valued field, keeping the first entry of every object.
fn assign<T: Copy>(
    diagnostics: &mut Diagnostics,
    field: &SceneField,
    data: &[T],
    objects: &mut HashMap<u64, ObjectData>,
    slot: impl Fn(&mut ObjectData) -> &mut Option<T>,
) {
    for (&object, &value) in field.mapping.iter().zip(data) {
        let slot = match objects.get_mut(&object) {
            Some(data) => slot(data),
            None => continue,
        };
        if slot.is_some() {
            diagnostics.warning(format!(
                "scene field {} has more than one entry for object {}, using the first",
                field_label(field),
                object
            ));
            continue;
        }
        *slot = Some(value);
    }
}

fn custom_values(data: &SceneFieldData) -> Option<Vec<Value>> {
    let values = match data {
        SceneFieldData::Int(data) => data.iter().map(|&value| Value::from(value)).collect(),
        SceneFieldData::UnsignedInt(data) => data.iter().map(|&value| Value::from(value)).collect(),
        SceneFieldData::Float(data) => data.iter().map(|&value| Value::from(value)).collect(),
        SceneFieldData::Bool(data) => data.iter().map(|&value| Value::from(value)).collect(),
        SceneFieldData::String(data) => data.iter().map(|value| Value::from(value.as_str())).collect(),
        SceneFieldData::IntArray(data) => data.iter().map(|value| Value::from(value.clone())).collect(),
        SceneFieldData::UnsignedIntArray(data) => {
            data.iter().map(|value| Value::from(value.clone())).collect()
        }
        SceneFieldData::FloatArray(data) => {
            data.iter().map(|value| Value::from(value.clone())).collect()
        }
        SceneFieldData::Vector3(_) | SceneFieldData::Quaternion(_) | SceneFieldData::Matrix4(_) => {
            return None
        }
    };
    Some(values)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::format::gltf::internal::{GltfMaterial, GltfPrimitive};

    fn document(meshes: &[&str], materials: usize) -> Document {
        let mut document = Document::default();
        for &name in meshes {
            document.meshes.push(MeshRecord {
                name: name.into(),
                primitive: GltfPrimitive::default(),
            });
        }
        document.materials = vec![GltfMaterial::default(); materials];
        document
    }

    fn parents(mapping: Vec<u64>, data: Vec<i64>) -> SceneField {
        SceneField::new(SceneFieldName::Parent, mapping, SceneFieldData::Int(data))
    }

    fn add(document: &mut Document, graph: &SceneGraph) -> (Result<()>, Vec<String>) {
        let mut diagnostics = Diagnostics::default();
        let mut field_names = HashMap::new();
        field_names.insert(7, String::from("tag"));
        let result = add_scene(
            document,
            &mut diagnostics,
            &GltfConfig::default(),
            &field_names,
            graph,
        );
        let warnings = diagnostics
            .warnings()
            .into_iter()
            .map(String::from)
            .collect();
        (result, warnings)
    }

    #[test]
    fn chain_with_parentless_object() {
        let graph = SceneGraph::new(5)
            .with_field(parents(vec![0, 1, 2, 3], vec![-1, 0, 1, 2]))
            .with_field(SceneField::new(
                SceneFieldName::Translation,
                vec![1, 4],
                SceneFieldData::Vector3(vec![Vec3::X, Vec3::Y]),
            ));

        let mut document = document(&[], 0);
        let (result, warnings) = add(&mut document, &graph);
        assert_eq!(Ok(()), result);
        assert_eq!(vec!["parentless object 4 was not used"], warnings);
        assert_eq!(
            vec![
                GltfNode {
                    children: vec![1],
                    ..Default::default()
                },
                GltfNode {
                    children: vec![2],
                    translation: Some([1.0, 0.0, 0.0]),
                    ..Default::default()
                },
                GltfNode {
                    children: vec![3],
                    ..Default::default()
                },
                GltfNode::default(),
            ],
            document.nodes
        );
        assert_eq!(
            vec![GltfScene {
                name: None,
                nodes: vec![0]
            }],
            document.scenes
        );
    }

    #[test]
    fn breadth_first_and_permutation_invariant() {
        let graph = |ids: [u64; 5]| {
            SceneGraph::new(100)
                .with_field(parents(
                    vec![ids[0], ids[1], ids[2], ids[3], ids[4]],
                    vec![-1, ids[0] as i64, ids[1] as i64, ids[0] as i64, -1],
                ))
                .with_field(SceneField::new(
                    SceneFieldName::Mesh,
                    vec![ids[2], ids[4], ids[4]],
                    SceneFieldData::UnsignedInt(vec![0, 0, 1]),
                ))
                .with_field(SceneField::new(
                    SceneFieldName::Scaling,
                    vec![ids[3]],
                    SceneFieldData::Vector3(vec![Vec3::splat(2.0)]),
                ))
        };

        let mut first = document(&["a", "b"], 0);
        let (result, warnings) = add(&mut first, &graph([0, 1, 2, 3, 4]));
        assert_eq!(Ok(()), result);
        assert!(warnings.is_empty());

        let mut second = document(&["a", "b"], 0);
        let (result, _) = add(&mut second, &graph([42, 7, 99, 3, 0]));
        assert_eq!(Ok(()), result);

        assert_eq!(first.nodes, second.nodes);
        assert_eq!(first.scenes, second.scenes);
        assert_eq!(vec![0, 1], first.scenes[0].nodes);
        // Roots first, then the children of the first root, then grandchildren.
        assert_eq!(vec![2, 3], first.nodes[0].children);
        assert_eq!(Some([2.0; 3]), first.nodes[3].scale);
        assert_eq!(vec![4], first.nodes[2].children);
        assert_eq!(Some(0), first.nodes[1].mesh);
        assert_eq!(Some(1), first.nodes[4].mesh);
        assert_eq!(
            vec![
                (&[(0, None), (1, None)][..], None),
                (&[(0, None)][..], Some("a")),
            ],
            first.slots.iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn invalid_hierarchies() {
        let mut document = document(&[], 0);

        let cycle = SceneGraph::new(3).with_field(parents(vec![0, 1, 2], vec![-1, 2, 1]));
        assert_eq!(
            Err(ConvertError::Scene(String::from("object 1 is its own ancestor"))),
            add(&mut document, &cycle).0
        );

        let own_parent = SceneGraph::new(1).with_field(parents(vec![0], vec![0]));
        assert_eq!(
            Err(ConvertError::Scene(String::from("object 0 is its own ancestor"))),
            add(&mut document, &own_parent).0
        );

        let two_parents = SceneGraph::new(3).with_field(parents(vec![0, 1, 1], vec![-1, 0, -1]));
        assert_eq!(
            Err(ConvertError::Scene(String::from(
                "object 1 has more than one parent"
            ))),
            add(&mut document, &two_parents).0
        );

        let out_of_range = SceneGraph::new(2).with_field(parents(vec![0, 1], vec![-1, 2]));
        assert_eq!(
            Err(ConvertError::Scene(String::from(
                "parent 2 of object 1 out of range for 2 objects"
            ))),
            add(&mut document, &out_of_range).0
        );

        let mapping = SceneGraph::new(2).with_field(parents(vec![0, 2], vec![-1, 0]));
        assert_eq!(
            Err(ConvertError::Scene(String::from(
                "scene field Parent references object 2 out of range for 2 objects"
            ))),
            add(&mut document, &mapping).0
        );

        let wrong_type = SceneGraph::new(1).with_field(SceneField::new(
            SceneFieldName::Translation,
            vec![0],
            SceneFieldData::Float(vec![1.0]),
        ));
        assert_eq!(
            Err(ConvertError::Scene(String::from(
                "scene field Translation is expected to be Vector3 but got Float"
            ))),
            add(&mut document, &wrong_type.with_field(parents(vec![0], vec![-1]))).0
        );

        assert!(document.nodes.is_empty());
        assert!(document.scenes.is_empty());
    }

    #[test]
    fn long_chain_listed_leaf_first() {
        let count = 50_000u64;
        let mapping: Vec<u64> = (0..count).rev().collect();
        let data: Vec<i64> = mapping.iter().map(|&object| object as i64 - 1).collect();
        let graph = SceneGraph::new(count).with_field(parents(mapping.clone(), data.clone()));

        let mut document = document(&[], 0);
        let (result, warnings) = add(&mut document, &graph);
        assert_eq!(Ok(()), result);
        assert!(warnings.is_empty());
        assert_eq!(count as usize, document.nodes.len());
        assert_eq!(vec![1], document.nodes[0].children);

        // Closing the chain into a loop is caught on the first walk.
        let mut looped = data;
        looped[count as usize - 1] = count as i64 - 1;
        let graph = SceneGraph::new(count).with_field(parents(mapping, looped));
        assert_eq!(
            Err(ConvertError::Scene(format!(
                "object {} is its own ancestor",
                count - 1
            ))),
            add(&mut document, &graph).0
        );
        assert_eq!(count as usize, document.nodes.len());
    }

    #[test]
    fn unreachable_objects() {
        let graph = SceneGraph::new(3).with_field(parents(vec![0, 1], vec![-1, 2]));
        let mut document = document(&[], 0);
        let (result, warnings) = add(&mut document, &graph);
        assert_eq!(Ok(()), result);
        assert_eq!(
            vec!["object 1 is not reachable from a root and was not used"],
            warnings
        );
        assert_eq!(1, document.nodes.len());
    }

    #[test]
    fn mesh_material_pairs() {
        let graph = SceneGraph::new(4)
            .with_field(parents(vec![0, 1, 2, 3], vec![-1, -1, -1, -1]))
            .with_field(SceneField::new(
                SceneFieldName::Mesh,
                vec![0, 1, 2, 3],
                SceneFieldData::UnsignedInt(vec![0, 0, 0, 1]),
            ))
            .with_field(SceneField::new(
                SceneFieldName::MeshMaterial,
                vec![0, 1, 2, 3],
                SceneFieldData::Int(vec![-1, 0, -1, 0]),
            ));

        let mut document = document(&["box", "box"], 1);
        let (result, _) = add(&mut document, &graph);
        assert_eq!(Ok(()), result);
        let meshes: Vec<_> = document.nodes.iter().map(|node| node.mesh).collect();
        assert_eq!(vec![Some(0), Some(1), Some(0), Some(2)], meshes);
        assert_eq!(3, document.slots.len());

        document.slots.add_unreferenced(&document.meshes.clone());
        assert_eq!(3, document.slots.len());

        let bad_material = SceneGraph::new(1)
            .with_field(parents(vec![0], vec![-1]))
            .with_field(SceneField::new(
                SceneFieldName::Mesh,
                vec![0],
                SceneFieldData::UnsignedInt(vec![0]),
            ))
            .with_field(SceneField::new(
                SceneFieldName::MeshMaterial,
                vec![0],
                SceneFieldData::Int(vec![1]),
            ));
        assert_eq!(
            Err(ConvertError::Scene(String::from(
                "material 1 referenced by object 0 out of range for 1 materials"
            ))),
            add(&mut document, &bad_material).0
        );

        let bad_mesh = SceneGraph::new(1).with_field(SceneField::new(
            SceneFieldName::Mesh,
            vec![0],
            SceneFieldData::UnsignedInt(vec![2]),
        ));
        assert_eq!(
            Err(ConvertError::Scene(String::from(
                "mesh 2 referenced by object 0 out of range for 2 meshes"
            ))),
            add(&mut document, &bad_mesh).0
        );
    }

    #[test]
    fn unreferenced_meshes() {
        let mut document = document(&["used", "", "spare"], 0);
        document.slots.assign(vec![(0, None)], Some(String::from("used")));
        let meshes = document.meshes.clone();
        document.slots.add_unreferenced(&meshes);
        assert_eq!(
            vec![
                (&[(0, None)][..], Some("used")),
                (&[(1, None)][..], None),
                (&[(2, None)][..], Some("spare")),
            ],
            document.slots.iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn fields_and_transformations() {
        let graph = SceneGraph::new(2)
            .with_field(parents(vec![0, 1], vec![-1, 0]))
            .with_field(SceneField::new(
                SceneFieldName::Translation,
                vec![0, 0],
                SceneFieldData::Vector3(vec![Vec3::Z, Vec3::X]),
            ))
            .with_field(SceneField::new(
                SceneFieldName::Transformation,
                vec![0, 1],
                SceneFieldData::Matrix4(vec![
                    Mat4::from_scale(Vec3::splat(3.0)),
                    Mat4::IDENTITY,
                ]),
            ))
            .with_field(SceneField::new(
                SceneFieldName::Custom(7),
                vec![1],
                SceneFieldData::String(vec![String::from("door")]),
            ))
            .with_field(
                SceneField::new(
                    SceneFieldName::Custom(7),
                    vec![0, 0],
                    SceneFieldData::IntArray(vec![vec![1, 2], vec![3]]),
                )
                .multi_entry(),
            )
            .with_field(SceneField::new(
                SceneFieldName::Custom(8),
                vec![0],
                SceneFieldData::Float(vec![1.0]),
            ))
            .with_field(SceneField::new(
                SceneFieldName::Camera,
                vec![1],
                SceneFieldData::UnsignedInt(vec![0]),
            ))
            .with_object_name(1, "Door");

        let mut document = document(&[], 0);
        let (result, warnings) = add(&mut document, &graph);
        assert_eq!(Ok(()), result);
        assert_eq!(
            vec![
                "scene field Translation has more than one entry for object 0, using the first",
                "no name set for custom scene field 8, skipping",
                "scene field Camera is not supported, skipping",
                "object 0 has both a transformation matrix and TRS components, using TRS",
            ],
            warnings
        );

        let mut extras = Map::new();
        extras.insert(
            String::from("tag"),
            Value::from(vec![Value::from(vec![1i64, 2]), Value::from(vec![3i64])]),
        );
        assert_eq!(
            GltfNode {
                children: vec![1],
                translation: Some([0.0, 0.0, 1.0]),
                extras: Some(extras),
                ..Default::default()
            },
            document.nodes[0]
        );

        let mut extras = Map::new();
        extras.insert(String::from("tag"), Value::from("door"));
        assert_eq!(
            GltfNode {
                name: Some(String::from("Door")),
                extras: Some(extras),
                ..Default::default()
            },
            document.nodes[1]
        );
    }
}
