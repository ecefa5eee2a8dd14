//! Projects layered attribute-bag materials onto the fixed glTF material
//! schema.
//!
//! Every attribute that's read is marked as consumed. Texture properties look
//! their coordinate set, transformation and array layer up in three scopes,
//! the property itself (`BaseColorTextureCoordinates`), the layer it's in
//! (`TextureCoordinates` in a clear coat layer) and the base layer, and only
//! the first one found is consumed. Whatever stays unconsumed is reported once
//! the whole material is projected.

use glam::{Mat3, Vec2, Vec3};
use serde_json::{Map, Value};

use super::{
    config::GltfConfig,
    diagnostics::Diagnostics,
    document::{Document, TextureRecord},
    error::{ConvertError, Result},
    extensions::{
        ExtensionSet, KHR_MATERIALS_CLEARCOAT, KHR_MATERIALS_UNLIT, KHR_TEXTURE_TRANSFORM,
    },
    internal::{
        GltfClearcoat, GltfMaterial, GltfPbrMetallicRoughness, GltfTextureInfo, GltfTextureLayer,
        GltfTextureTransform,
    },
};
use crate::conversion::{
    Material, MaterialLayer, MaterialValue, MaterialValueType, TextureSwizzle, CLEAR_COAT_LAYER,
};

/// Values closer than this to the glTF default are treated as the default.
const EPSILON: f32 = 1.0e-6;

pub fn add_material(
    document: &mut Document,
    diagnostics: &mut Diagnostics,
    config: &GltfConfig,
    material: &Material,
) -> Result<()> {
    let with_base_layer;
    let material = if material.layers.is_empty() {
        with_base_layer = Material {
            layers: vec![MaterialLayer::default()],
            ..material.clone()
        };
        &with_base_layer
    } else {
        material
    };

    let projector = Projector {
        material,
        textures: &document.textures,
        config,
        diagnostics,
        extensions: &mut document.extensions,
        consumed: material
            .layers
            .iter()
            .map(|layer| vec![false; layer.attributes.len()])
            .collect(),
        recognized: vec![false; material.layers.len()],
    };
    let gltf = projector.project()?;
    document.materials.push(gltf);
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scope {
    /// The attribute belongs to the property, such as `BaseColorTextureMatrix`.
    Local,
    /// A fallback declared in the same layer as the property.
    Layer,
    /// A fallback declared in the base layer.
    Global,
}

struct Found<T> {
    value: T,
    name: String,
    scope: Scope,
}

/// A texture property with everything that was looked up for it.
struct ResolvedTexture {
    info: GltfTextureInfo,
    swizzle: Option<TextureSwizzle>,
    coordinates: Option<u32>,
    matrix: Option<Mat3>,
    layer: Option<u32>,
}

impl ResolvedTexture {
    fn same_binding(&self, other: &Self) -> bool {
        self.info.index == other.info.index
            && self.coordinates == other.coordinates
            && self.matrix == other.matrix
            && self.layer == other.layer
    }
}

struct Projector<'a> {
    material: &'a Material,
    textures: &'a [TextureRecord],
    config: &'a GltfConfig,
    diagnostics: &'a mut Diagnostics,
    extensions: &'a mut ExtensionSet,
    /// Parallel to the attributes of each layer.
    consumed: Vec<Vec<bool>>,
    /// Layers whose meaning is understood, even if none of their attributes
    /// were read.
    recognized: Vec<bool>,
}

impl<'a> Projector<'a> {
    fn project(mut self) -> Result<GltfMaterial> {
        let keep = self.config.keep_defaults;
        let mut gltf = GltfMaterial {
            name: (!self.material.name.is_empty()).then(|| self.material.name.clone()),
            ..Default::default()
        };
        self.recognized[0] = true;

        let pbr = GltfPbrMetallicRoughness {
            base_color_factor: self
                .take(0, "BaseColor", MaterialValueType::Vector4, as_vector4)
                .map(|color| color.to_array())
                .filter(|color| keep || !approx_all(color, &[1.0; 4])),
            base_color_texture: self.texture(0, "BaseColorTexture")?.map(|texture| texture.info),
            metallic_factor: self.factor(0, "Metalness", 1.0),
            roughness_factor: self.factor(0, "Roughness", 1.0),
            metallic_roughness_texture: self.metallic_roughness()?,
        };
        if !pbr.is_empty() {
            gltf.pbr_metallic_roughness = Some(pbr);
        }

        if let Some(normal) = self.texture(0, "NormalTexture")? {
            check_swizzle(&normal, TextureSwizzle::RGB, TextureSwizzle::RGB, "a normal")?;
            gltf.normal_texture = Some(GltfTextureInfo {
                scale: self.factor(0, "NormalTextureScale", 1.0),
                ..normal.info
            });
        }
        if let Some(occlusion) = self.texture(0, "OcclusionTexture")? {
            check_swizzle(&occlusion, TextureSwizzle::R, TextureSwizzle::R, "an occlusion")?;
            gltf.occlusion_texture = Some(GltfTextureInfo {
                strength: self.factor(0, "OcclusionTextureStrength", 1.0),
                ..occlusion.info
            });
        }

        let emissive = self.texture(0, "EmissiveTexture")?;
        let emissive_color = self
            .take(0, "EmissiveColor", MaterialValueType::Vector3, as_vector3)
            .map(|color| color.to_array());
        gltf.emissive_factor = match emissive_color {
            Some(color) => Some(color).filter(|color| keep || !approx_all(color, &[0.0; 3])),
            // A zero factor would disable the texture.
            None if emissive.is_some() => Some([1.0; 3]),
            None => None,
        };
        gltf.emissive_texture = emissive.map(|texture| texture.info);

        let blend = self.take(0, "AlphaBlend", MaterialValueType::Bool, as_bool);
        if blend == Some(true) {
            gltf.alpha_mode = Some("BLEND");
        } else if let Some(cutoff) = self.take(0, "AlphaMask", MaterialValueType::Float, as_float) {
            gltf.alpha_mode = Some("MASK");
            gltf.alpha_cutoff = Some(cutoff).filter(|&cutoff| keep || !approx(cutoff, 0.5));
        } else if blend.is_some() && keep {
            gltf.alpha_mode = Some("OPAQUE");
        }

        gltf.double_sided = self
            .take(0, "DoubleSided", MaterialValueType::Bool, as_bool)
            .filter(|&double_sided| keep || double_sided);

        if self.material.flat {
            gltf.extensions.unlit = Some(Map::new());
            self.extensions.mark_used(KHR_MATERIALS_UNLIT);
        }

        let clear_coat = self
            .material
            .layers
            .iter()
            .skip(1)
            .position(|layer| layer.name.as_deref() == Some(CLEAR_COAT_LAYER));
        if let Some(layer) = clear_coat.map(|index| index + 1) {
            gltf.extensions.clearcoat = Some(self.clear_coat(layer)?);
            self.extensions.mark_used(KHR_MATERIALS_CLEARCOAT);
        }

        gltf.extras = self.extras();
        self.report_unused();
        Ok(gltf)
    }

    fn clear_coat(&mut self, layer: usize) -> Result<GltfClearcoat> {
        let keep = self.config.keep_defaults;
        self.recognized[layer] = true;

        let mut clear_coat = GltfClearcoat {
            // Presence of the layer implies a full-strength clear coat, unlike
            // in glTF.
            clearcoat_factor: Some(
                self.take(layer, "LayerFactor", MaterialValueType::Float, as_float)
                    .unwrap_or(1.0),
            )
            .filter(|&factor| keep || !approx(factor, 0.0)),
            clearcoat_roughness_factor: self.factor(layer, "Roughness", 0.0),
            ..Default::default()
        };

        if let Some(factor) = self.texture(layer, "LayerFactorTexture")? {
            check_swizzle(&factor, TextureSwizzle::R, TextureSwizzle::R, "a clear coat factor")?;
            clear_coat.clearcoat_texture = Some(factor.info);
        }
        if let Some(roughness) = self.texture(layer, "RoughnessTexture")? {
            check_swizzle(
                &roughness,
                TextureSwizzle::R,
                TextureSwizzle::G,
                "a clear coat roughness",
            )?;
            clear_coat.clearcoat_roughness_texture = Some(roughness.info);
        }
        if let Some(normal) = self.texture(layer, "NormalTexture")? {
            check_swizzle(
                &normal,
                TextureSwizzle::RGB,
                TextureSwizzle::RGB,
                "a clear coat normal",
            )?;
            clear_coat.clearcoat_normal_texture = Some(GltfTextureInfo {
                scale: self.factor(layer, "NormalTextureScale", 1.0),
                ..normal.info
            });
        }

        Ok(clear_coat)
    }

    /// glTF stores metalness in the blue and roughness in the green channel
    /// of a single texture.
    fn metallic_roughness(&mut self) -> Result<Option<GltfTextureInfo>> {
        let metalness = self.texture(0, "MetalnessTexture")?;
        let roughness = self.texture(0, "RoughnessTexture")?;
        match (metalness, roughness) {
            (None, None) => Ok(None),
            (Some(metalness), None) => {
                check_swizzle(&metalness, TextureSwizzle::R, TextureSwizzle::B, "a metalness")?;
                Ok(Some(metalness.info))
            }
            (None, Some(roughness)) => {
                check_swizzle(&roughness, TextureSwizzle::R, TextureSwizzle::G, "a roughness")?;
                Ok(Some(roughness.info))
            }
            (Some(metalness), Some(roughness)) => {
                let metalness_swizzle = metalness.swizzle.unwrap_or(TextureSwizzle::R);
                let roughness_swizzle = roughness.swizzle.unwrap_or(TextureSwizzle::R);
                if metalness_swizzle != TextureSwizzle::B || roughness_swizzle != TextureSwizzle::G
                {
                    return Err(ConvertError::Material(format!(
                        "unsupported {}/{} packing of a metallic/roughness texture",
                        metalness_swizzle, roughness_swizzle
                    )));
                }
                if !metalness.same_binding(&roughness) {
                    return Err(ConvertError::Material(String::from(
                        "metalness and roughness textures have to be the same texture with \
                         the same coordinates, transformation and layer",
                    )));
                }
                Ok(Some(metalness.info))
            }
        }
    }

    /// Resolves a texture property named by `prefix`, such as
    /// `BaseColorTexture`, together with its coordinates, transformation and
    /// layer.
    fn texture(&mut self, layer: usize, prefix: &str) -> Result<Option<ResolvedTexture>> {
        let id = match self.texture_id(layer, prefix)? {
            Some(id) => id,
            None => return Ok(None),
        };

        let swizzle = self.take(
            layer,
            &format!("{}Swizzle", prefix),
            MaterialValueType::TextureSwizzle,
            as_swizzle,
        );
        let matrix = self.scoped(
            layer,
            &format!("{}Matrix", prefix),
            "TextureMatrix",
            MaterialValueType::Matrix3x3,
            as_matrix,
        );
        let coordinates = self.scoped(
            layer,
            &format!("{}Coordinates", prefix),
            "TextureCoordinates",
            MaterialValueType::UnsignedInt,
            as_unsigned,
        );
        let texture_layer = self.scoped(
            layer,
            &format!("{}Layer", prefix),
            "TextureLayer",
            MaterialValueType::UnsignedInt,
            as_unsigned,
        );

        let layer_count = self.textures[id as usize].layer_count;
        let texture_layer = match texture_layer {
            Some(found) if found.value >= layer_count => {
                let message = format!(
                    "material attribute {} value {} out of range for {} layers in texture {}",
                    found.name, found.value, layer_count, id
                );
                if found.scope == Scope::Local {
                    return Err(ConvertError::Material(message));
                }
                self.diagnostics.warning(format!("{}, ignoring", message));
                None
            }
            found => found.map(|found| found.value),
        };

        let keep = self.config.keep_defaults;
        let mut info = GltfTextureInfo {
            index: id,
            tex_coord: coordinates
                .as_ref()
                .map(|found| found.value)
                .filter(|&coordinates| keep || coordinates != 0),
            ..Default::default()
        };
        info.extensions.texture_transform = self.transform(matrix.as_ref())?;
        info.extensions.texture_ktx = texture_layer
            .filter(|&texture_layer| layer_count > 1 && (keep || texture_layer != 0))
            .map(|layer| GltfTextureLayer { layer });

        Ok(Some(ResolvedTexture {
            info,
            swizzle,
            coordinates: coordinates.map(|found| found.value),
            matrix: matrix.map(|found| found.value),
            layer: texture_layer,
        }))
    }

    /// Reads a texture reference. Unlike other attributes, a reference of a
    /// wrong type or out of range fails the whole material.
    fn texture_id(&mut self, layer: usize, name: &str) -> Result<Option<u32>> {
        let material = self.material;
        let index = match material.layers[layer].find(name) {
            Some(index) => index,
            None => return Ok(None),
        };
        self.consumed[layer][index] = true;

        let id = match material.layers[layer].attributes[index].value {
            MaterialValue::Texture(id) | MaterialValue::UnsignedInt(id) => id,
            ref other => {
                return Err(ConvertError::Material(format!(
                    "material attribute {} is expected to be Texture or UnsignedInt but got {}",
                    name,
                    other.value_type()
                )))
            }
        };
        if id as usize >= self.textures.len() {
            return Err(ConvertError::Material(format!(
                "material attribute {} references texture {} but only {} were added",
                name,
                id,
                self.textures.len()
            )));
        }
        Ok(Some(id))
    }

    /// Builds the texture transform, moving the coordinate system from the
    /// Y-up convention of the input to the Y-down convention of glTF.
    fn transform(&mut self, matrix: Option<&Found<Mat3>>) -> Result<Option<GltfTextureTransform>> {
        let flip = Mat3::from_cols(
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 1.0),
        );
        let transform = match (matrix, self.config.texture_coordinate_y_flip_in_material) {
            (None, false) => return Ok(None),
            (None, true) => flip,
            (Some(found), false) => flip * found.value * flip,
            (Some(found), true) => flip * found.value,
        };

        let (offset, rotation, scale) = decompose(transform).ok_or_else(|| {
            ConvertError::Material(format!(
                "material attribute {} has a shear or a projection, can't be represented with {}",
                matrix.map_or("TextureMatrix", |found| found.name.as_str()),
                KHR_TEXTURE_TRANSFORM
            ))
        })?;

        let keep = self.config.keep_defaults;
        let transform = GltfTextureTransform {
            offset: Some(offset).filter(|offset| keep || !approx_all(offset, &[0.0; 2])),
            rotation: Some(rotation).filter(|&rotation| keep || !approx(rotation, 0.0)),
            scale: Some(scale).filter(|scale| keep || !approx_all(scale, &[1.0; 2])),
        };
        if transform == GltfTextureTransform::default() {
            return Ok(None);
        }
        self.extensions.mark_used(KHR_TEXTURE_TRANSFORM);
        Ok(Some(transform))
    }

    /// Looks an attribute up in the property, its layer and the base layer, in
    /// that order, and consumes only the first one found with a usable type.
    fn scoped<T>(
        &mut self,
        layer: usize,
        local: &str,
        global: &str,
        expected: MaterialValueType,
        read: impl Fn(&MaterialValue) -> Option<T>,
    ) -> Option<Found<T>> {
        let mut scopes = vec![(layer, local, Scope::Local)];
        if layer != 0 {
            scopes.push((layer, global, Scope::Layer));
        }
        scopes.push((0, global, Scope::Global));

        scopes.into_iter().find_map(|(layer, name, scope)| {
            self.take(layer, name, expected, &read).map(|value| Found {
                value,
                name: name.to_string(),
                scope,
            })
        })
    }

    /// Reads and consumes an attribute. An attribute of an unexpected type is
    /// consumed as well, with a warning.
    fn take<T>(
        &mut self,
        layer: usize,
        name: &str,
        expected: MaterialValueType,
        read: impl Fn(&MaterialValue) -> Option<T>,
    ) -> Option<T> {
        let material = self.material;
        let index = material.layers[layer].find(name)?;
        self.consumed[layer][index] = true;

        let value = &material.layers[layer].attributes[index].value;
        let result = read(value);
        if result.is_none() {
            self.diagnostics.warning(format!(
                "material attribute {} is expected to be {} but got {}, ignoring",
                name,
                expected,
                value.value_type()
            ));
        }
        result
    }

    /// Reads a float attribute, dropping it if it equals the glTF default.
    fn factor(&mut self, layer: usize, name: &str, default: f32) -> Option<f32> {
        let keep = self.config.keep_defaults;
        self.take(layer, name, MaterialValueType::Float, as_float)
            .filter(|&value| keep || !approx(value, default))
    }

    /// Exports unconsumed base layer attributes with lowercase names, which
    /// are application-specific by convention.
    fn extras(&mut self) -> Option<Map<String, Value>> {
        let mut extras = Map::new();
        for (index, attribute) in self.material.layers[0].attributes.iter().enumerate() {
            if self.consumed[0][index]
                || !attribute.name.starts_with(|c: char| c.is_ascii_lowercase())
            {
                continue;
            }
            let value = match attribute.value {
                MaterialValue::Bool(value) => Value::from(if value { 1.0 } else { 0.0 }),
                MaterialValue::Float(value) => Value::from(value),
                MaterialValue::Int(value) => Value::from(f64::from(value)),
                MaterialValue::UnsignedInt(value) => Value::from(f64::from(value)),
                MaterialValue::Vector2(value) => Value::from(value.to_array().to_vec()),
                MaterialValue::Vector3(value) => Value::from(value.to_array().to_vec()),
                MaterialValue::Vector4(value) => Value::from(value.to_array().to_vec()),
                MaterialValue::String(ref value) => Value::from(value.as_str()),
                MaterialValue::Matrix3x3(_)
                | MaterialValue::Texture(_)
                | MaterialValue::TextureSwizzle(_) => continue,
            };
            extras.insert(attribute.name.clone(), value);
            self.consumed[0][index] = true;
        }
        (!extras.is_empty()).then(|| extras)
    }

    /// Reports base layer attributes first, then every other layer either as
    /// a whole or by its unused attributes.
    fn report_unused(&mut self) {
        let material = self.material;

        let mut unused = unused_names(material, &self.consumed, 0);
        unused.sort_unstable();
        for name in unused {
            self.diagnostics
                .warning(format!("material attribute {} was not used", name));
        }

        for (index, layer) in material.layers.iter().enumerate().skip(1) {
            let label = match &layer.name {
                Some(name) => format!("material layer {} ({})", index, name),
                None => format!("material layer {}", index),
            };
            if !self.recognized[index] && !self.consumed[index].contains(&true) {
                self.diagnostics.warning(format!("{} was not used", label));
                continue;
            }

            let mut unused = unused_names(material, &self.consumed, index);
            if unused.is_empty() {
                continue;
            }
            unused.sort_unstable();
            self.diagnostics.warning(format!(
                "{} attributes {} were not used",
                label,
                unused.join(", ")
            ));
        }
    }
}

fn unused_names<'m>(material: &'m Material, consumed: &[Vec<bool>], layer: usize) -> Vec<&'m str> {
    material.layers[layer]
        .attributes
        .iter()
        .zip(&consumed[layer])
        .filter(|(_, consumed)| !**consumed)
        .map(|(attribute, _)| attribute.name.as_str())
        .collect()
}

/// Fails unless the texture reads the only channels glTF allows for the
/// property.
fn check_swizzle(
    texture: &ResolvedTexture,
    default: TextureSwizzle,
    required: TextureSwizzle,
    what: &str,
) -> Result<()> {
    let swizzle = texture.swizzle.unwrap_or(default);
    if swizzle != required {
        return Err(ConvertError::Material(format!(
            "unsupported {} packing of {} texture",
            swizzle, what
        )));
    }
    Ok(())
}

/// Splits a 2D transformation into the offset, rotation and scale of
/// `KHR_texture_transform`. Fails for shears and projections.
fn decompose(matrix: Mat3) -> Option<([f32; 2], f32, [f32; 2])> {
    let last_row = Vec3::new(matrix.x_axis.z, matrix.y_axis.z, matrix.z_axis.z);
    if !last_row.abs_diff_eq(Vec3::Z, EPSILON) {
        return None;
    }

    let x = matrix.x_axis.truncate();
    let y = matrix.y_axis.truncate();
    let scale_x = x.length();
    if scale_x < EPSILON {
        return None;
    }
    // The rotation matrix has (cos, -sin) in its first column.
    let rotation = (-x.y).atan2(x.x);
    let (sin, cos) = rotation.sin_cos();
    let y_direction = Vec2::new(sin, cos);
    let scale_y = y.dot(y_direction);
    if (y - y_direction * scale_y).abs().max_element() > 1.0e-5 {
        return None;
    }

    Some((
        matrix.z_axis.truncate().to_array(),
        rotation,
        [scale_x, scale_y],
    ))
}

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() <= EPSILON
}

fn approx_all(a: &[f32], b: &[f32]) -> bool {
    a.iter().zip(b).all(|(&a, &b)| approx(a, b))
}

fn as_bool(value: &MaterialValue) -> Option<bool> {
    match *value {
        MaterialValue::Bool(value) => Some(value),
        _ => None,
    }
}

fn as_float(value: &MaterialValue) -> Option<f32> {
    match *value {
        MaterialValue::Float(value) => Some(value),
        _ => None,
    }
}

fn as_unsigned(value: &MaterialValue) -> Option<u32> {
    match *value {
        MaterialValue::UnsignedInt(value) => Some(value),
        _ => None,
    }
}

fn as_vector3(value: &MaterialValue) -> Option<Vec3> {
    match *value {
        MaterialValue::Vector3(value) => Some(value),
        _ => None,
    }
}

fn as_vector4(value: &MaterialValue) -> Option<glam::Vec4> {
    match *value {
        MaterialValue::Vector4(value) => Some(value),
        _ => None,
    }
}

fn as_matrix(value: &MaterialValue) -> Option<Mat3> {
    match *value {
        MaterialValue::Matrix3x3(value) => Some(value),
        _ => None,
    }
}

fn as_swizzle(value: &MaterialValue) -> Option<TextureSwizzle> {
    match *value {
        MaterialValue::TextureSwizzle(value) => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use glam::Vec4;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::format::gltf::internal::GltfTexture;

    fn document(layer_counts: &[u32]) -> Document {
        let mut document = Document::default();
        for &layer_count in layer_counts {
            document.textures.push(TextureRecord {
                gltf: GltfTexture {
                    sampler: 0,
                    source: Some(0),
                    extensions: BTreeMap::new(),
                    name: None,
                },
                layer_count,
            });
        }
        document
    }

    fn project(
        document: &mut Document,
        config: &GltfConfig,
        material: &Material,
    ) -> (Result<()>, Vec<String>) {
        let mut diagnostics = Diagnostics::default();
        let result = add_material(document, &mut diagnostics, config, material);
        let warnings = diagnostics
            .warnings()
            .into_iter()
            .map(String::from)
            .collect();
        (result, warnings)
    }

    fn texture_info(index: u32, tex_coord: Option<u32>) -> GltfTextureInfo {
        GltfTextureInfo {
            index,
            tex_coord,
            ..Default::default()
        }
    }

    #[test]
    fn global_texture_coordinates() {
        let material = Material::new("")
            .with("BaseColorTexture", MaterialValue::Texture(0))
            .with("TextureCoordinates", MaterialValue::UnsignedInt(5));

        let mut document = document(&[1]);
        let (result, warnings) = project(&mut document, &GltfConfig::default(), &material);
        assert_eq!(Ok(()), result);
        assert!(warnings.is_empty());
        assert_eq!(
            Some(texture_info(0, Some(5))),
            document.materials[0]
                .pbr_metallic_roughness
                .as_ref()
                .and_then(|pbr| pbr.base_color_texture.clone())
        );
    }

    #[test]
    fn scope_precedence() {
        let material = Material::new("")
            .with("BaseColorTexture", MaterialValue::Texture(0))
            .with("TextureCoordinates", MaterialValue::UnsignedInt(4))
            .with_layer(
                MaterialLayer::new(CLEAR_COAT_LAYER)
                    .with("NormalTexture", MaterialValue::Texture(1))
                    .with("NormalTextureCoordinates", MaterialValue::UnsignedInt(2))
                    .with("RoughnessTexture", MaterialValue::Texture(1))
                    .with(
                        "RoughnessTextureSwizzle",
                        MaterialValue::TextureSwizzle(TextureSwizzle::G),
                    )
                    .with("TextureCoordinates", MaterialValue::UnsignedInt(3)),
            );

        let mut document = document(&[1, 1]);
        let (result, warnings) = project(&mut document, &GltfConfig::default(), &material);
        assert_eq!(Ok(()), result);
        assert!(warnings.is_empty());

        let gltf = &document.materials[0];
        assert_eq!(
            Some(texture_info(0, Some(4))),
            gltf.pbr_metallic_roughness
                .as_ref()
                .and_then(|pbr| pbr.base_color_texture.clone())
        );
        assert_eq!(
            Some(GltfClearcoat {
                clearcoat_factor: Some(1.0),
                clearcoat_roughness_texture: Some(texture_info(1, Some(3))),
                clearcoat_normal_texture: Some(texture_info(1, Some(2))),
                ..Default::default()
            }),
            gltf.extensions.clearcoat
        );
        assert_eq!(&[KHR_MATERIALS_CLEARCOAT], document.extensions.used());

        // Without the roughness texture, the layer-wide coordinates are unused.
        let mut material = material;
        material.layers[1].attributes.drain(2..4);
        let (result, warnings) = project(&mut document, &GltfConfig::default(), &material);
        assert_eq!(Ok(()), result);
        assert_eq!(
            vec!["material layer 1 (ClearCoat) attributes TextureCoordinates were not used"],
            warnings
        );
    }

    #[test]
    fn wrong_types_fall_back() {
        let material = Material::new("")
            .with("BaseColorTexture", MaterialValue::Texture(0))
            .with("BaseColorTextureCoordinates", MaterialValue::Float(1.0))
            .with("TextureCoordinates", MaterialValue::UnsignedInt(2));

        let mut document = document(&[1]);
        let (result, warnings) = project(&mut document, &GltfConfig::default(), &material);
        assert_eq!(Ok(()), result);
        assert_eq!(
            vec![
                "material attribute BaseColorTextureCoordinates is expected to be UnsignedInt \
                 but got Float, ignoring"
            ],
            warnings
        );
        assert_eq!(
            Some(2),
            document.materials[0]
                .pbr_metallic_roughness
                .as_ref()
                .and_then(|pbr| pbr.base_color_texture.as_ref())
                .and_then(|texture| texture.tex_coord)
        );

        let material = Material::new("").with("EmissiveTexture", MaterialValue::Float(0.0));
        let (result, _) = project(&mut document, &GltfConfig::default(), &material);
        assert_eq!(
            Err(ConvertError::Material(String::from(
                "material attribute EmissiveTexture is expected to be Texture or UnsignedInt \
                 but got Float"
            ))),
            result
        );

        let material = Material::new("").with("EmissiveTexture", MaterialValue::Texture(1));
        let (result, _) = project(&mut document, &GltfConfig::default(), &material);
        assert_eq!(
            Err(ConvertError::Material(String::from(
                "material attribute EmissiveTexture references texture 1 but only 1 were added"
            ))),
            result
        );
    }

    #[test]
    fn metallic_roughness_packing() {
        let packed = Material::new("")
            .with("MetalnessTexture", MaterialValue::Texture(0))
            .with(
                "MetalnessTextureSwizzle",
                MaterialValue::TextureSwizzle(TextureSwizzle::B),
            )
            .with("RoughnessTexture", MaterialValue::Texture(0))
            .with(
                "RoughnessTextureSwizzle",
                MaterialValue::TextureSwizzle(TextureSwizzle::G),
            );
        let mut document = document(&[1, 1]);
        let (result, warnings) = project(&mut document, &GltfConfig::default(), &packed);
        assert_eq!(Ok(()), result);
        assert!(warnings.is_empty());
        assert_eq!(
            Some(GltfPbrMetallicRoughness {
                metallic_roughness_texture: Some(texture_info(0, None)),
                ..Default::default()
            }),
            document.materials[0].pbr_metallic_roughness
        );

        let default_swizzles = Material::new("")
            .with("MetalnessTexture", MaterialValue::Texture(0))
            .with("RoughnessTexture", MaterialValue::Texture(0));
        let (result, _) = project(&mut document, &GltfConfig::default(), &default_swizzles);
        assert_eq!(
            Err(ConvertError::Material(String::from(
                "unsupported R/R packing of a metallic/roughness texture"
            ))),
            result
        );

        let mut different = packed.clone();
        different.layers[0].attributes[2].value = MaterialValue::Texture(1);
        let (result, _) = project(&mut document, &GltfConfig::default(), &different);
        assert_eq!(
            Err(ConvertError::Material(String::from(
                "metalness and roughness textures have to be the same texture with the same \
                 coordinates, transformation and layer"
            ))),
            result
        );

        let normal = Material::new("")
            .with("NormalTexture", MaterialValue::Texture(0))
            .with(
                "NormalTextureSwizzle",
                MaterialValue::TextureSwizzle(TextureSwizzle::RG),
            );
        let (result, _) = project(&mut document, &GltfConfig::default(), &normal);
        assert_eq!(
            Err(ConvertError::Material(String::from(
                "unsupported RG packing of a normal texture"
            ))),
            result
        );
        assert_eq!(1, document.materials.len());
    }

    #[test]
    fn texture_layers() {
        let mut document = document(&[3]);

        let local = Material::new("")
            .with("BaseColorTexture", MaterialValue::Texture(0))
            .with("BaseColorTextureLayer", MaterialValue::UnsignedInt(3));
        let (result, _) = project(&mut document, &GltfConfig::default(), &local);
        assert_eq!(
            Err(ConvertError::Material(String::from(
                "material attribute BaseColorTextureLayer value 3 out of range for 3 layers in \
                 texture 0"
            ))),
            result
        );

        let global = Material::new("")
            .with("EmissiveTexture", MaterialValue::Texture(0))
            .with("TextureLayer", MaterialValue::UnsignedInt(7))
            .with("OcclusionTexture", MaterialValue::Texture(0))
            .with("OcclusionTextureLayer", MaterialValue::UnsignedInt(2));
        let (result, warnings) = project(&mut document, &GltfConfig::default(), &global);
        assert_eq!(Ok(()), result);
        assert_eq!(
            vec![
                "material attribute TextureLayer value 7 out of range for 3 layers in texture 0, \
                 ignoring"
            ],
            warnings
        );

        let gltf = &document.materials[0];
        assert_eq!(Some(texture_info(0, None)), gltf.emissive_texture);
        assert_eq!(Some([1.0; 3]), gltf.emissive_factor);
        assert_eq!(
            Some(GltfTextureLayer { layer: 2 }),
            gltf.occlusion_texture
                .as_ref()
                .and_then(|texture| texture.extensions.texture_ktx.clone())
        );
    }

    #[test]
    fn unused_report_order() {
        let material = Material::new("")
            .with("ZFactor", MaterialValue::Int(3))
            .with("AlphaBlend", MaterialValue::Bool(true))
            .with("AlphaMask", MaterialValue::Float(0.3))
            .with("TextureMatrix", MaterialValue::Matrix3x3(Mat3::IDENTITY))
            .with_layer(MaterialLayer::new("Sheen").with("LayerFactor", MaterialValue::Float(0.5)))
            .with_layer(MaterialLayer::default())
            .with_layer(MaterialLayer::new(CLEAR_COAT_LAYER).with("Thickness", MaterialValue::Float(0.1)));

        let mut document = document(&[]);
        let (result, warnings) = project(&mut document, &GltfConfig::default(), &material);
        assert_eq!(Ok(()), result);
        assert_eq!(
            vec![
                "material attribute AlphaMask was not used",
                "material attribute TextureMatrix was not used",
                "material attribute ZFactor was not used",
                "material layer 1 (Sheen) was not used",
                "material layer 2 was not used",
                "material layer 3 (ClearCoat) attributes Thickness were not used",
            ],
            warnings
        );
        assert_eq!(Some("BLEND"), document.materials[0].alpha_mode);
    }

    #[test]
    fn defaults() {
        let material = Material::new("Plastic")
            .with("BaseColor", MaterialValue::Vector4(Vec4::ONE))
            .with("Metalness", MaterialValue::Float(0.5))
            .with("Roughness", MaterialValue::Float(1.0))
            .with("DoubleSided", MaterialValue::Bool(false))
            .with("NormalTexture", MaterialValue::Texture(0))
            .with("NormalTextureScale", MaterialValue::Float(1.00001));

        let mut document = document(&[1]);
        let (result, _) = project(&mut document, &GltfConfig::default(), &material);
        assert_eq!(Ok(()), result);
        assert_eq!(
            GltfMaterial {
                name: Some(String::from("Plastic")),
                pbr_metallic_roughness: Some(GltfPbrMetallicRoughness {
                    metallic_factor: Some(0.5),
                    ..Default::default()
                }),
                normal_texture: Some(GltfTextureInfo {
                    scale: Some(1.00001),
                    ..texture_info(0, None)
                }),
                ..Default::default()
            },
            document.materials[0]
        );

        let config = GltfConfig {
            keep_defaults: true,
            ..Default::default()
        };
        let (result, _) = project(&mut document, &config, &material);
        assert_eq!(Ok(()), result);
        let gltf = &document.materials[1];
        assert_eq!(Some(false), gltf.double_sided);
        assert_eq!(
            Some([1.0; 4]),
            gltf.pbr_metallic_roughness
                .as_ref()
                .and_then(|pbr| pbr.base_color_factor)
        );
    }

    #[test]
    fn unlit_and_extras() {
        let mut material = Material::new("")
            .with("BaseColor", MaterialValue::Vector4(Vec4::new(1.0, 0.0, 0.0, 1.0)))
            .with("layer", MaterialValue::UnsignedInt(3))
            .with("glossy", MaterialValue::Bool(true))
            .with("note", MaterialValue::String(String::from("red")))
            .with("offset", MaterialValue::Texture(0));
        material.flat = true;

        let mut document = document(&[]);
        let (result, warnings) = project(&mut document, &GltfConfig::default(), &material);
        assert_eq!(Ok(()), result);
        assert_eq!(vec!["material attribute offset was not used"], warnings);

        let gltf = &document.materials[0];
        assert_eq!(Some(Map::new()), gltf.extensions.unlit);
        assert_eq!(&[KHR_MATERIALS_UNLIT], document.extensions.used());
        let extras = gltf.extras.clone().unwrap();
        assert_eq!(Some(&Value::from(3.0)), extras.get("layer"));
        assert_eq!(Some(&Value::from(1.0)), extras.get("glossy"));
        assert_eq!(Some(&Value::from("red")), extras.get("note"));
    }

    #[test]
    fn texture_transforms() {
        let material = Material::new("")
            .with("BaseColorTexture", MaterialValue::Texture(0))
            .with(
                "BaseColorTextureMatrix",
                MaterialValue::Matrix3x3(Mat3::from_scale(Vec2::new(2.0, 2.0))),
            );
        let transform = |document: &Document| {
            document
                .materials
                .last()
                .and_then(|gltf| gltf.pbr_metallic_roughness.as_ref())
                .and_then(|pbr| pbr.base_color_texture.as_ref())
                .and_then(|texture| texture.extensions.texture_transform.clone())
        };

        let mut document = document(&[1]);
        let (result, _) = project(&mut document, &GltfConfig::default(), &material);
        assert_eq!(Ok(()), result);
        assert_eq!(
            Some(GltfTextureTransform {
                offset: Some([0.0, -1.0]),
                rotation: None,
                scale: Some([2.0, 2.0]),
            }),
            transform(&document)
        );
        assert_eq!(&[KHR_TEXTURE_TRANSFORM], document.extensions.used());

        let config = GltfConfig {
            texture_coordinate_y_flip_in_material: true,
            ..Default::default()
        };
        let untransformed = Material::new("").with("BaseColorTexture", MaterialValue::Texture(0));
        let (result, _) = project(&mut document, &config, &untransformed);
        assert_eq!(Ok(()), result);
        assert_eq!(
            Some(GltfTextureTransform {
                offset: Some([0.0, 1.0]),
                rotation: None,
                scale: Some([1.0, -1.0]),
            }),
            transform(&document)
        );

        let sheared = Material::new("")
            .with("BaseColorTexture", MaterialValue::Texture(0))
            .with(
                "TextureMatrix",
                MaterialValue::Matrix3x3(Mat3::from_cols(
                    Vec3::new(1.0, 0.0, 0.0),
                    Vec3::new(0.5, 1.0, 0.0),
                    Vec3::new(0.0, 0.0, 1.0),
                )),
            );
        let (result, _) = project(&mut document, &GltfConfig::default(), &sheared);
        assert_eq!(
            Err(ConvertError::Material(String::from(
                "material attribute TextureMatrix has a shear or a projection, can't be \
                 represented with KHR_texture_transform"
            ))),
            result
        );
    }
}
