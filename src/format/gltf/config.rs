use serde::Deserialize;

use super::{
    diagnostics::Diagnostics,
    error::{ConvertError, Result},
};

/// Options of the glTF converter. Every field has a default, so a partial JSON
/// object is a valid configuration.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GltfConfig {
    /// Write a binary glTF. If unset, it's decided from the file extension,
    /// and data output is binary.
    pub binary: Option<bool>,
    /// Reject input that is representable but not strictly valid glTF.
    pub strict: bool,
    /// Suppress warnings.
    pub quiet: bool,
    /// Report additional detail, such as inserted padding.
    pub verbose: bool,
    /// Write values equal to the glTF defaults explicitly.
    pub keep_defaults: bool,
    /// Name buffer views and accessors after the mesh and attribute they hold.
    pub accessor_names: bool,
    pub copyright: Option<String>,
    pub generator: Option<String>,
    /// Extensions to list as used regardless of the content.
    pub extension_used: Vec<String>,
    /// Extensions to list as required regardless of the content.
    pub extension_required: Vec<String>,
    pub object_id_attribute: String,
    /// Keep texture coordinates as they are and compensate for the flipped Y
    /// axis with a texture transform in every material.
    pub texture_coordinate_y_flip_in_material: bool,
    /// Allow KTX2 images and 2D array textures through `KHR_texture_ktx`.
    pub experimental_khr_texture_ktx: bool,
    /// The converter for 2D images.
    pub image_converter: String,
    /// The converter for 2D array images.
    pub array_image_converter: Option<String>,
    /// When writing a text glTF to data, embed the buffer as a base64 data URI
    /// instead of failing.
    pub embed_buffers: bool,
}

impl Default for GltfConfig {
    fn default() -> Self {
        Self {
            binary: None,
            strict: true,
            quiet: false,
            verbose: false,
            keep_defaults: false,
            accessor_names: false,
            copyright: None,
            generator: Some(format!(
                "{} {}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            )),
            extension_used: Vec::new(),
            extension_required: Vec::new(),
            object_id_attribute: String::from("_OBJECT_ID"),
            texture_coordinate_y_flip_in_material: false,
            experimental_khr_texture_ktx: false,
            image_converter: String::from("PngImageConverter"),
            array_image_converter: None,
            embed_buffers: false,
        }
    }
}

impl GltfConfig {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Rejects input that isn't strictly valid glTF, or lets it through with a
    /// warning if strict mode is disabled.
    pub(crate) fn strict_check(
        &self,
        diagnostics: &mut Diagnostics,
        error: &str,
        warning: &str,
    ) -> Result<()> {
        if self.strict {
            return Err(ConvertError::Strict(error.into()));
        }
        diagnostics.warning(warning);
        Ok(())
    }
}
