pub const KHR_MESH_QUANTIZATION: &str = "KHR_mesh_quantization";
pub const KHR_TEXTURE_TRANSFORM: &str = "KHR_texture_transform";
pub const KHR_TEXTURE_KTX: &str = "KHR_texture_ktx";
pub const KHR_MATERIALS_CLEARCOAT: &str = "KHR_materials_clearcoat";
pub const KHR_MATERIALS_UNLIT: &str = "KHR_materials_unlit";
pub const EXT_TEXTURE_WEBP: &str = "EXT_texture_webp";

/// Tracks the extensions a document uses and the subset of them a reader has
/// to support. Both lists keep insertion order and only grow, which makes
/// rolling back a failed operation a matter of truncating them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtensionSet {
    used: Vec<String>,
    required: Vec<String>,
}

impl ExtensionSet {
    /// Creates the set seeded with externally declared extensions. Required
    /// extensions are implicitly used as well.
    pub fn new(used: &[String], required: &[String]) -> Self {
        let mut set = Self::default();
        for extension in used {
            set.mark_used(extension);
        }
        for extension in required {
            set.mark_required(extension);
        }
        set
    }

    pub fn mark_used(&mut self, extension: &str) {
        if !self.is_used(extension) {
            self.used.push(extension.into());
        }
    }

    pub fn mark_required(&mut self, extension: &str) {
        self.mark_used(extension);
        if !self.is_required(extension) {
            self.required.push(extension.into());
        }
    }

    pub fn is_used(&self, extension: &str) -> bool {
        self.used.iter().any(|used| used == extension)
    }

    pub fn is_required(&self, extension: &str) -> bool {
        self.required.iter().any(|required| required == extension)
    }

    pub fn used(&self) -> &[String] {
        &self.used
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub(crate) fn lengths(&self) -> (usize, usize) {
        (self.used.len(), self.required.len())
    }

    pub(crate) fn truncate(&mut self, (used, required): (usize, usize)) {
        self.used.truncate(used);
        self.required.truncate(required);
    }
}
