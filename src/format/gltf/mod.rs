pub use self::{
    config::GltfConfig,
    converter::GltfSceneConverter,
    diagnostics::{Diagnostic, Diagnostics, Severity},
    error::{ConvertError, Result},
    extensions::ExtensionSet,
    exporter::GltfExporter,
};

mod accessor;
mod buffer;
mod config;
mod converter;
mod diagnostics;
mod document;
mod error;
mod exporter;
mod extensions;
mod internal;
mod layout;
mod material;
mod mesh;
mod scene;
mod texture;
