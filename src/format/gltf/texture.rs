use std::{borrow::Cow, collections::BTreeMap};

use super::{
    config::GltfConfig,
    diagnostics::Diagnostics,
    document::{Document, ImageRecord, TextureRecord},
    error::{ConvertError, Result},
    extensions::{EXT_TEXTURE_WEBP, KHR_TEXTURE_KTX},
    internal::{
        GltfBufferView, GltfImage, GltfSampler, GltfTexture, GltfTextureSource, CLAMP_TO_EDGE,
        LINEAR, LINEAR_MIPMAP_LINEAR, LINEAR_MIPMAP_NEAREST, MIRRORED_REPEAT, NEAREST,
        NEAREST_MIPMAP_LINEAR, NEAREST_MIPMAP_NEAREST, REPEAT,
    },
};
use crate::conversion::{
    Image, ImageConverter, SamplerFilter, SamplerMipmap, SamplerWrapping, Texture, TextureKind,
};

/// Encodes an image with the configured converter and bundles the result
/// into the buffer.
pub fn add_image(
    document: &mut Document,
    diagnostics: &mut Diagnostics,
    config: &GltfConfig,
    converters: &[Box<dyn ImageConverter>],
    image: &Image,
) -> Result<()> {
    if image.is_3d() {
        return Err(ConvertError::Image(String::from(
            "3D images are not supported",
        )));
    }

    let converter_name = if image.array {
        if !config.experimental_khr_texture_ktx {
            return Err(ConvertError::Image(String::from(
                "array images can be exported only if experimentalKhrTextureKtx is enabled",
            )));
        }
        config.array_image_converter.as_deref().ok_or_else(|| {
            ConvertError::Image(String::from(
                "no arrayImageConverter configured for array images",
            ))
        })?
    } else {
        config.image_converter.as_str()
    };

    let converter = converters
        .iter()
        .find(|converter| converter.name() == converter_name)
        .ok_or_else(|| {
            ConvertError::Image(format!(
                "image converter {} is not available",
                converter_name
            ))
        })?;

    let features = converter.features();
    if !features.convert_data {
        return Err(ConvertError::Image(format!(
            "{} doesn't support converting images to data",
            converter_name
        )));
    }
    if image.format.is_compressed() && !features.compressed {
        return Err(ConvertError::Image(format!(
            "{} doesn't support compressed images",
            converter_name
        )));
    }
    if image.array && !features.arrays {
        return Err(ConvertError::Image(format!(
            "{} doesn't support array images",
            converter_name
        )));
    }
    let declared_mime_type = converter.mime_type().ok_or_else(|| {
        ConvertError::Image(format!(
            "{} doesn't declare a MIME type, can't use it for glTF images",
            converter_name
        ))
    })?;

    let image = if image.levels.len() > 1 && !features.levels {
        diagnostics.warning(format!(
            "{} doesn't support multiple image levels, exporting only the base level",
            converter_name
        ));
        let mut base = image.clone();
        base.levels.truncate(1);
        Cow::Owned(base)
    } else {
        Cow::Borrowed(image)
    };

    let encoded = converter.convert(&image).map_err(|reason| {
        ConvertError::Image(format!(
            "{} failed to convert the image: {}",
            converter_name, reason
        ))
    })?;
    let mime_type = if encoded.mime_type.is_empty() {
        declared_mime_type.to_string()
    } else {
        encoded.mime_type
    };

    let extension = match mime_type.as_str() {
        "image/png" | "image/jpeg" => None,
        "image/ktx2" => {
            if !config.experimental_khr_texture_ktx {
                return Err(ConvertError::Image(String::from(
                    "KTX2 images can be exported only if experimentalKhrTextureKtx is enabled",
                )));
            }
            Some(KHR_TEXTURE_KTX)
        }
        "image/webp" => Some(EXT_TEXTURE_WEBP),
        other => {
            config.strict_check(
                diagnostics,
                &format!("{} is not a valid MIME type for a glTF image", other),
                &format!("strict mode disabled, exporting an image with {}", other),
            )?;
            None
        }
    };
    if image.array && extension != Some(KHR_TEXTURE_KTX) {
        return Err(ConvertError::Image(format!(
            "array images can be exported only as KTX2, got {}",
            mime_type
        )));
    }
    if let Some(extension) = extension {
        document.extensions.mark_used(extension);
    }

    let byte_offset = document.buffer.append(&encoded.bytes, 4);
    document.buffer.align(4);
    let buffer_view = document.buffer_views.len() as u32;
    document.buffer_views.push(GltfBufferView {
        buffer: 0,
        byte_offset,
        byte_length: encoded.bytes.len(),
        byte_stride: None,
        target: None,
        name: None,
    });

    document.images.push(ImageRecord {
        gltf: GltfImage {
            buffer_view,
            mime_type,
            name: (!image.name.is_empty()).then(|| image.name.clone()),
        },
        extension,
        layer_count: image.layer_count(),
        array: image.array,
    });
    Ok(())
}

/// Adds a texture referencing an already added image, sharing the sampler
/// with earlier textures if it's the same.
pub fn add_texture(document: &mut Document, config: &GltfConfig, texture: &Texture) -> Result<()> {
    let image = document.images.get(texture.image as usize).ok_or_else(|| {
        ConvertError::Texture(format!(
            "image {} out of range for {} images",
            texture.image,
            document.images.len()
        ))
    })?;

    let layer_count = match texture.kind {
        TextureKind::Texture2D if !image.array => 1,
        TextureKind::Texture2DArray if image.array => image.layer_count,
        TextureKind::Texture2D | TextureKind::Texture2DArray => {
            return Err(ConvertError::Texture(format!(
                "expected a {} image for a {:?} texture",
                if image.array { "2D" } else { "2D array" },
                texture.kind
            )))
        }
        kind => {
            return Err(ConvertError::Texture(format!(
                "unsupported texture type {:?}",
                kind
            )))
        }
    };
    let extension = image.extension;

    let sampler = GltfSampler {
        mag_filter: Some(filter(texture.magnification)),
        min_filter: Some(minification_filter(texture.minification, texture.mipmap)),
        wrap_s: wrapping(config, texture.wrapping[0])?,
        wrap_t: wrapping(config, texture.wrapping[1])?,
    };
    let existing = document.samplers.iter().position(|other| *other == sampler);
    let sampler = match existing {
        Some(index) => index,
        None => {
            document.samplers.push(sampler);
            document.samplers.len() - 1
        }
    } as u32;

    let mut gltf = GltfTexture {
        sampler,
        source: Some(texture.image),
        extensions: BTreeMap::new(),
        name: (!texture.name.is_empty()).then(|| texture.name.clone()),
    };
    if let Some(extension) = extension {
        document.extensions.mark_required(extension);
        gltf.source = None;
        gltf.extensions.insert(
            extension,
            GltfTextureSource {
                source: texture.image,
            },
        );
    }

    document.textures.push(TextureRecord { gltf, layer_count });
    Ok(())
}

fn filter(filter: SamplerFilter) -> u32 {
    match filter {
        SamplerFilter::Nearest => NEAREST,
        SamplerFilter::Linear => LINEAR,
    }
}

fn minification_filter(filter: SamplerFilter, mipmap: SamplerMipmap) -> u32 {
    match (filter, mipmap) {
        (SamplerFilter::Nearest, SamplerMipmap::Base) => NEAREST,
        (SamplerFilter::Linear, SamplerMipmap::Base) => LINEAR,
        (SamplerFilter::Nearest, SamplerMipmap::Nearest) => NEAREST_MIPMAP_NEAREST,
        (SamplerFilter::Linear, SamplerMipmap::Nearest) => LINEAR_MIPMAP_NEAREST,
        (SamplerFilter::Nearest, SamplerMipmap::Linear) => NEAREST_MIPMAP_LINEAR,
        (SamplerFilter::Linear, SamplerMipmap::Linear) => LINEAR_MIPMAP_LINEAR,
    }
}

fn wrapping(config: &GltfConfig, wrapping: SamplerWrapping) -> Result<Option<u32>> {
    Ok(match wrapping {
        SamplerWrapping::Repeat if !config.keep_defaults => None,
        SamplerWrapping::Repeat => Some(REPEAT),
        SamplerWrapping::MirroredRepeat => Some(MIRRORED_REPEAT),
        SamplerWrapping::ClampToEdge => Some(CLAMP_TO_EDGE),
        SamplerWrapping::ClampToBorder | SamplerWrapping::MirrorClampToEdge => {
            return Err(ConvertError::Texture(format!(
                "unsupported texture wrapping {:?}",
                wrapping
            )))
        }
    })
}
