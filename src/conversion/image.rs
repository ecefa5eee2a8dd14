/// Represents raw pixel data of a 2D image or a 2D array image.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    pub name: String,
    pub format: PixelFormat,
    /// Width, height and depth. The depth is the layer count of array images
    /// and 1 for plain 2D images.
    pub size: [u32; 3],
    /// Pixel data of each mip level, base level first.
    pub levels: Vec<Vec<u8>>,
    /// The depth of the image is a list of layers rather than a volume.
    pub array: bool,
}

impl Image {
    pub fn new_2d(format: PixelFormat, size: [u32; 2], data: Vec<u8>) -> Self {
        Self {
            name: String::new(),
            format,
            size: [size[0], size[1], 1],
            levels: vec![data],
            array: false,
        }
    }

    pub fn new_2d_array(format: PixelFormat, size: [u32; 3], data: Vec<u8>) -> Self {
        Self {
            name: String::new(),
            format,
            size,
            levels: vec![data],
            array: true,
        }
    }

    pub fn is_3d(&self) -> bool {
        !self.array && self.size[2] > 1
    }

    /// The number of layers addressable by a texture sampling this image.
    pub fn layer_count(&self) -> u32 {
        if self.array {
            self.size[2]
        } else {
            1
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    R8Unorm,
    RG8Unorm,
    RGB8Unorm,
    RGBA8Unorm,
    R16Unorm,
    RGBA16Unorm,
    R32F,
    RGBA32F,
    Compressed(CompressedPixelFormat),
}

impl PixelFormat {
    pub fn is_compressed(&self) -> bool {
        matches!(self, Self::Compressed(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompressedPixelFormat {
    Bc1RGBAUnorm,
    Bc3RGBAUnorm,
    Bc7RGBAUnorm,
    Etc2RGB8Unorm,
    Astc4x4RGBAUnorm,
}

/// Represents a texture, which is an image combined with sampler state.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    pub name: String,
    pub kind: TextureKind,
    /// An index into the images added to the exporter.
    pub image: u32,
    pub minification: SamplerFilter,
    pub magnification: SamplerFilter,
    pub mipmap: SamplerMipmap,
    /// Wrapping along the S, T and R coordinates.
    pub wrapping: [SamplerWrapping; 3],
}

impl Texture {
    pub fn new(kind: TextureKind, image: u32) -> Self {
        Self {
            name: String::new(),
            kind,
            image,
            minification: SamplerFilter::Linear,
            magnification: SamplerFilter::Linear,
            mipmap: SamplerMipmap::Linear,
            wrapping: [SamplerWrapping::Repeat; 3],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureKind {
    Texture1D,
    Texture1DArray,
    Texture2D,
    Texture2DArray,
    Texture3D,
    CubeMap,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplerFilter {
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplerMipmap {
    /// Sample only the base level.
    Base,
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplerWrapping {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
    MirrorClampToEdge,
}

/// Capabilities an [`ImageConverter`] advertises. Exporters check them before
/// handing over an image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImageConverterFeatures {
    /// Can encode into an in-memory blob.
    pub convert_data: bool,
    /// Can encode directly into a file.
    pub convert_file: bool,
    /// Accepts block-compressed pixel formats.
    pub compressed: bool,
    /// Accepts more than one mip level.
    pub levels: bool,
    /// Accepts array images.
    pub arrays: bool,
}

/// The result of encoding an image.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Defines a type that can encode raw pixel data into an image file format.
pub trait ImageConverter {
    /// The name used to select the converter in exporter configuration.
    fn name(&self) -> &str;
    fn features(&self) -> ImageConverterFeatures;
    /// The MIME type of the produced files, if the converter declares one.
    fn mime_type(&self) -> Option<&str>;
    /// Encodes all levels of the image. Fails with a human-readable reason.
    fn convert(&self, image: &Image) -> Result<EncodedImage, String>;
}
