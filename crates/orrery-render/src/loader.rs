//! Texture loading: local files or `http(s)` URLs, decoded and flipped into
//! texture orientation, all fetched concurrently.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use orrery_config::TextureDef;
use orrery_shading::TextureImage;
use rayon::prelude::*;

/// Errors that can occur while loading a texture.
#[derive(Debug, thiserror::Error)]
pub enum TextureLoadError {
    /// The HTTP request failed or returned an error status.
    #[error("failed to fetch texture '{name}' from {url}: {source}")]
    Fetch {
        name: String,
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    /// The file or response body could not be read.
    #[error("failed to read texture '{name}' from {location}: {source}")]
    Io {
        name: String,
        location: String,
        #[source]
        source: std::io::Error,
    },

    /// The bytes are not a supported image format.
    #[error("failed to decode texture '{name}': {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    /// The image decoded to zero width or height.
    #[error("texture '{name}' has zero size")]
    ZeroSize { name: String },
}

/// A decoded texture ready for upload.
#[derive(Clone, Debug)]
pub struct LoadedTexture {
    /// Sampler uniform name.
    pub name: String,
    pub unit: u32,
    pub image: TextureImage,
}

/// Where a texture's bytes come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextureLocation {
    Url(String),
    File(PathBuf),
}

impl TextureLocation {
    /// `http://` and `https://` are fetched; anything else is a path under
    /// `asset_root` (absolute paths stay absolute).
    pub fn resolve(url: &str, asset_root: &Path) -> Self {
        if url.starts_with("http://") || url.starts_with("https://") {
            TextureLocation::Url(url.to_string())
        } else {
            TextureLocation::File(asset_root.join(url))
        }
    }

    fn describe(&self) -> String {
        match self {
            TextureLocation::Url(url) => url.clone(),
            TextureLocation::File(path) => path.display().to_string(),
        }
    }
}

/// Load every texture in `defs`. All loads run in parallel and the call
/// returns once each has finished; any failure fails the whole batch.
pub fn load_textures(
    defs: &BTreeMap<String, TextureDef>,
    asset_root: &Path,
) -> Result<Vec<LoadedTexture>, TextureLoadError> {
    let loaded = defs
        .par_iter()
        .map(|(name, def)| {
            let location = TextureLocation::resolve(&def.url, asset_root);
            let image = load_texture(name, &location)?;
            log::info!(
                "Loaded texture '{name}' ({}x{}, {:?}) from {}",
                image.width(),
                image.height(),
                image.wrap(),
                location.describe()
            );
            Ok(LoadedTexture {
                name: name.clone(),
                unit: def.unit,
                image,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(loaded)
}

/// Load and decode one texture.
pub fn load_texture(name: &str, location: &TextureLocation) -> Result<TextureImage, TextureLoadError> {
    let bytes = read_bytes(name, location)?;
    let decoded = image::load_from_memory(&bytes).map_err(|source| TextureLoadError::Decode {
        name: name.to_string(),
        source,
    })?;
    to_texture(name, decoded)
}

fn read_bytes(name: &str, location: &TextureLocation) -> Result<Vec<u8>, TextureLoadError> {
    let io_error = |source| TextureLoadError::Io {
        name: name.to_string(),
        location: location.describe(),
        source,
    };
    match location {
        TextureLocation::File(path) => std::fs::read(path).map_err(io_error),
        TextureLocation::Url(url) => {
            let response = ureq::get(url).call().map_err(|e| TextureLoadError::Fetch {
                name: name.to_string(),
                url: url.clone(),
                source: Box::new(e),
            })?;
            let mut bytes = Vec::new();
            response
                .into_reader()
                .read_to_end(&mut bytes)
                .map_err(io_error)?;
            Ok(bytes)
        }
    }
}

/// Convert to RGBA8 and flip so the bottom image row is sampled at v = 0.
pub fn to_texture(name: &str, decoded: DynamicImage) -> Result<TextureImage, TextureLoadError> {
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(TextureLoadError::ZeroSize {
            name: name.to_string(),
        });
    }
    let flipped = image::imageops::flip_vertical(&decoded.to_rgba8());
    Ok(TextureImage::new(flipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use orrery_config::UniformKind;
    use orrery_shading::WrapMode;

    fn write_png(dir: &Path, file: &str, width: u32, height: u32) {
        let img = RgbaImage::from_fn(width, height, |_, y| {
            if y == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        img.save(dir.join(file)).unwrap();
    }

    fn def(url: &str, unit: u32) -> TextureDef {
        TextureDef {
            url: url.to_string(),
            kind: UniformKind::Sampler,
            unit,
        }
    }

    #[test]
    fn test_resolve_distinguishes_urls_and_paths() {
        let root = Path::new("/srv/assets");
        assert_eq!(
            TextureLocation::resolve("https://example.com/a.png", root),
            TextureLocation::Url("https://example.com/a.png".to_string())
        );
        assert_eq!(
            TextureLocation::resolve("textures/a.png", root),
            TextureLocation::File(PathBuf::from("/srv/assets/textures/a.png"))
        );
        assert_eq!(
            TextureLocation::resolve("/tmp/a.png", root),
            TextureLocation::File(PathBuf::from("/tmp/a.png"))
        );
    }

    #[test]
    fn test_flip_puts_top_row_last() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", 2, 4);
        let image = load_texture("a", &TextureLocation::File(dir.path().join("a.png"))).unwrap();
        // Top row of the file (red) ends up as the last texture row.
        assert_eq!(image.pixels().get_pixel(0, 3).0, [255, 0, 0, 255]);
        assert_eq!(image.pixels().get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(image.wrap(), WrapMode::Repeat);
    }

    #[test]
    fn test_non_power_of_two_clamps() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "odd.png", 3, 5);
        let image = load_texture("odd", &TextureLocation::File(dir.path().join("odd.png"))).unwrap();
        assert_eq!(image.wrap(), WrapMode::ClampToEdge);
        assert_eq!(image.mip_level_count(), 1);
    }

    #[test]
    fn test_batch_loads_every_texture() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", 4, 4);
        write_png(dir.path(), "b.png", 8, 2);
        let mut defs = BTreeMap::new();
        defs.insert("uA".to_string(), def("a.png", 0));
        defs.insert("uB".to_string(), def("b.png", 3));

        let loaded = load_textures(&defs, dir.path()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].name, "uA");
        assert_eq!(loaded[1].unit, 3);
        assert_eq!(loaded[1].image.width(), 8);
    }

    #[test]
    fn test_batch_fails_when_one_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", 4, 4);
        let mut defs = BTreeMap::new();
        defs.insert("uA".to_string(), def("a.png", 0));
        defs.insert("uMissing".to_string(), def("missing.png", 1));

        let err = load_textures(&defs, dir.path()).unwrap_err();
        assert!(matches!(err, TextureLoadError::Io { ref name, .. } if name == "uMissing"));
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.png"), b"not an image").unwrap();
        let err = load_texture("bad", &TextureLocation::File(dir.path().join("bad.png"))).unwrap_err();
        assert!(matches!(err, TextureLoadError::Decode { .. }));
    }

    #[test]
    fn test_empty_batch_is_ok() {
        let loaded = load_textures(&BTreeMap::new(), Path::new(".")).unwrap();
        assert!(loaded.is_empty());
    }
}
