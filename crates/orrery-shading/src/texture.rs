//! Texture images and bilinear sampling with GL addressing rules.

use glam::{Vec2, Vec3, Vec4};
use image::{Rgba, RgbaImage};

/// How coordinates outside [0, 1] are folded back onto the image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WrapMode {
    Repeat,
    ClampToEdge,
}

/// An RGBA8 image in texture orientation: row 0 is sampled at v = 0.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureImage {
    pixels: RgbaImage,
    wrap: WrapMode,
}

impl TextureImage {
    /// Wrap an image already in texture orientation. Power-of-two images
    /// repeat; anything else clamps to the edge.
    pub fn new(pixels: RgbaImage) -> Self {
        let wrap = if is_power_of_two(pixels.width()) && is_power_of_two(pixels.height()) {
            WrapMode::Repeat
        } else {
            WrapMode::ClampToEdge
        };
        Self { pixels, wrap }
    }

    /// A 1x1 image of one color.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self::new(RgbaImage::from_pixel(1, 1, Rgba(rgba)))
    }

    /// The texture sampled by a slot with nothing bound.
    pub fn white() -> Self {
        Self::solid([255, 255, 255, 255])
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn wrap(&self) -> WrapMode {
        self.wrap
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Whether both dimensions are powers of two (mipmappable).
    pub fn is_power_of_two(&self) -> bool {
        self.wrap == WrapMode::Repeat
    }

    /// Number of mip levels a full chain down to 1x1 needs; 1 when the image
    /// is not mipmappable.
    pub fn mip_level_count(&self) -> u32 {
        if self.is_power_of_two() {
            32 - self.width().max(self.height()).leading_zeros()
        } else {
            1
        }
    }

    /// Bilinear sample at level 0, components in [0, 1].
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        let (w, h) = (self.width() as i64, self.height() as i64);
        let x = uv.x * w as f32 - 0.5;
        let y = uv.y * h as f32 - 0.5;
        let (x0, y0) = (x.floor(), y.floor());
        let (fx, fy) = (x - x0, y - y0);
        let (x0, y0) = (x0 as i64, y0 as i64);

        let texel = |tx: i64, ty: i64| -> Vec4 {
            let px = self.fold(tx, w);
            let py = self.fold(ty, h);
            let p = self.pixels.get_pixel(px, py).0;
            Vec4::new(p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32) / 255.0
        };

        let top = texel(x0, y0).lerp(texel(x0 + 1, y0), fx);
        let bottom = texel(x0, y0 + 1).lerp(texel(x0 + 1, y0 + 1), fx);
        top.lerp(bottom, fy)
    }

    /// RGB of [`TextureImage::sample`].
    pub fn sample_rgb(&self, uv: Vec2) -> Vec3 {
        self.sample(uv).truncate()
    }

    fn fold(&self, index: i64, size: i64) -> u32 {
        let folded = match self.wrap {
            WrapMode::Repeat => index.rem_euclid(size),
            WrapMode::ClampToEdge => index.clamp(0, size - 1),
        };
        folded as u32
    }
}

impl Default for TextureImage {
    fn default() -> Self {
        Self::white()
    }
}

/// `(v & (v - 1)) == 0` for non-zero `v`.
pub fn is_power_of_two(value: u32) -> bool {
    value != 0 && value & (value - 1) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        })
    }

    #[test]
    fn test_wrap_mode_follows_dimensions() {
        assert_eq!(TextureImage::new(checker(4, 2)).wrap(), WrapMode::Repeat);
        assert_eq!(TextureImage::new(checker(3, 2)).wrap(), WrapMode::ClampToEdge);
        assert_eq!(TextureImage::white().wrap(), WrapMode::Repeat);
    }

    #[test]
    fn test_mip_level_count() {
        assert_eq!(TextureImage::new(checker(256, 128)).mip_level_count(), 9);
        assert_eq!(TextureImage::new(checker(1, 1)).mip_level_count(), 1);
        assert_eq!(TextureImage::new(checker(300, 200)).mip_level_count(), 1);
    }

    #[test]
    fn test_texel_centers_sample_exactly() {
        let tex = TextureImage::new(checker(2, 2));
        let red = tex.sample_rgb(Vec2::new(0.25, 0.25));
        assert!((red - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-6);
        let blue = tex.sample_rgb(Vec2::new(0.75, 0.25));
        assert!((blue - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn test_bilinear_blend_between_texels() {
        let tex = TextureImage::new(checker(2, 2));
        let mid = tex.sample_rgb(Vec2::new(0.5, 0.25));
        assert!((mid - Vec3::new(0.5, 0.0, 0.5)).length() < 1e-6);
    }

    #[test]
    fn test_repeat_wraps_across_the_seam() {
        let tex = TextureImage::new(checker(2, 2));
        let a = tex.sample_rgb(Vec2::new(0.25, 0.25));
        let b = tex.sample_rgb(Vec2::new(1.25, -0.75));
        assert!((a - b).length() < 1e-5);
    }

    #[test]
    fn test_clamp_holds_edge_texel() {
        let img = RgbaImage::from_fn(3, 1, |x, _| Rgba([(x * 100) as u8, 0, 0, 255]));
        let tex = TextureImage::new(img);
        let left = tex.sample_rgb(Vec2::new(-2.0, 0.5));
        let right = tex.sample_rgb(Vec2::new(3.0, 0.5));
        assert!(left.x.abs() < 1e-6);
        assert!((right.x - 200.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_power_of_two_helper() {
        assert!(is_power_of_two(1));
        assert!(is_power_of_two(1024));
        assert!(!is_power_of_two(0));
        assert!(!is_power_of_two(768));
    }
}
