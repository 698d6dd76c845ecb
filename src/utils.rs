use gpui::{Hsla, Pixels, Rgba};

pub trait PixelsExt {
    fn as_f32(&self) -> f32;
}

impl PixelsExt for Pixels {
    fn as_f32(&self) -> f32 {
        f32::from(*self)
    }
}

/// Gradient colors are RGBA; GPUI paints with HSLA.
pub fn to_hsla(color: Rgba) -> Hsla {
    Hsla::from(color)
}
