// Copyright 2006 The Android Open Source Project
// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

/// 8-bit type for an alpha value. 255 is 100% opaque, zero is 100% transparent.
pub type AlphaU8 = u8;

/// Represents fully transparent AlphaU8 value.
pub const ALPHA_U8_TRANSPARENT: AlphaU8 = 0x00;

/// Represents fully opaque AlphaU8 value.
pub const ALPHA_U8_OPAQUE: AlphaU8 = 0xFF;

/// An 8-bit per channel RGBA color.
///
/// Palettes store colors with an opaque alpha, which is ignored.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl Color {
    /// A black color.
    pub const BLACK: Color = Color::from_rgb(0, 0, 0);
    /// A white color.
    pub const WHITE: Color = Color::from_rgb(255, 255, 255);

    /// Creates a new opaque color.
    #[inline]
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: ALPHA_U8_OPAQUE }
    }

    /// Creates a new color.
    #[inline]
    pub const fn from_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    /// Returns color's red component.
    #[inline]
    pub const fn red(self) -> u8 {
        self.r
    }

    /// Returns color's green component.
    #[inline]
    pub const fn green(self) -> u8 {
        self.g
    }

    /// Returns color's blue component.
    #[inline]
    pub const fn blue(self) -> u8 {
        self.b
    }

    /// Returns color's alpha component.
    #[inline]
    pub const fn alpha(self) -> u8 {
        self.a
    }

    /// Check that color is opaque.
    ///
    /// Alpha == 255
    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.a == ALPHA_U8_OPAQUE
    }

    /// Checks that the RGB part is pure white. Alpha is ignored.
    #[inline]
    pub(crate) fn is_white(&self) -> bool {
        self.r == 0xFF && self.g == 0xFF && self.b == 0xFF
    }

    /// Squared euclidean distance between two colors in RGB space.
    #[inline]
    pub(crate) fn distance_sq(&self, other: &Color) -> u32 {
        let dr = i32::from(self.r) - i32::from(other.r);
        let dg = i32::from(self.g) - i32::from(other.g);
        let db = i32::from(self.b) - i32::from(other.b);
        (dr * dr + dg * dg + db * db) as u32
    }
}

impl core::fmt::Debug for Color {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Color")
            .field("r", &self.r)
            .field("g", &self.g)
            .field("b", &self.b)
            .field("a", &self.a)
            .finish()
    }
}

/// Return a/255, rounding any fractional bits.
///
/// `a` must be <= 255 * 255.
#[inline]
pub(crate) fn div255(a: u32) -> u32 {
    let prod = a + 128;
    (prod + (prod >> 8)) >> 8
}

/// Return c*a/255, rounding any fractional bits.
#[inline]
pub(crate) fn mul_u8(c: u8, a: u8) -> u8 {
    div255(u32::from(c) * u32::from(a)) as u8
}

/// Blends `src` over `dst` with `alpha` coverage.
///
/// `dst + (src - dst) * alpha / 255`, rounded to the nearest integer.
#[inline]
pub(crate) fn blend_u8(src: u8, dst: u8, alpha: u8) -> u8 {
    let a = u32::from(alpha);
    div255(u32::from(src) * a + u32::from(dst) * (255 - a)) as u8
}
