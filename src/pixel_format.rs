// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::rc::Rc;

use crate::color::{AlphaU8, ALPHA_U8_OPAQUE};
use crate::palette::{Palette, SharedPalette};
use crate::{Color, Error};

/// Describes how a single pixel is encoded.
///
/// Formats up to 8 bits per pixel are paletted, deeper formats are direct color
/// described by channel masks. A paletted format can still carry masks,
/// in which case its palette is derived from them.
#[derive(Clone)]
pub struct PixelFormat {
    palette: Option<SharedPalette>,
    bits_per_pixel: u8,
    bytes_per_pixel: u8,
    r_loss: u8,
    g_loss: u8,
    b_loss: u8,
    a_loss: u8,
    r_shift: u8,
    g_shift: u8,
    b_shift: u8,
    a_shift: u8,
    r_mask: u32,
    g_mask: u32,
    b_mask: u32,
    a_mask: u32,
    colorkey: u32,
    alpha: AlphaU8,
}

impl PixelFormat {
    /// Creates a new pixel format.
    ///
    /// When all masks are zero and the depth is above 8 bits,
    /// the bit budget is split evenly between R, G and B (e.g. 565 for 16 bits).
    /// Depths up to 8 bits get a palette: derived from masks when present,
    /// white/black for 1 bit and a grayscale ramp otherwise.
    pub fn new(
        bits_per_pixel: u8,
        r_mask: u32,
        g_mask: u32,
        b_mask: u32,
        a_mask: u32,
    ) -> Result<Self, Error> {
        if bits_per_pixel == 0 || bits_per_pixel > 32 {
            return Err(Error::InvalidDepth(bits_per_pixel));
        }

        if bits_per_pixel < 8 && !matches!(bits_per_pixel, 1 | 2 | 4) {
            return Err(Error::InvalidDepth(bits_per_pixel));
        }

        let has_masks = (r_mask | g_mask | b_mask | a_mask) != 0;
        let (r_mask, g_mask, b_mask) = if !has_masks && bits_per_pixel > 8 {
            default_masks(bits_per_pixel)
        } else {
            (r_mask, g_mask, b_mask)
        };

        validate_masks(bits_per_pixel, &[r_mask, g_mask, b_mask, a_mask])?;

        let (r_shift, r_loss) = shift_and_loss(r_mask);
        let (g_shift, g_loss) = shift_and_loss(g_mask);
        let (b_shift, b_loss) = shift_and_loss(b_mask);
        let (a_shift, a_loss) = shift_and_loss(a_mask);

        let mut format = PixelFormat {
            palette: None,
            bits_per_pixel,
            bytes_per_pixel: (bits_per_pixel + 7) / 8,
            r_loss,
            g_loss,
            b_loss,
            a_loss,
            r_shift,
            g_shift,
            b_shift,
            a_shift,
            r_mask,
            g_mask,
            b_mask,
            a_mask,
            colorkey: 0,
            alpha: ALPHA_U8_OPAQUE,
        };

        if bits_per_pixel <= 8 {
            let palette = if has_masks {
                format.palette_from_masks()?
            } else {
                Palette::default_for_depth(bits_per_pixel)?
            };
            format.palette = Some(palette.into_shared());
        }

        Ok(format)
    }

    /// An 8-bit paletted format with a grayscale palette.
    pub fn indexed8() -> Self {
        // Cannot fail, a 256 entries palette is tiny.
        Self::new(8, 0, 0, 0, 0).unwrap()
    }

    /// A 16-bit RGB 5-6-5 format.
    pub fn rgb565() -> Self {
        Self::new(16, 0xF800, 0x07E0, 0x001F, 0).unwrap()
    }

    /// A 15-bit RGB 5-5-5 format stored in 16 bits.
    pub fn rgb555() -> Self {
        Self::new(15, 0x7C00, 0x03E0, 0x001F, 0).unwrap()
    }

    /// A 24-bit packed RGB format.
    pub fn rgb24() -> Self {
        Self::new(24, 0xFF0000, 0x00FF00, 0x0000FF, 0).unwrap()
    }

    /// A 32-bit XRGB format. The top byte is unused.
    pub fn xrgb8888() -> Self {
        Self::new(32, 0xFF0000, 0x00FF00, 0x0000FF, 0).unwrap()
    }

    /// A 32-bit ARGB format.
    pub fn argb8888() -> Self {
        Self::new(32, 0xFF0000, 0x00FF00, 0x0000FF, 0xFF000000).unwrap()
    }

    /// A 32-bit ABGR format. On little-endian hosts the byte order is RGBA.
    pub fn abgr8888() -> Self {
        Self::new(32, 0x0000FF, 0x00FF00, 0xFF0000, 0xFF000000).unwrap()
    }

    /// A 32-bit format with R, G, B, A bytes in memory order on any host.
    pub fn rgba32() -> Self {
        if cfg!(target_endian = "little") {
            Self::abgr8888()
        } else {
            Self::new(32, 0xFF000000, 0x00FF0000, 0x0000FF00, 0x000000FF).unwrap()
        }
    }

    /// Returns the number of bits per pixel.
    #[inline]
    pub fn bits_per_pixel(&self) -> u8 {
        self.bits_per_pixel
    }

    /// Returns the number of bytes per pixel.
    ///
    /// Packed formats report 1.
    #[inline]
    pub fn bytes_per_pixel(&self) -> u8 {
        self.bytes_per_pixel
    }

    /// Returns R, G, B, A masks.
    #[inline]
    pub fn masks(&self) -> [u32; 4] {
        [self.r_mask, self.g_mask, self.b_mask, self.a_mask]
    }

    /// Returns R, G, B, A shifts.
    #[inline]
    pub fn shifts(&self) -> [u8; 4] {
        [self.r_shift, self.g_shift, self.b_shift, self.a_shift]
    }

    /// Returns R, G, B, A precision losses, in bits, relative to 8-bit channels.
    #[inline]
    pub fn losses(&self) -> [u8; 4] {
        [self.r_loss, self.g_loss, self.b_loss, self.a_loss]
    }

    /// Returns the alpha mask.
    #[inline]
    pub fn a_mask(&self) -> u32 {
        self.a_mask
    }

    /// Checks that the format has a per-pixel alpha channel.
    #[inline]
    pub fn has_alpha_channel(&self) -> bool {
        self.a_mask != 0
    }

    /// Returns the palette, if any.
    #[inline]
    pub fn palette(&self) -> Option<&SharedPalette> {
        self.palette.as_ref()
    }

    /// Checks that the format is paletted.
    #[inline]
    pub fn is_paletted(&self) -> bool {
        self.palette.is_some()
    }

    /// Returns the colorkey pixel value.
    #[inline]
    pub fn colorkey(&self) -> u32 {
        self.colorkey
    }

    /// Returns the per-surface alpha.
    #[inline]
    pub fn alpha(&self) -> AlphaU8 {
        self.alpha
    }

    #[inline]
    pub(crate) fn set_colorkey(&mut self, key: u32) {
        self.colorkey = key;
    }

    #[inline]
    pub(crate) fn set_alpha(&mut self, alpha: AlphaU8) {
        self.alpha = alpha;
    }

    pub(crate) fn replace_palette(&mut self, palette: Option<SharedPalette>) -> Option<SharedPalette> {
        core::mem::replace(&mut self.palette, palette)
    }

    /// Checks that both formats encode pixels identically.
    ///
    /// Paletted formats must also have equal palette colors.
    pub fn same_layout(&self, other: &PixelFormat) -> bool {
        if self.bits_per_pixel != other.bits_per_pixel || self.masks() != other.masks() {
            return false;
        }

        match (&self.palette, &other.palette) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (None, None) => true,
            _ => false,
        }
    }

    /// Maps an opaque RGB triple to a pixel value.
    ///
    /// Paletted formats return the closest palette index.
    /// Direct formats with an alpha channel get a fully opaque alpha.
    pub fn map_rgb(&self, r: u8, g: u8, b: u8) -> u32 {
        match self.palette {
            Some(ref palette) => u32::from(palette.borrow().find_color(Color::from_rgb(r, g, b))),
            None => self.pack(r, g, b) | self.a_mask,
        }
    }

    /// Maps an RGBA quadruple to a pixel value.
    ///
    /// Alpha is ignored by formats without an alpha channel.
    pub fn map_rgba(&self, r: u8, g: u8, b: u8, a: u8) -> u32 {
        match self.palette {
            Some(ref palette) => u32::from(palette.borrow().find_color(Color::from_rgb(r, g, b))),
            None => self.pack(r, g, b) | shrink(a, self.a_mask, self.a_shift, self.a_loss),
        }
    }

    /// Maps a color to a pixel value.
    #[inline]
    pub fn map_color(&self, c: Color) -> u32 {
        self.map_rgba(c.red(), c.green(), c.blue(), c.alpha())
    }

    /// Unpacks a pixel value into RGB, ignoring alpha.
    pub fn get_rgb(&self, pixel: u32) -> (u8, u8, u8) {
        let c = self.get_rgba(pixel);
        (c.red(), c.green(), c.blue())
    }

    /// Unpacks a pixel value into a color.
    ///
    /// Formats without an alpha channel produce opaque colors.
    /// An out of range palette index produces black.
    pub fn get_rgba(&self, pixel: u32) -> Color {
        match self.palette {
            Some(ref palette) => palette.borrow().color(pixel as usize).unwrap_or(Color::BLACK),
            None => {
                let r = expand(pixel, self.r_mask, self.r_shift, self.r_loss);
                let g = expand(pixel, self.g_mask, self.g_shift, self.g_loss);
                let b = expand(pixel, self.b_mask, self.b_shift, self.b_loss);
                let a = if self.a_mask != 0 {
                    expand(pixel, self.a_mask, self.a_shift, self.a_loss)
                } else {
                    ALPHA_U8_OPAQUE
                };

                Color::from_rgba(r, g, b, a)
            }
        }
    }

    /// Returns pixel's alpha. Opaque for formats without an alpha channel.
    #[inline]
    pub(crate) fn pixel_alpha(&self, pixel: u32) -> AlphaU8 {
        if self.a_mask != 0 {
            expand(pixel, self.a_mask, self.a_shift, self.a_loss)
        } else {
            ALPHA_U8_OPAQUE
        }
    }

    #[inline]
    fn pack(&self, r: u8, g: u8, b: u8) -> u32 {
        shrink(r, self.r_mask, self.r_shift, self.r_loss)
            | shrink(g, self.g_mask, self.g_shift, self.g_loss)
            | shrink(b, self.b_mask, self.b_shift, self.b_loss)
    }

    // Quantizes each mask bit range into evenly spaced channel values.
    fn palette_from_masks(&self) -> Result<Palette, Error> {
        let mut palette = Palette::new(1 << self.bits_per_pixel)?;
        let colors: Vec<Color> = (0..palette.len() as u32)
            .map(|i| {
                Color::from_rgb(
                    expand(i, self.r_mask, self.r_shift, self.r_loss),
                    expand(i, self.g_mask, self.g_shift, self.g_loss),
                    expand(i, self.b_mask, self.b_shift, self.b_loss),
                )
            })
            .collect();
        palette.set_colors(0, &colors);
        Ok(palette)
    }
}

impl core::fmt::Debug for PixelFormat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PixelFormat")
            .field("bits_per_pixel", &self.bits_per_pixel)
            .field("masks", &format_args!(
                "{:#x} {:#x} {:#x} {:#x}", self.r_mask, self.g_mask, self.b_mask, self.a_mask
            ))
            .field("palette", &self.palette.as_ref().map(|p| p.borrow().len()))
            .field("colorkey", &self.colorkey)
            .field("alpha", &self.alpha)
            .finish()
    }
}

fn default_masks(bits_per_pixel: u8) -> (u32, u32, u32) {
    let bpp = u32::from(bits_per_pixel.min(24));
    let r_loss = 8 - bpp / 3;
    let g_loss = 8 - bpp / 3 - bpp % 3;
    let b_loss = 8 - bpp / 3;
    let r_shift = (bpp / 3 + bpp % 3) + bpp / 3;
    let g_shift = bpp / 3;
    (
        (0xFF >> r_loss) << r_shift,
        (0xFF >> g_loss) << g_shift,
        0xFF >> b_loss,
    )
}

fn validate_masks(bits_per_pixel: u8, masks: &[u32; 4]) -> Result<(), Error> {
    let limit = if bits_per_pixel >= 32 { u32::MAX } else { (1u32 << bits_per_pixel) - 1 };
    let mut seen = 0u32;
    for &mask in masks {
        if mask & !limit != 0 || mask & seen != 0 {
            return Err(Error::InvalidMasks);
        }

        seen |= mask;
    }

    Ok(())
}

// Returns the first set bit and the precision lost relative to 8 bits.
fn shift_and_loss(mask: u32) -> (u8, u8) {
    if mask == 0 {
        return (0, 8);
    }

    let shift = mask.trailing_zeros();
    let bits = (mask >> shift).trailing_ones();
    (shift as u8, 8u32.saturating_sub(bits) as u8)
}

// Drops the low bits of a channel and moves it into place.
// A missing channel has a loss of 8.
#[inline]
fn shrink(v: u8, mask: u32, shift: u8, loss: u8) -> u32 {
    if mask == 0 {
        return 0;
    }

    ((u32::from(v) >> loss) << shift) & mask
}

// Extracts a channel and scales it to the full 0..=255 range.
#[inline]
fn expand(pixel: u32, mask: u32, shift: u8, loss: u8) -> u8 {
    if mask == 0 {
        return 0;
    }

    let v = (pixel & mask) >> shift;
    match loss {
        0 => {
            // Channels wider than 8 bits keep their top byte.
            let bits = 32 - (mask >> shift).leading_zeros();
            (v >> bits.saturating_sub(8)) as u8
        }
        8 => 0,
        _ => {
            let max = (1u32 << (8 - loss)) - 1;
            ((v * 255 + max / 2) / max) as u8
        }
    }
}

/// Reads a pixel of 1 to 4 bytes.
///
/// 2 and 4 byte pixels are in native byte order.
/// 3 byte pixels are stored as a packed 24-bit value in native byte order as well.
#[inline]
pub(crate) fn read_pixel(bytes: &[u8], bpp: usize) -> u32 {
    match bpp {
        1 => u32::from(bytes[0]),
        2 => u32::from(u16::from_ne_bytes(*arrayref::array_ref!(bytes, 0, 2))),
        3 => {
            let b = arrayref::array_ref!(bytes, 0, 3);
            if cfg!(target_endian = "little") {
                u32::from(b[0]) | u32::from(b[1]) << 8 | u32::from(b[2]) << 16
            } else {
                u32::from(b[2]) | u32::from(b[1]) << 8 | u32::from(b[0]) << 16
            }
        }
        _ => u32::from_ne_bytes(*arrayref::array_ref!(bytes, 0, 4)),
    }
}

/// Writes a pixel of 1 to 4 bytes. See `read_pixel`.
#[inline]
pub(crate) fn write_pixel(bytes: &mut [u8], bpp: usize, pixel: u32) {
    match bpp {
        1 => bytes[0] = pixel as u8,
        2 => bytes[..2].copy_from_slice(&(pixel as u16).to_ne_bytes()),
        3 => {
            let b = arrayref::array_mut_ref!(bytes, 0, 3);
            if cfg!(target_endian = "little") {
                *b = [pixel as u8, (pixel >> 8) as u8, (pixel >> 16) as u8];
            } else {
                *b = [(pixel >> 16) as u8, (pixel >> 8) as u8, pixel as u8];
            }
        }
        _ => bytes[..4].copy_from_slice(&pixel.to_ne_bytes()),
    }
}
