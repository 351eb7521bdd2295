// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use core::convert::TryFrom;

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use softblit_geom::Rect;

use crate::blit::{self, BlitMode, LowBlit};
use crate::blit_map::{BlitMap, FormatVersion};
use crate::color::{AlphaU8, ALPHA_U8_OPAQUE};
use crate::palette::SharedPalette;
use crate::pixel_format::read_pixel;
use crate::rle::{self, RleState};
use crate::{Error, PixelFormat};

bitflags::bitflags! {
    /// Surface state flags.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
    pub struct SurfaceFlags: u32 {
        /// Video memory surface. Never set by this crate.
        const HWSURFACE = 0x0000_0001;
        /// Colorkey blits are enabled.
        const SRCCOLORKEY = 0x0000_1000;
        /// The surface may be run-length encoded.
        const RLEACCELOK = 0x0000_2000;
        /// Pixels are currently run-length encoded.
        const RLEACCEL = 0x0000_4000;
        /// Alpha blending is enabled.
        const SRCALPHA = 0x0001_0000;
        /// Pixels are borrowed from the caller.
        const PREALLOC = 0x0100_0000;
    }
}

/// A process-unique surface identity.
///
/// Never reused, so a blit map cannot mistake a new surface for a dropped one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct SurfaceId(u64);

impl SurfaceId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        SurfaceId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

pub(crate) enum Pixels<'a> {
    Owned(Vec<u8>),
    Borrowed(&'a mut [u8]),
}

impl Pixels<'_> {
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Pixels::Owned(v) => &v[..],
            Pixels::Borrowed(v) => &v[..],
        }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Pixels::Owned(v) => &mut v[..],
            Pixels::Borrowed(v) => &mut v[..],
        }
    }
}

/// A rectangular array of pixels in a specific `PixelFormat`.
///
/// Pixels are either owned or borrowed from the caller (see `Surface::from_bytes`).
/// A surface can be run-length encoded to speed up colorkey and alpha blits,
/// in which case raw pixel access requires a `lock`.
pub struct Surface<'a> {
    id: SurfaceId,
    pub(crate) flags: SurfaceFlags,
    pub(crate) format: PixelFormat,
    width: u32,
    height: u32,
    pitch: usize,
    pub(crate) pixels: Pixels<'a>,
    clip_rect: Rect,
    locked: u32,
    pub(crate) map: BlitMap,
    version: Rc<FormatVersion>,
    pub(crate) rle: RleState,
}

impl Surface<'static> {
    /// Allocates a new surface.
    ///
    /// Pixels are zero-initialized. A format with an alpha channel enables
    /// alpha blending. The format's colorkey and alpha are reset.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Self, Error> {
        let pitch = calculate_pitch(width, format.bits_per_pixel())?;
        let len = pitch.checked_mul(height as usize).ok_or(Error::InvalidSize)?;

        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|_| Error::OutOfMemory)?;
        data.resize(len, 0);

        Ok(Surface::from_parts(width, height, pitch, Pixels::Owned(data), format, SurfaceFlags::empty()))
    }

    /// Allocates a new surface with a format made from a depth and R, G, B, A masks.
    pub fn from_masks(width: u32, height: u32, bits_per_pixel: u8, masks: [u32; 4]) -> Result<Self, Error> {
        let [r, g, b, a] = masks;
        Surface::new(width, height, PixelFormat::new(bits_per_pixel, r, g, b, a)?)
    }
}

impl<'a> Surface<'a> {
    /// Creates a surface on top of caller's pixels.
    ///
    /// Pixels are used as is and are never freed by the surface.
    /// `pitch` must fit at least a single row.
    pub fn from_bytes(
        data: &'a mut [u8],
        width: u32,
        height: u32,
        pitch: usize,
        format: PixelFormat,
    ) -> Result<Self, Error> {
        let min_pitch = row_bytes(width, format.bits_per_pixel())?;
        if pitch < min_pitch {
            return Err(Error::InvalidSize);
        }

        if height != 0 {
            let len = pitch
                .checked_mul(height as usize - 1)
                .and_then(|n| n.checked_add(min_pitch))
                .ok_or(Error::InvalidSize)?;
            if data.len() < len {
                return Err(Error::BufferTooSmall);
            }
        }

        Ok(Surface::from_parts(width, height, pitch, Pixels::Borrowed(data), format, SurfaceFlags::PREALLOC))
    }

    fn from_parts(
        width: u32,
        height: u32,
        pitch: usize,
        pixels: Pixels<'a>,
        mut format: PixelFormat,
        mut flags: SurfaceFlags,
    ) -> Self {
        format.set_colorkey(0);
        format.set_alpha(ALPHA_U8_OPAQUE);
        if format.has_alpha_channel() {
            flags |= SurfaceFlags::SRCALPHA;
        }

        let version = Rc::new(FormatVersion::default());
        if let Some(palette) = format.palette() {
            palette.borrow_mut().add_watcher(&version);
        }

        Surface {
            id: SurfaceId::next(),
            flags,
            format,
            width,
            height,
            pitch,
            pixels,
            clip_rect: Rect::from_xywh(0, 0, width, height).unwrap_or_else(|| Rect::empty_at(0, 0)),
            locked: 0,
            map: BlitMap::default(),
            version,
            rle: RleState::Raw,
        }
    }

    /// Returns surface's width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns surface's height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the number of bytes between two rows.
    #[inline]
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    /// Returns surface's pixel format.
    #[inline]
    pub fn format(&self) -> &PixelFormat {
        &self.format
    }

    /// Returns surface's flags.
    ///
    /// `RLEACCEL` is set only while pixels are actually encoded.
    pub fn flags(&self) -> SurfaceFlags {
        let mut flags = self.flags;
        flags.set(SurfaceFlags::RLEACCEL, self.is_rle_encoded());
        flags
    }

    /// Returns the current lock depth.
    #[inline]
    pub fn lock_depth(&self) -> u32 {
        self.locked
    }

    /// Checks that the surface is locked.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked > 0
    }

    /// Checks that pixels are run-length encoded.
    #[inline]
    pub fn is_rle_encoded(&self) -> bool {
        matches!(self.rle, RleState::Encoded(_))
    }

    #[inline]
    pub(crate) fn id(&self) -> SurfaceId {
        self.id
    }

    #[inline]
    pub(crate) fn version(&self) -> u32 {
        self.version.get()
    }

    /// Returns the byte offset of a pixel and its bit offset inside that byte.
    #[inline]
    pub(crate) fn byte_offset(&self, x: usize, y: usize) -> (usize, usize) {
        let bit = x * usize::from(self.format.bits_per_pixel());
        (y * self.pitch + bit / 8, bit % 8)
    }

    /// Returns the compositing a blit from this surface needs.
    ///
    /// An opaque surface alpha is ignored unless the format has an alpha channel.
    pub(crate) fn blit_mode(&self) -> BlitMode {
        let mut mode = BlitMode::empty();
        if self.flags.contains(SurfaceFlags::SRCCOLORKEY) {
            mode |= BlitMode::COLORKEY;
        }

        if self.flags.contains(SurfaceFlags::SRCALPHA)
            && (self.format.alpha() != ALPHA_U8_OPAQUE || self.format.has_alpha_channel())
        {
            mode |= BlitMode::ALPHA;
        }

        mode
    }

    /// Forgets the cached blit and tells every blit targeting this surface to remap.
    pub(crate) fn invalidate_map(&mut self) {
        self.map.invalidate();
        self.version.bump();
    }

    /// Returns raw pixels.
    ///
    /// Fails when pixels are run-length encoded. Use `lock` first.
    pub fn pixels(&self) -> Result<&[u8], Error> {
        if self.is_rle_encoded() {
            return Err(Error::RleEncoded);
        }

        Ok(self.pixels.as_slice())
    }

    /// Returns mutable raw pixels. See `pixels`.
    pub fn pixels_mut(&mut self) -> Result<&mut [u8], Error> {
        if self.is_rle_encoded() {
            return Err(Error::RleEncoded);
        }

        Ok(self.pixels.as_mut_slice())
    }

    /// Returns a pixel value at the specified coordinates.
    ///
    /// Returns `None` when out of bounds or when pixels are encoded.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let data = self.pixels().ok()?;
        let bits = usize::from(self.format.bits_per_pixel());
        let (offset, bit) = self.byte_offset(x as usize, y as usize);
        if bits < 8 {
            Some(blit::packed_get(&data[offset..], bit, bits))
        } else {
            Some(read_pixel(&data[offset..], usize::from(self.format.bytes_per_pixel())))
        }
    }

    /// Returns the clipping rectangle.
    #[inline]
    pub fn clip_rect(&self) -> Rect {
        self.clip_rect
    }

    /// Sets the clipping rectangle used as a blit and fill destination.
    ///
    /// `None` resets the clip to the whole surface.
    /// Returns `false` when the rectangle doesn't intersect the surface,
    /// in which case all blits to this surface become no-ops.
    pub fn set_clip_rect(&mut self, rect: Option<Rect>) -> bool {
        let bounds = match Rect::from_xywh(0, 0, self.width, self.height) {
            Some(r) => r,
            None => {
                self.clip_rect = Rect::empty_at(0, 0);
                return false;
            }
        };

        match rect {
            Some(rect) => match rect.intersect(&bounds) {
                Some(r) => {
                    self.clip_rect = r;
                    true
                }
                None => {
                    self.clip_rect = Rect::empty_at(0, 0);
                    false
                }
            },
            None => {
                self.clip_rect = bounds;
                true
            }
        }
    }

    /// Replaces the palette.
    ///
    /// The palette must have exactly 2^bpp entries.
    /// The surface watches its palette, so later color changes invalidate blits.
    pub fn set_palette(&mut self, palette: Option<SharedPalette>) -> Result<(), Error> {
        if let Some(ref palette) = palette {
            if self.format.bits_per_pixel() > 8 {
                return Err(Error::NoPalette);
            }

            if palette.borrow().len() != 1 << self.format.bits_per_pixel() {
                return Err(Error::PaletteMismatch);
            }
        }

        let same = match (self.format.palette(), &palette) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        if same {
            return Ok(());
        }

        if let Some(old) = self.format.palette() {
            old.borrow_mut().remove_watcher(&self.version);
        }

        if let Some(ref palette) = palette {
            palette.borrow_mut().add_watcher(&self.version);
        }

        self.format.replace_palette(palette);
        self.invalidate_map();
        Ok(())
    }

    /// Sets the colorkey, aka a transparent pixel value.
    ///
    /// `rle_ok` allows run-length encoding of the surface.
    pub fn set_color_key(&mut self, enabled: bool, rle_ok: bool, key: u32) -> Result<(), Error> {
        let requested = if !enabled {
            SurfaceFlags::empty()
        } else if rle_ok {
            SurfaceFlags::SRCCOLORKEY | SurfaceFlags::RLEACCELOK
        } else {
            SurfaceFlags::SRCCOLORKEY
        };

        let current = self.flags & (SurfaceFlags::SRCCOLORKEY | SurfaceFlags::RLEACCELOK);
        if requested == current && key == self.format.colorkey() {
            return Ok(());
        }

        if self.is_rle_encoded() {
            self.unrle(true)?;
        }

        if enabled {
            self.flags.insert(SurfaceFlags::SRCCOLORKEY);
            self.flags.set(SurfaceFlags::RLEACCELOK, rle_ok);
            self.format.set_colorkey(key);
        } else {
            self.flags.remove(SurfaceFlags::SRCCOLORKEY | SurfaceFlags::RLEACCELOK);
            self.format.set_colorkey(0);
        }

        self.invalidate_map();
        Ok(())
    }

    /// Sets the per-surface alpha.
    ///
    /// When enabled, the source is blended with the destination using its
    /// own alpha channel (if any) multiplied by `value`.
    /// `rle_ok` allows run-length encoding of the surface.
    pub fn set_alpha(&mut self, enabled: bool, rle_ok: bool, value: AlphaU8) -> Result<(), Error> {
        let old_flags = self.flags;
        let old_alpha = self.format.alpha();

        let requested = if !enabled {
            SurfaceFlags::empty()
        } else if rle_ok {
            SurfaceFlags::SRCALPHA | SurfaceFlags::RLEACCELOK
        } else {
            SurfaceFlags::SRCALPHA
        };

        let current = self.flags & (SurfaceFlags::SRCALPHA | SurfaceFlags::RLEACCELOK);
        if requested == current && (!enabled || value == old_alpha) {
            return Ok(());
        }

        if !requested.contains(SurfaceFlags::RLEACCELOK) && self.is_rle_encoded() {
            self.unrle(true)?;
        }

        if enabled {
            self.flags.insert(SurfaceFlags::SRCALPHA);
            self.flags.set(SurfaceFlags::RLEACCELOK, rle_ok);
            self.format.set_alpha(value);
        } else {
            self.flags.remove(SurfaceFlags::SRCALPHA);
            self.format.set_alpha(ALPHA_U8_OPAQUE);
        }

        // Routines read the alpha value at blit time, so only switching
        // between opaque and translucent has to pick a new one.
        let crosses_opaque = ((u32::from(old_alpha) + 1) ^ (u32::from(value) + 1)) & 0x100 != 0;
        if old_flags != self.flags || crosses_opaque {
            self.invalidate_map();
        }

        Ok(())
    }

    /// Sets the alpha byte of every pixel.
    ///
    /// Only 32-bit formats with the alpha in the top or the bottom byte are supported.
    pub fn set_alpha_channel(&mut self, value: AlphaU8) -> Result<(), Error> {
        let a_mask = self.format.a_mask();
        if self.format.bytes_per_pixel() != 4 || (a_mask != 0xFF000000 && a_mask != 0x000000FF) {
            return Err(Error::UnsupportedAlphaFormat);
        }

        let offset = match (a_mask == 0xFF000000, cfg!(target_endian = "little")) {
            (true, true) | (false, false) => 3,
            _ => 0,
        };

        if self.width == 0 || self.height == 0 {
            return Ok(());
        }

        self.lock()?;
        let row_len = self.width as usize * 4;
        let pitch = self.pitch;
        for row in self.pixels.as_mut_slice().chunks_mut(pitch).take(self.height as usize) {
            for pixel in row[..row_len].chunks_exact_mut(4) {
                pixel[offset] = value;
            }
        }
        self.unlock();

        Ok(())
    }

    /// Locks the surface for raw pixel access.
    ///
    /// Locks are nested. The outermost lock decodes run-length encoded pixels
    /// and the matching `unlock` encodes them again.
    pub fn lock(&mut self) -> Result<(), Error> {
        if self.locked == 0 {
            if let Some(kind) = rle::decode(self)? {
                self.rle = RleState::Suspended(kind);
                log::trace!("decoded for lock");
            }
        }

        self.locked += 1;
        Ok(())
    }

    /// Unlocks the surface. Does nothing when not locked.
    pub fn unlock(&mut self) {
        if self.locked == 0 {
            return;
        }

        self.locked -= 1;
        if self.locked > 0 {
            return;
        }

        if let RleState::Suspended(kind) = self.rle {
            self.rle = RleState::Raw;
            if self.map.low == Some(LowBlit::Rle) {
                log::trace!("re-encoding after unlock");
                if !rle::encode(self, kind) {
                    self.map.low = None;
                }
            }
        }
    }

    /// Decodes run-length encoded pixels. Does nothing otherwise.
    ///
    /// With `recode`, the next lock/unlock cycle encodes the pixels again.
    pub fn unrle(&mut self, recode: bool) -> Result<(), Error> {
        match self.rle {
            RleState::Encoded(_) => {
                if let Some(kind) = rle::decode(self)? {
                    self.rle = if recode { RleState::Suspended(kind) } else { RleState::Raw };
                }
            }
            RleState::Suspended(_) if !recode => self.rle = RleState::Raw,
            _ => {}
        }

        if self.map.low == Some(LowBlit::Rle) {
            self.map.low = None;
        }

        Ok(())
    }

    /// Performs a clipped blit to another surface.
    ///
    /// See `upper_blit`.
    pub fn blit(
        &mut self,
        src_rect: Option<Rect>,
        dst: &mut Surface,
        dst_rect: Option<Rect>,
    ) -> Result<Rect, Error> {
        blit::upper_blit(self, src_rect, dst, dst_rect)
    }

    /// Performs a clipped blit inside the same surface.
    ///
    /// Overlapping rectangles are allowed.
    pub fn blit_within(&mut self, src_rect: Option<Rect>, dst_rect: Option<Rect>) -> Result<Rect, Error> {
        blit::upper_blit_within(self, src_rect, dst_rect)
    }

    /// Creates a copy of the surface in another pixel format.
    ///
    /// The target palette, if any, is copied. When the target has an alpha
    /// channel and `flags` doesn't request `SRCCOLORKEY`, colorkeyed pixels
    /// become transparent instead of being keyed. Colorkey, alpha and the
    /// clip rectangle are carried over. `RLEACCELOK` in `flags` allows
    /// run-length encoding of the new surface.
    pub fn convert(&mut self, format: &PixelFormat, flags: SurfaceFlags) -> Result<Surface<'static>, Error> {
        if let Some(palette) = format.palette() {
            if palette.borrow().is_all_white() {
                return Err(Error::EmptyPalette);
            }
        }

        let [r, g, b, a] = format.masks();
        let mut convert = Surface::new(
            self.width,
            self.height,
            PixelFormat::new(format.bits_per_pixel(), r, g, b, a)?,
        )?;

        if let (Some(src), Some(dst)) = (format.palette(), convert.format.palette()) {
            // Different palettes, so no double borrow.
            let colors = src.borrow().colors().to_vec();
            dst.borrow_mut().set_colors(0, &colors);
        }

        // Save the original colorkey and alpha.
        let mut surface_flags = self.flags;
        let mut colorkey = 0;
        let mut alpha = ALPHA_U8_OPAQUE;
        if surface_flags.contains(SurfaceFlags::SRCCOLORKEY) {
            if !flags.contains(SurfaceFlags::SRCCOLORKEY) && format.has_alpha_channel() {
                // Bake the key into the alpha channel.
                surface_flags.remove(SurfaceFlags::SRCCOLORKEY);
            } else {
                colorkey = self.format.colorkey();
                self.set_color_key(false, false, 0)?;
            }
        }

        if surface_flags.contains(SurfaceFlags::SRCALPHA) {
            if format.has_alpha_channel() {
                if self.is_rle_encoded() {
                    self.unrle(true)?;
                }

                self.flags.remove(SurfaceFlags::SRCALPHA);
                self.invalidate_map();
            } else {
                alpha = self.format.alpha();
                self.set_alpha(false, false, 0)?;
            }
        }

        let bounds = Rect::from_xywh(0, 0, self.width, self.height);
        let result = match bounds {
            Some(bounds) => blit::lower_blit(self, bounds, &mut convert, bounds),
            None => Ok(()),
        };

        // Restore the state even when the blit has failed.
        convert.set_clip_rect(Some(self.clip_rect));
        let rle_ok = flags.contains(SurfaceFlags::RLEACCELOK);
        if surface_flags.contains(SurfaceFlags::SRCCOLORKEY) {
            let was_rle_ok = surface_flags.contains(SurfaceFlags::RLEACCELOK);
            let (kr, kg, kb) = self.format.get_rgb(colorkey);
            convert.set_color_key(true, was_rle_ok || rle_ok, convert.format.map_rgb(kr, kg, kb))?;
            self.set_color_key(true, was_rle_ok, colorkey)?;
        }

        if surface_flags.contains(SurfaceFlags::SRCALPHA) {
            let was_rle_ok = surface_flags.contains(SurfaceFlags::RLEACCELOK);
            let value = if format.has_alpha_channel() { self.format.alpha() } else { alpha };
            convert.set_alpha(true, was_rle_ok || rle_ok, value)?;
            if format.has_alpha_channel() {
                self.flags.insert(SurfaceFlags::SRCALPHA);
                self.invalidate_map();
            } else {
                self.set_alpha(true, was_rle_ok, alpha)?;
            }
        }

        result?;
        Ok(convert)
    }

    /// Destroys the surface.
    ///
    /// Same as dropping it.
    pub fn free(self) {}
}

impl Drop for Surface<'_> {
    fn drop(&mut self) {
        // Encoded data is discarded, there is no point in re-encoding.
        if let RleState::Suspended(_) = self.rle {
            self.rle = RleState::Raw;
        }

        while self.locked > 0 {
            self.unlock();
        }

        self.rle = RleState::Raw;

        if let Some(palette) = self.format.palette() {
            if let Ok(mut palette) = palette.try_borrow_mut() {
                palette.remove_watcher(&self.version);
            }
        }
    }
}

impl core::fmt::Debug for Surface<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pitch", &self.pitch)
            .field("flags", &self.flags())
            .field("format", &self.format)
            .field("clip_rect", &self.clip_rect)
            .field("locked", &self.locked)
            .field("map", &self.map)
            .finish()
    }
}

// Bytes needed by a single row, without padding.
fn row_bytes(width: u32, bits_per_pixel: u8) -> Result<usize, Error> {
    let bits = u64::from(width) * u64::from(bits_per_pixel);
    usize::try_from((bits + 7) / 8).map_err(|_| Error::InvalidSize)
}

// Rows are 4-byte aligned.
fn calculate_pitch(width: u32, bits_per_pixel: u8) -> Result<usize, Error> {
    let bytes = row_bytes(width, bits_per_pixel)?;
    bytes.checked_add(3).map(|n| n & !3).ok_or(Error::InvalidSize)
}

#[cfg(feature = "png-format")]
impl Surface<'_> {
    /// Encodes the surface into PNG data.
    ///
    /// Pixels are converted to 8-bit RGBA first. Colorkeyed pixels become transparent.
    pub fn encode_png(&mut self) -> Result<Vec<u8>, png::EncodingError> {
        fn make_custom_png_error(e: Error) -> png::EncodingError {
            std::io::Error::new(std::io::ErrorKind::Other, e.to_string()).into()
        }

        let mut rgba = self
            .convert(&PixelFormat::rgba32(), SurfaceFlags::empty())
            .map_err(make_custom_png_error)?;
        rgba.lock().map_err(make_custom_png_error)?;

        let row_len = self.width as usize * 4;
        let mut img_data = Vec::with_capacity(row_len * self.height as usize);
        for row in rgba.pixels.as_slice().chunks(rgba.pitch).take(self.height as usize) {
            img_data.extend_from_slice(&row[..row_len]);
        }
        rgba.unlock();

        let mut data = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut data, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&img_data)?;
        }

        Ok(data)
    }

    /// Decodes PNG data into a 32-bit surface with an alpha channel.
    ///
    /// Only 8-bit images are supported. Indexed PNGs are not supported.
    pub fn decode_png(data: &[u8]) -> Result<Surface<'static>, png::DecodingError> {
        fn make_custom_png_error(msg: &str) -> png::DecodingError {
            std::io::Error::new(std::io::ErrorKind::Other, msg).into()
        }

        let mut decoder = png::Decoder::new(data);
        decoder.set_transformations(png::Transformations::normalize_to_color8());
        let mut reader = decoder.read_info()?;
        let mut img_data = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut img_data)?;

        if info.bit_depth != png::BitDepth::Eight {
            return Err(make_custom_png_error("unsupported bit depth"));
        }

        let channels = match info.color_type {
            png::ColorType::Rgb => 3,
            png::ColorType::Rgba => 4,
            png::ColorType::Grayscale => 1,
            png::ColorType::GrayscaleAlpha => 2,
            png::ColorType::Indexed => {
                return Err(make_custom_png_error("indexed PNG is not supported"));
            }
        };

        let mut surface = Surface::new(info.width, info.height, PixelFormat::rgba32())
            .map_err(|_| make_custom_png_error("image is too big"))?;

        let width = info.width as usize;
        let pitch = surface.pitch;
        let dst_rows = surface.pixels.as_mut_slice().chunks_mut(pitch);
        for (src, dst) in img_data.chunks(width * channels).zip(dst_rows) {
            for (s, d) in src.chunks_exact(channels).zip(dst.chunks_exact_mut(4)) {
                let rgba = match *s {
                    [r, g, b] => [r, g, b, ALPHA_U8_OPAQUE],
                    [r, g, b, a] => [r, g, b, a],
                    [gray] => [gray, gray, gray, ALPHA_U8_OPAQUE],
                    [gray, a] => [gray, gray, gray, a],
                    _ => unreachable!(),
                };
                d.copy_from_slice(&rgba);
            }
        }

        Ok(surface)
    }
}
