// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

/*!
Run-length encoding of transparent pixels.

Each row is stored as a sequence of spans:

```text
skip: u16 LE | run: u16 LE | run * bytes_per_pixel raw pixel bytes
```

`skip` transparent pixels are followed by `run` opaque pixels. A row ends once
its spans cover the whole width. Both counts are limited to `u16::MAX`,
longer runs are split.

Transparent means "equal to the colorkey" for `RleKind::ColorKey`
and "zero alpha" for `RleKind::Alpha`.
*/

use softblit_geom::Rect;

use crate::blit_map::rgb332_index;
use crate::color::{blend_u8, mul_u8, Color};
use crate::pixel_format::{read_pixel, write_pixel};
use crate::surface::{Pixels, Surface};
use crate::{Error, PixelFormat};

/// What is considered transparent.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum RleKind {
    ColorKey,
    Alpha,
}

/// Encoded pixels.
pub(crate) struct RleData {
    kind: RleKind,
    data: Vec<u8>,
    /// Offset of each row's first span.
    rows: Vec<usize>,
}

/// Run-length encoding state of a surface.
pub(crate) enum RleState {
    /// Pixels are raw.
    Raw,
    /// Pixels are encoded. Owned raw pixels are released.
    Encoded(RleData),
    /// Pixels are raw for the duration of a lock and must be encoded again on unlock.
    Suspended(RleKind),
}

/// Tries to encode surface's pixels.
///
/// Returns `false` and leaves the surface untouched when encoding is not
/// possible or not worthwhile.
pub(crate) fn encode(surface: &mut Surface, kind: RleKind) -> bool {
    match try_encode(surface, kind) {
        Some(encoded) => {
            log::debug!(
                "RLE encoded {}x{} surface into {} bytes ({:?})",
                surface.width(),
                surface.height(),
                encoded.data.len(),
                kind
            );

            if let Pixels::Owned(_) = surface.pixels {
                surface.pixels = Pixels::Owned(Vec::new());
            }

            surface.rle = RleState::Encoded(encoded);
            true
        }
        None => {
            log::debug!("RLE encoding has failed ({:?})", kind);
            false
        }
    }
}

fn try_encode(surface: &Surface, kind: RleKind) -> Option<RleData> {
    let format = surface.format();
    if surface.is_locked()
        || surface.is_rle_encoded()
        || surface.width() == 0
        || surface.height() == 0
        || format.bits_per_pixel() < 8
    {
        return None;
    }

    // Transparent pixels are restored as the colorkey. Alpha bits would be lost.
    if kind == RleKind::ColorKey && format.has_alpha_channel() {
        return None;
    }

    let bpp = usize::from(format.bytes_per_pixel());
    let width = surface.width() as usize;
    let height = surface.height() as usize;
    let pitch = surface.pitch();
    let pixels = surface.pixels().ok()?;
    let key = format.colorkey();
    let is_transparent = |pixel: u32| match kind {
        RleKind::ColorKey => pixel == key,
        RleKind::Alpha => format.pixel_alpha(pixel) == 0,
    };

    let mut data = Vec::new();
    let mut rows = Vec::new();
    rows.try_reserve_exact(height).ok()?;
    for row in pixels.chunks(pitch).take(height) {
        rows.push(data.len());
        let row = &row[..width * bpp];
        let pixel_at = |x: usize| read_pixel(&row[x * bpp..], bpp);

        let mut x = 0;
        while x < width {
            let start = x;
            while x < width && x - start < usize::from(u16::MAX) && is_transparent(pixel_at(x)) {
                x += 1;
            }
            let skip = x - start;

            // Decoding writes zeros, so skipped pixels must be zero already.
            if kind == RleKind::Alpha && (start..x).any(|x| pixel_at(x) != 0) {
                return None;
            }

            let start = x;
            while x < width && x - start < usize::from(u16::MAX) && !is_transparent(pixel_at(x)) {
                x += 1;
            }
            let run = x - start;

            data.try_reserve(4 + run * bpp).ok()?;
            data.extend_from_slice(&(skip as u16).to_le_bytes());
            data.extend_from_slice(&(run as u16).to_le_bytes());
            data.extend_from_slice(&row[start * bpp..x * bpp]);
        }

        // Not worth it.
        if data.len() > pitch * height {
            return None;
        }
    }

    Some(RleData { kind, data, rows })
}

/// Decodes surface's pixels back. Returns `None` when pixels are not encoded.
///
/// Transparent pixels become the colorkey or zero, which is what they were
/// before encoding.
pub(crate) fn decode(surface: &mut Surface) -> Result<Option<RleKind>, Error> {
    let width = surface.width() as usize;
    let height = surface.height() as usize;
    let pitch = surface.pitch();
    let bpp = usize::from(surface.format.bytes_per_pixel());
    let key = surface.format.colorkey();

    let encoded = match surface.rle {
        RleState::Encoded(ref encoded) => encoded,
        _ => return Ok(None),
    };

    let background = match encoded.kind {
        RleKind::ColorKey => key,
        RleKind::Alpha => 0,
    };

    match surface.pixels {
        Pixels::Owned(_) => {
            let mut buf = Vec::new();
            buf.try_reserve_exact(pitch * height).map_err(|_| Error::OutOfMemory)?;
            buf.resize(pitch * height, 0);
            unpack(encoded, &mut buf, pitch, width, bpp, background);
            surface.pixels = Pixels::Owned(buf);
        }
        Pixels::Borrowed(ref mut buf) => {
            unpack(encoded, buf, pitch, width, bpp, background);
        }
    }

    let kind = encoded.kind;
    surface.rle = RleState::Raw;
    log::trace!("RLE decoded ({:?})", kind);
    Ok(Some(kind))
}

fn unpack(encoded: &RleData, buf: &mut [u8], pitch: usize, width: usize, bpp: usize, background: u32) {
    for (y, row) in buf.chunks_mut(pitch).take(encoded.rows.len()).enumerate() {
        let row = &mut row[..width * bpp];
        for pixel in row.chunks_exact_mut(bpp) {
            write_pixel(pixel, bpp, background);
        }

        for span in Spans::new(encoded, y, width, bpp) {
            row[span.x * bpp..span.x * bpp + span.pixels.len()].copy_from_slice(span.pixels);
        }
    }
}

/// An opaque span of a single row.
struct Span<'a> {
    x: usize,
    pixels: &'a [u8],
}

struct Spans<'a> {
    data: &'a [u8],
    pos: usize,
    x: usize,
    width: usize,
    bpp: usize,
}

impl<'a> Spans<'a> {
    fn new(encoded: &'a RleData, y: usize, width: usize, bpp: usize) -> Self {
        Spans {
            data: &encoded.data,
            pos: encoded.rows[y],
            x: 0,
            width,
            bpp,
        }
    }
}

impl<'a> Iterator for Spans<'a> {
    type Item = Span<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.x < self.width {
            let header = self.data.get(self.pos..self.pos + 4)?;
            let skip = usize::from(u16::from_le_bytes([header[0], header[1]]));
            let run = usize::from(u16::from_le_bytes([header[2], header[3]]));
            self.pos += 4;
            self.x += skip;

            let len = run * self.bpp;
            let pixels = self.data.get(self.pos..self.pos + len)?;
            self.pos += len;

            let x = self.x;
            self.x += run;
            if run != 0 {
                return Some(Span { x, pixels });
            }
        }

        None
    }
}

/// Blits an encoded source.
///
/// Rectangles must be clipped already.
pub(crate) fn blit(src: &mut Surface, src_rect: &Rect, dst: &mut Surface, dst_rect: &Rect) -> Result<(), Error> {
    let width = src.width() as usize;
    let encoded = match src.rle {
        RleState::Encoded(ref encoded) => encoded,
        _ => return Err(Error::UnsupportedBlit),
    };

    let src_fmt = &src.format;
    let table = &src.map.table;
    let bpp = usize::from(src_fmt.bytes_per_pixel());
    let blend = src.flags.contains(crate::SurfaceFlags::SRCALPHA);

    dst.lock()?;
    let dst_bpp = usize::from(dst.format.bytes_per_pixel());
    let dst_pitch = dst.pitch();
    let (dst_offset, _) = dst.byte_offset(dst_rect.x() as usize, dst_rect.y() as usize);
    let dst_colors: Vec<Color> = match dst.format.palette() {
        Some(palette) if encoded.kind == RleKind::Alpha => palette.borrow().colors().to_vec(),
        _ => Vec::new(),
    };

    let sx = src_rect.x() as usize;
    let sx_end = sx + src_rect.width() as usize;
    let dst_fmt = &dst.format;
    let pixels = &mut dst.pixels.as_mut_slice()[dst_offset..];
    let rows = pixels.chunks_mut(dst_pitch).take(src_rect.height() as usize);
    for (y, dst_row) in (src_rect.y() as usize..).zip(rows) {
        for span in Spans::new(encoded, y, width, bpp) {
            let lo = span.x.max(sx);
            let hi = (span.x + span.pixels.len() / bpp).min(sx_end);
            if span.x >= sx_end {
                break;
            }

            if lo >= hi {
                continue;
            }

            let src_pixels = &span.pixels[(lo - span.x) * bpp..(hi - span.x) * bpp];
            let dst_pixels = &mut dst_row[(lo - sx) * dst_bpp..(hi - sx) * dst_bpp];
            match encoded.kind {
                RleKind::ColorKey if !blend => dst_pixels.copy_from_slice(src_pixels),
                _ => blend_span(src_fmt, src_pixels, dst_fmt, dst_pixels, table, &dst_colors),
            }
        }
    }

    dst.unlock();
    Ok(())
}

fn blend_span(
    src_fmt: &PixelFormat,
    src: &[u8],
    dst_fmt: &PixelFormat,
    dst: &mut [u8],
    table: &[u32],
    dst_colors: &[Color],
) {
    let surface_alpha = src_fmt.alpha();
    let bpp = usize::from(src_fmt.bytes_per_pixel());
    let dst_bpp = usize::from(dst_fmt.bytes_per_pixel());
    for (s, d) in src.chunks_exact(bpp).zip(dst.chunks_exact_mut(dst_bpp)) {
        let sc = src_fmt.get_rgba(read_pixel(s, bpp));
        let alpha = mul_u8(sc.alpha(), surface_alpha);
        if alpha == 0 {
            continue;
        }

        if dst_bpp == 1 && !dst_colors.is_empty() {
            let dc = dst_colors.get(usize::from(d[0])).cloned().unwrap_or(Color::BLACK);
            let (r, g, b) = (
                blend_u8(sc.red(), dc.red(), alpha),
                blend_u8(sc.green(), dc.green(), alpha),
                blend_u8(sc.blue(), dc.blue(), alpha),
            );
            d[0] = match table.get(rgb332_index(r, g, b)) {
                Some(index) => *index as u8,
                None => dst_fmt.map_rgb(r, g, b) as u8,
            };
        } else {
            let dc = dst_fmt.get_rgba(read_pixel(d, dst_bpp));
            let pixel = dst_fmt.map_rgba(
                blend_u8(sc.red(), dc.red(), alpha),
                blend_u8(sc.green(), dc.green(), alpha),
                blend_u8(sc.blue(), dc.blue(), alpha),
                dc.alpha(),
            );
            write_pixel(d, dst_bpp, pixel);
        }
    }
}
