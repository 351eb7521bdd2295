// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

/*!
Blit dispatch.

A blit is split into three layers:

1. `upper_blit` validates and clips the rectangles.
1. `lower_blit` makes sure the source's blit map matches the destination
   and recomputes it when the destination or either format has changed.
1. The cached routine is run, either through the generic "soft" driver,
   which locks both surfaces and slices their pixels, or through the RLE driver.

Routine selection is table driven. Each family (packed, 8-bit, direct, alpha)
exposes an ordered list of `BlitEntry` candidates annotated with the CPU
features they require and a predicate over the format pair.
The first candidate whose features are present and whose predicate holds wins,
so the most specific routines are listed first and a generic one last.
*/

use softblit_geom::Rect;

use crate::cpu::{self, CpuFeatures};
use crate::rle;
use crate::surface::{Surface, SurfaceFlags};
use crate::{Error, PixelFormat};

mod blit_0;
mod blit_1;
mod blit_a;
mod blit_n;
mod copy;

bitflags::bitflags! {
    /// Compositing requested by the source surface, aka "blit index".
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub(crate) struct BlitMode: u8 {
        const COLORKEY = 1;
        const ALPHA = 2;
    }
}

/// How a selected routine is driven.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum LowBlit {
    /// Lock both surfaces and run the routine on raw pixels.
    Soft,
    /// Source pixels are run-length encoded.
    Rle,
    /// In-place copy within a single surface.
    Overlap,
}

/// Everything a pixel routine needs.
///
/// `src` and `dst` start at the first pixel of the blitted rectangle.
pub(crate) struct BlitInfo<'a> {
    pub src: &'a [u8],
    pub src_pitch: usize,
    /// Bit offset of the first pixel inside the first byte. Packed formats only.
    pub src_bit_offset: usize,
    pub dst: &'a mut [u8],
    pub dst_pitch: usize,
    /// Bit offset of the first destination pixel. Packed formats only.
    pub dst_bit_offset: usize,
    pub width: usize,
    pub height: usize,
    pub src_fmt: &'a PixelFormat,
    pub dst_fmt: &'a PixelFormat,
    pub table: &'a [u32],
}

impl<'a> BlitInfo<'a> {
    /// Iterates over source and destination rows.
    #[inline]
    pub fn rows<'s>(&'s mut self) -> impl Iterator<Item = (&'s [u8], &'s mut [u8])> + 's {
        let src: &'s [u8] = self.src;
        src.chunks(self.src_pitch)
            .zip(self.dst.chunks_mut(self.dst_pitch))
            .take(self.height)
    }
}

pub(crate) type BlitFn = fn(&mut BlitInfo);

/// Reads a packed, MSB-first pixel. `bit` is counted from the start of `row`.
#[inline]
pub(crate) fn packed_get(row: &[u8], bit: usize, bits: usize) -> u32 {
    let shift = 8 - bits - bit % 8;
    u32::from(row[bit / 8] >> shift) & ((1 << bits) - 1)
}

/// Writes a packed, MSB-first pixel. See `packed_get`.
#[inline]
pub(crate) fn packed_set(row: &mut [u8], bit: usize, bits: usize, value: u32) {
    let shift = 8 - bits - bit % 8;
    let mask = (((1u32 << bits) - 1) << shift) as u8;
    let byte = &mut row[bit / 8];
    *byte = (*byte & !mask) | (((value << shift) as u8) & mask);
}

#[inline]
fn any_query(_: &BlitQuery) -> bool {
    true
}

/// The format pair a routine is selected for.
pub(crate) struct BlitQuery<'a> {
    pub src: &'a PixelFormat,
    pub dst: &'a PixelFormat,
    pub mode: BlitMode,
    pub identity: bool,
}

/// A blit routine candidate.
pub(crate) struct BlitEntry {
    pub name: &'static str,
    pub features: CpuFeatures,
    pub applies: fn(&BlitQuery) -> bool,
    pub blit: BlitFn,
}

fn choose(entries: &'static [BlitEntry], query: &BlitQuery) -> Option<&'static BlitEntry> {
    entries
        .iter()
        .filter(|e| cfg!(feature = "simd") || e.features.is_empty())
        .find(|e| cpu::supports(e.features) && (e.applies)(query))
}

/// Selects a routine for the source surface and stores it in its blit map.
///
/// The map's destination, identity and table must already be set.
/// `same_surface` selects an overlap-safe copy and disables RLE.
pub(crate) fn calculate_blit(
    src: &mut Surface,
    dst_fmt: &PixelFormat,
    same_surface: bool,
) -> Result<(), Error> {
    // Clean everything out to start.
    if src.is_rle_encoded() {
        src.unrle(true)?;
    }
    src.map.entry = None;
    src.map.low = None;

    let mode = src.blit_mode();
    let identity = src.map.identity;
    let query = BlitQuery {
        src: &src.format,
        dst: dst_fmt,
        mode,
        identity,
    };

    // Special "identity" case, aka plain copy.
    let entry = if identity && mode.is_empty() {
        Some(if same_surface { &copy::COPY_OVERLAP } else { &copy::COPY })
    } else if src.format.bits_per_pixel() < 8 {
        choose(blit_0::BLITS, &query)
    } else {
        match src.format.bytes_per_pixel() {
            1 => choose(blit_1::BLITS, &query),
            2..=4 if mode.contains(BlitMode::ALPHA) => choose(blit_a::BLITS, &query),
            2..=4 => choose(blit_n::BLITS, &query),
            _ => None,
        }
    };

    let entry = match entry {
        Some(entry) => entry,
        None => {
            src.map.invalidate();
            log::debug!("no blit for {:?} -> {:?} ({:?})", src.format, dst_fmt, mode);
            return Err(Error::UnsupportedBlit);
        }
    };

    log::debug!("selected blit '{}' (requires {:?})", entry.name, entry.features);
    src.map.entry = Some(entry);

    // Packed pixels can't be moved with byte copies.
    let mut low = if identity && mode.is_empty() && same_surface && src.format.bits_per_pixel() >= 8 {
        LowBlit::Overlap
    } else {
        LowBlit::Soft
    };

    if !same_surface && src.flags.contains(SurfaceFlags::RLEACCELOK) {
        let has_alpha_channel = src.format.has_alpha_channel();
        let kind = if identity
            && (mode == BlitMode::COLORKEY
                || (mode == BlitMode::COLORKEY | BlitMode::ALPHA && !has_alpha_channel))
        {
            Some(rle::RleKind::ColorKey)
        } else if mode == BlitMode::ALPHA && has_alpha_channel {
            Some(rle::RleKind::Alpha)
        } else {
            None
        };

        // Encoding is an optimization. Failure keeps the generic routine.
        if let Some(kind) = kind {
            if rle::encode(src, kind) {
                low = LowBlit::Rle;
            }
        }
    }

    src.map.low = Some(low);
    Ok(())
}

/// Maps the source onto a destination format, recomputing the blit routine.
fn map_surface(
    src: &mut Surface,
    dst_fmt: &PixelFormat,
    dst_id: crate::surface::SurfaceId,
    dst_version: u32,
    same_surface: bool,
) -> Result<(), Error> {
    src.map.invalidate();
    src.map.build_table(&src.format, dst_fmt)?;
    src.map.dst = Some(dst_id);
    src.map.dst_version = dst_version;
    src.map.src_version = src.version();

    let result = calculate_blit(src, dst_fmt, same_surface);
    if result.is_err() {
        src.map.invalidate();
    }

    result
}

/// Performs a fast blit from the source surface to the destination surface.
///
/// Assumes that the rectangles are already clipped and have the same size.
/// The only validation left is a bounds check, which fails with `InvalidRect`.
pub fn lower_blit(
    src: &mut Surface,
    src_rect: Rect,
    dst: &mut Surface,
    dst_rect: Rect,
) -> Result<(), Error> {
    check_rects(src, &src_rect, dst, &dst_rect)?;

    if !src.map.is_valid_for(dst.id(), dst.version(), src.version()) {
        map_surface(src, &dst.format, dst.id(), dst.version(), false)?;
    }

    if src_rect.is_empty() {
        return Ok(());
    }

    match src.map.low {
        // A locked source holds raw pixels even when RLE was selected.
        Some(LowBlit::Rle) if src.is_rle_encoded() => rle::blit(src, &src_rect, dst, &dst_rect),
        _ => soft_blit(src, &src_rect, dst, &dst_rect),
    }
}

/// Performs a blit from the source surface to the destination surface.
///
/// `src_rect` defaults to the whole source. Only the position of `dst_rect` is used.
/// The source rectangle is clipped against the source surface and the destination
/// rectangle against the destination clip rectangle, adjusting the other side by
/// the same delta.
///
/// Returns the destination rectangle that was actually affected.
/// A zero-sized rectangle means that everything was clipped away.
pub fn upper_blit(
    src: &mut Surface,
    src_rect: Option<Rect>,
    dst: &mut Surface,
    dst_rect: Option<Rect>,
) -> Result<Rect, Error> {
    // Make sure the surfaces aren't locked.
    if src.is_locked() || dst.is_locked() {
        return Err(Error::SurfaceLocked);
    }

    match clip(src.width(), src.height(), src_rect, dst_rect, &dst.clip_rect()) {
        Ok((sr, dr)) => {
            lower_blit(src, sr, dst, dr)?;
            Ok(dr)
        }
        Err(empty) => Ok(empty),
    }
}

/// Like `upper_blit`, but the source and the destination are the same surface.
///
/// Overlapping rectangles are handled correctly.
pub fn upper_blit_within(
    surface: &mut Surface,
    src_rect: Option<Rect>,
    dst_rect: Option<Rect>,
) -> Result<Rect, Error> {
    if surface.is_locked() {
        return Err(Error::SurfaceLocked);
    }

    let clip_rect = surface.clip_rect();
    let (sr, dr) = match clip(surface.width(), surface.height(), src_rect, dst_rect, &clip_rect) {
        Ok(v) => v,
        Err(empty) => return Ok(empty),
    };

    if !surface.map.is_valid_for(surface.id(), surface.version(), surface.version()) {
        let format = surface.format.clone();
        let (id, version) = (surface.id(), surface.version());
        map_surface(surface, &format, id, version, true)?;
    }

    surface.lock()?;
    let (src_offset, src_bit_offset) = surface.byte_offset(sr.x() as usize, sr.y() as usize);
    let (dst_offset, dst_bit_offset) = surface.byte_offset(dr.x() as usize, dr.y() as usize);
    let pitch = surface.pitch();

    let result = match (surface.map.low, surface.map.entry) {
        (Some(LowBlit::Overlap), _) => {
            let row_len = sr.width() as usize * usize::from(surface.format.bytes_per_pixel());
            let pixels = surface.pixels.as_mut_slice();
            copy::copy_overlap(pixels, pitch, src_offset, dst_offset, row_len, sr.height() as usize);
            Ok(())
        }
        (_, Some(entry)) => {
            // Any other routine reads from a snapshot of the source.
            let mut snapshot = Vec::new();
            match snapshot.try_reserve_exact(surface.pixels.as_slice().len()) {
                Ok(()) => {
                    snapshot.extend_from_slice(surface.pixels.as_slice());
                    let mut info = BlitInfo {
                        src: &snapshot[src_offset..],
                        src_pitch: pitch,
                        src_bit_offset,
                        dst: &mut surface.pixels.as_mut_slice()[dst_offset..],
                        dst_pitch: pitch,
                        dst_bit_offset,
                        width: sr.width() as usize,
                        height: sr.height() as usize,
                        src_fmt: &surface.format,
                        dst_fmt: &surface.format,
                        table: &surface.map.table,
                    };
                    (entry.blit)(&mut info);
                    Ok(())
                }
                Err(_) => Err(Error::OutOfMemory),
            }
        }
        _ => Err(Error::UnsupportedBlit),
    };
    surface.unlock();

    result.map(|_| dr)
}

/// The general purpose software blit driver.
fn soft_blit(src: &mut Surface, src_rect: &Rect, dst: &mut Surface, dst_rect: &Rect) -> Result<(), Error> {
    let entry = src.map.entry.ok_or(Error::UnsupportedBlit)?;

    dst.lock()?;
    if let Err(e) = src.lock() {
        dst.unlock();
        return Err(e);
    }

    {
        let (src_offset, src_bit_offset) = src.byte_offset(src_rect.x() as usize, src_rect.y() as usize);
        let (dst_offset, dst_bit_offset) = dst.byte_offset(dst_rect.x() as usize, dst_rect.y() as usize);
        let src_pitch = src.pitch();
        let dst_pitch = dst.pitch();

        let mut info = BlitInfo {
            src: &src.pixels.as_slice()[src_offset..],
            src_pitch,
            src_bit_offset,
            dst: &mut dst.pixels.as_mut_slice()[dst_offset..],
            dst_pitch,
            dst_bit_offset,
            width: dst_rect.width() as usize,
            height: dst_rect.height() as usize,
            src_fmt: &src.format,
            dst_fmt: &dst.format,
            table: &src.map.table,
        };

        (entry.blit)(&mut info);
    }

    src.unlock();
    dst.unlock();
    Ok(())
}

fn check_rects(src: &Surface, src_rect: &Rect, dst: &Surface, dst_rect: &Rect) -> Result<(), Error> {
    let src_bounds = Rect::from_xywh(0, 0, src.width(), src.height()).ok_or(Error::InvalidRect)?;
    let dst_bounds = Rect::from_xywh(0, 0, dst.width(), dst.height()).ok_or(Error::InvalidRect)?;
    if src_rect.size() != dst_rect.size()
        || !src_bounds.contains(src_rect)
        || !dst_bounds.contains(dst_rect)
    {
        return Err(Error::InvalidRect);
    }

    Ok(())
}

/// Clips a blit.
///
/// Returns source and destination rectangles of equal size,
/// or an empty destination rectangle when nothing is left.
fn clip(
    src_width: u32,
    src_height: u32,
    src_rect: Option<Rect>,
    dst_rect: Option<Rect>,
    clip: &Rect,
) -> Result<(Rect, Rect), Rect> {
    let mut dx = i64::from(dst_rect.map(|r| r.x()).unwrap_or(0));
    let mut dy = i64::from(dst_rect.map(|r| r.y()).unwrap_or(0));

    // Clip the source rectangle to the source surface.
    let (mut sx, mut sy, mut w, mut h) = match src_rect {
        Some(r) => {
            let mut sx = i64::from(r.x());
            let mut w = i64::from(r.width());
            if sx < 0 {
                w += sx;
                dx -= sx;
                sx = 0;
            }
            w = w.min(i64::from(src_width) - sx);

            let mut sy = i64::from(r.y());
            let mut h = i64::from(r.height());
            if sy < 0 {
                h += sy;
                dy -= sy;
                sy = 0;
            }
            h = h.min(i64::from(src_height) - sy);

            (sx, sy, w, h)
        }
        None => (0, 0, i64::from(src_width), i64::from(src_height)),
    };

    // Clip the destination rectangle against the clip rectangle.
    let delta = i64::from(clip.x()) - dx;
    if delta > 0 {
        w -= delta;
        dx += delta;
        sx += delta;
    }
    let delta = dx + w - i64::from(clip.right());
    if delta > 0 {
        w -= delta;
    }

    let delta = i64::from(clip.y()) - dy;
    if delta > 0 {
        h -= delta;
        dy += delta;
        sy += delta;
    }
    let delta = dy + h - i64::from(clip.bottom());
    if delta > 0 {
        h -= delta;
    }

    let empty = || Rect::empty_at(saturate_i32(dx), saturate_i32(dy));
    if w <= 0 || h <= 0 {
        return Err(empty());
    }

    // Everything is inside i32 now, since both rects are inside surfaces.
    let sr = Rect::from_xywh(sx as i32, sy as i32, w as u32, h as u32).ok_or_else(empty)?;
    let dr = Rect::from_xywh(dx as i32, dy as i32, w as u32, h as u32).ok_or_else(empty)?;
    Ok((sr, dr))
}

#[inline]
fn saturate_i32(n: i64) -> i32 {
    n.max(i64::from(i32::MIN)).min(i64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: i32, y: i32, w: u32, h: u32) -> Rect {
        Rect::from_xywh(x, y, w, h).unwrap()
    }

    #[test]
    fn clip_inside() {
        let clip_rect = r(0, 0, 100, 100);
        let (sr, dr) = clip(10, 10, None, Some(r(5, 5, 0, 0)), &clip_rect).unwrap();
        assert_eq!(sr, r(0, 0, 10, 10));
        assert_eq!(dr, r(5, 5, 10, 10));
    }

    #[test]
    fn clip_negative_source() {
        let clip_rect = r(0, 0, 100, 100);
        let (sr, dr) = clip(10, 10, Some(r(-2, -3, 10, 10)), Some(r(20, 20, 0, 0)), &clip_rect).unwrap();
        assert_eq!(sr, r(0, 0, 8, 7));
        assert_eq!(dr, r(22, 23, 8, 7));
    }

    #[test]
    fn clip_against_destination() {
        let clip_rect = r(10, 10, 20, 20);
        let (sr, dr) = clip(10, 10, None, Some(r(5, 25, 0, 0)), &clip_rect).unwrap();
        assert_eq!(sr, r(5, 0, 5, 5));
        assert_eq!(dr, r(10, 25, 5, 5));
    }

    #[test]
    fn clip_everything() {
        let clip_rect = r(0, 0, 10, 10);
        let empty = clip(10, 10, None, Some(r(50, 50, 0, 0)), &clip_rect).unwrap_err();
        assert!(empty.is_empty());
        assert_eq!((empty.x(), empty.y()), (50, 50));
    }

    #[test]
    fn clip_source_outside() {
        let clip_rect = r(0, 0, 10, 10);
        assert!(clip(10, 10, Some(r(20, 0, 5, 5)), None, &clip_rect).is_err());
    }
}
