// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use core::cell::Cell;

use crate::blit::{BlitEntry, LowBlit};
use crate::surface::SurfaceId;
use crate::{Color, Error, PixelFormat};

/// A generation counter bumped on every blit-relevant format change.
///
/// Shared with palettes, which bump it on color changes.
#[derive(Default, Debug)]
pub(crate) struct FormatVersion(Cell<u32>);

impl FormatVersion {
    #[inline]
    pub fn get(&self) -> u32 {
        self.0.get()
    }

    #[inline]
    pub fn bump(&self) {
        self.0.set(self.0.get().wrapping_add(1));
    }
}

/// A cached blit decision for a source surface.
///
/// Valid only while the destination is the same surface and neither
/// the source nor the destination format versions have changed.
#[derive(Default)]
pub(crate) struct BlitMap {
    pub dst: Option<SurfaceId>,
    pub dst_version: u32,
    pub src_version: u32,
    /// Source and destination encode pixels identically.
    pub identity: bool,
    /// Palette translation table. Its meaning depends on the formats:
    /// paletted to paletted - destination index per source index,
    /// paletted to direct - destination pixel per source index,
    /// direct to paletted - destination index per RGB 3-3-2 color.
    pub table: Vec<u32>,
    /// The selected pixel routine.
    pub entry: Option<&'static BlitEntry>,
    /// How the routine is driven.
    pub low: Option<LowBlit>,
}

impl BlitMap {
    /// Checks that the cached decision can be reused.
    #[inline]
    pub fn is_valid_for(&self, dst: SurfaceId, dst_version: u32, src_version: u32) -> bool {
        self.low.is_some()
            && self.dst == Some(dst)
            && self.dst_version == dst_version
            && self.src_version == src_version
    }

    /// Forgets the destination and the selected routine.
    pub fn invalidate(&mut self) {
        if self.dst.is_some() {
            log::trace!("blit map invalidated");
        }

        self.dst = None;
        self.entry = None;
        self.low = None;
        self.identity = false;
        self.table.clear();
    }

    /// Computes the identity flag and the translation table for a format pair.
    pub fn build_table(&mut self, src: &PixelFormat, dst: &PixelFormat) -> Result<(), Error> {
        self.table.clear();
        self.identity = false;

        match (src.palette(), dst.palette()) {
            (Some(src_palette), Some(dst_palette)) => {
                if src.same_layout(dst) {
                    self.identity = true;
                    return Ok(());
                }

                let src_palette = src_palette.borrow();
                let dst_palette = dst_palette.borrow();
                self.reserve(src_palette.len())?;
                self.table.extend(
                    src_palette.colors().iter().map(|c| u32::from(dst_palette.find_color(*c))),
                );
            }
            (Some(src_palette), None) => {
                let src_palette = src_palette.borrow();
                self.reserve(src_palette.len())?;
                self.table.extend(
                    src_palette.colors().iter().map(|c| dst.map_rgb(c.red(), c.green(), c.blue())),
                );
            }
            (None, Some(dst_palette)) => {
                let dst_palette = dst_palette.borrow();
                self.reserve(256)?;
                self.table.extend((0..256u32).map(|i| {
                    let c = rgb332_color(i as u8);
                    u32::from(dst_palette.find_color(c))
                }));
            }
            (None, None) => {
                self.identity = src.same_layout(dst);
            }
        }

        Ok(())
    }

    fn reserve(&mut self, n: usize) -> Result<(), Error> {
        self.table.try_reserve_exact(n).map_err(|_| Error::OutOfMemory)
    }
}

impl core::fmt::Debug for BlitMap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BlitMap")
            .field("dst", &self.dst)
            .field("identity", &self.identity)
            .field("table", &self.table.len())
            .field("entry", &self.entry.map(|e| e.name))
            .field("low", &self.low)
            .finish()
    }
}

/// Expands a 3-3-2 packed color.
#[inline]
pub(crate) fn rgb332_color(i: u8) -> Color {
    let r = (i >> 5) & 7;
    let g = (i >> 2) & 7;
    let b = i & 3;
    Color::from_rgb(
        (u32::from(r) * 255 / 7) as u8,
        (u32::from(g) * 255 / 7) as u8,
        (u32::from(b) * 255 / 3) as u8,
    )
}

/// Packs a color into 3-3-2.
#[inline]
pub(crate) fn rgb332_index(r: u8, g: u8, b: u8) -> usize {
    usize::from((r & 0xE0) | ((g >> 3) & 0x1C) | (b >> 6))
}
