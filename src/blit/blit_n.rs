// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Blits from 2, 3 and 4 bytes per pixel direct color sources, without blending.

use super::{BlitEntry, BlitInfo, BlitMode, BlitQuery};
use crate::blit_map::rgb332_index;
use crate::cpu::CpuFeatures;
use crate::pixel_format::{read_pixel, write_pixel};
use crate::PixelFormat;

pub(super) static BLITS: &[BlitEntry] = &[
    BlitEntry {
        name: "rgb888_to_rgb565",
        features: CpuFeatures::empty(),
        applies: |q| q.mode.is_empty() && is_rgb888(q.src) && is_rgb565(q.dst),
        blit: rgb888_to_rgb565,
    },
    BlitEntry {
        name: "rgb888_to_rgb555",
        features: CpuFeatures::empty(),
        applies: |q| q.mode.is_empty() && is_rgb888(q.src) && is_rgb555(q.dst),
        blit: rgb888_to_rgb555,
    },
    BlitEntry {
        name: "n_to_n_key_identity",
        features: CpuFeatures::empty(),
        applies: |q| q.identity && q.mode == BlitMode::COLORKEY,
        blit: n_to_n_key_identity,
    },
    BlitEntry {
        name: "n_to_1",
        features: CpuFeatures::empty(),
        applies: |q| dst_bytes(q) == Some(1) && q.mode.is_empty(),
        blit: n_to_1,
    },
    BlitEntry {
        name: "n_to_1_key",
        features: CpuFeatures::empty(),
        applies: |q| dst_bytes(q) == Some(1) && q.mode == BlitMode::COLORKEY,
        blit: n_to_1_key,
    },
    BlitEntry {
        name: "n_to_n",
        features: CpuFeatures::empty(),
        applies: |q| dst_is_wide(q) && q.mode.is_empty(),
        blit: n_to_n,
    },
    BlitEntry {
        name: "n_to_n_key",
        features: CpuFeatures::empty(),
        applies: |q| dst_is_wide(q) && q.mode == BlitMode::COLORKEY,
        blit: n_to_n_key,
    },
];

fn dst_bytes(q: &BlitQuery) -> Option<u8> {
    if q.dst.bits_per_pixel() >= 8 {
        Some(q.dst.bytes_per_pixel())
    } else {
        None
    }
}

fn dst_is_wide(q: &BlitQuery) -> bool {
    matches!(dst_bytes(q), Some(2..=4))
}

/// A 32-bit xRGB layout. The top byte is ignored.
pub(super) fn is_rgb888(f: &PixelFormat) -> bool {
    let [r, g, b, _] = f.masks();
    f.bits_per_pixel() == 32 && r == 0xFF0000 && g == 0x00FF00 && b == 0x0000FF
}

pub(super) fn is_rgb565(f: &PixelFormat) -> bool {
    f.bits_per_pixel() == 16 && f.masks() == [0xF800, 0x07E0, 0x001F, 0]
}

pub(super) fn is_rgb555(f: &PixelFormat) -> bool {
    f.bits_per_pixel() == 15 && f.masks() == [0x7C00, 0x03E0, 0x001F, 0]
}

/// Returns the colorkey and the mask used to compare pixels against it.
///
/// Alpha bits do not take part in the comparison.
#[inline]
pub(super) fn key_and_mask(f: &PixelFormat) -> (u32, u32) {
    let rgb_mask = !f.a_mask();
    (f.colorkey() & rgb_mask, rgb_mask)
}

fn rgb888_to_rgb565(info: &mut BlitInfo) {
    pack_rgb888(info, |p| ((p >> 8) & 0xF800) | ((p >> 5) & 0x07E0) | ((p >> 3) & 0x001F))
}

fn rgb888_to_rgb555(info: &mut BlitInfo) {
    pack_rgb888(info, |p| ((p >> 9) & 0x7C00) | ((p >> 6) & 0x03E0) | ((p >> 3) & 0x001F))
}

#[inline]
fn pack_rgb888(info: &mut BlitInfo, pack: impl Fn(u32) -> u32) {
    let width = info.width;
    for (src, dst) in info.rows() {
        let src = &src[..width * 4];
        for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(2)) {
            let p = u32::from_ne_bytes(*arrayref::array_ref!(s, 0, 4));
            d.copy_from_slice(&(pack(p) as u16).to_ne_bytes());
        }
    }
}

fn n_to_n_key_identity(info: &mut BlitInfo) {
    let (key, mask) = key_and_mask(info.src_fmt);
    let bpp = usize::from(info.src_fmt.bytes_per_pixel());
    let width = info.width;
    for (src, dst) in info.rows() {
        let src = &src[..width * bpp];
        for (s, d) in src.chunks_exact(bpp).zip(dst.chunks_mut(bpp)) {
            if read_pixel(s, bpp) & mask != key {
                d.copy_from_slice(s);
            }
        }
    }
}

fn n_to_1(info: &mut BlitInfo) {
    convert_to_1(info, false)
}

fn n_to_1_key(info: &mut BlitInfo) {
    convert_to_1(info, true)
}

fn convert_to_1(info: &mut BlitInfo, use_key: bool) {
    let src_fmt = info.src_fmt;
    let dst_fmt = info.dst_fmt;
    let table = info.table;
    let (key, mask) = key_and_mask(src_fmt);
    let bpp = usize::from(src_fmt.bytes_per_pixel());
    let width = info.width;
    for (src, dst) in info.rows() {
        let src = &src[..width * bpp];
        for (s, d) in src.chunks_exact(bpp).zip(dst.iter_mut()) {
            let pixel = read_pixel(s, bpp);
            if use_key && pixel & mask == key {
                continue;
            }

            let (r, g, b) = src_fmt.get_rgb(pixel);
            *d = match table.get(rgb332_index(r, g, b)) {
                Some(index) => *index as u8,
                None => dst_fmt.map_rgb(r, g, b) as u8,
            };
        }
    }
}

fn n_to_n(info: &mut BlitInfo) {
    convert_to_n(info, false)
}

fn n_to_n_key(info: &mut BlitInfo) {
    convert_to_n(info, true)
}

fn convert_to_n(info: &mut BlitInfo, use_key: bool) {
    let src_fmt = info.src_fmt;
    let dst_fmt = info.dst_fmt;
    let (key, mask) = key_and_mask(src_fmt);
    let src_bpp = usize::from(src_fmt.bytes_per_pixel());
    let dst_bpp = usize::from(dst_fmt.bytes_per_pixel());
    let width = info.width;
    for (src, dst) in info.rows() {
        let src = &src[..width * src_bpp];
        for (s, d) in src.chunks_exact(src_bpp).zip(dst.chunks_mut(dst_bpp)) {
            let pixel = read_pixel(s, src_bpp);
            if use_key && pixel & mask == key {
                continue;
            }

            write_pixel(d, dst_bpp, dst_fmt.map_color(src_fmt.get_rgba(pixel)));
        }
    }
}
