// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Blits from packed, less than 8 bits per pixel sources.
//!
//! Pixels are stored MSB-first. The destination is always at least 8 bits deep.

use super::{packed_get, BlitEntry, BlitInfo, BlitMode, BlitQuery};
use crate::color::{blend_u8, Color};
use crate::cpu::CpuFeatures;
use crate::pixel_format::{read_pixel, write_pixel};

pub(super) static BLITS: &[BlitEntry] = &[
    BlitEntry {
        name: "bitmap_to_1",
        features: CpuFeatures::empty(),
        applies: |q| dst_bytes(q) == Some(1) && q.mode.is_empty(),
        blit: bitmap_to_1,
    },
    BlitEntry {
        name: "bitmap_to_1_key",
        features: CpuFeatures::empty(),
        applies: |q| dst_bytes(q) == Some(1) && q.mode == BlitMode::COLORKEY,
        blit: bitmap_to_1_key,
    },
    BlitEntry {
        name: "bitmap_to_n",
        features: CpuFeatures::empty(),
        applies: |q| dst_is_wide(q) && q.mode.is_empty(),
        blit: bitmap_to_n,
    },
    BlitEntry {
        name: "bitmap_to_n_key",
        features: CpuFeatures::empty(),
        applies: |q| dst_is_wide(q) && q.mode == BlitMode::COLORKEY,
        blit: bitmap_to_n_key,
    },
    BlitEntry {
        name: "bitmap_to_n_alpha",
        features: CpuFeatures::empty(),
        applies: |q| dst_is_wide(q) && q.mode == BlitMode::ALPHA,
        blit: bitmap_to_n_alpha,
    },
    BlitEntry {
        name: "bitmap_to_n_alpha_key",
        features: CpuFeatures::empty(),
        applies: |q| dst_is_wide(q) && q.mode == BlitMode::COLORKEY | BlitMode::ALPHA,
        blit: bitmap_to_n_alpha_key,
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

// Walks every source pixel. `f` receives the index and the destination pixel bytes.
fn for_each_pixel(info: &mut BlitInfo, mut f: impl FnMut(u32, &mut [u8])) {
    let bits = usize::from(info.src_fmt.bits_per_pixel());
    let dst_bpp = usize::from(info.dst_fmt.bytes_per_pixel());
    let width = info.width;
    let src_bit = info.src_bit_offset;
    for (src, dst) in info.rows() {
        for (x, d) in dst.chunks_mut(dst_bpp).take(width).enumerate() {
            f(packed_get(src, src_bit + x * bits, bits), d);
        }
    }
}

fn bitmap_to_1(info: &mut BlitInfo) {
    let table = info.table;
    for_each_pixel(info, |i, d| {
        d[0] = table.get(i as usize).map(|v| *v as u8).unwrap_or(i as u8);
    });
}

fn bitmap_to_1_key(info: &mut BlitInfo) {
    let table = info.table;
    let key = info.src_fmt.colorkey();
    for_each_pixel(info, |i, d| {
        if i != key {
            d[0] = table.get(i as usize).map(|v| *v as u8).unwrap_or(i as u8);
        }
    });
}

fn bitmap_to_n(info: &mut BlitInfo) {
    let table = info.table;
    let bpp = usize::from(info.dst_fmt.bytes_per_pixel());
    for_each_pixel(info, |i, d| {
        write_pixel(d, bpp, table[i as usize]);
    });
}

fn bitmap_to_n_key(info: &mut BlitInfo) {
    let table = info.table;
    let key = info.src_fmt.colorkey();
    let bpp = usize::from(info.dst_fmt.bytes_per_pixel());
    for_each_pixel(info, |i, d| {
        if i != key {
            write_pixel(d, bpp, table[i as usize]);
        }
    });
}

fn bitmap_to_n_alpha(info: &mut BlitInfo) {
    bitmap_alpha(info, None)
}

fn bitmap_to_n_alpha_key(info: &mut BlitInfo) {
    let key = info.src_fmt.colorkey();
    bitmap_alpha(info, Some(key))
}

fn bitmap_alpha(info: &mut BlitInfo, key: Option<u32>) {
    let src_fmt = info.src_fmt;
    let dst_fmt = info.dst_fmt;
    let alpha = src_fmt.alpha();
    let bpp = usize::from(dst_fmt.bytes_per_pixel());

    let colors: Vec<Color> = match src_fmt.palette() {
        Some(palette) => palette.borrow().colors().to_vec(),
        None => return,
    };

    for_each_pixel(info, |i, d| {
        if key == Some(i) {
            return;
        }

        let s = colors.get(i as usize).cloned().unwrap_or(Color::BLACK);
        let dc = dst_fmt.get_rgba(read_pixel(d, bpp));
        let pixel = dst_fmt.map_rgba(
            blend_u8(s.red(), dc.red(), alpha),
            blend_u8(s.green(), dc.green(), alpha),
            blend_u8(s.blue(), dc.blue(), alpha),
            dc.alpha(),
        );
        write_pixel(d, bpp, pixel);
    });
}
