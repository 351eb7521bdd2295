// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Blits from 8-bit paletted sources.

use super::{BlitEntry, BlitInfo, BlitMode, BlitQuery};
use crate::color::{blend_u8, Color};
use crate::cpu::CpuFeatures;
use crate::pixel_format::{read_pixel, write_pixel};

pub(super) static BLITS: &[BlitEntry] = &[
    BlitEntry {
        name: "index8_to_1",
        features: CpuFeatures::empty(),
        applies: |q| dst_bytes(q) == Some(1) && q.mode.is_empty(),
        blit: index8_to_1,
    },
    BlitEntry {
        name: "index8_to_1_key_identity",
        features: CpuFeatures::empty(),
        applies: |q| dst_bytes(q) == Some(1) && q.identity && q.mode == BlitMode::COLORKEY,
        blit: index8_to_1_key_identity,
    },
    BlitEntry {
        name: "index8_to_1_key",
        features: CpuFeatures::empty(),
        applies: |q| dst_bytes(q) == Some(1) && q.mode == BlitMode::COLORKEY,
        blit: index8_to_1_key,
    },
    BlitEntry {
        name: "index8_to_n",
        features: CpuFeatures::empty(),
        applies: |q| dst_is_wide(q) && q.mode.is_empty(),
        blit: index8_to_n,
    },
    BlitEntry {
        name: "index8_to_n_key",
        features: CpuFeatures::empty(),
        applies: |q| dst_is_wide(q) && q.mode == BlitMode::COLORKEY,
        blit: index8_to_n_key,
    },
    // 8-bit to 8-bit blending would need a lookup table per alpha value.
    BlitEntry {
        name: "index8_to_n_alpha",
        features: CpuFeatures::empty(),
        applies: |q| dst_is_wide(q) && q.mode == BlitMode::ALPHA,
        blit: index8_to_n_alpha,
    },
    BlitEntry {
        name: "index8_to_n_alpha_key",
        features: CpuFeatures::empty(),
        applies: |q| dst_is_wide(q) && q.mode == BlitMode::COLORKEY | BlitMode::ALPHA,
        blit: index8_to_n_alpha_key,
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

#[inline]
fn translate(table: &[u32], index: u8) -> u8 {
    // An empty table means that both palettes are identical.
    table.get(usize::from(index)).map(|v| *v as u8).unwrap_or(index)
}

fn index8_to_1(info: &mut BlitInfo) {
    let table = info.table;
    let width = info.width;
    for (src, dst) in info.rows() {
        for (d, s) in dst[..width].iter_mut().zip(&src[..width]) {
            *d = translate(table, *s);
        }
    }
}

fn index8_to_1_key_identity(info: &mut BlitInfo) {
    let key = info.src_fmt.colorkey();
    let width = info.width;
    for (src, dst) in info.rows() {
        for (d, s) in dst[..width].iter_mut().zip(&src[..width]) {
            if u32::from(*s) != key {
                *d = *s;
            }
        }
    }
}

fn index8_to_1_key(info: &mut BlitInfo) {
    let table = info.table;
    let key = info.src_fmt.colorkey();
    let width = info.width;
    for (src, dst) in info.rows() {
        for (d, s) in dst[..width].iter_mut().zip(&src[..width]) {
            if u32::from(*s) != key {
                *d = translate(table, *s);
            }
        }
    }
}

fn index8_to_n(info: &mut BlitInfo) {
    let table = info.table;
    let width = info.width;
    let bpp = usize::from(info.dst_fmt.bytes_per_pixel());
    for (src, dst) in info.rows() {
        for (d, s) in dst.chunks_mut(bpp).zip(&src[..width]) {
            write_pixel(d, bpp, table[usize::from(*s)]);
        }
    }
}

fn index8_to_n_key(info: &mut BlitInfo) {
    let table = info.table;
    let key = info.src_fmt.colorkey();
    let width = info.width;
    let bpp = usize::from(info.dst_fmt.bytes_per_pixel());
    for (src, dst) in info.rows() {
        for (d, s) in dst.chunks_mut(bpp).zip(&src[..width]) {
            if u32::from(*s) != key {
                write_pixel(d, bpp, table[usize::from(*s)]);
            }
        }
    }
}

fn index8_to_n_alpha(info: &mut BlitInfo) {
    index8_alpha(info, None)
}

fn index8_to_n_alpha_key(info: &mut BlitInfo) {
    let key = info.src_fmt.colorkey();
    index8_alpha(info, Some(key))
}

fn index8_alpha(info: &mut BlitInfo, key: Option<u32>) {
    let src_fmt = info.src_fmt;
    let dst_fmt = info.dst_fmt;
    let alpha = src_fmt.alpha();
    let width = info.width;
    let bpp = usize::from(dst_fmt.bytes_per_pixel());

    let colors: Vec<Color> = match src_fmt.palette() {
        Some(palette) => palette.borrow().colors().to_vec(),
        None => return,
    };

    for (src, dst) in info.rows() {
        for (d, s) in dst.chunks_mut(bpp).zip(&src[..width]) {
            if key == Some(u32::from(*s)) {
                continue;
            }

            let sc = colors.get(usize::from(*s)).cloned().unwrap_or(Color::BLACK);
            let dc = dst_fmt.get_rgba(read_pixel(d, bpp));
            let pixel = dst_fmt.map_rgba(
                blend_u8(sc.red(), dc.red(), alpha),
                blend_u8(sc.green(), dc.green(), alpha),
                blend_u8(sc.blue(), dc.blue(), alpha),
                dc.alpha(),
            );
            write_pixel(d, bpp, pixel);
        }
    }
}
