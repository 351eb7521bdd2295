// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use super::{any_query, packed_get, packed_set, BlitEntry, BlitInfo};
use crate::cpu::CpuFeatures;

pub(super) static COPY: BlitEntry = BlitEntry {
    name: "copy",
    features: CpuFeatures::empty(),
    applies: any_query,
    blit: copy,
};

/// Used for self-blits that end up going through a snapshot.
pub(super) static COPY_OVERLAP: BlitEntry = BlitEntry {
    name: "copy_overlap",
    features: CpuFeatures::empty(),
    applies: any_query,
    blit: copy,
};

fn copy(info: &mut BlitInfo) {
    let bits = usize::from(info.src_fmt.bits_per_pixel());
    if bits < 8 {
        copy_packed(info, bits);
        return;
    }

    let len = info.width * usize::from(info.src_fmt.bytes_per_pixel());
    for (src, dst) in info.rows() {
        dst[..len].copy_from_slice(&src[..len]);
    }
}

fn copy_packed(info: &mut BlitInfo, bits: usize) {
    let width = info.width;
    let src_bit = info.src_bit_offset;
    let dst_bit = info.dst_bit_offset;
    for (src, dst) in info.rows() {
        for x in 0..width {
            let v = packed_get(src, src_bit + x * bits, bits);
            packed_set(dst, dst_bit + x * bits, bits, v);
        }
    }
}

/// Copies `height` rows of `row_len` bytes inside a single buffer.
///
/// Row order is picked so that overlapping source rows are read before being overwritten.
pub(crate) fn copy_overlap(
    pixels: &mut [u8],
    pitch: usize,
    src_offset: usize,
    dst_offset: usize,
    row_len: usize,
    height: usize,
) {
    if src_offset == dst_offset || row_len == 0 {
        return;
    }

    let mut copy_row = |y: usize| {
        let src = src_offset + y * pitch;
        pixels.copy_within(src..src + row_len, dst_offset + y * pitch);
    };

    if dst_offset < src_offset {
        (0..height).for_each(&mut copy_row);
    } else {
        (0..height).rev().for_each(&mut copy_row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_down() {
        // 1 byte per pixel, 4x4, move rows 0..3 one row down.
        let mut pixels: Vec<u8> = (0..16).collect();
        copy_overlap(&mut pixels, 4, 0, 4, 4, 3);
        assert_eq!(&pixels[4..], &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
    }

    #[test]
    fn overlap_up() {
        let mut pixels: Vec<u8> = (0..16).collect();
        copy_overlap(&mut pixels, 4, 4, 0, 4, 3);
        assert_eq!(&pixels[..12], &[4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15]);
    }

    #[test]
    fn overlap_within_row() {
        let mut pixels: Vec<u8> = (0..8).collect();
        copy_overlap(&mut pixels, 8, 0, 1, 4, 1);
        assert_eq!(pixels, &[0, 0, 1, 2, 3, 5, 6, 7]);
    }
}
