// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Alpha blending blits from direct color sources.
//!
//! The effective coverage of a pixel is its own alpha (opaque when the format
//! has no alpha channel) multiplied by the per-surface alpha.
//! Destination alpha is left as is.

use super::blit_n::{is_rgb555, is_rgb565, is_rgb888, key_and_mask};
use super::{BlitEntry, BlitInfo, BlitMode, BlitQuery};
use crate::blit_map::rgb332_index;
use crate::color::{blend_u8, mul_u8, AlphaU8, Color};
use crate::cpu::CpuFeatures;
use crate::pixel_format::{read_pixel, write_pixel};

pub(super) static BLITS: &[BlitEntry] = &[
    BlitEntry {
        name: "rgb888_surface_alpha_sse2",
        features: CpuFeatures::SSE2,
        applies: rgb888_surface_alpha_applies,
        blit: rgb888_surface_alpha_sse2,
    },
    BlitEntry {
        name: "rgb888_surface_alpha_x2",
        features: CpuFeatures::empty(),
        applies: rgb888_surface_alpha_applies,
        blit: rgb888_surface_alpha_x2,
    },
    BlitEntry {
        name: "rgb565_surface_alpha",
        features: CpuFeatures::empty(),
        applies: |q| surface_alpha_only(q) && q.identity && is_rgb565(q.dst),
        blit: rgb565_surface_alpha,
    },
    BlitEntry {
        name: "rgb555_surface_alpha",
        features: CpuFeatures::empty(),
        applies: |q| surface_alpha_only(q) && q.identity && is_rgb555(q.dst),
        blit: rgb555_surface_alpha,
    },
    BlitEntry {
        name: "argb8888_to_rgb888_pixel_alpha",
        features: CpuFeatures::empty(),
        applies: |q| {
            let [sr, sg, sb, sa] = q.src.masks();
            let [dr, dg, db, _] = q.dst.masks();
            q.mode == BlitMode::ALPHA
                && q.src.bits_per_pixel() == 32
                && q.dst.bits_per_pixel() == 32
                && sa == 0xFF000000
                && (sr, sg, sb) == (dr, dg, db)
        },
        blit: argb8888_to_rgb888_pixel_alpha,
    },
    BlitEntry {
        name: "n_to_1_alpha",
        features: CpuFeatures::empty(),
        applies: |q| dst_bytes(q) == Some(1) && q.mode == BlitMode::ALPHA,
        blit: n_to_1_alpha,
    },
    BlitEntry {
        name: "n_to_1_alpha_key",
        features: CpuFeatures::empty(),
        applies: |q| dst_bytes(q) == Some(1) && q.mode == BlitMode::COLORKEY | BlitMode::ALPHA,
        blit: n_to_1_alpha_key,
    },
    BlitEntry {
        name: "n_to_n_alpha",
        features: CpuFeatures::empty(),
        applies: |q| dst_is_wide(q) && q.mode == BlitMode::ALPHA,
        blit: n_to_n_alpha,
    },
    BlitEntry {
        name: "n_to_n_alpha_key",
        features: CpuFeatures::empty(),
        applies: |q| dst_is_wide(q) && q.mode == BlitMode::COLORKEY | BlitMode::ALPHA,
        blit: n_to_n_alpha_key,
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

fn surface_alpha_only(q: &BlitQuery) -> bool {
    q.mode == BlitMode::ALPHA && !q.src.has_alpha_channel()
}

fn rgb888_surface_alpha_applies(q: &BlitQuery) -> bool {
    surface_alpha_only(q) && is_rgb888(q.src) && is_rgb888(q.dst)
}

const RB_MASK: u32 = 0x00FF00FF;
const RB_MASK_X2: u64 = 0x00FF00FF00FF00FF;

/// Blends two 8-bit lanes packed as `0x00XX00YY`.
///
/// Same as `blend_u8` applied to each lane.
#[inline]
fn blend_lanes(s: u32, d: u32, alpha: u32) -> u32 {
    let x = s * alpha + d * (255 - alpha) + 0x00800080;
    ((x + ((x >> 8) & RB_MASK)) >> 8) & RB_MASK
}

/// Same as `blend_lanes`, but for four lanes at once.
#[inline]
fn blend_lanes_x2(s: u64, d: u64, alpha: u64) -> u64 {
    let x = s * alpha + d * (255 - alpha) + 0x0080008000800080;
    ((x + ((x >> 8) & RB_MASK_X2)) >> 8) & RB_MASK_X2
}

#[inline]
fn blend_rgb888(s: u32, d: u32, alpha: u32) -> u32 {
    let rb = blend_lanes(s & RB_MASK, d & RB_MASK, alpha);
    let g = blend_lanes((s >> 8) & RB_MASK, (d >> 8) & RB_MASK, alpha);
    rb | ((g << 8) & 0x0000FF00) | (d & 0xFF000000)
}

#[inline]
fn load_u32(bytes: &[u8]) -> u32 {
    u32::from_ne_bytes(*arrayref::array_ref!(bytes, 0, 4))
}

#[inline]
fn store_u32(bytes: &mut [u8], v: u32) {
    bytes[..4].copy_from_slice(&v.to_ne_bytes());
}

/// Blends two pixels per 64-bit word.
///
/// Produces exactly the same output as `blend_rgb888` per pixel.
fn rgb888_surface_alpha_x2(info: &mut BlitInfo) {
    let alpha = u64::from(info.src_fmt.alpha());
    let width = info.width;
    for (src, dst) in info.rows() {
        let src = &src[..width * 4];
        let dst = &mut dst[..width * 4];

        let mut src_pairs = src.chunks_exact(8);
        let mut dst_pairs = dst.chunks_exact_mut(8);
        for (s, d) in (&mut src_pairs).zip(&mut dst_pairs) {
            let sp = u64::from(load_u32(s)) | u64::from(load_u32(&s[4..])) << 32;
            let dp = u64::from(load_u32(d)) | u64::from(load_u32(&d[4..])) << 32;

            let rb = blend_lanes_x2(sp & RB_MASK_X2, dp & RB_MASK_X2, alpha);
            let g = blend_lanes_x2((sp >> 8) & RB_MASK_X2, (dp >> 8) & RB_MASK_X2, alpha);
            let v = rb | ((g << 8) & 0x0000FF000000FF00) | (dp & 0xFF000000FF000000);

            store_u32(d, v as u32);
            store_u32(&mut d[4..], (v >> 32) as u32);
        }

        // Odd width tail.
        let (s, d) = (src_pairs.remainder(), dst_pairs.into_remainder());
        if s.len() == 4 {
            let v = blend_rgb888(load_u32(s), load_u32(d), alpha as u32);
            store_u32(d, v);
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(all(feature = "simd", any(target_arch = "x86", target_arch = "x86_64")))] {
        #[cfg(target_arch = "x86")]
        use core::arch::x86::*;
        #[cfg(target_arch = "x86_64")]
        use core::arch::x86_64::*;

        /// Blends four pixels per 128-bit register.
        ///
        /// Produces exactly the same output as `blend_rgb888` per pixel.
        #[allow(unsafe_code)]
        fn rgb888_surface_alpha_sse2(info: &mut BlitInfo) {
            if std::is_x86_feature_detected!("sse2") {
                // SSE2 is present, checked above.
                unsafe { rgb888_surface_alpha_sse2_impl(info) }
            } else {
                rgb888_surface_alpha_x2(info)
            }
        }

        #[allow(unsafe_code)]
        #[target_feature(enable = "sse2")]
        unsafe fn rgb888_surface_alpha_sse2_impl(info: &mut BlitInfo) {
            let alpha = info.src_fmt.alpha();
            let a = _mm_set1_epi16(i16::from(alpha));
            let inv_a = _mm_set1_epi16(255 - i16::from(alpha));
            let zero = _mm_setzero_si128();
            let top = _mm_set1_epi32(0xFF000000u32 as i32);
            let width = info.width;
            for (src, dst) in info.rows() {
                let src = &src[..width * 4];
                let dst = &mut dst[..width * 4];

                let mut src_quads = src.chunks_exact(16);
                let mut dst_quads = dst.chunks_exact_mut(16);
                for (s, d) in (&mut src_quads).zip(&mut dst_quads) {
                    let sv = _mm_loadu_si128(s.as_ptr() as *const __m128i);
                    let dv = _mm_loadu_si128(d.as_ptr() as *const __m128i);
                    let lo = blend_epi16(_mm_unpacklo_epi8(sv, zero), _mm_unpacklo_epi8(dv, zero), a, inv_a);
                    let hi = blend_epi16(_mm_unpackhi_epi8(sv, zero), _mm_unpackhi_epi8(dv, zero), a, inv_a);
                    let v = _mm_packus_epi16(lo, hi);
                    let v = _mm_or_si128(_mm_andnot_si128(top, v), _mm_and_si128(top, dv));
                    _mm_storeu_si128(d.as_mut_ptr() as *mut __m128i, v);
                }

                let (s, d) = (src_quads.remainder(), dst_quads.into_remainder());
                for (s, d) in s.chunks_exact(4).zip(d.chunks_exact_mut(4)) {
                    store_u32(d, blend_rgb888(load_u32(s), load_u32(d), u32::from(alpha)));
                }
            }
        }

        // `blend_u8` on eight 16-bit lanes. No lane exceeds 0xFFFF.
        #[allow(unsafe_code)]
        #[inline]
        #[target_feature(enable = "sse2")]
        unsafe fn blend_epi16(s: __m128i, d: __m128i, a: __m128i, inv_a: __m128i) -> __m128i {
            let x = _mm_add_epi16(_mm_mullo_epi16(s, a), _mm_mullo_epi16(d, inv_a));
            let x = _mm_add_epi16(x, _mm_set1_epi16(128));
            _mm_srli_epi16(_mm_add_epi16(x, _mm_srli_epi16(x, 8)), 8)
        }
    } else {
        fn rgb888_surface_alpha_sse2(info: &mut BlitInfo) {
            rgb888_surface_alpha_x2(info)
        }
    }
}

fn rgb565_surface_alpha(info: &mut BlitInfo) {
    surface_alpha_16(info, 0x07E0F81F, 0xF7DE, 0x0821)
}

fn rgb555_surface_alpha(info: &mut BlitInfo) {
    surface_alpha_16(info, 0x03E07C1F, 0xFBDE, 0x0421)
}

// Spreads the green channel into the high half-word, so all three channels
// can be blended with a single multiplication at 5-bit alpha precision.
// Alpha 128 is an average of each channel, rounding half up.
fn surface_alpha_16(info: &mut BlitInfo, spread_mask: u32, half_mask: u16, low_bits: u16) {
    let alpha = info.src_fmt.alpha();
    let alpha5 = u32::from(alpha >> 3);
    let width = info.width;
    for (src, dst) in info.rows() {
        let src = &src[..width * 2];
        for (s, d) in src.chunks_exact(2).zip(dst.chunks_exact_mut(2)) {
            let sp = u16::from_ne_bytes([s[0], s[1]]);
            let dp = u16::from_ne_bytes([d[0], d[1]]);
            let v = if alpha == 128 {
                (((sp & half_mask) >> 1) + ((dp & half_mask) >> 1)) + ((sp | dp) & low_bits)
            } else {
                let s32 = (u32::from(sp) | u32::from(sp) << 16) & spread_mask;
                let d32 = (u32::from(dp) | u32::from(dp) << 16) & spread_mask;
                let d32 = d32.wrapping_add(s32.wrapping_sub(d32).wrapping_mul(alpha5) >> 5) & spread_mask;
                (d32 | d32 >> 16) as u16
            };
            d.copy_from_slice(&v.to_ne_bytes());
        }
    }
}

fn argb8888_to_rgb888_pixel_alpha(info: &mut BlitInfo) {
    let surface_alpha = info.src_fmt.alpha();
    let width = info.width;
    for (src, dst) in info.rows() {
        let src = &src[..width * 4];
        for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
            let sp = load_u32(s);
            let alpha = mul_u8((sp >> 24) as u8, surface_alpha);
            let dp = load_u32(d);
            match alpha {
                0 => {}
                255 => store_u32(d, (sp & 0x00FFFFFF) | (dp & 0xFF000000)),
                _ => store_u32(d, blend_rgb888(sp, dp, u32::from(alpha))),
            }
        }
    }
}

#[inline]
fn blend_color(s: Color, d: Color, alpha: AlphaU8) -> (u8, u8, u8) {
    (
        blend_u8(s.red(), d.red(), alpha),
        blend_u8(s.green(), d.green(), alpha),
        blend_u8(s.blue(), d.blue(), alpha),
    )
}

fn n_to_1_alpha(info: &mut BlitInfo) {
    alpha_to_1(info, false)
}

fn n_to_1_alpha_key(info: &mut BlitInfo) {
    alpha_to_1(info, true)
}

fn alpha_to_1(info: &mut BlitInfo, use_key: bool) {
    let src_fmt = info.src_fmt;
    let dst_fmt = info.dst_fmt;
    let table = info.table;
    let surface_alpha = src_fmt.alpha();
    let (key, mask) = key_and_mask(src_fmt);
    let bpp = usize::from(src_fmt.bytes_per_pixel());
    let width = info.width;

    let dst_colors: Vec<Color> = match dst_fmt.palette() {
        Some(palette) => palette.borrow().colors().to_vec(),
        None => return,
    };

    for (src, dst) in info.rows() {
        let src = &src[..width * bpp];
        for (s, d) in src.chunks_exact(bpp).zip(dst.iter_mut()) {
            let pixel = read_pixel(s, bpp);
            if use_key && pixel & mask == key {
                continue;
            }

            let sc = src_fmt.get_rgba(pixel);
            let alpha = mul_u8(sc.alpha(), surface_alpha);
            let dc = dst_colors.get(usize::from(*d)).cloned().unwrap_or(Color::BLACK);
            let (r, g, b) = blend_color(sc, dc, alpha);
            *d = match table.get(rgb332_index(r, g, b)) {
                Some(index) => *index as u8,
                None => dst_fmt.map_rgb(r, g, b) as u8,
            };
        }
    }
}

fn n_to_n_alpha(info: &mut BlitInfo) {
    alpha_to_n(info, false)
}

fn n_to_n_alpha_key(info: &mut BlitInfo) {
    alpha_to_n(info, true)
}

fn alpha_to_n(info: &mut BlitInfo, use_key: bool) {
    let src_fmt = info.src_fmt;
    let dst_fmt = info.dst_fmt;
    let surface_alpha = src_fmt.alpha();
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

            let sc = src_fmt.get_rgba(pixel);
            let alpha = mul_u8(sc.alpha(), surface_alpha);
            if alpha == 0 {
                continue;
            }

            let dc = dst_fmt.get_rgba(read_pixel(d, dst_bpp));
            let (r, g, b) = blend_color(sc, dc, alpha);
            write_pixel(d, dst_bpp, dst_fmt.map_rgba(r, g, b, dc.alpha()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PixelFormat;

    fn run(f: fn(&mut BlitInfo), src_fmt: &PixelFormat, dst_fmt: &PixelFormat, src: &[u8], dst: &mut [u8], width: usize) {
        let bpp_src = usize::from(src_fmt.bytes_per_pixel());
        let bpp_dst = usize::from(dst_fmt.bytes_per_pixel());
        let mut info = BlitInfo {
            src,
            src_pitch: width * bpp_src,
            src_bit_offset: 0,
            dst,
            dst_pitch: width * bpp_dst,
            dst_bit_offset: 0,
            width,
            height: 1,
            src_fmt,
            dst_fmt,
            table: &[],
        };
        f(&mut info);
    }

    // One pixel at a time.
    fn rgb888_surface_alpha(info: &mut BlitInfo) {
        let alpha = u32::from(info.src_fmt.alpha());
        let width = info.width;
        for (src, dst) in info.rows() {
            let src = &src[..width * 4];
            for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
                let (sp, dp) = (load_u32(s), load_u32(d));
                store_u32(d, blend_rgb888(sp, dp, alpha));
            }
        }
    }

    fn pixels(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_ne_bytes().to_vec()).collect()
    }

    #[test]
    fn lanes_match_scalar_blend() {
        for &alpha in &[0u32, 1, 77, 127, 129, 200, 254, 255] {
            for &(s, d) in &[(0u8, 255u8), (255, 0), (13, 200), (128, 128)] {
                let v = blend_lanes(u32::from(s) << 16 | u32::from(d), u32::from(d) << 16 | u32::from(s), alpha);
                assert_eq!((v >> 16) as u8, blend_u8(s, d, alpha as u8));
                assert_eq!(v as u8, blend_u8(d, s, alpha as u8));
            }
        }
    }

    #[test]
    fn x2_matches_scalar() {
        let mut fmt = PixelFormat::xrgb8888();
        fmt.set_alpha(77);
        let src = pixels(&[0x00FF0000, 0x0000FF00, 0x000000FF, 0x00123456, 0x00FFFFFF]);
        let mut a = pixels(&[0xFF000000, 0xFF0000FF, 0xFF00FF00, 0xFF654321, 0xFF808080]);
        let mut b = a.clone();

        run(rgb888_surface_alpha, &fmt, &fmt, &src, &mut a, 5);
        run(rgb888_surface_alpha_x2, &fmt, &fmt, &src, &mut b, 5);
        assert_eq!(a, b);

        // Destination top byte is kept.
        assert!(a.chunks(4).all(|p| load_u32(p) >> 24 == 0xFF));
    }

    #[test]
    fn sse2_matches_scalar() {
        let mut fmt = PixelFormat::xrgb8888();
        let src: Vec<u32> = (0..11u32).map(|i| i.wrapping_mul(0x01172B3D) & 0x00FFFFFF).collect();
        let dst: Vec<u32> = (0..11u32).map(|i| i.wrapping_mul(0x2F0D1907) | 0xFF000000).collect();
        for &alpha in &[0u8, 1, 64, 127, 128, 129, 200, 255] {
            fmt.set_alpha(alpha);
            let src = pixels(&src);
            let mut a = pixels(&dst);
            let mut b = a.clone();
            run(rgb888_surface_alpha, &fmt, &fmt, &src, &mut a, 11);
            run(rgb888_surface_alpha_sse2, &fmt, &fmt, &src, &mut b, 11);
            assert_eq!(a, b, "alpha {}", alpha);
        }
    }

    #[test]
    fn rgb888_half_rounds() {
        let mut fmt = PixelFormat::xrgb8888();
        fmt.set_alpha(128);
        let src = pixels(&[0x00FF0001, 0x00FF0001]);
        let mut a = pixels(&[0x00000003, 0x00000003]);
        let mut b = a.clone();
        run(rgb888_surface_alpha, &fmt, &fmt, &src, &mut a, 2);
        run(rgb888_surface_alpha_x2, &fmt, &fmt, &src, &mut b, 2);
        assert_eq!(a, pixels(&[0x00800002, 0x00800002]));
        assert_eq!(a, b);
    }

    #[test]
    fn rgb565_alpha() {
        let mut fmt = PixelFormat::rgb565();
        let src = 0xFFFFu16.to_ne_bytes();

        fmt.set_alpha(0);
        let mut dst = 0x0000u16.to_ne_bytes();
        run(rgb565_surface_alpha, &fmt, &fmt, &src, &mut dst, 1);
        assert_eq!(u16::from_ne_bytes(dst), 0);

        fmt.set_alpha(128);
        run(rgb565_surface_alpha, &fmt, &fmt, &src, &mut dst, 1);
        assert_eq!(u16::from_ne_bytes(dst), 0x8410);
    }

    #[test]
    fn rgb555_half_keeps_top_bit() {
        let mut fmt = PixelFormat::rgb555();
        fmt.set_alpha(128);
        let src = 0x7FFFu16.to_ne_bytes();
        let mut dst = 0x0000u16.to_ne_bytes();
        run(rgb555_surface_alpha, &fmt, &fmt, &src, &mut dst, 1);
        assert_eq!(u16::from_ne_bytes(dst), 0x4210);
    }

    #[test]
    fn pixel_alpha_modulated() {
        let mut fmt = PixelFormat::argb8888();
        fmt.set_alpha(128);
        let dst_fmt = PixelFormat::xrgb8888();
        let src = pixels(&[0xFFFF0000, 0x00FF0000]);
        let mut dst = pixels(&[0x000000FF, 0x000000FF]);
        run(argb8888_to_rgb888_pixel_alpha, &fmt, &dst_fmt, &src, &mut dst, 2);
        assert_eq!(dst, pixels(&[0x0080007F, 0x000000FF]));
    }

    #[test]
    fn generic_matches_specialized() {
        let mut fmt = PixelFormat::argb8888();
        fmt.set_alpha(200);
        let dst_fmt = PixelFormat::xrgb8888();
        let src = pixels(&[0x80FF8000, 0x40102030, 0xFF000000, 0x00FFFFFF]);
        let mut a = pixels(&[0x00102030, 0x00FFFFFF, 0x00808080, 0x00000000]);
        let mut b = a.clone();
        run(argb8888_to_rgb888_pixel_alpha, &fmt, &dst_fmt, &src, &mut a, 4);
        run(n_to_n_alpha, &fmt, &dst_fmt, &src, &mut b, 4);
        assert_eq!(a, b);
    }
}
