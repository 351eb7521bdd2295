// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Solid rectangle fills.

use bytemuck::Pod;
use softblit_geom::Rect;

use crate::cpu::{self, CpuFeatures};
use crate::pixel_format::write_pixel;
use crate::{Error, Surface};

/// Fills a single row with a repeating 4-byte pattern.
type FillFn = fn(&mut [u8], [u8; 4]);

struct FillEntry {
    name: &'static str,
    features: CpuFeatures,
    fill: FillFn,
}

/// Fill routines for 1, 2 and 4 bytes per pixel, in order of preference.
static FILLS: &[FillEntry] = &[
    FillEntry {
        name: "fill_sse",
        features: CpuFeatures::SSE,
        fill: fill_sse,
    },
    FillEntry {
        name: "fill_words",
        features: CpuFeatures::empty(),
        fill: fill_lanes::<usize>,
    },
];

fn choose_fill() -> &'static FillEntry {
    FILLS
        .iter()
        .filter(|e| cfg!(feature = "simd") || e.features.is_empty())
        .find(|e| cpu::supports(e.features))
        .unwrap_or(&FILLS[FILLS.len() - 1])
}

impl Surface<'_> {
    /// Fills a rectangle with a pixel value.
    ///
    /// `color` must be already mapped to the surface format, see `PixelFormat::map_rgb`.
    /// The rectangle is clipped by the clip rectangle. `None` fills the whole
    /// clip rectangle.
    ///
    /// Surfaces with less than 8 bits per pixel cannot be filled.
    pub fn fill_rect(&mut self, rect: Option<Rect>, color: u32) -> Result<(), Error> {
        let bits = self.format().bits_per_pixel();
        if bits < 8 {
            log::warn!("cannot fill a {}-bit surface", bits);
            return Err(Error::UnsupportedFillFormat);
        }

        let clip_rect = self.clip_rect();
        let rect = match rect {
            Some(rect) => match rect.intersect(&clip_rect) {
                Some(rect) => rect,
                None => return Ok(()),
            },
            None => clip_rect,
        };

        if rect.is_empty() {
            return Ok(());
        }

        self.lock()?;

        let bpp = usize::from(self.format().bytes_per_pixel());
        let pitch = self.pitch();
        let (offset, _) = self.byte_offset(rect.x() as usize, rect.y() as usize);
        let row_len = rect.width() as usize * bpp;
        let rows = self.pixels.as_mut_slice()[offset..]
            .chunks_mut(pitch)
            .take(rect.height() as usize);

        if bpp == 3 {
            for row in rows {
                fill_rgb24(&mut row[..row_len], color);
            }
        } else {
            let entry = choose_fill();
            log::trace!("{} {:?} with {:#x}", entry.name, rect, color);

            let pattern = fill_pattern(color, bpp);
            for row in rows {
                (entry.fill)(&mut row[..row_len], pattern);
            }
        }

        self.unlock();
        Ok(())
    }
}

/// Repeats a pixel value to 32 bits.
fn fill_pattern(color: u32, bpp: usize) -> [u8; 4] {
    let color = match bpp {
        1 => (color & 0xFF) * 0x01010101,
        2 => (color & 0xFFFF) * 0x00010001,
        _ => color,
    };

    color.to_ne_bytes()
}

#[inline]
fn fill_bytes(bytes: &mut [u8], pattern: [u8; 4], phase: usize) {
    for (i, b) in bytes.iter_mut().enumerate() {
        *b = pattern[(phase + i) % 4];
    }
}

/// Fills the aligned middle of the row with whole lanes.
///
/// With `usize` lanes this writes one machine word per step.
fn fill_lanes<L: Pod>(row: &mut [u8], pattern: [u8; 4]) {
    let (head, body, tail) = bytemuck::pod_align_to_mut::<u8, L>(row);
    let phase = head.len();
    fill_bytes(head, pattern, 0);

    let mut lane = L::zeroed();
    fill_bytes(bytemuck::bytes_of_mut(&mut lane), pattern, phase);
    for l in body.iter_mut() {
        *l = lane;
    }

    fill_bytes(tail, pattern, phase + body.len() * core::mem::size_of::<L>());
}

cfg_if::cfg_if! {
    if #[cfg(all(feature = "simd", any(target_arch = "x86", target_arch = "x86_64")))] {
        #[cfg(target_arch = "x86")]
        use core::arch::x86::*;
        #[cfg(target_arch = "x86_64")]
        use core::arch::x86_64::*;

        use bytemuck::Zeroable;

        #[derive(Clone, Copy)]
        #[repr(C, align(16))]
        struct Lane128([u8; 16]);

        #[allow(unsafe_code)]
        unsafe impl Zeroable for Lane128 {}
        #[allow(unsafe_code)]
        unsafe impl Pod for Lane128 {}

        #[allow(unsafe_code)]
        fn fill_sse(row: &mut [u8], pattern: [u8; 4]) {
            if std::is_x86_feature_detected!("sse") {
                // SSE is present, checked above.
                unsafe { fill_sse_impl(row, pattern) }
            } else {
                fill_lanes::<usize>(row, pattern)
            }
        }

        #[allow(unsafe_code)]
        #[target_feature(enable = "sse")]
        unsafe fn fill_sse_impl(row: &mut [u8], pattern: [u8; 4]) {
            let (head, body, tail) = bytemuck::pod_align_to_mut::<u8, Lane128>(row);
            let phase = head.len();
            fill_bytes(head, pattern, 0);

            // Moved as raw bits, no float arithmetic is involved.
            let mut lane = Lane128([0; 16]);
            fill_bytes(&mut lane.0, pattern, phase);
            let v = _mm_load_ps(lane.0.as_ptr() as *const f32);
            for l in body.iter_mut() {
                // `Lane128` is 16-byte aligned.
                _mm_store_ps(l as *mut Lane128 as *mut f32, v);
            }

            fill_bytes(tail, pattern, phase + body.len() * 16);
        }
    } else {
        fn fill_sse(row: &mut [u8], pattern: [u8; 4]) {
            fill_lanes::<usize>(row, pattern)
        }
    }
}

fn fill_rgb24(row: &mut [u8], color: u32) {
    for pixel in row.chunks_exact_mut(3) {
        write_pixel(pixel, 3, color);
    }
}
