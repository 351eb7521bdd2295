// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

/*!
`softblit` is a software surface blitter.

It moves rectangles of pixels between surfaces of arbitrary pixel formats,
converting between formats and compositing with a colorkey and/or alpha on the way.

- A `Surface` is a pixel buffer with a `PixelFormat`, a clip rectangle
  and colorkey/alpha settings.
- The first blit between two surfaces selects the fastest routine for
  the format pair and caches it in the source. Changing either format,
  the colorkey, the alpha or a shared palette invalidates the cache.
- Surfaces that are blitted with a colorkey or per-pixel alpha
  can be run-length encoded to skip transparent pixels.
- `Surface::fill_rect` fills a rectangle with a solid color.

Routines are selected using the CPU features detected at runtime.
See the `cpu` functions and `CPU_FEATURES_ENV` for overriding them.
*/

#![doc(html_root_url = "https://docs.rs/softblit/0.1.0")]
#![warn(unsafe_code)]
#![warn(missing_docs)]
#![warn(missing_copy_implementations)]
#![warn(missing_debug_implementations)]
#![allow(clippy::collapsible_if)]
#![allow(clippy::identity_op)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::too_many_arguments)]

mod blit;
mod blit_map;
mod color;
mod cpu;
mod error;
mod fill;
mod palette;
mod pixel_format;
mod rle;
mod surface;

pub use softblit_geom::{Rect, Size};

pub use blit::{lower_blit, upper_blit, upper_blit_within};
pub use color::{AlphaU8, Color, ALPHA_U8_OPAQUE, ALPHA_U8_TRANSPARENT};
pub use cpu::{cpu_features, has_3dnow, has_altivec, has_mmx, has_sse, has_sse2};
pub use cpu::{CpuFeatures, CPU_FEATURES_ENV};
pub use error::Error;
pub use palette::{Palette, SharedPalette};
pub use pixel_format::PixelFormat;
pub use surface::{Surface, SurfaceFlags};
