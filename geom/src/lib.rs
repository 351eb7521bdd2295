// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Integer geometry primitives used by [softblit](https://docs.rs/softblit/).
//!
//! Unlike most geometry crates, rectangles here are allowed to be empty:
//! a blit that was clipped away is reported as a zero-sized rectangle.

#![no_std]
#![warn(missing_docs)]
#![warn(missing_copy_implementations)]
#![warn(missing_debug_implementations)]
#![allow(clippy::manual_range_contains)]

#[cfg(feature = "std")]
extern crate std;

mod rect;
mod size;

pub use rect::Rect;
pub use size::Size;
