// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use core::convert::TryFrom;

use crate::Rect;

/// An integer size.
///
/// # Guarantees
///
/// - Width and height are in 0..=i32::MAX range.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub struct Size {
    width: u32,
    height: u32,
}

impl Size {
    /// Creates a new `Size` from width and height.
    ///
    /// Zero is allowed. Values above `i32::MAX` are not.
    pub fn from_wh(width: u32, height: u32) -> Option<Self> {
        i32::try_from(width).ok()?;
        i32::try_from(height).ok()?;
        Some(Size { width, height })
    }

    /// Returns width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns width and height as a tuple.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Checks that either side is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Converts into a `Rect` at the provided position.
    pub fn to_rect(&self, x: i32, y: i32) -> Option<Rect> {
        Rect::from_xywh(x, y, self.width, self.height)
    }
}
