// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use core::convert::TryFrom;

use crate::Size;

/// An integer rectangle.
///
/// # Guarantees
///
/// - Width and height are in 0..=i32::MAX range.
/// - x+width and y+height does not overflow.
///
/// A rectangle with zero width or height is valid, but empty.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub struct Rect {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
}

impl Rect {
    /// Creates a new `Rect`.
    pub fn from_xywh(x: i32, y: i32, width: u32, height: u32) -> Option<Self> {
        x.checked_add(i32::try_from(width).ok()?)?;
        y.checked_add(i32::try_from(height).ok()?)?;

        Some(Rect {
            x,
            y,
            width,
            height,
        })
    }

    /// Creates a new `Rect`.
    pub fn from_ltrb(left: i32, top: i32, right: i32, bottom: i32) -> Option<Self> {
        let width = u32::try_from(right.checked_sub(left)?).ok()?;
        let height = u32::try_from(bottom.checked_sub(top)?).ok()?;
        Rect::from_xywh(left, top, width, height)
    }

    /// Creates an empty rectangle at the specified position.
    pub const fn empty_at(x: i32, y: i32) -> Self {
        Rect {
            x,
            y,
            width: 0,
            height: 0,
        }
    }

    /// Returns rect's X position.
    pub fn x(&self) -> i32 {
        self.x
    }

    /// Returns rect's Y position.
    pub fn y(&self) -> i32 {
        self.y
    }

    /// Returns rect's width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns rect's height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns rect's left edge.
    pub fn left(&self) -> i32 {
        self.x
    }

    /// Returns rect's top edge.
    pub fn top(&self) -> i32 {
        self.y
    }

    /// Returns rect's right edge.
    pub fn right(&self) -> i32 {
        // No overflow is guaranteed by constructors.
        self.x + self.width as i32
    }

    /// Returns rect's bottom edge.
    pub fn bottom(&self) -> i32 {
        // No overflow is guaranteed by constructors.
        self.y + self.height as i32
    }

    /// Returns rect's size.
    pub fn size(&self) -> Size {
        // Width and height are already limited to i32::MAX.
        Size::from_wh(self.width, self.height).unwrap_or_default()
    }

    /// Checks that either side is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Checks that the rect is completely includes `other` Rect.
    ///
    /// An empty `other` is contained when its origin is inside or on the edge.
    pub fn contains(&self, other: &Self) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }

    /// Returns an intersection of two rectangles.
    ///
    /// Returns `None` when the intersection is empty.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);

        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right <= left || bottom <= top {
            return None;
        }

        Rect::from_ltrb(left, top, right, bottom)
    }

    /// Translates the rect by the specified offset.
    pub fn translate(&self, tx: i32, ty: i32) -> Option<Self> {
        Rect::from_xywh(self.x.checked_add(tx)?, self.y.checked_add(ty)?, self.width, self.height)
    }

    /// Translates the rect to the specified position.
    pub fn translate_to(&self, x: i32, y: i32) -> Option<Self> {
        Rect::from_xywh(x, y, self.width, self.height)
    }
}
