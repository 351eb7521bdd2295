// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::blit_map::FormatVersion;
use crate::{Color, Error};

/// A palette shared between surfaces.
pub type SharedPalette = Rc<RefCell<Palette>>;

/// An ordered list of colors indexed by pixel value.
///
/// Surfaces that use a palette register themselves as watchers,
/// so any change to the palette content invalidates blits
/// that were computed against the old colors.
pub struct Palette {
    colors: Vec<Color>,
    watchers: Vec<Weak<FormatVersion>>,
}

impl Palette {
    /// Allocates a new palette with `count` white entries.
    ///
    /// Count must be in 1..=256 range.
    pub fn new(count: usize) -> Result<Self, Error> {
        if count == 0 || count > 256 {
            return Err(Error::PaletteMismatch);
        }

        let mut colors = Vec::new();
        colors.try_reserve_exact(count).map_err(|_| Error::OutOfMemory)?;
        colors.resize(count, Color::WHITE);

        Ok(Palette {
            colors,
            watchers: Vec::new(),
        })
    }

    /// Creates a palette from a list of colors.
    pub fn from_colors(colors: &[Color]) -> Result<Self, Error> {
        let mut palette = Palette::new(colors.len())?;
        palette.colors.copy_from_slice(colors);
        Ok(palette)
    }

    /// Allocates a palette suitable for a `bits_per_pixel` deep format.
    ///
    /// A 1-bit palette is white/black, everything else is a grayscale ramp.
    pub(crate) fn default_for_depth(bits_per_pixel: u8) -> Result<Self, Error> {
        let count = 1usize << bits_per_pixel;
        let mut palette = Palette::new(count)?;
        if count == 2 {
            palette.colors[0] = Color::WHITE;
            palette.colors[1] = Color::BLACK;
        } else {
            let max = (count - 1) as u32;
            for (i, c) in palette.colors.iter_mut().enumerate() {
                let v = ((i as u32 * 255 + max / 2) / max) as u8;
                *c = Color::from_rgb(v, v, v);
            }
        }

        Ok(palette)
    }

    /// Wraps the palette for sharing.
    pub fn into_shared(self) -> SharedPalette {
        Rc::new(RefCell::new(self))
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Checks that the palette has no entries. Never true for a valid palette.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Returns palette colors.
    #[inline]
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Returns a color at `index`.
    #[inline]
    pub fn color(&self, index: usize) -> Option<Color> {
        self.colors.get(index).cloned()
    }

    /// Replaces colors starting at `first`, notifying all watchers.
    ///
    /// Colors that do not fit are ignored.
    /// Returns `false` when not all colors were set.
    pub fn set_colors(&mut self, first: usize, colors: &[Color]) -> bool {
        if first >= self.colors.len() {
            return colors.is_empty();
        }

        let count = colors.len().min(self.colors.len() - first);
        self.colors[first..first + count].copy_from_slice(&colors[..count]);
        self.notify();

        count == colors.len()
    }

    /// Returns the index of the closest color.
    ///
    /// Uses squared euclidean distance in RGB space. Alpha is ignored.
    pub fn find_color(&self, color: Color) -> u8 {
        let mut best = 0;
        let mut best_distance = u32::MAX;
        for (i, c) in self.colors.iter().enumerate() {
            let distance = c.distance_sq(&color);
            if distance < best_distance {
                best = i;
                best_distance = distance;
                if distance == 0 {
                    break;
                }
            }
        }

        best as u8
    }

    /// Checks that every entry is white, which would produce an empty image.
    pub(crate) fn is_all_white(&self) -> bool {
        self.colors.iter().all(|c| c.is_white())
    }

    pub(crate) fn add_watcher(&mut self, version: &Rc<FormatVersion>) {
        self.watchers.retain(|w| w.strong_count() > 0);
        self.watchers.push(Rc::downgrade(version));
    }

    pub(crate) fn remove_watcher(&mut self, version: &Rc<FormatVersion>) {
        let ptr = Rc::as_ptr(version);
        self.watchers.retain(|w| w.strong_count() > 0 && w.as_ptr() != ptr);
    }

    /// Returns the number of live surfaces watching this palette.
    pub fn watchers_count(&self) -> usize {
        self.watchers.iter().filter(|w| w.strong_count() > 0).count()
    }

    fn notify(&mut self) {
        self.watchers.retain(|w| w.strong_count() > 0);
        for watcher in &self.watchers {
            if let Some(version) = watcher.upgrade() {
                version.bump();
            }
        }
    }
}

impl Clone for Palette {
    /// Copies colors only. Watchers belong to the original palette.
    fn clone(&self) -> Self {
        Palette {
            colors: self.colors.clone(),
            watchers: Vec::new(),
        }
    }
}

impl PartialEq for Palette {
    fn eq(&self, other: &Self) -> bool {
        self.colors == other.colors
    }
}

impl core::fmt::Debug for Palette {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Palette")
            .field("colors", &self.colors.len())
            .field("watchers", &self.watchers_count())
            .finish()
    }
}
