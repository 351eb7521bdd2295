// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

/// A list of possible errors.
///
/// A failed operation never leaves a surface half-modified.
#[derive(Clone, Copy, PartialEq, Eq, Debug, thiserror::Error)]
pub enum Error {
    /// A pixel buffer, format or palette allocation has failed.
    #[error("out of memory")]
    OutOfMemory,

    /// Bits per pixel are outside the 1..=32 range or not a packed depth (1, 2, 4, 8).
    #[error("unsupported pixel depth: {0}")]
    InvalidDepth(u8),

    /// Channel masks overlap each other or do not fit the pixel depth.
    #[error("invalid channel masks")]
    InvalidMasks,

    /// Surface dimensions or pitch are out of range.
    #[error("invalid surface size")]
    InvalidSize,

    /// A user provided buffer is smaller than `pitch * height`.
    #[error("pixel buffer is too small")]
    BufferTooSmall,

    /// Palette entries count doesn't match `2^bits_per_pixel`.
    #[error("palette doesn't match the surface format")]
    PaletteMismatch,

    /// A palette operation on a format without a palette.
    #[error("pixel format has no palette")]
    NoPalette,

    /// A destination palette contains only white entries.
    #[error("empty destination palette")]
    EmptyPalette,

    /// Alpha channel is not an 8-bit channel of a 32-bit format.
    #[error("unsupported surface alpha mask format")]
    UnsupportedAlphaFormat,

    /// No blit routine exists for the source/destination pair.
    #[error("blit combination not supported")]
    UnsupportedBlit,

    /// Surfaces must be unlocked before blitting.
    #[error("surfaces must not be locked during blit")]
    SurfaceLocked,

    /// Raw pixels were requested while the surface is RLE encoded.
    #[error("surface is RLE encoded, lock it to access pixels")]
    RleEncoded,

    /// Fill is not supported on packed (< 8 bpp) formats.
    #[error("fill rect on unsupported surface format")]
    UnsupportedFillFormat,

    /// A pre-clipped rectangle lies outside of the surface.
    #[error("rectangle is outside of the surface bounds")]
    InvalidRect,
}
