use softblit::*;
use test_log::test;

const KEY: u32 = 0x00FF00FF;

/// Mostly transparent, so encoding pays off.
fn sprite(rle_ok: bool) -> Surface<'static> {
    let mut s = Surface::new(32, 4, PixelFormat::xrgb8888()).unwrap();
    s.fill_rect(None, KEY).unwrap();
    for y in 0..4 {
        s.fill_rect(Rect::from_xywh(y * 3, y, 4, 1), 0x00102030 * (y as u32 + 1)).unwrap();
    }

    s.set_color_key(true, rle_ok, KEY).unwrap();
    s
}

fn background() -> Surface<'static> {
    let mut s = Surface::new(40, 8, PixelFormat::xrgb8888()).unwrap();
    s.fill_rect(None, 0x00808080).unwrap();
    s
}

#[test]
fn encoded_blit_matches_plain() {
    let mut encoded = sprite(true);
    let mut plain = sprite(false);
    let mut a = background();
    let mut b = background();

    encoded.blit(None, &mut a, Rect::from_xywh(3, 2, 0, 0)).unwrap();
    plain.blit(None, &mut b, Rect::from_xywh(3, 2, 0, 0)).unwrap();

    assert!(encoded.is_rle_encoded());
    assert!(encoded.flags().contains(SurfaceFlags::RLEACCEL));
    assert!(!plain.is_rle_encoded());
    assert_eq!(a.pixels().unwrap(), b.pixels().unwrap());
}

#[test]
fn encoded_clipped_blit_matches_plain() {
    let mut encoded = sprite(true);
    let mut plain = sprite(false);

    for &(x, y) in &[(-5, -1), (30, 6), (-2, 5)] {
        let mut a = background();
        let mut b = background();
        let ra = encoded.blit(Rect::from_xywh(1, 1, 20, 3), &mut a, Rect::from_xywh(x, y, 0, 0)).unwrap();
        let rb = plain.blit(Rect::from_xywh(1, 1, 20, 3), &mut b, Rect::from_xywh(x, y, 0, 0)).unwrap();
        assert_eq!(ra, rb);
        assert_eq!(a.pixels().unwrap(), b.pixels().unwrap());
    }
}

#[test]
fn lock_round_trip() {
    let mut s = sprite(true);
    let original = s.pixels().unwrap().to_vec();
    let mut dst = background();
    s.blit(None, &mut dst, None).unwrap();
    assert!(s.is_rle_encoded());
    assert_eq!(s.pixel(0, 0), None);

    s.lock().unwrap();
    assert!(!s.is_rle_encoded());
    assert_eq!(s.pixels().unwrap(), &original[..]);
    s.unlock();

    // Encoded again, since the cached blit still uses RLE.
    assert!(s.is_rle_encoded());

    s.lock().unwrap();
    assert_eq!(s.pixels().unwrap(), &original[..]);
    s.unlock();
}

#[test]
fn unrle_is_idempotent() {
    let mut s = sprite(true);
    let original = s.pixels().unwrap().to_vec();
    let mut dst = background();
    s.blit(None, &mut dst, None).unwrap();

    s.unrle(false).unwrap();
    s.unrle(false).unwrap();
    assert!(!s.is_rle_encoded());
    assert_eq!(s.pixels().unwrap(), &original[..]);

    // Blitting again re-selects the RLE routine.
    s.blit(None, &mut dst, None).unwrap();
    assert!(s.is_rle_encoded());
}

#[test]
fn changing_colorkey_decodes() {
    let mut s = sprite(true);
    let mut dst = background();
    s.blit(None, &mut dst, None).unwrap();
    assert!(s.is_rle_encoded());

    s.set_color_key(false, false, 0).unwrap();
    assert!(!s.is_rle_encoded());
    assert_eq!(s.pixel(0, 0), Some(KEY));
}

#[test]
fn per_pixel_alpha_matches_plain() {
    let make = |rle_ok| {
        let mut s = Surface::new(32, 2, PixelFormat::argb8888()).unwrap();
        s.fill_rect(Rect::from_xywh(4, 0, 3, 2), 0x80FF0000).unwrap();
        s.fill_rect(Rect::from_xywh(20, 1, 2, 1), 0xFF00FF00).unwrap();
        s.set_alpha(true, rle_ok, 200).unwrap();
        s
    };

    let mut encoded = make(true);
    let mut plain = make(false);
    let mut a = background();
    let mut b = background();
    encoded.blit(None, &mut a, Rect::from_xywh(1, 1, 0, 0)).unwrap();
    plain.blit(None, &mut b, Rect::from_xywh(1, 1, 0, 0)).unwrap();

    assert!(encoded.is_rle_encoded());
    assert_eq!(a.pixels().unwrap(), b.pixels().unwrap());
}

#[test]
fn per_pixel_alpha_lock_round_trip() {
    let mut s = Surface::new(32, 2, PixelFormat::argb8888()).unwrap();
    s.fill_rect(Rect::from_xywh(4, 0, 3, 2), 0x80FF0000).unwrap();
    s.set_alpha(true, true, 255).unwrap();
    let original = s.pixels().unwrap().to_vec();

    let mut dst = background();
    s.blit(None, &mut dst, None).unwrap();
    assert!(s.is_rle_encoded());

    s.lock().unwrap();
    assert_eq!(s.pixels().unwrap(), &original[..]);
    s.unlock();
}

#[test]
fn nonzero_transparent_pixels_stay_raw() {
    let mut s = Surface::new(32, 2, PixelFormat::argb8888()).unwrap();
    s.fill_rect(None, 0x00123456).unwrap();
    s.fill_rect(Rect::from_xywh(4, 0, 3, 2), 0xFFFF0000).unwrap();
    s.set_alpha(true, true, 255).unwrap();

    let mut a = background();
    s.blit(None, &mut a, None).unwrap();
    assert!(!s.is_rle_encoded());

    // Invisible color bits are still there.
    assert_eq!(s.pixel(0, 0), Some(0x00123456));
    assert_eq!(a.pixel(0, 0), Some(0x00808080));
    assert_eq!(a.pixel(4, 0), Some(0x00FF0000));
}
