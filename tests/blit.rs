use softblit::*;
use test_log::test;

fn rgb_at(surface: &Surface, x: u32, y: u32) -> (u8, u8, u8) {
    surface.format().get_rgb(surface.pixel(x, y).unwrap())
}

#[test]
fn colorkey_paletted_onto_rgb24() {
    let mut src = Surface::new(4, 4, PixelFormat::indexed8()).unwrap();
    src.format()
        .palette()
        .unwrap()
        .borrow_mut()
        .set_colors(0, &[Color::BLACK, Color::WHITE]);

    let pitch = src.pitch();
    src.pixels_mut().unwrap()[2 * pitch + 1] = 1;
    src.set_color_key(true, false, 1).unwrap();

    let mut dst = Surface::new(4, 4, PixelFormat::rgb24()).unwrap();
    let red = dst.format().map_rgb(255, 0, 0);
    dst.fill_rect(None, red).unwrap();

    let rect = src.blit(None, &mut dst, None).unwrap();
    assert_eq!(rect, Rect::from_xywh(0, 0, 4, 4).unwrap());

    let mut black = 0;
    for y in 0..4 {
        for x in 0..4 {
            match rgb_at(&dst, x, y) {
                (0, 0, 0) => black += 1,
                (255, 0, 0) => assert_eq!((x, y), (1, 2)),
                c => panic!("unexpected color {:?} at {}x{}", c, x, y),
            }
        }
    }

    assert_eq!(black, 15);
}

#[test]
fn pixel_alpha_over_opaque() {
    let mut src = Surface::new(1, 1, PixelFormat::argb8888()).unwrap();
    assert!(src.flags().contains(SurfaceFlags::SRCALPHA));
    src.pixels_mut().unwrap().copy_from_slice(&0x80FF0000u32.to_ne_bytes());

    let mut dst = Surface::new(1, 1, PixelFormat::xrgb8888()).unwrap();
    dst.fill_rect(None, 0x000000FF).unwrap();

    src.blit(None, &mut dst, None).unwrap();
    assert_eq!(rgb_at(&dst, 0, 0), (128, 0, 127));
}

#[test]
fn surface_alpha_half() {
    let mut src = Surface::new(2, 1, PixelFormat::rgb565()).unwrap();
    src.fill_rect(None, 0xFFFF).unwrap();
    src.set_alpha(true, false, 128).unwrap();

    let mut dst = Surface::new(2, 1, PixelFormat::rgb565()).unwrap();
    src.blit(None, &mut dst, None).unwrap();
    assert_eq!(dst.pixel(0, 0), Some(0x8410));
    assert_eq!(dst.pixel(1, 0), Some(0x8410));
}

#[test]
fn clipping() {
    let mut src = Surface::new(4, 4, PixelFormat::rgb565()).unwrap();
    let mut dst = Surface::new(4, 4, PixelFormat::rgb565()).unwrap();

    let r = src.blit(None, &mut dst, Rect::from_xywh(2, 2, 0, 0)).unwrap();
    assert_eq!(r, Rect::from_xywh(2, 2, 2, 2).unwrap());

    let r = src.blit(None, &mut dst, Rect::from_xywh(-1, -3, 0, 0)).unwrap();
    assert_eq!(r, Rect::from_xywh(0, 0, 3, 1).unwrap());

    let r = src.blit(None, &mut dst, Rect::from_xywh(10, 0, 0, 0)).unwrap();
    assert!(r.is_empty());

    dst.set_clip_rect(Rect::from_xywh(1, 1, 1, 1));
    let r = src.blit(None, &mut dst, None).unwrap();
    assert_eq!(r, Rect::from_xywh(1, 1, 1, 1).unwrap());
}

#[test]
fn clipped_source_offset() {
    let mut src = Surface::new(4, 1, PixelFormat::indexed8()).unwrap();
    src.pixels_mut().unwrap()[..4].copy_from_slice(&[1, 2, 3, 4]);

    let mut dst = Surface::new(4, 1, PixelFormat::indexed8()).unwrap();
    let r = src.blit(None, &mut dst, Rect::from_xywh(-2, 0, 0, 0)).unwrap();
    assert_eq!(r, Rect::from_xywh(0, 0, 2, 1).unwrap());
    assert_eq!(&dst.pixels().unwrap()[..4], &[3, 4, 0, 0]);
}

#[test]
fn remap_on_destination_change() {
    let mut src = Surface::new(2, 2, PixelFormat::xrgb8888()).unwrap();
    src.fill_rect(None, 0x00FF8000).unwrap();

    let mut d16 = Surface::new(2, 2, PixelFormat::rgb565()).unwrap();
    let mut d24 = Surface::new(2, 2, PixelFormat::rgb24()).unwrap();
    for _ in 0..3 {
        src.blit(None, &mut d16, None).unwrap();
        src.blit(None, &mut d24, None).unwrap();
    }

    assert_eq!(d16.pixel(1, 1), Some(0xFC00));
    assert_eq!(rgb_at(&d24, 1, 1), (255, 128, 0));
}

#[test]
fn remap_on_palette_change() {
    let mut src = Surface::new(1, 1, PixelFormat::indexed8()).unwrap();
    let palette = src.format().palette().unwrap().clone();
    palette.borrow_mut().set_colors(0, &[Color::from_rgb(10, 20, 30)]);

    let mut dst = Surface::new(1, 1, PixelFormat::rgb24()).unwrap();
    src.blit(None, &mut dst, None).unwrap();
    assert_eq!(rgb_at(&dst, 0, 0), (10, 20, 30));

    palette.borrow_mut().set_colors(0, &[Color::from_rgb(40, 50, 60)]);
    src.blit(None, &mut dst, None).unwrap();
    assert_eq!(rgb_at(&dst, 0, 0), (40, 50, 60));
}

#[test]
fn packed_source() {
    let mut src = Surface::new(4, 1, PixelFormat::new(1, 0, 0, 0, 0).unwrap()).unwrap();
    src.format()
        .palette()
        .unwrap()
        .borrow_mut()
        .set_colors(0, &[Color::BLACK, Color::WHITE]);
    src.pixels_mut().unwrap()[0] = 0b1010_0000;
    assert_eq!(src.pixel(0, 0), Some(1));
    assert_eq!(src.pixel(1, 0), Some(0));

    let mut dst = Surface::new(4, 1, PixelFormat::rgb24()).unwrap();
    src.blit(None, &mut dst, None).unwrap();
    assert_eq!(rgb_at(&dst, 0, 0), (255, 255, 255));
    assert_eq!(rgb_at(&dst, 1, 0), (0, 0, 0));
    assert_eq!(rgb_at(&dst, 2, 0), (255, 255, 255));
    assert_eq!(rgb_at(&dst, 3, 0), (0, 0, 0));
}

#[test]
fn locked_surfaces_are_rejected() {
    let mut src = Surface::new(1, 1, PixelFormat::rgb565()).unwrap();
    let mut dst = Surface::new(1, 1, PixelFormat::rgb565()).unwrap();

    src.lock().unwrap();
    assert_eq!(src.blit(None, &mut dst, None), Err(Error::SurfaceLocked));
    src.unlock();

    dst.lock().unwrap();
    assert_eq!(src.blit(None, &mut dst, None), Err(Error::SurfaceLocked));
    dst.unlock();

    assert!(src.blit(None, &mut dst, None).is_ok());
}

#[test]
fn lower_blit_checks_bounds() {
    let mut src = Surface::new(2, 2, PixelFormat::rgb565()).unwrap();
    let mut dst = Surface::new(2, 2, PixelFormat::rgb565()).unwrap();
    let r = Rect::from_xywh(1, 1, 2, 2).unwrap();
    assert_eq!(lower_blit(&mut src, r, &mut dst, r), Err(Error::InvalidRect));

    let r = Rect::from_xywh(0, 0, 2, 2).unwrap();
    assert!(lower_blit(&mut src, r, &mut dst, r).is_ok());
}

#[test]
fn overlapping_self_blit() {
    let mut s = Surface::new(4, 2, PixelFormat::indexed8()).unwrap();
    let pitch = s.pitch();
    s.pixels_mut().unwrap()[..4].copy_from_slice(&[1, 2, 3, 4]);

    let r = s.blit_within(Rect::from_xywh(0, 0, 3, 1), Rect::from_xywh(1, 0, 0, 0)).unwrap();
    assert_eq!(r, Rect::from_xywh(1, 0, 3, 1).unwrap());
    assert_eq!(&s.pixels().unwrap()[..4], &[1, 1, 2, 3]);

    s.blit_within(Rect::from_xywh(0, 0, 4, 1), Rect::from_xywh(0, 1, 0, 0)).unwrap();
    assert_eq!(&s.pixels().unwrap()[pitch..pitch + 4], &[1, 1, 2, 3]);
}

#[test]
fn keyed_self_blit() {
    let mut s = Surface::new(4, 1, PixelFormat::xrgb8888()).unwrap();
    for (x, v) in [5u32, 0, 7, 8].iter().enumerate() {
        s.pixels_mut().unwrap()[x * 4..x * 4 + 4].copy_from_slice(&v.to_ne_bytes());
    }

    s.set_color_key(true, false, 0).unwrap();
    s.blit_within(Rect::from_xywh(0, 0, 2, 1), Rect::from_xywh(2, 0, 0, 0)).unwrap();
    assert_eq!(s.pixel(2, 0), Some(5));
    assert_eq!(s.pixel(3, 0), Some(8));
}

#[test]
fn conversion_round_trip() {
    let mut s = Surface::new(3, 2, PixelFormat::xrgb8888()).unwrap();
    for (i, p) in s.pixels_mut().unwrap().chunks_exact_mut(4).enumerate() {
        p.copy_from_slice(&(0x00102030u32 * (i as u32 + 1)).to_ne_bytes());
    }

    let original = s.pixels().unwrap().to_vec();
    let mut rgb = s.convert(&PixelFormat::rgb24(), SurfaceFlags::empty()).unwrap();
    let mut back = rgb.convert(&PixelFormat::xrgb8888(), SurfaceFlags::empty()).unwrap();
    assert_eq!(back.pixels().unwrap(), &original[..]);
    back.free();
}

#[test]
fn conversion_bakes_colorkey() {
    let mut s = Surface::new(2, 1, PixelFormat::rgb565()).unwrap();
    s.pixels_mut().unwrap()[2..4].copy_from_slice(&0xFFFFu16.to_ne_bytes());
    s.set_color_key(true, false, 0).unwrap();

    let converted = s.convert(&PixelFormat::argb8888(), SurfaceFlags::empty()).unwrap();
    assert_eq!(converted.pixel(0, 0), Some(0));
    assert_eq!(converted.pixel(1, 0), Some(0xFFFFFFFF));
    assert!(!converted.flags().contains(SurfaceFlags::SRCCOLORKEY));

    // The source is left as it was.
    assert!(s.flags().contains(SurfaceFlags::SRCCOLORKEY));
    assert_eq!(s.format().colorkey(), 0);
}

#[test]
fn conversion_rejects_white_palette() {
    let mut s = Surface::new(1, 1, PixelFormat::rgb565()).unwrap();
    let format = PixelFormat::indexed8();
    format
        .palette()
        .unwrap()
        .borrow_mut()
        .set_colors(0, &[Color::WHITE; 256]);
    assert_eq!(s.convert(&format, SurfaceFlags::empty()).err(), Some(Error::EmptyPalette));
}

#[test]
fn to_paletted() {
    let mut src = Surface::new(2, 1, PixelFormat::xrgb8888()).unwrap();
    src.pixels_mut().unwrap()[4..8].copy_from_slice(&0x00FFFFFFu32.to_ne_bytes());

    let mut dst = Surface::new(2, 1, PixelFormat::indexed8()).unwrap();
    dst.format()
        .palette()
        .unwrap()
        .borrow_mut()
        .set_colors(0, &[Color::WHITE, Color::BLACK]);
    src.blit(None, &mut dst, None).unwrap();
    assert_eq!(dst.pixel(0, 0), Some(1));
    assert_eq!(dst.pixel(1, 0), Some(0));
}

fn fill_blue(s: &mut Surface) {
    let blue = s.format().map_rgb(0, 0, 255);
    s.fill_rect(None, blue).unwrap();
}

#[test]
fn surface_alpha_onto_rgb24() {
    let mut src = Surface::new(3, 2, PixelFormat::xrgb8888()).unwrap();
    src.fill_rect(None, 0x00FF0000).unwrap();
    src.set_alpha(true, false, 100).unwrap();

    let mut dst = Surface::new(3, 2, PixelFormat::rgb24()).unwrap();
    fill_blue(&mut dst);
    src.blit(None, &mut dst, None).unwrap();
    assert_eq!(rgb_at(&dst, 0, 0), (100, 0, 155));
    assert_eq!(rgb_at(&dst, 2, 1), (100, 0, 155));
}

#[test]
fn pixel_alpha_onto_rgb24() {
    let mut src = Surface::new(2, 1, PixelFormat::argb8888()).unwrap();
    src.fill_rect(None, 0x80FF0000).unwrap();

    let mut dst = Surface::new(2, 1, PixelFormat::rgb24()).unwrap();
    fill_blue(&mut dst);
    src.blit(None, &mut dst, None).unwrap();
    assert_eq!(rgb_at(&dst, 1, 0), (128, 0, 127));
}

#[test]
fn surface_alpha_modulates_pixel_alpha() {
    let mut src = Surface::new(2, 2, PixelFormat::argb8888()).unwrap();
    src.fill_rect(None, 0xFFFF0000).unwrap();
    src.set_alpha(true, false, 128).unwrap();

    let mut dst = Surface::new(2, 2, PixelFormat::xrgb8888()).unwrap();
    fill_blue(&mut dst);
    src.blit(None, &mut dst, None).unwrap();
    for y in 0..2 {
        for x in 0..2 {
            assert_eq!(rgb_at(&dst, x, y), (128, 0, 127));
        }
    }
}

#[test]
fn blit_after_conversion_to_alpha_format() {
    let mut src = Surface::new(2, 1, PixelFormat::argb8888()).unwrap();
    src.fill_rect(None, 0x80FF0000).unwrap();

    let mut converted = src.convert(&PixelFormat::argb8888(), SurfaceFlags::empty()).unwrap();
    assert_eq!(converted.pixel(0, 0), Some(0x80FF0000));
    assert!(src.flags().contains(SurfaceFlags::SRCALPHA));

    // The conversion copy must not leak into later blits.
    converted.fill_rect(None, 0xFF0000FF).unwrap();
    src.blit(None, &mut converted, None).unwrap();
    assert_eq!(converted.pixel(0, 0), Some(0xFF80007F));
    assert_eq!(converted.pixel(1, 0), Some(0xFF80007F));
}

#[test]
fn toggle_modes_between_destinations() {
    let mut src = Surface::new(2, 1, PixelFormat::xrgb8888()).unwrap();
    src.fill_rect(Rect::from_xywh(0, 0, 1, 1), 0x00FF0000).unwrap();
    src.fill_rect(Rect::from_xywh(1, 0, 1, 1), 0x0000FF00).unwrap();

    let mut d16 = Surface::new(2, 1, PixelFormat::rgb565()).unwrap();
    let mut d24 = Surface::new(2, 1, PixelFormat::rgb24()).unwrap();

    let mut check = |src: &mut Surface, left: (u8, u8, u8), right: (u8, u8, u8)| {
        for dst in [&mut d16, &mut d24] {
            fill_blue(dst);
            src.blit(None, dst, None).unwrap();
            let format = dst.format();
            assert_eq!(dst.pixel(0, 0), Some(format.map_rgb(left.0, left.1, left.2)));
            assert_eq!(dst.pixel(1, 0), Some(format.map_rgb(right.0, right.1, right.2)));
        }
    };

    check(&mut src, (255, 0, 0), (0, 255, 0));

    src.set_color_key(true, false, 0x0000FF00).unwrap();
    check(&mut src, (255, 0, 0), (0, 0, 255));

    src.set_alpha(true, false, 128).unwrap();
    check(&mut src, (128, 0, 127), (0, 0, 255));

    src.set_color_key(false, false, 0).unwrap();
    check(&mut src, (128, 0, 127), (0, 128, 127));

    src.set_alpha(false, false, 0).unwrap();
    check(&mut src, (255, 0, 0), (0, 255, 0));
}
