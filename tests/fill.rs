use softblit::*;
use test_log::test;

#[test]
fn fill_16bit() {
    let mut s = Surface::new(10, 10, PixelFormat::rgb565()).unwrap();
    s.fill_rect(Rect::from_xywh(2, 2, 3, 3), 0xF800).unwrap();

    let mut filled = 0;
    for y in 0..10 {
        for x in 0..10 {
            let inside = (2..5).contains(&x) && (2..5).contains(&y);
            let expected = if inside { 0xF800 } else { 0 };
            assert_eq!(s.pixel(x, y), Some(expected), "{}x{}", x, y);
            if inside {
                filled += 1;
            }
        }
    }

    assert_eq!(filled, 9);
}

#[test]
fn fill_whole_surface() {
    for format in [PixelFormat::indexed8(), PixelFormat::rgb565(), PixelFormat::rgb24(), PixelFormat::xrgb8888()] {
        let color = format.map_rgb(12, 200, 255);
        let mut s = Surface::new(37, 5, format).unwrap();
        s.fill_rect(None, color).unwrap();
        for y in 0..5 {
            for x in 0..37 {
                assert_eq!(s.pixel(x, y), Some(color));
            }
        }
    }
}

#[test]
fn fill_odd_offsets() {
    let mut s = Surface::new(33, 3, PixelFormat::indexed8()).unwrap();
    s.fill_rect(Rect::from_xywh(1, 1, 31, 1), 0x7F).unwrap();
    let pitch = s.pitch();
    let data = s.pixels().unwrap();
    assert_eq!(data[pitch], 0);
    assert!(data[pitch + 1..pitch + 32].iter().all(|b| *b == 0x7F));
    assert_eq!(data[pitch + 32], 0);
    assert!(data[..pitch].iter().all(|b| *b == 0));
}

#[test]
fn fill_clipped() {
    let mut s = Surface::new(4, 4, PixelFormat::xrgb8888()).unwrap();
    s.fill_rect(Rect::from_xywh(-2, -2, 3, 3), 1).unwrap();
    assert_eq!(s.pixel(0, 0), Some(1));
    assert_eq!(s.pixel(1, 0), Some(0));
    assert_eq!(s.pixel(0, 1), Some(0));

    s.fill_rect(Rect::from_xywh(10, 10, 3, 3), 2).unwrap();
    assert!(s.pixels().unwrap().iter().filter(|b| **b != 0).count() == 1);
}

#[test]
fn fill_packed() {
    let mut s = Surface::new(8, 1, PixelFormat::new(4, 0, 0, 0, 0).unwrap()).unwrap();
    assert_eq!(s.fill_rect(None, 1), Err(Error::UnsupportedFillFormat));
}

#[test]
fn fill_zero_extent() {
    for format in [PixelFormat::indexed8(), PixelFormat::rgb565(), PixelFormat::rgb24(), PixelFormat::xrgb8888()] {
        let mut s = Surface::new(5, 5, format).unwrap();
        s.fill_rect(Rect::from_xywh(1, 1, 0, 3), 0xFF).unwrap();
        s.fill_rect(Rect::from_xywh(1, 1, 3, 0), 0xFF).unwrap();
        s.fill_rect(Rect::from_xywh(0, 0, 0, 0), 0xFF).unwrap();
        assert!(s.pixels().unwrap().iter().all(|b| *b == 0));
    }
}

#[test]
fn fill_then_overwrite() {
    let mut s = Surface::new(8, 8, PixelFormat::xrgb8888()).unwrap();
    s.fill_rect(None, 0x00112233).unwrap();
    s.fill_rect(Rect::from_xywh(2, 2, 3, 3), 0x00FF0000).unwrap();

    let mut red = 0;
    for y in 0..8 {
        for x in 0..8 {
            let inside = (2..5).contains(&x) && (2..5).contains(&y);
            let expected = if inside { 0x00FF0000 } else { 0x00112233 };
            assert_eq!(s.pixel(x, y), Some(expected), "{}x{}", x, y);
            if inside {
                red += 1;
            }
        }
    }

    assert_eq!(red, 9);
}
