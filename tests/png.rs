#![cfg(feature = "png-format")]

use softblit::*;
use test_log::test;

#[test]
fn round_trip() {
    let mut s = Surface::new(3, 2, PixelFormat::rgb565()).unwrap();
    s.fill_rect(Rect::from_xywh(1, 0, 2, 1), 0xF800).unwrap();
    s.fill_rect(Rect::from_xywh(0, 1, 1, 1), 0x07E0).unwrap();
    s.set_color_key(true, false, 0).unwrap();

    let data = s.encode_png().unwrap();
    let decoded = Surface::decode_png(&data).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (3, 2));

    let rgba = |x, y| decoded.format().get_rgba(decoded.pixel(x, y).unwrap());
    assert_eq!(rgba(0, 0), Color::from_rgba(0, 0, 0, 0));
    assert_eq!(rgba(1, 0), Color::from_rgba(255, 0, 0, 255));
    assert_eq!(rgba(0, 1), Color::from_rgba(0, 255, 0, 255));
}

#[test]
fn garbage() {
    assert!(Surface::decode_png(b"not a png").is_err());
}
