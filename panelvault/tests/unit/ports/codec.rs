use super::*;

fn checker(width: u32, height: u32) -> RasterBuffer {
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            if (x + y) % 2 == 0 {
                pixels.extend_from_slice(&[255, 255, 255, 255]);
            } else {
                pixels.extend_from_slice(&[10, 20, 30, 255]);
            }
        }
    }
    RasterBuffer::new(width, height, pixels).unwrap()
}

#[test]
fn png_and_webp_are_lossless() {
    let codec = ImageCodec::new();
    let raster = checker(5, 4);
    for format in [WireFormat::Png, WireFormat::Webp, WireFormat::Bmp] {
        let bytes = codec.encode(&raster, format, 85).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), raster, "{format}");
    }
}

#[test]
fn webp_encoding_is_deterministic() {
    let codec = ImageCodec::new();
    let raster = checker(9, 7);
    let a = codec.encode(&raster, WireFormat::Webp, 85).unwrap();
    let b = codec.encode(&raster, WireFormat::Webp, 85).unwrap();
    assert_eq!(a, b);

    // Lossless, so quality does not change the output.
    let low = codec.encode(&raster, WireFormat::Webp, 10).unwrap();
    assert_eq!(a, low);
}

#[test]
fn jpeg_keeps_dimensions() {
    let codec = ImageCodec::new();
    let bytes = codec.encode(&checker(8, 6), WireFormat::Jpeg, 90).unwrap();
    let decoded = codec.decode(&bytes).unwrap();
    assert_eq!((decoded.width, decoded.height), (8, 6));
}

#[test]
fn unsupported_targets_and_garbage_are_codec_errors() {
    let codec = ImageCodec::new();
    assert!(!codec.can_encode(WireFormat::Jxl));
    assert!(matches!(
        codec.encode(&checker(2, 2), WireFormat::Jxl, 85),
        Err(PanelError::Codec(_))
    ));
    assert!(matches!(
        codec.decode(b"definitely not an image"),
        Err(PanelError::Codec(_))
    ));
}

#[test]
fn mime_and_extension_mapping() {
    assert_eq!(WireFormat::from_mime("image/jxl"), Some(WireFormat::Jxl));
    assert_eq!(WireFormat::from_mime(" IMAGE/WEBP "), Some(WireFormat::Webp));
    assert_eq!(WireFormat::from_mime("image/jpg"), Some(WireFormat::Jpeg));
    assert_eq!(WireFormat::from_mime("text/html"), None);
    assert_eq!(WireFormat::from_extension(".JPEG"), Some(WireFormat::Jpeg));
    assert_eq!(WireFormat::from_extension("tiff"), None);
    for f in WireFormat::ALL {
        assert_eq!(WireFormat::from_mime(f.mime()), Some(f));
        assert_eq!(WireFormat::from_extension(f.extension()), Some(f));
    }
}
