use super::*;

#[test]
fn essence_strips_parameters_and_case() {
    assert_eq!(content_type_essence("Image/JXL; charset=binary"), "image/jxl");
    assert_eq!(content_type_essence("  image/png  "), "image/png");
    assert_eq!(content_type_essence(""), "");
}

#[test]
fn declared_format_reads_the_header() {
    let resp = http::Response::builder()
        .header(http::header::CONTENT_TYPE, "image/jxl;q=1")
        .body(())
        .unwrap();
    assert_eq!(declared_format(&resp), Some(WireFormat::Jxl));

    let bare = http::Response::new(());
    assert_eq!(declared_format(&bare), None);

    let html = http::Response::builder()
        .header(http::header::CONTENT_TYPE, "text/html")
        .body(())
        .unwrap();
    assert_eq!(declared_format(&html), None);
}

#[test]
fn upload_whitelist() {
    for mime in [
        "image/bmp",
        "image/jpeg",
        "image/png",
        "image/webp",
        "image/avif",
        "image/jxl",
    ] {
        assert!(is_supported_upload(mime), "{mime}");
    }
    assert!(!is_supported_upload("image/gif"));
    assert!(!is_supported_upload("image/svg+xml"));
    assert!(!is_supported_upload("application/octet-stream"));
}
