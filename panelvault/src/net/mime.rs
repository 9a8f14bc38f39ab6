use crate::ports::codec::WireFormat;

const SUPPORTED_UPLOADS: [WireFormat; 6] = [
    WireFormat::Bmp,
    WireFormat::Jpeg,
    WireFormat::Png,
    WireFormat::Webp,
    WireFormat::Avif,
    WireFormat::Jxl,
];

/// Media type of a `Content-Type` value without parameters, trimmed and lowercased.
///
/// `"Image/JXL; charset=binary"` becomes `"image/jxl"`.
pub fn content_type_essence(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Wire format declared by a response's `Content-Type`, if any.
pub fn declared_format<B>(response: &http::Response<B>) -> Option<WireFormat> {
    let value = response.headers().get(http::header::CONTENT_TYPE)?;
    let value = value.to_str().ok()?;
    WireFormat::from_mime(&content_type_essence(value))
}

/// Whether an upload with this MIME type is accepted for protection.
pub fn is_supported_upload(mime: &str) -> bool {
    WireFormat::from_mime(&content_type_essence(mime))
        .is_some_and(|format| SUPPORTED_UPLOADS.contains(&format))
}

#[cfg(test)]
#[path = "../../tests/unit/net/mime.rs"]
mod tests;
