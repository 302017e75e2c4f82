//! Minimal JPEG APP1/Exif segment handling.
//!
//! Re-encoding through the `image` crate drops every metadata segment, so the
//! processing stage captures the raw Exif payload from the source bytes and
//! splices it back into the freshly encoded output. Only JPEG is handled —
//! PNG outputs are saved losslessly without metadata carry-over.
//!
//! Zero external dependencies: a JPEG file is a flat sequence of
//! `FF mm [len_hi len_lo payload]` segments, which is all the structure this
//! needs. Any parse irregularity degrades to "no metadata", never an error.

/// JPEG Start Of Image marker.
const SOI: [u8; 2] = [0xFF, 0xD8];
/// APP1 marker byte (Exif and XMP both live here).
const APP1: u8 = 0xE1;
/// Exif payloads start with this identifier.
const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// Extract the raw Exif APP1 payload (including the `Exif\0\0` header) from
/// a JPEG byte stream.
///
/// Returns `None` for non-JPEG data, JPEGs without Exif, or anything
/// malformed enough to stop the segment walk.
pub fn extract_app1(bytes: &[u8]) -> Option<Vec<u8>> {
    if bytes.len() < 4 || bytes[..2] != SOI {
        return None;
    }

    let mut pos = 2;
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];

        // Start of scan: entropy-coded data follows, no more headers.
        if marker == 0xDA {
            return None;
        }
        // Standalone markers (RSTn, TEM) carry no length.
        if (0xD0..=0xD7).contains(&marker) || marker == 0x01 {
            pos += 2;
            continue;
        }

        let length = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        if length < 2 || pos + 2 + length > bytes.len() {
            return None;
        }
        let payload = &bytes[pos + 4..pos + 2 + length];

        if marker == APP1 && payload.starts_with(EXIF_HEADER) {
            return Some(payload.to_vec());
        }
        pos += 2 + length;
    }
    None
}

/// Insert an Exif APP1 segment right after SOI in an encoded JPEG.
///
/// Returns the input unchanged when it is not a JPEG or the payload cannot
/// fit a segment (the 16-bit length field caps payloads at 65533 bytes); a
/// watermarked image without metadata beats an invalid file.
pub fn splice_app1(encoded: &[u8], payload: &[u8]) -> Vec<u8> {
    if encoded.len() < 2 || encoded[..2] != SOI || payload.len() + 2 > u16::MAX as usize {
        return encoded.to_vec();
    }

    let length = (payload.len() + 2) as u16;
    let mut out = Vec::with_capacity(encoded.len() + payload.len() + 4);
    out.extend_from_slice(&SOI);
    out.push(0xFF);
    out.push(APP1);
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(&encoded[2..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal JPEG-shaped byte stream: SOI + given segments + SOS stub.
    fn jpeg_with_segments(segments: &[(u8, &[u8])]) -> Vec<u8> {
        let mut bytes = SOI.to_vec();
        for (marker, payload) in segments {
            bytes.push(0xFF);
            bytes.push(*marker);
            bytes.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
            bytes.extend_from_slice(payload);
        }
        bytes.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02]);
        bytes
    }

    fn exif_payload() -> Vec<u8> {
        let mut p = EXIF_HEADER.to_vec();
        p.extend_from_slice(b"II*\0fake-tiff-body");
        p
    }

    #[test]
    fn extracts_exif_app1() {
        let payload = exif_payload();
        let jpeg = jpeg_with_segments(&[(APP1, &payload)]);
        assert_eq!(extract_app1(&jpeg), Some(payload));
    }

    #[test]
    fn skips_non_exif_app1_and_other_segments() {
        let payload = exif_payload();
        let jpeg = jpeg_with_segments(&[
            (0xE0, b"JFIF\0rest"),           // APP0
            (APP1, b"http://ns.adobe.com/"), // XMP, also APP1
            (APP1, &payload),
        ]);
        assert_eq!(extract_app1(&jpeg), Some(payload));
    }

    #[test]
    fn no_exif_returns_none() {
        let jpeg = jpeg_with_segments(&[(0xE0, b"JFIF\0")]);
        assert_eq!(extract_app1(&jpeg), None);
    }

    #[test]
    fn non_jpeg_returns_none() {
        assert_eq!(extract_app1(b"\x89PNG\r\n\x1a\n"), None);
        assert_eq!(extract_app1(&[]), None);
    }

    #[test]
    fn truncated_segment_returns_none() {
        let payload = exif_payload();
        let mut jpeg = jpeg_with_segments(&[(APP1, &payload)]);
        jpeg.truncate(8);
        assert_eq!(extract_app1(&jpeg), None);
    }

    #[test]
    fn splice_then_extract_round_trips() {
        let encoded = jpeg_with_segments(&[(0xE0, b"JFIF\0")]);
        let payload = exif_payload();

        let spliced = splice_app1(&encoded, &payload);
        assert_eq!(extract_app1(&spliced), Some(payload));
        // Original segments still follow the inserted one.
        assert!(spliced.windows(5).any(|w| w == b"JFIF\0"));
    }

    #[test]
    fn splice_into_non_jpeg_is_identity() {
        let not_jpeg = b"plainly not a jpeg".to_vec();
        assert_eq!(splice_app1(&not_jpeg, &exif_payload()), not_jpeg);
    }

    #[test]
    fn oversized_payload_is_dropped() {
        let encoded = jpeg_with_segments(&[]);
        let huge = vec![0u8; u16::MAX as usize];
        assert_eq!(splice_app1(&encoded, &huge), encoded);
    }
}
