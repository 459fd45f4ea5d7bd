//! Compact token (`header.payload.signature`) decoding
//!
//! Decoding does not check the signature. See [`crate::auth::signature`] for
//! the verifier that runs before claims are trusted.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde_json::Value;

use super::claims::Claims;

// Standard alphabet, padding optional: payloads are translated from the
// URL-safe alphabet first and usually arrive unpadded.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// The three segments of a compact token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segments<'a> {
    pub header: &'a str,
    pub payload: &'a str,
    pub signature: &'a str,
}

/// Split on `.`; anything but exactly three segments is rejected
pub fn split(token: &str) -> Option<Segments<'_>> {
    let mut parts = token.split('.');
    let header = parts.next()?;
    let payload = parts.next()?;
    let signature = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Segments {
        header,
        payload,
        signature,
    })
}

/// Decode the payload segment into a claims map
///
/// Any failure (segment count, base64, JSON, non-object payload) yields `None`.
pub fn decode(token: &str) -> Option<Claims> {
    let segments = split(token)?;
    let standard: String = segments
        .payload
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    let bytes = PAYLOAD_ENGINE.decode(standard).ok()?;
    match serde_json::from_slice::<Value>(&bytes).ok()? {
        Value::Object(map) => Some(Claims::new(map)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    fn compact(claims: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{}.{}.signature", header, payload)
    }

    #[test]
    fn test_decode_payload() {
        let exp = 1_700_003_600;
        let token = compact(&json!({"sub": "user-1", "exp": exp}));
        let claims = decode(&token).unwrap();
        assert_eq!(claims.get("sub"), Some(&json!("user-1")));
        assert_eq!(claims.exp(), Ok(Some(exp)));
    }

    #[test]
    fn test_decode_url_safe_characters() {
        let token = compact(&json!({"sub": "a??>b", "note": "~~~"}));
        let payload = split(&token).unwrap().payload;
        assert!(payload.contains('-') && payload.contains('_'));
        let claims = decode(&token).unwrap();
        assert_eq!(claims.get("sub"), Some(&json!("a??>b")));
    }

    #[test]
    fn test_decode_padded_payload() {
        let payload = base64::engine::general_purpose::URL_SAFE.encode(r#"{"sub":"u"}"#);
        let token = format!("h.{}.s", payload);
        assert!(decode(&token).is_some());
    }

    #[test]
    fn test_wrong_segment_count() {
        assert!(decode("only.two").is_none());
        assert!(decode("a.b.c.d").is_none());
        assert!(decode("").is_none());
    }

    #[test]
    fn test_invalid_payload() {
        assert!(decode("h.%%%.s").is_none());
        let not_json = URL_SAFE_NO_PAD.encode("not json");
        assert!(decode(&format!("h.{}.s", not_json)).is_none());
        let not_object = URL_SAFE_NO_PAD.encode("[1,2,3]");
        assert!(decode(&format!("h.{}.s", not_object)).is_none());
    }

    #[test]
    fn test_split_segments() {
        let segments = split("aa.bb.cc").unwrap();
        assert_eq!(segments.header, "aa");
        assert_eq!(segments.payload, "bb");
        assert_eq!(segments.signature, "cc");
    }
}
