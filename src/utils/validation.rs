use data_encoding::BASE64;
use regex::Regex;

/// Accepts either a bare base64 string or a `data:<mime>;base64,` URI, the
/// two shapes browsers produce from FileReader.
pub fn validate_media_payload(payload: &str) -> bool {
    let encoded = base64_portion(payload);
    !encoded.is_empty() && BASE64.decode(encoded.as_bytes()).is_ok()
}

/// Strips a data-URI prefix if present, returning the base64 body.
pub fn base64_portion(payload: &str) -> &str {
    let re = Regex::new(r"^data:[a-zA-Z0-9.+-]+/[a-zA-Z0-9.+-]+;base64,").unwrap();
    match re.find(payload) {
        Some(m) => &payload[m.end()..],
        None => payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bare_base64() {
        assert!(validate_media_payload("aGVsbG8gd29ybGQ="));
    }

    #[test]
    fn accepts_data_uri() {
        assert!(validate_media_payload("data:image/png;base64,aGVsbG8="));
        assert!(validate_media_payload("data:video/mp4;base64,aGVsbG8="));
    }

    #[test]
    fn rejects_empty_and_garbage() {
        assert!(!validate_media_payload(""));
        assert!(!validate_media_payload("data:image/png;base64,"));
        assert!(!validate_media_payload("not base64 at all!!"));
    }

    #[test]
    fn strips_prefix_only_when_present() {
        assert_eq!(base64_portion("data:image/jpeg;base64,QUJD"), "QUJD");
        assert_eq!(base64_portion("QUJD"), "QUJD");
    }
}
