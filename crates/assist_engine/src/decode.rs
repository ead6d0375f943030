use chardetng::EncodingDetector;
use encoding_rs::Encoding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static str,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("sheet export is not valid {encoding}")]
    Malformed { encoding: &'static str },
}

/// Decodes a downloaded export: BOM, then the Content-Type charset, then
/// `chardetng` detection. Spreadsheet exports saved from Japanese locales
/// often arrive as Shift_JIS without a charset.
pub fn decode_text(bytes: &[u8], content_type: Option<&str>) -> Result<DecodedText, DecodeError> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return decode_with(&bytes[bom_len..], encoding);
    }

    if let Some(encoding) = content_type
        .and_then(charset_of)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return decode_with(bytes, encoding);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

fn charset_of(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|part| {
        let (key, value) = part.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(['"', '\'']).to_owned())
    })
}

fn decode_with(bytes: &[u8], encoding: &'static Encoding) -> Result<DecodedText, DecodeError> {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(DecodeError::Malformed {
            encoding: encoding.name(),
        });
    }
    Ok(DecodedText {
        text: text.into_owned(),
        encoding: encoding.name(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_jis_without_charset_is_detected() {
        let sheet = "番号,メッセージ\n\
                     1,お世話になっております。返信ありがとうございます。\n\
                     2,本日はよろしくお願いいたします。\n";
        let (bytes, _, _) = encoding_rs::SHIFT_JIS.encode(sheet);
        let decoded = decode_text(&bytes, Some("text/csv")).unwrap();
        assert_eq!(decoded.encoding, "Shift_JIS");
        assert!(decoded.text.contains("メッセージ"));
    }

    #[test]
    fn bom_wins_over_header() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("a,b".as_bytes());
        let decoded = decode_text(&bytes, Some("text/csv; charset=Shift_JIS")).unwrap();
        assert_eq!(decoded.text, "a,b");
        assert_eq!(decoded.encoding, "UTF-8");
    }

    #[test]
    fn declared_charset_is_used() {
        let (bytes, _, _) = encoding_rs::SHIFT_JIS.encode("返信");
        let decoded = decode_text(&bytes, Some("text/csv; Charset=\"shift_jis\"")).unwrap();
        assert_eq!(decoded.text, "返信");
    }
}
