use crate::error::DocPressError;
use encoding_rs::{Encoding, IBM866, KOI8_R, MACINTOSH, WINDOWS_1252};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

// Bytes the classic Windows-1252 code page leaves undefined. The WHATWG
// mapping used by encoding_rs decodes them to C1 controls instead of
// failing, so a declared Windows-1252 decode screens them out explicitly.
const WINDOWS_1252_HOLES: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Windows1252,
    Ibm866,
    Koi8R,
    MacRoman,
}

impl TextEncoding {
    pub fn label(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Windows1252 => "windows-1252",
            TextEncoding::Ibm866 => "ibm866",
            TextEncoding::Koi8R => "koi8-r",
            TextEncoding::MacRoman => "mac-roman",
        }
    }

    pub fn from_label(raw: &str) -> Option<TextEncoding> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(TextEncoding::Utf8),
            "windows-1252" | "cp1252" | "latin-1" => Some(TextEncoding::Windows1252),
            "ibm866" | "cp866" | "dos" => Some(TextEncoding::Ibm866),
            "koi8-r" | "koi8" => Some(TextEncoding::Koi8R),
            "mac-roman" | "macintosh" => Some(TextEncoding::MacRoman),
            _ => None,
        }
    }

    fn legacy_encoding(self) -> Option<&'static Encoding> {
        match self {
            TextEncoding::Utf8 => None,
            TextEncoding::Windows1252 => Some(WINDOWS_1252),
            TextEncoding::Ibm866 => Some(IBM866),
            TextEncoding::Koi8R => Some(KOI8_R),
            TextEncoding::MacRoman => Some(MACINTOSH),
        }
    }
}

/// Decode order for `EncodingSelector::Auto`: strict UTF-8 first, then the
/// legacy pages from most to least likely. First success wins.
pub const AUTO_DETECT_ORDER: [TextEncoding; 5] = [
    TextEncoding::Utf8,
    TextEncoding::Windows1252,
    TextEncoding::Ibm866,
    TextEncoding::Koi8R,
    TextEncoding::MacRoman,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingSelector {
    Auto,
    Declared(TextEncoding),
}

impl EncodingSelector {
    pub fn from_label(raw: &str) -> Option<EncodingSelector> {
        if raw.trim().eq_ignore_ascii_case("auto") {
            return Some(EncodingSelector::Auto);
        }
        TextEncoding::from_label(raw).map(EncodingSelector::Declared)
    }
}

/// Decodes raw input bytes into normalized text (`\r\n` and `\r` become
/// `\n`). Returns the encoding that actually decoded the bytes alongside
/// the text, so callers can report what auto-detection settled on.
pub fn decode(
    bytes: &[u8],
    selector: EncodingSelector,
) -> Result<(String, TextEncoding), DocPressError> {
    match selector {
        EncodingSelector::Declared(encoding) => {
            let text = decode_with(bytes, encoding)?;
            Ok((text, encoding))
        }
        EncodingSelector::Auto => {
            for encoding in AUTO_DETECT_ORDER {
                if let Ok(text) = decode_with(bytes, encoding) {
                    return Ok((text, encoding));
                }
            }
            // Unreachable in practice: IBM866, KOI8-R and MacRoman map all
            // 256 byte values.
            Err(DocPressError::Decode(
                "no supported encoding decodes the input".to_string(),
            ))
        }
    }
}

fn decode_with(bytes: &[u8], encoding: TextEncoding) -> Result<String, DocPressError> {
    let text = match encoding {
        TextEncoding::Utf8 => {
            let stripped = bytes.strip_prefix(&UTF8_BOM).unwrap_or(bytes);
            std::str::from_utf8(stripped)
                .map_err(|err| {
                    DocPressError::Decode(format!(
                        "invalid utf-8 at byte {}",
                        err.valid_up_to()
                    ))
                })?
                .to_string()
        }
        TextEncoding::Windows1252 => {
            if let Some(pos) = bytes.iter().position(|b| WINDOWS_1252_HOLES.contains(b)) {
                return Err(DocPressError::Decode(format!(
                    "byte 0x{:02X} at offset {} is not defined in windows-1252",
                    bytes[pos], pos
                )));
            }
            decode_legacy(bytes, encoding)?
        }
        _ => decode_legacy(bytes, encoding)?,
    };
    Ok(normalize_newlines(&text))
}

fn decode_legacy(bytes: &[u8], encoding: TextEncoding) -> Result<String, DocPressError> {
    let Some(table) = encoding.legacy_encoding() else {
        return Err(DocPressError::Decode(format!(
            "{} is not a legacy code page",
            encoding.label()
        )));
    };
    match table.decode_without_bom_handling_and_without_replacement(bytes) {
        Some(text) => Ok(text.into_owned()),
        None => Err(DocPressError::Decode(format!(
            "byte sequence is not valid {}",
            encoding.label()
        ))),
    }
}

fn normalize_newlines(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}
