//! Character set detection and conversion to UTF-8.
//!
//! Detection order:
//!
//! 1. A byte-order mark decides outright.
//! 2. A NUL byte without a BOM marks the file as binary.
//! 3. Valid UTF-8 (which includes plain ASCII) is already canonical.
//! 4. Anything else is decoded with the configured source encoding, or with
//!    the statistical guess from `chardetng`. A guess that did not outscore
//!    any other candidate is treated as ambiguous.
//!
//! Decoding never substitutes replacement characters: input that does not
//! decode cleanly is rejected and the file is left alone.

use crate::error::{Error, Result};
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use std::path::Path;

/// What the detector concluded about a byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// Empty input
    Empty,
    /// Already UTF-8, with or without BOM
    Utf8,
    /// Encoding announced by a byte-order mark of `bom_len` bytes
    Bom {
        /// Encoding named by the BOM
        encoding: &'static Encoding,
        /// Length of the BOM in bytes
        bom_len: usize,
    },
    /// Contains NUL bytes and no BOM
    Binary,
    /// Best-effort guess for non-UTF-8 text
    Guessed {
        /// Guessed (or configured) encoding
        encoding: &'static Encoding,
        /// False when the detector found no reason to prefer this encoding
        confident: bool,
    },
}

/// Result of normalizing a byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// Input was already UTF-8
    Unchanged,
    /// Input was converted
    Converted {
        /// Source encoding
        from: &'static Encoding,
        /// UTF-8 output without BOM
        bytes: Vec<u8>,
    },
    /// Input looks binary and was not touched
    Binary,
}

/// Sniffs the encoding of `bytes`.
///
/// `source` overrides the statistical guess but not a BOM.
#[must_use]
pub fn detect(bytes: &[u8], source: Option<&'static Encoding>) -> Detection {
    if bytes.is_empty() {
        return Detection::Empty;
    }

    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        if encoding == UTF_8 {
            return Detection::Utf8;
        }
        return Detection::Bom { encoding, bom_len };
    }

    if memchr::memchr(0, bytes).is_some() {
        return Detection::Binary;
    }

    if Encoding::utf8_valid_up_to(bytes) == bytes.len() {
        return Detection::Utf8;
    }

    if let Some(encoding) = source {
        return Detection::Guessed {
            encoding,
            confident: true,
        };
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let (encoding, confident) = detector.guess_assess(None, false);
    Detection::Guessed {
        encoding,
        confident,
    }
}

/// Decodes `bytes` from `from` into a string without replacement characters.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the bytes are malformed for `from`.
pub fn convert(bytes: &[u8], from: &'static Encoding, path: &Path) -> Result<String> {
    from.decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
        .ok_or_else(|| Error::decode(path, from.name()))
}

/// Converts text files to UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodingNormalizer {
    source: Option<&'static Encoding>,
}

impl EncodingNormalizer {
    /// Creates a normalizer. `source` replaces detection for files without a BOM.
    #[must_use]
    pub const fn new(source: Option<&'static Encoding>) -> Self {
        Self { source }
    }

    /// Normalizes `bytes` read from `path`.
    ///
    /// # Errors
    ///
    /// - [`Error::Decode`] if a BOM or configured source encoding does not match the content
    /// - [`Error::AmbiguousEncoding`] if the guessed encoding cannot be trusted
    pub fn normalize(&self, bytes: &[u8], path: &Path) -> Result<Normalized> {
        self.normalize_detected(bytes, detect(bytes, self.source), path)
    }

    fn normalize_detected(
        &self,
        bytes: &[u8],
        detection: Detection,
        path: &Path,
    ) -> Result<Normalized> {
        match detection {
            Detection::Empty | Detection::Utf8 => Ok(Normalized::Unchanged),
            Detection::Binary => Ok(Normalized::Binary),
            Detection::Bom { encoding, bom_len } => {
                let text = convert(&bytes[bom_len..], encoding, path)?;
                Ok(Normalized::Converted {
                    from: encoding,
                    bytes: text.into_bytes(),
                })
            }
            Detection::Guessed { encoding, .. } if self.source.is_some() => {
                let text = convert(bytes, encoding, path)?;
                Ok(Normalized::Converted {
                    from: encoding,
                    bytes: text.into_bytes(),
                })
            }
            Detection::Guessed {
                encoding,
                confident: false,
            } => Err(Error::ambiguous(
                path,
                format!("{} is only a low-confidence guess", encoding.name()),
            )),
            Detection::Guessed { encoding, .. } => {
                let text = convert(bytes, encoding, path).map_err(|_| {
                    Error::ambiguous(path, format!("content is not valid {}", encoding.name()))
                })?;

                if text.chars().any(is_unexpected_control) {
                    return Err(Error::ambiguous(
                        path,
                        format!("decoding as {} yields control characters", encoding.name()),
                    ));
                }

                Ok(Normalized::Converted {
                    from: encoding,
                    bytes: text.into_bytes(),
                })
            }
        }
    }
}

fn is_unexpected_control(c: char) -> bool {
    c.is_control() && !matches!(c, '\t' | '\n' | '\r' | '\x0c')
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{UTF_16BE, UTF_16LE, WINDOWS_1251, WINDOWS_1252};

    const FRENCH: &str = "Le cœur déçu mais l'âme plutôt naïve, Louÿs rêva de crapaüter en \
        canoë au delà des îles, près du mälström où brûlent les novæ. \
        Voilà une phrase française très célèbre qui contient à peu près \
        toutes les lettres accentuées: é è ê ë à â î ï ô û ù ç œ æ.\n";

    fn path() -> &'static Path {
        Path::new("test.cpp")
    }

    fn utf16_with_bom(text: &str, little_endian: bool) -> Vec<u8> {
        let mut bytes = if little_endian {
            vec![0xFF, 0xFE]
        } else {
            vec![0xFE, 0xFF]
        };
        for unit in text.encode_utf16() {
            let pair = if little_endian {
                unit.to_le_bytes()
            } else {
                unit.to_be_bytes()
            };
            bytes.extend_from_slice(&pair);
        }
        bytes
    }

    #[test]
    fn test_detect_ascii_is_utf8() {
        assert_eq!(detect(b"int main(){}\n", None), Detection::Utf8);
    }

    #[test]
    fn test_detect_empty() {
        assert_eq!(detect(b"", None), Detection::Empty);
    }

    #[test]
    fn test_detect_utf8_bom() {
        assert_eq!(detect(b"\xEF\xBB\xBFint x;", None), Detection::Utf8);
    }

    #[test]
    fn test_detect_utf16_bom() {
        let bytes = utf16_with_bom("int x;", true);
        assert_eq!(
            detect(&bytes, None),
            Detection::Bom {
                encoding: UTF_16LE,
                bom_len: 2
            }
        );
    }

    #[test]
    fn test_detect_binary() {
        assert_eq!(detect(b"\x7fELF\x00\x01\x02", None), Detection::Binary);
    }

    #[test]
    fn test_detect_source_override() {
        let (bytes, _, _) = WINDOWS_1251.encode("Привет");
        assert_eq!(
            detect(&bytes, Some(WINDOWS_1251)),
            Detection::Guessed {
                encoding: WINDOWS_1251,
                confident: true
            }
        );
    }

    #[test]
    fn test_ascii_unchanged() {
        let normalizer = EncodingNormalizer::default();
        assert_eq!(
            normalizer.normalize(b"int main(){}", path()).unwrap(),
            Normalized::Unchanged
        );
    }

    #[test]
    fn test_utf16le_round_trip() {
        let text = "// héllo wörld\nint main() { return 0; }\n";
        let bytes = utf16_with_bom(text, true);

        let result = EncodingNormalizer::default().normalize(&bytes, path()).unwrap();

        assert_eq!(
            result,
            Normalized::Converted {
                from: UTF_16LE,
                bytes: text.as_bytes().to_vec()
            }
        );
    }

    #[test]
    fn test_utf16be_round_trip() {
        let text = "const char* s = \"日本語\";\n";
        let bytes = utf16_with_bom(text, false);

        match EncodingNormalizer::default().normalize(&bytes, path()).unwrap() {
            Normalized::Converted { from, bytes } => {
                assert_eq!(from, UTF_16BE);
                assert_eq!(String::from_utf8(bytes).unwrap(), text);
            }
            other => panic!("expected conversion, got {other:?}"),
        }
    }

    #[test]
    fn test_truncated_utf16_is_decode_error() {
        let mut bytes = utf16_with_bom("ab", true);
        bytes.push(0x41);

        let err = EncodingNormalizer::default()
            .normalize(&bytes, path())
            .unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_windows_1252_detected_and_converted() {
        let (bytes, _, _) = WINDOWS_1252.encode(FRENCH);
        assert!(std::str::from_utf8(&bytes).is_err());

        match EncodingNormalizer::default().normalize(&bytes, path()).unwrap() {
            Normalized::Converted { bytes, .. } => {
                assert_eq!(String::from_utf8(bytes).unwrap(), FRENCH);
            }
            other => panic!("expected conversion, got {other:?}"),
        }
    }

    #[test]
    fn test_source_override_converts_cyrillic() {
        let text = "// Привет, мир\nint main() {}\n";
        let (bytes, _, _) = WINDOWS_1251.encode(text);

        let result = EncodingNormalizer::new(Some(WINDOWS_1251))
            .normalize(&bytes, path())
            .unwrap();

        assert_eq!(
            result,
            Normalized::Converted {
                from: WINDOWS_1251,
                bytes: text.as_bytes().to_vec()
            }
        );
    }

    #[test]
    fn test_control_characters_are_ambiguous() {
        let err = EncodingNormalizer::default()
            .normalize(b"hello\x01\xff world", path())
            .unwrap_err();
        assert!(matches!(err, Error::AmbiguousEncoding { .. }));
    }

    #[test]
    fn test_binary_is_left_alone() {
        let result = EncodingNormalizer::default()
            .normalize(b"\x00\x01\x02\xff", path())
            .unwrap();
        assert_eq!(result, Normalized::Binary);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let (bytes, _, _) = WINDOWS_1252.encode(FRENCH);
        let normalizer = EncodingNormalizer::default();

        let Normalized::Converted { bytes: once, .. } =
            normalizer.normalize(&bytes, path()).unwrap()
        else {
            panic!("expected conversion");
        };

        assert_eq!(normalizer.normalize(&once, path()).unwrap(), Normalized::Unchanged);
    }

    #[test]
    fn test_detect_long_latin1_text_is_confident() {
        let (bytes, _, _) = WINDOWS_1252.encode(FRENCH);
        assert!(matches!(
            detect(&bytes, None),
            Detection::Guessed {
                confident: true,
                ..
            }
        ));
    }

    #[test]
    fn test_low_confidence_guess_is_ambiguous() {
        let (bytes, _, _) = WINDOWS_1251.encode("// Привет\n");
        let detection = Detection::Guessed {
            encoding: WINDOWS_1251,
            confident: false,
        };

        let err = EncodingNormalizer::default()
            .normalize_detected(&bytes, detection, path())
            .unwrap_err();
        assert!(matches!(err, Error::AmbiguousEncoding { .. }));
    }
}
