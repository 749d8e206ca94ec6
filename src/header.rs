//! Insertion of an include line at the top of a file.

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Inserts an `#include "<header>"` line at the top of a file.
///
/// Works on raw bytes, so the rest of the file is preserved exactly
/// regardless of its encoding. A UTF-8 BOM stays in front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPrepender {
    line: String,
    force: bool,
}

impl HeaderPrepender {
    /// Creates a prepender for `header`.
    ///
    /// Unless `force` is set, files whose first line already is the include
    /// line are left untouched.
    #[must_use]
    pub fn new(header: &str, force: bool) -> Self {
        Self {
            line: format!("#include \"{header}\"\n"),
            force,
        }
    }

    /// Returns the full include line, including the trailing newline.
    #[must_use]
    pub fn include_line(&self) -> &str {
        &self.line
    }

    /// Returns true if the first line of `content` is the include line.
    #[must_use]
    pub fn is_present(&self, content: &[u8]) -> bool {
        let body = content.strip_prefix(UTF8_BOM).unwrap_or(content);
        let first = memchr::memchr(b'\n', body).map_or(body, |end| &body[..end]);
        let first = first.strip_suffix(b"\r").unwrap_or(first);

        first == self.line.trim_end_matches('\n').as_bytes()
    }

    /// Returns `content` with the include line in front, or `None` if the
    /// line is already present and forcing is off.
    #[must_use]
    pub fn prepend(&self, content: &[u8]) -> Option<Vec<u8>> {
        if !self.force && self.is_present(content) {
            return None;
        }

        let (bom, body) = match content.strip_prefix(UTF8_BOM) {
            Some(body) => (UTF8_BOM, body),
            None => (&[][..], content),
        };

        let mut out = Vec::with_capacity(content.len() + self.line.len());
        out.extend_from_slice(bom);
        out.extend_from_slice(self.line.as_bytes());
        out.extend_from_slice(body);
        Some(out)
    }
}
