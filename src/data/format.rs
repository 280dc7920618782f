use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Text encoding of delimited files
// ---------------------------------------------------------------------------

/// Character encoding of a delimited text file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    /// ISO-8859-1: every byte is the code point of the same value.
    #[default]
    Latin1,
    Utf8,
}

impl TextEncoding {
    pub fn name(self) -> &'static str {
        match self {
            TextEncoding::Latin1 => "Latin-1",
            TextEncoding::Utf8 => "UTF-8",
        }
    }

    /// Decode one raw field. `None` when the bytes are not valid in this encoding.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
            TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_owned),
        }
    }

    /// Encode one field. On failure returns the first character that has no
    /// representation in this encoding.
    pub fn encode(self, text: &str) -> Result<Vec<u8>, char> {
        match self {
            TextEncoding::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).map_err(|_| c))
                .collect(),
            TextEncoding::Utf8 => Ok(text.as_bytes().to_vec()),
        }
    }
}

/// Delimiter + encoding pair shared by the loader and the exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextFormat {
    pub delimiter: u8,
    pub encoding: TextEncoding,
}

impl Default for TextFormat {
    fn default() -> Self {
        Self {
            delimiter: b';',
            encoding: TextEncoding::Latin1,
        }
    }
}
