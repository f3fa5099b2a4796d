use super::{Extractor, IngestError, Upload};

/// Decode UTF-8, dropping byte sequences that are not valid UTF-8.
pub fn decode_ignoring_invalid(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

pub struct PlainText;

impl Extractor for PlainText {
    fn extract(&self, upload: &Upload) -> Result<String, IngestError> {
        Ok(decode_ignoring_invalid(upload.bytes()))
    }
}

/// Used for files of unrecognized type. Anything containing a NUL byte is
/// treated as binary and refused.
pub struct BestEffortText;

impl Extractor for BestEffortText {
    fn extract(&self, upload: &Upload) -> Result<String, IngestError> {
        if upload.bytes().contains(&0) {
            return Err(IngestError::Unreadable(upload.filename().to_string()));
        }
        Ok(decode_ignoring_invalid(upload.bytes()))
    }
}
