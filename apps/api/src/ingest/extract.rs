use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("pdf parse error: {0}")]
    Pdf(String),

    #[error("unsupported file type: {0}")]
    Unsupported(String),
}

/// Extracts plain text from an uploaded resume blob, in memory.
/// `docx` is accepted at upload but has no extractor — it surfaces here as a
/// recorded parse failure, not a crash.
pub fn extract_text(bytes: &[u8], file_type: &str) -> Result<String, ExtractError> {
    match file_type {
        "pdf" => pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string())),
        "txt" => Ok(String::from_utf8_lossy(bytes).into_owned()),
        other => Err(ExtractError::Unsupported(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_txt_is_decoded_lossily() {
        let text = extract_text(b"plain resume text", "txt").unwrap();
        assert_eq!(text, "plain resume text");

        let with_invalid = extract_text(&[b'o', b'k', 0xff], "txt").unwrap();
        assert!(with_invalid.starts_with("ok"));
    }

    #[test]
    fn test_docx_reports_unsupported() {
        let err = extract_text(b"PK..", "docx").unwrap_err();
        assert!(matches!(err, ExtractError::Unsupported(t) if t == "docx"));
    }

    #[test]
    fn test_garbage_pdf_reports_parse_error_not_panic() {
        let err = extract_text(b"not a pdf at all", "pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }
}
