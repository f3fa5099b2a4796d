use super::{catch_parser_panic, Extractor, IngestError, Upload};

/// Concatenate page texts in page order, each followed by a newline.
/// Pages whose text is empty or only whitespace are skipped.
pub fn join_pages<I>(pages: I) -> String
where
    I: IntoIterator<Item = String>,
{
    pages
        .into_iter()
        .filter(|page| !page.trim().is_empty())
        .fold(String::new(), |mut text, page| {
            text.push_str(&page);
            text.push('\n');
            text
        })
}

pub struct PdfExtractor;

impl Extractor for PdfExtractor {
    fn extract(&self, upload: &Upload) -> Result<String, IngestError> {
        let bytes = upload.bytes();
        let pages = catch_parser_panic(IngestError::Pdf, || {
            pdf_extract::extract_text_from_mem_by_pages(bytes)
                .map_err(|e| IngestError::Pdf(e.to_string()))
        })?;
        tracing::debug!(filename = upload.filename(), pages = pages.len(), "Parsed PDF");
        Ok(join_pages(pages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a PDF with one page per entry, each showing its text in Helvetica.
    fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
        let kids: Vec<String> = (0..pages.len())
            .map(|i| format!("{} 0 R", 4 + 2 * i))
            .collect();
        let mut objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), pages.len()),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        ];
        for (i, text) in pages.iter().enumerate() {
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                5 + 2 * i
            ));
            let stream = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text);
            objects.push(format!(
                "<< /Length {} >>\nstream\n{}\nendstream",
                stream.len(),
                stream
            ));
        }

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }

        let xref_start = pdf.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            xref.push_str(&format!("{:010} 00000 n \n", offset));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_start
        ));
        pdf.extend_from_slice(xref.as_bytes());
        pdf
    }

    #[test]
    fn test_pages_are_joined_in_order() {
        let upload = Upload::new(
            "manual.pdf",
            pdf_with_pages(&["Dock 4 closes at noon", "Pickup at 9"]),
        );

        let text = PdfExtractor.extract(&upload).unwrap();

        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        assert_eq!(lines, ["Dock 4 closes at noon", "Pickup at 9"]);
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_blank_pages_are_skipped() {
        let pages = vec![
            "Page one".to_string(),
            String::new(),
            "  \n".to_string(),
            "Page four".to_string(),
        ];
        assert_eq!(join_pages(pages), "Page one\nPage four\n");
    }

    #[test]
    fn test_no_pages() {
        assert_eq!(join_pages(Vec::new()), "");
    }

    #[test]
    fn test_garbage_is_an_error() {
        let upload = Upload::new("manual.pdf", b"not a pdf at all".to_vec());
        let err = PdfExtractor.extract(&upload).unwrap_err();
        assert!(matches!(err, IngestError::Pdf(_)));
    }
}
