use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerIndex, PdfPageIndex};

use crate::dtos::{ArticleDto, SummaryDto};

// US Letter, the original layout the reader app prints.
const PAGE_WIDTH_MM: f32 = 215.9;
const PAGE_HEIGHT_MM: f32 = 279.4;
const MARGIN_MM: f32 = 25.4;
const BOTTOM_MARGIN_MM: f32 = 18.0;

// Helvetica average glyph width, as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;
const PT_TO_MM: f32 = 0.352_778;

const SUMMARY_HEADING: &str = "Ringkasan AI";
const TXT_RULE_WIDTH: usize = 80;

/// Greedy word wrap at an estimated character limit. Words longer than the
/// limit are split hard so a pathological token cannot overflow the page.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word;
        while word.chars().count() > max_chars {
            let split_at = word
                .char_indices()
                .nth(max_chars)
                .map(|(i, _)| i)
                .unwrap_or(word.len());
            let (head, tail) = word.split_at(split_at);
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(head.to_string());
            word = tail;
        }

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };

        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

fn chars_per_line(font_size_pt: f32) -> usize {
    let usable_mm = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
    let glyph_mm = font_size_pt * AVG_GLYPH_WIDTH * PT_TO_MM;
    (usable_mm / glyph_mm) as usize
}

/// Cursor-based writer over a printpdf document: lines flow downward and a
/// fresh page is started whenever the cursor would cross the bottom margin.
struct DocumentWriter {
    doc: PdfDocumentReference,
    page: PdfPageIndex,
    layer: PdfLayerIndex,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    cursor_y: f32,
}

impl DocumentWriter {
    fn new(title: &str) -> Result<Self, printpdf::Error> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

        Ok(DocumentWriter {
            doc,
            page,
            layer,
            regular,
            bold,
            cursor_y: PAGE_HEIGHT_MM - MARGIN_MM,
        })
    }

    fn line_height(font_size_pt: f32) -> f32 {
        font_size_pt * 1.3 * PT_TO_MM
    }

    fn ensure_room(&mut self, needed_mm: f32) {
        if self.cursor_y - needed_mm < BOTTOM_MARGIN_MM {
            let (page, layer) =
                self.doc
                    .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            self.page = page;
            self.layer = layer;
            self.cursor_y = PAGE_HEIGHT_MM - MARGIN_MM;
        }
    }

    fn write_line(&mut self, text: &str, font_size_pt: f32, bold: bool, centered: bool) {
        let height = Self::line_height(font_size_pt);
        self.ensure_room(height);
        self.cursor_y -= height;

        let x = if centered {
            let text_width_mm =
                text.chars().count() as f32 * font_size_pt * AVG_GLYPH_WIDTH * PT_TO_MM;
            ((PAGE_WIDTH_MM - text_width_mm) / 2.0).max(MARGIN_MM)
        } else {
            MARGIN_MM
        };

        let font = if bold { &self.bold } else { &self.regular };
        self.doc
            .get_page(self.page)
            .get_layer(self.layer)
            .use_text(text, font_size_pt, Mm(x), Mm(self.cursor_y), font);
    }

    /// Wrapped paragraph at the left margin.
    fn write_paragraph(&mut self, text: &str, font_size_pt: f32, bold: bool) {
        for line in wrap_text(text, chars_per_line(font_size_pt)) {
            self.write_line(&line, font_size_pt, bold, false);
        }
    }

    fn space(&mut self, mm: f32) {
        self.cursor_y -= mm;
    }

    fn finish(self) -> Result<Vec<u8>, printpdf::Error> {
        self.doc.save_to_bytes()
    }
}

/// Render an article (and optionally its facet summary) as a paginated PDF.
///
/// Layout follows the reader app's print style: centered title, metadata
/// block, body paragraphs in source order with blank lines skipped, and a
/// delimited summary section listing each non-empty facet with an
/// upper-cased label.
pub fn generate_article_pdf(
    article: &ArticleDto,
    summary: Option<&SummaryDto>,
) -> Result<Vec<u8>, printpdf::Error> {
    let mut writer = DocumentWriter::new(&article.title)?;

    writer.write_paragraph(&article.title, 18.0, true);
    writer.space(6.0);

    writer.write_line(
        &format!("Penulis: {}", article.author_name),
        10.0,
        false,
        false,
    );
    writer.write_line(
        &format!("Tanggal: {}", article.published_date.format("%d %B %Y")),
        10.0,
        false,
        false,
    );
    writer.write_line(
        &format!("Kategori: {}", article.category.name),
        10.0,
        false,
        false,
    );
    if let Some(source_url) = &article.source_url {
        writer.write_line(&format!("Sumber: {}", source_url), 10.0, false, false);
    }
    writer.space(8.0);

    for paragraph in article.content.split('\n') {
        if paragraph.trim().is_empty() {
            continue;
        }
        writer.write_paragraph(paragraph, 11.0, false);
        writer.space(4.0);
    }

    if let Some(summary) = summary {
        let entries = summary.entries();
        if !entries.is_empty() {
            writer.space(10.0);
            writer.write_line(SUMMARY_HEADING, 14.0, true, false);
            writer.space(4.0);

            for (facet, text) in entries {
                writer.write_paragraph(
                    &format!("{}: {}", facet.as_str().to_uppercase(), text),
                    11.0,
                    false,
                );
                writer.space(3.0);
            }
        }
    }

    writer.finish()
}

/// Render the same logical content as a plain-text byte stream.
pub fn generate_article_txt(article: &ArticleDto, summary: Option<&SummaryDto>) -> Vec<u8> {
    let mut content = format!(
        "{}\n{}\n\n",
        article.title,
        "=".repeat(article.title.chars().count())
    );

    content.push_str(&format!("Penulis: {}\n", article.author_name));
    content.push_str(&format!(
        "Tanggal: {}\n",
        article.published_date.format("%d %B %Y")
    ));
    content.push_str(&format!("Kategori: {}\n", article.category.name));
    if let Some(source_url) = &article.source_url {
        content.push_str(&format!("Sumber: {}\n", source_url));
    }

    content.push_str(&format!("\n{}\n\n", "-".repeat(TXT_RULE_WIDTH)));
    content.push_str(&article.content);

    if let Some(summary) = summary {
        let entries = summary.entries();
        if !entries.is_empty() {
            content.push_str(&format!("\n\n{}\n", "-".repeat(TXT_RULE_WIDTH)));
            content.push_str(&format!("{}\n", SUMMARY_HEADING.to_uppercase()));
            content.push_str(&format!("{}\n\n", "-".repeat(TXT_RULE_WIDTH)));

            for (facet, text) in entries {
                content.push_str(&format!(
                    "{}: {}\n\n",
                    facet.as_str().to_uppercase(),
                    text
                ));
            }
        }
    }

    content.into_bytes()
}

/// Download filename: title truncated to 50 characters plus the extension.
pub fn export_filename(title: &str, extension: &str) -> String {
    let stem: String = title.chars().take(50).filter(|c| *c != '"').collect();
    format!("{}.{}", stem, extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtos::{CategoryDto, SummaryFacet};
    use chrono::{TimeZone, Utc};

    fn sample_article() -> ArticleDto {
        ArticleDto {
            id: 1,
            title: "Pembangunan Jembatan Baru".to_string(),
            content: "Paragraf pertama berita.\n\nParagraf kedua berita.".to_string(),
            category: CategoryDto {
                id: 3,
                name: "Infrastruktur".to_string(),
                slug: "infrastruktur".to_string(),
            },
            image_url: None,
            author_name: "Redaksi".to_string(),
            source_url: Some("https://example.com/berita/1".to_string()),
            published_date: Utc.with_ymd_and_hms(2024, 5, 5, 8, 0, 0).unwrap(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 5, 8, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 5, 5, 8, 0, 0).unwrap(),
            tags: Vec::new(),
            is_bookmarked: false,
        }
    }

    fn sample_summary() -> SummaryDto {
        let mut summary = SummaryDto::default();
        summary.set(SummaryFacet::Who, "Pemerintah kota.".to_string());
        summary.set(SummaryFacet::Why, String::new());
        summary.set(SummaryFacet::How, "Dibangun bertahap.".to_string());
        summary
    }

    #[test]
    fn txt_contains_metadata_and_underline() {
        let article = sample_article();
        let txt = String::from_utf8(generate_article_txt(&article, None)).unwrap();

        assert!(txt.starts_with("Pembangunan Jembatan Baru\n"));
        assert!(txt.contains(&"=".repeat("Pembangunan Jembatan Baru".chars().count())));
        assert!(txt.contains("Penulis: Redaksi\n"));
        assert!(txt.contains("Tanggal: 05 May 2024\n"));
        assert!(txt.contains("Kategori: Infrastruktur\n"));
        assert!(txt.contains("Sumber: https://example.com/berita/1\n"));
        assert!(txt.contains("Paragraf kedua berita."));
        assert!(!txt.contains("RINGKASAN AI"));
    }

    #[test]
    fn txt_omits_source_line_when_absent() {
        let mut article = sample_article();
        article.source_url = None;
        let txt = String::from_utf8(generate_article_txt(&article, None)).unwrap();
        assert!(!txt.contains("Sumber:"));
    }

    #[test]
    fn txt_summary_lists_non_empty_facets_only() {
        let article = sample_article();
        let txt =
            String::from_utf8(generate_article_txt(&article, Some(&sample_summary()))).unwrap();

        assert!(txt.contains("RINGKASAN AI"));
        assert!(txt.contains("WHO: Pemerintah kota."));
        assert!(txt.contains("HOW: Dibangun bertahap."));
        assert!(!txt.contains("WHY:"));
    }

    #[test]
    fn pdf_is_generated_with_and_without_summary() {
        let article = sample_article();

        let plain = generate_article_pdf(&article, None).unwrap();
        assert!(plain.starts_with(b"%PDF"));

        let with_summary = generate_article_pdf(&article, Some(&sample_summary())).unwrap();
        assert!(with_summary.starts_with(b"%PDF"));
        assert!(with_summary.len() > plain.len());
    }

    #[test]
    fn long_articles_flow_over_multiple_pages() {
        let mut article = sample_article();
        article.content = "Kalimat yang cukup panjang untuk mengisi halaman. ".repeat(400);
        let pdf = generate_article_pdf(&article, None).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn wrap_text_respects_the_limit() {
        let lines = wrap_text("satu dua tiga empat lima", 9);
        assert_eq!(lines, vec!["satu dua", "tiga", "empat", "lima"]);
        for line in &lines {
            assert!(line.chars().count() <= 9);
        }
    }

    #[test]
    fn wrap_text_splits_overlong_words() {
        let lines = wrap_text("abcdefghijkl", 5);
        assert_eq!(lines, vec!["abcde", "fghij", "kl"]);
    }

    #[test]
    fn export_filename_truncates_to_fifty_chars() {
        let long_title = "x".repeat(80);
        let name = export_filename(&long_title, "pdf");
        assert_eq!(name, format!("{}.pdf", "x".repeat(50)));
    }
}
