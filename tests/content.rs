mod common;

use std::fs;
use std::path::PathBuf;

use common::{ParagraphInfo, build_raw_pdf, paragraphs};
use pdfside_docx::convert_pdf_to_docx;

/// Converts a single page built from `content` and returns its paragraphs.
fn convert(content: &[u8], form: &[u8]) -> Vec<ParagraphInfo> {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("page.pdf");
    fs::write(&input, build_raw_pdf(content, form)).unwrap();
    let docx: PathBuf = dir.path().join("page.docx");
    convert_pdf_to_docx(&input, &docx).unwrap();
    paragraphs(&docx)
}

fn texts(paras: &[ParagraphInfo]) -> Vec<String> {
    paras.iter().map(ParagraphInfo::text).collect()
}

#[test]
fn form_xobject_text_is_placed() {
    let paras = convert(
        b"BT /F1 12 Tf 1 0 0 1 72 720 Tm (Top line) Tj ET\n\
          q 1 0 0 1 100 0 cm /Fm1 Do Q",
        b"BT /F1 12 Tf 0 200 Td (Inside form) Tj ET",
    );
    assert_eq!(texts(&paras), ["Top line", "Inside form"]);
    assert_eq!(paras[0].indent_left, None);
    // 100pt from the page edge against a 72pt margin
    assert_eq!(paras[1].indent_left, Some(560));
}

#[test]
fn tj_adjustments_split_words() {
    let paras = convert(
        b"BT /F1 12 Tf 72 700 Td [(Hel) 50 (lo) -3000 (World)] TJ ET",
        b"",
    );
    assert_eq!(texts(&paras), ["Hello World"]);
}

#[test]
fn cm_and_tm_scale_and_place_text() {
    let paras = convert(
        b"q 2 0 0 2 0 0 cm BT /F1 10 Tf 36 300 Td (Scaled text) Tj ET Q\n\
          BT /F1 12 Tf 1 0 0 1 72 720 Tm (Matrix text) Tj ET",
        b"",
    );
    assert_eq!(texts(&paras), ["Matrix text", "Scaled text"]);
    assert_eq!(paras[0].runs[0].size, Some(24));
    assert_eq!(paras[1].runs[0].size, Some(40));
    assert_eq!(paras[1].indent_left, None);
}

#[test]
fn type0_font_text_comes_from_to_unicode() {
    let paras = convert(b"BT /F3 12 Tf 72 700 Td <0024000300250026> Tj ET", b"");
    assert_eq!(texts(&paras), ["A BC"]);
    let run = &paras[0].runs[0];
    assert!(run.bold);
    assert_eq!(run.font.as_deref(), Some("Noto Sans"));
}
