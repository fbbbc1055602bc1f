use std::io::{Cursor, Read, Write};

use docx_rs::{AlignmentType, Docx, LineSpacing, PageMargin, RunFonts};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::error::Error;
use crate::model::{Alignment, Document, Page, Paragraph, Run};

const HEADER_DISTANCE_TWIPS: i32 = 720;

fn pts_to_twips(pts: f32) -> i32 {
    (pts * 20.0).round() as i32
}

fn half_points(size: f32) -> usize {
    ((size * 2.0).round() as usize).max(2)
}

/// Drops characters XML 1.0 cannot carry.
fn xml_text(text: &str) -> String {
    text.chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || !(c.is_control() || c == '\u{FFFE}' || c == '\u{FFFF}'))
        .collect()
}

/// Builds the DOCX package. The first page sets the section geometry; every
/// later page starts with a page break.
pub fn render(doc: &Document) -> Result<Vec<u8>, Error> {
    let mut docx = Docx::new();
    if let Some(page) = doc.pages.first() {
        docx = page_setup(docx, page);
    }
    if let Some(title) = &doc.title {
        docx = docx.custom_property("Title", xml_text(title));
    }
    if let Some(author) = &doc.author {
        docx = docx.custom_property("Author", xml_text(author));
    }

    for (index, page) in doc.pages.iter().enumerate() {
        let mut paragraphs: Vec<docx_rs::Paragraph> = page.paragraphs.iter().map(paragraph).collect();
        if paragraphs.is_empty() {
            paragraphs.push(docx_rs::Paragraph::new());
        }
        for (i, para) in paragraphs.into_iter().enumerate() {
            let para = if index > 0 && i == 0 { para.page_break_before(true) } else { para };
            docx = docx.add_paragraph(para);
        }
    }

    let mut packed = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut packed)
        .map_err(|e| Error::Docx(e.to_string()))?;
    let bytes = normalize(packed.get_ref())?;
    log::debug!("DOCX package: {} bytes, {} pages", bytes.len(), doc.pages.len());
    Ok(bytes)
}

fn page_setup(docx: Docx, page: &Page) -> Docx {
    let width = pts_to_twips(page.width).max(1) as u32;
    let height = pts_to_twips(page.height).max(1) as u32;
    docx.page_size(width, height).page_margin(
        PageMargin::new()
            .top(pts_to_twips(page.margin_top))
            .bottom(pts_to_twips(page.margin_bottom))
            .left(pts_to_twips(page.margin_left))
            .right(pts_to_twips(page.margin_right))
            .header(HEADER_DISTANCE_TWIPS)
            .footer(HEADER_DISTANCE_TWIPS)
            .gutter(0),
    )
}

fn paragraph(para: &Paragraph) -> docx_rs::Paragraph {
    let mut out = docx_rs::Paragraph::new();
    for run in &para.runs {
        if let Some(run) = run_of(run) {
            out = out.add_run(run);
        }
    }
    out = match para.alignment {
        Alignment::Left => out,
        Alignment::Center => out.align(AlignmentType::Center),
        Alignment::Right => out.align(AlignmentType::Right),
    };
    let indent = pts_to_twips(para.indent_left);
    if indent > 0 {
        out = out.indent(Some(indent), None, None, None);
    }
    let before = pts_to_twips(para.space_before);
    if before > 0 {
        out = out.line_spacing(LineSpacing::new().before(before as u32));
    }
    out
}

fn run_of(run: &Run) -> Option<docx_rs::Run> {
    let text = xml_text(&run.text);
    if text.is_empty() {
        return None;
    }
    let fonts = RunFonts::new()
        .ascii(&run.font_name)
        .hi_ansi(&run.font_name)
        .cs(&run.font_name);
    let mut out = docx_rs::Run::new()
        .add_text(text)
        .size(half_points(run.font_size))
        .fonts(fonts);
    if run.bold {
        out = out.bold();
    }
    if run.italic {
        out = out.italic();
    }
    Some(out)
}

/// Rewrites the package with fixed entry timestamps, so converting the same
/// PDF twice gives byte-identical output.
fn normalize(packed: &[u8]) -> Result<Vec<u8>, Error> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut archive = ZipArchive::new(Cursor::new(packed))?;
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut data = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        data.clear();
        entry.read_to_end(&mut data)?;
        zip.start_file(entry.name(), options)?;
        zip.write_all(&data)?;
    }
    Ok(zip.finish()?.into_inner())
}
