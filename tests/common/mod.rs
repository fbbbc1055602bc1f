#![allow(dead_code)]

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use pdf_writer::{Content, Name, Pdf, Rect, Ref, Str, TextStr};

const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

pub struct Text<'a> {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub text: &'a str,
    pub bold: bool,
}

pub fn text(x: f32, y: f32, size: f32, text: &str) -> Text<'_> {
    Text { x, y, size, text, bold: false }
}

pub fn bold(x: f32, y: f32, size: f32, text: &str) -> Text<'_> {
    Text { x, y, size, text, bold: true }
}

/// Builds a PDF with one US Letter page per entry, using the standard
/// Helvetica faces.
pub fn build_pdf(pages: &[Vec<Text>], title: Option<&str>) -> Vec<u8> {
    let catalog_id = Ref::new(1);
    let pages_id = Ref::new(2);
    let info_id = Ref::new(3);
    let regular_id = Ref::new(4);
    let bold_id = Ref::new(5);
    let page_ids: Vec<Ref> = (0..pages.len()).map(|i| Ref::new(10 + 2 * i as i32)).collect();

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(pages.len() as i32);

    for (i, items) in pages.iter().enumerate() {
        let page_id = page_ids[i];
        let content_id = Ref::new(11 + 2 * i as i32);

        let mut content = Content::new();
        for item in items {
            let font = if item.bold { Name(b"F2") } else { Name(b"F1") };
            content
                .begin_text()
                .set_font(font, item.size)
                .next_line(item.x, item.y)
                .show(Str(item.text.as_bytes()))
                .end_text();
        }
        pdf.stream(content_id, &content.finish());

        pdf.page(page_id)
            .media_box(Rect::new(0.0, 0.0, 612.0, 792.0))
            .parent(pages_id)
            .contents(content_id)
            .resources()
            .fonts()
            .pair(Name(b"F1"), regular_id)
            .pair(Name(b"F2"), bold_id);
    }

    pdf.type1_font(regular_id).base_font(Name(b"Helvetica"));
    pdf.type1_font(bold_id).base_font(Name(b"Helvetica-Bold"));
    if let Some(title) = title {
        pdf.document_info(info_id).title(TextStr(title));
    }

    pdf.finish()
}

pub fn write_pdf(dir: &Path, name: &str, pages: &[Vec<Text>]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, build_pdf(pages, None)).expect("write fixture PDF");
    path
}

pub fn sample_pages() -> Vec<Vec<Text<'static>>> {
    vec![
        vec![
            bold(72.0, 720.0, 18.0, "Annual Summary"),
            text(72.0, 690.0, 12.0, "The first paragraph wraps"),
            text(72.0, 676.0, 12.0, "onto a second line."),
            text(72.0, 630.0, 12.0, "Second paragraph."),
        ],
        vec![text(72.0, 720.0, 12.0, "Page two text.")],
        vec![text(72.0, 720.0, 12.0, "Page three text.")],
    ]
}

pub fn docx_part(docx: &Path, part: &str) -> String {
    let file = fs::File::open(docx).expect("open DOCX");
    let mut zip = zip::ZipArchive::new(file).expect("DOCX is a ZIP archive");
    let mut xml = String::new();
    zip.by_name(part)
        .unwrap_or_else(|_| panic!("missing part {part}"))
        .read_to_string(&mut xml)
        .expect("read part");
    xml
}

pub struct RunInfo {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    /// `w:sz`, in half-points.
    pub size: Option<u32>,
    pub font: Option<String>,
}

pub struct ParagraphInfo {
    pub runs: Vec<RunInfo>,
    pub align: Option<String>,
    /// `w:ind w:left`, in twips.
    pub indent_left: Option<i32>,
    pub page_break_before: bool,
}

impl ParagraphInfo {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

fn wml<'a, 'input>(node: roxmltree::Node<'a, 'input>, name: &str) -> Option<roxmltree::Node<'a, 'input>> {
    node.descendants().find(|n| n.has_tag_name((WML_NS, name)))
}

fn wml_attr(node: roxmltree::Node, name: &str) -> Option<String> {
    node.attribute((WML_NS, name)).map(str::to_string)
}

/// Every `w:p` in `word/document.xml`, empty ones included.
pub fn paragraphs(docx: &Path) -> Vec<ParagraphInfo> {
    let xml = docx_part(docx, "word/document.xml");
    let doc = roxmltree::Document::parse(&xml).expect("document.xml is well-formed");
    doc.descendants()
        .filter(|n| n.has_tag_name((WML_NS, "p")))
        .map(|p| {
            let props = p.children().find(|n| n.has_tag_name((WML_NS, "pPr")));
            let runs = p
                .children()
                .filter(|n| n.has_tag_name((WML_NS, "r")))
                .map(|r| RunInfo {
                    text: r
                        .descendants()
                        .filter(|n| n.has_tag_name((WML_NS, "t")))
                        .filter_map(|n| n.text())
                        .collect(),
                    bold: wml(r, "b").is_some(),
                    italic: wml(r, "i").is_some(),
                    size: wml(r, "sz").and_then(|n| wml_attr(n, "val")).and_then(|v| v.parse().ok()),
                    font: wml(r, "rFonts").and_then(|n| wml_attr(n, "ascii")),
                })
                .collect();
            ParagraphInfo {
                runs,
                align: props.and_then(|n| wml(n, "jc")).and_then(|n| wml_attr(n, "val")),
                indent_left: props
                    .and_then(|n| wml(n, "ind"))
                    .and_then(|n| wml_attr(n, "left"))
                    .and_then(|v| v.parse().ok()),
                page_break_before: props.and_then(|n| wml(n, "pageBreakBefore")).is_some(),
            }
        })
        .collect()
}

/// Text of every non-empty `w:p` in `word/document.xml`.
pub fn paragraph_texts(docx: &Path) -> Vec<String> {
    paragraphs(docx)
        .iter()
        .map(ParagraphInfo::text)
        .filter(|t| !t.is_empty())
        .collect()
}

/// An attribute of an element inside the document's `w:sectPr`.
pub fn section_attr(docx: &Path, element: &str, attr: &str) -> Option<String> {
    let xml = docx_part(docx, "word/document.xml");
    let doc = roxmltree::Document::parse(&xml).expect("document.xml is well-formed");
    let section = wml(doc.root(), "sectPr")?;
    wml(section, element).and_then(|n| wml_attr(n, attr))
}

/// Name and value of every custom document property.
pub fn custom_properties(docx: &Path) -> Vec<(String, String)> {
    let xml = docx_part(docx, "docProps/custom.xml");
    let doc = roxmltree::Document::parse(&xml).expect("custom.xml is well-formed");
    doc.descendants()
        .filter(|n| n.has_tag_name("property"))
        .filter_map(|n| {
            let value = n.first_element_child()?.text().unwrap_or_default();
            Some((n.attribute("name")?.to_string(), value.to_string()))
        })
        .collect()
}

/// ToUnicode map for the Type0 fixture font: codes 0x24..=0x26 are "ABC",
/// 0x03 is a space.
pub const TO_UNICODE: &[u8] = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
1 beginbfchar
<0003> <0020>
endbfchar
1 beginbfrange
<0024> <0026> <0041>
endbfrange
endcmap
CMapName currentdict /CMap defineresource pop
end
end
";

/// Builds a one-page US Letter PDF from a raw content stream.
///
/// Resources: `/F1` is Helvetica, `/F3` a bold Type0 font with a ToUnicode
/// map, `/Fm1` a form XObject whose content is `form`, shifted up 300pt by
/// its `/Matrix`.
pub fn build_raw_pdf(content: &[u8], form: &[u8]) -> Vec<u8> {
    let catalog_id = Ref::new(1);
    let pages_id = Ref::new(2);
    let page_id = Ref::new(3);
    let content_id = Ref::new(4);
    let regular_id = Ref::new(5);
    let type0_id = Ref::new(6);
    let cid_id = Ref::new(7);
    let cmap_id = Ref::new(8);
    let form_id = Ref::new(9);

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id).kids([page_id]).count(1);
    {
        let mut page = pdf.page(page_id);
        page.media_box(Rect::new(0.0, 0.0, 612.0, 792.0))
            .parent(pages_id)
            .contents(content_id);
        let mut resources = page.resources();
        resources
            .fonts()
            .pair(Name(b"F1"), regular_id)
            .pair(Name(b"F3"), type0_id);
        resources.x_objects().pair(Name(b"Fm1"), form_id);
    }
    pdf.stream(content_id, content);
    pdf.type1_font(regular_id).base_font(Name(b"Helvetica"));

    {
        let mut font = pdf.indirect(type0_id).dict();
        font.pair(Name(b"Type"), Name(b"Font"));
        font.pair(Name(b"Subtype"), Name(b"Type0"));
        font.pair(Name(b"BaseFont"), Name(b"ABCDEF+NotoSans-Bold"));
        font.pair(Name(b"Encoding"), Name(b"Identity-H"));
        font.pair(Name(b"ToUnicode"), cmap_id);
        font.insert(Name(b"DescendantFonts")).array().item(cid_id);
    }
    {
        let mut cid = pdf.indirect(cid_id).dict();
        cid.pair(Name(b"Type"), Name(b"Font"));
        cid.pair(Name(b"Subtype"), Name(b"CIDFontType2"));
        cid.pair(Name(b"BaseFont"), Name(b"ABCDEF+NotoSans-Bold"));
        cid.pair(Name(b"DW"), 600);
        cid.insert(Name(b"CIDSystemInfo"))
            .dict()
            .pair(Name(b"Registry"), Str(b"Adobe"))
            .pair(Name(b"Ordering"), Str(b"Identity"))
            .pair(Name(b"Supplement"), 0);
    }
    pdf.stream(cmap_id, TO_UNICODE);

    pdf.form_xobject(form_id, form)
        .bbox(Rect::new(0.0, 0.0, 612.0, 792.0))
        .matrix([1.0, 0.0, 0.0, 1.0, 0.0, 300.0])
        .resources()
        .fonts()
        .pair(Name(b"F1"), regular_id);

    pdf.finish()
}
