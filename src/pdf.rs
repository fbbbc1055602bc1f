use std::collections::HashMap;
use std::rc::Rc;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::fonts::{Font, FontStyle};

const US_LETTER: [f32; 4] = [0.0, 0.0, 612.0, 792.0];
const MAX_FORM_DEPTH: usize = 8;
/// Guards against cyclic `/Parent` chains.
const MAX_TREE_DEPTH: usize = 32;

/// One string shown by a text operator, in page space with the origin at
/// the bottom-left of the page box.
#[derive(Clone, Debug)]
pub struct TextSpan {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub font_size: f32,
    pub text: String,
    pub font: FontStyle,
}

pub struct PageText {
    pub number: u32,
    pub width: f32,
    pub height: f32,
    pub spans: Vec<TextSpan>,
    /// Text from lopdf's own extractor, used when no span could be recovered.
    pub fallback: Option<String>,
}

pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

pub(crate) fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Title and author from the trailer's `/Info` dictionary.
pub fn metadata(doc: &Document) -> (Option<String>, Option<String>) {
    let Some(info) = doc
        .trailer
        .get(b"Info")
        .ok()
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
    else {
        return (None, None);
    };
    let field = |key: &[u8]| {
        let obj = resolve(doc, info.get(key).ok()?);
        lopdf::decode_text_string(obj)
            .ok()
            .map(|s| s.chars().filter(|c| !c.is_control()).collect::<String>())
            .filter(|s| !s.trim().is_empty())
    };
    (field(b"Title"), field(b"Author"))
}

fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut dict = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(obj) = dict.get(key) {
            return Some(resolve(doc, obj));
        }
        let parent = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn page_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    [b"MediaBox".as_slice(), b"CropBox".as_slice()]
        .iter()
        .find_map(|key| {
            let arr = inherited(doc, page_id, key)?.as_array().ok()?;
            let v: Vec<f32> = arr.iter().filter_map(|o| number(resolve(doc, o))).collect();
            let [x0, y0, x1, y1] = v[..] else {
                return None;
            };
            let b = [x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)];
            (b[2] - b[0] > 1.0 && b[3] - b[1] > 1.0).then_some(b)
        })
        .unwrap_or(US_LETTER)
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Matrix([f32; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn translate(tx: f32, ty: f32) -> Matrix {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    fn from_operands(operands: &[Object]) -> Option<Matrix> {
        let v: Vec<f32> = operands.iter().filter_map(number).collect();
        let [a, b, c, d, e, f] = v[..] else {
            return None;
        };
        Some(Matrix([a, b, c, d, e, f]))
    }

    /// `self × other`, row-vector convention as in the PDF reference.
    fn multiply(&self, other: &Matrix) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a * a2 + b * c2,
            a * b2 + b * d2,
            c * a2 + d * c2,
            c * b2 + d * d2,
            e * a2 + f * c2 + e2,
            e * b2 + f * d2 + f2,
        ])
    }

    fn x_scale(&self) -> f32 {
        self.0[0].hypot(self.0[1])
    }

    fn y_scale(&self) -> f32 {
        self.0[2].hypot(self.0[3])
    }
}

#[derive(Clone)]
struct State {
    ctm: Matrix,
    tm: Matrix,
    tlm: Matrix,
    font: Option<Rc<Font>>,
    font_size: f32,
    leading: f32,
    char_spacing: f32,
    word_spacing: f32,
    h_scale: f32,
    rise: f32,
}

impl State {
    fn new(ctm: Matrix) -> State {
        State {
            ctm,
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            font: None,
            font_size: 0.0,
            leading: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scale: 1.0,
            rise: 0.0,
        }
    }

    fn next_line(&mut self, tx: f32, ty: f32) {
        self.tlm = Matrix::translate(tx, ty).multiply(&self.tlm);
        self.tm = self.tlm;
    }
}

/// Walks page content streams and collects text spans. Fonts are cached by
/// object id across pages.
pub struct PageReader<'a> {
    doc: &'a Document,
    fonts: HashMap<ObjectId, Rc<Font>>,
    fallback_font: Rc<Font>,
}

impl<'a> PageReader<'a> {
    pub fn new(doc: &'a Document) -> Self {
        PageReader {
            doc,
            fonts: HashMap::new(),
            fallback_font: Rc::new(Font::fallback()),
        }
    }

    pub fn read_page(&mut self, number: u32, page_id: ObjectId) -> PageText {
        let doc = self.doc;
        let [x0, y0, x1, y1] = page_box(doc, page_id);
        let resources = inherited(doc, page_id, b"Resources").and_then(|o| o.as_dict().ok());

        let operations = match doc.get_page_content(page_id) {
            Ok(data) => decode_operations(&data, number),
            Err(e) => {
                log::warn!("page {number}: cannot read content stream: {e}");
                Vec::new()
            }
        };

        // Shift the page box origin to (0, 0)
        let mut spans = Vec::new();
        self.run(&operations, resources, State::new(Matrix::translate(-x0, -y0)), 0, &mut spans);
        log::debug!("page {number}: {} text spans", spans.len());

        let fallback = if spans.is_empty() {
            doc.extract_text(&[number])
                .ok()
                .filter(|t| !t.trim().is_empty())
        } else {
            None
        };
        if fallback.is_some() {
            log::info!("page {number}: no positioned text, using plain extraction");
        }

        PageText { number, width: x1 - x0, height: y1 - y0, spans, fallback }
    }

    fn font_table(&mut self, resources: Option<&'a Dictionary>) -> HashMap<Vec<u8>, Rc<Font>> {
        let doc = self.doc;
        let mut table = HashMap::new();
        let Some(fonts) = resources
            .and_then(|r| r.get(b"Font").ok())
            .and_then(|o| resolve(doc, o).as_dict().ok())
        else {
            return table;
        };
        for (name, obj) in fonts.iter() {
            let font = match obj {
                Object::Reference(id) => {
                    if let Some(font) = self.fonts.get(id) {
                        font.clone()
                    } else {
                        let Ok(dict) = doc.get_dictionary(*id) else {
                            log::warn!("font {} is not a dictionary", String::from_utf8_lossy(name));
                            continue;
                        };
                        let font = Rc::new(Font::load(doc, dict));
                        self.fonts.insert(*id, font.clone());
                        font
                    }
                }
                Object::Dictionary(dict) => Rc::new(Font::load(doc, dict)),
                _ => continue,
            };
            table.insert(name.clone(), font);
        }
        table
    }

    fn run(
        &mut self,
        operations: &[Operation],
        resources: Option<&'a Dictionary>,
        mut state: State,
        depth: usize,
        spans: &mut Vec<TextSpan>,
    ) {
        let doc = self.doc;
        let fonts = self.font_table(resources);
        let mut stack: Vec<State> = Vec::new();

        for op in operations {
            let operands = &op.operands;
            let num = |i: usize| operands.get(i).and_then(number);
            match op.operator.as_str() {
                "q" => stack.push(state.clone()),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        state = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        state.ctm = m.multiply(&state.ctm);
                    }
                }
                "BT" => {
                    state.tm = Matrix::IDENTITY;
                    state.tlm = Matrix::IDENTITY;
                }
                "Tf" => {
                    let name = operands.first().and_then(|o| o.as_name().ok());
                    state.font = name.and_then(|n| fonts.get(n)).cloned();
                    if state.font.is_none() {
                        log::warn!(
                            "unknown font {:?}, using fallback metrics",
                            name.map(String::from_utf8_lossy)
                        );
                    }
                    state.font_size = num(1).unwrap_or(0.0);
                }
                "Td" => state.next_line(num(0).unwrap_or(0.0), num(1).unwrap_or(0.0)),
                "TD" => {
                    let ty = num(1).unwrap_or(0.0);
                    state.leading = -ty;
                    state.next_line(num(0).unwrap_or(0.0), ty);
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        state.tm = m;
                        state.tlm = m;
                    }
                }
                "T*" => state.next_line(0.0, -state.leading),
                "TL" => state.leading = num(0).unwrap_or(0.0),
                "Tc" => state.char_spacing = num(0).unwrap_or(0.0),
                "Tw" => state.word_spacing = num(0).unwrap_or(0.0),
                "Tz" => state.h_scale = num(0).unwrap_or(100.0) / 100.0,
                "Ts" => state.rise = num(0).unwrap_or(0.0),
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show(&mut state, bytes, spans);
                    }
                }
                "'" => {
                    state.next_line(0.0, -state.leading);
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show(&mut state, bytes, spans);
                    }
                }
                "\"" => {
                    state.word_spacing = num(0).unwrap_or(state.word_spacing);
                    state.char_spacing = num(1).unwrap_or(state.char_spacing);
                    state.next_line(0.0, -state.leading);
                    if let Some(Object::String(bytes, _)) = operands.get(2) {
                        self.show(&mut state, bytes, spans);
                    }
                }
                "TJ" => {
                    let Some(Object::Array(items)) = operands.first() else {
                        continue;
                    };
                    for item in items {
                        match item {
                            Object::String(bytes, _) => self.show(&mut state, bytes, spans),
                            other => {
                                if let Some(adjust) = number(other) {
                                    let tx = -adjust / 1000.0 * state.font_size * state.h_scale;
                                    state.tm = Matrix::translate(tx, 0.0).multiply(&state.tm);
                                }
                            }
                        }
                    }
                }
                "Do" => {
                    if depth >= MAX_FORM_DEPTH {
                        log::warn!("form XObjects nested too deeply, skipping");
                        continue;
                    }
                    let Some(name) = operands.first().and_then(|o| o.as_name().ok()) else {
                        continue;
                    };
                    let Some(form) = resources
                        .and_then(|r| r.get(b"XObject").ok())
                        .and_then(|o| resolve(doc, o).as_dict().ok())
                        .and_then(|x| x.get(name).ok())
                        .and_then(|o| resolve(doc, o).as_stream().ok())
                        .filter(|s| s.dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(b"Form".as_slice()))
                    else {
                        continue;
                    };
                    let data = match form.get_plain_content() {
                        Ok(data) => data,
                        Err(e) => {
                            log::warn!("skipping unreadable form XObject: {e}");
                            continue;
                        }
                    };
                    let form_ops = decode_operations(&data, 0);
                    let matrix = form
                        .dict
                        .get(b"Matrix")
                        .ok()
                        .and_then(|o| resolve(doc, o).as_array().ok())
                        .and_then(|a| Matrix::from_operands(a))
                        .unwrap_or(Matrix::IDENTITY);
                    let form_resources = form
                        .dict
                        .get(b"Resources")
                        .ok()
                        .and_then(|o| resolve(doc, o).as_dict().ok())
                        .or(resources);
                    let mut inner = state.clone();
                    inner.ctm = matrix.multiply(&state.ctm);
                    self.run(&form_ops, form_resources, inner, depth + 1, spans);
                }
                _ => {}
            }
        }
    }

    fn show(&self, state: &mut State, bytes: &[u8], spans: &mut Vec<TextSpan>) {
        let font = state.font.clone().unwrap_or_else(|| self.fallback_font.clone());
        let glyphs = font.decode(bytes);

        let render = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, state.rise])
            .multiply(&state.tm)
            .multiply(&state.ctm);
        let [.., x, y] = render.0;

        let mut text = String::new();
        let mut advance = 0.0;
        for glyph in &glyphs {
            text.push_str(&glyph.text);
            let spacing = state.char_spacing + if glyph.is_space { state.word_spacing } else { 0.0 };
            advance += (glyph.width / 1000.0 * state.font_size + spacing) * state.h_scale;
        }

        let font_size = state.font_size * render.y_scale();
        if !text.trim().is_empty() && font_size > 0.0 {
            spans.push(TextSpan {
                x,
                y,
                width: advance * render.x_scale(),
                font_size,
                text,
                font: font.style.clone(),
            });
        }
        state.tm = Matrix::translate(advance, 0.0).multiply(&state.tm);
    }
}

fn decode_operations(data: &[u8], page: u32) -> Vec<Operation> {
    match Content::decode(data) {
        Ok(content) => content.operations,
        Err(e) => {
            log::warn!("page {page}: cannot decode content stream: {e}");
            Vec::new()
        }
    }
}
