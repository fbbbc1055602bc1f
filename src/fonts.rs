use std::collections::HashMap;

use lopdf::{Dictionary, Document, Encoding, Object};

use crate::pdf::{number, resolve};

/// Widths are in glyph space (1/1000 em).
const DEFAULT_SIMPLE_WIDTH: f32 = 500.0;
const DEFAULT_CID_WIDTH: f32 = 1000.0;

/// Upper bound on codes expanded from a single `W` range entry.
const MAX_RANGE_LEN: u32 = 0x1_0000;

#[derive(Clone, Debug, PartialEq)]
pub struct FontStyle {
    pub name: String,
    pub bold: bool,
    pub italic: bool,
}

pub(crate) struct Glyph {
    pub(crate) text: String,
    pub(crate) width: f32,
    /// Single-byte code 32, the only code word spacing applies to.
    pub(crate) is_space: bool,
}

pub(crate) struct Font {
    pub(crate) style: FontStyle,
    two_byte: bool,
    /// Text for each code named by the font's `ToUnicode` map.
    unicode: HashMap<u32, String>,
    /// The simple font's base encoding, indexed by byte. Empty when unknown.
    base: Vec<String>,
    differences: HashMap<u32, char>,
    first_char: u32,
    widths: Vec<f32>,
    cid_widths: HashMap<u32, f32>,
    default_width: f32,
}

impl Font {
    /// Stand-in for a `Tf` that names a font missing from the resources.
    pub(crate) fn fallback() -> Font {
        Font {
            style: style_from_base_font("Helvetica", None),
            two_byte: false,
            unicode: HashMap::new(),
            base: Vec::new(),
            differences: HashMap::new(),
            first_char: 0,
            widths: Vec::new(),
            cid_widths: HashMap::new(),
            default_width: DEFAULT_SIMPLE_WIDTH,
        }
    }

    pub(crate) fn load(doc: &Document, dict: &Dictionary) -> Font {
        let subtype = dict
            .get(b"Subtype")
            .and_then(Object::as_name)
            .unwrap_or(b"Type1".as_slice());
        let base_font = dict
            .get(b"BaseFont")
            .map(|o| resolve(doc, o))
            .and_then(Object::as_name)
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .unwrap_or_default();
        let two_byte = subtype == b"Type0";
        let (unicode, base) = encoding_tables(doc, dict, &base_font, two_byte);

        if two_byte {
            let descendant = dict
                .get(b"DescendantFonts")
                .map(|o| resolve(doc, o))
                .and_then(Object::as_array)
                .ok()
                .and_then(|a| a.first())
                .map(|o| resolve(doc, o))
                .and_then(|o| o.as_dict().ok());
            let descriptor = descendant.and_then(|d| font_descriptor(doc, d));
            let default_width = descendant
                .and_then(|d| d.get(b"DW").ok())
                .and_then(|o| number(resolve(doc, o)))
                .unwrap_or(DEFAULT_CID_WIDTH);
            let cid_widths = descendant
                .and_then(|d| d.get(b"W").ok())
                .and_then(|o| resolve(doc, o).as_array().ok())
                .map(|w| parse_cid_widths(doc, w))
                .unwrap_or_default();
            log::debug!(
                "Type0 font {base_font}: {} mapped codes, {} explicit widths",
                unicode.len(),
                cid_widths.len()
            );
            return Font {
                style: style_from_base_font(&base_font, descriptor),
                two_byte: true,
                unicode,
                base,
                differences: HashMap::new(),
                first_char: 0,
                widths: Vec::new(),
                cid_widths,
                default_width,
            };
        }

        let descriptor = font_descriptor(doc, dict);
        let first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|o| code_value(resolve(doc, o)))
            .unwrap_or(0);
        let widths: Vec<f32> = dict
            .get(b"Widths")
            .and_then(|o| resolve(doc, o).as_array())
            .map(|a| {
                a.iter()
                    .map(|o| number(resolve(doc, o)).unwrap_or(0.0))
                    .collect()
            })
            .unwrap_or_default();
        let default_width = descriptor
            .and_then(|d| d.get(b"MissingWidth").ok())
            .and_then(|o| number(resolve(doc, o)))
            .filter(|w| *w > 0.0)
            .unwrap_or(DEFAULT_SIMPLE_WIDTH);
        let differences = dict
            .get(b"Encoding")
            .map(|o| resolve(doc, o))
            .and_then(Object::as_dict)
            .ok()
            .and_then(|enc| enc.get(b"Differences").ok())
            .and_then(|o| resolve(doc, o).as_array().ok())
            .map(|a| parse_differences(a.as_slice()))
            .unwrap_or_default();

        Font {
            style: style_from_base_font(&base_font, descriptor),
            two_byte: false,
            unicode,
            base,
            differences,
            first_char,
            widths,
            cid_widths: HashMap::new(),
            default_width,
        }
    }

    pub(crate) fn decode(&self, bytes: &[u8]) -> Vec<Glyph> {
        if self.two_byte {
            bytes
                .chunks_exact(2)
                .map(|pair| {
                    let code = u32::from(pair[0]) << 8 | u32::from(pair[1]);
                    let text = self.unicode.get(&code).cloned().unwrap_or_default();
                    Glyph { text, width: self.width(code), is_space: false }
                })
                .collect()
        } else {
            bytes
                .iter()
                .map(|&b| {
                    let code = u32::from(b);
                    let text = if let Some(s) = self.unicode.get(&code) {
                        s.clone()
                    } else if let Some(&c) = self.differences.get(&code) {
                        clean(&c.to_string())
                    } else if let Some(s) = self.base.get(usize::from(b)) {
                        s.clone()
                    } else if b == b' ' || b.is_ascii_graphic() {
                        char::from(b).to_string()
                    } else {
                        String::new()
                    };
                    Glyph { text, width: self.width(code), is_space: b == b' ' }
                })
                .collect()
        }
    }

    fn width(&self, code: u32) -> f32 {
        if self.two_byte {
            return self.cid_widths.get(&code).copied().unwrap_or(self.default_width);
        }
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .filter(|w| *w > 0.0)
            .unwrap_or(self.default_width)
    }
}

/// Resolves the font's encoding through lopdf. A `ToUnicode` map wins; a
/// simple font without one gets a per-byte table from its base encoding.
fn encoding_tables(
    doc: &Document,
    dict: &Dictionary,
    base_font: &str,
    two_byte: bool,
) -> (HashMap<u32, String>, Vec<String>) {
    match dict.get_font_encoding(doc) {
        Ok(Encoding::UnicodeMapEncoding(cmap)) => {
            let last = if two_byte { 0xFFFF } else { 0xFF };
            let unicode = (0..=last)
                .filter_map(|code| {
                    let units = cmap.get(code)?;
                    Some((u32::from(code), clean(&String::from_utf16_lossy(&units))))
                })
                .collect();
            (unicode, Vec::new())
        }
        Ok(encoding) if !two_byte => {
            let base = (0..=u8::MAX)
                .map(|b| encoding.bytes_to_string(&[b]).map(|s| clean(&s)).unwrap_or_default())
                .collect();
            (HashMap::new(), base)
        }
        Ok(_) => {
            log::debug!("font {base_font} has no ToUnicode map, its text is dropped");
            (HashMap::new(), Vec::new())
        }
        Err(e) => {
            log::debug!("font {base_font}: unusable encoding ({e}), falling back to ASCII");
            (HashMap::new(), Vec::new())
        }
    }
}

fn clean(s: &str) -> String {
    s.chars().filter(|c| !c.is_control()).collect()
}

fn font_descriptor<'a>(doc: &'a Document, font: &'a Dictionary) -> Option<&'a Dictionary> {
    font.get(b"FontDescriptor")
        .map(|o| resolve(doc, o))
        .and_then(Object::as_dict)
        .ok()
}

/// A character code operand. Negative or out-of-range values yield `None`.
fn code_value(obj: &Object) -> Option<u32> {
    match *obj {
        Object::Integer(n) => u32::try_from(n).ok(),
        Object::Real(r) if r >= 0.0 && r <= u32::MAX as f32 => Some(r as u32),
        _ => None,
    }
}

fn parse_cid_widths(doc: &Document, w: &[Object]) -> HashMap<u32, f32> {
    let mut widths = HashMap::new();
    let mut i = 0;
    while i < w.len() {
        let Some(first) = code_value(resolve(doc, &w[i])) else {
            break;
        };
        match w.get(i + 1).map(|o| resolve(doc, o)) {
            Some(Object::Array(list)) => {
                for (offset, item) in list.iter().enumerate() {
                    let Some(code) = u32::try_from(offset).ok().and_then(|o| first.checked_add(o)) else {
                        break;
                    };
                    if let Some(width) = number(resolve(doc, item)) {
                        widths.insert(code, width);
                    }
                }
                i += 2;
            }
            Some(last) => {
                let (Some(last), Some(width)) =
                    (code_value(last), w.get(i + 2).and_then(|o| number(resolve(doc, o))))
                else {
                    break;
                };
                let last = last.min(first.saturating_add(MAX_RANGE_LEN));
                for code in first..=last {
                    widths.insert(code, width);
                }
                i += 3;
            }
            None => break,
        }
    }
    widths
}

fn parse_differences(entries: &[Object]) -> HashMap<u32, char> {
    let mut map = HashMap::new();
    // `None` until a valid code restarts the run.
    let mut code = Some(0u32);
    for entry in entries {
        match entry {
            Object::Integer(n) => code = u32::try_from(*n).ok(),
            Object::Name(name) => {
                let Some(current) = code else { continue };
                if let Some(c) = glyph_name_to_char(&String::from_utf8_lossy(name)) {
                    map.insert(current, c);
                }
                code = current.checked_add(1);
            }
            _ => {}
        }
    }
    map
}

/// Maps the glyph names commonly found in `/Differences` arrays.
fn glyph_name_to_char(name: &str) -> Option<char> {
    if name.chars().count() == 1 {
        return name.chars().next().filter(char::is_ascii_alphanumeric);
    }
    if let Some(hex) = name.strip_prefix("uni").filter(|h| h.len() == 4) {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    let c = match name {
        "space" | "nbspace" => ' ',
        "exclam" => '!',
        "quotedbl" => '"',
        "numbersign" => '#',
        "dollar" => '$',
        "percent" => '%',
        "ampersand" => '&',
        "quotesingle" => '\'',
        "parenleft" => '(',
        "parenright" => ')',
        "asterisk" => '*',
        "plus" => '+',
        "comma" => ',',
        "hyphen" | "minus" => '-',
        "period" => '.',
        "slash" => '/',
        "zero" => '0',
        "one" => '1',
        "two" => '2',
        "three" => '3',
        "four" => '4',
        "five" => '5',
        "six" => '6',
        "seven" => '7',
        "eight" => '8',
        "nine" => '9',
        "colon" => ':',
        "semicolon" => ';',
        "less" => '<',
        "equal" => '=',
        "greater" => '>',
        "question" => '?',
        "at" => '@',
        "bracketleft" => '[',
        "backslash" => '\\',
        "bracketright" => ']',
        "underscore" => '_',
        "braceleft" => '{',
        "bar" => '|',
        "braceright" => '}',
        "quoteleft" => '\u{2018}',
        "quoteright" => '\u{2019}',
        "quotedblleft" => '\u{201C}',
        "quotedblright" => '\u{201D}',
        "bullet" => '\u{2022}',
        "endash" => '\u{2013}',
        "emdash" => '\u{2014}',
        "ellipsis" => '\u{2026}',
        "fi" => '\u{FB01}',
        "fl" => '\u{FB02}',
        "copyright" => '\u{00A9}',
        "registered" => '\u{00AE}',
        "trademark" => '\u{2122}',
        "degree" => '\u{00B0}',
        "section" => '\u{00A7}',
        "paragraph" => '\u{00B6}',
        "Euro" => '\u{20AC}',
        _ => return None,
    };
    Some(c)
}

fn style_from_base_font(base_font: &str, descriptor: Option<&Dictionary>) -> FontStyle {
    // Subset fonts carry a six-letter tag: "ABCDEF+Calibri-Bold"
    let name = match base_font.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.bytes().all(|b| b.is_ascii_uppercase()) => rest,
        _ => base_font,
    };
    let family = name.split(['-', ',']).next().unwrap_or(name);
    let lower = name.to_ascii_lowercase();

    let flags = descriptor
        .and_then(|d| d.get(b"Flags").ok())
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(0);
    let italic_angle = descriptor
        .and_then(|d| d.get(b"ItalicAngle").ok())
        .and_then(number)
        .unwrap_or(0.0);
    let weight = descriptor
        .and_then(|d| d.get(b"FontWeight").ok())
        .and_then(number)
        .unwrap_or(0.0);

    let bold = ["bold", "black", "heavy", "semibold", "demi"]
        .iter()
        .any(|w| lower.contains(w))
        || flags & (1 << 18) != 0
        || weight >= 600.0;
    let italic =
        lower.contains("italic") || lower.contains("oblique") || flags & (1 << 6) != 0 || italic_angle != 0.0;

    FontStyle { name: family_name(family), bold, italic }
}

/// Turns a PostScript family name into something Word will match.
fn family_name(family: &str) -> String {
    match family {
        "" => return "Arial".into(),
        "Helvetica" => return "Arial".into(),
        "Times" => return "Times New Roman".into(),
        "Courier" => return "Courier New".into(),
        _ => {}
    }
    let trimmed = family.strip_suffix("MT").unwrap_or(family);
    let trimmed = trimmed.strip_suffix("PS").unwrap_or(trimmed);

    let mut out = String::with_capacity(trimmed.len() + 4);
    let mut prev: Option<char> = None;
    for c in trimmed.chars() {
        if c.is_ascii_uppercase() && prev.is_some_and(|p| p.is_ascii_lowercase()) {
            out.push(' ');
        }
        out.push(c);
        prev = Some(c);
    }
    if out.is_empty() { family.to_string() } else { out }
}
