#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

#[derive(Debug, Default)]
pub struct Document {
    pub title: Option<String>,
    pub author: Option<String>,
    pub pages: Vec<Page>,
}

/// One PDF page. All lengths are in points.
#[derive(Debug)]
pub struct Page {
    pub width: f32,
    pub height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug)]
pub struct Paragraph {
    pub runs: Vec<Run>,
    pub alignment: Alignment,
    pub space_before: f32,
    pub indent_left: f32,
}

impl Paragraph {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Run {
    pub text: String,
    pub font_size: f32,
    pub font_name: String,
    pub bold: bool,
    pub italic: bool,
}

impl Run {
    pub fn same_style(&self, other: &Run) -> bool {
        self.font_name == other.font_name
            && self.bold == other.bold
            && self.italic == other.italic
            && (self.font_size - other.font_size).abs() < 0.5
    }
}
