use crate::model::{Alignment, Page, Paragraph, Run};
use crate::pdf::{PageText, TextSpan};

const DEFAULT_MARGIN: f32 = 72.0;
/// No margin may take more than this share of the page extent it lies on.
const MAX_MARGIN_SHARE: f32 = 0.25;
const FALLBACK_FONT: &str = "Arial";
const FALLBACK_SIZE: f32 = 11.0;

/// A span joins a line when its baseline is this close, relative to font size.
const SAME_LINE: f32 = 0.5;
/// Horizontal gap, relative to font size, read as a word break.
const WORD_GAP: f32 = 0.2;
/// Baseline distance, relative to font size, that separates paragraphs.
const PARAGRAPH_GAP: f32 = 1.6;
const LINE_HEIGHT: f32 = 1.2;
const INDENT: f32 = 1.5;

#[derive(Debug)]
struct Line {
    y: f32,
    left: f32,
    right: f32,
    size: f32,
    runs: Vec<Run>,
}

impl Line {
    fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

pub fn layout_page(page: &PageText) -> Page {
    if page.spans.is_empty() {
        return fallback_page(page);
    }

    let lines = build_lines(&page.spans);

    let left = lines.iter().map(|l| l.left).fold(f32::MAX, f32::min);
    let right = lines.iter().map(|l| l.right).fold(f32::MIN, f32::max);
    let top = lines.iter().map(|l| l.y + l.size).fold(f32::MIN, f32::max);
    let bottom = lines.iter().map(|l| l.y - l.size * 0.25).fold(f32::MAX, f32::min);

    let horizontal = |v: f32| v.clamp(0.0, margin_limit(page.width));
    let vertical = |v: f32| v.clamp(0.0, margin_limit(page.height));
    let mut result = Page {
        width: page.width,
        height: page.height,
        margin_top: vertical(page.height - top),
        margin_bottom: vertical(bottom),
        margin_left: horizontal(left),
        margin_right: horizontal(page.width - right),
        paragraphs: Vec::new(),
    };

    let area_left = result.margin_left;
    let area_right = page.width - result.margin_right;
    result.paragraphs = build_paragraphs(lines, area_left, area_right);
    log::debug!(
        "page {}: {} paragraphs",
        page.number,
        result.paragraphs.len()
    );
    for para in &result.paragraphs {
        log::trace!("{:?} {:?}", para.alignment, para.text());
    }
    result
}

fn fallback_page(page: &PageText) -> Page {
    let paragraphs = page
        .fallback
        .as_deref()
        .unwrap_or_default()
        .split("\n\n")
        .map(|block| block.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
        .map(|text| Paragraph {
            runs: vec![Run {
                text,
                font_size: FALLBACK_SIZE,
                font_name: FALLBACK_FONT.to_string(),
                bold: false,
                italic: false,
            }],
            alignment: Alignment::Left,
            space_before: 0.0,
            indent_left: 0.0,
        })
        .collect();

    Page {
        width: page.width,
        height: page.height,
        margin_top: margin_limit(page.height),
        margin_bottom: margin_limit(page.height),
        margin_left: margin_limit(page.width),
        margin_right: margin_limit(page.width),
        paragraphs,
    }
}

/// Largest margin allowed along a page extent; keeps the text area open on
/// pages smaller than two default margins.
fn margin_limit(extent: f32) -> f32 {
    DEFAULT_MARGIN.min(extent.max(0.0) * MAX_MARGIN_SHARE)
}

fn build_lines(spans: &[TextSpan]) -> Vec<Line> {
    let mut sorted: Vec<&TextSpan> = spans.iter().collect();
    sorted.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut groups: Vec<Vec<&TextSpan>> = Vec::new();
    for span in sorted {
        let joins = groups.last().is_some_and(|group| {
            group
                .iter()
                .any(|s| (s.y - span.y).abs() <= SAME_LINE * s.font_size.min(span.font_size))
        });
        match groups.last_mut() {
            Some(group) if joins => group.push(span),
            _ => groups.push(vec![span]),
        }
    }

    groups
        .into_iter()
        .map(|mut group| {
            group.sort_by(|a, b| a.x.total_cmp(&b.x));
            let mut runs: Vec<Run> = Vec::new();
            let mut prev_end: Option<f32> = None;
            for span in &group {
                let mut text = span.text.clone();
                if let (Some(end), Some(last)) = (prev_end, runs.last()) {
                    let gap = span.x - end;
                    if gap > WORD_GAP * span.font_size
                        && !last.text.ends_with(char::is_whitespace)
                        && !text.starts_with(char::is_whitespace)
                    {
                        text.insert(0, ' ');
                    }
                }
                let run = Run {
                    text,
                    font_size: span.font_size,
                    font_name: span.font.name.clone(),
                    bold: span.font.bold,
                    italic: span.font.italic,
                };
                push_run(&mut runs, run);
                prev_end = Some(prev_end.map_or(span.x + span.width, |e| e.max(span.x + span.width)));
            }

            // Baseline of the largest text on the line
            let anchor = group
                .iter()
                .max_by(|a, b| a.font_size.total_cmp(&b.font_size))
                .map_or(0.0, |s| s.y);
            Line {
                y: anchor,
                left: group.first().map_or(0.0, |s| s.x),
                right: prev_end.unwrap_or(0.0),
                size: group.iter().map(|s| s.font_size).fold(0.0, f32::max),
                runs,
            }
        })
        .collect()
}

fn push_run(runs: &mut Vec<Run>, run: Run) {
    match runs.last_mut() {
        Some(last) if last.same_style(&run) => last.text.push_str(&run.text),
        _ => runs.push(run),
    }
}

struct Block {
    lines: Vec<Line>,
    space_before: f32,
}

fn build_paragraphs(lines: Vec<Line>, area_left: f32, area_right: f32) -> Vec<Paragraph> {
    let mut blocks: Vec<Block> = Vec::new();
    for line in lines {
        let space_before = match blocks.last().and_then(|b| b.lines.last().map(|l| (b, l))) {
            None => Some(0.0),
            Some((block, prev)) => {
                let gap = prev.y - line.y;
                let block_left = block.lines.iter().map(|l| l.left).fold(f32::MAX, f32::min);
                if gap > PARAGRAPH_GAP * prev.size
                    || (line.size - prev.size).abs() > 1.0
                    || line.left - block_left > INDENT * line.size
                    || gap < 0.0
                {
                    Some((gap - LINE_HEIGHT * prev.size).max(0.0))
                } else {
                    None
                }
            }
        };
        match space_before {
            Some(space_before) => blocks.push(Block { lines: vec![line], space_before }),
            None => {
                if let Some(block) = blocks.last_mut() {
                    block.lines.push(line);
                }
            }
        }
    }

    blocks
        .into_iter()
        .map(|block| {
            let alignment = detect_alignment(&block.lines, area_left, area_right);
            let left = block.lines.iter().map(|l| l.left).fold(f32::MAX, f32::min);
            let indent_left = match alignment {
                Alignment::Left => (left - area_left).max(0.0),
                _ => 0.0,
            };
            Paragraph {
                runs: join_lines(block.lines),
                alignment,
                space_before: block.space_before,
                indent_left,
            }
        })
        .collect()
}

fn join_lines(lines: Vec<Line>) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for line in lines {
        let next_starts_lower = line
            .text()
            .trim_start()
            .chars()
            .next()
            .is_some_and(char::is_lowercase);
        if let Some(last) = runs.last_mut() {
            let trimmed = last.text.trim_end().len();
            last.text.truncate(trimmed);
            if last.text.ends_with('-') && next_starts_lower {
                last.text.pop();
            } else {
                last.text.push(' ');
            }
        }
        let mut line_runs = line.runs.into_iter();
        if let Some(mut first) = line_runs.next() {
            if !runs.is_empty() {
                first.text = first.text.trim_start().to_string();
            }
            push_run(&mut runs, first);
        }
        for run in line_runs {
            push_run(&mut runs, run);
        }
    }
    if let Some(last) = runs.last_mut() {
        let trimmed = last.text.trim_end().len();
        last.text.truncate(trimmed);
    }
    runs.retain(|r| !r.text.is_empty());
    runs
}

fn detect_alignment(lines: &[Line], area_left: f32, area_right: f32) -> Alignment {
    let width = area_right - area_left;
    if width <= 0.0 || lines.is_empty() {
        return Alignment::Left;
    }
    let tolerance = width * 0.05;
    let center = (area_left + area_right) / 2.0;

    let centered = lines.iter().all(|l| {
        ((l.left + l.right) / 2.0 - center).abs() <= tolerance
            && l.left - area_left > tolerance
            && area_right - l.right > tolerance
    });
    if centered {
        return Alignment::Center;
    }

    let right = lines
        .iter()
        .all(|l| (area_right - l.right).abs() <= tolerance && l.left - area_left > width * 0.2);
    if right {
        return Alignment::Right;
    }

    Alignment::Left
}
