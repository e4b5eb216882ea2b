//! Word-processing documents: `.docx` extraction and plain text to HTML.
//!
//! A `.docx` is a zip package; the body lives in `word/document.xml`. The
//! parser walks it once with `quick-xml` and produces a flat list of
//! [`Block`]s, which the two renderers turn into HTML or plain text.
//!
//! Supported structure: paragraphs, `Heading1`..`Heading6` and `Title`
//! paragraph styles, numbered paragraphs (rendered as list items), bold and
//! italic runs, line breaks, tabs and (nested) tables. Everything else is
//! read for its text only.

use super::CodecError;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Cursor, Read};
use zip::ZipArchive;

const BODY_PART: &str = "word/document.xml";

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Paragraph),
    /// Rows of cells; each cell holds its own blocks.
    Table(Vec<Vec<Vec<Block>>>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    pub kind: ParagraphKind,
    pub runs: Vec<Run>,
}

impl Paragraph {
    fn is_blank(&self) -> bool {
        self.runs.iter().all(|r| match &r.content {
            RunContent::Text(t) => t.trim().is_empty(),
            RunContent::Break | RunContent::Tab => true,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParagraphKind {
    #[default]
    Normal,
    Heading(u8),
    ListItem,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub content: RunContent,
    pub bold: bool,
    pub italic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunContent {
    Text(String),
    Break,
    Tab,
}

/// Heading level for a paragraph style id, e.g. `Heading2` or `heading 2`.
fn heading_level(style: &str) -> Option<u8> {
    let lower = style.to_ascii_lowercase();
    if lower == "title" {
        return Some(1);
    }
    let rest = lower.strip_prefix("heading")?.trim_start();
    match rest.parse::<u8>() {
        Ok(level @ 1..=6) => Some(level),
        _ => None,
    }
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, CodecError> {
    match e.try_get_attribute(key).map_err(quick_xml::Error::from)? {
        Some(a) => Ok(Some(a.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// `<w:b/>` is on; `<w:b w:val="0"/>` or `"false"` is off.
fn toggle_on(e: &BytesStart<'_>) -> Result<bool, CodecError> {
    Ok(!matches!(attr(e, b"w:val")?.as_deref(), Some("0") | Some("false") | Some("off")))
}

#[derive(Default)]
struct TableBuilder {
    rows: Vec<Vec<Vec<Block>>>,
}

impl TableBuilder {
    fn current_cell(&mut self) -> Option<&mut Vec<Block>> {
        self.rows.last_mut().and_then(|row| row.last_mut())
    }
}

#[derive(Default)]
struct BodyWalker {
    blocks: Vec<Block>,
    tables: Vec<TableBuilder>,
    /// Open paragraphs; text boxes nest a `w:p` inside another.
    paragraphs: Vec<Paragraph>,
    /// Depth inside `mc:Fallback`, which repeats the `mc:Choice` content.
    fallback_depth: usize,
    in_run: bool,
    in_run_props: bool,
    in_text: bool,
    bold: bool,
    italic: bool,
}

impl BodyWalker {
    fn push_block(&mut self, block: Block) {
        if let Some(cell) = self.tables.last_mut().and_then(TableBuilder::current_cell) {
            cell.push(block);
        } else {
            self.blocks.push(block);
        }
    }

    fn push_run(&mut self, content: RunContent) {
        let (bold, italic) = (self.bold, self.italic);
        if let Some(p) = self.paragraphs.last_mut() {
            p.runs.push(Run {
                content,
                bold,
                italic,
            });
        }
    }

    /// Emit the text of the enclosing paragraph read so far, so a nested
    /// paragraph lands between its surrounding text.
    fn split_open_paragraph(&mut self) {
        let Some(outer) = self.paragraphs.last_mut() else {
            return;
        };
        let head = Paragraph {
            kind: outer.kind,
            runs: std::mem::take(&mut outer.runs),
        };
        if !head.is_blank() {
            self.push_block(Block::Paragraph(head));
        }
    }

    fn start(&mut self, e: &BytesStart<'_>, empty: bool) -> Result<(), CodecError> {
        if e.name().as_ref() == b"mc:Fallback" && !empty {
            self.fallback_depth += 1;
        }
        if self.fallback_depth > 0 {
            return Ok(());
        }
        match e.name().as_ref() {
            b"w:p" if !empty => {
                self.split_open_paragraph();
                self.paragraphs.push(Paragraph::default());
            }
            b"w:tbl" if !empty => self.tables.push(TableBuilder::default()),
            b"w:tr" if !empty => {
                if let Some(t) = self.tables.last_mut() {
                    t.rows.push(Vec::new());
                }
            }
            b"w:tc" if !empty => {
                if let Some(row) = self.tables.last_mut().and_then(|t| t.rows.last_mut()) {
                    row.push(Vec::new());
                }
            }
            b"w:pStyle" => {
                if let (Some(p), Some(style)) = (self.paragraphs.last_mut(), attr(e, b"w:val")?) {
                    if let Some(level) = heading_level(&style) {
                        p.kind = ParagraphKind::Heading(level);
                    }
                }
            }
            b"w:numPr" => {
                if let Some(p) = self.paragraphs.last_mut() {
                    if p.kind == ParagraphKind::Normal {
                        p.kind = ParagraphKind::ListItem;
                    }
                }
            }
            b"w:r" if !empty => {
                self.in_run = true;
                self.bold = false;
                self.italic = false;
            }
            b"w:rPr" if self.in_run && !empty => self.in_run_props = true,
            b"w:b" if self.in_run_props => self.bold = toggle_on(e)?,
            b"w:i" if self.in_run_props => self.italic = toggle_on(e)?,
            b"w:t" if self.in_run && !empty => self.in_text = true,
            b"w:br" | b"w:cr" if self.in_run => self.push_run(RunContent::Break),
            b"w:tab" if self.in_run => self.push_run(RunContent::Tab),
            _ => {}
        }
        Ok(())
    }

    fn end(&mut self, name: &[u8]) {
        if self.fallback_depth > 0 {
            if name == b"mc:Fallback" {
                self.fallback_depth -= 1;
            }
            return;
        }
        match name {
            b"w:p" => {
                if let Some(p) = self.paragraphs.pop() {
                    if !p.is_blank() {
                        self.push_block(Block::Paragraph(p));
                    }
                }
            }
            b"w:tbl" => {
                if let Some(table) = self.tables.pop() {
                    self.push_block(Block::Table(table.rows));
                }
            }
            b"w:r" => {
                self.in_run = false;
                self.in_run_props = false;
            }
            b"w:rPr" => self.in_run_props = false,
            b"w:t" => self.in_text = false,
            _ => {}
        }
    }
}

/// Parse the main body of a `.docx` package.
pub fn parse_docx(input: &[u8]) -> Result<Vec<Block>, CodecError> {
    let mut archive = ZipArchive::new(Cursor::new(input))?;
    let mut xml = String::new();
    archive.by_name(BODY_PART)?.read_to_string(&mut xml)?;

    let mut reader = Reader::from_str(&xml);
    let mut walker = BodyWalker::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) => walker.start(&e, false)?,
            Event::Empty(e) => walker.start(&e, true)?,
            Event::End(e) => walker.end(e.name().as_ref()),
            Event::Text(t) if walker.in_text => {
                let text = t.unescape()?.into_owned();
                walker.push_run(RunContent::Text(text));
            }
            Event::CData(t) if walker.in_text => {
                let text = String::from_utf8_lossy(&t.into_inner()).into_owned();
                walker.push_run(RunContent::Text(text));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(walker.blocks)
}

// ── HTML ─────────────────────────────────────────────────────────────────

pub fn render_html(blocks: &[Block]) -> String {
    let mut out = String::new();
    write_blocks_html(blocks, &mut out);
    out
}

fn write_blocks_html(blocks: &[Block], out: &mut String) {
    let mut in_list = false;
    for block in blocks {
        let is_item = matches!(block, Block::Paragraph(p) if p.kind == ParagraphKind::ListItem);
        if is_item && !in_list {
            out.push_str("<ul>");
        } else if !is_item && in_list {
            out.push_str("</ul>");
        }
        in_list = is_item;

        match block {
            Block::Paragraph(p) => {
                let (open, close) = match p.kind {
                    ParagraphKind::Normal => ("<p>".to_string(), "</p>".to_string()),
                    ParagraphKind::Heading(n) => (format!("<h{n}>"), format!("</h{n}>")),
                    ParagraphKind::ListItem => ("<li>".to_string(), "</li>".to_string()),
                };
                out.push_str(&open);
                write_runs_html(&p.runs, out);
                out.push_str(&close);
            }
            Block::Table(rows) => {
                out.push_str("<table>");
                for row in rows {
                    out.push_str("<tr>");
                    for cell in row {
                        out.push_str("<td>");
                        write_blocks_html(cell, out);
                        out.push_str("</td>");
                    }
                    out.push_str("</tr>");
                }
                out.push_str("</table>");
            }
        }
    }
    if in_list {
        out.push_str("</ul>");
    }
}

/// Adjacent runs with the same formatting share one tag pair.
fn write_runs_html(runs: &[Run], out: &mut String) {
    let mut i = 0;
    while i < runs.len() {
        let (bold, italic) = (runs[i].bold, runs[i].italic);
        let mut body = String::new();
        while i < runs.len() && runs[i].bold == bold && runs[i].italic == italic {
            match &runs[i].content {
                RunContent::Text(t) => body.push_str(&escape(t.as_str())),
                RunContent::Break => body.push_str("<br />"),
                RunContent::Tab => body.push('\t'),
            }
            i += 1;
        }
        if italic {
            body = format!("<em>{body}</em>");
        }
        if bold {
            body = format!("<strong>{body}</strong>");
        }
        out.push_str(&body);
    }
}

// ── Plain text ───────────────────────────────────────────────────────────

/// Each paragraph's text followed by a blank line, table cells included.
pub fn render_text(blocks: &[Block]) -> String {
    let mut out = String::new();
    write_blocks_text(blocks, &mut out);
    out
}

fn write_blocks_text(blocks: &[Block], out: &mut String) {
    for block in blocks {
        match block {
            Block::Paragraph(p) => {
                for run in &p.runs {
                    match &run.content {
                        RunContent::Text(t) => out.push_str(t),
                        RunContent::Break => out.push('\n'),
                        RunContent::Tab => out.push('\t'),
                    }
                }
                out.push_str("\n\n");
            }
            Block::Table(rows) => {
                for cell in rows.iter().flatten() {
                    write_blocks_text(cell, out);
                }
            }
        }
    }
}

// ── Text → HTML ──────────────────────────────────────────────────────────

/// Standalone HTML page showing `text` verbatim in a `<pre>` block.
pub fn text_to_html(text: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Converted Document</title>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 40px; line-height: 1.6; }}
        pre {{ white-space: pre-wrap; }}
    </style>
</head>
<body>
    <pre>{}</pre>
</body>
</html>"#,
        escape(text)
    )
}
