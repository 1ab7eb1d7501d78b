//! The document definition handed to the PDF renderer.
//!
//! The shapes mirror the pdfmake document-definition object: a flat
//! `content` list of blocks, each block a plain object whose optional style
//! keys sit next to the payload key (`text`, `stack`, `table`, `image`).
//! Serialization therefore flattens [`StyleSet`] into every block and omits
//! keys that were never assigned.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Page formats understood by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PageSize {
    A3,
    A4,
    Letter,
    Legal,
}

impl PageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageSize::A3 => "A3",
            PageSize::A4 => "A4",
            PageSize::Letter => "LETTER",
            PageSize::Legal => "LEGAL",
        }
    }

    /// Case-insensitive lookup from the configuration literal.
    pub fn from_name(raw: &str) -> Option<PageSize> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "a3" => Some(PageSize::A3),
            "a4" => Some(PageSize::A4),
            "letter" => Some(PageSize::Letter),
            "legal" => Some(PageSize::Legal),
            _ => None,
        }
    }

    /// CSS class the embedding preview layer puts on the page container.
    pub fn css_class(&self) -> &'static str {
        match self {
            PageSize::A3 => "page-a3",
            PageSize::A4 => "page-a4",
            PageSize::Letter => "page-letter",
            PageSize::Legal => "page-legal",
        }
    }
}

/// Optional style keys a block can carry. A key is present only when its
/// computed value was non-falsy; `margin` and `border` are ordered
/// left, top, right, bottom.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StyleSet {
    #[serde(rename = "fontSize", skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italics: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<[f32; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<[bool; 4]>,
}

impl StyleSet {
    pub fn is_empty(&self) -> bool {
        self.font_size.is_none()
            && self.bold.is_none()
            && self.italics.is_none()
            && self.alignment.is_none()
            && self.margin.is_none()
            && self.border.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBlock {
    pub text: String,
    #[serde(flatten)]
    pub style: StyleSet,
}

impl TextBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: StyleSet::default(),
        }
    }
}

/// Vertical composite used for table cells holding nested elements.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackBlock {
    pub stack: Vec<Block>,
    #[serde(flatten)]
    pub style: StyleSet,
}

/// One column's width policy: fixed points, content-sized, or fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnWidth {
    Auto,
    Star,
    Pt(f32),
}

impl Serialize for ColumnWidth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ColumnWidth::Auto => serializer.serialize_str("auto"),
            ColumnWidth::Star => serializer.serialize_str("*"),
            ColumnWidth::Pt(value) => serializer.serialize_f32(*value),
        }
    }
}

/// Non-default table layout. `NoBorders` serializes to the renderer's
/// `{defaultBorder: false}` object; any other layout passes through as a
/// named layout string.
#[derive(Debug, Clone, PartialEq)]
pub enum TableLayoutSpec {
    NoBorders,
    Named(String),
}

impl Serialize for TableLayoutSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TableLayoutSpec::NoBorders => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("defaultBorder", &false)?;
                map.end()
            }
            TableLayoutSpec::Named(name) => serializer.serialize_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableBody {
    pub body: Vec<Vec<Block>>,
    pub widths: Vec<ColumnWidth>,
    #[serde(rename = "headerRows", skip_serializing_if = "header_rows_absent")]
    pub header_rows: usize,
}

fn header_rows_absent(count: &usize) -> bool {
    *count == 0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableBlock {
    pub table: TableBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<TableLayoutSpec>,
    #[serde(flatten)]
    pub style: StyleSet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageBlock {
    /// Embeddable payload, a base64 data URL.
    pub image: String,
    /// Width in PDF points.
    pub width: f32,
    #[serde(flatten)]
    pub style: StyleSet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Block {
    Text(TextBlock),
    Stack(StackBlock),
    Table(TableBlock),
    Image(ImageBlock),
}

impl Block {
    pub fn style(&self) -> &StyleSet {
        match self {
            Block::Text(block) => &block.style,
            Block::Stack(block) => &block.style,
            Block::Table(block) => &block.style,
            Block::Image(block) => &block.style,
        }
    }

    pub fn style_mut(&mut self) -> &mut StyleSet {
        match self {
            Block::Text(block) => &mut block.style,
            Block::Stack(block) => &mut block.style,
            Block::Table(block) => &mut block.style,
            Block::Image(block) => &mut block.style,
        }
    }
}

/// Root of one translation pass. Immutable once built; a re-translation
/// replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocDefinition {
    pub content: Vec<Block>,
    #[serde(rename = "pageSize")]
    pub page_size: PageSize,
    /// Points, same order as the configured centimeter margins.
    #[serde(rename = "pageMargins")]
    pub page_margins: [f32; 4],
}

impl DocDefinition {
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
