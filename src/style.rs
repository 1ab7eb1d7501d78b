//! CSS-to-document style translation.
//!
//! A fixed, immutable registry maps each recognized CSS property to a target
//! style key and a transform that turns the raw computed value into a
//! document-model value. The assignment engine runs every registry entry
//! against an element's computed style, merges collisions (logical OR for
//! booleans and boolean tuples, overwrite otherwise) and suppresses values
//! that came out entirely falsy.

use crate::model::StyleSet;
use crate::units::PX_TO_PT;
use kuchiki::NodeRef;
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleAttribute};

/// Computed-style query capability. The host environment resolved the
/// cascade already; this only reports the final value of a named property
/// for one element.
pub trait StyleSource {
    fn computed_value(&self, element: &NodeRef, property: &str) -> Option<String>;
}

/// Bundled [`StyleSource`] reading declarations from the element's inline
/// `style` attribute. Later declarations win; `!important` wins over normal.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineStyles;

impl StyleSource for InlineStyles {
    fn computed_value(&self, element: &NodeRef, property: &str) -> Option<String> {
        let data = element.as_element()?;
        let attributes = data.attributes.borrow();
        let inline = attributes.get("style")?;
        let parsed = StyleAttribute::parse(inline, ParserOptions::default()).ok()?;
        let block = &parsed.declarations;
        for declaration in block
            .important_declarations
            .iter()
            .rev()
            .chain(block.declarations.iter().rev())
        {
            if declaration.property_id().name().eq_ignore_ascii_case(property) {
                return declaration
                    .value_to_css_string(PrinterOptions::default())
                    .ok();
            }
        }
        None
    }
}

/// Style key a mapping writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleKey {
    Border,
    FontSize,
    Italics,
    Bold,
    Margin,
    Alignment,
}

/// Transformed value ready for merging into a [`StyleSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
    Flag(bool),
    Number(f32),
    Text(String),
    /// left, top, right, bottom points.
    Quad([f32; 4]),
    /// left, top, right, bottom visibility.
    Edges([bool; 4]),
}

impl StyleValue {
    fn is_falsy(&self) -> bool {
        match self {
            StyleValue::Flag(value) => !value,
            StyleValue::Number(value) => *value == 0.0,
            StyleValue::Text(value) => value.is_empty(),
            StyleValue::Quad(values) => values.iter().all(|v| *v == 0.0),
            StyleValue::Edges(values) => values.iter().all(|v| !v),
        }
    }

    /// Merge a new contribution over an existing one: OR for booleans and
    /// boolean tuples, otherwise the newer value replaces the older.
    fn join(old: &StyleValue, new: StyleValue) -> StyleValue {
        match (old, new) {
            (StyleValue::Flag(old_flag), StyleValue::Flag(new_flag)) => {
                StyleValue::Flag(*old_flag || new_flag)
            }
            (StyleValue::Edges(old_edges), StyleValue::Edges(new_edges)) => {
                let mut joined = *old_edges;
                for (slot, add) in joined.iter_mut().zip(new_edges.iter()) {
                    *slot = *slot || *add;
                }
                StyleValue::Edges(joined)
            }
            (_, other) => other,
        }
    }
}

/// One registry entry: a CSS property, the key it lands on and the raw-value
/// transform.
pub struct Mapping {
    pub property: &'static str,
    pub key: StyleKey,
    pub transform: fn(&str) -> StyleValue,
}

/// The assignment engine. Owns the immutable property registry.
pub struct StyleEngine {
    entries: Vec<Mapping>,
}

impl Default for StyleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleEngine {
    pub fn new() -> Self {
        Self {
            entries: vec![
                Mapping {
                    property: "border",
                    key: StyleKey::Border,
                    transform: transform_border,
                },
                Mapping {
                    property: "border-bottom",
                    key: StyleKey::Border,
                    transform: transform_border_bottom,
                },
                Mapping {
                    property: "border-left",
                    key: StyleKey::Border,
                    transform: transform_border_left,
                },
                Mapping {
                    property: "border-right",
                    key: StyleKey::Border,
                    transform: transform_border_right,
                },
                Mapping {
                    property: "border-top",
                    key: StyleKey::Border,
                    transform: transform_border_top,
                },
                Mapping {
                    property: "font-size",
                    key: StyleKey::FontSize,
                    transform: transform_font_size,
                },
                Mapping {
                    property: "font-style",
                    key: StyleKey::Italics,
                    transform: transform_font_style,
                },
                Mapping {
                    property: "font-weight",
                    key: StyleKey::Bold,
                    transform: transform_font_weight,
                },
                Mapping {
                    property: "margin",
                    key: StyleKey::Margin,
                    transform: transform_margin,
                },
                Mapping {
                    property: "text-align",
                    key: StyleKey::Alignment,
                    transform: transform_text_align,
                },
            ],
        }
    }

    pub fn lookup(&self, property: &str) -> Option<&Mapping> {
        self.entries
            .iter()
            .find(|entry| entry.property.eq_ignore_ascii_case(property))
    }

    /// Apply every recognized property of `element`'s computed style to
    /// `target`. Returns whether any recognized property had a nonempty
    /// computed value at all, assigned or suppressed.
    pub fn assign(
        &self,
        target: &mut StyleSet,
        element: &NodeRef,
        source: &dyn StyleSource,
    ) -> bool {
        let mut found_any = false;
        for mapping in &self.entries {
            let Some(raw) = source.computed_value(element, mapping.property) else {
                continue;
            };
            if raw.trim().is_empty() {
                continue;
            }
            found_any = true;
            let mut value = (mapping.transform)(&raw);
            if let Some(existing) = read_key(target, mapping.key) {
                value = StyleValue::join(&existing, value);
            }
            if !value.is_falsy() {
                write_key(target, mapping.key, value);
            }
        }
        found_any
    }
}

fn read_key(style: &StyleSet, key: StyleKey) -> Option<StyleValue> {
    match key {
        StyleKey::Border => style.border.map(StyleValue::Edges),
        StyleKey::FontSize => style.font_size.map(StyleValue::Number),
        StyleKey::Italics => style.italics.map(StyleValue::Flag),
        StyleKey::Bold => style.bold.map(StyleValue::Flag),
        StyleKey::Margin => style.margin.map(StyleValue::Quad),
        StyleKey::Alignment => style.alignment.clone().map(StyleValue::Text),
    }
}

fn write_key(style: &mut StyleSet, key: StyleKey, value: StyleValue) {
    match (key, value) {
        (StyleKey::Border, StyleValue::Edges(edges)) => style.border = Some(edges),
        (StyleKey::FontSize, StyleValue::Number(size)) => style.font_size = Some(size),
        (StyleKey::Italics, StyleValue::Flag(flag)) => style.italics = Some(flag),
        (StyleKey::Bold, StyleValue::Flag(flag)) => style.bold = Some(flag),
        (StyleKey::Margin, StyleValue::Quad(quad)) => style.margin = Some(quad),
        (StyleKey::Alignment, StyleValue::Text(text)) => style.alignment = Some(text),
        _ => {}
    }
}

/// Strips everything but digits, dots and commas, then parses the leading
/// numeric run. `"20.45px"` becomes `20.45`; a value with no numeric run
/// yields `None`, never NaN.
fn parse_numeric(raw: &str) -> Option<f32> {
    let cleaned: String = raw
        .chars()
        .filter(|ch| ch.is_ascii_digit() || *ch == '.' || *ch == ',')
        .collect();
    let mut end = 0;
    let mut seen_dot = false;
    for (index, ch) in cleaned.char_indices() {
        match ch {
            '0'..='9' => end = index + 1,
            '.' if !seen_dot => {
                seen_dot = true;
                end = index + 1;
            }
            _ => break,
        }
    }
    cleaned[..end].parse::<f32>().ok()
}

/// A border value contributes its edge mask only when the leading width
/// token is a nonzero number (`"1px solid black"` yes, `"0px none"` no).
fn border_edges(raw: &str, mask: [bool; 4]) -> StyleValue {
    let width = raw.split_whitespace().next().and_then(parse_numeric);
    match width {
        Some(value) if value != 0.0 => StyleValue::Edges(mask),
        _ => StyleValue::Edges([false; 4]),
    }
}

fn transform_border(raw: &str) -> StyleValue {
    border_edges(raw, [true, true, true, true])
}

fn transform_border_left(raw: &str) -> StyleValue {
    border_edges(raw, [true, false, false, false])
}

fn transform_border_top(raw: &str) -> StyleValue {
    border_edges(raw, [false, true, false, false])
}

fn transform_border_right(raw: &str) -> StyleValue {
    border_edges(raw, [false, false, true, false])
}

fn transform_border_bottom(raw: &str) -> StyleValue {
    border_edges(raw, [false, false, false, true])
}

fn transform_font_size(raw: &str) -> StyleValue {
    let mut size = parse_numeric(raw).unwrap_or(0.0);
    if raw.contains("px") {
        size *= PX_TO_PT;
    }
    StyleValue::Number(size)
}

fn transform_font_style(raw: &str) -> StyleValue {
    let value = raw.trim();
    StyleValue::Flag(
        value.eq_ignore_ascii_case("italic") || value.eq_ignore_ascii_case("oblique"),
    )
}

fn transform_font_weight(raw: &str) -> StyleValue {
    let value = raw.trim();
    let numeric_bold = parse_numeric(value).map(|weight| weight >= 700.0);
    StyleValue::Flag(value.eq_ignore_ascii_case("bold") || numeric_bold.unwrap_or(false))
}

/// CSS margin shorthand, expanded into left/top/right/bottom points. The
/// px-to-pt conversion keys off the first token's unit, matching how the
/// computed shorthand carries one unit across its tokens.
fn transform_margin(raw: &str) -> StyleValue {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let number = |token: &str| parse_numeric(token).unwrap_or(0.0);
    let mut quad = match tokens.as_slice() {
        [all] => {
            let value = number(all);
            [value, value, value, value]
        }
        [vertical, horizontal] => {
            let top_bottom = number(vertical);
            let left_right = number(horizontal);
            [left_right, top_bottom, left_right, top_bottom]
        }
        [top, horizontal, bottom] => {
            let left_right = number(horizontal);
            [left_right, number(top), left_right, number(bottom)]
        }
        [top, right, bottom, left] => [number(left), number(top), number(right), number(bottom)],
        _ => [0.0; 4],
    };
    if tokens.first().is_some_and(|token| token.contains("px")) {
        for value in &mut quad {
            *value *= PX_TO_PT;
        }
    }
    StyleValue::Quad(quad)
}

fn transform_text_align(raw: &str) -> StyleValue {
    StyleValue::Text(raw.to_string())
}
