//! The HTML-to-document translation walk.
//!
//! Elements map to document blocks by tag: paragraphs and headings become
//! text blocks, tables recurse through rows and cells, images re-encode
//! through the pixel source, and anything unrecognized degrades to a blank
//! filler instead of failing. Every produced block then runs through the
//! style assignment engine with the source element's computed style.

use crate::debug::DebugLogger;
use crate::error::GalleyError;
use crate::image::{PixelSource, format_token};
use crate::model::{
    Block, ColumnWidth, ImageBlock, StackBlock, StyleSet, TableBlock, TableBody, TableLayoutSpec,
    TextBlock,
};
use crate::style::{StyleEngine, StyleSource};
use crate::units::PX_TO_PT;
use kuchiki::NodeRef;

/// Table width policy: fill the page, size columns to content, or a fixed
/// per-column pixel width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WidthSpec {
    Full,
    Auto,
    Px(f32),
}

impl WidthSpec {
    /// `"full"` (case-insensitive) fills the width; any other literal is
    /// content-sized. Numeric widths come in through `From<f32>`.
    pub fn parse(raw: &str) -> WidthSpec {
        if raw.trim().eq_ignore_ascii_case("full") {
            WidthSpec::Full
        } else {
            WidthSpec::Auto
        }
    }
}

impl From<f32> for WidthSpec {
    fn from(px: f32) -> Self {
        WidthSpec::Px(px)
    }
}

impl From<&str> for WidthSpec {
    fn from(raw: &str) -> Self {
        WidthSpec::parse(raw)
    }
}

/// One width policy for every table, or one per table in processing order.
/// A list shorter than the table count falls back to `Auto` past its end.
#[derive(Debug, Clone, PartialEq)]
pub enum TableWidths {
    All(WidthSpec),
    PerTable(Vec<WidthSpec>),
}

impl Default for TableWidths {
    fn default() -> Self {
        TableWidths::All(WidthSpec::Auto)
    }
}

impl TableWidths {
    pub(crate) fn for_table(&self, index: usize) -> WidthSpec {
        match self {
            TableWidths::All(spec) => *spec,
            TableWidths::PerTable(specs) => specs.get(index).copied().unwrap_or(WidthSpec::Auto),
        }
    }
}

/// Table layout variant. Unrecognized names pass through verbatim so the
/// renderer can resolve custom layouts it knows about.
#[derive(Debug, Clone, PartialEq)]
pub enum TableLayout {
    Default,
    NoBorders,
    HeaderLineOnly,
    LightHorizontalLines,
    Custom(String),
}

impl TableLayout {
    pub fn parse(raw: &str) -> TableLayout {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "default" => TableLayout::Default,
            "noborders" => TableLayout::NoBorders,
            "headerlineonly" => TableLayout::HeaderLineOnly,
            "lighthorizontallines" => TableLayout::LightHorizontalLines,
            _ => TableLayout::Custom(raw.trim().to_string()),
        }
    }

    pub(crate) fn doc_layout(&self) -> Option<TableLayoutSpec> {
        match self {
            TableLayout::Default => None,
            TableLayout::NoBorders => Some(TableLayoutSpec::NoBorders),
            TableLayout::HeaderLineOnly => {
                Some(TableLayoutSpec::Named("headerLineOnly".to_string()))
            }
            TableLayout::LightHorizontalLines => {
                Some(TableLayoutSpec::Named("lightHorizontalLines".to_string()))
            }
            TableLayout::Custom(name) => Some(TableLayoutSpec::Named(name.clone())),
        }
    }
}

/// One layout for every table, or one per table in processing order.
#[derive(Debug, Clone, PartialEq)]
pub enum TableLayouts {
    All(TableLayout),
    PerTable(Vec<TableLayout>),
}

impl Default for TableLayouts {
    fn default() -> Self {
        TableLayouts::All(TableLayout::Default)
    }
}

impl TableLayouts {
    pub(crate) fn for_table(&self, index: usize) -> TableLayout {
        match self {
            TableLayouts::All(layout) => layout.clone(),
            TableLayouts::PerTable(layouts) => {
                layouts.get(index).cloned().unwrap_or(TableLayout::Default)
            }
        }
    }
}

/// One translation pass over a root subtree. Owns the per-pass table
/// counter; nothing here is shared across passes.
pub(crate) struct TranslatePass<'a> {
    styles: &'a StyleEngine,
    style_source: &'a dyn StyleSource,
    pixels: &'a dyn PixelSource,
    widths: &'a TableWidths,
    layouts: &'a TableLayouts,
    debug: Option<&'a DebugLogger>,
    processed_tables: usize,
}

impl<'a> TranslatePass<'a> {
    pub fn new(
        styles: &'a StyleEngine,
        style_source: &'a dyn StyleSource,
        pixels: &'a dyn PixelSource,
        widths: &'a TableWidths,
        layouts: &'a TableLayouts,
        debug: Option<&'a DebugLogger>,
    ) -> Self {
        Self {
            styles,
            style_source,
            pixels,
            widths,
            layouts,
            debug,
            processed_tables: 0,
        }
    }

    pub fn build_block(&mut self, element: &NodeRef) -> Result<Block, GalleyError> {
        let tag = tag_name(element).unwrap_or_default();
        let mut block = match tag.as_str() {
            "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.count("translate.text");
                let text = inner_markup(element).trim().to_string();
                Block::Text(TextBlock::new(if text.is_empty() {
                    " ".to_string()
                } else {
                    text
                }))
            }
            "br" => {
                self.count("translate.text");
                Block::Text(TextBlock::new(" "))
            }
            "table" => {
                self.count("translate.table");
                self.build_table(element)?
            }
            "img" => {
                self.count("translate.img");
                self.build_image(element)?
            }
            _ => {
                self.count("translate.filler");
                Block::Text(TextBlock::new(" "))
            }
        };
        if self.styles.assign(block.style_mut(), element, self.style_source) {
            self.count("style.assigned");
        }
        Ok(block)
    }

    fn build_table(&mut self, table: &NodeRef) -> Result<Block, GalleyError> {
        let table_index = self.processed_tables;
        let width_spec = self.widths.for_table(table_index);
        let layout = self.layouts.for_table(table_index);

        let rows = table_rows(table);
        let mut body = Vec::with_capacity(rows.len());
        let mut header_rows = 0usize;
        let mut header_prefix = true;
        for row in &rows {
            let cells = row_cells(row);
            // Header rows must be contiguous from the top; the first
            // non-header row ends the count for good.
            if header_prefix {
                if cells.first().is_some_and(is_header_cell) {
                    header_rows += 1;
                }
                header_prefix = !cells.is_empty() && cells.iter().all(|cell| is_header_cell(cell));
            }

            let mut row_blocks = Vec::with_capacity(cells.len());
            for cell in &cells {
                let children = element_children(cell);
                let mut block = if children.is_empty() {
                    Block::Text(TextBlock::new(inner_markup(cell).trim().to_string()))
                } else {
                    let mut stack = Vec::with_capacity(children.len());
                    for child in &children {
                        stack.push(self.build_block(child)?);
                    }
                    Block::Stack(StackBlock {
                        stack,
                        style: StyleSet::default(),
                    })
                };
                self.styles.assign(block.style_mut(), cell, self.style_source);
                row_blocks.push(block);
            }
            body.push(row_blocks);
        }

        let column_count = rows.first().map(|row| row_cells(row).len()).unwrap_or(0);
        let column_width = match width_spec {
            WidthSpec::Full => ColumnWidth::Star,
            WidthSpec::Px(px) => ColumnWidth::Pt(px * PX_TO_PT),
            WidthSpec::Auto => ColumnWidth::Auto,
        };
        let widths = vec![column_width; column_count];

        apply_table_css(table, width_spec, &layout, header_rows);
        self.processed_tables += 1;

        Ok(Block::Table(TableBlock {
            table: TableBody {
                body,
                widths,
                header_rows,
            },
            layout: layout.doc_layout(),
            style: StyleSet::default(),
        }))
    }

    fn build_image(&mut self, img: &NodeRef) -> Result<Block, GalleyError> {
        let (src, target) = {
            let Some(data) = img.as_element() else {
                return Ok(Block::Text(TextBlock::new(" ")));
            };
            let attributes = data.attributes.borrow();
            let src = attributes.get("src").unwrap_or("").to_string();
            let width = rendered_px(attributes.get("width"));
            let height = rendered_px(attributes.get("height"));
            (src, width.zip(height))
        };
        let format = format_token(&src).to_string();
        let raster = self.pixels.raster(&src, target, &format)?;
        Ok(Block::Image(ImageBlock {
            image: raster.data_url,
            width: raster.width_px as f32 * PX_TO_PT,
            style: StyleSet::default(),
        }))
    }

    fn count(&self, key: &str) {
        if let Some(debug) = self.debug {
            debug.increment(key, 1);
        }
    }
}

/// Rewrite the live table's visual styling to match the resolved layout and
/// width, so the on-screen preview agrees with the produced document.
/// Reapplying the same layout is idempotent.
pub fn apply_table_css(
    table: &NodeRef,
    width: WidthSpec,
    layout: &TableLayout,
    header_rows: usize,
) {
    set_inline_style(table, "border-collapse", "collapse");

    let rows = table_rows(table);
    for (row_index, row) in rows.iter().enumerate() {
        let is_last_header = header_rows > 0 && row_index + 1 == header_rows;
        for cell in row_cells(row) {
            match layout {
                // leave whatever styling the document already has
                TableLayout::NoBorders => {}
                TableLayout::HeaderLineOnly => {
                    set_inline_style(&cell, "border", "0px none black");
                    if is_last_header {
                        set_inline_style(&cell, "border-bottom", "1px solid black");
                    }
                }
                TableLayout::LightHorizontalLines => {
                    set_inline_style(&cell, "border", "0px none black");
                    if is_last_header {
                        set_inline_style(&cell, "border-bottom", "1px solid black");
                    } else {
                        set_inline_style(&cell, "border-top", "1px solid lightgrey");
                    }
                }
                // default and unrecognized layouts get full borders
                _ => set_inline_style(&cell, "border", "1px solid black"),
            }
        }
    }

    match width {
        WidthSpec::Full => set_attribute(table, "width", "100%"),
        WidthSpec::Px(px) => {
            for row in &rows {
                for cell in row_cells(row) {
                    set_attribute(&cell, "width", &format!("{px}px"));
                }
            }
        }
        WidthSpec::Auto => {}
    }
}

pub(crate) fn tag_name(node: &NodeRef) -> Option<String> {
    node.as_element()
        .map(|data| data.name.local.as_ref().to_ascii_lowercase())
}

pub(crate) fn element_children(node: &NodeRef) -> Vec<NodeRef> {
    node.children()
        .filter(|child| child.as_element().is_some())
        .collect()
}

/// Rows of this table only, in section order; rows of nested tables belong
/// to those tables.
pub(crate) fn table_rows(table: &NodeRef) -> Vec<NodeRef> {
    let mut rows = Vec::new();
    for child in table.children() {
        match tag_name(&child).as_deref() {
            Some("tr") => rows.push(child),
            Some("thead") | Some("tbody") | Some("tfoot") => {
                for section_child in child.children() {
                    if tag_name(&section_child).as_deref() == Some("tr") {
                        rows.push(section_child);
                    }
                }
            }
            _ => {}
        }
    }
    rows
}

pub(crate) fn row_cells(row: &NodeRef) -> Vec<NodeRef> {
    row.children()
        .filter(|child| matches!(tag_name(child).as_deref(), Some("td") | Some("th")))
        .collect()
}

fn is_header_cell(cell: &NodeRef) -> bool {
    tag_name(cell).as_deref() == Some("th")
}

/// The element's serialized child markup, like the DOM's innerHTML.
pub(crate) fn inner_markup(node: &NodeRef) -> String {
    node.children().map(|child| child.to_string()).collect()
}

fn rendered_px(value: Option<&str>) -> Option<u32> {
    let trimmed = value?.trim_end_matches("px").trim();
    trimmed.parse::<f32>().ok().map(|px| px.round() as u32)
}

fn set_attribute(node: &NodeRef, name: &str, value: &str) {
    if let Some(data) = node.as_element() {
        data.attributes.borrow_mut().insert(name, value.to_string());
    }
}

/// Upsert one declaration in the element's inline style attribute. Setting
/// the `border` shorthand also drops the side longhands, the way assigning
/// `style.border` resets them in a live DOM.
fn set_inline_style(node: &NodeRef, property: &str, value: &str) {
    let Some(data) = node.as_element() else {
        return;
    };
    let mut attributes = data.attributes.borrow_mut();
    let existing = attributes
        .get("style")
        .map(|style| style.to_string())
        .unwrap_or_default();
    let mut declarations: Vec<String> = Vec::new();
    for declaration in existing.split(';') {
        let Some((name, current)) = declaration.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() || overridden_by(property, name) {
            continue;
        }
        declarations.push(format!("{}: {}", name, current.trim()));
    }
    declarations.push(format!("{property}: {value}"));
    attributes.insert("style", declarations.join("; "));
}

fn overridden_by(property: &str, existing: &str) -> bool {
    if existing.eq_ignore_ascii_case(property) {
        return true;
    }
    // the border shorthand resets border-top/right/bottom/left, but not
    // border-collapse
    property.eq_ignore_ascii_case("border")
        && existing.to_ascii_lowercase().starts_with("border-")
        && !existing.eq_ignore_ascii_case("border-collapse")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::EagerPixels;
    use crate::style::InlineStyles;
    use base64::Engine as _;
    use kuchiki::traits::TendrilSink;

    fn parse_fragment(html: &str) -> (NodeRef, NodeRef) {
        let document = kuchiki::parse_html().one(format!(
            "<html><body><div id=\"root\">{html}</div></body></html>"
        ));
        let root = document
            .select_first("#root")
            .expect("root")
            .as_node()
            .clone();
        (document, root)
    }

    fn first_element(root: &NodeRef) -> NodeRef {
        element_children(root).into_iter().next().expect("element")
    }

    struct Fixture {
        engine: StyleEngine,
        pixels: EagerPixels,
        widths: TableWidths,
        layouts: TableLayouts,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                engine: StyleEngine::new(),
                pixels: EagerPixels::new(),
                widths: TableWidths::default(),
                layouts: TableLayouts::default(),
            }
        }

        fn with_widths(mut self, widths: TableWidths) -> Self {
            self.widths = widths;
            self
        }

        fn with_layouts(mut self, layouts: TableLayouts) -> Self {
            self.layouts = layouts;
            self
        }

        fn translate(&self, element: &NodeRef) -> Block {
            let mut pass = TranslatePass::new(
                &self.engine,
                &InlineStyles,
                &self.pixels,
                &self.widths,
                &self.layouts,
                None,
            );
            pass.build_block(element).expect("translate")
        }

        fn translate_all(&self, root: &NodeRef) -> Vec<Block> {
            let mut pass = TranslatePass::new(
                &self.engine,
                &InlineStyles,
                &self.pixels,
                &self.widths,
                &self.layouts,
                None,
            );
            element_children(root)
                .iter()
                .map(|child| pass.build_block(child).expect("translate"))
                .collect()
        }
    }

    fn text_of(block: &Block) -> &str {
        match block {
            Block::Text(text) => &text.text,
            other => panic!("expected text block, got {other:?}"),
        }
    }

    fn table_of(block: &Block) -> &TableBlock {
        match block {
            Block::Table(table) => table,
            other => panic!("expected table block, got {other:?}"),
        }
    }

    #[test]
    fn headings_and_paragraphs_become_text_blocks() {
        let (_document, root) = parse_fragment("<h1>Title</h1>");
        let block = Fixture::new().translate(&first_element(&root));
        assert_eq!(text_of(&block), "Title");
    }

    #[test]
    fn empty_supported_tags_yield_a_single_space() {
        for html in ["<p></p>", "<p>   </p>", "<br>", "<h3></h3>"] {
            let (_document, root) = parse_fragment(html);
            let block = Fixture::new().translate(&first_element(&root));
            assert_eq!(text_of(&block), " ", "for fragment {html}");
        }
    }

    #[test]
    fn unsupported_tags_degrade_to_blank_fillers() {
        let (_document, root) = parse_fragment("<blockquote>ignored</blockquote>");
        let block = Fixture::new().translate(&first_element(&root));
        assert_eq!(text_of(&block), " ");
    }

    #[test]
    fn inner_markup_keeps_nested_inline_tags() {
        let (_document, root) = parse_fragment("<p>He<b>llo</b></p>");
        let block = Fixture::new().translate(&first_element(&root));
        assert_eq!(text_of(&block), "He<b>llo</b>");
    }

    #[test]
    fn element_styles_land_on_the_block() {
        let (_document, root) =
            parse_fragment(r#"<p style="font-weight: bold; text-align: right">x</p>"#);
        let block = Fixture::new().translate(&first_element(&root));
        assert_eq!(block.style().bold, Some(true));
        assert_eq!(block.style().alignment.as_deref(), Some("right"));
    }

    #[test]
    fn contiguous_header_rows_are_counted() {
        let (_document, root) = parse_fragment(
            "<table>\
               <tr><th>a</th><th>b</th></tr>\
               <tr><th>c</th><th>d</th></tr>\
               <tr><th>e</th><th>f</th></tr>\
               <tr><td>1</td><td>2</td></tr>\
             </table>",
        );
        let block = Fixture::new().translate(&first_element(&root));
        assert_eq!(table_of(&block).table.header_rows, 3);
    }

    #[test]
    fn header_counting_stops_at_the_first_data_row() {
        let (_document, root) = parse_fragment(
            "<table>\
               <tr><td>1</td></tr>\
               <tr><th>late</th></tr>\
             </table>",
        );
        let block = Fixture::new().translate(&first_element(&root));
        assert_eq!(table_of(&block).table.header_rows, 0);
    }

    #[test]
    fn mixed_row_counts_once_then_ends_the_header_prefix() {
        let (_document, root) = parse_fragment(
            "<table>\
               <tr><th>a</th><td>b</td></tr>\
               <tr><th>c</th><th>d</th></tr>\
             </table>",
        );
        let block = Fixture::new().translate(&first_element(&root));
        assert_eq!(table_of(&block).table.header_rows, 1);
    }

    #[test]
    fn thead_and_tbody_rows_are_walked_in_section_order() {
        let (_document, root) = parse_fragment(
            "<table>\
               <thead><tr><th>h</th></tr></thead>\
               <tbody><tr><td>1</td></tr><tr><td>2</td></tr></tbody>\
             </table>",
        );
        let block = Fixture::new().translate(&first_element(&root));
        let table = table_of(&block);
        assert_eq!(table.table.header_rows, 1);
        assert_eq!(table.table.body.len(), 3);
    }

    #[test]
    fn full_width_produces_star_columns() {
        let (_document, root) =
            parse_fragment("<table><tr><td>a</td><td>b</td><td>c</td></tr></table>");
        let fixture = Fixture::new().with_widths(TableWidths::All(WidthSpec::Full));
        let block = fixture.translate(&first_element(&root));
        assert_eq!(
            table_of(&block).table.widths,
            vec![ColumnWidth::Star, ColumnWidth::Star, ColumnWidth::Star]
        );
    }

    #[test]
    fn pixel_width_converts_to_points_per_column() {
        let (_document, root) = parse_fragment("<table><tr><td>a</td><td>b</td></tr></table>");
        let fixture = Fixture::new().with_widths(TableWidths::All(WidthSpec::Px(150.0)));
        let block = fixture.translate(&first_element(&root));
        assert_eq!(
            table_of(&block).table.widths,
            vec![ColumnWidth::Pt(112.5), ColumnWidth::Pt(112.5)]
        );
    }

    #[test]
    fn zero_rows_mean_zero_columns() {
        let (_document, root) = parse_fragment("<table></table>");
        let block = Fixture::new().translate(&first_element(&root));
        let table = table_of(&block);
        assert!(table.table.body.is_empty());
        assert!(table.table.widths.is_empty());
    }

    #[test]
    fn per_table_policies_index_by_processing_order() {
        let (_document, root) = parse_fragment(
            "<table><tr><td>first</td></tr></table>\
             <table><tr><td>second</td></tr></table>\
             <table><tr><td>third</td></tr></table>",
        );
        let fixture = Fixture::new()
            .with_widths(TableWidths::PerTable(vec![
                WidthSpec::Full,
                WidthSpec::Px(100.0),
            ]))
            .with_layouts(TableLayouts::PerTable(vec![TableLayout::NoBorders]));
        let blocks = fixture.translate_all(&root);
        assert_eq!(table_of(&blocks[0]).table.widths, vec![ColumnWidth::Star]);
        assert_eq!(
            table_of(&blocks[1]).table.widths,
            vec![ColumnWidth::Pt(75.0)]
        );
        // past the end of the lists: auto width, default layout
        assert_eq!(table_of(&blocks[2]).table.widths, vec![ColumnWidth::Auto]);
        assert_eq!(
            table_of(&blocks[0]).layout,
            Some(TableLayoutSpec::NoBorders)
        );
        assert_eq!(table_of(&blocks[1]).layout, None);
        assert_eq!(table_of(&blocks[2]).layout, None);
    }

    #[test]
    fn named_layouts_pass_through_to_the_document() {
        let (_document, root) = parse_fragment("<table><tr><td>a</td></tr></table>");
        let fixture =
            Fixture::new().with_layouts(TableLayouts::All(TableLayout::LightHorizontalLines));
        let block = fixture.translate(&first_element(&root));
        assert_eq!(
            table_of(&block).layout,
            Some(TableLayoutSpec::Named("lightHorizontalLines".to_string()))
        );
    }

    #[test]
    fn nested_cell_elements_stack_and_plain_cells_stay_text() {
        let (_document, root) = parse_fragment(
            "<table><tr>\
               <td><p>one</p><p>two</p></td>\
               <td>plain</td>\
               <td></td>\
             </tr></table>",
        );
        let block = Fixture::new().translate(&first_element(&root));
        let row = &table_of(&block).table.body[0];
        match &row[0] {
            Block::Stack(stack) => {
                assert_eq!(stack.stack.len(), 2);
                assert_eq!(text_of(&stack.stack[0]), "one");
            }
            other => panic!("expected stack, got {other:?}"),
        }
        assert_eq!(text_of(&row[1]), "plain");
        // empty plain cells keep the empty string, unlike top-level blocks
        assert_eq!(text_of(&row[2]), "");
    }

    #[test]
    fn cell_styles_are_assigned_from_the_cell_element() {
        let (_document, root) = parse_fragment(
            r#"<table><tr><td style="font-style: italic">x</td></tr></table>"#,
        );
        let block = Fixture::new().translate(&first_element(&root));
        let cell = &table_of(&block).table.body[0][0];
        assert_eq!(cell.style().italics, Some(true));
    }

    #[test]
    fn default_layout_normalizes_every_cell_border() {
        let (_document, root) =
            parse_fragment("<table><tr><th>h</th></tr><tr><td>d</td></tr></table>");
        let table = first_element(&root);
        Fixture::new().translate(&table);
        let style_of = |node: &NodeRef| {
            node.as_element()
                .expect("element")
                .attributes
                .borrow()
                .get("style")
                .unwrap_or("")
                .to_string()
        };
        assert!(style_of(&table).contains("border-collapse: collapse"));
        for row in table_rows(&table) {
            for cell in row_cells(&row) {
                assert!(style_of(&cell).contains("border: 1px solid black"));
            }
        }
    }

    #[test]
    fn header_line_only_keeps_one_bottom_border() {
        let (_document, root) = parse_fragment(
            r#"<table>
                 <tr><th style="border: 2px dashed red">h</th></tr>
                 <tr><td>d</td></tr>
               </table>"#,
        );
        let table = first_element(&root);
        apply_table_css(&table, WidthSpec::Auto, &TableLayout::HeaderLineOnly, 1);
        let rows = table_rows(&table);
        let header_style = row_cells(&rows[0])[0]
            .as_element()
            .expect("th")
            .attributes
            .borrow()
            .get("style")
            .unwrap_or("")
            .to_string();
        assert!(header_style.contains("border: 0px none black"));
        assert!(header_style.contains("border-bottom: 1px solid black"));
        assert!(!header_style.contains("dashed"));
        let data_style = row_cells(&rows[1])[0]
            .as_element()
            .expect("td")
            .attributes
            .borrow()
            .get("style")
            .unwrap_or("")
            .to_string();
        assert!(data_style.contains("border: 0px none black"));
        assert!(!data_style.contains("border-bottom"));
    }

    #[test]
    fn light_horizontal_lines_grey_the_non_header_rows() {
        let (_document, root) = parse_fragment(
            "<table><tr><th>h</th></tr><tr><td>1</td></tr><tr><td>2</td></tr></table>",
        );
        let table = first_element(&root);
        apply_table_css(
            &table,
            WidthSpec::Auto,
            &TableLayout::LightHorizontalLines,
            1,
        );
        let rows = table_rows(&table);
        let style_of = |row: &NodeRef| {
            row_cells(row)[0]
                .as_element()
                .expect("cell")
                .attributes
                .borrow()
                .get("style")
                .unwrap_or("")
                .to_string()
        };
        assert!(style_of(&rows[0]).contains("border-bottom: 1px solid black"));
        assert!(style_of(&rows[1]).contains("border-top: 1px solid lightgrey"));
        assert!(style_of(&rows[2]).contains("border-top: 1px solid lightgrey"));
    }

    #[test]
    fn no_borders_layout_leaves_cell_styling_alone() {
        let (_document, root) = parse_fragment(
            r#"<table><tr><td style="border: 3px solid blue">x</td></tr></table>"#,
        );
        let table = first_element(&root);
        apply_table_css(&table, WidthSpec::Auto, &TableLayout::NoBorders, 0);
        let cell_style = row_cells(&table_rows(&table)[0])[0]
            .as_element()
            .expect("td")
            .attributes
            .borrow()
            .get("style")
            .unwrap_or("")
            .to_string();
        assert!(cell_style.contains("border: 3px solid blue"));
    }

    #[test]
    fn width_normalization_rewrites_table_and_cell_attributes() {
        let (_document, root) = parse_fragment("<table><tr><td>a</td><td>b</td></tr></table>");
        let table = first_element(&root);
        apply_table_css(&table, WidthSpec::Full, &TableLayout::Default, 0);
        assert_eq!(
            table
                .as_element()
                .expect("table")
                .attributes
                .borrow()
                .get("width"),
            Some("100%")
        );

        apply_table_css(&table, WidthSpec::Px(150.0), &TableLayout::Default, 0);
        for cell in row_cells(&table_rows(&table)[0]) {
            assert_eq!(
                cell.as_element().expect("td").attributes.borrow().get("width"),
                Some("150px")
            );
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        let (_document, root) =
            parse_fragment("<table><tr><th>h</th></tr><tr><td>d</td></tr></table>");
        let table = first_element(&root);
        apply_table_css(
            &table,
            WidthSpec::Px(90.0),
            &TableLayout::LightHorizontalLines,
            1,
        );
        let snapshot = table.to_string();
        apply_table_css(
            &table,
            WidthSpec::Px(90.0),
            &TableLayout::LightHorizontalLines,
            1,
        );
        assert_eq!(table.to_string(), snapshot);
    }

    #[test]
    fn images_reencode_through_the_pixel_source() {
        let pixels = image::RgbaImage::from_pixel(10, 4, image::Rgba([9, 9, 9, 255]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(pixels)
            .write_to(&mut bytes, image::ImageFormat::Png)
            .expect("fixture");
        let payload =
            base64::engine::general_purpose::STANDARD.encode(bytes.into_inner());
        let (_document, root) = parse_fragment(&format!(
            r#"<img src="data:image/png;base64,{payload}" width="8" height="4">"#
        ));
        let block = Fixture::new().translate(&first_element(&root));
        match block {
            Block::Image(image) => {
                assert!(image.image.starts_with("data:image/png;base64,"));
                assert_eq!(image.width, 6.0, "8px at 0.75pt/px");
            }
            other => panic!("expected image block, got {other:?}"),
        }
    }

    #[test]
    fn table_layout_parse_is_case_insensitive() {
        assert_eq!(TableLayout::parse("NoBorders"), TableLayout::NoBorders);
        assert_eq!(TableLayout::parse("DEFAULT"), TableLayout::Default);
        assert_eq!(
            TableLayout::parse("zebraStripes"),
            TableLayout::Custom("zebraStripes".to_string())
        );
        assert_eq!(
            TableLayout::Custom("zebraStripes".to_string()).doc_layout(),
            Some(TableLayoutSpec::Named("zebraStripes".to_string()))
        );
        assert_eq!(WidthSpec::parse("FULL"), WidthSpec::Full);
        assert_eq!(WidthSpec::parse("anything"), WidthSpec::Auto);
    }
}
