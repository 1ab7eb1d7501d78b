//! galley translates a rendered HTML subtree into a pdfmake-style document
//! definition: a `content` list of text, table and image blocks plus page
//! size and margins, ready to hand to an external PDF renderer.
//!
//! The engine waits for every tracked image to decode, walks the root's
//! children through tag dispatch, maps computed CSS onto block style keys
//! and normalizes the live table styling so the on-screen preview matches
//! the eventual PDF. Rendering itself is a black box behind [`DocRenderer`].

mod debug;
mod error;
mod gate;
mod html;
mod image;
mod model;
mod style;
mod units;

pub use error::GalleyError;
pub use gate::{CancelToken, ImageGate, LoadHandle};
pub use html::{TableLayout, TableLayouts, TableWidths, WidthSpec, apply_table_css};
pub use image::{EagerPixels, PixelSource, Raster};
pub use model::{
    Block, ColumnWidth, DocDefinition, ImageBlock, PageSize, StackBlock, StyleSet, TableBlock,
    TableBody, TableLayoutSpec, TextBlock,
};
pub use style::{InlineStyles, Mapping, StyleEngine, StyleKey, StyleSource, StyleValue};
pub use units::{CM_TO_PT, PT_TO_CM, PT_TO_PX, PX_TO_PT};

use crate::debug::DebugLogger;
use crate::html::TranslatePass;
use kuchiki::NodeRef;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Failure raised by the external renderer, passed through for the caller.
pub type RenderError = Box<dyn std::error::Error + Send + Sync>;

/// The external PDF renderer: accepts a finished document definition and
/// performs exactly these three operations.
pub trait DocRenderer {
    fn print(&self, doc: &DocDefinition) -> Result<(), RenderError>;
    /// `filename` of `None` defers to the renderer's own default name.
    fn download(&self, doc: &DocDefinition, filename: Option<&str>) -> Result<(), RenderError>;
    fn open(&self, doc: &DocDefinition) -> Result<(), RenderError>;
}

/// Starts the load of one discovered image and clears its gate flag once
/// the pixels are ready.
pub trait ImageLoader {
    fn begin(&self, img: &NodeRef, handle: LoadHandle);
}

/// Bundled loader for sources the pixel source reads synchronously: the
/// pixels are already present, so the flag clears at registration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateLoader;

impl ImageLoader for ImmediateLoader {
    fn begin(&self, _img: &NodeRef, handle: LoadHandle) {
        handle.mark_loaded();
    }
}

/// The translation engine. Configured through [`GalleyBuilder`]; caches the
/// document after the first successful build until [`Galley::rebuild`].
pub struct Galley {
    page_size: PageSize,
    page_margins_cm: [f32; 4],
    table_widths: TableWidths,
    table_layouts: TableLayouts,
    poll_interval: Duration,
    gate_deadline: Duration,
    styles: StyleEngine,
    style_source: Arc<dyn StyleSource>,
    pixels: Arc<dyn PixelSource>,
    loader: Arc<dyn ImageLoader>,
    debug: Option<DebugLogger>,
    cancel: CancelToken,
    built: Option<DocDefinition>,
}

impl Galley {
    pub fn builder() -> GalleyBuilder {
        GalleyBuilder::default()
    }

    /// Token that aborts a pending image-gate wait from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// CSS class the embedding preview puts on the page container.
    pub fn page_size_class(&self) -> &'static str {
        self.page_size.css_class()
    }

    /// The configured margins as a CSS padding string, e.g.
    /// `"2.54cm 2.54cm 2.54cm 2.54cm"`.
    pub fn page_padding(&self) -> String {
        self.page_margins_cm
            .iter()
            .map(|cm| format!("{cm}cm"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The cached document from the last successful build, if any.
    pub fn document(&self) -> Option<&DocDefinition> {
        self.built.as_ref()
    }

    /// Drop the cached document and any pending cancellation so the next
    /// call translates afresh.
    pub fn rebuild(&mut self) {
        self.built = None;
        self.cancel = CancelToken::new();
    }

    /// Translate `root` unless a document was already built, and return it.
    pub fn build_document(&mut self, root: &NodeRef) -> Result<&DocDefinition, GalleyError> {
        self.ensure_built(root)?;
        self.built_doc()
    }

    pub fn print(&mut self, root: &NodeRef, renderer: &dyn DocRenderer) -> Result<(), GalleyError> {
        self.ensure_built(root)?;
        let doc = self.built_doc()?;
        renderer.print(doc).map_err(GalleyError::Renderer)
    }

    pub fn download(
        &mut self,
        root: &NodeRef,
        renderer: &dyn DocRenderer,
        filename: Option<&str>,
    ) -> Result<(), GalleyError> {
        self.ensure_built(root)?;
        let doc = self.built_doc()?;
        renderer.download(doc, filename).map_err(GalleyError::Renderer)
    }

    pub fn open(&mut self, root: &NodeRef, renderer: &dyn DocRenderer) -> Result<(), GalleyError> {
        self.ensure_built(root)?;
        let doc = self.built_doc()?;
        renderer.open(doc).map_err(GalleyError::Renderer)
    }

    fn ensure_built(&mut self, root: &NodeRef) -> Result<(), GalleyError> {
        if self.built.is_some() {
            return Ok(());
        }
        let doc = self.translate(root)?;
        self.built = Some(doc);
        Ok(())
    }

    fn built_doc(&self) -> Result<&DocDefinition, GalleyError> {
        self.built.as_ref().ok_or_else(|| {
            GalleyError::InvalidConfiguration("no document has been built".to_string())
        })
    }

    /// One full translation pass: register and await images, then walk the
    /// root's child elements into blocks.
    fn translate(&self, root: &NodeRef) -> Result<DocDefinition, GalleyError> {
        let mut gate = ImageGate::new();
        let tracked = gate.prepare(root, |img, handle| self.loader.begin(img, handle));
        if let Some(debug) = &self.debug {
            debug.increment("gate.registered", tracked as u64);
        }
        gate.wait_settled(self.poll_interval, self.gate_deadline, &self.cancel)?;

        let mut pass = TranslatePass::new(
            &self.styles,
            self.style_source.as_ref(),
            self.pixels.as_ref(),
            &self.table_widths,
            &self.table_layouts,
            self.debug.as_ref(),
        );
        let mut content = Vec::new();
        for child in root.children() {
            if child.as_element().is_none() {
                continue;
            }
            content.push(pass.build_block(&child)?);
        }

        let mut page_margins = [0.0f32; 4];
        for (slot, cm) in page_margins.iter_mut().zip(self.page_margins_cm.iter()) {
            *slot = cm * CM_TO_PT;
        }
        let doc = DocDefinition {
            content,
            page_size: self.page_size,
            page_margins,
        };
        if let Some(debug) = &self.debug {
            debug.event("build.done", &format!("{} blocks", doc.content.len()));
            debug.emit_summary("translate");
            debug.flush();
        }
        Ok(doc)
    }
}

/// Builder for [`Galley`]. Defaults: A4 pages, 2.54cm margins all around,
/// auto table widths, default table layouts, inline-attribute styles and
/// synchronous image loading.
pub struct GalleyBuilder {
    page_size: PageSize,
    page_margins_cm: [f32; 4],
    table_widths: TableWidths,
    table_layouts: TableLayouts,
    poll_interval: Duration,
    gate_deadline: Duration,
    style_source: Arc<dyn StyleSource>,
    pixels: Arc<dyn PixelSource>,
    loader: Arc<dyn ImageLoader>,
    debug_path: Option<PathBuf>,
}

impl Default for GalleyBuilder {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            page_margins_cm: [2.54; 4],
            table_widths: TableWidths::default(),
            table_layouts: TableLayouts::default(),
            poll_interval: Duration::from_millis(50),
            gate_deadline: Duration::from_secs(10),
            style_source: Arc::new(InlineStyles),
            pixels: Arc::new(EagerPixels::new()),
            loader: Arc::new(ImmediateLoader),
            debug_path: None,
        }
    }
}

impl GalleyBuilder {
    pub fn page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Margins in centimeters, top/right/bottom/left.
    pub fn page_margins_cm(mut self, margins: [f32; 4]) -> Self {
        self.page_margins_cm = margins;
        self
    }

    pub fn table_widths(mut self, widths: TableWidths) -> Self {
        self.table_widths = widths;
        self
    }

    pub fn table_layouts(mut self, layouts: TableLayouts) -> Self {
        self.table_layouts = layouts;
        self
    }

    /// Cadence of the image-gate poll loop.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Watchdog for loads that never signal; expiry fails the pass instead
    /// of polling forever.
    pub fn gate_deadline(mut self, deadline: Duration) -> Self {
        self.gate_deadline = deadline;
        self
    }

    pub fn style_source(mut self, source: Arc<dyn StyleSource>) -> Self {
        self.style_source = source;
        self
    }

    pub fn pixel_source(mut self, pixels: Arc<dyn PixelSource>) -> Self {
        self.pixels = pixels;
        self
    }

    pub fn image_loader(mut self, loader: Arc<dyn ImageLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Write JSON-lines diagnostics for every pass to `path`.
    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<Galley, GalleyError> {
        for margin in self.page_margins_cm {
            if !margin.is_finite() || margin < 0.0 {
                return Err(GalleyError::InvalidConfiguration(format!(
                    "page margin {margin} must be a non-negative number of centimeters"
                )));
            }
        }
        if self.poll_interval.is_zero() {
            return Err(GalleyError::InvalidConfiguration(
                "poll interval must be positive".to_string(),
            ));
        }
        if self.gate_deadline < self.poll_interval {
            return Err(GalleyError::InvalidConfiguration(
                "gate deadline must cover at least one poll interval".to_string(),
            ));
        }
        let debug = match &self.debug_path {
            Some(path) => Some(DebugLogger::new(path)?),
            None => None,
        };
        Ok(Galley {
            page_size: self.page_size,
            page_margins_cm: self.page_margins_cm,
            table_widths: self.table_widths,
            table_layouts: self.table_layouts,
            poll_interval: self.poll_interval,
            gate_deadline: self.gate_deadline,
            styles: StyleEngine::new(),
            style_source: self.style_source,
            pixels: self.pixels,
            loader: self.loader,
            debug,
            cancel: CancelToken::new(),
            built: None,
        })
    }
}
