//! Image-load gate: defers document construction until every tracked image
//! has decoded.
//!
//! Discovery registers one flag per `<img>` found among the root's direct
//! children and inside the cells of direct `<table>` children. Whoever
//! performs the actual load clears its flag through a [`LoadHandle`];
//! completion order is theirs, not discovery order. The gate settles once
//! every flag is cleared, and a fresh gate with nothing tracked is settled
//! from the start.

use crate::error::GalleyError;
use crate::html::{element_children, row_cells, table_rows, tag_name};
use kuchiki::NodeRef;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Clears one tracked image's loading flag. Cheap to clone and safe to
/// trigger from another thread.
#[derive(Debug, Clone)]
pub struct LoadHandle {
    loading: Arc<AtomicBool>,
}

impl LoadHandle {
    pub fn mark_loaded(&self) {
        self.loading.store(false, Ordering::Release);
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }
}

/// Cooperative cancellation for a pending wait.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Per-pass tracker of in-flight image loads. Created fresh for every
/// translation pass and discarded once the gate opens.
#[derive(Debug, Default)]
pub struct ImageGate {
    flags: Vec<Arc<AtomicBool>>,
}

impl ImageGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `root` for images to track and hand each one's [`LoadHandle`] to
    /// `on_register`, which is responsible for starting the load. Returns
    /// the number of tracked images.
    pub fn prepare<F>(&mut self, root: &NodeRef, mut on_register: F) -> usize
    where
        F: FnMut(&NodeRef, LoadHandle),
    {
        let before = self.flags.len();
        for child in root.children() {
            match tag_name(&child).as_deref() {
                Some("img") => {
                    let handle = self.register();
                    on_register(&child, handle);
                }
                Some("table") => {
                    for row in table_rows(&child) {
                        for cell in row_cells(&row) {
                            for nested in element_children(&cell) {
                                if tag_name(&nested).as_deref() == Some("img") {
                                    let handle = self.register();
                                    on_register(&nested, handle);
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        self.flags.len() - before
    }

    /// Track one more image, initially loading.
    pub fn register(&mut self) -> LoadHandle {
        let flag = Arc::new(AtomicBool::new(true));
        self.flags.push(flag.clone());
        LoadHandle { loading: flag }
    }

    pub fn tracked(&self) -> usize {
        self.flags.len()
    }

    pub fn is_settled(&self) -> bool {
        self.flags.iter().all(|flag| !flag.load(Ordering::Acquire))
    }

    /// Bounded-interval poll until settled. Image completion is an external
    /// event, so the loop re-checks on a fixed cadence instead of blocking;
    /// `deadline` turns a load that never signals into [`GalleyError::GateTimeout`]
    /// and `cancel` aborts an abandoned pass with [`GalleyError::Cancelled`].
    pub fn wait_settled(
        &self,
        interval: Duration,
        deadline: Duration,
        cancel: &CancelToken,
    ) -> Result<(), GalleyError> {
        let started = Instant::now();
        loop {
            if self.is_settled() {
                return Ok(());
            }
            if cancel.is_cancelled() {
                return Err(GalleyError::Cancelled);
            }
            let waited = started.elapsed();
            if waited >= deadline {
                return Err(GalleyError::GateTimeout {
                    waited_ms: waited.as_millis() as u64,
                });
            }
            std::thread::sleep(interval.min(deadline - waited));
        }
    }
}
