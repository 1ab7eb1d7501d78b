//! Conversion factors between CSS pixels, PDF points and centimeters.
//!
//! CSS rendering assumes 96 pixels per inch; PDF space is 72 points per
//! inch, so one pixel is 0.75pt.

pub const PX_TO_PT: f32 = 0.75;
pub const PT_TO_PX: f32 = 1.0 / 0.75;
pub const CM_TO_PT: f32 = 28.3465;
pub const PT_TO_CM: f32 = 1.0 / 28.3465;
