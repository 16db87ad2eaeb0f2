//! Detection overlay and hit testing.
//!
//! Boxes are laid out in the displayed image's own pixel space; the overlay
//! canvas has the image's dimensions and no scaling is applied. Render order
//! is detection order, so later detections sit on top and win hit tests where
//! boxes overlap.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::detect::{BoundingBox, Color, Detection};

pub const SELECTED_STROKE: u32 = 3;
pub const UNSELECTED_STROKE: u32 = 2;

/// One rendered box.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayRect<'a> {
    pub detection: &'a Detection,
    pub selected: bool,
    pub stroke_width: u32,
}

impl OverlayRect<'_> {
    pub fn bbox(&self) -> &BoundingBox {
        &self.detection.bbox
    }

    pub fn color(&self) -> Color {
        self.detection.color
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Overlay<'a> {
    detections: &'a [Detection],
    selected_id: Option<&'a str>,
}

impl<'a> Overlay<'a> {
    pub fn new(detections: &'a [Detection], selected_id: Option<&'a str>) -> Self {
        Self {
            detections,
            selected_id,
        }
    }

    /// Boxes in render order.
    pub fn rects(&self) -> Vec<OverlayRect<'a>> {
        self.detections
            .iter()
            .map(|detection| {
                let selected = self.selected_id == Some(detection.id.as_str());
                OverlayRect {
                    detection,
                    selected,
                    stroke_width: if selected {
                        SELECTED_STROKE
                    } else {
                        UNSELECTED_STROKE
                    },
                }
            })
            .collect()
    }

    /// Topmost detection under the point, if any.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<&'a Detection> {
        self.detections
            .iter()
            .rev()
            .find(|detection| detection.bbox.contains(x, y))
    }

    /// Resolves a tap and hands the hit detection to `on_select`. Returns
    /// whether anything was hit.
    pub fn tap<F>(&self, x: f64, y: f64, on_select: F) -> bool
    where
        F: FnOnce(&'a Detection),
    {
        match self.hit_test(x, y) {
            Some(detection) => {
                on_select(detection);
                true
            }
            None => false,
        }
    }

    /// Rasterizes the boxes onto `image`. Parts outside the image are clipped.
    pub fn draw(&self, image: &mut RgbImage) {
        for rect in self.rects() {
            draw_box(image, rect.bbox(), Rgb(rect.color().to_rgb()), rect.stroke_width);
        }
    }
}

fn draw_box(image: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>, stroke_width: u32) {
    // Clamp to the canvas plus one stroke of margin: edges past the canvas
    // stay invisible, and nothing handed to imageproc can overflow.
    let margin = f64::from(stroke_width);
    let canvas_w = f64::from(image.width());
    let canvas_h = f64::from(image.height());
    let left = bbox.x.round().clamp(-margin, canvas_w + margin);
    let top = bbox.y.round().clamp(-margin, canvas_h + margin);
    let right = bbox.right().round().clamp(-margin, canvas_w + margin).max(left + 1.0);
    let bottom = bbox.bottom().round().clamp(-margin, canvas_h + margin).max(top + 1.0);
    if !(left < canvas_w && top < canvas_h && right > 0.0 && bottom > 0.0) {
        return;
    }

    let x = left as i32;
    let y = top as i32;
    let width = (right - left) as u32;
    let height = (bottom - top) as u32;

    // Stroke grows inward so the outer edge stays on the box boundary.
    for inset in 0..stroke_width {
        let inner_w = width.saturating_sub(2 * inset);
        let inner_h = height.saturating_sub(2 * inset);
        if inner_w == 0 || inner_h == 0 {
            break;
        }
        let rect = Rect::at(x + inset as i32, y + inset as i32).of_size(inner_w, inner_h);
        draw_hollow_rect_mut(image, rect, color);
    }
}
