use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::detect::{Detection, DetectionBatch};
use crate::geometry::{ScreenRect, Viewport};
use crate::overlay::canvas::{Canvas, Color, TextExtent, TextStyle};
use crate::wire::WireDetection;

/// Paint settings for boxes and label badges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayStyle {
    pub box_color: Color,
    pub stroke_width: f32,
    pub badge_color: Color,
    pub text_color: Color,
    pub font_size: f32,
    /// Horizontal text inset inside the badge.
    pub badge_padding_x: f32,
    /// Vertical text inset inside the badge.
    pub badge_padding_y: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            box_color: Color::GREEN,
            stroke_width: 3.0,
            badge_color: Color::BLACK.with_alpha(0.7),
            text_color: Color::WHITE,
            font_size: 16.0,
            badge_padding_x: 4.0,
            badge_padding_y: 2.0,
        }
    }
}

impl OverlayStyle {
    pub fn text_style(&self) -> TextStyle {
        TextStyle {
            font_size: self.font_size,
            color: self.text_color,
        }
    }

    /// Badge placed directly above `bbox`, never above the top of the viewport.
    pub fn badge_rect(&self, bbox: ScreenRect, text: TextExtent) -> ScreenRect {
        ScreenRect::new(
            bbox.left,
            (bbox.top - text.height).max(0.0),
            text.width + 2.0 * self.badge_padding_x,
            text.height + 2.0 * self.badge_padding_y,
        )
    }
}

#[derive(Debug)]
enum OverlayUpdate {
    Replace(DetectionBatch),
    Clear,
}

/// Single-slot handoff between producers and the render context. Holds at
/// most one pending update; a newer one overwrites it.
type Mailbox = Mutex<Option<OverlayUpdate>>;

fn lock(mailbox: &Mailbox) -> MutexGuard<'_, Option<OverlayUpdate>> {
    mailbox.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Create a connected producer handle and render-side overlay.
pub fn channel(style: OverlayStyle) -> (OverlayHandle, OverlayRenderer) {
    let mailbox = Arc::new(Mutex::new(None));
    (
        OverlayHandle {
            mailbox: Arc::downgrade(&mailbox),
        },
        OverlayRenderer {
            mailbox,
            batch: DetectionBatch::empty(),
            style,
            redraw_pending: false,
        },
    )
}

/// Producer-side handle. Cheap to clone and safe to use from any thread.
///
/// Every call only overwrites the pending replacement; painting happens on
/// the render context when it next polls.
#[derive(Clone, Debug)]
pub struct OverlayHandle {
    mailbox: Weak<Mailbox>,
}

impl OverlayHandle {
    /// Replace the displayed batch.
    pub fn update(&self, batch: DetectionBatch) {
        self.send(OverlayUpdate::Replace(batch));
    }

    /// Replace the displayed batch from boundary records.
    ///
    /// Records that fail validation are skipped and logged.
    pub fn update_detections(&self, records: &[WireDetection]) {
        self.update(DetectionBatch::from_wire(records));
    }

    /// Remove all boxes.
    pub fn clear(&self) {
        self.send(OverlayUpdate::Clear);
    }

    fn send(&self, update: OverlayUpdate) {
        match self.mailbox.upgrade() {
            Some(mailbox) => {
                *lock(&mailbox) = Some(update);
            }
            None => log::debug!("overlay: renderer dropped, update discarded"),
        }
    }
}

/// Render-side overlay state.
///
/// Holds the latest batch only. Painting is a pure function of that batch
/// and the viewport.
#[derive(Debug)]
pub struct OverlayRenderer {
    mailbox: Arc<Mailbox>,
    batch: DetectionBatch,
    style: OverlayStyle,
    redraw_pending: bool,
}

impl OverlayRenderer {
    /// Apply the pending update, if any. Never waits on producers beyond the
    /// slot lock.
    ///
    /// Returns true when a redraw is due, and resets that request.
    pub fn poll(&mut self) -> bool {
        let latest = lock(&self.mailbox).take();
        match latest {
            Some(OverlayUpdate::Replace(batch)) => self.update(batch),
            Some(OverlayUpdate::Clear) => self.clear(),
            None => {}
        }
        std::mem::take(&mut self.redraw_pending)
    }

    /// Replace the held batch from the render context.
    pub fn update(&mut self, batch: DetectionBatch) {
        self.batch = batch;
        self.redraw_pending = true;
    }

    pub fn clear(&mut self) {
        self.batch = DetectionBatch::empty();
        self.redraw_pending = true;
    }

    pub fn needs_redraw(&self) -> bool {
        self.redraw_pending
    }

    pub fn batch(&self) -> &DetectionBatch {
        &self.batch
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Screen rectangles of the held detections, in batch order.
    pub fn screen_rects(&self, viewport: Viewport) -> Vec<ScreenRect> {
        self.batch
            .iter()
            .map(|det| det.rect().to_screen(viewport))
            .collect()
    }

    /// Clear the canvas and draw every detection in batch order.
    pub fn paint<C: Canvas + ?Sized>(&self, viewport: Viewport, canvas: &mut C) {
        canvas.clear(viewport);
        let text_style = self.style.text_style();
        for detection in &self.batch {
            self.paint_detection(detection, viewport, &text_style, canvas);
        }
    }

    fn paint_detection<C: Canvas + ?Sized>(
        &self,
        detection: &Detection,
        viewport: Viewport,
        text_style: &TextStyle,
        canvas: &mut C,
    ) {
        let bbox = detection.rect().to_screen(viewport);
        canvas.stroke_rect(bbox, self.style.box_color, self.style.stroke_width);

        let text = detection.badge_text();
        let extent = canvas.measure_text(&text, text_style);
        let badge = self.style.badge_rect(bbox, extent);
        canvas.fill_rect(badge, self.style.badge_color);
        canvas.draw_text(
            &text,
            badge.inset(self.style.badge_padding_x, self.style.badge_padding_y),
            text_style,
        );
    }
}
