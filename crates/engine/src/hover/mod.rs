// Pointer-driven accept/reject popup over suggestion spans.
//
// Two states: hidden, or visible over one annotation instance. Gaps between
// adjacent spans and the trip from a span into the popup are bridged by a
// debounced hide. Any document change while visible hides immediately. The
// read accessors take the document and compare its revision, so a popup
// placed against an older revision is never reported as visible, even
// before the host forwards the change.

pub mod timer;

use std::time::{Duration, Instant};

use redline_common::types::AnnotationKind;
use tracing::trace;
use uuid::Uuid;

use crate::document::spans::span_at;
use crate::document::{DocumentModel, ScreenCoords, ScreenPoint};

use self::timer::{DelayedTask, TaskToken};

const DEFAULT_HIDE_DELAY_MS: u64 = 200;
const MIN_HIDE_DELAY_MS: u64 = 50;
const MAX_HIDE_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct HoverConfig {
    pub hide_delay: Duration,
    /// Distance of the popup above the span's leading edge. Where that would
    /// leave the viewport, the popup sits this far below the edge instead.
    pub popup_offset_y: f32,
    pub popup_width: f32,
    pub popup_height: f32,
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            hide_delay: Duration::from_millis(DEFAULT_HIDE_DELAY_MS),
            popup_offset_y: 40.0,
            popup_width: 160.0,
            popup_height: 32.0,
        }
    }
}

impl HoverConfig {
    /// Default config with the hide delay clamped to [50, 1000] ms.
    pub fn with_hide_delay_millis(ms: u64) -> Self {
        let clamped = ms.clamp(MIN_HIDE_DELAY_MS, MAX_HIDE_DELAY_MS);
        Self { hide_delay: Duration::from_millis(clamped), ..Self::default() }
    }
}

/// Screen rectangle occupied by the popup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopupRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl PopupRect {
    pub fn contains(&self, point: ScreenPoint) -> bool {
        point.x >= self.left
            && point.x <= self.left + self.width
            && point.y >= self.top
            && point.y <= self.top + self.height
    }
}

/// Snapshot of the controller for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverState {
    pub visible: bool,
    pub screen_position: Option<ScreenCoords>,
    pub span_from: Option<u32>,
    pub span_to: Option<u32>,
    pub annotation_kind: Option<AnnotationKind>,
    pub pending_hide_token: Option<TaskToken>,
}

#[derive(Debug, Clone)]
struct ShownSpan {
    annotation_id: Uuid,
    kind: AnnotationKind,
    from: u32,
    to: u32,
    position: ScreenCoords,
    revision: u64,
}

#[derive(Debug)]
pub struct HoverController {
    config: HoverConfig,
    shown: Option<ShownSpan>,
    hide_task: DelayedTask,
}

impl HoverController {
    pub fn new(config: HoverConfig) -> Self {
        Self { config, shown: None, hide_task: DelayedTask::new() }
    }

    pub fn config(&self) -> &HoverConfig {
        &self.config
    }

    pub fn state<D>(&self, doc: &D) -> HoverState
    where
        D: DocumentModel + ?Sized,
    {
        match self.current(doc) {
            Some(shown) => HoverState {
                visible: true,
                screen_position: Some(shown.position),
                span_from: Some(shown.from),
                span_to: Some(shown.to),
                annotation_kind: Some(shown.kind),
                pending_hide_token: self.hide_task.pending_token(),
            },
            None => HoverState {
                visible: false,
                screen_position: None,
                span_from: None,
                span_to: None,
                annotation_kind: None,
                pending_hide_token: None,
            },
        }
    }

    pub fn is_visible<D>(&self, doc: &D) -> bool
    where
        D: DocumentModel + ?Sized,
    {
        self.current(doc).is_some()
    }

    /// Annotation instance the popup is bound to, for the accept/reject actions.
    /// Resolution re-finds the span by id, so a stale id fails cleanly there.
    pub fn shown_annotation(&self) -> Option<Uuid> {
        self.shown.as_ref().map(|shown| shown.annotation_id)
    }

    pub fn popup_rect<D>(&self, doc: &D) -> Option<PopupRect>
    where
        D: DocumentModel + ?Sized,
    {
        self.current(doc).map(|shown| self.rect_of(shown))
    }

    /// Deadline of the pending hide, for hosts that sleep until the next tick.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.hide_task.deadline()
    }

    pub fn on_pointer_move<D>(&mut self, doc: &D, point: ScreenPoint, now: Instant)
    where
        D: DocumentModel + ?Sized,
    {
        self.sync_revision(doc);

        if self.shown.as_ref().is_some_and(|shown| self.rect_of(shown).contains(point)) {
            self.on_popup_hover();
            return;
        }

        let span = doc.position_at_coords(point).and_then(|pos| span_at(&doc.text_runs(), pos));
        let Some(span) = span else {
            self.schedule_hide(now);
            return;
        };

        if self.shown_annotation() == Some(span.id()) {
            self.hide_task.cancel();
            return;
        }

        let Some(edge) = doc.coords_at_position(span.from()) else {
            self.schedule_hide(now);
            return;
        };

        self.hide_task.cancel();
        let position = self.place_popup(edge);
        trace!(annotation_id = %span.id(), from = span.from(), to = span.to(), "showing popup");
        self.shown = Some(ShownSpan {
            annotation_id: span.id(),
            kind: span.kind(),
            from: span.from(),
            to: span.to(),
            position,
            revision: doc.revision(),
        });
    }

    pub fn on_popup_hover(&mut self) {
        self.hide_task.cancel();
    }

    /// Pointer left the document surface.
    pub fn on_pointer_leave(&mut self, now: Instant, into_popup: bool) {
        if into_popup {
            self.hide_task.cancel();
        } else {
            self.schedule_hide(now);
        }
    }

    pub fn on_document_changed(&mut self) {
        self.hide();
    }

    /// Run the pending hide if it is due. Returns whether the popup was hidden.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.hide_task.fire_due_at(now).is_none() {
            return false;
        }
        trace!("hide delay elapsed");
        self.shown.take().is_some()
    }

    /// Hide immediately and drop any pending hide.
    pub fn hide(&mut self) {
        self.hide_task.cancel();
        self.shown = None;
    }

    /// Hide if the document moved on since the popup was placed.
    pub fn sync_revision<D>(&mut self, doc: &D) -> bool
    where
        D: DocumentModel + ?Sized,
    {
        let stale = self.shown.as_ref().is_some_and(|shown| shown.revision != doc.revision());
        if stale {
            trace!("document revision changed; hiding popup");
            self.hide();
        }
        stale
    }

    fn current<D>(&self, doc: &D) -> Option<&ShownSpan>
    where
        D: DocumentModel + ?Sized,
    {
        self.shown.as_ref().filter(|shown| shown.revision == doc.revision())
    }

    fn rect_of(&self, shown: &ShownSpan) -> PopupRect {
        PopupRect {
            left: shown.position.left,
            top: shown.position.top,
            width: self.config.popup_width,
            height: self.config.popup_height,
        }
    }

    fn place_popup(&self, edge: ScreenCoords) -> ScreenCoords {
        let above = edge.top - self.config.popup_offset_y;
        let top = if above >= 0.0 { above } else { edge.top + self.config.popup_offset_y };
        ScreenCoords { top, left: edge.left }
    }

    fn schedule_hide(&mut self, now: Instant) {
        if self.shown.is_some() && !self.hide_task.is_pending() {
            self.hide_task.schedule_at(now, self.config.hide_delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ydoc::YrsDocument;

    // ── HoverConfig ────────────────────────────────────────────────

    #[test]
    fn default_config_is_200ms() {
        assert_eq!(HoverConfig::default().hide_delay, Duration::from_millis(200));
    }

    #[test]
    fn config_clamps_hide_delay() {
        assert_eq!(HoverConfig::with_hide_delay_millis(1).hide_delay, Duration::from_millis(50));
        assert_eq!(
            HoverConfig::with_hide_delay_millis(5000).hide_delay,
            Duration::from_millis(1000)
        );
        assert_eq!(HoverConfig::with_hide_delay_millis(300).hide_delay, Duration::from_millis(300));
    }

    // ── PopupRect ──────────────────────────────────────────────────

    #[test]
    fn popup_rect_contains_its_edges() {
        let rect = PopupRect { left: 10.0, top: 20.0, width: 100.0, height: 30.0 };
        assert!(rect.contains(ScreenPoint::new(10.0, 20.0)));
        assert!(rect.contains(ScreenPoint::new(110.0, 50.0)));
        assert!(!rect.contains(ScreenPoint::new(111.0, 30.0)));
        assert!(!rect.contains(ScreenPoint::new(50.0, 19.0)));
    }

    #[test]
    fn hidden_state_is_empty() {
        let doc = YrsDocument::new();
        let controller = HoverController::new(HoverConfig::default());
        let state = controller.state(&doc);
        assert!(!state.visible);
        assert!(state.screen_position.is_none());
        assert!(state.pending_hide_token.is_none());
        assert!(controller.popup_rect(&doc).is_none());
    }

    // ── Placement ──────────────────────────────────────────────────

    #[test]
    fn popup_sits_above_when_there_is_room() {
        let controller = HoverController::new(HoverConfig::default());
        let placed = controller.place_popup(ScreenCoords { top: 60.0, left: 8.0 });
        assert_eq!(placed, ScreenCoords { top: 20.0, left: 8.0 });
        let flush = controller.place_popup(ScreenCoords { top: 40.0, left: 0.0 });
        assert_eq!(flush.top, 0.0);
    }

    #[test]
    fn popup_flips_below_near_viewport_top() {
        let controller = HoverController::new(HoverConfig::default());
        let placed = controller.place_popup(ScreenCoords { top: 20.0, left: 16.0 });
        assert_eq!(placed, ScreenCoords { top: 60.0, left: 16.0 });
    }

    #[test]
    fn leave_and_tick_while_hidden_do_nothing() {
        let mut controller = HoverController::new(HoverConfig::default());
        let now = Instant::now();
        controller.on_pointer_leave(now, false);
        assert!(controller.next_deadline().is_none());
        assert!(!controller.tick(now + Duration::from_secs(1)));
    }
}
