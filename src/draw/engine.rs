use crate::draw::geometry::Point;
use crate::draw::history::DrawHistory;
use crate::draw::hit_test::{
    eraser_radius, erases, find_topmost_at, is_near, GRAB_SELECTED_THRESHOLD, SELECT_THRESHOLD,
};
use crate::draw::input::{
    cursor_for, map_key_event_to_command, Cursor, Gesture, InteractionState, KeyCode, KeyCommand,
    KeyEvent,
};
use crate::draw::messages::{Command, CommandReply};
use crate::draw::model::{Annotation, Color, Tool};
use crate::draw::render::{
    render_frame, render_segment, resolve_page_background, selection_color, Frame, FrameBuffer,
    Surface,
};
use crate::draw::settings::{DrawPreferences, PreferencesPatch, PREFERENCES_KEY};
use crate::draw::settings_store::{SharedStore, StoreChange};
use crate::draw::text_entry::{TextEntry, TextEntryStep, TextEntryState};
use crate::draw::viewport::Viewport;
use std::time::Instant;

/// Annotation state for one document. Every event handler mutates the
/// engine synchronously and repaints the surface before returning.
pub struct DrawEngine<S: Surface = FrameBuffer> {
    history: DrawHistory,
    selected: Option<usize>,
    prefs: DrawPreferences,
    gesture: Option<Gesture>,
    text_entry: Option<TextEntry>,
    viewport: Viewport,
    surface: S,
    highlight: Color,
    store: Option<SharedStore>,
    applied_revision: u64,
}

impl<S: Surface> DrawEngine<S> {
    pub fn new(surface: S, viewport: Viewport) -> Self {
        Self {
            history: DrawHistory::default(),
            selected: None,
            prefs: DrawPreferences::default(),
            gesture: None,
            text_entry: None,
            viewport,
            surface,
            highlight: selection_color(Color::WHITE),
            store: None,
            applied_revision: 0,
        }
    }

    /// Creates the overlay for a page and adopts the stored preferences.
    pub fn attach(surface: S, viewport: Viewport, store: SharedStore) -> Self {
        let mut engine = Self::new(surface, viewport);
        let prefs = store.load_preferences();
        engine.applied_revision = store.revision();
        engine.prefs = DrawPreferences {
            is_enabled: false,
            ..prefs
        };
        engine.store = Some(store);
        if prefs.is_enabled {
            engine.toggle_drawing(true);
        }
        tracing::info!(
            tool = %engine.prefs.current_tool,
            color = %engine.prefs.current_color,
            size = engine.prefs.stroke_size,
            enabled = engine.prefs.is_enabled,
            "draw engine attached"
        );
        engine
    }

    pub fn dispatch(&mut self, command: Command) -> CommandReply {
        tracing::debug!(action = command.action(), "draw command");
        match command {
            Command::ToggleDrawing { enabled } => self.toggle_drawing(enabled),
            Command::SetTool { tool } => self.set_tool(tool),
            Command::SetColor { color } => match color.parse::<Color>() {
                Ok(color) => self.set_color(color),
                Err(err) => tracing::warn!(?err, color = %color, "ignoring unparseable color"),
            },
            Command::SetStrokeSize { size: 0 } => {
                tracing::warn!("ignoring zero stroke size");
            }
            Command::SetStrokeSize { size } => self.set_stroke_size(size),
            Command::Undo => self.undo(),
            Command::Redo => self.redo(),
            Command::Clear => self.clear(),
            Command::GetState => return CommandReply::State(self.state()),
        }
        CommandReply::ack()
    }

    pub fn state(&self) -> DrawPreferences {
        self.prefs
    }

    pub fn is_enabled(&self) -> bool {
        self.prefs.is_enabled
    }

    pub fn committed(&self) -> &[Annotation] {
        self.history.committed()
    }

    pub fn history(&self) -> &DrawHistory {
        &self.history
    }

    pub fn redo_len(&self) -> usize {
        self.history.redo_len()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_annotation(&self) -> Option<&Annotation> {
        self.selected.and_then(|idx| self.history.committed().get(idx))
    }

    pub fn gesture(&self) -> Option<&Gesture> {
        self.gesture.as_ref()
    }

    pub fn text_entry(&self) -> Option<&TextEntry> {
        self.text_entry.as_ref()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn highlight_color(&self) -> Color {
        self.highlight
    }

    pub fn interaction_state(&self) -> InteractionState {
        if !self.prefs.is_enabled {
            return InteractionState::Disabled;
        }
        if self.text_entry.is_some() {
            return InteractionState::TextEditing;
        }
        match self.gesture {
            Some(Gesture::DragSelection { .. }) => InteractionState::DraggingSelection,
            Some(_) => InteractionState::Drawing,
            None => InteractionState::Idle,
        }
    }

    /// `None` while drawing is disabled and the page keeps its own cursor.
    pub fn cursor(&self) -> Option<Cursor> {
        if !self.prefs.is_enabled {
            return None;
        }
        let dragging = matches!(self.gesture, Some(Gesture::DragSelection { .. }));
        Some(cursor_for(
            self.prefs.current_tool,
            dragging,
            self.selected.is_some(),
        ))
    }

    pub fn toggle_drawing(&mut self, enabled: bool) {
        self.prefs.is_enabled = enabled;
        if enabled {
            self.fit_surface();
            self.redraw();
        } else {
            self.gesture = None;
            self.text_entry = None;
            self.deselect();
        }
        tracing::info!(enabled, "drawing toggled");
    }

    /// Switches tools. An open text entry is cancelled and an in-progress
    /// gesture is discarded; leaving the select tool drops the selection.
    pub fn set_tool(&mut self, tool: Tool) {
        self.prefs.current_tool = tool;
        self.text_entry = None;
        let discarded = self.gesture.take().is_some();
        if tool != Tool::Select {
            self.deselect();
        }
        if discarded && self.selected.is_none() {
            self.redraw();
        }
        tracing::debug!(%tool, "tool selected");
    }

    /// Sets the drawing color and recolors the selection, if any.
    pub fn set_color(&mut self, color: Color) {
        self.prefs.current_color = color;
        if let Some(annotation) = self.selected.and_then(|idx| self.history.get_mut(idx)) {
            annotation.set_color(color);
            self.redraw();
        }
    }

    /// Sets the stroke size and resizes the selection, if any.
    pub fn set_stroke_size(&mut self, size: u32) {
        self.prefs.stroke_size = size;
        if let Some(annotation) = self.selected.and_then(|idx| self.history.get_mut(idx)) {
            annotation.set_size(size);
            self.redraw();
        }
    }

    pub fn undo(&mut self) {
        if self.history.undo() {
            self.clear_selection();
            self.redraw();
        }
    }

    pub fn redo(&mut self) {
        if self.history.redo() {
            self.drop_stale_selection();
            self.redraw();
        }
    }

    pub fn clear(&mut self) {
        if self.history.clear() {
            self.clear_selection();
            self.redraw();
            tracing::info!("annotations cleared");
        }
    }

    /// Drops the selection and repaints if there was one.
    pub fn deselect(&mut self) {
        if self.clear_selection() {
            self.redraw();
        }
    }

    /// Forgets the selection along with any drag of it. Returns whether
    /// something was selected.
    fn clear_selection(&mut self) -> bool {
        if matches!(self.gesture, Some(Gesture::DragSelection { .. })) {
            self.gesture = None;
        }
        self.selected.take().is_some()
    }

    fn drop_stale_selection(&mut self) {
        if self
            .selected
            .is_some_and(|idx| idx >= self.history.committed().len())
        {
            self.clear_selection();
        }
    }

    pub fn pointer_down(&mut self, client: Point, now: Instant) {
        if !self.prefs.is_enabled {
            return;
        }
        let point = self.viewport.to_document(client);
        match self.prefs.current_tool {
            Tool::Select => self.begin_selection(point),
            Tool::Eraser => {
                self.gesture = Some(Gesture::Erase { last: point });
                self.erase_at(point);
            }
            Tool::Text => self.open_text_entry(point, now),
            tool => {
                self.gesture = Gesture::begin(
                    tool,
                    self.prefs.current_color,
                    self.prefs.stroke_size,
                    point,
                );
            }
        }
    }

    pub fn pointer_move(&mut self, client: Point) {
        if !self.prefs.is_enabled {
            return;
        }
        let point = self.viewport.to_document(client);
        let Some(gesture) = self.gesture.as_mut() else {
            return;
        };
        match gesture {
            Gesture::Freehand { .. } => {
                let style = gesture.freehand_style();
                let segment = gesture.extend(point);
                if let (Some((kind, color, size)), Some((from, to))) = (style, segment) {
                    render_segment(&mut self.surface, kind, color, size, from, to);
                }
            }
            Gesture::Shape { .. } => {
                gesture.set_current(point);
                self.redraw();
            }
            Gesture::Erase { .. } => {
                gesture.set_current(point);
                self.erase_at(point);
            }
            Gesture::DragSelection { last } => {
                let (dx, dy) = (point.x - last.x, point.y - last.y);
                *last = point;
                if let Some(annotation) = self.selected.and_then(|idx| self.history.get_mut(idx))
                {
                    annotation.translate(dx, dy);
                }
                self.redraw();
            }
        }
    }

    pub fn pointer_up(&mut self, client: Point) {
        if !self.prefs.is_enabled {
            return;
        }
        let point = self.viewport.to_document(client);
        self.finish_gesture(point);
    }

    pub fn pointer_leave(&mut self, client: Point) {
        self.pointer_up(client);
    }

    pub fn touch_start(&mut self, client: Point, now: Instant) {
        self.pointer_down(client, now);
    }

    pub fn touch_move(&mut self, client: Point) {
        self.pointer_move(client);
    }

    /// Touch-end carries no position; the gesture ends at its last point.
    pub fn touch_end(&mut self) {
        if !self.prefs.is_enabled {
            return;
        }
        if let Some(end) = self.gesture.as_ref().map(Gesture::last_point) {
            self.finish_gesture(end);
        }
    }

    fn finish_gesture(&mut self, end: Point) {
        let Some(gesture) = self.gesture.take() else {
            return;
        };
        match gesture {
            Gesture::DragSelection { .. } | Gesture::Erase { .. } => {}
            gesture => {
                if let Some(annotation) = gesture.finish(end) {
                    self.commit(annotation);
                }
            }
        }
    }

    fn commit(&mut self, annotation: Annotation) {
        self.history.commit(annotation);
        self.redraw();
    }

    fn begin_selection(&mut self, point: Point) {
        let grabbed = self
            .selected_annotation()
            .is_some_and(|annotation| is_near(point, annotation, GRAB_SELECTED_THRESHOLD));
        if grabbed {
            self.gesture = Some(Gesture::DragSelection { last: point });
            return;
        }
        let hit = find_topmost_at(point, self.history.committed(), SELECT_THRESHOLD)
            .map(|(idx, _)| idx);
        match hit {
            Some(idx) => {
                self.selected = Some(idx);
                self.gesture = Some(Gesture::DragSelection { last: point });
                self.redraw();
            }
            None => self.deselect(),
        }
    }

    /// Removes every annotation under the eraser. Returns how many went.
    pub fn erase_at(&mut self, point: Point) -> usize {
        let radius = eraser_radius(self.prefs.stroke_size);
        let removed = self
            .history
            .remove_where(|annotation| erases(point, annotation, radius));
        if removed > 0 {
            self.clear_selection();
            self.redraw();
            tracing::debug!(removed, "annotations erased");
        }
        removed
    }

    pub fn delete_selection(&mut self) -> bool {
        let Some(idx) = self.selected else {
            return false;
        };
        self.clear_selection();
        let removed = self.history.remove(idx).is_some();
        self.redraw();
        removed
    }

    fn open_text_entry(&mut self, anchor: Point, now: Instant) {
        // A blur that already captured its text is resolved before the new
        // entry replaces it; an entry still being edited is dropped.
        if let Some(mut previous) = self.text_entry.take() {
            let pending = match previous.state() {
                TextEntryState::Committing { due, .. } => Some(*due),
                _ => None,
            };
            if let Some(due) = pending {
                if let TextEntryStep::Closed(Some(annotation)) = previous.tick(due.max(now)) {
                    self.commit(annotation);
                }
            }
        }
        self.text_entry = Some(TextEntry::open(anchor, now));
    }

    pub fn text_input(&mut self, value: &str) {
        if let Some(entry) = self.text_entry.as_mut() {
            entry.set_value(value);
        }
    }

    pub fn text_blur(&mut self, now: Instant) {
        let (color, size) = (self.prefs.current_color, self.prefs.stroke_size);
        if let Some(entry) = self.text_entry.as_mut() {
            entry.blur(color, size, now);
        }
    }

    pub fn cancel_text_entry(&mut self) {
        if self.text_entry.take().is_some() {
            tracing::debug!("text entry cancelled");
        }
    }

    fn confirm_text_entry(&mut self) {
        let (color, size) = (self.prefs.current_color, self.prefs.stroke_size);
        let Some(entry) = self.text_entry.as_mut() else {
            return;
        };
        if let TextEntryStep::Closed(annotation) = entry.confirm(color, size) {
            self.text_entry = None;
            if let Some(annotation) = annotation {
                self.commit(annotation);
            }
        }
    }

    /// Advances time-based transitions of the text entry.
    pub fn tick(&mut self, now: Instant) {
        let Some(entry) = self.text_entry.as_mut() else {
            return;
        };
        if let TextEntryStep::Closed(annotation) = entry.tick(now) {
            self.text_entry = None;
            if let Some(annotation) = annotation {
                self.commit(annotation);
            }
        }
    }

    /// Returns `true` when the key was consumed by the overlay.
    pub fn key_down(&mut self, event: KeyEvent) -> bool {
        if self.text_entry.is_some() {
            return match event.key {
                KeyCode::Escape => {
                    self.cancel_text_entry();
                    true
                }
                KeyCode::Enter => {
                    self.confirm_text_entry();
                    true
                }
                _ => false,
            };
        }
        if !self.prefs.is_enabled {
            return false;
        }
        let Some(command) = map_key_event_to_command(event, self.selected.is_some()) else {
            return false;
        };
        match command {
            KeyCommand::Undo => self.undo(),
            KeyCommand::Redo => self.redo(),
            KeyCommand::DeleteSelection => {
                self.delete_selection();
            }
            KeyCommand::Escape if self.selected.is_some() => self.deselect(),
            KeyCommand::Escape => {
                self.toggle_drawing(false);
                self.save_preferences();
            }
        }
        true
    }

    fn save_preferences(&self) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        if let Err(err) = store.save_preferences(&self.prefs) {
            tracing::warn!(?err, "failed to save draw preferences");
        }
    }

    /// Applies a shared store write made by another surface. Notifications
    /// older than the last applied one are ignored.
    pub fn store_changed(&mut self, change: &StoreChange) {
        if change.revision <= self.applied_revision {
            tracing::debug!(
                revision = change.revision,
                applied = self.applied_revision,
                "ignoring stale store change"
            );
            return;
        }
        self.applied_revision = change.revision;
        if change.key != PREFERENCES_KEY {
            return;
        }
        let Some(value) = change.new_value.as_ref() else {
            return;
        };
        let patch = PreferencesPatch::from_value(value);
        if let Some(enabled) = patch.is_enabled {
            if enabled != self.prefs.is_enabled {
                self.toggle_drawing(enabled);
            }
        }
        if let Some(tool) = patch.current_tool {
            if tool != self.prefs.current_tool {
                self.set_tool(tool);
            }
        }
        if let Some(color) = patch.current_color {
            self.prefs.current_color = color;
        }
        if let Some(size) = patch.stroke_size {
            self.prefs.stroke_size = size;
        }
    }

    pub fn applied_revision(&self) -> u64 {
        self.applied_revision
    }

    /// The surface follows the page scroll by offset only; no repaint.
    /// Returns the offset the host applies to the surface.
    pub fn scroll(&mut self, scroll_x: f64, scroll_y: f64) -> (f64, f64) {
        self.viewport.scroll_x = scroll_x;
        self.viewport.scroll_y = scroll_y;
        self.viewport.surface_offset()
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        if self.prefs.is_enabled && self.fit_surface() {
            self.redraw();
        }
    }

    fn fit_surface(&mut self) -> bool {
        self.surface.resize(
            self.viewport.document_size(),
            self.viewport.device_pixel_ratio,
        )
    }

    /// Updates the selection outline color from the page's computed
    /// background colors.
    pub fn set_page_background(&mut self, body: Option<&str>, root: Option<&str>) {
        self.highlight = selection_color(resolve_page_background(body, root));
        if self.selected.is_some() {
            self.redraw();
        }
    }

    pub fn redraw(&mut self) {
        let preview = self.gesture.as_ref().and_then(Gesture::preview);
        let committed = self.history.committed();
        let selected = self.selected.and_then(|idx| committed.get(idx));
        render_frame(
            &mut self.surface,
            Frame {
                committed,
                preview: preview.as_ref(),
                selected,
                highlight: self.highlight,
            },
        );
    }
}

impl<S: Surface> Drop for DrawEngine<S> {
    fn drop(&mut self) {
        tracing::debug!(
            committed = self.history.committed().len(),
            "draw engine detached"
        );
    }
}
