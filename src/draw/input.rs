use crate::draw::geometry::Point;
use crate::draw::model::{Annotation, Color, FreehandKind, ShapeKind, Tool};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Escape,
    Enter,
    Delete,
    Backspace,
    Char(char),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyModifiers {
    pub ctrl: bool,
    pub shift: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyEvent {
    pub fn plain(key: KeyCode) -> Self {
        Self {
            key,
            modifiers: KeyModifiers::default(),
        }
    }

    pub fn ctrl(key: KeyCode) -> Self {
        Self {
            key,
            modifiers: KeyModifiers {
                ctrl: true,
                shift: false,
            },
        }
    }

    pub fn ctrl_shift(key: KeyCode) -> Self {
        Self {
            key,
            modifiers: KeyModifiers {
                ctrl: true,
                shift: true,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Undo,
    Redo,
    DeleteSelection,
    Escape,
}

/// Shortcut table for an enabled overlay without an open text entry.
pub fn map_key_event_to_command(event: KeyEvent, has_selection: bool) -> Option<KeyCommand> {
    match (event.key, event.modifiers) {
        (KeyCode::Escape, _) => Some(KeyCommand::Escape),
        (KeyCode::Delete | KeyCode::Backspace, _) if has_selection => {
            Some(KeyCommand::DeleteSelection)
        }
        (KeyCode::Char(c), KeyModifiers { ctrl: true, shift }) => {
            match (c.to_ascii_lowercase(), shift) {
                ('z', false) => Some(KeyCommand::Undo),
                ('z', true) | ('y', _) => Some(KeyCommand::Redo),
                _ => None,
            }
        }
        _ => None,
    }
}

/// What the engine is doing between pointer events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    Disabled,
    Idle,
    Drawing,
    DraggingSelection,
    TextEditing,
}

/// Pointer cursor the host should show over the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Default,
    Grabbing,
    Move,
    Eraser,
    Text,
    Crosshair,
}

pub fn cursor_for(tool: Tool, dragging: bool, has_selection: bool) -> Cursor {
    match tool {
        Tool::Select if dragging => Cursor::Grabbing,
        Tool::Select if has_selection => Cursor::Move,
        Tool::Select => Cursor::Default,
        Tool::Eraser => Cursor::Eraser,
        Tool::Text => Cursor::Text,
        _ => Cursor::Crosshair,
    }
}

/// An in-progress pointer gesture. Ends on pointer-up, touch-end or leave.
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Freehand {
        kind: FreehandKind,
        color: Color,
        size: u32,
        points: Vec<Point>,
    },
    Shape {
        kind: ShapeKind,
        color: Color,
        size: u32,
        start: Point,
        current: Point,
    },
    Erase {
        last: Point,
    },
    DragSelection {
        last: Point,
    },
}

impl Gesture {
    /// Starts the drawing gesture for `tool`. Tools that do not draw on drag
    /// (eraser, text, select) return `None`; the engine handles those itself.
    pub fn begin(tool: Tool, color: Color, size: u32, point: Point) -> Option<Self> {
        if let Some(kind) = tool.freehand_kind() {
            return Some(Gesture::Freehand {
                kind,
                color,
                size,
                points: vec![point],
            });
        }
        tool.shape_kind().map(|kind| Gesture::Shape {
            kind,
            color,
            size,
            start: point,
            current: point,
        })
    }

    pub fn freehand_style(&self) -> Option<(FreehandKind, Color, u32)> {
        match self {
            Gesture::Freehand {
                kind, color, size, ..
            } => Some((*kind, *color, *size)),
            _ => None,
        }
    }

    pub fn last_point(&self) -> Point {
        match self {
            Gesture::Freehand { points, .. } => points.last().copied().unwrap_or_default(),
            Gesture::Shape { current, .. } => *current,
            Gesture::Erase { last } | Gesture::DragSelection { last } => *last,
        }
    }

    /// Appends a freehand point. Returns the new segment for incremental
    /// painting; repeated points are dropped.
    pub fn extend(&mut self, point: Point) -> Option<(Point, Point)> {
        let Gesture::Freehand { points, .. } = self else {
            return None;
        };
        let last = points.last().copied()?;
        if last == point {
            return None;
        }
        points.push(point);
        Some((last, point))
    }

    pub fn set_current(&mut self, point: Point) {
        match self {
            Gesture::Shape { current, .. } => *current = point,
            Gesture::Erase { last } | Gesture::DragSelection { last } => *last = point,
            Gesture::Freehand { .. } => {}
        }
    }

    /// The annotation this gesture would commit right now.
    pub fn preview(&self) -> Option<Annotation> {
        match self {
            Gesture::Freehand {
                kind,
                color,
                size,
                points,
            } => Some(Annotation::Freehand {
                kind: *kind,
                color: *color,
                size: *size,
                points: points.clone(),
            }),
            Gesture::Shape {
                kind,
                color,
                size,
                start,
                current,
            } => Some(Annotation::Shape {
                kind: *kind,
                color: *color,
                size: *size,
                start: *start,
                end: *current,
            }),
            Gesture::Erase { .. } | Gesture::DragSelection { .. } => None,
        }
    }

    /// Consumes the gesture. Shapes take `end` as their final corner.
    pub fn finish(self, end: Point) -> Option<Annotation> {
        match self {
            Gesture::Freehand {
                kind,
                color,
                size,
                points,
            } => Some(Annotation::Freehand {
                kind,
                color,
                size,
                points,
            }),
            Gesture::Shape {
                kind,
                color,
                size,
                start,
                ..
            } => Some(Annotation::Shape {
                kind,
                color,
                size,
                start,
                end,
            }),
            Gesture::Erase { .. } | Gesture::DragSelection { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctrl_z_undoes_and_shifted_or_y_redoes() {
        assert_eq!(
            map_key_event_to_command(KeyEvent::ctrl(KeyCode::Char('z')), false),
            Some(KeyCommand::Undo)
        );
        assert_eq!(
            map_key_event_to_command(KeyEvent::ctrl_shift(KeyCode::Char('Z')), false),
            Some(KeyCommand::Redo)
        );
        assert_eq!(
            map_key_event_to_command(KeyEvent::ctrl(KeyCode::Char('y')), false),
            Some(KeyCommand::Redo)
        );
        assert_eq!(
            map_key_event_to_command(KeyEvent::plain(KeyCode::Char('z')), false),
            None
        );
    }

    #[test]
    fn delete_needs_a_selection() {
        for key in [KeyCode::Delete, KeyCode::Backspace] {
            assert_eq!(map_key_event_to_command(KeyEvent::plain(key), false), None);
            assert_eq!(
                map_key_event_to_command(KeyEvent::plain(key), true),
                Some(KeyCommand::DeleteSelection)
            );
        }
        assert_eq!(
            map_key_event_to_command(KeyEvent::plain(KeyCode::Escape), false),
            Some(KeyCommand::Escape)
        );
    }

    #[test]
    fn cursor_follows_tool_and_drag_state() {
        assert_eq!(cursor_for(Tool::Select, false, false), Cursor::Default);
        assert_eq!(cursor_for(Tool::Select, true, true), Cursor::Grabbing);
        assert_eq!(cursor_for(Tool::Select, false, true), Cursor::Move);
        assert_eq!(cursor_for(Tool::Eraser, false, false), Cursor::Eraser);
        assert_eq!(cursor_for(Tool::Text, false, false), Cursor::Text);
        assert_eq!(cursor_for(Tool::Arrow, false, false), Cursor::Crosshair);
    }

    #[test]
    fn only_drawing_tools_begin_gestures() {
        let at = Point::new(1.0, 1.0);
        for tool in [Tool::Eraser, Tool::Text, Tool::Select] {
            assert!(Gesture::begin(tool, Color::RED, 2, at).is_none());
        }
        assert!(matches!(
            Gesture::begin(Tool::Highlighter, Color::RED, 2, at),
            Some(Gesture::Freehand {
                kind: FreehandKind::Highlighter,
                ..
            })
        ));
        assert!(matches!(
            Gesture::begin(Tool::Arrow, Color::RED, 2, at),
            Some(Gesture::Shape {
                kind: ShapeKind::Arrow,
                ..
            })
        ));
    }

    #[test]
    fn freehand_extend_reports_segments_and_skips_repeats() {
        let mut gesture =
            Gesture::begin(Tool::Pen, Color::RED, 3, Point::new(0.0, 0.0)).expect("pen gesture");
        assert_eq!(
            gesture.extend(Point::new(4.0, 0.0)),
            Some((Point::new(0.0, 0.0), Point::new(4.0, 0.0)))
        );
        assert_eq!(gesture.extend(Point::new(4.0, 0.0)), None);
        let Some(Annotation::Freehand { points, .. }) = gesture.finish(Point::new(9.0, 9.0)) else {
            panic!("expected freehand");
        };
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn shape_commits_with_finish_point() {
        let mut gesture = Gesture::begin(Tool::Rectangle, Color::RED, 2, Point::new(1.0, 1.0))
            .expect("shape gesture");
        gesture.set_current(Point::new(5.0, 5.0));
        assert!(matches!(
            gesture.preview(),
            Some(Annotation::Shape { end, .. }) if end == Point::new(5.0, 5.0)
        ));
        assert!(matches!(
            gesture.finish(Point::new(8.0, 6.0)),
            Some(Annotation::Shape { start, end, .. })
                if start == Point::new(1.0, 1.0) && end == Point::new(8.0, 6.0)
        ));
    }
}
