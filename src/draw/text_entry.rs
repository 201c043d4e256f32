use crate::draw::geometry::Point;
use crate::draw::model::{Annotation, Color};
use std::time::{Duration, Instant};

/// The entry may take focus only after this delay.
pub const FOCUS_DELAY: Duration = Duration::from_millis(50);
/// Blur waits this long before committing so a click elsewhere is handled first.
pub const BLUR_COMMIT_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq)]
pub enum TextEntryState {
    Opening {
        focus_at: Instant,
    },
    Editing,
    /// Focus was lost; the value and style were captured at blur time and
    /// will be committed at `due`. Enter and further blurs are ignored here.
    Committing {
        due: Instant,
        text: String,
        color: Color,
        size: u32,
    },
}

/// Result of driving the entry forward.
#[derive(Debug, Clone, PartialEq)]
pub enum TextEntryStep {
    Open,
    /// The entry is finished and must be removed. Carries the annotation to
    /// commit, if the trimmed text was non-empty.
    Closed(Option<Annotation>),
}

/// Ephemeral text input anchored at a document point.
#[derive(Debug, Clone, PartialEq)]
pub struct TextEntry {
    anchor: Point,
    value: String,
    state: TextEntryState,
}

impl TextEntry {
    pub fn open(anchor: Point, now: Instant) -> Self {
        Self {
            anchor,
            value: String::new(),
            state: TextEntryState::Opening {
                focus_at: now + FOCUS_DELAY,
            },
        }
    }

    pub fn anchor(&self) -> Point {
        self.anchor
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn state(&self) -> &TextEntryState {
        &self.state
    }

    pub fn has_focus(&self) -> bool {
        matches!(self.state, TextEntryState::Editing)
    }

    /// Replaces the typed value. Ignored once a commit is pending.
    pub fn set_value(&mut self, value: &str) {
        if !matches!(self.state, TextEntryState::Committing { .. }) {
            self.value = value.to_owned();
        }
    }

    /// Enter key. Commits immediately with the current style unless a
    /// blur commit is already pending.
    pub fn confirm(&mut self, color: Color, size: u32) -> TextEntryStep {
        if matches!(self.state, TextEntryState::Committing { .. }) {
            return TextEntryStep::Open;
        }
        TextEntryStep::Closed(Annotation::text(color, size, &self.value, self.anchor))
    }

    /// Focus loss. Schedules a delayed commit with the style active now.
    pub fn blur(&mut self, color: Color, size: u32, now: Instant) {
        if matches!(self.state, TextEntryState::Committing { .. }) {
            return;
        }
        self.state = TextEntryState::Committing {
            due: now + BLUR_COMMIT_DELAY,
            text: self.value.trim().to_owned(),
            color,
            size,
        };
    }

    /// Advances timers: grants focus after the open delay and resolves a
    /// pending blur commit once it is due.
    pub fn tick(&mut self, now: Instant) -> TextEntryStep {
        match &self.state {
            TextEntryState::Opening { focus_at } => {
                if now >= *focus_at {
                    self.state = TextEntryState::Editing;
                }
                TextEntryStep::Open
            }
            TextEntryState::Committing {
                due,
                text,
                color,
                size,
            } if now >= *due => {
                TextEntryStep::Closed(Annotation::text(*color, *size, text, self.anchor))
            }
            _ => TextEntryStep::Open,
        }
    }
}
