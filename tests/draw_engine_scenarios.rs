use magic_pen::draw::geometry::Point;
use magic_pen::draw::history::RedoEntry;
use magic_pen::draw::input::{InteractionState, KeyCode, KeyEvent};
use magic_pen::draw::model::{Annotation, Color, Tool};
use magic_pen::draw::render::{FrameBuffer, Surface};
use magic_pen::draw::text_entry::BLUR_COMMIT_DELAY;
use magic_pen::draw::{Command, DrawEngine, Viewport};
use std::time::Instant;

fn enabled_engine() -> DrawEngine {
    let mut engine = DrawEngine::new(FrameBuffer::default(), Viewport::new(200, 100));
    engine.dispatch(Command::ToggleDrawing { enabled: true });
    engine
}

fn stroke(engine: &mut DrawEngine, points: &[(f64, f64)]) {
    let now = Instant::now();
    let mut iter = points.iter().map(|&(x, y)| Point::new(x, y));
    let Some(first) = iter.next() else {
        return;
    };
    engine.pointer_down(first, now);
    let mut last = first;
    for point in iter {
        engine.pointer_move(point);
        last = point;
    }
    engine.pointer_up(last);
}

#[test]
fn enabling_sizes_framebuffer_to_document() {
    let engine = enabled_engine();
    assert_eq!(engine.surface().device_size(), (200, 100));
    assert_eq!(engine.surface().painted_pixel_count(), 0);
}

#[test]
fn pen_stroke_paints_pixels_and_undo_clears_them() {
    let mut engine = enabled_engine();
    stroke(&mut engine, &[(10.0, 50.0), (60.0, 50.0), (110.0, 50.0)]);

    let red = engine.surface().pixel_at(Point::new(60.0, 50.0)).expect("pixel");
    assert_eq!(red, [255, 0, 0, 255]);

    engine.dispatch(Command::Undo);
    assert_eq!(engine.surface().painted_pixel_count(), 0);
    engine.dispatch(Command::Redo);
    assert!(engine.surface().painted_pixel_count() > 0);
}

#[test]
fn highlighter_stroke_is_translucent() {
    let mut engine = enabled_engine();
    engine.dispatch(Command::SetTool {
        tool: Tool::Highlighter,
    });
    stroke(&mut engine, &[(10.0, 20.0), (90.0, 20.0)]);
    let [_, _, _, alpha] = engine
        .surface()
        .pixel_at(Point::new(50.0, 20.0))
        .expect("pixel");
    assert!((95..=110).contains(&alpha), "alpha was {alpha}");
}

#[test]
fn hidpi_resize_reallocates_and_repaints() {
    let mut engine = enabled_engine();
    stroke(&mut engine, &[(10.0, 10.0), (50.0, 10.0)]);
    let allocations = engine.surface().allocation_count();

    engine.resize(Viewport {
        device_pixel_ratio: 2.0,
        ..Viewport::new(200, 100)
    });
    assert_eq!(engine.surface().device_size(), (400, 200));
    assert_eq!(engine.surface().allocation_count(), allocations + 1);
    assert!(engine.surface().pixel(60, 20).is_some_and(|px| px[3] == 255));

    engine.resize(Viewport {
        device_pixel_ratio: 2.0,
        ..Viewport::new(200, 100)
    });
    assert_eq!(engine.surface().allocation_count(), allocations + 1);
}

#[test]
fn n_commits_then_n_undos_restore_empty_list() {
    let mut engine = enabled_engine();
    for i in 0..5 {
        let y = 10.0 + i as f64 * 15.0;
        stroke(&mut engine, &[(10.0, y), (40.0, y)]);
    }
    assert_eq!(engine.committed().len(), 5);
    for _ in 0..5 {
        engine.dispatch(Command::Undo);
    }
    assert!(engine.committed().is_empty());
    assert_eq!(engine.redo_len(), 5);

    engine.dispatch(Command::Redo);
    stroke(&mut engine, &[(100.0, 10.0), (120.0, 10.0)]);
    assert_eq!(engine.redo_len(), 0);
    assert_eq!(engine.committed().len(), 2);
}

#[test]
fn clear_is_one_undo_away_from_the_original_list() {
    let mut engine = enabled_engine();
    stroke(&mut engine, &[(10.0, 10.0), (20.0, 20.0)]);
    engine.dispatch(Command::SetTool { tool: Tool::Line });
    stroke(&mut engine, &[(30.0, 30.0), (80.0, 30.0)]);
    let before = engine.committed().to_vec();

    engine.dispatch(Command::Clear);
    assert!(matches!(engine.history().redo_entries(), [RedoEntry::Cleared(batch)] if batch == &before));
    assert_eq!(engine.surface().painted_pixel_count(), 0);

    engine.dispatch(Command::Undo);
    assert_eq!(engine.committed(), &before[..]);
}

#[test]
fn eraser_sweep_removes_stroke_within_radius_only() {
    let mut engine = enabled_engine();
    stroke(&mut engine, &[(10.0, 10.0), (20.0, 10.0)]);
    engine.dispatch(Command::SetTool { tool: Tool::Eraser });

    // size 4 gives radius 12
    stroke(&mut engine, &[(20.0, 23.0), (30.0, 23.0)]);
    assert_eq!(engine.committed().len(), 1);
    stroke(&mut engine, &[(20.0, 21.0)]);
    assert!(engine.committed().is_empty());
}

#[test]
fn text_flow_commits_on_blur_and_renders_glyph_cells() {
    let mut engine = enabled_engine();
    engine.dispatch(Command::SetTool { tool: Tool::Text });
    let start = Instant::now();
    engine.pointer_down(Point::new(20.0, 60.0), start);
    assert_eq!(engine.interaction_state(), InteractionState::TextEditing);
    engine.text_input("Hi");
    engine.text_blur(start);
    engine.tick(start + BLUR_COMMIT_DELAY);

    assert!(matches!(
        engine.committed(),
        [Annotation::Text { text, .. }] if text == "Hi"
    ));
    assert_eq!(engine.interaction_state(), InteractionState::Idle);
    assert!(engine.surface().painted_pixel_count() > 0);
}

#[test]
fn escape_with_nothing_selected_turns_drawing_off() {
    let mut engine = enabled_engine();
    assert!(engine.key_down(KeyEvent::plain(KeyCode::Escape)));
    assert_eq!(engine.interaction_state(), InteractionState::Disabled);
    assert!(!engine.key_down(KeyEvent::plain(KeyCode::Escape)));
}

#[test]
fn selection_outline_uses_page_contrast_color() {
    let mut engine = enabled_engine();
    engine.set_page_background(Some("rgb(20, 20, 20)"), None);
    engine.dispatch(Command::SetTool { tool: Tool::Line });
    stroke(&mut engine, &[(40.0, 50.0), (160.0, 50.0)]);
    engine.dispatch(Command::SetTool { tool: Tool::Select });
    stroke(&mut engine, &[(100.0, 50.0)]);
    assert_eq!(engine.selected(), Some(0));

    // left edge of the dashed outline: 8px padding around the line's box
    let outline = engine.surface().pixel_at(Point::new(32.0, 43.0));
    assert_eq!(outline, Some([255, 255, 255, 255]));
    assert_eq!(engine.highlight_color(), Color::WHITE);
}

#[test]
fn surface_resize_is_a_no_op_for_identical_metrics() {
    let mut buffer = FrameBuffer::new((10, 10), 1.0);
    assert!(!buffer.resize((10, 10), 1.0));
    assert!(buffer.resize((10, 10), 1.5));
}
