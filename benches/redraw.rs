use criterion::{criterion_group, criterion_main, Criterion};
use magic_pen::draw::geometry::Point;
use magic_pen::draw::model::{Annotation, Color, FreehandKind, ShapeKind};
use magic_pen::draw::render::{render_frame, Frame, FrameBuffer, RecordingSurface};

fn annotations(count: usize) -> Vec<Annotation> {
    (0..count)
        .map(|i| {
            let x = (i % 40) as f64 * 25.0;
            let y = (i / 40) as f64 * 25.0;
            match i % 3 {
                0 => Annotation::Freehand {
                    kind: FreehandKind::Pen,
                    color: Color::RED,
                    size: 4,
                    points: (0..16)
                        .map(|step| Point::new(x + step as f64, y + (step % 4) as f64))
                        .collect(),
                },
                1 => Annotation::Shape {
                    kind: ShapeKind::Rectangle,
                    color: Color::rgb(0, 0, 255),
                    size: 2,
                    start: Point::new(x, y),
                    end: Point::new(x + 20.0, y + 15.0),
                },
                _ => Annotation::Shape {
                    kind: ShapeKind::Circle,
                    color: Color::rgb(0, 160, 0),
                    size: 3,
                    start: Point::new(x, y),
                    end: Point::new(x + 18.0, y + 18.0),
                },
            }
        })
        .collect()
}

fn bench_redraw(c: &mut Criterion) {
    let committed = annotations(600);
    let frame = Frame {
        committed: &committed,
        preview: None,
        selected: committed.last(),
        highlight: Color::rgb(0x00, 0x66, 0xCC),
    };

    let mut buffer = FrameBuffer::new((1000, 400), 1.0);
    c.bench_function("redraw_600_framebuffer", |b| {
        b.iter(|| render_frame(&mut buffer, frame))
    });

    let mut recording = RecordingSurface::default();
    c.bench_function("redraw_600_recording", |b| {
        b.iter(|| {
            recording.ops.clear();
            render_frame(&mut recording, frame)
        })
    });
}

criterion_group!(benches, bench_redraw);
criterion_main!(benches);
