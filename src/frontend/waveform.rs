//! Live scrolling waveform panel
//!
//! Renders the signal buffer as a polyline, one sample per horizontal pixel,
//! following the latest samples once the trace outgrows the panel. The
//! vertical mapping normalizes over the buffer-wide min/max with a 5 px
//! margin top and bottom, so the trace always fills the panel regardless of
//! signal amplitude.

use crate::recording::SignalBuffer;
use egui::{Color32, Pos2, Sense, Shape, Stroke, Ui};

/// Grid cell size in pixels
const GRID_SPACING: f32 = 16.0;

/// Horizontal pixels per sample
const X_STEP: f32 = 1.0;

/// Trace color (dark red, classic chart-recorder look)
const TRACE_COLOR: Color32 = Color32::from_rgb(198, 0, 0);

/// Render the waveform panel into the available space
pub fn draw(ui: &mut Ui, buffer: &SignalBuffer) {
    let size = ui.available_size();
    let (response, painter) = ui.allocate_painter(size, Sense::hover());
    let rect = response.rect;

    painter.rect_filled(rect, 0.0, Color32::WHITE);
    draw_grid(&painter, rect);

    let samples = buffer.samples();
    if samples.is_empty() {
        return;
    }

    // Follow the latest samples once the trace is wider than the panel
    let visible = (rect.width() / X_STEP).max(1.0) as usize;
    let start = samples.len().saturating_sub(visible);

    let height = rect.height();
    let points: Vec<Pos2> = samples[start..]
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            Pos2::new(
                rect.left() + i as f32 * X_STEP,
                rect.top() + buffer.map_to_y(value, height),
            )
        })
        .collect();

    if points.len() > 1 {
        painter.add(Shape::line(points, Stroke::new(1.5, TRACE_COLOR)));
    }
}

fn draw_grid(painter: &egui::Painter, rect: egui::Rect) {
    let grid_stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(180, 180, 180, 120));

    let mut x = rect.left();
    while x < rect.right() {
        painter.add(Shape::dashed_line(
            &[Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())],
            grid_stroke,
            1.0,
            3.0,
        ));
        x += GRID_SPACING;
    }
    let mut y = rect.top();
    while y < rect.bottom() {
        painter.add(Shape::dashed_line(
            &[Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)],
            grid_stroke,
            1.0,
            3.0,
        ));
        y += GRID_SPACING;
    }

    // Baseline through the vertical center
    let mid_y = rect.center().y;
    painter.line_segment(
        [Pos2::new(rect.left(), mid_y), Pos2::new(rect.right(), mid_y)],
        Stroke::new(0.5, Color32::from_rgba_unmultiplied(0, 0, 0, 150)),
    );
}
