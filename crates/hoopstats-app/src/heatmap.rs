// Correlation heatmap rendering (SVG).
//
// Lower triangle only: the upper triangle and the diagonal repeat
// information and are masked out. Colours run blue (-1) through white (0)
// to red (+1) on a fixed scale.

use std::path::Path;

use hoopstats_core::{CorrelationMatrix, StatCategory};
use svg::node::element::{Group, Line, Rectangle, Text};
use svg::Document;

use crate::export::{io_err, write_atomically, ExportError};

const CELL: f64 = 24.0;
const LABEL_SPACE: f64 = 150.0;
const TITLE_SPACE: f64 = 70.0;
const COLORBAR_GAP: f64 = 40.0;
const COLORBAR_WIDTH: f64 = 20.0;
const COLORBAR_STEPS: usize = 40;
const NEGATIVE_HUE: f64 = 220.0;
const POSITIVE_HUE: f64 = 10.0;
const NAN_FILL: &str = "#dddddd";

/// Title used when the caller gives none, e.g.
/// "2019 NBA Advanced & Per 36 Minutes Stats for All Players".
pub fn default_title(year: i32, a: StatCategory, b: StatCategory) -> String {
    format!(
        "{} NBA {} & {} Stats for All Players",
        year,
        a.display_name(),
        b.display_name()
    )
}

/// Fill colour for a correlation value on the fixed [-1, 1] scale.
pub fn diverging_color(r: f64) -> String {
    if r.is_nan() {
        return NAN_FILL.to_string();
    }
    let r = r.clamp(-1.0, 1.0);
    let hue = if r < 0.0 { NEGATIVE_HUE } else { POSITIVE_HUE };
    let lightness = 97.0 - 47.0 * r.abs();
    format!("hsl({hue:.0}, 75%, {lightness:.1}%)")
}

/// Build the heatmap document.
pub fn render(matrix: &CorrelationMatrix, title: &str) -> Document {
    let n = matrix.dimension();
    let grid = CELL * n as f64;
    let origin = (LABEL_SPACE, TITLE_SPACE);
    let width = origin.0 + grid + COLORBAR_GAP + COLORBAR_WIDTH + 60.0;
    let height = origin.1 + grid + LABEL_SPACE;

    let mut document = Document::new()
        .set("viewBox", (0, 0, width, height))
        .set("width", width)
        .set("height", height)
        .add(
            Rectangle::new()
                .set("width", width)
                .set("height", height)
                .set("fill", "white"),
        )
        .add(
            Text::new(title)
                .set("x", width / 2.0)
                .set("y", TITLE_SPACE / 2.0)
                .set("text-anchor", "middle")
                .set("font-family", "sans-serif")
                .set("font-size", 18),
        );

    let mut cells = Group::new().set("stroke", "white").set("stroke-width", 0.5);
    for i in 0..n {
        for j in 0..i {
            cells = cells.add(
                Rectangle::new()
                    .set("x", origin.0 + CELL * j as f64)
                    .set("y", origin.1 + CELL * i as f64)
                    .set("width", CELL)
                    .set("height", CELL)
                    .set("fill", diverging_color(matrix.get(i, j))),
            );
        }
    }
    document = document.add(cells);

    let mut labels = Group::new()
        .set("font-family", "sans-serif")
        .set("font-size", 10);
    for (k, label) in matrix.labels().iter().enumerate() {
        let centre = CELL * k as f64 + CELL / 2.0;
        labels = labels
            .add(
                Text::new(label.as_str())
                    .set("x", origin.0 - 6.0)
                    .set("y", origin.1 + centre)
                    .set("text-anchor", "end")
                    .set("dominant-baseline", "central"),
            )
            .add(
                Text::new(label.as_str())
                    .set("text-anchor", "end")
                    .set("dominant-baseline", "central")
                    .set(
                        "transform",
                        format!(
                            "translate({}, {}) rotate(-90)",
                            origin.0 + centre,
                            origin.1 + grid + 6.0
                        ),
                    ),
            );
    }
    document = document.add(labels);

    document.add(colorbar(origin.0 + grid + COLORBAR_GAP, origin.1, grid / 2.0))
}

/// Vertical colour bar, +1 at the top, with ticks every 0.5.
fn colorbar(x: f64, y: f64, height: f64) -> Group {
    let mut bar = Group::new();
    let step = height / COLORBAR_STEPS as f64;
    for s in 0..COLORBAR_STEPS {
        let value = 1.0 - 2.0 * (s as f64 + 0.5) / COLORBAR_STEPS as f64;
        bar = bar.add(
            Rectangle::new()
                .set("x", x)
                .set("y", y + step * s as f64)
                .set("width", COLORBAR_WIDTH)
                .set("height", step + 0.2)
                .set("fill", diverging_color(value)),
        );
    }
    for tick in [1.0, 0.5, 0.0, -0.5, -1.0_f64] {
        let ty = y + height * (1.0 - tick) / 2.0;
        bar = bar
            .add(
                Line::new()
                    .set("x1", x + COLORBAR_WIDTH)
                    .set("x2", x + COLORBAR_WIDTH + 4.0)
                    .set("y1", ty)
                    .set("y2", ty)
                    .set("stroke", "black")
                    .set("stroke-width", 0.5),
            )
            .add(
                Text::new(format!("{tick:.1}"))
                    .set("x", x + COLORBAR_WIDTH + 7.0)
                    .set("y", ty)
                    .set("dominant-baseline", "central")
                    .set("font-family", "sans-serif")
                    .set("font-size", 9),
            );
    }
    bar
}

/// Render and write the heatmap to `path`.
pub fn write_heatmap(matrix: &CorrelationMatrix, title: &str, path: &Path) -> Result<(), ExportError> {
    let document = render(matrix, title);
    write_atomically(path, |out, path| {
        svg::write(out, &document).map_err(io_err(path))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
