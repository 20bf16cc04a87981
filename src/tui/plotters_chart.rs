//! Plotters-powered shape-function chart widget for Ratatui.
//!
//! Plotters output is rendered into the Ratatui buffer using
//! `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A render-only chart description.
///
/// All series and bounds are computed outside the render call.
pub struct ShapeChart<'a> {
    /// Line series for the baseline curve.
    pub baseline: &'a [(f64, f64)],
    /// Line series for the edited curve (the live curve during a gesture).
    pub edited: &'a [(f64, f64)],
    /// Per-sample contributions of the feature.
    pub scatter: &'a [(f64, f64)],
    /// Every edited knot.
    pub knots: &'a [(f64, f64)],
    /// Selected knots (a subset of `knots`).
    pub selected: &'a [(f64, f64)],
    /// The knot under the keyboard cursor.
    pub cursor: Option<(f64, f64)>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_label: &'a str,
    pub fmt_x: fn(f64) -> String,
    pub fmt_y: fn(f64) -> String,
}

impl<'a> Widget for ShapeChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to build a chart in a tiny area.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let x0 = self.x_bounds[0];
        let x1 = self.x_bounds[1];
        let y0 = self.y_bounds[0];
        let y1 = self.y_bounds[1];

        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .y_desc("contribution")
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| (self.fmt_x)(*v))
                .y_label_formatter(&|v| (self.fmt_y)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            let scatter_color = RGBColor(110, 110, 110);
            let baseline_color = RGBColor(90, 90, 255);
            let edited_color = RGBColor(0, 255, 255);
            let knot_color = WHITE;
            let selected_color = RGBColor(255, 200, 0);
            let cursor_color = RGBColor(255, 0, 0);

            chart.draw_series(self.scatter.iter().map(|&(x, y)| Pixel::new((x, y), scatter_color)))?;
            chart.draw_series(LineSeries::new(self.baseline.iter().copied(), &baseline_color))?;
            chart.draw_series(LineSeries::new(self.edited.iter().copied(), &edited_color))?;

            // `Circle` radii come out wrong through the ratatui backend, so
            // knots are single pixels layered knot -> selected -> cursor.
            chart.draw_series(self.knots.iter().map(|&(x, y)| Pixel::new((x, y), knot_color)))?;
            chart.draw_series(self.selected.iter().map(|&(x, y)| Pixel::new((x, y), selected_color)))?;
            chart.draw_series(self.cursor.iter().map(|&(x, y)| Pixel::new((x, y), cursor_color)))?;

            Ok(())
        });

        widget.render(area, buf);
    }
}
