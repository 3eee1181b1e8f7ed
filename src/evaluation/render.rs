//! Terminal rendering of evaluation diagnostics

use super::curves::{PrCurve, RocCurve};
use super::metrics::ConfusionMatrix;
use colored::{ColoredString, Colorize};

const PLOT_WIDTH: usize = 56;
const PLOT_HEIGHT: usize = 20;
const CELL_WIDTH: usize = 10;

pub const CONFUSION_TITLE: &str = "Confusion Matrix - XGBoost with SMOTEENN";
pub const ROC_TITLE: &str = "ROC Curve";
pub const PR_TITLE: &str = "Precision-Recall Curve";

/// Blues colormap, light to dark
fn blues(intensity: f64) -> (u8, u8, u8) {
    let t = intensity.clamp(0.0, 1.0);
    let lerp = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    (lerp(247.0, 8.0), lerp(251.0, 48.0), lerp(255.0, 107.0))
}

/// Annotated heatmap, actual labels down the side and predicted labels across
pub fn confusion_heatmap(cm: &ConfusionMatrix) -> String {
    let max = cm.max_count().max(1) as f64;
    let mut out = String::new();

    out.push_str(&format!("{}\n\n", CONFUSION_TITLE.bold()));
    out.push_str(&format!(
        "{:>14}{}\n",
        "",
        format!("{:^w$}", "Predicted", w = CELL_WIDTH * cm.n_classes()).dimmed()
    ));
    out.push_str(&format!("{:>14}", ""));
    for label in &cm.labels {
        out.push_str(&format!("{:^w$}", label, w = CELL_WIDTH));
    }
    out.push('\n');

    for (i, label) in cm.labels.iter().enumerate() {
        let side = if i == cm.n_classes() / 2 { "Actual" } else { "" };
        out.push_str(&format!("{:>7} {:>5} ", side.dimmed(), label));
        for j in 0..cm.n_classes() {
            let count = cm.get(i, j);
            let intensity = count as f64 / max;
            let (r, g, b) = blues(intensity);
            let text = format!("{:^w$}", count, w = CELL_WIDTH);
            let cell = if intensity > 0.5 {
                text.white().bold().on_truecolor(r, g, b)
            } else {
                text.black().on_truecolor(r, g, b)
            };
            out.push_str(&cell.to_string());
        }
        out.push('\n');
    }
    out
}

/// Character canvas over the unit square
struct Canvas {
    cells: Vec<Vec<Option<ColoredString>>>,
}

impl Canvas {
    fn new() -> Self {
        Self {
            cells: vec![vec![None; PLOT_WIDTH]; PLOT_HEIGHT],
        }
    }

    fn cell(x: f64, y: f64) -> Option<(usize, usize)> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let col = (x.clamp(0.0, 1.0) * (PLOT_WIDTH - 1) as f64).round() as usize;
        let row = ((1.0 - y.clamp(0.0, 1.0)) * (PLOT_HEIGHT - 1) as f64).round() as usize;
        Some((row, col))
    }

    /// Draw straight segments between consecutive points
    fn polyline(&mut self, xs: &[f64], ys: &[f64], glyph: &str, style: fn(&str) -> ColoredString) {
        for (p, q) in xs.iter().zip(ys).zip(xs.iter().skip(1).zip(ys.iter().skip(1))) {
            let ((&x0, &y0), (&x1, &y1)) = (p, q);
            if !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
                continue;
            }
            let span = ((x1 - x0).abs() * PLOT_WIDTH as f64).max((y1 - y0).abs() * PLOT_HEIGHT as f64);
            let steps = (span.ceil() as usize).max(1) * 2;
            for s in 0..=steps {
                let t = s as f64 / steps as f64;
                if let Some((row, col)) = Self::cell(x0 + (x1 - x0) * t, y0 + (y1 - y0) * t) {
                    self.cells[row][col] = Some(style(glyph));
                }
            }
        }
    }

    fn render(&self, x_label: &str, y_label: &str) -> String {
        let mut out = String::new();
        for (r, row) in self.cells.iter().enumerate() {
            let tick = match r {
                0 => "1.0",
                _ if r == PLOT_HEIGHT / 2 => "0.5",
                _ if r == PLOT_HEIGHT - 1 => "0.0",
                _ => "",
            };
            out.push_str(&format!("{:>4} │", tick));
            for cell in row {
                match cell {
                    Some(glyph) => out.push_str(&glyph.to_string()),
                    None => out.push(' '),
                }
            }
            out.push('\n');
        }
        out.push_str(&format!("     └{}\n", "─".repeat(PLOT_WIDTH)));
        out.push_str(&format!(
            "      0.0{:^w$}1.0\n",
            x_label,
            w = PLOT_WIDTH - 6
        ));
        out.push_str(&format!("      {}: {}\n", "y".dimmed(), y_label));
        out
    }
}

/// ROC curve with the chance diagonal and an AUC legend
pub fn roc_chart(roc: &RocCurve, roc_auc: f64) -> String {
    let mut canvas = Canvas::new();
    canvas.polyline(&[0.0, 1.0], &[0.0, 1.0], "·", |s| s.dimmed());
    canvas.polyline(&roc.fpr, &roc.tpr, "●", |s| s.bright_blue());

    let mut out = format!("{}\n\n", ROC_TITLE.bold());
    out.push_str(&canvas.render("False Positive Rate", "True Positive Rate"));
    out.push_str(&format!(
        "      {} {}   {} {}\n",
        "●".bright_blue(),
        format!("AUC = {:.2}", roc_auc),
        "·".dimmed(),
        "chance"
    ));
    out
}

/// Precision against recall
pub fn pr_chart(pr: &PrCurve) -> String {
    let mut canvas = Canvas::new();
    canvas.polyline(&pr.recall, &pr.precision, "●", |s| s.bright_green());

    let mut out = format!("{}\n\n", PR_TITLE.bold());
    out.push_str(&canvas.render("Recall", "Precision"));
    out
}
