//! Smooth Unicode progress bar widget.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{C_MUTED, C_PLAYING, C_SEPARATOR, C_SECONDARY};

const BLOCKS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

/// Render a smooth progress bar in `area`.
/// `percent` is 0.0..=100.0. `time_pos` and `duration` are optional labels.
pub fn draw_progress(
    frame: &mut Frame,
    area: Rect,
    percent: f64,
    time_pos: Option<f64>,
    duration: Option<f64>,
) {
    if area.width < 4 || area.height == 0 {
        return;
    }

    let left_label = time_pos.map(fmt_time).unwrap_or_default();
    let right_label = duration.map(fmt_time).unwrap_or_default();
    let label_w = (left_label.len() + right_label.len() + 2) as u16;
    let bar_w = area.width.saturating_sub(label_w).max(4) as usize;

    let (filled, rest) = bar_cells(percent, bar_w);

    let mut spans = Vec::new();
    if !left_label.is_empty() {
        spans.push(Span::styled(
            format!("{} ", left_label),
            Style::default().fg(C_SECONDARY),
        ));
    }
    spans.push(Span::styled(filled, Style::default().fg(C_PLAYING)));
    spans.push(Span::styled(rest, Style::default().fg(C_SEPARATOR)));
    if !right_label.is_empty() {
        spans.push(Span::styled(
            format!(" {}", right_label),
            Style::default().fg(C_MUTED),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Split a `width`-cell bar into the filled part (eighth-cell precision) and
/// the empty track after it.
fn bar_cells(percent: f64, width: usize) -> (String, String) {
    let ratio = if percent.is_finite() {
        (percent / 100.0).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let eighths = (ratio * width as f64 * 8.0) as usize;
    let full_blocks = eighths / 8;
    let partial = eighths % 8;

    let mut filled: String = "█".repeat(full_blocks);
    let mut used = full_blocks;
    if full_blocks < width && partial > 0 {
        filled.push(BLOCKS[partial]);
        used += 1;
    }
    (filled, "─".repeat(width - used))
}

pub fn fmt_time(secs: f64) -> String {
    if !secs.is_finite() || secs < 0.0 {
        return "0:00".to_string();
    }
    let s = secs as u64;
    let h = s / 3600;
    let m = (s % 3600) / 60;
    let s = s % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_time() {
        assert_eq!(fmt_time(0.0), "0:00");
        assert_eq!(fmt_time(65.4), "1:05");
        assert_eq!(fmt_time(3725.0), "1:02:05");
        assert_eq!(fmt_time(-3.0), "0:00");
        assert_eq!(fmt_time(f64::NAN), "0:00");
    }

    #[test]
    fn test_bar_cells() {
        let (filled, rest) = bar_cells(50.0, 10);
        assert_eq!(filled.chars().count(), 5);
        assert_eq!(rest.chars().count(), 5);

        let (filled, rest) = bar_cells(100.0, 8);
        assert_eq!(filled, "█".repeat(8));
        assert!(rest.is_empty());

        let (filled, rest) = bar_cells(0.0, 6);
        assert!(filled.is_empty());
        assert_eq!(rest.chars().count(), 6);
    }

    #[test]
    fn test_bar_partial_cell() {
        // 25% of 10 cells = 2.5 cells → two full blocks plus a half block
        let (filled, rest) = bar_cells(25.0, 10);
        assert_eq!(filled, "██▌");
        assert_eq!(rest.chars().count(), 7);
    }

    #[test]
    fn test_bar_ignores_bad_input() {
        let (filled, _) = bar_cells(f64::NAN, 5);
        assert!(filled.is_empty());
        let (filled, rest) = bar_cells(250.0, 5);
        assert_eq!(filled.chars().count(), 5);
        assert!(rest.is_empty());
    }
}
