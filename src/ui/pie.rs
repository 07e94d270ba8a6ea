use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::stats::PieView;

/// Terminal stand-in for a pie: a stacked bar sized by percentage plus a legend.
pub fn render_pie(frame: &mut Frame, area: Rect, fallback_title: &str, pie: Option<&PieView>) {
    let title = pie.map_or(fallback_title, |pie| pie.title.as_str());
    let block = Block::default().title(title.to_string()).borders(Borders::ALL);
    let inner_width = block.inner(area).width;
    let lines = match pie {
        Some(pie) => pie_lines(pie, inner_width),
        None => vec![Line::from(Span::styled(
            "No data",
            Style::default().fg(Color::DarkGray),
        ))],
    };
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

pub(crate) fn pie_lines(pie: &PieView, width: u16) -> Vec<Line<'static>> {
    let mut bar = Vec::with_capacity(pie.slices.len());
    for slice in &pie.slices {
        let cells = usize::from(width) * slice.percent as usize / 100;
        if cells == 0 {
            continue;
        }
        bar.push(Span::styled("█".repeat(cells), Style::default().fg(slice.color)));
    }
    let mut lines = vec![Line::from(bar)];
    for slice in &pie.slices {
        lines.push(Line::from(vec![
            Span::styled("■ ", Style::default().fg(slice.color)),
            Span::styled(slice.legend(), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(
                format!(" {}%", slice.percent),
                Style::default().fg(Color::Gray),
            ),
        ]));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::themes::{ThemeName, ThemeRegistry};
    use crate::stats::build_pie;
    use crate::storage::BucketCounts;

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn bar_width_follows_percentages() {
        let mut buckets = BucketCounts::default();
        buckets.counts.insert("today".into(), 1);
        buckets.counts.insert("past".into(), 3);
        buckets.counts.insert("never".into(), 0);
        buckets.total = 4;
        let palette = ThemeRegistry::default().palette(&ThemeName::Dark);
        let pie = build_pie("Last updated", &buckets, &palette);

        let lines = pie_lines(&pie, 20);
        assert_eq!(lines[0].spans.len(), 2);
        assert_eq!(lines[0].spans[0].content.chars().count(), 5);
        assert_eq!(lines[0].spans[1].content.chars().count(), 15);
        let legend: Vec<_> = lines[1..].iter().map(line_text).collect();
        insta::assert_debug_snapshot!(legend, @r###"
        [
            "■ today (1) 25%",
            "■ past (3) 75%",
            "■ never (0) 0%",
        ]
        "###);
    }
}
