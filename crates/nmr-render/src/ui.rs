use nmr_core::run::{RunState, StopReason};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Wrap};

use crate::scope::ScopeView;

/// Width of the info sidebar, in columns.
const SIDEBAR_WIDTH: u16 = 34;

/// Draw the full UI: time-domain chart, spectrum chart, sidebar.
pub fn draw(frame: &mut Frame, view: &ScopeView) {
    let area = frame.area();

    // Horizontal split: [charts | sidebar]
    let h_chunks =
        Layout::horizontal([Constraint::Min(40), Constraint::Length(SIDEBAR_WIDTH)]).split(area);

    // Vertical split of left panel: [time | spectrum]
    let v_chunks = Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(h_chunks[0]);

    draw_time_series(frame, v_chunks[0], view);
    draw_spectrum(frame, v_chunks[1], view);
    draw_sidebar(frame, h_chunks[1], view);
}

fn draw_time_series(frame: &mut Frame, area: Rect, view: &ScopeView) {
    let (x, y) = view.time_bounds();
    let rate = f64::from(view.sample_rate().max(1));
    let title = if view.source().is_empty() {
        " Free induction decay ".to_string()
    } else {
        format!(" Free induction decay · {} ", view.source())
    };

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(view.time_points());

    let chart = Chart::new(vec![dataset])
        .block(Block::default().borders(Borders::ALL).title(title))
        .x_axis(
            Axis::default()
                .title("sample")
                .style(Style::default().fg(Color::DarkGray))
                .bounds(x)
                .labels([
                    "0".to_string(),
                    format!("{:.0} ({:.1} ms)", x[1], x[1] / rate * 1000.0),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("ADC")
                .style(Style::default().fg(Color::DarkGray))
                .bounds(y)
                .labels([format!("{:.0}", y[0]), format!("{:.0}", y[1])]),
        );

    frame.render_widget(chart, area);
}

fn draw_spectrum(frame: &mut Frame, area: Rect, view: &ScopeView) {
    let (x, y) = view.spectrum_bounds();
    let scale = if view.log_magnitude() { "log10 |X|" } else { "|X|" };

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Yellow))
        .data(view.spectrum_points());

    let chart = Chart::new(vec![dataset])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Spectrum "),
        )
        .x_axis(
            Axis::default()
                .title("Hz")
                .style(Style::default().fg(Color::DarkGray))
                .bounds(x)
                .labels([
                    "0".to_string(),
                    format!("{:.0}", x[1] / 2.0),
                    format!("{:.0}", x[1]),
                ]),
        )
        .y_axis(
            Axis::default()
                .title(scale)
                .style(Style::default().fg(Color::DarkGray))
                .bounds(y)
                .labels([format!("{:.1}", y[0]), format!("{:.1}", y[1])]),
        );

    frame.render_widget(chart, area);
}

fn state_style(state: &RunState) -> Style {
    let color = match state {
        RunState::Idle => Color::DarkGray,
        RunState::Handshaking => Color::Yellow,
        RunState::Streaming => Color::Green,
        RunState::Stopped(StopReason::Completed) => Color::Cyan,
        RunState::Stopped(StopReason::StreamEnded | StopReason::Cancelled) => Color::Magenta,
        RunState::Stopped(StopReason::Failed(_)) => Color::Red,
    };
    Style::default().fg(color)
}

/// Draw the run info, recent device lines, and key help.
fn draw_sidebar(frame: &mut Frame, area: Rect, view: &ScopeView) {
    let peak = view.peak().map_or_else(
        || " Peak: -".to_string(),
        |(f, m)| format!(" Peak: {f:.1} Hz ({m:.0})"),
    );

    let mut lines = vec![
        Line::from(Span::styled(
            format!(" {}", view.state()),
            state_style(view.state()),
        )),
        Line::from(""),
        Line::from(Span::styled("─ Run ─────", Style::default().fg(Color::Yellow))),
        Line::from(format!(" Samples: {}", view.sample_count())),
        Line::from(format!(" Time: {:.3} s", view.duration_secs())),
        Line::from(format!(" Rate: {:.0} S/s", view.throughput())),
        Line::from(peak),
        Line::from(""),
        Line::from(Span::styled("─ Device ──", Style::default().fg(Color::Yellow))),
    ];
    lines.extend(view.status_lines().map(|l| Line::from(format!(" {l}"))));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " q quit  l log/lin",
        Style::default().fg(Color::DarkGray),
    )));

    let sidebar = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::LEFT).title(" nmrscope "));

    frame.render_widget(sidebar, area);
}

#[cfg(test)]
mod tests {
    use nmr_core::sample::Sample;
    use nmr_core::spectrum::SpectralFrame;
    use nmr_core::traits::DisplaySink;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use super::*;

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(ratatui::buffer::Cell::symbol)
            .collect()
    }

    #[test]
    fn renders_charts_and_sidebar() {
        let mut view = ScopeView::new(10_000, false, 4).with_source("/dev/ttyACM0");
        view.push_status("STATUS: Pulse finished.");
        view.set_state(RunState::Streaming);
        view.show_time_series(&[100, 900, 400, 2000].map(Sample::decode));
        view.show_spectrum(&SpectralFrame {
            frequencies: vec![0.0, 2500.0, 5000.0],
            magnitudes: vec![3400.0, 1700.0, 100.0],
        });

        let mut terminal = Terminal::new(TestBackend::new(120, 32)).unwrap();
        terminal.draw(|f| draw(f, &view)).unwrap();
        let text = screen_text(&terminal);

        assert!(text.contains("Free induction decay"));
        assert!(text.contains("/dev/ttyACM0"));
        assert!(text.contains("Spectrum"));
        assert!(text.contains("streaming"));
        assert!(text.contains("Samples: 4"));
        assert!(text.contains("Peak: 2500.0 Hz"));
        assert!(text.contains("STATUS: Pulse finished."));
        assert!(text.contains("q quit"));
    }

    #[test]
    fn renders_before_any_data() {
        let view = ScopeView::new(10_000, true, 4);
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| draw(f, &view)).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("Peak: -"));
        assert!(text.contains("idle"));
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let view = ScopeView::new(10_000, false, 4);
        let mut terminal = Terminal::new(TestBackend::new(10, 4)).unwrap();
        terminal.draw(|f| draw(f, &view)).unwrap();
    }
}
