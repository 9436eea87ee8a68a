use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key_line(key: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Workflow:"),
        key_line("c", 11, "Check backend connections"),
        key_line("s", 11, "Search pending plans (after a successful check)"),
        key_line("r", 11, "Run automation (after plans were found)"),
        Line::from(""),
        Line::from("Form:"),
        key_line("↑/↓", 9, "Select field"),
        key_line("0-9 -", 7, "Edit field"),
        key_line("backspace", 3, "Delete character"),
        Line::from(""),
        Line::from("General:"),
        key_line("l", 11, "Clear log"),
        key_line("tab", 9, "Switch tabs"),
        key_line("?", 11, "Show this help"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit (finalizes backend connections)"),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
