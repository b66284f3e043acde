use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key_line(key: &'static str, pad: usize, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(desc),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit (waits for a running stage)"),
        ]),
        key_line("i", 11, "Edit the URL (also /)"),
        key_line("s", 11, "Toggle headless-browser fetch"),
        key_line("1", 11, "Parse Text"),
        key_line("2", 11, "Analyze Bias"),
        key_line("3", 11, "Enhanced Text (analyze + rewrite)"),
        key_line("4", 11, "Analyze Enhanced (needs a rewrite)"),
        key_line("tab", 9, "Switch tabs"),
        key_line("?", 11, "Show this help"),
        Line::from(""),
        Line::from("While editing:"),
        key_line("Enter/Esc", 3, "Finish editing"),
        key_line("Ctrl-U", 6, "Clear the URL"),
        Line::from(""),
        Line::from("Result panel:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("↑/↓", Style::default().fg(Color::Magenta)),
            Span::raw(" or "),
            Span::styled("j/k", Style::default().fg(Color::Magenta)),
            Span::raw("  Scroll"),
        ]),
        key_line("PgUp/PgDn", 3, "Scroll a page"),
        Line::from(""),
        Line::from("Only one stage runs at a time; requests made while busy are ignored."),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
