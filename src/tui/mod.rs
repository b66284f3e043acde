mod help;
mod state;

use crate::cli::{build_config, build_input, Cli};
use crate::engine::service::HttpBiasService;
use crate::engine::StageExecutor;
use crate::model::{PipelineEvent, PipelineInput, Stage};
use crate::orchestrator::{self, PipelineState, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::UiState;
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

const PAGE: i32 = 10;

pub async fn run(args: Cli) -> Result<()> {
    let service =
        HttpBiasService::new(&build_config(&args)).context("failed to set up service client")?;
    let executor = Arc::new(StageExecutor::new(service));
    let input = build_input(&args);

    // Unbounded channels keep the UI thread from ever blocking on the controller.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<PipelineEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_input = input.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_input, event_rx, cmd_tx));

    let _final_state =
        orchestrator::run_controller(PipelineState::new(input), executor, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }
    Ok(())
}

/// What a key press asks of the controller.
#[derive(Debug, PartialEq)]
enum KeyAction {
    None,
    Send(Stage),
    Quit,
}

fn handle_key(state: &mut UiState, k: KeyEvent) -> KeyAction {
    if state.editing {
        match (k.modifiers, k.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('u')) => state.url.clear(),
            (KeyModifiers::CONTROL, KeyCode::Char('c')) => return KeyAction::Quit,
            (_, KeyCode::Enter) | (_, KeyCode::Esc) => state.editing = false,
            (_, KeyCode::Backspace) => {
                state.url.pop();
            }
            (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char(c)) => state.url.push(c),
            _ => {}
        }
        return KeyAction::None;
    }

    match (k.modifiers, k.code) {
        (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
            return KeyAction::Quit
        }
        (_, KeyCode::Char('i')) | (_, KeyCode::Char('/')) => {
            state.tab = 0;
            state.editing = true;
        }
        (_, KeyCode::Char('s')) => {
            state.use_selenium = !state.use_selenium;
            state.info = if state.use_selenium {
                "Headless-browser fetch enabled".into()
            } else {
                "Headless-browser fetch disabled".into()
            };
        }
        (_, KeyCode::Char(c @ '1'..='4')) => {
            let idx = (c as u8 - b'1') as usize;
            return KeyAction::Send(Stage::ALL[idx]);
        }
        (_, KeyCode::Tab) => state.tab = (state.tab + 1) % 2,
        (_, KeyCode::Char('?')) => state.tab = 1,
        (_, KeyCode::Up) | (_, KeyCode::Char('k')) => state.scroll_by(-1),
        (_, KeyCode::Down) | (_, KeyCode::Char('j')) => state.scroll_by(1),
        (_, KeyCode::PageUp) => state.scroll_by(-PAGE),
        (_, KeyCode::PageDown) => state.scroll_by(PAGE),
        _ => {}
    }
    KeyAction::None
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    input: PipelineInput,
    mut event_rx: UnboundedReceiver<PipelineEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState {
        url: input.uri,
        use_selenium: input.use_external_fetch,
        info: "Press i to enter a URL, then 1-4 to run a stage".into(),
        ..Default::default()
    };

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match handle_key(&mut state, k) {
                    KeyAction::None => {}
                    KeyAction::Send(stage) => {
                        let _ = cmd_tx.send(UiCommand::Run {
                            stage,
                            input: PipelineInput::new(state.url.clone(), state.use_selenium),
                        });
                    }
                    KeyAction::Quit => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![Line::from("Pipeline"), Line::from("Help")])
        .select(state.tab)
        .block(Block::default().borders(Borders::ALL).title("bias-analyzer"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        0 => draw_pipeline(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f),
    }
}

fn draw_pipeline(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3), // URL input
                Constraint::Length(3), // Stage keys
                Constraint::Min(0),    // Result
                Constraint::Length(3), // Status
            ]
            .as_ref(),
        )
        .split(area);

    let input_style = if state.editing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let mut url_spans = vec![Span::raw(state.url.clone())];
    if state.editing {
        url_spans.push(Span::styled("▏", Style::default().fg(Color::Yellow)));
    }
    let url_title = Line::from(vec![
        Span::raw("URL  "),
        Span::styled("selenium: ", Style::default().fg(Color::Gray)),
        Span::styled(
            if state.use_selenium { "ON" } else { "OFF" },
            if state.use_selenium {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Red)
            },
        ),
    ]);
    let url = Paragraph::new(Line::from(url_spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(input_style)
            .title(url_title),
    );
    f.render_widget(url, main[0]);

    let mut stage_spans = Vec::new();
    for (i, stage) in Stage::ALL.iter().enumerate() {
        let unavailable =
            state.busy || (*stage == Stage::AnalyzeEnhanced && !state.has_enhanced_text);
        let label_style = if state.busy && state.active_stage == Some(*stage) {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else if unavailable {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };
        stage_spans.push(Span::styled(
            format!("{}", i + 1),
            Style::default().fg(Color::Magenta),
        ));
        stage_spans.push(Span::raw(" "));
        stage_spans.push(Span::styled(stage.title(), label_style));
        stage_spans.push(Span::raw("    "));
    }
    let stages_title = if state.busy { "Stages (busy)" } else { "Stages" };
    let stages = Paragraph::new(Line::from(stage_spans))
        .block(Block::default().borders(Borders::ALL).title(stages_title));
    f.render_widget(stages, main[1]);

    let body = match &state.view {
        Some(view) => state::view_lines(view),
        None => vec![Line::from(Span::styled(
            "No result yet.",
            Style::default().fg(Color::DarkGray),
        ))],
    };
    let result = Paragraph::new(body)
        .wrap(Wrap { trim: false })
        .scroll((state.scroll, 0))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(state.result_title()),
        );
    f.render_widget(result, main[2]);

    let mut status_spans = vec![
        Span::styled("Info: ", Style::default().fg(Color::Gray)),
        Span::raw(state.info.clone()),
    ];
    if let Some(at) = state.completed_at.as_deref() {
        status_spans.push(Span::raw("   "));
        status_spans.push(Span::styled(
            "Last result: ",
            Style::default().fg(Color::Gray),
        ));
        status_spans.push(Span::raw(at.to_string()));
    }
    let status = Paragraph::new(Line::from(status_spans))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, main[3]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(state: &mut UiState, code: KeyCode) -> KeyAction {
        handle_key(state, KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn digits_map_to_stages_in_order() {
        let mut s = UiState::default();
        assert_eq!(press(&mut s, KeyCode::Char('1')), KeyAction::Send(Stage::Parse));
        assert_eq!(
            press(&mut s, KeyCode::Char('4')),
            KeyAction::Send(Stage::AnalyzeEnhanced)
        );
        assert_eq!(press(&mut s, KeyCode::Char('5')), KeyAction::None);
    }

    #[test]
    fn editing_captures_keys_until_enter() {
        let mut s = UiState::default();
        press(&mut s, KeyCode::Char('i'));
        assert!(s.editing);

        for c in "a.io/q1".chars() {
            assert_eq!(press(&mut s, KeyCode::Char(c)), KeyAction::None);
        }
        press(&mut s, KeyCode::Backspace);
        assert_eq!(s.url, "a.io/q");

        press(&mut s, KeyCode::Enter);
        assert!(!s.editing);
        assert_eq!(press(&mut s, KeyCode::Char('q')), KeyAction::Quit);
    }

    #[test]
    fn ctrl_u_clears_url_while_editing() {
        let mut s = UiState {
            url: "http://example.com".into(),
            editing: true,
            ..Default::default()
        };
        handle_key(
            &mut s,
            KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL),
        );
        assert!(s.url.is_empty());
        assert!(s.editing);
    }

    #[test]
    fn modified_keys_do_not_type_into_url() {
        let mut s = UiState {
            url: "http://a".into(),
            editing: true,
            ..Default::default()
        };
        handle_key(
            &mut s,
            KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL),
        );
        handle_key(&mut s, KeyEvent::new(KeyCode::Char('x'), KeyModifiers::ALT));
        assert_eq!(s.url, "http://a");

        handle_key(&mut s, KeyEvent::new(KeyCode::Char('B'), KeyModifiers::SHIFT));
        assert_eq!(s.url, "http://aB");
    }

    #[test]
    fn selenium_toggle_flips_flag() {
        let mut s = UiState::default();
        press(&mut s, KeyCode::Char('s'));
        assert!(s.use_selenium);
        press(&mut s, KeyCode::Char('s'));
        assert!(!s.use_selenium);
    }
}
