use std::{io::Stdout, time::Duration};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::event::StatusEvent;

use super::{
    display_text, fmt_timestamp,
    handler::{BackendContext, LyricsBackend, LyricsState},
    TrackFormatter,
};

type Term = Terminal<CrosstermBackend<Stdout>>;

#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalUiBackend {
    selected: Option<usize>,
}

#[async_trait::async_trait]
impl LyricsBackend for TerminalUiBackend {
    async fn run_backend(&mut self, ctx: BackendContext) -> anyhow::Result<()> {
        let formatter = TrackFormatter::new(&ctx.config.general.display)?;
        let mut terminal = setup_terminal()?;

        let result = self.tui_loop(&ctx, &formatter, &mut terminal).await;

        restore_terminal(&mut terminal)?;
        result
    }
}

impl TerminalUiBackend {
    async fn tui_loop(
        &mut self,
        ctx: &BackendContext,
        formatter: &TrackFormatter,
        terminal: &mut Term,
    ) -> anyhow::Result<()> {
        Ok(loop {
            for event in ctx.events.try_iter() {
                if let StatusEvent::TrackChanged { .. } = event {
                    self.selected = None;
                }
            }
            let selected = self.selected;
            terminal.draw(|frame| handle_ui(ctx, formatter, selected, frame))?;

            if event::poll(Duration::from_millis(100))? {
                let Event::Key(key) = event::read()? else {
                    continue;
                };
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Down | KeyCode::Char('j') => self.move_selection(ctx, 1),
                    KeyCode::Up | KeyCode::Char('k') => self.move_selection(ctx, -1),
                    KeyCode::Enter => {
                        if let Some(time) = self.selected.and_then(|i| ctx.session.seek_to(i)) {
                            ctx.player.seek(time);
                            self.selected = None;
                        }
                    }
                    KeyCode::Char('n') => ctx.player.skip(),
                    KeyCode::Char('r') => {
                        let session = ctx.session.clone();
                        tokio::task::spawn(async move { session.reload().await });
                    }
                    _ => {}
                }
            }
        })
    }

    fn move_selection(&mut self, ctx: &BackendContext, delta: isize) {
        let state = ctx.session.state();
        self.selected = step_selection(self.selected, &state, delta);
    }
}

/// Moves the selection by `delta`, starting from the active line when
/// nothing is selected yet.
fn step_selection(selected: Option<usize>, state: &LyricsState, delta: isize) -> Option<usize> {
    let len = state.lines().len();
    if len == 0 {
        return None;
    }
    let from = match selected {
        Some(index) => index as isize,
        None => state.active_line().max(0) - delta,
    };
    Some((from + delta).clamp(0, len as isize - 1) as usize)
}

fn handle_ui(
    ctx: &BackendContext,
    formatter: &TrackFormatter,
    selected: Option<usize>,
    f: &mut Frame<CrosstermBackend<Stdout>>,
) {
    let size = f.size();
    let theme = &ctx.config.theme;
    let general = &ctx.config.general;

    let state = ctx.session.state();
    let track = state.track().cloned().unwrap_or_default();

    let border_style = Style::default().fg(theme.borders.border_color.0);
    let text_style = Style::default().fg(theme.borders.text_color.0);

    // Layouts
    let vertical_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)].as_ref())
        .split(size);

    let horizontal_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(74), Constraint::Percentage(26)].as_ref())
        .split(vertical_layout[0]);

    // Lyrics
    let lyrics_block = Block::default()
        .title(formatter.title(&track))
        .borders(Borders::ALL)
        .border_type(theme.borders.border_style.0)
        .border_style(border_style)
        .title_alignment(Alignment::Left);

    let active = state.active_line();
    let text = if !state.lines().is_empty() {
        state
            .lines()
            .iter()
            .enumerate()
            .map(|(idx, each)| {
                let color = if Some(idx) == selected {
                    theme.lyrics.selected_text_color.0
                } else if idx as isize == active {
                    theme.lyrics.active_text_color.0
                } else {
                    theme.lyrics.inactive_text_color.0
                };
                let words = display_text(&each.text, general);
                let words = if general.display.show_timestamps {
                    format!("{:>5}  {words}", fmt_timestamp(each.time))
                } else {
                    words
                };
                Line::from(Span::styled(words, Style::default().fg(color)))
            })
            .collect::<Vec<_>>()
    } else if let Some(plain) = state.plain_lyrics() {
        plain
            .lines()
            .map(|line| {
                Line::from(Span::styled(
                    display_text(line, general),
                    Style::default().fg(theme.lyrics.inactive_text_color.0),
                ))
            })
            .collect()
    } else {
        vec![Line::from(Span::styled(state.status().message(), text_style))]
    };

    let focus = selected.map_or(active, |s| s as isize);
    let lyrics_part = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false })
        .scroll(((focus - general.scroll_offset as isize).max(0) as u16, 0))
        .block(lyrics_block);
    f.render_widget(lyrics_part, horizontal_layout[0]);

    // Track info
    let info_block = Block::new()
        .title("About this track")
        .borders(Borders::ALL)
        .border_type(theme.borders.border_style.0)
        .border_style(border_style)
        .title_alignment(Alignment::Right);

    let info_part = Paragraph::new(vec![
        Line::from(formatter.artist(&track)),
        Line::from(format!("Status: {}", state.status())),
        Line::from(format!("Lines: {}", state.lines().len())),
        Line::from(""),
        Line::from("j/k select, enter seek"),
        Line::from("n next, r reload, q quit"),
    ])
    .style(text_style)
    .alignment(Alignment::Left)
    .wrap(Wrap { trim: false })
    .block(info_block);
    f.render_widget(info_part, horizontal_layout[1]);

    // Track progress
    let progress = state.progress_secs();
    let progress_percent = if track.duration_secs > 0.0 {
        (progress / track.duration_secs * 100.0).clamp(0.0, 100.0) as u16
    } else {
        0
    };
    let label = format!(
        "{} / {}",
        fmt_timestamp(progress),
        fmt_timestamp(track.duration_secs)
    );
    let track_progress = Gauge::default()
        .gauge_style(Style::default().fg(theme.progress_bar.color.0))
        .percent(progress_percent)
        .label(label);
    f.render_widget(track_progress, vertical_layout[1])
}

fn setup_terminal() -> anyhow::Result<Term> {
    let mut stdout = std::io::stdout();
    enable_raw_mode()?;
    crossterm::execute!(stdout, EnterAlternateScreen,)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(terminal: &mut Term) -> anyhow::Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor().map_err(anyhow::Error::from)
}
