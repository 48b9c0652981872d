use std::io;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph};

use winprob_terminal::config::EngineConfig;
use winprob_terminal::diagram::{Diagram, EDGES};
use winprob_terminal::query::HomeAway;
use winprob_terminal::state::{self, AppState, EstimateCommand, INPUT_FIELDS, apply_delta};
use winprob_terminal::worker;

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: mpsc::Sender<EstimateCommand>,
}

impl App {
    fn new(cmd_tx: mpsc::Sender<EstimateCommand>) -> Self {
        Self {
            state: AppState::new(),
            should_quit: false,
            cmd_tx,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('l') | KeyCode::Right | KeyCode::Char('+') => self.adjust(1),
            KeyCode::Char('h') | KeyCode::Left | KeyCode::Char('-') => self.adjust(-1),
            KeyCode::Char('L') | KeyCode::PageUp => self.adjust(5),
            KeyCode::Char('H') | KeyCode::PageDown => self.adjust(-5),
            KeyCode::Char('r') | KeyCode::Char('R') => {
                let cmd = self.state.next_run();
                self.send(cmd);
            }
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            _ => {}
        }
    }

    fn adjust(&mut self, step: i32) {
        if let Some(cmd) = self.state.adjust_selected(step) {
            self.send(cmd);
        }
    }

    fn send(&mut self, cmd: EstimateCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            self.state.push_log("[WARN] Estimator is not running");
        }
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let cfg = EngineConfig::from_env();
    let data = cfg.load_data().context("load historical match data")?;
    let summary = format!(
        "[INFO] Loaded {} matches / {} events, {} results",
        data.events.match_count(),
        data.events.event_count(),
        data.results.len()
    );
    let estimator = Arc::new(cfg.build_estimator(data));

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    worker::spawn_estimator(estimator, tx, cmd_rx);

    let mut app = App::new(cmd_tx);
    app.state.push_log(summary);
    let first = app.state.next_run();
    app.send(first);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<state::Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(6),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .style(Style::default().add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(40), Constraint::Min(1)])
        .split(chunks[1]);
    render_inputs(frame, body[0], &app.state);
    render_model(frame, body[1], &app.state);

    render_logs(frame, chunks[2], &app.state);

    let footer = Paragraph::new(
        "j/k/↑/↓ Select | h/l/←/→ -1/+1 | H/L ±5 | r Resample | ? Help | q Quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let status = if state.pending { "sampling…" } else { "ready" };
    format!(
        "BAYESIAN REJECTION SAMPLING FOR FOOTBALL OUTCOMES | {}' | {} | {status}",
        state.query.time,
        match state.query.home_away {
            HomeAway::Home => "Team 1 at home",
            HomeAway::Away => "Team 1 away",
        }
    )
}

fn render_inputs(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title(" Parameters ").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = INPUT_FIELDS
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let text = format!("{:<30}{:>4}", field.label(), field.read(&state.query));
            let style = if idx == state.selected {
                Style::default().fg(Color::White).bg(Color::DarkGray)
            } else {
                Style::default()
            };
            Line::styled(text, style)
        })
        .collect::<Vec<_>>();
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_model(frame: &mut Frame, area: Rect, state: &AppState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Min(1),
        ])
        .split(area);

    let Some(est) = state.estimate.as_ref() else {
        let empty = Paragraph::new("Waiting for first estimate")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, area);
        return;
    };

    let gauge = Gauge::default()
        .block(Block::default().title(" Team 1 Win ").borders(Borders::ALL))
        .gauge_style(Style::default().fg(Color::Green).bg(Color::Black))
        .ratio(est.p_win().clamp(0.0, 1.0))
        .label(format!("{:.1}%", est.p_win() * 100.0));
    frame.render_widget(gauge, sections[0]);

    let stats = format!(
        " particles kept {}/{} ({:.1}%) | historical {:.2} over {} matches",
        est.posterior.accepted,
        est.posterior.drawn,
        est.posterior.acceptance_rate() * 100.0,
        est.historical_rate,
        est.historical_matches
    );
    frame.render_widget(
        Paragraph::new(stats).style(Style::default().fg(Color::Gray)),
        sections[1],
    );

    let diagram = Diagram::from_estimate(est);
    let mut lines = Vec::new();
    for (from, to) in EDGES {
        let (Some(src), Some(dst)) = (diagram.node(from), diagram.node(to)) else {
            continue;
        };
        let src_color = src.color.parse::<Color>().unwrap_or(Color::White);
        let dst_color = dst.color.parse::<Color>().unwrap_or(Color::White);
        lines.push(Line::from(vec![
            Span::styled(src.label.replace('\n', " "), Style::default().fg(src_color)),
            Span::raw("  →  "),
            Span::styled(dst.label.replace('\n', " "), Style::default().fg(dst_color)),
        ]));
    }
    let graph = Paragraph::new(lines)
        .block(Block::default().title(" Causal diagram ").borders(Borders::ALL));
    frame.render_widget(graph, sections[2]);
}

fn render_logs(frame: &mut Frame, area: Rect, state: &AppState) {
    let visible = area.height.saturating_sub(2) as usize;
    let lines = state
        .logs
        .iter()
        .rev()
        .take(visible)
        .rev()
        .map(|msg| {
            let color = if msg.starts_with("[WARN]") {
                Color::Yellow
            } else {
                Color::Gray
            };
            Line::styled(msg.clone(), Style::default().fg(color))
        })
        .collect::<Vec<_>>();
    let logs = Paragraph::new(lines).block(Block::default().title(" Log ").borders(Borders::ALL));
    frame.render_widget(logs, area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup = centered_rect(60, 50, area);
    frame.render_widget(Clear, popup);
    let text = "Select an input with j/k, change it with h/l (H/L for steps of 5).\n\
        Every change re-runs the sampler; a run still in progress is cancelled.\n\
        r draws a fresh set of particles for the same inputs.\n\n\
        p_win is the mean win value of the particles whose simulated score\n\
        matches the current score. No match at all reads as 0.";
    let help = Paragraph::new(text).block(Block::default().title(" Help ").borders(Borders::ALL));
    frame.render_widget(help, popup);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
