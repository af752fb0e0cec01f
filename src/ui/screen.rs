use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Gauge, Paragraph, Widget, Wrap},
};

use crate::app::App;
use crate::session::{GameMode, Phase, Snapshot, Standing, HOST_ID};
use crate::ui::{fit, scoreline};

/// A UI Screen boundary: one per session phase
pub trait Screen {
    fn render(&self, app: &App, snapshot: &Snapshot, area: Rect, buf: &mut Buffer);
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn legend(text: &str) -> Paragraph<'_> {
    Paragraph::new(Span::styled(
        text,
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
}

fn date_lines(app: &App, snapshot: &Snapshot) -> Vec<Line<'static>> {
    app.session
        .store()
        .date_sets()
        .iter()
        .enumerate()
        .map(|(i, set)| {
            let checked = snapshot.selected_dates.contains(&set.label);
            let marker = if checked { "[x]" } else { "[ ]" };
            let cursor = if i == app.date_cursor { "> " } else { "  " };
            let style = if checked {
                Style::default().fg(Color::Green).patch(bold())
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::raw(cursor),
                Span::styled(format!("{marker} {}", set.label), style),
                Span::styled(format!("  {} words", set.entries.len()), dim()),
            ])
        })
        .collect()
}

fn prompt_lines(app: &App) -> Vec<Line<'static>> {
    match &app.input {
        Some(input) => vec![
            Line::from(""),
            Line::from(vec![
                Span::styled(format!("{}: ", input.prompt.label()), bold()),
                Span::styled(
                    format!("{}_", input.value),
                    Style::default().fg(Color::Yellow),
                ),
            ]),
            Line::from(Span::styled("(enter) confirm / (esc) cancel", dim())),
        ],
        None => Vec::new(),
    }
}

/// Date selection and mode choice; also collects names and room codes
pub struct MenuScreen;

impl Screen for MenuScreen {
    fn render(&self, app: &App, snapshot: &Snapshot, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(3),
                Constraint::Length(4),
                Constraint::Length(1),
            ])
            .split(area);

        let title = match (snapshot.phase, &snapshot.pending_room_code) {
            (Phase::Setup, Some(code)) => format!("Joining room {code}"),
            _ => "Vocabulary duel".to_string(),
        };
        Paragraph::new(Span::styled(title, bold().fg(Color::Magenta)))
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        Paragraph::new(date_lines(app, snapshot)).render(chunks[1], buf);
        Paragraph::new(prompt_lines(app)).render(chunks[2], buf);

        legend(
            "(↑↓) move / (space) toggle / (s)ingle / (h)ost / (j)oin / (esc)ape",
        )
        .render(chunks[3], buf);
    }
}

/// Waiting room and the pre-game countdown
pub struct LobbyScreen;

impl Screen for LobbyScreen {
    fn render(&self, app: &App, snapshot: &Snapshot, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(area);

        let mut header = Vec::new();
        if let Some(code) = &snapshot.room_code {
            header.push(Line::from(vec![
                Span::raw("Room "),
                Span::styled(code.clone(), bold().fg(Color::Cyan)),
            ]));
        }
        if let Some(link) = &snapshot.share_link {
            header.push(Line::from(Span::styled(link.clone(), dim())));
        }
        for player in &snapshot.roster {
            let mut spans = vec![Span::styled(player.name.clone(), bold())];
            if player.is_host {
                spans.push(Span::styled(" (host)", dim()));
            }
            if !player.online {
                spans.push(Span::styled(" offline", Style::default().fg(Color::Red)));
            }
            header.push(Line::from(spans));
        }
        Paragraph::new(header).render(chunks[0], buf);

        if snapshot.phase == Phase::Countdown {
            Paragraph::new(Span::styled(
                format!("Starting in {}", snapshot.lobby_remaining),
                bold().fg(Color::Yellow),
            ))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);
            return;
        }

        Paragraph::new(date_lines(app, snapshot)).render(chunks[1], buf);
        let waiting = snapshot.roster.len() < 2;
        let hint = match (snapshot.local_player_id == HOST_ID, waiting) {
            (true, true) => "waiting for a second player... / (r) back / (esc)ape",
            (true, false) => "(enter) start / (space) toggle / (r) back / (esc)ape",
            (false, _) => "waiting for the host to start... / (r) back / (esc)ape",
        };
        legend(hint).render(chunks[2], buf);
    }
}

/// One question with its options and the round clock
pub struct QuizScreen;

impl Screen for QuizScreen {
    fn render(&self, app: &App, snapshot: &Snapshot, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Min(4),
                Constraint::Length(2),
                Constraint::Length(1),
            ])
            .split(area);

        Paragraph::new(scoreline(snapshot))
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        Paragraph::new(Span::styled(
            format!(
                "question {}/{}",
                snapshot.question_index + 1,
                snapshot.question_count
            ),
            dim(),
        ))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

        let round_secs = app.session.settings().round_secs.max(1);
        let ratio = f64::from(snapshot.time_remaining) / f64::from(round_secs);
        let clock_color = match snapshot.time_remaining {
            0..=3 => Color::Red,
            4..=6 => Color::Yellow,
            _ => Color::Green,
        };
        Gauge::default()
            .gauge_style(Style::default().fg(clock_color))
            .ratio(ratio.clamp(0.0, 1.0))
            .label(format!("{}s", snapshot.time_remaining))
            .render(chunks[2], buf);

        let Some(word) = &snapshot.word else {
            Paragraph::new(Span::styled("skipping...", dim()))
                .alignment(Alignment::Center)
                .render(chunks[3], buf);
            return;
        };
        let mut prompt = vec![Line::from(Span::styled(word.clone(), bold().fg(Color::Cyan)))];
        if let Some(note) = &snapshot.note {
            prompt.push(Line::from(Span::styled(note.clone(), dim())));
        }
        Paragraph::new(prompt)
            .alignment(Alignment::Center)
            .render(chunks[3], buf);

        let local_answered = snapshot.answered[usize::from(snapshot.local_player_id - 1)];
        let width = usize::from(chunks[4].width).saturating_sub(6);
        let options: Vec<Line> = snapshot
            .options
            .iter()
            .enumerate()
            .map(|(i, option)| {
                let style = if local_answered { dim() } else { Style::default() };
                Line::from(vec![
                    Span::styled(format!("[{}] ", i + 1), bold()),
                    Span::styled(fit(option, width), style),
                ])
            })
            .collect();
        Paragraph::new(options)
            .wrap(Wrap { trim: true })
            .render(chunks[4], buf);

        if let Some(answer) = &snapshot.last_answer {
            let (verdict, color) = if answer.is_correct {
                ("correct", Color::Green)
            } else {
                ("wrong", Color::Red)
            };
            Paragraph::new(Line::from(vec![
                Span::styled(format!("{} ", answer.player_name), bold()),
                Span::styled(verdict, bold().fg(color)),
                Span::styled(format!(" ({})", answer.chosen_option), dim()),
            ]))
            .alignment(Alignment::Center)
            .render(chunks[5], buf);
        }

        let hint = match snapshot.mode {
            GameMode::Single => "(1-4) answer / (r)estart / (m)ute / (esc)ape",
            GameMode::Multi if local_answered => "waiting for the other player...",
            GameMode::Multi => "(1-4) answer / (r) leave / (m)ute / (esc)ape",
        };
        legend(hint).render(chunks[6], buf);
    }
}

/// Final scores and the winner
pub struct ResultScreen;

impl Screen for ResultScreen {
    fn render(&self, _app: &App, snapshot: &Snapshot, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(35),
                Constraint::Length(1),
                Constraint::Length(2),
                Constraint::Length(2),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(area);

        Paragraph::new(Span::styled("Game over", bold().fg(Color::Magenta)))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);

        Paragraph::new(scoreline(snapshot))
            .alignment(Alignment::Center)
            .render(chunks[2], buf);

        let verdict = match snapshot.standing {
            Some(Standing::Winner(id)) if id == snapshot.local_player_id => {
                Span::styled("You win!", bold().fg(Color::Green))
            }
            Some(Standing::Winner(id)) => {
                let name = snapshot
                    .roster
                    .iter()
                    .find(|p| p.id == id)
                    .map_or("The other player", |p| p.name.as_str());
                Span::styled(format!("{name} wins"), bold().fg(Color::Red))
            }
            Some(Standing::Tie) | None => Span::styled("It's a tie", bold().fg(Color::Yellow)),
        };
        Paragraph::new(verdict)
            .alignment(Alignment::Center)
            .render(chunks[3], buf);

        legend("(r)estart / (esc)ape").render(chunks[5], buf);
    }
}

/// Helper to construct the appropriate screen for the current phase
pub fn current_screen(phase: Phase) -> Box<dyn Screen> {
    match phase {
        Phase::Menu | Phase::Setup => Box::new(MenuScreen),
        Phase::Waiting | Phase::Countdown => Box::new(LobbyScreen),
        Phase::Playing => Box::new(QuizScreen),
        Phase::Result => Box::new(ResultScreen),
    }
}
