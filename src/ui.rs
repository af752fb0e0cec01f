pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::app::App;
use crate::celebration::Confetti;
use crate::session::{Player, Snapshot, HOST_ID};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;

const CONFETTI_COLORS: [Color; 7] = [
    Color::Yellow,
    Color::Magenta,
    Color::Cyan,
    Color::Green,
    Color::Red,
    Color::Blue,
    Color::LightYellow,
];

pub fn draw(app: &App, f: &mut Frame) {
    let area = f.area();
    f.render_widget(app, area);
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let snapshot = self.session.snapshot();
        let inner = Rect {
            x: area.x + HORIZONTAL_MARGIN.min(area.width / 4),
            y: area.y + VERTICAL_MARGIN.min(area.height / 4),
            width: area.width.saturating_sub(2 * HORIZONTAL_MARGIN.min(area.width / 4)),
            height: area.height.saturating_sub(2 * VERTICAL_MARGIN.min(area.height / 4)),
        };

        screen::current_screen(snapshot.phase).render(self, &snapshot, inner, buf);
        render_footer(self, area, buf);

        if self.confetti.is_active() {
            render_confetti(&self.confetti, area, buf);
        }
    }
}

fn render_footer(app: &App, area: Rect, buf: &mut Buffer) {
    if area.height < 2 {
        return;
    }
    let line = match &app.status {
        Some(status) => Line::from(Span::styled(
            status.clone(),
            Style::default().fg(Color::Red).add_modifier(Modifier::ITALIC),
        )),
        None => Line::from(Span::styled(
            if app.is_muted() { "muted" } else { "" },
            Style::default().add_modifier(Modifier::DIM),
        )),
    };
    let footer = Rect {
        y: area.y + area.height - 1,
        height: 1,
        ..area
    };
    Paragraph::new(line)
        .alignment(Alignment::Right)
        .render(footer, buf);
}

fn render_confetti(confetti: &Confetti, area: Rect, buf: &mut Buffer) {
    for particle in &confetti.particles {
        if particle.x < 0.0 || particle.y < 0.0 {
            continue;
        }
        let (x, y) = (particle.x as u16, particle.y as u16);
        if x >= area.width || y >= area.height {
            continue;
        }

        let color = CONFETTI_COLORS[particle.color_index % CONFETTI_COLORS.len()];
        let freshness = particle.freshness();
        let style = if particle.anchored || freshness > 0.6 {
            Style::default().fg(color).add_modifier(Modifier::BOLD)
        } else if freshness > 0.25 {
            Style::default().fg(color)
        } else {
            Style::default().fg(color).add_modifier(Modifier::DIM)
        };

        if let Some(cell) = buf.cell_mut((area.x + x, area.y + y)) {
            cell.set_char(particle.symbol).set_style(style);
        }
    }
}

/// "Mei 40 : 25 Computer", with the local player's side in bold.
pub(crate) fn scoreline(snapshot: &Snapshot) -> Line<'static> {
    let name = |p: Option<&Player>| p.map(|p| p.name.clone()).unwrap_or_else(|| "?".into());
    let host = snapshot.roster.first();
    let guest = snapshot.roster.get(1);
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let plain = Style::default();
    let (host_style, guest_style) = if snapshot.local_player_id == HOST_ID {
        (bold, plain)
    } else {
        (plain, bold)
    };

    Line::from(vec![
        Span::styled(format!("{} {}", name(host), snapshot.scores[0]), host_style),
        Span::raw(" : "),
        Span::styled(format!("{} {}", snapshot.scores[1], name(guest)), guest_style),
    ])
}

/// Cut `text` to at most `width` terminal columns.
pub(crate) fn fit(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    for ch in text.chars() {
        let next = format!("{out}{ch}");
        if next.width() + 1 > width {
            break;
        }
        out = next;
    }
    out.push('…');
    out
}
