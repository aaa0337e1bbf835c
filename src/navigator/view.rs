//! Navigator rendering. Reads the state, never changes it.

use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph};
use ratatui::Frame;

use super::state::NavigatorState;
use crate::session::Target;
use crate::theme::Theme;

const BANNER: &str = r"    _   __     __  __
   / | / /__  / /_/ /_  __
  /  |/ / _ \/ __/ / / / /
 / /|  /  __/ /_/ / /_/ /
/_/ |_/\___/\__/_/\__, /
                 /____/";

const SPINNER: [&str; 8] = ["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

const PROMPT: &str = "→ ";

/// Draw the whole navigator screen
pub fn draw(f: &mut Frame, state: &NavigatorState, theme: &Theme, tick: usize) {
    let [banner, subtitle, body, footer] = Layout::vertical([
        Constraint::Length(7),
        Constraint::Length(2),
        Constraint::Min(6),
        Constraint::Length(1),
    ])
    .areas(f.area());

    f.render_widget(
        Paragraph::new(Text::styled(BANNER, theme.title_style())),
        banner,
    );
    f.render_widget(
        Paragraph::new(Line::styled(
            format!(
                "Modern Netcat Alternative v{} | by penguinshero",
                env!("CARGO_PKG_VERSION")
            ),
            theme.subtitle_style(),
        )),
        subtitle,
    );

    match state {
        NavigatorState::Menu { input } => draw_menu(f, body, input, theme),
        NavigatorState::ServerConfig { input } => draw_form(
            f,
            body,
            "LISTEN MODE (SERVER)",
            None,
            input,
            "Enter port (e.g., 4444)...",
            theme,
        ),
        NavigatorState::ClientHost { input } => draw_form(
            f,
            body,
            "CONNECT MODE (CLIENT)",
            None,
            input,
            "Enter host (e.g., 192.168.1.100)...",
            theme,
        ),
        NavigatorState::ClientPort { host, input } => draw_form(
            f,
            body,
            "CONNECT MODE (CLIENT)",
            Some(host.as_str()),
            input,
            "Enter port (e.g., 4444)...",
            theme,
        ),
        NavigatorState::Loading { target } => draw_loading(f, body, target, theme, tick),
        NavigatorState::Error { message } => draw_error(f, body, message, theme),
        NavigatorState::Help => {
            let full = f.area();
            draw_menu(f, body, "", theme);
            draw_help(f, full, theme);
        }
    }

    f.render_widget(
        Paragraph::new(Line::styled(footer_hint(state), theme.subtitle_style())),
        footer,
    );
}

fn footer_hint(state: &NavigatorState) -> &'static str {
    match state {
        NavigatorState::Menu { .. } => "Enter: select · ?: help · Ctrl+C: quit",
        NavigatorState::Loading { .. } => "Press 'q' or Ctrl+C to quit",
        NavigatorState::Error { .. } => "Enter/Esc: back to menu · q: quit",
        NavigatorState::Help => "Esc: close help · q: quit",
        _ => "Enter: submit · Esc: back to menu · Ctrl+C: quit",
    }
}

fn header(title: &str, theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(theme.info_style())
        .title(Line::styled(format!(" {} ", title), theme.info_style()).centered())
}

fn draw_menu(f: &mut Frame, area: Rect, input: &str, theme: &Theme) {
    let [title, entries, prompt] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(4),
        Constraint::Length(1),
    ])
    .areas(area);

    f.render_widget(header("SELECT OPERATION MODE", theme).borders(Borders::TOP), title);

    let entry = |number: &'static str, label: &'static str, ok: bool| {
        let style = if ok {
            theme.success_style()
        } else {
            theme.error_style()
        };
        Line::from(vec![Span::raw("  "), Span::styled(number, style), Span::raw(label)])
    };
    f.render_widget(
        Paragraph::new(vec![
            entry("1.", " Listen Mode (Server)    - Accept incoming connections", true),
            entry("2.", " Connect Mode (Client)   - Connect to remote host", true),
            entry("3.", " Exit", false),
        ]),
        entries,
    );

    draw_prompt(f, prompt, input, "Enter choice...", theme);
}

fn draw_form(
    f: &mut Frame,
    area: Rect,
    title: &str,
    host: Option<&str>,
    input: &str,
    placeholder: &str,
    theme: &Theme,
) {
    let [heading, target, prompt] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(2),
        Constraint::Length(1),
    ])
    .areas(area);

    f.render_widget(header(title, theme).borders(Borders::TOP), heading);

    if let Some(host) = host {
        f.render_widget(
            Paragraph::new(Line::from(vec![
                Span::raw("  Target: "),
                Span::styled(host.to_string(), theme.info_style()),
            ])),
            target,
        );
    }

    draw_prompt(f, prompt, input, placeholder, theme);
}

fn draw_prompt(f: &mut Frame, area: Rect, input: &str, placeholder: &str, theme: &Theme) {
    let text = if input.is_empty() {
        Span::styled(placeholder.to_string(), theme.subtitle_style())
    } else {
        Span::raw(input.to_string())
    };
    f.render_widget(
        Paragraph::new(Line::from(vec![Span::styled(PROMPT, theme.prompt_style()), text])),
        area,
    );

    let offset = (PROMPT.chars().count() + input.chars().count()) as u16;
    let x = area.x.saturating_add(offset).min(area.right().saturating_sub(1));
    f.set_cursor_position((x, area.y));
}

fn draw_loading(f: &mut Frame, area: Rect, target: &Target, theme: &Theme, tick: usize) {
    let status = match target {
        Target::Listen { port } => format!("Listening on port {}, waiting for connection...", port),
        Target::Dial { host, port } => format!("Connecting to {}:{}...", host, port),
    };
    let spinner = SPINNER[tick % SPINNER.len()];
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(spinner, theme.success_style()),
            Span::raw(" "),
            Span::styled(status, theme.info_style()),
        ])),
        area,
    );
}

fn draw_error(f: &mut Frame, area: Rect, message: &str, theme: &Theme) {
    f.render_widget(
        Paragraph::new(vec![
            Line::styled(format!("✗ Error: {}", message), theme.error_style()),
            Line::raw(""),
            Line::styled(
                "Press Enter or Esc to return to the menu, 'q' to quit",
                theme.prompt_style(),
            ),
        ]),
        area,
    );
}

fn draw_help(f: &mut Frame, area: Rect, theme: &Theme) {
    let [popup] = Layout::horizontal([Constraint::Length(62)])
        .flex(Flex::Center)
        .areas(area);
    let [popup] = Layout::vertical([Constraint::Length(13)])
        .flex(Flex::Center)
        .areas(popup);

    let lines = vec![
        Line::styled("Listen mode", theme.success_style()),
        Line::raw("  Waits on a port for one peer, then relays stdin/stdout."),
        Line::styled("Connect mode", theme.success_style()),
        Line::raw("  Dials host:port (10s timeout), then relays stdin/stdout."),
        Line::raw(""),
        Line::styled("Keys", theme.success_style()),
        Line::raw("  Enter   submit          Esc      back to menu"),
        Line::raw("  ?, F1   this help       Ctrl+C   quit"),
        Line::raw(""),
        Line::raw("  Direct use: netly listen <port> | netly connect <host> <port>"),
    ];

    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(lines).block(header("HELP", theme)),
        popup,
    );
}
