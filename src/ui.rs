use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{block::Title, Block, BorderType, Borders, Paragraph, Wrap},
    Frame,
};
use tui_dispatch::{Component, EventKind, EventOutcome};
use tui_dispatch_components::style::BorderStyle;
use tui_dispatch_components::{
    BaseStyle, Padding, StatusBar, StatusBarHint, StatusBarItem, StatusBarProps,
    StatusBarSection, StatusBarStyle,
};

use crate::action::Action;
use crate::battle::{BattleState, FighterFlags, MAX_ROUNDS};
use crate::state::{format_name, AppState, Fighter, FighterProfile, Screen};

const BG_BASE: Color = Color::Rgb(22, 20, 30);
const BG_PANEL: Color = Color::Rgb(34, 30, 46);
const BG_PANEL_ALT: Color = Color::Rgb(28, 26, 40);
const TEXT_MAIN: Color = Color::Rgb(236, 232, 244);
const TEXT_DIM: Color = Color::Rgb(168, 160, 186);
const ACCENT_RED: Color = Color::Rgb(226, 88, 78);
const ACCENT_GOLD: Color = Color::Rgb(236, 196, 92);
const ACCENT_BLUE: Color = Color::Rgb(104, 160, 232);
const HIGHLIGHT_BG: Color = ACCENT_GOLD;
const HIGHLIGHT_TEXT: Color = Color::Rgb(24, 20, 14);
const BORDER_ACCENT: Color = Color::Rgb(86, 78, 110);

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];
const STAT_BAR_WIDTH: usize = 20;
const STAT_BAR_MAX: u16 = 180;

pub fn render(frame: &mut Frame, area: Rect, state: &AppState) {
    frame.render_widget(Block::default().style(Style::default().bg(BG_BASE)), area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(3),
        ])
        .split(area);

    render_header(frame, layout[0], state);
    match state.screen {
        Screen::List => render_list(frame, layout[1], state),
        Screen::Detail => render_detail(frame, layout[1], state),
        Screen::Battle => render_battle(frame, layout[1], state),
    }
    render_footer(frame, layout[2], state);
}

pub fn handle_event(event: &EventKind, state: &AppState) -> EventOutcome<Action> {
    match event {
        EventKind::Resize(width, height) => {
            EventOutcome::action(Action::UiTerminalResize(*width, *height)).with_render()
        }
        EventKind::Key(key) => EventOutcome::from(key_action(*key, state)),
        _ => EventOutcome::ignored(),
    }
}

/// Maps a key press to the action it triggers on the current screen.
pub fn key_action(key: KeyEvent, state: &AppState) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Action::Quit);
    }
    match key.code {
        KeyCode::Char('q') => return Some(Action::Quit),
        KeyCode::Char('1') => return Some(Action::ScreenShow(Screen::List)),
        KeyCode::Char('2') => return Some(Action::ScreenShow(Screen::Detail)),
        KeyCode::Char('3') => return Some(Action::ScreenShow(Screen::Battle)),
        KeyCode::Esc | KeyCode::Backspace => return Some(Action::ScreenBack),
        _ => {}
    }

    match state.screen {
        Screen::List => list_key(key, state),
        Screen::Detail => detail_key(key, state),
        Screen::Battle => battle_key(key, state),
    }
}

fn list_key(key: KeyEvent, state: &AppState) -> Option<Action> {
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => Some(Action::CursorMove(1)),
        KeyCode::Up | KeyCode::Char('k') => Some(Action::CursorMove(-1)),
        KeyCode::Home | KeyCode::Char('g') => Some(Action::CursorSet(0)),
        KeyCode::End | KeyCode::Char('G') => {
            Some(Action::CursorSet(state.roster.len().saturating_sub(1)))
        }
        KeyCode::PageDown | KeyCode::Char('n') => Some(Action::PageNext),
        KeyCode::PageUp | KeyCode::Char('p') => Some(Action::PagePrev),
        KeyCode::Char(' ') => Some(Action::SelectionToggle),
        KeyCode::Char('c') => Some(Action::SelectionClear),
        KeyCode::Char('r') => Some(Action::Init),
        KeyCode::Enter => Some(Action::DetailOpen),
        KeyCode::Char('b') => begin_battle(state),
        _ => None,
    }
}

fn detail_key(key: KeyEvent, state: &AppState) -> Option<Action> {
    match key.code {
        KeyCode::Char(' ') => Some(Action::SelectionToggle),
        KeyCode::Char('b') => begin_battle(state),
        _ => None,
    }
}

fn battle_key(key: KeyEvent, state: &AppState) -> Option<Action> {
    let battle = state.battle.as_ref()?;
    match key.code {
        KeyCode::Char('r') | KeyCode::Enter if battle.is_finished() => {
            Some(Action::BattleRestart)
        }
        _ => None,
    }
}

fn begin_battle(state: &AppState) -> Option<Action> {
    state
        .selection
        .can_begin()
        .then(|| Action::BattleOpen(state.selection.fighters().to_vec()))
}

fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
    let mut spans = vec![Span::styled(
        " POKEFIGHT ",
        Style::default()
            .fg(HIGHLIGHT_TEXT)
            .bg(ACCENT_RED)
            .add_modifier(Modifier::BOLD),
    )];
    for (index, (screen, label)) in [
        (Screen::List, "List"),
        (Screen::Detail, "Detail"),
        (Screen::Battle, "Battle"),
    ]
    .into_iter()
    .enumerate()
    {
        let style = if state.screen == screen {
            Style::default().fg(ACCENT_GOLD).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(TEXT_DIM)
        };
        spans.push(Span::raw("  "));
        spans.push(Span::styled(format!("{} {label}", index + 1), style));
    }
    if state.is_loading() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            spinner(state.tick),
            Style::default().fg(ACCENT_BLUE),
        ));
    }
    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(BG_PANEL_ALT));
    frame.render_widget(header, area);
}

fn render_list(frame: &mut Frame, area: Rect, state: &AppState) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(30), Constraint::Length(30)])
        .split(area);

    let title = format!(" FIGHTERS  page {} ", state.page_number());
    let block = panel_block(title, BG_PANEL);
    let inner = block.inner(layout[0]);
    frame.render_widget(block, layout[0]);

    let lines: Vec<Line> = if state.list_loading {
        vec![dim_line(format!("{} Loading fighters...", spinner(state.tick)))]
    } else if state.roster.is_empty() {
        vec![dim_line("No fighters loaded.".to_string())]
    } else {
        visible_rows(state, inner.height as usize)
            .map(|(index, fighter)| {
                roster_line(
                    fighter,
                    index == state.cursor,
                    state.selection.contains(fighter.id),
                )
            })
            .collect()
    };
    frame.render_widget(Paragraph::new(Text::from(lines)), inner);

    render_selection_panel(frame, layout[1], state);
}

/// Rows of the roster that fit in `height`, scrolled to keep the cursor visible.
fn visible_rows(state: &AppState, height: usize) -> impl Iterator<Item = (usize, &Fighter)> {
    let height = height.max(1);
    let start = (state.cursor + 1).saturating_sub(height);
    state.roster.iter().enumerate().skip(start).take(height)
}

fn roster_line(fighter: &Fighter, is_cursor: bool, is_selected: bool) -> Line<'static> {
    let marker = if is_selected { "[x]" } else { "[ ]" };
    let label = format!(
        "{marker} #{:03} {:<14} {:<9} ATK {:>3}",
        fighter.id,
        format_name(&fighter.name),
        fighter.kind,
        fighter.attack
    );
    let style = if is_cursor {
        Style::default()
            .fg(HIGHLIGHT_TEXT)
            .bg(HIGHLIGHT_BG)
            .add_modifier(Modifier::BOLD)
    } else if is_selected {
        Style::default().fg(ACCENT_GOLD)
    } else {
        Style::default().fg(TEXT_MAIN)
    };
    Line::from(Span::styled(label, style))
}

fn render_selection_panel(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel_block(" SELECTED ", BG_PANEL_ALT);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = Vec::new();
    for fighter in state.selection.fighters() {
        lines.push(Line::from(Span::styled(
            format_name(&fighter.name),
            Style::default().fg(ACCENT_GOLD).add_modifier(Modifier::BOLD),
        )));
        lines.push(dim_line(format!("{}  ATK {}", fighter.kind, fighter.attack)));
    }
    if state.selection.is_empty() {
        lines.push(dim_line("Space picks a fighter.".to_string()));
    }
    lines.push(Line::from(""));
    lines.push(if state.selection.can_begin() {
        Line::from(Span::styled(
            "b: Begin battle!",
            Style::default().fg(ACCENT_RED).add_modifier(Modifier::BOLD),
        ))
    } else {
        dim_line(format!(
            "{}/2 picked",
            state.selection.len()
        ))
    });
    let paragraph = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

fn render_detail(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel_block(" DETAIL ", BG_PANEL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = match (&state.profile, state.detail_loading) {
        (_, true) => vec![dim_line(format!("{} Loading fighter...", spinner(state.tick)))],
        (Some(profile), false) => profile_lines(profile, state.selection.contains(profile.fighter.id)),
        (None, false) => vec![dim_line("No data for this fighter.".to_string())],
    };
    let paragraph = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

fn profile_lines(profile: &FighterProfile, selected: bool) -> Vec<Line<'static>> {
    let fighter = &profile.fighter;
    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                format!("#{:03} ", fighter.id),
                Style::default().fg(TEXT_DIM),
            ),
            Span::styled(
                format_name(&fighter.name).to_ascii_uppercase(),
                Style::default().fg(ACCENT_GOLD).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                if selected { "  (selected)" } else { "" },
                Style::default().fg(ACCENT_RED),
            ),
        ]),
        Line::from(format!("Types: {}", profile.types.join(", "))),
        Line::from(format!(
            "Height: {:.1} m  Weight: {:.1} kg",
            f32::from(profile.height) / 10.0,
            f32::from(profile.weight) / 10.0
        )),
        Line::from(""),
    ];
    for stat in &profile.stats {
        lines.push(stat_line(&stat.name, stat.value));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(format!(
        "Abilities: {}",
        profile
            .abilities
            .iter()
            .map(|name| format_name(name))
            .collect::<Vec<_>>()
            .join(", ")
    )));
    lines.push(dim_line(format!(
        "Image: {}",
        fighter.image.as_deref().unwrap_or("none")
    )));
    lines
}

fn stat_line(name: &str, value: u16) -> Line<'static> {
    let filled = (usize::from(value.min(STAT_BAR_MAX)) * STAT_BAR_WIDTH) / usize::from(STAT_BAR_MAX);
    Line::from(vec![
        Span::styled(format!("{:<16}", format_name(name)), Style::default().fg(TEXT_DIM)),
        Span::styled(format!("{value:>3} "), Style::default().fg(TEXT_MAIN)),
        Span::styled("█".repeat(filled), Style::default().fg(ACCENT_BLUE)),
        Span::styled(
            "░".repeat(STAT_BAR_WIDTH - filled),
            Style::default().fg(TEXT_DIM),
        ),
    ])
}

fn render_battle(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(battle) = state.battle.as_ref() else {
        let block = panel_block(" BATTLE ", BG_PANEL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(
            Paragraph::new(dim_line("No battle running.".to_string())).alignment(Alignment::Center),
            inner,
        );
        return;
    };

    if let Some(advisory) = battle.advisory() {
        let block = panel_block(" BATTLE ", BG_PANEL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        let text = Text::from(vec![
            Line::from(""),
            Line::from(Span::styled(
                advisory,
                Style::default().fg(ACCENT_RED).add_modifier(Modifier::BOLD),
            )),
            dim_line("Esc returns to the list.".to_string()),
        ]);
        frame.render_widget(
            Paragraph::new(text)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            inner,
        );
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(4)])
        .split(area);
    let arena = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(layout[0]);

    for (index, slot) in arena.iter().enumerate() {
        if let Some(fighter) = battle.fighters.get(index) {
            let flags = battle.flags.get(index).copied().unwrap_or_default();
            render_fighter_panel(frame, *slot, fighter, flags);
        }
    }
    render_battle_log(frame, layout[1], battle);
}

fn render_fighter_panel(frame: &mut Frame, area: Rect, fighter: &Fighter, flags: FighterFlags) {
    let (badge, color) = if flags.winner {
        ("WINNER", ACCENT_GOLD)
    } else if flags.attacking {
        ("ATTACKING", ACCENT_BLUE)
    } else if flags.hit {
        ("HIT!", ACCENT_RED)
    } else {
        ("", BORDER_ACCENT)
    };
    let title = format!(" {} ", format_name(&fighter.name).to_ascii_uppercase());
    let block = panel_block(title, BG_PANEL).border_style(Style::default().fg(color));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = vec![
        dim_line(format!("#{:03}  {}", fighter.id, fighter.kind)),
        Line::from(format!("ATK {}", fighter.attack)),
        Line::from(Span::styled(
            badge,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
    ];
    frame.render_widget(
        Paragraph::new(Text::from(lines)).alignment(Alignment::Center),
        inner,
    );
}

fn render_battle_log(frame: &mut Frame, area: Rect, battle: &BattleState) {
    let title = format!(" ROUND {}/{} ", battle.round, MAX_ROUNDS);
    let block = panel_block(title, BG_PANEL_ALT);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines: Vec<Line> = battle
        .log
        .iter()
        .map(|entry| Line::from(entry.clone()))
        .collect();
    if battle.log.is_empty() {
        lines.push(dim_line("The fighters size each other up...".to_string()));
    }
    if let Some(winner) = battle.winner_fighter() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("{} is victorious. r: Rematch", format_name(&winner.name)),
            Style::default().fg(ACCENT_GOLD).add_modifier(Modifier::BOLD),
        )));
    }
    let overflow = lines.len().saturating_sub(inner.height as usize);
    let paragraph = Paragraph::new(Text::from(lines))
        .style(Style::default().fg(TEXT_MAIN))
        .scroll((overflow as u16, 0));
    frame.render_widget(paragraph, inner);
}

fn render_footer(frame: &mut Frame, area: Rect, state: &AppState) {
    let status = state.message.clone().unwrap_or_else(|| {
        if state.list_loading {
            "Loading fighters...".to_string()
        } else if state.detail_loading {
            "Loading fighter...".to_string()
        } else {
            String::new()
        }
    });
    let left_hints = status_hints(state);
    let center_hints = [StatusBarHint::new("1-3", "Screens"), StatusBarHint::new("q", "Quit")];
    let status_span = Span::styled(status.as_str(), Style::default().fg(ACCENT_GOLD));
    let status_items = [StatusBarItem::span(status_span)];

    let style = StatusBarStyle {
        base: BaseStyle {
            border: Some(BorderStyle {
                borders: Borders::ALL,
                style: Style::default().fg(TEXT_DIM),
                focused_style: Some(Style::default().fg(ACCENT_GOLD)),
            }),
            padding: Padding::xy(1, 0),
            bg: Some(BG_PANEL),
            fg: Some(TEXT_MAIN),
        },
        text: Style::default().fg(TEXT_DIM),
        hint_key: Style::default()
            .fg(ACCENT_GOLD)
            .add_modifier(Modifier::BOLD),
        hint_label: Style::default().fg(TEXT_DIM),
        separator: Style::default().fg(TEXT_DIM),
    };

    let props = StatusBarProps {
        left: StatusBarSection::hints(&left_hints).with_separator("  "),
        center: StatusBarSection::hints(&center_hints).with_separator("  "),
        right: StatusBarSection::items(&status_items).with_separator("  "),
        style,
        is_focused: false,
    };
    let mut status_bar = StatusBar::new();
    Component::<Action>::render(&mut status_bar, frame, area, props);
}

fn status_hints(state: &AppState) -> Vec<StatusBarHint<'static>> {
    match state.screen {
        Screen::List => {
            let mut hints = vec![
                StatusBarHint::new("j/k", "Move"),
                StatusBarHint::new("n/p", "Page"),
                StatusBarHint::new("Space", "Pick"),
                StatusBarHint::new("Enter", "Detail"),
            ];
            if state.selection.can_begin() {
                hints.push(StatusBarHint::new("b", "Battle"));
            }
            hints
        }
        Screen::Detail => vec![
            StatusBarHint::new("Space", "Pick"),
            StatusBarHint::new("Esc", "Back"),
        ],
        Screen::Battle => {
            let mut hints = vec![StatusBarHint::new("Esc", "Leave")];
            if state.battle.as_ref().is_some_and(|b| b.is_finished()) {
                hints.push(StatusBarHint::new("r", "Rematch"));
            }
            hints
        }
    }
}

fn panel_block<'a, T>(title: T, bg: Color) -> Block<'a>
where
    T: Into<Title<'a>>,
{
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(title)
        .style(Style::default().bg(bg).fg(TEXT_MAIN))
        .border_style(Style::default().fg(BORDER_ACCENT))
}

fn dim_line(text: String) -> Line<'static> {
    Line::from(Span::styled(text, Style::default().fg(TEXT_DIM)))
}

fn spinner(tick: u64) -> &'static str {
    SPINNER[(tick % SPINNER.len() as u64) as usize]
}
