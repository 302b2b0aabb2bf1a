use crate::app::{App, Focus, Section};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

const SIDEBAR_WIDTH: u16 = 24;

/// Max scroll for help content (generous to account for text wrapping on small screens)
pub const HELP_CONTENT_LINES: u16 = 40;

/// Number of lines in controls content
pub const CONTROLS_CONTENT_LINES: u16 = 15;

/// A collapsed section keeps only its border and title
const COLLAPSED_HEIGHT: u16 = 2;

// UI color scheme
const BORDER_COLOR: Color = Color::Cyan;
const HIGHLIGHT_COLOR: Color = Color::Yellow;
const TEXT_COLOR: Color = Color::White;
const DIM_TEXT_COLOR: Color = Color::Gray;

/// Creates a standard styled block with rounded borders
fn styled_block<'a>(title: impl Into<Line<'a>>) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_COLOR))
        .title(title.into())
}

fn section_title(app: &App, section: Section, key: char) -> String {
    let marker = if app.is_collapsed(section) { '▸' } else { '▾' };
    format!(" {} {} ({}) ", marker, section.name(), key)
}

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    if app.fullscreen_mode {
        render_canvas(frame, area, app);
    } else {
        let layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
            .split(area);

        render_sidebar(frame, layout[0], app);
        render_canvas(frame, layout[1], app);
    }

    if app.show_help {
        render_help_overlay(frame, area, app);
    }
}

/// Canvas area inside its border, in terminal cells
pub fn canvas_area(frame_area: Rect, fullscreen: bool) -> Rect {
    let left = if fullscreen { 0 } else { SIDEBAR_WIDTH.min(frame_area.width) };
    let outer = Rect {
        x: frame_area.x + left,
        y: frame_area.y,
        width: frame_area.width - left,
        height: frame_area.height,
    };
    styled_block("").inner(outer)
}

/// Visible lines of the Controls box for a terminal of `height` rows
pub fn get_controls_visible_lines(app: &App, height: u16) -> u16 {
    let above = section_height(app, Section::Status) + section_height(app, Section::Field);
    height.saturating_sub(above).saturating_sub(2)
}

fn section_height(app: &App, section: Section) -> u16 {
    if app.is_collapsed(section) {
        return COLLAPSED_HEIGHT;
    }
    match section {
        Section::Status => 9,
        Section::Field => 10,
        Section::Controls => CONTROLS_CONTENT_LINES + 2,
    }
}

fn render_sidebar(frame: &mut Frame, area: Rect, app: &App) {
    let controls = if app.is_collapsed(Section::Controls) {
        Constraint::Length(COLLAPSED_HEIGHT)
    } else {
        Constraint::Min(COLLAPSED_HEIGHT)
    };
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(section_height(app, Section::Status)),
            Constraint::Length(section_height(app, Section::Field)),
            controls,
            Constraint::Min(0),
        ])
        .split(area);

    render_status_box(frame, sections[0], app);
    render_params_box(frame, sections[1], app);
    render_controls_box(frame, sections[2], app);
}

fn render_status_box(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(section_title(app, Section::Status, '1'));
    if app.is_collapsed(Section::Status) {
        frame.render_widget(block, area);
        return;
    }

    let field = &app.field;
    let (status_text, status_color) = if field.paused {
        ("PAUSED", HIGHLIGHT_COLOR)
    } else {
        ("RUNNING", Color::Green)
    };

    let stat = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{:<10}", label), Style::default().fg(DIM_TEXT_COLOR)),
            Span::styled(value, Style::default().fg(TEXT_COLOR)),
        ])
    };

    let mut content = vec![
        Line::from(Span::styled(status_text, Style::default().fg(status_color))),
        stat(
            "Particles",
            format!("{} / {}", field.persistent_count(), field.target_count()),
        ),
        stat("Trail", field.transient_count().to_string()),
        stat("Links", field.edges().len().to_string()),
        stat("Theme", field.theme().name().to_string()),
        stat("FPS", format!("{:.0}", app.fps)),
    ];
    if let Some(message) = &app.message {
        content.push(Line::from(Span::styled(
            message.clone(),
            Style::default().fg(HIGHLIGHT_COLOR),
        )));
    }

    let paragraph = Paragraph::new(content).block(block);
    frame.render_widget(paragraph, area);
}

fn render_params_box(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(section_title(app, Section::Field, '2'));
    if app.is_collapsed(Section::Field) {
        frame.render_widget(block, area);
        return;
    }

    let make_line = |label: &str, value: String, focused: bool| {
        let prefix = if focused { "> " } else { "  " };
        let style = if focused {
            Style::default().fg(HIGHLIGHT_COLOR)
        } else {
            Style::default().fg(TEXT_COLOR)
        };
        Line::from(Span::styled(format!("{}{}: {}", prefix, label, value), style))
    };

    let settings = app.field.settings();

    let content = vec![
        make_line(
            "Max",
            settings.max_particles.to_string(),
            app.focus == Focus::Particles,
        ),
        make_line(
            "Radius",
            format!("{:.0}", settings.mouse_radius),
            app.focus == Focus::Radius,
        ),
        make_line(
            "Trail",
            format!("{:.2}", settings.spawn_chance),
            app.focus == Focus::Chance,
        ),
        make_line(
            "Ripple",
            settings.ripple_count.to_string(),
            app.focus == Focus::Ripple,
        ),
        make_line(
            "Px/dot",
            format!("{:.1}", settings.pixels_per_dot),
            app.focus == Focus::Scale,
        ),
        make_line(
            "Links",
            settings.link_strategy.name().to_string(),
            app.focus == Focus::Links,
        ),
        make_line(
            "Style",
            settings.link_style.name().to_string(),
            app.focus == Focus::Style,
        ),
        make_line(
            "Glow",
            if settings.glow { "on" } else { "off" }.to_string(),
            app.focus == Focus::Glow,
        ),
    ];

    // Calculate scroll to keep focused item visible based on actual area
    let focus_line = app.focus.line_index();
    let visible_height = area.height.saturating_sub(2); // minus borders
    let content_height = content.len() as u16;

    let scroll = if visible_height == 0 || visible_height >= content_height {
        0
    } else if focus_line >= visible_height {
        focus_line.saturating_sub(visible_height - 1)
    } else {
        0
    };

    let paragraph = Paragraph::new(content)
        .block(block)
        .scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_controls_box(frame: &mut Frame, area: Rect, app: &App) {
    if app.is_collapsed(Section::Controls) {
        frame.render_widget(styled_block(section_title(app, Section::Controls, '3')), area);
        return;
    }

    let key_style = Style::default().fg(HIGHLIGHT_COLOR);
    let desc_style = Style::default().fg(DIM_TEXT_COLOR);

    // Helper to create a control line
    let make_control = |key: &str, desc: &str| -> Line<'static> {
        Line::from(vec![
            Span::styled(format!("{:>5}", key), key_style),
            Span::styled(format!(" {}", desc), desc_style),
        ])
    };

    let content = vec![
        make_control("Mouse", "trail + repel"),
        make_control("Click", "ripple"),
        make_control("C", "ripple at cursor"),
        make_control("T", "toggle theme"),
        make_control("Space", "pause/resume"),
        make_control("R", "reset"),
        make_control("L", "link strategy"),
        make_control("S", "link style"),
        make_control("G", "glow"),
        make_control("P", "save PNG"),
        make_control("V", "fullscreen"),
        make_control("1-3", "fold sections"),
        make_control("Tab", "select param"),
        make_control("H", "help"),
        make_control("Q", "quit"),
    ];

    let content_height = content.len() as u16;
    let visible_height = area.height.saturating_sub(2); // minus borders
    let max_scroll = content_height.saturating_sub(visible_height);
    let is_scrollable = max_scroll > 0;

    let marker = section_title(app, Section::Controls, '3');
    let title = if is_scrollable {
        format!("{}(↑↓) ", marker)
    } else {
        marker
    };

    let paragraph = Paragraph::new(content)
        .block(styled_block(title))
        .scroll((app.controls_scroll.min(max_scroll), 0));
    frame.render_widget(paragraph, area);
}

fn render_canvas(frame: &mut Frame, area: Rect, app: &App) {
    let background = app.surface.background().to_terminal();
    let block = styled_block("").style(Style::default().bg(background));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    for cell in app.surface.cells() {
        let x = inner.x + cell.x;
        let y = inner.y + cell.y;

        if x < inner.x + inner.width && y < inner.y + inner.height {
            let cell_rect = Rect {
                x,
                y,
                width: 1,
                height: 1,
            };
            let span = Span::styled(
                cell.char.to_string(),
                Style::default().fg(cell.color).bg(background),
            );
            let paragraph = Paragraph::new(Line::from(span));
            frame.render_widget(paragraph, cell_rect);
        }
    }
}

fn render_help_overlay(frame: &mut Frame, area: Rect, app: &App) {
    // Calculate the canvas area (exclude sidebar unless fullscreen)
    let canvas_x = if app.fullscreen_mode { 0 } else { SIDEBAR_WIDTH };
    let canvas_width = if app.fullscreen_mode {
        area.width
    } else {
        area.width.saturating_sub(SIDEBAR_WIDTH)
    };

    // Center the help dialog within the canvas
    let help_width = 56.min(canvas_width.saturating_sub(4));
    let help_height = area.height.saturating_sub(4).min(30);
    let x = canvas_x + (canvas_width.saturating_sub(help_width)) / 2;
    let y = (area.height.saturating_sub(help_height)) / 2;

    let help_area = Rect {
        x: area.x + x,
        y: area.y + y,
        width: help_width,
        height: help_height,
    };

    frame.render_widget(Clear, help_area);

    let content = vec![
        Line::from(""),
        Line::from(Span::styled("PARTICLE FIELD", Style::default().fg(BORDER_COLOR))),
        Line::from(""),
        Line::from("Drifting particles link up when they come close. Lines fade with distance."),
        Line::from(""),
        Line::from(Span::styled("POINTER:", Style::default().fg(HIGHLIGHT_COLOR))),
        Line::from("Moving leaves a short-lived trail and pushes nearby particles away. A click sends out a ring of sparks."),
        Line::from(""),
        Line::from(Span::styled("THEME:", Style::default().fg(HIGHLIGHT_COLOR))),
        Line::from("T switches light/dark. The choice is remembered between runs, as are folded sidebar sections."),
        Line::from(""),
        Line::from(Span::styled("LINKS:", Style::default().fg(HIGHLIGHT_COLOR))),
        Line::from("L picks exhaustive or grid pair search. S draws links as gradients between particle colors or in the theme's link color."),
        Line::from(""),
        Line::from(Span::styled("PARAMETERS:", Style::default().fg(HIGHLIGHT_COLOR))),
        Line::from("Tab/Shift+Tab select, Up/Down adjust. Px/dot sets how many field pixels one Braille dot covers."),
        Line::from(""),
        Line::from(Span::styled("BASIC CONTROLS:", Style::default().fg(HIGHLIGHT_COLOR))),
        Line::from("Space=Pause, R=Reset, G=Glow, P=Save PNG, V=Fullscreen, Q=Quit"),
        Line::from(""),
    ];

    let content_height = content.len() as u16;
    let visible_height = help_height.saturating_sub(2);
    let max_scroll = content_height.saturating_sub(visible_height);
    let is_scrollable = max_scroll > 0;

    let title = if is_scrollable {
        " Help (J/K scroll, H to close) "
    } else {
        " Help (H to close) "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(HIGHLIGHT_COLOR))
        .title(title);

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.help_scroll, 0));

    frame.render_widget(paragraph, help_area);
}
