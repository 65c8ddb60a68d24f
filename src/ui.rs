use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use crate::app::App;
use crate::conversation::{Selection, Sender, ServerStatus};

const MAX_INPUT_ROWS: u16 = 6;

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                if !current_text.is_empty() {
                    spans.push(Span::raw(std::mem::take(&mut current_text)));
                }
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let input_rows = (app.conversation.input().text().split('\n').count() as u16)
        .clamp(1, MAX_INPUT_ROWS);

    // Main layout: header, transcript, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(input_rows + 2),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_transcript(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.show_model_picker {
        render_model_picker(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let server = match app.conversation.server() {
        ServerStatus::Unknown => Span::styled(" connecting ", Style::default().fg(Color::Gray)),
        ServerStatus::Reachable { version } if version.is_empty() => {
            Span::styled(" online ", Style::default().fg(Color::Green))
        }
        ServerStatus::Reachable { version } => {
            Span::styled(format!(" ollama {} ", version), Style::default().fg(Color::Green))
        }
        ServerStatus::Unreachable => Span::styled(" offline ", Style::default().fg(Color::Red)),
    };

    let title = Line::from(vec![
        Span::styled(" Ollama Chat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
        Span::raw(" "),
        server,
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);
    if app.follow_tail {
        app.scroll_chat_to_bottom();
    }

    let selection = app.conversation.catalog().selection();
    let model_style = match selection {
        Selection::Model(_) => Style::default().fg(Color::Cyan),
        Selection::Loading => Style::default().fg(Color::Gray),
        Selection::NoModels | Selection::Error(_) => Style::default().fg(Color::Red),
    };
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Line::from(vec![
            Span::raw(" Model: "),
            Span::styled(selection.label(), model_style),
            Span::raw(" "),
        ]));

    let mut lines: Vec<Line> = Vec::new();

    for msg in app.conversation.transcript().messages() {
        let label_style = match msg.sender() {
            Sender::User => Style::default().fg(Color::Cyan),
            Sender::Assistant => Style::default().fg(Color::Yellow),
            Sender::System => Style::default().fg(Color::Magenta),
        };
        lines.push(Line::from(Span::styled(
            format!("{}:", msg.sender().label()),
            label_style.add_modifier(Modifier::BOLD),
        )));

        for line in msg.text().lines() {
            match msg.sender() {
                Sender::Assistant => lines.push(parse_markdown_line(line)),
                Sender::System => lines.push(Line::from(Span::styled(
                    line.to_string(),
                    Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
                ))),
                Sender::User => lines.push(Line::from(line.to_string())),
            }
        }
        lines.push(Line::default());
    }

    if app.is_waiting() {
        lines.push(Line::from(Span::styled(
            "AI:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let enabled = app.conversation.accepts_input();
    let (border_color, title) = if enabled {
        (Color::Yellow, " Message (Enter send, Shift/Alt+Enter newline) ")
    } else {
        (Color::DarkGray, " Waiting for reply... ")
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let input = app.conversation.input();
    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;

    // Cursor row/column in characters
    let before_cursor: String = input.text().chars().take(input.cursor()).collect();
    let cursor_row = before_cursor.matches('\n').count();
    let cursor_col = before_cursor
        .rsplit('\n')
        .next()
        .map(|l| l.chars().count())
        .unwrap_or(0);

    // Scroll offsets to keep the cursor visible
    let row_offset = (cursor_row + 1).saturating_sub(inner_height.max(1));
    let col_offset = if inner_width == 0 || cursor_col < inner_width {
        0
    } else {
        cursor_col - inner_width + 1
    };

    let visible: Vec<Line> = input
        .text()
        .split('\n')
        .skip(row_offset)
        .take(inner_height)
        .map(|line| Line::from(line.chars().skip(col_offset).take(inner_width).collect::<String>()))
        .collect();

    let text_color = if enabled { Color::Cyan } else { Color::DarkGray };
    let paragraph = Paragraph::new(visible)
        .style(Style::default().fg(text_color))
        .block(input_block);

    frame.render_widget(paragraph, area);

    if enabled && !app.show_model_picker && inner_width > 0 && inner_height > 0 {
        frame.set_cursor_position((
            area.x + 1 + (cursor_col - col_offset) as u16,
            area.y + 1 + (cursor_row - row_offset) as u16,
        ));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let pairs: &[(&str, &str)] = if app.show_model_picker {
        &[(" j/k ", " nav "), (" Enter ", " select "), (" Esc ", " cancel ")]
    } else {
        &[
            (" Enter ", " send "),
            (" Tab ", " model "),
            (" ^R ", " reload models "),
            (" PgUp/PgDn ", " scroll "),
            (" Esc ", " quit "),
        ]
    };

    let hints: Vec<Span> = pairs
        .iter()
        .flat_map(|(key, label)| {
            [
                Span::styled(*key, key_style),
                Span::styled(*label, label_style),
            ]
        })
        .collect();

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

fn render_model_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let models = app.conversation.catalog().models();

    // Calculate popup size and position (centered)
    let popup_width = 50.min(area.width.saturating_sub(4));
    let popup_height = (models.len() as u16 + 2).min(area.height.saturating_sub(4));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Select Model ");

    let current = app.conversation.catalog().selected_model();
    let items: Vec<ListItem> = models
        .iter()
        .map(|model| {
            let style = if Some(model.as_str()) == current {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ", model)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.model_picker_state);
}
