use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::App;
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize => {
            if app.follow_tail {
                app.scroll_chat_to_bottom();
            }
        }
        AppEvent::InputClosed => {
            tracing::warn!("terminal input closed, quitting");
            app.should_quit = true;
        }
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.show_model_picker {
        handle_model_picker(app, key);
    } else {
        handle_chat(app, key);
    }
}

fn handle_model_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Tab => app.close_model_picker(),
        KeyCode::Enter => app.select_model(),
        KeyCode::Down | KeyCode::Char('j') => app.model_picker_nav_down(),
        KeyCode::Up | KeyCode::Char('k') => app.model_picker_nav_up(),
        _ => {}
    }
}

fn handle_chat(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Esc => app.should_quit = true,

        // Shift+Enter only arrives on terminals with enhanced key reporting,
        // so Alt+Enter does the same thing
        KeyCode::Enter if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) => {
            if let Some(input) = app.conversation.input_mut() {
                input.newline();
            }
        }
        KeyCode::Enter => app.submit(),

        KeyCode::Tab => app.open_model_picker(),
        KeyCode::Char('o') if ctrl => app.open_model_picker(),
        KeyCode::Char('r') if ctrl => app.refresh_models(),

        KeyCode::PageUp => app.scroll_up(app.chat_height.max(2) / 2),
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(2) / 2),

        _ if ctrl => {}
        code => edit_input(app, code),
    }
}

fn edit_input(app: &mut App, code: KeyCode) {
    if code == KeyCode::End && app.conversation.input().text().is_empty() {
        app.follow();
        return;
    }

    // Input is locked while a reply is pending
    let Some(input) = app.conversation.input_mut() else {
        return;
    };

    match code {
        KeyCode::Char(c) => input.insert(c),
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.left(),
        KeyCode::Right => input.right(),
        KeyCode::Home => input.home(),
        KeyCode::End => input.end(),
        _ => {}
    }
}

fn handle_paste(app: &mut App, text: &str) {
    if app.show_model_picker {
        return;
    }
    if let Some(input) = app.conversation.input_mut() {
        for c in text.replace("\r\n", "\n").chars() {
            if c == '\r' {
                input.newline();
            } else {
                input.insert(c);
            }
        }
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}
