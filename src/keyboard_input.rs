use crate::coordinator::{ManualEntry, ScanCommand};
use crate::error::Result;
use crate::resolver::ScanType;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What a key press means in the current input mode
#[derive(Debug, Clone, PartialEq, Eq)]
enum KeyAction {
    Command(ScanCommand),
    BeginManual,
    Ignore,
}

/// Turns key presses into scanner commands.
///
/// `s` start, `x` stop, `r` retry, `m` type a code (Enter submits, Esc
/// cancels), `q`/Esc quit.
pub struct KeyboardInputHandler {
    commands: mpsc::Sender<ScanCommand>,
    entry_type: ScanType,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    pub fn new(commands: mpsc::Sender<ScanCommand>, entry_type: ScanType) -> Self {
        Self {
            commands,
            entry_type,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start listening for keyboard input on a blocking thread
    pub async fn start(&self) -> Result<()> {
        info!("Keyboard controls: [s]tart  [x] stop  [r]etry  [m]anual entry  [q]uit");

        let commands = self.commands.clone();
        let entry_type = self.entry_type;
        let cancellation_token = self.cancellation_token.clone();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            let mut manual: Option<String> = None;

            while !cancellation_token.is_cancelled() {
                let key = match event::poll(Duration::from_millis(100)) {
                    Ok(true) => match event::read() {
                        Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => key,
                        _ => continue,
                    },
                    Ok(false) => continue,
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                        continue;
                    }
                };

                let command = match manual.as_mut() {
                    Some(buffer) => match edit_manual(buffer, key) {
                        ManualEdit::Editing => None,
                        ManualEdit::Cancelled => {
                            info!("Manual entry cancelled");
                            manual = None;
                            None
                        }
                        ManualEdit::Submitted(code) => {
                            manual = None;
                            Some(ScanCommand::Manual(ManualEntry::new(code, entry_type)))
                        }
                    },
                    None => match key_action(key.code) {
                        KeyAction::Command(command) => Some(command),
                        KeyAction::BeginManual => {
                            info!("Type a code and press Enter (Esc cancels)");
                            manual = Some(String::new());
                            None
                        }
                        KeyAction::Ignore => {
                            debug!("Key pressed: {:?}", key.code);
                            None
                        }
                    },
                };

                if let Some(command) = command {
                    let quitting = command == ScanCommand::Shutdown;
                    if commands.blocking_send(command).is_err() {
                        debug!("Scanner no longer accepting commands");
                        break;
                    }
                    if quitting {
                        break;
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            }
            debug!("Keyboard input handler task exited");
        });

        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        // Give the polling thread a moment to restore the terminal
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = disable_raw_mode();

        Ok(())
    }
}

fn key_action(code: KeyCode) -> KeyAction {
    match code {
        KeyCode::Char('s') | KeyCode::Char(' ') => KeyAction::Command(ScanCommand::Start),
        KeyCode::Char('x') => KeyAction::Command(ScanCommand::Stop),
        KeyCode::Char('r') => KeyAction::Command(ScanCommand::Retry),
        KeyCode::Char('m') => KeyAction::BeginManual,
        KeyCode::Char('q') | KeyCode::Esc => KeyAction::Command(ScanCommand::Shutdown),
        _ => KeyAction::Ignore,
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ManualEdit {
    Editing,
    Cancelled,
    Submitted(String),
}

fn edit_manual(buffer: &mut String, key: KeyEvent) -> ManualEdit {
    match key.code {
        KeyCode::Enter => ManualEdit::Submitted(std::mem::take(buffer)),
        KeyCode::Esc => ManualEdit::Cancelled,
        KeyCode::Backspace => {
            buffer.pop();
            ManualEdit::Editing
        }
        KeyCode::Char(c) => {
            buffer.push(c);
            ManualEdit::Editing
        }
        _ => ManualEdit::Editing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_key_bindings() {
        assert_eq!(
            key_action(KeyCode::Char('s')),
            KeyAction::Command(ScanCommand::Start)
        );
        assert_eq!(
            key_action(KeyCode::Char('x')),
            KeyAction::Command(ScanCommand::Stop)
        );
        assert_eq!(
            key_action(KeyCode::Char('r')),
            KeyAction::Command(ScanCommand::Retry)
        );
        assert_eq!(key_action(KeyCode::Char('m')), KeyAction::BeginManual);
        assert_eq!(
            key_action(KeyCode::Esc),
            KeyAction::Command(ScanCommand::Shutdown)
        );
        assert_eq!(key_action(KeyCode::Char('z')), KeyAction::Ignore);
    }

    #[test]
    fn test_manual_entry_editing() {
        let mut buffer = String::new();
        for c in "MAT-0023x".chars() {
            assert_eq!(edit_manual(&mut buffer, press(KeyCode::Char(c))), ManualEdit::Editing);
        }
        edit_manual(&mut buffer, press(KeyCode::Backspace));
        edit_manual(&mut buffer, press(KeyCode::Char('1')));

        assert_eq!(
            edit_manual(&mut buffer, press(KeyCode::Enter)),
            ManualEdit::Submitted("MAT-00231".to_string())
        );
        assert!(buffer.is_empty());
        assert_eq!(edit_manual(&mut buffer, press(KeyCode::Esc)), ManualEdit::Cancelled);
    }

    #[tokio::test]
    async fn test_keyboard_handler_stop() {
        let (tx, _rx) = mpsc::channel(4);
        let handler = KeyboardInputHandler::new(tx, ScanType::Auto);

        assert!(!handler.cancellation_token.is_cancelled());
        handler.stop().await.unwrap();
        assert!(handler.cancellation_token.is_cancelled());
    }
}
