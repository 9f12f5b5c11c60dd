//! TUI 应用主循环
//!
//! 进入全屏/原始模式，轮询 state_rx、确认请求与键盘事件，将用户输入与快捷键转为 Command 发送给运行时，
//! 每帧用 draw 渲染 UiState 与输入缓冲。

use std::io::{self, Stdout};

use crossterm::event::KeyCode;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::core::{Command, UiState};
use crate::ui::event::{AppEvent, EventHandler};
use crate::ui::render::draw;
use crate::ui::ConfirmRequest;

/// 运行 TUI：启用原始模式与全屏，循环 poll 事件 + 渲染，退出时恢复终端
pub async fn run_app(
    state_rx: watch::Receiver<UiState>,
    confirm_rx: &mut mpsc::UnboundedReceiver<ConfirmRequest>,
    cmd_tx: mpsc::UnboundedSender<Command>,
    welcome: String,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(
        &mut terminal,
        state_rx,
        confirm_rx,
        cmd_tx,
        &welcome,
        shutdown,
    )
    .await;

    restore_terminal(&mut terminal)?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    state_rx: watch::Receiver<UiState>,
    confirm_rx: &mut mpsc::UnboundedReceiver<ConfirmRequest>,
    cmd_tx: mpsc::UnboundedSender<Command>,
    welcome: &str,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let event_handler = EventHandler::new(cmd_tx);
    let mut input_buffer = String::new();
    let mut conversation_scroll = 0usize;
    let mut last_transcript_len = 0usize;
    let mut pending_confirm: Option<ConfirmRequest> = None;

    while !shutdown.is_cancelled() {
        let state = state_rx.borrow().clone();

        if state.transcript.len() != last_transcript_len {
            last_transcript_len = state.transcript.len();
            conversation_scroll = usize::MAX;
        }

        if pending_confirm.is_none() {
            if let Ok(request) = confirm_rx.try_recv() {
                pending_confirm = Some(request);
            }
        }

        if let Some(ev) = event_handler.poll()? {
            match ev {
                AppEvent::Command(Command::Quit) => break,
                AppEvent::Command(_) => {}
                AppEvent::Key(key) if pending_confirm.is_some() => match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => {
                        if let Some(request) = pending_confirm.take() {
                            request.answer(true);
                        }
                    }
                    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                        if let Some(request) = pending_confirm.take() {
                            request.answer(false);
                        }
                    }
                    _ => {}
                },
                AppEvent::Key(key) => match key.code {
                    KeyCode::Enter if state.send_enabled => {
                        let input = std::mem::take(&mut input_buffer);
                        if matches!(input.trim().to_lowercase().as_str(), "/exit" | "/quit") {
                            event_handler.send_quit();
                            break;
                        }
                        if !input.trim().is_empty() {
                            event_handler.send_submit(input);
                        }
                    }
                    KeyCode::Backspace => {
                        input_buffer.pop();
                    }
                    KeyCode::Char(c) => {
                        input_buffer.push(c);
                    }
                    KeyCode::Up => {
                        conversation_scroll = conversation_scroll.saturating_sub(1);
                    }
                    KeyCode::Down => {
                        conversation_scroll = conversation_scroll.saturating_add(1);
                    }
                    KeyCode::PageUp => {
                        conversation_scroll = conversation_scroll.saturating_sub(10);
                    }
                    KeyCode::PageDown => {
                        conversation_scroll = conversation_scroll.saturating_add(10);
                    }
                    KeyCode::Home => {
                        conversation_scroll = 0;
                    }
                    KeyCode::End => {
                        conversation_scroll = usize::MAX;
                    }
                    _ => {}
                },
            }
        }

        let mut scroll_info = (0usize, 0usize);
        let confirm_prompt = pending_confirm.as_ref().map(|r| r.prompt.as_str());
        terminal.draw(|f| {
            draw(
                f,
                &state,
                welcome,
                &input_buffer,
                confirm_prompt,
                conversation_scroll,
                &mut scroll_info,
            );
        })?;
        let (total_lines, viewport_height) = scroll_info;
        let max_scroll = total_lines.saturating_sub(viewport_height);
        conversation_scroll = conversation_scroll.min(max_scroll);

        tokio::task::yield_now().await;
    }

    // 未回答的确认按拒绝处理
    if let Some(request) = pending_confirm.take() {
        request.answer(false);
    }
    Ok(())
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}
