//! 界面渲染
//!
//! 根据 UiState（健康状态、对话记录、输入中标记、发送开关）与 input_buffer 绘制：标题栏显示后端状态，
//! 主体为对话记录（按角色着色、按宽度换行，内容原样显示），底部为输入框与快捷键提示。

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};

use crate::core::{HealthStatus, Role, UiState};

/// 将内容按宽度换行，支持 UTF-8（按字符数，避免在 UTF-8 中间截断）
pub(crate) fn wrap_text(s: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![s.to_string()];
    }
    let mut lines = Vec::new();
    for para in s.split('\n') {
        let mut line = String::new();
        for ch in para.chars() {
            if line.chars().count() >= width {
                lines.push(std::mem::take(&mut line));
            }
            line.push(ch);
        }
        lines.push(line);
    }
    lines
}

/// 标题栏上的健康状态文字，已连接时带上模型名
pub(crate) fn health_title(state: &UiState) -> String {
    match (&state.health, &state.model) {
        (HealthStatus::Connected, Some(model)) => format!("{} ({})", state.health.label(), model),
        (status, _) => status.label().to_string(),
    }
}

fn health_color(status: HealthStatus) -> Color {
    match status {
        HealthStatus::Unknown => Color::DarkGray,
        HealthStatus::Connected => Color::Green,
        HealthStatus::Degraded => Color::Yellow,
        HealthStatus::Offline => Color::Red,
    }
}

/// 绘制一帧：上方对话区（标题 + 记录 + 滚动条），下方输入区；将 (总行数, 可视高度) 写入 out 供外部 clamp 滚动
pub fn draw(
    f: &mut Frame,
    state: &UiState,
    welcome: &str,
    input_buffer: &str,
    confirm_prompt: Option<&str>,
    conversation_scroll: usize,
    out: &mut (usize, usize),
) {
    let input_height = 5u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(input_height)])
        .split(f.area());

    let conv_area = chunks[0];
    let content_width = conv_area.width.saturating_sub(2).saturating_sub(1) as usize; // 边框 + 滚动条

    let title = format!(" Parley │ {} ", health_title(state));
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(health_color(state.health)));

    let mut text_lines: Vec<Line> = Vec::new();
    if state.transcript.is_empty() {
        for line in wrap_text(welcome, content_width.max(20)) {
            text_lines.push(Line::from(Span::styled(
                line,
                Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
            )));
        }
    }
    for (idx, m) in state.transcript.iter().enumerate() {
        if idx > 0 {
            text_lines.push(Line::from(Span::raw("")));
        }
        let (prefix, color) = match m.role {
            Role::User => ("You ", Color::Cyan),
            Role::Assistant => ("Bot ", Color::Green),
            Role::System => ("Sys ", Color::Gray),
        };
        let stamp = m.timestamp.format("%H:%M").to_string();
        let wrapped = wrap_text(&m.content, content_width.saturating_sub(4).max(20));
        for (i, line) in wrapped.into_iter().enumerate() {
            let pref = if i == 0 { prefix } else { "    " };
            let mut spans = vec![
                Span::styled(pref, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::raw(line),
            ];
            if i == 0 {
                spans.push(Span::styled(
                    format!("  {}", stamp),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            text_lines.push(Line::from(spans));
        }
    }
    if state.is_typing() {
        text_lines.push(Line::from(Span::raw("")));
        text_lines.push(Line::from(vec![
            Span::styled("Bot ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::styled("…", Style::default().fg(Color::DarkGray)),
        ]));
    }

    let content_height = conv_area.height.saturating_sub(2) as usize; // 边框
    let total_lines = text_lines.len();
    let max_scroll = total_lines.saturating_sub(content_height);
    let scroll_offset = conversation_scroll.min(max_scroll);

    let paragraph = Paragraph::new(Text::from(text_lines))
        .block(block)
        .scroll((scroll_offset as u16, 0));
    f.render_widget(paragraph, conv_area);

    if total_lines > content_height {
        let mut scrollbar_state = ScrollbarState::new(total_lines)
            .position(scroll_offset)
            .viewport_content_length(content_height);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .thumb_symbol("█")
            .track_symbol(Some("░"));
        f.render_stateful_widget(scrollbar, conv_area, &mut scrollbar_state);
    }

    let (input_prompt, border_color) = if let Some(prompt) = confirm_prompt {
        (format!(" {} ", prompt), Color::Magenta)
    } else if !state.send_enabled {
        (" 等待回复… ".to_string(), Color::DarkGray)
    } else {
        (" 输入 ".to_string(), Color::Blue)
    };

    let hint = " Enter 发送 │ ↑↓ PgUp/PgDn 滚动 │ Ctrl+L 清空 │ Ctrl+Q 退出 ";
    let input_block = Block::default()
        .title(input_prompt)
        .title_bottom(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let input = Paragraph::new(input_buffer)
        .block(input_block)
        .wrap(Wrap { trim: false })
        .style(if state.send_enabled {
            Style::default()
        } else {
            Style::default().fg(Color::DarkGray)
        });

    f.render_widget(input, chunks[1]);

    out.0 = total_lines;
    out.1 = content_height;
}
