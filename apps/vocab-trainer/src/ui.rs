//! UI rendering for the vocabulary trainer.

use crate::app::{App, DrillStep, Feedback, View};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Row, Table, Wrap},
    Frame,
};
use srs_engine::{LevelChange, MASTERY_LEVEL};

pub fn draw(f: &mut Frame, app: &mut App) {
    match app.view {
        View::Home => draw_home(f, app),
        View::Practice | View::Drill => draw_quiz(f, app),
        View::DrillSetup => draw_drill_setup(f, app),
        View::Summary => draw_summary(f, app),
        View::DrillReport => draw_drill_report(f, app),
        View::Stats => draw_stats(f, app),
    }

    if app.show_help {
        draw_help(f);
    }

    if let Some(msg) = &app.message {
        draw_message(f, msg);
    }
}

fn draw_home(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
        .split(f.area());

    // Header
    let header = Paragraph::new("Vocab Trainer")
        .style(Style::default().add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, chunks[0]);

    // Overview
    let lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::raw("Hello, "),
            Span::styled(
                app.config.study.name.as_str(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("!"),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled(format!("{}", app.streak), Style::default().fg(Color::Yellow)),
            Span::raw(" day streak"),
        ]),
        Line::from(vec![
            Span::styled(format!("{}", app.due_today), Style::default().fg(Color::Cyan)),
            Span::raw(" words due for review"),
        ]),
        Line::from(vec![
            Span::styled(format!("{}", app.total_vocab), Style::default().fg(Color::Blue)),
            Span::raw(" words in the dictionary"),
        ]),
    ];
    let overview = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(" Today "));
    f.render_widget(overview, chunks[1]);

    // Footer
    let footer = Paragraph::new("p/Enter:Practice  d:Drill  s:Stats  ?:Help  q:Quit")
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, chunks[2]);
}

fn draw_quiz(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // progress
            Constraint::Min(0),    // word
            Constraint::Length(4), // feedback
            Constraint::Length(3), // answer input
            Constraint::Length(3), // footer
        ])
        .split(f.area());

    let (title, current, remaining, total) = match app.view {
        View::Drill => {
            let drill = app.drill.as_ref();
            (
                " Drill ",
                drill.and_then(|d| d.current()),
                drill.map_or(0, |d| d.remaining()),
                drill.map_or(0, |d| d.remaining()),
            )
        }
        _ => {
            let practice = app.practice.as_ref();
            (
                " Practice ",
                practice.and_then(|p| p.current()),
                practice.map_or(0, |p| p.remaining()),
                practice.map_or(0, |p| p.total()),
            )
        }
    };

    // Progress
    let progress_text = if app.view == View::Drill {
        format!("{} words left in the queue", remaining)
    } else {
        format!("{} of {} words left", remaining, total)
    };
    let progress = Paragraph::new(progress_text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(progress, chunks[0]);

    // Word being asked
    if let Some(entry) = current {
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                entry.source.as_str(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                entry.source_sentence.as_str(),
                Style::default().fg(Color::DarkGray),
            )),
        ];
        let word = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" Translate "))
            .wrap(Wrap { trim: true });
        f.render_widget(word, chunks[1]);
    }

    // Feedback on the previous answer
    let feedback = match &app.feedback {
        Some(Feedback::Correct { praise, sentence }) => Paragraph::new(vec![
            Line::from(Span::styled(
                praise.as_str(),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(sentence.as_str(), Style::default().fg(Color::DarkGray))),
        ]),
        Some(Feedback::Incorrect { expected, sentence }) => Paragraph::new(vec![
            Line::from(vec![
                Span::styled("The right answer is ", Style::default().fg(Color::Red)),
                Span::styled(
                    expected.as_str(),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(Span::styled(sentence.as_str(), Style::default().fg(Color::DarkGray))),
        ]),
        None => Paragraph::new(""),
    };
    f.render_widget(
        feedback
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL)),
        chunks[2],
    );

    // Answer input
    let input = Paragraph::new(app.input_buffer.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title(" Your answer "));
    f.render_widget(input, chunks[3]);
    f.set_cursor_position((
        chunks[3].x + 1 + app.input_buffer.len() as u16,
        chunks[3].y + 1,
    ));

    let footer = Paragraph::new("Enter:Submit  Ctrl+t:It was a typo  Esc:Pause")
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, chunks[4]);
}

fn draw_drill_setup(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
        .split(f.area());

    let header = Paragraph::new("Set Up a Drill")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, chunks[0]);

    let items: Vec<ListItem> = app
        .tags
        .iter()
        .enumerate()
        .map(|(i, tag)| {
            let style = if i == app.selected_tag {
                Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(tag.as_str(), style)))
        })
        .collect();
    let list =
        List::new(items).block(Block::default().borders(Borders::ALL).title(" Word group "));
    f.render_widget(list, chunks[1]);

    if app.drill_step == DrillStep::PickRange {
        let area = centered_rect(50, 15, f.area());
        f.render_widget(Clear, area);
        let input = Paragraph::new(app.input_buffer.as_str())
            .style(Style::default().fg(Color::Yellow))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Range by frequency rank, e.g. 0-20 "),
            );
        f.render_widget(input, area);
        f.set_cursor_position((area.x + 1 + app.input_buffer.len() as u16, area.y + 1));
    }

    let footer = Paragraph::new("j/k:Navigate  Enter:Select  Esc:Back")
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, chunks[2]);
}

fn draw_summary(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
        .split(f.area());

    let header = Paragraph::new("Session Complete")
        .style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, chunks[0]);

    let mut lines = Vec::new();
    if let Some(summary) = &app.summary {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::raw("Streak: "),
            Span::styled(
                format!("{} days", summary.streak),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
        ]));
        lines.push(Line::from(""));

        push_changes(&mut lines, "Moved up", &summary.upgrades, Color::Green);
        push_changes(&mut lines, "Moved down", &summary.downgrades, Color::Red);
        push_changes(&mut lines, "Unchanged", &summary.unchanged, Color::DarkGray);

        if !summary.first_completion {
            lines.push(Line::from(Span::styled(
                "Today's session was already counted.",
                Style::default().fg(Color::DarkGray),
            )));
        }
    }
    let body = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Results "))
        .wrap(Wrap { trim: true });
    f.render_widget(body, chunks[1]);

    let footer = Paragraph::new("Enter/q:Home")
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, chunks[2]);
}

fn push_changes(lines: &mut Vec<Line>, label: &str, changes: &[LevelChange], color: Color) {
    if changes.is_empty() {
        return;
    }
    lines.push(Line::from(Span::styled(
        format!("{} ({}):", label, changes.len()),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )));
    for change in changes {
        lines.push(Line::from(vec![
            Span::raw(format!("  {} = {}", change.entry.source, change.entry.target)),
            Span::styled(
                format!("  {} -> {}", change.level_pre, change.level_post),
                Style::default().fg(color),
            ),
        ]));
    }
    lines.push(Line::from(""));
}

fn draw_drill_report(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
        .split(f.area());

    let header = Paragraph::new("Drill Complete")
        .style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, chunks[0]);

    let mut lines = Vec::new();
    if let Some(summary) = &app.drill_summary {
        lines.push(Line::from(""));
        if !summary.perfect.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("First try ({}):", summary.perfect.len()),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )));
            for entry in &summary.perfect {
                lines.push(Line::from(format!("  {} = {}", entry.source, entry.target)));
            }
            lines.push(Line::from(""));
        }
        if !summary.needs_work.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("Needs work ({}):", summary.needs_work.len()),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )));
            for (entry, attempts) in &summary.needs_work {
                lines.push(Line::from(vec![
                    Span::raw(format!("  {} = {}", entry.source, entry.target)),
                    Span::styled(
                        format!("  ({} tries)", attempts),
                        Style::default().fg(Color::Red),
                    ),
                ]));
            }
        }
    }
    let body = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Results "))
        .wrap(Wrap { trim: true });
    f.render_widget(body, chunks[1]);

    let footer = Paragraph::new("Enter/q:Home")
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, chunks[2]);
}

fn draw_stats(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
        .split(f.area());

    let header = Paragraph::new("Statistics")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, chunks[0]);

    let rows: Vec<Row> = (1..=MASTERY_LEVEL)
        .map(|level| {
            let count = app.level_counts.get(&level).copied().unwrap_or(0);
            let label = if level >= MASTERY_LEVEL {
                format!("Level {} (mastered)", level)
            } else {
                format!("Level {}", level)
            };
            Row::new(vec![label, count.to_string()])
        })
        .collect();

    let table = Table::new(rows, [Constraint::Percentage(60), Constraint::Percentage(40)])
        .header(
            Row::new(vec!["Retention level", "Words"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title(format!(
            " {} due today | {} day streak ",
            app.due_today, app.streak
        )));
    f.render_widget(table, chunks[1]);

    let footer = Paragraph::new("q:Back  ?:Help")
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, chunks[2]);
}

fn draw_help(f: &mut Frame) {
    let area = centered_rect(60, 80, f.area());
    f.render_widget(Clear, area);

    let help = r#"
Vocab Trainer Keybindings

Home:
  p, Enter        Start today's practice
  d               Drill a range of words
  s               View statistics
  q               Quit

Practice / Drill:
  type + Enter    Submit your translation
  Ctrl+t          Mark the last miss as a typo
  Esc             Pause (practice resumes later today)

General:
  ?               Show this help

Press any key to close
"#;

    let popup = Paragraph::new(help)
        .block(Block::default().borders(Borders::ALL).title(" Help "))
        .wrap(Wrap { trim: false });
    f.render_widget(popup, area);
}

fn draw_message(f: &mut Frame, msg: &str) {
    let area = Rect::new(
        f.area().x + 2,
        f.area().height.saturating_sub(5),
        f.area().width.saturating_sub(4),
        3,
    );
    f.render_widget(Clear, area);

    let message = Paragraph::new(msg)
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(message, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
