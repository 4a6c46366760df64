use {
    super::{
        renderer::{action_color, category_color, control_style, status_style},
        Tab, UiState,
    },
    crate::{
        blocklist::BlocklistController,
        projection::{to_dns_row, to_pair_row},
        state::LiveState,
    },
    ratatui::{
        layout::{Alignment, Constraint, Direction, Layout as RatLayout, Rect},
        style::{Color, Modifier, Style},
        text::{Line, Span},
        widgets::{block::Title, Block, Borders, Cell, Paragraph, Row, Table, TableState, Tabs},
        Frame,
    },
};

const TITLE: &str = "Network Intelligence";

/// Render the main UI layout
pub fn render_layout(
    f: &mut Frame,
    area: Rect,
    state: &LiveState,
    blocklist: &BlocklistController,
    ui: &UiState,
) {
    let chunks = RatLayout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header + tabs
            Constraint::Min(0),    // Active table
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_header(f, chunks[0], state, ui);

    match ui.tab {
        Tab::Traffic => render_traffic_table(f, chunks[1], state, ui),
        Tab::Dns => render_dns_table(f, chunks[1], state, blocklist, ui),
    }

    render_footer(f, chunks[2], state, blocklist);
}

fn render_header(f: &mut Frame, area: Rect, state: &LiveState, ui: &UiState) {
    let status = state.status();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            TITLE,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
        .title(
            Title::from(Line::from(vec![
                Span::raw(" ● "),
                Span::styled(status.label(), status_style(status)),
                Span::raw(" "),
            ]))
            .alignment(Alignment::Right),
        );

    let tabs = Tabs::new(Tab::TITLES.to_vec())
        .block(block)
        .select(ui.tab.index())
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    f.render_widget(tabs, area);
}

fn render_traffic_table(f: &mut Frame, area: Rect, state: &LiveState, ui: &UiState) {
    let header = Row::new(vec!["Type", "Internal", "External", "Packets (in/out)"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let pairs = state.views().pair_counts();
    let rows: Vec<Row> = if pairs.is_empty() {
        vec![placeholder_row("Waiting for traffic...")]
    } else {
        pairs
            .iter()
            .map(to_pair_row)
            .map(|row| {
                let color = category_color(&row.category);
                Row::new(vec![
                    Cell::from(row.category).style(Style::default().fg(color)),
                    Cell::from(row.internal),
                    Cell::from(row.external),
                    Cell::from(row.packets),
                ])
            })
            .collect()
    };

    let widths = [
        Constraint::Length(10), // Type
        Constraint::Length(18), // Internal
        Constraint::Min(24),    // External
        Constraint::Length(18), // Packets
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("IP Traffic"))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut table_state = TableState::default();
    if !pairs.is_empty() {
        table_state.select(Some(ui.selected));
    }
    f.render_stateful_widget(table, area, &mut table_state);
}

fn render_dns_table(
    f: &mut Frame,
    area: Rect,
    state: &LiveState,
    blocklist: &BlocklistController,
    ui: &UiState,
) {
    let header = Row::new(vec!["Time", "Domain", "Direction", "Flow", "Action"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let events = state.views().dns_events();
    let rows: Vec<Row> = if events.is_empty() {
        vec![placeholder_row("Waiting for DNS events...")]
    } else {
        events
            .iter()
            .map(to_dns_row)
            .map(|row| {
                let mut domain = vec![Span::raw(row.domain)];
                if let Some(control) = blocklist.control_for(&row.domain_key) {
                    domain.push(Span::raw(" "));
                    domain.push(Span::styled(format!("[{}]", control.label()), control_style(control)));
                }
                let action_style = Style::default().fg(action_color(&row.action));

                Row::new(vec![
                    Cell::from(row.time),
                    Cell::from(Line::from(domain)),
                    Cell::from(row.direction),
                    Cell::from(row.flow),
                    Cell::from(row.action).style(action_style),
                ])
            })
            .collect()
    };

    let widths = [
        Constraint::Length(10), // Time
        Constraint::Min(30),    // Domain + control
        Constraint::Length(10), // Direction
        Constraint::Length(40), // Flow
        Constraint::Length(20), // Action
    ];

    let title = format!("DNS Activity ({}/{})", events.len(), state.views().max_dns_events());
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut table_state = TableState::default();
    if !events.is_empty() {
        table_state.select(Some(ui.selected));
    }
    f.render_stateful_widget(table, area, &mut table_state);
}

fn placeholder_row(text: &'static str) -> Row<'static> {
    Row::new(vec![Cell::from(text)]).style(Style::default().fg(Color::DarkGray))
}

fn render_footer(f: &mut Frame, area: Rect, state: &LiveState, blocklist: &BlocklistController) {
    let mut spans = vec![
        Span::styled("Pairs: ", Style::default().fg(Color::Cyan)),
        Span::raw(state.views().pair_counts().len().to_string()),
        Span::raw(" | "),
        Span::styled("DNS: ", Style::default().fg(Color::Cyan)),
        Span::raw(state.views().dns_events().len().to_string()),
        Span::raw(" | "),
        Span::styled("Blocked: ", Style::default().fg(Color::Cyan)),
        Span::raw(blocklist.confirmed().len().to_string()),
    ];
    if let Some(pending) = blocklist.pending() {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            format!("Blocking {}...", pending),
            Style::default().fg(Color::Yellow),
        ));
    }
    spans.push(Span::raw("   Tab: switch  ↑/↓: select  b: block  q/Esc: quit"));

    let footer = Block::default().borders(Borders::ALL).title("Status");
    f.render_widget(Paragraph::new(Line::from(spans)).block(footer), area);
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            aggregator::SeedData,
            state::StateMessage,
            types::{DnsEvent, PairCategory, TrafficPairCount},
        },
        ratatui::{backend::TestBackend, Terminal},
    };

    fn draw(state: &LiveState, blocklist: &BlocklistController, ui: &UiState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 16)).unwrap();
        terminal
            .draw(|f| {
                let area = f.size();
                render_layout(f, area, state, blocklist, ui)
            })
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_empty_views_show_placeholders() {
        let state = LiveState::default();
        let blocklist = BlocklistController::new();
        let mut ui = UiState::default();

        let screen = draw(&state, &blocklist, &ui);
        assert!(screen.contains("Network Intelligence"));
        assert!(screen.contains("offline"));
        assert!(screen.contains("Waiting for traffic..."));

        ui.switch_tab();
        assert!(draw(&state, &blocklist, &ui).contains("Waiting for DNS events..."));
    }

    #[test]
    fn test_rows_and_block_labels() {
        let mut state = LiveState::default();
        state.apply(StateMessage::Connected);
        state.apply(StateMessage::Seed(SeedData {
            pair_counts: vec![TrafficPairCount {
                category: PairCategory::External,
                internal: "10.0.0.5".to_string(),
                external: "8.8.8.8".to_string(),
                external_domain: None,
                incoming: 12,
                outgoing: 2,
            }],
            dns_events: vec![
                DnsEvent {
                    timestamp: "2024-01-01T00:00:02Z".to_string(),
                    domain: Some("ads.test".to_string()),
                    ..Default::default()
                },
                DnsEvent {
                    timestamp: "2024-01-01T00:00:01Z".to_string(),
                    domain: Some("docs.test".to_string()),
                    ..Default::default()
                },
            ],
        }));

        let mut blocklist = BlocklistController::new();
        blocklist.load(["ADS.test"]);

        let mut ui = UiState::default();
        let screen = draw(&state, &blocklist, &ui);
        assert!(screen.contains("live"));
        assert!(screen.contains("12/2"));

        ui.switch_tab();
        let screen = draw(&state, &blocklist, &ui);
        assert!(screen.contains("ads.test [Blocked]"));
        assert!(screen.contains("docs.test [Block]"));
    }
}
