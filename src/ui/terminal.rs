use {
    super::{layout::render_layout, Tab, UiState},
    crate::{
        blocklist::{submit_block, BlocklistController, BlocklistStore},
        projection::to_dns_row,
        state::LiveState,
    },
    crossterm::event::{self, Event, KeyCode, KeyEventKind},
    ratatui::{backend::CrosstermBackend, Terminal},
    std::{
        sync::Arc,
        time::{Duration, Instant},
    },
    tokio::sync::RwLock,
};

/// Run the TUI event loop
///
/// Handles keyboard input, terminal resize, and adaptive refresh throttling.
/// Block submissions run on their own task so the loop never waits on the
/// backend.
pub async fn run_ui(
    state: Arc<RwLock<LiveState>>,
    blocklist: Arc<RwLock<BlocklistController>>,
    store: Arc<dyn BlocklistStore>,
) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = std::io::stdout();
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    crossterm::terminal::enable_raw_mode()?;

    // Alternate screen keeps stderr logs off the dashboard
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::cursor::Hide
    )?;
    terminal.clear()?;

    let mut ui = UiState::default();

    // Track update rate for adaptive refresh
    let mut last_applied = 0;
    let mut last_refresh = Instant::now();
    let mut rate_samples = Vec::new();

    loop {
        let applied = state.read().await.applied_count();
        let since_last = applied.saturating_sub(last_applied);
        let elapsed = last_refresh.elapsed();

        if elapsed.as_secs_f64() > 0.0 {
            rate_samples.push(since_last as f64 / elapsed.as_secs_f64());
            if rate_samples.len() > 10 {
                rate_samples.remove(0);
            }
        }

        let avg_rate = if rate_samples.is_empty() {
            0.0
        } else {
            rate_samples.iter().sum::<f64>() / rate_samples.len() as f64
        };

        // min(1s, 250ms × (avg_rate / 10))
        let throttle_factor = (avg_rate / 10.0).max(1.0);
        let refresh_interval = Duration::from_millis(250)
            .mul_f64(throttle_factor)
            .min(Duration::from_secs(1));

        if event::poll(refresh_interval)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => break,
                        KeyCode::Tab => ui.switch_tab(),
                        KeyCode::Down | KeyCode::Char('j') => {
                            let len = visible_len(&*state.read().await, ui.tab);
                            ui.select_next(len);
                        }
                        KeyCode::Up | KeyCode::Char('k') => ui.select_previous(),
                        KeyCode::Char('b') if ui.tab == Tab::Dns => {
                            let domain = selected_domain(&*state.read().await, ui.selected);
                            if let Some(domain) = domain {
                                spawn_block(blocklist.clone(), store.clone(), domain);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        {
            let state = state.read().await;
            let blocklist = blocklist.read().await;
            ui.clamp(visible_len(&state, ui.tab));

            let area = terminal.size()?;
            terminal.draw(|f| render_layout(f, area, &state, &blocklist, &ui))?;
        }

        last_applied = applied;
        last_refresh = Instant::now();
    }

    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::cursor::Show
    )?;
    crossterm::terminal::disable_raw_mode()?;
    Ok(())
}

fn visible_len(state: &LiveState, tab: Tab) -> usize {
    match tab {
        Tab::Traffic => state.views().pair_counts().len(),
        Tab::Dns => state.views().dns_events().len(),
    }
}

/// Normalized domain of the selected DNS row, if it has one.
fn selected_domain(state: &LiveState, selected: usize) -> Option<String> {
    let row = to_dns_row(state.views().dns_events().get(selected)?);
    if row.domain_key.is_empty() {
        None
    } else {
        Some(row.domain_key)
    }
}

fn spawn_block(
    blocklist: Arc<RwLock<BlocklistController>>,
    store: Arc<dyn BlocklistStore>,
    domain: String,
) {
    tokio::spawn(async move {
        let outcome = submit_block(&blocklist, store.as_ref(), &domain).await;
        log::debug!("Block {}: {:?}", domain, outcome);
    });
}
