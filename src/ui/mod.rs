pub mod layout;
pub mod renderer;
pub mod terminal;

pub use terminal::run_ui;

/// Dashboard tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Traffic,
    Dns,
}

impl Tab {
    pub const TITLES: [&'static str; 2] = ["Traffic", "DNS"];

    pub fn index(&self) -> usize {
        match self {
            Tab::Traffic => 0,
            Tab::Dns => 1,
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Tab::Traffic => Tab::Dns,
            Tab::Dns => Tab::Traffic,
        }
    }
}

/// Local navigation state; never shared with the state task.
#[derive(Debug, Default)]
pub struct UiState {
    pub tab: Tab,
    pub selected: usize,
}

impl UiState {
    pub fn switch_tab(&mut self) {
        self.tab = self.tab.next();
        self.selected = 0;
    }

    pub fn select_next(&mut self, len: usize) {
        if len > 0 {
            self.selected = (self.selected + 1).min(len - 1);
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Keep the cursor inside a collection that may have shrunk.
    pub fn clamp(&mut self, len: usize) {
        self.selected = self.selected.min(len.saturating_sub(1));
    }
}
