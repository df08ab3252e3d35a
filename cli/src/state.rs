//! Local UI state for the browse view. No I/O; time is passed in.

use common::query::{ListParams, Sort, SortField, SortOrder};
use common::{Incident, Page, Severity, Status};
use std::time::{Duration, Instant};

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(1000);
pub const FLASH_TTL: Duration = Duration::from_secs(3);
pub const PAGE_SIZE: u32 = 10;

/// Columns the table can be sorted by, in the order Ctrl+O cycles them.
pub const SORT_COLUMNS: [SortField; 5] = [
    SortField::Title,
    SortField::Service,
    SortField::Severity,
    SortField::Status,
    SortField::CreatedAt,
];

/// Text input whose value only "settles" after a quiet period.
#[derive(Debug, Clone)]
pub struct Debounced {
    value: String,
    settled: String,
    last_edit: Option<Instant>,
    delay: Duration,
}

impl Debounced {
    pub fn new(delay: Duration) -> Self {
        Self {
            value: String::new(),
            settled: String::new(),
            last_edit: None,
            delay,
        }
    }

    pub fn push(&mut self, c: char, now: Instant) {
        self.value.push(c);
        self.last_edit = Some(now);
    }

    pub fn pop(&mut self, now: Instant) {
        if self.value.pop().is_some() {
            self.last_edit = Some(now);
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn settled(&self) -> &str {
        &self.settled
    }

    pub fn is_pending(&self) -> bool {
        self.last_edit.is_some()
    }

    /// Settles the live value once `delay` has passed since the last edit.
    /// Returns true when the settled value changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.last_edit {
            Some(at) if now.duration_since(at) >= self.delay => {
                self.last_edit = None;
                if self.settled != self.value {
                    self.settled = self.value.clone();
                    return true;
                }
                false
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Search,
    Service,
}

#[derive(Debug, Clone)]
pub enum View {
    Loading,
    Failed(String),
    Loaded(Page<Incident>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub message: String,
    pub success: bool,
    pub expires_at: Instant,
}

#[derive(Debug, Clone)]
pub struct BrowseState {
    pub search: Debounced,
    pub service: Debounced,
    pub severity: Option<Severity>,
    pub status: Option<Status>,
    pub sort: Sort,
    pub page: u32,
    pub limit: u32,
    pub focus: Focus,
    pub selected: usize,
    pub view: View,
    pub flash: Option<Flash>,
}

impl Default for BrowseState {
    fn default() -> Self {
        Self::new(PAGE_SIZE)
    }
}

impl BrowseState {
    pub fn new(limit: u32) -> Self {
        Self {
            search: Debounced::new(SEARCH_DEBOUNCE),
            service: Debounced::new(SEARCH_DEBOUNCE),
            severity: None,
            status: None,
            sort: Sort::default(),
            page: 1,
            limit,
            focus: Focus::Search,
            selected: 0,
            view: View::Loading,
            flash: None,
        }
    }

    fn focused(&mut self) -> &mut Debounced {
        match self.focus {
            Focus::Search => &mut self.search,
            Focus::Service => &mut self.service,
        }
    }

    pub fn type_char(&mut self, c: char, now: Instant) {
        self.focused().push(c, now);
    }

    pub fn backspace(&mut self, now: Instant) {
        self.focused().pop(now);
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Search => Focus::Service,
            Focus::Service => Focus::Search,
        };
    }

    /// Advances debounce timers. A settled change in either text filter
    /// sends the view back to page 1. Also expires the flash message.
    pub fn tick(&mut self, now: Instant) -> bool {
        let search_changed = self.search.poll(now);
        let service_changed = self.service.poll(now);
        if search_changed || service_changed {
            self.page = 1;
            self.selected = 0;
        }
        if self.flash.as_ref().is_some_and(|f| now >= f.expires_at) {
            self.flash = None;
        }
        search_changed || service_changed
    }

    pub fn cycle_severity(&mut self) {
        self.severity = match self.severity {
            None => Some(Severity::Sev1),
            Some(Severity::Sev1) => Some(Severity::Sev2),
            Some(Severity::Sev2) => Some(Severity::Sev3),
            Some(Severity::Sev3) => Some(Severity::Sev4),
            Some(Severity::Sev4) => None,
        };
        self.reset_page();
    }

    pub fn cycle_status(&mut self) {
        self.status = match self.status {
            None => Some(Status::Open),
            Some(Status::Open) => Some(Status::Mitigated),
            Some(Status::Mitigated) => Some(Status::Resolved),
            Some(Status::Resolved) => None,
        };
        self.reset_page();
    }

    /// Same column flips direction; a new column starts descending.
    pub fn sort_by(&mut self, field: SortField) {
        if self.sort.field == field {
            self.sort.order = self.sort.order.toggled();
        } else {
            self.sort = Sort { field, order: SortOrder::Desc };
        }
    }

    pub fn cycle_sort_column(&mut self) {
        let next = SORT_COLUMNS
            .iter()
            .position(|f| *f == self.sort.field)
            .map(|i| SORT_COLUMNS[(i + 1) % SORT_COLUMNS.len()])
            .unwrap_or(SORT_COLUMNS[0]);
        self.sort_by(next);
    }

    pub fn toggle_sort_order(&mut self) {
        self.sort_by(self.sort.field);
    }

    pub fn next_page(&mut self) {
        if let View::Loaded(ref page) = self.view {
            if (self.page as u64) < page.meta.total_pages {
                self.page += 1;
                self.selected = 0;
            }
        }
    }

    pub fn prev_page(&mut self) {
        if self.page > 1 {
            self.page -= 1;
            self.selected = 0;
        }
    }

    pub fn select_next(&mut self) {
        let rows = self.rows().len();
        if rows > 0 {
            self.selected = (self.selected + 1).min(rows - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn rows(&self) -> &[Incident] {
        match self.view {
            View::Loaded(ref page) => &page.data,
            _ => &[],
        }
    }

    pub fn selected_incident(&self) -> Option<&Incident> {
        self.rows().get(self.selected)
    }

    pub fn set_view(&mut self, view: View) {
        self.view = view;
        let rows = self.rows().len();
        if self.selected >= rows {
            self.selected = rows.saturating_sub(1);
        }
    }

    pub fn flash(&mut self, message: impl Into<String>, success: bool, now: Instant) {
        self.flash = Some(Flash {
            message: message.into(),
            success,
            expires_at: now + FLASH_TTL,
        });
    }

    fn reset_page(&mut self) {
        self.page = 1;
        self.selected = 0;
    }

    /// Request parameters for the settled state. Two states that should
    /// show the same rows produce equal parameters.
    pub fn params(&self) -> ListParams {
        let text = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());
        ListParams {
            page: Some(self.page.to_string()),
            limit: Some(self.limit.to_string()),
            search: text(self.search.settled()),
            severity: self.severity.map(|s| s.as_str().to_string()),
            status: self.status.map(|s| s.as_str().to_string()),
            service: text(self.service.settled()),
            sort_by: Some(self.sort.field.as_param().to_string()),
            sort_order: Some(self.sort.order.as_param().to_string()),
        }
    }
}
