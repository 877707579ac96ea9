//! Server-side paginated tables.
//!
//! A [`RemoteTable`] holds at most one page of rows. Every reload, page or
//! sort change produces a [`TableRequest`] tagged with a fresh draw number;
//! only the response to the most recent draw is ever applied.

use serde::Serialize;
use tracing::{debug, warn};

use crate::api::models::PageResponse;
use crate::error::DashError;
use crate::filters::FilterState;
use crate::query::QueryBuilder;
use crate::view::Chrome;

pub const DEFAULT_PAGE_LENGTH: usize = 100;

/// Upper bound sent with every rankings request.
const RANKINGS_LIMIT: &str = "5000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Rankings,
    Trials,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Field in each result row.
    pub data: &'static str,
    /// Field the server orders by.
    pub name: &'static str,
}

const RANKING_COLUMNS: &[Column] = &[
    Column { data: "sponsor_name", name: "sponsor__name" },
    Column { data: "due", name: "due" },
    Column { data: "reported", name: "reported" },
    Column { data: "percentage", name: "percentage" },
];

const TRIAL_COLUMNS: &[Column] = &[
    Column { data: "status", name: "status" },
    Column { data: "sponsor_name", name: "sponsor__name" },
    Column { data: "registry_id", name: "registry_id" },
    Column { data: "title", name: "title" },
    Column { data: "completion_date", name: "completion_date" },
    Column { data: "days_late", name: "days_late" },
];

impl ViewKind {
    pub fn name(&self) -> &'static str {
        match self {
            ViewKind::Rankings => "rankings",
            ViewKind::Trials => "trials",
        }
    }

    pub fn api_path(&self) -> &'static str {
        match self {
            ViewKind::Rankings => "/api/rankings/",
            ViewKind::Trials => "/api/trials/",
        }
    }

    pub fn csv_path(&self) -> &'static str {
        match self {
            ViewKind::Rankings => "/api/rankings.csv",
            ViewKind::Trials => "/api/trials.csv",
        }
    }

    pub fn columns(&self) -> &'static [Column] {
        match self {
            ViewKind::Rankings => RANKING_COLUMNS,
            ViewKind::Trials => TRIAL_COLUMNS,
        }
    }

    /// Percentage first (worst performers on top), ties by sponsor name.
    /// Trials sort by title.
    pub fn default_order(&self) -> Vec<SortKey> {
        match self {
            ViewKind::Rankings => vec![
                SortKey { column: 3, dir: SortDir::Asc },
                SortKey { column: 0, dir: SortDir::Asc },
            ],
            ViewKind::Trials => vec![SortKey { column: 3, dir: SortDir::Asc }],
        }
    }

    pub fn column_index(&self, field: &str) -> Option<usize> {
        self.columns()
            .iter()
            .position(|c| c.data == field || c.name == field)
    }

    fn fixed_params(&self, filters: &FilterState) -> Vec<(&'static str, String)> {
        match self {
            ViewKind::Rankings => {
                let mut params = vec![
                    ("limit", RANKINGS_LIMIT.to_string()),
                    ("due__gte", "1".to_string()),
                ];
                if !filters.show_all {
                    params.push(("sponsor__major", "true".to_string()));
                }
                params
            }
            ViewKind::Trials => Vec::new(),
        }
    }
}

impl std::str::FromStr for ViewKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rankings" => Ok(ViewKind::Rankings),
            "trials" => Ok(ViewKind::Trials),
            other => Err(format!("unknown view: {other} (use rankings or trials)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortKey {
    pub column: usize,
    pub dir: SortDir,
}

impl SortKey {
    /// Parse `field` or `field:asc|desc` against a view's columns.
    pub fn parse(view: ViewKind, arg: &str) -> Option<Self> {
        let (field, dir) = match arg.split_once(':') {
            Some((f, "desc")) => (f, SortDir::Desc),
            Some((f, "asc")) => (f, SortDir::Asc),
            Some(_) => return None,
            None => (arg, SortDir::Asc),
        };
        let column = view.column_index(field)?;
        Some(SortKey { column, dir })
    }
}

/// A request ready to hand to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRequest {
    pub draw: u64,
    pub path: &'static str,
    pub query: String,
}

/// What happened to a delivered response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Applied { rows: usize },
    Stale,
    Failed,
}

/// Paging, ordering and filters of one request.
#[derive(Debug, Clone, PartialEq)]
struct Window {
    start: usize,
    order: Vec<SortKey>,
    filters: FilterState,
}

#[derive(Debug, Clone)]
pub struct RemoteTable {
    view: ViewKind,
    page_length: usize,
    /// Window of the most recent request.
    pending: Window,
    /// Window the current rows were fetched with; `None` until a response
    /// has been applied.
    shown: Option<Window>,
    last_draw: u64,
    rows: Vec<serde_json::Value>,
    records_filtered: Option<u64>,
    records_total: Option<u64>,
}

impl RemoteTable {
    pub fn new(view: ViewKind, page_length: usize) -> Self {
        Self {
            view,
            page_length: page_length.max(1),
            pending: Window {
                start: 0,
                order: view.default_order(),
                filters: FilterState::default(),
            },
            shown: None,
            last_draw: 0,
            rows: Vec::new(),
            records_filtered: None,
            records_total: None,
        }
    }

    pub fn view(&self) -> ViewKind {
        self.view
    }

    pub fn rows(&self) -> &[serde_json::Value] {
        &self.rows
    }

    pub fn records_total(&self) -> Option<u64> {
        self.records_total
    }

    /// Rows matching the current filters, as last reported by the server.
    pub fn records(&self) -> u64 {
        self.records_filtered.unwrap_or(self.rows.len() as u64)
    }

    pub fn page_count(&self) -> usize {
        (self.records() as usize).div_ceil(self.page_length)
    }

    fn displayed(&self) -> &Window {
        self.shown.as_ref().unwrap_or(&self.pending)
    }

    /// Zero-based index of the page being shown.
    pub fn current_page(&self) -> usize {
        self.displayed().start / self.page_length
    }

    pub fn chrome(&self) -> Chrome {
        Chrome::for_pages(self.page_count(), self.displayed().filters.search.is_some())
    }

    /// New filters: back to the first page.
    pub fn reload(&mut self, filters: &FilterState) -> TableRequest {
        self.pending.filters = filters.clone();
        self.pending.start = 0;
        self.issue()
    }

    pub fn goto_page(&mut self, page: usize) -> TableRequest {
        self.pending.start = page.saturating_mul(self.page_length);
        self.issue()
    }

    pub fn sort_by(&mut self, order: Vec<SortKey>) -> TableRequest {
        if !order.is_empty() {
            self.pending.order = order;
        }
        self.pending.start = 0;
        self.issue()
    }

    fn issue(&mut self) -> TableRequest {
        self.last_draw += 1;
        let query = encode_params(&self.params(&self.pending, self.last_draw));
        debug!(view = self.view.name(), draw = self.last_draw, "issuing table request");
        TableRequest {
            draw: self.last_draw,
            path: self.view.api_path(),
            query,
        }
    }

    /// Full transport parameters for a request: paging and sort in the
    /// server's DataTables vocabulary, then view defaults, then filters.
    fn params(&self, window: &Window, draw: u64) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = vec![("draw".into(), draw.to_string())];

        for (i, col) in self.view.columns().iter().enumerate() {
            params.push((format!("columns[{i}][data]"), col.data.to_string()));
            params.push((format!("columns[{i}][name]"), col.name.to_string()));
        }
        for (k, key) in window.order.iter().enumerate() {
            params.push((format!("order[{k}][column]"), key.column.to_string()));
            params.push((format!("order[{k}][dir]"), key.dir.as_str().to_string()));
        }

        params.push(("start".into(), window.start.to_string()));
        params.push(("length".into(), self.page_length.to_string()));
        params.push((
            "search[value]".into(),
            window.filters.search.clone().unwrap_or_default(),
        ));

        for (k, v) in self.view.fixed_params(&window.filters) {
            params.push((k.to_string(), v));
        }
        for (k, v) in window.filters.api_params() {
            params.push((k.to_string(), v));
        }
        params
    }

    /// Query for the CSV export: same filters and ordering as the rows on
    /// show, but no paging, so the download covers the whole result set.
    pub fn export_query(&self) -> String {
        let params: Vec<(String, String)> = self
            .params(self.displayed(), self.last_draw)
            .into_iter()
            .filter(|(k, _)| !matches!(k.as_str(), "length" | "start" | "draw"))
            .collect();
        encode_params(&params)
    }

    pub fn export_link(&self) -> String {
        format!("{}?{}", self.view.csv_path(), self.export_query())
    }

    /// Deliver the response to request `draw`. Responses to anything but the
    /// most recent request are dropped. Failures keep the current rows along
    /// with the page, ordering and filters they were fetched with.
    pub fn complete(
        &mut self,
        draw: u64,
        response: Result<PageResponse, DashError>,
    ) -> Outcome {
        if draw != self.last_draw {
            debug!(
                view = self.view.name(),
                draw,
                latest = self.last_draw,
                "dropping stale response"
            );
            return Outcome::Stale;
        }
        match response {
            Ok(page) => {
                self.records_filtered = page.records_filtered;
                self.records_total = page.records_total;
                self.rows = page.results;
                self.shown = Some(self.pending.clone());
                Outcome::Applied {
                    rows: self.rows.len(),
                }
            }
            Err(e) => {
                warn!(view = self.view.name(), draw, "table fetch failed: {e}");
                Outcome::Failed
            }
        }
    }
}

fn encode_params(params: &[(String, String)]) -> String {
    let mut b = QueryBuilder::new();
    b.extend(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    b.finish()
}
