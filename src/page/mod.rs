//! One dashboard page: its context, controls, remote table and history.
//!
//! [`Page`] is the control loop. Loading decodes the query and binds it;
//! user edits recompute the state, reload the table and push a history
//! entry; back/forward decode the entry they land on and rebind it the same
//! way a fresh load would.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::api::models::PageResponse;
use crate::api::Transport;
use crate::error::DashError;
use crate::filters::{FilterState, KNOWN_STATUSES};
use crate::history::History;
use crate::query::QueryBuilder;
use crate::table::{Outcome, RemoteTable, SortKey, TableRequest, ViewKind, DEFAULT_PAGE_LENGTH};
use crate::view::{ControlChange, ControlName, ControlSet, Input};

/// Everything a page knows that does not come from its query string.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub view: ViewKind,
    pub as_of: Option<NaiveDate>,
    pub sponsor_slug: Option<String>,
    pub page_length: usize,
    controls: ControlSet,
}

impl PageContext {
    pub fn new(view: ViewKind) -> Self {
        Self {
            view,
            as_of: None,
            sponsor_slug: None,
            page_length: DEFAULT_PAGE_LENGTH,
            controls: default_controls(view),
        }
    }

    /// The rankings page for one snapshot date.
    pub fn rankings(as_of: Option<NaiveDate>) -> Self {
        Self {
            as_of,
            ..Self::new(ViewKind::Rankings)
        }
    }

    pub fn trials() -> Self {
        Self::new(ViewKind::Trials)
    }

    /// A sponsor's page: the trials view scoped to one sponsor. A blank
    /// slug means no sponsor scope.
    pub fn sponsor(slug: &str) -> Self {
        let slug = slug.trim();
        Self {
            sponsor_slug: (!slug.is_empty()).then(|| slug.to_string()),
            ..Self::new(ViewKind::Trials)
        }
    }

    pub fn with_page_length(mut self, page_length: usize) -> Self {
        self.page_length = page_length;
        self
    }

    pub fn with_controls(mut self, controls: ControlSet) -> Self {
        self.controls = controls;
        self
    }

    pub fn path(&self) -> String {
        match (self.view, &self.sponsor_slug) {
            (ViewKind::Trials, Some(slug)) => format!("/sponsor/{slug}/"),
            (view, _) => format!("/{}/", view.name()),
        }
    }

    /// Overlay page-supplied values on a decoded state.
    fn merge(&self, mut state: FilterState) -> FilterState {
        if self.sponsor_slug.is_some() {
            state.sponsor_slug = self.sponsor_slug.clone();
        }
        if self.as_of.is_some() {
            state.as_of = self.as_of;
        }
        state
    }
}

fn default_controls(view: ViewKind) -> ControlSet {
    match view {
        ViewKind::Rankings => ControlSet::new()
            .with_text(ControlName::MinTotal)
            .with_radios(ControlName::IndustrySponsor, &["true", "false"])
            .with_radios(ControlName::TrialsDue, &["true", "false"])
            .with_text(ControlName::Search),
        ViewKind::Trials => ControlSet::new()
            .with_checkboxes(ControlName::Status, KNOWN_STATUSES)
            .with_text(ControlName::Search),
    }
}

#[derive(Debug, Clone)]
pub struct Page {
    ctx: PageContext,
    controls: ControlSet,
    state: FilterState,
    table: RemoteTable,
    history: History,
}

/// Serializable view of a page for `--json` output.
#[derive(Debug, Clone, Serialize)]
pub struct PageSnapshot<'a> {
    pub view: ViewKind,
    pub location: String,
    pub filters: &'a FilterState,
    pub page: usize,
    pub pages: usize,
    pub records: u64,
    pub records_total: Option<u64>,
    pub chrome: crate::view::Chrome,
    pub export_link: String,
    pub rows: &'a [serde_json::Value],
}

impl Page {
    /// Decode `query`, bind it to the controls, and return the request for
    /// the first page of rows.
    pub fn load(ctx: PageContext, query: &str) -> (Self, TableRequest) {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut page = Self {
            controls: ctx.controls.clone(),
            table: RemoteTable::new(ctx.view, ctx.page_length),
            state: FilterState::default(),
            history: History::new(query),
            ctx,
        };
        let request = page.bind(query);
        (page, request)
    }

    pub fn context(&self) -> &PageContext {
        &self.ctx
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn controls(&self) -> &ControlSet {
        &self.controls
    }

    pub fn table(&self) -> &RemoteTable {
        &self.table
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Current address: page path plus the query of the current history entry.
    pub fn location(&self) -> String {
        let query = &self.history.current().query;
        if query.is_empty() {
            self.ctx.path()
        } else {
            format!("{}?{query}", self.ctx.path())
        }
    }

    fn bind(&mut self, query: &str) -> TableRequest {
        self.state = self.ctx.merge(FilterState::decode(query));
        self.controls.apply(&self.state);
        self.table.reload(&self.state)
    }

    /// A user edit. Returns the reload request when the edit changed anything.
    pub fn input(&mut self, name: ControlName, input: Input) -> Option<TableRequest> {
        let change = self.controls.input(name, input)?;
        Some(self.on_control_change(change))
    }

    /// Recompute state from the controls, reload, then record the new
    /// address, all before returning.
    pub fn on_control_change(&mut self, change: ControlChange) -> TableRequest {
        self.state = self.ctx.merge(self.controls.read_into(&self.state));
        let request = self.table.reload(&self.state);
        let query = self.state.location_query();
        debug!(key = change.name.history_key(), %query, "pushing history entry");
        self.history.push(change.name.history_key(), query);
        request
    }

    /// Back/forward landed on `query`: rebind it as a fresh load would.
    pub fn on_pop_state(&mut self, query: &str) -> TableRequest {
        self.bind(query)
    }

    pub fn back(&mut self) -> Option<TableRequest> {
        let query = self.history.back()?.to_string();
        Some(self.on_pop_state(&query))
    }

    pub fn forward(&mut self) -> Option<TableRequest> {
        let query = self.history.forward()?.to_string();
        Some(self.on_pop_state(&query))
    }

    pub fn goto_page(&mut self, page: usize) -> TableRequest {
        self.table.goto_page(page)
    }

    pub fn sort_by(&mut self, order: Vec<SortKey>) -> TableRequest {
        self.table.sort_by(order)
    }

    /// Deliver a raw response body for request `draw`.
    pub fn receive(
        &mut self,
        draw: u64,
        response: Result<serde_json::Value, DashError>,
    ) -> Outcome {
        let page = response.and_then(|json| {
            serde_json::from_value::<PageResponse>(json).map_err(DashError::from)
        });
        self.table.complete(draw, page)
    }

    /// Issue `request` on `transport` and deliver the result.
    pub fn fetch(&mut self, transport: &dyn Transport, request: &TableRequest) -> Outcome {
        let response = transport.get_json(request.path, &request.query);
        self.receive(request.draw, response)
    }

    /// Query for `/api/performance/`: the status filter and sponsor.
    pub fn performance_query(&self) -> String {
        let mut b = QueryBuilder::new();
        if !self.state.statuses.is_empty() {
            let joined: Vec<&str> = self.state.statuses.iter().map(String::as_str).collect();
            b.push("status", joined.join(","));
        }
        b.push_opt("sponsor", self.state.sponsor_slug.as_deref());
        b.finish()
    }

    pub fn snapshot(&self) -> PageSnapshot<'_> {
        PageSnapshot {
            view: self.ctx.view,
            location: self.location(),
            filters: &self.state,
            page: self.table.current_page(),
            pages: self.table.page_count(),
            records: self.table.records(),
            records_total: self.table.records_total(),
            chrome: self.table.chrome(),
            export_link: self.table.export_link(),
            rows: self.table.rows(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::SponsorType;
    use crate::query::QueryString;

    #[test]
    fn sponsor_context_scopes_state_and_path() {
        let (page, req) = Page::load(PageContext::sponsor("acme"), "?status=overdue");
        assert_eq!(page.state().sponsor_slug.as_deref(), Some("acme"));
        assert_eq!(page.location(), "/sponsor/acme/?status=overdue");
        assert!(req.query.contains("sponsor=acme"));
        assert_eq!(page.performance_query(), "status=overdue&sponsor=acme");
    }

    #[test]
    fn blank_sponsor_slug_is_no_scope() {
        let ctx = PageContext::sponsor("");
        assert_eq!(ctx.sponsor_slug, None);
        assert_eq!(ctx.path(), "/trials/");

        let (page, req) = Page::load(ctx, "sponsor=");
        assert_eq!(page.state().sponsor_slug, None);
        assert_eq!(FilterState::decode(&page.state().encode()), *page.state());
        assert!(!QueryString::parse(&req.query).contains("sponsor"));
    }

    #[test]
    fn rankings_date_comes_from_context() {
        let date = NaiveDate::from_ymd_opt(2018, 3, 1);
        let (page, req) = Page::load(PageContext::rankings(date), "date=1999-01-01");
        assert_eq!(page.state().as_of, date);
        assert!(req.query.contains("date=2018-03-01"));
    }

    #[test]
    fn control_change_pushes_under_its_key() {
        let (mut page, first) = Page::load(PageContext::rankings(None), "");
        let req = page
            .input(ControlName::TrialsDue, Input::Select(Some("true".into())))
            .unwrap();
        assert!(req.draw > first.draw);
        assert_eq!(page.history().current().key, "with_trials_due");
        assert_eq!(page.location(), "/rankings/?with_trials_due=true");
        assert_eq!(page.state().industry_sponsor, None::<SponsorType>);
    }

    #[test]
    fn no_op_edit_issues_nothing() {
        let (mut page, _) = Page::load(PageContext::rankings(None), "min_total=4");
        assert!(page.input(ControlName::MinTotal, Input::Text("4".into())).is_none());
        assert_eq!(page.history().len(), 1);
    }
}
