use std::cell::RefCell;
use std::collections::VecDeque;

use serde_json::{json, Value};
use trialdash::api::{self, Transport};
use trialdash::error::Result;
use trialdash::filters::KNOWN_STATUSES;
use trialdash::page::{Page, PageContext};
use trialdash::query::QueryString;
use trialdash::summary::SummaryCard;
use trialdash::table::{Outcome, ViewKind};
use trialdash::view::{ControlName, ControlSet, Input};
use trialdash::DashError;

/// Hands out canned responses in order and records every request.
#[derive(Default)]
struct ScriptedTransport {
    responses: RefCell<VecDeque<Result<Value>>>,
    calls: RefCell<Vec<(String, String)>>,
}

impl ScriptedTransport {
    fn with(responses: Vec<Result<Value>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            ..Default::default()
        }
    }
}

impl Transport for ScriptedTransport {
    fn get_json(&self, path: &str, query: &str) -> Result<Value> {
        self.calls
            .borrow_mut()
            .push((path.to_string(), query.to_string()));
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({ "results": [] })))
    }

    fn get_text(&self, path: &str, query: &str) -> Result<String> {
        self.calls
            .borrow_mut()
            .push((path.to_string(), query.to_string()));
        Ok(String::new())
    }
}

fn trial_rows(ids: &[&str]) -> Value {
    let results: Vec<Value> = ids
        .iter()
        .map(|id| json!({ "registry_id": id, "status": "overdue", "title": "t" }))
        .collect();
    json!({ "recordsFiltered": ids.len(), "recordsTotal": 100, "results": results })
}

fn registry_ids(page: &Page) -> Vec<String> {
    page.table()
        .rows()
        .iter()
        .map(|r| r["registry_id"].as_str().unwrap_or_default().to_string())
        .collect()
}

/// Query without its leading draw counter.
fn without_draw(query: &str) -> &str {
    query.split_once('&').map(|(_, rest)| rest).unwrap_or("")
}

#[test]
fn load_binds_statuses_and_minimum_then_requests_them() {
    let controls = ControlSet::new()
        .with_checkboxes(ControlName::Status, KNOWN_STATUSES)
        .with_text(ControlName::MinTotal);
    let ctx = PageContext::trials().with_controls(controls);

    let (page, request) = Page::load(ctx, "/?status=overdue&status=reported&min_total=5".split_once('?').unwrap().1);

    assert_eq!(page.controls().checked(ControlName::Status), vec!["overdue", "reported"]);
    assert_eq!(page.controls().text(ControlName::MinTotal), Some("5"));

    assert_eq!(request.path, "/api/trials/");
    let qs = QueryString::parse(&request.query);
    assert_eq!(qs.first("status").as_deref(), Some("overdue,reported"));
    assert_eq!(qs.first("total__gte").as_deref(), Some("5"));
    assert_eq!(qs.first("start").as_deref(), Some("0"));
}

#[test]
fn sponsor_type_change_updates_address_and_request() {
    let (mut page, first) = Page::load(PageContext::rankings(None), "");

    let request = page
        .input(ControlName::IndustrySponsor, Input::Select(Some("true".into())))
        .expect("edit should reload");

    assert!(request.draw > first.draw);
    assert_eq!(page.location(), "/rankings/?is_industry_sponsor=true");
    assert_eq!(page.history().current().key, "industry_sponsor");
    assert_eq!(page.history().len(), 2);

    let qs = QueryString::parse(&request.query);
    assert_eq!(qs.first("sponsor__is_industry_sponsor").as_deref(), Some("true"));
}

#[test]
fn late_response_from_earlier_request_is_ignored() {
    let (mut page, first) = Page::load(PageContext::trials(), "");
    let second = page
        .input(
            ControlName::Status,
            Input::Toggle {
                value: "reported".into(),
                checked: true,
            },
        )
        .unwrap();

    assert_eq!(
        page.receive(second.draw, Ok(trial_rows(&["NCT2"]))),
        Outcome::Applied { rows: 1 }
    );
    assert_eq!(
        page.receive(first.draw, Ok(trial_rows(&["NCT1a", "NCT1b"]))),
        Outcome::Stale
    );
    assert_eq!(registry_ids(&page), vec!["NCT2"]);
}

#[test]
fn back_and_forward_match_a_fresh_load() {
    let (mut page, _) = Page::load(PageContext::rankings(None), "");
    page.input(ControlName::MinTotal, Input::Text("5".into()));
    page.input(ControlName::IndustrySponsor, Input::Select(Some("false".into())));

    let back = page.back().expect("there is an earlier entry");
    let (fresh, fresh_request) = Page::load(PageContext::rankings(None), "min_total=5");
    assert_eq!(page.state(), fresh.state());
    assert_eq!(page.controls(), fresh.controls());
    assert_eq!(without_draw(&back.query), without_draw(&fresh_request.query));
    assert_eq!(page.location(), "/rankings/?min_total=5");

    page.forward().expect("there is a later entry");
    assert_eq!(
        page.controls().selected(ControlName::IndustrySponsor),
        Some("false")
    );
    // rebinding does not push anything
    assert_eq!(page.history().len(), 3);
}

#[test]
fn failed_fetch_keeps_previous_rows() {
    let transport = ScriptedTransport::with(vec![
        Ok(trial_rows(&["NCT1", "NCT2"])),
        Err(DashError::Status {
            status: 502,
            url: "/api/trials/".into(),
        }),
    ]);
    let (mut page, request) = Page::load(PageContext::trials(), "");
    assert_eq!(page.fetch(&transport, &request), Outcome::Applied { rows: 2 });

    let request = page.goto_page(1);
    assert_eq!(page.fetch(&transport, &request), Outcome::Failed);
    assert_eq!(registry_ids(&page), vec!["NCT1", "NCT2"]);
    assert_eq!(transport.calls.borrow().len(), 2);
}

#[test]
fn failed_page_change_leaves_footer_on_shown_rows() {
    let transport = ScriptedTransport::with(vec![
        Ok(json!({
            "recordsFiltered": 6,
            "results": [{ "registry_id": "A" }, { "registry_id": "B" }],
        })),
        Err(DashError::Status {
            status: 500,
            url: "/api/trials/".into(),
        }),
    ]);
    let (mut page, request) = Page::load(PageContext::trials().with_page_length(2), "");
    page.fetch(&transport, &request);
    let before = page.table().export_link();

    let request = page.goto_page(2);
    assert_eq!(page.fetch(&transport, &request), Outcome::Failed);
    assert_eq!(registry_ids(&page), vec!["A", "B"]);
    assert_eq!(page.table().current_page(), 0);
    assert_eq!(page.snapshot().page, 0);
    assert_eq!(page.table().export_link(), before);
}

#[test]
fn huge_page_number_does_not_panic() {
    let (mut page, _) = Page::load(PageContext::rankings(None), "");
    let request = page.goto_page(usize::MAX);
    let qs = QueryString::parse(&request.query);
    assert_eq!(qs.first("start"), Some(usize::MAX.to_string()));
}

#[test]
fn malformed_page_body_is_a_failed_fetch() {
    let transport = ScriptedTransport::with(vec![
        Ok(trial_rows(&["NCT1"])),
        Ok(json!({ "results": "not a list" })),
    ]);
    let (mut page, request) = Page::load(PageContext::trials(), "");
    page.fetch(&transport, &request);
    let request = page.goto_page(0);
    assert_eq!(page.fetch(&transport, &request), Outcome::Failed);
    assert_eq!(registry_ids(&page), vec!["NCT1"]);
}

#[test]
fn single_page_hides_paging_chrome() {
    let transport = ScriptedTransport::with(vec![Ok(json!({
        "recordsFiltered": 250,
        "results": [],
    }))]);
    let (mut page, request) = Page::load(PageContext::rankings(None).with_page_length(100), "");
    page.fetch(&transport, &request);
    assert_eq!(page.table().page_count(), 3);
    assert!(page.table().chrome().pagination);

    let request = page
        .input(ControlName::MinTotal, Input::Text("50".into()))
        .unwrap();
    page.fetch(&transport, &request);
    assert_eq!(page.table().page_count(), 0);
    assert!(!page.table().chrome().pagination);
    assert!(!page.table().chrome().search_box);
}

#[test]
fn export_link_targets_full_result_set() {
    let (page, _) = Page::load(PageContext::sponsor("acme"), "status=overdue");
    let link = page.table().export_link();
    let (path, query) = link.split_once('?').unwrap();
    assert_eq!(path, ViewKind::Trials.csv_path());
    let qs = QueryString::parse(query);
    assert!(!qs.contains("length"));
    assert!(!qs.contains("start"));
    assert_eq!(qs.first("sponsor").as_deref(), Some("acme"));
    assert_eq!(qs.first("status").as_deref(), Some("overdue"));
}

#[test]
fn performance_card_from_api() {
    let transport = ScriptedTransport::with(vec![
        Ok(json!({ "reported": 150, "due": 200, "fines_str": "$11,569" })),
        Ok(json!({ "reported": 0, "due": 0, "fines_str": "$0" })),
    ]);
    let (page, _) = Page::load(PageContext::sponsor("acme"), "status=overdue");

    let perf = api::fetch_performance(&transport, &page.performance_query()).unwrap();
    let card = SummaryCard::from_performance(&perf);
    assert_eq!(card.percent.as_deref(), Some("75.0%"));
    assert_eq!(card.fines.as_deref(), Some("$11,569"));

    let perf = api::fetch_performance(&transport, "").unwrap();
    assert_eq!(SummaryCard::from_performance(&perf).percent, None);

    let calls = transport.calls.borrow();
    assert_eq!(calls[0].0, "/api/performance/");
    assert_eq!(calls[0].1, "status=overdue&sponsor=acme");
}
