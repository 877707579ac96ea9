use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::query::{QueryBuilder, QueryString};

/// Trial statuses the API knows about.
pub const KNOWN_STATUSES: &[&str] = &[
    "overdue",
    "overdue-cancelled",
    "ongoing",
    "reported",
    "reported-late",
];

/// URL keys understood by the dashboard pages.
pub mod keys {
    pub const STATUS: &str = "status";
    pub const MIN_TOTAL: &str = "min_total";
    pub const INDUSTRY_SPONSOR: &str = "is_industry_sponsor";
    pub const TRIALS_DUE: &str = "with_trials_due";
    pub const SEARCH: &str = "q";
    pub const SPONSOR: &str = "sponsor";
    pub const DATE: &str = "date";
    pub const ALL: &str = "all";
}

/// Sponsor-type filter. Unset means "any sponsor".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SponsorType {
    Industry,
    NonIndustry,
}

impl SponsorType {
    pub fn as_param(&self) -> &'static str {
        match self {
            SponsorType::Industry => "true",
            SponsorType::NonIndustry => "false",
        }
    }

    pub fn from_param(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "true" => Some(SponsorType::Industry),
            "false" => Some(SponsorType::NonIndustry),
            _ => None,
        }
    }
}

/// Filters that drive both the visible controls and the remote table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterState {
    pub statuses: BTreeSet<String>,
    pub min_total: Option<u32>,
    pub industry_sponsor: Option<SponsorType>,
    pub trials_due: Option<bool>,
    pub search: Option<String>,
    /// Comes from the page path, never from a control.
    pub sponsor_slug: Option<String>,
    /// Reporting snapshot date supplied by the page.
    pub as_of: Option<NaiveDate>,
    /// Rankings only: lift the implicit major-sponsors restriction.
    pub show_all: bool,
}

impl FilterState {
    /// Decode a query string. Malformed values are treated as "not set".
    pub fn decode(query: &str) -> Self {
        let qs = QueryString::parse(query);

        let statuses = qs
            .values(keys::STATUS)
            .into_iter()
            .map(|v| v.decoded())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            statuses,
            min_total: qs.first(keys::MIN_TOTAL).and_then(|s| s.trim().parse().ok()),
            industry_sponsor: qs
                .first(keys::INDUSTRY_SPONSOR)
                .and_then(|s| SponsorType::from_param(&s)),
            trials_due: qs.first(keys::TRIALS_DUE).and_then(|s| parse_bool(&s)),
            search: qs.first(keys::SEARCH),
            sponsor_slug: qs.first(keys::SPONSOR),
            as_of: qs
                .first(keys::DATE)
                .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            show_all: qs
                .values(keys::ALL)
                .first()
                .is_some_and(|v| v.is_true()),
        }
    }

    /// Encode every field, page-context ones included.
    pub fn encode(&self) -> String {
        let mut b = self.location_builder();
        b.push_opt(keys::SPONSOR, self.sponsor_slug.as_deref())
            .push_opt(keys::DATE, self.as_of.map(|d| d.format("%Y-%m-%d").to_string()));
        b.finish()
    }

    /// The query written to the address bar. Sponsor and date belong to
    /// the page, so they are left out.
    pub fn location_query(&self) -> String {
        self.location_builder().finish()
    }

    fn location_builder(&self) -> QueryBuilder {
        let mut b = QueryBuilder::new();
        for status in self.statuses.iter().filter(|s| !s.is_empty()) {
            b.push(keys::STATUS, status);
        }
        b.push_opt(keys::MIN_TOTAL, self.min_total.map(|n| n.to_string()))
            .push_opt(
                keys::INDUSTRY_SPONSOR,
                self.industry_sponsor.map(|s| s.as_param()),
            )
            .push_opt(keys::TRIALS_DUE, self.trials_due.map(bool_param))
            .push_opt(keys::SEARCH, self.search.as_deref());
        if self.show_all {
            b.push_flag(keys::ALL);
        }
        b
    }

    /// Server-side filter parameters, in the API's own vocabulary.
    pub fn api_params(&self) -> Vec<(&'static str, String)> {
        let mut params: Vec<(&'static str, String)> = Vec::new();

        if !self.statuses.is_empty() {
            let joined: Vec<&str> = self.statuses.iter().map(String::as_str).collect();
            params.push(("status", joined.join(",")));
        }

        if let Some(n) = self.min_total {
            params.push(("total__gte", n.to_string()));
        }

        if let Some(s) = self.industry_sponsor {
            params.push(("sponsor__is_industry_sponsor", s.as_param().to_string()));
        }

        if let Some(due) = self.trials_due {
            params.push(("with_trials_due", bool_param(due).to_string()));
        }

        if let Some(ref q) = self.search {
            if !q.is_empty() {
                params.push(("q", q.clone()));
            }
        }

        if let Some(ref slug) = self.sponsor_slug {
            params.push(("sponsor", slug.clone()));
        }

        if let Some(date) = self.as_of {
            params.push(("date", date.format("%Y-%m-%d").to_string()));
        }

        params
    }
}

fn bool_param(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" => Some(true),
        "false" | "0" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_state() -> FilterState {
        FilterState {
            statuses: ["overdue", "reported-late"].iter().map(|s| s.to_string()).collect(),
            min_total: Some(5),
            industry_sponsor: Some(SponsorType::NonIndustry),
            trials_due: Some(true),
            search: Some("st mary's & co".to_string()),
            sponsor_slug: Some("acme-pharma".to_string()),
            as_of: NaiveDate::from_ymd_opt(2018, 12, 10),
            show_all: true,
        }
    }

    #[test]
    fn decode_inverts_encode() {
        let states = [
            FilterState::default(),
            full_state(),
            FilterState {
                trials_due: Some(false),
                industry_sponsor: Some(SponsorType::Industry),
                ..Default::default()
            },
            FilterState {
                statuses: ["ongoing".to_string()].into_iter().collect(),
                ..Default::default()
            },
            FilterState {
                show_all: true,
                ..Default::default()
            },
            FilterState {
                min_total: Some(0),
                ..Default::default()
            },
            FilterState {
                trials_due: Some(true),
                ..Default::default()
            },
            FilterState {
                as_of: NaiveDate::from_ymd_opt(2020, 2, 29),
                ..Default::default()
            },
            FilterState {
                search: Some("a+b=c 100% sure".to_string()),
                ..Default::default()
            },
            FilterState {
                search: Some("%2B already encoded?&x=1".to_string()),
                sponsor_slug: Some("st-mary's".to_string()),
                ..Default::default()
            },
        ];
        for s in states {
            assert_eq!(FilterState::decode(&s.encode()), s, "via {:?}", s.encode());
        }
    }

    #[test]
    fn decode_inverts_encode_for_each_single_field() {
        let full = full_state();
        let singles = [
            FilterState { statuses: full.statuses.clone(), ..Default::default() },
            FilterState { min_total: full.min_total, ..Default::default() },
            FilterState { industry_sponsor: full.industry_sponsor, ..Default::default() },
            FilterState { trials_due: full.trials_due, ..Default::default() },
            FilterState { search: full.search.clone(), ..Default::default() },
            FilterState { sponsor_slug: full.sponsor_slug.clone(), ..Default::default() },
            FilterState { as_of: full.as_of, ..Default::default() },
            FilterState { show_all: full.show_all, ..Default::default() },
        ];
        for s in singles {
            assert_eq!(FilterState::decode(&s.encode()), s);
        }
    }

    #[test]
    fn empty_text_fields_are_left_out() {
        let s = FilterState {
            sponsor_slug: Some(String::new()),
            search: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(s.encode(), "");
        assert_eq!(FilterState::decode(&s.encode()), FilterState::default());
    }

    #[test]
    fn location_query_leaves_out_page_context() {
        let s = full_state();
        let q = s.location_query();
        assert!(!q.contains("sponsor="));
        assert!(!q.contains("date="));
        let back = FilterState::decode(&q);
        assert_eq!(back.sponsor_slug, None);
        assert_eq!(back.statuses, s.statuses);
    }

    #[test]
    fn malformed_values_are_not_set() {
        let s = FilterState::decode("min_total=lots&is_industry_sponsor=maybe&date=yesterday&with_trials_due=");
        assert_eq!(s, FilterState::default());
    }

    #[test]
    fn bracketed_status_and_all_flag() {
        let s = FilterState::decode("?status[]=overdue&status[]=ongoing&all");
        assert!(s.show_all);
        assert_eq!(s.statuses.len(), 2);
        assert!(s.statuses.contains("ongoing"));
    }

    #[test]
    fn api_params_use_server_names() {
        let s = FilterState::decode("status=reported&status=overdue&min_total=5&is_industry_sponsor=true");
        let params = s.api_params();
        assert!(params.contains(&("status", "overdue,reported".to_string())));
        assert!(params.contains(&("total__gte", "5".to_string())));
        assert!(params.contains(&("sponsor__is_industry_sponsor", "true".to_string())));
    }

    #[test]
    fn unset_fields_are_omitted() {
        assert_eq!(FilterState::default().encode(), "");
        assert!(FilterState::default().api_params().is_empty());
    }
}
