//! Page controls and row decoration.
//!
//! Controls are plain values keyed by [`ControlName`]. Programmatic updates
//! through [`ControlSet::apply`] never report a change; user edits through
//! [`ControlSet::input`] do.

use serde::Serialize;

use crate::filters::{FilterState, SponsorType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlName {
    MinTotal,
    IndustrySponsor,
    TrialsDue,
    Status,
    Search,
}

impl ControlName {
    /// Key the history writer files an entry under.
    pub fn history_key(&self) -> &'static str {
        match self {
            ControlName::MinTotal => "min_total",
            ControlName::IndustrySponsor => "industry_sponsor",
            ControlName::TrialsDue => "with_trials_due",
            ControlName::Status => "status",
            ControlName::Search => "q",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub value: String,
    pub checked: bool,
}

impl Choice {
    fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
            checked: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Control {
    Text { value: String },
    CheckboxGroup { choices: Vec<Choice> },
    /// At most one choice is checked; none checked means "unset".
    RadioGroup { choices: Vec<Choice> },
}

/// A user edit to one control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Text(String),
    Toggle { value: String, checked: bool },
    Select(Option<String>),
}

/// Emitted when a user edit changed a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlChange {
    pub name: ControlName,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlSet {
    controls: Vec<(ControlName, Control)>,
    suppressed: bool,
}

impl ControlSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, name: ControlName) -> Self {
        self.controls.push((
            name,
            Control::Text {
                value: String::new(),
            },
        ));
        self
    }

    pub fn with_checkboxes(mut self, name: ControlName, values: &[&str]) -> Self {
        let choices = values.iter().map(|v| Choice::new(v)).collect();
        self.controls.push((name, Control::CheckboxGroup { choices }));
        self
    }

    pub fn with_radios(mut self, name: ControlName, values: &[&str]) -> Self {
        let choices = values.iter().map(|v| Choice::new(v)).collect();
        self.controls.push((name, Control::RadioGroup { choices }));
        self
    }

    pub fn get(&self, name: ControlName) -> Option<&Control> {
        self.controls
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, c)| c)
    }

    fn get_mut(&mut self, name: ControlName) -> Option<&mut Control> {
        self.controls
            .iter_mut()
            .find(|(n, _)| *n == name)
            .map(|(_, c)| c)
    }

    pub fn names(&self) -> impl Iterator<Item = ControlName> + '_ {
        self.controls.iter().map(|(n, _)| *n)
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Run `f` with change reporting switched off, restoring the previous
    /// setting afterwards.
    pub fn suppressing<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = std::mem::replace(&mut self.suppressed, true);
        let out = f(self);
        self.suppressed = previous;
        out
    }

    /// Set every control to reflect `state` without reporting changes.
    pub fn apply(&mut self, state: &FilterState) {
        self.suppressing(|set| {
            let min_total = state.min_total.map(|n| n.to_string()).unwrap_or_default();
            set.set_text(ControlName::MinTotal, min_total);
            set.set_text(
                ControlName::Search,
                state.search.clone().unwrap_or_default(),
            );
            set.select(
                ControlName::IndustrySponsor,
                state.industry_sponsor.map(|s| s.as_param()),
            );
            set.select(
                ControlName::TrialsDue,
                state.trials_due.map(|b| if b { "true" } else { "false" }),
            );
            if let Some(Control::CheckboxGroup { choices }) = set.get_mut(ControlName::Status) {
                for choice in choices.iter_mut() {
                    choice.checked = state.statuses.contains(&choice.value);
                }
            }
        });
    }

    /// Apply a user edit. Returns the change event, or `None` when the edit
    /// was a no-op, targeted a missing control, or events are suppressed.
    pub fn input(&mut self, name: ControlName, input: Input) -> Option<ControlChange> {
        let before = self.get(name)?.clone();
        match input {
            Input::Text(value) => self.set_text(name, value),
            Input::Toggle { value, checked } => {
                if let Some(Control::CheckboxGroup { choices }) = self.get_mut(name) {
                    if let Some(choice) = choices.iter_mut().find(|c| c.value == value) {
                        choice.checked = checked;
                    }
                }
            }
            Input::Select(value) => self.select(name, value.as_deref()),
        }
        let changed = self.get(name) != Some(&before);
        (changed && !self.suppressed).then_some(ControlChange { name })
    }

    fn set_text(&mut self, name: ControlName, new_value: String) {
        if let Some(Control::Text { value }) = self.get_mut(name) {
            *value = new_value;
        }
    }

    fn select(&mut self, name: ControlName, selected: Option<&str>) {
        if let Some(Control::RadioGroup { choices }) = self.get_mut(name) {
            for choice in choices.iter_mut() {
                choice.checked = Some(choice.value.as_str()) == selected;
            }
        }
    }

    pub fn text(&self, name: ControlName) -> Option<&str> {
        match self.get(name)? {
            Control::Text { value } => Some(value),
            _ => None,
        }
    }

    pub fn checked(&self, name: ControlName) -> Vec<&str> {
        match self.get(name) {
            Some(Control::CheckboxGroup { choices }) | Some(Control::RadioGroup { choices }) => {
                choices
                    .iter()
                    .filter(|c| c.checked)
                    .map(|c| c.value.as_str())
                    .collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn selected(&self, name: ControlName) -> Option<&str> {
        match self.get(name)? {
            Control::RadioGroup { .. } => self.checked(name).into_iter().next(),
            _ => None,
        }
    }

    /// Recompute filter state from the controls. Fields with no control on
    /// this page are carried over from `base`.
    pub fn read_into(&self, base: &FilterState) -> FilterState {
        let mut state = base.clone();
        for name in self.names() {
            match name {
                ControlName::MinTotal => {
                    state.min_total = self.text(name).and_then(|s| s.trim().parse().ok());
                }
                ControlName::Search => {
                    state.search = self
                        .text(name)
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string);
                }
                ControlName::IndustrySponsor => {
                    state.industry_sponsor = self.selected(name).and_then(SponsorType::from_param);
                }
                ControlName::TrialsDue => {
                    state.trials_due = self.selected(name).map(|v| v == "true");
                }
                ControlName::Status => {
                    state.statuses = self
                        .checked(name)
                        .into_iter()
                        .map(str::to_string)
                        .collect();
                }
            }
        }
        state
    }
}

/// Label class used to decorate a trial's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayClass {
    Danger,
    Success,
    Warning,
    Info,
}

impl DisplayClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayClass::Danger => "danger",
            DisplayClass::Success => "success",
            DisplayClass::Warning => "warning",
            DisplayClass::Info => "info",
        }
    }
}

pub fn status_class(status: &str) -> DisplayClass {
    match status {
        "overdue" => DisplayClass::Danger,
        "reported" => DisplayClass::Success,
        "reported-late" => DisplayClass::Warning,
        _ => DisplayClass::Info,
    }
}

/// Which table chrome is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Chrome {
    pub search_box: bool,
    pub pagination: bool,
    pub length_menu: bool,
    pub info: bool,
}

impl Chrome {
    /// Paging chrome only shows once there is more than one page. The search
    /// box also stays up while it holds text, so a search can be cleared.
    pub fn for_pages(pages: usize, search_active: bool) -> Self {
        let has_pages = pages > 1;
        Self {
            search_box: has_pages || search_active,
            pagination: has_pages,
            length_menu: has_pages,
            info: has_pages,
        }
    }
}
