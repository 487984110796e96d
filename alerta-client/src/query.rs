//! Translation of command-line filter tokens into API query parameters.
//!
//! Filters take the forms `key=value`, `key!=value`, `key=~value` and `key!=~value`. The
//! backend reads the operator back out of the parameter itself: negation as a `!` suffix on
//! the key, substring matching as a `~` prefix on the value.

use std::collections::BTreeMap;

use tracing::debug;

pub const SORT_BY: &str = "sort-by";
pub const FROM_DATE: &str = "from-date";
pub const LIMIT: &str = "limit";
pub const FREE_TEXT: &str = "q";

/// Keys that are passed through verbatim instead of being read as filters.
const OPTION_KEYS: [&str; 4] = [LIMIT, SORT_BY, FROM_DATE, FREE_TEXT];

/// Ordering used when the caller does not ask for one, so that enumeration is stable.
pub const DEFAULT_SORT_BY: &str = "lastReceiveTime";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Match,
    NotMatch,
}

impl Operator {
    fn new(negated: bool, matching: bool) -> Self {
        match (negated, matching) {
            (false, false) => Self::Eq,
            (true, false) => Self::Ne,
            (false, true) => Self::Match,
            (true, true) => Self::NotMatch,
        }
    }

    pub fn is_negated(self) -> bool {
        matches!(self, Self::Ne | Self::NotMatch)
    }

    pub fn is_match(self) -> bool {
        matches!(self, Self::Match | Self::NotMatch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub key: String,
    pub op: Operator,
    pub value: String,
}

impl Filter {
    fn param_key(&self) -> String {
        if self.op.is_negated() {
            format!("{}!", self.key)
        } else {
            self.key.clone()
        }
    }

    /// The query-string pair the backend expects for this filter.
    pub fn to_param(&self) -> (String, String) {
        let value =
            if self.op.is_match() { format!("~{}", self.value) } else { self.value.clone() };
        (self.param_key(), value)
    }
}

/// A parsed filter expression plus the pass-through options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    filters: Vec<Filter>,
    options: BTreeMap<String, String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse filter tokens. Tokens without `=` or without a key are skipped.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut query = Self::new();
        for token in tokens {
            query.push_token(token.as_ref());
        }
        query
    }

    fn push_token(&mut self, token: &str) {
        let Some((lhs, rhs)) = token.split_once('=') else {
            debug!("ignoring filter without '=': {token}");
            return;
        };
        if OPTION_KEYS.contains(&lhs) {
            self.options.insert(lhs.to_owned(), rhs.to_owned());
            return;
        }

        let (key, negated) = match lhs.strip_suffix('!') {
            Some(key) => (key, true),
            None => (lhs, false),
        };
        if key.is_empty() {
            debug!("ignoring filter without a key: {token}");
            return;
        }
        let (value, matching) = match rhs.strip_prefix('~') {
            Some(value) => (value, true),
            None => (rhs, false),
        };
        self.push(Filter {
            key: key.to_owned(),
            op: Operator::new(negated, matching),
            value: value.to_owned(),
        });
    }

    /// Add a filter, replacing any earlier one that encodes to the same parameter.
    pub fn push(&mut self, filter: Filter) {
        let param_key = filter.param_key();
        self.filters.retain(|existing| existing.param_key() != param_key);
        self.filters.push(filter);
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    pub fn set_option(&mut self, key: &str, value: impl Into<String>) {
        self.options.insert(key.to_owned(), value.into());
    }

    /// Copy of the query restricted to records newer than `cursor`.
    pub fn with_from_date(&self, cursor: impl Into<String>) -> Self {
        let mut query = self.clone();
        query.set_option(FROM_DATE, cursor);
        query
    }

    /// Parameters for listing and counting alerts, sorted by receive time unless overridden.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = self.raw_params();
        if !self.options.contains_key(SORT_BY) {
            params.push((SORT_BY.to_owned(), DEFAULT_SORT_BY.to_owned()));
        }
        params
    }

    /// Parameters for the history endpoint, which has its own ordering.
    pub fn to_history_params(&self) -> Vec<(String, String)> {
        self.raw_params()
    }

    fn raw_params(&self) -> Vec<(String, String)> {
        self.filters
            .iter()
            .map(Filter::to_param)
            .chain(self.options.iter().map(|(k, v)| (k.clone(), v.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_operators() {
        let query = Query::from_tokens([
            "environment=Production",
            "severity!=critical",
            "resource=~web",
            "event!=~Http",
        ]);
        let ops: Vec<_> = query.filters().iter().map(|f| (f.key.as_str(), f.op)).collect();
        assert_eq!(
            ops,
            [
                ("environment", Operator::Eq),
                ("severity", Operator::Ne),
                ("resource", Operator::Match),
                ("event", Operator::NotMatch),
            ]
        );
        assert_eq!(query.filters()[3].value, "Http");

        let params = query.to_params();
        assert_eq!(param(&params, "environment"), Some("Production"));
        assert_eq!(param(&params, "severity!"), Some("critical"));
        assert_eq!(param(&params, "resource"), Some("~web"));
        assert_eq!(param(&params, "event!"), Some("~Http"));
    }

    #[test]
    fn test_negation_is_not_equality() {
        let query = Query::from_tokens(["severity!=critical"]);
        let filter = &query.filters()[0];
        assert_eq!(filter.key, "severity");
        assert_eq!(filter.op, Operator::Ne);
        assert_ne!(filter.op, Operator::Eq);
    }

    #[test]
    fn test_bare_tokens_are_dropped() {
        let query = Query::from_tokens(["web01", "=major", "!=x", "", "group=Web"]);
        assert_eq!(query.filters().len(), 1);
        assert_eq!(query.filters()[0].key, "group");
    }

    #[test]
    fn test_value_may_contain_equals() {
        let query = Query::from_tokens(["text=a=b"]);
        assert_eq!(query.filters()[0].value, "a=b");
    }

    #[test]
    fn test_default_sort_injected() {
        let params = Query::from_tokens(["group=Web"]).to_params();
        assert_eq!(param(&params, SORT_BY), Some(DEFAULT_SORT_BY));

        let params = Query::from_tokens(["sort-by=severity"]).to_params();
        assert_eq!(param(&params, SORT_BY), Some("severity"));
        assert_eq!(params.iter().filter(|(k, _)| k == SORT_BY).count(), 1);

        let params = Query::from_tokens(["group=Web"]).to_history_params();
        assert_eq!(param(&params, SORT_BY), None);
    }

    #[test]
    fn test_options_pass_through() {
        let query = Query::from_tokens(["limit=10", "q={\"severity\":\"major\"}", "from-date=x"]);
        assert!(query.filters().is_empty());
        assert_eq!(query.option(LIMIT), Some("10"));
        assert_eq!(query.option(FREE_TEXT), Some("{\"severity\":\"major\"}"));
        assert_eq!(query.option(FROM_DATE), Some("x"));
    }

    #[test]
    fn test_cursor_overrides_from_date() {
        let query = Query::from_tokens(["from-date=2024-01-01T00:00:00.000Z"]);
        let next = query.with_from_date("2024-05-20T09:15:42.999Z");
        assert_eq!(next.option(FROM_DATE), Some("2024-05-20T09:15:42.999Z"));
        assert_eq!(query.option(FROM_DATE), Some("2024-01-01T00:00:00.000Z"));
    }

    #[test]
    fn test_later_token_wins() {
        let query = Query::from_tokens(["severity=major", "severity!=minor", "severity=critical"]);
        let params = query.to_params();
        assert_eq!(param(&params, "severity"), Some("critical"));
        assert_eq!(param(&params, "severity!"), Some("minor"));
        assert_eq!(query.filters().len(), 2);
    }
}
