use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

pub const LOC_ID_PARAM: &str = "locId";
pub const TXT_PARAM: &str = "txt";
pub const MIN_RATE_PARAM: &str = "minRate";

pub const MAX_RATE: u8 = 5;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortField {
    Name,
    Rate,
    Created,
    Updated,
}

impl SortField {
    pub(crate) fn order_expr(self) -> &'static str {
        match self {
            SortField::Name => "name COLLATE NOCASE",
            SortField::Rate => "rate",
            SortField::Created => "created_at",
            SortField::Updated => "updated_at",
        }
    }

    /// Cycles none -> name -> rate -> created -> updated -> none.
    pub fn cycle(current: Option<SortField>) -> Option<SortField> {
        let mut fields = SortField::iter();
        match current {
            None => fields.next(),
            Some(field) => fields.skip_while(|f| *f != field).nth(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub(crate) fn sql(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// At most one active sort field; `None` keeps creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SortSpec {
    pub field: Option<SortField>,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn by(field: SortField, direction: SortDirection) -> Self {
        Self {
            field: Some(field),
            direction,
        }
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field {
            None => write!(f, "created order"),
            Some(field) => {
                let arrow = match self.direction {
                    SortDirection::Ascending => "asc",
                    SortDirection::Descending => "desc",
                };
                write!(f, "{field} {arrow}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub txt: String,
    pub min_rate: u8,
}

impl FilterSpec {
    pub fn new(txt: impl AsRef<str>, min_rate: i64) -> Self {
        Self {
            txt: txt.as_ref().trim().to_string(),
            min_rate: min_rate.clamp(0, i64::from(MAX_RATE)) as u8,
        }
    }

    pub fn normalized(&self) -> Self {
        Self::new(&self.txt, i64::from(self.min_rate))
    }

    pub fn is_empty(&self) -> bool {
        self.txt.is_empty() && self.min_rate == 0
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.txt.is_empty() || name.to_lowercase().contains(&self.txt.to_lowercase())
    }
}

/// Parses the filter bar: free text plus an optional `min:N` (or `>=N`) token.
pub fn parse_filter_input(input: &str) -> FilterSpec {
    let mut words = Vec::new();
    let mut min_rate = 0i64;
    for raw in input.split_whitespace() {
        let bound = raw
            .strip_prefix("min:")
            .or_else(|| raw.strip_prefix(">="))
            .and_then(|value| value.parse::<i64>().ok());
        match bound {
            Some(value) => min_rate = value,
            None => words.push(raw),
        }
    }
    FilterSpec::new(words.join(" "), min_rate)
}

/// Inverse of [`parse_filter_input`], used to pre-fill the filter bar.
pub fn format_filter_input(filter: &FilterSpec) -> String {
    match (filter.txt.is_empty(), filter.min_rate) {
        (true, 0) => String::new(),
        (false, 0) => filter.txt.clone(),
        (true, min) => format!("min:{min}"),
        (false, min) => format!("{} min:{min}", filter.txt),
    }
}

/// Ordered URL-style query parameters. Unknown keys are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryParams {
    params: IndexMap<String, String>,
}

impl QueryParams {
    pub fn parse(raw: &str) -> Self {
        let mut params = IndexMap::new();
        let raw = raw.trim();
        let raw = raw.split_once('?').map(|(_, query)| query).unwrap_or(raw);
        for pair in raw.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(key);
            let value = decode_component(value);
            if key.is_empty() || value.is_empty() {
                continue;
            }
            params.insert(key, value);
        }
        Self { params }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Empty values remove the key.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            self.params.shift_remove(key);
        } else {
            self.params.insert(key.to_string(), value);
        }
    }

    pub fn update<'a, I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (&'a str, String)>,
    {
        for (key, value) in pairs {
            self.set(key, value);
        }
    }

    pub fn loc_id(&self) -> Option<&str> {
        self.get(LOC_ID_PARAM)
    }

    pub fn set_loc_id(&mut self, id: Option<&str>) {
        self.set(LOC_ID_PARAM, id.unwrap_or_default());
    }

    pub fn filter(&self) -> FilterSpec {
        let min_rate = self
            .get(MIN_RATE_PARAM)
            .and_then(|value| value.parse::<i64>().ok())
            .unwrap_or(0);
        FilterSpec::new(self.get(TXT_PARAM).unwrap_or_default(), min_rate)
    }

    pub fn set_filter(&mut self, filter: &FilterSpec) {
        let min_rate = if filter.min_rate == 0 {
            String::new()
        } else {
            filter.min_rate.to_string()
        };
        self.update([(TXT_PARAM, filter.txt.clone()), (MIN_RATE_PARAM, min_rate)]);
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn to_query_string(&self) -> String {
        self.params
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(key),
                    urlencoding::encode(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn share_link(&self, base_url: &str) -> String {
        let query = self.to_query_string();
        if query.is_empty() {
            base_url.to_string()
        } else {
            format!("{base_url}?{query}")
        }
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(Cow::into_owned)
        .unwrap_or(spaced)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_field_cycles_back_to_creation_order() {
        let mut field = None;
        let mut seen = Vec::new();
        for _ in 0..5 {
            field = SortField::cycle(field);
            seen.push(field);
        }
        assert_eq!(
            seen,
            vec![
                Some(SortField::Name),
                Some(SortField::Rate),
                Some(SortField::Created),
                Some(SortField::Updated),
                None
            ]
        );
    }

    #[test]
    fn sort_field_parses_case_insensitively() {
        assert_eq!("Rate".parse::<SortField>().ok(), Some(SortField::Rate));
        assert_eq!(SortField::Updated.to_string(), "updated");
        assert_eq!(SortDirection::default().toggled(), SortDirection::Descending);
        assert_eq!(SortDirection::Descending.toggled(), SortDirection::Ascending);
    }

    #[test]
    fn filter_spec_normalizes_inputs() {
        let filter = FilterSpec::new("  park ", 9);
        assert_eq!(filter.txt, "park");
        assert_eq!(filter.min_rate, 5);
        assert_eq!(FilterSpec::new("", -3).min_rate, 0);
        assert!(filter.matches_name("Central PARK"));
        assert!(!filter.matches_name("Beach"));
    }

    #[test]
    fn filter_input_extracts_min_rate() {
        let filter = parse_filter_input("city park min:3");
        assert_eq!(filter, FilterSpec::new("city park", 3));
        assert_eq!(parse_filter_input(">=4").min_rate, 4);
        assert_eq!(format_filter_input(&filter), "city park min:3");
        assert_eq!(format_filter_input(&FilterSpec::default()), "");
    }

    #[test]
    fn query_params_round_trip_with_encoding() {
        let mut params = QueryParams::parse("?locId=abc&txt=central%20park&minRate=3");
        assert_eq!(params.loc_id(), Some("abc"));
        assert_eq!(params.filter(), FilterSpec::new("central park", 3));

        params.set(TXT_PARAM, "café & bar");
        assert_eq!(
            params.to_query_string(),
            "locId=abc&txt=caf%C3%A9%20%26%20bar&minRate=3"
        );
        let reparsed = QueryParams::parse(&params.to_query_string());
        assert_eq!(reparsed.get(TXT_PARAM), Some("café & bar"));
    }

    #[test]
    fn empty_value_removes_key() {
        let mut params = QueryParams::parse("locId=abc&txt=park");
        params.set_loc_id(None);
        params.set_filter(&FilterSpec::new("", 0));
        assert!(params.is_empty());
        assert_eq!(params.share_link("loctui://open"), "loctui://open");
    }

    #[test]
    fn parse_accepts_full_links_and_plus_spaces() {
        let params = QueryParams::parse("loctui://open?txt=big+park&other=1");
        assert_eq!(params.get(TXT_PARAM), Some("big park"));
        assert_eq!(params.get("other"), Some("1"));
        assert_eq!(params.loc_id(), None);
    }
}
