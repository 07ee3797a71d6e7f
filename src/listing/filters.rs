// Filter state and its query-string codec.
// The query string is the only place filter state lives; views get a decoded
// FilterSpec by value and hand back new query strings for the caller to apply.

use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterKey {
    Brand,
    Model,
    Transmission,
    ConditionType,
    BodyType,
    FuelType,
    Location,
    OwnerType,
    MinPrice,
    MaxPrice,
    MinYear,
    MaxYear,
    MinMileage,
    MaxMileage,
    MinEngineCc,
    MaxEngineCc,
    Search,
    Sort,
}

impl FilterKey {
    pub const ALL: [FilterKey; 18] = [
        FilterKey::Brand,
        FilterKey::Model,
        FilterKey::Transmission,
        FilterKey::ConditionType,
        FilterKey::BodyType,
        FilterKey::FuelType,
        FilterKey::Location,
        FilterKey::OwnerType,
        FilterKey::MinPrice,
        FilterKey::MaxPrice,
        FilterKey::MinYear,
        FilterKey::MaxYear,
        FilterKey::MinMileage,
        FilterKey::MaxMileage,
        FilterKey::MinEngineCc,
        FilterKey::MaxEngineCc,
        FilterKey::Search,
        FilterKey::Sort,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterKey::Brand => "brand",
            FilterKey::Model => "model",
            FilterKey::Transmission => "transmission",
            FilterKey::ConditionType => "conditionType",
            FilterKey::BodyType => "bodyType",
            FilterKey::FuelType => "fuelType",
            FilterKey::Location => "location",
            FilterKey::OwnerType => "ownerType",
            FilterKey::MinPrice => "minPrice",
            FilterKey::MaxPrice => "maxPrice",
            FilterKey::MinYear => "minYear",
            FilterKey::MaxYear => "maxYear",
            FilterKey::MinMileage => "minMileage",
            FilterKey::MaxMileage => "maxMileage",
            FilterKey::MinEngineCc => "minEngineCc",
            FilterKey::MaxEngineCc => "maxEngineCc",
            FilterKey::Search => "search",
            FilterKey::Sort => "sort",
        }
    }

    // Parameter name expected by the listing search API
    pub fn api_param(self) -> &'static str {
        match self {
            FilterKey::MinPrice => "price_gte",
            FilterKey::MaxPrice => "price_lte",
            FilterKey::MinYear => "year_gte",
            FilterKey::MaxYear => "year_lte",
            FilterKey::MinMileage => "mileage_gte",
            FilterKey::MaxMileage => "mileage_lte",
            FilterKey::MinEngineCc => "engineCc_gte",
            FilterKey::MaxEngineCc => "engineCc_lte",
            other => other.as_str(),
        }
    }

    pub fn parse(key: &str) -> Option<FilterKey> {
        KEYS_BY_NAME.get(key).copied()
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static KEYS_BY_NAME: Lazy<HashMap<&'static str, FilterKey>> =
    Lazy::new(|| FilterKey::ALL.iter().map(|k| (k.as_str(), *k)).collect());

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    values: BTreeMap<FilterKey, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedQuery {
    pub spec: FilterSpec,
    pub rejected: Vec<String>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    // Unknown keys are dropped; empty values count as absent
    pub fn decode(query: &str) -> FilterSpec {
        let decoded = Self::decode_report(query);
        if !decoded.rejected.is_empty() {
            tracing::debug!(rejected = ?decoded.rejected, "Dropped unknown filter keys");
        }
        decoded.spec
    }

    pub fn decode_report(query: &str) -> DecodedQuery {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut decoded = DecodedQuery::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match FilterKey::parse(&key) {
                Some(filter_key) => decoded.spec.set(filter_key, Some(&*value)),
                None => {
                    if !decoded.rejected.iter().any(|k| k.as_str() == &*key) {
                        decoded.rejected.push(key.into_owned());
                    }
                }
            }
        }
        decoded
    }

    // Query string with `key` set, or removed when the value is empty
    pub fn encode(&self, key: FilterKey, value: Option<&str>) -> String {
        let mut next = self.clone();
        next.set(key, value);
        next.to_query()
    }

    pub fn clear() -> String {
        String::new()
    }

    // Keys come out in declaration order
    pub fn to_query(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.values {
            serializer.append_pair(key.as_str(), value);
        }
        serializer.finish()
    }

    pub fn set(&mut self, key: FilterKey, value: Option<&str>) {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => {
                self.values.insert(key, v.to_string());
            }
            None => {
                self.values.remove(&key);
            }
        }
    }

    pub fn get(&self, key: FilterKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FilterKey, &str)> {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }

    // `sort` is excluded; the fetcher sends it separately
    pub fn api_params(&self) -> Vec<(&'static str, &str)> {
        self.iter()
            .filter(|(key, _)| *key != FilterKey::Sort)
            .map(|(key, value)| (key.api_param(), value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn pairs(query: &str) -> HashSet<(String, String)> {
        url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn decode_reads_known_keys() {
        let spec = FilterSpec::decode("?brand=Toyota&minPrice=1000&bodyType=Saloon");
        assert_eq!(spec.get(FilterKey::Brand), Some("Toyota"));
        assert_eq!(spec.get(FilterKey::MinPrice), Some("1000"));
        assert_eq!(spec.get(FilterKey::BodyType), Some("Saloon"));
        assert_eq!(spec.get(FilterKey::Model), None);
    }

    #[test]
    fn decode_handles_percent_and_plus_encoding() {
        let spec = FilterSpec::decode("search=land+cruiser&location=Nairobi%2C%20KE");
        assert_eq!(spec.get(FilterKey::Search), Some("land cruiser"));
        assert_eq!(spec.get(FilterKey::Location), Some("Nairobi, KE"));
    }

    #[test]
    fn decode_treats_empty_values_as_absent() {
        let spec = FilterSpec::decode("brand=&model=Vitz");
        assert_eq!(spec.get(FilterKey::Brand), None);
        assert_eq!(spec.iter().count(), 1);
    }

    #[test]
    fn decode_rejects_unknown_keys() {
        let decoded =
            FilterSpec::decode_report("brand=Honda&utm_source=mail&colour=red&utm_source=x");
        assert_eq!(decoded.spec.get(FilterKey::Brand), Some("Honda"));
        assert_eq!(decoded.rejected, vec!["utm_source".to_string(), "colour".to_string()]);
        assert!(!decoded.spec.to_query().contains("utm_source"));
    }

    #[test]
    fn encode_sets_value_without_mutating_original() {
        let spec = FilterSpec::decode("brand=Toyota");
        let next = spec.encode(FilterKey::Model, Some("Hilux"));
        assert_eq!(pairs(&next), pairs("brand=Toyota&model=Hilux"));
        assert_eq!(spec.get(FilterKey::Model), None);
    }

    #[test]
    fn encode_removes_key_for_empty_or_missing_value() {
        let spec = FilterSpec::decode("brand=Toyota&model=Hilux");
        assert_eq!(spec.encode(FilterKey::Model, Some("")), "brand=Toyota");
        assert_eq!(spec.encode(FilterKey::Model, None), "brand=Toyota");
        assert_eq!(spec.encode(FilterKey::Model, Some("   ")), "brand=Toyota");
    }

    #[test]
    fn encode_replaces_existing_value() {
        let spec = FilterSpec::decode("brand=Toyota");
        assert_eq!(spec.encode(FilterKey::Brand, Some("Honda")), "brand=Honda");
    }

    #[test]
    fn clear_is_empty_query() {
        assert_eq!(FilterSpec::clear(), "");
        assert!(FilterSpec::decode(&FilterSpec::clear()).is_empty());
    }

    #[test]
    fn decode_then_encode_is_equivalent() {
        let original = "maxYear=2020&brand=Mercedes-Benz&search=a%26b&minPrice=500";
        let spec = FilterSpec::decode(original);
        let reencoded = spec.to_query();
        assert_eq!(pairs(&reencoded), pairs(original));
        assert_eq!(FilterSpec::decode(&reencoded), spec);
    }

    #[test]
    fn api_params_use_rename_table_and_skip_sort() {
        let spec = FilterSpec::decode(concat!(
            "brand=Toyota&minPrice=1&maxPrice=2&minYear=2010&maxYear=2020",
            "&minMileage=3&maxMileage=4&minEngineCc=5&maxEngineCc=6&sort=price,asc",
        ));
        let params: HashSet<(&str, &str)> = spec.api_params().into_iter().collect();
        let expected: HashSet<(&str, &str)> = [
            ("brand", "Toyota"),
            ("price_gte", "1"),
            ("price_lte", "2"),
            ("year_gte", "2010"),
            ("year_lte", "2020"),
            ("mileage_gte", "3"),
            ("mileage_lte", "4"),
            ("engineCc_gte", "5"),
            ("engineCc_lte", "6"),
        ]
        .into_iter()
        .collect();
        assert_eq!(params, expected);
    }

    #[test]
    fn every_key_round_trips_through_its_name() {
        for key in FilterKey::ALL {
            assert_eq!(FilterKey::parse(key.as_str()), Some(key));
        }
    }
}
