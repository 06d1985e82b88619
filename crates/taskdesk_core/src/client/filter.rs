use serde_json::{Map, Value};

/// Free-form list filter object sent as `params.filter`.
pub type ListFilter = Map<String, Value>;

/// Drops top-level keys whose value is exactly `""`.
///
/// A cleared search box then means "no filter" rather than "match the empty
/// string". Every other value, `null` and non-strings included, is kept.
pub fn prune_empty(filter: ListFilter) -> ListFilter {
    filter
        .into_iter()
        .filter(|(_, value)| !matches!(value, Value::String(text) if text.is_empty()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{prune_empty, ListFilter};
    use serde_json::{json, Value};

    fn filter(value: Value) -> ListFilter {
        match value {
            Value::Object(map) => map,
            _ => panic!("filter fixture must be an object"),
        }
    }

    #[test]
    fn removes_only_empty_strings() {
        let pruned = prune_empty(filter(json!({
            "project_id": "p1",
            "title": "",
            "done": false,
            "desc": null,
            "blank": " ",
            "nested": {"$contains": ""},
        })));

        assert_eq!(
            Value::Object(pruned),
            json!({
                "project_id": "p1",
                "done": false,
                "desc": null,
                "blank": " ",
                "nested": {"$contains": ""},
            })
        );
    }

    #[test]
    fn empty_filter_stays_empty() {
        assert!(prune_empty(ListFilter::new()).is_empty());
    }
}
