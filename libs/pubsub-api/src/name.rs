//! Resource name helpers.

/// Reduce a possibly fully qualified schema id
/// (`projects/{project}/schemas/{id}`) to its final path segment.
pub fn normalize_schema_id(schema_id: &str) -> &str {
    schema_id.rsplit('/').next().unwrap_or(schema_id)
}

/// Fully qualified subscription name, `projects/{project}/subscriptions/{id}`.
pub fn normalize_subscription_name(project_id: &str, subscription_id: &str) -> String {
    format!("projects/{project_id}/subscriptions/{subscription_id}")
}

/// Fully qualified topic name, `projects/{project}/topics/{id}`.
pub fn topic_name(project_id: &str, topic_id: &str) -> String {
    format!("projects/{project_id}/topics/{topic_id}")
}

/// Fully qualified schema name, `projects/{project}/schemas/{id}`.
pub fn schema_name(project_id: &str, schema_id: &str) -> String {
    format!("projects/{project_id}/schemas/{schema_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("foo", "foo" ; "plain id")]
    #[test_case("projects/p/schemas/foo", "foo" ; "qualified id")]
    #[test_case("schemas/", "" ; "trailing separator")]
    #[test_case("", "" ; "empty id")]
    fn normalizes_schema_id(input: &str, expected: &str) {
        assert_eq!(normalize_schema_id(input), expected);
    }

    #[test]
    fn normalizes_subscription_name() {
        assert_eq!(
            normalize_subscription_name("test-project", "test-subscription"),
            "projects/test-project/subscriptions/test-subscription"
        );
    }
}
