use reaper_config::ExclusionRule;
use serde_json::Value;

/// Deep partial match of `pattern` against `target`.
///
/// Objects match when every pattern key is present in the target with a
/// matching value. Arrays match when every pattern element matches some
/// target element. Anything else compares by equality.
pub fn is_match(target: &Value, pattern: &Value) -> bool {
    match (target, pattern) {
        (Value::Object(target), Value::Object(pattern)) => pattern.iter().all(|(key, expected)| {
            target
                .get(key)
                .is_some_and(|actual| is_match(actual, expected))
        }),
        (Value::Array(target), Value::Array(pattern)) => pattern
            .iter()
            .all(|expected| target.iter().any(|actual| is_match(actual, expected))),
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => target == pattern,
    }
}

/// The first rule whose pattern matches the build's JSON form.
pub fn find_exclusion<'a>(build: &Value, rules: &'a [ExclusionRule]) -> Option<&'a ExclusionRule> {
    rules.iter().find(|rule| is_match(build, &rule.pattern))
}
