/// Replace `${ENV_VAR}` placeholders in config string values.
///
/// `${ENV_VAR:-fallback}` uses `fallback` when the variable is unset or
/// empty. Unresolvable variables without a fallback are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Replace placeholders using a custom lookup function.
///
/// This is the implementation used by [`substitute_env`]; the separate
/// signature makes it testable without mutating the process environment.
pub(crate) fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next(); // consume '{'

        let mut inner = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            inner.push(c);
        }

        if !closed || inner.is_empty() {
            // Malformed, emit literal.
            result.push_str("${");
            result.push_str(&inner);
            continue;
        }

        let (name, fallback) = match inner.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (inner.as_str(), None),
        };
        match (lookup(name).filter(|v| !v.is_empty()), fallback) {
            (Some(val), _) => result.push_str(&val),
            (None, Some(fallback)) => result.push_str(fallback),
            (None, None) => {
                result.push_str("${");
                result.push_str(&inner);
                result.push('}');
            },
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "PORTER_TEST_TOKEN" => Some("123:ABC".to_string()),
            "PORTER_TEST_EMPTY" => Some(String::new()),
            _ => None,
        }
    }

    #[test]
    fn substitutes_known_var() {
        assert_eq!(
            substitute_env_with("token = \"${PORTER_TEST_TOKEN}\"", lookup),
            "token = \"123:ABC\""
        );
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_env_with("${PORTER_NONEXISTENT_XYZ}", lookup),
            "${PORTER_NONEXISTENT_XYZ}"
        );
    }

    #[test]
    fn fallback_applies_to_unset_and_empty() {
        assert_eq!(substitute_env_with("${PORTER_MISSING:-5000}", lookup), "5000");
        assert_eq!(substitute_env_with("${PORTER_TEST_EMPTY:-x}", lookup), "x");
        assert_eq!(
            substitute_env_with("${PORTER_TEST_TOKEN:-unused}", lookup),
            "123:ABC"
        );
    }

    #[test]
    fn malformed_placeholder_is_literal() {
        assert_eq!(substitute_env_with("a ${oops", lookup), "a ${oops");
        assert_eq!(substitute_env_with("cost: $5 ${}", lookup), "cost: $5 ${");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("plain text"), "plain text");
    }
}
