/// Substitute `${VAR}` references in raw config text with environment
/// values. Unknown variables are left untouched so parse errors point at
/// the real problem.
#[must_use]
pub fn substitute_env(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match std::env::var(name) {
                    Ok(value) if is_valid_name(name) => out.push_str(&value),
                    _ => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    },
                }
                rest = &after[end + 1..];
            },
            None => {
                out.push_str("${");
                rest = after;
            },
        }
    }
    out.push_str(rest);
    out
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_variables() {
        // PATH is present in any test environment.
        let path = std::env::var("PATH").unwrap();
        let out = substitute_env("bin = \"${PATH}\"");
        assert_eq!(out, format!("bin = \"{path}\""));
    }

    #[test]
    fn leaves_unknown_variables_in_place() {
        let out = substitute_env("token = \"${SWITCHBOARD_TEST_MISSING_VAR}\"");
        assert_eq!(out, "token = \"${SWITCHBOARD_TEST_MISSING_VAR}\"");
    }

    #[test]
    fn tolerates_unterminated_reference() {
        let out = substitute_env("x = \"${OOPS");
        assert_eq!(out, "x = \"${OOPS");
    }
}
