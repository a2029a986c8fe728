/// Replace `${ENV_VAR}` placeholders in raw config text.
///
/// Unresolvable variables are left as-is.
pub fn substitute_env(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next();

        let mut var_name = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            var_name.push(c);
        }

        match std::env::var(&var_name) {
            Ok(val) if closed && !var_name.is_empty() => result.push_str(&val),
            _ => {
                result.push_str("${");
                result.push_str(&var_name);
                if closed {
                    result.push('}');
                }
            },
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(unsafe_code)] // edition 2024: env::set_var/remove_var are unsafe
    fn substitutes_secret_from_env() {
        unsafe { std::env::set_var("PAIRGATE_SUBST_TEST_SECRET", "s3cr3t") };
        assert_eq!(
            substitute_env("hmac_secret = \"${PAIRGATE_SUBST_TEST_SECRET}\""),
            "hmac_secret = \"s3cr3t\""
        );
        unsafe { std::env::remove_var("PAIRGATE_SUBST_TEST_SECRET") };
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_env("${PAIRGATE_NONEXISTENT_XYZ}"),
            "${PAIRGATE_NONEXISTENT_XYZ}"
        );
    }

    #[test]
    fn unterminated_placeholder_is_literal() {
        assert_eq!(substitute_env("port = ${PORT"), "port = ${PORT");
    }

    #[test]
    fn plain_dollar_passes_through() {
        assert_eq!(substitute_env("cost $5"), "cost $5");
    }
}
