use crate::error::{AppError, AppResult};

/// Span from the first `[` through the last `]`.
pub fn extract_array(raw: &str) -> AppResult<&str> {
    delimited(raw, '[', ']', "no JSON array found in response")
}

/// Span from the first `{` through the last `}`.
pub fn extract_object(raw: &str) -> AppResult<&str> {
    delimited(raw, '{', '}', "no JSON object found in response")
}

fn delimited<'a>(raw: &'a str, open: char, close: char, missing: &str) -> AppResult<&'a str> {
    match (raw.find(open), raw.rfind(close)) {
        (Some(start), Some(end)) if start < end => Ok(&raw[start..=end]),
        _ => Err(AppError::validation(missing)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn array_span_ignores_surrounding_prose() {
        let raw = "Ecco le idee:\n[{\"a\": [1, 2]}]\nBuon lavoro!";
        assert_eq!(extract_array(raw).unwrap(), "[{\"a\": [1, 2]}]");
    }

    #[test]
    fn object_span_runs_to_last_brace() {
        let raw = "```json\n{\"hook\": \"{x}\"}\n```";
        assert_eq!(extract_object(raw).unwrap(), "{\"hook\": \"{x}\"}");
    }

    #[test]
    fn missing_or_reversed_delimiters_fail() {
        for raw in ["no payload here", "] backwards [", "[ unterminated"] {
            let err = extract_array(raw).unwrap_err();
            assert!(err.is_kind(ErrorKind::Validation), "{raw}");
        }
        assert!(extract_object("}{").is_err());
    }
}
