//! String case conversion between camelCase, snake_case and kebab-case.
//!
//! Conversions are total: every input, including the empty string, maps to an output.

/// Converts a camelCase (or PascalCase) identifier to snake_case.
///
/// Acronym boundaries are split before the last capital of a run when it starts a new
/// word, so `UserIDToken` becomes `user_id_token`.
pub fn camel_to_snake(input: &str) -> String {
    separate(input, '_', '-')
}

/// Converts a camelCase (or PascalCase) identifier to kebab-case.
pub fn camel_to_kebab(input: &str) -> String {
    separate(input, '-', '_')
}

/// Converts a snake_case or kebab-case identifier to camelCase.
///
/// The first character is lowercased and every `-`/`_` followed by an ASCII letter is
/// removed while that letter is uppercased. Other characters are left untouched.
pub fn to_camel(input: &str) -> String {
    let mut chars = input.chars().peekable();
    let mut out = String::with_capacity(input.len());

    if let Some(first) = chars.next() {
        out.extend(first.to_lowercase());
    }

    while let Some(c) = chars.next() {
        if c == '-' || c == '_' {
            if let Some(next) = chars.peek().copied().filter(char::is_ascii_alphabetic) {
                out.push(next.to_ascii_uppercase());
                chars.next();
                continue;
            }
        }
        out.push(c);
    }

    out
}

fn separate(input: &str, separator: char, replaced: char) -> String {
    let chars: Vec<char> = input.chars().collect();

    // lower/digit followed by upper
    let mut split = Vec::with_capacity(chars.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 {
            let prev = chars[i - 1];
            if (prev.is_ascii_lowercase() || prev.is_ascii_digit()) && c.is_ascii_uppercase() {
                split.push(separator);
            }
        }
        split.push(c);
    }

    // upper followed by upper that starts a lowercase word
    let mut out = String::with_capacity(split.len() + 4);
    for (i, &c) in split.iter().enumerate() {
        if i > 0
            && split[i - 1].is_ascii_uppercase()
            && c.is_ascii_uppercase()
            && split.get(i + 1).is_some_and(char::is_ascii_lowercase)
        {
            out.push(separator);
        }
        out.push(if c == replaced { separator } else { c });
    }

    out.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_camel_and_pascal_input() {
        for input in ["thisIsATest", "ThisIsATest"] {
            assert_eq!(to_camel(input), "thisIsATest");
            assert_eq!(camel_to_snake(input), "this_is_a_test");
            assert_eq!(camel_to_kebab(input), "this-is-a-test");
        }
    }

    #[test]
    fn splits_acronym_boundaries() {
        assert_eq!(camel_to_snake("UserID"), "user_id");
        assert_eq!(camel_to_snake("UserIDToken"), "user_id_token");
        assert_eq!(camel_to_kebab("parseHTTPResponse"), "parse-http-response");
        assert_eq!(camel_to_snake("version2Name"), "version2_name");
    }

    #[test]
    fn normalizes_existing_separators() {
        assert_eq!(camel_to_snake("test-field-name"), "test_field_name");
        assert_eq!(camel_to_kebab("test_field_name"), "test-field-name");
        assert_eq!(to_camel("test-field-name"), "testFieldName");
        assert_eq!(to_camel("test_field_name"), "testFieldName");
    }

    #[test]
    fn keeps_separators_not_followed_by_letters() {
        assert_eq!(to_camel("field_1"), "field_1");
        assert_eq!(to_camel("a__b"), "a_B");
    }

    #[test]
    fn empty_string_is_preserved() {
        assert_eq!(camel_to_snake(""), "");
        assert_eq!(camel_to_kebab(""), "");
        assert_eq!(to_camel(""), "");
    }

    #[test]
    fn snake_round_trip_is_stable_for_camel_words() {
        for input in ["title", "receivePushNotifications", "lastSignIn", "previousLocations", "a1B2c"] {
            assert_eq!(to_camel(&camel_to_snake(input)), to_camel(input), "{input}");
        }
    }
}
