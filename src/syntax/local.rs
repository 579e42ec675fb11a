use std::sync::LazyLock;

use regex::Regex;

/// dot-atom: atext runs separated by single dots
static DOT_ATOM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[-!#$%&'*+/=?^_`{}|~0-9A-Z]+(\.[-!#$%&'*+/=?^_`{}|~0-9A-Z]+)*$")
        .unwrap_or_else(|err| panic!("dot-atom pattern: {err}"))
});

/// quoted-string: qtext or quoted-pair between double quotes
static QUOTED_STRING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^"([\x01-\x08\x0B\x0C\x0E-\x1F!#-\[\]-\x7F]|\\[\x01-\x09\x0B\x0C\x0E-\x7F])*"$"#,
    )
    .unwrap_or_else(|err| panic!("quoted-string pattern: {err}"))
});

pub(crate) fn is_valid_user(user: &str) -> bool {
    DOT_ATOM.is_match(user) || QUOTED_STRING.is_match(user)
}
