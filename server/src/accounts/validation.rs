//! Signup input rules.

use std::sync::LazyLock;

use regex::Regex;

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 64;

const PASSWORD_SPECIALS: &str = r#"!@#~$%^&*()-_=+[]{}|\;:'",.<>/?"#;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("email pattern compiles")
});

pub fn email_is_valid(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// 8 to 64 bytes of UTF-8 with at least one uppercase letter, one
/// lowercase letter, one digit and one special character.
pub fn password_is_valid(password: &str) -> bool {
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&password.len()) {
        return false;
    }

    password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}

/// Normalized credentials: surrounding whitespace is not part of either field.
pub fn normalize<'a>(email: &'a str, password: &'a str) -> (&'a str, &'a str) {
    (email.trim(), password.trim())
}
