use std::sync::LazyLock;

use regex::Regex;

use super::whitespace;

// Deliberately lenient: `local@domain.tld` shape only, not RFC 5322.
static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    let part = format!("[^@{}]+", whitespace::regex_class());
    Regex::new(&format!(r"^{part}@{part}\.{part}$")).expect("valid email pattern")
});

pub const INVALID_EMAIL: &str = "Please enter a valid email address";

#[derive(Debug, Clone)]
pub struct SubmitterEmail(String);

impl SubmitterEmail {
    pub fn parse(s: Option<String>) -> Result<SubmitterEmail, String> {
        match s {
            Some(s) if EMAIL_SHAPE.is_match(&s) => Ok(Self(s)),
            _ => Err(INVALID_EMAIL.to_string()),
        }
    }
}

impl AsRef<str> for SubmitterEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
