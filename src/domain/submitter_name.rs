use super::whitespace;

#[derive(Debug, Clone)]
pub struct SubmitterName(String);

impl SubmitterName {
    pub fn parse_first(s: Option<String>) -> Result<SubmitterName, String> {
        Self::parse(s, "First name is required")
    }

    pub fn parse_last(s: Option<String>) -> Result<SubmitterName, String> {
        Self::parse(s, "Last name is required")
    }

    fn parse(s: Option<String>, missing: &str) -> Result<SubmitterName, String> {
        match s {
            Some(s) if !whitespace::is_blank(&s) => Ok(Self(s)),
            _ => Err(missing.to_string()),
        }
    }
}

impl AsRef<str> for SubmitterName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
