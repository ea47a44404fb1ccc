use validator::ValidateLength;

use super::whitespace;

pub const MAX_MESSAGE_LENGTH: u64 = 600;

#[derive(Debug, Clone)]
pub struct ContactMessage(String);

impl ContactMessage {
    /// Blank messages are rejected first; the length limit applies to the
    /// untrimmed text.
    pub fn parse(s: Option<String>) -> Result<ContactMessage, String> {
        let Some(s) = s.filter(|s| !whitespace::is_blank(s)) else {
            return Err("Message is required".to_string());
        };
        if !s.validate_length(None, Some(MAX_MESSAGE_LENGTH), None) {
            return Err(format!(
                "Message cannot exceed {MAX_MESSAGE_LENGTH} characters"
            ));
        }
        Ok(Self(s))
    }
}

impl AsRef<str> for ContactMessage {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
