mod contact_message;
mod new_submission;
mod submitter_email;
mod submitter_name;
mod whitespace;

pub use contact_message::ContactMessage;
pub use new_submission::{ContactForm, NewSubmission, ValidationErrors, ValidationResult, validate};
pub use submitter_email::SubmitterEmail;
pub use submitter_name::SubmitterName;
