use validator::ValidateEmail;

/// This struct exists only for email parsing and can be used for both senders
/// and recipients.
///
/// Parsing is a syntax check only. Uniqueness is the caller's problem, and
/// addresses are compared exactly as typed (no case folding).
#[derive(Debug, Clone)]
pub struct SubscriberEmail(String);

impl SubscriberEmail {
    pub fn parse(email: String) -> Result<Self, String> {
        let email = email.trim().to_owned();
        ValidateEmail::validate_email(&email)
            // https://stackoverflow.com/a/65012849
            .then_some(Self(email.clone()))
            .ok_or(format!("Invalid email: {email:?}"))
    }
}

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str { &self.0 }
}

impl std::fmt::Display for SubscriberEmail {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
