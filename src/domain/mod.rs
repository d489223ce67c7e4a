mod newsletter_config;
mod post;
mod subscriber;
mod subscriber_email;
// allow external `use` statements to skip `subscriber` etc
pub use newsletter_config::NewsletterConfig;
pub use newsletter_config::SmtpCredentials;
pub use post::Post;
pub use subscriber::format_date;
pub use subscriber::Subscriber;
pub use subscriber::Verification;
pub use subscriber_email::SubscriberEmail;
