use chrono::Datelike;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;

use super::SubscriberEmail;

/// Dates are stored as display strings, e.g. `05. March 2024`
const DATE_FORMAT: &str = "%d. %B %Y";

pub fn format_date(date: NaiveDate) -> String { date.format(DATE_FORMAT).to_string() }

/// A subscriber record, as stored in the `subscribers` collection. The store
/// key doubles as the verification (and unsubscribe) token.
///
/// ```text
/// (subscribe) --> unverified --(verify)--> verified
///                      \                      |
///                       +----(unsubscribe)----+--> deleted
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    pub email: String,
    pub subscribed_on: String,
    pub verified: bool,
}

/// Outcome of following a verification link
#[derive(Debug, PartialEq, Eq)]
pub enum Verification {
    /// Nothing to write
    AlreadyVerified,
    /// The record to write back
    Verified(Subscriber),
}

impl Subscriber {
    pub fn new(
        email: &SubscriberEmail,
        today: NaiveDate,
    ) -> Self {
        Self {
            email: email.as_ref().to_owned(),
            subscribed_on: format_date(today),
            verified: false,
        }
    }

    /// `email` and `subscribed_on` are carried over unchanged
    pub fn verify(self) -> Verification {
        match self.verified {
            true => Verification::AlreadyVerified,
            false => Verification::Verified(Self {
                verified: true,
                ..self
            }),
        }
    }

    pub fn subscribed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.subscribed_on, DATE_FORMAT).ok()
    }

    /// Records with an unparseable date never count
    pub fn subscribed_in_month_of(
        &self,
        date: NaiveDate,
    ) -> bool {
        self.subscribed_date()
            .is_some_and(|d| d.year() == date.year() && d.month() == date.month())
    }
}
