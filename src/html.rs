//! Pre-rendered fragments for the dashboard. The templates include these
//! verbatim (`| safe`), so everything interpolated here is escaped by hand.

use chrono::NaiveDate;
use htmlescape::encode_attribute;
use htmlescape::encode_minimal;

use crate::domain::Post;
use crate::domain::Subscriber;
use crate::store::Record;

/// Subscriber table, with the counts shown above it
pub struct SubscriberTable {
    pub html: String,
    pub total: usize,
    /// Subscriptions in the same calendar month as `today`
    pub this_month: usize,
}

pub fn post_list(posts: &[Record<Post>]) -> String {
    if posts.is_empty() {
        return "<p>No posts yet.</p>".to_string();
    }

    let mut html = String::from("<ul class=\"posts\">\n");
    for Record { key, value: post } in posts {
        html.push_str(&format!(
            "<li><h3>{}</h3><small>{}</small><p>{}</p>\
             <a href=\"/dashboard/home/delete/{}\">Delete</a></li>\n",
            encode_minimal(&post.title),
            encode_minimal(&post.date),
            encode_minimal(&post.excerpt),
            encode_attribute(key),
        ));
    }
    html.push_str("</ul>");
    html
}

pub fn subscriber_table(
    subscribers: &[Record<Subscriber>],
    today: NaiveDate,
) -> SubscriberTable {
    let this_month = subscribers
        .iter()
        .filter(|s| s.value.subscribed_in_month_of(today))
        .count();

    let mut html = String::from(
        "<table class=\"subscribers\">\n\
         <tr><th>Email</th><th>Subscribed on</th><th>Verified</th><th></th></tr>\n",
    );
    for Record { key, value: sub } in subscribers {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td>\
             <td><a href=\"/dashboard/subscribers/delete/{}\">Delete</a></td></tr>\n",
            encode_minimal(&sub.email),
            encode_minimal(&sub.subscribed_on),
            if sub.verified { "yes" } else { "no" },
            encode_attribute(key),
        ));
    }
    html.push_str("</table>");

    SubscriberTable {
        html,
        total: subscribers.len(),
        this_month,
    }
}

/// Banner for `?show=success` / `?show=error`; anything else shows nothing
pub fn popup(show: Option<&str>) -> &'static str {
    match show {
        Some("success") => "<div class=\"alert alert-success\">Done!</div>",
        Some("error") => "<div class=\"alert alert-danger\">Something went wrong. Please try again.</div>",
        _ => "",
    }
}
