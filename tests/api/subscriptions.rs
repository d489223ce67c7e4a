use fake::faker::internet::en::SafeEmail;
use fake::Fake;

use crate::helpers::spawn_configured_app;
use crate::helpers::test_app;

#[tokio::test]
async fn home_page_shows_the_subscribe_form() {
    let app = spawn_configured_app().await;
    let resp = app.get("/").await;

    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.headers().get("Cache-Control").unwrap(), "no-store");
    let html = resp.text().await.unwrap();
    assert!(html.contains(r#"action="/subscribe""#));
    assert!(html.contains("A newsletter about Rust"));
    assert!(html.contains("https://example.com/privacy"));
}

#[tokio::test]
async fn subscribe_ok() {
    let app = spawn_configured_app().await;

    let resp = app.post_subscribe("john@foo.com").await;
    assert_eq!(resp.status().as_u16(), 200);

    let subs = app.subscribers().await;
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].value.email, "john@foo.com");
    assert!(!subs[0].value.verified);
    assert!(subs[0].value.subscribed_date().is_some());
}

#[tokio::test]
async fn subscribe_sends_verification_link() {
    let app = spawn_configured_app().await;
    let email: String = SafeEmail().fake();

    app.post_subscribe(&email).await;

    let emails = app.emails();
    assert_eq!(emails.len(), 1);
    assert!(emails[0].contains(&format!("To: {email}")));

    // the token is the new record's key
    let key = &app.subscribers().await[0].key;
    let link = app.get_links(&emails[0]).find("/verify/").unwrap();
    assert_eq!(link.path(), format!("/verify/{key}"));
}

#[tokio::test]
async fn subscribe_twice() {
    let app = spawn_configured_app().await;

    assert_eq!(app.post_subscribe("john@foo.com").await.status().as_u16(), 200);
    let first = app.subscribers().await;

    let resp = app.post_subscribe("john@foo.com").await;
    assert_eq!(resp.status().as_u16(), 409);
    assert!(resp.text().await.unwrap().contains("already subscribed"));

    // first record unchanged, no second verification email
    assert_eq!(app.subscribers().await, first);
    assert_eq!(app.emails().len(), 1);
}

#[tokio::test]
async fn subscribe_invalid() {
    let app = spawn_configured_app().await;

    for (email, msg) in [
        ("", "empty email"),
        ("   ", "blank email"),
        ("not-an-email", "no @"),
        ("@foo.com", "no subject"),
    ] {
        let resp = app.post_subscribe(email).await;
        assert_eq!(resp.status().as_u16(), 400, "{msg}");
    }

    let resp = app.post_form("/subscribe", &[("name", "john")]).await;
    assert_eq!(resp.status().as_u16(), 400, "missing field");

    assert!(app.subscribers().await.is_empty());
    assert!(app.emails().is_empty());
}

/// No rollback: the record stays, the user sees a send failure
#[tokio::test]
async fn subscribe_when_mail_fails() {
    let app = test_app().without_outbox().spawn().await;
    assert_eq!(app.complete_setup().await.status().as_u16(), 303);

    let resp = app.post_subscribe("john@foo.com").await;
    assert_eq!(resp.status().as_u16(), 500);
    assert!(resp
        .text()
        .await
        .unwrap()
        .contains("could not send you a verification email"));

    let subs = app.subscribers().await;
    assert_eq!(subs.len(), 1);
    assert!(!subs[0].value.verified);
}
