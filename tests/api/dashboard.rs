use microletter::domain::Post;
use microletter::domain::Subscriber;
use microletter::store::Query;

use crate::helpers::assert_is_redirect_to;
use crate::helpers::spawn_configured_app;
use crate::helpers::test_app;
use crate::helpers::TestApp;

async fn add_subscriber(
    app: &TestApp,
    email: &str,
    verified: bool,
) -> String {
    let subscriber = Subscriber {
        email: email.to_string(),
        subscribed_on: "01. January 2024".to_string(),
        verified,
    };
    app.store.subscribers.insert(&subscriber).await.unwrap()
}

async fn posts(app: &TestApp) -> Vec<Post> {
    app.store
        .posts
        .fetch::<Post>(Query::all())
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.value)
        .collect()
}

#[tokio::test]
async fn dashboard_redirects_to_home() {
    let app = spawn_configured_app().await;
    assert_is_redirect_to(&app.get("/dashboard").await, "/dashboard/home");
}

#[tokio::test]
async fn publish_post() {
    let app = spawn_configured_app().await;
    add_subscriber(&app, "verified@foo.com", true).await;
    add_subscriber(&app, "pending@foo.com", false).await;

    let resp = app
        .post_create(&[("title", "Hello"), ("content", "**world**")])
        .await;
    assert_is_redirect_to(&resp, "/dashboard/home?show=success");

    let posts = posts(&app).await;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].title, "Hello");
    assert!(posts[0].html_content.contains("<strong>world</strong>"));
    assert_eq!(posts[0].text_content, "world");
    assert_eq!(posts[0].excerpt, "world...");

    // verified subscribers only
    let emails = app.emails();
    assert_eq!(emails.len(), 1);
    assert!(emails[0].contains("To: verified@foo.com"));
    assert!(emails[0].contains("Subject: Hello"));
    assert!(app.get_links(&emails[0]).find("/unsubscribe").is_some());

    let html = app
        .get_dashboard("/dashboard/home?show=success")
        .await
        .text()
        .await
        .unwrap();
    assert!(html.contains("Hello"));
    assert!(html.contains("world..."));
    assert!(html.contains(r#"class="alert alert-success""#));
}

#[tokio::test]
async fn invalid_post_is_not_published() {
    let app = spawn_configured_app().await;
    add_subscriber(&app, "verified@foo.com", true).await;

    for (form, msg) in [
        (vec![("title", "Hello"), ("content", "")], "empty content"),
        (vec![("title", "Hello"), ("content", "  \n")], "blank content"),
        (vec![("content", "**world**")], "missing title"),
        (vec![("title", ""), ("content", "**world**")], "empty title"),
        (vec![("title", "Hello")], "missing content"),
    ] {
        let resp = app.post_create(&form).await;
        assert_eq!(resp.status().as_u16(), 400, "{msg}");
    }

    assert!(posts(&app).await.is_empty());
    assert!(app.emails().is_empty());
}

#[tokio::test]
async fn post_is_not_saved_when_broadcast_fails() {
    let app = test_app().without_outbox().spawn().await;
    assert_eq!(app.complete_setup().await.status().as_u16(), 303);
    add_subscriber(&app, "verified@foo.com", true).await;

    let resp = app
        .post_create(&[("title", "Hello"), ("content", "**world**")])
        .await;
    assert_eq!(resp.status().as_u16(), 500);
    assert!(resp.text().await.unwrap().contains("was not saved"));
    assert!(posts(&app).await.is_empty());
}

#[tokio::test]
async fn post_without_subscribers_is_saved() {
    let app = spawn_configured_app().await;

    let resp = app
        .post_create(&[("title", "Hello"), ("content", "**world**")])
        .await;
    assert_is_redirect_to(&resp, "/dashboard/home?show=success");
    assert_eq!(posts(&app).await.len(), 1);
    assert!(app.emails().is_empty());
}

#[tokio::test]
async fn delete_post() {
    let app = spawn_configured_app().await;
    app.post_create(&[("title", "Hello"), ("content", "**world**")])
        .await;
    let key = app.store.posts.fetch::<Post>(Query::all()).await.unwrap()[0]
        .key
        .clone();

    let resp = app
        .get_dashboard(&format!("/dashboard/home/delete/{key}"))
        .await;
    assert_is_redirect_to(&resp, "/dashboard/home?show=success");
    assert!(posts(&app).await.is_empty());
}

#[tokio::test]
async fn subscriber_list() {
    let app = spawn_configured_app().await;
    app.post_subscribe("new@foo.com").await;
    add_subscriber(&app, "old@foo.com", true).await;

    let resp = app.get_dashboard("/dashboard/subscribers").await;
    assert_eq!(resp.status().as_u16(), 200);
    let html = resp.text().await.unwrap();
    assert!(html.contains("new@foo.com"));
    assert!(html.contains("old@foo.com"));
    // only the subscriber from today counts towards this month
    assert!(html.contains("Total: <strong>2</strong>"));
    assert!(html.contains("This month: <strong>1</strong>"));
    assert!(!html.contains(r#"class="alert"#));
}

#[tokio::test]
async fn delete_subscriber() {
    let app = spawn_configured_app().await;
    let key = add_subscriber(&app, "old@foo.com", true).await;

    let resp = app
        .get_dashboard(&format!("/dashboard/subscribers/delete/{key}"))
        .await;
    assert_is_redirect_to(&resp, "/dashboard/subscribers?show=success");
    assert!(app.subscribers().await.is_empty());

    let html = app
        .get_dashboard("/dashboard/subscribers?show=success")
        .await
        .text()
        .await
        .unwrap();
    assert!(html.contains(r#"class="alert alert-success""#));
}

#[tokio::test]
async fn editor_form() {
    let app = spawn_configured_app().await;
    let resp = app.get_dashboard("/dashboard/editor").await;

    assert_eq!(resp.status().as_u16(), 200);
    assert!(resp
        .text()
        .await
        .unwrap()
        .contains(r#"action="/dashboard/editor/create""#));
}

#[tokio::test]
async fn dashboard_requires_credentials_when_configured() {
    let mut app = test_app().with_admin().spawn().await;
    assert_eq!(app.complete_setup().await.status().as_u16(), 303);

    // with credentials
    for path in ["/dashboard/home", "/dashboard/editor", "/dashboard/subscribers"] {
        assert_eq!(app.get_dashboard(path).await.status().as_u16(), 200, "{path}");
    }

    // without
    let resp = app.get("/dashboard/home").await;
    assert_eq!(resp.status().as_u16(), 401);
    assert_eq!(
        resp.headers().get("WWW-Authenticate").unwrap(),
        r#"Basic realm="dashboard""#
    );

    // wrong password
    app.admin.as_mut().unwrap().password = "wrong".to_string();
    assert_eq!(app.get_dashboard("/dashboard/home").await.status().as_u16(), 401);
    let resp = app
        .post_create(&[("title", "Hello"), ("content", "**world**")])
        .await;
    assert_eq!(resp.status().as_u16(), 401);
    assert!(posts(&app).await.is_empty());

    // public pages stay public
    assert_eq!(app.get("/").await.status().as_u16(), 200);
}
