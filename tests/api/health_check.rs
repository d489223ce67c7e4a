use crate::helpers::spawn_app;
use crate::helpers::spawn_configured_app;

#[tokio::test]
async fn health_check() {
    let app = spawn_configured_app().await;
    let resp = app.get("/health_check").await;

    assert!(resp.status().is_success());
    assert_eq!(resp.content_length().unwrap(), 0); // empty body
}

/// Deployments are health-checked before anyone visits `/setup`
#[tokio::test]
async fn health_check_is_not_gated() {
    let app = spawn_app().await;
    let resp = app.get("/health_check").await;
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let app = spawn_configured_app().await;
    let resp = app.get("/no/such/page").await;

    assert_eq!(resp.status().as_u16(), 404);
    assert!(resp.text().await.unwrap().contains("404"));
}
