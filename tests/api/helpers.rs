use std::path::PathBuf;

use argon2::password_hash::SaltString;
use argon2::Argon2;
use argon2::PasswordHasher;
use microletter::configuration::get_configuration;
use microletter::configuration::AdminSettings;
use microletter::domain::Subscriber;
use microletter::startup::Application;
use microletter::store::Query;
use microletter::store::Record;
use microletter::store::Store;
use microletter::telemetry::get_subscriber;
use microletter::telemetry::init_subscriber;
use once_cell::sync::Lazy;
use secrecy::Secret;
use uuid::Uuid;

/// To opt in to verbose logging, use the env var `TEST_LOG`:
///
/// ```sh
///      TEST_LOG=true cargo test [test_name] | bunyan
/// ```
static TRACING: Lazy<()> = Lazy::new(|| {
    match std::env::var("TEST_LOG") {
        Ok(_) => {
            let subscriber = get_subscriber("test", "debug", std::io::stdout);
            init_subscriber(subscriber);
        }
        Err(_) => {
            let subscriber = get_subscriber("test", "debug", std::io::sink);
            init_subscriber(subscriber);
        }
    };
});

/// Links to the test server found in one email (the html and text parts both
/// contain them)
pub struct EmailLinks {
    pub links: Vec<reqwest::Url>,
}

impl EmailLinks {
    /// First link whose path starts with `prefix`, e.g. `/verify/`
    pub fn find(
        &self,
        prefix: &str,
    ) -> Option<reqwest::Url> {
        self.links
            .iter()
            .find(|u| u.path().starts_with(prefix))
            .cloned()
    }
}

pub struct TestUser {
    pub username: String,
    pub password: String,
}

impl TestUser {
    fn generate() -> Self {
        Self {
            username: Uuid::new_v4().to_string(),
            password: Uuid::new_v4().to_string(),
        }
    }

    fn settings(&self) -> AdminSettings {
        let salt = SaltString::generate(&mut rand::thread_rng());
        let password_hash = Argon2::default()
            .hash_password(self.password.as_bytes(), &salt)
            .unwrap()
            .to_string();
        AdminSettings {
            username: self.username.clone(),
            password_hash: Secret::new(password_hash),
        }
    }
}

pub struct TestApp {
    pub addr: String,
    pub port: u16,
    pub store: Store,
    pub outbox: PathBuf,
    pub api_client: reqwest::Client,
    /// Sent with every dashboard request when set
    pub admin: Option<TestUser>,
}

/// Form accepted by `/setup/complete`, as the setup page would send it. Nothing
/// listens on port 1, so SMTP is unreachable unless mail goes to the outbox.
pub fn setup_form() -> Vec<(&'static str, &'static str)> {
    vec![
        ("username", "newsletter@example.com"),
        ("password", "hunter2"),
        ("server", "localhost"),
        ("port", "1"),
        ("title", "Weekly Rust"),
        ("tagline", "all the news"),
        ("description", "A newsletter about Rust"),
        ("fade1", "#4b6cb7"),
        ("fade2", "#182848"),
        ("titletext", "#182848"),
        ("name", "Jane Doe"),
        ("privacy", "https://example.com/privacy"),
        ("address", "1 Main St"),
    ]
}

impl TestApp {
    pub async fn get(
        &self,
        path: &str,
    ) -> reqwest::Response {
        self.api_client
            .get(format!("{}{path}", self.addr))
            .send()
            .await
            .expect("execute request")
    }

    pub async fn post_form<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        form: &T,
    ) -> reqwest::Response {
        self.api_client
            .post(format!("{}{path}", self.addr))
            .form(form)
            .send()
            .await
            .expect("execute request")
    }

    /// `GET` with the admin's credentials, if any
    pub async fn get_dashboard(
        &self,
        path: &str,
    ) -> reqwest::Response {
        let mut req = self.api_client.get(format!("{}{path}", self.addr));
        if let Some(admin) = &self.admin {
            req = req.basic_auth(&admin.username, Some(&admin.password));
        }
        req.send().await.expect("execute request")
    }

    pub async fn post_subscribe(
        &self,
        email: &str,
    ) -> reqwest::Response {
        self.post_form("/subscribe", &[("email", email)]).await
    }

    pub async fn post_create(
        &self,
        form: &[(&str, &str)],
    ) -> reqwest::Response {
        let mut req = self
            .api_client
            .post(format!("{}/dashboard/editor/create", self.addr))
            .form(form);
        if let Some(admin) = &self.admin {
            req = req.basic_auth(&admin.username, Some(&admin.password));
        }
        req.send().await.expect("execute request")
    }

    pub async fn complete_setup(&self) -> reqwest::Response {
        self.post_form("/setup/complete", &setup_form()).await
    }

    /// Every email written so far, oldest first
    pub fn emails(&self) -> Vec<String> {
        let Ok(dir) = std::fs::read_dir(&self.outbox) else {
            return vec![];
        };
        let mut paths: Vec<_> = dir
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "eml"))
            .collect();
        paths.sort_by_key(|p| std::fs::metadata(p).unwrap().modified().unwrap());
        paths
            .into_iter()
            .map(|p| std::fs::read_to_string(p).unwrap())
            .collect()
    }

    /// Extract the links from an email. Links point at `base_url`, which is
    /// the right host with the wrong port, so the port is patched.
    pub fn get_links(
        &self,
        email: &str,
    ) -> EmailLinks {
        let links = linkify::LinkFinder::new()
            .links(email)
            .filter(|l| *l.kind() == linkify::LinkKind::Url)
            .filter_map(|l| reqwest::Url::parse(l.as_str()).ok())
            .filter(|u| u.host_str() == Some("127.0.0.1"))
            .map(|mut u| {
                u.set_port(Some(self.port)).unwrap();
                u
            })
            .collect();
        EmailLinks { links }
    }

    pub async fn subscribers(&self) -> Vec<Record<Subscriber>> {
        self.store.subscribers.fetch(Query::all()).await.unwrap()
    }
}

pub struct TestAppBuilder {
    store: Option<Store>,
    admin: bool,
    smtp_outbox: bool,
}

impl TestAppBuilder {
    /// Use this store instead of a fresh in-memory one
    pub fn store(
        mut self,
        store: Store,
    ) -> Self {
        self.store = Some(store);
        self
    }

    /// Protect the dashboard with Basic auth
    pub fn with_admin(mut self) -> Self {
        self.admin = true;
        self
    }

    /// Send mail over SMTP (to the unreachable server from `setup_form`)
    /// instead of writing it to the outbox
    pub fn without_outbox(mut self) -> Self {
        self.smtp_outbox = false;
        self
    }

    pub async fn spawn(self) -> TestApp {
        Lazy::force(&TRACING);

        let outbox = std::env::temp_dir().join(Uuid::new_v4().to_string());
        let admin = self.admin.then(TestUser::generate);

        let mut cfg = get_configuration().unwrap();
        // port 0 is reserved by the OS; the server will be spawned on an address with a
        // random available port
        cfg.application.port = 0;
        cfg.application.admin = admin.as_ref().map(TestUser::settings);
        cfg.email_client.outbox_dir = self.smtp_outbox.then(|| outbox.clone());
        cfg.email_client.timeout_milliseconds = 1000;

        let store = self
            .store
            .unwrap_or_else(|| Store::in_memory(&Uuid::new_v4().to_string()));

        // links in emails point at `base_url`, which has no port; `get_links`
        // fills in the random one
        cfg.application.base_url = "http://127.0.0.1".to_string();

        let app = Application::build_with_store(cfg, store.clone())
            .await
            .unwrap();
        let port = app.get_port();
        let addr = format!("http://localhost:{port}");
        tokio::spawn(app.run_until_stopped());

        let api_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        TestApp {
            addr,
            port,
            store,
            outbox,
            api_client,
            admin,
        }
    }
}

pub fn test_app() -> TestAppBuilder {
    TestAppBuilder {
        store: None,
        admin: false,
        smtp_outbox: true,
    }
}

/// Fresh app, not set up yet
pub async fn spawn_app() -> TestApp { test_app().spawn().await }

/// Fresh app, already through `/setup/complete`
pub async fn spawn_configured_app() -> TestApp {
    let app = spawn_app().await;
    assert_eq!(app.complete_setup().await.status().as_u16(), 303);
    app
}

pub fn assert_is_redirect_to(
    resp: &reqwest::Response,
    location: &str,
) {
    assert_eq!(resp.status().as_u16(), 303);
    assert_eq!(resp.headers().get("Location").unwrap(), location);
}
