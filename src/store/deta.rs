use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use reqwest::StatusCode;
use reqwest::Url;
use secrecy::ExposeSecret;
use secrecy::Secret;
use serde::Deserialize;
use serde::Serialize;

use super::Item;
use super::Query;
use super::StoreError;

/// Client for a single Deta Base, over its HTTP API:
///
/// ```text
/// POST   {base_url}/{project_id}/{base_name}/items         {"item": {...}}
/// GET    {base_url}/{project_id}/{base_name}/items/{key}
/// PATCH  {base_url}/{project_id}/{base_name}/items/{key}   {"set": {...}}
/// DELETE {base_url}/{project_id}/{base_name}/items/{key}
/// POST   {base_url}/{project_id}/{base_name}/query         {"query": [...], "last": ...}
/// ```
///
/// Every request carries the project key in `X-API-Key`.
#[derive(Clone, Debug)]
pub struct DetaBase {
    http_client: Client,
    name: String,
    /// `{base_url}/{project_id}/{base_name}`
    url: Url,
    project_key: Secret<String>,
}

#[derive(Serialize)]
struct InsertBody {
    item: Item,
}

#[derive(Serialize)]
struct UpdateBody {
    set: Item,
}

#[derive(Serialize)]
struct QueryBody<'a> {
    // deta expects a list of OR'ed filter objects; we only ever send one
    #[serde(skip_serializing_if = "Vec::is_empty")]
    query: Vec<&'a Query>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last: Option<String>,
}

#[derive(Deserialize)]
struct QueryResponse {
    items: Vec<Item>,
    paging: Paging,
}

#[derive(Deserialize)]
struct Paging {
    /// Present only if there are more pages
    last: Option<String>,
}

#[derive(Deserialize)]
struct KeyResponse {
    key: String,
}

impl DetaBase {
    pub fn http_client() -> Result<Client, anyhow::Error> {
        Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client for the store")
    }

    /// The project id is the part of the project key before the first `_`
    pub fn new(
        http_client: Client,
        base_url: &str,
        project_key: Secret<String>,
        name: String,
    ) -> Result<Self, anyhow::Error> {
        let project_id = project_key
            .expose_secret()
            .split_once('_')
            .map(|(id, _)| id.to_owned())
            .filter(|id| !id.is_empty())
            .context("Deta project key must look like `<project id>_<secret>`")?;
        let mut url = Url::parse(base_url).context("Invalid Deta base url")?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Deta base url cannot have a path"))?
            .pop_if_empty()
            .push(&project_id)
            .push(&name);
        Ok(Self {
            http_client,
            name,
            url,
            project_key,
        })
    }

    pub fn name(&self) -> &str { &self.name }

    /// `url` extended by `segments`, each percent-encoded as a single path
    /// segment, so a key can never point outside this base
    fn endpoint(
        &self,
        segments: &[&str],
    ) -> Url {
        let mut url = self.url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    /// Keys are opaque to us but are never empty, and never `.` or `..`, which
    /// would be dropped from the path
    fn item_url(
        &self,
        key: &str,
    ) -> Option<Url> {
        match key {
            "" | "." | ".." => None,
            _ => Some(self.endpoint(&["items", key])),
        }
    }

    fn request(
        &self,
        method: reqwest::Method,
        url: Url,
    ) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, url)
            .header("X-API-Key", self.project_key.expose_secret())
    }

    /// Follows `paging.last` until every page has been read
    pub async fn fetch(
        &self,
        query: &Query,
    ) -> Result<Vec<Item>, StoreError> {
        let mut items = vec![];
        let mut last = None;
        loop {
            let body = QueryBody {
                query: if query.is_empty() { vec![] } else { vec![query] },
                last,
            };
            let page: QueryResponse = self
                .request(reqwest::Method::POST, self.endpoint(&["query"]))
                .json(&body)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            items.extend(page.items);
            match page.paging.last {
                Some(l) => last = Some(l),
                None => break,
            }
        }
        Ok(items)
    }

    pub async fn get(
        &self,
        key: &str,
    ) -> Result<Option<Item>, StoreError> {
        let Some(url) = self.item_url(key) else {
            return Ok(None);
        };
        let resp = self
            .request(reqwest::Method::GET, url)
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(resp.error_for_status()?.json().await?))
    }

    pub async fn insert(
        &self,
        item: Item,
    ) -> Result<String, StoreError> {
        let created: KeyResponse = self
            .request(reqwest::Method::POST, self.endpoint(&["items"]))
            .json(&InsertBody { item })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(created.key)
    }

    pub async fn update(
        &self,
        key: &str,
        updates: Item,
    ) -> Result<(), StoreError> {
        let url = self
            .item_url(key)
            .ok_or_else(|| StoreError::NotFound(key.to_owned()))?;
        let resp = self
            .request(reqwest::Method::PATCH, url)
            .json(&UpdateBody { set: updates })
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(key.to_owned()));
        }
        resp.error_for_status()?;
        Ok(())
    }

    pub async fn delete(
        &self,
        key: &str,
    ) -> Result<(), StoreError> {
        // deleting an absent key succeeds
        let Some(url) = self.item_url(key) else {
            return Ok(());
        };
        self.request(reqwest::Method::DELETE, url)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
