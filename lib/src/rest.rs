//! Minimal PostgREST and storage client.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::config::BackendConfig;
use crate::{Error, Result};

const RETURN_REPRESENTATION: &str = "return=representation";
const MERGE_DUPLICATES: &str = "resolution=merge-duplicates,return=representation";
const IGNORE_DUPLICATES: &str = "resolution=ignore-duplicates,return=minimal";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

/// `column=eq.value` filter.
pub fn eq(column: &str, value: impl ToString) -> (String, String) {
    (column.to_owned(), format!("eq.{}", value.to_string()))
}

/// Body of a PostgREST error response.
#[derive(Deserialize, Debug)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Clone, Debug)]
pub struct RestClient {
    client: Client,
    config: BackendConfig,
}

impl RestClient {
    pub fn new(config: BackendConfig) -> Result<Self> {
        let key = config.anon_key.expose_secret();
        let mut headers = HeaderMap::new();

        headers.insert("apikey", header_value(key)?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {key}"))?);

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self { client, config })
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "backend request");

        self.client.request(method, url)
    }

    /// Every row of `table`, optionally ordered by one column.
    pub async fn select<T>(&self, table: &str, order: Option<(&str, Order)>) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, self.config.rest_url(table)?)
            .query(&select_query(order))
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    /// Inserts `rows` (one object or an array) and returns the stored rows.
    pub async fn insert<B, T>(&self, table: &str, rows: &B) -> Result<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::POST, self.config.rest_url(table)?)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(rows)
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    /// Inserts `rows`, silently skipping those that collide on `on_conflict`.
    pub async fn insert_missing<B>(&self, table: &str, on_conflict: &str, rows: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let response = self
            .request(Method::POST, self.config.rest_url(table)?)
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", IGNORE_DUPLICATES)
            .json(rows)
            .send()
            .await?;

        check(response).await?;

        Ok(())
    }

    /// Inserts or merges `rows` on the `on_conflict` columns.
    pub async fn upsert<B, T>(&self, table: &str, on_conflict: &str, rows: &B) -> Result<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::POST, self.config.rest_url(table)?)
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", MERGE_DUPLICATES)
            .json(rows)
            .send()
            .await?;

        Ok(check(response).await?.json().await?)
    }

    /// Applies `changes` to the rows matching every filter.
    pub async fn update<B>(&self, table: &str, filters: &[(String, String)], changes: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let response = self
            .request(Method::PATCH, self.config.rest_url(table)?)
            .query(filters)
            .json(changes)
            .send()
            .await?;

        check(response).await?;

        Ok(())
    }

    pub async fn delete(&self, table: &str, filters: &[(String, String)]) -> Result<()> {
        let response = self
            .request(Method::DELETE, self.config.rest_url(table)?)
            .query(filters)
            .send()
            .await?;

        check(response).await?;

        Ok(())
    }

    pub async fn rpc<B>(&self, function: &str, args: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let response = self
            .request(Method::POST, self.config.rest_url(&format!("rpc/{function}"))?)
            .json(args)
            .send()
            .await?;

        check(response).await?;

        Ok(())
    }

    /// Deletes `paths` from a storage bucket.
    pub async fn remove_objects(&self, bucket: &str, paths: &[String]) -> Result<()> {
        let response = self
            .request(
                Method::DELETE,
                self.config.storage_url(&format!("object/{bucket}"))?,
            )
            .json(&json!({ "prefixes": paths }))
            .send()
            .await?;

        check(response).await?;

        Ok(())
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| Error::Backend {
        status: 0,
        code: None,
        message: "backend key is not a valid header value".to_owned(),
    })
}

fn select_query(order: Option<(&str, Order)>) -> Vec<(String, String)> {
    let mut query = vec![("select".to_owned(), "*".to_owned())];

    if let Some((column, order)) = order {
        let direction = match order {
            Order::Ascending => "asc",
            Order::Descending => "desc",
        };
        query.push(("order".to_owned(), format!("{column}.{direction}")));
    }

    query
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();

    Err(backend_error(status.as_u16(), &text))
}

fn backend_error(status: u16, text: &str) -> Error {
    match serde_json::from_str::<ErrorBody>(text) {
        Ok(body) => Error::Backend {
            status,
            code: body.code,
            message: body.message.unwrap_or_else(|| text.to_owned()),
        },
        Err(_) => Error::Backend {
            status,
            code: None,
            message: text.to_owned(),
        },
    }
}
