//! Jira-compatible REST client.
//!
//! The API token is sent as a bearer token. The Authorization header goes
//! through `RedactedHeader`, so it never shows up in `Debug` output even
//! if reqwest request logging is turned on.

use std::fmt;
use std::time::Duration;

use dashmap::DashMap;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretBox};
use serde::Deserialize;
use url::Url;

use crate::config::Config;
use crate::error::{DeckError, Result};
use crate::types::{CompiledQuery, Issue, SearchResponse, SelectOption};

use super::IssueTracker;
use super::error::{ApiError, error_message};

const PROVIDER: &str = "Jira";
const SEARCH_PATH: &str = "rest/api/2/search";
const SUGGESTIONS_PATH: &str = "rest/api/2/jql/autocompletedata/suggestions";
const SEARCH_FIELDS: &str = "summary,status,assignee,updated";

/// Autocomplete suggestions highlight the matched prefix with `<b>` tags
static HIGHLIGHT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?b>").expect("highlight regex should be valid"));

struct RedactedHeader {
    value: String,
}

impl RedactedHeader {
    fn bearer(token: &str) -> Self {
        Self {
            value: format!("Bearer {token}"),
        }
    }

    fn as_header_value(&self) -> Result<header::HeaderValue> {
        let mut value = header::HeaderValue::from_str(&self.value)
            .map_err(|_| DeckError::Auth("API token contains invalid characters".to_string()))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Display for RedactedHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Debug for RedactedHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedactedHeader")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    total: u32,
    #[serde(default)]
    issues: Vec<IssueBody>,
}

#[derive(Debug, Deserialize)]
struct IssueBody {
    key: String,
    #[serde(default)]
    fields: IssueFields,
}

#[derive(Debug, Default, Deserialize)]
struct IssueFields {
    #[serde(default)]
    summary: String,
    status: Option<Named>,
    assignee: Option<Person>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Person {
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct SuggestionsBody {
    #[serde(default)]
    results: Vec<Suggestion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Suggestion {
    value: String,
    display_name: Option<String>,
}

impl From<IssueBody> for Issue {
    fn from(body: IssueBody) -> Self {
        Issue {
            key: body.key,
            summary: body.fields.summary,
            status: body.fields.status.map(|s| s.name).unwrap_or_default(),
            assignee: body.fields.assignee.map(|a| a.display_name),
            updated: body.fields.updated,
        }
    }
}

impl From<Suggestion> for SelectOption {
    fn from(suggestion: Suggestion) -> Self {
        let display = suggestion
            .display_name
            .map(|d| HIGHLIGHT.replace_all(&d, "").into_owned())
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| suggestion.value.clone());
        SelectOption::new(display, suggestion.value)
    }
}

fn parse_search(body: &str) -> Result<SearchResponse> {
    let parsed: SearchBody = serde_json::from_str(body)?;
    Ok(SearchResponse {
        total: parsed.total,
        issues: parsed.issues.into_iter().map(Issue::from).collect(),
    })
}

fn parse_suggestions(body: &str) -> Result<Vec<SelectOption>> {
    let parsed: SuggestionsBody = serde_json::from_str(body)?;
    Ok(parsed.results.into_iter().map(SelectOption::from).collect())
}

/// Query-language name of a filter field, unquoted for use as a URL parameter
fn api_field_name(fields: &IndexMap<String, String>, name: &str) -> String {
    fields
        .get(name)
        .map(|f| f.trim_matches('"').to_string())
        .unwrap_or_else(|| name.to_string())
}

type OptionKey = (String, Option<(String, String)>);

pub struct JiraClient {
    client: Client,
    base_url: Url,
    token: SecretBox<String>,
    fields: IndexMap<String, String>,
    option_cache: DashMap<OptionKey, Vec<SelectOption>>,
}

impl JiraClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let base_url = config.base_url()?;
        let token = config.token().ok_or_else(|| {
            DeckError::Auth(
                "API token not configured. Set ISSUEDECK_TOKEN or run: issuedeck config set auth.token <token>".to_string(),
            )
        })?;
        Self::new(
            base_url,
            &token,
            config.query.fields.clone(),
            config.remote_timeout(),
        )
    }

    pub fn new(
        base_url: Url,
        token: &str,
        fields: IndexMap<String, String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(30)))
            .build()?;

        Ok(Self {
            client,
            base_url,
            token: SecretBox::new(Box::new(token.to_string())),
            fields,
            option_cache: DashMap::new(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path)
            .map_err(|e| DeckError::Config(format!("invalid endpoint '{path}': {e}")))
    }

    fn search_url(&self, query: &CompiledQuery, offset: u32, limit: u32) -> Result<Url> {
        let mut url = self.endpoint(SEARCH_PATH)?;
        url.query_pairs_mut()
            .append_pair("jql", query.as_str())
            .append_pair("startAt", &offset.to_string())
            .append_pair("maxResults", &limit.to_string())
            .append_pair("fields", SEARCH_FIELDS);
        Ok(url)
    }

    fn suggestions_url(&self, field: &str, predicate: Option<(&str, &str)>) -> Result<Url> {
        let mut url = self.endpoint(SUGGESTIONS_PATH)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("fieldName", &api_field_name(&self.fields, field));
            if let Some((parent_field, parent_value)) = predicate {
                pairs
                    .append_pair("predicateName", &api_field_name(&self.fields, parent_field))
                    .append_pair("predicateValue", parent_value);
            }
        }
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<String> {
        let auth_header = RedactedHeader::bearer(self.token.expose_secret());
        tracing::debug!(url = %url, auth = %auth_header, "tracker request");

        let response = self
            .client
            .get(url)
            .header(header::AUTHORIZATION, auth_header.as_header_value()?)
            .header(
                header::ACCEPT,
                header::HeaderValue::from_static("application/json"),
            )
            .send()
            .await?;

        read_body(response).await
    }

    async fn options(&self, key: OptionKey) -> Result<Vec<SelectOption>> {
        let cached = self.option_cache.get(&key).map(|entry| entry.value().clone());
        if let Some(options) = cached {
            return Ok(options);
        }

        let (field, predicate) = &key;
        let url = self.suggestions_url(
            field,
            predicate.as_ref().map(|(f, v)| (f.as_str(), v.as_str())),
        )?;
        let options = parse_suggestions(&self.get(url).await?)?;
        self.option_cache.insert(key, options.clone());
        Ok(options)
    }
}

async fn read_body(response: Response) -> Result<String> {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok());
    let body = response.text().await?;

    if !status.is_success() {
        return Err(ApiError::with_status(error_message(status, &body), PROVIDER, status)
            .with_retry_after(retry_after)
            .into());
    }
    Ok(body)
}

impl IssueTracker for JiraClient {
    async fn search_issues(
        &self,
        query: &CompiledQuery,
        offset: u32,
        limit: u32,
    ) -> Result<SearchResponse> {
        let url = self.search_url(query, offset, limit)?;
        parse_search(&self.get(url).await?)
    }

    async fn load_options(&self, field: &str) -> Result<Vec<SelectOption>> {
        self.options((field.to_string(), None)).await
    }

    async fn load_child_options(
        &self,
        field: &str,
        parent_field: &str,
        parent_value: Option<&str>,
    ) -> Result<Vec<SelectOption>> {
        let predicate = parent_value.map(|v| (parent_field.to_string(), v.to_string()));
        self.options((field.to_string(), predicate)).await
    }
}
