//! Storyblok management API client.

use anyhow::{Context, bail};
use async_trait::async_trait;
use blokgen_migrate::{ApiCredentials, ContentApi};
use blokgen_types::ContentEntry;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://mapi.storyblok.com";
const PER_PAGE: usize = 100;

pub struct HttpContentApi {
    base_url: String,
    space_id: String,
    token: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct StoryList {
    #[serde(default)]
    stories: Vec<Value>,
}

#[derive(Deserialize)]
struct StoryEnvelope {
    story: Value,
}

impl HttpContentApi {
    pub fn new(base_url: &str, space_id: &str, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            space_id: space_id.to_string(),
            token: token.into(),
            client: reqwest::Client::new(),
        }
    }

    fn stories_url(&self) -> String {
        format!("{}/v1/spaces/{}/stories", self.base_url, self.space_id)
    }

    async fn get_story(&self, id: &str) -> anyhow::Result<ContentEntry> {
        let url = format!("{}/{}", self.stories_url(), id);
        let resp = self
            .client
            .get(&url)
            .header("Authorization", &self.token)
            .send()
            .await
            .with_context(|| format!("fetching story {id}"))?;
        if !resp.status().is_success() {
            bail!("fetch story {id} failed: {}", resp.status());
        }
        let envelope: StoryEnvelope = resp.json().await.with_context(|| format!("decoding story {id}"))?;
        Ok(ContentEntry::new(envelope.story))
    }
}

#[async_trait]
impl ContentApi for HttpContentApi {
    fn credentials(&self) -> ApiCredentials {
        ApiCredentials {
            space_id: self.space_id.clone(),
            base_url: self.base_url.clone(),
        }
    }

    /// The listing endpoint returns stories without content, so each one is fetched in full.
    async fn get_entries(&self, component: &str) -> anyhow::Result<Vec<ContentEntry>> {
        let mut ids = Vec::new();
        let mut page = 1usize;
        loop {
            let per_page = PER_PAGE.to_string();
            let page_param = page.to_string();
            let resp = self
                .client
                .get(self.stories_url())
                .header("Authorization", &self.token)
                .query(&[
                    ("contain_component", component),
                    ("page", page_param.as_str()),
                    ("per_page", per_page.as_str()),
                ])
                .send()
                .await
                .with_context(|| format!("listing stories page {page}"))?;
            if !resp.status().is_success() {
                bail!("list stories failed: {}", resp.status());
            }
            let list: StoryList = resp.json().await.context("decoding story list")?;
            let count = list.stories.len();
            for story in list.stories {
                match ContentEntry::new(story).id() {
                    Some(id) => ids.push(id),
                    None => bail!("story listing returned an entry without id"),
                }
            }
            debug!(component, page, count, "listed stories");
            if count < PER_PAGE {
                break;
            }
            page += 1;
        }

        let mut entries = Vec::with_capacity(ids.len());
        for id in &ids {
            entries.push(self.get_story(id).await?);
        }
        Ok(entries)
    }

    async fn put_entry(&self, entry: &ContentEntry) -> anyhow::Result<ContentEntry> {
        let id = entry.id().context("entry has no id")?;
        let url = format!("{}/{}", self.stories_url(), id);
        let resp = self
            .client
            .put(&url)
            .header("Authorization", &self.token)
            .json(&json!({ "story": entry.as_value(), "force_update": "1" }))
            .send()
            .await
            .with_context(|| format!("updating story {id}"))?;
        if !resp.status().is_success() {
            let status = resp.status();
            bail!(
                "update story {id} failed: {} {}",
                status,
                resp.text().await.unwrap_or_default()
            );
        }
        let envelope: StoryEnvelope = resp.json().await.with_context(|| format!("decoding story {id}"))?;
        Ok(ContentEntry::new(envelope.story))
    }
}
