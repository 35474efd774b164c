//! AP News homepage scraper.
//!
//! AP has no text-only edition, so this adapter walks the homepage's
//! promotional title cards (`.PagePromo-title`), follows each link that
//! looks like an article, and pulls body paragraphs out of the story markup.
//!
//! HTML parsing happens in synchronous helpers ([`extract_candidates`],
//! [`extract_article_content`]) because `scraper::Html` is not `Send`; the
//! async fetch loop only ever holds plain strings across await points.

use crate::models::{Item, SourceItems, title_outranks};
use crate::scrapers::{ARTICLE_FETCH_DELAY, SourceAdapter, http_client};
use crate::utils::ProgressMeter;
use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use tokio::time::sleep;
use tracing::{error, info, instrument};
use url::Url;

const AP_HOME_URL: &str = "https://apnews.com/";

/// A homepage link worth following: its href and the visible link text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub href: String,
    pub title: String,
}

pub struct ApAdapter {
    client: reqwest::Client,
    home_url: String,
}

impl ApAdapter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            home_url: AP_HOME_URL.to_string(),
        })
    }

    async fn fetch_article_content(&self, href: &str) -> Result<String> {
        let body = self
            .client
            .get(href)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
            .with_context(|| format!("failed to read article body: {href}"))?;
        Ok(extract_article_content(&body))
    }
}

#[async_trait]
impl SourceAdapter for ApAdapter {
    fn name(&self) -> &'static str {
        "AP"
    }

    #[instrument(level = "info", skip_all)]
    async fn fetch(&self) -> Result<SourceItems> {
        let home_html = self
            .client
            .get(&self.home_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
            .context("failed to read AP homepage")?;

        let candidates = extract_candidates(&home_html);
        info!(count = candidates.len(), "found AP links");

        let started = std::time::Instant::now();
        let progress = ProgressMeter::new(candidates.len(), "tried AP links");

        let mut items = SourceItems::new();
        for candidate in candidates {
            // Articles can be linked to multiple times; prefer the link with
            // the most informative title and skip refetching known ones.
            if let Some(known) = items.get(&candidate.href)
                && title_outranks(&known.title, &candidate.title)
            {
                info!(url = %candidate.href, "skipping known AP article link");
                progress.increment();
                continue;
            }

            info!(url = %candidate.href, title = %candidate.title, "getting content for AP article link");

            match self.fetch_article_content(&candidate.href).await {
                Ok(content) => {
                    if content.is_empty() {
                        info!(url = %candidate.href, "got empty content for AP article link");
                    }
                    items.insert(
                        candidate.href.clone(),
                        Item {
                            title: candidate.title,
                            url: candidate.href,
                            content,
                        },
                    );
                }
                Err(e) => {
                    error!(url = %candidate.href, error = %e, "failed to handle AP link");
                }
            }

            progress.increment();
            sleep(ARTICLE_FETCH_DELAY).await;
        }

        info!(
            count = items.len(),
            elapsed_secs = started.elapsed().as_secs_f64(),
            "loaded AP items"
        );
        Ok(items)
    }
}

/// Pull article candidates out of the homepage markup.
///
/// A candidate needs an `<a>` tag inside its promo title, an href pointing
/// at an `/article/` path, and non-empty visible text. Everything else is
/// logged and skipped.
pub fn extract_candidates(home_html: &str) -> Vec<Candidate> {
    let document = Html::parse_document(home_html);
    let promo_selector = Selector::parse(".PagePromo-title").unwrap();
    let anchor_selector = Selector::parse("a").unwrap();

    let mut candidates = Vec::new();
    for promo in document.select(&promo_selector) {
        let Some(a_tag) = promo.select(&anchor_selector).next() else {
            info!("skipping AP link with no <a> tag");
            continue;
        };

        let Some(href) = a_tag.value().attr("href") else {
            info!("skipping AP link with no href");
            continue;
        };

        if !is_article_href(href) {
            info!(url = %href, "skipping non-article AP link");
            continue;
        }

        let title = promo.text().collect::<String>().trim().to_string();
        if title.is_empty() {
            info!(url = %href, "skipping AP link with empty title");
            continue;
        }

        candidates.push(Candidate {
            href: href.to_string(),
            title,
        });
    }
    candidates
}

/// Homepage cards also link to hubs, videos, and live pages; only `/article/`
/// paths are stories.
fn is_article_href(href: &str) -> bool {
    match Url::parse(href) {
        Ok(parsed) => parsed.path().contains("/article/"),
        Err(_) => href.contains("/article/"),
    }
}

/// Assemble body text from an article page.
///
/// Takes only direct `<p>` children of the story body container, which
/// excludes nested boilerplate. Each paragraph's raw text keeps its interior
/// whitespace (e.g. around inline links) and is only trimmed at the edges.
pub fn extract_article_content(article_html: &str) -> String {
    let document = Html::parse_document(article_html);
    let paragraph_selector = Selector::parse(".RichTextStoryBody > p").unwrap();

    let paragraphs = document
        .select(&paragraph_selector)
        .map(|p_tag| p_tag.text().collect::<String>().trim().to_string());

    assemble_paragraphs(paragraphs)
}

/// Join paragraphs with single spaces, stopping at the first one that opens
/// with an underscore or em-dash run. Some articles end with editorial notes
/// below a horizontal rule of varying length; we don't need them.
pub fn assemble_paragraphs(paragraphs: impl IntoIterator<Item = String>) -> String {
    let mut contents = Vec::new();
    for paragraph in paragraphs {
        if paragraph.starts_with("__") || paragraph.starts_with("——") {
            break;
        }
        contents.push(paragraph);
    }
    contents.join(" ")
}
