//! `POST /scrape` form fields and the presentation page

use serde::Deserialize;

use crate::config::{ScrapeMode, SessionConfig, SummarizerSettings};
use crate::error::{ScrapeError, ScrapeResult};
use crate::pipeline::ScrapeRequest;

/// Form body of `POST /scrape`. Empty inputs arrive as empty strings and are
/// treated as absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeForm {
    #[serde(default)]
    pub auth_token: String,
    #[serde(default, rename = "openAIKey")]
    pub open_ai_key: Option<String>,
    #[serde(default, rename = "openAIBase")]
    pub open_ai_base: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub browser_path: String,
    #[serde(default, rename = "twitterListURL")]
    pub twitter_list_url: String,
    #[serde(default, rename = "proxyURL")]
    pub proxy_url: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    /// `sync` (default) or `detached`
    #[serde(default)]
    pub mode: Option<String>,
}

impl ScrapeForm {
    /// Validate the fields and turn them into a pipeline request.
    ///
    /// Every failure is a [`ScrapeError::Config`].
    pub fn into_request(self, headless: bool) -> ScrapeResult<ScrapeRequest> {
        let mode = parse_mode(self.mode.as_deref())?;
        let auth_token = required("authToken", &self.auth_token)?;
        let browser_path = required("browserPath", &self.browser_path)?;
        let target_url = required("twitterListURL", &self.twitter_list_url)?;

        let session = SessionConfig::builder()
            .browser_path(Some(browser_path))
            .proxy_url(self.proxy_url)
            .headless(headless)
            .target_url(target_url)
            .auth_token(auth_token)
            .build()
            .map_err(|e| ScrapeError::Config(format!("{e:#}")))?;

        let summarizer = self
            .open_ai_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .map(|key| {
                SummarizerSettings::new(key)
                    .with_base_url(self.open_ai_base)
                    .with_model(self.model)
                    .with_prompt_template(self.prompt)
            });

        if mode == ScrapeMode::Synchronous && summarizer.is_none() {
            return Err(ScrapeError::Config(
                "openAIKey is required in sync mode".to_string(),
            ));
        }

        Ok(ScrapeRequest {
            session,
            summarizer,
            mode,
        })
    }
}

fn required<'a>(field: &str, value: &'a str) -> ScrapeResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ScrapeError::Config(format!("{field} is required")));
    }
    Ok(trimmed)
}

fn parse_mode(raw: Option<&str>) -> ScrapeResult<ScrapeMode> {
    match raw.map(str::trim).unwrap_or_default() {
        "" | "sync" | "synchronous" => Ok(ScrapeMode::Synchronous),
        "detached" | "async" => Ok(ScrapeMode::Detached),
        other => Err(ScrapeError::Config(format!(
            "Unknown mode '{other}', expected 'sync' or 'detached'"
        ))),
    }
}

pub const FORM_HTML: &str = r#"<html>
  <head>
    <title>Feed Digest</title>
  </head>
  <body>
    <form method="post" action="/scrape">
      <label for="authToken">Auth Token:</label>
      <input type="text" id="authToken" name="authToken" required><br><br>
      <label for="openAIKey">OpenAI Key:</label>
      <input type="text" id="openAIKey" name="openAIKey"><br><br>
      <label for="openAIBase">OpenAI Base URL:</label>
      <input type="text" id="openAIBase" name="openAIBase"><br><br>
      <label for="model">Model:</label>
      <input type="text" id="model" name="model"><br><br>
      <label for="browserPath">Browser Path:</label>
      <input type="text" id="browserPath" name="browserPath" required><br><br>
      <label for="twitterListURL">List URL:</label>
      <input type="text" id="twitterListURL" name="twitterListURL" required><br><br>
      <label for="proxyURL">Proxy URL:</label>
      <input type="text" id="proxyURL" name="proxyURL"><br><br>
      <label for="prompt">Prompt:</label>
      <input type="text" id="prompt" name="prompt"><br><br>
      <label for="mode">Mode:</label>
      <select id="mode" name="mode">
        <option value="sync" selected>Summarize now</option>
        <option value="detached">Scrape in background</option>
      </select><br><br>
      <input type="submit" value="Scrape">
    </form>
  </body>
</html>
"#;
