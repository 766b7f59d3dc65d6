// src/pipeline/fetch.rs

//! Downloads wiki pages into the input folder.

use std::path::PathBuf;

use url::Url;

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::storage::LocalStorage;
use crate::utils::{http, log};

/// One saved page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub page: String,
    pub path: PathBuf,
    pub bytes: usize,
}

/// URL of a wiki page. Raw mode asks for the wikitext source.
pub fn page_url(base: &Url, page: &str, raw: bool) -> Result<Url> {
    let mut url = base.join(&page.trim().replace(' ', "_"))?;
    if raw {
        url.query_pairs_mut().append_pair("action", "raw");
    }
    Ok(url)
}

/// File name a page is saved under.
pub fn page_file_name(page: &str, raw: bool) -> String {
    let stem: String = page
        .trim()
        .replace('_', " ")
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '-' } else { c })
        .collect();
    let ext = if raw { "json" } else { "html" };
    format!("{stem}.{ext}")
}

/// Fetch every page and save it into the input folder. A page that fails is
/// logged and skipped; the run fails only when nothing was saved.
pub async fn run_fetch(config: &Config, pages: &[String], raw: bool) -> Result<Vec<FetchedPage>> {
    config.validate()?;
    log::header("Fetching wiki pages");

    let client = http::create_async_client(&config.fetch)?;
    let base = Url::parse(&config.fetch.base_url)?;
    let input = LocalStorage::new(&config.paths.input_dir);

    let mut fetched = Vec::with_capacity(pages.len());
    for page in pages {
        let url = page_url(&base, page, raw)?;
        let body = match http::fetch_text(&client, url.as_str()).await {
            Ok(body) => body,
            Err(e) => {
                ::log::warn!("{}: {}", url, e);
                continue;
            }
        };

        let file_name = page_file_name(page, raw);
        let bytes = if raw {
            let wrapper = serde_json::json!({
                "title": page.trim().replace('_', " "),
                "source": body,
            });
            let bytes = serde_json::to_vec_pretty(&wrapper)?;
            input.write_bytes(&file_name, &bytes).await?;
            bytes.len()
        } else {
            input.write_bytes(&file_name, body.as_bytes()).await?;
            body.len()
        };

        let path = input.path(&file_name);
        log::sub_item(&format!("{} -> {} ({} bytes)", url, path.display(), bytes));
        fetched.push(FetchedPage {
            page: page.clone(),
            path,
            bytes,
        });
    }

    if fetched.is_empty() && !pages.is_empty() {
        return Err(AppError::config(format!(
            "none of the {} page(s) could be fetched from {}",
            pages.len(),
            config.fetch.base_url
        )));
    }

    log::success(&format!("Saved {} of {} page(s)", fetched.len(), pages.len()));
    Ok(fetched)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://eterspire.wiki/index.php/").unwrap()
    }

    #[test]
    fn test_page_url() {
        assert_eq!(
            page_url(&base(), "Bronze Gear", false).unwrap().as_str(),
            "https://eterspire.wiki/index.php/Bronze_Gear"
        );
        assert_eq!(
            page_url(&base(), "Bronze Gear", true).unwrap().as_str(),
            "https://eterspire.wiki/index.php/Bronze_Gear?action=raw"
        );
    }

    #[test]
    fn test_page_file_name() {
        assert_eq!(page_file_name("Bronze_Gear", false), "Bronze Gear.html");
        assert_eq!(page_file_name("Gear/Steel", true), "Gear-Steel.json");
    }
}
