use std::{collections::HashSet, sync::OnceLock};

use regex::Regex;
use scraper::{Html, Selector};

pub const DEFAULT_LISTING_URL: &str = "https://github.com/ONSdigital/sdg-data/tree/develop/data";

const RAW_CONTENT_HOST: &str = "https://raw.githubusercontent.com";

fn csv_link() -> &'static Regex {
    static LINK: OnceLock<Regex> = OnceLock::new();
    LINK.get_or_init(|| {
        Regex::new(r"/ONSdigital/sdg-data/blob/develop/data/indicator_\d{1,2}-\d{1,2}-\d{1,2}\.csv")
            .expect("valid link pattern")
    })
}

pub fn raw_url(href: &str) -> String {
    let path = href.replacen("/sdg-data/blob/develop", "/sdg-data/develop", 1);
    format!("{RAW_CONTENT_HOST}{path}")
}

/// Returns the raw-content URLs of every indicator CSV linked from `html`,
/// first occurrence order, without duplicates.
pub fn find_csv_urls(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a[href]").expect("valid anchor selector");
    let mut seen = HashSet::new();
    document
        .select(&anchors)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter(|href| csv_link().is_match(href))
        .map(raw_url)
        .filter(|url| seen.insert(url.clone()))
        .collect()
}
