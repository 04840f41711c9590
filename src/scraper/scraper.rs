use crate::config::AppConfig;
use crate::db::connection::Database;
use crate::db::listings::{mark_absent_unavailable, save_listings};
use crate::domain::listing::PostType;
use crate::domain::logic::derive_listing_status;
use crate::scraper::RawListing;
use crate::scraper::ScraperError;
use chrono::{NaiveDate, Utc};
use rand::Rng;
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0 Safari/537.36";

pub const PAGE_SOURCE: &str = "Pararius";

pub struct ListingScraper {
    client: Client,
}

/// One parsed index page: its listing cards plus, on the first page, the
/// total page count read from the pagination bar.
pub struct IndexPage {
    pub listings: Vec<RawListing>,
    pub max_pages: Option<usize>,
}

impl ListingScraper {
    pub fn new() -> Result<Self, ScraperError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(360))
            .build()
            .map_err(|e| ScraperError::Network(e.to_string()))?;

        Ok(Self { client })
    }

    /// Fire-and-forget scrape for the admin trigger; progress goes to the log
    /// and the scrape_runs table.
    pub fn spawn_scrape(db: &Database, cfg: &AppConfig) {
        let db = db.clone(); // cheap clone (path only)
        let cfg = cfg.clone();

        std::thread::spawn(move || {
            Self::run_full_scrape(&db, &cfg);
        });
    }

    /// One complete cycle over both market sides. Each side gets its own
    /// scrape_runs row; absent listings are flipped to Unavailable only when
    /// that side's cycle finished without error.
    pub fn run_full_scrape(db: &Database, cfg: &AppConfig) {
        for post_type in [PostType::Buy, PostType::Rent] {
            Self::run_post_type(db, cfg, post_type);
        }
    }

    fn run_post_type(db: &Database, cfg: &AppConfig, post_type: PostType) {
        let run_id = db
            .with_conn(|conn| {
                crate::db::scrapes::start_scrape_run(
                    conn,
                    PAGE_SOURCE,
                    post_type.as_str(),
                    Utc::now().timestamp(),
                )
            })
            .unwrap_or(0);

        eprintln!("🧵 {} {} scrape started", PAGE_SOURCE, post_type.as_str());

        let scrape_date = Utc::now().date_naive();
        let mut pages = 0;
        let mut listings_seen = 0;
        let mut seen_urls: HashSet<String> = HashSet::new();

        let result: Result<(), ScraperError> = (|| {
            let scraper = ListingScraper::new()?;
            for base_url in index_urls(&cfg.city, post_type) {
                scraper.fetch_index(&base_url, post_type, scrape_date, |mut batch| {
                    pages += 1;
                    batch.retain(|l| seen_urls.insert(l.url.clone()));
                    listings_seen += batch.len();
                    save_listings(db, &batch).map_err(|e| ScraperError::Db(e.to_string()))?;
                    Ok(())
                })?;
            }
            Ok(())
        })();

        let finished_at = Utc::now().timestamp();
        match result {
            Ok(()) => {
                match mark_absent_unavailable(db, post_type, scrape_date) {
                    Ok(flipped) => eprintln!(
                        "🏁 {} {} scrape done: {pages} pages, {listings_seen} listings, {flipped} now unavailable",
                        PAGE_SOURCE,
                        post_type.as_str()
                    ),
                    Err(e) => eprintln!("⚠️ Could not update absent listings: {e}"),
                }
                let _ = db.with_conn(|conn| {
                    crate::db::scrapes::end_scrape_run(
                        conn,
                        run_id,
                        finished_at,
                        pages,
                        listings_seen,
                        true,
                        None,
                    )
                });
            }
            Err(e) => {
                eprintln!(
                    "❌ {} {} scrape failed: {e}",
                    PAGE_SOURCE,
                    post_type.as_str()
                );
                let _ = db.with_conn(|conn| {
                    crate::db::scrapes::end_scrape_run(
                        conn,
                        run_id,
                        finished_at,
                        pages,
                        listings_seen,
                        false,
                        Some(e.to_string()),
                    )
                });
            }
        }
    }

    /// Walk one listing index page by page, handing each parsed batch to
    /// `on_page`. Stops cleanly at the page count from the pagination bar or
    /// at an empty page; three straight page failures abort the index with
    /// an error so the caller never mistakes a truncated cycle for a
    /// complete one.
    pub fn fetch_index<F>(
        &self,
        base_url: &str,
        post_type: PostType,
        scrape_date: NaiveDate,
        mut on_page: F,
    ) -> Result<(), ScraperError>
    where
        F: FnMut(Vec<RawListing>) -> Result<(), ScraperError>,
    {
        let mut page = 1;
        let mut max_pages = 1;
        let mut consecutive_failures = 0;

        while page <= max_pages {
            let page_url = format!("{base_url}page-{page}");
            eprintln!("📄 Scraping page {page}/{max_pages}: {page_url}");

            match self.fetch_page_html(&page_url, page) {
                Ok(html) => {
                    #[cfg(debug_assertions)]
                    {
                        let _ = std::fs::write("pararius_debug.html", &html);
                    }

                    let parsed = parse_index_page(&html, base_url, post_type, scrape_date)?;
                    if page == 1 {
                        if let Some(n) = parsed.max_pages {
                            max_pages = n;
                            eprintln!("📄 Index reports {n} pages");
                        }
                    }
                    if parsed.listings.is_empty() {
                        eprintln!("🏁 No listings on page {page}, stopping");
                        break;
                    }

                    eprintln!("✅ Page {page} parsed ({} listings)", parsed.listings.len());
                    on_page(parsed.listings)?;

                    page += 1;
                    consecutive_failures = 0;
                    std::thread::sleep(Duration::from_secs(2));
                }

                Err(e) => {
                    consecutive_failures += 1;
                    eprintln!("⚠️ Page {page} failed (attempt {consecutive_failures}): {e}");

                    if consecutive_failures >= 3 {
                        return Err(ScraperError::Network(format!(
                            "aborted after 3 straight failures at page {page}"
                        )));
                    }

                    std::thread::sleep(Duration::from_secs(2));
                }
            }
        }

        Ok(())
    }

    fn fetch_page_html(&self, url: &str, page: usize) -> Result<String, ScraperError> {
        const MAX_ATTEMPTS: u64 = 5;
        const MAX_BACKOFF_SECS: u64 = 10;
        const JITTER_MAX_SECS: u64 = 2;

        let mut last_err = None;

        for attempt in 1..=MAX_ATTEMPTS {
            let start = std::time::Instant::now();

            match self.try_fetch_page(url, page) {
                Ok(html) => {
                    eprintln!("✅ Fetched attempt {attempt} in {:?}", start.elapsed());
                    return Ok(html);
                }
                Err(e) => {
                    eprintln!("⚠️ Attempt {attempt} failed in {:?}: {e}", start.elapsed());

                    last_err = Some(e);

                    // backoff
                    let base = std::cmp::min(2 * attempt, MAX_BACKOFF_SECS);
                    let jitter = rand::thread_rng().gen_range(0..=JITTER_MAX_SECS);
                    std::thread::sleep(Duration::from_secs(base + jitter));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| ScraperError::Network("retry loop failed".into())))
    }

    fn try_fetch_page(&self, url: &str, page: usize) -> Result<String, ScraperError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| ScraperError::Network(e.to_string()))?;

        let status = resp.status();

        // Past-the-end pages and throttled requests both come back as a
        // redirect to the bare index.
        if page != 1 && !resp.url().path().ends_with(&format!("page-{page}")) {
            return Err(ScraperError::Blocked(format!("redirected away from {url}")));
        }

        if status == reqwest::StatusCode::FORBIDDEN
            || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        {
            return Err(ScraperError::Blocked(format!("HTTP {status} for {url}")));
        }
        if !status.is_success() {
            return Err(ScraperError::Network(format!("HTTP {status} for {url}")));
        }

        resp.text().map_err(|e| ScraperError::Network(e.to_string()))
    }
}

/// Listing index urls for one market side. Buy is indexed per property
/// type, rent in one combined index.
fn index_urls(city: &str, post_type: PostType) -> Vec<String> {
    match post_type {
        PostType::Buy => ["appartement", "huis", "studio"]
            .iter()
            .map(|typ| format!("https://www.pararius.nl/koopwoningen/{city}/{typ}/"))
            .collect(),
        PostType::Rent => vec![format!("https://www.pararius.com/apartments/{city}/")],
    }
}

struct CardSelectors {
    sub_title: Selector,
    title_link: Selector,
    price: Selector,
    surface: Selector,
    rooms: Selector,
    interior: Selector,
    label: Selector,
}

impl CardSelectors {
    fn new() -> Result<Self, ScraperError> {
        // The sub-title class carries a stray apostrophe in the site's HTML,
        // so it needs an attribute selector.
        Ok(Self {
            sub_title: sel(r#"div[class="listing-search-item__sub-title'"]"#)?,
            title_link: sel("a.listing-search-item__link--title")?,
            price: sel("div.listing-search-item__price")?,
            surface: sel("li.illustrated-features__item--surface-area")?,
            rooms: sel("li.illustrated-features__item--number-of-rooms")?,
            interior: sel("li.illustrated-features__item--interior")?,
            label: sel("span.listing-search-item__label")?,
        })
    }
}

fn sel(css: &str) -> Result<Selector, ScraperError> {
    Selector::parse(css).map_err(|e| ScraperError::HtmlParse(e.to_string()))
}

/// Parse one index page into listing cards and, when the pagination bar is
/// present, the total page count.
pub fn parse_index_page(
    html: &str,
    base_url: &str,
    post_type: PostType,
    scrape_date: NaiveDate,
) -> Result<IndexPage, ScraperError> {
    let document = Html::parse_document(html);
    let card_sel = sel("li.search-list__item--listing")?;
    let selectors = CardSelectors::new()?;

    let mut listings = Vec::new();
    for card in document.select(&card_sel) {
        if let Some(listing) = parse_card(card, &selectors, base_url, post_type, scrape_date) {
            listings.push(listing);
        }
    }

    let max_pages = parse_max_pages(&document)?;
    Ok(IndexPage {
        listings,
        max_pages,
    })
}

/// One listing card. Cards without a title link have no url to key on and
/// are skipped; everything else is optional.
fn parse_card(
    card: ElementRef,
    sels: &CardSelectors,
    base_url: &str,
    post_type: PostType,
    scrape_date: NaiveDate,
) -> Option<RawListing> {
    let title_el = card.select(&sels.title_link).next()?;
    let href = title_el.value().attr("href")?;
    let url = absolute_url(base_url, href)?;

    // "Appartement Keizersgracht" -> raw property type "Appartement"
    let title = element_text(title_el);
    let property_type = title.split_whitespace().next().map(str::to_string);

    let postcode = card
        .select(&sels.sub_title)
        .next()
        .and_then(|el| parse_postcode(&element_text(el)));
    let price = card
        .select(&sels.price)
        .next()
        .and_then(|el| parse_price(&element_text(el)));
    let surface = card
        .select(&sels.surface)
        .next()
        .and_then(|el| digits(&element_text(el)));
    let rooms = card
        .select(&sels.rooms)
        .next()
        .and_then(|el| digits(&element_text(el)));
    let furnished = card.select(&sels.interior).next().map(element_text);
    let label = card.select(&sels.label).next().map(element_text);
    let status = derive_listing_status(label.as_deref()).to_string();

    Some(RawListing {
        page_source: PAGE_SOURCE.to_string(),
        scrape_date,
        post_type,
        property_type,
        price,
        surface,
        rooms,
        furnished,
        postcode,
        url,
        status,
    })
}

/// Highest page number in the pagination bar: the second-to-last link, the
/// last one being "Next". A missing bar means a single page of results.
fn parse_max_pages(document: &Html) -> Result<Option<usize>, ScraperError> {
    let link_sel = sel("a.pagination__link")?;
    let links: Vec<ElementRef> = document.select(&link_sel).collect();
    if links.len() < 2 {
        return Ok(None);
    }
    Ok(element_text(links[links.len() - 2]).parse().ok())
}

/// Element text with whitespace runs collapsed to single spaces.
fn element_text(el: ElementRef) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn absolute_url(base_url: &str, href: &str) -> Option<String> {
    let base = Url::parse(base_url).ok()?;
    base.join(href).ok().map(String::from)
}

/// First two tokens of the sub-title ("1017 AB Amsterdam (Centrum)"), kept
/// only when they form a postcode: four digits, a space, two letters.
fn parse_postcode(text: &str) -> Option<String> {
    let mut tokens = text.split_whitespace();
    let number = tokens.next()?;
    let letters = tokens.next()?;
    if number.len() == 4
        && number.chars().all(|c| c.is_ascii_digit())
        && letters.len() == 2
        && letters.chars().all(|c| c.is_ascii_uppercase())
    {
        Some(format!("{number} {letters}"))
    } else {
        None
    }
}

/// Price label like "€ 1.250 per month". A range ("€ 1.250 - € 1.750")
/// averages the two bounds; labels without digits ("Price on request")
/// yield nothing.
fn parse_price(text: &str) -> Option<i64> {
    let amount_end = text.rfind(|c: char| c.is_ascii_digit())? + 1;
    let (amount, _) = text.split_at(amount_end);
    match amount.split_once('-') {
        Some((low, high)) => {
            let low = digits(low)?;
            let high = digits(high)?;
            Some((low + high) / 2)
        }
        None => digits(amount),
    }
}

/// The integer formed by every ascii digit in the text, "75 m²" -> 75.
fn digits(text: &str) -> Option<i64> {
    let numeric: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if numeric.is_empty() {
        None
    } else {
        numeric.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_plain_label() {
        assert_eq!(parse_price("€ 1.250 per month"), Some(1250));
        assert_eq!(parse_price("€425.000 k.k."), Some(425000));
    }

    #[test]
    fn price_range_averages_bounds() {
        assert_eq!(parse_price("€ 1.250 - € 1.750 per month"), Some(1500));
    }

    #[test]
    fn price_on_request_has_no_amount() {
        assert_eq!(parse_price("Price on request"), None);
    }

    #[test]
    fn postcode_needs_four_digits_and_two_letters() {
        assert_eq!(
            parse_postcode("1017 AB Amsterdam (Grachtengordel)"),
            Some("1017 AB".to_string())
        );
        assert_eq!(parse_postcode("Amsterdam Centrum"), None);
        assert_eq!(parse_postcode("101 AB Amsterdam"), None);
    }

    #[test]
    fn digits_strip_units() {
        assert_eq!(digits("75 m²"), Some(75));
        assert_eq!(digits("3 rooms"), Some(3));
        assert_eq!(digits("no number here"), None);
    }

    #[test]
    fn parses_a_listing_card() {
        let html = r#"
        <html><body><ul>
          <li class="search-list__item search-list__item--listing">
            <a class="listing-search-item__link listing-search-item__link--title"
               href="/appartement-te-huur/amsterdam/abc123/keizersgracht">
               Appartement Keizersgracht
            </a>
            <div class="listing-search-item__sub-title'">
               1017 AB Amsterdam (Grachtengordel)
            </div>
            <div class="listing-search-item__price">€ 1.750 per month</div>
            <ul>
              <li class="illustrated-features__item illustrated-features__item--surface-area">75 m²</li>
              <li class="illustrated-features__item illustrated-features__item--number-of-rooms">3 rooms</li>
              <li class="illustrated-features__item illustrated-features__item--interior">Upholstered</li>
            </ul>
          </li>
        </ul></body></html>
        "#;

        let page = parse_index_page(
            html,
            "https://www.pararius.com/apartments/amsterdam/",
            PostType::Rent,
            chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        )
        .unwrap();

        assert_eq!(page.listings.len(), 1);
        assert_eq!(page.max_pages, None);

        let l = &page.listings[0];
        assert_eq!(
            l.url,
            "https://www.pararius.com/appartement-te-huur/amsterdam/abc123/keizersgracht"
        );
        assert_eq!(l.property_type.as_deref(), Some("Appartement"));
        assert_eq!(l.postcode.as_deref(), Some("1017 AB"));
        assert_eq!(l.price, Some(1750));
        assert_eq!(l.surface, Some(75));
        assert_eq!(l.rooms, Some(3));
        assert_eq!(l.furnished.as_deref(), Some("Upholstered"));
        assert_eq!(l.status, "Available");
    }

    #[test]
    fn card_without_title_link_is_skipped() {
        let html = r#"
        <li class="search-list__item search-list__item--listing">
          <div class="listing-search-item__price">€ 1.000 per month</div>
        </li>
        "#;
        let page = parse_index_page(
            html,
            "https://www.pararius.com/apartments/amsterdam/",
            PostType::Rent,
            chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        )
        .unwrap();
        assert!(page.listings.is_empty());
    }

    #[test]
    fn label_drives_status() {
        let html = r#"
        <li class="search-list__item search-list__item--listing">
          <span class="listing-search-item__label">Verhuurd onder voorbehoud</span>
          <a class="listing-search-item__link listing-search-item__link--title"
             href="/huis-te-koop/amsterdam/xyz/street">Huis Street</a>
        </li>
        "#;
        let page = parse_index_page(
            html,
            "https://www.pararius.nl/koopwoningen/amsterdam/huis/",
            PostType::Buy,
            chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        )
        .unwrap();
        assert_eq!(page.listings[0].status, "Unavailable");
    }

    #[test]
    fn pagination_reads_second_to_last_link() {
        let html = r#"
        <ul>
          <li><a class="pagination__link" href="/page-1">1</a></li>
          <li><a class="pagination__link" href="/page-2">2</a></li>
          <li><a class="pagination__link" href="/page-42">42</a></li>
          <li><a class="pagination__link pagination__link--next" href="/page-2">Next</a></li>
        </ul>
        "#;
        let page = parse_index_page(
            html,
            "https://www.pararius.com/apartments/amsterdam/",
            PostType::Rent,
            chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        )
        .unwrap();
        assert_eq!(page.max_pages, Some(42));
    }
}
