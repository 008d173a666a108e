use url::Url;

/// Items the listing returns per page.
pub const PAGE_SIZE: usize = 50;

const SORT_ALPHA_ASC: &str = "&sort=alpha,asc";

/// Listing page URLs for a distributor seed, sorted alphabetically ascending.
pub fn generate_page_urls(base_url: &str, num_pages: usize) -> Vec<String> {
    (0..num_pages)
        .map(|k| format!("{}{}&start={}", base_url, SORT_ALPHA_ASC, 1 + PAGE_SIZE * k))
        .collect()
}

/// Resolve a listing href against the site root.
pub fn resolve(site_root: &str, href: &str) -> Option<Url> {
    Url::parse(site_root).ok()?.join(href).ok()
}

/// Catalog id: fourth `/`-separated segment of the absolute URL
/// (`https:`, ``, host, `title`, `<id>`).
pub fn title_id(url: &Url) -> Option<String> {
    url.as_str()
        .split('/')
        .nth(4)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `<site_root>/title/<id>/`, without the listing's tracking query.
pub fn canonical_title_url(site_root: &str, id: &str) -> String {
    format!("{}/title/{}/", site_root.trim_end_matches('/'), id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.imdb.com/search/title/?companies=co0144901";

    #[test]
    fn three_pages_offsets() {
        let urls = generate_page_urls(BASE, 3);
        assert_eq!(urls.len(), 3);
        for (url, start) in urls.iter().zip(["1", "51", "101"]) {
            assert!(url.starts_with(BASE));
            assert!(url.contains("&sort=alpha,asc"));
            assert!(url.ends_with(&format!("&start={}", start)));
        }
    }

    #[test]
    fn generation_is_idempotent() {
        assert_eq!(generate_page_urls(BASE, 4), generate_page_urls(BASE, 4));
    }

    #[test]
    fn zero_pages() {
        assert!(generate_page_urls(BASE, 0).is_empty());
    }

    #[test]
    fn id_from_relative_href() {
        let url = resolve("https://www.imdb.com", "/title/tt4574334/?ref_=adv_li_tt").unwrap();
        assert_eq!(title_id(&url).as_deref(), Some("tt4574334"));
    }

    #[test]
    fn id_missing_for_short_path() {
        let url = resolve("https://www.imdb.com", "/title/").unwrap();
        assert_eq!(title_id(&url), None);
    }

    #[test]
    fn canonical_url_has_trailing_slash() {
        assert_eq!(
            canonical_title_url("https://www.imdb.com/", "tt1"),
            "https://www.imdb.com/title/tt1/"
        );
    }
}
