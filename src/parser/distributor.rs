//! Distributor credit parsing.
//!
//! The trailing text of a distributor credit has the loose shape
//! `<year-token>? (<country>) (<type>) (<type>) ...` where the year token is
//! one of `2012`, `2019-` or `2005-2008`, with arbitrary punctuation around it.

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::model::DistributorRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YearShape {
    Absent,
    Single(i32),
    /// `Y-`: still distributing at collection time.
    OpenRange(i32),
    Range(i32, i32),
    Unexpected(String),
}

/// Keep only digits and hyphens from the first token; anything shorter than a
/// four digit year is not a year.
pub fn isolate_year_token(token: &str) -> String {
    let digits: String = token
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-')
        .collect();
    if digits.len() <= 3 {
        String::new()
    } else {
        digits
    }
}

pub fn classify_year(digits: &str) -> YearShape {
    let year = |s: &str| s.parse::<i32>().ok();
    let shape = match digits.len() {
        0 => Some(YearShape::Absent),
        4 => year(digits).map(YearShape::Single),
        5 if digits.ends_with('-') => year(&digits[..4]).map(YearShape::OpenRange),
        9 if &digits[4..5] == "-" => year(&digits[..4])
            .zip(year(&digits[5..]))
            .map(|(a, b)| YearShape::Range(a, b)),
        _ => None,
    };
    shape.unwrap_or_else(|| YearShape::Unexpected(digits.to_string()))
}

/// Text following the year token. Both single years and ranges end in four
/// year characters, so the split anchors on those.
fn remainder_after_year<'a>(raw: &'a str, token: &str, digits: &str) -> &'a str {
    let anchor = &digits[digits.len().saturating_sub(4)..];
    if let Some(pos) = raw.find(anchor) {
        return &raw[pos + anchor.len()..];
    }
    match raw.find(token) {
        Some(pos) => &raw[pos + token.len()..],
        None => raw,
    }
}

/// `(country) (type) (type)` → country and types. `None` when there is no
/// parenthesized group at all.
fn split_groups(remainder: &str) -> Option<(String, Vec<String>)> {
    let mut groups = remainder.split('(').skip(1);
    let country = groups.next()?.replace(')', "").trim().to_string();
    let types = groups
        .map(|g| g.replace([')', '\n', ' '], "").trim().to_string())
        .filter(|g| !g.is_empty())
        .collect();
    Some((country, types))
}

pub fn parse_distributor(
    title_id: &str,
    name: &str,
    raw: &str,
    as_of_year: i32,
    diags: &mut Diagnostics,
) -> DistributorRecord {
    let token = raw.split_whitespace().next().unwrap_or("");
    let digits = isolate_year_token(token);

    let (start_year, end_year, open_ended) = match classify_year(&digits) {
        YearShape::Absent => (None, None, false),
        YearShape::Single(y) => (Some(y), Some(y), false),
        YearShape::OpenRange(y) => (Some(y), Some(as_of_year), true),
        YearShape::Range(a, b) => (Some(a), Some(b), false),
        YearShape::Unexpected(d) => {
            diags.record(
                title_id,
                DiagnosticKind::UnexpectedYearShape,
                format!("{}: year token {:?} has no known shape", name, d),
            );
            (None, None, false)
        }
    };

    let remainder = if digits.is_empty() {
        raw
    } else {
        remainder_after_year(raw, token, &digits)
    };

    let (country, types) = match split_groups(remainder) {
        Some((country, types)) => {
            if country.is_empty() {
                diags.record(
                    title_id,
                    DiagnosticKind::MalformedCredit,
                    format!("{}: empty country group in {:?}", name, raw.trim()),
                );
            }
            (country, types)
        }
        None => {
            diags.record(
                title_id,
                DiagnosticKind::MalformedCredit,
                format!("{}: no parenthesized country in {:?}", name, raw.trim()),
            );
            (String::new(), Vec::new())
        }
    };

    DistributorRecord {
        name: name.to_string(),
        start_year,
        end_year,
        country,
        types,
        open_ended,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AS_OF: i32 = 2021;

    fn parse(raw: &str) -> (DistributorRecord, Diagnostics) {
        let mut diags = Diagnostics::new();
        let rec = parse_distributor("tt0000001", "Netflix", raw, AS_OF, &mut diags);
        (rec, diags)
    }

    #[test]
    fn single_year() {
        let (r, d) = parse("2012 (USA) (TV)");
        assert_eq!(r.start_year, Some(2012));
        assert_eq!(r.end_year, Some(2012));
        assert_eq!(r.country, "USA");
        assert_eq!(r.types, vec!["TV"]);
        assert!(!r.open_ended);
        assert!(d.is_empty());
    }

    #[test]
    fn open_range_uses_as_of_year() {
        let (r, d) = parse("2019- (UK) (SVOD)");
        assert_eq!(r.start_year, Some(2019));
        assert_eq!(r.end_year, Some(AS_OF));
        assert_eq!(r.country, "UK");
        assert_eq!(r.types, vec!["SVOD"]);
        assert!(r.open_ended);
        assert!(d.is_empty());
    }

    #[test]
    fn closed_range() {
        let (r, _) = parse("2005-2008 (Germany) (Cinema) (TV)");
        assert_eq!(r.start_year, Some(2005));
        assert_eq!(r.end_year, Some(2008));
        assert_eq!(r.country, "Germany");
        assert_eq!(r.types, vec!["Cinema", "TV"]);
    }

    #[test]
    fn no_year() {
        let (r, d) = parse("(France) (Cinema)");
        assert_eq!(r.start_year, None);
        assert_eq!(r.end_year, None);
        assert_eq!(r.country, "France");
        assert_eq!(r.types, vec!["Cinema"]);
        assert!(d.is_empty());
    }

    #[test]
    fn year_in_parentheses() {
        let (r, _) = parse("(2016) (Brazil) (VOD)");
        assert_eq!(r.start_year, Some(2016));
        assert_eq!(r.country, "Brazil");
        assert_eq!(r.types, vec!["VOD"]);
    }

    #[test]
    fn multiline_item_text() {
        let (r, _) = parse(" (2017-2020)\n (Japan)\n (TV)\n (theatrical)\n");
        assert_eq!(r.start_year, Some(2017));
        assert_eq!(r.end_year, Some(2020));
        assert_eq!(r.country, "Japan");
        assert_eq!(r.types, vec!["TV", "theatrical"]);
    }

    #[test]
    fn type_tags_drop_inner_spaces() {
        let (r, _) = parse("2019 (USA) (all media) (non-exclusive)");
        assert_eq!(r.country, "USA");
        assert_eq!(r.types, vec!["allmedia", "non-exclusive"]);
    }

    #[test]
    fn short_digit_run_is_not_a_year() {
        assert_eq!(isolate_year_token("(3D)"), "");
        assert_eq!(isolate_year_token("(UK)"), "");
        let (r, _) = parse("(3D) (USA)");
        assert_eq!(r.start_year, None);
        assert_eq!(r.country, "3D");
    }

    #[test]
    fn malformed_fragment_keeps_name() {
        let (r, d) = parse("all media");
        assert_eq!(r.name, "Netflix");
        assert_eq!(r.country, "");
        assert!(r.types.is_empty());
        assert!(d.has(DiagnosticKind::MalformedCredit));
    }

    #[test]
    fn empty_fragment() {
        let (r, d) = parse("");
        assert_eq!(r.start_year, None);
        assert_eq!(r.country, "");
        assert!(d.has(DiagnosticKind::MalformedCredit));
    }

    #[test]
    fn unexpected_shape_falls_through() {
        let (r, d) = parse("2019-20 (Spain) (TV)");
        assert_eq!(r.start_year, None);
        assert_eq!(r.end_year, None);
        assert_eq!(r.country, "Spain");
        assert!(d.has(DiagnosticKind::UnexpectedYearShape));
    }

    #[test]
    fn classify_shapes() {
        assert_eq!(classify_year(""), YearShape::Absent);
        assert_eq!(classify_year("1999"), YearShape::Single(1999));
        assert_eq!(classify_year("1999-"), YearShape::OpenRange(1999));
        assert_eq!(classify_year("1999-2003"), YearShape::Range(1999, 2003));
        assert!(matches!(classify_year("-1999"), YearShape::Unexpected(_)));
        assert!(matches!(classify_year("19992003"), YearShape::Unexpected(_)));
    }
}
