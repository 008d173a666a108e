use serde::Serialize;

/// A listing entry, unique by `id` within a discovery run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Title {
    pub id: String,
    pub title: String,
    /// Canonical `<site_root>/title/<id>/`, ready for path suffixes.
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentDetail {
    pub id: String,
    pub title: String,
    pub duration: String,
    pub country: String,
    pub genres: Vec<String>,
    pub stars: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyCredit {
    pub id: String,
    pub producers: Vec<String>,
    pub distributors: Vec<DistributorRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributorRecord {
    pub name: String,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub country: String,
    pub types: Vec<String>,
    /// `end_year` was closed with the as-of year, not read from the credit.
    pub open_ended: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Review {
    pub id: String,
    pub date: String,
    pub rating: Option<String>,
}
