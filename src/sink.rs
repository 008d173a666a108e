use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::model::{CompanyCredit, ContentDetail, Review};
use crate::settings::ProducerLayout;

const CONTENT_FILE: &str = "content.csv";
const PRODUCERS_FILE: &str = "producers.csv";
const DISTRIBUTORS_FILE: &str = "distributors.csv";
const REVIEWS_FILE: &str = "reviews.csv";

const CONTENT_HEADER: &[&str] = &["id", "title", "duration", "country", "stars", "genres"];
const PRODUCERS_HEADER: &[&str] = &["id", "producer"];
const DISTRIBUTORS_HEADER: &[&str] = &[
    "id",
    "distributor_name",
    "distributor_type",
    "distributor_country",
    "distributor_start_year",
    "distributor_end_year",
];
const REVIEWS_HEADER: &[&str] = &["id", "review_date", "review_rating"];

/// Semicolon-delimited output files. A header is written only when a file is
/// created; later runs append rows, so re-running duplicates data.
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if dir.is_dir() {
            debug!("Output directory {} already exists", dir.display());
        } else {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            info!("Created output directory {}", dir.display());
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_content(&self, rows: &[ContentDetail]) -> Result<usize> {
        let mut w = self.appender(CONTENT_FILE, CONTENT_HEADER)?;
        for r in rows {
            let (stars, genres) = (list_literal(&r.stars), list_literal(&r.genres));
            let record: [&str; 6] = [&r.id, &r.title, &r.duration, &r.country, &stars, &genres];
            w.write_record(record)?;
        }
        w.flush()?;
        Ok(rows.len())
    }

    pub fn write_producers(
        &self,
        credits: &[CompanyCredit],
        layout: ProducerLayout,
    ) -> Result<usize> {
        let mut w = self.appender(PRODUCERS_FILE, PRODUCERS_HEADER)?;
        let mut count = 0;
        for c in credits {
            match layout {
                ProducerLayout::List => {
                    let producers = list_literal(&c.producers);
                    w.write_record([c.id.as_str(), producers.as_str()])?;
                    count += 1;
                }
                ProducerLayout::Rows => {
                    for p in &c.producers {
                        w.write_record([c.id.as_str(), p.as_str()])?;
                        count += 1;
                    }
                }
            }
        }
        w.flush()?;
        Ok(count)
    }

    pub fn write_distributors(&self, credits: &[CompanyCredit]) -> Result<usize> {
        let mut w = self.appender(DISTRIBUTORS_FILE, DISTRIBUTORS_HEADER)?;
        let mut count = 0;
        for c in credits {
            for d in &c.distributors {
                let types = list_literal(&d.types);
                let (start, end) = (year_cell(d.start_year), year_cell(d.end_year));
                let record: [&str; 6] = [&c.id, &d.name, &types, &d.country, &start, &end];
                w.write_record(record)?;
                count += 1;
            }
        }
        w.flush()?;
        Ok(count)
    }

    pub fn write_reviews(&self, rows: &[Review]) -> Result<usize> {
        let mut w = self.appender(REVIEWS_FILE, REVIEWS_HEADER)?;
        for r in rows {
            let record: [&str; 3] = [&r.id, &r.date, r.rating.as_deref().unwrap_or("")];
            w.write_record(record)?;
        }
        w.flush()?;
        Ok(rows.len())
    }

    fn appender(&self, name: &str, header: &[&str]) -> Result<csv::Writer<File>> {
        let path = self.dir.join(name);
        let is_new = !path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let mut w = csv::WriterBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .from_writer(file);
        if is_new {
            w.write_record(header)?;
        }
        Ok(w)
    }
}

fn year_cell(year: Option<i32>) -> String {
    year.map(|y| y.to_string()).unwrap_or_default()
}

/// Bracketed list literal, e.g. `['Drama', 'Horror']`.
pub fn list_literal(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|s| quote_item(s)).collect();
    format!("[{}]", quoted.join(", "))
}

fn quote_item(s: &str) -> String {
    if s.contains('\'') && !s.contains('"') {
        format!("\"{}\"", s.replace('\\', "\\\\"))
    } else {
        format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}
