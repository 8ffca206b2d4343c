use crate::error::ScrapeError;

/// Scraped traffic summary for one website.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub website: String,
    pub visitors: String,
    pub description: Option<String>,
    pub competitors: Vec<Competitor>,
}

/// One competitor card from the analytics page. A card without a title link
/// renders as a single "Title not found" line; missing description or
/// traffic fields degrade to placeholder lines instead of failing.
#[derive(Debug, Clone, Default)]
pub struct Competitor {
    pub title: Option<String>,
    pub description: Option<String>,
    pub traffic: Option<String>,
}

impl Report {
    /// Plain-text rendering sent back to the chat. Never empty: the website
    /// and visitor lines are always present.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Website: {}\n", self.website));
        out.push_str(&format!("Number of Visitors: {}\n", self.visitors));

        match &self.description {
            Some(d) => out.push_str(&format!("Description: {}\n", d)),
            None => out.push_str("Description not found\n"),
        }

        if self.competitors.is_empty() {
            out.push_str("\nNo competitors found");
        } else {
            out.push_str("\nCompetitors:\n");
            for competitor in &self.competitors {
                let Some(title) = &competitor.title else {
                    out.push_str("Title not found\n");
                    continue;
                };
                out.push_str(&format!("Title: {}\n", title));
                match &competitor.description {
                    Some(d) => out.push_str(&format!("Description: {}\n", d)),
                    None => out.push_str("Description not found\n"),
                }
                match &competitor.traffic {
                    Some(t) => out.push_str(&format!("Traffic: {}\n", t)),
                    None => out.push_str("Traffic not found\n"),
                }
                out.push('\n');
            }
        }

        out
    }
}

/// Final chat reply for a scrape outcome.
pub fn render_outcome(outcome: &Result<Report, ScrapeError>) -> String {
    match outcome {
        Ok(report) => report.render(),
        Err(err) => err.user_reply().to_string(),
    }
}
