use crate::models::HeadlineRecord;

/// Points awarded per matching keyword
pub const KEYWORD_WEIGHT: u32 = 10;

/// Ordered, case-insensitive keyword set. Duplicates and blanks are dropped on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() && !normalized.contains(&keyword) {
                normalized.push(keyword);
            }
        }
        Self {
            keywords: normalized,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    /// Number of distinct keywords occurring anywhere in `text`
    pub fn matches(&self, text: &str) -> usize {
        let haystack = text.to_lowercase();
        self.keywords
            .iter()
            .filter(|k| haystack.contains(k.as_str()))
            .count()
    }
}

pub fn score(record: &HeadlineRecord, keywords: &KeywordSet) -> u32 {
    let text = format!(
        "{} {}",
        record.title,
        record.source_summary.as_deref().unwrap_or("")
    );
    keywords.matches(&text) as u32 * KEYWORD_WEIGHT
}

/// Scores every record, orders by descending score and keeps the first `keep`.
///
/// `sort_by` is stable, so records with equal scores stay in fetch order.
pub fn rank(
    mut records: Vec<HeadlineRecord>,
    keywords: &KeywordSet,
    keep: usize,
) -> Vec<HeadlineRecord> {
    for record in records.iter_mut() {
        record.score = score(record, keywords);
    }

    records.sort_by(|a, b| b.score.cmp(&a.score));
    records.truncate(keep);
    records
}
