use regex::Regex;

use crate::models::{MediaRecord, MediaStatus, ResultRecord, StudioLink};

const ROMAN_NUMERALS: [&str; 9] = ["II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X"];
const LABEL_ACRONYMS: [&str; 3] = ["TV", "OVA", "ONA"];
/// Sentences longer than this are split before the next capitalized word
const MAX_RUN_ON_WORDS: usize = 8;

/// Turns catalog records into display-ready rows
///
/// Holds the compiled patterns used for text cleanup; one instance is built
/// at startup and shared by every request.
#[derive(Debug, Clone)]
pub struct ResultFormatter {
    re_tags: Regex,
    re_space: Regex,
    re_space_before_punct: Regex,
    re_missing_space_after_punct: Regex,
    re_relation_keyword: Regex,
}

impl ResultFormatter {
    /// # Errors
    ///
    /// Returns `regex::Error` if a pattern fails to compile
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            re_tags: Regex::new(r"<[^>]*>")?,
            re_space: Regex::new(r"\s+")?,
            re_space_before_punct: Regex::new(r"\s+([.,!?])")?,
            re_missing_space_after_punct: Regex::new(r"([.,!?])([A-Za-z])")?,
            re_relation_keyword: Regex::new(
                r"\b(adaptation|sequel|prequel|alternative|side story|spin off|character|summary|other)\b",
            )?,
        })
    }

    /// Removes markup tags and collapses whitespace
    pub fn strip_markup(&self, text: &str) -> String {
        let stripped = self.re_tags.replace_all(text, "");
        self.re_space.replace_all(&stripped, " ").trim().to_string()
    }

    /// `strip_markup` plus terminal punctuation
    pub fn clean_text(&self, text: &str) -> String {
        ensure_terminal_punctuation(&self.strip_markup(text))
    }

    pub fn format_description(&self, text: Option<&str>) -> String {
        let cleaned = self.clean_text(text.unwrap_or_default());
        if cleaned.is_empty() {
            return "No description available.".to_string();
        }
        let capitalized = split_run_on_sentences(&capitalize_first(&cleaned));
        let tightened = self.re_space_before_punct.replace_all(&capitalized, "$1");
        let spaced = self
            .re_missing_space_after_punct
            .replace_all(&tightened, "$1 $2");
        self.re_space.replace_all(&spaced, " ").trim().to_string()
    }

    pub fn format_relations(&self, text: Option<&str>) -> String {
        let cleaned = self.strip_markup(text.unwrap_or_default());
        if cleaned.is_empty() {
            return "No notable related works.".to_string();
        }
        self.re_relation_keyword
            .replace_all(&cleaned, |caps: &regex::Captures| capitalize_word(&caps[1]))
            .into_owned()
    }

    /// Builds the row for `record` without trailer data
    pub fn format_record(&self, record: &MediaRecord, catalog_index: usize, similarity: f32) -> ResultRecord {
        let display_title = self.strip_markup(&record.display_title);
        let studios = record
            .studios
            .iter()
            .enumerate()
            .map(|(i, name)| StudioLink {
                name: name.clone(),
                link: record.studio_links.get(i).cloned(),
            })
            .collect();

        let mut row = ResultRecord {
            id: record.id,
            kind: record.kind,
            catalog_index,
            formatted_title: format_title(&display_title),
            display_title,
            title_romaji: self.strip_markup(record.title_romaji.as_deref().unwrap_or_default()),
            title_english: self.strip_markup(record.title_english.as_deref().unwrap_or_default()),
            title_native: self.strip_markup(record.title_native.as_deref().unwrap_or_default()),
            genres: record.genres.clone(),
            tags: record.tags.clone(),
            studios,
            score: display_score(record.average_score),
            popularity: record.popularity.unwrap_or(0),
            favourites: record.favourites.unwrap_or(0),
            status: record.status.label().to_string(),
            source: humanize_label(record.source.as_deref()),
            format: humanize_label(Some(record.format.as_str())),
            season: humanize_label(record.season.as_deref()),
            start_date: format_date(record.start_year, record.start_month, record.start_day, "N/A"),
            end_date: format_date(record.end_year, record.end_month, record.end_day, "Ongoing"),
            episodes_display: format_count(record.episodes, record.status, CountUnit::Episodes),
            chapters_display: format_count(record.chapters, record.status, CountUnit::Chapters),
            volumes_display: format_count(record.volumes, record.status, CountUnit::Volumes),
            relations: self.format_relations(record.relations.as_deref()),
            description: self.format_description(record.description.as_deref()),
            similarity_score: round_similarity(similarity),
            cover_image: record.cover_image.clone().unwrap_or_default(),
            banner_image: record.banner_image.clone().unwrap_or_default(),
            anilist_url: format!(
                "https://anilist.co/{}/{}",
                record.kind.as_str().to_lowercase(),
                record.id
            ),
            trailer_id: None,
            trailer_thumbnail: record
                .trailer_thumbnail
                .clone()
                .filter(|url| !url.trim().is_empty()),
            trailer_url: String::new(),
        };
        attach_trailer(&mut row, None);
        row
    }
}

/// Sets the trailer id and derives the thumbnail and link from it
///
/// Without a trailer id the link falls back to a YouTube search for the title.
pub fn attach_trailer(row: &mut ResultRecord, trailer_id: Option<String>) {
    row.trailer_url = match &trailer_id {
        Some(id) => format!("https://www.youtube.com/watch?v={}", id),
        None => trailer_search_url(&row.display_title),
    };
    if row.trailer_thumbnail.is_none() {
        row.trailer_thumbnail = trailer_id
            .as_ref()
            .map(|id| format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", id));
    }
    row.trailer_id = trailer_id;
}

fn trailer_search_url(title: &str) -> String {
    let query = format!("{} official trailer", title);
    reqwest::Url::parse_with_params("https://www.youtube.com/results", &[("search_query", query)])
        .map(String::from)
        .unwrap_or_default()
}

fn ensure_terminal_punctuation(text: &str) -> String {
    if text.is_empty() || text.ends_with(['.', '!', '?']) {
        text.to_string()
    } else {
        format!("{}.", text)
    }
}

/// Ends a sentence at `.`/`!`/`?`, or once it runs past `MAX_RUN_ON_WORDS`
/// words and the next word is capitalized
fn split_run_on_sentences(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut sentences = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for (i, &word) in words.iter().enumerate() {
        current.push(word);
        let next_is_capitalized = words
            .get(i + 1)
            .and_then(|next| next.chars().next())
            .is_some_and(char::is_uppercase);
        if word.ends_with(['.', '!', '?'])
            || (next_is_capitalized && current.len() > MAX_RUN_ON_WORDS)
        {
            sentences.push(ensure_terminal_punctuation(&current.join(" ")));
            current.clear();
        }
    }
    if !current.is_empty() {
        sentences.push(ensure_terminal_punctuation(&current.join(" ")));
    }
    sentences.join(" ")
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Upper-cases the first letter and lower-cases the rest
fn capitalize_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn is_all_caps(word: &str) -> bool {
    word.chars().any(char::is_uppercase) && !word.chars().any(char::is_lowercase)
}

/// Title-cases a title while keeping acronyms and Roman numerals
pub fn format_title(title: &str) -> String {
    let title = title.trim().trim_end_matches('.').trim();
    if title.is_empty() {
        return "N/A".to_string();
    }
    title
        .split_whitespace()
        .map(|word| {
            let keep = ROMAN_NUMERALS.contains(&word.to_uppercase().as_str())
                || (word.chars().count() > 1 && is_all_caps(word));
            if keep {
                word.to_string()
            } else {
                capitalize_word(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `YYYY-MM-DD`, defaulting month and day to 1; `fallback` without a year
pub fn format_date(year: Option<i32>, month: Option<u32>, day: Option<u32>, fallback: &str) -> String {
    match year {
        Some(year) => format!(
            "{}-{:02}-{:02}",
            year,
            month.unwrap_or(1),
            day.unwrap_or(1)
        ),
        None => fallback.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountUnit {
    Episodes,
    Chapters,
    Volumes,
}

impl CountUnit {
    fn label(&self) -> &'static str {
        match self {
            CountUnit::Episodes => "Episodes",
            CountUnit::Chapters => "Chapters",
            CountUnit::Volumes => "Volumes",
        }
    }
}

pub fn format_count(count: Option<u32>, status: MediaStatus, unit: CountUnit) -> String {
    match count {
        Some(n) if n > 0 => format!("{} {}", n, unit.label()),
        Some(0) => format!("New {} releasing", unit.label().to_lowercase()),
        _ if status.is_releasing() => format!("New {} releasing", unit.label().to_lowercase()),
        _ => "N/A".to_string(),
    }
}

/// `LIGHT_NOVEL` -> `Light Novel`; missing or blank -> `N/A`
pub fn humanize_label(raw: Option<&str>) -> String {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() || raw.eq_ignore_ascii_case("UNKNOWN") {
        return "N/A".to_string();
    }
    raw.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            if LABEL_ACRONYMS.contains(&word.to_uppercase().as_str()) {
                word.to_uppercase()
            } else {
                capitalize_word(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// 0-100 average score to a 0-10 display score
pub fn display_score(average_score: Option<f32>) -> f32 {
    average_score
        .filter(|s| s.is_finite())
        .map(|s| (s / 10.0).clamp(0.0, 10.0))
        .unwrap_or(0.0)
}

pub fn round_similarity(similarity: f32) -> f64 {
    (f64::from(similarity) * 1000.0).round() / 1000.0
}
