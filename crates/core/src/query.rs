use crate::error::SearchError;

pub fn tokenize(query: &str, max_words: usize) -> Result<Vec<String>, SearchError> {
    let words = query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect::<Vec<_>>();

    if words.len() > max_words {
        return Err(SearchError::QueryTooLong { limit: max_words });
    }

    Ok(words)
}

pub fn phrase_query(text: &str) -> String {
    let trimmed = text.trim().trim_matches('"').trim();
    format!("\"{trimmed}\"")
}

pub fn distribute(ids: &[String], groups: usize) -> Vec<Vec<String>> {
    if ids.is_empty() || groups == 0 {
        return Vec::new();
    }

    let groups = groups.min(ids.len());
    let base = ids.len() / groups;
    let remainder = ids.len() % groups;

    let mut result = Vec::with_capacity(groups);
    let mut start = 0;
    for group in 0..groups {
        let size = base + usize::from(group < remainder);
        result.push(ids[start..start + size].to_vec());
        start += size;
    }

    result
}
