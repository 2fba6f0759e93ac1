use std::sync::OnceLock;

use regex::Regex;

use perch_sql::{SQLExec, Value};

use crate::service::SocialError;

/// `#` followed by one-or-more characters that are neither whitespace
/// nor another `#`.
fn hashtag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#([^\s#]+)").expect("hashtag regex"))
}

/// Extract hashtags from post content: lowercased, deduplicated,
/// in order of first appearance.
pub fn extract_hashtags(content: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for cap in hashtag_re().captures_iter(content) {
        let tag = cap[1].to_lowercase();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// Find-or-create a hashtag row, returning its id. Runs inside the
/// post-creation transaction.
pub(crate) fn find_or_create_hashtag(tx: &dyn SQLExec, name: &str) -> Result<i64, SocialError> {
    let rows = tx.query(
        "SELECT id FROM hashtags WHERE name = ?1",
        &[Value::Text(name.to_string())],
    )?;
    if let Some(row) = rows.first() {
        return row
            .get_i64("id")
            .ok_or_else(|| SocialError::Internal("hashtags row missing id".into()));
    }
    let id = tx.insert(
        "INSERT INTO hashtags (name) VALUES (?1)",
        &[Value::Text(name.to_string())],
    )?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::extract_hashtags;

    #[test]
    fn extracts_lowercased_tags() {
        assert_eq!(
            extract_hashtags("hello #node and #react"),
            vec!["node".to_string(), "react".to_string()],
        );
    }

    #[test]
    fn case_folds_and_dedupes() {
        assert_eq!(
            extract_hashtags("#Rust is #RUST is #rust"),
            vec!["rust".to_string()],
        );
    }

    #[test]
    fn ignores_bare_and_doubled_hashes() {
        assert!(extract_hashtags("no tags here").is_empty());
        assert!(extract_hashtags("stray # alone").is_empty());
        assert_eq!(extract_hashtags("a ##b c"), vec!["b".to_string()]);
    }

    #[test]
    fn stops_at_whitespace() {
        assert_eq!(
            extract_hashtags("#multi word #tag2!"),
            vec!["multi".to_string(), "tag2!".to_string()],
        );
    }
}
