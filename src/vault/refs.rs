use regex::Regex;
use std::sync::OnceLock;

fn embed_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"!\[\[([^\]]+)\]\]").expect("embed regex is valid"))
}

/// Extract embedded-asset references (`![[name]]`) from document text.
///
/// Total function: malformed or absent embed syntax yields an empty vec.
/// Tokens come back in first-occurrence order with duplicates preserved;
/// resolution against the filesystem happens later, at move time.
pub fn extract_embeds(text: &str) -> Vec<String> {
    embed_regex()
        .captures_iter(text)
        .map(|cap| cap[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::extract_embeds;

    #[test]
    fn extracts_in_document_order() {
        let doc = "intro\n![[one.png]]\ntext ![[two.png]] more ![[one.png]]\n";
        assert_eq!(extract_embeds(doc), vec!["one.png", "two.png", "one.png"]);
    }

    #[test]
    fn keeps_subpath_tokens_whole() {
        let doc = "![[attachments/deep/pic.png]]";
        assert_eq!(extract_embeds(doc), vec!["attachments/deep/pic.png"]);
    }

    #[test]
    fn malformed_syntax_yields_nothing() {
        assert!(extract_embeds("").is_empty());
        assert!(extract_embeds("![[unclosed").is_empty());
        assert!(extract_embeds("[[not-an-embed.png]]").is_empty());
        assert!(extract_embeds("plain ![link](a.png)").is_empty());
    }
}
