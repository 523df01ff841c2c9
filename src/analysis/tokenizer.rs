use regex::Regex;

/// How query-mode tokenization treats punctuation that is not
/// surrounded by digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Punctuation dropped entirely ("b-c" -> "bc"). Paper query path.
    Strip,
    /// Punctuation replaced with a space ("b-c" -> "b c"). HTML query path.
    Space,
}

/// Text normalization for queries, titles and embedding input.
///
/// Regexes are compiled once at construction; the analyzer is shared
/// read-only across request handlers.
pub struct TextAnalyzer {
    whitespace: Regex,
    digit_grouping: Regex,
    title_spans: Regex,
    title_non_letter: Regex,
    embedding_strip: Regex,
}

impl TextAnalyzer {
    pub fn new() -> Self {
        TextAnalyzer {
            whitespace: Regex::new(r"\s+").unwrap(),
            digit_grouping: Regex::new(r"[,\(\)\[\]\{\}]").unwrap(),
            title_spans: Regex::new(r"\(.*?\)|\[.*?\]|\{.*?\}|<.*?>").unwrap(),
            title_non_letter: Regex::new(r"[^a-z\s]").unwrap(),
            embedding_strip: Regex::new(r"[^a-z0-9\s]").unwrap(),
        }
    }

    /// Structured-document tokenizer: alphanumerics and codepoints >= 128
    /// extend the current word, anything else ends it.
    pub fn tokenize_structured(text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut word = String::new();

        for c in text.chars() {
            if c.is_alphanumeric() || (c as u32) >= 128 {
                word.extend(c.to_lowercase());
            } else if !word.is_empty() {
                tokens.push(std::mem::take(&mut word));
            }
        }
        if !word.is_empty() {
            tokens.push(word);
        }

        tokens
    }

    /// Query-mode tokenizer. A punctuation character survives the first
    /// pass only when both its neighbors are digits ("3.14", "1,000");
    /// grouping characters are then dropped so "1,000" collapses to "1000".
    pub fn tokenize_query(&self, text: &str, mode: QueryMode) -> Vec<String> {
        let chars: Vec<char> = text.chars().map(|c| if c == '\n' { ' ' } else { c }).collect();

        let mut cleaned = String::with_capacity(text.len());
        for (i, &c) in chars.iter().enumerate() {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() {
                cleaned.push(c);
                continue;
            }
            let prev_digit = i > 0 && chars[i - 1].is_ascii_digit();
            let next_digit = chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
            if prev_digit && next_digit {
                cleaned.push(c);
            } else if mode == QueryMode::Space {
                cleaned.push(' ');
            }
        }

        let collapsed = self.whitespace.replace_all(&cleaned, " ");
        let stripped = self.digit_grouping.replace_all(collapsed.trim(), "");
        let lowered = stripped.to_lowercase();

        lowered
            .split(' ')
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect()
    }

    /// Research-paper title normalization for citation-rank lookups.
    pub fn normalize_title(&self, title: &str) -> String {
        let lowered = title.to_lowercase();
        let spanless = self.title_spans.replace_all(&lowered, " ");
        let letters = self.title_non_letter.replace_all(&spanless, " ");
        let collapsed = self.whitespace.replace_all(&letters, " ");
        collapsed.trim().to_string()
    }

    /// Tokens for the embedding path: lowercase, ascii alphanumerics only.
    pub fn embedding_tokens(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let stripped = self.embedding_strip.replace_all(&lowered, "");
        stripped.split_whitespace().map(|t| t.to_string()).collect()
    }
}

impl Default for TextAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
