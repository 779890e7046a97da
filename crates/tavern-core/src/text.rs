//! Token-level text helpers used around completions.

pub use tavern_types::tokenizer::tokenize;

const NEWLINE: &str = "\n";

/// Punctuation that attaches to the preceding token.
fn attaches_left(token: &str) -> bool {
    matches!(
        token,
        "." | "," | "!" | "?" | ";" | ":" | "..." | ")" | "]" | "}" | "%" | "'" | "\""
    )
}

/// Punctuation that attaches to the following token.
fn attaches_right(token: &str) -> bool {
    matches!(token, "(" | "[" | "{" | "$" | "#")
}

/// Join tokens back into text.
///
/// No space goes before closing punctuation or after an opening bracket,
/// and newline tokens are joined without surrounding spaces.
pub fn untokenize<S: AsRef<str>>(tokens: &[S]) -> String {
    let mut text = String::new();
    let mut previous: Option<&str> = None;
    for token in tokens {
        let token = token.as_ref();
        let glue = match previous {
            None => false,
            Some(prev) => {
                prev != NEWLINE && token != NEWLINE && !attaches_left(token) && !attaches_right(prev)
            }
        };
        if glue {
            text.push(' ');
        }
        text.push_str(token);
        previous = Some(token);
    }
    text
}

/// Tokenize line by line, keeping each line break as its own token.
fn tokenize_lines(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            tokens.push(NEWLINE);
        }
        tokens.extend(tokenize(line));
    }
    tokens
}

/// Trim `text` to fit into `max_tokens`.
///
/// With `from_start` the beginning is cut and the ending kept, otherwise the
/// ending is cut. One extra token is removed so the result lands strictly
/// under the limit. Line breaks survive the round trip; other whitespace is
/// normalized. Text that already fits is returned unchanged.
pub fn trim_text_by_tokens(text: &str, max_tokens: usize, from_start: bool) -> String {
    let tokens = tokenize_lines(text);
    if tokens.len() <= max_tokens {
        return text.to_string();
    }

    let trim_count = (tokens.len() - max_tokens + 1).min(tokens.len());
    let kept = if from_start {
        &tokens[trim_count..]
    } else {
        &tokens[..tokens.len() - trim_count]
    };
    untokenize(kept)
}

/// Cut text after its last sentence terminator (`.`, `!` or `?`), keeping a
/// closing quote that directly follows it. Text without a terminator is
/// returned unchanged.
pub fn trim_incomplete_sentence(text: &str) -> &str {
    let Some(last) = text.rfind(['.', '!', '?']) else {
        return text;
    };
    let mut end = last + 1;
    if text[end..].starts_with('"') {
        end += 1;
    }
    &text[..end]
}
