/// Splits `text` into pieces of at most `max_len` characters, breaking on
/// whitespace where possible. Runs of non-whitespace longer than `max_len`
/// (links, emote spam) are hard-split. Text that already fits is sent as is.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    if text.trim().is_empty() {
        return Vec::new();
    }
    if text.chars().count() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word_chars: Vec<char> = word.chars().collect();

        while word_chars.len() > max_len {
            if current_len > 0 {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word_chars.split_off(max_len);
            chunks.push(word_chars.into_iter().collect());
            word_chars = rest;
        }

        let needed = if current_len == 0 { word_chars.len() } else { current_len + 1 + word_chars.len() };
        if needed > max_len {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current_len += word_chars.len();
        current.extend(word_chars);
    }

    if current_len > 0 {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(split_message("hello there", 500), vec!["hello there"]);
    }

    #[test]
    fn short_text_keeps_its_spacing() {
        let text = "line one\n\n  spaced   out";
        assert_eq!(split_message(text, 500), vec![text]);
    }

    #[test]
    fn blank_text_yields_nothing() {
        assert!(split_message("   ", 500).is_empty());
    }

    #[test]
    fn splits_on_word_boundaries() {
        assert_eq!(split_message("aaa bbb ccc", 7), vec!["aaa bbb", "ccc"]);
    }

    #[test]
    fn long_words_are_hard_split() {
        assert_eq!(split_message("xx abcdefghij yy", 4), vec!["xx", "abcd", "efgh", "ij", "yy"]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let chunks = split_message("ééééé", 2);
        assert_eq!(chunks, vec!["éé", "éé", "é"]);
    }
}
