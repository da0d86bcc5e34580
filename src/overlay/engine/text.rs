const SENTENCE_END_CHARS: &[char] = &['。', '、', '！', '？', '.', '!', '?'];
const CLOSING_CHARS: &[char] = &['」', '』', '）', ')', '】', ']', '"', '\''];
const NO_SPACE_AFTER: &[char] = &['-', '=', '#'];
const NO_SPACE_BEFORE: &[char] = &['.', ',', '!', '?', ':', ';'];
const CJK_LANGUAGE_HINTS: &[&str] = &[
    "ja",
    "jpn",
    "zh",
    "zh-cn",
    "zh-tw",
    "zh-hans",
    "zh-hant",
    "chi_sim",
    "chi_tra",
    "chinese_sim",
    "ko",
    "kor",
];

/// Whether `text` already closes a sentence, looking through trailing closing
/// brackets and quotes.
pub fn is_sentence_end(text: &str) -> bool {
    let trimmed = text.trim_end();
    let Some(last) = trimmed.chars().next_back() else {
        return false;
    };
    if SENTENCE_END_CHARS.contains(&last) {
        return true;
    }
    if CLOSING_CHARS.contains(&last) {
        let inner = trimmed.trim_end_matches(|ch: char| CLOSING_CHARS.contains(&ch) || ch == ' ');
        return is_sentence_end(inner);
    }
    false
}

pub fn is_cjk_language(hint: &str) -> bool {
    let hint = hint.trim().to_ascii_lowercase().replace('_', "-");
    CJK_LANGUAGE_HINTS
        .iter()
        .any(|candidate| candidate.replace('_', "-") == hint)
}

pub(super) fn join_fragment(current: &str, next: &str, cjk: bool) -> String {
    if needs_space(current, next, cjk) {
        format!("{} {}", current, next)
    } else {
        format!("{}{}", current, next)
    }
}

fn needs_space(current: &str, next: &str, cjk: bool) -> bool {
    if cjk || current.is_empty() || next.is_empty() {
        return false;
    }
    let ends_tight = current
        .chars()
        .next_back()
        .is_some_and(|ch| NO_SPACE_AFTER.contains(&ch));
    let starts_tight = next
        .chars()
        .next()
        .is_some_and(|ch| NO_SPACE_BEFORE.contains(&ch));
    !ends_tight && !starts_tight
}
