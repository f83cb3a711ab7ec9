use regex::{Regex, RegexBuilder};

use crate::search::SearchQuery;

/// Literal, case-insensitive matcher for the active search query.
pub fn build_highlight_regex(query: &SearchQuery) -> Option<Regex> {
    RegexBuilder::new(&regex::escape(query.as_str()))
        .case_insensitive(true)
        .build()
        .ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub matched: bool,
}

/// Splits `text` into alternating plain and matched runs.
pub fn split_matches<'a>(text: &'a str, regex: Option<&Regex>) -> Vec<Segment<'a>> {
    let Some(regex) = regex else {
        return vec![Segment {
            text,
            matched: false,
        }];
    };
    let mut segments = Vec::new();
    let mut cursor = 0;
    for found in regex.find_iter(text) {
        if found.start() > cursor {
            segments.push(Segment {
                text: &text[cursor..found.start()],
                matched: false,
            });
        }
        segments.push(Segment {
            text: found.as_str(),
            matched: true,
        });
        cursor = found.end();
    }
    if cursor < text.len() || segments.is_empty() {
        segments.push(Segment {
            text: &text[cursor..],
            matched: false,
        });
    }
    segments
}
