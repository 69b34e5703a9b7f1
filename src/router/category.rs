use std::fmt;

use crate::settings::MatchMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    CoverPage,
    TableOfContents,
    Unrecognized,
}

/// Trigger substrings, checked in this order.
const TRIGGERS: &[(&str, Category)] = &[
    ("pleading cover page", Category::CoverPage),
    ("table of contents", Category::TableOfContents),
];

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::CoverPage => "cover page",
            Category::TableOfContents => "table of contents",
            Category::Unrecognized => "unrecognized",
        };
        f.write_str(name)
    }
}

/// Map a free-text classifier answer onto the routed categories.
///
/// Plain case-insensitive substring match on the raw label. Never returns an
/// empty list: a label with no trigger yields `[Unrecognized]`.
pub fn parse_label(label: &str, mode: MatchMode) -> Vec<Category> {
    let folded = label.to_lowercase();

    let mut matched: Vec<Category> = TRIGGERS
        .iter()
        .filter(|(needle, _)| folded.contains(needle))
        .map(|(_, category)| *category)
        .collect();

    if mode == MatchMode::FirstMatch {
        matched.truncate(1);
    }
    if matched.is_empty() {
        matched.push(Category::Unrecognized);
    }
    matched
}
