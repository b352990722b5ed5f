//! Data models for Libris

pub mod auth;
pub mod book;
pub mod category;
pub mod circulation;
pub mod enums;
pub mod feedback;
pub mod member;

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

// Re-export commonly used types
pub use book::{Book, BookQuery, CatalogEntry, CatalogQuery, CreateBook, UpdateBook};
pub use category::Category;
pub use circulation::{
    Circulation, CirculationDetails, CirculationFilter, CirculationQuery, CirculationView,
};
pub use enums::{
    BookStatus, CirculationStatus, FeedbackStatus, FeedbackType, Language, MemberStatus,
    MembershipType,
};
pub use feedback::{Feedback, FeedbackQuery, NewFeedback};
pub use member::{CreateMember, Member, MemberQuery, UpdateMember};

/// Lowercased compatibility decomposition with combining marks removed,
/// so "Café" and "cafe" compare equal
pub fn fold_text(s: &str) -> String {
    s.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Case-insensitive substring match; an empty term matches everything
pub fn matches_term(haystack: &str, term: &str) -> bool {
    let term = fold_text(term.trim());
    term.is_empty() || fold_text(haystack).contains(&term)
}

/// Clamp pagination parameters to sane values, returning (limit, offset)
pub fn page_bounds(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let per_page = per_page.unwrap_or(20).clamp(1, 200);
    let page = page.unwrap_or(1).clamp(1, i64::MAX / 200);
    (per_page, (page - 1) * per_page)
}
