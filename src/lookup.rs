//! Autocomplete and dependent dropdown filtering over master lists.

use std::time::Duration;

/// Debounce period the autocomplete fields wait for before filtering.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Exposes the text fields a record is searched by.
pub trait Searchable {
    /// Selects which field(s) to search, `()` when there is only one way.
    type Key: Copy;

    fn search_text(&self, key: Self::Key) -> Vec<&str>;
}

/// A record that belongs under a parent value (district under state, book under standard).
pub trait Scoped {
    fn scope(&self) -> &str;
}

/// Records where any keyed field contains `term`, ignoring case. Order is kept.
/// A blank term returns everything.
pub fn filter<'a, T, I>(list: I, term: &str, key: T::Key) -> Vec<&'a T>
where
    T: Searchable + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return list.into_iter().collect();
    }
    list.into_iter()
        .filter(|record| {
            record
                .search_text(key)
                .iter()
                .any(|text| text.to_lowercase().contains(&term))
        })
        .collect()
}

/// Records under `parent`, ignoring case. A blank parent returns everything.
pub fn scoped<'a, T, I>(list: I, parent: &str) -> Vec<&'a T>
where
    T: Scoped + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let parent = parent.trim().to_lowercase();
    if parent.is_empty() {
        return list.into_iter().collect();
    }
    list.into_iter()
        .filter(|record| record.scope().trim().to_lowercase() == parent)
        .collect()
}

/// Holds the latest search term until input has been quiet for the debounce period.
///
/// Time is supplied by the caller so this works with `Instant`, test clocks or
/// plain offsets alike.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    period: Duration,
    pending: Option<(String, T)>,
}

impl<T> Debouncer<T>
where
    T: Copy + PartialOrd + std::ops::Add<Duration, Output = T>,
{
    pub fn new(period: Duration) -> Self {
        Debouncer {
            period,
            pending: None,
        }
    }

    /// Records a keystroke, restarting the quiet period.
    pub fn input(&mut self, term: &str, at: T) {
        self.pending = Some((term.to_owned(), at));
    }

    /// The pending term once the quiet period has passed.
    pub fn ready(&mut self, now: T) -> Option<String> {
        let due = matches!(&self.pending, Some((_, at)) if *at + self.period <= now);
        if due {
            self.pending.take().map(|(term, _)| term)
        } else {
            None
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::master::{Book, CategoryHead, District, Student, Supplier, SupplierKey};

    fn suppliers() -> Vec<Supplier> {
        [
            ("SUP-01", "Sri Balaji Book House"),
            ("SUP-02", "Kalaimagal Stores"),
            ("SP-10", "Balaji Stationers"),
        ]
        .iter()
        .map(|(code, name)| Supplier {
            code: code.to_string(),
            name: name.to_string(),
            ..Default::default()
        })
        .collect()
    }

    #[test]
    fn blank_term_returns_all_in_order() {
        let list = suppliers();
        let found = filter(&list, "", SupplierKey::Name);
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].code, "SUP-01");
        assert_eq!(found[2].code, "SP-10");
        assert_eq!(filter(&list, "   ", SupplierKey::Code).len(), 3);
    }

    #[test]
    fn matches_by_key_ignoring_case() {
        let list = suppliers();
        let by_name: Vec<&str> = filter(&list, "balaji", SupplierKey::Name)
            .iter()
            .map(|s| s.code.as_str())
            .collect();
        assert_eq!(by_name, vec!["SUP-01", "SP-10"]);
        let by_code: Vec<&str> = filter(&list, "sup", SupplierKey::Code)
            .iter()
            .map(|s| s.code.as_str())
            .collect();
        assert_eq!(by_code, vec!["SUP-01", "SUP-02"]);
        assert!(filter(&list, "XYZ", SupplierKey::Name).is_empty());
    }

    #[test]
    fn combined_fields() {
        let heads = vec![
            CategoryHead {
                category: "Text Books".to_owned(),
                account_head: "Purchase Account".to_owned(),
            },
            CategoryHead {
                category: "Uniforms".to_owned(),
                account_head: "Inventory".to_owned(),
            },
        ];
        assert_eq!(filter(&heads, "invent", ()).len(), 1);
        assert_eq!(filter(&heads, "BOOK", ()).len(), 1);

        let students = vec![Student {
            admission_number: "ADM-1042".to_owned(),
            name: "Kavya".to_owned(),
            standard: "V".to_owned(),
            section: "B".to_owned(),
        }];
        assert_eq!(filter(&students, "1042", ()).len(), 1);
    }

    #[test]
    fn dependent_dropdowns() {
        let districts = vec![
            District {
                state: "Tamil Nadu".to_owned(),
                name: "Chennai".to_owned(),
            },
            District {
                state: "Kerala".to_owned(),
                name: "Kochi".to_owned(),
            },
            District {
                state: "Tamil Nadu".to_owned(),
                name: "Madurai".to_owned(),
            },
        ];
        let names: Vec<&str> = scoped(&districts, "tamil nadu")
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["Chennai", "Madurai"]);
        assert_eq!(scoped(&districts, "").len(), 3);
        assert!(scoped(&districts, "Goa").is_empty());

        let books = vec![Book {
            name: "Atlas".to_owned(),
            standard: "VI".to_owned(),
            ..Default::default()
        }];
        assert_eq!(scoped(&books, "VI").len(), 1);
        assert!(scoped(&books, "VII").is_empty());

        let within: Vec<&str> = filter(scoped(&districts, "Tamil Nadu"), "mad", ())
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(within, vec!["Madurai"]);
    }

    #[test]
    fn debounce_releases_latest_term() {
        let mut debounce = Debouncer::new(SEARCH_DEBOUNCE);
        let t0 = Duration::ZERO;
        debounce.input("ba", t0);
        debounce.input("bal", t0 + Duration::from_millis(120));
        assert_eq!(debounce.ready(t0 + Duration::from_millis(300)), None);
        assert_eq!(
            debounce.ready(t0 + Duration::from_millis(420)),
            Some("bal".to_owned())
        );
        assert!(!debounce.is_pending());
        assert_eq!(debounce.ready(t0 + Duration::from_millis(900)), None);
    }
}
