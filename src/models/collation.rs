use std::cmp::Ordering;

/// How file names are folded before building a collation key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CasePolicy {
    Sensitive,
    #[default]
    Insensitive,
}

impl CasePolicy {
    pub fn from_case_sensitive(case_sensitive: bool) -> Self {
        if case_sensitive {
            CasePolicy::Sensitive
        } else {
            CasePolicy::Insensitive
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Number { value: u128, digits: usize },
    Text(String),
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (
                Segment::Number { value: a, digits: da },
                Segment::Number { value: b, digits: db },
            ) => a.cmp(b).then(da.cmp(db)),
            // digits sort before letters
            (Segment::Number { .. }, Segment::Text(_)) => Ordering::Less,
            (Segment::Text(_), Segment::Number { .. }) => Ordering::Greater,
            (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Precomputed sort key for file names.
///
/// Runs of ASCII digits compare by numeric value, so `file2` sorts before
/// `file10`. Names differing only in leading zeros are ordered by digit count.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CollationKey(Vec<Segment>);

impl CollationKey {
    pub fn for_filename(name: &str, policy: CasePolicy) -> Self {
        let folded;
        let name = match policy {
            CasePolicy::Sensitive => name,
            CasePolicy::Insensitive => {
                folded = name.to_lowercase();
                folded.as_str()
            }
        };

        let mut segments = Vec::new();
        let mut chars = name.char_indices().peekable();
        while let Some(&(start, c)) = chars.peek() {
            let numeric = c.is_ascii_digit();
            let mut end = start;
            while let Some(&(i, c)) = chars.peek() {
                if c.is_ascii_digit() != numeric {
                    break;
                }
                end = i + c.len_utf8();
                chars.next();
            }
            let run = &name[start..end];
            match run.parse::<u128>() {
                Ok(value) if numeric => segments.push(Segment::Number {
                    value,
                    digits: run.len(),
                }),
                _ => segments.push(Segment::Text(run.to_string())),
            }
        }
        CollationKey(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> CollationKey {
        CollationKey::for_filename(name, CasePolicy::Insensitive)
    }

    #[test]
    fn numbers_compare_naturally() {
        assert!(key("file2.txt") < key("file10.txt"));
        assert!(key("a9") < key("a10"));
        assert!(key("7") < key("a"));
    }

    #[test]
    fn case_policy_controls_folding() {
        assert_eq!(key("README"), key("readme"));
        let upper = CollationKey::for_filename("README", CasePolicy::Sensitive);
        let lower = CollationKey::for_filename("readme", CasePolicy::Sensitive);
        assert_ne!(upper, lower);
        assert!(upper < lower);
    }

    #[test]
    fn overlong_digit_runs_fall_back_to_text() {
        let long = "9".repeat(60);
        let k = key(&long);
        assert!(k > key("1"));
    }
}
