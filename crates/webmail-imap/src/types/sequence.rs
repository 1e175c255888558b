//! UID sets for message-level commands.

use super::Uid;

/// A set of message UIDs as sent in `UID FETCH`/`UID STORE`/`UID COPY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UidSet {
    /// Single UID.
    Single(Uid),
    /// Range of UIDs (inclusive).
    Range(Uid, Uid),
    /// Range from start to highest UID.
    RangeFrom(Uid),
    /// Every message (`1:*`).
    All,
    /// Multiple UID specifications.
    Set(Vec<Self>),
}

impl UidSet {
    /// Creates a UID set from a single UID.
    #[must_use]
    pub const fn single(uid: Uid) -> Self {
        Self::Single(uid)
    }

    /// Creates a UID set from a range.
    #[must_use]
    pub const fn range(start: Uid, end: Uid) -> Self {
        Self::Range(start, end)
    }

    /// Builds a compact set from arbitrary UIDs.
    ///
    /// Consecutive UIDs collapse into ranges; duplicates are dropped.
    /// Returns `None` when the input is empty.
    #[must_use]
    pub fn from_uids(uids: impl IntoIterator<Item = Uid>) -> Option<Self> {
        let mut sorted: Vec<Uid> = uids.into_iter().collect();
        sorted.sort_unstable();
        sorted.dedup();

        let mut runs = Vec::new();
        let mut iter = sorted.into_iter();
        let first = iter.next()?;
        let (mut start, mut end) = (first, first);
        for uid in iter {
            if end.get().checked_add(1) == Some(uid.get()) {
                end = uid;
            } else {
                runs.push(Self::run(start, end));
                start = uid;
                end = uid;
            }
        }
        runs.push(Self::run(start, end));

        Some(if runs.len() == 1 {
            runs.remove(0)
        } else {
            Self::Set(runs)
        })
    }

    fn run(start: Uid, end: Uid) -> Self {
        if start == end {
            Self::Single(start)
        } else {
            Self::Range(start, end)
        }
    }
}

impl std::fmt::Display for UidSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(n) => write!(f, "{n}"),
            Self::Range(start, end) => write!(f, "{start}:{end}"),
            Self::RangeFrom(start) => write!(f, "{start}:*"),
            Self::All => f.write_str("1:*"),
            Self::Set(items) => {
                let s: Vec<_> = items.iter().map(ToString::to_string).collect();
                f.write_str(&s.join(","))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn uids(values: &[u32]) -> Vec<Uid> {
        values.iter().map(|&v| Uid::new(v).unwrap()).collect()
    }

    #[test]
    fn from_uids_collapses_runs() {
        let set = UidSet::from_uids(uids(&[7, 1, 2, 3, 9, 8, 12])).unwrap();
        assert_eq!(set.to_string(), "1:3,7:9,12");
    }

    #[test]
    fn from_uids_single() {
        let set = UidSet::from_uids(uids(&[5, 5])).unwrap();
        assert_eq!(set, UidSet::Single(Uid::new(5).unwrap()));
    }

    #[test]
    fn from_uids_empty() {
        assert!(UidSet::from_uids(Vec::new()).is_none());
    }

    #[test]
    fn display_all() {
        assert_eq!(UidSet::All.to_string(), "1:*");
        assert_eq!(
            UidSet::RangeFrom(Uid::new(4).unwrap()).to_string(),
            "4:*"
        );
    }
}
