// Navigation state - back and forward lists of a slot
use crate::change::ChangeKind;
use crate::error::NavigationError;
use crate::history::HistoryEntry;
use crate::location::Location;
use std::collections::VecDeque;

/// Back/forward lists with the slot's current location as the implicit pivot.
///
/// Both lists are nearest-first: `back[0]` is where Back goes, `forward[0]`
/// is where Forward goes.
#[derive(Debug, Default, Clone)]
pub struct NavigationHistory {
    back: VecDeque<HistoryEntry>,
    forward: VecDeque<HistoryEntry>,
}

impl NavigationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn back(&self) -> &VecDeque<HistoryEntry> {
        &self.back
    }

    pub fn forward(&self) -> &VecDeque<HistoryEntry> {
        &self.forward
    }

    pub fn back_locations(&self) -> Vec<Location> {
        self.back.iter().map(|e| e.location.clone()).collect()
    }

    pub fn forward_locations(&self) -> Vec<Location> {
        self.forward.iter().map(|e| e.location.clone()).collect()
    }

    pub fn can_go_back(&self) -> bool {
        !self.back.is_empty()
    }

    pub fn can_go_forward(&self) -> bool {
        !self.forward.is_empty()
    }

    /// Entry `distance` steps away in the direction of `kind`.
    ///
    /// Out-of-range distances are reported rather than clamped.
    pub fn target(&self, kind: ChangeKind, distance: usize) -> Result<&HistoryEntry, NavigationError> {
        let list = match kind {
            ChangeKind::Back => &self.back,
            ChangeKind::Forward => &self.forward,
            _ => return Err(NavigationError::Unsupported("history target for non-history change")),
        };
        list.get(distance).ok_or(NavigationError::HistoryOutOfRange {
            requested: distance,
            available: list.len(),
        })
    }

    /// Rewrite the lists for a change that has just committed.
    ///
    /// `previous` is the entry for the location being left, if the slot had one.
    pub fn commit(
        &mut self,
        kind: ChangeKind,
        distance: usize,
        previous: Option<HistoryEntry>,
        new_location: &Location,
    ) -> Result<(), NavigationError> {
        match kind {
            ChangeKind::Standard | ChangeKind::Fallback => {
                if let Some(previous) = previous {
                    if &previous.location != new_location {
                        self.forward.clear();
                        self.back.push_front(previous);
                    }
                }
                Ok(())
            }
            ChangeKind::Back => {
                Self::rotate(&mut self.back, &mut self.forward, distance, previous)
            }
            ChangeKind::Forward => {
                Self::rotate(&mut self.forward, &mut self.back, distance, previous)
            }
            ChangeKind::Reload | ChangeKind::Redirect => Ok(()),
        }
    }

    // Move `distance` entries from `from` onto `to`, then drop the target,
    // which becomes the current location.
    fn rotate(
        from: &mut VecDeque<HistoryEntry>,
        to: &mut VecDeque<HistoryEntry>,
        distance: usize,
        previous: Option<HistoryEntry>,
    ) -> Result<(), NavigationError> {
        if distance >= from.len() {
            return Err(NavigationError::HistoryOutOfRange {
                requested: distance,
                available: from.len(),
            });
        }
        if let Some(previous) = previous {
            to.push_front(previous);
        }
        for _ in 0..distance {
            if let Some(entry) = from.pop_front() {
                to.push_front(entry);
            }
        }
        from.pop_front();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.back.clear();
        self.forward.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn entry(path: &str) -> Option<HistoryEntry> {
        Some(HistoryEntry::new(path.into()))
    }

    fn locs(paths: &[&str]) -> Vec<Location> {
        paths.iter().map(|p| Location::from(*p)).collect()
    }

    // Walks a sequence of standard visits and returns the resulting lists.
    fn visit(paths: &[&str]) -> (NavigationHistory, Location) {
        let mut history = NavigationHistory::new();
        let mut current: Option<Location> = None;
        for path in paths {
            let next = Location::from(*path);
            let previous = current.take().map(HistoryEntry::new);
            history
                .commit(ChangeKind::Standard, 0, previous, &next)
                .unwrap();
            current = Some(next);
        }
        (history, current.unwrap())
    }

    #[test]
    fn standard_pushes_and_clears_forward() {
        let (mut history, current) = visit(&["/a", "/b", "/c"]);
        assert_eq!(history.back_locations(), locs(&["/b", "/a"]));

        history
            .commit(ChangeKind::Back, 0, Some(HistoryEntry::new(current)), &"/b".into())
            .unwrap();
        assert_eq!(history.forward_locations(), locs(&["/c"]));

        history
            .commit(ChangeKind::Standard, 0, entry("/b"), &"/d".into())
            .unwrap();
        assert_eq!(history.back_locations(), locs(&["/b", "/a"]));
        assert!(history.forward().is_empty());
    }

    #[test]
    fn same_location_is_not_pushed() {
        let (mut history, _) = visit(&["/a", "/b"]);
        history
            .commit(ChangeKind::Standard, 0, entry("/b"), &"/b".into())
            .unwrap();
        assert_eq!(history.back_locations(), locs(&["/a"]));
    }

    #[test]
    fn back_with_distance_rotates_entries() {
        let (mut history, current) = visit(&["/a", "/b", "/c", "/d"]);
        let target = history.target(ChangeKind::Back, 1).unwrap().location.clone();
        assert_eq!(target, Location::from("/b"));

        history
            .commit(ChangeKind::Back, 1, Some(HistoryEntry::new(current)), &target)
            .unwrap();
        assert_eq!(history.back_locations(), locs(&["/a"]));
        assert_eq!(history.forward_locations(), locs(&["/c", "/d"]));
    }

    #[test]
    fn forward_mirrors_back() {
        let (mut history, _) = visit(&["/a", "/b", "/c"]);
        history
            .commit(ChangeKind::Back, 1, entry("/c"), &"/a".into())
            .unwrap();
        assert_eq!(history.forward_locations(), locs(&["/b", "/c"]));

        history
            .commit(ChangeKind::Forward, 1, entry("/a"), &"/c".into())
            .unwrap();
        assert_eq!(history.back_locations(), locs(&["/b", "/a"]));
        assert!(history.forward().is_empty());
    }

    #[test]
    fn out_of_range_is_an_error() {
        let (history, _) = visit(&["/a", "/b"]);
        assert_eq!(
            history.target(ChangeKind::Back, 1).unwrap_err(),
            NavigationError::HistoryOutOfRange {
                requested: 1,
                available: 1
            }
        );
        assert!(history.target(ChangeKind::Forward, 0).is_err());
    }

    #[test]
    fn reload_and_redirect_keep_lists() {
        let (mut history, _) = visit(&["/a", "/b"]);
        let before = (history.back_locations(), history.forward_locations());
        history
            .commit(ChangeKind::Reload, 0, entry("/b"), &"/b".into())
            .unwrap();
        history
            .commit(ChangeKind::Redirect, 0, entry("/b"), &"/moved".into())
            .unwrap();
        assert_eq!((history.back_locations(), history.forward_locations()), before);
    }

    proptest! {
        #[test]
        fn back_and_forward_preserve_every_location(
            visits in 1usize..8,
            moves in prop::collection::vec((any::<bool>(), 0usize..8), 0..24),
        ) {
            let paths: Vec<String> = (0..visits).map(|i| format!("/dir{}", i)).collect();
            let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
            let (mut history, mut current) = visit(&refs);

            let snapshot = |history: &NavigationHistory, current: &Location| {
                let mut all = history.back_locations();
                all.extend(history.forward_locations());
                all.push(current.clone());
                all.sort();
                all
            };
            let expected = snapshot(&history, &current);

            for (backwards, raw) in moves {
                let kind = if backwards { ChangeKind::Back } else { ChangeKind::Forward };
                let available = if backwards { history.back().len() } else { history.forward().len() };
                if available == 0 {
                    continue;
                }
                let distance = raw % available;
                let target = history.target(kind, distance).unwrap().location.clone();
                history
                    .commit(kind, distance, Some(HistoryEntry::new(current.clone())), &target)
                    .unwrap();
                current = target;
                prop_assert_eq!(snapshot(&history, &current), expected.clone());
            }
        }
    }
}
