use crate::template::CompoundSegment;

use std::cmp::Ordering;

use smallvec::SmallVec;

/// Compound segments kept in precedence order.
#[derive(Debug)]
pub(crate) struct CompoundMap<V> {
    entries: Vec<(CompoundSegment, V)>,
}

impl<V> Default for CompoundMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> CompoundMap<V> {
    pub fn find_equivalent(&self, segment: &CompoundSegment) -> Option<&V> {
        self.entries
            .iter()
            .find(|(s, _)| s.is_equivalent_to(segment))
            .map(|(_, v)| v)
    }

    /// Returns the entry equivalent to `segment`, inserting one after all
    /// entries of the same or higher precedence if there is none.
    pub fn find_mut_with(&mut self, segment: &CompoundSegment, f: impl FnOnce() -> V) -> &mut V {
        let i = match self
            .entries
            .iter()
            .position(|(s, _)| s.is_equivalent_to(segment))
        {
            Some(i) => i,
            None => {
                let i = self
                    .entries
                    .partition_point(|(s, _)| s.cmp_precedence(segment) != Ordering::Greater);
                self.entries.insert(i, (segment.clone(), f()));
                i
            }
        };
        &mut self.entries[i].1
    }

    /// The matching entries that share the highest precedence among all
    /// matching entries.
    pub fn top_matches(&self, wire: &str) -> SmallVec<[(&CompoundSegment, &V); 2]> {
        let mut out = SmallVec::new();
        let first = match self.entries.iter().position(|(s, _)| s.is_match(wire)) {
            Some(first) => first,
            None => return out,
        };
        let top = &self.entries[first].0;
        for (s, v) in &self.entries[first..] {
            if s.cmp_precedence(top) != Ordering::Equal {
                break;
            }
            if s.is_match(wire) {
                out.push((s, v));
            }
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CompoundSegment, &V)> + '_ {
        self.entries.iter().map(|(s, v)| (s, v))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.entries.iter().map(|(_, v)| v)
    }
}

/// Keeps the entries of the highest precedence, gathered from several maps.
pub(crate) fn top_of<'m, V>(
    matches: impl IntoIterator<Item = (&'m CompoundSegment, &'m V)>,
) -> SmallVec<[&'m V; 2]> {
    let matches: SmallVec<[_; 4]> = matches.into_iter().collect();
    let top = matches
        .iter()
        .map(|&(s, _)| s)
        .min_by(|a, b| a.cmp_precedence(b));
    match top {
        Some(top) => matches
            .iter()
            .filter(|(s, _)| s.cmp_precedence(top) == Ordering::Equal)
            .map(|&(_, v)| v)
            .collect(),
        None => SmallVec::new(),
    }
}

/// Splits entries into runs of equal precedence, highest first.
pub(crate) fn precedence_runs<'m, V>(
    entries: impl IntoIterator<Item = (&'m CompoundSegment, &'m V)>,
) -> Vec<SmallVec<[&'m V; 2]>> {
    let mut entries: Vec<_> = entries.into_iter().collect();
    entries.sort_by(|(a, _), (b, _)| a.cmp_precedence(b));

    let mut runs: Vec<SmallVec<[&V; 2]>> = Vec::new();
    let mut last: Option<&CompoundSegment> = None;
    for (s, v) in entries {
        match (last, runs.last_mut()) {
            (Some(l), Some(run)) if l.cmp_precedence(s) == Ordering::Equal => run.push(v),
            _ => runs.push(SmallVec::from_elem(v, 1)),
        }
        last = Some(s);
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{PathSegment, UriTemplate};

    fn compound(text: &str) -> CompoundSegment {
        let t = UriTemplate::new(text).unwrap();
        match &t.path_segments()[0] {
            PathSegment::Compound(s) => s.clone(),
            other => panic!("not a compound segment: {:?}", other),
        }
    }

    fn tops(map: &CompoundMap<&'static str>, wire: &str) -> Vec<&'static str> {
        map.top_matches(wire).iter().map(|&(_, &v)| v).collect()
    }

    #[test]
    fn ordered_by_precedence() {
        let mut map: CompoundMap<&str> = CompoundMap::default();
        let texts = ["{x}.{y}", "foo{x}bar", "{x}bar", "food{x}ar", "foo{x}"];
        for &text in texts.iter() {
            map.find_mut_with(&compound(text), || text);
        }
        assert_eq!(
            map.values().copied().collect::<Vec<_>>(),
            vec!["food{x}ar", "foo{x}bar", "foo{x}", "{x}bar", "{x}.{y}"]
        );

        assert_eq!(tops(&map, "foodzar"), vec!["food{x}ar"]);
        assert_eq!(tops(&map, "foozbar"), vec!["foo{x}bar"]);
        assert_eq!(tops(&map, "fooz"), vec!["foo{x}"]);
        assert_eq!(tops(&map, "a.b"), vec!["{x}.{y}"]);
        assert!(tops(&map, "zzz").is_empty());
    }

    #[test]
    fn equal_precedence_matches_together() {
        let mut map: CompoundMap<&str> = CompoundMap::default();
        for &text in ["x{a}.{b}y", "x{a}-{b}y", "x{a}y"].iter() {
            map.find_mut_with(&compound(text), || text);
        }
        assert_eq!(tops(&map, "x1.2-3y"), vec!["x{a}.{b}y", "x{a}-{b}y"]);
        assert_eq!(tops(&map, "x1-2y"), vec!["x{a}-{b}y"]);
        assert_eq!(tops(&map, "x1y"), vec!["x{a}y"]);

        let runs = precedence_runs(map.iter());
        let runs: Vec<Vec<&str>> = runs
            .iter()
            .map(|r| r.iter().map(|&&v| v).collect())
            .collect();
        assert_eq!(runs, vec![vec!["x{a}.{b}y", "x{a}-{b}y"], vec!["x{a}y"]]);
    }

    #[test]
    fn top_across_maps() {
        let a = compound("x{a}y");
        let b = compound("x{a}");
        let c = compound("x{b}y");
        let picked = top_of([(&b, &1), (&a, &2), (&c, &3)]);
        assert_eq!(picked.into_iter().copied().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn equivalent_segments_share_an_entry() {
        let mut map: CompoundMap<usize> = CompoundMap::default();
        *map.find_mut_with(&compound("p{x}q"), || 0) += 1;
        *map.find_mut_with(&compound("p{y}q"), || 0) += 1;
        assert_eq!(map.values().count(), 1);
        assert_eq!(map.find_equivalent(&compound("p{z}q")), Some(&2));

        map.find_mut_with(&compound("P{y}q"), || 0);
        assert_eq!(map.values().count(), 2);
    }
}
