use super::compound::{precedence_runs, top_of, CompoundMap};
use super::equiv::EquivSet;
use super::error::TableError;
use super::Entry;
use crate::strmap::StrMap;
use crate::template::{PathSegment, UriTemplate};
use crate::wire::WireSegment;

use std::borrow::Cow;
use std::collections::HashSet;

use smallvec::{smallvec, SmallVec};

type NodeId = usize;

/// Nodes at the same depth reached through compound segments of equal
/// precedence. They are walked as one.
type Group = SmallVec<[NodeId; 2]>;

const ROOT: NodeId = 0;

/// Which child categories of a group are still to be tried.
///
/// A walk that fails below a child resumes at its parent with the child's
/// whole category exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    BeforeLiteral,
    AfterLiteral,
    AfterCompound,
    AfterVariable,
}

#[derive(Debug)]
struct Node {
    depth: usize,
    literal_children: StrMap<NodeId>,
    compound_children: CompoundMap<NodeId>,
    variable_child: Option<NodeId>,
    final_literal: StrMap<EquivSet>,
    final_compound: CompoundMap<EquivSet>,
    final_variable: EquivSet,
    end_of_path: EquivSet,
    star: EquivSet,
}

impl Node {
    fn new(depth: usize) -> Self {
        Self {
            depth,
            literal_children: StrMap::new(),
            compound_children: CompoundMap::default(),
            variable_child: None,
            final_literal: StrMap::new(),
            final_compound: CompoundMap::default(),
            final_variable: EquivSet::new(depth + 1),
            end_of_path: EquivSet::new(depth),
            star: EquivSet::new(depth),
        }
    }
}

enum Step<'t> {
    Hit(Cow<'t, EquivSet>),
    Descend { children: Group, resume: Location },
    Fail,
}

/// A segment trie over the templates of a frozen table.
#[derive(Debug)]
pub(crate) struct Trie {
    nodes: Vec<Node>,
}

impl Trie {
    pub(crate) fn build<T>(entries: &[Entry<T>]) -> Self {
        let mut trie = Self {
            nodes: vec![Node::new(0)],
        };
        for (index, entry) in entries.iter().enumerate() {
            trie.add(index, &entry.template);
        }
        trie
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn add(&mut self, index: usize, template: &UriTemplate) {
        let first_optional = template.first_optional_segment();
        let mut node = ROOT;
        for (i, segment) in template.path_segments().iter().enumerate() {
            if i >= first_optional {
                self.nodes[node].end_of_path.push(index);
            }
            if segment.ends_with_slash() {
                node = self.child(node, segment);
            } else {
                self.add_final(node, segment, index);
                return;
            }
        }
        let node = &mut self.nodes[node];
        if template.has_wildcard() {
            node.star.push(index);
        } else {
            node.end_of_path.push(index);
        }
    }

    fn child(&mut self, parent: NodeId, segment: &PathSegment) -> NodeId {
        let existing = {
            let p = &self.nodes[parent];
            match segment {
                PathSegment::Literal(s) => p.literal_children.find(s.text()).copied(),
                PathSegment::Compound(s) => p.compound_children.find_equivalent(s).copied(),
                PathSegment::Variable(_) => p.variable_child,
            }
        };
        if let Some(id) = existing {
            return id;
        }

        let id = self.nodes.len();
        let depth = self.nodes[parent].depth + 1;
        self.nodes.push(Node::new(depth));
        let p = &mut self.nodes[parent];
        match segment {
            PathSegment::Literal(s) => {
                p.literal_children.find_mut_with(s.text(), || id);
            }
            PathSegment::Compound(s) => {
                p.compound_children.find_mut_with(s, || id);
            }
            PathSegment::Variable(_) => p.variable_child = Some(id),
        }
        id
    }

    fn add_final(&mut self, node: NodeId, segment: &PathSegment, index: usize) {
        let node = &mut self.nodes[node];
        let depth = node.depth;
        let set = match segment {
            PathSegment::Literal(s) => node
                .final_literal
                .find_mut_with(s.text(), || EquivSet::new(depth + 1)),
            PathSegment::Compound(s) => node
                .final_compound
                .find_mut_with(s, || EquivSet::new(depth + 1)),
            PathSegment::Variable(_) => &mut node.final_variable,
        };
        set.push(index);
    }

    /// Finds the set a wire path resolves to.
    ///
    /// Each group tries literal, compound and variable children in that
    /// order. A child that fails hands control back to its parent's next
    /// category, so no category of a group is tried twice. All compounds of
    /// the highest matching precedence are descended together and the sets
    /// they reach are merged.
    pub(crate) fn walk(&self, wire: &[WireSegment]) -> Option<Cow<'_, EquivSet>> {
        let mut stack: Vec<(Group, Location)> = vec![(smallvec![ROOT], Location::BeforeLiteral)];
        while let Some((group, location)) = stack.pop() {
            match self.step(&group, wire, location) {
                Step::Hit(set) => return Some(set),
                Step::Descend { children, resume } => {
                    stack.push((group, resume));
                    stack.push((children, Location::BeforeLiteral));
                }
                Step::Fail => {}
            }
        }
        None
    }

    fn step(&self, group: &[NodeId], wire: &[WireSegment], mut location: Location) -> Step<'_> {
        let nodes = || group.iter().map(move |&id| &self.nodes[id]);
        let segment = match wire.get(self.nodes[group[0]].depth) {
            Some(segment) => segment,
            None => {
                let set = EquivSet::merged(nodes().map(|n| &n.end_of_path))
                    .or_else(|| EquivSet::merged(nodes().map(|n| &n.star)));
                return hit(set);
            }
        };
        let text = segment.text.as_str();

        if !segment.ends_with_slash {
            let set = EquivSet::merged(nodes().filter_map(|n| n.final_literal.find(text)))
                .or_else(|| {
                    let tops = top_of(nodes().flat_map(|n| n.final_compound.top_matches(text)));
                    EquivSet::merged(tops)
                })
                .or_else(|| {
                    if segment.is_empty() {
                        return None;
                    }
                    EquivSet::merged(nodes().map(|n| &n.final_variable))
                })
                .or_else(|| EquivSet::merged(nodes().map(|n| &n.star)));
            return hit(set);
        }

        loop {
            let (children, next): (Group, Location) = match location {
                Location::BeforeLiteral => (
                    nodes()
                        .filter_map(|n| n.literal_children.find(text).copied())
                        .collect(),
                    Location::AfterLiteral,
                ),
                Location::AfterLiteral => (
                    top_of(nodes().flat_map(|n| n.compound_children.top_matches(text)))
                        .into_iter()
                        .copied()
                        .collect(),
                    Location::AfterCompound,
                ),
                Location::AfterCompound => (
                    nodes()
                        .filter_map(|n| n.variable_child)
                        .filter(|_| !segment.is_empty())
                        .collect(),
                    Location::AfterVariable,
                ),
                Location::AfterVariable => {
                    return hit(EquivSet::merged(nodes().map(|n| &n.star)));
                }
            };
            if !children.is_empty() {
                return Step::Descend {
                    children,
                    resume: next,
                };
            }
            location = next;
        }
    }

    /// Rejects any set whose members can not be told apart.
    ///
    /// Groups are visited as the walk would form them at their largest. Sets
    /// reached through parallel compounds must also be unambiguous together,
    /// otherwise freezing fails with [`TableError::AmbiguousCompound`].
    pub(crate) fn validate<T>(
        &self,
        entries: &[Entry<T>],
        allow_duplicates: bool,
    ) -> Result<(), TableError> {
        let mut seen: HashSet<Group> = HashSet::new();
        let mut pending: Vec<Group> = vec![smallvec![ROOT]];
        while let Some(mut group) = pending.pop() {
            group.sort_unstable();
            if !seen.insert(group.clone()) {
                continue;
            }
            let nodes: SmallVec<[&Node; 2]> = group.iter().map(|&id| &self.nodes[id]).collect();

            let mut parallel = runs_by_key(nodes.iter().map(|n| &n.final_literal));
            parallel.extend(precedence_runs(
                nodes.iter().flat_map(|n| n.final_compound.iter()),
            ));
            parallel.push(nodes.iter().map(|n| &n.final_variable).collect());
            parallel.push(nodes.iter().map(|n| &n.end_of_path).collect());
            parallel.push(nodes.iter().map(|n| &n.star).collect());
            for sets in &parallel {
                validate_parallel(sets, entries, allow_duplicates)?;
            }

            let ids = |run: SmallVec<[&NodeId; 2]>| run.into_iter().copied().collect::<Group>();
            pending.extend(
                runs_by_key(nodes.iter().map(|n| &n.literal_children))
                    .into_iter()
                    .map(ids),
            );
            pending.extend(
                precedence_runs(nodes.iter().flat_map(|n| n.compound_children.iter()))
                    .into_iter()
                    .map(ids),
            );
            let variables: Group = nodes.iter().filter_map(|n| n.variable_child).collect();
            if !variables.is_empty() {
                pending.push(variables);
            }
        }
        Ok(())
    }
}

fn hit(set: Option<Cow<'_, EquivSet>>) -> Step<'_> {
    set.map_or(Step::Fail, Step::Hit)
}

/// Validates sets reached at the same point through parallel compounds, each
/// on its own and then merged.
fn validate_parallel<T>(
    sets: &[&EquivSet],
    entries: &[Entry<T>],
    allow_duplicates: bool,
) -> Result<(), TableError> {
    for set in sets {
        set.validate(entries, allow_duplicates)?;
    }
    if sets.len() < 2 {
        return Ok(());
    }
    match EquivSet::merged(sets.iter().copied()) {
        Some(merged) if merged.validate(entries, allow_duplicates).is_err() => {
            Err(TableError::AmbiguousCompound(merged.names(entries)))
        }
        _ => Ok(()),
    }
}

/// Gathers the values stored under the same key in several maps.
fn runs_by_key<'m, V>(maps: impl Iterator<Item = &'m StrMap<V>>) -> Vec<SmallVec<[&'m V; 2]>> {
    let mut all: Vec<(&str, &V)> = maps.flat_map(|m| m.iter()).collect();
    all.sort_by(|a, b| a.0.cmp(b.0));

    let mut runs: Vec<SmallVec<[&V; 2]>> = Vec::new();
    let mut last: Option<&str> = None;
    for (key, v) in all {
        match (last, runs.last_mut()) {
            (Some(l), Some(run)) if l == key => run.push(v),
            _ => runs.push(smallvec![v]),
        }
        last = Some(key);
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::split_segments;

    fn entries(texts: &[&str]) -> Vec<Entry<usize>> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Entry {
                template: t.parse().unwrap(),
                data: i,
            })
            .collect()
    }

    fn walk(trie: &Trie, entries: &[Entry<usize>], path: &str) -> Vec<usize> {
        trie.walk(&split_segments(path))
            .map(|set| set.candidates(entries, |_| true).items.to_vec())
            .unwrap_or_default()
    }

    #[test]
    fn categories_in_order() {
        let entries = entries(&["a/b", "a/{x}", "a/*", "a/p{x}q", "a/b/c", "a/{x}/d"]);
        let trie = Trie::build(&entries);
        let cases: &[(&str, &[usize])] = &[
            ("a/b", &[0]),
            ("a/z", &[1]),
            ("a/pzq", &[3]),
            ("a/b/c", &[4]),
            ("a/b/d", &[5]),
            ("a/z/d", &[5]),
            ("a/b/e", &[2]),
            ("a/", &[2]),
            ("b", &[]),
        ];
        for &(path, expected) in cases {
            assert_eq!(walk(&trie, &entries, path), expected, "{}", path);
        }
    }

    #[test]
    fn failed_compounds_are_not_retried() {
        let entries = entries(&["x{a}/one", "x{a}y/two", "{a}/three"]);
        let trie = Trie::build(&entries);
        assert_eq!(walk(&trie, &entries, "x1y/two"), vec![1]);
        assert_eq!(walk(&trie, &entries, "x1/one"), vec![0]);
        assert_eq!(walk(&trie, &entries, "x1y/one"), Vec::<usize>::new());
        assert_eq!(walk(&trie, &entries, "x1y/three"), vec![2]);
        assert_eq!(walk(&trie, &entries, "x1y/four"), Vec::<usize>::new());
    }

    #[test]
    fn parallel_compounds() {
        let entries = entries(&["a/x{a}.{b}y/one", "a/x{a}-{b}y/two", "a/x{a}y/three"]);
        let trie = Trie::build(&entries);
        assert!(trie.validate(&entries, false).is_ok());

        let cases: &[(&str, &[usize])] = &[
            ("a/x1.2y/one", &[0]),
            ("a/x1-2y/two", &[1]),
            ("a/x1.2-3y/one", &[0]),
            ("a/x1.2-3y/two", &[1]),
            ("a/x1.2y/two", &[]),
            ("a/x1.2y/three", &[]),
            ("a/x1y/three", &[2]),
        ];
        for &(path, expected) in cases {
            assert_eq!(walk(&trie, &entries, path), expected, "{}", path);
        }
    }

    #[test]
    fn parallel_compounds_reaching_one_path() {
        let plain = entries(&["a/x{a}.{b}y/one", "a/x{a}-{b}y/one"]);
        let queried = entries(&["a/x{a}.{b}y/one?v=1", "a/x{a}-{b}y/one?v=2"]);

        let trie = Trie::build(&plain);
        assert!(matches!(
            trie.validate(&plain, true),
            Err(TableError::AmbiguousCompound(_))
        ));

        let trie = Trie::build(&queried);
        assert!(trie.validate(&queried, false).is_ok());
        assert_eq!(walk(&trie, &queried, "a/x1.2-3y/one"), vec![0, 1]);
        assert_eq!(walk(&trie, &queried, "a/x1.2y/one"), vec![0]);
    }

    #[test]
    fn duplicates_below_a_single_compound() {
        let entries = entries(&["a/x{a}y/{b}", "a/x{c}y/{d}", "a/x{a}.{b}y/z"]);
        let trie = Trie::build(&entries);
        assert!(matches!(
            trie.validate(&entries, false),
            Err(TableError::Duplicate(_))
        ));
        assert!(trie.validate(&entries, true).is_ok());
    }

    #[test]
    fn terminal_defaults_end_early() {
        let entries = entries(&["a/{x=1}/{y=2}", "a/b/"]);
        let trie = Trie::build(&entries);
        assert_eq!(walk(&trie, &entries, "a/"), vec![0]);
        assert_eq!(walk(&trie, &entries, "a/5/"), vec![0]);
        assert_eq!(walk(&trie, &entries, "a/5/6"), vec![0]);
        assert_eq!(walk(&trie, &entries, "a/b/"), vec![1]);
        assert!(trie.validate(&entries, false).is_ok());
    }

    #[test]
    fn rejects_unordered_compounds() {
        let entries = entries(&["a/p{x}q", "a/P{x}Q"]);
        let trie = Trie::build(&entries);
        assert!(matches!(
            trie.validate(&entries, true),
            Err(TableError::AmbiguousCompound(_))
        ));
    }
}
