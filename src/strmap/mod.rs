use std::cmp::Ordering;

/// Case-folds a key the way literal comparisons do (ordinal, ignoring case).
pub(crate) fn fold(s: &str) -> String {
    s.to_uppercase()
}

pub(crate) fn eq_folded(lhs: &str, rhs: &str) -> bool {
    lhs.chars()
        .flat_map(char::to_uppercase)
        .eq(rhs.chars().flat_map(char::to_uppercase))
}

pub(crate) fn cmp_folded(lhs: &str, rhs: &str) -> Ordering {
    lhs.chars()
        .flat_map(char::to_uppercase)
        .cmp(rhs.chars().flat_map(char::to_uppercase))
}

/// Compares the reversed strings, ignoring case.
pub(crate) fn cmp_folded_rev(lhs: &str, rhs: &str) -> Ordering {
    lhs.chars()
        .rev()
        .flat_map(char::to_uppercase)
        .cmp(rhs.chars().rev().flat_map(char::to_uppercase))
}

/// A sorted map from case-folded strings to values.
#[derive(Debug)]
pub(crate) struct StrMap<T> {
    keys: Vec<Box<str>>,
    values: Vec<T>,
}

impl<T> Default for StrMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> StrMap<T> {
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn find(&self, key: &str) -> Option<&T> {
        let key = fold(key);
        match self.find_index(&key) {
            Ok(i) => self.values.get(i),
            Err(_) => None,
        }
    }

    pub fn find_mut_with(&mut self, key: &str, f: impl FnOnce() -> T) -> &mut T {
        let key = fold(key);
        let i = match self.find_index(&key) {
            Ok(i) => i,
            Err(i) => {
                self.values.insert(i, f());
                self.keys.insert(i, key.into_boxed_str());
                i
            }
        };
        &mut self.values[i]
    }

    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.values.iter()
    }

    /// Iterates in key order. Keys are yielded folded.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> + '_ {
        self.keys.iter().map(|k| &**k).zip(self.values.iter())
    }

    fn find_index(&self, folded: &str) -> Result<usize, usize> {
        self.keys.binary_search_by(|k| (**k).cmp(folded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_ignore_case() {
        let mut map: StrMap<usize> = StrMap::new();
        *map.find_mut_with("Orders", || 0) += 1;
        *map.find_mut_with("ORDERS", || 0) += 1;
        *map.find_mut_with("items", || 10) += 1;

        assert_eq!(map.values().count(), 2);
        assert_eq!(
            map.iter().collect::<Vec<_>>(),
            vec![("ITEMS", &11), ("ORDERS", &2)]
        );
        assert_eq!(map.find("orders"), Some(&2));
        assert_eq!(map.find("Items"), Some(&11));
        assert_eq!(map.find("order"), None);
    }

    #[test]
    fn folded_comparisons() {
        assert!(eq_folded("Straße", "STRASSE"));
        assert_eq!(cmp_folded("food", "FOO"), Ordering::Greater);
        assert_eq!(cmp_folded_rev("ar", "bar"), Ordering::Less);
        assert_eq!(cmp_folded_rev("zar", "BAR"), Ordering::Greater);
    }
}
