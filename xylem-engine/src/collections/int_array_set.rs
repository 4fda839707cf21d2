use super::IntSet;

/// A sorted-array integer set, the right shape for small sets that are
/// mostly iterated and merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntArraySet {
    // sorted, no duplicates
    values: Vec<i32>,
}

impl IntArraySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(mut values: Vec<i32>) -> Self {
        values.sort_unstable();
        values.dedup();
        IntArraySet { values }
    }

    /// Union as a linear merge of the two sorted runs.
    pub fn union(&self, other: &IntArraySet) -> IntArraySet {
        let mut result = Vec::with_capacity(self.values.len() + other.values.len());
        let mut a = self.values.iter().peekable();
        let mut b = other.values.iter().peekable();
        loop {
            match (a.peek(), b.peek()) {
                (Some(&&x), Some(&&y)) => {
                    if x < y {
                        result.push(x);
                        a.next();
                    } else if y < x {
                        result.push(y);
                        b.next();
                    } else {
                        result.push(x);
                        a.next();
                        b.next();
                    }
                }
                (Some(&&x), None) => {
                    result.push(x);
                    a.next();
                }
                (None, Some(&&y)) => {
                    result.push(y);
                    b.next();
                }
                (None, None) => break,
            }
        }
        IntArraySet { values: result }
    }

    /// Intersection by linear merge.
    pub fn intersect(&self, other: &IntArraySet) -> IntArraySet {
        let mut result = Vec::new();
        let mut a = self.values.iter().peekable();
        let mut b = other.values.iter().peekable();
        while let (Some(&&x), Some(&&y)) = (a.peek(), b.peek()) {
            if x < y {
                a.next();
            } else if y < x {
                b.next();
            } else {
                result.push(x);
                a.next();
                b.next();
            }
        }
        IntArraySet { values: result }
    }

    /// Difference by linear merge.
    pub fn except(&self, other: &IntArraySet) -> IntArraySet {
        let mut result = Vec::new();
        let mut b = other.values.iter().peekable();
        for &x in &self.values {
            while b.peek().is_some_and(|&&y| y < x) {
                b.next();
            }
            if b.peek() != Some(&&x) {
                result.push(x);
            }
        }
        IntArraySet { values: result }
    }

    /// The members as a sorted slice.
    pub fn as_slice(&self) -> &[i32] {
        &self.values
    }
}

impl IntSet for IntArraySet {
    fn add(&mut self, value: i32) -> bool {
        match self.values.binary_search(&value) {
            Ok(_) => false,
            Err(index) => {
                self.values.insert(index, value);
                true
            }
        }
    }

    fn remove(&mut self, value: i32) -> bool {
        match self.values.binary_search(&value) {
            Ok(index) => {
                self.values.remove(index);
                true
            }
            Err(_) => false,
        }
    }

    fn contains(&self, value: i32) -> bool {
        self.values.binary_search(&value).is_ok()
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = i32> + '_> {
        Box::new(self.values.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stays_sorted() {
        let mut set = IntArraySet::new();
        set.add(5);
        set.add(-3);
        set.add(9);
        set.add(5);
        assert_eq!(set.as_slice(), &[-3, 5, 9]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_union_merges_sorted_runs() {
        let a = IntArraySet::from_values(vec![1, 3, 5]);
        let b = IntArraySet::from_values(vec![2, 3, 6]);
        assert_eq!(a.union(&b).as_slice(), &[1, 2, 3, 5, 6]);
    }

    #[test]
    fn test_intersect_and_except() {
        let a = IntArraySet::from_values(vec![1, 2, 3, 4]);
        let b = IntArraySet::from_values(vec![2, 4, 6]);
        assert_eq!(a.intersect(&b).as_slice(), &[2, 4]);
        assert_eq!(a.except(&b).as_slice(), &[1, 3]);
        assert_eq!(b.except(&a).as_slice(), &[6]);
    }

    #[test]
    fn test_contains_all() {
        let a = IntArraySet::from_values(vec![1, 2, 3]);
        let b = IntArraySet::from_values(vec![1, 3]);
        assert!(a.contains_all(&b));
        assert!(!b.contains_all(&a));
    }
}
