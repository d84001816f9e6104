//! A union-find over a dense index space whose groups can be iterated.
//!
//! Beyond the usual `find`/`union`, every group keeps its members on a
//! circular linked list, spliced in O(1) on union, so that all members of a
//! group can be visited in time linear in the group size. Groups only ever
//! grow; there is no way to split them again.

/// Union-find with per-group member iteration.
///
/// Uses union by size, so `find` runs in O(log n) without needing `&mut`
/// access for path compression.
#[derive(Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    group_size: Vec<usize>,
    // Circular linked list threading each group's members.
    next_member: Vec<usize>,
}

impl UnionFind {
    /// Creates a union-find over `0..len` with every index in its own group.
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            group_size: vec![1; len],
            next_member: (0..len).collect(),
        }
    }

    /// Returns the size of the index space.
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// Returns `true` if the index space is empty.
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Returns the root of the group containing `x`.
    pub fn find(&self, mut x: usize) -> usize {
        while self.parent[x] != x {
            x = self.parent[x];
        }
        x
    }

    /// Returns `true` if `a` and `b` are in the same group.
    pub fn same(&self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }

    /// Returns the number of members in the group containing `x`.
    pub fn size_of(&self, x: usize) -> usize {
        self.group_size[self.find(x)]
    }

    /// Merges the groups containing `a` and `b` and returns the root of the
    /// combined group. A no-op if they are already in the same group.
    pub fn union(&mut self, a: usize, b: usize) -> usize {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return ra;
        }

        let (big, small) = if self.group_size[ra] >= self.group_size[rb] {
            (ra, rb)
        } else {
            (rb, ra)
        };

        self.parent[small] = big;
        self.group_size[big] += self.group_size[small];
        // Splicing the two circular member lists at their roots concatenates
        // them into one cycle through both groups.
        self.next_member.swap(big, small);

        big
    }

    /// Returns an iterator over all members of the group containing `x`,
    /// starting at `x` itself. Every member is yielded exactly once.
    pub fn members(&self, x: usize) -> MemberIter<'_> {
        MemberIter {
            uf: self,
            start: x,
            cur: Some(x),
        }
    }
}

/// Iterator over the members of one union-find group.
///
/// Returned by [`UnionFind::members`].
pub struct MemberIter<'a> {
    uf: &'a UnionFind,
    start: usize,
    cur: Option<usize>,
}

impl Iterator for MemberIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.cur?;
        let next = self.uf.next_member[cur];
        self.cur = (next != self.start).then_some(next);
        Some(cur)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use itertools::Itertools;

    fn sorted_members(uf: &UnionFind, x: usize) -> Vec<usize> {
        uf.members(x).sorted().collect_vec()
    }

    #[test]
    fn singletons() {
        let uf = UnionFind::new(5);
        for i in 0..5 {
            assert_eq!(uf.find(i), i);
            assert_eq!(uf.size_of(i), 1);
            assert_eq!(uf.members(i).collect_vec(), vec![i]);
        }
    }

    #[test]
    fn union_merges_members() {
        let mut uf = UnionFind::new(6);
        uf.union(0, 1);
        uf.union(2, 3);

        assert!(uf.same(0, 1));
        assert!(!uf.same(1, 2));
        assert_eq!(sorted_members(&uf, 0), vec![0, 1]);
        assert_eq!(sorted_members(&uf, 3), vec![2, 3]);

        uf.union(1, 3);
        assert!(uf.same(0, 2));
        assert_eq!(uf.size_of(3), 4);
        assert_eq!(sorted_members(&uf, 2), vec![0, 1, 2, 3]);
        // Member iteration works from any member, not just the root.
        for i in 0..4 {
            assert_eq!(sorted_members(&uf, i), vec![0, 1, 2, 3]);
        }

        assert_eq!(sorted_members(&uf, 4), vec![4]);
    }

    #[test]
    fn union_is_idempotent() {
        let mut uf = UnionFind::new(3);
        uf.union(0, 1);
        uf.union(1, 0);
        uf.union(0, 1);

        assert_eq!(uf.size_of(0), 2);
        assert_eq!(sorted_members(&uf, 0), vec![0, 1]);
    }

    #[test]
    fn chain_of_unions() {
        let n = 100;
        let mut uf = UnionFind::new(n);
        for i in 1..n {
            uf.union(i - 1, i);
        }

        assert_eq!(uf.size_of(0), n);
        assert_eq!(sorted_members(&uf, 42), (0..n).collect_vec());

        let root = uf.find(0);
        for i in 0..n {
            assert_eq!(uf.find(i), root);
        }
    }
}
