use std::cmp::Ordering;

/// A* node in the per-call arena. Parents are always allocated before their
/// children, so the chain is a plain index walk; the whole arena drops with
/// the search call frame.
#[derive(Debug, Clone)]
pub(crate) struct LowLevelNode {
    pub(crate) position: (usize, usize),
    pub(crate) time_step: usize,
    pub(crate) g_cost: f64,
    pub(crate) parent: Option<usize>,
}

/// Open-list entry pointing into the arena. Stale entries (superseded by a
/// cheaper re-entry for the same state) are skipped at pop time.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LowLevelOpenEntry {
    pub(crate) index: usize,
    pub(crate) f_cost: f64,
    pub(crate) g_cost: f64,
}

impl Eq for LowLevelOpenEntry {}

impl Ord for LowLevelOpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: invert f so the cheapest node pops
        // first, prefer the larger g on ties, then the older arena index.
        // Costs are finite sums of 1.0 and sqrt(2), never NaN.
        other
            .f_cost
            .partial_cmp(&self.f_cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                self.g_cost
                    .partial_cmp(&other.g_cost)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for LowLevelOpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    #[test]
    fn test_open_entry_ordering() {
        let mut heap = BinaryHeap::new();
        heap.push(LowLevelOpenEntry {
            index: 0,
            f_cost: 4.0,
            g_cost: 1.0,
        });
        heap.push(LowLevelOpenEntry {
            index: 1,
            f_cost: 3.0,
            g_cost: 1.0,
        });
        // Same f as index 1 but deeper, so it wins the tie.
        heap.push(LowLevelOpenEntry {
            index: 2,
            f_cost: 3.0,
            g_cost: 2.0,
        });

        assert_eq!(heap.pop().unwrap().index, 2);
        assert_eq!(heap.pop().unwrap().index, 1);
        assert_eq!(heap.pop().unwrap().index, 0);
    }

    #[test]
    fn test_open_entry_insertion_order_breaks_remaining_ties() {
        let mut heap = BinaryHeap::new();
        for index in 0..3 {
            heap.push(LowLevelOpenEntry {
                index,
                f_cost: 2.0,
                g_cost: 1.0,
            });
        }

        assert_eq!(heap.pop().unwrap().index, 0);
        assert_eq!(heap.pop().unwrap().index, 1);
        assert_eq!(heap.pop().unwrap().index, 2);
    }
}
