use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub costs: usize,
    pub time_ms: usize,
    pub low_level_expand_nodes: usize,
    pub high_level_expand_nodes: usize,
}

impl Stats {
    pub(crate) fn print(&self) {
        info!(
            "Cost {:?} Time(ms) {:?} High level expand nodes {:?} Low level expand nodes {:?}",
            self.costs, self.time_ms, self.high_level_expand_nodes, self.low_level_expand_nodes
        );
    }
}
