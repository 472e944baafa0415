use super::{Coloring, NodeState};

impl<'a> Coloring<'a> {
    // Pops the select stack and hands every node the lowest color none of its neighbors has
    // A node without a free color is an actual spill
    // Coalesced nodes share the color of their alias
    pub fn assign_colors(&mut self) {
        log::debug!("Starting select phase");
        let colors = self.renumber.catalog().colors();
        let offset = colors.start;

        while let Some(n) = self.worklists.pop_select() {
            let mut used = vec![false; colors.len()];
            for &w in &self.graph.adjacency_list[n as usize] {
                let w = self.get_alias(w);
                if matches!(
                    self.worklists.state(w),
                    NodeState::Colored | NodeState::Precolored
                ) {
                    if let Some(color) = self.graph.color[w as usize] {
                        if colors.contains(&color) {
                            used[color - offset] = true;
                        }
                    }
                }
            }

            match used.iter().position(|&taken| !taken) {
                Some(free) => {
                    self.graph.color[n as usize] = Some(free + offset);
                    self.worklists.transition(n, NodeState::Colored);
                }
                None => {
                    log::debug!("node {} has no color left", n);
                    self.worklists.transition(n, NodeState::Spilled);
                }
            }
        }

        for n in self.worklists.coalesced.clone() {
            let alias = self.get_alias(n);
            self.graph.color[n as usize] = self.graph.color[alias as usize];
        }
    }
}
