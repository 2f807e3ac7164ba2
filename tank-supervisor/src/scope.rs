//! Lines, tanks and the directory that orders them for dashboards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TankKind {
    Breeding,
    Filter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub id:     String,
    pub name:   String,
    #[serde(default)]
    pub order:  i32,
    #[serde(default = "active_by_default")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tank {
    pub id:      String,
    pub name:    String,
    pub line_id: String,
    pub kind:    TankKind,
    #[serde(default)]
    pub order:   i32,
    #[serde(default = "active_by_default")]
    pub active:  bool,
}

fn active_by_default() -> bool {
    true
}

/// Master data for lines and tanks.
#[derive(Debug, Clone, Default)]
pub struct ScopeDirectory {
    lines: BTreeMap<String, Line>,
    tanks: BTreeMap<String, Tank>,
}

impl ScopeDirectory {
    /// Tanks pointing at a line that does not exist are dropped.
    pub fn new(lines: impl IntoIterator<Item = Line>, tanks: impl IntoIterator<Item = Tank>) -> Self {
        let lines: BTreeMap<String, Line> = lines.into_iter().map(|l| (l.id.clone(), l)).collect();
        let tanks = tanks
            .into_iter()
            .filter(|t| {
                let known = lines.contains_key(&t.line_id);
                if !known {
                    tracing::warn!(tank = %t.id, line = %t.line_id, "tank references unknown line");
                }
                known
            })
            .map(|t| (t.id.clone(), t))
            .collect();
        Self { lines, tanks }
    }

    pub fn line(&self, id: &str) -> Option<&Line> {
        self.lines.get(id)
    }

    pub fn tank(&self, id: &str) -> Option<&Tank> {
        self.tanks.get(id)
    }

    /// Active lines, by `order` then id.
    pub fn active_lines(&self) -> Vec<&Line> {
        let mut lines: Vec<&Line> = self.lines.values().filter(|l| l.active).collect();
        lines.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        lines
    }

    /// Active tanks of an active line, by `order` then id. Empty for unknown
    /// or inactive lines.
    pub fn active_tanks(&self, line_id: &str) -> Vec<&Tank> {
        if !self.line(line_id).is_some_and(|l| l.active) {
            return Vec::new();
        }
        let mut tanks: Vec<&Tank> = self
            .tanks
            .values()
            .filter(|t| t.active && t.line_id == line_id)
            .collect();
        tanks.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        tanks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, order: i32, active: bool) -> Line {
        Line { id: id.into(), name: id.to_uppercase(), order, active }
    }

    fn tank(id: &str, line_id: &str, kind: TankKind, order: i32, active: bool) -> Tank {
        Tank { id: id.into(), name: id.into(), line_id: line_id.into(), kind, order, active }
    }

    fn directory() -> ScopeDirectory {
        ScopeDirectory::new(
            vec![line("l2", 2, true), line("l1", 1, true), line("l3", 0, false)],
            vec![
                tank("t3", "l1", TankKind::Filter, 3, true),
                tank("t1", "l1", TankKind::Breeding, 1, true),
                tank("t2", "l1", TankKind::Breeding, 2, false),
                tank("t4", "l3", TankKind::Breeding, 1, true),
                tank("orphan", "l9", TankKind::Filter, 1, true),
            ],
        )
    }

    #[test]
    fn active_lines_in_order() {
        let d = directory();
        let ids: Vec<_> = d.active_lines().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["l1", "l2"]);
    }

    #[test]
    fn active_tanks_skip_inactive() {
        let d = directory();
        let ids: Vec<_> = d.active_tanks("l1").iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t3"]);
        assert!(d.active_tanks("l3").is_empty());
        assert!(d.active_tanks("nope").is_empty());
    }

    #[test]
    fn orphan_tanks_are_dropped() {
        assert!(directory().tank("orphan").is_none());
    }

    #[test]
    fn tank_kind_deserializes_lowercase() {
        let t: Tank = serde_json::from_value(serde_json::json!({
            "id": "t1", "name": "Tank 1", "line_id": "l1", "kind": "filter"
        }))
        .unwrap();
        assert_eq!(t.kind, TankKind::Filter);
        assert!(t.active);
        assert_eq!(t.order, 0);
    }
}
