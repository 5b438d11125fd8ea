use ustr::Ustr;

/// Service point number (BPUIC), stable across all input sources.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct StationId(pub u32);

/// Identifier of a single run for one operating day (FAHRT_BEZEICHNER).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct RunId(pub Ustr);

impl RunId {
    pub fn new(s: &str) -> Self {
        RunId(ustr::ustr(s))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for StationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unordered station pair, stored with the smaller id first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct StationPair {
    pub first: StationId,
    pub second: StationId,
}

impl StationPair {
    pub fn new(a: StationId, b: StationId) -> Self {
        if a <= b {
            StationPair {
                first: a,
                second: b,
            }
        } else {
            StationPair {
                first: b,
                second: a,
            }
        }
    }

    pub fn is_loop(&self) -> bool {
        self.first == self.second
    }
}

impl std::fmt::Display for StationPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.first, self.second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_is_canonical() {
        let a = StationPair::new(StationId(8503000), StationId(8507000));
        let b = StationPair::new(StationId(8507000), StationId(8503000));
        assert_eq!(a, b);
        assert_eq!(a.first, StationId(8503000));
        assert!(!a.is_loop());
        assert!(StationPair::new(StationId(1), StationId(1)).is_loop());
    }

    #[test]
    fn run_ids_order_by_text() {
        let mut ids = vec![RunId::new("85:11:2"), RunId::new("85:11:10"), RunId::new("85:11:1")];
        ids.sort();
        let sorted: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(sorted, vec!["85:11:1", "85:11:10", "85:11:2"]);
    }
}
