//! Per-parse uid assignment.

use std::collections::{HashMap, HashSet};

use tracing::debug;
use uuid::Uuid;

/// Hands out uids that are unique within one adapter call.
///
/// Missing uids are generated; a uid seen before gets a `-2`, `-3`, ... suffix.
#[derive(Debug, Clone)]
pub struct UidAllocator {
    domain: String,
    used: HashSet<String>,
    next_suffix: HashMap<String, usize>,
}

impl Default for UidAllocator {
    fn default() -> Self {
        Self::new("almanac")
    }
}

impl UidAllocator {
    /// `domain` is placed after `@` in generated uids.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            used: HashSet::new(),
            next_suffix: HashMap::new(),
        }
    }

    pub fn allocate(&mut self, requested: Option<&str>) -> String {
        let base = match requested.map(str::trim) {
            Some(uid) if !uid.is_empty() => uid.to_string(),
            _ => format!("{}@{}", Uuid::new_v4().simple(), self.domain),
        };
        if self.used.insert(base.clone()) {
            return base;
        }

        let mut n = self.next_suffix.get(&base).copied().unwrap_or(2);
        loop {
            let candidate = format!("{base}-{n}");
            n += 1;
            if self.used.insert(candidate.clone()) {
                debug!(uid = %base, assigned = %candidate, "repeated uid renamed");
                self.next_suffix.insert(base, n);
                return candidate;
            }
        }
    }
}
