//! Network identifier allocation.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use metalnet_types::VlanId;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("no free network identifier left in pool {0}")]
    Exhausted(String),
}

/// Hands out network identifiers for new networks.
pub trait NetworkIdAllocator: Send + Sync + fmt::Debug {
    /// Reserves an identifier not currently handed out.
    fn allocate(&mut self) -> Result<VlanId, AllocationError>;

    /// Returns `id` to the pool.
    fn release(&mut self, id: VlanId);
}

/// Allocator over a fixed set of VLAN ranges.
///
/// Always hands out the lowest free identifier. VLAN 1 (the switch default)
/// can never be part of a pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlanPool {
    ranges: Vec<RangeInclusive<u16>>,
    in_use: BTreeSet<VlanId>,
}

impl VlanPool {
    /// Builds a pool, rejecting empty, reversed, out-of-range or overlapping
    /// ranges.
    pub fn new(mut ranges: Vec<RangeInclusive<u16>>) -> Result<Self, ConfigError> {
        let text = render(&ranges);
        let invalid = |reason: String| ConfigError::InvalidPool {
            pool: text.clone(),
            reason,
        };

        if ranges.is_empty() {
            return Err(invalid("pool is empty".to_string()));
        }
        for range in &ranges {
            if range.start() > range.end() {
                return Err(invalid(format!(
                    "range {}-{} is reversed",
                    range.start(),
                    range.end()
                )));
            }
            if *range.start() <= VlanId::DEFAULT.get() || *range.end() > VlanId::MAX {
                return Err(invalid(format!(
                    "range {}-{} outside 2-{}",
                    range.start(),
                    range.end(),
                    VlanId::MAX
                )));
            }
        }

        ranges.sort_by_key(|r| *r.start());
        for pair in ranges.windows(2) {
            if pair[1].start() <= pair[0].end() {
                return Err(invalid(format!(
                    "ranges {}-{} and {}-{} overlap",
                    pair[0].start(),
                    pair[0].end(),
                    pair[1].start(),
                    pair[1].end()
                )));
            }
        }

        Ok(Self {
            ranges,
            in_use: BTreeSet::new(),
        })
    }

    /// Number of identifiers the pool can hand out in total.
    pub fn capacity(&self) -> usize {
        self.ranges
            .iter()
            .map(|r| usize::from(*r.end() - *r.start()) + 1)
            .sum()
    }

    pub fn in_use(&self) -> usize {
        self.in_use.len()
    }

    pub fn contains(&self, id: VlanId) -> bool {
        self.ranges.iter().any(|r| r.contains(&id.get()))
    }
}

fn render(ranges: &[RangeInclusive<u16>]) -> String {
    ranges
        .iter()
        .map(|r| {
            if r.start() == r.end() {
                r.start().to_string()
            } else {
                format!("{}-{}", r.start(), r.end())
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

impl fmt::Display for VlanPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(&self.ranges))
    }
}

impl FromStr for VlanPool {
    type Err = ConfigError;

    /// Parses `"100-199, 300"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| ConfigError::InvalidPool {
            pool: s.to_string(),
            reason,
        };
        let number = |text: &str| {
            text.trim()
                .parse::<u16>()
                .map_err(|_| invalid(format!("{:?} is not a VLAN number", text.trim())))
        };

        let mut ranges = Vec::new();
        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let range = match entry.split_once('-') {
                Some((low, high)) => number(low)?..=number(high)?,
                None => {
                    let id = number(entry)?;
                    id..=id
                }
            };
            ranges.push(range);
        }
        Self::new(ranges)
    }
}

impl NetworkIdAllocator for VlanPool {
    fn allocate(&mut self) -> Result<VlanId, AllocationError> {
        let free = self
            .ranges
            .iter()
            .flat_map(|r| r.clone())
            .filter_map(|id| VlanId::new(id).ok())
            .find(|id| !self.in_use.contains(id));

        match free {
            Some(id) => {
                self.in_use.insert(id);
                debug!(network_id = %id, "Allocated network identifier");
                Ok(id)
            }
            None => Err(AllocationError::Exhausted(self.to_string())),
        }
    }

    fn release(&mut self, id: VlanId) {
        if !self.in_use.remove(&id) {
            warn!(network_id = %id, "Released network identifier that was not allocated");
        }
    }
}
