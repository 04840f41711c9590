use crate::domain::region::RegionTags;
use geo::MultiPolygon;
use std::collections::HashMap;

/// Stable internal identifier of a region: its slot in the arena. Composite
/// display names are presentation only and never used as lookup keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionId(pub usize);

/// Ordered list of original names with set semantics. The display form joins
/// with " & "; merges concatenate the underlying lists and de-duplicate, so
/// a chained composite never has to re-parse its own joined string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameSet {
    names: Vec<String>,
}

impl NameSet {
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            names: vec![name.into()],
        }
    }

    pub fn from_opt(name: Option<String>) -> Self {
        Self {
            names: name.into_iter().collect(),
        }
    }

    pub fn push(&mut self, name: &str) {
        if !self.contains(name) {
            self.names.push(name.to_string());
        }
    }

    /// First operand's names, then the second's, de-duplicated in order.
    pub fn merged(first: &NameSet, second: &NameSet) -> NameSet {
        let mut out = first.clone();
        for name in &second.names {
            out.push(name);
        }
        out
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn intersects(&self, other: &NameSet) -> bool {
        self.names.iter().any(|n| other.contains(n))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn display(&self) -> Option<String> {
        if self.names.is_empty() {
            None
        } else {
            Some(self.names.join(" & "))
        }
    }
}

/// One region in the consolidation arena. Name lists exist for every level
/// so that a merge can composite all of them with the same rule.
#[derive(Debug, Clone)]
pub struct RegionRecord {
    pub gemeente: NameSet,
    pub stadsdeel: NameSet,
    pub stadsdeel_onderverdeling: NameSet,
    pub wijk: NameSet,
    pub wijk_code: NameSet,
    pub buurt: NameSet,
    pub buurt_code: NameSet,
    pub geometry: MultiPolygon<f64>,
    pub listing_count: usize,
    pub active: bool,
}

impl RegionRecord {
    pub fn from_tags(tags: &RegionTags, geometry: MultiPolygon<f64>, listing_count: usize) -> Self {
        Self {
            gemeente: NameSet::single(tags.gemeente.clone()),
            stadsdeel: NameSet::from_opt(tags.stadsdeel.clone()),
            stadsdeel_onderverdeling: NameSet::from_opt(tags.stadsdeel_onderverdeling.clone()),
            wijk: NameSet::from_opt(tags.wijk.clone()),
            wijk_code: NameSet::from_opt(tags.wijk_code.clone()),
            buurt: NameSet::from_opt(tags.buurt.clone()),
            buurt_code: NameSet::from_opt(tags.buurt_code.clone()),
            geometry,
            listing_count,
            active: true,
        }
    }

    pub fn display_buurt(&self) -> String {
        self.buurt.display().unwrap_or_default()
    }

    /// The tag set listings of this region carry after consolidation.
    pub fn tags(&self) -> RegionTags {
        RegionTags {
            gemeente: self.gemeente.display().unwrap_or_default(),
            stadsdeel: self.stadsdeel.display(),
            stadsdeel_onderverdeling: self.stadsdeel_onderverdeling.display(),
            wijk: self.wijk.display(),
            wijk_code: self.wijk_code.display(),
            buurt: self.buurt.display(),
            buurt_code: self.buurt_code.display(),
        }
    }
}

/// Arena of region records plus the original-buurt-code map that gives every
/// listing its current region in O(1), however deep the merge chain.
#[derive(Debug, Default)]
pub struct RegionArena {
    slots: Vec<RegionRecord>,
    by_code: HashMap<String, RegionId>,
}

impl RegionArena {
    pub fn insert(&mut self, record: RegionRecord) -> RegionId {
        let id = RegionId(self.slots.len());
        for code in record.buurt_code.iter() {
            self.by_code.insert(code.to_string(), id);
        }
        self.slots.push(record);
        id
    }

    pub fn get(&self, id: RegionId) -> &RegionRecord {
        &self.slots[id.0]
    }

    /// Current region of an original buurt code, if the code is known.
    pub fn resolve(&self, buurt_code: &str) -> Option<RegionId> {
        self.by_code.get(buurt_code).copied()
    }

    /// Active region ids in insertion order.
    pub fn active_ids(&self) -> Vec<RegionId> {
        (0..self.slots.len())
            .map(RegionId)
            .filter(|id| self.slots[id.0].active)
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|r| r.active).count()
    }

    /// Replace `partner` and `sparse` with their composite. The partner's
    /// names come first in every joined list, the counts add up exactly, and
    /// all original buurt codes re-point to the new record.
    pub fn merge(
        &mut self,
        partner: RegionId,
        sparse: RegionId,
        geometry: MultiPolygon<f64>,
    ) -> RegionId {
        let (p, s) = (&self.slots[partner.0], &self.slots[sparse.0]);
        let record = RegionRecord {
            gemeente: NameSet::merged(&p.gemeente, &s.gemeente),
            stadsdeel: NameSet::merged(&p.stadsdeel, &s.stadsdeel),
            stadsdeel_onderverdeling: NameSet::merged(
                &p.stadsdeel_onderverdeling,
                &s.stadsdeel_onderverdeling,
            ),
            wijk: NameSet::merged(&p.wijk, &s.wijk),
            wijk_code: NameSet::merged(&p.wijk_code, &s.wijk_code),
            buurt: NameSet::merged(&p.buurt, &s.buurt),
            buurt_code: NameSet::merged(&p.buurt_code, &s.buurt_code),
            geometry,
            listing_count: p.listing_count + s.listing_count,
            active: true,
        };
        self.slots[partner.0].active = false;
        self.slots[sparse.0].active = false;
        self.insert(record)
    }
}
