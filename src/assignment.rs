//! Decision-maker ranking and five-role outreach assignment.
//!
//! The ranking oracle orders the usable decision makers of one company
//! best-first; `assign_roles` maps that ordering onto the fixed roles
//! `primary`, `cc_1`, `cc_2`, `alt_1`, `alt_2`. A company with no usable
//! primary is skipped entirely — partial outreach with only CCs is never
//! sent.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::DecisionMaker;

/// What the ranking oracle sees for one decision maker. Built only for
/// people with an email — a null email disqualifies a person from outreach
/// before ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionMakerDescriptor {
    pub decision_maker_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub job_title: Option<String>,
    pub seniority: Option<String>,
    pub headline: Option<String>,
    pub linkedin_url: Option<String>,
}

impl DecisionMakerDescriptor {
    /// Descriptor for a persisted decision maker, or None when the person
    /// has no email.
    pub fn from_decision_maker(dm: &DecisionMaker) -> Option<Self> {
        let email = dm.email.clone().filter(|e| !e.is_empty())?;
        Some(Self {
            decision_maker_id: dm.id,
            first_name: dm.first_name.clone().unwrap_or_default(),
            last_name: dm.last_name.clone().unwrap_or_default(),
            email,
            job_title: dm.title.clone(),
            seniority: dm.seniority.clone(),
            headline: dm.headline.clone(),
            linkedin_url: dm.linkedin_url.clone(),
        })
    }

    fn has_headline(&self) -> bool {
        self.headline.as_deref().is_some_and(|h| !h.is_empty())
    }
}

/// Orders decision-maker descriptors by outreach suitability.
///
/// Contract: input is the full descriptor list for one company (already
/// filtered to people with an email); output is a list of unique indices
/// into that list, best first. A descriptor with a missing headline must
/// rank strictly after every descriptor that has one, regardless of
/// seniority.
pub trait RankingOracle: Send + Sync {
    fn rank(&self, descriptors: &[DecisionMakerDescriptor]) -> Vec<usize>;
}

/// Vendor seniority vocabulary, highest first. Unknown values rank below all
/// known ones.
const SENIORITY_ORDER: &[&str] = &[
    "founder", "c_suite", "owner", "partner", "vp", "head", "director", "manager", "senior",
    "entry", "intern",
];

fn seniority_rank(seniority: Option<&str>) -> usize {
    seniority
        .and_then(|s| SENIORITY_ORDER.iter().position(|known| *known == s))
        .unwrap_or(SENIORITY_ORDER.len())
}

/// Deterministic ranking: headline-present first, then seniority, then input
/// order. The stable sort makes input order the final tie-break.
pub struct SeniorityRanker;

impl RankingOracle for SeniorityRanker {
    fn rank(&self, descriptors: &[DecisionMakerDescriptor]) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..descriptors.len()).collect();
        indices.sort_by_key(|&i| {
            let d = &descriptors[i];
            (!d.has_headline(), seniority_rank(d.seniority.as_deref()))
        });
        indices
    }
}

/// The five fixed outreach roles, in assignment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OutreachRole {
    Primary,
    Cc1,
    Cc2,
    Alt1,
    Alt2,
}

impl OutreachRole {
    pub const ALL: [OutreachRole; 5] = [
        Self::Primary,
        Self::Cc1,
        Self::Cc2,
        Self::Alt1,
        Self::Alt2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Cc1 => "cc_1",
            Self::Cc2 => "cc_2",
            Self::Alt1 => "alt_1",
            Self::Alt2 => "alt_2",
        }
    }

    /// Variable-name prefix in the vendor lead payload.
    fn variable_prefix(&self) -> &'static str {
        match self {
            Self::Primary => "primary_decision_maker",
            Self::Cc1 => "cc_decision_maker_1",
            Self::Cc2 => "cc_decision_maker_2",
            Self::Alt1 => "alt_decision_maker_1",
            Self::Alt2 => "alt_decision_maker_2",
        }
    }
}

/// A closed record of the roles filled for one company, plus the roles left
/// unassigned. Constructed only when a primary exists.
#[derive(Debug, Clone)]
pub struct RoleAssignment {
    assigned: Vec<(OutreachRole, DecisionMakerDescriptor)>,
    unassigned: Vec<OutreachRole>,
}

impl RoleAssignment {
    pub fn primary(&self) -> &DecisionMakerDescriptor {
        // Invariant: assign_roles never builds an assignment without a primary.
        &self.assigned[0].1
    }

    pub fn get(&self, role: OutreachRole) -> Option<&DecisionMakerDescriptor> {
        self.assigned
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, d)| d)
    }

    pub fn assigned(&self) -> &[(OutreachRole, DecisionMakerDescriptor)] {
        &self.assigned
    }

    pub fn unassigned(&self) -> &[OutreachRole] {
        &self.unassigned
    }

    /// Build the fixed-field variable map for the vendor lead payload.
    /// Unassigned roles are serialized as explicit empty strings — the
    /// downstream payload shape never omits a field.
    pub fn lead_variables(&self) -> BTreeMap<String, String> {
        let mut variables = BTreeMap::new();
        for role in OutreachRole::ALL {
            let prefix = role.variable_prefix();
            let descriptor = self.get(role);
            let field = |value: Option<&str>| value.unwrap_or_default().to_string();
            variables.insert(prefix.to_string(), field(descriptor.map(|d| d.email.as_str())));
            variables.insert(
                format!("{}_first_name", prefix),
                field(descriptor.map(|d| d.first_name.as_str())),
            );
            variables.insert(
                format!("{}_last_name", prefix),
                field(descriptor.map(|d| d.last_name.as_str())),
            );
            variables.insert(
                format!("{}_job_title", prefix),
                field(descriptor.and_then(|d| d.job_title.as_deref())),
            );
            variables.insert(
                format!("{}_linkedin_url", prefix),
                field(descriptor.and_then(|d| d.linkedin_url.as_deref())),
            );
        }
        variables
    }
}

/// Map a ranking onto the five roles: best index becomes `primary`, the next
/// two `cc_1`/`cc_2`, the next two `alt_1`/`alt_2`. Roles beyond the ranking
/// stay unassigned — never defaulted to a placeholder person. Out-of-range
/// and duplicate indices from a misbehaving oracle are dropped. Returns None
/// when no usable primary exists, which skips the company for this round.
pub fn assign_roles(
    descriptors: &[DecisionMakerDescriptor],
    ranking: &[usize],
) -> Option<RoleAssignment> {
    let mut seen = vec![false; descriptors.len()];
    let mut ranked = Vec::new();
    for &index in ranking {
        if index < descriptors.len() && !seen[index] {
            seen[index] = true;
            ranked.push(index);
        }
    }
    if ranked.is_empty() {
        return None;
    }

    let mut assigned = Vec::new();
    let mut unassigned = Vec::new();
    for (slot, role) in OutreachRole::ALL.into_iter().enumerate() {
        match ranked.get(slot) {
            Some(&index) => assigned.push((role, descriptors[index].clone())),
            None => unassigned.push(role),
        }
    }
    Some(RoleAssignment {
        assigned,
        unassigned,
    })
}
