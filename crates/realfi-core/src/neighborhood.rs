use crate::error::{RealfiError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One investment partition (a "dong") and the district ("gu") it sits in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighborhood {
    pub name: String,
    pub gu: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    /// Workspace project currently running in this neighborhood.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

impl Neighborhood {
    pub fn new(name: impl Into<String>, gu: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            gu: gu.into(),
            lat: None,
            lon: None,
            project: None,
        }
    }
}

/// Neighborhoods with live projects, deployed by `deploy` and `dong seed`.
pub fn live_neighborhoods() -> Vec<Neighborhood> {
    vec![
        Neighborhood {
            name: "오금동".into(),
            gu: "송파구".into(),
            lat: Some(37.504004),
            lon: Some(127.135110),
            project: Some("오금동 다세대주택".into()),
        },
        Neighborhood {
            name: "구의동".into(),
            gu: "광진구".into(),
            lat: None,
            lon: None,
            project: Some("구의동 타운하우스".into()),
        },
        Neighborhood {
            name: "청파동2가".into(),
            gu: "용산구".into(),
            lat: None,
            lon: None,
            project: Some("청파동 협소주택".into()),
        },
        Neighborhood {
            name: "묵정동".into(),
            gu: "중구".into(),
            lat: None,
            lon: None,
            project: Some("묵정동 도시형생활주택".into()),
        },
    ]
}

pub fn find_by_name<'a>(all: &'a [Neighborhood], name: &str) -> Option<&'a Neighborhood> {
    all.iter().find(|n| n.name == name)
}

pub fn filter_by_gu<'a>(all: &'a [Neighborhood], gu: &str) -> Vec<&'a Neighborhood> {
    all.iter().filter(|n| n.gu == gu).collect()
}

/// Reject an input list that would key two vaults under one name.
pub fn ensure_unique(all: &[Neighborhood]) -> Result<()> {
    let mut seen = HashSet::new();
    for n in all {
        if !seen.insert(n.name.as_str()) {
            return Err(RealfiError::DuplicateNeighborhood(n.name.clone()));
        }
    }
    Ok(())
}
