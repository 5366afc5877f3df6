// src/config.rs
//
// Rule files and the tag profile.
//
// - A rule file is a TOML rendition of `Criteria`.
// - The profile lists the tags and attributes offered for matching and, per
//   tag, the names it may be renamed to. `defaults/profile.toml` is embedded;
//   a user file may override any of its keys. Profiles are only ever read.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::criteria::{Action, Criteria};
use crate::error::ConfigError;

const DEFAULT_PROFILE: &str = include_str!("../defaults/profile.toml");

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse<T: for<'de> Deserialize<'de>>(text: &str, origin: &str) -> Result<T, ConfigError> {
    toml::from_str(text).map_err(|source| ConfigError::Parse {
        origin: origin.to_string(),
        source,
    })
}

/* ================================= Rules ================================= */

pub fn parse_rule(text: &str, origin: &str) -> Result<Criteria, ConfigError> {
    parse(text, origin)
}

pub fn load_rule(path: impl AsRef<Path>) -> Result<Criteria, ConfigError> {
    let path = path.as_ref();
    parse_rule(&read(path)?, &path.display().to_string())
}

/* ================================ Profile ================================ */

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Profile {
    pub tags: Vec<String>,
    pub attributes: Vec<String>,
    #[serde(default)]
    pub change_to: BTreeMap<String, Vec<String>>,
}

/// User overrides; absent keys keep the built-in value.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfileOverrides {
    tags: Option<Vec<String>>,
    attributes: Option<Vec<String>>,
    change_to: Option<BTreeMap<String, Vec<String>>>,
}

impl Profile {
    pub fn builtin() -> Result<Self, ConfigError> {
        parse(DEFAULT_PROFILE, "built-in profile")
    }

    /// Built-in profile with the keys present in `text` replaced.
    pub fn with_overrides(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let overrides: ProfileOverrides = parse(text, origin)?;
        let mut profile = Self::builtin()?;
        if let Some(tags) = overrides.tags {
            profile.tags = tags;
        }
        if let Some(attributes) = overrides.attributes {
            profile.attributes = attributes;
        }
        if let Some(change_to) = overrides.change_to {
            profile.change_to = change_to;
        }
        Ok(profile)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        Self::with_overrides(&read(path)?, &path.display().to_string())
    }

    /// Ways `criteria` steps outside this profile.
    pub fn check(&self, criteria: &Criteria) -> Vec<ProfileViolation> {
        let mut found = Vec::new();
        let tag = criteria.tag_name.trim().to_lowercase();
        if !self.tags.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            found.push(ProfileViolation::UnknownTag(tag.clone()));
        }
        if let Some(attr) = &criteria.attribute_name {
            if !self.attributes.iter().any(|a| a.eq_ignore_ascii_case(attr)) {
                found.push(ProfileViolation::UnknownAttribute(attr.clone()));
            }
        }
        if criteria.action == Action::Modify {
            if let Some(to) = &criteria.new_tag_name {
                let allowed = self
                    .change_to
                    .get(&tag)
                    .is_some_and(|list| list.iter().any(|t| t.eq_ignore_ascii_case(to)));
                if !allowed {
                    found.push(ProfileViolation::UnlistedTarget {
                        from: tag,
                        to: to.to_lowercase(),
                    });
                }
            }
        }
        found
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProfileViolation {
    UnknownTag(String),
    UnknownAttribute(String),
    UnlistedTarget { from: String, to: String },
}

impl fmt::Display for ProfileViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileViolation::UnknownTag(t) => write!(f, "tag `{t}` is not in the profile's tag list"),
            ProfileViolation::UnknownAttribute(a) => {
                write!(f, "attribute `{a}` is not in the profile's attribute list")
            }
            ProfileViolation::UnlistedTarget { from, to } => {
                write!(f, "`{from}` is not listed as changeable to `{to}`")
            }
        }
    }
}
