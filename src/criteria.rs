// src/criteria.rs
//
// What to match and what to do with it.
//
// `Criteria` is the plain, serializable rule a caller fills in (from CLI flags
// or a TOML rule file). `Criteria::compile` turns it into a `Rule`: tag name
// lower-cased, attribute name run through the attribute case rule, regex
// compiled once, replacement attribute string parsed once.

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CriteriaError;
use crate::tag::{normalize_attr_name, Attributes, Tag, TagKind};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Attribute value must equal the match value exactly
    #[default]
    Literal,
    /// Match value is a regex that must match at the start of the attribute value
    Regex,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Remove the matched element together with everything inside it
    Delete,
    /// Remove the matched tags but keep their content
    Unwrap,
    /// Rename the matched tag and/or replace its attributes
    Modify,
}

/// A transform rule. Immutable for the duration of a run.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Criteria {
    #[serde(rename = "tag")]
    pub tag_name: String,
    /// `None` means the tag must carry no attributes at all.
    #[serde(rename = "attribute", default)]
    pub attribute_name: Option<String>,
    #[serde(rename = "value", default)]
    pub match_value: Option<String>,
    #[serde(rename = "mode", default)]
    pub match_mode: MatchMode,
    pub action: Action,
    /// `None` keeps the original tag name.
    #[serde(rename = "new_tag", default)]
    pub new_tag_name: Option<String>,
    #[serde(rename = "new_attributes", default)]
    pub new_attribute_string: String,
    #[serde(rename = "copy_attributes", default)]
    pub copy_existing_attributes: bool,
}

impl Criteria {
    pub fn new(tag_name: impl Into<String>, action: Action) -> Self {
        Self {
            tag_name: tag_name.into(),
            attribute_name: None,
            match_value: None,
            match_mode: MatchMode::Literal,
            action,
            new_tag_name: None,
            new_attribute_string: String::new(),
            copy_existing_attributes: false,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attribute_name = Some(name.into());
        self.match_value = Some(value.into());
        self
    }

    pub fn regex(mut self) -> Self {
        self.match_mode = MatchMode::Regex;
        self
    }

    pub fn rename_to(mut self, new_tag_name: impl Into<String>) -> Self {
        self.new_tag_name = Some(new_tag_name.into());
        self
    }

    pub fn with_new_attributes(mut self, attrs: impl Into<String>) -> Self {
        self.new_attribute_string = attrs.into();
        self
    }

    pub fn copy_attributes(mut self) -> Self {
        self.copy_existing_attributes = true;
        self
    }

    /// Checks a caller runs before processing anything.
    pub fn validate(&self) -> Result<(), CriteriaError> {
        if self.tag_name.trim().is_empty() {
            return Err(CriteriaError::EmptyTag);
        }
        if let Some(attr) = &self.attribute_name {
            if self.match_value.as_deref().map_or(true, str::is_empty) {
                return Err(CriteriaError::MissingMatchValue(attr.clone()));
            }
        }
        if self.action == Action::Modify
            && self.new_tag_name.is_none()
            && self.copy_existing_attributes
        {
            return Err(CriteriaError::NoOpModify);
        }
        self.compile().map(|_| ())
    }

    /// Prepare the rule for matching. Only an uncompilable regex fails here.
    pub fn compile(&self) -> Result<Rule, CriteriaError> {
        let matcher = match (&self.match_value, self.match_mode) {
            (None, _) => ValueMatcher::Present,
            (Some(v), MatchMode::Literal) => ValueMatcher::Literal(v.clone()),
            (Some(v), MatchMode::Regex) => {
                let re = Regex::new(&format!("^(?:{v})")).map_err(|source| {
                    CriteriaError::InvalidPattern {
                        pattern: v.clone(),
                        source,
                    }
                })?;
                ValueMatcher::Regex(re)
            }
        };

        Ok(Rule {
            tag: self.tag_name.trim().to_lowercase(),
            attribute: self.attribute_name.as_deref().map(normalize_attr_name),
            matcher,
            new_tag: self
                .new_tag_name
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_lowercase),
            replacement: Attributes::parse(&self.new_attribute_string),
            criteria: self.clone(),
        })
    }
}

#[derive(Clone, Debug)]
enum ValueMatcher {
    /// Rule named an attribute but no value: presence is enough.
    Present,
    Literal(String),
    Regex(Regex),
}

impl ValueMatcher {
    fn is_match(&self, value: &str) -> bool {
        match self {
            ValueMatcher::Present => true,
            ValueMatcher::Literal(s) => s == value,
            ValueMatcher::Regex(re) => re.is_match(value),
        }
    }
}

/// A compiled `Criteria`.
#[derive(Clone, Debug)]
pub struct Rule {
    tag: String,
    attribute: Option<String>,
    matcher: ValueMatcher,
    new_tag: Option<String>,
    replacement: Attributes,
    criteria: Criteria,
}

impl Rule {
    pub fn action(&self) -> Action {
        self.criteria.action
    }

    /// Does this open or self-closing tag match? Close tags never do.
    pub fn matches(&self, tag: &Tag<'_>) -> bool {
        if tag.kind == TagKind::Close || tag.name != self.tag {
            return false;
        }
        match &self.attribute {
            Some(attr) => tag
                .attributes
                .get(attr)
                .is_some_and(|v| self.matcher.is_match(v)),
            None => tag.attributes.is_empty(),
        }
    }

    /// Name a matched tag is rewritten to under `Modify`.
    pub fn renamed<'t>(&'t self, original: &'t str) -> &'t str {
        self.new_tag.as_deref().unwrap_or(original)
    }

    /// Attributes a matched tag carries after `Modify`.
    pub fn rewritten_attributes(&self, original: &Attributes) -> Attributes {
        if self.criteria.copy_existing_attributes {
            original.clone()
        } else {
            self.replacement.clone()
        }
    }
}
