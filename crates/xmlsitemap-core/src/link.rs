//! Link records and the query shapes used to address them in bulk.
//!
//! A [`LinkRecord`] is one indexable URL plus its sitemap metadata. Records are
//! keyed by `(type, id, language)`; [`LinkConditions`] selects a set of records
//! and [`LinkUpdate`] patches them without loading each row.

use serde::{Deserialize, Serialize};

/// Language value meaning "not specified".
pub const LANGUAGE_NONE: &str = "und";

/// Priority assumed by crawlers when none is given.
pub const PRIORITY_DEFAULT: f32 = 0.5;

/// One indexable URL and its sitemap metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkRecord {
    /// Source entity kind (`node`, `user`, `menu_link`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Bundle of the source entity, used for settings lookups.
    pub subtype: String,
    /// Source entity identifier, unique within `kind`.
    pub id: String,
    /// Internal path starting with `/`, or empty when the item is unroutable.
    pub loc: String,
    /// Whether an anonymous visitor may view the target.
    pub access: bool,
    /// Whether the link is administratively included.
    pub status: bool,
    /// `status` was set for this item rather than inherited from its bundle.
    pub status_override: bool,
    /// Relative priority in `0.0..=1.0`.
    pub priority: f32,
    /// `priority` was set for this item rather than inherited from its bundle.
    pub priority_override: bool,
    /// Estimated seconds between modifications, 0 when unknown.
    pub changefreq: i64,
    /// Number of observed modifications.
    pub changecount: i64,
    /// Unix timestamp of the last modification, 0 when unknown.
    pub lastmod: i64,
    /// Language code or [`LANGUAGE_NONE`].
    pub language: String,
}

impl Default for LinkRecord {
    fn default() -> Self {
        Self {
            kind: String::new(),
            subtype: String::new(),
            id: String::new(),
            loc: String::new(),
            access: true,
            status: true,
            status_override: false,
            priority: PRIORITY_DEFAULT,
            priority_override: false,
            changefreq: 0,
            changecount: 0,
            lastmod: 0,
            language: LANGUAGE_NONE.to_string(),
        }
    }
}

impl LinkRecord {
    /// Create a link with default metadata.
    pub fn new(kind: impl Into<String>, id: impl Into<String>, loc: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            loc: loc.into(),
            ..Self::default()
        }
    }

    /// Set the language of the link.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the priority of the link.
    #[must_use]
    pub const fn with_priority(mut self, priority: f32) -> Self {
        self.priority = priority;
        self
    }

    /// A link is visible when it is both accessible and included.
    pub const fn is_visible(&self) -> bool {
        self.access && self.status
    }

    /// Whether the generator may emit this link.
    pub fn is_emittable(&self) -> bool {
        self.is_visible() && !self.loc.is_empty()
    }

    /// Key of the link in the store.
    pub fn key(&self) -> LinkKey {
        LinkKey {
            kind: self.kind.clone(),
            id: self.id.clone(),
            language: self.language.clone(),
        }
    }
}

/// Unique identity of a link record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkKey {
    /// Link type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Source identifier.
    pub id: String,
    /// Language code.
    pub language: String,
}

impl LinkKey {
    /// Build a key from its parts.
    pub fn new(kind: &str, id: &str, language: &str) -> Self {
        Self {
            kind: kind.to_string(),
            id: id.to_string(),
            language: language.to_string(),
        }
    }
}

/// Field constraints selecting a set of link records. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkConditions {
    /// Required link type.
    pub kind: Option<String>,
    /// Required bundle.
    pub subtype: Option<String>,
    /// Required identifier.
    pub id: Option<String>,
    /// Required language.
    pub language: Option<String>,
    /// Required internal path.
    pub loc: Option<String>,
    /// Required access value.
    pub access: Option<bool>,
    /// Required status value.
    pub status: Option<bool>,
    /// Required status override flag.
    pub status_override: Option<bool>,
    /// Required priority override flag.
    pub priority_override: Option<bool>,
}

impl LinkConditions {
    /// Conditions matching every link.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a link type.
    #[must_use]
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Restrict to a bundle.
    #[must_use]
    pub fn subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    /// Restrict to an identifier.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Restrict to a language.
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Restrict to an internal path.
    #[must_use]
    pub fn loc(mut self, loc: impl Into<String>) -> Self {
        self.loc = Some(loc.into());
        self
    }

    /// Restrict on the access flag.
    #[must_use]
    pub const fn access(mut self, access: bool) -> Self {
        self.access = Some(access);
        self
    }

    /// Restrict on the status flag.
    #[must_use]
    pub const fn status(mut self, status: bool) -> Self {
        self.status = Some(status);
        self
    }

    /// Restrict on the status override flag.
    #[must_use]
    pub const fn status_override(mut self, value: bool) -> Self {
        self.status_override = Some(value);
        self
    }

    /// Restrict on the priority override flag.
    #[must_use]
    pub const fn priority_override(mut self, value: bool) -> Self {
        self.priority_override = Some(value);
        self
    }

    /// Whether a record satisfies every set constraint.
    pub fn matches(&self, link: &LinkRecord) -> bool {
        fn eq<T: PartialEq + ?Sized>(want: Option<&T>, have: &T) -> bool {
            want.is_none_or(|w| w == have)
        }

        eq(self.kind.as_deref(), link.kind.as_str())
            && eq(self.subtype.as_deref(), link.subtype.as_str())
            && eq(self.id.as_deref(), link.id.as_str())
            && eq(self.language.as_deref(), link.language.as_str())
            && eq(self.loc.as_deref(), link.loc.as_str())
            && eq(self.access.as_ref(), &link.access)
            && eq(self.status.as_ref(), &link.status)
            && eq(self.status_override.as_ref(), &link.status_override)
            && eq(self.priority_override.as_ref(), &link.priority_override)
    }
}

/// Partial update applied to every record matching a set of conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkUpdate {
    /// New bundle.
    pub subtype: Option<String>,
    /// New internal path.
    pub loc: Option<String>,
    /// New access flag.
    pub access: Option<bool>,
    /// New status flag.
    pub status: Option<bool>,
    /// New status override flag.
    pub status_override: Option<bool>,
    /// New priority.
    pub priority: Option<f32>,
    /// New priority override flag.
    pub priority_override: Option<bool>,
    /// New changefreq estimate.
    pub changefreq: Option<i64>,
    /// New change count.
    pub changecount: Option<i64>,
    /// New modification timestamp.
    pub lastmod: Option<i64>,
}

impl LinkUpdate {
    /// An update that changes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the status flag.
    #[must_use]
    pub const fn status(mut self, status: bool) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the access flag.
    #[must_use]
    pub const fn access(mut self, access: bool) -> Self {
        self.access = Some(access);
        self
    }

    /// Set the priority.
    #[must_use]
    pub const fn priority(mut self, priority: f32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the internal path.
    #[must_use]
    pub fn loc(mut self, loc: impl Into<String>) -> Self {
        self.loc = Some(loc.into());
        self
    }

    /// Whether applying the update would be a no-op for every record.
    pub const fn is_empty(&self) -> bool {
        self.subtype.is_none()
            && self.loc.is_none()
            && self.access.is_none()
            && self.status.is_none()
            && self.status_override.is_none()
            && self.priority.is_none()
            && self.priority_override.is_none()
            && self.changefreq.is_none()
            && self.changecount.is_none()
            && self.lastmod.is_none()
    }

    /// Apply the set fields to a record.
    pub fn apply(&self, link: &mut LinkRecord) {
        if let Some(subtype) = &self.subtype {
            link.subtype.clone_from(subtype);
        }
        if let Some(loc) = &self.loc {
            link.loc.clone_from(loc);
        }
        if let Some(access) = self.access {
            link.access = access;
        }
        if let Some(status) = self.status {
            link.status = status;
        }
        if let Some(value) = self.status_override {
            link.status_override = value;
        }
        if let Some(priority) = self.priority {
            link.priority = priority;
        }
        if let Some(value) = self.priority_override {
            link.priority_override = value;
        }
        if let Some(changefreq) = self.changefreq {
            link.changefreq = changefreq;
        }
        if let Some(changecount) = self.changecount {
            link.changecount = changecount;
        }
        if let Some(lastmod) = self.lastmod {
            link.lastmod = lastmod;
        }
    }
}

/// Which visible links belong to one sitemap document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSelection {
    /// Allowed languages; `None` selects every language.
    pub languages: Option<Vec<String>>,
}

impl LinkSelection {
    /// Select links of every language.
    pub const fn all() -> Self {
        Self { languages: None }
    }

    /// Select only links in the given languages.
    pub fn languages<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            languages: Some(languages.into_iter().map(Into::into).collect()),
        }
    }

    /// Whether an emittable link belongs to this selection.
    pub fn matches(&self, link: &LinkRecord) -> bool {
        link.is_emittable()
            && self
                .languages
                .as_ref()
                .is_none_or(|langs| langs.iter().any(|l| *l == link.language))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_visible_with_default_priority() {
        let link = LinkRecord::new("node", "1", "/node/1");
        assert!(link.is_visible());
        assert!(link.is_emittable());
        assert!((link.priority - PRIORITY_DEFAULT).abs() < f32::EPSILON);
        assert_eq!(link.language, LANGUAGE_NONE);
    }

    #[test]
    fn test_empty_loc_is_never_emittable() {
        let link = LinkRecord::new("node", "1", "");
        assert!(link.is_visible());
        assert!(!link.is_emittable());
    }

    #[test]
    fn test_conditions_match_only_set_fields() {
        let link = LinkRecord::new("node", "1", "/node/1").with_language("en");

        assert!(LinkConditions::new().matches(&link));
        assert!(LinkConditions::new().kind("node").id("1").matches(&link));
        assert!(!LinkConditions::new().kind("user").matches(&link));
        assert!(!LinkConditions::new().language("fr").matches(&link));
        assert!(LinkConditions::new().status(true).access(true).matches(&link));
        assert!(!LinkConditions::new().status_override(true).matches(&link));
    }

    #[test]
    fn test_update_applies_only_set_fields() {
        let mut link = LinkRecord::new("node", "1", "/node/1");
        LinkUpdate::new().status(false).priority(0.9).apply(&mut link);

        assert!(!link.status);
        assert!(link.access);
        assert!((link.priority - 0.9).abs() < f32::EPSILON);
        assert_eq!(link.loc, "/node/1");
        assert!(LinkUpdate::new().is_empty());
    }

    #[test]
    fn test_selection_filters_language_and_visibility() {
        let en = LinkRecord::new("node", "1", "/a").with_language("en");
        let und = LinkRecord::new("node", "2", "/b");
        let mut hidden = LinkRecord::new("node", "3", "/c").with_language("en");
        hidden.access = false;

        let selection = LinkSelection::languages(["en", LANGUAGE_NONE]);
        assert!(selection.matches(&en));
        assert!(selection.matches(&und));
        assert!(!selection.matches(&hidden));
        assert!(!LinkSelection::languages(["fr"]).matches(&en));
        assert!(LinkSelection::all().matches(&und));
    }

    #[test]
    fn test_serializes_kind_as_type() {
        let link = LinkRecord::new("node", "9", "/node/9");
        let json = serde_json::to_value(&link).unwrap();
        assert_eq!(json["type"], "node");
        let back: LinkRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, link);
    }
}
