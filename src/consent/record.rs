use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Optional cookie categories a visitor can grant or refuse.
///
/// `necessary` cookies are not a category here: they are always allowed
/// and never go through the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Functional,
    Analytical,
    Marketing,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::Functional,
        Category::Analytical,
        Category::Marketing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Functional => "functional",
            Category::Analytical => "analytical",
            Category::Marketing => "marketing",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown cookie category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "functional" => Ok(Category::Functional),
            "analytical" | "analytics" => Ok(Category::Analytical),
            "marketing" => Ok(Category::Marketing),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

/// A visitor's cookie preferences as persisted in the `cookiePreferences` slot.
///
/// `necessary` is private and every constructor sets it, so a record built in
/// this crate can never carry `necessary = false`. Records read back from
/// storage are checked with [`ConsentRecord::is_well_formed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    necessary: bool,
    pub functional: bool,
    pub analytical: bool,
    pub marketing: bool,
    /// Epoch milliseconds of the last modification.
    pub timestamp: i64,
}

impl ConsentRecord {
    pub fn new(functional: bool, analytical: bool, marketing: bool) -> Self {
        Self {
            necessary: true,
            functional,
            analytical,
            marketing,
            timestamp: now_millis(),
        }
    }

    pub fn accept_all() -> Self {
        Self::new(true, true, true)
    }

    pub fn reject_all() -> Self {
        Self::new(false, false, false)
    }

    pub fn necessary(&self) -> bool {
        self.necessary
    }

    pub fn allows(&self, category: Category) -> bool {
        match category {
            Category::Functional => self.functional,
            Category::Analytical => self.analytical,
            Category::Marketing => self.marketing,
        }
    }

    pub fn allowed_categories(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|category| self.allows(*category))
            .collect()
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        self.necessary
    }
}

impl Default for ConsentRecord {
    fn default() -> Self {
        Self::reject_all()
    }
}

/// Per-category toggles chosen in the banner or the detail modal.
/// `None` keeps whatever the controller currently holds for that category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsentSelection {
    pub functional: Option<bool>,
    pub analytical: Option<bool>,
    pub marketing: Option<bool>,
}

impl ConsentSelection {
    pub fn new(functional: bool, analytical: bool, marketing: bool) -> Self {
        Self {
            functional: Some(functional),
            analytical: Some(analytical),
            marketing: Some(marketing),
        }
    }

    /// Selection granting exactly the listed categories and refusing the rest.
    pub fn only(categories: &[Category]) -> Self {
        Self::new(
            categories.contains(&Category::Functional),
            categories.contains(&Category::Analytical),
            categories.contains(&Category::Marketing),
        )
    }

    pub fn apply_to(&self, base: &ConsentRecord) -> ConsentRecord {
        ConsentRecord::new(
            self.functional.unwrap_or(base.functional),
            self.analytical.unwrap_or(base.analytical),
            self.marketing.unwrap_or(base.marketing),
        )
    }
}

/// Derived view over the store, never persisted itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentStatus {
    pub has_consented: bool,
    pub record: Option<ConsentRecord>,
    pub timestamp: Option<i64>,
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
