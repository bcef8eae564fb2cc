//! @ai:module:intent Task types and column/row role bookkeeping
//! @ai:module:layer domain
//! @ai:module:public_api TaskType, ColRole, RowRole, ColRoles, RowRoles
//! @ai:module:stateless true

use serde::{Deserialize, Serialize};

/// @ai:intent Kind of learning problem a task defines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Classif,
    Regr,
    Surv,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Classif => "classif",
            TaskType::Regr => "regr",
            TaskType::Surv => "surv",
        }
    }

    /// @ai:intent Parse the prefix used in learner and measure ids
    /// @ai:effects pure
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "classif" => Some(TaskType::Classif),
            "regr" => Some(TaskType::Regr),
            "surv" => Some(TaskType::Surv),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// @ai:intent Role a column plays inside a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColRole {
    Feature,
    Target,
    Name,
    Group,
    Stratum,
    Weight,
    Order,
}

impl ColRole {
    pub const ALL: [ColRole; 7] = [
        ColRole::Feature,
        ColRole::Target,
        ColRole::Name,
        ColRole::Group,
        ColRole::Stratum,
        ColRole::Weight,
        ColRole::Order,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColRole::Feature => "feature",
            ColRole::Target => "target",
            ColRole::Name => "name",
            ColRole::Group => "group",
            ColRole::Stratum => "stratum",
            ColRole::Weight => "weight",
            ColRole::Order => "order",
        }
    }
}

/// @ai:intent Role a row plays inside a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowRole {
    Use,
    Validation,
}

/// @ai:intent Column names per role, each list in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColRoles {
    pub feature: Vec<String>,
    pub target: Vec<String>,
    pub name: Vec<String>,
    pub group: Vec<String>,
    pub stratum: Vec<String>,
    pub weight: Vec<String>,
    pub order: Vec<String>,
}

impl ColRoles {
    pub fn get(&self, role: ColRole) -> &[String] {
        match role {
            ColRole::Feature => &self.feature,
            ColRole::Target => &self.target,
            ColRole::Name => &self.name,
            ColRole::Group => &self.group,
            ColRole::Stratum => &self.stratum,
            ColRole::Weight => &self.weight,
            ColRole::Order => &self.order,
        }
    }

    pub fn get_mut(&mut self, role: ColRole) -> &mut Vec<String> {
        match role {
            ColRole::Feature => &mut self.feature,
            ColRole::Target => &mut self.target,
            ColRole::Name => &mut self.name,
            ColRole::Group => &mut self.group,
            ColRole::Stratum => &mut self.stratum,
            ColRole::Weight => &mut self.weight,
            ColRole::Order => &mut self.order,
        }
    }

    /// @ai:intent Remove a column from every role
    /// @ai:effects state:write
    pub fn remove(&mut self, col: &str) {
        for role in ColRole::ALL {
            self.get_mut(role).retain(|c| c != col);
        }
    }

    /// @ai:intent Roles currently held by a column
    /// @ai:effects pure
    pub fn roles_of(&self, col: &str) -> Vec<ColRole> {
        ColRole::ALL
            .into_iter()
            .filter(|role| self.get(*role).iter().any(|c| c == col))
            .collect()
    }
}

/// @ai:intent Row ids per role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRoles {
    #[serde(rename = "use")]
    pub use_rows: Vec<usize>,
    pub validation: Vec<usize>,
}
