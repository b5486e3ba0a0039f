use std::fmt;
use std::sync::{Arc, OnceLock};

/// Operation a plan was generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanKind {
    Insert,
    Update,
    Delete,
    Get,
}

impl fmt::Display for PlanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Get => write!(f, "get"),
        }
    }
}

/// One entry of a plan's bind argument list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgField {
    /// Read the named field as is.
    Field(&'static str),
    /// Bind the record's current version plus one.
    NextVersion,
}

/// Generated SQL plus what is needed to bind it against a record.
///
/// Immutable once built; the SQL text is shared with every
/// [`BindInstance`](super::BindInstance) created from the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementPlan {
    pub(crate) kind: PlanKind,
    pub(crate) query: Arc<str>,
    pub(crate) arg_fields: Vec<ArgField>,
    pub(crate) key_fields: Vec<&'static str>,
    pub(crate) version_field: Option<&'static str>,
    pub(crate) auto_incr_idx: Option<usize>,
}

impl StatementPlan {
    pub fn kind(&self) -> PlanKind {
        self.kind
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn shared_query(&self) -> Arc<str> {
        Arc::clone(&self.query)
    }

    pub fn arg_fields(&self) -> &[ArgField] {
        &self.arg_fields
    }

    pub fn key_fields(&self) -> &[&'static str] {
        &self.key_fields
    }

    pub fn version_field(&self) -> Option<&'static str> {
        self.version_field
    }

    /// Column index of the auto-increment key, if the plan writes one back.
    pub fn auto_incr_idx(&self) -> Option<usize> {
        self.auto_incr_idx
    }
}

/// Build-once slots for the four plans of a mapping.
#[derive(Debug, Default)]
pub struct PlanCache {
    pub(crate) insert: OnceLock<StatementPlan>,
    pub(crate) update: OnceLock<StatementPlan>,
    pub(crate) delete: OnceLock<StatementPlan>,
    pub(crate) get: OnceLock<StatementPlan>,
}
