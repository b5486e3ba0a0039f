pub mod bind;
pub mod plan;
pub mod planner;

pub use bind::BindInstance;
pub use plan::{ArgField, PlanCache, PlanKind, StatementPlan};
pub use planner::{StatementPlanner, plan_delete, plan_get, plan_insert, plan_update};
