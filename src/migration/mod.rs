// ABOUTME: Migration planning and execution for the OLD account
// ABOUTME: Decides available actions, applies fee arithmetic and runs transactions

pub mod execute;
pub mod fees;
pub mod plan;

pub use execute::{ActionExecutor, ActionReport, ActionResult, SUPPORT_MESSAGE};
pub use fees::{deduct_fee, ensure_fee_covered};
pub use plan::{Holdings, MigrationAction};
