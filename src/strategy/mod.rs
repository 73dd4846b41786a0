pub mod engine;
pub mod plan;
pub mod price_view;
pub mod profit;
pub mod reporter;

pub use engine::{ArbitrageEngine, EngineConfig, EngineError, EngineState};
pub use plan::{ArbitragePlan, Leg};
pub use price_view::PriceView;
pub use profit::{calculate_profit, ProfitBreakdown};
pub use reporter::{PlanSink, TableReporter};
