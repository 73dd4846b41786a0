use crate::strategy::plan::ArbitragePlan;
use log::info;
use std::io::Write;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Receives every plan the engine evaluates, profitable or not
pub trait PlanSink: Send + Sync {
    fn report(&self, plan: ArbitragePlan);
}

/// Forward plans to another task. Plans sent after the receiver is gone are discarded.
impl PlanSink for mpsc::UnboundedSender<ArbitragePlan> {
    fn report(&self, plan: ArbitragePlan) {
        let _ = self.send(plan);
    }
}

/// Renders plans as rows of the fixed-width arbitrage table
pub struct TableReporter<W: Write + Send> {
    out: Mutex<W>,
}

impl TableReporter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> TableReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Print the table header and divider
    pub fn write_header(&self) -> std::io::Result<()> {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(out, "{}", ArbitragePlan::header())?;
        writeln!(out, "{}", ArbitragePlan::divider())
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write + Send> PlanSink for TableReporter<W> {
    fn report(&self, plan: ArbitragePlan) {
        if plan.is_profitable() {
            info!(
                "{}: buy {} @ {} / sell {} @ {} -> profit {}",
                plan.pair,
                plan.buy_exchange,
                plan.buy_price,
                plan.sell_exchange,
                plan.sell_price,
                plan.profit
            );
        }

        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = writeln!(out, "{}", plan) {
            log::warn!("failed to write arbitrage plan: {}", e);
        }
    }
}
