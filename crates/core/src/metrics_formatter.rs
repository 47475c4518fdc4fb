#![allow(clippy::format_push_string)]

use crate::engine::RunSummary;
use crate::position::PositionBook;

/// Plain-text report of a finished run.
pub struct SummaryFormatter;

impl SummaryFormatter {
    #[must_use]
    pub fn format(summary: &RunSummary, positions: &PositionBook) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str("                      RUN SUMMARY                              \n");
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');

        output.push_str("Activity\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!("Snapshots:             {}\n", summary.snapshots_processed));
        output.push_str(&format!("Engagement Cycles:     {}\n", summary.engagement_cycles));
        output.push_str(&format!("Intents Emitted:       {}\n", summary.intents_emitted));
        output.push_str(&format!("Fills Applied:         {}\n", summary.fills_applied));
        output.push_str(&format!("Rejections:            {}\n", summary.rejections));
        output.push_str(&format!("Realized PnL:          {:.2}\n", summary.realized_pnl));
        output.push('\n');

        output.push_str("Open Positions\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        let mut open: Vec<_> = positions.all_positions().values().collect();
        if open.is_empty() {
            output.push_str("(flat)\n");
        }
        open.sort_by_key(|p| p.symbol.to_string());
        for position in open {
            output.push_str(&format!(
                "{:<24} {:>8} @ {:.2}\n",
                position.symbol.to_string(),
                position.quantity,
                position.avg_price
            ));
        }
        output.push_str("═══════════════════════════════════════════════════════════════\n");

        output
    }
}
