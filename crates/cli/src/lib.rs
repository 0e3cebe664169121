//! Replays a sale form snapshot through the calculator and reports the result.
//!
//! Input is a JSON form snapshot, optionally with a list of form events to
//! apply and the payments recorded against the sale.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use salesdesk_sales::reconcile::{self, Discrepancy};
use salesdesk_sales::{
    FormConfig, FormEvent, FormSnapshot, LineItemCalculator, Payment, RecordingView, SaleTotals,
    SummaryText, Totals,
};

/// A snapshot plus what to do with it.
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    #[serde(flatten)]
    pub snapshot: FormSnapshot,
    #[serde(default)]
    pub events: Vec<FormEvent>,
    #[serde(default)]
    pub payments: Vec<Payment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub totals: Totals,
    pub summary: SummaryText,
    pub submission: Vec<(String, String)>,
    /// Server-side totals, when the posted rows are acceptable.
    pub server: Option<SaleTotals>,
    /// Why the server would reject the post, otherwise.
    pub server_error: Option<String>,
    pub discrepancies: Vec<Discrepancy>,
}

/// Parse a script from JSON text.
pub fn parse_script(input: &str) -> Result<Script> {
    serde_json::from_str(input).context("failed to parse form snapshot JSON")
}

/// Run the script: initialize, apply events, encode the post, recompute server-side.
pub fn run(config: FormConfig, script: Script) -> Result<Report> {
    let Script {
        snapshot,
        events,
        payments,
    } = script;

    let mut calc = LineItemCalculator::init(config.clone(), snapshot, RecordingView::new())
        .context("sale form failed to initialize")?;

    for (n, event) in events.into_iter().enumerate() {
        calc.dispatch(event)
            .with_context(|| format!("event #{n} could not be applied"))?;
    }

    let submission = calc.submission();
    let posted = salesdesk_sales::formset::decode(&config, submission.iter())
        .context("encoded submission did not decode")?;

    let (server, server_error) = match SaleTotals::from_snapshot(&posted, Decimal::ZERO) {
        Ok(mut totals) => {
            totals.apply_payments(&payments);
            match totals.validate() {
                Ok(()) => (Some(totals), None),
                Err(e) => (Some(totals), Some(e.to_string())),
            }
        }
        Err(e) => (None, Some(e.to_string())),
    };

    let totals = calc.totals().clone();
    let discrepancies = server
        .as_ref()
        .map(|s| reconcile::reconcile(&totals, s))
        .unwrap_or_default();

    info!(
        rows = calc.rows().len(),
        grand_total = totals.grand_total,
        discrepancies = discrepancies.len(),
        "form replayed"
    );

    Ok(Report {
        summary: totals.summary(),
        totals,
        submission: submission.into_pairs(),
        server,
        server_error,
        discrepancies,
    })
}
