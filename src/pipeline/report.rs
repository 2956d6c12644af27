//! Current valuation summary per security

use chrono::NaiveDate;
use serde::Serialize;

use crate::band::{BandSet, Metric, Observation};
use crate::config::SecurityConfig;

/// A band's value on its latest date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandReading {
    pub name: String,
    pub multiple: f64,
    pub value: f64,
}

/// Where the latest close sits among the bands
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "position", rename_all = "snake_case")]
pub enum BandPosition {
    Below { band: String },
    Between { lower: String, upper: String },
    Above { band: String },
}

impl BandPosition {
    /// Locate `close` among readings sorted ascending by value
    pub fn locate(close: f64, readings: &[BandReading]) -> Option<Self> {
        let (first, last) = (readings.first()?, readings.last()?);
        if close < first.value {
            return Some(BandPosition::Below {
                band: first.name.clone(),
            });
        }
        if close >= last.value {
            return Some(BandPosition::Above {
                band: last.name.clone(),
            });
        }
        readings
            .windows(2)
            .find(|w| w[0].value <= close && close < w[1].value)
            .map(|w| BandPosition::Between {
                lower: w[0].name.clone(),
                upper: w[1].name.clone(),
            })
    }

    fn describe(&self) -> String {
        match self {
            BandPosition::Below { band } => format!("below {}", band),
            BandPosition::Between { lower, upper } => format!("between {} and {}", lower, upper),
            BandPosition::Above { band } => format!("above {}", band),
        }
    }
}

/// One metric's side of the summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub metric: Metric,
    /// Close over the latest reported fundamental
    pub current: Option<f64>,
    /// Sorted ascending by value
    pub bands: Vec<BandReading>,
    pub position: Option<BandPosition>,
}

impl MetricSummary {
    fn new(metric: Metric, close: f64, base: Option<f64>, set: &BandSet) -> Self {
        let mut bands: Vec<BandReading> = set
            .bands
            .iter()
            .filter_map(|b| {
                b.latest().map(|p| BandReading {
                    name: b.name.clone(),
                    multiple: b.multiple,
                    value: p.value,
                })
            })
            .collect();
        bands.sort_by(|a, b| a.value.total_cmp(&b.value));

        Self {
            metric,
            current: base.map(|b| close / b),
            position: BandPosition::locate(close, &bands),
            bands,
        }
    }
}

/// Latest close, current multiples and band readings for one security
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationSummary {
    pub ticker: String,
    pub name: String,
    pub date: NaiveDate,
    pub close: f64,
    pub per: MetricSummary,
    pub pbr: MetricSummary,
}

fn latest_reported(
    observations: &[Observation],
    field: impl Fn(&Observation) -> f64,
) -> Option<f64> {
    observations
        .iter()
        .rev()
        .map(field)
        .find(|v| v.is_finite() && *v != 0.0)
}

impl ValuationSummary {
    /// `None` when there are no observations
    pub fn from_band_sets(
        security: &SecurityConfig,
        observations: &[Observation],
        per: &BandSet,
        pbr: &BandSet,
    ) -> Option<Self> {
        let latest = observations.last()?;
        let eps = latest_reported(observations, |o| o.eps);
        let bps = latest_reported(observations, |o| o.bps);

        Some(Self {
            ticker: security.ticker.clone(),
            name: security.name.clone(),
            date: latest.date,
            close: latest.close,
            per: MetricSummary::new(Metric::Per, latest.close, eps, per),
            pbr: MetricSummary::new(Metric::Pbr, latest.close, bps, pbr),
        })
    }

    /// Format as table for CLI output
    pub fn format_table(&self) -> String {
        let mut out = format!(
            r#"
══════════════════════════════════════════════════════
  {} ({})  {}
══════════════════════════════════════════════════════
Close:            {}
"#,
            self.name,
            self.ticker,
            self.date,
            group_thousands(self.close),
        );

        for summary in [&self.per, &self.pbr] {
            let current = summary
                .current
                .map(|c| format!("{:.2}x", c))
                .unwrap_or_else(|| "n/a".to_string());
            let position = summary
                .position
                .as_ref()
                .map(BandPosition::describe)
                .unwrap_or_default();

            out.push_str("───────────────────────────────────────────────────────\n");
            out.push_str(&format!(
                "{:<18}{:<10}{}\n",
                format!("{}:", summary.metric),
                current,
                position
            ));
            for band in summary.bands.iter().rev() {
                out.push_str(&format!(
                    "  {:<16}{:>12}  ({:.2}x)\n",
                    band.name,
                    group_thousands(band.value),
                    band.multiple
                ));
            }
        }
        out.push_str("══════════════════════════════════════════════════════\n");
        out
    }
}

/// Round to a whole number and group digits by thousands
pub fn group_thousands(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}
