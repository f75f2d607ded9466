//! Airport grouping over the aerodrome record stream.
//!
//! The AD category is a flat list where each airport starts with an anchor
//! row (non-empty `airporticao`) followed by its chart rows, which carry no
//! code of their own. Order is therefore the only link between a chart and
//! its airport.
//!
//! [`AirportIndex`] owns the records and keeps one span of indices per
//! group, so nothing is copied while building it.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use serde::Serialize;

use crate::record::{AdRecord, CategoryRecord};

/// Separator between a chart's number and its title, as in `ZBAA-2F:APDC`.
const CHART_SEPARATOR: char = ':';

/// Prefix of the AD text sections that are listed among the charts.
const TEXT_SECTION_PREFIX: &str = "AD ";

const DEPARTURE_MARKER: &str = "SID";
const ARRIVAL_MARKER: &str = "STAR";
const APPROACH_MARKERS: [&str; 7] = ["ILS", "RNAV", "RNP", "VOR", "DME", "NDB", "IAC"];

/// Kind of an aerodrome chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    /// Aerodrome, parking, ground movement and any other chart.
    AirportDiagram,
    /// Standard instrument departure.
    Departure,
    /// Standard arrival.
    Arrival,
    /// Instrument approach.
    Approach,
}

impl ChartKind {
    /// Every kind, in listing order.
    pub const ALL: [Self; 4] = [
        Self::AirportDiagram,
        Self::Departure,
        Self::Arrival,
        Self::Approach,
    ];

    /// Classify a chart by its name.
    ///
    /// Names without the `:` separator are always airport diagrams.
    /// Otherwise the first matching rule wins: `SID`, then `STAR`, then any
    /// approach keyword, compared case-insensitively.
    #[must_use]
    pub fn classify(name: &str) -> Self {
        if !name.contains(CHART_SEPARATOR) {
            return Self::AirportDiagram;
        }

        let upper = name.to_uppercase();
        if upper.contains(DEPARTURE_MARKER) {
            Self::Departure
        } else if upper.contains(ARRIVAL_MARKER) {
            Self::Arrival
        } else if APPROACH_MARKERS.iter().any(|marker| upper.contains(marker)) {
            Self::Approach
        } else {
            Self::AirportDiagram
        }
    }

    /// Section heading for listings.
    #[must_use]
    pub const fn heading(self) -> &'static str {
        match self {
            Self::AirportDiagram => "Airport",
            Self::Departure => "Departure",
            Self::Arrival => "Arrival",
            Self::Approach => "Approach",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.heading())
    }
}

/// One airport in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AirportSummary {
    /// Upper-cased ICAO code.
    pub icao: String,
    /// Localized name taken from the anchor row.
    pub name: String,
    /// True if any row of the airport is flagged as modified.
    pub modified: bool,
}

/// The charts of one airport, split by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategorizedCharts {
    /// The anchor row describing the airport.
    pub info: Option<AdRecord>,
    /// Airport diagrams.
    pub airport: Vec<AdRecord>,
    /// Departure charts.
    pub departure: Vec<AdRecord>,
    /// Arrival charts.
    pub arrival: Vec<AdRecord>,
    /// Approach charts.
    pub approach: Vec<AdRecord>,
}

impl CategorizedCharts {
    /// Charts of one kind.
    #[must_use]
    pub fn of_kind(&self, kind: ChartKind) -> &[AdRecord] {
        match kind {
            ChartKind::AirportDiagram => &self.airport,
            ChartKind::Departure => &self.departure,
            ChartKind::Arrival => &self.arrival,
            ChartKind::Approach => &self.approach,
        }
    }

    /// Number of classified charts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.airport.len() + self.departure.len() + self.arrival.len() + self.approach.len()
    }

    /// Whether no chart was classified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, kind: ChartKind, record: AdRecord) {
        match kind {
            ChartKind::AirportDiagram => self.airport.push(record),
            ChartKind::Departure => self.departure.push(record),
            ChartKind::Arrival => self.arrival.push(record),
            ChartKind::Approach => self.approach.push(record),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Span {
    icao: String,
    rows: Range<usize>,
}

/// Airport groups of an AD record stream.
#[derive(Debug, Clone, Default)]
pub struct AirportIndex {
    records: Vec<AdRecord>,
    spans: Vec<Span>,
}

impl AirportIndex {
    /// Segment `records` into airport groups.
    ///
    /// A group opens at each anchor and runs until an anchor with a
    /// different code. Rows before the first anchor belong to no airport.
    #[must_use]
    pub fn build(records: Vec<AdRecord>) -> Self {
        let mut spans: Vec<Span> = Vec::new();

        for (position, record) in records.iter().enumerate() {
            let Some(icao) = record.anchor_icao() else {
                continue;
            };
            match spans.last_mut() {
                Some(open) if open.icao == icao => {}
                Some(open) => {
                    open.rows.end = position;
                    spans.push(Span {
                        icao,
                        rows: position..records.len(),
                    });
                }
                None => spans.push(Span {
                    icao,
                    rows: position..records.len(),
                }),
            }
        }

        Self { records, spans }
    }

    /// The records the index was built from.
    #[must_use]
    pub fn records(&self) -> &[AdRecord] {
        &self.records
    }

    /// Number of distinct airports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.directory().len()
    }

    /// Whether no anchor was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Every airport, sorted by code.
    ///
    /// An airport whose code appears in several groups is listed once,
    /// named after its first group and flagged if any group is modified.
    #[must_use]
    pub fn directory(&self) -> Vec<AirportSummary> {
        let mut airports: BTreeMap<&str, AirportSummary> = BTreeMap::new();

        for span in &self.spans {
            let group = &self.records[span.rows.clone()];
            let modified = group.iter().any(CategoryRecord::is_modified);
            airports
                .entry(span.icao.as_str())
                .and_modify(|summary| summary.modified |= modified)
                .or_insert_with(|| AirportSummary {
                    icao: span.icao.clone(),
                    name: group[0].name_cn().to_string(),
                    modified,
                });
        }

        airports.into_values().collect()
    }

    /// The raw group of an airport: its anchor followed by every row up to
    /// the next airport. Empty if the code is unknown.
    #[must_use]
    pub fn charts(&self, icao: &str) -> &[AdRecord] {
        match self.span_of(icao) {
            Some(span) => &self.records[span.rows.clone()],
            None => &[],
        }
    }

    /// The charts of an airport, filtered and split by kind.
    ///
    /// The anchor becomes [`CategorizedCharts::info`]. Rows are dropped if
    /// they are AD text sections, repeat the anchor's name, or are not
    /// numbered under the airport's code.
    #[must_use]
    pub fn categorized(&self, icao: &str) -> CategorizedCharts {
        let Some((info, rows)) = self.charts(icao).split_first() else {
            return CategorizedCharts::default();
        };
        let icao = normalize_icao(icao);
        let prefix = format!("{icao}-");

        let mut charts = CategorizedCharts {
            info: Some(info.clone()),
            ..CategorizedCharts::default()
        };
        for record in rows {
            let name = record.name();
            if name.starts_with(TEXT_SECTION_PREFIX)
                || name == info.name()
                || !name.starts_with(&prefix)
            {
                continue;
            }
            charts.push(ChartKind::classify(name), record.clone());
        }
        charts
    }

    /// Number of rows in an airport's group, not counting anchor rows.
    #[must_use]
    pub fn chart_count(&self, icao: &str) -> usize {
        let icao = normalize_icao(icao);
        self.charts(&icao)
            .iter()
            .filter(|record| record.anchor_icao().as_deref() != Some(icao.as_str()))
            .count()
    }

    /// Whether any row of the airport is flagged as modified.
    #[must_use]
    pub fn has_modifications(&self, icao: &str) -> bool {
        let icao = normalize_icao(icao);
        self.spans
            .iter()
            .filter(|span| span.icao == icao)
            .any(|span| self.records[span.rows.clone()].iter().any(CategoryRecord::is_modified))
    }

    /// Airports whose code or localized name contains `keyword`,
    /// case-insensitively. A blank keyword matches nothing.
    #[must_use]
    pub fn search(&self, keyword: &str) -> Vec<AirportSummary> {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        self.directory()
            .into_iter()
            .filter(|airport| {
                airport.icao.to_lowercase().contains(&needle)
                    || airport.name.to_lowercase().contains(&needle)
            })
            .collect()
    }

    fn span_of(&self, icao: &str) -> Option<&Span> {
        let icao = normalize_icao(icao);
        self.spans.iter().find(|span| span.icao == icao)
    }
}

fn normalize_icao(icao: &str) -> String {
    icao.trim().to_uppercase()
}
