//! Read-only views over the stored publication.
//!
//! Every query here is advisory: a failed read is logged and answered with
//! an empty result instead of an error.

use std::collections::BTreeMap;
use std::ops::Deref;

use tracing::warn;

use crate::airport::{AirportIndex, AirportSummary, CategorizedCharts};
use crate::record::{
    AdRecord, AicRecord, AmdtRecord, CategoryRecord, CircularEntry, EnrRecord, NotamRecord,
    SupRecord,
};
use crate::storage::Storage;

/// Group used for records that name no section or chapter.
pub const DEFAULT_SECTION: &str = "other";

/// Extra ENR field holding the section a chart is filed under.
const SECTION_FIELD: &str = "Section";
/// Extra ENR field holding the English chart name.
const NAME_EN_FIELD: &str = "name_en";

const MAIN_CHART_SECTION: &str = "ENR 6.2";
const MAIN_CHART_TITLE: &str = "航路图";
const REGION_CHART_TITLE: &str = "区域图";

/// Query helpers over a [`Storage`].
#[derive(Debug, Clone, Copy)]
pub struct Catalog<'a> {
    storage: &'a Storage,
}

impl<'a> Catalog<'a> {
    /// Create a catalog over `storage`.
    #[must_use]
    pub const fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    fn read<R: CategoryRecord>(&self) -> Vec<R> {
        match self.storage.store::<R>().read_all() {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to read {} records: {}", R::CATEGORY, e);
                Vec::new()
            }
        }
    }

    // Airports

    /// Index of every airport in the AD category.
    #[must_use]
    pub fn airports(&self) -> AirportIndex {
        AirportIndex::build(self.read::<AdRecord>())
    }

    /// Every airport, sorted by code.
    #[must_use]
    pub fn airport_directory(&self) -> Vec<AirportSummary> {
        self.airports().directory()
    }

    /// The charts of one airport, split by kind.
    #[must_use]
    pub fn categorized_charts(&self, icao: &str) -> CategorizedCharts {
        self.airports().categorized(icao)
    }

    /// Airports matching a code or name fragment.
    #[must_use]
    pub fn search_airports(&self, keyword: &str) -> Vec<AirportSummary> {
        self.airports().search(keyword)
    }

    // Enroute

    /// Enroute charts that have a document.
    #[must_use]
    pub fn enroute_charts(&self) -> Vec<EnrRecord> {
        self.read::<EnrRecord>()
            .into_iter()
            .filter(|chart| chart.has_pdf())
            .collect()
    }

    /// Enroute charts grouped by section.
    #[must_use]
    pub fn enroute_by_section(&self) -> BTreeMap<String, Vec<EnrRecord>> {
        group_by(self.enroute_charts(), |chart| chart.extra_str(SECTION_FIELD))
    }

    /// The ENR 6.2 overview chart, if published.
    #[must_use]
    pub fn enroute_main_chart(&self) -> Option<EnrRecord> {
        self.enroute_charts().into_iter().find(|chart| {
            let name = chart.name_cn();
            name.contains(MAIN_CHART_SECTION) && name.contains(MAIN_CHART_TITLE)
        })
    }

    /// Area charts.
    #[must_use]
    pub fn region_charts(&self) -> Vec<EnrRecord> {
        self.enroute_charts()
            .into_iter()
            .filter(|chart| chart.name_cn().contains(REGION_CHART_TITLE))
            .collect()
    }

    /// Whether any enroute chart changed in this cycle.
    #[must_use]
    pub fn has_enroute_modifications(&self) -> bool {
        self.enroute_charts().iter().any(CategoryRecord::is_modified)
    }

    /// Enroute charts whose localized name, English name or section
    /// contains `keyword`.
    #[must_use]
    pub fn search_enroute(&self, keyword: &str) -> Vec<EnrRecord> {
        let Some(needle) = needle(keyword) else {
            return Vec::new();
        };
        self.enroute_charts()
            .into_iter()
            .filter(|chart| {
                field_contains(Some(chart.name_cn()), &needle)
                    || field_contains(chart.extra_str(NAME_EN_FIELD), &needle)
                    || field_contains(chart.extra_str(SECTION_FIELD), &needle)
            })
            .collect()
    }

    // Amendments

    /// Amendments that have a document.
    #[must_use]
    pub fn amendments(&self) -> Vec<AmdtRecord> {
        self.read::<AmdtRecord>()
            .into_iter()
            .filter(|amendment| amendment.has_pdf())
            .collect()
    }

    /// Amendments whose name or localized name contains `keyword`.
    #[must_use]
    pub fn search_amendments(&self, keyword: &str) -> Vec<AmdtRecord> {
        let Some(needle) = needle(keyword) else {
            return Vec::new();
        };
        self.amendments()
            .into_iter()
            .filter(|amendment| {
                field_contains(Some(amendment.name()), &needle)
                    || field_contains(Some(amendment.name_cn()), &needle)
            })
            .collect()
    }

    // Circulars

    /// Supplements that have a document.
    #[must_use]
    pub fn supplements(&self) -> Vec<SupRecord> {
        self.circulars()
    }

    /// Information circulars that have a document.
    #[must_use]
    pub fn information_circulars(&self) -> Vec<AicRecord> {
        self.circulars()
    }

    /// Circulars of type `R` that have a document.
    #[must_use]
    pub fn circulars<R>(&self) -> Vec<R>
    where
        R: CategoryRecord + Deref<Target = CircularEntry>,
    {
        self.read::<R>()
            .into_iter()
            .filter(|circular| circular.has_document())
            .collect()
    }

    /// Circulars of type `R` grouped by chapter.
    #[must_use]
    pub fn circulars_by_chapter<R>(&self) -> BTreeMap<String, Vec<R>>
    where
        R: CategoryRecord + Deref<Target = CircularEntry>,
    {
        group_by(self.circulars::<R>(), |circular| {
            circular.chapter_type.as_deref()
        })
    }

    /// Whether any circular of type `R` changed in this cycle.
    #[must_use]
    pub fn has_circular_modifications<R>(&self) -> bool
    where
        R: CategoryRecord + Deref<Target = CircularEntry>,
    {
        self.circulars::<R>().iter().any(CategoryRecord::is_modified)
    }

    /// Circulars of type `R` whose subject, localized subject or chapter
    /// contains `keyword`.
    #[must_use]
    pub fn search_circulars<R>(&self, keyword: &str) -> Vec<R>
    where
        R: CategoryRecord + Deref<Target = CircularEntry>,
    {
        let Some(needle) = needle(keyword) else {
            return Vec::new();
        };
        self.circulars::<R>()
            .into_iter()
            .filter(|circular| {
                field_contains(circular.subject.as_deref(), &needle)
                    || field_contains(circular.local_subject.as_deref(), &needle)
                    || field_contains(circular.chapter_type.as_deref(), &needle)
            })
            .collect()
    }

    // NOTAM

    /// NOTAM series documents.
    #[must_use]
    pub fn notams(&self) -> Vec<NotamRecord> {
        self.read::<NotamRecord>()
            .into_iter()
            .filter(NotamRecord::has_document)
            .collect()
    }

    /// NOTAM documents whose series name contains `keyword`.
    #[must_use]
    pub fn search_notams(&self, keyword: &str) -> Vec<NotamRecord> {
        let Some(needle) = needle(keyword) else {
            return Vec::new();
        };
        self.notams()
            .into_iter()
            .filter(|notam| field_contains(notam.series_name.as_deref(), &needle))
            .collect()
    }
}

/// Lower-cased search term, `None` when blank.
fn needle(keyword: &str) -> Option<String> {
    let needle = keyword.trim().to_lowercase();
    (!needle.is_empty()).then_some(needle)
}

fn field_contains(field: Option<&str>, needle: &str) -> bool {
    field.is_some_and(|value| value.to_lowercase().contains(needle))
}

fn group_by<R, F>(records: Vec<R>, key: F) -> BTreeMap<String, Vec<R>>
where
    F: Fn(&R) -> Option<&str>,
{
    let mut groups: BTreeMap<String, Vec<R>> = BTreeMap::new();
    for record in records {
        let section = key(&record)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SECTION)
            .to_string();
        groups.entry(section).or_default().push(record);
    }
    groups
}
