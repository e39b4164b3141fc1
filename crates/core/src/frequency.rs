//! Frequency tables built from annotation records.
//!
//! A [`FrequencyTable`] remembers the order in which labels were first
//! seen, so [`FrequencyTable::ranked`] breaks count ties by first
//! appearance. [`AnnotationTally`] holds one table per [`Dimension`].

use indexmap::IndexMap;

use crate::annotation::AnnotationRecord;

// ---------------------------------------------------------------------------
// FrequencyTable
// ---------------------------------------------------------------------------

/// Label -> occurrence count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: IndexMap<String, u64>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `label`.
    pub fn add(&mut self, label: &str) {
        match self.counts.get_mut(label) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(label.to_string(), 1);
            }
        }
    }

    /// Count one occurrence of every label in `labels`, duplicates included.
    pub fn add_all<'a, I>(&mut self, labels: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for label in labels {
            self.add(label);
        }
    }

    pub fn count(&self, label: &str) -> u64 {
        self.counts.get(label).copied().unwrap_or(0)
    }

    /// Number of distinct labels.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Entries sorted by descending count, ties in first-seen order.
    pub fn ranked(&self) -> Vec<(&str, u64)> {
        let mut entries: Vec<(&str, u64)> = self
            .counts
            .iter()
            .map(|(label, count)| (label.as_str(), *count))
            .collect();
        // `sort_by` is stable, which keeps insertion order among equal counts.
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
    }
}

// ---------------------------------------------------------------------------
// Dimensions
// ---------------------------------------------------------------------------

/// One of the seven tallied aspects of an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Keywords,
    ContextTime,
    ContextLocation,
    ContextAction,
    SingleInstances,
    FewInstances,
    ManyInstances,
}

impl Dimension {
    /// All dimensions in report order.
    pub const ALL: [Dimension; 7] = [
        Self::Keywords,
        Self::ContextTime,
        Self::ContextLocation,
        Self::ContextAction,
        Self::SingleInstances,
        Self::FewInstances,
        Self::ManyInstances,
    ];

    /// Heading printed above the table on the console.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Keywords => "Keyword Frequency",
            Self::ContextTime => "Context Time Frequency",
            Self::ContextLocation => "Context Location Frequency",
            Self::ContextAction => "Context Action Frequency",
            Self::SingleInstances => "Single Instances Frequency",
            Self::FewInstances => "Few Instances Frequency",
            Self::ManyInstances => "Many Instances Frequency",
        }
    }

    /// Header of the label column.
    pub fn label_header(&self) -> &'static str {
        match self {
            Self::Keywords => "Keyword",
            Self::ContextTime => "Time",
            Self::ContextLocation => "Location",
            Self::ContextAction => "Action",
            Self::SingleInstances => "Single Instance",
            Self::FewInstances => "Few Instances",
            Self::ManyInstances => "Many Instances",
        }
    }

    /// CSV file the table is exported to.
    pub fn csv_file_name(&self) -> &'static str {
        match self {
            Self::Keywords => "keyword_frequency.csv",
            Self::ContextTime => "context_time_frequency.csv",
            Self::ContextLocation => "context_location_frequency.csv",
            Self::ContextAction => "context_action_frequency.csv",
            Self::SingleInstances => "single_instances_frequency.csv",
            Self::FewInstances => "few_instances_frequency.csv",
            Self::ManyInstances => "many_instances_frequency.csv",
        }
    }
}

/// Header of the count column, shared by every table.
pub const COUNT_HEADER: &str = "Count";

// ---------------------------------------------------------------------------
// AnnotationTally
// ---------------------------------------------------------------------------

/// Running counters across every annotation record seen so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationTally {
    keywords: FrequencyTable,
    context_time: FrequencyTable,
    context_location: FrequencyTable,
    context_action: FrequencyTable,
    single_instances: FrequencyTable,
    few_instances: FrequencyTable,
    many_instances: FrequencyTable,
    records: usize,
}

impl AnnotationTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one record into all seven counters.
    ///
    /// Each context counter receives exactly one label per record.
    pub fn add_record(&mut self, record: &AnnotationRecord) {
        self.keywords.add_all(&record.keywords);
        self.context_time.add(&record.context.time);
        self.context_location.add(&record.context.location);
        self.context_action.add(&record.context.action);
        self.single_instances.add_all(&record.instances.single);
        self.few_instances.add_all(&record.instances.few);
        self.many_instances.add_all(&record.instances.many);
        self.records += 1;
    }

    /// Number of records merged.
    pub fn records(&self) -> usize {
        self.records
    }

    pub fn table(&self, dimension: Dimension) -> &FrequencyTable {
        match dimension {
            Dimension::Keywords => &self.keywords,
            Dimension::ContextTime => &self.context_time,
            Dimension::ContextLocation => &self.context_location,
            Dimension::ContextAction => &self.context_action,
            Dimension::SingleInstances => &self.single_instances,
            Dimension::FewInstances => &self.few_instances,
            Dimension::ManyInstances => &self.many_instances,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
