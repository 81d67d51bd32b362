use std::collections::BTreeSet;

use super::model::{ObservationLog, ObservationRecord, SpectralOrder};

// ---------------------------------------------------------------------------
// Object predicate
// ---------------------------------------------------------------------------

/// Restriction on the object (target) name of a row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ObjectFilter {
    /// Every object passes.
    #[default]
    NoFilter,
    /// A single object name.
    Exactly(String),
    /// Membership in a set of names. An empty set matches nothing.
    AnyOf(BTreeSet<String>),
}

impl ObjectFilter {
    pub fn exactly(name: impl Into<String>) -> Self {
        ObjectFilter::Exactly(name.into())
    }

    pub fn any_of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ObjectFilter::AnyOf(names.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, object: &str) -> bool {
        match self {
            ObjectFilter::NoFilter => true,
            ObjectFilter::Exactly(name) => name == object,
            ObjectFilter::AnyOf(names) => names.contains(object),
        }
    }

    /// Short description of the variant, used in diagnostics.
    pub fn shape(&self) -> &'static str {
        match self {
            ObjectFilter::NoFilter => "no filter",
            ObjectFilter::Exactly(_) => "single name",
            ObjectFilter::AnyOf(_) => "name list",
        }
    }
}

// ---------------------------------------------------------------------------
// Order-type predicate
// ---------------------------------------------------------------------------

/// Which processing levels a query accepts. Excluded (`"Z"`) rows never pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderSelection {
    /// Merged spectra and individual orders.
    #[default]
    AnyValid,
    /// Individual orders only.
    OrdersOnly,
    /// Merged spectra only.
    MergedOnly,
}

impl OrderSelection {
    /// Resolve the two caller flags. `merged_only` is applied last and wins
    /// when both are set; detecting that conflict is the caller's job.
    pub fn from_flags(merged_only: bool, orders_only: bool) -> Self {
        if merged_only {
            OrderSelection::MergedOnly
        } else if orders_only {
            OrderSelection::OrdersOnly
        } else {
            OrderSelection::AnyValid
        }
    }

    pub fn matches(self, order: &SpectralOrder) -> bool {
        match (self, order) {
            (_, SpectralOrder::Excluded) => false,
            (OrderSelection::AnyValid, _) => true,
            (OrderSelection::OrdersOnly, SpectralOrder::Single(_)) => true,
            (OrderSelection::OrdersOnly, SpectralOrder::Merged) => false,
            (OrderSelection::MergedOnly, o) => o.is_merged(),
        }
    }
}

// ---------------------------------------------------------------------------
// Wavelength predicate
// ---------------------------------------------------------------------------

/// Wavelength constraints (Å). All active constraints are AND-ed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WaveWindow {
    /// The observation must strictly cover this wavelength.
    pub point: Option<f64>,
    /// The observation must extend above this wavelength.
    pub min: Option<f64>,
    /// The observation must start below this wavelength.
    pub max: Option<f64>,
}

impl WaveWindow {
    pub fn at(wave: f64) -> Self {
        WaveWindow {
            point: Some(wave),
            ..Default::default()
        }
    }

    pub fn overlapping(min: Option<f64>, max: Option<f64>) -> Self {
        WaveWindow {
            point: None,
            min,
            max,
        }
    }

    pub fn matches(&self, rec: &ObservationRecord) -> bool {
        if let Some(wave) = self.point {
            if !rec.covers(wave) {
                return false;
            }
        }
        if let Some(min) = self.min {
            if rec.wave_max <= min {
                return false;
            }
        }
        if let Some(max) = self.max {
            if rec.wave_min >= max {
                return false;
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Combined observation-log selection
// ---------------------------------------------------------------------------

/// Object AND order-type AND wavelength selection over the observation log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationFilter {
    pub objects: ObjectFilter,
    pub orders: OrderSelection,
    pub wave: WaveWindow,
}

impl ObservationFilter {
    pub fn matches(&self, rec: &ObservationRecord) -> bool {
        self.objects.matches(&rec.object)
            && self.orders.matches(&rec.order)
            && self.wave.matches(rec)
    }
}

/// Return indices of observations that pass the filter, in table order.
pub fn filtered_indices(log: &ObservationLog, filter: &ObservationFilter) -> Vec<usize> {
    log.records()
        .iter()
        .enumerate()
        .filter(|(_, rec)| filter.matches(rec))
        .map(|(i, _)| i)
        .collect()
}

/// Filenames of the observations that pass the filter, in table order.
pub fn filtered_filenames(log: &ObservationLog, filter: &ObservationFilter) -> Vec<String> {
    filtered_indices(log, filter)
        .into_iter()
        .map(|i| log.records()[i].filename.clone())
        .collect()
}
