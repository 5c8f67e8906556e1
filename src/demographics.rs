// demographics.rs
//
// Height, weight and age distributions of one country's climbers, split by
// gender and set against the whole dataset.

use std::collections::{BTreeMap, HashSet};

use crate::config::HISTOGRAM_TICKS;
use crate::data::{ClimberRecord, Sex};
use crate::grades::normalize;
use crate::scale::ticks;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Height,
    Weight,
    Age,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Height, Metric::Weight, Metric::Age];

    pub fn label(self) -> &'static str {
        match self {
            Metric::Height => "Height (cm)",
            Metric::Weight => "Weight (kg)",
            Metric::Age => "Age (years)",
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Metric::Height => "height",
            Metric::Weight => "weight",
            Metric::Age => "age",
        }
    }

    pub fn value(self, climber: &ClimberRecord) -> f64 {
        match self {
            Metric::Height => climber.height,
            Metric::Weight => climber.weight,
            Metric::Age => climber.age,
        }
    }
}

/// NaN values are skipped; `None` when nothing is left.
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

pub fn extent(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GenderMeans {
    pub male: Option<f64>,
    pub female: Option<f64>,
}

pub fn gender_means(climbers: &[&ClimberRecord], metric: Metric) -> GenderMeans {
    let of = |sex: Sex| {
        mean(
            climbers
                .iter()
                .filter(|c| c.sex == Some(sex))
                .map(|c| metric.value(c)),
        )
    };
    GenderMeans {
        male: of(Sex::Male),
        female: of(Sex::Female),
    }
}

/// Half-open [x0, x1) except the last bin, which is closed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub x0: f64,
    pub x1: f64,
    pub count: usize,
}

/// Thresholds outside (x0, x1] are ignored, as are values outside the domain.
pub fn histogram(
    values: impl IntoIterator<Item = f64>,
    (x0, x1): (f64, f64),
    thresholds: &[f64],
) -> Vec<Bin> {
    let inner: Vec<f64> = thresholds
        .iter()
        .copied()
        .filter(|t| *t > x0 && *t <= x1)
        .collect();

    let mut bins: Vec<Bin> = (0..=inner.len())
        .map(|i| Bin {
            x0: if i == 0 { x0 } else { inner[i - 1] },
            x1: if i == inner.len() { x1 } else { inner[i] },
            count: 0,
        })
        .collect();

    for value in values {
        if x0 <= value && value <= x1 {
            let index = inner.partition_point(|t| *t <= value);
            bins[index].count += 1;
        }
    }
    bins
}

/// One histogram panel.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricChart {
    pub metric: Metric,
    pub domain: (f64, f64),
    pub male_bins: Vec<Bin>,
    pub female_bins: Vec<Bin>,
    pub country_means: GenderMeans,
    pub global_means: GenderMeans,
}

impl MetricChart {
    pub fn y_max(&self) -> usize {
        self.male_bins
            .iter()
            .chain(&self.female_bins)
            .map(|bin| bin.count)
            .max()
            .unwrap_or(0)
    }
}

/// Binning uses the country's own range, never the global one.
pub fn metric_chart(
    subset: &[&ClimberRecord],
    global_means: GenderMeans,
    metric: Metric,
) -> Option<MetricChart> {
    let domain = extent(subset.iter().map(|c| metric.value(c)))?;
    let thresholds = ticks(domain.0, domain.1, HISTOGRAM_TICKS);
    let bins_for = |sex: Sex| {
        histogram(
            subset
                .iter()
                .filter(|c| c.sex == Some(sex))
                .map(|c| metric.value(c)),
            domain,
            &thresholds,
        )
    };
    Some(MetricChart {
        metric,
        domain,
        male_bins: bins_for(Sex::Male),
        female_bins: bins_for(Sex::Female),
        country_means: gender_means(subset, metric),
        global_means,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradeChart {
    /// Grade label and climber count, in alphabetical order of label.
    pub categories: Vec<(String, usize)>,
    /// Median grade label of the whole dataset.
    pub global_reference: Option<String>,
}

impl GradeChart {
    pub fn max_count(&self) -> usize {
        self.categories.iter().map(|(_, n)| *n).max().unwrap_or(0)
    }

    pub fn reference_index(&self) -> Option<usize> {
        let reference = self.global_reference.as_ref()?;
        self.categories.iter().position(|(label, _)| label == reference)
    }
}

/// Middle label of all grade labels sorted alphabetically.
pub fn median_grade(climbers: &[ClimberRecord]) -> Option<String> {
    let mut labels: Vec<String> = climbers
        .iter()
        .map(|c| normalize(&c.grade_mean))
        .filter(|label| !label.is_empty())
        .collect();
    labels.sort();
    labels.get(labels.len() / 2).cloned()
}

pub fn grade_chart(subset: &[&ClimberRecord], global_reference: Option<String>) -> GradeChart {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for climber in subset {
        *counts.entry(normalize(&climber.grade_mean)).or_insert(0) += 1;
    }
    GradeChart {
        categories: counts.into_iter().collect(),
        global_reference,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountryCharts {
    pub country: String,
    pub climbers: usize,
    pub metrics: Vec<MetricChart>,
    pub grades: GradeChart,
}

/// Distinct countries in order of first appearance.
pub fn countries(climbers: &[ClimberRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    climbers
        .iter()
        .filter(|c| seen.insert(normalize(&c.country)))
        .map(|c| c.country.trim().to_string())
        .collect()
}

pub fn country_subset<'a>(climbers: &'a [ClimberRecord], country: &str) -> Vec<&'a ClimberRecord> {
    let key = normalize(country);
    climbers
        .iter()
        .filter(|c| normalize(&c.country) == key)
        .collect()
}

/// Every panel for `country`, or `None` if it has no climbers.
pub fn country_charts(climbers: &[ClimberRecord], country: &str) -> Option<CountryCharts> {
    let subset = country_subset(climbers, country);
    if subset.is_empty() {
        return None;
    }
    let everyone: Vec<&ClimberRecord> = climbers.iter().collect();
    let metrics = Metric::ALL
        .iter()
        .filter_map(|&metric| metric_chart(&subset, gender_means(&everyone, metric), metric))
        .collect();
    Some(CountryCharts {
        country: country.trim().to_string(),
        climbers: subset.len(),
        metrics,
        grades: grade_chart(&subset, median_grade(climbers)),
    })
}
