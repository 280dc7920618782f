use std::collections::{BTreeMap, HashMap};

use super::filter::FilteredView;
use super::model::{Categorical, Dimension, Value};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TopProduct {
    pub label: Value,
    pub volume: f64,
}

/// Scalar summaries of a view.
#[derive(Debug, Clone, PartialEq)]
pub struct Indicators {
    pub rows: usize,
    pub total_volume: f64,
    /// `None` only when the view is empty.
    pub top_product: Option<TopProduct>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimePoint {
    pub year: Value,
    pub month: Value,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionShare {
    pub region: Value,
    pub volume: f64,
    /// Fraction of the view's total volume, in [0, 1].
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DestinationVolume {
    pub destination: Value,
    pub year: Value,
    pub volume: f64,
}

/// Everything the dashboard draws for one view.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub indicators: Indicators,
    pub time_series: Vec<TimePoint>,
    pub regional_shares: Vec<RegionShare>,
    pub destination_volumes: Vec<DestinationVolume>,
}

// ---------------------------------------------------------------------------
// Indicators
// ---------------------------------------------------------------------------

/// Sum of `volume_liters`; 0 for an empty view.
pub fn total_volume(view: &FilteredView<'_>) -> f64 {
    view.volumes().sum()
}

/// Product with the largest summed volume.
///
/// Ties go to the smallest label in `Value` order, so the answer does not
/// depend on row order.
pub fn top_product(view: &FilteredView<'_>) -> Option<TopProduct> {
    let products = view.table().dimension(Dimension::Product);
    let mut best: Option<TopProduct> = None;
    for (label, volume) in sum_by(view, products) {
        let better = match &best {
            None => true,
            Some(current) => volume > current.volume,
        };
        if better {
            best = Some(TopProduct {
                label: label.clone(),
                volume,
            });
        }
    }
    best
}

pub fn compute_indicators(view: &FilteredView<'_>) -> Indicators {
    Indicators {
        rows: view.len(),
        total_volume: total_volume(view),
        top_product: top_product(view),
    }
}

// ---------------------------------------------------------------------------
// Grouped series
// ---------------------------------------------------------------------------

/// Volume per (year, month), chronological. Month names sort by calendar
/// position (see [`Value::month_key`]).
pub fn compute_time_series(view: &FilteredView<'_>) -> Vec<TimePoint> {
    let table = view.table();
    let mut series: Vec<TimePoint> = sum_by_pair(
        view,
        table.dimension(Dimension::Year),
        table.dimension(Dimension::Month),
    )
    .into_iter()
    .map(|((year, month), volume)| TimePoint {
        year: year.clone(),
        month: month.clone(),
        volume,
    })
    .collect();
    series.sort_by(|a, b| {
        a.year
            .cmp(&b.year)
            .then_with(|| a.month.month_key().cmp(&b.month.month_key()))
    });
    series
}

/// Volume per destination geographic region with its share of the total,
/// ordered by region.
pub fn compute_regional_shares(view: &FilteredView<'_>) -> Vec<RegionShare> {
    let sums = sum_by(view, view.table().geo_regions());
    let total: f64 = sums.values().sum();
    sums.into_iter()
        .map(|(region, volume)| RegionShare {
            region: region.clone(),
            volume,
            share: if total > 0.0 { volume / total } else { 0.0 },
        })
        .collect()
}

/// Volume per (destination code, year), ordered by destination then year.
pub fn compute_destination_volumes(view: &FilteredView<'_>) -> Vec<DestinationVolume> {
    let table = view.table();
    sum_by_pair(
        view,
        table.dimension(Dimension::DestinationRegion),
        table.dimension(Dimension::Year),
    )
    .into_iter()
    .map(|((destination, year), volume)| DestinationVolume {
        destination: destination.clone(),
        year: year.clone(),
        volume,
    })
    .collect()
}

/// All indicators and chart series, or `None` when no row matched.
pub fn summarize(view: &FilteredView<'_>) -> Option<Summary> {
    if view.is_empty() {
        return None;
    }
    Some(Summary {
        indicators: compute_indicators(view),
        time_series: compute_time_series(view),
        regional_shares: compute_regional_shares(view),
        destination_volumes: compute_destination_volumes(view),
    })
}

// -- grouping helpers --

/// Sum volumes per level of `column`, only for levels present in the view.
fn sum_by<'t>(view: &FilteredView<'t>, column: &'t Categorical) -> BTreeMap<&'t Value, f64> {
    let volumes = view.table().volumes();
    let mut per_code: Vec<Option<f64>> = vec![None; column.levels().len()];
    for &row in view.rows() {
        let slot = &mut per_code[column.code(row) as usize];
        *slot = Some(slot.unwrap_or(0.0) + volumes[row]);
    }
    per_code
        .into_iter()
        .enumerate()
        .filter_map(|(code, sum)| Some((&column.levels()[code], sum?)))
        .collect()
}

fn sum_by_pair<'t>(
    view: &FilteredView<'t>,
    first: &'t Categorical,
    second: &'t Categorical,
) -> BTreeMap<(&'t Value, &'t Value), f64> {
    let volumes = view.table().volumes();
    let mut per_code: HashMap<(u32, u32), f64> = HashMap::new();
    for &row in view.rows() {
        *per_code
            .entry((first.code(row), second.code(row)))
            .or_insert(0.0) += volumes[row];
    }
    per_code
        .into_iter()
        .map(|((a, b), sum)| {
            (
                (&first.levels()[a as usize], &second.levels()[b as usize]),
                sum,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{apply_filters, FilterCriteria};
    use crate::data::model::{Record, Table};

    fn rec(year: i64, month: i64, product: &str, region: &str, vol: f64) -> Record {
        Record {
            year: Value::Integer(year),
            month: Value::Integer(month),
            product_description: Value::text(product),
            origin_region_code: Value::text("SP"),
            destination_region_code: Value::text(region),
            destination_geographic_region: Value::text(region),
            volume_liters: vol,
        }
    }

    fn sample() -> Table {
        Table::from_records(vec![
            rec(2022, 1, "OIL-A", "SOUTH", 100.0),
            rec(2022, 1, "OIL-B", "SOUTH", 50.0),
            rec(2023, 1, "OIL-A", "NORTH", 30.0),
        ])
    }

    #[test]
    fn year_2022_indicators() {
        let t = sample();
        let view = apply_filters(&t, &FilterCriteria::new().with(Dimension::Year, [Value::Integer(2022)]));
        let ind = compute_indicators(&view);
        assert_eq!(ind.rows, 2);
        assert_eq!(ind.total_volume, 150.0);
        assert_eq!(
            ind.top_product,
            Some(TopProduct {
                label: Value::text("OIL-A"),
                volume: 100.0
            })
        );
    }

    #[test]
    fn empty_view_has_no_top_product() {
        let t = sample();
        let view = apply_filters(&t, &FilterCriteria::new().with(Dimension::Year, [Value::Integer(2024)]));
        let ind = compute_indicators(&view);
        assert_eq!(ind.total_volume, 0.0);
        assert_eq!(ind.top_product, None);
        assert!(summarize(&view).is_none());
        assert!(compute_time_series(&view).is_empty());
        assert!(compute_regional_shares(&view).is_empty());
    }

    #[test]
    fn tie_goes_to_smallest_label() {
        let t = Table::from_records(vec![
            rec(2022, 1, "ZETA", "SUL", 40.0),
            rec(2022, 1, "ALFA", "SUL", 25.0),
            rec(2022, 2, "ALFA", "SUL", 15.0),
        ]);
        let top = top_product(&FilteredView::all(&t)).unwrap();
        assert_eq!(top.label, Value::text("ALFA"));
        assert_eq!(top.volume, 40.0);
    }

    #[test]
    fn time_series_is_chronological() {
        let t = Table::from_records(vec![
            rec(2023, 2, "A", "SUL", 1.0),
            rec(2022, 11, "A", "SUL", 2.0),
            rec(2022, 2, "A", "SUL", 3.0),
            rec(2023, 2, "B", "SUL", 4.0),
            rec(2022, 10, "A", "SUL", 5.0),
        ]);
        let series = compute_time_series(&FilteredView::all(&t));
        let keys: Vec<(i64, i64, f64)> = series
            .iter()
            .map(|p| (p.year.as_i64().unwrap(), p.month.as_i64().unwrap(), p.volume))
            .collect();
        assert_eq!(
            keys,
            vec![(2022, 2, 3.0), (2022, 10, 5.0), (2022, 11, 2.0), (2023, 2, 5.0)]
        );
    }

    #[test]
    fn named_months_follow_the_calendar() {
        let named = |year: i64, month: &str, vol: f64| Record {
            month: Value::text(month),
            ..rec(year, 1, "A", "SUL", vol)
        };
        let t = Table::from_records(vec![
            named(2023, "JAN", 1.0),
            named(2022, "ABR", 2.0),
            named(2022, "FEV", 3.0),
            named(2022, "JAN", 4.0),
            named(2022, "MAR", 5.0),
            named(2022, "FEV", 6.0),
        ]);
        let series = compute_time_series(&FilteredView::all(&t));
        let keys: Vec<(String, String, f64)> = series
            .iter()
            .map(|p| (p.year.to_string(), p.month.to_string(), p.volume))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("2022".to_string(), "JAN".to_string(), 4.0),
                ("2022".to_string(), "FEV".to_string(), 9.0),
                ("2022".to_string(), "MAR".to_string(), 5.0),
                ("2022".to_string(), "ABR".to_string(), 2.0),
                ("2023".to_string(), "JAN".to_string(), 1.0),
            ]
        );
    }

    #[test]
    fn regional_shares_sum_to_one() {
        let t = sample();
        let shares = compute_regional_shares(&FilteredView::all(&t));
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].region, Value::text("NORTH"));
        assert_eq!(shares[0].volume, 30.0);
        assert_eq!(shares[1].volume, 150.0);
        let total: f64 = shares.iter().map(|s| s.share).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_volume_regions_get_zero_share() {
        let t = Table::from_records(vec![rec(2022, 1, "A", "SUL", 0.0)]);
        let shares = compute_regional_shares(&FilteredView::all(&t));
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].share, 0.0);
    }

    #[test]
    fn destination_volumes_group_by_year() {
        let t = sample();
        let bars = compute_destination_volumes(&FilteredView::all(&t));
        assert_eq!(
            bars,
            vec![
                DestinationVolume {
                    destination: Value::text("NORTH"),
                    year: Value::Integer(2023),
                    volume: 30.0
                },
                DestinationVolume {
                    destination: Value::text("SOUTH"),
                    year: Value::Integer(2022),
                    volume: 150.0
                },
            ]
        );
    }
}
