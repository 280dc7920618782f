use std::io::Write;

use anyhow::Context;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use lube_dash::data::export::export_to_bytes;
use lube_dash::data::filter::FilteredView;
use lube_dash::data::model::{Record, Table, Value};
use lube_dash::DashboardConfig;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[(self.next_u64() % items.len() as u64) as usize]
    }
}

const PRODUCTS: [(&str, f64); 5] = [
    ("ÓLEO LUBRIFICANTE AUTOMOTIVO", 1.0),
    ("ÓLEO LUBRIFICANTE INDUSTRIAL", 0.7),
    ("GRAXA LUBRIFICANTE", 0.2),
    ("ÓLEO LUBRIFICANTE MARÍTIMO", 0.35),
    ("ÓLEO LUBRIFICANTE FERROVIÁRIO", 0.15),
];

const ORIGINS: [&str; 4] = ["SP", "RJ", "BA", "PR"];

/// Destination state and its geographic region.
const DESTINATIONS: [(&str, &str); 10] = [
    ("SP", "SUDESTE"),
    ("RJ", "SUDESTE"),
    ("MG", "SUDESTE"),
    ("PR", "SUL"),
    ("RS", "SUL"),
    ("BA", "NORDESTE"),
    ("PE", "NORDESTE"),
    ("GO", "CENTRO-OESTE"),
    ("AM", "NORTE"),
    ("PA", "NORTE"),
];

/// Three years of monthly shipments, four random destinations per product.
fn sample_table(seed: u64) -> Table {
    let mut rng = SimpleRng::new(seed);
    let mut records = Vec::new();
    for year in 2021..=2023 {
        for month in 1..=12 {
            // Mild seasonality: more volume mid-year.
            let season = 1.0 + 0.25 * ((month as f64 - 1.0) / 11.0 * std::f64::consts::PI).sin();
            for &(product, weight) in &PRODUCTS {
                for _ in 0..4 {
                    let &(dest, region) = rng.pick(&DESTINATIONS);
                    let volume = (weight * season * (20_000.0 + 80_000.0 * rng.next_f64())).round();
                    records.push(Record {
                        year: Value::Integer(year),
                        month: Value::Integer(month),
                        product_description: Value::text(product),
                        origin_region_code: Value::text(*rng.pick(&ORIGINS)),
                        destination_region_code: Value::text(dest),
                        destination_geographic_region: Value::text(region),
                        volume_liters: volume,
                    });
                }
            }
        }
    }
    Table::from_records(records)
}

fn main() -> anyhow::Result<()> {
    let output_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample_data.zip".to_string());
    let config = DashboardConfig::default();

    let table = sample_table(42);
    let text_format = config.text_format().context("Invalid default text format")?;
    let bytes = export_to_bytes(&FilteredView::all(&table), &text_format)
        .context("Failed to encode sample rows")?;

    let file = std::fs::File::create(&output_path)
        .with_context(|| format!("Failed to create {output_path}"))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(config.member_name.as_str(), options)
        .context("Failed to start archive entry")?;
    zip.write_all(&bytes).context("Failed to write archive entry")?;
    zip.finish().context("Failed to finish archive")?;

    println!(
        "Wrote {} rows as {} to {output_path}",
        table.len(),
        config.member_name
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lube_dash::data::model::Dimension;

    #[test]
    fn sample_covers_every_month_and_origin_is_known() {
        let table = sample_table(42);
        assert_eq!(table.len(), 3 * 12 * PRODUCTS.len() * 4);
        assert_eq!(table.available_values(Dimension::Month).len(), 12);
        for origin in table.available_values(Dimension::OriginRegion) {
            assert!(ORIGINS.iter().any(|o| Value::text(o) == origin), "{origin}");
        }
        assert!(table.volumes().iter().all(|v| *v > 0.0));
        assert_eq!(sample_table(42), table);
    }
}
