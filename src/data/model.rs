use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Recognised columns
// ---------------------------------------------------------------------------

pub const COL_YEAR: &str = "Ano";
pub const COL_MONTH: &str = "Mês";
pub const COL_PRODUCT: &str = "Descrição do Produto";
pub const COL_ORIGIN: &str = "UF de Origem";
pub const COL_DESTINATION: &str = "UF do Destinatário";
pub const COL_GEO_REGION: &str = "Região do Destinatário";
pub const COL_VOLUME: &str = "Volume(L)";

/// Headers every dataset must carry, in the layout used when building a
/// table from records.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    COL_YEAR,
    COL_MONTH,
    COL_PRODUCT,
    COL_ORIGIN,
    COL_DESTINATION,
    COL_GEO_REGION,
    COL_VOLUME,
];

// ---------------------------------------------------------------------------
// Value – a single label cell
// ---------------------------------------------------------------------------

/// A label cell. Variant order gives the sort order: Null < Integer < Text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    Null,
    Integer(i64),
    Text(String),
}

impl Value {
    /// Parse a year/month style field: integers become `Integer`.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        match trimmed.parse::<i64>() {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::Text(raw.to_string()),
        }
    }

    /// Keep a field verbatim; only an empty field becomes `Null`.
    pub fn text(raw: &str) -> Self {
        if raw.is_empty() {
            Value::Null
        } else {
            Value::Text(raw.to_string())
        }
    }

    /// Label for widgets and legends. `Display` is the file representation.
    pub fn display_label(&self) -> String {
        match self {
            Value::Null => "(vazio)".to_string(),
            other => other.to_string(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Calendar month of a month cell: integers as they are, Portuguese
    /// month names or three-letter abbreviations in any case.
    pub fn month_number(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Text(s) => month_from_name(s),
            Value::Null => None,
        }
    }

    /// Chronological sort key for month cells. Recognised months come first
    /// by number; anything else follows in `Value` order.
    pub fn month_key(&self) -> (bool, i64, &Value) {
        let number = self.month_number();
        (number.is_none(), number.unwrap_or_default(), self)
    }
}

const MONTH_NAMES: [&str; 12] = [
    "JANEIRO", "FEVEREIRO", "MARCO", "ABRIL", "MAIO", "JUNHO", "JULHO", "AGOSTO", "SETEMBRO",
    "OUTUBRO", "NOVEMBRO", "DEZEMBRO",
];

fn month_from_name(raw: &str) -> Option<i64> {
    let name = raw
        .trim()
        .trim_end_matches('.')
        .to_uppercase()
        .replace('Ç', "C");
    MONTH_NAMES
        .iter()
        .position(|m| *m == name || (name.len() == 3 && m.starts_with(name.as_str())))
        .map(|i| i as i64 + 1)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

// ---------------------------------------------------------------------------
// Dimension – a filterable column
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dimension {
    Year,
    Month,
    Product,
    OriginRegion,
    DestinationRegion,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Year,
        Dimension::Month,
        Dimension::Product,
        Dimension::OriginRegion,
        Dimension::DestinationRegion,
    ];

    /// Column header in the source file.
    pub fn header(self) -> &'static str {
        match self {
            Dimension::Year => COL_YEAR,
            Dimension::Month => COL_MONTH,
            Dimension::Product => COL_PRODUCT,
            Dimension::OriginRegion => COL_ORIGIN,
            Dimension::DestinationRegion => COL_DESTINATION,
        }
    }

    /// Short label for the filter panel.
    pub fn label(self) -> &'static str {
        match self {
            Dimension::Year => "Ano",
            Dimension::Month => "Mês",
            Dimension::Product => "Produto",
            Dimension::OriginRegion => "UF de Origem",
            Dimension::DestinationRegion => "UF do Destinatário",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Record – one shipment row
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub year: Value,
    pub month: Value,
    pub product_description: Value,
    pub origin_region_code: Value,
    pub destination_region_code: Value,
    pub destination_geographic_region: Value,
    pub volume_liters: f64,
}

// ---------------------------------------------------------------------------
// Categorical – dictionary-encoded label column
// ---------------------------------------------------------------------------

/// Distinct values in first-seen order plus one code per row.
#[derive(Debug, Clone, Default)]
pub struct Categorical {
    levels: Vec<Value>,
    lookup: HashMap<Value, u32>,
    codes: Vec<u32>,
}

impl Categorical {
    pub fn push(&mut self, value: Value) {
        let code = match self.lookup.get(&value) {
            Some(&code) => code,
            None => {
                let code = self.levels.len() as u32;
                self.lookup.insert(value.clone(), code);
                self.levels.push(value);
                code
            }
        };
        self.codes.push(code);
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn value(&self, row: usize) -> &Value {
        &self.levels[self.codes[row] as usize]
    }

    pub fn code(&self, row: usize) -> u32 {
        self.codes[row]
    }

    pub fn codes(&self) -> &[u32] {
        &self.codes
    }

    /// Distinct values in first-seen order, indexed by code.
    pub fn levels(&self) -> &[Value] {
        &self.levels
    }

    /// Distinct values in sorted order.
    pub fn sorted_levels(&self) -> BTreeSet<Value> {
        self.levels.iter().cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// Table – the complete loaded dataset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Column {
    Labels(Categorical),
    Volume(Vec<f64>),
}

/// Positions of the recognised columns inside `Table::headers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    year: usize,
    month: usize,
    product: usize,
    origin: usize,
    destination: usize,
    geo_region: usize,
    volume: usize,
}

impl Layout {
    fn resolve(headers: &[String]) -> Result<Self, LoadError> {
        for (i, h) in headers.iter().enumerate() {
            if headers[..i].contains(h) {
                return Err(LoadError::DuplicateColumn(h.clone()));
            }
        }
        let position = |name: &str| headers.iter().position(|h| h == name);
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|name| position(name).is_none())
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(LoadError::MissingColumns { missing });
        }
        let at = |name: &str| position(name).unwrap_or_default();
        Ok(Layout {
            year: at(COL_YEAR),
            month: at(COL_MONTH),
            product: at(COL_PRODUCT),
            origin: at(COL_ORIGIN),
            destination: at(COL_DESTINATION),
            geo_region: at(COL_GEO_REGION),
            volume: at(COL_VOLUME),
        })
    }
}

/// Columnar shipment table. Headers keep source order, rows keep insertion
/// order. Every column other than the volume is categorical.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    columns: Vec<Column>,
    layout: Layout,
    rows: usize,
}

impl Table {
    /// Build a table with the standard seven columns.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut builder = TableBuilder::standard();
        for r in records {
            builder.push_record(r);
        }
        builder.finish()
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn dimension(&self, dim: Dimension) -> &Categorical {
        let idx = match dim {
            Dimension::Year => self.layout.year,
            Dimension::Month => self.layout.month,
            Dimension::Product => self.layout.product,
            Dimension::OriginRegion => self.layout.origin,
            Dimension::DestinationRegion => self.layout.destination,
        };
        self.labels(idx)
    }

    pub fn geo_regions(&self) -> &Categorical {
        self.labels(self.layout.geo_region)
    }

    pub fn volumes(&self) -> &[f64] {
        match &self.columns[self.layout.volume] {
            Column::Volume(v) => v,
            Column::Labels(_) => unreachable!("volume column is numeric"),
        }
    }

    /// Sorted distinct values of a dimension, read from its dictionary.
    pub fn available_values(&self, dim: Dimension) -> BTreeSet<Value> {
        self.dimension(dim).sorted_levels()
    }

    pub fn record(&self, row: usize) -> Record {
        Record {
            year: self.dimension(Dimension::Year).value(row).clone(),
            month: self.dimension(Dimension::Month).value(row).clone(),
            product_description: self.dimension(Dimension::Product).value(row).clone(),
            origin_region_code: self.dimension(Dimension::OriginRegion).value(row).clone(),
            destination_region_code: self
                .dimension(Dimension::DestinationRegion)
                .value(row)
                .clone(),
            destination_geographic_region: self.geo_regions().value(row).clone(),
            volume_liters: self.volumes()[row],
        }
    }

    /// Cell text as it is written to a delimited file.
    pub fn cell_text(&self, row: usize, col: usize) -> String {
        match &self.columns[col] {
            Column::Labels(c) => c.value(row).to_string(),
            Column::Volume(v) => v[row].to_string(),
        }
    }

    /// A new table holding the given rows, in the given order.
    pub fn select(&self, rows: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|col| match col {
                Column::Labels(c) => {
                    let mut out = Categorical::default();
                    for &r in rows {
                        out.push(c.value(r).clone());
                    }
                    Column::Labels(out)
                }
                Column::Volume(v) => Column::Volume(rows.iter().map(|&r| v[r]).collect()),
            })
            .collect();
        Table {
            headers: self.headers.clone(),
            columns,
            layout: self.layout,
            rows: rows.len(),
        }
    }

    fn labels(&self, idx: usize) -> &Categorical {
        match &self.columns[idx] {
            Column::Labels(c) => c,
            Column::Volume(_) => unreachable!("layout points at a label column"),
        }
    }
}

/// Logical equality: same headers and the same cell values row by row,
/// independent of dictionary order.
impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        if self.headers != other.headers || self.rows != other.rows {
            return false;
        }
        self.columns
            .iter()
            .zip(&other.columns)
            .all(|(a, b)| match (a, b) {
                (Column::Labels(a), Column::Labels(b)) => {
                    (0..self.rows).all(|r| a.value(r) == b.value(r))
                }
                (Column::Volume(a), Column::Volume(b)) => a == b,
                _ => false,
            })
    }
}

// ---------------------------------------------------------------------------
// TableBuilder – row-at-a-time construction
// ---------------------------------------------------------------------------

/// Validates headers once, then appends rows into columnar storage.
#[derive(Debug)]
pub struct TableBuilder {
    headers: Vec<String>,
    columns: Vec<Column>,
    layout: Layout,
    rows: usize,
}

impl TableBuilder {
    pub fn new(headers: Vec<String>) -> Result<Self, LoadError> {
        let layout = Layout::resolve(&headers)?;
        let columns = (0..headers.len())
            .map(|i| {
                if i == layout.volume {
                    Column::Volume(Vec::new())
                } else {
                    Column::Labels(Categorical::default())
                }
            })
            .collect();
        Ok(Self {
            headers,
            columns,
            layout,
            rows: 0,
        })
    }

    /// Builder for the seven recognised columns in [`REQUIRED_COLUMNS`] order.
    fn standard() -> Self {
        let layout = Layout {
            year: 0,
            month: 1,
            product: 2,
            origin: 3,
            destination: 4,
            geo_region: 5,
            volume: 6,
        };
        let mut columns: Vec<Column> = (0..6).map(|_| Column::Labels(Categorical::default())).collect();
        columns.push(Column::Volume(Vec::new()));
        Self {
            headers: REQUIRED_COLUMNS.iter().map(|h| h.to_string()).collect(),
            columns,
            layout,
            rows: 0,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Append one row of decoded fields. `line` is only used for errors.
    pub fn push_row<S: AsRef<str>>(&mut self, fields: &[S], line: u64) -> Result<(), LoadError> {
        if fields.len() != self.headers.len() {
            return Err(LoadError::FieldCount {
                line,
                expected: self.headers.len(),
                found: fields.len(),
            });
        }
        let volume = parse_volume(fields[self.layout.volume].as_ref()).ok_or_else(|| {
            LoadError::InvalidVolume {
                line,
                value: fields[self.layout.volume].as_ref().to_string(),
            }
        })?;

        let inferred = [self.layout.year, self.layout.month];
        for (i, (col, field)) in self.columns.iter_mut().zip(fields).enumerate() {
            match col {
                Column::Volume(v) => v.push(volume),
                Column::Labels(c) if inferred.contains(&i) => c.push(Value::infer(field.as_ref())),
                Column::Labels(c) => c.push(Value::text(field.as_ref())),
            }
        }
        self.rows += 1;
        Ok(())
    }

    fn push_record(&mut self, r: Record) {
        let layout = self.layout;
        let mut cells = [
            (layout.year, Some(r.year)),
            (layout.month, Some(r.month)),
            (layout.product, Some(r.product_description)),
            (layout.origin, Some(r.origin_region_code)),
            (layout.destination, Some(r.destination_region_code)),
            (layout.geo_region, Some(r.destination_geographic_region)),
        ];
        for (idx, col) in self.columns.iter_mut().enumerate() {
            match col {
                Column::Volume(v) => v.push(r.volume_liters),
                Column::Labels(c) => {
                    let value = cells
                        .iter_mut()
                        .find(|(i, _)| *i == idx)
                        .and_then(|(_, v)| v.take())
                        .unwrap_or(Value::Null);
                    c.push(value);
                }
            }
        }
        self.rows += 1;
    }

    pub fn finish(self) -> Table {
        Table {
            headers: self.headers,
            columns: self.columns,
            layout: self.layout,
            rows: self.rows,
        }
    }
}

/// Accepts `.` or a single `,` as decimal separator. Rejects negatives and
/// non-finite numbers.
fn parse_volume(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let parsed = match trimmed.parse::<f64>() {
        Ok(v) => v,
        Err(_) if trimmed.matches(',').count() == 1 && !trimmed.contains('.') => {
            trimmed.replace(',', ".").parse::<f64>().ok()?
        }
        Err(_) => return None,
    };
    (parsed.is_finite() && parsed >= 0.0).then_some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn month_names_map_to_calendar_order() {
        assert_eq!(Value::text("JAN").month_number(), Some(1));
        assert_eq!(Value::text("fev").month_number(), Some(2));
        assert_eq!(Value::text("Março").month_number(), Some(3));
        assert_eq!(Value::text("MARCO").month_number(), Some(3));
        assert_eq!(Value::text("mai.").month_number(), Some(5));
        assert_eq!(Value::text("DEZEMBRO").month_number(), Some(12));
        assert_eq!(Value::Integer(7).month_number(), Some(7));
        assert_eq!(Value::text("TRIMESTRE").month_number(), None);
        assert_eq!(Value::text("MA").month_number(), None);

        let mut months: Vec<Value> = ["ABR", "TOTAL", "FEV", "JAN", "MAR"]
            .iter()
            .map(|m| Value::text(m))
            .collect();
        months.sort_by(|a, b| a.month_key().cmp(&b.month_key()));
        let labels: Vec<String> = months.iter().map(Value::to_string).collect();
        assert_eq!(labels, ["JAN", "FEV", "MAR", "ABR", "TOTAL"]);
    }

    #[test]
    fn value_ordering_is_numeric_for_integers() {
        let mut months: Vec<Value> = ["10", "2", "1", ""].iter().map(|s| Value::infer(s)).collect();
        months.sort();
        assert_eq!(
            months,
            vec![Value::Null, Value::Integer(1), Value::Integer(2), Value::Integer(10)]
        );
        assert!(Value::Integer(2024) < Value::text("JAN"));
    }

    #[test]
    fn categorical_shares_levels() {
        let mut c = Categorical::default();
        for s in ["SP", "RJ", "SP", "MG", "RJ"] {
            c.push(Value::text(s));
        }
        assert_eq!(c.len(), 5);
        assert_eq!(c.levels().len(), 3);
        assert_eq!(c.code(0), c.code(2));
        assert_eq!(c.value(3), &Value::text("MG"));
        let sorted: Vec<_> = c.sorted_levels().into_iter().collect();
        assert_eq!(sorted, vec![Value::text("MG"), Value::text("RJ"), Value::text("SP")]);
    }

    #[test]
    fn builder_reports_all_missing_columns() {
        let err = TableBuilder::new(headers(&[COL_YEAR, COL_MONTH, COL_VOLUME])).unwrap_err();
        match err {
            LoadError::MissingColumns { missing } => {
                assert_eq!(missing.len(), 4);
                assert!(missing.contains(&COL_PRODUCT.to_string()));
                assert!(missing.contains(&COL_GEO_REGION.to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn builder_rejects_duplicate_header() {
        let mut h = headers(&REQUIRED_COLUMNS);
        h.push(COL_ORIGIN.to_string());
        assert!(matches!(
            TableBuilder::new(h),
            Err(LoadError::DuplicateColumn(name)) if name == COL_ORIGIN
        ));
    }

    #[test]
    fn builder_keeps_extra_columns_in_source_order() {
        let h = headers(&[
            "Agente Regulado",
            COL_VOLUME,
            COL_YEAR,
            COL_MONTH,
            COL_PRODUCT,
            COL_ORIGIN,
            COL_DESTINATION,
            COL_GEO_REGION,
        ]);
        let mut b = TableBuilder::new(h.clone()).unwrap();
        b.push_row(&["ACME", "12,5", "2022", "03", "OIL-A", "SP", "RJ", "SUDESTE"], 2)
            .unwrap();
        let t = b.finish();
        assert_eq!(t.headers(), h.as_slice());
        assert_eq!(t.cell_text(0, 0), "ACME");
        assert_eq!(t.volumes(), &[12.5]);
        let rec = t.record(0);
        assert_eq!(rec.month, Value::Integer(3));
        assert_eq!(rec.product_description, Value::text("OIL-A"));
    }

    #[test]
    fn builder_validates_rows() {
        let mut b = TableBuilder::new(headers(&REQUIRED_COLUMNS)).unwrap();
        assert!(matches!(
            b.push_row(&["2022", "1"], 5),
            Err(LoadError::FieldCount { line: 5, expected: 7, found: 2 })
        ));
        assert!(matches!(
            b.push_row(&["2022", "1", "OIL", "SP", "RJ", "SUDESTE", "-3"], 6),
            Err(LoadError::InvalidVolume { line: 6, .. })
        ));
        assert!(matches!(
            b.push_row(&["2022", "1", "OIL", "SP", "RJ", "SUDESTE", ""], 7),
            Err(LoadError::InvalidVolume { line: 7, .. })
        ));
        assert!(b.is_empty());
    }

    #[test]
    fn volume_parsing() {
        assert_eq!(parse_volume("100"), Some(100.0));
        assert_eq!(parse_volume(" 1.5 "), Some(1.5));
        assert_eq!(parse_volume("1,5"), Some(1.5));
        assert_eq!(parse_volume("1.234,5"), None);
        assert_eq!(parse_volume("NaN"), None);
        assert_eq!(parse_volume("inf"), None);
    }

    #[test]
    fn select_and_logical_equality() {
        let rec = |year: i64, vol: f64| Record {
            year: Value::Integer(year),
            month: Value::Integer(1),
            product_description: Value::text("OIL-A"),
            origin_region_code: Value::text("SP"),
            destination_region_code: Value::text("RJ"),
            destination_geographic_region: Value::text("SUDESTE"),
            volume_liters: vol,
        };
        let t = Table::from_records(vec![rec(2021, 1.0), rec(2022, 2.0), rec(2023, 3.0)]);
        let picked = t.select(&[2, 0]);
        let expected = Table::from_records(vec![rec(2023, 3.0), rec(2021, 1.0)]);
        assert_eq!(picked, expected);
        assert_ne!(picked, t);
    }
}
