use std::fmt;

use crate::filter::FilterExpr;
use crate::functions;
use crate::output::OutputSpec;
use crate::scalar::Scalar;
use crate::select::SelectExpr;

/// Source identifier used when a query isn't bound to a table or dataset.
pub const DEFAULT_SOURCE: &str = "default";

/// What a query reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// A logical table registered on the node.
    Table(String),
    /// A single dataset file on the node.
    Dataset(String),
}

impl DataSource {
    /// Identifier sent in the `from` field.
    pub fn identifier(&self) -> &str {
        match self {
            Self::Table(s) | Self::Dataset(s) => s,
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(s) => write!(f, "table '{s}'"),
            Self::Dataset(s) => write!(f, "dataset '{s}'"),
        }
    }
}

/// Builder for a JSON query.
///
/// Mutators return `&mut Self` so calls can be chained. A query is plain data
/// and never touches the network; see the client crate for execution.
///
/// A `Query` has no interior synchronization. Sharing one builder between
/// threads for mutation is up to the caller to coordinate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub(crate) source: Option<DataSource>,
    pub(crate) selects: Vec<SelectExpr>,
    /// Set once any select method has been called, even with an empty list.
    pub(crate) selects_configured: bool,
    pub(crate) filters: Vec<FilterExpr>,
    pub(crate) output: Option<OutputSpec>,
}

impl Query {
    /// Create a query with no source. Compiles against [`DEFAULT_SOURCE`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(table: impl Into<String>) -> Self {
        Query {
            source: Some(DataSource::Table(table.into())),
            ..Default::default()
        }
    }

    pub fn from_dataset(path: impl Into<String>) -> Self {
        Query {
            source: Some(DataSource::Dataset(path.into())),
            ..Default::default()
        }
    }

    pub fn source(&self) -> Option<&DataSource> {
        self.source.as_ref()
    }

    pub fn selects(&self) -> &[SelectExpr] {
        &self.selects
    }

    pub fn filters(&self) -> &[FilterExpr] {
        &self.filters
    }

    pub fn output(&self) -> Option<&OutputSpec> {
        self.output.as_ref()
    }

    /// Replace all selections.
    pub fn select<I, A>(&mut self, exprs: I) -> &mut Self
    where
        I: IntoIterator<Item = A>,
        A: Into<SelectExpr>,
    {
        self.selects = exprs.into_iter().map(Into::into).collect();
        self.selects_configured = true;
        self
    }

    pub fn add_select(&mut self, expr: impl Into<SelectExpr>) -> &mut Self {
        self.selects.push(expr.into());
        self.selects_configured = true;
        self
    }

    pub fn add_selects<I, A>(&mut self, exprs: I) -> &mut Self
    where
        I: IntoIterator<Item = A>,
        A: Into<SelectExpr>,
    {
        self.selects.extend(exprs.into_iter().map(Into::into));
        self.selects_configured = true;
        self
    }

    pub fn add_select_column(&mut self, name: impl Into<String>, alias: Option<&str>) -> &mut Self {
        let mut expr = SelectExpr::column(name);
        expr.set_alias(alias.map(str::to_string));
        self.add_select(expr)
    }

    /// Append a column per `(name, alias)` pair.
    pub fn add_select_columns<'a, I>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        for (name, alias) in columns {
            self.add_select_column(name, alias);
        }
        // Appending nothing still counts as configuring the selection.
        self.selects_configured = true;
        self
    }

    /// Append a coalesce over the given columns.
    pub fn add_select_coalesced<I, A>(&mut self, columns: I, alias: impl Into<String>) -> &mut Self
    where
        I: IntoIterator<Item = A>,
        A: Into<SelectExpr>,
    {
        self.add_select(functions::coalesce(columns, alias))
    }

    /// Replace all filters.
    pub fn filter(&mut self, filters: impl IntoIterator<Item = FilterExpr>) -> &mut Self {
        self.filters = filters.into_iter().collect();
        self
    }

    /// Append a top-level filter. Top-level filters are ANDed together.
    pub fn add_filter(&mut self, filter: FilterExpr) -> &mut Self {
        self.filters.push(filter);
        self
    }

    pub fn add_range_filter(
        &mut self,
        column: impl Into<String>,
        gte: Option<impl Into<Scalar>>,
        lte: Option<impl Into<Scalar>>,
    ) -> &mut Self {
        self.add_filter(FilterExpr::range(column, gte, lte))
    }

    pub fn add_equals_filter(
        &mut self,
        column: impl Into<String>,
        value: impl Into<Scalar>,
    ) -> &mut Self {
        self.add_filter(FilterExpr::equals(column, value))
    }

    pub fn add_not_equals_filter(
        &mut self,
        column: impl Into<String>,
        value: impl Into<Scalar>,
    ) -> &mut Self {
        self.add_filter(FilterExpr::not_equals(column, value))
    }

    pub fn add_is_null_filter(&mut self, column: impl Into<String>) -> &mut Self {
        self.add_filter(FilterExpr::is_null(column))
    }

    pub fn add_is_not_null_filter(&mut self, column: impl Into<String>) -> &mut Self {
        self.add_filter(FilterExpr::is_not_null(column))
    }

    /// Keep rows inside `(min_lon, min_lat, max_lon, max_lat)`, bounds
    /// inclusive.
    pub fn add_bbox_filter(
        &mut self,
        lon_column: impl Into<String>,
        lat_column: impl Into<String>,
        bbox: (f64, f64, f64, f64),
    ) -> &mut Self {
        self.add_filter(FilterExpr::bbox(lon_column, lat_column, bbox))
    }

    pub fn add_polygon_filter(
        &mut self,
        lon_column: impl Into<String>,
        lat_column: impl Into<String>,
        ring: impl IntoIterator<Item = (f64, f64)>,
    ) -> &mut Self {
        self.add_filter(FilterExpr::polygon(lon_column, lat_column, ring))
    }

    /// Replace the output format.
    pub fn set_output(&mut self, output: OutputSpec) -> &mut Self {
        self.output = Some(output);
        self
    }

    /// Build the usual spatio-temporal subset query over a source.
    pub fn subset(source: DataSource, opts: SubsetOptions) -> Self {
        let mut query = Query {
            source: Some(source),
            ..Default::default()
        };

        query
            .add_select_column(opts.lon_column.as_str(), None)
            .add_select_column(opts.lat_column.as_str(), None)
            .add_select_column(opts.time_column.as_str(), None)
            .add_select_column(opts.depth_column.as_str(), None)
            .add_selects(opts.columns.iter());

        if let Some(bbox) = opts.bbox {
            query.add_bbox_filter(opts.lon_column.as_str(), opts.lat_column.as_str(), bbox);
        }
        if let Some((min, max)) = opts.depth_range {
            query.add_range_filter(opts.depth_column.as_str(), Some(min), Some(max));
        }
        if let Some((start, end)) = opts.time_range {
            query.add_range_filter(opts.time_column.as_str(), Some(start), Some(end));
        }

        query
    }
}

/// Options for [`Query::subset`].
#[derive(Debug, Clone, PartialEq)]
pub struct SubsetOptions {
    pub lon_column: String,
    pub lat_column: String,
    pub time_column: String,
    pub depth_column: String,
    /// Additional columns to select.
    pub columns: Vec<String>,
    pub bbox: Option<(f64, f64, f64, f64)>,
    pub depth_range: Option<(f64, f64)>,
    pub time_range: Option<(Scalar, Scalar)>,
}

impl SubsetOptions {
    pub fn new(
        lon_column: impl Into<String>,
        lat_column: impl Into<String>,
        time_column: impl Into<String>,
        depth_column: impl Into<String>,
    ) -> Self {
        SubsetOptions {
            lon_column: lon_column.into(),
            lat_column: lat_column.into(),
            time_column: time_column.into(),
            depth_column: depth_column.into(),
            columns: Vec::new(),
            bbox: None,
            depth_range: None,
            time_range: None,
        }
    }
}
