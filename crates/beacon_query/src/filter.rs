use serde_json::{Map, Value, json};

use crate::errors::{QueryError, Result};
use crate::scalar::Scalar;

/// A row predicate.
///
/// Filters given to a query at the top level are combined with AND by the
/// server. Use [`FilterExpr::Or`] for disjunctions.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// Inclusive range. At least one bound must be set.
    Range {
        column: String,
        gte: Option<Scalar>,
        lte: Option<Scalar>,
    },
    Equals {
        column: String,
        value: Scalar,
    },
    NotEquals {
        column: String,
        value: Scalar,
    },
    IsNull {
        column: String,
    },
    IsNotNull {
        column: String,
    },
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
    /// Point-in-polygon over a longitude/latitude column pair.
    Polygon {
        lon_column: String,
        lat_column: String,
        ring: Vec<(f64, f64)>,
    },
}

impl FilterExpr {
    pub fn range(
        column: impl Into<String>,
        gte: Option<impl Into<Scalar>>,
        lte: Option<impl Into<Scalar>>,
    ) -> Self {
        Self::Range {
            column: column.into(),
            gte: gte.map(Into::into),
            lte: lte.map(Into::into),
        }
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::Range {
            column: column.into(),
            gte: Some(value.into()),
            lte: None,
        }
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::Range {
            column: column.into(),
            gte: None,
            lte: Some(value.into()),
        }
    }

    pub fn equals(column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::Equals {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn not_equals(column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::NotEquals {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::IsNull {
            column: column.into(),
        }
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self::IsNotNull {
            column: column.into(),
        }
    }

    pub fn and(children: impl IntoIterator<Item = FilterExpr>) -> Self {
        Self::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = FilterExpr>) -> Self {
        Self::Or(children.into_iter().collect())
    }

    pub fn polygon(
        lon_column: impl Into<String>,
        lat_column: impl Into<String>,
        ring: impl IntoIterator<Item = (f64, f64)>,
    ) -> Self {
        Self::Polygon {
            lon_column: lon_column.into(),
            lat_column: lat_column.into(),
            ring: ring.into_iter().collect(),
        }
    }

    /// `And` of four single-bound ranges covering `(min_lon, min_lat,
    /// max_lon, max_lat)`.
    pub fn bbox(
        lon_column: impl Into<String>,
        lat_column: impl Into<String>,
        bbox: (f64, f64, f64, f64),
    ) -> Self {
        let lon_column = lon_column.into();
        let lat_column = lat_column.into();
        let (min_lon, min_lat, max_lon, max_lat) = bbox;
        Self::And(vec![
            Self::gte(lon_column.clone(), min_lon),
            Self::lte(lon_column, max_lon),
            Self::gte(lat_column.clone(), min_lat),
            Self::lte(lat_column, max_lat),
        ])
    }

    pub fn to_json(&self) -> Result<Value> {
        Ok(match self {
            Self::Range { column, gte, lte } => {
                if gte.is_none() && lte.is_none() {
                    return Err(QueryError::InvalidExpression(format!(
                        "range filter on '{column}' needs at least one bound"
                    )));
                }
                let mut obj = Map::new();
                obj.insert("column".to_string(), Value::String(column.clone()));
                obj.insert("gt_eq".to_string(), optional_scalar(gte)?);
                obj.insert("lt_eq".to_string(), optional_scalar(lte)?);
                Value::Object(obj)
            }
            Self::Equals { column, value } => json!({"column": column, "eq": value.to_json()?}),
            Self::NotEquals { column, value } => {
                json!({"column": column, "neq": value.to_json()?})
            }
            Self::IsNull { column } => json!({"is_null": {"column": column}}),
            Self::IsNotNull { column } => json!({"is_not_null": {"column": column}}),
            Self::And(children) => json!({"and": children_to_json(children)?}),
            Self::Or(children) => json!({"or": children_to_json(children)?}),
            Self::Polygon {
                lon_column,
                lat_column,
                ring,
            } => {
                let ring = closed_ring(ring)?;
                let coordinates = ring
                    .iter()
                    .map(|&(lon, lat)| Ok(json!([finite(lon)?, finite(lat)?])))
                    .collect::<Result<Vec<_>>>()?;
                json!({
                    "longitude_query_parameter": lon_column,
                    "latitude_query_parameter": lat_column,
                    "geometry": {"coordinates": coordinates, "type": "Polygon"},
                })
            }
        })
    }
}

fn optional_scalar(value: &Option<Scalar>) -> Result<Value> {
    match value {
        Some(v) => v.to_json(),
        None => Ok(Value::Null),
    }
}

fn children_to_json(children: &[FilterExpr]) -> Result<Vec<Value>> {
    if children.is_empty() {
        return Err(QueryError::InvalidExpression(
            "boolean filter needs at least one child".to_string(),
        ));
    }
    children.iter().map(FilterExpr::to_json).collect()
}

fn finite(v: f64) -> Result<f64> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(QueryError::Serialization(format!(
            "Non-finite polygon coordinate '{v}'"
        )))
    }
}

/// Validate a polygon ring, closing it if the last point doesn't repeat the
/// first.
fn closed_ring(ring: &[(f64, f64)]) -> Result<Vec<(f64, f64)>> {
    let mut distinct: Vec<(f64, f64)> = Vec::with_capacity(ring.len());
    for p in ring {
        if !distinct.contains(p) {
            distinct.push(*p);
        }
    }
    if distinct.len() < 3 {
        return Err(QueryError::InvalidExpression(format!(
            "polygon needs at least 3 distinct points, got {}",
            distinct.len()
        )));
    }

    let mut ring = ring.to_vec();
    if ring.first() != ring.last() {
        ring.push(ring[0]);
    }
    Ok(ring)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn range_json_keys() {
        let out = FilterExpr::range("DEPTH", Some(10), Some(20)).to_json().unwrap();
        let obj = out.as_object().unwrap();
        assert_eq!(3, obj.len());
        assert_eq!(Some(&json!("DEPTH")), obj.get("column"));
        assert_eq!(Some(&json!(10)), obj.get("gt_eq"));
        assert_eq!(Some(&json!(20)), obj.get("lt_eq"));
    }

    #[test]
    fn range_single_bound_sends_null() {
        let out = FilterExpr::gte("DEPTH", 5.5).to_json().unwrap();
        assert_eq!(json!({"column": "DEPTH", "gt_eq": 5.5, "lt_eq": null}), out);
    }

    #[test]
    fn range_without_bounds_rejected() {
        let f = FilterExpr::range("DEPTH", None::<i64>, None::<i64>);
        let err = f.to_json().unwrap_err();
        assert!(matches!(err, QueryError::InvalidExpression(_)), "{err}");
    }

    #[test]
    fn equality_and_null_checks() {
        assert_eq!(
            json!({"column": "PLATFORM", "eq": "ARGO"}),
            FilterExpr::equals("PLATFORM", "ARGO").to_json().unwrap()
        );
        assert_eq!(
            json!({"column": "QC", "neq": 4}),
            FilterExpr::not_equals("QC", 4).to_json().unwrap()
        );
        assert_eq!(
            json!({"is_null": {"column": "TEMP"}}),
            FilterExpr::is_null("TEMP").to_json().unwrap()
        );
        assert_eq!(
            json!({"is_not_null": {"column": "TEMP"}}),
            FilterExpr::is_not_null("TEMP").to_json().unwrap()
        );
    }

    #[test]
    fn boolean_combinators() {
        let f = FilterExpr::or([
            FilterExpr::equals("A", 1),
            FilterExpr::and([FilterExpr::is_null("B"), FilterExpr::equals("C", true)]),
        ]);
        let expected = json!({"or": [
            {"column": "A", "eq": 1},
            {"and": [{"is_null": {"column": "B"}}, {"column": "C", "eq": true}]},
        ]});
        assert_eq!(expected, f.to_json().unwrap());
    }

    #[test]
    fn empty_and_rejected() {
        let err = FilterExpr::and([]).to_json().unwrap_err();
        assert!(matches!(err, QueryError::InvalidExpression(_)), "{err}");
    }

    #[test]
    fn bbox_expansion() {
        let f = FilterExpr::bbox("LON", "LAT", (-10.0, 40.0, 5.0, 60.0));
        let FilterExpr::And(children) = f else {
            panic!("expected and filter");
        };
        let expected = [
            FilterExpr::gte("LON", -10.0),
            FilterExpr::lte("LON", 5.0),
            FilterExpr::gte("LAT", 40.0),
            FilterExpr::lte("LAT", 60.0),
        ];
        assert_eq!(4, children.len());
        for e in &expected {
            assert!(children.contains(e), "missing {e:?}");
        }
    }

    #[test]
    fn polygon_implicitly_closed() {
        let f = FilterExpr::polygon("LON", "LAT", [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        let expected = json!({
            "longitude_query_parameter": "LON",
            "latitude_query_parameter": "LAT",
            "geometry": {
                "coordinates": [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]],
                "type": "Polygon",
            },
        });
        assert_eq!(expected, f.to_json().unwrap());
    }

    #[test]
    fn polygon_already_closed_unchanged() {
        let ring = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)];
        let out = FilterExpr::polygon("LON", "LAT", ring).to_json().unwrap();
        let coords = out["geometry"]["coordinates"].as_array().unwrap();
        assert_eq!(4, coords.len());
    }

    #[test]
    fn degenerate_polygon_rejected() {
        let ring = [(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)];
        let err = FilterExpr::polygon("LON", "LAT", ring).to_json().unwrap_err();
        assert!(matches!(err, QueryError::InvalidExpression(_)), "{err}");
    }
}
