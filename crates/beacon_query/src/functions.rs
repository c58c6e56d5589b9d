//! Predefined server-side functions.
//!
//! Each constructor expands into a [`SelectExpr::FunctionCall`] naming a
//! function the engine knows about. Arguments accept either expressions or
//! bare column names.

use crate::dtype::DType;
use crate::errors::Result;
use crate::select::SelectExpr;

pub const COALESCE: &str = "coalesce";
pub const TRY_ARROW_CAST: &str = "try_arrow_cast";
pub const CAST_INT8_AS_CHAR: &str = "cast_int8_as_char";
pub const MAP_WOD_QUALITY_FLAG: &str = "map_wod_quality_flag";
pub const MAP_PRESSURE_TO_DEPTH: &str = "map_pressure_to_depth";

fn call(name: &str, args: Vec<SelectExpr>, alias: impl Into<String>) -> SelectExpr {
    SelectExpr::FunctionCall {
        name: name.to_string(),
        args,
        alias: Some(alias.into()),
    }
}

/// First non-null value across the arguments.
pub fn coalesce<I, A>(args: I, alias: impl Into<String>) -> SelectExpr
where
    I: IntoIterator<Item = A>,
    A: Into<SelectExpr>,
{
    call(COALESCE, args.into_iter().map(Into::into).collect(), alias)
}

/// Cast the argument to the wire type matching `dtype`, producing null where
/// the cast fails.
///
/// Errors with `UnsupportedType` for dtypes outside the integer, floating,
/// datetime and string families.
pub fn cast(
    arg: impl Into<SelectExpr>,
    dtype: DType,
    alias: impl Into<String>,
) -> Result<SelectExpr> {
    let wire_type = dtype.wire_type_name()?;
    Ok(call(
        TRY_ARROW_CAST,
        vec![arg.into(), SelectExpr::literal(wire_type)],
        alias,
    ))
}

/// Interpret int8 values as characters.
pub fn byte_to_char(arg: impl Into<SelectExpr>, alias: impl Into<String>) -> SelectExpr {
    call(CAST_INT8_AS_CHAR, vec![arg.into()], alias)
}

/// Map World Ocean Database quality flags onto the SeaDataNet scheme.
pub fn map_quality_flag(arg: impl Into<SelectExpr>, alias: impl Into<String>) -> SelectExpr {
    call(MAP_WOD_QUALITY_FLAG, vec![arg.into()], alias)
}

/// Convert sea pressure to depth (TEOS-10), using the latitude argument.
pub fn map_pressure_to_depth(
    arg: impl Into<SelectExpr>,
    lat_arg: impl Into<SelectExpr>,
    alias: impl Into<String>,
) -> SelectExpr {
    call(MAP_PRESSURE_TO_DEPTH, vec![arg.into(), lat_arg.into()], alias)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::dtype::TimeUnit;
    use crate::errors::QueryError;

    #[test]
    fn coalesce_promotes_strings() {
        let expr = coalesce(["A", "B"], "C");
        let expected = json!({
            "function": "coalesce",
            "args": [{"column": "A", "alias": null}, {"column": "B", "alias": null}],
            "alias": "C",
        });
        assert_eq!(expected, expr.to_json().unwrap());

        let explicit = coalesce([SelectExpr::column("A"), SelectExpr::column("B")], "C");
        assert_eq!(explicit, expr);
    }

    #[test]
    fn cast_wire_types() {
        let cases = [
            (DType::Int32, "Int64"),
            (DType::Float32, "Float64"),
            (DType::Datetime(TimeUnit::Nanosecond), "Timestamp(Nanosecond, None)"),
            (DType::Str, "Utf8"),
        ];
        for (dtype, wire) in cases {
            let out = cast("X", dtype, "y").unwrap().to_json().unwrap();
            let expected = json!({
                "function": "try_arrow_cast",
                "args": [{"column": "X", "alias": null}, {"value": wire, "alias": null}],
                "alias": "y",
            });
            assert_eq!(expected, out);
        }
    }

    #[test]
    fn cast_unsupported() {
        let err = cast("X", DType::Bool, "y").unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedType(_)), "{err}");
    }

    #[test]
    fn single_arg_functions() {
        let out = byte_to_char("FLAG", "flag_char").to_json().unwrap();
        assert_eq!("cast_int8_as_char", out["function"]);
        assert_eq!(json!([{"column": "FLAG", "alias": null}]), out["args"]);

        let out = map_quality_flag("TEMP_WODFLAG", "TEMP_QC").to_json().unwrap();
        assert_eq!("map_wod_quality_flag", out["function"]);
        assert_eq!("TEMP_QC", out["alias"]);
    }

    #[test]
    fn pressure_to_depth_args_in_order() {
        let out = map_pressure_to_depth("PRES", SelectExpr::column("LATITUDE"), "DEPTH")
            .to_json()
            .unwrap();
        let expected = json!({
            "function": "map_pressure_to_depth",
            "args": [{"column": "PRES", "alias": null}, {"column": "LATITUDE", "alias": null}],
            "alias": "DEPTH",
        });
        assert_eq!(expected, out);
    }
}
