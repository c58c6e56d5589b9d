mod args;

use std::io;
use std::path::Path;
use std::time::Duration;

use args::{Arguments, Format, QueryArgs};
use beacon_client::{Client, NetcdfBuild, ReqwestSession, Result};
use beacon_query::{FilterExpr, OutputSpec, Query, QueryRequest, SqlQuery};
use clap::Parser;
use tracing::info;

fn main() {
    let args = Arguments::parse();
    logutil::configure_global_logger(args.log_level, args.log_format.into(), io::stderr);

    if let Err(err) = inner(args) {
        eprintln!("ERROR: {err}");
        std::process::exit(1);
    }
}

fn inner(args: Arguments) -> Result<()> {
    match &args.query.sql {
        Some(sql) => run(&args, SqlQuery::new(sql)),
        None => run(&args, build_query(&args.query)),
    }
}

fn run<R: QueryRequest>(args: &Arguments, mut query: R) -> Result<()> {
    if args.dry_run {
        // Compile against the requested format so the printed document is
        // exactly what would be sent.
        query.replace_output(output_for(args));
        let request = query.request_body()?;
        println!("{}", serde_json::to_string_pretty(&request)?);
        return Ok(());
    }

    let mut session = ReqwestSession::builder().timeout(Duration::from_secs(args.timeout));
    for (name, value) in &args.headers {
        session = session.header(name, value)?;
    }
    let client = Client::new(session.build(&args.url)?);

    if args.explain {
        query.replace_output(output_for(args));
        let plan = client.explain(&query)?;
        println!("{}", serde_json::to_string_pretty(&plan.raw)?);
        return Ok(());
    }

    let Some(output) = args.output.as_deref() else {
        // Enforced by clap.
        return Ok(());
    };
    write_output(&client, &query, args, output)?;
    info!(path = %output.display(), "done");
    Ok(())
}

fn build_query(args: &QueryArgs) -> Query {
    let mut query = match (&args.table, &args.dataset) {
        (_, Some(dataset)) => Query::from_dataset(dataset),
        (Some(table), None) => Query::from_table(table),
        (None, None) => Query::new(),
    };

    for (column, alias) in &args.selects {
        query.add_select_column(column, alias.as_deref());
    }
    for column in &args.is_not_null {
        query.add_filter(FilterExpr::is_not_null(column));
    }
    for (column, min, max) in &args.ranges {
        query.add_range_filter(column, *min, *max);
    }
    if let Some(bbox) = args.bbox {
        query.add_bbox_filter(&args.lon_column, &args.lat_column, bbox);
    }
    query
}

/// The wire output a format maps to. Local builds fetch parquet.
fn output_for(args: &Arguments) -> OutputSpec {
    match args.format {
        Format::Parquet | Format::Zarr => OutputSpec::Parquet,
        Format::Netcdf if !args.remote_netcdf => OutputSpec::Parquet,
        Format::Netcdf => OutputSpec::NetCdf,
        Format::Arrow => OutputSpec::Arrow,
        Format::Csv => OutputSpec::Csv,
        Format::Geoparquet => {
            OutputSpec::geoparquet(&args.query.lon_column, &args.query.lat_column)
        }
    }
}

fn write_output(
    client: &Client<ReqwestSession>,
    query: &impl QueryRequest,
    args: &Arguments,
    path: &Path,
) -> Result<()> {
    let (lon, lat) = (&args.query.lon_column, &args.query.lat_column);
    match args.format {
        Format::Parquet => client.to_parquet(query, path),
        Format::Arrow => client.to_arrow(query, path),
        Format::Csv => client.to_csv(query, path),
        Format::Geoparquet => client.to_geoparquet(query, path, lon, lat),
        Format::Netcdf => {
            let build = if args.remote_netcdf {
                NetcdfBuild::Remote
            } else {
                NetcdfBuild::Local
            };
            client.to_netcdf(query, path, build)
        }
        Format::Zarr => client.to_zarr(query, path),
    }
}
