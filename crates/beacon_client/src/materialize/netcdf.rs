//! NetCDF classic format codec.
//!
//! Files are written as CDF-5 (64-bit offsets and counts, unsigned and
//! 64-bit integer types). CDF-1, CDF-2 and CDF-5 files can be read back,
//! including record (unlimited) variables.

use std::collections::HashSet;

use bytes::{Buf, BufMut, BytesMut};

use crate::errors::{ClientError, Result};
use crate::materialize::dataset::{Attribute, Dataset, Dimension, Values, Variable};

const MAGIC: &[u8; 3] = b"CDF";

const NC_DIMENSION: u32 = 0x0A;
const NC_VARIABLE: u32 = 0x0B;
const NC_ATTRIBUTE: u32 = 0x0C;

const NC_BYTE: u32 = 1;
const NC_CHAR: u32 = 2;
const NC_SHORT: u32 = 3;
const NC_INT: u32 = 4;
const NC_FLOAT: u32 = 5;
const NC_DOUBLE: u32 = 6;
const NC_UBYTE: u32 = 7;
const NC_USHORT: u32 = 8;
const NC_UINT: u32 = 9;
const NC_INT64: u32 = 10;
const NC_UINT64: u32 = 11;

/// Suffix of the character dimension added for text variables.
pub const STRLEN_SUFFIX: &str = "_strlen";

fn padding(len: usize) -> usize {
    (4 - len % 4) % 4
}

fn nc_type(values: &Values) -> u32 {
    match values {
        Values::I8(_) => NC_BYTE,
        Values::Text(_) => NC_CHAR,
        Values::I16(_) => NC_SHORT,
        Values::I32(_) => NC_INT,
        Values::F32(_) => NC_FLOAT,
        Values::F64(_) => NC_DOUBLE,
        Values::U8(_) => NC_UBYTE,
        Values::U16(_) => NC_USHORT,
        Values::U32(_) => NC_UINT,
        Values::I64(_) => NC_INT64,
        Values::U64(_) => NC_UINT64,
    }
}

fn type_size(nc_type: u32) -> Result<usize> {
    Ok(match nc_type {
        NC_BYTE | NC_CHAR | NC_UBYTE => 1,
        NC_SHORT | NC_USHORT => 2,
        NC_INT | NC_FLOAT | NC_UINT => 4,
        NC_DOUBLE | NC_INT64 | NC_UINT64 => 8,
        other => return Err(ClientError::Netcdf(format!("unknown nc_type {other}"))),
    })
}

fn too_large(what: &str) -> ClientError {
    ClientError::Netcdf(format!("{what} is too large"))
}

/// Byte length of `count` values of a type.
fn byte_len(count: usize, nc_type: u32) -> Result<usize> {
    count
        .checked_mul(type_size(nc_type)?)
        .ok_or_else(|| too_large("variable data"))
}

fn padded(len: usize) -> Result<usize> {
    len.checked_add(padding(len)).ok_or_else(|| too_large("padded length"))
}

/// Variable as laid out in the file.
struct Layout<'a> {
    var: &'a Variable,
    dimids: Vec<u64>,
    /// Fixed width of each string for text variables.
    strlen: Option<usize>,
    /// Varies along the record dimension.
    record: bool,
    /// Padded size of the variable, or of one record of it.
    vsize: u64,
}

/// Encode a dataset as a CDF-5 file.
///
/// A zero length dimension is written as the record (unlimited) dimension
/// with no records. At most one such dimension is allowed, and variables
/// using it must have it first.
pub fn encode(ds: &Dataset) -> Result<Vec<u8>> {
    let mut dims: Vec<Dimension> = ds.dims.clone();
    let mut record_dims = dims.iter().enumerate().filter(|(_, d)| d.len == 0);
    let record_dim = record_dims.next().map(|(idx, _)| idx);
    if record_dims.next().is_some() {
        return Err(ClientError::Netcdf(
            "only one zero length dimension is supported".to_string(),
        ));
    }

    let mut layouts = Vec::with_capacity(ds.variables.len());
    for var in &ds.variables {
        let mut dimids = Vec::with_capacity(var.dims.len() + 1);
        let mut count = 1usize;
        let mut record_count = 1usize;
        let mut record = false;
        for (pos, name) in var.dims.iter().enumerate() {
            let idx = dims.iter().position(|d| &d.name == name).ok_or_else(|| {
                ClientError::Netcdf(format!("variable '{}' uses unknown dimension '{name}'", var.name))
            })?;
            if Some(idx) == record_dim {
                if pos != 0 {
                    return Err(ClientError::Netcdf(format!(
                        "variable '{}' must have zero length dimension '{name}' first",
                        var.name
                    )));
                }
                record = true;
            } else {
                record_count *= dims[idx].len;
            }
            dimids.push(idx as u64);
            count *= dims[idx].len;
        }
        if count != var.data.len() {
            return Err(ClientError::Netcdf(format!(
                "variable '{}' has {} values, dimensions require {count}",
                var.name,
                var.data.len()
            )));
        }

        let strlen = match &var.data {
            Values::Text(strings) => {
                let len = strings.iter().map(|s| s.len()).max().unwrap_or(0).max(1);
                dimids.push(dims.len() as u64);
                dims.push(Dimension {
                    name: format!("{}{STRLEN_SUFFIX}", var.name),
                    len,
                });
                record_count *= len;
                Some(len)
            }
            _ => None,
        };

        let bytes = byte_len(record_count, nc_type(&var.data))?;
        layouts.push(Layout {
            var,
            dimids,
            strlen,
            record,
            vsize: padded(bytes)? as u64,
        });
    }

    // Header size doesn't depend on the offsets written into it.
    let header_len = header(&dims, &ds.attributes, &layouts, 0)?.len() as u64;
    let mut buf = header(&dims, &ds.attributes, &layouts, header_len)?;

    // Record variables hold no data: the record dimension is empty.
    for layout in layouts.iter().filter(|l| !l.record) {
        let start = buf.len();
        put_values(&mut buf, &layout.var.data, layout.strlen)?;
        buf.put_bytes(0, padding(buf.len() - start));
    }

    Ok(buf.to_vec())
}

fn header(
    dims: &[Dimension],
    attributes: &[Attribute],
    layouts: &[Layout<'_>],
    data_start: u64,
) -> Result<BytesMut> {
    let mut buf = BytesMut::new();
    buf.put_slice(MAGIC);
    buf.put_u8(5);
    buf.put_u64(0); // numrecs

    if dims.is_empty() {
        put_absent(&mut buf);
    } else {
        buf.put_u32(NC_DIMENSION);
        buf.put_u64(dims.len() as u64);
        for dim in dims {
            put_name(&mut buf, &dim.name);
            buf.put_u64(dim.len as u64);
        }
    }

    put_attributes(&mut buf, attributes)?;

    if layouts.is_empty() {
        put_absent(&mut buf);
    } else {
        buf.put_u32(NC_VARIABLE);
        buf.put_u64(layouts.len() as u64);
        // Fixed size data first, then the record section.
        let mut fixed_begin = data_start;
        let mut record_begin = data_start
            + layouts
                .iter()
                .filter(|l| !l.record)
                .map(|l| l.vsize)
                .sum::<u64>();
        for layout in layouts {
            put_name(&mut buf, &layout.var.name);
            buf.put_u64(layout.dimids.len() as u64);
            for id in &layout.dimids {
                buf.put_u64(*id);
            }
            put_attributes(&mut buf, &layout.var.attributes)?;
            buf.put_u32(nc_type(&layout.var.data));
            buf.put_u64(layout.vsize);
            let begin = if layout.record {
                &mut record_begin
            } else {
                &mut fixed_begin
            };
            buf.put_u64(*begin);
            *begin += layout.vsize;
        }
    }

    Ok(buf)
}

fn put_absent(buf: &mut BytesMut) {
    buf.put_u32(0);
    buf.put_u64(0);
}

fn put_name(buf: &mut BytesMut, name: &str) {
    buf.put_u64(name.len() as u64);
    buf.put_slice(name.as_bytes());
    buf.put_bytes(0, padding(name.len()));
}

fn put_attributes(buf: &mut BytesMut, attributes: &[Attribute]) -> Result<()> {
    if attributes.is_empty() {
        put_absent(buf);
        return Ok(());
    }
    buf.put_u32(NC_ATTRIBUTE);
    buf.put_u64(attributes.len() as u64);
    for attr in attributes {
        put_name(buf, &attr.name);
        buf.put_u32(nc_type(&attr.value));
        let nelems = match &attr.value {
            Values::Text(s) if s.len() == 1 => s[0].len(),
            Values::Text(_) => {
                return Err(ClientError::Netcdf(format!(
                    "text attribute '{}' must hold exactly one string",
                    attr.name
                )));
            }
            other => other.len(),
        };
        buf.put_u64(nelems as u64);
        let start = buf.len();
        put_values(buf, &attr.value, None)?;
        buf.put_bytes(0, padding(buf.len() - start));
    }
    Ok(())
}

fn put_values(buf: &mut BytesMut, values: &Values, strlen: Option<usize>) -> Result<()> {
    match values {
        Values::I8(v) => v.iter().for_each(|x| buf.put_i8(*x)),
        Values::U8(v) => buf.put_slice(v),
        Values::I16(v) => v.iter().for_each(|x| buf.put_i16(*x)),
        Values::U16(v) => v.iter().for_each(|x| buf.put_u16(*x)),
        Values::I32(v) => v.iter().for_each(|x| buf.put_i32(*x)),
        Values::U32(v) => v.iter().for_each(|x| buf.put_u32(*x)),
        Values::I64(v) => v.iter().for_each(|x| buf.put_i64(*x)),
        Values::U64(v) => v.iter().for_each(|x| buf.put_u64(*x)),
        Values::F32(v) => v.iter().for_each(|x| buf.put_f32(*x)),
        Values::F64(v) => v.iter().for_each(|x| buf.put_f64(*x)),
        Values::Text(v) => match strlen {
            // Fixed width, NUL padded.
            Some(width) => {
                for s in v {
                    buf.put_slice(s.as_bytes());
                    buf.put_bytes(0, width - s.len());
                }
            }
            None => v.iter().for_each(|s| buf.put_slice(s.as_bytes())),
        },
    }
    Ok(())
}

/// Reader over a header, aware of the count width of the file's version.
///
/// Every count read from the file is checked against the bytes left before
/// it sizes an allocation.
struct Reader<'a> {
    buf: &'a [u8],
    /// CDF-5 uses 64-bit counts.
    wide_counts: bool,
    /// CDF-2 and CDF-5 use 64-bit offsets.
    wide_offsets: bool,
}

impl Reader<'_> {
    fn need(&self, n: usize) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(ClientError::Netcdf("unexpected end of header".to_string()));
        }
        Ok(())
    }

    fn u32(&mut self) -> Result<u32> {
        self.need(4)?;
        Ok(self.buf.get_u32())
    }

    fn u64(&mut self) -> Result<u64> {
        self.need(8)?;
        Ok(self.buf.get_u64())
    }

    fn count(&mut self) -> Result<usize> {
        let n = if self.wide_counts {
            self.u64()?
        } else {
            u64::from(self.u32()?)
        };
        usize::try_from(n).map_err(|_| too_large("count"))
    }

    fn offset(&mut self) -> Result<usize> {
        let n = if self.wide_offsets {
            self.u64()?
        } else {
            u64::from(self.u32()?)
        };
        usize::try_from(n).map_err(|_| too_large("offset"))
    }

    /// A count of header entries, each taking at least four bytes.
    fn entries(&mut self) -> Result<usize> {
        let n = self.count()?;
        if n > self.buf.remaining() / 4 {
            return Err(ClientError::Netcdf(format!(
                "header claims {n} entries, only {} bytes left",
                self.buf.remaining()
            )));
        }
        Ok(n)
    }

    fn name(&mut self) -> Result<String> {
        let len = self.count()?;
        let total = padded(len)?;
        self.need(total)?;
        let name = String::from_utf8(self.buf[..len].to_vec())
            .map_err(|e| ClientError::Netcdf(format!("invalid name: {e}")))?;
        self.buf.advance(total);
        Ok(name)
    }

    /// Read a list tag and element count. ABSENT lists have a zero tag.
    fn list(&mut self, tag: u32) -> Result<usize> {
        let found = self.u32()?;
        let n = self.entries()?;
        match found {
            0 if n == 0 => Ok(0),
            t if t == tag => Ok(n),
            t => Err(ClientError::Netcdf(format!(
                "expected list tag {tag:#x}, found {t:#x}"
            ))),
        }
    }

    fn attributes(&mut self) -> Result<Vec<Attribute>> {
        let n = self.list(NC_ATTRIBUTE)?;
        let mut attrs = Vec::with_capacity(n);
        for _ in 0..n {
            let name = self.name()?;
            let nc_type = self.u32()?;
            let nelems = self.count()?;
            let len = byte_len(nelems, nc_type)?;
            let total = padded(len)?;
            self.need(total)?;
            let value = read_values(&self.buf[..len], nc_type, nelems, None)?;
            self.buf.advance(total);
            attrs.push(Attribute { name, value });
        }
        Ok(attrs)
    }
}

/// Variable header entry, resolved against the file's dimensions.
struct VarHeader {
    name: String,
    dimids: Vec<usize>,
    attributes: Vec<Attribute>,
    nc_type: u32,
    record: bool,
    begin: usize,
}

fn product(lens: impl IntoIterator<Item = usize>) -> Result<usize> {
    lens.into_iter()
        .try_fold(1usize, |acc, len| acc.checked_mul(len))
        .ok_or_else(|| too_large("variable shape"))
}

fn data_slice<'a>(bytes: &'a [u8], begin: usize, len: usize, name: &str) -> Result<&'a [u8]> {
    begin
        .checked_add(len)
        .and_then(|end| bytes.get(begin..end))
        .ok_or_else(|| ClientError::Netcdf(format!("data of '{name}' out of bounds")))
}

/// Decode a CDF-1, CDF-2 or CDF-5 file.
///
/// Character variables come back as text over their leading dimensions; the
/// trailing character dimension is dropped from the dataset. The record
/// dimension comes back with its number of records as length.
pub fn decode(bytes: &[u8]) -> Result<Dataset> {
    if bytes.len() < 4 || &bytes[..3] != MAGIC {
        return Err(ClientError::Netcdf("not a NetCDF classic file".to_string()));
    }
    let version = bytes[3];
    let (wide_counts, wide_offsets) = match version {
        1 => (false, false),
        2 => (false, true),
        5 => (true, true),
        v => return Err(ClientError::Netcdf(format!("unsupported format version {v}"))),
    };

    let mut r = Reader {
        buf: &bytes[4..],
        wide_counts,
        wide_offsets,
    };
    let numrecs = r.count()?;

    let ndims = r.list(NC_DIMENSION)?;
    let mut dims = Vec::with_capacity(ndims);
    let mut record_dim = None;
    for idx in 0..ndims {
        let name = r.name()?;
        let mut len = r.count()?;
        if len == 0 {
            if record_dim.is_some() {
                return Err(ClientError::Netcdf(format!(
                    "second unlimited dimension '{name}'"
                )));
            }
            record_dim = Some(idx);
            len = numrecs;
        }
        dims.push(Dimension { name, len });
    }

    let attributes = r.attributes()?;

    let nvars = r.list(NC_VARIABLE)?;
    let mut headers = Vec::with_capacity(nvars);
    // Sum of the record sizes of all record variables.
    let mut recsize = 0usize;
    let mut record_vars = 0usize;
    for _ in 0..nvars {
        let name = r.name()?;
        let ndims = r.entries()?;
        let mut dimids = Vec::with_capacity(ndims);
        for pos in 0..ndims {
            let id = r.count()?;
            if id >= dims.len() {
                return Err(ClientError::Netcdf(format!("variable '{name}' has bad dimid {id}")));
            }
            if Some(id) == record_dim && pos != 0 {
                return Err(ClientError::Netcdf(format!(
                    "variable '{name}' uses the unlimited dimension after others"
                )));
            }
            dimids.push(id);
        }
        let attributes = r.attributes()?;
        let nc_type = r.u32()?;
        let vsize = r.count()?;
        let begin = r.offset()?;

        let record = record_dim.is_some() && dimids.first() == record_dim.as_ref();
        if record {
            recsize = recsize.checked_add(vsize).ok_or_else(|| too_large("record"))?;
            record_vars += 1;
        }
        headers.push(VarHeader {
            name,
            dimids,
            attributes,
            nc_type,
            record,
            begin,
        });
    }

    let mut variables = Vec::with_capacity(headers.len());
    let mut char_dims = HashSet::new();
    let mut data_dims = HashSet::new();
    for var in headers {
        let record_shape = if var.record { &var.dimids[1..] } else { &var.dimids[..] };
        let per_record = product(record_shape.iter().map(|id| dims[*id].len))?;
        let per_record_bytes = byte_len(per_record, var.nc_type)?;

        let (count, data) = if var.record {
            // A lone record variable is stored without padding between records.
            let stride = if record_vars == 1 {
                per_record_bytes
            } else {
                recsize
            };
            if stride < per_record_bytes {
                return Err(ClientError::Netcdf(format!(
                    "record size {stride} is smaller than a record of '{}'",
                    var.name
                )));
            }
            let count = product([numrecs, per_record])?;
            let mut data = Vec::with_capacity(byte_len(count, var.nc_type)?.min(bytes.len()));
            if per_record_bytes > 0 {
                for rec in 0..numrecs {
                    let start = rec
                        .checked_mul(stride)
                        .and_then(|off| off.checked_add(var.begin))
                        .ok_or_else(|| too_large("record offset"))?;
                    data.extend_from_slice(data_slice(bytes, start, per_record_bytes, &var.name)?);
                }
            }
            (count, data)
        } else {
            let data = data_slice(bytes, var.begin, per_record_bytes, &var.name)?;
            (per_record, data.to_vec())
        };

        let var_dims: Vec<&Dimension> = var.dimids.iter().map(|id| &dims[*id]).collect();
        let strlen = match (var.nc_type, var.dimids.last()) {
            (NC_CHAR, Some(last)) if Some(*last) != record_dim => {
                char_dims.insert(dims[*last].name.clone());
                Some(dims[*last].len)
            }
            _ => None,
        };
        let value_dims = match strlen {
            Some(_) => &var_dims[..var_dims.len() - 1],
            None => &var_dims[..],
        };
        data_dims.extend(value_dims.iter().map(|d| d.name.clone()));

        variables.push(Variable {
            data: read_values(&data, var.nc_type, count, strlen)?,
            dims: value_dims.iter().map(|d| d.name.clone()).collect(),
            name: var.name,
            attributes: var.attributes,
        });
    }

    let dims = dims
        .into_iter()
        .filter(|d| !char_dims.contains(&d.name) || data_dims.contains(&d.name))
        .collect();

    Ok(Dataset {
        dims,
        attributes,
        variables,
    })
}

fn read_values(mut buf: &[u8], nc_type: u32, count: usize, strlen: Option<usize>) -> Result<Values> {
    macro_rules! read {
        ($variant:ident, $get:ident) => {
            Values::$variant((0..count).map(|_| buf.$get()).collect())
        };
    }

    Ok(match nc_type {
        NC_BYTE => read!(I8, get_i8),
        NC_UBYTE => Values::U8(buf[..count].to_vec()),
        NC_SHORT => read!(I16, get_i16),
        NC_USHORT => read!(U16, get_u16),
        NC_INT => read!(I32, get_i32),
        NC_UINT => read!(U32, get_u32),
        NC_INT64 => read!(I64, get_i64),
        NC_UINT64 => read!(U64, get_u64),
        NC_FLOAT => read!(F32, get_f32),
        NC_DOUBLE => read!(F64, get_f64),
        NC_CHAR => {
            let text = |chunk: &[u8]| {
                let end = chunk.iter().position(|b| *b == 0).unwrap_or(chunk.len());
                String::from_utf8_lossy(&chunk[..end]).into_owned()
            };
            match strlen {
                Some(width) => Values::Text(buf[..count].chunks(width.max(1)).map(text).collect()),
                None => Values::Text(vec![text(&buf[..count])]),
            }
        }
        other => return Err(ClientError::Netcdf(format!("unknown nc_type {other}"))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materialize::dataset::{FILL_VALUE_ATTR, INDEX_DIM};

    fn dataset() -> Dataset {
        Dataset {
            dims: vec![Dimension {
                name: INDEX_DIM.to_string(),
                len: 3,
            }],
            attributes: vec![Attribute::new("title", Values::text("argo profiles"))],
            variables: vec![
                Variable {
                    name: INDEX_DIM.to_string(),
                    dims: vec![INDEX_DIM.to_string()],
                    attributes: Vec::new(),
                    data: Values::I64(vec![0, 1, 2]),
                },
                Variable {
                    name: "TEMP".to_string(),
                    dims: vec![INDEX_DIM.to_string()],
                    attributes: vec![
                        Attribute::new("units", Values::text("degC")),
                        Attribute::new(FILL_VALUE_ATTR, Values::F64(vec![f64::NAN])),
                    ],
                    data: Values::F64(vec![1.5, -2.0, 20.25]),
                },
                Variable {
                    name: "PLATFORM".to_string(),
                    dims: vec![INDEX_DIM.to_string()],
                    attributes: Vec::new(),
                    data: Values::Text(vec!["ARGO".into(), "".into(), "GLIDER1".into()]),
                },
                Variable {
                    name: "FLAG".to_string(),
                    dims: vec![INDEX_DIM.to_string()],
                    attributes: Vec::new(),
                    data: Values::U8(vec![1, 4, 9]),
                },
            ],
        }
    }

    #[test]
    fn header_layout() {
        let bytes = encode(&dataset()).unwrap();
        assert_eq!(b"CDF\x05", &bytes[..4]);
        // numrecs
        assert_eq!(&[0; 8], &bytes[4..12]);
        // dimension list tag and count: index + PLATFORM_strlen
        assert_eq!(&[0, 0, 0, 0x0A], &bytes[12..16]);
        assert_eq!(&2u64.to_be_bytes(), &bytes[16..24]);
        assert_eq!(0, bytes.len() % 4);
    }

    #[test]
    fn encode_decode() {
        let ds = dataset();
        let decoded = decode(&encode(&ds).unwrap()).unwrap();

        assert_eq!(ds.dims, decoded.dims);
        assert_eq!(ds.attributes, decoded.attributes);
        assert_eq!(ds.variables.len(), decoded.variables.len());
        assert_eq!(
            Values::Text(vec!["ARGO".into(), "".into(), "GLIDER1".into()]),
            decoded.variable("PLATFORM").unwrap().data
        );
        assert_eq!(
            Values::F64(vec![1.5, -2.0, 20.25]),
            decoded.variable("TEMP").unwrap().data
        );
        assert_eq!(
            Some(&Values::text("degC")),
            decoded.variable("TEMP").unwrap().attribute("units")
        );
        assert_eq!(Values::U8(vec![1, 4, 9]), decoded.variable("FLAG").unwrap().data);
    }

    #[test]
    fn decode_classic_v1() {
        // One dimension "x" of length 2, one int variable "v" = [7, -1].
        let mut buf = BytesMut::new();
        buf.put_slice(b"CDF\x01");
        buf.put_u32(0);
        buf.put_u32(NC_DIMENSION);
        buf.put_u32(1);
        buf.put_u32(1);
        buf.put_slice(b"x\0\0\0");
        buf.put_u32(2);
        buf.put_u32(0);
        buf.put_u32(0);
        buf.put_u32(NC_VARIABLE);
        buf.put_u32(1);
        buf.put_u32(1);
        buf.put_slice(b"v\0\0\0");
        buf.put_u32(1);
        buf.put_u32(0);
        buf.put_u32(0);
        buf.put_u32(0);
        buf.put_u32(NC_INT);
        buf.put_u32(8);
        let begin = buf.len() as u32 + 4;
        buf.put_u32(begin);
        buf.put_i32(7);
        buf.put_i32(-1);

        let ds = decode(&buf).unwrap();
        assert_eq!(Some(2), ds.dim_len("x"));
        assert_eq!(Values::I32(vec![7, -1]), ds.variable("v").unwrap().data);
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode(b"PAR1").is_err());
        assert!(decode(b"CDF\x03").is_err());
        assert!(decode(b"CDF\x05\0\0").is_err());
    }

    fn v5_prefix() -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_slice(b"CDF\x05");
        buf.put_u64(0);
        buf
    }

    #[test]
    fn rejects_huge_counts() {
        // Dimension list claiming u64::MAX entries.
        let mut buf = v5_prefix();
        buf.put_u32(NC_DIMENSION);
        buf.put_u64(u64::MAX);
        assert!(matches!(decode(&buf), Err(ClientError::Netcdf(_))));

        // Dimension name of length u64::MAX.
        let mut buf = v5_prefix();
        buf.put_u32(NC_DIMENSION);
        buf.put_u64(1);
        buf.put_u64(u64::MAX);
        buf.put_slice(b"x\0\0\0");
        assert!(matches!(decode(&buf), Err(ClientError::Netcdf(_))));

        // Attribute whose element count overflows its byte length.
        for nelems in [u64::MAX, 1 << 40] {
            let mut buf = v5_prefix();
            put_absent(&mut buf);
            buf.put_u32(NC_ATTRIBUTE);
            buf.put_u64(1);
            put_name(&mut buf, "a");
            buf.put_u32(NC_DOUBLE);
            buf.put_u64(nelems);
            buf.put_f64(1.0);
            assert!(matches!(decode(&buf), Err(ClientError::Netcdf(_))), "{nelems}");
        }
    }

    #[test]
    fn zero_length_dimension_is_record() {
        let var = |name: &str, dims: &[&str], data: Values| Variable {
            name: name.to_string(),
            dims: dims.iter().map(|d| d.to_string()).collect(),
            attributes: Vec::new(),
            data,
        };
        let ds = Dataset {
            dims: vec![
                Dimension {
                    name: INDEX_DIM.to_string(),
                    len: 0,
                },
                Dimension {
                    name: "level".to_string(),
                    len: 2,
                },
            ],
            attributes: Vec::new(),
            variables: vec![
                var(INDEX_DIM, &[INDEX_DIM], Values::I64(Vec::new())),
                var("TEMP", &[INDEX_DIM], Values::F64(Vec::new())),
                var("LEVEL", &["level"], Values::I32(vec![10, 20])),
                var("PLATFORM", &[INDEX_DIM], Values::Text(Vec::new())),
            ],
        };

        let bytes = encode(&ds).unwrap();
        // numrecs
        assert_eq!(&[0; 8], &bytes[4..12]);
        assert_eq!(ds, decode(&bytes).unwrap());

        let mut two = ds.clone();
        two.dims[1].len = 0;
        two.variables[2].data = Values::I32(Vec::new());
        assert!(encode(&two).is_err());
    }

    #[test]
    fn decode_record_variables() {
        // CDF-1, unlimited "t" with 2 records of an int "a" and a short "b".
        let mut buf = BytesMut::new();
        buf.put_slice(b"CDF\x01");
        buf.put_u32(2);
        buf.put_u32(NC_DIMENSION);
        buf.put_u32(1);
        buf.put_u32(1);
        buf.put_slice(b"t\0\0\0");
        buf.put_u32(0);
        buf.put_u32(0);
        buf.put_u32(0);
        buf.put_u32(NC_VARIABLE);
        buf.put_u32(2);
        let mut begins = Vec::new();
        for (name, nc_type) in [(b"a\0\0\0", NC_INT), (b"b\0\0\0", NC_SHORT)] {
            buf.put_u32(1);
            buf.put_slice(name);
            buf.put_u32(1);
            buf.put_u32(0);
            buf.put_u32(0);
            buf.put_u32(0);
            buf.put_u32(nc_type);
            buf.put_u32(4);
            begins.push(buf.len());
            buf.put_u32(0);
        }
        let data_start = buf.len() as u32;
        buf[begins[0]..begins[0] + 4].copy_from_slice(&data_start.to_be_bytes());
        buf[begins[1]..begins[1] + 4].copy_from_slice(&(data_start + 4).to_be_bytes());
        for (a, b) in [(1i32, 10i16), (2, 20)] {
            buf.put_i32(a);
            buf.put_i16(b);
            buf.put_i16(0);
        }

        let ds = decode(&buf).unwrap();
        assert_eq!(Some(2), ds.dim_len("t"));
        assert_eq!(Values::I32(vec![1, 2]), ds.variable("a").unwrap().data);
        assert_eq!(Values::I16(vec![10, 20]), ds.variable("b").unwrap().data);

        // Truncating the last record is an error, not a panic.
        buf.truncate(buf.len() - 4);
        assert!(decode(&buf).is_err());
    }

    #[test]
    fn value_count_must_match_dimensions() {
        let mut ds = dataset();
        ds.variables[1].data = Values::F64(vec![1.0]);
        assert!(encode(&ds).is_err());
    }
}
