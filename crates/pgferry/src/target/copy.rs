//! PostgreSQL COPY BINARY encoding.
//!
//! Wire layout: `PGCOPY\n\xff\r\n\0` signature + flags (4) + extension
//! length (4), then per row a field count (2) followed by length-prefixed
//! field values (-1 length = NULL), and a -1 field count as trailer.

use std::pin::Pin;
use std::time::{Duration, Instant};

use bytes::{BufMut, Bytes, BytesMut};
use chrono::Timelike;
use futures::SinkExt;
use tokio_postgres::{Client, CopyInSink};
use tracing::info;

use crate::core::ident::quote;
use crate::core::value::SqlValue;
use crate::error::{MigrateError, Result};

/// COPY binary header signature.
const PG_COPY_SIGNATURE: &[u8] = b"PGCOPY\n\xff\r\n\0";

/// Pg type OID for text, used as the element type of text arrays.
const TEXT_OID: i32 = 25;

/// Flush the outgoing buffer to the sink once it reaches this size.
const FLUSH_BYTES: usize = 1024 * 1024;

/// Minimum interval between per-table progress log lines.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

/// Streams encoded rows into one table via COPY.
pub struct CopyWriter {
    sink: Pin<Box<CopyInSink<Bytes>>>,
    buf: BytesMut,
    columns: usize,
    rows: u64,
    total: i64,
    label: String,
    last_log: Instant,
}

impl CopyWriter {
    /// Open a COPY stream into `schema.table` for the given target columns.
    pub async fn start(
        client: &Client,
        pg_schema: &str,
        target_table: &str,
        target_columns: &[String],
        total_rows: i64,
        label: &str,
    ) -> Result<Self> {
        let col_list: Vec<String> = target_columns.iter().map(|c| quote(c)).collect();
        let sql = format!(
            "COPY {}.{} ({}) FROM STDIN WITH (FORMAT binary)",
            quote(pg_schema),
            quote(target_table),
            col_list.join(", ")
        );

        let sink: CopyInSink<Bytes> = client
            .copy_in(&sql)
            .await
            .map_err(|e| MigrateError::data_load(label, format!("initiating COPY: {}", e)))?;

        let mut buf = BytesMut::with_capacity(FLUSH_BYTES + 64 * 1024);
        buf.put_slice(PG_COPY_SIGNATURE);
        buf.put_i32(0); // flags
        buf.put_i32(0); // extension area length

        Ok(Self {
            sink: Box::pin(sink),
            buf,
            columns: target_columns.len(),
            rows: 0,
            total: total_rows,
            label: label.to_string(),
            last_log: Instant::now(),
        })
    }

    /// Encode and buffer one row, flushing to the connection as needed.
    pub async fn write_row(&mut self, row: &[SqlValue]) -> Result<()> {
        self.buf.put_i16(self.columns as i16);
        for value in row {
            encode_value(&mut self.buf, value);
        }
        self.rows += 1;

        if self.buf.len() >= FLUSH_BYTES {
            let data = self.buf.split().freeze();
            self.sink
                .send(data)
                .await
                .map_err(|e| MigrateError::data_load(&self.label, format!("sending COPY data: {}", e)))?;
        }

        if self.last_log.elapsed() >= PROGRESS_INTERVAL {
            let pct = if self.total > 0 {
                self.rows as f64 / self.total as f64 * 100.0
            } else {
                100.0
            };
            info!(
                "  [{}] progress: {}/{} rows ({:.1}%)",
                self.label, self.rows, self.total, pct
            );
            self.last_log = Instant::now();
        }

        Ok(())
    }

    /// Write the trailer and complete the COPY, returning the server's count.
    pub async fn finish(mut self) -> Result<u64> {
        self.buf.put_i16(-1);
        let data = self.buf.split().freeze();
        self.sink
            .send(data)
            .await
            .map_err(|e| MigrateError::data_load(&self.label, format!("sending COPY data: {}", e)))?;

        let count = self
            .sink
            .as_mut()
            .finish()
            .await
            .map_err(|e| MigrateError::data_load(&self.label, format!("finishing COPY: {}", e)))?;
        Ok(count)
    }
}

/// Encode one value in COPY binary field format (4-byte length + payload).
pub(crate) fn encode_value(buf: &mut BytesMut, value: &SqlValue) {
    match value {
        SqlValue::Null => {
            buf.put_i32(-1);
        }
        SqlValue::Bool(b) => {
            buf.put_i32(1);
            buf.put_u8(u8::from(*b));
        }
        SqlValue::I16(v) => {
            buf.put_i32(2);
            buf.put_i16(*v);
        }
        SqlValue::I32(v) => {
            buf.put_i32(4);
            buf.put_i32(*v);
        }
        SqlValue::I64(v) => {
            buf.put_i32(8);
            buf.put_i64(*v);
        }
        SqlValue::F32(v) => {
            buf.put_i32(4);
            buf.put_f32(*v);
        }
        SqlValue::F64(v) => {
            buf.put_i32(8);
            buf.put_f64(*v);
        }
        SqlValue::Decimal(d) => {
            encode_numeric(buf, d);
        }
        SqlValue::Text(s) => {
            buf.put_i32(s.len() as i32);
            buf.put_slice(s.as_bytes());
        }
        SqlValue::TextArray(items) => {
            encode_text_array(buf, items);
        }
        SqlValue::Bytes(b) => {
            buf.put_i32(b.len() as i32);
            buf.put_slice(b);
        }
        SqlValue::Uuid(u) => {
            buf.put_i32(16);
            buf.put_slice(u.as_bytes());
        }
        SqlValue::Date(d) => {
            // Days since 2000-01-01.
            let epoch = chrono::NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
            buf.put_i32(4);
            buf.put_i32((*d - epoch).num_days() as i32);
        }
        SqlValue::Time(t) => {
            // Microseconds since midnight.
            let micros =
                t.num_seconds_from_midnight() as i64 * 1_000_000 + (t.nanosecond() / 1000) as i64;
            buf.put_i32(8);
            buf.put_i64(micros);
        }
        SqlValue::DateTime(dt) => {
            // Microseconds since 2000-01-01. Values are UTC-normalised at
            // read time, so the same encoding serves timestamp and
            // timestamptz columns.
            let epoch = chrono::NaiveDate::from_ymd_opt(2000, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap();
            let micros = (*dt - epoch).num_microseconds().unwrap_or(0);
            buf.put_i32(8);
            buf.put_i64(micros);
        }
    }
}

/// Encode a one-dimensional text[] in array binary format.
fn encode_text_array(buf: &mut BytesMut, items: &[String]) {
    if items.is_empty() {
        // ndim 0 is the canonical empty-array encoding.
        buf.put_i32(12);
        buf.put_i32(0); // ndim
        buf.put_i32(0); // has-nulls flag
        buf.put_i32(TEXT_OID);
        return;
    }

    let payload_len: usize = 20 + items.iter().map(|s| 4 + s.len()).sum::<usize>();
    buf.put_i32(payload_len as i32);
    buf.put_i32(1); // ndim
    buf.put_i32(0); // has-nulls flag
    buf.put_i32(TEXT_OID);
    buf.put_i32(items.len() as i32);
    buf.put_i32(1); // lower bound
    for item in items {
        buf.put_i32(item.len() as i32);
        buf.put_slice(item.as_bytes());
    }
}

/// Encode a Decimal in NUMERIC binary format.
///
/// Header: ndigits, weight, sign, dscale (i16 each), then base-10000 digits.
fn encode_numeric(buf: &mut BytesMut, d: &rust_decimal::Decimal) {
    const NUMERIC_POS: i16 = 0x0000;
    const NUMERIC_NEG: i16 = 0x4000u16 as i16;

    if d.is_zero() {
        buf.put_i32(8);
        buf.put_i16(0); // ndigits
        buf.put_i16(0); // weight
        buf.put_i16(NUMERIC_POS);
        buf.put_i16(d.scale() as i16);
        return;
    }

    let sign = if d.is_sign_negative() {
        NUMERIC_NEG
    } else {
        NUMERIC_POS
    };
    let dscale = d.scale() as i16;

    // Work from the string form so digit grouping around the decimal point
    // stays exact.
    let abs_str = d.abs().to_string();
    let (int_part, frac_part) = match abs_str.find('.') {
        Some(dot) => (&abs_str[..dot], &abs_str[dot + 1..]),
        None => (abs_str.as_str(), ""),
    };

    // Integer digits group right-to-left from the decimal point: pad left.
    let mut int_digits: Vec<i16> = Vec::new();
    let int_clean = int_part.trim_start_matches('0');
    if !int_clean.is_empty() {
        let padded_len = int_clean.len().div_ceil(4) * 4;
        let padded = format!("{:0>width$}", int_clean, width = padded_len);
        for chunk in padded.as_bytes().chunks(4) {
            int_digits.push(std::str::from_utf8(chunk).unwrap().parse::<i16>().unwrap());
        }
    }

    // Fractional digits group left-to-right: pad right.
    let mut frac_digits: Vec<i16> = Vec::new();
    if !frac_part.is_empty() {
        let mut padded = frac_part.to_string();
        while padded.len() % 4 != 0 {
            padded.push('0');
        }
        for chunk in padded.as_bytes().chunks(4) {
            frac_digits.push(std::str::from_utf8(chunk).unwrap().parse::<i16>().unwrap());
        }
    }

    let weight = if !int_digits.is_empty() {
        int_digits.len() as i16 - 1
    } else {
        // All-fractional value: count leading zero groups.
        let leading_zero_groups = frac_digits.iter().take_while(|&&d| d == 0).count() as i16;
        -(leading_zero_groups + 1)
    };

    let mut digits = int_digits;
    digits.extend(frac_digits);
    while digits.len() > 1 && *digits.last().unwrap() == 0 {
        digits.pop();
    }
    while digits.len() > 1 && digits[0] == 0 {
        digits.remove(0);
    }

    let ndigits = digits.len() as i16;
    buf.put_i32(8 + i32::from(ndigits) * 2);
    buf.put_i16(ndigits);
    buf.put_i16(weight);
    buf.put_i16(sign);
    buf.put_i16(dscale);
    for digit in digits {
        buf.put_i16(digit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn encoded(value: &SqlValue) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_value(&mut buf, value);
        buf.to_vec()
    }

    #[test]
    fn test_encode_null() {
        assert_eq!(encoded(&SqlValue::Null), (-1i32).to_be_bytes());
    }

    #[test]
    fn test_encode_fixed_width() {
        assert_eq!(encoded(&SqlValue::Bool(true)), [0, 0, 0, 1, 1]);
        assert_eq!(encoded(&SqlValue::I16(7)), [0, 0, 0, 2, 0, 7]);
        assert_eq!(encoded(&SqlValue::I32(1)), [0, 0, 0, 4, 0, 0, 0, 1]);
        assert_eq!(
            encoded(&SqlValue::I64(-1)),
            [0, 0, 0, 8, 255, 255, 255, 255, 255, 255, 255, 255]
        );
    }

    #[test]
    fn test_encode_text_and_bytes() {
        assert_eq!(
            encoded(&SqlValue::Text("ab".to_string())),
            [0, 0, 0, 2, b'a', b'b']
        );
        assert_eq!(encoded(&SqlValue::Bytes(vec![9, 8])), [0, 0, 0, 2, 9, 8]);
    }

    #[test]
    fn test_encode_date_epoch() {
        let d = chrono::NaiveDate::from_ymd_opt(2000, 1, 2).unwrap();
        assert_eq!(encoded(&SqlValue::Date(d)), [0, 0, 0, 4, 0, 0, 0, 1]);
    }

    #[test]
    fn test_encode_timestamp_epoch() {
        let dt = chrono::NaiveDate::from_ymd_opt(2000, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 1)
            .unwrap();
        let enc = encoded(&SqlValue::DateTime(dt));
        assert_eq!(&enc[..4], [0, 0, 0, 8]);
        assert_eq!(i64::from_be_bytes(enc[4..].try_into().unwrap()), 1_000_000);
    }

    #[test]
    fn test_encode_numeric_fraction() {
        // 0.99: one base-10000 digit (9900), weight -1, dscale 2.
        let d = rust_decimal::Decimal::from_str("0.99").unwrap();
        let enc = encoded(&SqlValue::Decimal(d));
        assert_eq!(&enc[..4], [0, 0, 0, 10]);
        let h: Vec<i16> = enc[4..]
            .chunks(2)
            .map(|c| i16::from_be_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(h, vec![1, -1, 0, 2, 9900]);
    }

    #[test]
    fn test_encode_numeric_mixed() {
        // 1234.5678 → digits [1234, 5678], weight 0, dscale 4.
        let d = rust_decimal::Decimal::from_str("1234.5678").unwrap();
        let enc = encoded(&SqlValue::Decimal(d));
        let h: Vec<i16> = enc[4..]
            .chunks(2)
            .map(|c| i16::from_be_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(h, vec![2, 0, 0, 4, 1234, 5678]);
    }

    #[test]
    fn test_encode_numeric_zero_and_negative() {
        let zero = rust_decimal::Decimal::from_str("0.00").unwrap();
        let enc = encoded(&SqlValue::Decimal(zero));
        let h: Vec<i16> = enc[4..]
            .chunks(2)
            .map(|c| i16::from_be_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(h, vec![0, 0, 0, 2]);

        let neg = rust_decimal::Decimal::from_str("-5").unwrap();
        let enc = encoded(&SqlValue::Decimal(neg));
        let h: Vec<i16> = enc[4..]
            .chunks(2)
            .map(|c| i16::from_be_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(h, vec![1, 0, 0x4000u16 as i16, 0, 5]);
    }

    #[test]
    fn test_encode_numeric_large() {
        // 123456789 → groups [1, 2345, 6789], weight 2.
        let d = rust_decimal::Decimal::from_str("123456789").unwrap();
        let enc = encoded(&SqlValue::Decimal(d));
        let h: Vec<i16> = enc[4..]
            .chunks(2)
            .map(|c| i16::from_be_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(h, vec![3, 2, 0, 0, 1, 2345, 6789]);
    }

    #[test]
    fn test_encode_text_array() {
        let enc = encoded(&SqlValue::TextArray(vec!["ab".to_string(), "c".to_string()]));
        let mut expect = Vec::new();
        expect.extend_from_slice(&(20i32 + 6 + 5).to_be_bytes());
        expect.extend_from_slice(&1i32.to_be_bytes()); // ndim
        expect.extend_from_slice(&0i32.to_be_bytes()); // has-nulls
        expect.extend_from_slice(&25i32.to_be_bytes()); // text oid
        expect.extend_from_slice(&2i32.to_be_bytes()); // dim
        expect.extend_from_slice(&1i32.to_be_bytes()); // lower bound
        expect.extend_from_slice(&2i32.to_be_bytes());
        expect.extend_from_slice(b"ab");
        expect.extend_from_slice(&1i32.to_be_bytes());
        expect.extend_from_slice(b"c");
        assert_eq!(enc, expect);
    }

    #[test]
    fn test_encode_empty_text_array() {
        let enc = encoded(&SqlValue::TextArray(vec![]));
        let mut expect = Vec::new();
        expect.extend_from_slice(&12i32.to_be_bytes());
        expect.extend_from_slice(&0i32.to_be_bytes());
        expect.extend_from_slice(&0i32.to_be_bytes());
        expect.extend_from_slice(&25i32.to_be_bytes());
        assert_eq!(enc, expect);
    }

    #[test]
    fn test_signature_layout() {
        assert_eq!(PG_COPY_SIGNATURE.len(), 11);
        assert_eq!(&PG_COPY_SIGNATURE[..6], b"PGCOPY");
    }
}
