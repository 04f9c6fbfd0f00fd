//! Segment file loader.
//!
//! Recognized layouts, decided by the token count of the first line:
//!
//! ```text
//! 7 tokens  annotated   header line, then id1 id2 start end cm chrom ibd
//! 6 tokens  germline    no header; per line, 11 tab fields = germline1,
//!                       anything else = germline2 (id1 id2 start end cm chrom)
//! ```
//!
//! All data lines are tab-separated.

use super::index::{SegmentIndex, SegmentIndexBuilder};
use super::record::{IbdState, PairKey, SegmentRecord};
use crate::config::SegmentConfig;
use crate::error::IoResultExt;
use crate::{CompadreError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Layout of a segment file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentFormat {
    /// Seven columns with per-segment IBD1/2 state and a header line.
    Annotated,
    /// Six-column germline output without a header.
    Germline,
}

impl SegmentFormat {
    /// Decide the layout from the first line of the file.
    pub fn detect(first_line: &str) -> Result<Self> {
        let columns = first_line.split_whitespace().count();
        match columns {
            SegmentConfig::ANNOTATED_COLUMNS => Ok(SegmentFormat::Annotated),
            SegmentConfig::GERMLINE_COLUMNS => Ok(SegmentFormat::Germline),
            _ => Err(CompadreError::UnrecognizedFormat { columns }),
        }
    }

    pub fn has_header(&self) -> bool {
        matches!(self, SegmentFormat::Annotated)
    }

    pub fn is_annotated(&self) -> bool {
        matches!(self, SegmentFormat::Annotated)
    }
}

/// A parsed data line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub key: PairKey,
    pub record: SegmentRecord,
}

/// Load and index a segment file.
pub fn load_segment_file(path: &Path) -> Result<SegmentIndex> {
    let file = File::open(path).with_path(path)?;
    let index = load_segments(BufReader::new(file))?;
    info!(
        "Loaded {} pairs ({} segments >= {} cM) from {}",
        index.len(),
        index.segment_count(),
        SegmentConfig::MIN_SEGMENT_CM,
        path.display()
    );
    Ok(index)
}

/// Load and index segments from any buffered reader.
pub fn load_segments<R: BufRead>(reader: R) -> Result<SegmentIndex> {
    let mut lines = reader.lines().enumerate();

    let Some((_, first)) = lines.next() else {
        return Err(CompadreError::UnrecognizedFormat { columns: 0 });
    };
    let first = first?;
    let format = SegmentFormat::detect(&first)?;
    debug!("Detected segment file format {:?}", format);

    let mut builder = SegmentIndexBuilder::new(format.is_annotated());
    if !format.has_header() {
        offer_line(&mut builder, format, &first, 1)?;
    }

    for (idx, line) in lines {
        let line = line?;
        offer_line(&mut builder, format, &line, idx + 1)?;
    }

    Ok(builder.freeze())
}

fn offer_line(
    builder: &mut SegmentIndexBuilder,
    format: SegmentFormat,
    line: &str,
    line_no: usize,
) -> Result<()> {
    if let Some(parsed) = parse_line(format, line, line_no)? {
        builder.offer(parsed.key, parsed.record);
    }
    Ok(())
}

/// Parse one data line. Blank lines yield `None`.
pub fn parse_line(format: SegmentFormat, line: &str, line_no: usize) -> Result<Option<ParsedLine>> {
    let line = line.trim_end_matches(['\n', '\r']);
    if line.trim().is_empty() {
        return Ok(None);
    }

    let parsed = match format {
        SegmentFormat::Annotated => parse_annotated(line.trim(), line_no)?,
        SegmentFormat::Germline => {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() == SegmentConfig::GERMLINE1_FIELDS {
                parse_germline1(&fields, line_no)?
            } else {
                parse_germline2(&fields, line_no)?
            }
        }
    };
    Ok(Some(parsed))
}

fn parse_annotated(line: &str, line_no: usize) -> Result<ParsedLine> {
    let fields: Vec<&str> = line.split('\t').collect();
    require_fields(&fields, SegmentConfig::ANNOTATED_COLUMNS, line_no)?;

    let ibd = IbdState::from_column(fields[6]).ok_or_else(|| {
        CompadreError::parse(line_no, format!("invalid IBD state '{}'", fields[6].trim()))
    })?;
    let record = SegmentRecord::new(
        number(fields[5], "chromosome", line_no)?,
        number(fields[2], "start", line_no)?,
        number(fields[3], "end", line_no)?,
        number(fields[4], "cM length", line_no)?,
        ibd,
    );
    Ok(ParsedLine {
        key: PairKey::new(fields[0], fields[1]),
        record,
    })
}

fn parse_germline1(fields: &[&str], line_no: usize) -> Result<ParsedLine> {
    let mut bounds = fields[3].split(' ');
    let start = bounds
        .next()
        .ok_or_else(|| CompadreError::parse(line_no, "missing start position"))?;
    let end = bounds
        .next()
        .ok_or_else(|| CompadreError::parse(line_no, "missing end position"))?;

    let record = SegmentRecord::new(
        number(fields[2], "chromosome", line_no)?,
        number(start, "start", line_no)?,
        number(end, "end", line_no)?,
        number(fields[6], "cM length", line_no)?,
        IbdState::NotApplicable,
    );
    Ok(ParsedLine {
        key: PairKey::new(leading_token(fields[0]), leading_token(fields[1])),
        record,
    })
}

fn parse_germline2(fields: &[&str], line_no: usize) -> Result<ParsedLine> {
    require_fields(fields, SegmentConfig::GERMLINE_COLUMNS, line_no)?;

    let record = SegmentRecord::new(
        number(fields[5], "chromosome", line_no)?,
        number(fields[2], "start", line_no)?,
        number(fields[3], "end", line_no)?,
        number(fields[4], "cM length", line_no)?,
        IbdState::NotApplicable,
    );
    Ok(ParsedLine {
        key: PairKey::new(fields[0], fields[1]),
        record,
    })
}

fn require_fields(fields: &[&str], expected: usize, line_no: usize) -> Result<()> {
    if fields.len() < expected {
        return Err(CompadreError::parse(
            line_no,
            format!("expected {} tab-separated fields, found {}", expected, fields.len()),
        ));
    }
    Ok(())
}

fn leading_token(field: &str) -> &str {
    field.split(' ').next().unwrap_or(field)
}

fn number<T: FromStr>(field: &str, name: &str, line_no: usize) -> Result<T> {
    field
        .trim()
        .parse()
        .map_err(|_| CompadreError::parse(line_no, format!("invalid {} '{}'", name, field.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn load(text: &str) -> Result<SegmentIndex> {
        load_segments(Cursor::new(text.to_string()))
    }

    #[test]
    fn test_annotated_example() {
        let index = load("iid1\tiid2\tstart\tend\tcm\tchrom\tibd\nid1\tid2\t100\t200\t6.00\t1\t2\n")
            .unwrap();

        let segs = index.get(&PairKey::new("id1", "id2")).unwrap();
        assert_eq!(segs, &[SegmentRecord::new(1, 100, 200, 6.0, IbdState::Ibd2)]);
        assert_eq!(index.ibd2_count(), 1);
        assert!(index.is_annotated());
    }

    #[test]
    fn test_annotated_ibd2_counter_ignores_length_filter() {
        let text = "a\tb\tc\td\te\tf\tg\n\
                    x\ty\t1\t2\t1.5\t1\t2\n\
                    x\ty\t3\t4\t2.5\t1\t2\n\
                    x\ty\t5\t6\t9.0\t2\t2\n\
                    x\ty\t7\t8\t9.0\t3\t1\n";
        let index = load(text).unwrap();

        assert_eq!(index.ibd2_count(), 3);
        let segs = index.get(&PairKey::new("x", "y")).unwrap();
        assert_eq!(segs.iter().filter(|s| s.ibd.is_ibd2()).count(), 1);
        assert_eq!(segs.len(), 2);
    }

    #[test]
    fn test_germline2_first_line_is_data() {
        let text = "p1\tp2\t10\t20\t7.456\t3\np1\tp2\t30\t40\t2.0\t3\n";
        let index = load(text).unwrap();

        let segs = index.get(&PairKey::new("p1", "p2")).unwrap();
        assert_eq!(segs, &[SegmentRecord::new(3, 10, 20, 7.46, IbdState::NotApplicable)]);
        assert_eq!(index.ibd2_count(), 0);
        assert!(!index.is_annotated());
    }

    #[test]
    fn test_germline1_line() {
        let line = "p1 0\tp2 0\t4\t1000 5000\trs1 rs2\t12\t8.126\tcM\t0\t0\t0";
        let parsed = parse_line(SegmentFormat::Germline, line, 2).unwrap().unwrap();

        assert_eq!(parsed.key, PairKey::new("p1", "p2"));
        assert_eq!(parsed.record.chrom, 4);
        assert_eq!(parsed.record.start, 1000);
        assert_eq!(parsed.record.end, 5000);
        assert_eq!(parsed.record.cm, 8.13);
        assert_eq!(parsed.record.ibd, IbdState::NotApplicable);
    }

    #[test]
    fn test_germline_file_mixes_line_shapes() {
        let text = "p1\tp2\t10\t20\t7.456\t3\n\
                    p3 0\tp4 0\t4\t1000 5000\trs1 rs2\t12\t8.126\tcM\t0\t0\t0\n\
                    p3 0\tp4 0\t4\t6000 7000\trs3 rs4\t5\t4.994\tcM\t0\t0\t0\n";
        let index = load(text).unwrap();

        assert!(!index.is_annotated());
        let keys: Vec<_> = index.pairs().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["p1:p2", "p3:p4"]);
        assert_eq!(
            index.get(&PairKey::new("p3", "p4")).unwrap(),
            &[SegmentRecord::new(4, 1000, 5000, 8.13, IbdState::NotApplicable)]
        );
    }

    #[test]
    fn test_unrecognized_column_count() {
        let err = load("a\tb\tc\n").unwrap_err();
        assert!(matches!(err, CompadreError::UnrecognizedFormat { columns: 3 }));

        let empty = load("").unwrap_err();
        assert!(matches!(empty, CompadreError::UnrecognizedFormat { columns: 0 }));
    }

    #[test]
    fn test_bad_number_reports_line() {
        let err = load("p1\tp2\t10\t20\t7.0\t3\np1\tp2\tten\t20\t7.0\t3\n").unwrap_err();
        match err {
            CompadreError::Parse { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("start"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_ibd_state() {
        let err = load("h1\th2\th3\th4\th5\th6\th7\na\tb\t1\t2\t6.0\t1\t3\n").unwrap_err();
        assert!(matches!(err, CompadreError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_blank_lines_and_crlf() {
        let text = "p1\tp2\t10\t20\t7.0\t3\r\n\r\np3\tp4\t10\t20\t8.0\t5\r\n";
        let index = load(text).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(&PairKey::new("p3", "p4")).unwrap()[0].chrom, 5);
    }

    #[test]
    fn test_load_segment_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "p1\tp2\t10\t20\t7.0\t3\n").unwrap();

        let index = load_segment_file(file.path()).unwrap();
        assert!(index.get(&PairKey::new("p1", "p2")).is_some());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_segment_file(Path::new("/nonexistent/segments.txt")).unwrap_err();
        assert!(matches!(err, CompadreError::Io { path: Some(_), .. }));
    }
}
