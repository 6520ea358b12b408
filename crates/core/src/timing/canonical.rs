//! Canonical timing table: `line_index,start_secs,end_secs,text`.
//!
//! Writers always produce the canonical shape with 3-decimal times and an
//! empty field for unknown timing. `read_any` also accepts the older shapes
//! left behind by earlier tools and converts them on the way in.

use std::io::Write;
use std::path::Path;

use csv::StringRecord;

use crate::align::timeline::derive_ends;
use crate::error::{AlignError, Result};
use crate::types::TimingSegment;

pub const CANONICAL_HEADER: [&str; 4] = ["line_index", "start_secs", "end_secs", "text"];

/// Recognised on-disk layouts, detected from the header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingShape {
    /// `line_index,start_secs,end_secs,text`
    Canonical,
    /// `line_index,start,end,text` (end may be missing)
    IndexedStartEnd,
    /// `line_index,time_secs,text`
    EventTable,
    /// `line,start`: text then start, index is row order
    LineStart,
}

/// Column positions resolved for one shape.
struct Columns {
    index: Option<usize>,
    start: usize,
    end: Option<usize>,
    text: usize,
}

impl TimingShape {
    const ALL: [TimingShape; 4] = [
        TimingShape::Canonical,
        TimingShape::IndexedStartEnd,
        TimingShape::EventTable,
        TimingShape::LineStart,
    ];

    /// (index, start, end, text) column names; `None` means absent.
    fn column_names(self) -> (Option<&'static str>, &'static str, Option<&'static str>, &'static str) {
        match self {
            TimingShape::Canonical => (Some("line_index"), "start_secs", Some("end_secs"), "text"),
            TimingShape::IndexedStartEnd => (Some("line_index"), "start", Some("end"), "text"),
            TimingShape::EventTable => (Some("line_index"), "time_secs", None, "text"),
            TimingShape::LineStart => (None, "start", None, "line"),
        }
    }

    fn resolve(self, header: &StringRecord) -> Option<Columns> {
        let find = |name: &str| header.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
        let (index, start, end, text) = self.column_names();
        let index = match index {
            Some(name) => Some(find(name)?),
            None => None,
        };
        let end = match (self, end) {
            // the draft shape sometimes omitted its end column
            (TimingShape::IndexedStartEnd, Some(name)) => find(name),
            (_, Some(name)) => Some(find(name)?),
            (_, None) => None,
        };
        Some(Columns {
            index,
            start: find(start)?,
            end,
            text: find(text)?,
        })
    }

    pub fn detect(header: &StringRecord) -> Option<TimingShape> {
        Self::ALL.into_iter().find(|shape| shape.resolve(header).is_some())
    }
}

fn format_secs(secs: Option<f64>) -> String {
    secs.map(|s| format!("{:.3}", s)).unwrap_or_default()
}

fn parse_secs(raw: Option<&str>, path: &Path, row: usize, what: &str) -> Result<Option<f64>> {
    let raw = raw.map(str::trim).unwrap_or("");
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(AlignError::malformed(path, row, format!("bad {} value {:?}", what, raw))),
    }
}

/// Write segments in canonical shape, ordered by `line_index`.
///
/// The file is replaced atomically, so a failed write leaves the previous
/// contents in place.
pub fn write_canonical(path: &Path, segments: &[TimingSegment]) -> Result<()> {
    for seg in segments {
        let bad = match (seg.start, seg.end) {
            (Some(s), Some(e)) => e < s,
            (None, Some(_)) => true,
            _ => false,
        };
        if bad {
            return Err(AlignError::InvariantViolation {
                message: format!(
                    "line {} has end {:?} before start {:?}",
                    seg.line_index, seg.end, seg.start
                ),
            });
        }
    }

    let mut ordered: Vec<&TimingSegment> = segments.iter().collect();
    ordered.sort_by_key(|s| s.line_index);

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .map_err(|e| AlignError::io(format!("creating {}", dir.display()), e))?;

    let context = || format!("writing {}", path.display());
    let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| AlignError::io(context(), e))?;
    let mut writer = csv::Writer::from_writer(tmp);
    writer
        .write_record(CANONICAL_HEADER)
        .map_err(|e| AlignError::csv(context(), e))?;
    for seg in ordered {
        writer
            .write_record([
                seg.line_index.to_string(),
                format_secs(seg.start),
                format_secs(seg.end),
                seg.text.clone(),
            ])
            .map_err(|e| AlignError::csv(context(), e))?;
    }
    let mut tmp = writer
        .into_inner()
        .map_err(|e| AlignError::io(context(), e.into_error()))?;
    tmp.flush().map_err(|e| AlignError::io(context(), e))?;
    tmp.persist(path)
        .map_err(|e| AlignError::io(context(), e.error))?;

    log::info!("Wrote {} timing rows to {}", segments.len(), path.display());
    Ok(())
}

/// Read any recognised timing table into canonical segments.
///
/// Missing end times are inferred from the next known start, else
/// `start + default_span`. Output is ordered by `line_index`.
pub fn read_any(path: &Path, default_span: f64) -> Result<Vec<TimingSegment>> {
    if !path.exists() {
        return Err(AlignError::MissingInput {
            what: "timing table",
            path: path.to_path_buf(),
        });
    }
    let context = || format!("reading {}", path.display());
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| AlignError::csv(context(), e))?;

    let header = reader
        .headers()
        .map_err(|e| AlignError::csv(context(), e))?
        .clone();
    let shape = TimingShape::detect(&header).ok_or_else(|| AlignError::UnknownShape {
        path: path.to_path_buf(),
        header: header.iter().collect::<Vec<_>>().join(","),
    })?;
    let columns = shape
        .resolve(&header)
        .ok_or_else(|| AlignError::UnknownShape {
            path: path.to_path_buf(),
            header: header.iter().collect::<Vec<_>>().join(","),
        })?;
    log::debug!("{} detected as {:?}", path.display(), shape);

    let mut segments = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| AlignError::csv(context(), e))?;
        let row = record.position().map(|p| p.line() as usize).unwrap_or(i + 2);

        let line_index = match columns.index {
            Some(col) => {
                let raw = record.get(col).map(str::trim).unwrap_or("");
                raw.parse::<usize>()
                    .map_err(|_| AlignError::malformed(path, row, format!("bad line_index {:?}", raw)))?
            }
            None => i,
        };
        let start = parse_secs(record.get(columns.start), path, row, "start")?;
        let end = match columns.end {
            Some(col) => parse_secs(record.get(col), path, row, "end")?,
            None => None,
        };
        if let (Some(s), Some(e)) = (start, end) {
            if e < s {
                return Err(AlignError::malformed(path, row, "end before start"));
            }
        }
        let text = record.get(columns.text).unwrap_or("").to_string();
        segments.push(TimingSegment {
            line_index,
            start,
            end,
            text,
        });
    }

    let starts: Vec<Option<f64>> = segments.iter().map(|s| s.start).collect();
    let inferred = derive_ends(&starts, default_span);
    for (seg, end) in segments.iter_mut().zip(inferred) {
        if seg.start.is_some() && seg.end.is_none() {
            seg.end = end;
        }
        if seg.start.is_none() {
            seg.end = None;
        }
    }

    segments.sort_by_key(|s| s.line_index);
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(i: usize, start: Option<f64>, end: Option<f64>, text: &str) -> TimingSegment {
        TimingSegment {
            line_index: i,
            start,
            end,
            text: text.into(),
        }
    }

    #[test]
    fn test_write_canonical_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.csv");
        let segments = vec![
            seg(1, Some(5.0), Some(6.0), "goodbye now"),
            seg(0, Some(0.0), Some(5.0), "hello, world"),
            seg(2, None, None, "lost line"),
        ];
        write_canonical(&path, &segments).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "line_index,start_secs,end_secs,text\n\
             0,0.000,5.000,\"hello, world\"\n\
             1,5.000,6.000,goodbye now\n\
             2,,,lost line\n"
        );
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.csv");
        let segments = vec![
            seg(0, Some(0.25), Some(1.5), "first"),
            seg(1, None, None, "with \"quotes\", commas"),
            seg(2, Some(12.345), Some(14.0), "third"),
        ];
        write_canonical(&path, &segments).unwrap();
        let back = read_any(&path, 2.0).unwrap();
        assert_eq!(back.len(), segments.len());
        for (a, b) in segments.iter().zip(&back) {
            assert_eq!(a.line_index, b.line_index);
            assert_eq!(a.text, b.text);
            match (a.start, b.start) {
                (Some(x), Some(y)) => assert!((x - y).abs() < 5e-4),
                (x, y) => assert_eq!(x, y),
            }
            match (a.end, b.end) {
                (Some(x), Some(y)) => assert!((x - y).abs() < 5e-4),
                (x, y) => assert_eq!(x, y),
            }
        }
    }

    /// Value as it reads back from a 3-decimal field.
    fn on_disk(v: Option<f64>) -> Option<f64> {
        v.map(|x| format!("{:.3}", x).parse().unwrap())
    }

    #[test]
    fn test_round_trip_generated_tables() {
        let texts = ["la la", "with, comma", "say \"hey\"", "caf\u{e9} ol\u{e9}", "x"];
        let edges = [1.0005, 2.9999, 0.0004999, 0.0015, 3.14159, 0.25];
        let mut seed: u64 = 0xc0ffee;
        let mut next = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) as usize
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.csv");
        for table in 0..30 {
            let rows = if table == 0 { 0 } else { next() % 25 + 1 };
            let all_unknown = table == 1;
            let mut t = 0.0;
            let mut index = 0;
            let mut segments = Vec::new();
            for _ in 0..rows {
                index += next() % 3;
                let text = texts[next() % texts.len()];
                if all_unknown || next() % 5 == 0 {
                    segments.push(seg(index, None, None, text));
                } else {
                    t += edges[next() % edges.len()];
                    let end = t + edges[next() % edges.len()];
                    segments.push(seg(index, Some(t), Some(end), text));
                }
                index += 1;
            }

            write_canonical(&path, &segments).unwrap();
            let back = read_any(&path, 2.0).unwrap();
            let expected: Vec<TimingSegment> = segments
                .iter()
                .map(|s| TimingSegment {
                    start: on_disk(s.start),
                    end: on_disk(s.end),
                    ..s.clone()
                })
                .collect();
            assert_eq!(back, expected, "table {} did not survive a round trip", table);
        }
    }

    #[test]
    fn test_read_legacy_line_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.csv");
        std::fs::write(&path, "line,start\nHello world,1.500\nUnmatched,\nGoodbye now,4.000\n").unwrap();

        let segs = read_any(&path, 2.0).unwrap();
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0].line_index, 0);
        assert_eq!(segs[0].text, "Hello world");
        assert_eq!(segs[0].end, Some(4.0));
        assert_eq!(segs[1].start, None);
        assert_eq!(segs[1].end, None);
        assert_eq!(segs[2].line_index, 2);
        assert_eq!(segs[2].end, Some(6.0));
    }

    #[test]
    fn test_read_event_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.csv");
        std::fs::write(&path, "line_index,time_secs,text\n1,3.0,b\n0,1.0,a\n").unwrap();

        let segs = read_any(&path, 2.0).unwrap();
        assert_eq!(segs[0].text, "a");
        assert_eq!(segs[0].end, Some(3.0));
        assert_eq!(segs[1].text, "b");
        assert_eq!(segs[1].end, Some(5.0));
    }

    #[test]
    fn test_read_indexed_start_end_without_end_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("draft.csv");
        std::fs::write(&path, "line_index,start,text\n0,1.0,a\n1,2.5,b\n").unwrap();

        let segs = read_any(&path, 1.0).unwrap();
        assert_eq!(segs[0].end, Some(2.5));
        assert_eq!(segs[1].end, Some(3.5));
    }

    #[test]
    fn test_detect_shapes() {
        let h = |cols: &[&str]| StringRecord::from(cols.to_vec());
        assert_eq!(TimingShape::detect(&h(&CANONICAL_HEADER)), Some(TimingShape::Canonical));
        assert_eq!(TimingShape::detect(&h(&["line", "start"])), Some(TimingShape::LineStart));
        assert_eq!(
            TimingShape::detect(&h(&["line_index", "start", "end", "text"])),
            Some(TimingShape::IndexedStartEnd)
        );
        assert_eq!(
            TimingShape::detect(&h(&["line_index", "time_secs", "text"])),
            Some(TimingShape::EventTable)
        );
        assert_eq!(TimingShape::detect(&h(&["foo", "bar"])), None);
    }

    #[test]
    fn test_unknown_header_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "what,is,this\n1,2,3\n").unwrap();
        assert!(matches!(read_any(&path, 2.0), Err(AlignError::UnknownShape { .. })));
    }

    #[test]
    fn test_bad_number_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "line_index,start_secs,end_secs,text\n0,abc,1.0,x\n").unwrap();
        match read_any(&path, 2.0) {
            Err(AlignError::Malformed { row, .. }) => assert_eq!(row, 2),
            other => panic!("expected malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_write_rejects_inverted_segment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.csv");
        let result = write_canonical(&path, &[seg(0, Some(3.0), Some(2.0), "x")]);
        assert!(matches!(result, Err(AlignError::InvariantViolation { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn test_read_missing_file() {
        let result = read_any(Path::new("/nonexistent/t.csv"), 2.0);
        assert!(matches!(result, Err(AlignError::MissingInput { .. })));
    }
}
