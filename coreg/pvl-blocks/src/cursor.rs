use std::io::BufRead;

use crate::{Error, Result};

/// Lines consumed by one call to [PvlCursor::read_until].
///
/// `lines` holds the text read before the terminator. Line endings are kept so
/// that re-emitting a block reproduces its input.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Block {
    pub lines: Vec<String>,
    /// The line which contained all markers, or `None` at end of input.
    pub terminator: Option<String>,
}

impl Block {
    pub fn is_terminated(&self) -> bool {
        self.terminator.is_some()
    }

    /// All consumed lines in input order, terminator last.
    pub fn into_lines(self) -> Vec<String> {
        let mut lines = self.lines;
        lines.extend(self.terminator);
        lines
    }

    /// Append all consumed lines, terminator last, to `out`.
    pub fn emit_into(self, out: &mut String) {
        for line in self.lines.iter().chain(self.terminator.iter()) {
            out.push_str(line);
        }
    }
}

fn all_markers_in(markers: &[&str], line: &str) -> bool {
    !markers.is_empty() && markers.iter().all(|m| line.contains(m))
}

/// If `line` ends with the continuation marker `-` right before its line
/// break, return it without marker and line break.
fn strip_continuation(line: &str) -> Option<&str> {
    let body = line.strip_suffix('\n')?;
    let body = body.strip_suffix('\r').unwrap_or(body);
    body.strip_suffix('-')
}

/// Forward-only reader stepping through PVL text by marker substrings.
///
/// ```
/// let text = "Object = ControlPoint\n  PointId = p1\nEnd_Object\n";
/// let mut cursor = pvl_blocks::PvlCursor::new(text.as_bytes());
/// let head = cursor.read_until(&["Object", "=", "ControlPoint"]).unwrap();
/// assert!(head.lines.is_empty());
/// let body = cursor.read_until(&["End_Object"]).unwrap();
/// assert_eq!(body.lines, vec!["  PointId = p1\n"]);
/// assert_eq!(body.terminator.as_deref(), Some("End_Object\n"));
/// ```
pub struct PvlCursor<R> {
    rdr: R,
    buf: String,
    line_num: usize,
}

impl PvlCursor<std::io::BufReader<std::fs::File>> {
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let fd = std::fs::File::open(path)?;
        Ok(Self::new(std::io::BufReader::new(fd)))
    }
}

impl<R: BufRead> PvlCursor<R> {
    pub fn new(rdr: R) -> Self {
        Self {
            rdr,
            buf: String::new(),
            line_num: 0,
        }
    }

    /// Number of physical lines read so far.
    pub fn line_number(&self) -> usize {
        self.line_num
    }

    /// Next logical line with continuations joined, or `None` at end of input.
    fn next_line(&mut self) -> Result<Option<String>> {
        let mut joined: Option<String> = None;
        loop {
            self.buf.clear();
            if self.rdr.read_line(&mut self.buf)? == 0 {
                // A dangling continuation is returned rather than dropped.
                return Ok(joined);
            }
            self.line_num += 1;

            let segment = if joined.is_some() {
                self.buf.trim_start_matches([' ', '\t'])
            } else {
                self.buf.as_str()
            };

            if let Some(body) = strip_continuation(segment) {
                joined.get_or_insert_with(String::new).push_str(body);
                continue;
            }

            let mut line = joined.unwrap_or_default();
            line.push_str(segment);
            return Ok(Some(line));
        }
    }

    /// Read lines until one contains every marker.
    ///
    /// Markers are plain substrings matched in any order. With an empty
    /// marker set, or when the input ends first, the returned block holds
    /// everything read and no terminator.
    pub fn read_until(&mut self, markers: &[&str]) -> Result<Block> {
        let mut block = Block::default();
        while let Some(line) = self.next_line()? {
            if all_markers_in(markers, &line) {
                block.terminator = Some(line);
                break;
            }
            block.lines.push(line);
        }
        Ok(block)
    }

    /// As [Self::read_until] but reaching end of input is an error.
    pub fn read_block(&mut self, markers: &[&str]) -> Result<Block> {
        let block = self.read_until(markers)?;
        if !block.is_terminated() {
            return Err(Error::Unterminated {
                markers: markers.iter().map(|m| m.to_string()).collect(),
                line: self.line_num,
            });
        }
        Ok(block)
    }
}
