//! Global position space shared by every file of a unit.
//!
//! Each file registered with a [`PositionTable`] is assigned a base offset;
//! a [`Pos`] is that base plus a byte offset into the file, so a single
//! integer identifies a location unambiguously across the whole unit.
//! Offsets start at 1 and every file occupies `size + 1` positions, which
//! leaves room for an end-of-file position and keeps `Pos::NONE` (zero)
//! distinct from every real location.

use std::fmt;

/// A compact position in a [`PositionTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Pos(pub u32);

impl Pos {
    /// The zero position, never assigned to a real location.
    pub const NONE: Pos = Pos(0);

    pub fn is_valid(self) -> bool {
        self != Pos::NONE
    }
}

/// Index of a file inside a [`PositionTable`] (and inside its FileSet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileId(pub u32);

impl FileId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A human-readable location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub filename: String,
    /// Byte offset into the file.
    pub offset: usize,
    /// 1-based line.
    pub line: usize,
    /// 1-based column, in bytes.
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.filename.is_empty() {
            write!(f, "{}:{}", self.line, self.column)
        } else {
            write!(f, "{}:{}:{}", self.filename, self.line, self.column)
        }
    }
}

#[derive(Debug, Clone)]
struct FileEntry {
    name: String,
    base: u32,
    size: u32,
    /// Byte offsets of the first character of each line.
    lines: Vec<u32>,
}

/// Assigns positions to files and resolves positions back to locations.
#[derive(Debug, Clone)]
pub struct PositionTable {
    files: Vec<FileEntry>,
    next_base: u32,
}

impl PositionTable {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            next_base: 1,
        }
    }

    /// Register a file and return its id and base position.
    pub fn add_file(&mut self, name: impl Into<String>, source: &str) -> (FileId, Pos) {
        let id = FileId(self.files.len() as u32);
        let base = self.next_base;
        let size = source.len() as u32;

        let mut lines = vec![0u32];
        lines.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i as u32 + 1),
        );

        self.files.push(FileEntry {
            name: name.into(),
            base,
            size,
            lines,
        });
        self.next_base = base + size + 1;

        (id, Pos(base))
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn file_name(&self, file: FileId) -> Option<&str> {
        self.files.get(file.index()).map(|f| f.name.as_str())
    }

    pub fn base(&self, file: FileId) -> Option<Pos> {
        self.files.get(file.index()).map(|f| Pos(f.base))
    }

    /// Find the file containing `pos`.
    pub fn file_of(&self, pos: Pos) -> Option<FileId> {
        if !pos.is_valid() {
            return None;
        }
        let idx = match self.files.binary_search_by(|f| f.base.cmp(&pos.0)) {
            Ok(i) => i,
            Err(0) => return None,
            Err(i) => i - 1,
        };
        let entry = &self.files[idx];
        (pos.0 <= entry.base + entry.size).then_some(FileId(idx as u32))
    }

    /// Resolve a position to file name, line and column.
    pub fn position(&self, pos: Pos) -> Option<Position> {
        let file = self.file_of(pos)?;
        let entry = &self.files[file.index()];
        let offset = pos.0 - entry.base;
        let line = match entry.lines.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        Some(Position {
            filename: entry.name.clone(),
            offset: offset as usize,
            line: line + 1,
            column: (offset - entry.lines[line]) as usize + 1,
        })
    }
}

impl Default for PositionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bases_are_disjoint() {
        let mut table = PositionTable::new();
        let (a, base_a) = table.add_file("a.go", "package p\n");
        let (b, base_b) = table.add_file("b.go", "package p\n");

        assert_eq!(base_a, Pos(1));
        assert_eq!(base_b, Pos(12));
        assert_eq!(table.file_of(base_a), Some(a));
        assert_eq!(table.file_of(base_b), Some(b));
        assert_eq!(table.file_of(Pos::NONE), None);
    }

    #[test]
    fn resolves_line_and_column() {
        let mut table = PositionTable::new();
        let (_, base) = table.add_file("x.go", "package p\n\nvar x = 1\n");
        let pos = Pos(base.0 + 11 + 4);

        let position = table.position(pos).unwrap();
        assert_eq!(position.line, 3);
        assert_eq!(position.column, 5);
        assert_eq!(position.to_string(), "x.go:3:5");
    }

    #[test]
    fn end_of_file_position_belongs_to_file() {
        let mut table = PositionTable::new();
        let (a, base) = table.add_file("a.go", "abc");
        assert_eq!(table.file_of(Pos(base.0 + 3)), Some(a));
        assert_eq!(table.file_of(Pos(base.0 + 4)), None);
    }

    proptest! {
        #[test]
        fn every_offset_maps_back(src in "[a-z\n]{0,64}", extra in "[a-z\n]{0,16}") {
            let mut table = PositionTable::new();
            table.add_file("pre.go", &extra);
            let (id, base) = table.add_file("f.go", &src);
            for offset in 0..=src.len() {
                let pos = Pos(base.0 + offset as u32);
                prop_assert_eq!(table.file_of(pos), Some(id));
                let position = table.position(pos).unwrap();
                prop_assert_eq!(position.offset, offset);
                let expected_line = src[..offset].matches('\n').count() + 1;
                prop_assert_eq!(position.line, expected_line);
            }
        }
    }
}
