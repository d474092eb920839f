use super::traits::{FrameParseErrorKind, FrameSource, TrajectoryError};
use crate::core::models::atom::{Atom, Element};
use crate::core::models::cell::PeriodicBox;
use crate::core::models::system::MolecularSystem;
use nalgebra::Point3;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;
use std::str::FromStr;

struct AtomRecord {
    label: String,
    element: Element,
    position: Point3<f64>,
}

/// A multi-frame XYZ trajectory.
///
/// Every frame is an atom count line, a comment line and one `label x y z` record
/// per atom. All frames must list the same atoms in the same order; the first
/// frame defines the atom arena.
pub struct XyzTrajectory<R> {
    reader: R,
    elements: Vec<Element>,
    frames_read: usize,
    line: usize,
    buffer: String,
}

impl XyzTrajectory<BufReader<File>> {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        cell: PeriodicBox,
    ) -> Result<(Self, MolecularSystem), TrajectoryError> {
        let file = File::open(path)?;
        Self::open(BufReader::new(file), cell)
    }
}

impl<R: BufRead + Seek> XyzTrajectory<R> {
    /// Builds the atom arena from the first frame and positions the cursor so
    /// that the first [`FrameSource::load_next`] yields that same frame.
    ///
    /// # Errors
    ///
    /// Returns [`TrajectoryError::Empty`] when the input holds no frame, or a
    /// [`TrajectoryError::Malformed`] error if the first frame cannot be parsed.
    pub fn open(reader: R, cell: PeriodicBox) -> Result<(Self, MolecularSystem), TrajectoryError> {
        let mut trajectory = Self {
            reader,
            elements: Vec::new(),
            frames_read: 0,
            line: 0,
            buffer: String::new(),
        };

        let records = trajectory.read_frame()?.ok_or(TrajectoryError::Empty)?;
        let mut system = MolecularSystem::new(cell);
        for (i, record) in records.into_iter().enumerate() {
            trajectory.elements.push(record.element);
            system.add_atom(Atom::new(i, &record.label, record.element, record.position));
        }

        trajectory.rewind()?;
        Ok((trajectory, system))
    }

    pub fn atom_count(&self) -> usize {
        self.elements.len()
    }

    fn read_line(&mut self) -> Result<bool, TrajectoryError> {
        self.buffer.clear();
        let n = self.reader.read_line(&mut self.buffer)?;
        if n > 0 {
            self.line += 1;
        }
        Ok(n > 0)
    }

    fn malformed(&self, kind: FrameParseErrorKind) -> TrajectoryError {
        TrajectoryError::Malformed {
            frame: self.frames_read + 1,
            line: self.line,
            kind,
        }
    }

    fn read_frame(&mut self) -> Result<Option<Vec<AtomRecord>>, TrajectoryError> {
        loop {
            if !self.read_line()? {
                return Ok(None);
            }
            if !self.buffer.trim().is_empty() {
                break;
            }
        }

        let count_str = self.buffer.trim().to_string();
        let count: usize = count_str.parse().map_err(|_| {
            self.malformed(FrameParseErrorKind::InvalidCount {
                value: count_str.clone(),
            })
        })?;
        let expected = &self.elements;
        if !expected.is_empty() && count != expected.len() {
            return Err(self.malformed(FrameParseErrorKind::CountMismatch {
                expected: expected.len(),
                found: count,
            }));
        }

        if !self.read_line()? {
            return Err(self.malformed(FrameParseErrorKind::Truncated));
        }

        let mut records = Vec::with_capacity(count);
        for i in 0..count {
            if !self.read_line()? {
                return Err(self.malformed(FrameParseErrorKind::Truncated));
            }
            let record = self.parse_record(i)?;
            records.push(record);
        }

        self.frames_read += 1;
        Ok(Some(records))
    }

    fn parse_record(&self, i: usize) -> Result<AtomRecord, TrajectoryError> {
        let mut fields = self.buffer.split_whitespace();
        let (Some(label), Some(x), Some(y), Some(z)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(self.malformed(FrameParseErrorKind::MissingField));
        };

        let element = Element::from_str(label).unwrap_or_default();
        if let Some(&expected) = self.elements.get(i) {
            if expected != element {
                return Err(self.malformed(FrameParseErrorKind::ElementMismatch {
                    expected: expected.symbol().to_string(),
                    found: label.to_string(),
                }));
            }
        }

        let coord = |s: &str| {
            s.parse::<f64>().map_err(|_| {
                self.malformed(FrameParseErrorKind::InvalidFloat {
                    value: s.to_string(),
                })
            })
        };
        Ok(AtomRecord {
            label: label.to_string(),
            element,
            position: Point3::new(coord(x)?, coord(y)?, coord(z)?),
        })
    }
}

impl<R: BufRead + Seek> FrameSource for XyzTrajectory<R> {
    fn load_next(&mut self, system: &mut MolecularSystem) -> Result<bool, TrajectoryError> {
        let Some(records) = self.read_frame()? else {
            return Ok(false);
        };
        let positions: Vec<Point3<f64>> = records.into_iter().map(|r| r.position).collect();
        system.set_positions(&positions)?;
        Ok(true)
    }

    fn rewind(&mut self) -> Result<(), TrajectoryError> {
        self.reader.seek(SeekFrom::Start(0))?;
        self.frames_read = 0;
        self.line = 0;
        Ok(())
    }

    fn frames_read(&self) -> usize {
        self.frames_read
    }
}
