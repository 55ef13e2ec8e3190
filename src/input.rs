/*!
# 6. Input Data

The model reads three whitespace-separated text files, each starting with one
header line. Blank lines and lines starting with `#` are skipped.

- The map lists the cells: `id x y population population_density road_density`.
- The network lists the roads: `id1 id2 category`, with the category given as
  a roman (`I`..`VI`) or arabic (`1`..`6`) numeral.
- The sample lists the field observations: `id label [sample_size]`, where the
  label is `1`/`PRESENCE` or `0`/`ABSENCE` and the sample size defaults to 1.

```rust
let map = "id x y pop dens roads\n1 0.0 0.0 100 10 0.5\n2 3.0 4.0 50 5 0.1\n";
let cells = model::input::read_map(map.as_bytes(), "map").unwrap();
assert_eq!(cells.len(), 2);
assert_eq!(cells[1].x, 3.0);
```
 */

use serde_derive::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use crate::error::{ModelError, Result};
use crate::likelihood::Observation;
use crate::parameters::RoadCategory;
use crate::CellId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    pub id: CellId,
    pub x: f64,
    pub y: f64,
    pub population: f64,
    pub population_density: f64,
    pub road_density: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadRecord {
    pub from: CellId,
    pub to: CellId,
    pub category: RoadCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub id: CellId,
    pub label: Observation,
    pub sample_size: u64,
}

struct Line<'a> {
    file: &'a str,
    number: usize,
    fields: Vec<&'a str>,
}

impl<'a> Line<'a> {
    fn error(&self, message: String) -> ModelError {
        ModelError::Parse {
            file: self.file.to_string(),
            line: self.number,
            message,
        }
    }

    fn expect_fields(&self, min: usize, max: usize) -> Result<()> {
        if self.fields.len() < min || self.fields.len() > max {
            Err(self.error(format!(
                "expected {} fields, found {}",
                if min == max { min.to_string() } else { format!("{} to {}", min, max) },
                self.fields.len()
            )))
        } else {
            Ok(())
        }
    }

    fn field<T: FromStr>(&self, i: usize, what: &str) -> Result<T> {
        self.fields[i]
            .parse()
            .map_err(|_| self.error(format!("cannot read {} from {:?}", what, self.fields[i])))
    }
}

/// Feed every data line of a table to `parse_line`, skipping the header.
fn read_table<R, T, F>(reader: R, file: &str, mut parse_line: F) -> Result<Vec<T>>
where
    R: BufRead,
    F: FnMut(&Line) -> Result<T>,
{
    let mut records = vec![];
    for (i, text) in reader.lines().enumerate() {
        let text = text?;
        if i == 0 {
            continue;
        }
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line = Line {
            file,
            number: i + 1,
            fields: trimmed.split_whitespace().collect(),
        };
        records.push(parse_line(&line)?);
    }
    Ok(records)
}

pub fn read_map<R: BufRead>(reader: R, file: &str) -> Result<Vec<CellRecord>> {
    read_table(reader, file, |line| {
        line.expect_fields(6, 6)?;
        let record = CellRecord {
            id: line.field(0, "a cell identifier")?,
            x: line.field(1, "an x coordinate")?,
            y: line.field(2, "a y coordinate")?,
            population: line.field(3, "a population")?,
            population_density: line.field(4, "a population density")?,
            road_density: line.field(5, "a road density")?,
        };
        if !(record.population >= 0.) {
            return Err(line.error(format!("negative population {}", record.population)));
        }
        Ok(record)
    })
}

pub fn read_network<R: BufRead>(reader: R, file: &str) -> Result<Vec<RoadRecord>> {
    read_table(reader, file, |line| {
        line.expect_fields(3, 3)?;
        Ok(RoadRecord {
            from: line.field(0, "a cell identifier")?,
            to: line.field(1, "a cell identifier")?,
            category: line.field(2, "a road category")?,
        })
    })
}

fn parse_label(label: &str) -> Option<Observation> {
    match label {
        "1" | "PRESENCE" | "presence" => Some(Observation::Present),
        "0" | "ABSENCE" | "absence" => Some(Observation::Absent),
        _ => None,
    }
}

pub fn read_sample<R: BufRead>(reader: R, file: &str) -> Result<Vec<SampleRecord>> {
    read_table(reader, file, |line| {
        line.expect_fields(2, 3)?;
        let label = parse_label(line.fields[1])
            .ok_or_else(|| line.error(format!("unknown label {:?}", line.fields[1])))?;
        let sample_size = if line.fields.len() == 3 {
            line.field(2, "a sample size")?
        } else {
            1
        };
        Ok(SampleRecord {
            id: line.field(0, "a cell identifier")?,
            label,
            sample_size,
        })
    })
}

fn open<P: AsRef<Path>>(path: P) -> Result<(BufReader<File>, String)> {
    let name = path.as_ref().display().to_string();
    Ok((BufReader::new(File::open(path)?), name))
}

pub fn load_map<P: AsRef<Path>>(path: P) -> Result<Vec<CellRecord>> {
    let (reader, name) = open(path)?;
    read_map(reader, &name)
}

pub fn load_network<P: AsRef<Path>>(path: P) -> Result<Vec<RoadRecord>> {
    let (reader, name) = open(path)?;
    read_network(reader, &name)
}

pub fn load_sample<P: AsRef<Path>>(path: P) -> Result<Vec<SampleRecord>> {
    let (reader, name) = open(path)?;
    read_sample(reader, &name)
}
