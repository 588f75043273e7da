/// Event-sequence dataset loaded from paired text files
///
/// The on-disk format is two whitespace-delimited text files with a
/// positional one-to-one line correspondence: `time.txt` holds one
/// sequence of observation times per line, `event.txt` the matching
/// integer marks. Raw marks are remapped to contiguous ids and all
/// times are shifted to start at zero.
use std::collections::BTreeMap;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::{NjsdeError, Result};

/// Number of cross-validation folds
pub const NUM_FOLDS: usize = 5;

/// A single timed observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    /// Rescaled observation time
    pub time: f64,
    /// Contiguous event-type id in `0..num_types`
    pub mark: usize,
}

/// Ordered observations for one patient/record
pub type EventSeq = Vec<Event>;

/// Dataset of event sequences with a common observation window
pub struct EventDataset {
    seqs: Vec<EventSeq>,
    tspan: (f64, f64),
    num_types: usize,
}

impl EventDataset {
    /// Load from paired time/event text files.
    ///
    /// Every time is mapped to `(h_dt + t - tmin) * scale`, so the
    /// observation window becomes
    /// `(0, ((tmax + t_dt) - (tmin - h_dt)) * scale)`.
    pub fn from_files<P: AsRef<Path>>(
        time_path: P,
        event_path: P,
        scale: f64,
        h_dt: f64,
        t_dt: f64,
    ) -> Result<Self> {
        let time_seqs = parse_lines::<f64>(time_path.as_ref())?;
        let mark_seqs = parse_lines::<i64>(event_path.as_ref())?;

        if time_seqs.len() != mark_seqs.len() {
            return Err(NjsdeError::Data(format!(
                "line count mismatch: {} time sequences vs {} mark sequences",
                time_seqs.len(),
                mark_seqs.len()
            )));
        }

        if time_seqs.is_empty() {
            return Err(NjsdeError::Data("dataset is empty".to_string()));
        }

        let mut tmin = f64::INFINITY;
        let mut tmax = f64::NEG_INFINITY;
        for (i, (times, marks)) in time_seqs.iter().zip(mark_seqs.iter()).enumerate() {
            if times.len() != marks.len() {
                return Err(NjsdeError::Data(format!(
                    "line {}: {} times but {} marks",
                    i + 1,
                    times.len(),
                    marks.len()
                )));
            }
            if times.is_empty() {
                return Err(NjsdeError::Data(format!("line {}: empty sequence", i + 1)));
            }
            for &t in times {
                tmin = tmin.min(t);
                tmax = tmax.max(t);
            }
        }

        // Remap raw marks to contiguous ids by sorted order
        let mut raw_marks = std::collections::BTreeSet::new();
        for marks in &mark_seqs {
            raw_marks.extend(marks.iter().copied());
        }
        let m2mid: BTreeMap<i64, usize> = raw_marks
            .iter()
            .enumerate()
            .map(|(mid, &m)| (m, mid))
            .collect();

        let seqs = time_seqs
            .iter()
            .zip(mark_seqs.iter())
            .map(|(times, marks)| {
                times
                    .iter()
                    .zip(marks.iter())
                    .map(|(&t, m)| Event {
                        time: (h_dt + t - tmin) * scale,
                        mark: m2mid[m],
                    })
                    .collect()
            })
            .collect();

        let tspan = (0.0, ((tmax + t_dt) - (tmin - h_dt)) * scale);

        Ok(Self {
            seqs,
            tspan,
            num_types: m2mid.len(),
        })
    }

    /// Number of sequences
    pub fn len(&self) -> usize {
        self.seqs.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }

    /// Common observation window
    pub fn tspan(&self) -> (f64, f64) {
        self.tspan
    }

    /// Number of distinct event types after remapping
    pub fn num_types(&self) -> usize {
        self.num_types
    }

    /// Sequences in their current order
    pub fn seqs(&self) -> &[EventSeq] {
        &self.seqs
    }

    /// Shuffle sequences in place
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        self.seqs.shuffle(rng);
    }

    /// Split into (train, test) for the given cross-validation fold.
    ///
    /// The test partition is the index range
    /// `[n * 0.2 * fold, n * 0.2 * (fold + 1))`; across all folds every
    /// sequence lands in exactly one test partition.
    pub fn fold_split(&self, fold: usize) -> Result<(Vec<EventSeq>, Vec<EventSeq>)> {
        if fold >= NUM_FOLDS {
            return Err(NjsdeError::Config(format!(
                "fold must be in 0..{}, got {}",
                NUM_FOLDS, fold
            )));
        }

        let n = self.seqs.len();
        let lo = (n as f64 * 0.2 * fold as f64) as usize;
        let hi = (n as f64 * 0.2 * (fold + 1) as f64) as usize;

        let test = self.seqs[lo..hi].to_vec();
        let train = [&self.seqs[..lo], &self.seqs[hi..]].concat();

        Ok((train, test))
    }
}

/// Sample `batch_size` distinct sequences uniformly without replacement.
pub fn sample_batch<'a, R: Rng>(
    seqs: &'a [EventSeq],
    batch_size: usize,
    rng: &mut R,
) -> Vec<&'a EventSeq> {
    let k = batch_size.min(seqs.len());
    rand::seq::index::sample(rng, seqs.len(), k)
        .into_iter()
        .map(|i| &seqs[i])
        .collect()
}

fn parse_lines<T: std::str::FromStr>(path: &Path) -> Result<Vec<Vec<T>>> {
    let contents = std::fs::read_to_string(path)?;

    let mut seqs = Vec::new();
    for (i, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let seq = line
            .split_whitespace()
            .map(|tok| {
                tok.parse::<T>().map_err(|_| {
                    NjsdeError::Data(format!(
                        "{}: line {}: cannot parse token '{}'",
                        path.display(),
                        i + 1,
                        tok
                    ))
                })
            })
            .collect::<Result<Vec<T>>>()?;
        seqs.push(seq);
    }

    Ok(seqs)
}
