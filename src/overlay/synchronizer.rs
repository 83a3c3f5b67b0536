use crate::{event::LineTransition, lyrics::LyricLine};

/// How far a forward tick may walk line by line before switching to a binary
/// search over the whole sequence.
const SCAN_LIMIT: usize = 4;

/// Maps playback time to the active lyric line.
///
/// Lines are expected in non-decreasing time order. Out-of-order input is not
/// rejected; the cursor then lands on *some* qualifying line but never panics.
#[derive(Debug, Clone)]
pub struct Synchronizer {
    lines: Vec<LyricLine>,
    cursor: isize,
}

impl Default for Synchronizer {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Synchronizer {
    pub fn new(lines: Vec<LyricLine>) -> Self {
        Self { lines, cursor: -1 }
    }

    pub fn replace(&mut self, lines: Vec<LyricLine>) {
        self.lines = lines;
        self.cursor = -1;
    }

    pub fn clear(&mut self) {
        self.replace(Vec::new());
    }

    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    pub fn active_line(&self) -> isize {
        self.cursor
    }

    pub fn line_time(&self, index: usize) -> Option<f64> {
        self.lines.get(index).map(|line| line.time)
    }

    pub fn advance(&mut self, time: f64) -> Option<LineTransition> {
        if self.lines.is_empty() || time.is_nan() {
            return None;
        }

        let target = if self.cursor >= 0 && self.lines[self.cursor as usize].time > time {
            self.search(time)
        } else {
            self.scan_forward(time)
        };

        let from = self.cursor;
        self.cursor = target;
        (from != target).then_some(LineTransition { from, to: target })
    }

    fn scan_forward(&self, time: f64) -> isize {
        let mut index = self.cursor;
        for _ in 0..SCAN_LIMIT {
            match self.lines.get((index + 1) as usize) {
                Some(next) if next.time <= time => index += 1,
                _ => return index,
            }
        }
        match self.lines.get((index + 1) as usize) {
            Some(next) if next.time <= time => self.search(time),
            _ => index,
        }
    }

    fn search(&self, time: f64) -> isize {
        self.lines.partition_point(|line| line.time <= time) as isize - 1
    }
}
