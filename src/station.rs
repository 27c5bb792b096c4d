use rustc_hash::FxHashMap;

/// Running min/max/sum/count for one station.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationStat {
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub count: u64,
}

impl StationStat {
    /// Starts a stat from its first observed value.
    #[inline]
    pub fn new(measurement: f64) -> Self {
        Self {
            min: measurement,
            max: measurement,
            sum: measurement,
            count: 1,
        }
    }

    #[inline]
    pub fn add_reading(&mut self, measurement: f64) {
        if measurement < self.min {
            self.min = measurement;
        }
        if measurement > self.max {
            self.max = measurement;
        }
        self.sum += measurement;
        self.count += 1;
    }

    #[inline]
    pub fn merge(&mut self, other: &StationStat) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum += other.sum;
        self.count += other.count;
    }

    pub fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

/// Station name bytes to their aggregate.
///
/// Lookups borrow the name straight out of the scan buffer; only a miss copies the
/// bytes into an owned key, so nothing stored here points back into a buffer.
#[derive(Debug, Clone, Default)]
pub struct StationTable {
    stations: FxHashMap<Box<[u8]>, StationStat>,
}

impl StationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            stations: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Folds one measurement into the entry for `name`.
    #[inline]
    pub fn record(&mut self, name: &[u8], measurement: f64) {
        match self.stations.get_mut(name) {
            Some(stat) => stat.add_reading(measurement),
            None => {
                self.stations
                    .insert(Box::from(name), StationStat::new(measurement));
            }
        }
    }

    /// Folds a whole table into this one, consuming it.
    ///
    /// Each local table must be merged exactly once: merging the same partial
    /// result twice double counts every station in it.
    pub fn merge(&mut self, other: StationTable) {
        for (name, partial) in other.stations {
            self.stations
                .entry(name)
                .and_modify(|stat| stat.merge(&partial))
                .or_insert(partial);
        }
    }

    pub fn get(&self, name: &[u8]) -> Option<&StationStat> {
        self.stations.get(name)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Total number of records across all stations.
    pub fn record_count(&self) -> u64 {
        self.stations.values().map(|stat| stat.count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &StationStat)> {
        self.stations.iter().map(|(name, stat)| (&**name, stat))
    }

    /// Entries ordered by name bytes.
    pub fn sorted(&self) -> Vec<(&[u8], &StationStat)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }
}
