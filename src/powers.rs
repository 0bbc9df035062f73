//! Energy budget of a bench trace.
//!
//! Every unit of emitted intensity ends up in exactly one bucket: detected by
//! a sensor, escaped through an unconnected output, absorbed by a lossy
//! element, or truncated by one of the two safety limits. Whatever the buckets
//! do not account for is reported by [`Powers::missing`].

use std::{fmt, ops::*};

use serde::{Deserialize, Serialize};


#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Powers {
    pub input: f64,          // emitted intensity
    pub sensed: f64,         // intensity arriving at sensors
    pub escaped: f64,        // intensity leaving through unconnected outputs
    pub absorbed: f64,       // intensity absorbed by lossy elements
    pub trnc_intensity: f64, // truncated below the minimum intensity
    pub trnc_depth: f64,     // truncated by the maximum trace depth
}

impl Add for Powers {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            input: self.input + other.input,
            sensed: self.sensed + other.sensed,
            escaped: self.escaped + other.escaped,
            absorbed: self.absorbed + other.absorbed,
            trnc_intensity: self.trnc_intensity + other.trnc_intensity,
            trnc_depth: self.trnc_depth + other.trnc_depth,
        }
    }
}

impl AddAssign for Powers {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Powers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total intensity that left the trace by any accounted route.
    pub fn output(&self) -> f64 {
        self.sensed + self.escaped + self.absorbed + self.trnc_intensity + self.trnc_depth
    }

    /// Input not accounted for by any bucket. Zero for a correct trace.
    pub fn missing(&self) -> f64 {
        self.input - self.output()
    }

    /// `|missing| / input`, or zero for a dark bench.
    pub fn relative_missing(&self) -> f64 {
        if self.input <= 0.0 {
            return 0.0;
        }
        self.missing().abs() / self.input
    }
}

impl fmt::Display for Powers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Powers:")?;
        writeln!(f, "  Input:            {:.6}", self.input)?;
        writeln!(f, "  Sensed:           {:.6}", self.sensed)?;
        writeln!(f, "  Escaped:          {:.6}", self.escaped)?;
        writeln!(f, "  Absorbed:         {:.6}", self.absorbed)?;
        writeln!(f, "  Trunc. Intensity: {:.6}", self.trnc_intensity)?;
        writeln!(f, "  Trunc. Depth:     {:.6}", self.trnc_depth)?;
        writeln!(f, "  Missing:          {:.6}", self.missing())
    }
}
