//! A weighted sequence of [`Label`]s selected by percentage (spec §3 "Ramp").

use crate::drawtypes::label::Label;

/// An ordered list of frames, each with a non-negative integer weight.
#[derive(Debug, Clone, Default)]
pub struct Ramp {
    frames: Vec<(Label, u32)>,
}

impl Ramp {
    /// An empty ramp.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame with `weight` (use `1` for every frame to get the
    /// uniform-weight `floor(p*N/100)` behavior spec §3 calls out).
    pub fn push(&mut self, label: Label, weight: u32) -> &mut Self {
        self.frames.push((label, weight));
        self
    }

    fn total_weight(&self) -> u32 {
        self.frames.iter().map(|(_, w)| w).sum()
    }

    /// The frame whose cumulative weight range contains `p*W/100`, for
    /// `p` in `0..=100`. Equivalent to `floor(p*N/100)` when every weight
    /// is `1` (spec §3).
    pub fn get(&self, p: u32) -> Option<&Label> {
        if self.frames.is_empty() {
            return None;
        }
        let p = p.min(100);
        let w = self.total_weight();
        if w == 0 {
            return self.frames.first().map(|(l, _)| l);
        }
        let target = (u64::from(p) * u64::from(w)) / 100;
        let mut cumulative: u64 = 0;
        for (label, weight) in &self.frames {
            cumulative += u64::from(*weight);
            if target < cumulative {
                return Some(label);
            }
        }
        self.frames.last().map(|(l, _)| l)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_of(n: usize) -> Ramp {
        let mut ramp = Ramp::new();
        for i in 0..n {
            ramp.push(Label::new(i.to_string()), 1);
        }
        ramp
    }

    #[test]
    fn uniform_weights_match_floor_p_n_over_100() {
        let ramp = ramp_of(5);
        assert_eq!(ramp.get(0).unwrap().text, "0");
        assert_eq!(ramp.get(19).unwrap().text, "0");
        assert_eq!(ramp.get(20).unwrap().text, "1");
        assert_eq!(ramp.get(99).unwrap().text, "4");
        assert_eq!(ramp.get(100).unwrap().text, "4");
    }

    #[test]
    fn weighted_ramp_picks_bucket_by_weight() {
        let mut ramp = Ramp::new();
        ramp.push(Label::new("low"), 1);
        ramp.push(Label::new("high"), 9);
        // total weight 10; target = p*10/100
        assert_eq!(ramp.get(5).unwrap().text, "low"); // target 0 < 1
        assert_eq!(ramp.get(50).unwrap().text, "high"); // target 5, >= 1
    }

    #[test]
    fn empty_ramp_returns_none() {
        assert!(Ramp::new().get(50).is_none());
    }

    #[test]
    fn percentage_above_100_is_clamped() {
        let ramp = ramp_of(5);
        assert_eq!(ramp.get(250).unwrap().text, ramp.get(100).unwrap().text);
    }
}
