//! Combining per-signal scores into one composite.

use crate::domain::FusionStrategy;

/// Raw signals for one candidate file.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Signals {
    /// Personalized PageRank score.
    pub ppr: f64,
    /// Strongest lexical edge weight between the file and any seed.
    pub lexical: f64,
    /// Strongest co-change edge weight between the file and any seed.
    pub cochange: f64,
}

pub trait ScoreFusion: Send + Sync {
    fn name(&self) -> &'static str;

    fn fuse(&self, signals: &Signals) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SumFusion;

impl ScoreFusion for SumFusion {
    fn name(&self) -> &'static str {
        "sum"
    }

    fn fuse(&self, signals: &Signals) -> f64 {
        signals.ppr + signals.lexical + signals.cochange
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WeightedFusion {
    pub ppr: f64,
    pub lexical: f64,
    pub cochange: f64,
}

impl ScoreFusion for WeightedFusion {
    fn name(&self) -> &'static str {
        "weighted"
    }

    fn fuse(&self, signals: &Signals) -> f64 {
        self.ppr * signals.ppr + self.lexical * signals.lexical + self.cochange * signals.cochange
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MaxFusion;

impl ScoreFusion for MaxFusion {
    fn name(&self) -> &'static str {
        "max"
    }

    fn fuse(&self, signals: &Signals) -> f64 {
        signals.ppr.max(signals.lexical).max(signals.cochange)
    }
}

pub fn fusion_for(strategy: FusionStrategy) -> Box<dyn ScoreFusion> {
    match strategy {
        FusionStrategy::Sum => Box::new(SumFusion),
        FusionStrategy::Weighted { ppr, lexical, cochange } => {
            Box::new(WeightedFusion { ppr, lexical, cochange })
        }
        FusionStrategy::Max => Box::new(MaxFusion),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNALS: Signals = Signals { ppr: 0.05, lexical: 0.2, cochange: 0.4 };

    #[test]
    fn sum_adds_every_signal() {
        assert!((SumFusion.fuse(&SIGNALS) - 0.65).abs() < 1e-12);
        assert_eq!(SumFusion.fuse(&Signals::default()), 0.0);
    }

    #[test]
    fn weighted_scales_each_signal() {
        let fusion = fusion_for(FusionStrategy::Weighted { ppr: 2.0, lexical: 0.0, cochange: 0.5 });
        assert_eq!(fusion.name(), "weighted");
        assert!((fusion.fuse(&SIGNALS) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn max_picks_the_strongest_signal() {
        let fusion = fusion_for(FusionStrategy::Max);
        assert_eq!(fusion.name(), "max");
        assert!((fusion.fuse(&SIGNALS) - 0.4).abs() < 1e-12);
    }
}
